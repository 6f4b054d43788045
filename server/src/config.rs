use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:8000", "http://127.0.0.1:5500"];

#[derive(Parser, Debug, Clone)]
#[command(name = "story-server")]
#[command(about = "Kid-friendly AI image, code and story generation with story search", long_about = None)]
pub struct Config {
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,
    /// Directory served for non-API paths
    #[arg(long, env = "PUBLIC_DIR", default_value = "./public")]
    pub public: PathBuf,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,
    /// Chat model used for code and story generation
    #[arg(long, env = "OPENAI_TEXT_MODEL", default_value = "gpt-4o-mini")]
    pub text_model: String,
    /// Requests allowed per client IP within one window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 10)]
    pub rate_limit_max: u32,
    /// Rate limit window in milliseconds
    #[arg(long, env = "RATE_LIMIT_WINDOW", default_value_t = 15 * 60 * 1000)]
    pub rate_limit_window: u64,
    /// Key rate limits on the first `X-Forwarded-For` entry; only behind a trusted proxy
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: bool,
    /// Comma-separated allowed origins, or "*"
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub environment: String,
}

/// Runtime settings shared with request handlers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_max: u32,
    pub rate_limit_window_ms: u64,
    pub trust_proxy: bool,
    pub public_dir: Option<PathBuf>,
    pub text_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            rate_limit_max: 10,
            rate_limit_window_ms: 15 * 60 * 1000,
            trust_proxy: false,
            public_dir: None,
            text_model: "gpt-4o-mini".into(),
        }
    }
}

impl Config {
    pub fn settings(&self) -> Settings {
        let cors_origins = match &self.cors_origin {
            Some(val) => {
                let origins: Vec<String> = val.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
                if origins.is_empty() { Settings::default().cors_origins } else { origins }
            }
            None => Settings::default().cors_origins,
        };
        Settings {
            environment: self.environment.clone(),
            cors_origins,
            rate_limit_max: self.rate_limit_max,
            rate_limit_window_ms: self.rate_limit_window,
            trust_proxy: self.trust_proxy,
            public_dir: self.public.is_dir().then(|| self.public.clone()),
            text_model: self.text_model.clone(),
        }
    }
}
