use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use story_server::config::Config;
use story_server::generator::{OpenAiClient, OpenAiConfig};
use story_server::{build_app, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    let config = Config::parse();
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; generation requests will fail");
    }

    let generator = OpenAiClient::new(OpenAiConfig {
        api_key: config.openai_api_key.clone(),
        base_url: config.openai_base_url.clone(),
        text_model: config.text_model.clone(),
    })?;
    let settings = config.settings();
    tracing::info!(
        environment = %settings.environment,
        cors = ?settings.cors_origins,
        rate_limit_max = settings.rate_limit_max,
        rate_limit_window_ms = settings.rate_limit_window_ms,
        trust_proxy = settings.trust_proxy,
        public_dir = ?settings.public_dir,
        "configuration loaded"
    );
    let app = build_app(AppState::new(settings, Arc::new(generator)))?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
