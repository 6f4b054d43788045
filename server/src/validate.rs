use crate::error::ApiError;
use crate::generator::ImageModel;

pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MAX_QUERY_CHARS: usize = 200;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 50;

const BLOCKED_WORDS: &[&str] = &[
    "violence", "scary", "dangerous", "weapon", "blood", "death", "kill", "hurt", "fight", "war", "monster", "ghost",
    "demon", "nightmare", "terror", "horror", "evil", "dark", "destroy",
];

/// Substring match, so "warm" is rejected along with "war".
pub fn is_kid_friendly(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    !BLOCKED_WORDS.iter().any(|w| lower.contains(w))
}

pub fn validate_prompt(prompt: Option<&str>) -> Result<&str, ApiError> {
    let prompt = match prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => {
            return Err(ApiError::bad_request(
                "Please provide a creative prompt for your AI art!",
                r#"Tell me what you want to create - like "a happy rainbow dragon" or "a magical castle in the clouds""#,
            ))
        }
    };
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(ApiError::bad_request(
            "Your prompt is too long!",
            format!("Please keep your creative idea under {MAX_PROMPT_CHARS} characters"),
        ));
    }
    if !is_kid_friendly(prompt) {
        return Err(ApiError::bad_request(
            "Let's keep it fun and friendly! 😊",
            "Try describing something happy, colorful, or magical instead",
        ));
    }
    Ok(prompt)
}

/// "512x512" (fast) or "1024x1024" (detailed, the default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    Fast,
    #[default]
    Detailed,
}

impl ImageSize {
    pub fn parse(size: Option<&str>) -> Result<Self, ApiError> {
        match size {
            None | Some("") => Ok(ImageSize::default()),
            Some("512x512") => Ok(ImageSize::Fast),
            Some("1024x1024") => Ok(ImageSize::Detailed),
            Some(_) => Err(ApiError::bad_request(
                "Invalid image size selected",
                r#"Please choose either "Fast" or "Detailed" option"#,
            )),
        }
    }

    /// Fast images come from dall-e-2 at 256x256.
    pub fn model(&self) -> (ImageModel, &'static str) {
        match self {
            ImageSize::Fast => (ImageModel::DallE2, "256x256"),
            ImageSize::Detailed => (ImageModel::DallE3, "1024x1024"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Hebrew,
    Spanish,
    French,
}

impl Language {
    pub fn parse(lang: Option<&str>) -> Result<Self, ApiError> {
        match lang {
            None | Some("") | Some("en") => Ok(Language::English),
            Some("he") => Ok(Language::Hebrew),
            Some("es") => Ok(Language::Spanish),
            Some("fr") => Ok(Language::French),
            Some(_) => Err(ApiError::bad_request(
                "Unsupported language selected",
                "Available languages: English, Hebrew, Spanish, French",
            )),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hebrew => "he",
            Language::Spanish => "es",
            Language::French => "fr",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hebrew => "Hebrew",
            Language::Spanish => "Spanish",
            Language::French => "French",
        }
    }

    /// `None` for English.
    pub fn instruction(&self) -> Option<String> {
        match self {
            Language::English => None,
            other => Some(format!("Respond in {}", other.name())),
        }
    }
}

/// Positive integer no larger than [`MAX_SEARCH_LIMIT`]; absent means [`DEFAULT_SEARCH_LIMIT`].
pub fn parse_limit(limit: Option<&str>) -> Result<usize, ApiError> {
    let Some(raw) = limit else {
        return Ok(DEFAULT_SEARCH_LIMIT);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_SEARCH_LIMIT).contains(&n) => Ok(n),
        _ => Err(ApiError::bad_request(
            "That search limit doesn't look right",
            format!("Use a whole number between 1 and {MAX_SEARCH_LIMIT}"),
        )),
    }
}

/// Short, single-line preview of a prompt for logs.
pub fn preview(prompt: &str) -> String {
    let mut out: String = prompt.chars().take(50).collect();
    if prompt.chars().count() > 50 {
        out.push_str("...");
    }
    out
}
