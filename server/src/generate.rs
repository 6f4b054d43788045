use crate::error::ApiError;
use crate::generator::ImageRequest;
use crate::html::{image_html, strip_code_fences};
use crate::validate::{preview, validate_prompt, ImageSize, Language};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const CODE_SYSTEM_PROMPT: &str = "You are a friendly coding helper for children. Reply with one complete, \
self-contained HTML document that uses inline CSS and JavaScript to build what the child asks for. \
Keep it colorful, safe and playful. Reply with the code only.";

#[derive(Deserialize, Default)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub size: Option<String>,
    pub lang: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMetadata {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'static str>,
    pub processing_time: u128,
    pub language: &'static str,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub code: String,
    pub metadata: GenerateMetadata,
}

/// Unreadable or non-object bodies are treated like a missing prompt.
pub(crate) fn request_body<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(%rejection, "unreadable request body");
            T::default()
        }
    }
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let start = Instant::now();
    let body = request_body(payload);
    let prompt = validate_prompt(body.prompt.as_deref())?;
    let size = ImageSize::parse(body.size.as_deref())?;
    let lang = Language::parse(body.lang.as_deref())?;
    let (model, image_size) = size.model();

    tracing::info!(
        prompt_length = prompt.chars().count(),
        prompt_preview = %preview(prompt),
        model = model.as_str(),
        size = image_size,
        language = lang.code(),
        "image generation request"
    );

    let request = ImageRequest { model, size: image_size, prompt: prompt.to_string() };
    let url = state
        .generator
        .image(&request)
        .await
        .map_err(|source| ApiError::Generation { source, elapsed_ms: start.elapsed().as_millis() })?;

    let processing_time = start.elapsed().as_millis();
    tracing::info!(model = model.as_str(), size = image_size, processing_ms = processing_time as u64, "image generated");

    let instruction = lang.instruction();
    Ok(Json(GenerateResponse {
        code: image_html(&url, prompt, instruction.as_deref())?,
        metadata: GenerateMetadata {
            model: model.as_str().to_string(),
            size: Some(image_size),
            processing_time,
            language: lang.code(),
        },
    }))
}

pub async fn generate_code(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let start = Instant::now();
    let body = request_body(payload);
    let prompt = validate_prompt(body.prompt.as_deref())?;
    let lang = Language::parse(body.lang.as_deref())?;

    tracing::info!(
        prompt_length = prompt.chars().count(),
        prompt_preview = %preview(prompt),
        language = lang.code(),
        "code generation request"
    );

    let system = match lang.instruction() {
        Some(instruction) => format!("{CODE_SYSTEM_PROMPT} {instruction} for any visible text."),
        None => CODE_SYSTEM_PROMPT.to_string(),
    };
    let reply = state
        .generator
        .text(&system, prompt)
        .await
        .map_err(|source| ApiError::Generation { source, elapsed_ms: start.elapsed().as_millis() })?;

    let processing_time = start.elapsed().as_millis();
    tracing::info!(processing_ms = processing_time as u64, "code generated");
    Ok(Json(GenerateResponse {
        code: strip_code_fences(&reply),
        metadata: GenerateMetadata {
            model: state.settings.text_model.clone(),
            size: None,
            processing_time,
            language: lang.code(),
        },
    }))
}
