use crate::error::ApiError;
use crate::generate::request_body;
use crate::html::{snippet, story_html};
use crate::validate::{parse_limit, preview, validate_prompt, Language, MAX_QUERY_CHARS};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use story_core::tokenizer::query_terms;
use story_core::{NewStory, Story, StoryId, Theme};

#[derive(Deserialize, Default)]
pub struct StoryRequest {
    pub prompt: Option<String>,
    pub theme: Option<String>,
    pub lang: Option<String>,
}

#[derive(Serialize)]
pub struct StoryResponse {
    pub story: Story,
    pub code: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub theme: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub theme: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    /// Stories matching the query before `limit` and the theme filter.
    pub total: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub score: u32,
    pub snippet: Option<String>,
    pub story: Story,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub total: usize,
    pub stories: Vec<Story>,
}

fn parse_theme(theme: Option<&str>) -> Result<Option<Theme>, ApiError> {
    match theme.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(t) => t.parse::<Theme>().map(Some).map_err(|_| {
            let names: Vec<&str> = Theme::ALL.iter().map(|t| t.as_str()).collect();
            ApiError::bad_request("That story theme isn't one we know", format!("Pick one of: {}", names.join(", ")))
        }),
    }
}

fn story_system_prompt(theme: Theme, lang: Language) -> String {
    let mut system = format!(
        "You are a gentle children's storyteller. Write a short, happy {theme} story for young readers \
         (about 200 words, a few short paragraphs). Put the story title alone on the first line."
    );
    if let Some(instruction) = lang.instruction() {
        system.push(' ');
        system.push_str(&instruction);
        system.push('.');
    }
    system
}

/// First non-empty line is the title, the rest is the body.
pub fn split_story(text: &str, theme: Theme) -> (String, String) {
    let text = text.trim();
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let title = first
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_start_matches("Title:")
        .trim()
        .trim_matches(|c| c == '"' || c == '*')
        .trim()
        .to_string();
    let content = rest.trim().to_string();
    match (title.is_empty(), content.is_empty()) {
        (_, true) => (format!("{} Story", capitalize(theme.as_str())), text.to_string()),
        (true, false) => (format!("{} Story", capitalize(theme.as_str())), content),
        (false, false) => (title, content),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn create_story(
    State(state): State<AppState>,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoryResponse>), ApiError> {
    let start = Instant::now();
    let body = request_body(payload);
    let prompt = validate_prompt(body.prompt.as_deref())?;
    let theme = parse_theme(body.theme.as_deref())?
        .ok_or_else(|| ApiError::bad_request("Please pick a theme for your story", "Like space, ocean or friendship"))?;
    let lang = Language::parse(body.lang.as_deref())?;

    tracing::info!(
        prompt_length = prompt.chars().count(),
        prompt_preview = %preview(prompt),
        theme = theme.as_str(),
        language = lang.code(),
        "story generation request"
    );

    let reply = state
        .generator
        .text(&story_system_prompt(theme, lang), prompt)
        .await
        .map_err(|source| ApiError::Generation { source, elapsed_ms: start.elapsed().as_millis() })?;

    let (title, content) = split_story(&reply, theme);
    let new = NewStory::new(title, content, theme).with_tags([theme.as_str(), lang.code()]);
    let story = state.store.write().insert(new).clone();

    tracing::info!(id = story.id, processing_ms = start.elapsed().as_millis() as u64, "story generated");
    let code = story_html(&story)?;
    Ok((StatusCode::CREATED, Json(StoryResponse { story, code })))
}

pub async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let limit = parse_limit(params.limit.as_deref())?;
    let theme = parse_theme(params.theme.as_deref())?;
    let store = state.store.read();
    Ok(Json(ListResponse { total: store.len(), stories: store.recent(limit, theme) }))
}

pub async fn search_stories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let Some(q) = params.q else {
        return Err(ApiError::bad_request("What story are you looking for?", "Add a search word, like ?q=dragon"));
    };
    if q.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError::bad_request(
            "Your search is too long!",
            format!("Please keep it under {MAX_QUERY_CHARS} characters"),
        ));
    }
    let limit = parse_limit(params.limit.as_deref())?;
    let theme = parse_theme(params.theme.as_deref())?;

    let (total, mut hits) = state.store.read().search_counted(&q, limit);
    if let Some(theme) = theme {
        hits.retain(|hit| hit.story.theme == theme);
    }

    let terms = query_terms(&q);
    let results: Vec<SearchHit> = hits
        .into_iter()
        .map(|hit| SearchHit { score: hit.score, snippet: snippet(&hit.story.content, &terms), story: hit.story })
        .collect();
    let took_ms = start.elapsed().as_millis();
    tracing::debug!(query_len = q.len(), total, hits = results.len(), took_ms = took_ms as u64, "story search");
    Ok(Json(SearchResponse { query: q, took_ms, total, results }))
}

fn story_not_found() -> ApiError {
    ApiError::not_found("We couldn't find that story! 📚", "It may have wandered off. Try searching for another one.")
}

pub async fn get_story(State(state): State<AppState>, Path(id): Path<StoryId>) -> Result<Json<Story>, ApiError> {
    let story = state.store.write().record_view(id).cloned();
    story.map(Json).ok_or_else(story_not_found)
}

pub async fn like_story(State(state): State<AppState>, Path(id): Path<StoryId>) -> Result<Json<Story>, ApiError> {
    let story = state.store.write().like(id).cloned();
    story.map(Json).ok_or_else(story_not_found)
}
