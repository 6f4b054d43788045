use crate::Story;

/// Tokens must be strictly longer than this (in chars) to be indexed.
pub const MIN_WORD_LEN: usize = 2;

/// Lowercase and split on whitespace, keeping tokens longer than [`MIN_WORD_LEN`].
/// Punctuation stays attached to its token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_WORD_LEN)
        .map(str::to_string)
        .collect()
}

/// Lowercase and split a query on whitespace. No length filter; duplicates are kept.
pub fn query_terms(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Title, content and tags joined by single spaces.
pub fn story_text(story: &Story) -> String {
    let mut text = String::with_capacity(story.title.len() + story.content.len() + 16);
    text.push_str(&story.title);
    text.push(' ');
    text.push_str(&story.content);
    text.push(' ');
    text.push_str(&story.tags.join(" "));
    text
}
