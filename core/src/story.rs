use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Creation time in milliseconds since the Unix epoch.
pub type StoryId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Adventure,
    Fantasy,
    Animals,
    Space,
    Ocean,
    Friendship,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Adventure,
        Theme::Fantasy,
        Theme::Animals,
        Theme::Space,
        Theme::Ocean,
        Theme::Friendship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Adventure => "adventure",
            Theme::Fantasy => "fantasy",
            Theme::Animals => "animals",
            Theme::Space => "space",
            Theme::Ocean => "ocean",
            Theme::Friendship => "friendship",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown theme '{}'", self.0)
    }
}

impl std::error::Error for UnknownTheme {}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub content: String,
    pub theme: Theme,
    pub tags: Vec<String>,
    /// RFC 3339 timestamp, e.g. 2024-01-01T00:00:00Z
    pub created_at: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
}

/// Story fields supplied by the caller; id, timestamp and counters are assigned by the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewStory {
    pub title: String,
    pub content: String,
    pub theme: Theme,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewStory {
    pub fn new(title: impl Into<String>, content: impl Into<String>, theme: Theme) -> Self {
        Self { title: title.into(), content: content.into(), theme, tags: Vec::new() }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
