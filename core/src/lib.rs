//! In-memory story collection with a keyword index for ranked, substring-tolerant search.

pub mod index;
pub mod store;
pub mod story;
pub mod tokenizer;

pub use index::{KeywordIndex, Position, StoryIndex, EXACT_MATCH_SCORE, FUZZY_MATCH_SCORE};
pub use store::{ScoredStory, StoryStore};
pub use story::{NewStory, Story, StoryId, Theme, UnknownTheme};
