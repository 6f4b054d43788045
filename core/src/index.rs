use crate::tokenizer::{query_terms, story_text, tokenize};
use crate::Story;
use std::collections::{BTreeSet, HashMap};

/// Index of a story within its owning collection at the time of the last rebuild.
pub type Position = usize;

pub const EXACT_MATCH_SCORE: u32 = 3;
pub const FUZZY_MATCH_SCORE: u32 = 1;

/// Indexing strategy used by [`crate::StoryStore`].
///
/// `on_insert` is called after every append with the full collection. The default
/// rebuilds from scratch; an incremental strategy only needs to override it.
pub trait StoryIndex {
    fn rebuild(&mut self, stories: &[Story]);

    fn on_insert(&mut self, stories: &[Story]) {
        self.rebuild(stories);
    }

    /// Positions with their aggregate score, best first, ties in insertion order.
    fn rank(&self, query: &str) -> Vec<(Position, u32)>;
}

/// Inverted index from lowercase word to the positions of the stories containing it.
#[derive(Debug, Default, Clone)]
pub struct KeywordIndex {
    words: HashMap<String, BTreeSet<Position>>,
    num_stories: usize,
}

impl KeywordIndex {
    pub fn new() -> Self { Self::default() }

    pub fn build(stories: &[Story]) -> Self {
        let mut index = Self::new();
        index.rebuild(stories);
        index
    }

    pub fn rebuild(&mut self, stories: &[Story]) {
        self.words.clear();
        for (pos, story) in stories.iter().enumerate() {
            for word in tokenize(&story_text(story)) {
                self.words.entry(word).or_default().insert(pos);
            }
        }
        self.num_stories = stories.len();
        tracing::debug!(num_stories = self.num_stories, num_words = self.words.len(), "keyword index rebuilt");
    }

    pub fn positions(&self, word: &str) -> Option<&BTreeSet<Position>> { self.words.get(word) }

    pub fn num_words(&self) -> usize { self.words.len() }

    pub fn num_stories(&self) -> usize { self.num_stories }

    pub fn rank(&self, query: &str) -> Vec<(Position, u32)> {
        let mut scores: HashMap<Position, u32> = HashMap::new();
        for term in query_terms(query) {
            if let Some(exact) = self.words.get(&term) {
                for &pos in exact {
                    *scores.entry(pos).or_insert(0) += EXACT_MATCH_SCORE;
                }
            }
            // Every indexed word is visited for every term; an exact hit also lands here.
            for (word, positions) in &self.words {
                if word.contains(term.as_str()) || term.contains(word.as_str()) {
                    for &pos in positions {
                        *scores.entry(pos).or_insert(0) += FUZZY_MATCH_SCORE;
                    }
                }
            }
        }

        let mut ranked: Vec<(Position, u32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// At most `limit` stories in ranked order.
    pub fn search<'a>(&self, stories: &'a [Story], query: &str, limit: usize) -> Vec<&'a Story> {
        if limit == 0 {
            return Vec::new();
        }
        self.rank(query)
            .into_iter()
            .filter_map(|(pos, _)| stories.get(pos))
            .take(limit)
            .collect()
    }
}

impl StoryIndex for KeywordIndex {
    fn rebuild(&mut self, stories: &[Story]) { KeywordIndex::rebuild(self, stories) }

    fn rank(&self, query: &str) -> Vec<(Position, u32)> { KeywordIndex::rank(self, query) }
}
