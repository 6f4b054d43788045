use crate::index::{KeywordIndex, Position, StoryIndex};
use crate::story::{NewStory, Story, StoryId, Theme};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredStory {
    pub score: u32,
    pub story: Story,
}

/// Owns the story collection and keeps its index in step with it.
///
/// Ids are creation times in milliseconds. When two stories land in the same
/// millisecond (or the clock steps back) the id is bumped past the previous
/// one, so ids are unique and stories stay sorted by id.
#[derive(Debug, Default)]
pub struct StoryStore<I = KeywordIndex> {
    stories: Vec<Story>,
    index: I,
}

impl StoryStore<KeywordIndex> {
    pub fn new() -> Self { Self::default() }
}

impl<I: StoryIndex> StoryStore<I> {
    pub fn with_index(mut index: I) -> Self {
        index.rebuild(&[]);
        Self { stories: Vec::new(), index }
    }

    pub fn insert(&mut self, new: NewStory) -> &Story { self.insert_at(new, OffsetDateTime::now_utc()) }

    pub fn insert_at(&mut self, new: NewStory, at: OffsetDateTime) -> &Story {
        let millis = (at.unix_timestamp_nanos() / 1_000_000) as StoryId;
        let id = match self.stories.last() {
            Some(last) if last.id >= millis => last.id + 1,
            _ => millis,
        };
        let story = Story {
            id,
            title: new.title,
            content: new.content,
            theme: new.theme,
            tags: new.tags,
            created_at: at.format(&Rfc3339).unwrap_or_default(),
            views: 0,
            likes: 0,
        };
        self.stories.push(story);
        self.index.on_insert(&self.stories);
        tracing::info!(id, total = self.stories.len(), "story stored");
        &self.stories[self.stories.len() - 1]
    }

    /// At most `limit` stories with their scores, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredStory> { self.search_counted(query, limit).1 }

    /// Like [`search`](Self::search), also returning how many stories matched before `limit`.
    pub fn search_counted(&self, query: &str, limit: usize) -> (usize, Vec<ScoredStory>) {
        let ranked: Vec<(Position, u32)> =
            self.index.rank(query).into_iter().filter(|(pos, _)| *pos < self.stories.len()).collect();
        let hits = ranked
            .iter()
            .take(limit)
            .map(|&(pos, score)| ScoredStory { score, story: self.stories[pos].clone() })
            .collect();
        (ranked.len(), hits)
    }

    pub fn get(&self, id: StoryId) -> Option<&Story> {
        self.position_of(id).map(|pos| &self.stories[pos])
    }

    pub fn record_view(&mut self, id: StoryId) -> Option<&Story> {
        let pos = self.position_of(id)?;
        let story = &mut self.stories[pos];
        story.views += 1;
        Some(&*story)
    }

    pub fn like(&mut self, id: StoryId) -> Option<&Story> {
        let pos = self.position_of(id)?;
        let story = &mut self.stories[pos];
        story.likes += 1;
        Some(&*story)
    }

    /// Newest first, optionally restricted to one theme.
    pub fn recent(&self, limit: usize, theme: Option<Theme>) -> Vec<Story> {
        self.stories
            .iter()
            .rev()
            .filter(|s| theme.map_or(true, |t| s.theme == t))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stories(&self) -> &[Story] { &self.stories }

    pub fn index(&self) -> &I { &self.index }

    pub fn len(&self) -> usize { self.stories.len() }

    pub fn is_empty(&self) -> bool { self.stories.is_empty() }

    fn position_of(&self, id: StoryId) -> Option<usize> {
        self.stories.binary_search_by_key(&id, |s| s.id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn ids_are_unique_within_one_millisecond() {
        let mut store = StoryStore::new();
        let at = datetime!(2024-01-01 0:00 UTC);
        let a = store.insert_at(NewStory::new("One", "first", Theme::Space), at).id;
        let b = store.insert_at(NewStory::new("Two", "second", Theme::Space), at).id;
        let c = store.insert_at(NewStory::new("Three", "third", Theme::Space), datetime!(2023-12-31 0:00 UTC)).id;
        assert_eq!(a, 1_704_067_200_000);
        assert_eq!(b, a + 1);
        assert_eq!(c, b + 1);
        assert_eq!(store.get(b).unwrap().title, "Two");
        assert_eq!(store.stories()[0].created_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn counters_update_in_place() {
        let mut store = StoryStore::new();
        let id = store.insert(NewStory::new("Ocean Song", "whales sing", Theme::Ocean)).id;
        store.record_view(id);
        store.record_view(id);
        let liked = store.like(id).unwrap();
        assert_eq!((liked.views, liked.likes), (2, 1));
        assert!(store.like(id + 1000).is_none());
    }

    #[test]
    fn recent_is_newest_first_and_filters_theme() {
        let mut store = StoryStore::new();
        store.insert(NewStory::new("A", "one", Theme::Space));
        store.insert(NewStory::new("B", "two", Theme::Ocean));
        store.insert(NewStory::new("C", "three", Theme::Space));
        let titles: Vec<_> = store.recent(10, None).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);
        let space: Vec<_> = store.recent(1, Some(Theme::Space)).into_iter().map(|s| s.title).collect();
        assert_eq!(space, vec!["C"]);
    }

    #[derive(Default)]
    struct CountingIndex {
        inner: KeywordIndex,
        rebuilds: usize,
    }

    impl StoryIndex for CountingIndex {
        fn rebuild(&mut self, stories: &[Story]) {
            self.rebuilds += 1;
            self.inner.rebuild(stories);
        }

        fn rank(&self, query: &str) -> Vec<(crate::Position, u32)> { self.inner.rank(query) }
    }

    #[test]
    fn custom_index_is_driven_by_inserts() {
        let mut store = StoryStore::with_index(CountingIndex::default());
        store.insert(NewStory::new("Kite", "windy day", Theme::Adventure));
        store.insert(NewStory::new("Boat", "windy lake", Theme::Adventure));
        assert_eq!(store.index().rebuilds, 3);
        assert_eq!(store.search("windy", 10).len(), 2);
    }

    #[test]
    fn counted_search_reports_matches_beyond_the_limit() {
        let mut store = StoryStore::new();
        store.insert(NewStory::new("Kite", "windy day", Theme::Adventure));
        store.insert(NewStory::new("Boat", "windy lake", Theme::Ocean));
        store.insert(NewStory::new("Moon", "quiet night", Theme::Space));
        let (total, hits) = store.search_counted("windy", 1);
        assert_eq!(total, 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(store.search_counted("windy", 0), (2, Vec::new()));
    }
}
