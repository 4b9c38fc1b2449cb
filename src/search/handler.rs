//! Conversion between live match cursors and cached blob sets
use crate::cache::{MatchBlobSet, SharedQueryCache};
use crate::search::cursor::MatchCursor;
use crate::search::query::Query;
use log::{debug, warn};
use rayon::prelude::*;

/// Makes cache hits look like fresh scans to the search engine's caller.
pub struct QueryCacheHandler {
    cache: Option<SharedQueryCache>,
    parallel: bool,
}

impl QueryCacheHandler {
    pub fn new(cache: Option<SharedQueryCache>) -> Self {
        Self {
            cache,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Drain every cursor into a blob and store the non-empty blobs under
    /// `query`. The cursors are rewound afterwards.
    pub fn write(&self, query: &Query, cursors: &mut [MatchCursor]) {
        let Some(cache) = &self.cache else {
            return;
        };

        let drained: Vec<String> = if self.parallel {
            cursors.par_iter_mut().map(MatchCursor::drain_to_blob).collect()
        } else {
            cursors.iter_mut().map(MatchCursor::drain_to_blob).collect()
        };
        let blobs: Vec<String> = drained.into_iter().filter(|b| !b.is_empty()).collect();

        debug!(
            "Caching {} blob(s) from {} source(s) for {:?}",
            blobs.len(),
            cursors.len(),
            query.pattern()
        );
        cache.set(query.clone(), MatchBlobSet::new(blobs));
    }

    /// Rebuild cursors from the cached blobs, one per blob, each running the
    /// query's pattern over the blob text. `None` means the query is not
    /// cached; `Some(vec![])` means it is cached and matched nothing.
    pub fn read(&self, query: &Query) -> Option<Vec<MatchCursor>> {
        let cache = self.cache.as_ref()?;
        let stored = cache.get(query)?;

        let mut cursors = Vec::with_capacity(stored.len());
        for (i, blob) in stored.blobs().iter().enumerate() {
            match MatchCursor::over_text(query.pattern().clone(), format!("cached-{i}"), blob) {
                Ok(cursor) => cursors.push(cursor),
                Err(e) => {
                    warn!("Discarding unreadable cache entry: {e}");
                    return None;
                }
            }
        }
        Some(cursors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, InMemoryLruCache};
    use crate::search::pattern::Pattern;
    use std::sync::Arc;

    fn query() -> Query {
        Query::builder(Pattern::new("TEST.*TEXT").unwrap())
            .primary()
            .build()
    }

    fn cursor(text: &str) -> MatchCursor {
        MatchCursor::over_text(query().pattern().clone(), "file", text).unwrap()
    }

    #[test]
    fn test_write_keeps_only_matching_sources() {
        let cache: SharedQueryCache = Arc::new(InMemoryLruCache::new(4).unwrap());
        let handler = QueryCacheHandler::new(Some(cache.clone()));

        let mut cursors = vec![
            cursor("a TEST_22_TEXT b\nTESTTEXT\n"),
            cursor("nothing here\n"),
            cursor("TEST_SOME_TEXT\n"),
        ];
        handler.write(&query(), &mut cursors);

        let stored = cache.get(&query()).unwrap();
        assert_eq!(stored.blobs(), ["TEST_22_TEXT\nTESTTEXT\n", "TEST_SOME_TEXT\n"]);
    }

    #[test]
    fn test_write_rewinds_cursors() {
        let cache: SharedQueryCache = Arc::new(InMemoryLruCache::new(4).unwrap());
        let handler = QueryCacheHandler::new(Some(cache));

        let mut cursors = vec![cursor("TESTTEXT\n")];
        handler.write(&query(), &mut cursors);
        assert_eq!(cursors[0].next_match().unwrap().text(), "TESTTEXT");
    }

    #[test]
    fn test_read_builds_one_cursor_per_blob() {
        let cache: SharedQueryCache = Arc::new(InMemoryLruCache::new(4).unwrap());
        cache.set(
            query(),
            MatchBlobSet::new(vec![
                "TEST_READING_TEXT\nTEST__TEXT\n".to_string(),
                "TEST_CACHE_TEXT\n".to_string(),
            ]),
        );
        let handler = QueryCacheHandler::new(Some(cache));

        let mut cursors = handler.read(&query()).unwrap();
        assert_eq!(cursors.len(), 2);
        assert_eq!(cursors[0].drain_to_blob(), "TEST_READING_TEXT\nTEST__TEXT\n");
        assert_eq!(cursors[1].drain_to_blob(), "TEST_CACHE_TEXT\n");
    }

    #[test]
    fn test_empty_entry_is_a_hit() {
        let cache: SharedQueryCache = Arc::new(InMemoryLruCache::new(4).unwrap());
        let handler = QueryCacheHandler::new(Some(cache));

        assert!(handler.read(&query()).is_none());
        handler.write(&query(), &mut [cursor("no match\n")]);
        assert_eq!(handler.read(&query()).map(|c| c.len()), Some(0));
    }

    #[test]
    fn test_without_cache_everything_is_a_miss() {
        let handler = QueryCacheHandler::new(None);
        handler.write(&query(), &mut [cursor("TESTTEXT\n")]);
        assert!(handler.read(&query()).is_none());
        assert!(!handler.is_enabled());
    }

    #[test]
    fn test_unencodable_blob_is_a_miss() {
        let cache: SharedQueryCache = Arc::new(InMemoryLruCache::new(4).unwrap());
        cache.set(query(), MatchBlobSet::new(vec!["TEST☃TEXT\n".to_string()]));
        let handler = QueryCacheHandler::new(Some(cache));
        assert!(handler.read(&query()).is_none());
    }
}
