//! Query model, match cursors and the search engine
pub mod cursor;
pub mod engine;
pub mod handler;
pub mod pattern;
pub mod query;

pub use cursor::{Haystack, MatchCursor, MatchView};
pub use engine::{Category, Classifier, LogSource, SearchEngine};
pub use handler::QueryCacheHandler;
pub use pattern::{Pattern, PatternCache};
pub use query::{Query, QueryBuilder, QueryKey};
