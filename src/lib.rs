//! Search and summarise the logs of an extracted diagnostic bundle.
//!
//! Log files are classified once by name into categories. Queries scan the
//! categories they ask for, their matched text is cached, and formatters turn
//! the matches into rows.
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod output;
pub mod request;
pub mod search;
pub mod text_source;

pub use cache::{Cache, InMemoryLruCache, MatchBlobSet, PersistentCache, SharedQueryCache};
pub use cli::Cli;
pub use config::Config;
pub use error::{BundleGrepError, Result};
pub use format::{ColumnSpec, Counter, CounterFunction, Formatter, FormatterModifiers, Grepper};
pub use output::{Printable, RowList};
pub use request::{ComposedRequest, Request, SearchRequest};
pub use search::{Category, Classifier, MatchCursor, Pattern, PatternCache, Query, SearchEngine};
pub use text_source::TextSource;
