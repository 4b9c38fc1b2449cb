//! Core search engine: classifies a log directory once, then answers queries
//! from the cache or by scanning.
use crate::cache::SharedQueryCache;
use crate::config::Config;
use crate::error::{BundleGrepError, Result};
use crate::search::cursor::{Haystack, MatchCursor};
use crate::search::handler::QueryCacheHandler;
use crate::search::query::Query;
use crate::text_source::{TextSource, encode_latin1_lossy};
use log::{debug, info};
use rayon::prelude::*;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Role a log file was written by, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Primary,
    Secondary,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Primary => write!(f, "primary"),
            Category::Secondary => write!(f, "secondary"),
        }
    }
}

/// Filename patterns deciding which category a file belongs to.
#[derive(Debug, Clone)]
pub struct Classifier {
    primary: Regex,
    secondary: Regex,
}

impl Classifier {
    pub fn new(primary: &str, secondary: &str) -> Result<Self> {
        Ok(Self {
            primary: Regex::new(primary)?,
            secondary: Regex::new(secondary)?,
        })
    }

    /// Every category whose pattern occurs in `file_name`.
    pub fn classify(&self, file_name: &str) -> Vec<Category> {
        let mut categories = Vec::new();
        if self.primary.is_match(file_name) {
            categories.push(Category::Primary);
        }
        if self.secondary.is_match(file_name) {
            categories.push(Category::Secondary);
        }
        categories
    }
}

/// A file in the log directory together with its categories.
#[derive(Debug, Clone)]
pub struct LogSource {
    path: PathBuf,
    file_name: String,
    categories: Vec<Category>,
}

impl LogSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_in(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Display label: the first category, or "untyped".
    pub fn label(&self) -> String {
        self.categories
            .first()
            .map(Category::to_string)
            .unwrap_or_else(|| "untyped".to_string())
    }
}

enum ScanTarget<'a> {
    Content(&'a LogSource),
    FileName(&'a LogSource),
}

/// Main search engine that coordinates classification, caching and scanning
pub struct SearchEngine {
    log_dir: PathBuf,
    sources: Vec<LogSource>,
    handler: QueryCacheHandler,
    parallel: bool,
}

impl SearchEngine {
    /// List and classify the files directly inside `log_dir`.
    ///
    /// Fails if the directory does not exist or holds no files.
    pub fn new(
        log_dir: &Path,
        classifier: &Classifier,
        cache: Option<SharedQueryCache>,
    ) -> Result<Self> {
        if !log_dir.is_dir() {
            return Err(BundleGrepError::MissingLogDirectory(log_dir.to_path_buf()));
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(log_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let categories = classifier.classify(&file_name);
            debug!("Classified {file_name} as {categories:?}");
            sources.push(LogSource {
                path: entry.into_path(),
                file_name,
                categories,
            });
        }

        if sources.is_empty() {
            return Err(BundleGrepError::EmptyLogDirectory(log_dir.to_path_buf()));
        }

        info!(
            "Search engine ready over {} ({} files, {} primary, {} secondary)",
            log_dir.display(),
            sources.len(),
            sources.iter().filter(|s| s.is_in(Category::Primary)).count(),
            sources.iter().filter(|s| s.is_in(Category::Secondary)).count(),
        );

        Ok(Self {
            log_dir: log_dir.to_path_buf(),
            sources,
            handler: QueryCacheHandler::new(cache),
            parallel: true,
        })
    }

    /// Resolve the log directory inside an extracted bundle and build an
    /// engine with the configured classification and scan mode.
    pub fn from_bundle(
        bundle_root: &Path,
        config: &Config,
        cache: Option<SharedQueryCache>,
    ) -> Result<Self> {
        let log_dir = config.layout.log_dir(bundle_root);
        let classifier = config.categories.classifier()?;
        Ok(Self::new(&log_dir, &classifier, cache)?
            .with_parallel_scan(config.search.parallel_scan))
    }

    pub fn with_parallel_scan(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self.handler = self.handler.with_parallel(parallel);
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn sources(&self) -> &[LogSource] {
        &self.sources
    }

    pub fn sources_in(&self, category: Category) -> impl Iterator<Item = &LogSource> {
        self.sources.iter().filter(move |s| s.is_in(category))
    }

    /// Execute `query`, answering from the cache when possible.
    ///
    /// Returns one cursor per scanned source. Any unreadable file fails the
    /// whole query.
    pub fn create_matchers(&self, query: &Query) -> Result<Vec<MatchCursor>> {
        if let Some(cursors) = self.handler.read(query) {
            debug!("Query is present in the cache");
            return Ok(cursors);
        }

        debug!("Query is not present in the cache");
        let mut cursors = self.scan(query)?;
        self.handler.write(query, &mut cursors);
        Ok(cursors)
    }

    fn scan(&self, query: &Query) -> Result<Vec<MatchCursor>> {
        let mut targets = Vec::new();
        if query.searches_primary() {
            targets.extend(self.sources_in(Category::Primary).map(ScanTarget::Content));
        }
        if query.searches_secondary() {
            targets.extend(self.sources_in(Category::Secondary).map(ScanTarget::Content));
        }
        if query.searches_file_names() {
            targets.extend(self.sources.iter().map(ScanTarget::FileName));
        }

        if self.parallel {
            targets
                .par_iter()
                .map(|target| Self::open_cursor(query, target))
                .collect()
        } else {
            targets
                .iter()
                .map(|target| Self::open_cursor(query, target))
                .collect()
        }
    }

    fn open_cursor(query: &Query, target: &ScanTarget<'_>) -> Result<MatchCursor> {
        let pattern = query.pattern().clone();
        match target {
            ScanTarget::Content(source) => {
                debug!("Checking file: {}", source.file_name());
                let text = TextSource::open(source.path())?;
                Ok(MatchCursor::over_file(pattern, text))
            }
            ScanTarget::FileName(source) => {
                debug!("Check filename: {}", source.file_name());
                let name = source.file_name();
                Ok(MatchCursor::new(
                    pattern,
                    Haystack::Owned(encode_latin1_lossy(name)),
                    name,
                ))
            }
        }
    }
}
