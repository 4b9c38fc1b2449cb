//! Stateful match iteration over one text source
use crate::error::{BundleGrepError, Result};
use crate::search::pattern::Pattern;
use crate::text_source::{TextSource, decode_latin1, encode_latin1};
use regex::bytes::Captures;
use std::fmt;
use std::ops::Range;

/// The text a cursor runs its pattern over.
pub enum Haystack {
    /// Contents of a log file
    Mapped(TextSource),
    /// A file name or a cached blob
    Owned(Vec<u8>),
}

impl Haystack {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Haystack::Mapped(source) => source.as_bytes(),
            Haystack::Owned(bytes) => bytes,
        }
    }
}

/// Pairs a [`Pattern`] with a [`Haystack`] and yields successive
/// non-overlapping matches on demand.
pub struct MatchCursor {
    pattern: Pattern,
    haystack: Haystack,
    label: String,
    position: usize,
    last_end: Option<usize>,
}

impl MatchCursor {
    pub fn new(pattern: Pattern, haystack: Haystack, label: impl Into<String>) -> Self {
        Self {
            pattern,
            haystack,
            label: label.into(),
            position: 0,
            last_end: None,
        }
    }

    pub fn over_file(pattern: Pattern, source: TextSource) -> Self {
        let label = source
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.path().display().to_string());
        Self::new(pattern, Haystack::Mapped(source), label)
    }

    pub fn over_text(pattern: Pattern, label: impl Into<String>, text: &str) -> Result<Self> {
        Ok(Self::new(pattern, Haystack::Owned(encode_latin1(text)?), label))
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Name of the source this cursor reads, for display and logging.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn next_match(&mut self) -> Option<MatchView<'_>> {
        let bytes = self.haystack.as_bytes();
        loop {
            if self.position > bytes.len() {
                return None;
            }
            let captures = self.pattern.regex().captures_at(bytes, self.position)?;
            let whole = captures.get(0)?;
            // An empty match right where the previous one ended would repeat it.
            if whole.is_empty() && self.last_end == Some(whole.end()) {
                self.position = whole.end() + 1;
                continue;
            }
            self.position = whole.end();
            self.last_end = Some(whole.end());
            return Some(MatchView {
                captures,
                pattern: &self.pattern,
            });
        }
    }

    /// Rewind to the start of the haystack.
    pub fn reset(&mut self) {
        self.position = 0;
        self.last_end = None;
    }

    /// Concatenate every remaining match followed by a newline, then rewind.
    pub fn drain_to_blob(&mut self) -> String {
        let mut blob = String::new();
        while let Some(found) = self.next_match() {
            blob.push_str(&found.text());
            blob.push('\n');
        }
        self.reset();
        blob
    }
}

impl fmt::Debug for MatchCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchCursor")
            .field("pattern", &self.pattern)
            .field("label", &self.label)
            .field("position", &self.position)
            .finish()
    }
}

/// One match produced by a [`MatchCursor`].
pub struct MatchView<'a> {
    captures: Captures<'a>,
    pattern: &'a Pattern,
}

impl MatchView<'_> {
    pub fn text(&self) -> String {
        self.captures
            .get(0)
            .map(|m| decode_latin1(m.as_bytes()))
            .unwrap_or_default()
    }

    pub fn range(&self) -> Range<usize> {
        self.captures.get(0).map(|m| m.range()).unwrap_or(0..0)
    }

    /// Value of a named group. A group that exists but did not take part in
    /// the match reads as an empty string.
    pub fn group(&self, name: &str) -> Result<String> {
        if !self.pattern.has_group(name) {
            return Err(BundleGrepError::UnknownGroup(name.to_string()));
        }
        Ok(self
            .captures
            .name(name)
            .map(|m| decode_latin1(m.as_bytes()))
            .unwrap_or_default())
    }
}
