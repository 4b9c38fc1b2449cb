//! Turning match cursors into printable rows
pub mod counter;
pub mod grepper;

pub use counter::{Counter, CounterFunction};
pub use grepper::{ColumnSpec, Grepper};

use crate::error::{BundleGrepError, Result};
use crate::output::Printable;
use crate::search::cursor::{MatchCursor, MatchView};
use crate::search::pattern::Pattern;
use std::collections::HashSet;

/// Options shared by every formatter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatterModifiers {
    /// Named group whose first observed value suppresses later matches
    /// carrying the same value.
    pub key: Option<String>,
    /// Emit one block per source instead of a single combined block.
    pub separate: bool,
}

impl FormatterModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn separate(mut self, separate: bool) -> Self {
        self.separate = separate;
        self
    }
}

/// First-occurrence-wins filter over the dedup key's values.
#[derive(Debug)]
pub(crate) struct DedupFilter<'a> {
    key: Option<&'a str>,
    seen: HashSet<String>,
}

impl<'a> DedupFilter<'a> {
    pub(crate) fn new(key: Option<&'a str>) -> Self {
        Self {
            key,
            seen: HashSet::new(),
        }
    }

    /// Whether `found` should be kept. Without a key everything is kept.
    pub(crate) fn admit(&mut self, found: &MatchView<'_>) -> Result<bool> {
        match self.key {
            None => Ok(true),
            Some(key) => Ok(self.seen.insert(found.group(key)?)),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.seen.clear();
    }
}

/// The two ways a request turns matches into output.
#[derive(Debug)]
pub enum Formatter {
    Grepper(Grepper),
    Counter(Counter),
}

impl Formatter {
    pub fn modifiers(&self) -> &FormatterModifiers {
        match self {
            Formatter::Grepper(grepper) => grepper.modifiers(),
            Formatter::Counter(counter) => counter.modifiers(),
        }
    }

    /// Every named group this formatter reads, the dedup key included.
    pub fn required_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = match self {
            Formatter::Grepper(grepper) => grepper.groups().collect(),
            Formatter::Counter(counter) => counter.function().groups().collect(),
        };
        if let Some(key) = self.modifiers().key.as_deref() {
            groups.push(key);
        }
        groups
    }

    /// Format every cursor from its start.
    ///
    /// Missing groups are reported before any cursor is read.
    pub fn format(&self, cursors: &mut [MatchCursor]) -> Result<Printable> {
        self.validate(cursors)?;
        for cursor in cursors.iter_mut() {
            cursor.reset();
        }
        match self {
            Formatter::Grepper(grepper) => grepper.format(cursors),
            Formatter::Counter(counter) => counter.format(cursors),
        }
    }

    /// Fails when `pattern` lacks a group this formatter reads.
    pub fn validate_pattern(&self, pattern: &Pattern) -> Result<()> {
        match self
            .required_groups()
            .into_iter()
            .find(|g| !pattern.has_group(g))
        {
            Some(missing) => Err(BundleGrepError::UnknownGroup(missing.to_string())),
            None => Ok(()),
        }
    }

    fn validate(&self, cursors: &[MatchCursor]) -> Result<()> {
        cursors
            .iter()
            .try_for_each(|cursor| self.validate_pattern(cursor.pattern()))
    }
}

impl From<Grepper> for Formatter {
    fn from(grepper: Grepper) -> Self {
        Formatter::Grepper(grepper)
    }
}

impl From<Counter> for Formatter {
    fn from(counter: Counter) -> Self {
        Formatter::Counter(counter)
    }
}
