//! Immutable search requests
use crate::search::pattern::Pattern;
use serde::{Deserialize, Serialize, Serializer};
use std::hash::{Hash, Hasher};

/// The identity of a [`Query`] as seen by the caches: pattern text plus the
/// three category flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub pattern: String,
    pub primary: bool,
    pub secondary: bool,
    pub file_names: bool,
}

/// A pattern and the set of file categories it should be run against.
#[derive(Debug, Clone)]
pub struct Query {
    pattern: Pattern,
    key: QueryKey,
}

impl Query {
    pub fn builder(pattern: Pattern) -> QueryBuilder {
        QueryBuilder::new(pattern)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn searches_primary(&self) -> bool {
        self.key.primary
    }

    pub fn searches_secondary(&self) -> bool {
        self.key.secondary
    }

    pub fn searches_file_names(&self) -> bool {
        self.key.file_names
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.key.serialize(serializer)
    }
}

pub struct QueryBuilder {
    pattern: Pattern,
    primary: bool,
    secondary: bool,
    file_names: bool,
}

impl QueryBuilder {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            primary: false,
            secondary: false,
            file_names: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn secondary(mut self) -> Self {
        self.secondary = true;
        self
    }

    pub fn file_names(mut self) -> Self {
        self.file_names = true;
        self
    }

    pub fn build(self) -> Query {
        let key = QueryKey {
            pattern: self.pattern.as_str().to_string(),
            primary: self.primary,
            secondary: self.secondary,
            file_names: self.file_names,
        };
        Query {
            pattern: self.pattern,
            key,
        }
    }
}
