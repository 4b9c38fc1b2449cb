//! Compiled search patterns and a bounded cache of them
use crate::error::{BundleGrepError, Result};
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use regex::bytes::{Regex, RegexBuilder};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

/// A regular expression with named capture groups, matched against
/// single-byte text.
///
/// Two patterns are equal when their source text is equal; the compiled
/// automaton never takes part in comparisons.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        // Unicode mode off: `.` and classes see bytes, which is what the
        // ISO-8859-1 view of a log file is made of.
        let regex = RegexBuilder::new(&to_byte_syntax(source)?)
            .unicode(false)
            .build()?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.group_names().any(|n| n == name)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite U+0080..=U+00FF as `\xHH` so each matches its single ISO-8859-1
/// byte instead of a UTF-8 sequence.
fn to_byte_syntax(source: &str) -> Result<String> {
    let mut translated = String::with_capacity(source.len());
    for c in source.chars() {
        match u32::from(c) {
            0..=0x7F => translated.push(c),
            code @ 0x80..=0xFF => translated.push_str(&format!("\\x{code:02X}")),
            _ => {
                return Err(BundleGrepError::Decode(format!(
                    "pattern character {c:?} cannot be represented in ISO-8859-1"
                )));
            }
        }
    }
    Ok(translated)
}

/// Compiled patterns keyed by source text
pub struct PatternCache {
    patterns: Mutex<LruCache<String, Pattern>>,
}

impl PatternCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity =
            NonZeroUsize::new(capacity).ok_or(BundleGrepError::InvalidCapacity(capacity))?;
        Ok(Self {
            patterns: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn get_or_compile(&self, source: &str) -> Result<Pattern> {
        if let Some(pattern) = self.patterns.lock().get(source) {
            return Ok(pattern.clone());
        }

        debug!("Compiling pattern: {source}");
        let pattern = Pattern::new(source)?;
        self.patterns.lock().put(source.to_string(), pattern.clone());
        Ok(pattern)
    }

    pub fn len(&self) -> usize {
        self.patterns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_is_textual() {
        let a = Pattern::new(r"(?<n>\d+) apples").unwrap();
        let b = Pattern::new(r"(?<n>\d+) apples").unwrap();
        let c = Pattern::new(r"(?<n>\d+)  apples").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_group_names() {
        let pattern = Pattern::new(r"(?<node>\S+) memory:(?<memory>\d+)").unwrap();
        assert!(pattern.has_group("node"));
        assert!(pattern.has_group("memory"));
        assert!(!pattern.has_group("vcores"));
    }

    #[test]
    fn test_dot_matches_high_bytes() {
        let pattern = Pattern::new("a.b").unwrap();
        assert!(pattern.regex().is_match(&[b'a', 0xE9, b'b']));
    }

    #[test]
    fn test_latin1_literal_and_class() {
        let literal = Pattern::new("café").unwrap();
        assert_eq!(literal.as_str(), "café");
        assert!(literal.regex().is_match(b"caf\xE9"));
        assert!(!literal.regex().is_match("café".as_bytes()));

        let class = Pattern::new("[àé]+").unwrap();
        let found = class.regex().find(b"x\xE0\xE9y").unwrap();
        assert_eq!(found.range(), 1..3);
    }

    #[test]
    fn test_characters_outside_latin1_are_rejected() {
        assert!(matches!(
            Pattern::new("price in €"),
            Err(BundleGrepError::Decode(_))
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            Pattern::new("(unclosed"),
            Err(BundleGrepError::Regex(_))
        ));
    }

    #[test]
    fn test_pattern_cache_reuses_and_evicts() {
        let cache = PatternCache::new(2).unwrap();
        cache.get_or_compile("a+").unwrap();
        cache.get_or_compile("a+").unwrap();
        assert_eq!(cache.len(), 1);

        cache.get_or_compile("b+").unwrap();
        cache.get_or_compile("c+").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_pattern_cache_rejects_zero_capacity() {
        assert!(matches!(
            PatternCache::new(0),
            Err(BundleGrepError::InvalidCapacity(0))
        ));
    }
}
