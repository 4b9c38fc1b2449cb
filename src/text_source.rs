//! Memory-mapped, lazily decoded character view over a log file
//!
//! Log bundles are decoded with ISO-8859-1: every byte is exactly one
//! character, so indexing by byte offset and indexing by character agree and
//! nothing has to be decoded up front.
use crate::error::{BundleGrepError, Result};
use log::debug;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Read-only view of a file's bytes as single-byte characters.
pub struct TextSource {
    path: PathBuf,
    content: MappedContent,
}

enum MappedContent {
    Mapped(Mmap),
    // Zero-length files cannot be mapped on every platform.
    Empty,
}

impl TextSource {
    /// Map `path` into memory without reading or decoding it.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| BundleGrepError::FileProcessing {
            path: path.to_path_buf(),
            source: e,
        })?;
        let len = file
            .metadata()
            .map_err(|e| BundleGrepError::FileProcessing {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();

        let content = if len == 0 {
            MappedContent::Empty
        } else {
            // SAFETY: the bundle directory is not modified while a query runs.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
                BundleGrepError::FileProcessing {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
            MappedContent::Mapped(mmap)
        };

        debug!("Mapped {:?} ({} bytes)", path, len);
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.content {
            MappedContent::Mapped(mmap) => mmap,
            MappedContent::Empty => &[],
        }
    }

    /// Number of characters, which is also the number of bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.as_bytes().get(index).map(|&b| char::from(b))
    }

    /// Decode only the characters in `start..end`.
    pub fn sub_sequence(&self, start: usize, end: usize) -> Result<String> {
        let bytes = self.as_bytes();
        if start > end || end > bytes.len() {
            return Err(BundleGrepError::Decode(format!(
                "range {start}..{end} is outside of {} ({} characters)",
                self.path.display(),
                bytes.len()
            )));
        }
        Ok(decode_latin1(&bytes[start..end]))
    }
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode_latin1(self.as_bytes()))
    }
}

impl fmt::Debug for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSource")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}

/// ISO-8859-1 decoding never fails: byte `b` is code point `U+00b`.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`decode_latin1`]; fails on characters above `U+00FF`.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                BundleGrepError::Decode(format!(
                    "character {c:?} cannot be represented in ISO-8859-1"
                ))
            })
        })
        .collect()
}

/// Like [`encode_latin1`], but characters above `U+00FF` become `?`.
pub fn encode_latin1_lossy(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
