//! File-backed cache that survives process restarts
//!
//! Every key owns one file in the target directory, named by the hex SHA-256
//! of the key's JSON form. The file holds a versioned envelope with both the
//! key and the value, so a read can tell its own entry from a colliding one.
use crate::cache::Cache;
use crate::error::Result;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EntryRef<'a, K, V> {
    version: u32,
    key: &'a K,
    value: &'a V,
}

#[derive(Deserialize)]
struct StoredEntry<V> {
    version: u32,
    key: serde_json::Value,
    value: V,
}

/// What the last look at an entry file found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Present,
    Missing,
    /// The file existed but did not hold this key's entry. Stays a miss
    /// until the file's size or mtime changes.
    Unreadable(Fingerprint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

pub struct PersistentCache<K, V> {
    directory: PathBuf,
    known: Mutex<HashMap<String, Presence>>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> PersistentCache<K, V>
where
    K: Serialize,
    V: Serialize + DeserializeOwned,
{
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        debug!("Persistent cache directory: {}", directory.display());
        Ok(Self {
            directory,
            known: Mutex::new(HashMap::new()),
            _marker: PhantomData,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name used for `key`.
    pub fn file_name(key: &K) -> Result<String> {
        let encoded = serde_json::to_vec(key)?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }

    fn read_entry(&self, key: &K, path: &Path) -> Result<Option<V>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredEntry<V> = serde_json::from_slice(&bytes)?;
        if stored.version != FORMAT_VERSION {
            debug!(
                "Ignoring cache entry {} with format version {}",
                path.display(),
                stored.version
            );
            return Ok(None);
        }
        if stored.key != serde_json::to_value(key)? {
            debug!("Cache entry {} belongs to another key", path.display());
            return Ok(None);
        }
        Ok(Some(stored.value))
    }

    fn write_entry(&self, key: &K, value: &V, path: &Path) -> Result<()> {
        let entry = EntryRef {
            version: FORMAT_VERSION,
            key,
            value,
        };
        let encoded = serde_json::to_vec(&entry)?;
        // Write beside the target and rename so readers never see half a file.
        let staging = path.with_extension("tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, path)?;
        Ok(())
    }

    fn remember(&self, name: String, presence: Presence) {
        self.known.lock().insert(name, presence);
    }

    /// Records a miss, keeping the file's fingerprint when it still exists.
    fn remember_miss(&self, name: String, path: &Path) {
        let presence = match Fingerprint::of(path) {
            Some(fingerprint) => Presence::Unreadable(fingerprint),
            None => Presence::Missing,
        };
        self.remember(name, presence);
    }
}

impl<K, V> Cache<K, V> for PersistentCache<K, V>
where
    K: Serialize,
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &K) -> Option<V> {
        let name = match Self::file_name(key) {
            Ok(name) => name,
            Err(e) => {
                warn!("Cannot derive cache file name: {e}");
                return None;
            }
        };
        let path = self.directory.join(&name);

        let known = self.known.lock().get(&name).copied();
        match known {
            Some(Presence::Missing) if !path.exists() => return None,
            Some(Presence::Unreadable(seen)) => match Fingerprint::of(&path) {
                Some(current) if current == seen => return None,
                Some(_) => {}
                None => {
                    self.remember(name, Presence::Missing);
                    return None;
                }
            },
            _ => {}
        }

        match self.read_entry(key, &path) {
            Ok(Some(value)) => {
                self.remember(name, Presence::Present);
                Some(value)
            }
            Ok(None) => {
                self.remember_miss(name, &path);
                None
            }
            Err(e) => {
                warn!("Failed to read cache entry {}: {e}", path.display());
                self.remember_miss(name, &path);
                None
            }
        }
    }

    fn set(&self, key: K, value: V) {
        let name = match Self::file_name(&key) {
            Ok(name) => name,
            Err(e) => {
                warn!("Cannot derive cache file name: {e}");
                return;
            }
        };
        let path = self.directory.join(&name);

        match self.write_entry(&key, &value, &path) {
            Ok(()) => self.remember(name, Presence::Present),
            Err(e) => {
                warn!("Failed to write cache entry {}: {e}", path.display());
                self.remember_miss(name, &path);
            }
        }
    }

    fn remove(&self, key: &K) -> Result<()> {
        let name = Self::file_name(key)?;
        match fs::remove_file(self.directory.join(&name)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.remember(name, Presence::Missing);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        fs::create_dir_all(&self.directory)?;
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        self.known.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MatchBlobSet;
    use serde::Serialize;
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Key(&'static str);

    fn blobs(items: &[&str]) -> MatchBlobSet {
        MatchBlobSet::new(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_round_trip() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        let value = blobs(&["TEST_1_TEXT\n", "TEST_2_TEXT\nTESTTEXT\n"]);

        cache.set(Key("a"), value.clone());
        assert_eq!(cache.get(&Key("a")), Some(value));
    }

    #[test]
    fn test_survives_a_new_instance() {
        let temp_dir = tempdir().unwrap();
        let value = blobs(&["x\n"]);
        {
            let cache: PersistentCache<Key, MatchBlobSet> =
                PersistentCache::new(temp_dir.path()).unwrap();
            cache.set(Key("a"), value.clone());
        }
        let reopened: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        assert_eq!(reopened.get(&Key("a")), Some(value));
    }

    #[test]
    fn test_empty_value_is_a_hit() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        cache.set(Key("nothing"), MatchBlobSet::default());
        assert_eq!(cache.get(&Key("nothing")), Some(MatchBlobSet::default()));
    }

    #[test]
    fn test_remove_and_reset() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        cache.set(Key("a"), blobs(&["a\n"]));
        cache.set(Key("b"), blobs(&["b\n"]));
        cache.set(Key("c"), blobs(&["c\n"]));

        cache.remove(&Key("a")).unwrap();
        assert_eq!(cache.get(&Key("a")), None);
        assert!(cache.get(&Key("b")).is_some());

        cache.reset().unwrap();
        assert_eq!(cache.get(&Key("b")), None);
        assert_eq!(cache.get(&Key("c")), None);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_removing_a_missing_key_is_fine() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        cache.remove(&Key("never")).unwrap();
    }

    #[test]
    fn test_known_absent_key_is_rechecked_on_disk() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        assert_eq!(cache.get(&Key("late")), None);

        // Another process populates the directory.
        let other: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        other.set(Key("late"), blobs(&["late\n"]));

        assert_eq!(cache.get(&Key("late")), Some(blobs(&["late\n"])));
    }

    #[test]
    fn test_externally_deleted_entry_is_a_miss() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        cache.set(Key("a"), blobs(&["a\n"]));

        let name = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap();
        fs::remove_file(temp_dir.path().join(name)).unwrap();

        assert_eq!(cache.get(&Key("a")), None);
    }

    #[test]
    fn test_entry_for_another_key_is_not_returned() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        cache.set(Key("a"), blobs(&["a\n"]));

        // Simulate a hash collision by moving a's file under b's name.
        let a = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap();
        let b = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("b")).unwrap();
        fs::rename(temp_dir.path().join(a), temp_dir.path().join(b)).unwrap();

        assert_eq!(cache.get(&Key("b")), None);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        let name = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap();
        fs::write(temp_dir.path().join(name), b"not json").unwrap();

        assert_eq!(cache.get(&Key("a")), None);
    }

    #[test]
    fn test_unchanged_corrupt_entry_is_not_read_again() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        cache.set(Key("a"), blobs(&["a\n"]));

        let name = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap();
        let path = temp_dir.path().join(name);
        let valid = fs::read(&path).unwrap();
        let mut corrupt = valid.clone();
        corrupt[0] = b'x';
        fs::write(&path, &corrupt).unwrap();

        let reader: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        assert_eq!(reader.get(&Key("a")), None);
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        // Same size and mtime: the remembered failure stands.
        fs::write(&path, &valid).unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(modified).unwrap();
        assert_eq!(reader.get(&Key("a")), None);

        // A newer mtime makes the entry worth reading again.
        file.set_modified(modified + Duration::from_secs(1)).unwrap();
        assert_eq!(reader.get(&Key("a")), Some(blobs(&["a\n"])));
    }

    #[test]
    fn test_deleted_corrupt_entry_becomes_missing() {
        let temp_dir = tempdir().unwrap();
        let cache: PersistentCache<Key, MatchBlobSet> =
            PersistentCache::new(temp_dir.path()).unwrap();
        let name = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap();
        let path = temp_dir.path().join(&name);
        fs::write(&path, b"not json").unwrap();

        assert_eq!(cache.get(&Key("a")), None);
        assert!(matches!(
            cache.known.lock().get(&name),
            Some(Presence::Unreadable(_))
        ));

        fs::remove_file(&path).unwrap();
        assert_eq!(cache.get(&Key("a")), None);
        assert_eq!(cache.known.lock().get(&name), Some(&Presence::Missing));
    }

    #[test]
    fn test_file_name_is_stable_hex_digest() {
        let name = PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap();
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            name,
            PersistentCache::<Key, MatchBlobSet>::file_name(&Key("a")).unwrap()
        );
    }
}
