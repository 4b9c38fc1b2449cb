//! Bounded in-memory LRU cache
use crate::cache::Cache;
use crate::error::{BundleGrepError, Result};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

const HEAD: usize = 0;
const TAIL: usize = 1;

struct Node<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

/// LRU map over an arena of nodes linked by index.
///
/// Slots 0 and 1 are the head and tail sentinels. The node after the head is
/// the most recently touched; the node before the tail is the next to go.
/// `map` and the list always hold the same key set.
pub struct LruList<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
}

impl<K, V> LruList<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(BundleGrepError::InvalidCapacity(capacity));
        }
        let nodes = vec![
            Node {
                entry: None,
                prev: HEAD,
                next: TAIL,
            },
            Node {
                entry: None,
                prev: HEAD,
                next: TAIL,
            },
        ];
        Ok(Self {
            capacity,
            map: HashMap::new(),
            nodes,
            free: Vec::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up `key` and promote it to most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let index = *self.map.get(key)?;
        self.detach(index);
        self.attach_front(index);
        self.nodes[index].entry.as_ref().map(|(_, value)| value)
    }

    /// Insert or replace `key`, promoting it. Returns the entry evicted to
    /// stay within capacity, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&index) = self.map.get(&key) {
            self.nodes[index].entry = Some((key, value));
            self.detach(index);
            self.attach_front(index);
            return None;
        }

        let index = self.allocate(key.clone(), value);
        self.map.insert(key, index);
        self.attach_front(index);

        if self.map.len() > self.capacity {
            let oldest = self.nodes[TAIL].prev;
            return self.release(oldest);
        }
        None
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = *self.map.get(key)?;
        self.release(index).map(|(_, value)| value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.truncate(2);
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.free.clear();
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut cursor = self.nodes[HEAD].next;
        while cursor != TAIL {
            if let Some((key, _)) = &self.nodes[cursor].entry {
                keys.push(key);
            }
            cursor = self.nodes[cursor].next;
        }
        keys
    }

    fn allocate(&mut self, key: K, value: V) -> usize {
        let node = Node {
            entry: Some((key, value)),
            prev: HEAD,
            next: TAIL,
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> Option<(K, V)> {
        self.detach(index);
        let entry = self.nodes[index].entry.take()?;
        self.map.remove(&entry.0);
        self.free.push(index);
        Some(entry)
    }

    fn detach(&mut self, index: usize) {
        let (prev, next) = (self.nodes[index].prev, self.nodes[index].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn attach_front(&mut self, index: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[index].prev = HEAD;
        self.nodes[index].next = first;
        self.nodes[first].prev = index;
        self.nodes[HEAD].next = index;
    }
}

/// Thread-safe [`Cache`] backend over an [`LruList`]
pub struct InMemoryLruCache<K, V> {
    inner: Mutex<LruList<K, V>>,
}

impl<K, V> InMemoryLruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(LruList::new(capacity)?),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<K, V> Cache<K, V> for InMemoryLruCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    fn set(&self, key: K, value: V) {
        if let Some((evicted, _)) = self.inner.lock().insert(key, value) {
            debug!("Evicted least recently used cache entry: {evicted:?}");
        }
    }

    fn remove(&self, key: &K) -> Result<()> {
        self.inner.lock().remove(key);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.inner.lock().clear();
        Ok(())
    }
}
