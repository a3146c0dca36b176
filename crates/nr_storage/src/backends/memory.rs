use async_trait::async_trait;
use nr_core::{EmbeddingStore, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

struct Entry {
    embedding: Vec<f32>,
    last_used: u64,
}

/// Entries keyed by text plus a recency index keyed by logical clock, so the
/// least recently used key is always the first one in `recency`.
struct Inner {
    entries: HashMap<String, Entry>,
    recency: BTreeMap<u64, String>,
    clock: u64,
}

impl Inner {
    fn touch(&mut self, text: &str) -> Option<&Entry> {
        self.clock += 1;
        let now = self.clock;
        let entry = self.entries.get_mut(text)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = now;
        self.recency.insert(now, text.to_string());
        Some(entry)
    }

    fn insert(&mut self, text: &str, embedding: Vec<f32>) {
        self.clock += 1;
        let now = self.clock;
        let previous = self.entries.insert(
            text.to_string(),
            Entry {
                embedding,
                last_used: now,
            },
        );
        if let Some(previous) = previous {
            self.recency.remove(&previous.last_used);
        }
        self.recency.insert(now, text.to_string());
    }

    fn evict_oldest(&mut self) -> bool {
        match self.recency.pop_first() {
            Some((_, key)) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }
}

/// Process-local embedding store with least-recently-used trimming.
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    max_items: usize,
}

impl MemoryStore {
    pub fn new(max_items: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                clock: 0,
            })),
            max_items,
        }
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn get(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let mut inner = self.inner.write().await;
        Ok(inner.touch(text).map(|entry| entry.embedding.clone()))
    }

    async fn put(&self, text: &str, embedding: &[f32]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.insert(text, embedding.to_vec());

        while inner.entries.len() > self.max_items && inner.evict_oldest() {
            tracing::debug!(max_items = self.max_items, "evicted least recently used embedding");
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.entries.len())
    }
}
