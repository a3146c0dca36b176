use std::sync::Arc;

use nr_core::{EmbeddingStore, Error, Result};
use sha2::{Digest, Sha256};

pub mod backends;

pub use backends::*;

pub const DEFAULT_SQLITE_PATH: &str = "embedding_cache.sqlite";

/// Stable storage key for a piece of embedded text.
pub fn text_key(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Build an embedding store by backend name (`memory` or `sqlite`).
pub async fn create_store(
    backend: &str,
    path: Option<&str>,
    max_items: usize,
) -> Result<Arc<dyn EmbeddingStore>> {
    if max_items == 0 {
        return Err(Error::Config("embedding store max_items must be greater than 0".to_string()));
    }
    match backend {
        "memory" => Ok(Arc::new(MemoryStore::new(max_items))),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = std::path::PathBuf::from(path.unwrap_or(DEFAULT_SQLITE_PATH));
            Ok(Arc::new(SqliteStore::new_with_path(&path, max_items).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            let _ = path;
            Err(Error::Config(
                "sqlite support was not compiled in (enable the `sqlite` feature)".to_string(),
            ))
        }
        other => Err(Error::Config(format!("Unknown embedding store backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_store, text_key};
}
