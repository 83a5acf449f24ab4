//! Indexer registry (§4.4, C4): the process-wide map from index name to live `Indexer`, with
//! create-on-demand. Grounded on `initIndexer`/`RemoveIndexer` in
//! `original_source/indexer/index_initer.go`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;

use crate::engine::MemEngine;
use crate::error::Result;
use crate::indexer::core::Indexer;
use crate::indexer::lru::LruState;
use crate::schema;

pub struct Registry {
    indexers: RwLock<HashMap<String, Arc<Indexer>>>,
    schema_dir: PathBuf,
}

impl Registry {
    pub fn new(schema_dir: PathBuf) -> Self {
        Registry {
            indexers: RwLock::new(HashMap::new()),
            schema_dir,
        }
    }

    /// The sole entry point (§4.4): read-hit touches the LRU and returns; a miss loads the
    /// schema, spins up a fresh backend, flushes it once, then re-checks under the write lock
    /// so a losing racer discards its candidate rather than clobbering the winner's.
    pub fn get(&self, name: &str, lru: &LruState) -> Result<Arc<Indexer>> {
        if let Some(existing) = self.indexers.read().get(name).cloned() {
            lru.touch(name);
            return Ok(existing);
        }

        let schema = schema::load_schema(&self.schema_dir, name)?;
        let mut engine: Box<dyn crate::engine::Engine> = Box::new(MemEngine::new());
        engine.flush()?;
        let candidate = Arc::new(Indexer::new(schema, engine));

        let mut guard = self.indexers.write();
        if let Some(existing) = guard.get(name) {
            tracing::debug!(index = name, "lost registry creation race, discarding candidate");
            let existing = existing.clone();
            drop(guard);
            candidate.close();
            lru.touch(name);
            return Ok(existing);
        }
        tracing::info!(index = name, "index created (cold)");
        guard.insert(name.to_string(), candidate.clone());
        drop(guard);
        lru.touch(name);
        Ok(candidate)
    }

    /// Returns the live indexer for `name` without creating one, used by handlers (e.g. search)
    /// that should 404 on an unknown index rather than implicitly creating it.
    pub fn peek(&self, name: &str) -> Option<Arc<Indexer>> {
        self.indexers.read().get(name).cloned()
    }

    /// Drops the registry entry under exclusive access, then closes the backend off the
    /// calling thread so in-flight queue drains are not blocked (§4.4).
    pub fn remove(&self, name: &str, lru: &LruState) {
        let removed = self.indexers.write().remove(name);
        lru.remove(name);
        if let Some(indexer) = removed {
            thread::spawn(move || indexer.close());
        }
    }

    /// Closes every live indexer synchronously. Used at service shutdown (§4.6) after the work
    /// queue has drained.
    pub fn close_all(&self) {
        let drained: Vec<(String, Arc<Indexer>)> =
            self.indexers.write().drain().collect();
        for (name, indexer) in drained {
            tracing::info!(index = %name, "stopping index");
            indexer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldConf, FieldType, SchemaConf};
    use crate::tokenizer::Tokenizer;
    use tempfile::tempdir;

    fn write_books_schema(dir: &std::path::Path) {
        schema::save_schema(
            dir,
            "books",
            &SchemaConf {
                name: "books".into(),
                fields: vec![FieldConf {
                    name: "id".into(),
                    field_type: FieldType::Integer,
                    pk: true,
                    tokenizer: Tokenizer::None,
                }],
                store_path: None,
                shards: 1,
            },
        )
        .unwrap();
    }

    #[test]
    fn get_creates_then_reuses_the_same_indexer() {
        let dir = tempdir().unwrap();
        write_books_schema(dir.path());
        let registry = Registry::new(dir.path().to_path_buf());
        let lru = LruState::new(20, 0);

        let first = registry.get("books", &lru).unwrap();
        let second = registry.get("books", &lru).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn get_on_missing_schema_fails() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().to_path_buf());
        let lru = LruState::new(20, 0);
        assert!(registry.get("ghost", &lru).is_err());
    }

    #[test]
    fn remove_drops_the_entry() {
        let dir = tempdir().unwrap();
        write_books_schema(dir.path());
        let registry = Registry::new(dir.path().to_path_buf());
        let lru = LruState::new(20, 0);

        registry.get("books", &lru).unwrap();
        registry.remove("books", &lru);
        assert!(registry.peek("books").is_none());
    }
}
