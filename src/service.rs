//! The single `IndexService` value (§9 design notes): threads configuration, the registry, the
//! LRU state and the worker pool explicitly rather than hiding them behind process-wide
//! singletons. HTTP handlers (C9) are thin wrappers over the methods here; the methods are also
//! what the test suite exercises directly, independent of the HTTP transport (§6).

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use crate::bulk::{self, BulkOutcome};
use crate::config::ServiceConfig;
use crate::document::{RawDoc, StoredDoc};
use crate::engine::{SearchQuery, SearchResult};
use crate::error::{Error, Result};
use crate::generators::DocKind;
use crate::indexer::{LruState, Registry, WorkerPool};
use crate::schema::{self, SchemaConf};

pub struct IndexService {
    config: ServiceConfig,
    registry: Registry,
    lru: LruState,
    workers: Arc<WorkerPool>,
    running: AtomicBool,
}

impl IndexService {
    pub fn new(config: ServiceConfig) -> Arc<IndexService> {
        let registry = Registry::new(config.schema_dir.clone());
        let lru = LruState::new(config.lru_capacity, config.lru_minutes);
        let workers = Arc::new(WorkerPool::start(config.worker_num));

        let service = Arc::new(IndexService {
            config,
            registry,
            lru,
            workers,
            running: AtomicBool::new(true),
        });

        if service.lru.is_enabled() {
            let sweep_interval = service.lru.idle_window().unwrap_or(Duration::from_secs(60));
            let weak = Arc::downgrade(&service);
            thread::Builder::new()
                .name("lru-sweep".to_string())
                .spawn(move || lru_sweep_loop(weak, sweep_interval))
                .expect("failed to spawn LRU sweep thread");
        }

        service
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn ensure_running(&self) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::ServiceStopped)
        }
    }

    // ---- Schema management (C11) ----

    pub fn get_schema(&self, name: &str) -> Result<SchemaConf> {
        Ok(schema::load_schema(&self.config.schema_dir, name)?.to_conf())
    }

    pub fn create_schema(&self, conf: SchemaConf) -> Result<()> {
        schema::Schema::from_conf(conf.clone())?;
        schema::save_schema(&self.config.schema_dir, &conf.name, &conf)
    }

    pub fn delete_schema(&self, name: &str) -> Result<()> {
        self.registry.remove(name, &self.lru);
        schema::delete_schema(&self.config.schema_dir, name)
    }

    pub fn rename_schema(&self, old: &str, new: &str) -> Result<()> {
        self.registry.remove(old, &self.lru);
        schema::rename_schema(&self.config.schema_dir, old, new)
    }

    // ---- Document mutation (C7) ----

    /// §4.7: indexes a single document, "accepted for indexing" semantics — the return is not a
    /// durability guarantee (§9 open question).
    pub fn index_doc(&self, index: &str, doc: &RawDoc) -> Result<String> {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        indexer.index_doc(doc, &self.workers, true)
    }

    /// §4.8.
    pub fn update_doc(&self, index: &str, partial: &RawDoc) -> Result<String> {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        indexer.update_doc(partial, &self.workers)
    }

    /// §4.9.
    pub fn delete_doc(&self, index: &str, doc_id: &str) -> Result<()> {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        indexer.delete_docs(std::slice::from_ref(&doc_id.to_string()), &self.workers)
    }

    pub fn delete_docs(&self, index: &str, doc_ids: &[String]) -> Result<()> {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        indexer.delete_docs(doc_ids, &self.workers)
    }

    pub fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchResult> {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        indexer.search(query)
    }

    pub fn get_doc(&self, index: &str, doc_id: &str) -> Result<StoredDoc> {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        indexer.get_doc(doc_id).ok_or(Error::DocNotFound)
    }

    // ---- Bulk ingest (C8) ----

    pub fn index_stream<R>(
        &self,
        index: &str,
        kind: DocKind,
        body: R,
        callback: Option<String>,
    ) -> Result<BulkOutcome>
    where
        R: Read + Send + 'static,
    {
        self.ensure_running()?;
        let indexer = self.registry.get(index, &self.lru)?;
        bulk::index_stream(index, indexer, self.workers.clone(), &self.config.root_dir, kind, body, callback)
    }

    // ---- Shutdown (§4.6) ----

    /// Flips `running` false, drains the work queue, then closes every live index. Idempotent.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.workers.shutdown();
            self.registry.close_all();
        }
    }
}

/// The LRU sweep thread (§4.5): wakes every `idle_window`, asks `LruState` which indexes have
/// gone idle, and removes each one from the registry. Stops once the service is dropped or
/// shut down.
fn lru_sweep_loop(service: Weak<IndexService>, interval: Duration) {
    loop {
        thread::sleep(interval);
        let Some(service) = service.upgrade() else {
            return;
        };
        if !service.running.load(Ordering::Acquire) {
            return;
        }
        for name in service.lru.sweep() {
            tracing::info!(index = %name, "LRU sweep closing idle index");
            service.registry.remove(&name, &service.lru);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldConf, FieldType};
    use crate::tokenizer::Tokenizer;
    use serde_json::Value;
    use tempfile::tempdir;

    fn test_config(dir: &std::path::Path) -> ServiceConfig {
        ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            worker_num: 2,
            lru_minutes: 0,
            lru_capacity: 20,
            root_dir: dir.join("root"),
            schema_dir: dir.join("schemas"),
            store_engine: None,
            admin_token: None,
        }
    }

    fn books_conf() -> SchemaConf {
        SchemaConf {
            name: "books".into(),
            fields: vec![
                FieldConf { name: "id".into(), field_type: FieldType::Integer, pk: true, tokenizer: Tokenizer::None },
                FieldConf { name: "title".into(), field_type: FieldType::String, pk: false, tokenizer: Tokenizer::Whitespace },
            ],
            store_path: None,
            shards: 1,
        }
    }

    #[test]
    fn index_then_search_round_trip() {
        let dir = tempdir().unwrap();
        let service = IndexService::new(test_config(dir.path()));
        service.create_schema(books_conf()).unwrap();

        let mut doc = RawDoc::new();
        doc.insert("id".into(), Value::from(7));
        doc.insert("title".into(), Value::String("Hello World".into()));
        let doc_id = service.index_doc("books", &doc).unwrap();
        assert_eq!(doc_id, "7");

        let result = service
            .search("books", &SearchQuery { tokens: vec!["Hello".into()], limit: 0 })
            .unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].id, "7");

        service.shutdown();
    }

    #[test]
    fn mutations_after_shutdown_fail_fast() {
        let dir = tempdir().unwrap();
        let service = IndexService::new(test_config(dir.path()));
        service.create_schema(books_conf()).unwrap();
        service.shutdown();

        let mut doc = RawDoc::new();
        doc.insert("id".into(), Value::from(1));
        let err = service.index_doc("books", &doc).unwrap_err();
        assert!(matches!(err, Error::ServiceStopped));
    }
}
