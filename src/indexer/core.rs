//! Indexing core (§4.7-4.9, C7): schema-driven tokenization, positional posting assembly,
//! primary-key derivation, and submission to the work queue. Translated from the `IndexDoc`/
//! `UpdateDoc`/`DeleteDoc` bodies implied by `original_source/indexer/doc_indexer.go` and wired
//! through the same `Indexer{schema, engine}` pairing as `original_source/indexer/index_initer.go`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::document::{DocValue, RawDoc, StoredDoc};
use crate::engine::{DocData, Engine, SearchQuery, SearchResult, ALL_LABEL};
use crate::error::{Error, Result};
use crate::indexer::workers::{IndexerOp, OpKind, WorkerPool};
use crate::schema::Schema;
use crate::token_data::{build_index_tokens, merge_token_locs, TokenData, FIELD_GAP};
use crate::tokenizer::{self, Tokenizer};

/// A live `(schema, backend)` pair. One per active index name (§3). The backend is reachable
/// only through `engine()`, handed to worker ops and to direct read paths (search, get_doc)
/// alike — mutation is serialized by the queue, reads are not.
pub struct Indexer {
    schema: Schema,
    engine: Arc<RwLock<Box<dyn Engine>>>,
}

impl Indexer {
    pub fn new(schema: Schema, engine: Box<dyn Engine>) -> Self {
        Indexer {
            schema,
            engine: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn engine(&self) -> Arc<RwLock<Box<dyn Engine>>> {
        self.engine.clone()
    }

    /// Builds the tokenized `DocData` and derives the docID for `raw` (§4.7 steps 3-7), shared
    /// by `index_doc` and `update_doc`.
    fn build_doc(&self, raw: &RawDoc) -> Result<(String, DocData)> {
        let mut stored = StoredDoc::new();
        let mut tokens: Vec<TokenData> = Vec::new();
        let mut start_loc = 0usize;
        let mut pk_values: HashMap<usize, DocValue> = HashMap::new();

        for (field_name, raw_value) in raw.iter() {
            let Some(idx) = self.schema.field_index(field_name) else {
                continue;
            };
            let value = self.schema.coerce(idx, raw_value)?;

            if self.schema.pk_idx().contains(&idx) {
                pk_values.insert(idx, value.clone());
            }

            let tokenizer = self.schema.tokenizer_of(idx);
            let to_store = match (&value, tokenizer) {
                (DocValue::Str(s), Tokenizer::None) => DocValue::Str(s.trim().to_string()),
                (DocValue::Str(s), Tokenizer::Whitespace) => {
                    let field_tokens = tokenizer::whitespace_tokenize(s);
                    self.append_field_tokens(idx, &field_tokens, &mut tokens, &mut start_loc);
                    value.clone()
                }
                (DocValue::Str(s), Tokenizer::Zh) => {
                    let field_tokens = tokenizer::hanzi_tokenize(s);
                    self.append_field_tokens(idx, &field_tokens, &mut tokens, &mut start_loc);
                    value.clone()
                }
                _ => value.clone(),
            };
            stored.insert(field_name.clone(), to_store);
        }

        if pk_values.len() != self.schema.pk_idx().len() {
            return Err(Error::MissingPK);
        }
        let doc_id = self
            .schema
            .pk_idx()
            .iter()
            .map(|idx| pk_values[idx].to_string())
            .collect::<Vec<_>>()
            .join("_");

        let count = merge_token_locs(&mut tokens);
        tokens.truncate(count);

        Ok((
            doc_id,
            DocData {
                tokens,
                fields: stored,
                labels: vec![ALL_LABEL.to_string()],
            },
        ))
    }

    fn append_field_tokens(
        &self,
        field_idx: usize,
        field_tokens: &[String],
        tokens: &mut Vec<TokenData>,
        start_loc: &mut usize,
    ) {
        if field_tokens.is_empty() {
            return;
        }
        tokens.extend(build_index_tokens(field_idx, field_tokens, *start_loc));
        *start_loc += field_tokens.len() * 2 + FIELD_GAP;
    }

    /// §4.7: builds the doc and enqueues `INDEX`, followed by `FLUSH` when `flush` is set (the
    /// single-doc API flushes synchronously at enqueue time; bulk callers pass `false` and flush
    /// once after the whole stream drains). Returns the derived docID — "accepted for indexing",
    /// not a durability guarantee (§9 open question).
    pub fn index_doc(&self, raw: &RawDoc, workers: &WorkerPool, flush: bool) -> Result<String> {
        let (doc_id, doc) = self.build_doc(raw)?;
        workers.enqueue(IndexerOp {
            kind: OpKind::Index { doc_id: doc_id.clone(), doc },
            engine: self.engine.clone(),
        })?;
        if flush {
            workers.enqueue(IndexerOp { kind: OpKind::Flush, engine: self.engine.clone() })?;
        }
        Ok(doc_id)
    }

    /// §4.8: derives the docID from `partial`'s PK fields, reads the currently stored document
    /// back, merges `partial` over it field-by-field, and reruns the indexing body.
    pub fn update_doc(&self, partial: &RawDoc, workers: &WorkerPool) -> Result<String> {
        let (doc_id, _) = self.build_doc(partial)?;
        let existing = self.engine.read().get_doc(&doc_id).ok_or(Error::DocNotFound)?;

        let mut merged = RawDoc::new();
        for (field, value) in &existing {
            merged.insert(field.clone(), stored_value_to_json(value));
        }
        for (field, value) in partial.iter() {
            merged.insert(field.clone(), value.clone());
        }

        self.index_doc(&merged, workers, true)
    }

    /// §4.9: one `DELETE` per ID, then a single trailing `FLUSH`.
    pub fn delete_docs(&self, doc_ids: &[String], workers: &WorkerPool) -> Result<()> {
        for doc_id in doc_ids {
            workers.enqueue(IndexerOp {
                kind: OpKind::Delete { doc_id: doc_id.clone() },
                engine: self.engine.clone(),
            })?;
        }
        workers.enqueue(IndexerOp { kind: OpKind::Flush, engine: self.engine.clone() })?;
        Ok(())
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        self.engine.read().search(query)
    }

    pub fn get_doc(&self, doc_id: &str) -> Option<StoredDoc> {
        self.engine.read().get_doc(doc_id)
    }

    /// Closes the backend, but only if this is the last reference to both the `Indexer` and its
    /// engine — an in-flight worker op (or a racing registry lookup) may still hold a clone, in
    /// which case the close is skipped and left for the holder to finish naturally.
    pub fn close(self: Arc<Self>) {
        match Arc::try_unwrap(self) {
            Ok(indexer) => match Arc::try_unwrap(indexer.engine) {
                Ok(lock) => lock.into_inner().close(),
                Err(_) => tracing::warn!("engine still in use, deferring close"),
            },
            Err(_) => tracing::warn!("indexer still referenced, deferring close"),
        }
    }
}

fn stored_value_to_json(value: &DocValue) -> Value {
    match value {
        DocValue::Str(s) => Value::String(s.clone()),
        DocValue::Int(i) => Value::Number((*i).into()),
        DocValue::Float(f) => {
            serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)
        }
        DocValue::Bool(b) => Value::Bool(*b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemEngine;
    use crate::schema::{FieldConf, FieldType, SchemaConf};

    fn books_indexer() -> Indexer {
        let schema = Schema::from_conf(SchemaConf {
            name: "books".into(),
            fields: vec![
                FieldConf { name: "id".into(), field_type: FieldType::Integer, pk: true, tokenizer: Tokenizer::None },
                FieldConf { name: "title".into(), field_type: FieldType::String, pk: false, tokenizer: Tokenizer::Whitespace },
            ],
            store_path: None,
            shards: 1,
        })
        .unwrap();
        Indexer::new(schema, Box::new(MemEngine::new()))
    }

    fn raw(pairs: &[(&str, Value)]) -> RawDoc {
        let mut map = RawDoc::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        map
    }

    #[test]
    fn pk_derivation_is_order_independent() {
        let indexer = books_indexer();
        let doc = raw(&[("title", Value::String("Hello World".into())), ("id", Value::from(7))]);
        let workers = WorkerPool::start(1);
        let doc_id = indexer.index_doc(&doc, &workers, true).unwrap();
        workers.shutdown();
        assert_eq!(doc_id, "7");
    }

    #[test]
    fn missing_pk_fails() {
        let indexer = books_indexer();
        let doc = raw(&[("title", Value::String("no id here".into()))]);
        let workers = WorkerPool::start(1);
        let err = indexer.index_doc(&doc, &workers, true).unwrap_err();
        workers.shutdown();
        assert!(matches!(err, Error::MissingPK));
    }

    #[test]
    fn update_doc_merges_over_existing_fields() {
        let indexer = books_indexer();
        let workers = WorkerPool::start(1);
        indexer
            .index_doc(&raw(&[("id", Value::from(1)), ("title", Value::String("Old Title".into()))]), &workers, true)
            .unwrap();
        workers.shutdown();

        let workers = WorkerPool::start(1);
        let doc_id = indexer
            .update_doc(&raw(&[("id", Value::from(1)), ("title", Value::String("New Title".into()))]), &workers)
            .unwrap();
        workers.shutdown();

        assert_eq!(doc_id, "1");
        let stored = indexer.get_doc("1").unwrap();
        assert_eq!(stored.get("title").unwrap().as_str(), Some("New Title"));
    }

    #[test]
    fn update_doc_on_missing_document_fails() {
        let indexer = books_indexer();
        let workers = WorkerPool::start(1);
        let err = indexer
            .update_doc(&raw(&[("id", Value::from(99)), ("title", Value::String("x".into()))]), &workers)
            .unwrap_err();
        workers.shutdown();
        assert!(matches!(err, Error::DocNotFound));
    }
}
