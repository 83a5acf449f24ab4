//! The opaque full-text backend boundary (§4.14, C13). The distilled spec treats the engine as
//! an external collaborator exposing `IndexDoc`/`RemoveDoc`/`Flush`/`Close`/`Search`; this module
//! defines that boundary as a trait and ships one in-memory reference implementation so the rest
//! of the service is fully testable without an external dependency.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::document::StoredDoc;
use crate::error::Result;
use crate::token_data::TokenData;

/// The constant label attached to every document, enabling universal backend scans (§3, §6).
pub const ALL_LABEL: &str = "__ALL__";

/// The bundle submitted to the backend for one document (§3 `DocData`).
#[derive(Debug, Clone)]
pub struct DocData {
    pub tokens: Vec<TokenData>,
    pub fields: StoredDoc,
    pub labels: Vec<String>,
}

/// A query against a single index's postings. `tokens` are already tokenized and, for
/// field-scoped queries, already qualified with the `f{idx}:` prefix by the caller — the
/// engine itself knows nothing about schemas or tokenizers.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub tokens: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub fields: StoredDoc,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
}

/// The backend surface the indexing core and worker pool drive. A live `Indexer` owns exactly
/// one `Box<dyn Engine>`, mutated only from inside a worker thread (§4.6, §5).
pub trait Engine: Send {
    fn index_doc(&mut self, doc_id: &str, doc: &DocData, force_update: bool) -> Result<()>;
    fn remove_doc(&mut self, doc_id: &str, force_update: bool) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn close(self: Box<Self>);
    fn search(&self, query: &SearchQuery) -> Result<SearchResult>;
    /// Needed by `UpdateDoc` (§4.8), which must read back the currently stored document before
    /// merging in the partial update.
    fn get_doc(&self, doc_id: &str) -> Option<StoredDoc>;
}

/// A simple in-memory reference engine: an inverted index from token text to `(doc_id,
/// locations)` postings, plus the stored documents themselves. Search does an unranked
/// intersection of posting lists across the query's tokens — a reference implementation, not
/// a ranking engine (ranking policy is a named Non-goal).
#[derive(Default)]
pub struct MemEngine {
    postings: HashMap<String, Vec<(String, Vec<usize>)>>,
    docs: HashMap<String, StoredDoc>,
    labels: HashMap<String, Vec<String>>,
}

impl MemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn evict(&mut self, doc_id: &str) {
        for postings in self.postings.values_mut() {
            postings.retain(|(id, _)| id != doc_id);
        }
        self.postings.retain(|_, postings| !postings.is_empty());
        self.docs.remove(doc_id);
        self.labels.remove(doc_id);
    }
}

impl Engine for MemEngine {
    fn index_doc(&mut self, doc_id: &str, doc: &DocData, _force_update: bool) -> Result<()> {
        self.evict(doc_id);
        for token in &doc.tokens {
            self.postings
                .entry(token.text.clone())
                .or_default()
                .push((doc_id.to_string(), token.locations.clone()));
        }
        self.docs.insert(doc_id.to_string(), doc.fields.clone());
        self.labels.insert(doc_id.to_string(), doc.labels.clone());
        Ok(())
    }

    fn remove_doc(&mut self, doc_id: &str, _force_update: bool) -> Result<()> {
        self.evict(doc_id);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) {}

    fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        if query.tokens.is_empty() {
            return Ok(SearchResult::default());
        }

        let mut matching: Option<HashSet<String>> = None;
        for token in &query.tokens {
            let ids: HashSet<String> = self
                .postings
                .get(token)
                .map(|postings| postings.iter().map(|(id, _)| id.clone()).collect())
                .unwrap_or_default();
            matching = Some(match matching {
                None => ids,
                Some(acc) => acc.intersection(&ids).cloned().collect(),
            });
        }

        let mut hits: Vec<SearchHit> = matching
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| {
                self.docs.get(&id).map(|fields| SearchHit {
                    id,
                    fields: fields.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        if query.limit > 0 {
            hits.truncate(query.limit);
        }
        Ok(SearchResult { hits })
    }

    fn get_doc(&self, doc_id: &str) -> Option<StoredDoc> {
        self.docs.get(doc_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, tokens: &[(&str, usize)]) -> DocData {
        DocData {
            tokens: tokens
                .iter()
                .map(|(t, l)| TokenData { text: t.to_string(), locations: vec![*l] })
                .collect(),
            fields: StoredDoc::from([(
                "id".to_string(),
                crate::document::DocValue::Str(id.to_string()),
            )]),
            labels: vec![ALL_LABEL.to_string()],
        }
    }

    #[test]
    fn index_then_search_intersection() {
        let mut engine = MemEngine::new();
        engine.index_doc("1", &doc("1", &[("hello", 0), ("world", 1)]), true).unwrap();
        engine.index_doc("2", &doc("2", &[("hello", 0)]), true).unwrap();

        let result = engine
            .search(&SearchQuery { tokens: vec!["hello".into(), "world".into()], limit: 0 })
            .unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].id, "1");
    }

    #[test]
    fn remove_doc_drops_postings() {
        let mut engine = MemEngine::new();
        engine.index_doc("1", &doc("1", &[("hello", 0)]), true).unwrap();
        engine.remove_doc("1", true).unwrap();

        let result = engine.search(&SearchQuery { tokens: vec!["hello".into()], limit: 0 }).unwrap();
        assert!(result.hits.is_empty());
        assert!(engine.get_doc("1").is_none());
    }

    #[test]
    fn reindexing_replaces_postings() {
        let mut engine = MemEngine::new();
        engine.index_doc("1", &doc("1", &[("a", 0)]), true).unwrap();
        engine.index_doc("1", &doc("1", &[("b", 0)]), true).unwrap();

        assert!(engine.search(&SearchQuery { tokens: vec!["a".into()], limit: 0 }).unwrap().hits.is_empty());
        assert_eq!(engine.search(&SearchQuery { tokens: vec!["b".into()], limit: 0 }).unwrap().hits.len(), 1);
    }
}
