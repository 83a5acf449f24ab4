//! Bulk ingest orchestrator (§4.10, C8). Drives a document generator through the indexing core,
//! either synchronously or via a spawned background job that persists the body to a temp file,
//! flushes once, and POSTs a completion status to a callback URL. Grounded on the synchronous
//! vs. callback split described for `IndexStream` and on `original_source/rest/reader_getter.go`
//! for the content-type/extension dispatch table.

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tempfile::{NamedTempFile, TempPath};

use crate::error::Result;
use crate::generators::{self, DocKind};
use crate::indexer::core::Indexer;
use crate::indexer::workers::{IndexerOp, OpKind, WorkerPool};

/// One bulk-ingest outcome entry. Kept as a discriminated union rather than conflating
/// successful IDs and error strings into one untyped slice (§9 open question).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocResult {
    Ok(String),
    Err(String),
}

/// The async callback payload (§6): `code` is 200 iff no per-document error occurred.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackStatus {
    pub code: u16,
    pub msg: String,
    pub index: String,
    pub docs: usize,
}

pub enum BulkOutcome {
    Sync(Vec<DocResult>),
    Dispatched,
}

/// `Content-Type` → generator dispatch (§6), for the non-multipart cases.
pub fn dispatch_for_content_type(content_type: &str) -> Option<DocKind> {
    match content_type {
        "application/json" => Some(DocKind::Json),
        "application/x-ndjson" => Some(DocKind::JsonLines),
        "text/csv" => Some(DocKind::Csv),
        _ => None,
    }
}

/// Extension-based dispatch for `multipart/form-data` uploads (§6): `.csv` → CSV, `.jsonl` →
/// JSON-lines, anything else → JSON array.
pub fn dispatch_for_filename(filename: &str) -> DocKind {
    if filename.ends_with(".csv") {
        DocKind::Csv
    } else if filename.ends_with(".jsonl") {
        DocKind::JsonLines
    } else {
        DocKind::Json
    }
}

/// `IndexStream(index, stream, kind, callback?)` (§4.10). Without a callback, consumes the
/// generator synchronously and returns the per-document outcome slice. With a callback,
/// persists the body to a temp file under `root_dir` and returns immediately; the background
/// job does the actual ingestion and POSTs the completion status.
pub fn index_stream<R>(
    index_name: &str,
    indexer: Arc<Indexer>,
    workers: Arc<WorkerPool>,
    root_dir: &Path,
    kind: DocKind,
    mut body: R,
    callback: Option<String>,
) -> Result<BulkOutcome>
where
    R: Read + Send + 'static,
{
    match callback {
        None => {
            let results = run_sync(&indexer, kind, body, &workers)?;
            Ok(BulkOutcome::Sync(results))
        }
        Some(url) => {
            std::fs::create_dir_all(root_dir)?;
            let mut tmp = NamedTempFile::new_in(root_dir)?;
            io::copy(&mut body, &mut tmp)?;
            let temp_path = tmp.into_temp_path();

            let index_name = index_name.to_string();
            tokio::spawn(run_callback_job(index_name, indexer, workers, kind, temp_path, url));
            Ok(BulkOutcome::Dispatched)
        }
    }
}

fn run_sync(indexer: &Indexer, kind: DocKind, body: impl Read + Send + 'static, workers: &WorkerPool) -> Result<Vec<DocResult>> {
    let mut results = Vec::new();
    for item in generators::generate(kind, body) {
        let outcome = match item {
            Ok(raw) => match indexer.index_doc(&raw, workers, false) {
                Ok(id) => DocResult::Ok(id),
                Err(e) => DocResult::Err(e.to_string()),
            },
            Err(e) => DocResult::Err(e.to_string()),
        };
        results.push(outcome);
    }
    workers.enqueue(IndexerOp { kind: OpKind::Flush, engine: indexer.engine() })?;
    Ok(results)
}

async fn run_callback_job(
    index_name: String,
    indexer: Arc<Indexer>,
    workers: Arc<WorkerPool>,
    kind: DocKind,
    temp_path: TempPath,
    callback_url: String,
) {
    let file = match std::fs::File::open(&temp_path) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!(index = %index_name, error = %e, "failed to reopen bulk ingest temp file");
            let _ = temp_path.close();
            return;
        }
    };

    let job = tokio::task::spawn_blocking(move || {
        let mut docs = 0usize;
        let mut errors = 0usize;
        for item in generators::generate(kind, file) {
            match item.and_then(|raw| indexer.index_doc(&raw, &workers, false)) {
                Ok(_) => docs += 1,
                Err(_) => errors += 1,
            }
        }
        let _ = workers.enqueue(IndexerOp { kind: OpKind::Flush, engine: indexer.engine() });
        (docs, errors)
    })
    .await;
    let (docs, errors) = job.unwrap_or((0, 0));

    if let Err(e) = temp_path.close() {
        tracing::warn!(index = %index_name, error = %e, "failed to remove bulk ingest temp file");
    }

    tracing::info!(index = %index_name, docs, errors, "bulk ingest with callback completed");
    let status = CallbackStatus {
        code: if errors == 0 { 200 } else { 500 },
        msg: if errors == 0 { "ok".to_string() } else { format!("{errors} document(s) failed") },
        index: index_name.clone(),
        docs,
    };

    let client = reqwest::Client::new();
    match client.post(&callback_url).json(&status).send().await {
        Ok(resp) => tracing::info!(index = %index_name, status = %resp.status(), "callback POST delivered"),
        Err(e) => tracing::error!(index = %index_name, error = %e, "callback POST failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemEngine;
    use crate::schema::{FieldConf, FieldType, Schema, SchemaConf};
    use crate::tokenizer::Tokenizer;
    use std::io::Cursor;

    fn books_indexer() -> Arc<Indexer> {
        let schema = Schema::from_conf(SchemaConf {
            name: "books".into(),
            fields: vec![
                FieldConf { name: "name".into(), field_type: FieldType::String, pk: true, tokenizer: Tokenizer::None },
                FieldConf { name: "age".into(), field_type: FieldType::Integer, pk: false, tokenizer: Tokenizer::None },
            ],
            store_path: None,
            shards: 1,
        })
        .unwrap();
        Arc::new(Indexer::new(schema, Box::new(MemEngine::new())))
    }

    #[test]
    fn sync_csv_ingest_returns_one_result_per_row() {
        let indexer = books_indexer();
        let workers = Arc::new(WorkerPool::start(1));
        let body = Cursor::new(b"name,age\nAda,36\nGrace,85\n".to_vec());

        let outcome = index_stream("books", indexer, workers.clone(), Path::new("/tmp"), DocKind::Csv, body, None).unwrap();
        workers.shutdown();

        match outcome {
            BulkOutcome::Sync(results) => {
                assert_eq!(results.len(), 2);
                assert!(matches!(results[0], DocResult::Ok(ref id) if id == "Ada"));
                assert!(matches!(results[1], DocResult::Ok(ref id) if id == "Grace"));
            }
            BulkOutcome::Dispatched => panic!("expected synchronous outcome"),
        }
    }

    #[test]
    fn dispatch_for_filename_uses_extension() {
        assert!(matches!(dispatch_for_filename("rows.csv"), DocKind::Csv));
        assert!(matches!(dispatch_for_filename("rows.jsonl"), DocKind::JsonLines));
        assert!(matches!(dispatch_for_filename("rows.json"), DocKind::Json));
    }
}
