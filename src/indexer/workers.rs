//! Work queue & workers (§4.6, C6). A bounded FIFO of `IndexerOp`, depth = `worker_num`,
//! drained by a fixed pool of worker threads. Grounded on `opThread`/`StartIndexers`/
//! `StopIndexers` in `original_source/indexer/index_initer.go`; the original's explicit
//! `stopChan` acknowledgement channel is replaced here by `JoinHandle::join`, which gives the
//! same "wait for each worker to finish draining" guarantee without hand-rolling it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};

use crate::engine::{DocData, Engine};
use crate::error::{Error, Result};

pub enum OpKind {
    Index { doc_id: String, doc: DocData },
    Delete { doc_id: String },
    Flush,
}

pub struct IndexerOp {
    pub kind: OpKind,
    pub engine: Arc<RwLock<Box<dyn Engine>>>,
}

/// A fixed pool of worker threads draining a shared bounded channel. All mutations for a given
/// backend are linearized by submission order into the channel (single writer per engine, §3).
pub struct WorkerPool {
    sender: Mutex<Option<crossbeam_channel::Sender<IndexerOp>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn start(worker_num: usize) -> Self {
        let depth = worker_num.max(1);
        let (tx, rx) = crossbeam_channel::bounded::<IndexerOp>(depth);

        let handles = (0..depth)
            .map(|worker_no| {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("indexer-worker-{worker_no}"))
                    .spawn(move || worker_loop(worker_no, rx))
                    .expect("failed to spawn indexer worker thread")
            })
            .collect();

        WorkerPool {
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
        }
    }

    /// Enqueues an op. Blocks when the queue is full (natural backpressure, §5), but only on the
    /// channel itself — the sender is cloned out from under the mutex so concurrent callers never
    /// serialize on each other while one of them waits for queue space.
    pub fn enqueue(&self, op: IndexerOp) -> Result<()> {
        let tx = self.sender.lock().clone().ok_or(Error::ServiceStopped)?;
        tx.send(op).map_err(|_| Error::ServiceStopped)
    }

    /// Closes the queue and waits for every worker to drain it. Idempotent.
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        drop(sender);

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(worker_no: usize, rx: crossbeam_channel::Receiver<IndexerOp>) {
    tracing::info!(worker_no, "indexer worker started");
    for op in rx {
        let mut engine = op.engine.write();
        let result = match op.kind {
            OpKind::Index { doc_id, doc } => engine.index_doc(&doc_id, &doc, true),
            OpKind::Delete { doc_id } => engine.remove_doc(&doc_id, true),
            OpKind::Flush => engine.flush(),
        };
        // Worker-level backend failures are logged only: the op has already been dequeued and
        // acknowledged to the caller by the time it runs (§7 propagation policy).
        if let Err(e) = result {
            tracing::error!(worker_no, error = %e, "backend op failed");
        }
    }
    tracing::info!(worker_no, "indexer worker drained and stopped");
}
