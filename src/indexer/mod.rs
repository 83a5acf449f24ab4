//! The indexing subsystem: registry (C4), LRU lifetime manager (C5), work queue & workers (C6),
//! and the indexing core (C7).

pub mod core;
pub mod lru;
pub mod registry;
pub mod workers;

pub use core::Indexer;
pub use lru::LruState;
pub use registry::Registry;
pub use workers::{IndexerOp, OpKind, WorkerPool};
