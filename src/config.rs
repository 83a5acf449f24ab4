//! Configuration (§4.12, C10). A `clap`-derived `Opt` reads CLI flags with environment-variable
//! fallback, mirroring `meilidb-http`'s `Vars`/`Opt` split (`option.rs`) but using `clap`'s
//! built-in `env` support instead of the teacher's hand-rolled `envconfig` merge, since that is
//! what the same repository's current maintained binary (`crates/meilisearch`) uses.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "raptor-search", about = "Multi-tenant text search indexing service")]
pub struct Opt {
    /// Address the HTTP server listens on.
    #[arg(long, env = "RAPTOR_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    /// Number of worker threads draining the indexing queue (also the queue's depth).
    #[arg(long, env = "RAPTOR_WORKER_NUM", default_value_t = 4)]
    pub worker_num: usize,

    /// Idle window in minutes before an untouched index is closed. `0` disables the LRU sweep.
    #[arg(long, env = "RAPTOR_LRU_MINUTES", default_value_t = 30)]
    pub lru_minutes: u64,

    /// Maximum number of indexes kept warm before older ones spill into the idle-close path.
    #[arg(long, env = "RAPTOR_LRU_CAPACITY", default_value_t = 20)]
    pub lru_capacity: usize,

    /// Directory for bulk-ingest temp files.
    #[arg(long, env = "RAPTOR_ROOT_DIR", default_value = "/tmp/raptor-search")]
    pub root_dir: PathBuf,

    /// Directory schemas are persisted under, one `{name}.json` per index.
    #[arg(long, env = "RAPTOR_SCHEMA_DIR", default_value = "/tmp/raptor-search/schemas")]
    pub schema_dir: PathBuf,

    /// Backend persistence selector; empty means in-memory only.
    #[arg(long, env = "RAPTOR_STORE_ENGINE", default_value = "")]
    pub store_engine: String,

    /// Bearer token required on mutating requests. Unset disables the check.
    #[arg(long, env = "RAPTOR_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Log filter passed to `tracing_subscriber::EnvFilter`; falls back to `RUST_LOG`.
    #[arg(long, env = "RAPTOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// The resolved, immutable configuration threaded explicitly through `IndexService` (§4.12,
/// §9 design notes: avoid hidden singletons).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: String,
    pub worker_num: usize,
    pub lru_minutes: u64,
    pub lru_capacity: usize,
    pub root_dir: PathBuf,
    pub schema_dir: PathBuf,
    pub store_engine: Option<String>,
    pub admin_token: Option<String>,
}

impl From<Opt> for ServiceConfig {
    fn from(opt: Opt) -> Self {
        ServiceConfig {
            listen_addr: opt.listen_addr,
            worker_num: opt.worker_num.max(1),
            lru_minutes: opt.lru_minutes,
            lru_capacity: opt.lru_capacity.max(1),
            root_dir: opt.root_dir,
            schema_dir: opt.schema_dir,
            store_engine: (!opt.store_engine.is_empty()).then_some(opt.store_engine),
            admin_token: opt.admin_token,
        }
    }
}
