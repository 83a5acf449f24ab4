pub mod bulk;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod generators;
pub mod http;
pub mod indexer;
pub mod schema;
pub mod service;
pub mod token_data;
pub mod tokenizer;

pub use error::{Error, Result};
pub use service::IndexService;
