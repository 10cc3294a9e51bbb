use std::fmt::Debug;
use thiserror::Error;

/// A flat, durable string store scoped to the installation.
pub trait KvStore: Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache lock poisoned")]
    Poisoned,
    #[error("unable to persist cache: {0}")]
    Persist(String),
    #[error("cache writer stopped")]
    WriterStopped,
}
