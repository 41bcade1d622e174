use std::io;

use thiserror::Error;

// 配置类错误：在任何写操作之前就会终止运行，不做重试
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no table named {table}")]
    TableNotFound { table: String },
    #[error("found {count} tables named {table}")]
    AmbiguousTable { table: String, count: usize },
    #[error("table {table} reports an invalid page count {pages}")]
    InvalidPageCount { table: String, pages: i64 },
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum CompactError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),
    #[error("heap storage error: {0}")]
    Heap(#[from] io::Error),
    #[error("page {page} does not fit the storage page address range")]
    PageOutOfRange { page: u64 },
}

pub type Result<T> = std::result::Result<T, CompactError>;
