//!
//! src/errors.rs  Andrew Belles  Oct 3rd, 2025 
//!
//! Defines enums and methods of error conversion 
//! for errors the loader uses 
//!
//!

use thiserror::Error; 

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("config error: {0}")]
    Config(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("upstream fetch error: {0}")]
    UpstreamFetch(String),
    #[error("event error: {0}")]
    Event(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("append error: {0}")]
    Append(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<serde_json::Error> for LoaderError {
    fn from(e: serde_json::Error) -> Self { LoaderError::Event(e.to_string()) }
}

impl From<object_store::Error> for LoaderError {
    fn from(e: object_store::Error) -> Self { LoaderError::UpstreamFetch(e.to_string()) }
}

impl From<parquet::errors::ParquetError> for LoaderError {
    fn from(e: parquet::errors::ParquetError) -> Self { LoaderError::Decode(e.to_string()) }
}

impl From<arrow::error::ArrowError> for LoaderError {
    fn from(e: arrow::error::ArrowError) -> Self { LoaderError::Decode(e.to_string()) }
}

impl From<sqlx::Error> for LoaderError {
    fn from(e: sqlx::Error) -> Self { LoaderError::Append(e.to_string()) }
}
