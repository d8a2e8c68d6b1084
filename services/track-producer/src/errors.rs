//!
//! src/errors.rs  Andrew Belles  Oct 2nd, 2025 
//!
//! Defines enums and methods of error conversion 
//! for errors the producer uses 
//!
//!

use thiserror::Error; 

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("upstream fetch error: {0}")]
    UpstreamFetch(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("catalog search for {0:?} returned no tracks")]
    EmptySearch(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for ProducerError {
    fn from(e: reqwest::Error) -> Self { ProducerError::UpstreamFetch(e.to_string()) }
}

impl From<serde_json::Error> for ProducerError {
    fn from(e: serde_json::Error) -> Self { ProducerError::Parse(e.to_string()) }
}

impl From<arrow::error::ArrowError> for ProducerError {
    fn from(e: arrow::error::ArrowError) -> Self { ProducerError::Encode(e.to_string()) }
}

impl From<serde_arrow::Error> for ProducerError {
    fn from(e: serde_arrow::Error) -> Self { ProducerError::Encode(e.to_string()) }
}

impl From<object_store::Error> for ProducerError {
    fn from(e: object_store::Error) -> Self { ProducerError::Storage(e.to_string()) }
}
