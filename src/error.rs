//! Error types for the miner
//!
//! One variant family per failure domain, built on `thiserror`. Every
//! fallible API in the crate returns [`Result`]; nothing in the worker hash
//! loop itself is fallible.

use thiserror::Error;

/// Block-template parsing and validation errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("missing field `{field}` in block template")]
    MissingField { field: &'static str },

    #[error("invalid field `{field}` in block template: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("compact bits 0x{bits:08x} out of range: {reason}")]
    BadBits { bits: u32, reason: &'static str },

    #[error("invalid hex in hash value: {0}")]
    InvalidHash(String),
}

/// RandomX allocation / initialization errors
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to allocate RandomX cache")]
    CacheAlloc,

    #[error("failed to allocate RandomX cache on NUMA node {node}")]
    NodeCacheAlloc { node: usize },

    #[error("failed to allocate RandomX dataset (need ~2GB free RAM)")]
    DatasetAlloc,

    #[error("failed to create RandomX VM #{worker}")]
    VmCreate { worker: usize },

    #[error("failed to create RandomX VM on NUMA node {node}")]
    NodeVmCreate { node: usize },

    #[error("VM pool is not initialized")]
    NotInitialized,

    #[error("pool is keyed with a different seed than the template")]
    SeedMismatch,
}

/// JSON-RPC transport and protocol errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from node")]
    Status { status: u16 },

    #[error("failed to parse RPC response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error from node: {message}")]
    Server { message: String },

    #[error("invalid RPC response: no result field")]
    MissingResult,
}

/// Top-level error type for the miner
#[derive(Error, Debug)]
pub enum Error {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("RandomX init error: {0}")]
    Init(#[from] InitError),

    #[error("thread resize failed: {0}")]
    Resize(#[source] InitError),

    #[error("seed update failed: {0}")]
    SeedUpdate(#[source] InitError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("block rejected by node: {status}")]
    SubmissionRejected { status: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the miner
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Missing block-template field
    pub fn template_missing(field: &'static str) -> Self {
        Self::Template(TemplateError::MissingField { field })
    }

    /// Malformed block-template field
    pub fn template_invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Template(TemplateError::InvalidField {
            field,
            reason: reason.into(),
        })
    }

    /// True for errors the control loop treats as a lost connection
    /// rather than a fatal condition.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Rpc(RpcError::Http(_))
                | Error::Rpc(RpcError::Status { .. })
                | Error::Rpc(RpcError::MissingResult)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::template_missing("previousblockhash");
        assert!(err
            .to_string()
            .contains("missing field `previousblockhash`"));

        let err = Error::Init(InitError::DatasetAlloc);
        assert!(err.to_string().contains("RandomX dataset"));

        let err = Error::SubmissionRejected {
            status: "duplicate-invalid".to_string(),
        };
        assert!(err.to_string().contains("duplicate-invalid"));
    }

    #[test]
    fn test_transient_classification() {
        let rpc = Error::Rpc(RpcError::Status { status: 503 });
        assert!(rpc.is_transient());

        let tmpl = Error::template_missing("bits");
        assert!(!tmpl.is_transient());

        let seed = Error::SeedUpdate(InitError::CacheAlloc);
        assert!(!seed.is_transient());
    }

    #[test]
    fn test_resize_source_chain() {
        let err = Error::Resize(InitError::DatasetAlloc);
        assert!(err.to_string().contains("thread resize failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
