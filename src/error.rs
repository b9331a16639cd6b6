//! Error types for graph loading and navigation.

use std::io;

use thiserror::Error;

/// The error type for graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The payload JSON did not have the expected shape or field types.
    #[error("malformed graph payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// A Graphviz DOT document could not be read.
    #[error("invalid DOT input at line {line}: {message}")]
    InvalidDot { line: usize, message: String },

    /// Reading the payload source failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The payload has no nodes, so no entry point can be chosen.
    #[error("graph has no entry point")]
    NoRootFound,

    /// An operation referenced a node id absent from the current payload.
    #[error("unknown node: {0}")]
    UnknownNode(String),
}

/// A specialized Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
