// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology operations

use thiserror::Error;

use crate::domain::{
    ComputeError, LogicalIdError, NetworkError, SecretError, ValidationError,
};
use crate::graph::GraphError;

/// Errors that can occur while building, rendering or handing off a topology
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Address space or subnet planning error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Invalid logical identifier
    #[error("Logical id error: {0}")]
    LogicalId(#[from] LogicalIdError),

    /// Invalid compute value
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// Invalid secret template
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    /// Invariant violation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Dependency graph error
    #[error("Dependency graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Hand-off to the reconciliation engine failed
    #[error("Hand-off error: {0}")]
    Handoff(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}
