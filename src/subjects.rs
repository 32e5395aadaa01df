// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for topology hand-off
//!
//! Rendered manifests are handed to the reconciliation engine over NATS.
//!
//! # Subject Pattern
//!
//! ```text
//! topology.{stack}.v{version}.{operation}
//! ```
//!
//! This allows for:
//! - Precise subscriptions (`topology.cdkprojectstack.v1.synthesized`)
//! - Stack-level wildcards (`topology.cdkprojectstack.>`)
//! - Global subscriptions (`topology.>`)
//!
//! # Examples
//!
//! ```rust
//! use cim_topology::subjects::{SubjectBuilder, Operation};
//!
//! let subject = SubjectBuilder::new("CdkprojectStack", 1)
//!     .operation(Operation::Synthesized)
//!     .build();
//! assert_eq!(subject, "topology.cdkprojectstack.v1.synthesized");
//!
//! let wildcard = SubjectBuilder::new("CdkprojectStack", 1).build_wildcard();
//! assert_eq!(wildcard, "topology.cdkprojectstack.>");
//! ```

use std::fmt;

/// Root namespace for all topology subjects
pub const TOPOLOGY_ROOT: &str = "topology";

/// Hand-off operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A manifest was rendered and should be applied
    Synthesized,
    /// The stack should be torn down
    Withdrawn,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Synthesized => write!(f, "synthesized"),
            Operation::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

/// Builder for topology NATS subjects
///
/// Stack names become a single lowercase token; characters NATS treats
/// specially (`.`, `*`, `>`, whitespace) are replaced with `_`.
#[derive(Debug, Clone)]
pub struct SubjectBuilder {
    stack: String,
    version: u32,
    operation: Operation,
}

impl SubjectBuilder {
    /// Create a builder for one stack version; the operation defaults to
    /// [`Operation::Synthesized`]
    pub fn new(stack: &str, version: u32) -> Self {
        Self {
            stack: sanitize_token(stack),
            version,
            operation: Operation::Synthesized,
        }
    }

    /// Set the operation
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Build the complete subject string
    pub fn build(self) -> String {
        format!(
            "{}.{}.v{}.{}",
            TOPOLOGY_ROOT, self.stack, self.version, self.operation
        )
    }

    /// Build a wildcard subscription for every version and operation of this stack
    ///
    /// Returns: `topology.{stack}.>`
    pub fn build_wildcard(self) -> String {
        format!("{}.{}.>", TOPOLOGY_ROOT, self.stack)
    }

    /// Build a subscription for all topology hand-offs
    ///
    /// Returns: `topology.>`
    pub fn build_all() -> String {
        format!("{}.>", TOPOLOGY_ROOT)
    }
}

fn sanitize_token(raw: &str) -> String {
    let token: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    if token.is_empty() {
        "_".to_string()
    } else {
        token
    }
}

/// Subject a stack's rendered manifest is published on
pub fn synthesized(stack: &str, version: u32) -> String {
    SubjectBuilder::new(stack, version)
        .operation(Operation::Synthesized)
        .build()
}

/// Subject a stack's teardown request is published on
pub fn withdrawn(stack: &str, version: u32) -> String {
    SubjectBuilder::new(stack, version)
        .operation(Operation::Withdrawn)
        .build()
}
