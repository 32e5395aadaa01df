// Copyright (c) 2025 - Cowboy AI, Inc.
//! Logical Identifier Value Object
//!
//! Every declared resource carries a stack-local [`LogicalId`]. Resources
//! point at each other through [`Reference`] values built from these ids,
//! which is what the dependency graph is computed from.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Logical identifier validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicalIdError {
    #[error("Logical id is empty")]
    Empty,

    #[error("Logical id exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in logical id: {0:?}")]
    InvalidCharacter(char),

    #[error("Logical id must start with a letter: {0}")]
    InvalidLeadingCharacter(String),
}

/// Stack-local resource identifier
///
/// Invariants:
/// - Non-empty, at most 255 characters
/// - ASCII alphanumeric only
/// - Starts with a letter
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::LogicalId;
///
/// let id = LogicalId::new("VpcPublicSubnet1").unwrap();
/// assert_eq!(id.as_str(), "VpcPublicSubnet1");
///
/// assert!(LogicalId::new("allow-http").is_err());
/// assert!(LogicalId::new("1Vpc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Maximum identifier length accepted by the provisioning engine
    pub const MAX_LENGTH: usize = 255;

    /// Create a new logical id with validation
    pub fn new(id: impl Into<String>) -> Result<Self, LogicalIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(LogicalIdError::Empty);
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(LogicalIdError::TooLong(id.len()));
        }

        if let Some(ch) = id.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(LogicalIdError::InvalidCharacter(ch));
        }

        if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(LogicalIdError::InvalidLeadingCharacter(id));
        }

        Ok(Self(id))
    }

    /// Derive a child id by appending a suffix
    ///
    /// `Vpc` + `PublicSubnet1` gives `VpcPublicSubnet1`.
    pub fn child(&self, suffix: impl fmt::Display) -> Result<Self, LogicalIdError> {
        Self::new(format!("{}{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

/// Reference from one declared resource to another
///
/// A plain reference resolves to the target's primary identifier; an
/// attribute reference resolves to one named attribute of the target
/// (for example a NAT gateway's `AllocationId` on its elastic IP).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub target: LogicalId,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attribute: Option<String>,
}

impl Reference {
    /// Reference the target's primary identifier
    pub fn to(target: &LogicalId) -> Self {
        Self {
            target: target.clone(),
            attribute: None,
        }
    }

    /// Reference one attribute of the target
    pub fn attribute(target: &LogicalId, attribute: impl Into<String>) -> Self {
        Self {
            target: target.clone(),
            attribute: Some(attribute.into()),
        }
    }

    pub fn target(&self) -> &LogicalId {
        &self.target
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{}.{}", self.target, attr),
            None => write!(f, "{}", self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_logical_ids() {
        assert!(LogicalId::new("Vpc").is_ok());
        assert!(LogicalId::new("VpcPrivateSubnet2RouteTable").is_ok());
        assert!(LogicalId::new("a1").is_ok());
    }

    #[test]
    fn test_invalid_logical_ids() {
        assert_eq!(LogicalId::new(""), Err(LogicalIdError::Empty));
        assert_eq!(
            LogicalId::new("allow-http"),
            Err(LogicalIdError::InvalidCharacter('-'))
        );
        assert_eq!(
            LogicalId::new("db secret"),
            Err(LogicalIdError::InvalidCharacter(' '))
        );
        assert!(matches!(
            LogicalId::new("9Lives"),
            Err(LogicalIdError::InvalidLeadingCharacter(_))
        ));
    }

    #[test]
    fn test_length_limit() {
        assert!(LogicalId::new("a".repeat(255)).is_ok());
        assert_eq!(
            LogicalId::new("a".repeat(256)),
            Err(LogicalIdError::TooLong(256))
        );
    }

    #[test]
    fn test_child_ids() {
        let vpc = LogicalId::new("Vpc").unwrap();
        let subnet = vpc.child("PublicSubnet1").unwrap();
        assert_eq!(subnet.as_str(), "VpcPublicSubnet1");
        assert!(vpc.child("Public-1").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: LogicalId = serde_json::from_str("\"Database\"").unwrap();
        assert_eq!(id.as_str(), "Database");
        assert!(serde_json::from_str::<LogicalId>("\"not valid\"").is_err());
    }

    #[test]
    fn test_reference_display() {
        let eip = LogicalId::new("VpcNatGateway1Eip").unwrap();
        assert_eq!(Reference::to(&eip).to_string(), "VpcNatGateway1Eip");
        assert_eq!(
            Reference::attribute(&eip, "AllocationId").to_string(),
            "VpcNatGateway1Eip.AllocationId"
        );
    }
}
