// Copyright (c) 2025 - Cowboy AI, Inc.
//! Generated Credential Secrets
//!
//! A secret is declared as a template: fixed fields are known up front, the
//! generated field is filled in by the secret store at apply time. The value
//! of the generated field never appears in any declaration or manifest;
//! consumers hold a [`SecretFieldRef`] instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::LogicalId;

/// Secret template error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("Generated field {0:?} collides with a fixed field")]
    GeneratedFieldIsFixed(String),

    #[error("Generated length must be between 1 and 4096, got {0}")]
    InvalidLength(u16),

    #[error("Secret field name is empty")]
    EmptyFieldName,
}

/// Constraints on the generated value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    pub length: u16,
    pub exclude_punctuation: bool,
    pub include_space: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub exclude_characters: String,
}

impl GenerationConstraints {
    pub fn new(length: u16) -> Result<Self, SecretError> {
        if length == 0 || length > 4096 {
            return Err(SecretError::InvalidLength(length));
        }
        Ok(Self {
            length,
            exclude_punctuation: false,
            include_space: false,
            exclude_characters: String::new(),
        })
    }

    pub fn excluding_punctuation(mut self) -> Self {
        self.exclude_punctuation = true;
        self
    }

    /// Whether `ch` may appear in a generated value
    pub fn allows(&self, ch: char) -> bool {
        if ch == ' ' {
            return self.include_space;
        }
        if !ch.is_ascii_graphic() {
            return false;
        }
        if self.exclude_punctuation && ch.is_ascii_punctuation() {
            return false;
        }
        !self.exclude_characters.contains(ch)
    }

    /// Whether a candidate value satisfies every constraint
    pub fn admits(&self, candidate: &str) -> bool {
        candidate.chars().count() == usize::from(self.length) && candidate.chars().all(|c| self.allows(c))
    }
}

/// Fixed fields plus one generated field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTemplate {
    pub fixed_fields: BTreeMap<String, String>,
    pub generated_field: String,
    pub constraints: GenerationConstraints,
}

impl SecretTemplate {
    pub fn new(
        fixed_fields: BTreeMap<String, String>,
        generated_field: impl Into<String>,
        constraints: GenerationConstraints,
    ) -> Result<Self, SecretError> {
        let generated_field = generated_field.into();
        if generated_field.is_empty() || fixed_fields.keys().any(String::is_empty) {
            return Err(SecretError::EmptyFieldName);
        }
        if fixed_fields.contains_key(&generated_field) {
            return Err(SecretError::GeneratedFieldIsFixed(generated_field));
        }
        Ok(Self {
            fixed_fields,
            generated_field,
            constraints,
        })
    }

    /// `{"username": "admin"}` + generated `password`
    pub fn username_password(
        username: impl Into<String>,
        constraints: GenerationConstraints,
    ) -> Result<Self, SecretError> {
        let mut fixed = BTreeMap::new();
        fixed.insert("username".to_string(), username.into());
        Self::new(fixed, "password", constraints)
    }

    /// The fixed fields serialized as the JSON string the store starts from
    pub fn template_string(&self) -> String {
        // a map of strings always serializes
        serde_json::to_string(&self.fixed_fields).unwrap_or_default()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.generated_field == field || self.fixed_fields.contains_key(field)
    }

    pub fn is_generated(&self, field: &str) -> bool {
        self.generated_field == field
    }
}

/// Secret whose generated field is produced by the store at apply time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSecret {
    pub logical_id: LogicalId,
    pub secret_name: String,
    pub description: String,
    pub template: SecretTemplate,
}

impl CredentialSecret {
    /// Reference one field of this secret, if the template has it
    pub fn field(&self, field: &str) -> Option<SecretFieldRef> {
        self.template.has_field(field).then(|| SecretFieldRef {
            secret: self.logical_id.clone(),
            field: field.to_string(),
        })
    }
}

/// Pointer to one JSON field of a secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretFieldRef {
    pub secret: LogicalId,
    pub field: String,
}

impl fmt::Display for SecretFieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secret:{}:{}", self.secret, self.field)
    }
}
