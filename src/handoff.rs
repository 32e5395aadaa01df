// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hand-off to the reconciliation engine
//!
//! The descriptor never applies anything itself. A rendered [`Manifest`] is
//! handed to whatever engine converges the cloud on it, through a
//! [`ManifestPublisher`]:
//!
//! - [`NatsPublisher`] publishes a [`HandoffEnvelope`] on the stack's subject
//! - [`FilePublisher`] writes the manifest as pretty JSON for file-based engines

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{TopologyError, TopologyResult};
use crate::manifest::Manifest;
use crate::subjects::{self, Operation};

/// Message carried to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffEnvelope {
    pub message_id: Uuid,
    pub stack_name: String,
    pub stack_version: u32,
    pub operation: String,
    pub published_at: DateTime<Utc>,
    /// Absent for withdrawals
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub manifest: Option<Manifest>,
}

impl HandoffEnvelope {
    pub fn synthesized(manifest: &Manifest) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            stack_name: manifest.stack_name().to_string(),
            stack_version: manifest.stack_version(),
            operation: Operation::Synthesized.to_string(),
            published_at: Utc::now(),
            manifest: Some(manifest.clone()),
        }
    }

    pub fn withdrawn(stack_name: &str, stack_version: u32) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            stack_name: stack_name.to_string(),
            stack_version,
            operation: Operation::Withdrawn.to_string(),
            published_at: Utc::now(),
            manifest: None,
        }
    }
}

/// Where a hand-off went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReceipt {
    pub message_id: Uuid,
    pub destination: String,
}

/// Delivers manifests to a reconciliation engine
#[async_trait]
pub trait ManifestPublisher: Send + Sync {
    /// Hand over a manifest to be applied
    async fn publish(&self, manifest: &Manifest) -> TopologyResult<HandoffReceipt>;

    /// Ask for the stack to be torn down
    async fn withdraw(&self, stack_name: &str, stack_version: u32)
        -> TopologyResult<HandoffReceipt>;
}

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "topology-publisher".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl NatsConfig {
    /// `NATS_URL` may hold several comma-separated servers
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("NATS_URL") {
            config.servers = url
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        config
    }
}

/// Publishes hand-off envelopes over NATS
#[derive(Clone)]
pub struct NatsPublisher {
    client: Client,
}

impl NatsPublisher {
    /// Connect with the given configuration
    pub async fn connect(config: NatsConfig) -> TopologyResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout)
            .request_timeout(Some(config.request_timeout));

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| TopologyError::Handoff(format!("NATS connection failed: {}", e)))?;

        info!("Connected to NATS at {:?}", config.servers);
        Ok(Self { client })
    }

    async fn send(&self, subject: String, envelope: &HandoffEnvelope) -> TopologyResult<HandoffReceipt> {
        let payload = serde_json::to_vec(envelope)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| TopologyError::Handoff(format!("NATS publish failed: {}", e)))?;

        // publish only buffers; flush so a failure surfaces here
        self.client
            .flush()
            .await
            .map_err(|e| TopologyError::Handoff(format!("NATS flush failed: {}", e)))?;

        debug!(message_id = %envelope.message_id, "Published to subject: {}", subject);
        Ok(HandoffReceipt {
            message_id: envelope.message_id,
            destination: subject,
        })
    }
}

#[async_trait]
impl ManifestPublisher for NatsPublisher {
    async fn publish(&self, manifest: &Manifest) -> TopologyResult<HandoffReceipt> {
        let subject = subjects::synthesized(manifest.stack_name(), manifest.stack_version());
        self.send(subject, &HandoffEnvelope::synthesized(manifest)).await
    }

    async fn withdraw(
        &self,
        stack_name: &str,
        stack_version: u32,
    ) -> TopologyResult<HandoffReceipt> {
        let subject = subjects::withdrawn(stack_name, stack_version);
        self.send(subject, &HandoffEnvelope::withdrawn(stack_name, stack_version))
            .await
    }
}

/// Writes the manifest to a file
#[derive(Debug, Clone)]
pub struct FilePublisher {
    path: PathBuf,
}

impl FilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ManifestPublisher for FilePublisher {
    async fn publish(&self, manifest: &Manifest) -> TopologyResult<HandoffReceipt> {
        let mut json = manifest.to_json_pretty()?;
        json.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;

        info!("Wrote manifest to {}", self.path.display());
        Ok(HandoffReceipt {
            message_id: Uuid::now_v7(),
            destination: self.path.display().to_string(),
        })
    }

    /// Removes the manifest file; a missing file is already withdrawn
    async fn withdraw(
        &self,
        stack_name: &str,
        _stack_version: u32,
    ) -> TopologyResult<HandoffReceipt> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!(stack = stack_name, "Removed manifest {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(stack = stack_name, "No manifest at {}", self.path.display())
            }
            Err(e) => return Err(e.into()),
        }
        Ok(HandoffReceipt {
            message_id: Uuid::now_v7(),
            destination: self.path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::descriptor::TopologyDescriptor;

    fn manifest() -> Manifest {
        let topology = TopologyDescriptor::build(&StackConfig::default()).unwrap();
        Manifest::render(&topology).unwrap()
    }

    #[tokio::test]
    async fn test_file_publisher_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FilePublisher::new(dir.path().join("out").join("stack.json"));
        let manifest = manifest();

        let receipt = publisher.publish(&manifest).await.unwrap();
        assert!(receipt.destination.ends_with("stack.json"));

        let written = tokio::fs::read_to_string(publisher.path()).await.unwrap();
        let parsed: Manifest = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, manifest);

        publisher.withdraw("CdkprojectStack", 1).await.unwrap();
        assert!(!publisher.path().exists());
    }

    #[test]
    fn test_withdraw_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FilePublisher::new(dir.path().join("absent.json"));
        assert!(tokio_test::block_on(publisher.withdraw("CdkprojectStack", 1)).is_ok());
    }

    #[test]
    fn test_envelopes() {
        let manifest = manifest();
        let envelope = HandoffEnvelope::synthesized(&manifest);
        assert_eq!(envelope.operation, "synthesized");
        assert_eq!(envelope.stack_name, "CdkprojectStack");
        assert!(envelope.manifest.is_some());

        let withdrawn = HandoffEnvelope::withdrawn("CdkprojectStack", 1);
        let json = serde_json::to_value(&withdrawn).unwrap();
        assert_eq!(json["operation"], "withdrawn");
        assert!(json.get("manifest").is_none());
        assert_ne!(withdrawn.message_id, envelope.message_id);
    }

    #[test]
    fn test_nats_config_defaults() {
        let config = NatsConfig::default();
        assert_eq!(config.servers, vec!["nats://localhost:4222".to_string()]);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }
}
