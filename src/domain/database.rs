// Copyright (c) 2025 - Cowboy AI, Inc.
//! Data Block
//!
//! Managed relational database in the private subnets. Credentials are only
//! ever secret references; there is no way to construct a literal password.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{InstanceType, LogicalId, Reference, SecretFieldRef, SubnetType};

/// Database engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Mysql,
    Postgres,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Postgres => 5432,
        }
    }
}

/// Engine + version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseEngine {
    pub kind: EngineKind,
    pub version: String,
}

impl DatabaseEngine {
    pub fn mysql(version: impl Into<String>) -> Self {
        Self {
            kind: EngineKind::Mysql,
            version: version.into(),
        }
    }

    pub fn postgres(version: impl Into<String>) -> Self {
        Self {
            kind: EngineKind::Postgres,
            version: version.into(),
        }
    }

    pub fn port(&self) -> u16 {
        self.kind.default_port()
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.version)
    }
}

/// Master credentials, always resolved from a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credentials {
    FromSecret {
        username: SecretFieldRef,
        password: SecretFieldRef,
    },
}

impl Credentials {
    pub fn secret(&self) -> &LogicalId {
        match self {
            Credentials::FromSecret { password, .. } => &password.secret,
        }
    }
}

/// Automated backup settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPolicy {
    pub retention_days: u16,
    pub delete_automated_backups: bool,
}

impl BackupPolicy {
    /// No retained snapshots, nothing left behind on teardown
    pub fn disabled() -> Self {
        Self {
            retention_days: 0,
            delete_automated_backups: true,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.retention_days == 0
    }
}

/// What the engine does with the resource when it leaves the descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    pub fn as_engine_policy(&self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

/// Subnets the database may be placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbSubnetGroup {
    pub logical_id: LogicalId,
    pub description: String,
    pub subnets: Vec<Reference>,
}

/// Managed relational database
///
/// # Invariants
/// - Placed only in private subnets, never publicly accessible
/// - Credentials reference a generated secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub logical_id: LogicalId,
    pub database_name: String,
    pub engine: DatabaseEngine,
    pub instance_type: InstanceType,
    pub allocated_storage_gb: u32,
    pub subnet_group: Reference,
    pub placement: SubnetType,
    pub publicly_accessible: bool,
    pub security_groups: Vec<Reference>,
    pub credentials: Credentials,
    pub backup: BackupPolicy,
    pub removal_policy: RemovalPolicy,
}

impl DatabaseInstance {
    /// Demo posture: easy teardown over durability
    pub fn is_disposable(&self) -> bool {
        self.backup.is_disabled() && self.removal_policy == RemovalPolicy::Destroy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_ports() {
        assert_eq!(DatabaseEngine::mysql("8.0.34").port(), 3306);
        assert_eq!(DatabaseEngine::postgres("15.4").port(), 5432);
        assert_eq!(DatabaseEngine::mysql("8.0.34").to_string(), "mysql 8.0.34");
    }

    #[test]
    fn test_backup_policy() {
        let disabled = BackupPolicy::disabled();
        assert!(disabled.is_disabled());
        assert!(disabled.delete_automated_backups);
        assert_eq!(RemovalPolicy::Destroy.as_engine_policy(), "Delete");
    }

    #[test]
    fn test_credentials_secret() {
        let secret = LogicalId::new("DatabaseMasterUserSecret").unwrap();
        let creds = Credentials::FromSecret {
            username: SecretFieldRef {
                secret: secret.clone(),
                field: "username".to_string(),
            },
            password: SecretFieldRef {
                secret: secret.clone(),
                field: "password".to_string(),
            },
        };
        assert_eq!(creds.secret(), &secret);

        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["kind"], "from_secret");
        assert_eq!(json["password"]["secret"], "DatabaseMasterUserSecret");
    }
}
