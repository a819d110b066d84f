//! Data-transfer objects exchanged with the database operations API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DatabaseId;
use crate::status::DatabaseStatus;

/// A snapshot of a remote database as returned by the fetch endpoint.
///
/// Snapshots are never mutated or cached; every fetch produces a fresh value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Database identifier.
    pub id: DatabaseId,
    /// Owning organization.
    #[serde(default)]
    pub org_id: String,
    /// Owning user.
    #[serde(default)]
    pub owner_id: String,
    /// User supplied metadata.
    #[serde(default)]
    pub info: DatabaseInfo,
    /// When the database was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    /// When the database was terminated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_time: Option<DateTime<Utc>>,
    /// Current lifecycle status.
    pub status: DatabaseStatus,
    /// Storage layout.
    #[serde(default)]
    pub storage: Storage,
    /// Actions the service will currently accept for this database.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_actions: Vec<String>,
    /// Message from the service about the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Studio URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio_url: Option<String>,
    /// Grafana dashboard URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana_url: Option<String>,
    /// Web CQL shell URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cqlsh_url: Option<String>,
    /// GraphQL endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphql_url: Option<String>,
    /// REST data endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_endpoint_url: Option<String>,
}

/// Metadata describing a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    /// User friendly name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Primary keyspace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub keyspace: String,
    /// Cloud provider hosting the database.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cloud_provider: String,
    /// Compute tier (vertical scaling).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tier: String,
    /// Capacity units (horizontal scaling).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub capacity_units: u32,
    /// Cloud region.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    /// Database user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Keyspaces beyond the primary one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_keyspaces: Vec<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Storage available to a database cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    /// Number of nodes.
    #[serde(default)]
    pub node_count: u32,
    /// Copies of each piece of data.
    #[serde(default)]
    pub replication_factor: u32,
    /// Total storage in GB.
    #[serde(default)]
    pub total_storage: u32,
    /// Used storage in GB.
    #[serde(default)]
    pub used_storage: u32,
}

/// Request body for creating a database.
///
/// `user` and `password` are only required on legacy tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabase {
    /// User friendly name.
    pub name: String,
    /// Primary keyspace.
    pub keyspace: String,
    /// Cloud provider, e.g. `GCP`.
    pub cloud_provider: String,
    /// Compute tier, e.g. `serverless`.
    pub tier: String,
    /// Initial capacity units.
    pub capacity_units: u32,
    /// Cloud region, e.g. `europe-west1`.
    pub region: String,
    /// Database user.
    #[serde(default)]
    pub user: String,
    /// Password for `user`.
    #[serde(default)]
    pub password: String,
}

impl CreateDatabase {
    /// Create a request with a single capacity unit and no legacy credentials.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        keyspace: impl Into<String>,
        cloud_provider: impl Into<String>,
        region: impl Into<String>,
        tier: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            keyspace: keyspace.into(),
            cloud_provider: cloud_provider.into(),
            tier: tier.into(),
            capacity_units: 1,
            region: region.into(),
            user: String::new(),
            password: String::new(),
        }
    }

    /// Set the number of capacity units.
    #[must_use]
    pub const fn with_capacity_units(mut self, capacity_units: u32) -> Self {
        self.capacity_units = capacity_units;
        self
    }

    /// Set legacy-tier credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }
}

/// A single error reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Service specific error code.
    #[serde(default, alias = "ID")]
    pub id: i64,
    /// Human readable description.
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// Create a new API error.
    #[must_use]
    pub fn new(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

/// Error body returned by the remote service on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Errors in the order the service returned them.
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// Format API errors as `ID: <id> Text: '<message>'`, joined by `", "`.
///
/// Order is preserved; an empty slice formats as an empty string.
#[must_use]
pub fn format_errors(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|e| format!("ID: {} Text: '{}'", e.id, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}
