//! Database lifecycle status.
//!
//! The remote service reports one of a closed set of statuses. Mutating
//! operations move a database through the transitional statuses until it
//! settles:
//!
//! ```text
//!   PENDING ──▶ PREPARING ──▶ PREPARED ──▶ INITIALIZING ──▶ ACTIVE
//!                                                           │  ▲
//!                                          (park)           │  │ (unpark)
//!                                                           ▼  │
//!                                    PARKING ──▶ PARKED ──▶ UNPARKING
//!
//!   ACTIVE ──▶ RESIZING ──▶ ACTIVE
//!   any    ──▶ TERMINATING ──▶ TERMINATED (then eventually gone)
//!   any    ──▶ ERROR | MAINTENANCE
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of a remote database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseStatus {
    /// Serving traffic.
    Active,
    /// Accepted, waiting for provisioning.
    Pending,
    /// Provisioning in progress.
    Preparing,
    /// Provisioned but not yet initialized.
    Prepared,
    /// Starting up.
    Initializing,
    /// Compute released, data preserved.
    Parked,
    /// Park in progress.
    Parking,
    /// Unpark in progress.
    Unparking,
    /// Deleted.
    Terminated,
    /// Delete in progress.
    Terminating,
    /// Capacity change in progress.
    Resizing,
    /// Failed.
    Error,
    /// Under operator maintenance.
    Maintenance,
    /// Status not recognised.
    Unknown,
}

impl DatabaseStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::Active,
        Self::Pending,
        Self::Preparing,
        Self::Prepared,
        Self::Initializing,
        Self::Parked,
        Self::Parking,
        Self::Unparking,
        Self::Terminated,
        Self::Terminating,
        Self::Resizing,
        Self::Error,
        Self::Maintenance,
        Self::Unknown,
    ];

    /// The wire representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Pending => "PENDING",
            Self::Preparing => "PREPARING",
            Self::Prepared => "PREPARED",
            Self::Initializing => "INITIALIZING",
            Self::Parked => "PARKED",
            Self::Parking => "PARKING",
            Self::Unparking => "UNPARKING",
            Self::Terminated => "TERMINATED",
            Self::Terminating => "TERMINATING",
            Self::Resizing => "RESIZING",
            Self::Error => "ERROR",
            Self::Maintenance => "MAINTENANCE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire value, mapping anything unrecognised to `Unknown`.
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }

    /// Returns true if the database is deleted, or far enough into deletion
    /// that the delete can no longer be reverted.
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::Terminated | Self::Terminating)
    }

    /// Returns true if the remote service is still working on a transition.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Preparing
                | Self::Prepared
                | Self::Initializing
                | Self::Parking
                | Self::Unparking
                | Self::Terminating
                | Self::Resizing
        )
    }

    /// Returns true if the status will not change without a new action.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            Self::Active | Self::Parked | Self::Terminated | Self::Error
        )
    }
}

impl fmt::Display for DatabaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known status values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised database status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for DatabaseStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for DatabaseStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}
