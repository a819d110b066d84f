//! Convergence poller.
//!
//! Blocking operations fire a single action and then wait here until the
//! database's observed status lands in a target set, or the retry budget runs
//! out.
//!
//! # Iteration
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!      sleep(interval) ──▶ fetch ──┬──▶ status ∈ target ──▶ Ok(snapshot)
//!                                  ├──▶ gone (deletion) ──▶ Err(Gone)
//!                                  ├──▶ decode (deletion) ▶ abort
//!                                  ├──▶ fetch failed ─────┐ │
//!                                  └──▶ other status ─────┤ │
//!                                                         ▼ │
//!                                     attempts left? ── yes─┘
//!                                           │ no
//!                                           ▼
//!                                   ConvergenceTimeout
//! ```
//!
//! The sleep always precedes the fetch, so a poll that matches on attempt `N`
//! has waited exactly `N × interval`. The interval never changes between
//! attempts.

use std::fmt;
use std::time::Duration;

use astra_ops_core::{Database, DatabaseId, DatabaseStatus};
use async_trait::async_trait;

use crate::error::{ClientError, Result};

/// Source of database snapshots for the poller.
///
/// Implemented by [`AstraClient`](crate::AstraClient); tests substitute
/// scripted implementations.
#[async_trait]
pub trait DatabaseSource: Send + Sync {
    /// Fetch a fresh snapshot of the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service rejects it, or the
    /// body cannot be decoded.
    async fn find_db(&self, id: &DatabaseId) -> Result<Database>;
}

/// Attempt budget for a convergence poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Default budget while waiting for a new database to become active.
    pub const CREATE: Self = Self::fixed(30, Duration::from_secs(30));
    /// Default budget while waiting for a database to park.
    pub const PARK: Self = Self::fixed(30, Duration::from_secs(30));
    /// Default budget while waiting for a parked database to become active.
    pub const UNPARK: Self = Self::fixed(60, Duration::from_secs(30));
    /// Default budget while waiting for a database to be deleted.
    pub const TERMINATE: Self = Self::fixed(30, Duration::from_secs(10));

    const fn fixed(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Create a policy of `attempts` fetches spaced `interval` apart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidPolicy` if `attempts` is zero.
    pub fn new(attempts: u32, interval: Duration) -> Result<Self> {
        if attempts == 0 {
            return Err(ClientError::InvalidPolicy(
                "attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self::fixed(attempts, interval))
    }

    /// Create a policy with the interval given in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidPolicy` if `attempts` is zero.
    pub fn from_secs(attempts: u32, interval_seconds: u64) -> Result<Self> {
        Self::new(attempts, Duration::from_secs(interval_seconds))
    }

    /// Maximum number of fetches.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait before each fetch.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Total wait budget, `attempts × interval`.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }
}

/// The condition a poll waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    statuses: Vec<DatabaseStatus>,
    gone_codes: Vec<u16>,
    decode_is_fatal: bool,
}

impl Target {
    /// Wait for a single status.
    #[must_use]
    pub fn status(status: DatabaseStatus) -> Self {
        Self::any_of([status])
    }

    /// Wait for any status in the set.
    #[must_use]
    pub fn any_of(statuses: impl IntoIterator<Item = DatabaseStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            gone_codes: Vec::new(),
            decode_is_fatal: false,
        }
    }

    /// Wait for deletion: any status for which
    /// [`DatabaseStatus::is_deleted`] holds, or a fetch rejected with one of
    /// `gone_codes`.
    ///
    /// A snapshot that cannot be decoded aborts a deletion poll.
    #[must_use]
    pub fn deleted(gone_codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            statuses: DatabaseStatus::ALL
                .into_iter()
                .filter(|status| status.is_deleted())
                .collect(),
            gone_codes: gone_codes.into_iter().collect(),
            decode_is_fatal: true,
        }
    }

    /// Returns true if `status` satisfies this target.
    #[must_use]
    pub fn matches(&self, status: DatabaseStatus) -> bool {
        self.statuses.contains(&status)
    }

    /// Returns true if a failed fetch means the database no longer exists.
    #[must_use]
    pub fn is_gone(&self, err: &ClientError) -> bool {
        err.rejected_status()
            .is_some_and(|code| self.gone_codes.contains(&code))
    }

    /// Returns true if the poller should count `err` against the budget and
    /// keep going.
    #[must_use]
    pub fn absorbs(&self, err: &ClientError) -> bool {
        match err.root() {
            ClientError::Decode(_) => !self.decode_is_fatal,
            other => other.is_retriable(),
        }
    }

    /// The statuses that satisfy this target.
    #[must_use]
    pub fn statuses(&self) -> &[DatabaseStatus] {
        &self.statuses
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .statuses
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        f.write_str(&names)
    }
}

/// Poll `source` until the database satisfies `target` or `policy` is spent,
/// returning the matching snapshot.
///
/// Failed fetches are logged and count against the budget, as do undecodable
/// snapshots unless `target` is a deletion target.
///
/// # Errors
///
/// Returns `ClientError::ConvergenceTimeout` once every attempt has been used,
/// `ClientError::Gone` if a deletion target sees a gone code, or the failure
/// that aborted the poll.
pub async fn poll_until<S>(
    source: &S,
    id: &DatabaseId,
    target: &Target,
    policy: RetryPolicy,
    verbose: bool,
) -> Result<Database>
where
    S: DatabaseSource + ?Sized,
{
    let mut last_status = None;
    let mut last_error = None;

    for attempt in 1..=policy.attempts() {
        tokio::time::sleep(policy.interval()).await;
        let remaining = policy.attempts() - attempt;

        match source.find_db(id).await {
            Ok(db) if target.matches(db.status) => {
                tracing::debug!(
                    database_id = %id,
                    status = %db.status,
                    attempt,
                    "Database reached expected status"
                );
                return Ok(db);
            }
            Ok(db) => {
                last_status = Some(db.status);
                if verbose {
                    tracing::info!(
                        database_id = %id,
                        status = %db.status,
                        expected = %target,
                        remaining,
                        "Database not yet in expected status, trying again"
                    );
                } else {
                    tracing::info!("waiting");
                }
            }
            Err(err) if target.is_gone(&err) => {
                tracing::debug!(
                    database_id = %id,
                    attempt,
                    "Database no longer exists"
                );
                return Err(ClientError::Gone(id.clone()));
            }
            Err(err) if target.absorbs(&err) => {
                if verbose {
                    tracing::info!(
                        database_id = %id,
                        error = %err,
                        remaining,
                        "Unable to fetch database, trying again"
                    );
                } else {
                    tracing::info!("waiting");
                }
                last_error = Some(err.to_string());
            }
            Err(err) => {
                tracing::error!(database_id = %id, error = %err, "Aborting poll");
                return Err(err);
            }
        }
    }

    Err(ClientError::ConvergenceTimeout {
        id: id.clone(),
        target: target.clone(),
        budget: policy.budget(),
        last_status,
        last_error,
    })
}
