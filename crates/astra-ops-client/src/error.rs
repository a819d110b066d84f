//! Error types for the operations client.
//!
//! Every public operation returns either its result or a single
//! [`ClientError`] whose `Display` output is suitable for showing to a user.

use std::time::Duration;

use astra_ops_core::{format_errors, ApiError, DatabaseId, DatabaseStatus};
use thiserror::Error;

use crate::poll::Target;

/// A result type using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the database operations API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a status code outside the expected set.
    #[error(
        "expected status {} but had: {actual} error with {}",
        format_codes(.expected),
        describe_errors(.errors, .detail.as_deref())
    )]
    RemoteRejection {
        /// Status codes that would have been accepted.
        expected: Vec<u16>,
        /// Status code actually returned.
        actual: u16,
        /// Structured errors from the response body, in response order.
        errors: Vec<ApiError>,
        /// Why the body could not be read as structured errors, quoting it.
        /// `None` when the body was structured or empty.
        detail: Option<String>,
    },

    /// The request failed before a response was received.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// URL of the failed request.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A response body did not have the expected shape.
    #[error("unable to decode response: {0}")]
    Decode(String),

    /// The convergence poller ran out of attempts.
    #[error(
        "unable to find db id {id} with status {target} after {budget:?}{}",
        describe_last(.last_status.as_ref(), .last_error.as_deref())
    )]
    ConvergenceTimeout {
        /// Database being waited on.
        id: DatabaseId,
        /// What the poller was waiting for.
        target: Target,
        /// Total wait budget (attempts × interval).
        budget: Duration,
        /// Status of the last snapshot fetched, if any fetch succeeded.
        last_status: Option<DatabaseStatus>,
        /// The last fetch failure, if any fetch failed.
        last_error: Option<String>,
    },

    /// A deletion poll found the database already removed.
    ///
    /// Only returned by polls with a [`Target::deleted`] target;
    /// [`AstraClient::terminate`](crate::AstraClient::terminate) treats it as
    /// success.
    #[error("database {0} no longer exists")]
    Gone(DatabaseId),

    /// A retry policy violated its invariants.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),

    /// The client could not be constructed.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// A blocking operation failed; wraps the cause with the operation name.
    #[error("{operation} failed: {source}")]
    Operation {
        /// Operation that failed, e.g. `park db`.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Wrap this error with the name of the blocking operation it aborted.
    #[must_use]
    pub fn during(self, operation: &'static str) -> Self {
        Self::Operation {
            operation,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through `Operation` wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The status code the service rejected a request with, if any.
    #[must_use]
    pub fn rejected_status(&self) -> Option<u16> {
        match self.root() {
            Self::RemoteRejection { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Returns true if a poller may absorb this error and try again later.
    ///
    /// Transport failures and rejected fetches are transient. Whether a
    /// decode failure is absorbed depends on the poll target; see
    /// [`Target::absorbs`].
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.root(),
            Self::RemoteRejection { .. } | Self::Transport { .. }
        )
    }
}

fn format_codes(codes: &[u16]) -> String {
    let joined = codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if codes.len() == 1 {
        format!("code {joined}")
    } else {
        format!("codes {joined}")
    }
}

fn describe_errors(errors: &[ApiError], detail: Option<&str>) -> String {
    match errors.len() {
        0 => detail.unwrap_or("no error details").to_string(),
        1 => format!("error - {}", format_errors(errors)),
        _ => format!("errors - {}", format_errors(errors)),
    }
}

fn describe_last(status: Option<&DatabaseStatus>, error: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(status) = status {
        out.push_str(&format!("; last status {status}"));
    }
    if let Some(error) = error {
        out.push_str(&format!("; last error: {error}"));
    }
    out
}
