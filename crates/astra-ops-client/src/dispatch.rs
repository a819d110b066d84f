//! Action dispatcher.
//!
//! Each state-changing intent becomes exactly one outbound request. The
//! response code is checked against the single code the service uses to
//! accept that action; anything else is a [`ClientError::RemoteRejection`]
//! carrying the service's structured errors. Nothing here retries.

use astra_ops_core::{ApiError, CreateDatabase, DatabaseId, ErrorResponse};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, Result};

/// A state-changing request against the databases API.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// Create a database. Accepted with 201 and a `location` header.
    Create(&'a CreateDatabase),
    /// Terminate a database. Accepted with 202.
    Terminate {
        /// Database to terminate.
        id: &'a DatabaseId,
        /// Only terminate if the database is still in a prepared state.
        prepared_state_only: bool,
    },
    /// Park a database. Accepted with 202.
    Park(&'a DatabaseId),
    /// Unpark a database. Accepted with 202.
    Unpark(&'a DatabaseId),
    /// Change the capacity units of a database. Accepted with 200.
    Resize {
        /// Database to resize.
        id: &'a DatabaseId,
        /// Desired total capacity units.
        capacity_units: u32,
    },
    /// Change a database user's password. Accepted with 200.
    ResetPassword {
        /// Database owning the user.
        id: &'a DatabaseId,
        /// User to update.
        username: &'a str,
        /// New password.
        password: &'a str,
    },
    /// Add a keyspace to a database. Accepted with 200.
    AddKeyspace {
        /// Database to extend.
        id: &'a DatabaseId,
        /// Keyspace name.
        keyspace: &'a str,
    },
}

impl Action<'_> {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Terminate { .. } => "terminate",
            Self::Park(_) => "park",
            Self::Unpark(_) => "unpark",
            Self::Resize { .. } => "resize",
            Self::ResetPassword { .. } => "reset_password",
            Self::AddKeyspace { .. } => "add_keyspace",
        }
    }

    /// The status code the service answers with when it accepts the action.
    #[must_use]
    pub const fn expected_status(&self) -> u16 {
        match self {
            Self::Create(_) => 201,
            Self::Terminate { .. } | Self::Park(_) | Self::Unpark(_) => 202,
            Self::Resize { .. } | Self::ResetPassword { .. } | Self::AddKeyspace { .. } => 200,
        }
    }

    /// The database this action targets, if it already exists.
    #[must_use]
    pub const fn database_id(&self) -> Option<&DatabaseId> {
        match self {
            Self::Create(_) => None,
            Self::Terminate { id, .. }
            | Self::Park(id)
            | Self::Unpark(id)
            | Self::Resize { id, .. }
            | Self::ResetPassword { id, .. }
            | Self::AddKeyspace { id, .. } => Some(id),
        }
    }

    fn path_segments(&self) -> Vec<&str> {
        match self {
            Self::Create(_) => vec![],
            Self::Terminate { id, .. } => vec![id.as_str(), "terminate"],
            Self::Park(id) => vec![id.as_str(), "park"],
            Self::Unpark(id) => vec![id.as_str(), "unpark"],
            Self::Resize { id, .. } => vec![id.as_str(), "resize"],
            Self::ResetPassword { id, .. } => vec![id.as_str(), "resetPassword"],
            Self::AddKeyspace { id, keyspace } => vec![id.as_str(), "keyspaces", keyspace],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResizeRequest {
    capacity_units: u32,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Shared request plumbing: pooled HTTP client, auth headers, API root.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    client: reqwest::Client,
    headers: HeaderMap,
    databases_url: Url,
}

impl Dispatcher {
    pub(crate) fn new(client: reqwest::Client, databases_url: &str, token: &str) -> Result<Self> {
        let databases_url = Url::parse(databases_url)
            .map_err(|e| ClientError::Config(format!("invalid base url {databases_url}: {e}")))?;
        if databases_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base url {databases_url} cannot carry a path"
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::Config("token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client,
            headers,
            databases_url,
        })
    }

    /// URL of the databases collection extended by `segments`, each
    /// percent-encoded as a single path segment.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.databases_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .headers(self.headers.clone())
    }

    pub(crate) async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        request.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })
    }

    /// Fire `action` once and return the accepted response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if no response was received and
    /// `ClientError::RemoteRejection` if the status code is not the one the
    /// action expects.
    pub(crate) async fn dispatch(&self, action: Action<'_>) -> Result<Response> {
        let url = self.url(&action.path_segments());
        let mut request = self.request(Method::POST, url.clone());

        request = match action {
            Action::Create(body) => request.json(body),
            Action::Terminate {
                prepared_state_only,
                ..
            } => request.query(&[("preparedStateOnly", prepared_state_only)]),
            Action::Resize { capacity_units, .. } => {
                request.json(&ResizeRequest { capacity_units })
            }
            Action::ResetPassword {
                username, password, ..
            } => request.json(&ResetPasswordRequest { username, password }),
            Action::Park(_) | Action::Unpark(_) | Action::AddKeyspace { .. } => request,
        };

        let response = self.send(request, &url).await?;
        match expect_status(response, &[action.expected_status()]).await {
            Ok(response) => {
                tracing::debug!(
                    action = action.name(),
                    database_id = ?action.database_id(),
                    "Action accepted"
                );
                Ok(response)
            }
            Err(err) => {
                tracing::error!(
                    action = action.name(),
                    database_id = ?action.database_id(),
                    error = %err,
                    "Action rejected"
                );
                Err(err)
            }
        }
    }
}

const MAX_DETAIL_CHARS: usize = 256;

/// Pass `response` through if its status is in `expected`, otherwise turn it
/// into a `RemoteRejection` carrying the decoded error body.
///
/// A body that is not in the structured error shape yields a rejection with
/// no structured errors and a detail quoting the body; the status code is
/// never lost.
pub(crate) async fn expect_status(response: Response, expected: &[u16]) -> Result<Response> {
    let actual = response.status().as_u16();
    if expected.contains(&actual) {
        return Ok(response);
    }

    let (errors, detail) = match response.bytes().await {
        Ok(body) => parse_error_body(&body),
        Err(e) => {
            tracing::debug!(status = actual, error = %e, "Unable to read error body");
            (Vec::new(), Some(format!("unable to read error response: {e}")))
        }
    };

    Err(ClientError::RemoteRejection {
        expected: expected.to_vec(),
        actual,
        errors,
        detail,
    })
}

fn parse_error_body(body: &[u8]) -> (Vec<ApiError>, Option<String>) {
    let text = String::from_utf8_lossy(body);
    if text.trim().is_empty() {
        return (Vec::new(), None);
    }

    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(response) => (response.errors, None),
        Err(e) => {
            let quoted: String = text.trim().chars().take(MAX_DETAIL_CHARS).collect();
            tracing::debug!(error = %e, "Error body not in structured form");
            (
                Vec::new(),
                Some(format!("unable to decode error response '{quoted}': {e}")),
            )
        }
    }
}

/// Decode a JSON body, reporting shape mismatches as `ClientError::Decode`.
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    let body = response
        .bytes()
        .await
        .map_err(|source| ClientError::Transport { url, source })?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Extract the new database id from a create response's `location` header.
///
/// The header may carry either the bare id or a path ending in it.
pub(crate) fn location_id(response: &Response) -> Result<DatabaseId> {
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| ClientError::Decode("create response has no location header".to_string()))?
        .to_str()
        .map_err(|_| ClientError::Decode("location header is not valid text".to_string()))?;

    let id = location
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    DatabaseId::parse(id)
        .map_err(|e| ClientError::Decode(format!("location header {location:?}: {e}")))
}
