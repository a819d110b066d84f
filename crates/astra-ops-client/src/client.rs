//! The operations client.
//!
//! [`AstraClient`] pairs the action dispatcher with the convergence poller.
//! Every lifecycle action comes in two flavours:
//!
//! - `*_async` fires the request and returns as soon as the service accepts it
//! - the plain variant additionally waits until the database settles
//!
//! The waiting variants hold the calling task for up to the whole
//! [`RetryPolicy`] budget. There is no way to cancel them early other than
//! dropping the future.

use astra_ops_core::{CreateDatabase, Database, DatabaseId, DatabaseStatus};
use async_trait::async_trait;
use reqwest::Method;

use crate::config::ClientConfig;
use crate::dispatch::{self, Action, Dispatcher};
use crate::error::{ClientError, Result};
use crate::poll::{self, DatabaseSource, RetryPolicy, Target};

/// Client for the databases API.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AstraClient {
    dispatcher: Dispatcher,
    config: ClientConfig,
}

impl AstraClient {
    /// Create a client authenticating with a bearer `token`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the HTTP client cannot be built, the
    /// base URL is invalid, or the token cannot be sent as a header.
    pub fn new(config: ClientConfig, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .tcp_keepalive(config.tcp_keepalive())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Self::with_client(client, config, token)
    }

    /// Create a client around an existing `reqwest::Client`.
    ///
    /// The transport settings in `config` are ignored; the client's own apply.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the base URL is invalid or the token
    /// cannot be sent as a header.
    pub fn with_client(client: reqwest::Client, config: ClientConfig, token: &str) -> Result<Self> {
        let dispatcher = Dispatcher::new(client, &config.databases_url(), token)?;
        Ok(Self { dispatcher, config })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the current snapshot of a database. Never waits.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` on any status other than 200, `Transport` if
    /// no response arrives, and `Decode` if the body is not a database.
    pub async fn find_db(&self, id: &DatabaseId) -> Result<Database> {
        let url = self.dispatcher.url(&[id.as_str()]);
        let request = self.dispatcher.request(Method::GET, url.clone());
        let response = self.dispatcher.send(request, &url).await?;
        let response = dispatch::expect_status(response, &[200]).await?;
        dispatch::decode_json(response).await
    }

    /// Wait until the database reports `status`.
    ///
    /// # Errors
    ///
    /// Returns `ConvergenceTimeout` if the budget is spent. Failed and
    /// undecodable fetches only consume attempts.
    pub async fn wait_until(
        &self,
        id: &DatabaseId,
        policy: RetryPolicy,
        status: DatabaseStatus,
    ) -> Result<Database> {
        poll::poll_until(
            self,
            id,
            &Target::status(status),
            policy,
            self.config.verbose,
        )
        .await
    }

    /// Submit a new database and return its id without waiting.
    ///
    /// `user` and `password` are only required on legacy tiers.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 201, or `Decode`
    /// if the response does not name the new database.
    pub async fn create_db_async(&self, request: &CreateDatabase) -> Result<DatabaseId> {
        let response = self.dispatcher.dispatch(Action::Create(request)).await?;
        let id = dispatch::location_id(&response)?;
        tracing::info!(database_id = %id, name = %request.name, "Database creation accepted");
        Ok(id)
    }

    /// Create a database and wait until it is `ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure, or the poll failure wrapped as
    /// `create db failed: ...`.
    pub async fn create_db(
        &self,
        request: &CreateDatabase,
        policy: RetryPolicy,
    ) -> Result<Database> {
        let id = self.create_db_async(request).await?;
        self.wait_until(&id, policy, DatabaseStatus::Active)
            .await
            .map_err(|e| e.during("create db"))
    }

    /// Request termination without waiting.
    ///
    /// `prepared_state_only` can be left `false` in almost all cases; it is
    /// used to safely terminate databases still in a prepared state.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 202.
    pub async fn terminate_async(&self, id: &DatabaseId, prepared_state_only: bool) -> Result<()> {
        self.dispatcher
            .dispatch(Action::Terminate {
                id,
                prepared_state_only,
            })
            .await?;
        Ok(())
    }

    /// Terminate a database and wait until it shows as deleted or is gone.
    ///
    /// `TERMINATED` and `TERMINATING` both count as deleted. A fetch rejected
    /// with one of [`ClientConfig::gone_status_codes`] ends the wait at once.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure, or the poll failure wrapped as
    /// `terminate db failed: ...`. A snapshot that cannot be decoded aborts
    /// the wait.
    pub async fn terminate(
        &self,
        id: &DatabaseId,
        prepared_state_only: bool,
        policy: RetryPolicy,
    ) -> Result<()> {
        self.terminate_async(id, prepared_state_only).await?;

        let target = Target::deleted(self.config.gone_status_codes.iter().copied());
        match poll::poll_until(self, id, &target, policy, self.config.verbose).await {
            Ok(db) => {
                tracing::info!(database_id = %id, status = %db.status, "Database deleted");
                Ok(())
            }
            Err(ClientError::Gone(_)) => {
                tracing::info!(database_id = %id, "Database removed");
                Ok(())
            }
            Err(err) => Err(err.during("terminate db")),
        }
    }

    /// Request parking without waiting. Serverless databases cannot be parked.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 202.
    pub async fn park_async(&self, id: &DatabaseId) -> Result<()> {
        self.dispatcher.dispatch(Action::Park(id)).await?;
        Ok(())
    }

    /// Park a database and wait until it is `PARKED`.
    ///
    /// # Errors
    ///
    /// Returns any failure wrapped as `park db failed: ...`.
    pub async fn park(&self, id: &DatabaseId, policy: RetryPolicy) -> Result<Database> {
        self.park_async(id).await.map_err(|e| e.during("park db"))?;
        self.wait_until(id, policy, DatabaseStatus::Parked)
            .await
            .map_err(|e| e.during("park db"))
    }

    /// Request unparking without waiting. Serverless databases cannot be unparked.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 202.
    pub async fn unpark_async(&self, id: &DatabaseId) -> Result<()> {
        self.dispatcher.dispatch(Action::Unpark(id)).await?;
        Ok(())
    }

    /// Unpark a database and wait until it is `ACTIVE`.
    ///
    /// # Errors
    ///
    /// Returns any failure wrapped as `unpark db failed: ...`.
    pub async fn unpark(&self, id: &DatabaseId, policy: RetryPolicy) -> Result<Database> {
        self.unpark_async(id)
            .await
            .map_err(|e| e.during("unpark db"))?;
        self.wait_until(id, policy, DatabaseStatus::Active)
            .await
            .map_err(|e| e.during("unpark db"))
    }

    /// Set the total capacity units of a database.
    ///
    /// Shrinking is not supported by the service and serverless databases
    /// cannot be resized.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 200.
    pub async fn resize(&self, id: &DatabaseId, capacity_units: u32) -> Result<()> {
        self.dispatcher
            .dispatch(Action::Resize { id, capacity_units })
            .await?;
        Ok(())
    }

    /// Change the password of a database user.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 200.
    pub async fn reset_password(
        &self,
        id: &DatabaseId,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.dispatcher
            .dispatch(Action::ResetPassword {
                id,
                username,
                password,
            })
            .await?;
        Ok(())
    }

    /// Add a keyspace to a database.
    ///
    /// # Errors
    ///
    /// Returns `RemoteRejection` unless the service answers 200.
    pub async fn add_keyspace(&self, id: &DatabaseId, keyspace: &str) -> Result<()> {
        self.dispatcher
            .dispatch(Action::AddKeyspace { id, keyspace })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseSource for AstraClient {
    async fn find_db(&self, id: &DatabaseId) -> Result<Database> {
        AstraClient::find_db(self, id).await
    }
}
