use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ListingConfig;
use crate::users::{
    dto::{CreateUserRequest, UserListing},
    repo::UserStore,
    repo_types::User,
    services::{self, Pagination},
};

/// Why a directory call did not succeed, as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server answered with an error body.
    #[error("{0}")]
    Rejected(String),
    /// No usable answer (transport failure, unreadable body).
    #[error("unreachable: {0}")]
    Unreachable(String),
}

/// Calls the presentation layer makes against the user directory.
#[async_trait]
pub trait DirectoryApi: Send + Sync + 'static {
    async fn list(&self, page: u32, limit: u32, search: &str) -> Result<UserListing, RemoteError>;
    async fn create(&self, request: CreateUserRequest) -> Result<User, RemoteError>;
    async fn delete(&self, id: i64) -> Result<User, RemoteError>;
}

/// Runs directory calls in-process against a store, with the same
/// validation and error messages as the HTTP API.
#[derive(Clone)]
pub struct LocalDirectory {
    store: Arc<dyn UserStore>,
    listing: ListingConfig,
}

impl LocalDirectory {
    pub fn new(store: Arc<dyn UserStore>, listing: ListingConfig) -> Self {
        Self { store, listing }
    }
}

#[async_trait]
impl DirectoryApi for LocalDirectory {
    async fn list(&self, page: u32, limit: u32, search: &str) -> Result<UserListing, RemoteError> {
        let pagination = Pagination::clamped(page, limit, &self.listing);
        services::list_users(self.store.as_ref(), pagination, search)
            .await
            .map_err(|e| RemoteError::Rejected(e.to_string()))
    }

    async fn create(&self, request: CreateUserRequest) -> Result<User, RemoteError> {
        services::create_user(self.store.as_ref(), request)
            .await
            .map_err(|e| RemoteError::Rejected(e.to_string()))
    }

    async fn delete(&self, id: i64) -> Result<User, RemoteError> {
        services::delete_user(self.store.as_ref(), id)
            .await
            .map_err(|e| RemoteError::Rejected(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to a running server's `/api/users` endpoints.
#[derive(Clone)]
pub struct HttpDirectory {
    client: Client,
    users_url: String,
}

impl HttpDirectory {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            users_url: format!("{}/api/users", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectory {
    #[instrument(skip(self))]
    async fn list(&self, page: u32, limit: u32, search: &str) -> Result<UserListing, RemoteError> {
        let response = self
            .client
            .get(&self.users_url)
            .query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("search", search.to_string()),
            ])
            .send()
            .await;
        read_json(response).await
    }

    #[instrument(skip(self, request))]
    async fn create(&self, request: CreateUserRequest) -> Result<User, RemoteError> {
        let response = self.client.post(&self.users_url).json(&request).send().await;
        read_json(response).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<User, RemoteError> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.users_url))
            .send()
            .await;
        read_json(response).await
    }
}

/// Success bodies decode as `T`; error statuses carrying `{ "error" }` are
/// rejections. Anything else means the server could not be used.
async fn read_json<T: DeserializeOwned>(
    response: Result<Response, reqwest::Error>,
) -> Result<T, RemoteError> {
    let response = response.map_err(unreachable)?;
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(unreachable);
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => {
            debug!(%status, error = %body.error, "directory call rejected");
            Err(RemoteError::Rejected(body.error))
        }
        Err(e) => Err(RemoteError::Unreachable(format!("{status}: {e}"))),
    }
}

fn unreachable(error: reqwest::Error) -> RemoteError {
    RemoteError::Unreachable(error.to_string())
}
