use std::future::Future;

use garde::Validate;
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::api::{Cluster, NodePool};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not found: {endpoint}")]
    NotFound { endpoint: String },
    #[error("{method} {endpoint} returned {status}: {message}")]
    Api {
        method: Method,
        endpoint: String,
        status: StatusCode,
        message: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}

/// A backend payload that reports its own identifier and lifecycle status.
pub trait ObservedResource: Send + Sync {
    fn id(&self) -> &str;
    fn status(&self) -> &str;
}

impl ObservedResource for Cluster {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

impl ObservedResource for NodePool {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

/// Create, read and delete calls for one kind of resource.
///
/// Every call is a single request/response pair. Waiting for the backend to
/// act on a mutation is the caller's concern.
pub trait ResourceRepository: Send + Sync {
    type Resource: ObservedResource;
    type CreateRequest: Validate<Context = ()> + Send + Sync + std::fmt::Debug;

    /// Human-readable resource kind, used in logs and errors.
    const KIND: &'static str;

    fn create(
        &self,
        request: &Self::CreateRequest,
    ) -> impl Future<Output = Result<Self::Resource, TransportError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Self::Resource, TransportError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Repositories whose resources accept in-place updates.
pub trait MutableRepository: ResourceRepository {
    type UpdateRequest: Validate<Context = ()> + Send + Sync + std::fmt::Debug;

    fn update(
        &self,
        id: &str,
        request: &Self::UpdateRequest,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Thin JSON client for the cloud API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cloudkube/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let body = self.send(Method::GET, path, None::<&()>).await?;
        decode(path, &body)
    }

    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(Method::POST, path, body).await?;
        decode(path, &body)
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), TransportError> {
        self.send(Method::PUT, path, Some(body)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.send(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                endpoint: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Api {
                method,
                endpoint: path.to_string(),
                status,
                message: error_message(&text),
            });
        }

        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, TransportError> {
    // Empty bodies stand for JSON null, so `()` and `Option<_>` responses decode.
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|source| TransportError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Error bodies look like `{"message": "..."}`; anything else is passed through.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ApiError {
        message: String,
    }

    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
