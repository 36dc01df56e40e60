//! Remote object-store client for session documents
//!
//! A thin async client over the storage bucket's REST API. The session
//! store consumes it as a generic blob store: upload, download, delete and
//! list, with failures surfaced as opaque native error codes that the
//! storage error mapper classifies.

use std::time::Duration;

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::client::auth::UserAuth;

/// User agent for storage requests
const CLIENT_USER_AGENT: &str = "fieldmark-cli/0.1";

/// Base endpoint of the hosted object store
const STORAGE_ENDPOINT: &str = "https://firebasestorage.googleapis.com/v0/b";

/// Everything except unreserved characters gets percent-encoded, so object
/// paths travel as a single URL segment.
const OBJECT_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Native error codes raised by the object store
pub mod codes {
    pub const OBJECT_NOT_FOUND: &str = "storage/object-not-found";
    pub const UNAUTHORIZED: &str = "storage/unauthorized";
    pub const QUOTA_EXCEEDED: &str = "storage/quota-exceeded";
    pub const NETWORK_ERROR: &str = "storage/network-error";
    pub const RETRY_LIMIT_EXCEEDED: &str = "storage/retry-limit-exceeded";
    pub const UNKNOWN: &str = "storage/unknown";
}

/// Native blob-store failure, before classification
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{code}: {message}")]
    Code { code: String, message: String },
}

impl BlobError {
    /// Whether this is the store's recognizable object-not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Code { code, .. } if code == codes::OBJECT_NOT_FOUND)
    }
}

/// Response shape of the list endpoint
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

/// Object-store client
pub struct BlobClient {
    client: Client,
    base_url: String,
}

impl BlobClient {
    /// Create a client for the given storage bucket
    pub fn new(bucket: &str) -> Self {
        Self::new_with_base_url(&format!("{}/{}", STORAGE_ENDPOINT, bucket))
    }

    /// Create a client with a custom base URL (for testing)
    #[doc(hidden)]
    pub fn new_with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn encode(path: &str) -> String {
        percent_encoding::utf8_percent_encode(path, OBJECT_PATH).to_string()
    }

    fn build_headers(&self, auth: &UserAuth) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Ok(value) = HeaderValue::from_str(&auth.authorization_header()) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Upload a document, overwriting any existing object at `path`
    pub async fn upload_string(
        &self,
        auth: &UserAuth,
        path: &str,
        content: &str,
    ) -> Result<(), BlobError> {
        let url = format!(
            "{}/o?name={}&uploadType=media",
            self.base_url,
            Self::encode(path)
        );

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers(auth))
            .header(CONTENT_TYPE, "application/json")
            .body(content.to_string())
            .send()
            .await?;

        self.check_status(response).await.map(|_| ())
    }

    /// Download an object's raw bytes
    pub async fn download(&self, auth: &UserAuth, path: &str) -> Result<Bytes, BlobError> {
        let url = format!("{}/o/{}?alt=media", self.base_url, Self::encode(path));

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers(auth))
            .send()
            .await?;

        let response = self.check_status(response).await?;
        Ok(response.bytes().await?)
    }

    /// Delete the object at `path`
    pub async fn delete_object(&self, auth: &UserAuth, path: &str) -> Result<(), BlobError> {
        let url = format!("{}/o/{}", self.base_url, Self::encode(path));

        let response = self
            .client
            .delete(&url)
            .headers(self.build_headers(auth))
            .send()
            .await?;

        self.check_status(response).await.map(|_| ())
    }

    /// List full object paths under a prefix
    pub async fn list_all(&self, auth: &UserAuth, prefix: &str) -> Result<Vec<String>, BlobError> {
        let url = format!("{}/o?prefix={}", self.base_url, Self::encode(prefix));

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers(auth))
            .send()
            .await?;

        let response = self.check_status(response).await?;
        let listing: ListResponse = response.json().await?;
        Ok(listing.items.into_iter().map(|item| item.name).collect())
    }

    /// Convert non-success statuses to native store error codes
    async fn check_status(&self, response: Response) -> Result<Response, BlobError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = match status {
            StatusCode::NOT_FOUND => codes::OBJECT_NOT_FOUND,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => codes::UNAUTHORIZED,
            StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => codes::QUOTA_EXCEEDED,
            StatusCode::REQUEST_TIMEOUT
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => codes::RETRY_LIMIT_EXCEEDED,
            _ => codes::UNKNOWN,
        };

        let message = response.text().await.unwrap_or_default();
        Err(BlobError::Code {
            code: code.to_string(),
            message,
        })
    }
}
