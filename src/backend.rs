//! Outbound forwarding to the NTDoc REST backend.
//!
//! Tool handlers describe each call as a [`BackendRequest`] and hand it to the
//! shared [`BackendClient`], which performs exactly one HTTP round trip per
//! descriptor with the caller's `Authorization` header forwarded verbatim.

use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::Value;

/// Errors surfaced by the forwarding layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The outbound call never produced a response (connect, TLS, decode).
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Download metadata did not contain the pre-signed content URL.
    #[error("download metadata response missing data.downloadUrl")]
    MissingDownloadUrl,
}

/// Description of one outbound backend call.
///
/// Optional tool arguments that were not supplied are simply absent from
/// `query`/`body`; they are never serialized as null.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
    pub file: Option<Vec<u8>>,
}

impl BackendRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            file: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Append a query parameter only when the argument was supplied.
    pub fn query_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach file bytes sent as the multipart `file` part.
    pub fn file(mut self, bytes: Vec<u8>) -> Self {
        self.file = Some(bytes);
        self
    }
}

/// HTTP client for the NTDoc backend, shared across all tool invocations.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request with the passthrough `Authorization` header and parse
    /// the JSON response body. Non-success statuses fail with the response
    /// body text attached.
    pub async fn send_json(
        &self,
        request: BackendRequest,
        authorization: &str,
    ) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!("forwarding {} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method, &url)
            .header(AUTHORIZATION, authorization);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }
        if let Some(bytes) = request.file {
            builder = builder.multipart(Form::new().part("file", Part::bytes(bytes)));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }
        Ok(response.json().await?)
    }

    /// Fetch raw bytes from an absolute URL without any auth header. Used for
    /// pre-signed download URLs, which carry their credentials in the URL.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, BackendError> {
        tracing::debug!("fetching content from {url}");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }
        Ok(response.bytes().await?)
    }

    /// Two-step document download: fetch the download metadata with the
    /// caller's authorization, then follow `data.downloadUrl` unauthenticated
    /// and return the raw content. A failed metadata call never issues the
    /// second request.
    pub async fn download_content(
        &self,
        document_id: i64,
        authorization: &str,
    ) -> Result<Bytes, BackendError> {
        let metadata = self
            .send_json(
                BackendRequest::get(format!("/api/v1/documents/download/{document_id}")),
                authorization,
            )
            .await?;
        let download_url = metadata
            .pointer("/data/downloadUrl")
            .and_then(Value::as_str)
            .ok_or(BackendError::MissingDownloadUrl)?
            .to_string();
        self.fetch_bytes(&download_url).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_opt_elides_absent_values() {
        let request = BackendRequest::get("/api/v1/teams")
            .query_opt("activeOnly", None::<bool>);
        assert!(request.query.is_empty());

        let request = BackendRequest::get("/api/v1/teams")
            .query_opt("activeOnly", Some(true));
        assert_eq!(request.query, vec![("activeOnly", "true".to_string())]);
    }

    #[test]
    fn required_query_is_always_present() {
        let request = BackendRequest::get("/api/v1/documents/share")
            .query("documentId", 456_i64)
            .query_opt("expirationMinutes", None::<u32>);
        assert_eq!(request.query, vec![("documentId", "456".to_string())]);
    }

    #[test]
    fn json_body_is_attached_verbatim() {
        let request = BackendRequest::put("/api/v1/teams/1")
            .json(json!({"name": "Ops", "description": "ops team"}));
        assert_eq!(
            request.body,
            Some(json!({"name": "Ops", "description": "ops team"}))
        );
        assert!(request.file.is_none());
    }
}
