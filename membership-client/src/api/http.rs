//! HTTP plumbing shared by every endpoint.
//!
//! [`ApiClient`] owns a pooled [`reqwest::Client`] and normalises every response into
//! either a JSON value or a [`ClientError`]:
//!
//! - non-2xx: [`ClientError::Status`] carrying the body's `detail`, else `message`,
//!   else the raw text, else `"API request failed"`
//! - empty 2xx body: `{}`
//! - unparseable 2xx body: [`ClientError::InvalidResponse`]

use reqwest::{Client, Method, header::CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::{
    config::{ClientConfig, HttpConfig},
    error::{ClientError, Result},
};

/// Message used when a failed response carries no usable description.
pub const DEFAULT_FAILURE_MESSAGE: &str = "API request failed";

/// Message used when a 2xx body is not valid JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON response from server";

/// Creates a configured HTTP client with connection pooling.
///
/// # Errors
///
/// Returns error if client configuration fails.
pub fn create_http_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .build()
        .map_err(ClientError::Http)
}

/// Rejects paths containing traversal sequences.
fn sanitize_path(path: &str) -> Result<&str> {
    if path.contains("..") || path.contains("//") {
        return Err(ClientError::InvalidInput(
            "Invalid path: traversal sequences not allowed".to_owned(),
        ));
    }
    if !path.starts_with('/') {
        return Err(ClientError::InvalidInput("Path must start with '/'".to_owned()));
    }
    Ok(path)
}

/// Status and body of a response, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawResponse {
    pub(crate) status: u16,
    pub(crate) text: String,
}

impl RawResponse {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Typed client for the membership backend.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```
/// use membership_client::{ApiClient, ClientConfig};
///
/// let client = ApiClient::new(&ClientConfig::default())?;
/// assert_eq!(client.base_url(), "http://127.0.0.1:8080");
/// # Ok::<(), membership_client::ClientError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the configuration is invalid, or
    /// [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = create_http_client(&config.http)?;
        Ok(Self { client, base_url: config.api_base_url.trim_end_matches('/').to_owned() })
    }

    /// Returns the backend base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and returns the raw status and body.
    ///
    /// A JSON body is attached only when `body` is `Some`; the bearer header only
    /// when `bearer` is `Some`.
    #[instrument(skip(self, bearer, body))]
    pub(crate) async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<RawResponse> {
        let path = sanitize_path(path)?;
        let url = format!("{}{path}", self.base_url);

        let mut request =
            self.client.request(method, &url).header(CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        debug!(status, body_len = text.len(), "response received");

        Ok(RawResponse { status, text })
    }

    /// Sends a request and normalises the response into JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on network failure, [`ClientError::Status`] on a
    /// non-2xx status, and [`ClientError::InvalidResponse`] on an unparseable body.
    pub(crate) async fn request_json<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<Value> {
        let raw = self.send(method, path, bearer, body).await?;
        normalize_response(&raw)
    }
}

/// Converts a raw response into JSON or an error.
pub(crate) fn normalize_response(raw: &RawResponse) -> Result<Value> {
    if !raw.is_success() {
        let message = extract_error_message(&raw.text);
        warn!(status = raw.status, %message, "backend returned an error status");
        return Err(ClientError::Status { status: raw.status, message });
    }

    if raw.text.trim().is_empty() {
        debug!("empty response body treated as empty object");
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str(&raw.text).map_err(|e| {
        warn!(error = %e, "failed to parse response body");
        ClientError::InvalidResponse(INVALID_JSON_MESSAGE.to_owned())
    })
}

/// Picks the most useful description out of an error body.
fn extract_error_message(text: &str) -> String {
    if text.trim().is_empty() {
        return DEFAULT_FAILURE_MESSAGE.to_owned();
    }

    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return text.to_owned();
    };

    ["detail", "message"]
        .iter()
        .find_map(|key| match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_) | Value::Null | Value::Bool(false)) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(status: u16, text: &str) -> RawResponse {
        RawResponse { status, text: text.to_owned() }
    }

    #[test]
    fn test_create_http_client() {
        let client = create_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_api_client_trims_trailing_slash() {
        let config = ClientConfig {
            api_base_url: "https://api.example.com/".to_owned(),
            ..Default::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_api_client_rejects_invalid_config() {
        let config = ClientConfig { api_base_url: "nope".to_owned(), ..Default::default() };
        assert!(matches!(ApiClient::new(&config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_sanitize_path() {
        assert!(sanitize_path("/v1/auth/login").is_ok());
        assert!(sanitize_path("/v1/../admin").is_err());
        assert!(sanitize_path("//evil.example.com").is_err());
        assert!(sanitize_path("v1/auth/login").is_err());
    }

    #[test]
    fn test_normalize_success_json() {
        let value = normalize_response(&raw(200, r#"{"status":"ok"}"#)).unwrap();
        assert_eq!(value, json!({"status": "ok"}));
    }

    #[test]
    fn test_normalize_empty_body_is_empty_object() {
        assert_eq!(normalize_response(&raw(200, "")).unwrap(), json!({}));
        assert_eq!(normalize_response(&raw(204, "  \n")).unwrap(), json!({}));
    }

    #[test]
    fn test_normalize_invalid_json() {
        let err = normalize_response(&raw(200, "<html>")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON response from server");
    }

    #[test]
    fn test_normalize_error_prefers_detail() {
        let body = r#"{"detail":"Plan not found","message":"x"}"#;
        let err = normalize_response(&raw(400, body)).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 400: Plan not found");
    }

    #[test]
    fn test_normalize_error_falls_back_to_message() {
        let err = normalize_response(&raw(500, r#"{"message":"boom"}"#)).unwrap_err();
        assert!(
            matches!(err, ClientError::Status { status: 500, ref message } if message == "boom")
        );
    }

    #[test]
    fn test_normalize_error_plain_text() {
        let err = normalize_response(&raw(502, "Bad Gateway")).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 502: Bad Gateway");
    }

    #[test]
    fn test_normalize_error_empty_body() {
        let err = normalize_response(&raw(503, "")).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 503: API request failed");
    }

    #[test]
    fn test_normalize_error_json_without_fields() {
        let err = normalize_response(&raw(422, r#"{"error":"nope"}"#)).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 422: API request failed");
    }

    #[test]
    fn test_normalize_error_structured_detail() {
        let err = normalize_response(&raw(422, r#"{"detail":[{"loc":["body"]}]}"#)).unwrap_err();
        assert!(err.to_string().contains("loc"));
    }
}
