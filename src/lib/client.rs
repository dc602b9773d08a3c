//! Cluster management API client.
//!
//! [`ClusterClient`] is the seam between the collection pipeline and the transport. The
//! pipeline only ever issues `GET` requests and looks at the status code and JSON body, so
//! tests can substitute canned responses without a network.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// Port of the PowerScale platform API when the endpoint does not name one.
pub const DEFAULT_PAPI_PORT: u16 = 8080;
/// Prefix of every platform API resource.
pub const PAPI_PREFIX: &str = "/platform/1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status code and decoded body of one API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read access to one cluster's management API.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Endpoint this client talks to, used for logging.
    fn endpoint(&self) -> &str;

    /// Issues a `GET` for `path` (relative to the API root) with the given query arguments.
    ///
    /// Any response that arrives is returned as is, whatever its status; only failures to
    /// get a response at all are errors.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, FetchError>;
}

/// Turns a configured endpoint into the base URL of the platform API.
///
/// `host` and `host:port` get `https://` prepended, and the default API port is appended
/// when none is given. A value that already carries a scheme is used unchanged.
pub fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        return format!("{}{}", endpoint, PAPI_PREFIX);
    }
    let has_port = if let Some(rest) = endpoint.strip_prefix('[') {
        // bracketed IPv6 literal, port follows the closing bracket
        rest.split_once(']')
            .map(|(_, tail)| tail.starts_with(':'))
            .unwrap_or(false)
    } else {
        endpoint.matches(':').count() == 1
    };
    if has_port {
        format!("https://{}{}", endpoint, PAPI_PREFIX)
    } else if endpoint.matches(':').count() > 1 && !endpoint.starts_with('[') {
        format!("https://[{}]:{}{}", endpoint, DEFAULT_PAPI_PORT, PAPI_PREFIX)
    } else {
        format!("https://{}:{}{}", endpoint, DEFAULT_PAPI_PORT, PAPI_PREFIX)
    }
}

/// [`ClusterClient`] backed by `reqwest`, authenticating every request with HTTP basic
/// authentication.
#[derive(Clone)]
pub struct PapiClient {
    client: Client,
    endpoint: String,
    base_url: String,
    user: String,
    password: String,
}

impl fmt::Debug for PapiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PapiClient")
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl PapiClient {
    /// Creates a client for `endpoint`.
    ///
    /// Cluster API certificates are usually self-signed, so certificate validation is off.
    pub fn new(endpoint: &str, user: &str, password: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            base_url: base_url(endpoint),
            user: user.to_string(),
            password,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ClusterClient for PapiClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, FetchError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("{}: {}", url, e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("{}: {}", url, e)))?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        debug!("GET {} -> {}", url, status);
        Ok(ApiResponse::new(status, body))
    }
}
