//! Placement API client
//!
//! Thin HTTP layer over reqwest. Each invocation performs a small number of
//! sequential requests; there is no shared state, caching, or retry here.
//! Non-2xx responses surface the server's own message verbatim.

use crate::error::{Error, Result};
use crate::version::Microversion;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LOCATION};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Header carrying the negotiated microversion
pub const API_VERSION_HEADER: &str = "OpenStack-API-Version";

const SERVICE_TYPE: &str = "placement";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the Placement REST API
#[derive(Debug)]
pub struct PlacementClient {
    http: reqwest::Client,
    base_url: String,
    api_version: Microversion,
}

impl PlacementClient {
    /// Create a client bound to an endpoint and a negotiated microversion
    pub fn new(base_url: impl Into<String>, api_version: Microversion) -> Result<Self> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        if base_url.is_empty() {
            return Err(Error::Configuration("placement endpoint is empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let version_value = format!("{} {}", SERVICE_TYPE, api_version);
        headers.insert(
            API_VERSION_HEADER,
            HeaderValue::from_str(&version_value)
                .map_err(|e| Error::Configuration(format!("invalid version header: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_version,
        })
    }

    /// The microversion every request carries
    pub fn api_version(&self) -> Microversion {
        self.api_version
    }

    /// Execute one request and parse the JSON response body.
    ///
    /// Returns `Value::Null` for bodyless 2xx responses (e.g. 204 on delete).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!(
            "{}{}{}",
            self.base_url,
            path,
            crate::request::encode_query(query)
        );
        debug!(%method, %url, "placement request");

        let mut builder = self.http.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::server(status.as_u16(), error_detail(&text)));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::malformed(format!("response is not valid JSON: {e}")))
    }

    /// GET shorthand without query parameters
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, &[], None).await
    }

    /// POST a body, then fetch the created resource from the Location header.
    pub async fn create_and_fetch(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "placement create");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(Error::server(status.as_u16(), error_detail(&text)));
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("create response is missing a Location header"))?;

        // Location may be absolute or service-relative.
        let path = location
            .strip_prefix(&self.base_url)
            .unwrap_or(&location)
            .to_string();
        self.get(&path).await
    }
}

/// Extract the server's error detail from a Placement error body.
///
/// Placement wraps failures as `{"errors": [{"detail": ...}]}` with the
/// user-facing message on the detail's last line. Anything else is passed
/// through untouched so server semantics are never masked.
fn error_detail(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if let Some(detail) = parsed
        .as_ref()
        .and_then(|v| v["errors"][0]["detail"].as_str())
    {
        if let Some(line) = detail.lines().filter(|l| !l.trim().is_empty()).last() {
            return line.trim().to_string();
        }
    }
    body.to_string()
}
