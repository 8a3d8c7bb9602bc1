//! JSON-over-HTTP transport.
//!
//! # Endpoints
//!
//! - `POST /api/sync/replay` - body [`ReplayRequest`], answer [`ReplayResponse`]
//! - `GET /api/weather/current` - answer [`WeatherSnapshot`]
//! - `GET /api/advisories/current` - answer `[Advisory]`
//! - `GET /api/health` - any 2xx
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use krishimitra_sync::{HttpRemote, RemoteApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = HttpRemote::new("http://localhost:8000", Duration::from_secs(10))?;
//! let weather = remote.fetch_weather().await?;
//! println!("{} at {}", weather.temperature, weather.location);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use krishimitra_types::{Advisory, WeatherSnapshot};

use super::{RemoteApi, ReplayRequest, ReplayResponse};
use crate::error::RemoteError;

/// HTTP client for the KrishiMitra backend.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - e.g. `"http://localhost:8000"`; a trailing slash is ignored
    /// * `timeout` - per-request timeout applied by the HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Request)?;
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error(url, e))?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(url, e))?;
        Ok(check_status(response).await?.json().await?)
    }
}

fn send_error(url: String, source: reqwest::Error) -> RemoteError {
    if source.is_connect() {
        RemoteError::NotReachable { url, source }
    } else {
        RemoteError::Request(source)
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .ok()
        .filter(|body| !body.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn replay(&self, request: &ReplayRequest) -> Result<ReplayResponse, RemoteError> {
        self.post_json("/api/sync/replay", request).await
    }

    async fn fetch_weather(&self) -> Result<WeatherSnapshot, RemoteError> {
        self.get_json("/api/weather/current").await
    }

    async fn fetch_advisories(&self) -> Result<Vec<Advisory>, RemoteError> {
        self.get_json("/api/advisories/current").await
    }

    async fn health(&self) -> Result<(), RemoteError> {
        let url = self.url("/api/health");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error(url, e))?;
        check_status(response).await.map(|_| ())
    }
}
