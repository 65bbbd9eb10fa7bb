//! Venue HTTP Client - Throttled, Signed REST Client
//!
//! Wraps reqwest with a client-side request throttle and HMAC query
//! signing for the Binance-compatible spot REST API. One request per
//! call: failures are returned to the gateway untouched, never retried.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::auth::ApiCredentials;
use super::types::ApiErrorBody;
use crate::config::ApiConfig;

/// Configuration for the venue HTTP client.
#[derive(Debug, Clone)]
pub struct VenueClientConfig {
  /// Base URL for the REST API.
  pub base_url: String,
  /// Per-request transport timeout.
  pub timeout: Duration,
  /// `recvWindow` sent with signed requests.
  pub recv_window_ms: u64,
  /// Client-side throttle.
  pub max_requests_per_second: NonZeroU32,
}

impl VenueClientConfig {
  /// Build from the `[api]` config section.
  pub fn from_api(api: &ApiConfig) -> Result<Self> {
    Ok(Self {
      base_url: api.base_url.clone(),
      timeout: Duration::from_millis(api.timeout_ms),
      recv_window_ms: api.recv_window_ms,
      max_requests_per_second: NonZeroU32::new(api.max_requests_per_second)
        .context("api.max_requests_per_second must be positive")?,
    })
  }
}

/// Why a single REST call failed, before domain classification.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
  /// Connection, TLS or timeout failure; nothing reached the venue
  /// or nothing came back.
  #[error("transport error: {0}")]
  Transport(String),
  /// The venue answered with a non-2xx status.
  #[error("venue returned {status} (code {code:?}): {msg}")]
  Api {
    status: StatusCode,
    /// Venue error code from the JSON body, when present.
    code: Option<i64>,
    msg: String,
  },
  /// 2xx response whose body did not match the expected shape.
  #[error("malformed response: {0}")]
  Decode(String),
  /// The call needs credentials the client was built without.
  #[error("signed endpoint called without API credentials")]
  Unauthenticated,
}

type Throttle = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Throttled HTTP client for the venue REST API.
pub struct VenueClient {
  /// Underlying HTTP client.
  http: Client,
  /// Parsed base URL.
  base: Url,
  /// Signing keys (absent for public-only clients).
  credentials: Option<Arc<ApiCredentials>>,
  /// Signed request receive window.
  recv_window_ms: u64,
  /// Request throttle.
  throttle: Arc<Throttle>,
}

impl VenueClient {
  /// Create a new venue client.
  pub fn new(config: &VenueClientConfig, credentials: Option<ApiCredentials>) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let base = Url::parse(&config.base_url)
      .with_context(|| format!("Invalid api.base_url {:?}", config.base_url))?;

    let throttle = Arc::new(RateLimiter::direct(Quota::per_second(
      config.max_requests_per_second,
    )));

    Ok(Self {
      http,
      base,
      credentials: credentials.map(Arc::new),
      recv_window_ms: config.recv_window_ms,
      throttle,
    })
  }

  /// Unsigned GET (market data).
  pub async fn get_public<T: DeserializeOwned>(
    &self,
    path: &str,
    params: &[(&str, String)],
  ) -> Result<T, RequestError> {
    let mut url = self.endpoint(path)?;
    if !params.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    self.execute(self.http.get(url)).await
  }

  /// Signed request (account and trading endpoints).
  pub async fn send_signed<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    params: &[(&str, String)],
  ) -> Result<T, RequestError> {
    let creds = self
      .credentials
      .as_deref()
      .ok_or(RequestError::Unauthenticated)?;
    let url = self.signed_url(creds, path, params, ApiCredentials::timestamp_ms())?;
    let request = self
      .http
      .request(method, url)
      .header("X-MBX-APIKEY", creds.api_key());
    self.execute(request).await
  }

  /// Append `recvWindow`, `timestamp` and the HMAC `signature` of the
  /// resulting query string.
  fn signed_url(
    &self,
    creds: &ApiCredentials,
    path: &str,
    params: &[(&str, String)],
    timestamp_ms: u64,
  ) -> Result<Url, RequestError> {
    let mut url = self.endpoint(path)?;
    url
      .query_pairs_mut()
      .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
      .append_pair("recvWindow", &self.recv_window_ms.to_string())
      .append_pair("timestamp", &timestamp_ms.to_string());
    let signature = creds.sign(url.query().unwrap_or_default());
    url.query_pairs_mut().append_pair("signature", &signature);
    Ok(url)
  }

  fn endpoint(&self, path: &str) -> Result<Url, RequestError> {
    self
      .base
      .join(path)
      .map_err(|e| RequestError::Transport(format!("bad endpoint {path}: {e}")))
  }

  /// Wait for a throttle slot, send once, decode.
  async fn execute<T: DeserializeOwned>(
    &self,
    request: reqwest::RequestBuilder,
  ) -> Result<T, RequestError> {
    self.throttle.until_ready().await;

    let response = request.send().await.map_err(|e| {
      warn!(error = %e, "Venue request failed");
      RequestError::Transport(e.to_string())
    })?;

    let status = response.status();
    debug!(status = %status, url = %response.url().path(), "Venue response");

    if status.is_success() {
      response
        .json::<T>()
        .await
        .map_err(|e| RequestError::Decode(e.to_string()))
    } else {
      Err(Self::api_error(status, response).await)
    }
  }

  async fn api_error(status: StatusCode, response: Response) -> RequestError {
    let body = response.text().await.unwrap_or_default();
    parse_api_error(status, &body)
  }
}

/// Decode a non-2xx body into `RequestError::Api`, keeping the raw
/// text when the venue did not send its usual `{code, msg}` object.
pub fn parse_api_error(status: StatusCode, body: &str) -> RequestError {
  match serde_json::from_str::<ApiErrorBody>(body) {
    Ok(err) => RequestError::Api {
      status,
      code: Some(err.code),
      msg: err.msg,
    },
    Err(_) => RequestError::Api {
      status,
      code: None,
      msg: body.chars().take(200).collect(),
    },
  }
}
