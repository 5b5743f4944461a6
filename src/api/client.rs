//! ApiClient - handles communication with the parcel backend.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::address::AddressRecord;
use crate::camera::EncodedImage;
use crate::reconcile::DeliveryStatus;

use super::backend::{DashboardSource, RecognitionBackend, StatusConfirmer};
use super::retry::{is_transient_network_error, is_transient_status, RetryPolicy};
use super::types::{
    CaptureRequest, CaptureResponse, DashboardData, ErrorBody, PincodePage, PincodeRecord,
    StatusUpdateRequest,
};

/// The environment variable that overrides the backend base URL.
pub const API_BASE_URL_ENV: &str = "PARCEL_API_BASE_URL";

/// Default base URL of the parcel backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default page size of the pincode directory.
pub const DEFAULT_PINCODES_PER_PAGE: u32 = 50;

/// Message used when a failed capture carries no `error` field.
const CAPTURE_FALLBACK_ERROR: &str = "Failed to process address";

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Whole-request deadline. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry: RetryPolicy::none(),
        }
    }
}

/// Client for the parcel backend's JSON API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the base URL does not parse.
    pub fn new(mut config: ClientConfig) -> Result<Self, ApiError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&config.base_url)
            .map_err(|_| ApiError::InvalidBaseUrl(config.base_url.clone()))?;

        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(ApiError::Request)?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Create a client with default settings against `base_url`.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        })
    }

    /// Create a client reading the base URL from `PARCEL_API_BASE_URL`,
    /// falling back to [`DEFAULT_API_BASE_URL`].
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url =
            std::env::var(API_BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        Self::with_base_url(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    /// Submit a parcel photo for recognition.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Application` carrying the backend's `error` field
    /// verbatim for non-2xx responses, `ApiError::MalformedResponse` if the
    /// body is not the expected JSON, or a transport error.
    pub async fn capture_and_process(
        &self,
        image: &EncodedImage,
    ) -> Result<CaptureResponse, ApiError> {
        let body = CaptureRequest {
            image: image.to_data_uri(),
        };
        let url = self.url("capture_and_process");
        log::debug!("POST {} ({} byte image)", url, image.bytes.len());

        let response = self
            .send(|| self.http_client.post(&url).json(&body))
            .await?;
        read_json(response, |status| ApiError::Application {
            status,
            message: CAPTURE_FALLBACK_ERROR.to_string(),
        })
        .await
    }

    /// Fetch the dashboard snapshot.
    pub async fn dashboard_data(&self) -> Result<DashboardData, ApiError> {
        let url = self.url("dashboard_data");
        let response = self.send(|| self.http_client.get(&url)).await?;
        read_json(response, ApiError::Status).await
    }

    /// Fetch one page of the pincode directory.
    pub async fn pincodes(&self, page: u32, per_page: u32) -> Result<PincodePage, ApiError> {
        let url = self.url("pincodes");
        let response = self
            .send(|| {
                self.http_client
                    .get(&url)
                    .query(&[("page", page), ("per_page", per_page)])
            })
            .await?;
        read_json(response, ApiError::Status).await
    }

    /// Search the pincode directory by pincode, office name, or district.
    pub async fn search_pincodes(&self, query: &str) -> Result<Vec<PincodeRecord>, ApiError> {
        let url = self.url("pincodes/search");
        let response = self
            .send(|| self.http_client.get(&url).query(&[("q", query)]))
            .await?;
        read_json(response, ApiError::Status).await
    }

    /// Persist a parcel's delivery status.
    pub async fn update_parcel_status(
        &self,
        parcel_id: u64,
        status: DeliveryStatus,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("parcels/{}/status", parcel_id));
        let body = StatusUpdateRequest { status };
        let response = self
            .send(|| self.http_client.patch(&url).json(&body))
            .await?;

        let code = response.status();
        if code.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(error_from_body(code.as_u16(), &text).unwrap_or(ApiError::Status(code.as_u16())))
    }

    /// Send a request, retrying transient failures per the retry policy.
    async fn send<F>(&self, build: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            match build().send().await {
                Ok(response)
                    if is_transient_status(response.status()) && attempt < policy.max_retries =>
                {
                    log::warn!(
                        "Backend returned {} (attempt {}/{}), retrying",
                        response.status(),
                        attempt + 1,
                        policy.max_retries + 1
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if is_transient_network_error(&e) && attempt < policy.max_retries => {
                    log::warn!(
                        "Network error (attempt {}/{}): {}, retrying",
                        attempt + 1,
                        policy.max_retries + 1,
                        e
                    );
                }
                Err(e) if is_transient_network_error(&e) && policy.max_retries > 0 => {
                    return Err(ApiError::Network {
                        message: e.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}

impl RecognitionBackend for ApiClient {
    async fn recognize(&self, image: &EncodedImage) -> Result<AddressRecord, ApiError> {
        Ok(self.capture_and_process(image).await?.into_record())
    }
}

impl DashboardSource for ApiClient {
    async fn fetch_dashboard(&self) -> Result<DashboardData, ApiError> {
        self.dashboard_data().await
    }
}

impl StatusConfirmer for ApiClient {
    async fn confirm_status(&self, parcel_id: u64, status: DeliveryStatus) -> Result<(), ApiError> {
        self.update_parcel_status(parcel_id, status).await
    }
}

/// Decode a JSON body, turning non-2xx responses into errors.
///
/// A non-2xx response with an `error` field becomes
/// `ApiError::Application`; otherwise `fallback` builds the error from the
/// status code.
async fn read_json<T, F>(response: reqwest::Response, fallback: F) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    F: FnOnce(u16) -> ApiError,
{
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        log::warn!("Backend returned {}: {}", status, text);
        return Err(error_from_body(status.as_u16(), &text).unwrap_or_else(|| fallback(status.as_u16())));
    }

    serde_json::from_str(&text).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

fn error_from_body(status: u16, text: &str) -> Option<ApiError> {
    let message = serde_json::from_str::<ErrorBody>(text).ok()?.error?;
    if message.trim().is_empty() {
        return None;
    }
    Some(ApiError::Application { status, message })
}

/// Errors that can occur when talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend rejected the request and said why
    #[error("{message}")]
    Application { status: u16, message: String },

    /// Non-2xx response without an explanation
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {message} (after {attempts} attempts)")]
    Network {
        /// Human-readable network error message
        message: String,
        /// Number of attempts made before giving up
        attempts: u32,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid backend URL '{0}'")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::MalformedResponse(e.to_string())
        } else {
            ApiError::Request(e)
        }
    }
}

impl ApiError {
    /// Whether the backend itself reported the failure (as opposed to transport).
    pub fn is_application(&self) -> bool {
        matches!(self, ApiError::Application { .. } | ApiError::Status(_))
    }
}
