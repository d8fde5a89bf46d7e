#![warn(missing_docs)]
//! # tamper-scope-upload
//!
//! ## Purpose
//! Submits selected images to the analysis service and classifies replies.
//!
//! ## Responsibilities
//! - Validate the service endpoint before any request is made.
//! - Package the image as a multipart upload with a single `image` field.
//! - Separate service verdicts from transport failures (non-2xx status,
//!   unparsable or malformed bodies, network errors, timeouts).
//! - Probe the service health endpoint.
//!
//! ## Data flow
//! [`ImageUpload`] -> [`AnalysisClient::submit`] -> [`AnalysisTransport`] ->
//! [`RawReply`] -> status check + contract parsing -> [`ServiceReply`].
//!
//! ## Ownership and lifetimes
//! Uploads own a copy of the payload so an in-flight request never borrows
//! from the intake controller.
//!
//! ## Error model
//! Everything that is not a well-formed service reply is a [`TransportError`].
//! No retries are attempted; the user re-triggers analysis explicitly.

use std::sync::Arc;
use std::time::Duration;

use tamper_scope_analysis_contract::{
    HealthReport, ServiceReply, parse_health_reply, parse_service_reply,
};
use tamper_scope_core::{MediaType, SelectedImage};
use thiserror::Error;
use url::Url;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_ANALYZE_ENDPOINT: &str = "http://localhost:5000/api/analyze";

/// Multipart field carrying the image bytes.
pub const IMAGE_FIELD: &str = "image";

/// Health probe path, resolved relative to the analyze endpoint.
pub const HEALTH_PATH: &str = "health";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Image packaged for transport.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name attached to the multipart part.
    pub file_name: String,
    /// Media type attached to the multipart part.
    pub media_type: MediaType,
    /// Raw payload.
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Copies the payload of a selected image for submission.
    pub fn from_selected(image: &SelectedImage) -> Self {
        Self {
            file_name: image.file_name().to_string(),
            media_type: image.media_type(),
            bytes: image.bytes().to_vec(),
        }
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Undecoded HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl RawReply {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract HTTP transport used by [`AnalysisClient`].
pub trait AnalysisTransport: Send + Sync {
    /// Posts `upload` as multipart form data to `endpoint`.
    ///
    /// The upload is taken by value so its bytes move into the request body.
    fn post_image(&self, endpoint: &Url, upload: ImageUpload) -> Result<RawReply, TransportError>;

    /// Issues a plain GET request.
    fn get(&self, url: &Url) -> Result<RawReply, TransportError>;
}

/// Blocking reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns [`TransportError::Client`] when the HTTP client cannot be
    /// initialised (for example, no TLS backend).
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Client(error.to_string()))?;
        Ok(Self { client })
    }
}

impl AnalysisTransport for HttpTransport {
    fn post_image(&self, endpoint: &Url, upload: ImageUpload) -> Result<RawReply, TransportError> {
        let ImageUpload {
            file_name,
            media_type,
            bytes,
        } = upload;
        let part = reqwest::blocking::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(media_type.as_mime())
            .map_err(|error| TransportError::Client(error.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(endpoint.clone())
            .multipart(form)
            .send()
            .map_err(classify_reqwest_error)?;
        read_reply(response)
    }

    fn get(&self, url: &Url) -> Result<RawReply, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(classify_reqwest_error)?;
        read_reply(response)
    }
}

fn read_reply(response: reqwest::blocking::Response) -> Result<RawReply, TransportError> {
    let status = response.status().as_u16();
    let body = response.text().map_err(classify_reqwest_error)?;
    Ok(RawReply { status, body })
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(error.to_string())
    }
}

/// Client that validates the endpoint and classifies replies.
#[derive(Clone)]
pub struct AnalysisClient {
    endpoint: Url,
    transport: Arc<dyn AnalysisTransport>,
}

impl AnalysisClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidEndpoint`] when the URL does not parse,
    /// is not `http`/`https`, or has no host.
    pub fn new(
        endpoint: impl AsRef<str>,
        transport: Arc<dyn AnalysisTransport>,
    ) -> Result<Self, TransportError> {
        let endpoint = validate_endpoint(endpoint.as_ref())?;
        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Returns the configured analyze endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submits one image and decodes the service reply.
    ///
    /// # Errors
    /// Returns [`TransportError::Status`] for non-2xx replies and
    /// [`TransportError::MalformedReply`] when the body breaks the contract.
    /// Transport-level failures are propagated unchanged.
    pub fn submit(&self, upload: ImageUpload) -> Result<ServiceReply, TransportError> {
        tracing::info!(
            endpoint = %self.endpoint,
            file = %upload.file_name,
            media_type = %upload.media_type,
            size = upload.bytes.len(),
            "submitting image for analysis"
        );

        let reply = self.transport.post_image(&self.endpoint, upload)?;
        if !reply.is_success() {
            return Err(TransportError::Status {
                status: reply.status,
            });
        }

        parse_service_reply(&reply.body)
            .map_err(|error| TransportError::MalformedReply(error.to_string()))
    }

    /// URL of the health probe, a sibling of the analyze endpoint.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidEndpoint`] if the URL cannot be joined.
    pub fn health_url(&self) -> Result<Url, TransportError> {
        // A trailing slash makes the endpoint itself a directory.
        let relative = if self.endpoint.path().len() > 1 && self.endpoint.path().ends_with('/') {
            format!("../{HEALTH_PATH}")
        } else {
            HEALTH_PATH.to_string()
        };
        self.endpoint
            .join(&relative)
            .map_err(|error| TransportError::InvalidEndpoint(error.to_string()))
    }

    /// Queries the service health probe.
    ///
    /// # Errors
    /// Same classification as [`AnalysisClient::submit`].
    pub fn health(&self) -> Result<HealthReport, TransportError> {
        let url = self.health_url()?;
        let reply = self.transport.get(&url)?;
        if !reply.is_success() {
            return Err(TransportError::Status {
                status: reply.status,
            });
        }

        parse_health_reply(&reply.body)
            .map_err(|error| TransportError::MalformedReply(error.to_string()))
    }
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Validates an analysis endpoint URL.
///
/// # Errors
/// Returns [`TransportError::InvalidEndpoint`] for unparsable URLs, schemes
/// other than `http`/`https`, or URLs without a host.
pub fn validate_endpoint(endpoint: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(endpoint.trim())
        .map_err(|error| TransportError::InvalidEndpoint(format!("invalid url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(TransportError::InvalidEndpoint(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(TransportError::InvalidEndpoint(
            "endpoint has no host".to_string(),
        ));
    }

    Ok(parsed)
}

/// Failures that prevent a well-formed service reply from being obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Endpoint configuration is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP client could not be built or the request could not be encoded.
    #[error("http client failure: {0}")]
    Client(String),
    /// Connection failed or was dropped.
    #[error("service unreachable: {0}")]
    Unreachable(String),
    /// Request exceeded the configured timeout or was abandoned.
    #[error("request timed out")]
    Timeout,
    /// Service replied with a non-2xx status.
    #[error("service returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// Reply body was not a well-formed service reply.
    #[error("malformed service reply: {0}")]
    MalformedReply(String),
}
