#![warn(missing_docs)]
//! # tamper-scope-app
//!
//! ## Purpose
//! Orchestrates intake, submission, and session state for `tamper-scope`.
//!
//! ## Responsibilities
//! - Keep the intake controller and the analysis controller consistent.
//! - Resolve endpoint and timeout configuration.
//! - Turn files on disk into intake candidates.
//! - Render session views as terminal text.
//!
//! ## Data flow
//! File -> [`candidate_from_path`] -> [`Session::select_file`] ->
//! [`Session::analyze`] (or [`Session::begin_analysis`] /
//! [`Session::complete_analysis`] for event-driven shells) -> [`render_view`].
//!
//! ## Ownership and lifetimes
//! [`Session`] owns both controllers. Pending uploads own a copy of the
//! payload so the request can run while the session is borrowed elsewhere.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Analysis failures are not
//! errors at this level; they become [`SessionState::Failed`].

use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use tamper_scope_analysis_contract::ServiceReply;
use tamper_scope_core::{
    DataUriPreviewStore, ImageCandidate, IntakeController, MAX_IMAGE_BYTES, MediaType,
    PreviewStore, SelectedImage, ValidationError,
};
use tamper_scope_ui::{
    AnalysisOutcome, AnalysisSessionController, AnalysisTicket, CompletionDisposition,
    SessionState, SessionView, project_view,
};
use tamper_scope_upload::{
    AnalysisClient, DEFAULT_ANALYZE_ENDPOINT, DEFAULT_TIMEOUT, HttpTransport, ImageUpload,
    TransportError, validate_endpoint,
};
use thiserror::Error;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("TAMPER_SCOPE_VERSION");

/// Environment variable overriding the analyze endpoint.
pub const ENDPOINT_ENV: &str = "TAMPER_SCOPE_ENDPOINT";

/// Environment variable overriding the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "TAMPER_SCOPE_TIMEOUT_SECS";

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "TAMPER_SCOPE_LOG";

/// Media type declared for files whose extension is not recognised.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Analyze endpoint URL.
    pub endpoint: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl AppConfig {
    /// Builds configuration from optional overrides, falling back to defaults.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an invalid endpoint or a zero timeout.
    pub fn new(endpoint: Option<String>, timeout_secs: Option<u64>) -> Result<Self, AppError> {
        let endpoint = endpoint
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or_else(|| DEFAULT_ANALYZE_ENDPOINT.to_string());
        validate_endpoint(&endpoint).map_err(|error| AppError::Config(error.to_string()))?;

        let timeout = match timeout_secs {
            Some(0) => {
                return Err(AppError::Config(
                    "timeout must be at least one second".to_string(),
                ));
            }
            Some(seconds) => Duration::from_secs(seconds),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self { endpoint, timeout })
    }

    /// Builds an HTTP-backed analysis client.
    ///
    /// # Errors
    /// Returns [`AppError::Transport`] when the HTTP client cannot be built.
    pub fn build_client(&self) -> Result<AnalysisClient, AppError> {
        let transport = HttpTransport::new(self.timeout).map_err(AppError::Transport)?;
        AnalysisClient::new(&self.endpoint, Arc::new(transport)).map_err(AppError::Transport)
    }
}

/// Command line surface of the `tamper-scope` binary.
///
/// Flags fall back to [`ENDPOINT_ENV`] and [`TIMEOUT_ENV`], then to defaults.
#[derive(Debug, Parser)]
#[command(name = "tamper-scope", version = APP_VERSION, about = "Submit images for tamper analysis")]
pub struct Cli {
    /// Analyze endpoint URL.
    #[arg(long, global = true, env = ENDPOINT_ENV)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = TIMEOUT_ENV, value_parser = parse_timeout_secs)]
    pub timeout_secs: Option<u64>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolves the endpoint and timeout carried by the parsed arguments.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an invalid endpoint or a zero timeout.
    pub fn config(&self) -> Result<AppConfig, AppError> {
        AppConfig::new(self.endpoint.clone(), self.timeout_secs)
    }
}

/// `tamper-scope` subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate an image and submit it for analysis.
    Analyze {
        /// Image file (JPEG, PNG or WebP, at most 10 MB).
        file: PathBuf,
        /// Print the decoded report as JSON instead of text.
        #[arg(long)]
        json: bool,
        /// Write the error level analysis image to this path.
        #[arg(long)]
        ela_out: Option<PathBuf>,
    },
    /// Validate an image without submitting it.
    Check {
        /// Image file to validate.
        file: PathBuf,
    },
    /// Probe the analysis service health endpoint.
    Health,
}

fn parse_timeout_secs(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| format!("expected whole seconds: {error}"))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ANALYZE_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Reads a file into an intake candidate.
///
/// At most `MAX_IMAGE_BYTES + 1` bytes are read, which is enough for intake
/// validation to reject oversize files without loading them whole. The
/// declared media type comes from the file extension.
///
/// # Errors
/// Returns [`AppError::Read`] when the file cannot be opened or read.
pub fn candidate_from_path(path: &Path) -> Result<ImageCandidate, AppError> {
    let file = std::fs::File::open(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bytes = Vec::new();
    file.take(MAX_IMAGE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let media_type = path
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(MediaType::from_extension)
        .map_or(UNKNOWN_MEDIA_TYPE, |media_type| media_type.as_mime());
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(ImageCandidate::new(file_name, media_type, bytes))
}

/// A request admitted by [`Session::begin_analysis`] and not yet completed.
#[derive(Debug)]
pub struct PendingAnalysis {
    /// Admission ticket to hand back on completion.
    pub ticket: AnalysisTicket,
    /// Payload to submit.
    pub upload: ImageUpload,
}

/// One user session: the current pick plus its analysis lifecycle.
#[derive(Debug)]
pub struct Session {
    intake: IntakeController,
    analysis: AnalysisSessionController,
}

impl Session {
    /// Creates an empty session whose previews come from `previews`.
    pub fn new(previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            intake: IntakeController::new(previews),
            analysis: AnalysisSessionController::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        self.analysis.state()
    }

    /// Current selection, if any.
    pub fn selected(&self) -> Option<&SelectedImage> {
        self.intake.selected()
    }

    /// The single visible error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.analysis.error_message()
    }

    /// Returns `true` while a request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.analysis.is_in_flight()
    }

    /// Display-ready snapshot.
    pub fn view(&self) -> SessionView<'_> {
        project_view(&self.analysis)
    }

    /// Validates and stores a new pick.
    ///
    /// Any visible error is cleared first. On success the previous image,
    /// report, and error are discarded and the session is `ImageSelected`.
    ///
    /// # Errors
    /// Returns [`SessionError::AnalysisInFlight`] while analysing, and
    /// [`SessionError::Validation`] for rejected files (the message also
    /// becomes the visible error).
    pub fn select_file(&mut self, candidate: ImageCandidate) -> Result<(), SessionError> {
        if matches!(self.analysis.state(), SessionState::Analyzing) {
            return Err(SessionError::AnalysisInFlight);
        }

        self.analysis.clear_error();
        match self.intake.select_file(candidate) {
            Ok(_) => {
                self.analysis.image_selected();
                Ok(())
            }
            Err(error) => {
                self.analysis.image_rejected(error.to_string());
                Err(SessionError::Validation(error))
            }
        }
    }

    /// Clears image, preview, report, and errors. Safe from any state.
    pub fn reset(&mut self) {
        let had_image = self.intake.clear();
        self.analysis.reset();
        tracing::debug!(had_image, "session reset");
    }

    /// Admits a submission of the current image.
    ///
    /// Returns `None` when nothing is selected or a request is outstanding.
    pub fn begin_analysis(&mut self) -> Option<PendingAnalysis> {
        let image = self.intake.selected()?;
        let ticket = self.analysis.begin()?;
        Some(PendingAnalysis {
            ticket,
            upload: ImageUpload::from_selected(image),
        })
    }

    /// Applies the result of a request admitted by [`Session::begin_analysis`].
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<ServiceReply, TransportError>,
    ) -> CompletionDisposition {
        let outcome = match result {
            Ok(reply) => AnalysisOutcome::Reply(reply),
            Err(error) => AnalysisOutcome::TransportFailure {
                detail: error.to_string(),
            },
        };
        self.analysis.complete(ticket, outcome)
    }

    /// Resolves an admitted request that was cancelled or timed out locally.
    pub fn abandon_analysis(&mut self, ticket: AnalysisTicket) -> CompletionDisposition {
        self.analysis.abandon(ticket)
    }

    /// Submits the current image through `client` and applies the result.
    ///
    /// Returns `None` when the submission was not admitted.
    pub fn analyze(&mut self, client: &AnalysisClient) -> Option<CompletionDisposition> {
        let pending = self.begin_analysis()?;
        let result = client.submit(pending.upload);
        Some(self.complete_analysis(pending.ticket, result))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Arc::new(DataUriPreviewStore::new()))
    }
}

/// Renders a session view as terminal text.
pub fn render_view(view: &SessionView<'_>) -> String {
    let mut out = String::new();

    if view.busy {
        out.push_str("Analyzing...\n");
    }
    if let Some(error) = view.error {
        let _ = writeln!(out, "Error: {error}");
    }

    let Some(report) = &view.report else {
        if out.is_empty() {
            out.push_str("Select an image and analyze it to see results.\n");
        }
        return out;
    };

    let _ = writeln!(out, "{} {}", report.badge, report.assessment);
    let _ = writeln!(out, "Confidence: {}", report.confidence);
    let _ = writeln!(out, "Tampering Score: {}", report.score_label);

    out.push_str("\nAnalysis Findings\n");
    for reason in report.reasons {
        let _ = writeln!(out, "  - {reason}");
    }

    if !report.metadata.is_empty() {
        out.push_str("\nMetadata\n");
        for (key, value) in &report.metadata {
            let _ = writeln!(out, "  {key}: {value}");
        }
    }

    out.push_str("\nImage Properties\n");
    let _ = writeln!(out, "  Dimensions: {}", report.dimensions);
    let _ = writeln!(out, "  Format: {}", report.format);
    let _ = writeln!(out, "  Mode: {}", report.mode);

    let _ = writeln!(
        out,
        "\nError Level Analysis image: {} characters (use --ela-out to save)",
        report.ela_image.len()
    );
    out
}

/// Line reported when intake rejects a file, for every subcommand.
pub fn render_rejection(file_name: &str, error: &ValidationError) -> String {
    format!("Error: {file_name}: {error}")
}

/// Decodes a base64 data URI into its MIME type and bytes.
///
/// # Errors
/// Returns [`AppError::InvalidDataUri`] when the value is not a base64 data URI.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), AppError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| AppError::InvalidDataUri("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::InvalidDataUri("missing payload separator".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::InvalidDataUri("payload is not base64".to_string()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|error| AppError::InvalidDataUri(error.to_string()))?;
    Ok((mime.to_string(), bytes))
}

/// Session operation errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The picked file was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Selections are refused while a request is outstanding.
    #[error("an analysis is already in progress")]
    AnalysisInFlight,
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
    /// Input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Session rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Transport setup or request failure outside the session.
    #[error("transport error: {0}")]
    Transport(TransportError),
    /// Embedded image could not be decoded.
    #[error("invalid data uri: {0}")]
    InvalidDataUri(String),
    /// Report could not be serialised.
    #[error("report encoding failure: {0}")]
    Encode(#[from] serde_json::Error),
}
