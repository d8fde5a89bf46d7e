#![warn(missing_docs)]
//! # tamper-scope-ui
//!
//! ## Purpose
//! Defines the view-facing session state machine for `tamper-scope`.
//!
//! ## Responsibilities
//! - Represent the active [`SessionState`] variant.
//! - Enforce single-flight admission for analysis requests.
//! - Apply request completions, including late completions after a reset.
//! - Project the state into display-ready [`SessionView`] snapshots.
//!
//! ## Data flow
//! App orchestration calls the [`AnalysisSessionController`] transition
//! methods; renderers read [`project_view`] snapshots.
//!
//! ## Ownership and lifetimes
//! The controller owns the decoded report. Views borrow from it and never
//! outlive the state they were projected from.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Rejected
//! operations are reported through return values and the single visible
//! error message.

use std::sync::atomic::{AtomicU64, Ordering};

use tamper_scope_analysis_contract::{AnalysisReport, AssessmentTier, ServiceReply};

/// Message shown when the service reports failure without an explanation.
pub const GENERIC_FAILURE_MESSAGE: &str = "Analysis failed";

/// Message shown for every transport-level failure.
pub const CONNECTIVITY_FAILURE_MESSAGE: &str =
    "Failed to connect to the analysis service. Make sure it is running and reachable.";

/// Ticket ids are unique across every controller in the process.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Number of metadata entries included in a report view.
pub const METADATA_DISPLAY_LIMIT: usize = 10;

/// What the view shows. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing selected.
    NoImage,
    /// A valid image is selected and ready to submit.
    ImageSelected,
    /// The selected image is being analysed.
    Analyzing,
    /// The last analysis produced a report.
    ReportReady(Box<AnalysisReport>),
    /// The last analysis failed with the given message.
    Failed(String),
}

impl SessionState {
    /// Returns `true` for every variant that implies a selected image.
    pub fn has_image(&self) -> bool {
        !matches!(self, Self::NoImage)
    }

    /// Returns the stored report, if any.
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::ReportReady(report) => Some(report.as_ref()),
            _ => None,
        }
    }

    /// Short stage name for logs and status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoImage => "no-image",
            Self::ImageSelected => "image-selected",
            Self::Analyzing => "analyzing",
            Self::ReportReady(_) => "report-ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The service answered with a well-formed reply.
    Reply(ServiceReply),
    /// No well-formed reply was obtained; `detail` is for logs only.
    TransportFailure {
        /// Diagnostic detail, never shown to the user.
        detail: String,
    },
}

/// Admission token for one in-flight request.
///
/// Tickets cannot be cloned, so each admitted request completes at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an admitted analysis must be completed or abandoned"]
pub struct AnalysisTicket {
    id: u64,
}

impl AnalysisTicket {
    /// Ticket sequence number, for log correlation.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// What happened when a completion was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    /// The outcome became the visible state.
    Applied,
    /// The session was reset while the request was outstanding; the outcome
    /// was dropped.
    Discarded,
    /// The ticket does not belong to the outstanding request.
    UnknownTicket,
}

/// Owns the request lifecycle, the decoded report, and the visible error.
///
/// Not `Clone`: a copy would duplicate the single in-flight slot.
#[derive(Debug)]
pub struct AnalysisSessionController {
    state: SessionState,
    in_flight: Option<u64>,
    rejection: Option<String>,
}

impl AnalysisSessionController {
    /// Creates a controller in [`SessionState::NoImage`].
    pub fn new() -> Self {
        Self {
            state: SessionState::NoImage,
            in_flight: None,
            rejection: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns `true` while a request is outstanding, including one orphaned
    /// by a reset.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns `true` when a submission would be admitted.
    pub fn can_submit(&self) -> bool {
        self.in_flight.is_none()
            && matches!(
                self.state,
                SessionState::ImageSelected | SessionState::ReportReady(_) | SessionState::Failed(_)
            )
    }

    /// The single error message currently visible, if any.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message.as_str()),
            _ => self.rejection.as_deref(),
        }
    }

    /// Clears the visible error before a new pick is validated.
    ///
    /// A failed analysis falls back to `ImageSelected`; the image is kept.
    pub fn clear_error(&mut self) {
        self.rejection = None;
        if matches!(self.state, SessionState::Failed(_)) {
            self.state = SessionState::ImageSelected;
        }
    }

    /// Records a rejected pick. The state itself is left untouched.
    pub fn image_rejected(&mut self, message: impl Into<String>) {
        self.rejection = Some(message.into());
    }

    /// Records a successful pick, discarding any report or error.
    pub fn image_selected(&mut self) {
        self.rejection = None;
        self.state = SessionState::ImageSelected;
    }

    /// Returns to `NoImage`, discarding report and errors.
    ///
    /// An outstanding request keeps its in-flight marker so no second
    /// submission starts before it resolves; its outcome is discarded.
    pub fn reset(&mut self) {
        self.rejection = None;
        self.state = SessionState::NoImage;
    }

    /// Admits a submission and moves to `Analyzing`.
    ///
    /// Returns `None` without side effects while a request is outstanding or
    /// when no image is selected.
    pub fn begin(&mut self) -> Option<AnalysisTicket> {
        if let Some(outstanding) = self.in_flight {
            tracing::debug!(ticket = outstanding, "analysis already in flight; ignoring");
            return None;
        }
        if !self.state.has_image() {
            tracing::debug!("analysis requested without a selected image; ignoring");
            return None;
        }

        let id = NEXT_TICKET.fetch_add(1, Ordering::Relaxed);
        self.in_flight = Some(id);
        self.rejection = None;
        self.state = SessionState::Analyzing;
        Some(AnalysisTicket { id })
    }

    /// Applies the outcome of an admitted request and clears the in-flight
    /// marker.
    pub fn complete(
        &mut self,
        ticket: AnalysisTicket,
        outcome: AnalysisOutcome,
    ) -> CompletionDisposition {
        if self.in_flight != Some(ticket.id) {
            tracing::warn!(ticket = ticket.id, "completion for unknown ticket ignored");
            return CompletionDisposition::UnknownTicket;
        }
        self.in_flight = None;

        if !matches!(self.state, SessionState::Analyzing) {
            tracing::info!(
                ticket = ticket.id,
                state = self.state.label(),
                "session changed while request was in flight; outcome discarded"
            );
            return CompletionDisposition::Discarded;
        }

        self.state = match outcome {
            AnalysisOutcome::Reply(ServiceReply::Report(report)) => {
                tracing::info!(
                    ticket = ticket.id,
                    score = report.score,
                    assessment = %report.assessment,
                    "analysis report received"
                );
                SessionState::ReportReady(report)
            }
            AnalysisOutcome::Reply(ServiceReply::Failure { message }) => {
                tracing::warn!(
                    ticket = ticket.id,
                    message = message.as_deref().unwrap_or(""),
                    "service reported analysis failure"
                );
                SessionState::Failed(message.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()))
            }
            AnalysisOutcome::TransportFailure { detail } => {
                tracing::warn!(ticket = ticket.id, %detail, "analysis transport failure");
                SessionState::Failed(CONNECTIVITY_FAILURE_MESSAGE.to_string())
            }
        };
        CompletionDisposition::Applied
    }

    /// Resolves an admitted request that will never complete (cancelled or
    /// timed out locally), exactly as a transport failure.
    pub fn abandon(&mut self, ticket: AnalysisTicket) -> CompletionDisposition {
        self.complete(
            ticket,
            AnalysisOutcome::TransportFailure {
                detail: "request abandoned before completion".to_string(),
            },
        )
    }
}

impl Default for AnalysisSessionController {
    fn default() -> Self {
        Self::new()
    }
}

/// Badge text for a verdict tier.
pub fn tier_badge(tier: AssessmentTier) -> &'static str {
    match tier {
        AssessmentTier::Authentic => "[OK]",
        AssessmentTier::Caution => "[CAUTION]",
        AssessmentTier::Alarm => "[ALERT]",
    }
}

/// Display-ready snapshot of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView<'a> {
    /// Stage name from [`SessionState::label`].
    pub stage: &'static str,
    /// Whether the submit action is enabled.
    pub can_submit: bool,
    /// Whether the reset action is offered.
    pub can_reset: bool,
    /// Whether a progress indicator should be shown.
    pub busy: bool,
    /// The single visible error message.
    pub error: Option<&'a str>,
    /// Report panel content.
    pub report: Option<ReportView<'a>>,
}

/// Display-ready report content.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportView<'a> {
    /// Presentation tier.
    pub tier: AssessmentTier,
    /// Badge text for the tier.
    pub badge: &'static str,
    /// Verdict string.
    pub assessment: &'a str,
    /// Confidence label.
    pub confidence: &'a str,
    /// Score rendered as `N/100`.
    pub score_label: String,
    /// Findings in service order.
    pub reasons: &'a [String],
    /// Embedded ELA image reference.
    pub ela_image: &'a str,
    /// First [`METADATA_DISPLAY_LIMIT`] metadata entries, sorted by key.
    pub metadata: Vec<(&'a str, &'a str)>,
    /// Image dimensions.
    pub dimensions: &'a str,
    /// Image format, `Unknown` when not reported.
    pub format: &'a str,
    /// Pixel mode.
    pub mode: &'a str,
}

/// Projects controller state into a view snapshot.
pub fn project_view(controller: &AnalysisSessionController) -> SessionView<'_> {
    let state = controller.state();
    SessionView {
        stage: state.label(),
        can_submit: controller.can_submit(),
        can_reset: state.has_image(),
        busy: matches!(state, SessionState::Analyzing),
        error: controller.error_message(),
        report: state.report().map(project_report),
    }
}

/// Projects one report into display-ready content.
pub fn project_report(report: &AnalysisReport) -> ReportView<'_> {
    let tier = report.tier();
    ReportView {
        tier,
        badge: tier_badge(tier),
        assessment: &report.assessment,
        confidence: &report.confidence,
        score_label: format!("{}/100", report.score),
        reasons: &report.reasons,
        ela_image: &report.ela_image,
        metadata: report
            .metadata
            .iter()
            .take(METADATA_DISPLAY_LIMIT)
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect(),
        dimensions: &report.quality_metrics.dimensions,
        format: report.quality_metrics.format_label(),
        mode: &report.quality_metrics.mode,
    }
}
