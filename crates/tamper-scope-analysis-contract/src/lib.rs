#![warn(missing_docs)]
//! # tamper-scope-analysis-contract
//!
//! ## Purpose
//! Defines the analysis service reply schema and client-side mapping helpers.
//!
//! ## Responsibilities
//! - Decode success and failure replies from the analysis endpoint.
//! - Reject `success: true` bodies that violate the report contract.
//! - Map verdict strings to presentation tiers.
//! - Decode the service health probe.
//!
//! ## Data flow
//! Raw JSON reply -> [`parse_service_reply`] -> [`ServiceReply`] ->
//! session state transition -> [`assessment_tier`] for rendering.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs so reports outlive the transient network
//! buffer they were decoded from.
//!
//! ## Error model
//! Invalid JSON or contract violations return [`AnalysisContractError`]. The
//! session treats both as transport failures, never as service verdicts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Verdict the service emits for images without tampering indicators.
pub const ASSESSMENT_LIKELY_AUTHENTIC: &str = "Likely Authentic";

/// Verdict the service emits for borderline scores.
pub const ASSESSMENT_POSSIBLY_TAMPERED: &str = "Possibly Tampered";

/// Verdict the service emits for high scores.
pub const ASSESSMENT_LIKELY_TAMPERED: &str = "Likely Tampered";

/// Highest tampering score the service may report.
pub const MAX_SCORE: u8 = 100;

/// Decoded result of a successful remote analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Categorical verdict (for example `Likely Authentic`).
    pub assessment: String,
    /// Qualitative confidence label (for example `85%`).
    pub confidence: String,
    /// Tampering score in [0, 100].
    pub score: u8,
    /// Findings in the order the service reported them.
    pub reasons: Vec<String>,
    /// Embedded error-level-analysis image, usually a data URI.
    pub ela_image: String,
    /// Extracted image metadata.
    pub metadata: BTreeMap<String, String>,
    /// Basic image properties.
    pub quality_metrics: QualityMetrics,
    /// Server-side processing duration label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    /// Per-method sub-scores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_methods: Option<DetectionMethods>,
    /// Raw statistics behind the score, already formatted by the service.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detailed_stats: BTreeMap<String, String>,
}

impl AnalysisReport {
    /// Presentation tier for this report's verdict.
    pub fn tier(&self) -> AssessmentTier {
        assessment_tier(&self.assessment)
    }
}

/// Image properties reported alongside the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Analysed dimensions, `WIDTHxHEIGHT`.
    pub dimensions: String,
    /// Container format. The service sends `null` for resized images.
    #[serde(default)]
    pub format: Option<String>,
    /// Pixel mode (for example `RGB`).
    pub mode: String,
    /// Dimensions before server-side downscaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_dimensions: Option<String>,
    /// Mean pixel brightness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_brightness: Option<f64>,
    /// Pixel brightness standard deviation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_brightness: Option<f64>,
}

impl QualityMetrics {
    /// Format for display; `Unknown` when the service omitted it.
    pub fn format_label(&self) -> &str {
        match self.format.as_deref() {
            Some(format) if !format.trim().is_empty() => format,
            _ => "Unknown",
        }
    }
}

/// Sub-scores contributed by each detection method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionMethods {
    /// Error level analysis contribution.
    pub ela_score: u32,
    /// Noise inconsistency contribution.
    pub noise_score: u32,
    /// JPEG ghost contribution.
    pub ghost_score: u32,
    /// Double JPEG compression contribution.
    pub djpeg_score: u32,
    /// Local entropy contribution.
    pub entropy_score: u32,
    /// Editing-software metadata contribution.
    pub metadata_score: u32,
    /// Triggered methods label, `N/6`.
    pub methods_triggered: String,
}

/// A decoded reply from the analysis endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    /// `success: true` with a conforming report.
    Report(Box<AnalysisReport>),
    /// `success: false`; `message` is `None` when the service gave no usable text.
    Failure {
        /// Service-supplied error text.
        message: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct SuccessBody {
    tampering_analysis: TamperingAnalysis,
    ela_image: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    quality_metrics: QualityMetrics,
}

#[derive(Debug, Deserialize)]
struct TamperingAnalysis {
    assessment: String,
    confidence: String,
    score: i64,
    #[serde(default)]
    reasons: Vec<String>,
    #[serde(default)]
    processing_time: Option<String>,
    #[serde(default)]
    detection_methods: Option<DetectionMethods>,
    #[serde(default)]
    detailed_stats: BTreeMap<String, String>,
}

/// Parses a raw reply body from the analysis endpoint.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON or a success body
/// with missing/mistyped fields.
/// Returns [`AnalysisContractError::InvalidContract`] when the `success` flag is
/// absent, the assessment is blank, or the score is outside [0, 100].
pub fn parse_service_reply(raw: &str) -> Result<ServiceReply, AnalysisContractError> {
    let value: Value = serde_json::from_str(raw).map_err(AnalysisContractError::Decode)?;

    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            AnalysisContractError::InvalidContract("success flag is missing".to_string())
        })?;

    if !success {
        // An empty message is as good as none.
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string);
        return Ok(ServiceReply::Failure { message });
    }

    let body: SuccessBody = serde_json::from_value(value).map_err(AnalysisContractError::Decode)?;
    let analysis = body.tampering_analysis;

    if analysis.assessment.trim().is_empty() {
        return Err(AnalysisContractError::InvalidContract(
            "assessment is empty".to_string(),
        ));
    }

    let score = u8::try_from(analysis.score)
        .ok()
        .filter(|score| *score <= MAX_SCORE)
        .ok_or_else(|| {
            AnalysisContractError::InvalidContract(format!(
                "score {} is outside 0..={MAX_SCORE}",
                analysis.score
            ))
        })?;

    Ok(ServiceReply::Report(Box::new(AnalysisReport {
        assessment: analysis.assessment,
        confidence: analysis.confidence,
        score,
        reasons: analysis.reasons,
        ela_image: body.ela_image,
        metadata: body.metadata,
        quality_metrics: body.quality_metrics,
        processing_time: analysis.processing_time,
        detection_methods: analysis.detection_methods,
        detailed_stats: analysis.detailed_stats,
    })))
}

/// Presentation tier derived from a verdict string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentTier {
    /// Positive/neutral verdict.
    Authentic,
    /// Cautionary verdict.
    Caution,
    /// Alarming verdict.
    Alarm,
}

/// Maps a verdict string to its presentation tier.
///
/// Only the exact `Likely Authentic` verdict is positive; `Possibly Tampered`
/// is cautionary and every other verdict is alarming, so verdicts introduced
/// later by the service err on the side of warning the user.
pub fn assessment_tier(assessment: &str) -> AssessmentTier {
    match assessment {
        ASSESSMENT_LIKELY_AUTHENTIC => AssessmentTier::Authentic,
        ASSESSMENT_POSSIBLY_TAMPERED => AssessmentTier::Caution,
        _ => AssessmentTier::Alarm,
    }
}

/// Reply from the service health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Service status, `healthy` when ready.
    pub status: String,
    /// Detector build label.
    #[serde(default)]
    pub version: Option<String>,
    /// Release notes advertised by the service.
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl HealthReport {
    /// Returns `true` when the service reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Parses a raw health probe body.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON or a missing
/// `status` field.
pub fn parse_health_reply(raw: &str) -> Result<HealthReport, AnalysisContractError> {
    serde_json::from_str(raw).map_err(AnalysisContractError::Decode)
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
}
