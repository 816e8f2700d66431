//! Pipeline-level error taxonomy.
//!
//! Every variant aborts a single request; none of them is fatal to the
//! process. Diagnostic payloads are bounded by [`DIAGNOSTIC_LIMIT`].

use thiserror::Error;

use crate::extract::ExtractError;

/// Maximum number of characters of raw model output carried by an error.
pub const DIAGNOSTIC_LIMIT: usize = 2000;

/// Errors returned by [`crate::Planner::generate_plan`].
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("model timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("model generation failed: {reason}")]
    GenerationFailed {
        reason: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to parse JSON from model output: {source}")]
    ParseFailed {
        #[source]
        source: ExtractError,
        raw_output: String,
    },

    #[error("invalid plan schema: {0}")]
    InvalidSchema(String),

    #[error("post-processing error: {0}")]
    PostProcessingFailed(String),
}

impl PlanError {
    /// Stable snake_case identifier used in HTTP error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GenerationTimeout { .. } => "generation_timeout",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::ParseFailed { .. } => "parse_failed",
            Self::InvalidSchema(_) => "invalid_schema",
            Self::PostProcessingFailed(_) => "post_processing_failed",
        }
    }

    /// Whether the failure was the model exceeding its first-attempt deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::GenerationTimeout { .. })
    }

    /// Build a [`PlanError::GenerationFailed`] with both streams truncated.
    pub(crate) fn generation_failed(
        reason: impl Into<String>,
        exit_code: Option<i32>,
        stdout: &str,
        stderr: &str,
    ) -> Self {
        Self::GenerationFailed {
            reason: reason.into(),
            exit_code,
            stdout: truncate_chars(stdout, DIAGNOSTIC_LIMIT),
            stderr: truncate_chars(stderr, DIAGNOSTIC_LIMIT),
        }
    }
}

/// Return at most the first `max` characters of `s`.
///
/// Counts characters rather than bytes so multi-byte text never splits.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}
