//! Plan generation pipeline.
//!
//! ```text
//! build prompt -> invoke (600s) -> usable? --no--> strict prompt -> invoke (300s)
//!                                    |                                  |
//!                                   yes                                 |
//!                                    v                                  v
//!                               extract_json  <-------------------------+
//!                                    |
//!                                    v
//!                              normalize_plan -> Plan
//! ```
//!
//! At most one retry, no backoff. A timeout on the first attempt fails the
//! request immediately; any failure of the retry is a generation failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::error::{DIAGNOSTIC_LIMIT, PlanError, truncate_chars};
use crate::extract::extract_json;
use crate::generator::{Invocation, TextGenerator};
use crate::plan::{Plan, normalize_plan};
use crate::prompt::{build_prompt, build_retry_prompt};

/// Outputs shorter than this (after trimming) are treated as unusable.
pub const MIN_USABLE_OUTPUT_CHARS: usize = 20;

/// How much raw output is logged at debug level.
const LOG_PREVIEW_CHARS: usize = 4000;

/// Deadlines for the two model invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bound on the first invocation.
    pub timeout: Duration,
    /// Bound on the stricter retry invocation.
    pub retry_timeout: Duration,
}

impl PipelineConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
    pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(300);
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            retry_timeout: Self::DEFAULT_RETRY_TIMEOUT,
        }
    }
}

/// Turns goals into plans using a [`TextGenerator`].
///
/// Holds no per-request state; one instance serves concurrent requests,
/// each of which starts its own model invocation.
#[derive(Clone)]
pub struct Planner {
    generator: Arc<dyn TextGenerator>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Planner {
    pub fn new(generator: Arc<dyn TextGenerator>, config: PipelineConfig) -> Self {
        Self { generator, config }
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Generate a plan for `goal`, anchoring dates at today's UTC date.
    pub async fn generate_plan(&self, goal: &str) -> Result<Plan, PlanError> {
        self.generate_plan_on(goal, Utc::now().date_naive()).await
    }

    /// Generate a plan for `goal` with an explicit "today".
    pub async fn generate_plan_on(&self, goal: &str, today: NaiveDate) -> Result<Plan, PlanError> {
        info!(goal, generator = self.generator.name(), "generate-plan start");

        let start = Instant::now();
        let output = match self
            .generator
            .invoke(&build_prompt(goal), self.config.timeout)
            .await
        {
            Ok(Invocation::TimedOut) => {
                warn!(
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "model timed out"
                );
                return Err(PlanError::GenerationTimeout {
                    timeout_secs: self.config.timeout.as_secs(),
                });
            }
            other => completed_stdout(other, "")?,
        };

        info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "model returned; attempting JSON parse"
        );
        debug!(raw = %truncate_chars(&output, LOG_PREVIEW_CHARS), "raw model output");

        let output = if is_usable(&output) {
            output
        } else {
            warn!("model returned no JSON; retrying with explicit instruction");
            self.retry(goal).await?
        };

        let raw = extract_json(&output).map_err(|source| {
            warn!(error = %source, "JSON parse failed");
            PlanError::ParseFailed {
                source,
                raw_output: truncate_chars(&output, DIAGNOSTIC_LIMIT),
            }
        })?;

        let plan = normalize_plan(raw, goal, today).inspect_err(|e| {
            warn!(error = %e, kind = e.kind(), "post-processing failed");
        })?;

        info!(
            goal,
            tasks = plan.tasks.len(),
            total_duration = plan.total_duration,
            "plan generated"
        );
        Ok(plan)
    }

    async fn retry(&self, goal: &str) -> Result<String, PlanError> {
        let result = self
            .generator
            .invoke(&build_retry_prompt(goal), self.config.retry_timeout)
            .await;

        if let Ok(Invocation::TimedOut) = result {
            return Err(PlanError::generation_failed(
                format!(
                    "model timed out after {}s on retry",
                    self.config.retry_timeout.as_secs()
                ),
                None,
                "",
                "",
            ));
        }

        let output = completed_stdout(result, " on retry")?;
        debug!(raw = %truncate_chars(&output, DIAGNOSTIC_LIMIT), "model responded after retry");
        Ok(output)
    }
}

/// Whether the first attempt produced something worth parsing.
pub fn is_usable(output: &str) -> bool {
    output.trim().chars().count() >= MIN_USABLE_OUTPUT_CHARS && output.contains('{')
}

/// Unwrap a successful invocation's stdout or describe why there is none.
fn completed_stdout(
    result: anyhow::Result<Invocation>,
    attempt: &str,
) -> Result<String, PlanError> {
    match result {
        Ok(Invocation::Completed(out)) if out.succeeded() => Ok(out.stdout),
        Ok(Invocation::Completed(out)) => {
            let status = match out.exit_code {
                Some(code) => format!("rc={code}"),
                None => "terminated by signal".to_owned(),
            };
            Err(PlanError::generation_failed(
                format!("model exited with {status}{attempt}"),
                out.exit_code,
                &out.stdout,
                &out.stderr,
            ))
        }
        Ok(Invocation::TimedOut) => Err(PlanError::generation_failed(
            format!("model timed out{attempt}"),
            None,
            "",
            "",
        )),
        Err(e) => Err(PlanError::generation_failed(
            format!("{e:#}{attempt}"),
            None,
            "",
            "",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_unusable() {
        assert!(!is_usable("{}"));
        assert!(!is_usable("  {\"a\": 1}   \n\n"));
    }

    #[test]
    fn output_without_brace_is_unusable() {
        assert!(!is_usable(
            "I'd be happy to help you plan that project in detail."
        ));
    }

    #[test]
    fn long_output_with_brace_is_usable() {
        assert!(is_usable("Here it is: {\"goal\": \"podcast\"}"));
    }

    #[test]
    fn unbalanced_output_still_counts_as_usable() {
        // Usability is a cheap pre-check; extraction decides the rest.
        assert!(is_usable("{\"goal\": \"podcast\", \"tasks\": ["));
    }

    #[test]
    fn default_config_bounds() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(600));
        assert_eq!(cfg.retry_timeout, Duration::from_secs(300));
    }

    #[test]
    fn nonzero_exit_becomes_generation_failed() {
        let out = crate::generator::GenerationOutput {
            stdout: "partial".into(),
            stderr: "boom".into(),
            exit_code: Some(2),
        };
        let err = completed_stdout(Ok(Invocation::Completed(out)), "").unwrap_err();
        match err {
            PlanError::GenerationFailed {
                reason,
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(reason, "model exited with rc=2");
                assert_eq!(exit_code, Some(2));
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn spawn_error_becomes_generation_failed() {
        let err = completed_stdout(Err(anyhow::anyhow!("no such file")), " on retry")
            .unwrap_err();
        assert!(matches!(err, PlanError::GenerationFailed { .. }));
        assert!(err.to_string().contains("no such file on retry"));
    }
}
