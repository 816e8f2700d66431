//! Best-effort model warm-up.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::truncate_chars;
use crate::generator::{Invocation, TextGenerator};

/// Prompt sent to load the model into memory.
pub const WARMUP_PROMPT: &str = "Warmup: reply 'ready' in one word.\n";

/// Default bound on the warm-up invocation.
pub const DEFAULT_WARMUP_TIMEOUT: Duration = Duration::from_secs(300);

/// Characters of each stream logged when warm-up fails.
const WARMUP_LOG_CHARS: usize = 1000;

/// Run a throwaway invocation so the first real request does not pay the
/// model load time.
///
/// Returns whether the model answered with exit status 0. Failures are
/// logged and never propagated.
pub async fn warm_up(generator: &dyn TextGenerator, timeout: Duration) -> bool {
    info!(generator = generator.name(), "warming model");
    let start = Instant::now();

    match generator.invoke(WARMUP_PROMPT, timeout).await {
        Ok(Invocation::Completed(out)) if out.succeeded() => {
            info!(
                elapsed_secs = start.elapsed().as_secs_f64(),
                "model warm-up complete"
            );
            true
        }
        Ok(Invocation::Completed(out)) => {
            warn!(
                exit_code = ?out.exit_code,
                stdout = %truncate_chars(&out.stdout, WARMUP_LOG_CHARS),
                stderr = %truncate_chars(&out.stderr, WARMUP_LOG_CHARS),
                "model warm-up failed"
            );
            false
        }
        Ok(Invocation::TimedOut) => {
            warn!(timeout_secs = timeout.as_secs(), "model warm-up timed out");
            false
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "model warm-up failed to start");
            false
        }
    }
}
