//! `goalplan probe`: run the model once and dump what it printed.
//!
//! A manual diagnostic for checking that the model executable works and
//! how long a cold start takes, independent of the HTTP service.

use std::time::{Duration, Instant};

use anyhow::Result;

use goalplan_core::error::truncate_chars;
use goalplan_core::generator::{Invocation, TextGenerator};

/// Prompt used when none is given on the command line.
pub const DEFAULT_PROBE_PROMPT: &str = "Test: reply 'ok' in one sentence.\n";

/// Characters of each stream shown in the report.
const PROBE_OUTPUT_CHARS: usize = 8000;

/// Invoke `generator` once and print a report to stdout.
///
/// Spawn failures are returned as errors; a timeout or non-zero exit is
/// reported, not treated as a failure of the command itself.
pub async fn run_probe(generator: &dyn TextGenerator, prompt: &str, timeout: Duration) -> Result<()> {
    println!(
        "Running {} synchronously... (may cold-start the model)",
        generator.name()
    );
    let start = Instant::now();
    let invocation = generator.invoke(prompt, timeout).await?;
    print!("{}", render_report(&invocation, timeout));
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Format the outcome of a probe invocation.
pub fn render_report(invocation: &Invocation, timeout: Duration) -> String {
    match invocation {
        Invocation::TimedOut => {
            format!("TIMEOUT (no response within {}s)\n", timeout.as_secs())
        }
        Invocation::Completed(out) => {
            let code = match out.exit_code {
                Some(code) => code.to_string(),
                None => "killed by signal".to_string(),
            };
            format!(
                "RETURN CODE: {code}\n\
                 --- STDOUT (first {PROBE_OUTPUT_CHARS} chars) ---\n{}\n\
                 --- STDERR (first {PROBE_OUTPUT_CHARS} chars) ---\n{}\n",
                truncate_chars(&out.stdout, PROBE_OUTPUT_CHARS),
                truncate_chars(&out.stderr, PROBE_OUTPUT_CHARS),
            )
        }
    }
}
