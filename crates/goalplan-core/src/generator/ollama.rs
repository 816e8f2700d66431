//! Ollama adapter.
//!
//! Runs `<binary> run <model>`, feeds the prompt on stdin, and captures
//! stdout/stderr until the process exits or the deadline elapses.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::trait_def::TextGenerator;
use super::types::{GenerationOutput, Invocation};

/// [`TextGenerator`] backed by the `ollama` command-line client.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    binary: PathBuf,
    model: String,
    label: String,
}

impl OllamaGenerator {
    /// Model used when none is configured.
    pub const DEFAULT_MODEL: &str = "mistral";

    pub fn new(binary: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            binary: binary.into(),
            label: format!("ollama:{model}"),
            model,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.label
    }

    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<Invocation> {
        let start = Instant::now();

        let mut child = Command::new(&self.binary)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!(
                    "failed to start model process {} run {}",
                    self.binary.display(),
                    self.model
                )
            })?;

        // Feed stdin and drain both output pipes concurrently with waiting,
        // so neither side can block on a full pipe buffer.
        let stdin_pipe = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let write_prompt = async {
            if let Some(mut pipe) = stdin_pipe {
                // Closing stdin signals end of prompt. A model that exits
                // without reading everything yields a broken pipe here; the
                // exit status is what counts.
                if let Err(e) = pipe.write_all(prompt.as_bytes()).await {
                    debug!(error = %e, "model process closed stdin early");
                }
                drop(pipe);
            }
        };

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        match tokio::time::timeout(timeout, async {
            let ((), wait_result, stdout, stderr) =
                tokio::join!(write_prompt, child.wait(), read_stdout, read_stderr);
            (wait_result, stdout, stderr)
        })
        .await
        {
            Ok((Ok(status), stdout, stderr)) => {
                debug!(
                    generator = %self.label,
                    exit_code = ?status.code(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    stdout_len = stdout.len(),
                    "model process exited"
                );
                Ok(Invocation::Completed(GenerationOutput {
                    stdout,
                    stderr,
                    exit_code: status.code(),
                }))
            }
            Ok((Err(e), _, _)) => Err(e).with_context(|| {
                format!("failed to wait on model process {}", self.binary.display())
            }),
            Err(_) => {
                warn!(
                    generator = %self.label,
                    timeout_secs = timeout.as_secs(),
                    "model process timed out; killing it"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed-out model process");
                }
                Ok(Invocation::TimedOut)
            }
        }
    }
}
