/// Captured result of a model process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationOutput {
    /// Everything the process wrote to standard output.
    pub stdout: String,
    /// Everything the process wrote to standard error.
    pub stderr: String,
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl GenerationOutput {
    /// Convenience constructor for a successful run.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Whether the process exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Outcome of one invocation of the model process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The process exited before the deadline.
    Completed(GenerationOutput),
    /// The deadline elapsed and the process was killed.
    TimedOut,
}
