//! Shared test utilities for goalplan integration tests.
//!
//! Provides [`ScriptedGenerator`], a [`TextGenerator`] that replays a fixed
//! sequence of outcomes and records every prompt it receives, so pipeline
//! and HTTP tests run deterministically without spawning a model.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use goalplan_core::generator::{GenerationOutput, Invocation, TextGenerator};

/// Model output from the canonical podcast scenario: commentary before the
/// object, string ids, mixed-case labels, a past date and a trailing comma.
pub const PODCAST_OUTPUT: &str = r#"Sure! Here is the plan: {"goal":"Launch a podcast","totalDuration":30,"estimatedCompletion":"2020-01-01","tasks":[{"id":"1","title":"Plan format","startDay":0,"duration":5,"dependencies":[],"priority":"HIGH","effort":"Medium"},],"analysis":{"complexity":"medium"}}"#;

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// The model ran to completion.
    Output(GenerationOutput),
    /// The deadline elapsed.
    TimedOut,
    /// The model could not be started.
    SpawnError(String),
}

impl Scripted {
    /// A successful run printing `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::Output(GenerationOutput::ok(stdout))
    }

    /// A run that exited with `code`.
    pub fn exit(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Output(GenerationOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(code),
        })
    }
}

/// A prompt/timeout pair the generator was invoked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub timeout: Duration,
}

/// Replays scripted outcomes in order; errors once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn new(responses: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A generator that answers exactly once with `stdout`.
    pub fn replying(stdout: impl Into<String>) -> Self {
        Self::new([Scripted::ok(stdout)])
    }

    /// Every invocation so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<Invocation> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(RecordedCall {
                prompt: prompt.to_owned(),
                timeout,
            });

        let next = self
            .responses
            .lock()
            .expect("responses lock poisoned")
            .pop_front();

        match next {
            Some(Scripted::Output(out)) => Ok(Invocation::Completed(out)),
            Some(Scripted::TimedOut) => Ok(Invocation::TimedOut),
            Some(Scripted::SpawnError(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("scripted generator has no responses left")),
        }
    }
}
