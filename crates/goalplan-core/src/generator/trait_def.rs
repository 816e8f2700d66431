//! The `TextGenerator` trait -- the seam between the pipeline and the model.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::types::Invocation;

/// A locally-run model that turns a prompt into free-form text.
///
/// Implementations deliver `prompt` to the model, wait at most `timeout`,
/// and report either the completed output or [`Invocation::TimedOut`]. On
/// timeout the implementation must terminate whatever it started.
///
/// An `Err` means the model could not be started or awaited at all; a
/// non-zero exit is reported as a completed invocation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable name for logs (e.g. "ollama:mistral").
    fn name(&self) -> &str;

    /// Run the model once with `prompt` as input.
    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<Invocation>;
}

// Compile-time assertion: TextGenerator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TextGenerator) {}
};
