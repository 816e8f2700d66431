//! External text-generation capability.
//!
//! The pipeline talks to the model only through the [`TextGenerator`]
//! trait, so tests can substitute a scripted fake for the real
//! [`OllamaGenerator`] subprocess.
//!
//! ```text
//! Planner --invoke(prompt, timeout)--> &dyn TextGenerator
//!                                          |
//!                                          v
//!                       Invocation::Completed { stdout, stderr, exit_code }
//!                       Invocation::TimedOut
//! ```

pub mod locate;
pub mod ollama;
pub mod trait_def;
pub mod types;

pub use locate::resolve_binary;
pub use ollama::OllamaGenerator;
pub use trait_def::TextGenerator;
pub use types::{GenerationOutput, Invocation};
