//! Core of the goalplan service: turn a free-text goal into a normalized
//! project plan by prompting a local model process and recovering JSON from
//! whatever it prints.

pub mod coerce;
pub mod error;
pub mod extract;
pub mod generator;
pub mod pipeline;
pub mod plan;
pub mod prompt;
pub mod warmup;

pub use error::PlanError;
pub use extract::{ExtractError, extract_json};
pub use generator::{
    GenerationOutput, Invocation, OllamaGenerator, TextGenerator, resolve_binary,
};
pub use pipeline::{PipelineConfig, Planner};
pub use plan::{GoalRequest, Plan, Task, normalize_plan};
pub use warmup::warm_up;
