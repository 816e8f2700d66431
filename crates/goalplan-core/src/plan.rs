//! Plan and task schema, and normalization of raw model objects into it.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::coerce::{self, Coerced};
use crate::error::PlanError;

const DEFAULT_LABEL: &str = "medium";
const DEFAULT_TASK_DURATION: i64 = 1;

/// Request body accepted by the plan endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest {
    pub goal: String,
}

/// A normalized project plan.
///
/// Keys the model emitted beyond the fixed schema are carried in `extra`
/// and serialized back at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub goal: String,
    /// Total duration in days.
    pub total_duration: u64,
    pub estimated_completion: NaiveDate,
    pub tasks: Vec<Task>,
    pub analysis: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single task within a [`Plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub phase: String,
    pub start_day: i64,
    pub duration: i64,
    pub dependencies: Vec<i64>,
    pub priority: String,
    pub effort: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalize a raw model object into a [`Plan`].
///
/// `goal` is the caller's goal and is always echoed back. `today` anchors
/// the completion-date fallback. Per-task field problems are recovered
/// with defaults; only plan-level problems are returned as errors.
pub fn normalize_plan(
    mut raw: Map<String, Value>,
    goal: &str,
    today: NaiveDate,
) -> Result<Plan, PlanError> {
    raw.remove("goal");

    let total_duration = total_duration(raw.remove("totalDuration"))?;
    let estimated_completion =
        completion_date(raw.remove("estimatedCompletion"), total_duration, today)?;

    let tasks = match raw.remove("tasks") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| normalize_task(index, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(PlanError::InvalidSchema(format!(
                "tasks must be an array, got {}",
                json_type_name(&other)
            )));
        }
    };

    let analysis = match raw.remove("analysis") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };

    Ok(Plan {
        goal: goal.to_owned(),
        total_duration,
        estimated_completion,
        tasks,
        analysis,
        extra: raw,
    })
}

fn total_duration(value: Option<Value>) -> Result<u64, PlanError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(value) => coerce::as_int(&value)
            .map(|days| u64::try_from(days).unwrap_or(0))
            .ok_or_else(|| {
                PlanError::PostProcessingFailed(format!(
                    "totalDuration is not an integer: {value}"
                ))
            }),
    }
}

/// Keep the model's date when it parses and is not in the past; otherwise
/// project `total_duration` days forward from `today`.
fn completion_date(
    value: Option<Value>,
    total_duration: u64,
    today: NaiveDate,
) -> Result<NaiveDate, PlanError> {
    let parsed = value.as_ref().and_then(Value::as_str).and_then(parse_date);
    match parsed {
        Some(date) if date >= today => Ok(date),
        _ => today
            .checked_add_days(Days::new(total_duration))
            .ok_or_else(|| {
                PlanError::PostProcessingFailed(format!(
                    "totalDuration of {total_duration} days overflows the calendar"
                ))
            }),
    }
}

/// Parse the date portion of an ISO date or datetime string.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.trim().split(|c| c == 'T' || c == ' ').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn normalize_task(index: usize, item: Value) -> Result<Task, PlanError> {
    let Value::Object(mut fields) = item else {
        return Err(PlanError::PostProcessingFailed(format!(
            "task {index} is not an object, got {}",
            json_type_name(&item)
        )));
    };

    let mut take = |key: &str| fields.remove(key);

    let id = logged(index, "id", coerce::coerce_int(take("id").as_ref(), 0));
    let title = coerce::coerce_text(take("title").as_ref()).into_value();
    let description = coerce::coerce_text(take("description").as_ref()).into_value();
    let phase = coerce::coerce_text(take("phase").as_ref()).into_value();
    let start_day = logged(
        index,
        "startDay",
        coerce::coerce_int(take("startDay").as_ref(), 0),
    );
    let duration = logged(
        index,
        "duration",
        coerce::coerce_int(take("duration").as_ref(), DEFAULT_TASK_DURATION),
    );
    let dependencies = logged(
        index,
        "dependencies",
        coerce::coerce_id_list(take("dependencies").as_ref()),
    );
    let priority = logged(
        index,
        "priority",
        coerce::coerce_label(take("priority").as_ref(), DEFAULT_LABEL),
    );
    let effort = logged(
        index,
        "effort",
        coerce::coerce_label(take("effort").as_ref(), DEFAULT_LABEL),
    );

    Ok(Task {
        id,
        title,
        description,
        phase,
        start_day,
        duration,
        dependencies,
        priority,
        effort,
        extra: fields,
    })
}

fn logged<T: std::fmt::Debug>(index: usize, field: &str, coerced: Coerced<T>) -> T {
    if coerced.defaulted {
        debug!(task = index, field, value = ?coerced.value, "substituted default for task field");
    }
    coerced.into_value()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
