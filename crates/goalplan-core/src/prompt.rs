//! Prompt templates for plan generation.
//!
//! Pure string construction; no I/O.

/// Key set the model must return, shared by both prompts.
const OUTPUT_CONTRACT: &str = "Return an object with keys: goal, totalDuration (days), \
estimatedCompletion (ISO date), tasks (array), and analysis (object). \
Tasks must have: id,title,description,phase,startDay,duration,dependencies,priority,effort.";

/// Explicit schema example used by the stricter retry prompt.
const RETRY_SCHEMA: &str = r#"Format:
{
  "goal": "string",
  "totalDuration": number,
  "estimatedCompletion": "YYYY-MM-DD",
  "tasks": [{"id": number, "title": "string", "description": "string", "phase": "string",
             "startDay": number, "duration": number, "dependencies": [], "priority": "low|medium|high", "effort": "low|medium|high"}],
  "analysis": {"complexity": "string", "totalTasks": number, "recommendations": []}
}"#;

/// Build the first-attempt prompt for `goal`.
pub fn build_prompt(goal: &str) -> String {
    let mut prompt = String::with_capacity(512 + goal.len());
    prompt.push_str(
        "You are an expert project manager. Output VALID JSON ONLY (no commentary).\n",
    );
    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');
    prompt.push_str(&format!("Goal: \"\"\"{goal}\"\"\"."));
    prompt
}

/// Build the stricter prompt used when the first attempt returned nothing
/// that looks like JSON.
pub fn build_retry_prompt(goal: &str) -> String {
    let mut prompt = String::with_capacity(1024 + goal.len());
    prompt.push_str(
        "You must return ONLY valid JSON. Do not explain. Do not add commentary.\n",
    );
    prompt.push_str(RETRY_SCHEMA);
    prompt.push('\n');
    prompt.push_str(&format!("Goal: \"{goal}\"\n"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_demands_json_only() {
        let prompt = build_prompt("Launch a podcast");
        assert!(prompt.contains("VALID JSON ONLY"));
        assert!(prompt.contains("no commentary"));
    }

    #[test]
    fn prompt_lists_plan_and_task_keys() {
        let prompt = build_prompt("x");
        for key in ["goal", "totalDuration", "estimatedCompletion", "tasks", "analysis"] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.contains(
            "id,title,description,phase,startDay,duration,dependencies,priority,effort"
        ));
    }

    #[test]
    fn prompt_embeds_goal() {
        let prompt = build_prompt("Learn Rust in 30 days");
        assert!(prompt.contains("Goal: \"\"\"Learn Rust in 30 days\"\"\"."));
    }

    #[test]
    fn prompt_passes_empty_goal_through() {
        let prompt = build_prompt("   ");
        assert!(prompt.ends_with("Goal: \"\"\"   \"\"\"."));
    }

    #[test]
    fn retry_prompt_is_stricter() {
        let prompt = build_retry_prompt("Launch a podcast");
        assert!(prompt.contains("ONLY valid JSON"));
        assert!(prompt.contains("Do not explain"));
        assert!(prompt.contains("\"estimatedCompletion\": \"YYYY-MM-DD\""));
        assert!(prompt.contains("\"priority\": \"low|medium|high\""));
        assert!(prompt.contains("Goal: \"Launch a podcast\""));
    }

    #[test]
    fn prompts_differ() {
        assert_ne!(build_prompt("g"), build_retry_prompt("g"));
    }
}
