use crate::errors::ToolError;
use crate::utils::suggest::suggest;
use serde_json::Value;

pub fn unknown_action_error(
    tool: &str,
    action: Option<&Value>,
    known_actions: &[&str],
) -> ToolError {
    let action_value = action.and_then(|v| v.as_str()).unwrap_or("").to_string();
    let suggestions = suggest(&action_value, known_actions, 3);
    let did_you_mean = if suggestions.is_empty() {
        String::new()
    } else {
        format!("Did you mean: {}? ", suggestions.join(", "))
    };
    ToolError::validation(format!("Unknown {} action: {}", tool, action_value))
        .with_hint(format!(
            "{}Use one of: {}.",
            did_you_mean,
            known_actions.join(", ")
        ))
        .with_details(serde_json::json!({
            "known_actions": known_actions,
            "did_you_mean": suggestions,
        }))
}
