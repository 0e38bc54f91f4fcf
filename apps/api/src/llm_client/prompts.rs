// Shared prompt fragments. Each feature keeps its own prompts.rs alongside it;
// this file holds the cross-cutting pieces.

/// Appended to every prompt that expects structured output.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Joins a feature prompt with the JSON-only instruction.
pub fn with_json_instruction(prompt: &str) -> String {
    format!("{}\n\n{JSON_ONLY_INSTRUCTION}", prompt.trim_end())
}
