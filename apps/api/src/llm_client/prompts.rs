// Cross-cutting prompt fragments. Each agent keeps its own system prompt and
// prompt builder in `agents::prompts`; only the output contract lives here.

/// Appended to every rendered request, followed by the schema's required
/// top-level field names.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    Respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies. \
    Use empty strings or empty arrays for information you cannot determine.";
