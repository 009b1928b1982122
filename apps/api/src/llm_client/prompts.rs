// Shared prompt fragments for every LLM call.
// Task-specific prompts live next to the code that sends them.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise resume data extractor. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies. \
    Never invent employers, dates, degrees or skills that the text does not state.";
