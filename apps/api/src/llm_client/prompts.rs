// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from inventing field facts.
pub const FACTS_ONLY_INSTRUCTION: &str = "\
    Use ONLY facts stated by the technician or present in the work order context. \
    Do NOT invent part numbers, readings, dates, or outcomes. \
    If something is unknown, leave it out rather than guessing.";
