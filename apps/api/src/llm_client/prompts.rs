// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that forbids inventing facts about the candidate.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Do NOT invent companies, employers, internships, institutions, degrees, \
    certifications or credentials. Every organization in your output must already appear \
    in the input. You may sharpen wording and add realistic context to existing entries; \
    you may not add new entries.";

/// Instruction that pins the output to the input's shape.
pub const PRESERVE_SHAPE_INSTRUCTION: &str = "\
    CRITICAL: Return the SAME JSON structure with the SAME keys at every level. \
    Do NOT add keys, remove keys, rename keys or change a value's type. \
    Lists keep their order and their length.";
