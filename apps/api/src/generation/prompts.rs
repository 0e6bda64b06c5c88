// All LLM prompt constants for the rewrite stage.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for the résumé rewrite.
pub const REWRITE_SYSTEM: &str = "You are a professional ATS resume writer. \
    You rewrite resume content to be concise, specific and results-oriented \
    while keeping every fact the candidate provided.";

/// Rewrite prompt template.
/// Replace: {json_only}, {shape_instruction}, {fabrication_instruction},
///          {sections}, {resume_json}
pub const REWRITE_PROMPT_TEMPLATE: &str = r#"Rewrite and enhance the resume below.

{shape_instruction}

{fabrication_instruction}

RULES:
1. Improve every section that has content: summary, experience, projects, education, skills
2. Expand weak descriptions into strong, professional sentences that fill a single A4 page
3. Keep empty fields empty; do NOT fill in data the candidate left blank
4. Plain text only: no markdown, no HTML, no bullet characters inside values
5. Dates, URLs, email and phone values are copied unchanged

Known sections: {sections}

{json_only}

INPUT JSON:
{resume_json}"#;
