// Skill extraction prompt templates.

/// Role fragment for the extraction system prompt; combined with the JSON-only rule.
pub const EXTRACTION_ROLE: &str = "You are a skill extraction assistant. \
    Extract skills from academic documents and return them as a JSON array.";

/// Extraction prompt template. Replace `{document_text}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Analyze the following coursework/document and extract the skills, technologies, and competencies demonstrated by the student.

Return a JSON ARRAY with this EXACT structure:
[
  {
    "skillName": "skill name",
    "category": "category (e.g., Programming, Design, Communication)",
    "skillType": "technical" | "soft" | "transferable",
    "confidenceScore": 0.0-1.0,
    "evidenceText": "brief quote or summary from the document"
  }
]

SKILL TYPES:
- "technical": tools, languages, frameworks, domain knowledge
- "soft": interpersonal qualities such as communication or leadership
- "transferable": methods that carry across roles such as project management or research

RULES:
1. Only include skills the document actually demonstrates; confidenceScore reflects how strongly
2. evidenceText must come from the document, not from general knowledge
3. Return ONLY the JSON array, no markdown formatting

Document content:
{document_text}"#;

pub fn build_extraction_prompt(document_text: &str) -> String {
    EXTRACTION_PROMPT_TEMPLATE.replace("{document_text}", document_text)
}
