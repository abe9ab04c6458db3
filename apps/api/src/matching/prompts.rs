// Job match prompt templates.

pub const MATCH_ROLE: &str = "You are a career advisor analysing how well a candidate's \
    skills match a job description.";

/// Replace `{skill_list}` and `{job_description}` before sending.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Candidate's skills: {skill_list}

Job Description:
{job_description}

Analyse the match and respond with a JSON object in this EXACT structure:
{
  "matchScore": <integer 0-100>,
  "matchedSkills": ["<skill from the candidate's list that is relevant to this job>"],
  "missingSkills": ["<important skill from the job description the candidate lacks>"],
  "verdict": "<2-3 sentence summary of the fit, what is strong, and what to improve>"
}"#;

pub fn build_match_prompt(skill_list: &str, job_description: &str) -> String {
    MATCH_PROMPT_TEMPLATE
        .replace("{skill_list}", skill_list)
        .replace("{job_description}", job_description)
}
