// Career guidance prompt templates.

use crate::models::goal::UserGoalRow;
use crate::models::skill::SkillRow;

pub const READINESS_ROLE: &str = "You are a career intelligence advisor for students. \
    Provide precise, actionable career guidance.";

/// Replace `{career_goal}`, `{profile}`, `{skill_count}` and `{skill_summary}` before sending.
pub const READINESS_PROMPT_TEMPLATE: &str = r#"Analyze the student's profile and provide actionable career guidance.

Student Profile:
- Career Goal: {career_goal}
{profile}

Extracted Skills ({skill_count} total):
{skill_summary}

Respond with a JSON object in this EXACT structure:
{
  "readinessScore": <integer 0-100 representing career readiness for the stated goal>,
  "summary": "<2-3 sentence personalized assessment>",
  "strengths": ["<strength>", "<strength>", "<strength>"],
  "gaps": [
    {"skill": "<missing skill>", "importance": "high" | "medium" | "low", "suggestion": "<specific actionable step>"}
  ],
  "recommendations": ["<actionable recommendation>", "<actionable recommendation>"]
}

Be specific, honest, and encouraging. Gaps and recommendations must be concrete and actionable."#;

const NOT_SPECIFIED: &str = "Not specified";

/// One line per skill: `- name (type, category, confidence: NN%)`.
pub fn skill_summary(skills: &[SkillRow]) -> String {
    skills
        .iter()
        .map(|s| {
            format!(
                "- {} ({}, {}, confidence: {}%)",
                s.name,
                s.kind(),
                s.category,
                (s.confidence * 100.0).round() as i64
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn profile_lines(goal: &UserGoalRow) -> String {
    let field = |value: &Option<String>| -> String {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(NOT_SPECIFIED)
            .to_string()
    };
    [
        ("Current Study", field(&goal.current_study)),
        ("Education Level", field(&goal.education_level)),
        ("Year of Study", field(&goal.study_year)),
        ("Current Courses", field(&goal.courses)),
        ("Top Priority", field(&goal.top_priority)),
    ]
    .iter()
    .map(|(label, value)| format!("- {label}: {value}"))
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn build_readiness_prompt(career_goal: &str, goal: &UserGoalRow, skills: &[SkillRow]) -> String {
    READINESS_PROMPT_TEMPLATE
        .replace("{skill_count}", &skills.len().to_string())
        .replace("{career_goal}", career_goal)
        .replace("{profile}", &profile_lines(goal))
        .replace("{skill_summary}", &skill_summary(skills))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::snapshot::tests::skill;

    #[test]
    fn test_skill_summary_line_format() {
        let mut rust = skill("Rust", "Programming", "technical");
        rust.confidence = 0.856;
        assert_eq!(
            skill_summary(&[rust]),
            "- Rust (technical, Programming, confidence: 86%)"
        );
    }
}
