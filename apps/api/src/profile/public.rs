//! Public profile view, served without authentication at `/p/:userId`.

use serde::Serialize;
use uuid::Uuid;

use crate::models::goal::UserGoalRow;
use crate::models::guidance::CareerGuidanceRow;
use crate::models::skill::{SkillRow, SkillType};
use crate::skills::snapshot::TypeCounts;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGroup {
    pub skill_type: SkillType,
    pub categories: Vec<CategoryGroup>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGuidance {
    pub readiness_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub user_id: Uuid,
    pub career_goal: Option<String>,
    pub current_study: Option<String>,
    pub skill_count: usize,
    pub counts: TypeCounts,
    /// Types with no skills are omitted.
    pub skills: Vec<SkillGroup>,
    pub guidance: Option<PublicGuidance>,
}

fn group_by_category(skills: &[&SkillRow]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for skill in skills {
        match groups.iter_mut().find(|g| g.category == skill.category) {
            Some(group) => group.skills.push(skill.name.clone()),
            None => groups.push(CategoryGroup {
                category: skill.category.clone(),
                skills: vec![skill.name.clone()],
            }),
        }
    }
    groups
}

/// Returns `None` unless the owner has a goal row marked public.
pub fn build_public_profile(
    goal: Option<&UserGoalRow>,
    skills: &[SkillRow],
    guidance: Option<&CareerGuidanceRow>,
) -> Option<PublicProfile> {
    let goal = goal.filter(|g| g.is_public)?;

    let grouped = SkillType::ALL
        .iter()
        .filter_map(|skill_type| {
            let of_type: Vec<&SkillRow> =
                skills.iter().filter(|s| s.kind() == *skill_type).collect();
            (!of_type.is_empty()).then(|| SkillGroup {
                skill_type: *skill_type,
                categories: group_by_category(&of_type),
            })
        })
        .collect();

    Some(PublicProfile {
        user_id: goal.user_id,
        career_goal: goal.career_goal().map(str::to_string),
        current_study: goal.current_study.clone(),
        skill_count: skills.len(),
        counts: TypeCounts::from_skills(skills),
        skills: grouped,
        guidance: guidance.map(|g| PublicGuidance {
            readiness_score: g.readiness_score,
            summary: g.summary.clone(),
            strengths: g.strengths.clone(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::snapshot::tests::skill;
    use chrono::Utc;

    fn goal(is_public: bool) -> UserGoalRow {
        UserGoalRow {
            user_id: Uuid::new_v4(),
            career_goal: Some("  Data Scientist ".to_string()),
            education_level: None,
            current_study: Some("MSc Statistics".to_string()),
            study_year: None,
            top_priority: None,
            courses: None,
            is_public,
            onboarding_completed: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_private_or_missing_goal_has_no_profile() {
        assert!(build_public_profile(None, &[], None).is_none());
        assert!(build_public_profile(Some(&goal(false)), &[], None).is_none());
    }

    #[test]
    fn test_skills_grouped_by_type_then_category_in_first_seen_order() {
        let skills = vec![
            skill("Python", "Programming", "technical"),
            skill("Mentoring", "Leadership", "soft"),
            skill("Pandas", "Data", "technical"),
            skill("R", "Programming", "technical"),
        ];
        let profile = build_public_profile(Some(&goal(true)), &skills, None).unwrap();

        assert_eq!(profile.career_goal.as_deref(), Some("Data Scientist"));
        assert_eq!(profile.skills.len(), 2);
        let technical = &profile.skills[0];
        assert_eq!(technical.skill_type, SkillType::Technical);
        assert_eq!(technical.categories[0].category, "Programming");
        assert_eq!(technical.categories[0].skills, vec!["Python", "R"]);
        assert_eq!(technical.categories[1].category, "Data");
        assert_eq!(profile.skills[1].skill_type, SkillType::Soft);
        assert_eq!(profile.counts.technical, 3);
        assert!(profile.guidance.is_none());
    }
}
