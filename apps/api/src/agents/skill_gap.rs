//! Skill Gap Analyzer: compares job requirements with a normalized profile.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::agents::jd_parser::JobRequirements;
use crate::agents::profile_analyzer::NormalizedProfile;
use crate::agents::prompts::{SKILL_GAP_PROMPT_TEMPLATE, SKILL_GAP_SYSTEM};
use crate::agents::vocabulary::{classify_skill, contains_term, dedup_case_insensitive};
use crate::extraction::schema::{Field, FieldType, Schema};
use crate::extraction::ExtractionTask;

const PRIORITY: FieldType = FieldType::Enum {
    variants: &["high", "medium", "low"],
    default: "medium",
};

const MISSING_SKILL: &[Field] = &[
    Field::required("skill", FieldType::Text),
    Field::optional("category", FieldType::Text),
    Field::optional("priority", PRIORITY),
    Field::optional("importance", FieldType::Text),
    Field::optional("estimated_time_to_learn", FieldType::Text),
];

const PARTIAL_SKILL: &[Field] = &[
    Field::required("skill", FieldType::Text),
    Field::optional("current_level", FieldType::Text),
    Field::optional("target_level", FieldType::Text),
    Field::optional("gap_analysis", FieldType::Text),
    Field::optional("estimated_time_to_improve", FieldType::Text),
];

const STRONG_SKILL: &[Field] = &[
    Field::required("skill", FieldType::Text),
    Field::optional("confidence", PRIORITY),
    Field::optional("suggestion", FieldType::Text),
];

pub const SKILL_GAP_REPORT: Schema = Schema {
    name: "SkillGapReport",
    fields: &[
        Field::required("missing_skills", FieldType::ObjectList(MISSING_SKILL)),
        Field::required("partial_skills", FieldType::ObjectList(PARTIAL_SKILL)),
        Field::required("strong_skills", FieldType::ObjectList(STRONG_SKILL)),
        Field::required("overall_assessment", FieldType::Text),
        Field::optional("reasoning", FieldType::Text),
    ],
};

/// Shared by gap priority and strong-skill confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSkill {
    pub skill: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub estimated_time_to_learn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSkill {
    pub skill: String,
    #[serde(default)]
    pub current_level: String,
    #[serde(default)]
    pub target_level: String,
    #[serde(default)]
    pub gap_analysis: String,
    #[serde(default)]
    pub estimated_time_to_improve: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongSkill {
    pub skill: String,
    #[serde(default)]
    pub confidence: Priority,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillGapReport {
    #[serde(default)]
    pub missing_skills: Vec<MissingSkill>,
    #[serde(default)]
    pub partial_skills: Vec<PartialSkill>,
    #[serde(default)]
    pub strong_skills: Vec<StrongSkill>,
    #[serde(default)]
    pub overall_assessment: String,
    #[serde(default)]
    pub reasoning: String,
}

impl SkillGapReport {
    /// Missing skills with high priority first, then the rest, then partial
    /// skills. Order within each group is preserved.
    pub fn learning_order(&self) -> Vec<String> {
        let high = self
            .missing_skills
            .iter()
            .filter(|m| m.priority == Priority::High);
        let other = self
            .missing_skills
            .iter()
            .filter(|m| m.priority != Priority::High);
        let skills = high
            .chain(other)
            .map(|m| m.skill.as_str())
            .chain(self.partial_skills.iter().map(|p| p.skill.as_str()));
        dedup_case_insensitive(skills)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGapInput {
    pub job_requirements: JobRequirements,
    pub profile: NormalizedProfile,
}

pub struct SkillGapAnalyzer;

impl ExtractionTask for SkillGapAnalyzer {
    type Input = SkillGapInput;
    type Output = SkillGapReport;

    fn kind(&self) -> &'static str {
        "skill_gap_report"
    }

    fn schema(&self) -> &'static Schema {
        &SKILL_GAP_REPORT
    }

    fn system_prompt(&self) -> &'static str {
        SKILL_GAP_SYSTEM
    }

    fn build_prompt(&self, input: &SkillGapInput) -> String {
        let job = serde_json::json!({
            "role": input.job_requirements.role,
            "required_skills": input.job_requirements.required_skills,
            "preferred_skills": input.job_requirements.preferred_skills,
            "experience_level": input.job_requirements.experience_level,
        });
        let profile = serde_json::json!({
            "normalized_skills": input.profile.normalized_skills,
            "experience_level": input.profile.experience_level,
        });
        SKILL_GAP_PROMPT_TEMPLATE
            .replace("{job}", &serde_json::to_string_pretty(&job).unwrap_or_default())
            .replace(
                "{profile}",
                &serde_json::to_string_pretty(&profile).unwrap_or_default(),
            )
    }

    fn fallback(&self, input: &SkillGapInput) -> SkillGapReport {
        let student: BTreeSet<String> = input
            .profile
            .normalized_skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let required = dedup_case_insensitive(&input.job_requirements.required_skills);
        let mut report = SkillGapReport::default();

        for skill in &required {
            let lower = skill.to_lowercase();
            if student.contains(&lower) {
                report.strong_skills.push(StrongSkill {
                    skill: skill.clone(),
                    confidence: Priority::High,
                    suggestion: format!(
                        "You have {skill}; highlight it in your application and projects"
                    ),
                });
            } else if let Some(related) = related_skill(&lower, &student) {
                report.partial_skills.push(PartialSkill {
                    skill: skill.clone(),
                    current_level: format!("Related knowledge in {related}"),
                    target_level: format!("Working proficiency in {skill}"),
                    gap_analysis: format!("Build on your {related} knowledge to master {skill}"),
                    estimated_time_to_improve: "2-4 weeks".to_string(),
                });
            } else {
                report
                    .missing_skills
                    .push(missing(skill, Priority::High, "is required for this role", "4-8 weeks"));
            }
        }

        let preferred = dedup_case_insensitive(&input.job_requirements.preferred_skills);
        for skill in &preferred {
            let lower = skill.to_lowercase();
            let already_listed = required.iter().any(|r| r.to_lowercase() == lower);
            if !already_listed && !student.contains(&lower) {
                report.missing_skills.push(missing(
                    skill,
                    Priority::Medium,
                    "is preferred for this role",
                    "3-6 weeks",
                ));
            }
        }

        let (strong, partial, gaps) = (
            report.strong_skills.len(),
            report.partial_skills.len(),
            report.missing_skills.len(),
        );
        let match_pct = if required.is_empty() {
            0.0
        } else {
            strong as f64 * 100.0 / required.len() as f64
        };

        report.overall_assessment = format!(
            "You have {strong} strong skills, {partial} partial skills, and {gaps} missing skills for the {} role",
            input.job_requirements.role
        );
        report.reasoning = format!(
            "Keyword-based matching (AI service unavailable). {strong} of {} required skills matched exactly ({match_pct:.1}%). \
             Learn the missing skills first, then strengthen the partial ones.",
            required.len()
        );
        report
    }
}

fn missing(skill: &str, priority: Priority, why: &str, time: &str) -> MissingSkill {
    MissingSkill {
        skill: skill.to_string(),
        category: classify_skill(skill).category().to_string(),
        priority,
        importance: format!("{skill} {why}"),
        estimated_time_to_learn: time.to_string(),
    }
}

/// First student skill that overlaps `skill`: one contains the other as a
/// whole term, or they share a word longer than three characters.
fn related_skill<'a>(skill: &str, student: &'a BTreeSet<String>) -> Option<&'a str> {
    let words: Vec<&str> = skill.split_whitespace().filter(|w| w.len() > 3).collect();
    student
        .iter()
        .find(|s| {
            contains_term(skill, s)
                || contains_term(s, skill)
                || words.iter().any(|w| contains_term(s, w))
        })
        .map(String::as_str)
}
