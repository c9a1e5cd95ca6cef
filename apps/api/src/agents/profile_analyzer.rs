//! Profile Analyzer: normalizes a student's self-reported skills into
//! standard categories.

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{PROFILE_PROMPT_TEMPLATE, PROFILE_SYSTEM};
use crate::agents::vocabulary::{classify_skill, dedup_case_insensitive, SkillBucket};
use crate::extraction::schema::{Field, FieldType, Schema};
use crate::extraction::ExtractionTask;

const SKILL_BUCKETS: &[Field] = &[
    Field::optional("programming_languages", FieldType::TextList),
    Field::optional("frameworks", FieldType::TextList),
    Field::optional("tools", FieldType::TextList),
    Field::optional("databases", FieldType::TextList),
    Field::optional("soft_skills", FieldType::TextList),
    Field::optional("domain_knowledge", FieldType::TextList),
];

pub const NORMALIZED_PROFILE: Schema = Schema {
    name: "NormalizedProfile",
    fields: &[
        Field::required("normalized_skills", FieldType::Object(SKILL_BUCKETS)),
        Field::required(
            "experience_level",
            FieldType::Enum {
                variants: &["beginner", "intermediate", "advanced"],
                default: "beginner",
            },
        ),
        Field::optional("skill_summary", FieldType::Text),
        Field::optional("strengths", FieldType::TextList),
        Field::optional("reasoning", FieldType::Text),
    ],
};

/// Profile as entered by the student or read from a resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub degree: Option<String>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ProfileLevel {
    /// Maps free-form self-assessment text onto a level.
    pub fn from_self_assessment(text: &str) -> Self {
        let lower = text.to_lowercase();
        if ["advanced", "expert", "senior", "experienced"]
            .iter()
            .any(|m| lower.contains(m))
        {
            ProfileLevel::Advanced
        } else if ["intermediate", "mid", "some experience"]
            .iter()
            .any(|m| lower.contains(m))
        {
            ProfileLevel::Intermediate
        } else {
            ProfileLevel::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileLevel::Beginner => "beginner",
            ProfileLevel::Intermediate => "intermediate",
            ProfileLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSkills {
    #[serde(default)]
    pub programming_languages: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub domain_knowledge: Vec<String>,
}

impl NormalizedSkills {
    pub fn bucket_mut(&mut self, bucket: SkillBucket) -> &mut Vec<String> {
        match bucket {
            SkillBucket::ProgrammingLanguages => &mut self.programming_languages,
            SkillBucket::Frameworks => &mut self.frameworks,
            SkillBucket::Databases => &mut self.databases,
            SkillBucket::SoftSkills => &mut self.soft_skills,
            SkillBucket::DomainKnowledge => &mut self.domain_knowledge,
            SkillBucket::Tools => &mut self.tools,
        }
    }

    /// Every skill across all buckets.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.programming_languages
            .iter()
            .chain(&self.frameworks)
            .chain(&self.tools)
            .chain(&self.databases)
            .chain(&self.soft_skills)
            .chain(&self.domain_knowledge)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProfile {
    pub normalized_skills: NormalizedSkills,
    #[serde(default)]
    pub experience_level: ProfileLevel,
    #[serde(default)]
    pub skill_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

pub struct ProfileAnalyzer;

impl ExtractionTask for ProfileAnalyzer {
    type Input = ProfileInput;
    type Output = NormalizedProfile;

    fn kind(&self) -> &'static str {
        "normalized_profile"
    }

    fn schema(&self) -> &'static Schema {
        &NORMALIZED_PROFILE
    }

    fn system_prompt(&self) -> &'static str {
        PROFILE_SYSTEM
    }

    fn build_prompt(&self, profile: &ProfileInput) -> String {
        let rendered = serde_json::to_string_pretty(profile).unwrap_or_default();
        PROFILE_PROMPT_TEMPLATE.replace("{profile}", &rendered)
    }

    fn fallback(&self, profile: &ProfileInput) -> NormalizedProfile {
        let skills = dedup_case_insensitive(&profile.skills);
        let level = profile
            .experience_level
            .as_deref()
            .map(ProfileLevel::from_self_assessment)
            .unwrap_or_default();

        let mut normalized = NormalizedSkills::default();
        for skill in &skills {
            normalized.bucket_mut(classify_skill(skill)).push(skill.clone());
        }

        NormalizedProfile {
            normalized_skills: normalized,
            experience_level: level,
            skill_summary: format!(
                "Profile with {} skills at {} level",
                skills.len(),
                level.as_str()
            ),
            strengths: skills.iter().take(3).cloned().collect(),
            reasoning: "Keyword-based categorization (AI service unavailable).".to_string(),
        }
    }
}
