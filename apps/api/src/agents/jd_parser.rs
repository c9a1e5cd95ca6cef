//! JD Parser: turns a raw job description into structured requirements.

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{JD_PARSE_PROMPT_TEMPLATE, JD_PARSE_SYSTEM};
use crate::agents::vocabulary::{
    self, contains_term, find_term, DEFAULT_ROLE, DEFAULT_SOFT_SKILLS, ENTRY_MARKERS,
    PREFERENCE_MARKERS, ROLE_TITLES, SENIOR_MARKERS, SOFT_SKILLS, TECH_SKILLS,
};
use crate::extraction::schema::{Field, FieldType, Schema};
use crate::extraction::ExtractionTask;

const MAX_SKILLS: usize = 10;
const MAX_RESPONSIBILITIES: usize = 5;
const RETRIEVAL_QUERY_CHARS: usize = 200;

pub const JOB_REQUIREMENTS: Schema = Schema {
    name: "JobRequirements",
    fields: &[
        Field::required("role", FieldType::Text),
        Field::required("required_skills", FieldType::TextList),
        Field::optional("preferred_skills", FieldType::TextList),
        Field::optional("soft_skills", FieldType::TextList),
        Field::required(
            "experience_level",
            FieldType::Enum {
                variants: &["entry", "mid", "senior"],
                default: "mid",
            },
        ),
        Field::optional("education_requirements", FieldType::Text),
        Field::optional("key_responsibilities", FieldType::TextList),
        Field::optional("reasoning", FieldType::Text),
    ],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobLevel {
    Entry,
    #[default]
    Mid,
    Senior,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    pub role: String,
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub experience_level: JobLevel,
    #[serde(default)]
    pub education_requirements: String,
    #[serde(default)]
    pub key_responsibilities: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

pub struct JdParser;

impl ExtractionTask for JdParser {
    type Input = String;
    type Output = JobRequirements;

    fn kind(&self) -> &'static str {
        "job_requirements"
    }

    fn schema(&self) -> &'static Schema {
        &JOB_REQUIREMENTS
    }

    fn system_prompt(&self) -> &'static str {
        JD_PARSE_SYSTEM
    }

    fn build_prompt(&self, job_description: &String) -> String {
        JD_PARSE_PROMPT_TEMPLATE.replace("{job_description}", job_description.trim())
    }

    /// Similar postings, looked up by the opening of the description.
    fn retrieval_query(&self, job_description: &String) -> Option<String> {
        Some(
            job_description
                .chars()
                .take(RETRIEVAL_QUERY_CHARS)
                .collect(),
        )
    }

    fn fallback(&self, job_description: &String) -> JobRequirements {
        let text = job_description.as_str();
        let lower = text.to_lowercase();

        // Skills first mentioned after a preference marker are optional.
        let marker = PREFERENCE_MARKERS
            .iter()
            .filter_map(|m| find_term(&lower, m))
            .min()
            .unwrap_or(usize::MAX);

        let (required, preferred): (Vec<_>, Vec<_>) = vocabulary::scan(text, TECH_SKILLS)
            .into_iter()
            .partition(|(pos, _)| *pos < marker);

        let mut soft_skills: Vec<String> = vocabulary::scan(text, SOFT_SKILLS)
            .into_iter()
            .map(|(_, name)| name.to_string())
            .collect();
        if soft_skills.is_empty() {
            soft_skills = DEFAULT_SOFT_SKILLS.iter().map(|s| s.to_string()).collect();
        }

        let required_skills: Vec<String> = required
            .into_iter()
            .take(MAX_SKILLS)
            .map(|(_, name)| name.to_string())
            .collect();

        JobRequirements {
            role: detect_role(text, &lower),
            reasoning: format!(
                "Keyword-based analysis (AI service unavailable): matched {} required skills against a fixed vocabulary.",
                required_skills.len()
            ),
            required_skills,
            preferred_skills: preferred
                .into_iter()
                .take(MAX_SKILLS)
                .map(|(_, name)| name.to_string())
                .collect(),
            soft_skills,
            experience_level: detect_level(&lower),
            education_requirements: detect_education(text),
            key_responsibilities: detect_responsibilities(text),
        }
    }
}

fn detect_role(text: &str, lower: &str) -> String {
    let titled = text.lines().find_map(|line| {
        let (label, value) = line.split_once(':')?;
        let label = label.trim().to_lowercase();
        let value = value.trim();
        (label.ends_with("title") && !value.is_empty()).then(|| value.to_string())
    });
    if let Some(role) = titled {
        return role;
    }

    ROLE_TITLES
        .iter()
        .filter_map(|title| find_term(lower, &title.to_lowercase()).map(|pos| (pos, *title)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, title)| title.to_string())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string())
}

fn detect_level(lower: &str) -> JobLevel {
    if ENTRY_MARKERS.iter().any(|m| contains_term(lower, m)) {
        JobLevel::Entry
    } else if SENIOR_MARKERS.iter().any(|m| contains_term(lower, m)) {
        JobLevel::Senior
    } else {
        JobLevel::Mid
    }
}

fn detect_education(text: &str) -> String {
    const DEGREE_MARKERS: &[&str] = &["degree", "bachelor", "master", "phd", "diploma", "b.s.", "b.sc"];

    text.lines()
        .map(|line| strip_bullet(line.trim()))
        .find(|line| {
            let lower = line.to_lowercase();
            DEGREE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|line| line.chars().take(200).collect::<String>().trim().to_string())
        .unwrap_or_else(|| "Bachelor's degree or equivalent".to_string())
}

fn detect_responsibilities(text: &str) -> Vec<String> {
    let bullets: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| strip_bullet(line).len() < line.len())
        .map(|line| strip_bullet(line).to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_RESPONSIBILITIES)
        .collect();

    if bullets.is_empty() {
        vec!["See job description for details".to_string()]
    } else {
        bullets
    }
}

/// Removes a leading list marker ("-", "*", "•", "1.", "2)") if present.
pub(crate) fn strip_bullet(line: &str) -> &str {
    if let Some(rest) = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .or_else(|| line.strip_prefix('•'))
    {
        return rest.trim();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..]
            .strip_prefix('.')
            .or_else(|| line[digits..].strip_prefix(')'))
        {
            return rest.trim();
        }
    }
    line
}
