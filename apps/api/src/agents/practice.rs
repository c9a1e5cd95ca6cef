//! Practice Generator: coding challenges, behavioral questions and a
//! mini-project tailored to a roadmap and its skill gaps.

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{PRACTICE_PROMPT_TEMPLATE, PRACTICE_SYSTEM};
use crate::agents::roadmap::Roadmap;
use crate::agents::skill_gap::SkillGapReport;
use crate::agents::vocabulary::{dedup_case_insensitive, DEFAULT_ROLE};
use crate::extraction::schema::{Field, FieldType, Schema};
use crate::extraction::ExtractionTask;

const MAX_MISSING: usize = 5;
const MAX_PARTIAL: usize = 3;
const PROMPT_WEEKS: usize = 3;
const PROJECT_SKILLS: usize = 3;

const DIFFICULTY_VARIANTS: &[&str] = &["beginner", "intermediate", "advanced"];

const CHALLENGE: &[Field] = &[
    Field::required("title", FieldType::Text),
    Field::optional(
        "difficulty",
        FieldType::Enum {
            variants: DIFFICULTY_VARIANTS,
            default: "beginner",
        },
    ),
    Field::optional("skill_focus", FieldType::Text),
    Field::optional("description", FieldType::Text),
    Field::optional("requirements", FieldType::TextList),
    Field::optional("hints", FieldType::TextList),
    Field::optional("estimated_time", FieldType::Text),
];

const QUESTION: &[Field] = &[
    Field::required("question", FieldType::Text),
    Field::optional("skill_focus", FieldType::Text),
    Field::optional("guidance", FieldType::Text),
    Field::optional("sample_answer_structure", FieldType::Text),
];

const PROJECT: &[Field] = &[
    Field::required("title", FieldType::Text),
    Field::optional("description", FieldType::Text),
    Field::optional("skills_demonstrated", FieldType::TextList),
    Field::optional("scope", FieldType::Text),
    Field::optional("deliverables", FieldType::TextList),
    Field::optional("estimated_time", FieldType::Text),
    Field::optional(
        "difficulty",
        FieldType::Enum {
            variants: DIFFICULTY_VARIANTS,
            default: "intermediate",
        },
    ),
];

pub const PRACTICE_BUNDLE: Schema = Schema {
    name: "PracticeBundle",
    fields: &[
        Field::required("coding_challenges", FieldType::ObjectList(CHALLENGE)),
        Field::required("behavioral_questions", FieldType::ObjectList(QUESTION)),
        Field::required("mini_projects", FieldType::ObjectList(PROJECT)),
        Field::optional("reasoning", FieldType::Text),
    ],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingChallenge {
    pub title: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub skill_focus: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub estimated_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralQuestion {
    pub question: String,
    #[serde(default)]
    pub skill_focus: String,
    #[serde(default)]
    pub guidance: String,
    #[serde(default)]
    pub sample_answer_structure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills_demonstrated: Vec<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeBundle {
    pub coding_challenges: Vec<CodingChallenge>,
    pub behavioral_questions: Vec<BehavioralQuestion>,
    pub mini_projects: Vec<MiniProject>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeInput {
    pub roadmap: Roadmap,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub skill_gaps: SkillGapReport,
}

pub struct PracticeGenerator;

impl ExtractionTask for PracticeGenerator {
    type Input = PracticeInput;
    type Output = PracticeBundle;

    fn kind(&self) -> &'static str {
        "practice_bundle"
    }

    fn schema(&self) -> &'static Schema {
        &PRACTICE_BUNDLE
    }

    fn system_prompt(&self) -> &'static str {
        PRACTICE_SYSTEM
    }

    fn build_prompt(&self, input: &PracticeInput) -> String {
        let weeks: Vec<_> = input.roadmap.weeks.iter().take(PROMPT_WEEKS).collect();
        let gaps = serde_json::json!({
            "missing_skills": input.skill_gaps.missing_skills.iter().take(MAX_MISSING).collect::<Vec<_>>(),
            "partial_skills": input.skill_gaps.partial_skills.iter().take(MAX_PARTIAL).collect::<Vec<_>>(),
        });
        PRACTICE_PROMPT_TEMPLATE
            .replace("{role}", role_name(&input.role))
            .replace(
                "{weeks}",
                &serde_json::to_string_pretty(&weeks).unwrap_or_default(),
            )
            .replace(
                "{skill_gaps}",
                &serde_json::to_string_pretty(&gaps).unwrap_or_default(),
            )
    }

    fn fallback(&self, input: &PracticeInput) -> PracticeBundle {
        let role = role_name(&input.role);

        let mut targets: Vec<(String, Difficulty)> = input
            .skill_gaps
            .missing_skills
            .iter()
            .take(MAX_MISSING)
            .map(|m| (m.skill.clone(), Difficulty::Beginner))
            .chain(
                input
                    .skill_gaps
                    .partial_skills
                    .iter()
                    .take(MAX_PARTIAL)
                    .map(|p| (p.skill.clone(), Difficulty::Intermediate)),
            )
            .collect();

        if targets.is_empty() {
            let focus = input.roadmap.weeks.iter().flat_map(|w| &w.focus_skills);
            targets = dedup_case_insensitive(focus)
                .into_iter()
                .take(MAX_MISSING)
                .map(|skill| (skill, Difficulty::Beginner))
                .collect();
        }
        if targets.is_empty() {
            targets = vec![(role.to_string(), Difficulty::Beginner)];
        }

        let project_skills: Vec<String> = targets
            .iter()
            .take(PROJECT_SKILLS)
            .map(|(skill, _)| skill.clone())
            .collect();

        PracticeBundle {
            coding_challenges: targets
                .iter()
                .map(|(skill, difficulty)| challenge(skill, *difficulty))
                .collect(),
            behavioral_questions: behavioral_questions(role),
            mini_projects: vec![capstone_project(role, project_skills)],
            reasoning: format!(
                "Template-based practice set (AI service unavailable): one challenge per skill gap, \
                 standard behavioral questions for the {role} role, and one portfolio project."
            ),
        }
    }
}

fn role_name(role: &str) -> &str {
    let role = role.trim();
    if role.is_empty() {
        DEFAULT_ROLE
    } else {
        role
    }
}

fn challenge(skill: &str, difficulty: Difficulty) -> CodingChallenge {
    let (title, description, estimated_time) = match difficulty {
        Difficulty::Beginner => (
            format!("{skill} fundamentals exercise"),
            format!("Solve a small, self-contained problem that exercises the core features of {skill}."),
            "2 hours",
        ),
        Difficulty::Intermediate | Difficulty::Advanced => (
            format!("{skill} applied exercise"),
            format!("Extend an existing small project with a feature that relies on {skill}, including edge cases."),
            "3 hours",
        ),
    };
    CodingChallenge {
        title,
        difficulty,
        skill_focus: skill.to_string(),
        description,
        requirements: vec![
            format!("Use {skill} as the primary tool for the solution"),
            "Document how to run the solution".to_string(),
            "Cover at least one edge case".to_string(),
        ],
        hints: vec![
            format!("Start from the official {skill} getting-started guide"),
            "Break the problem into small steps and verify each one".to_string(),
        ],
        estimated_time: estimated_time.to_string(),
    }
}

fn behavioral_questions(role: &str) -> Vec<BehavioralQuestion> {
    const STAR: &str = "Situation, Task, Action, Result (STAR)";
    vec![
        BehavioralQuestion {
            question: format!(
                "Tell me about a project where you used skills relevant to a {role} position."
            ),
            skill_focus: "Role fit".to_string(),
            guidance: "Interviewers look for concrete contributions and measurable outcomes.".to_string(),
            sample_answer_structure: STAR.to_string(),
        },
        BehavioralQuestion {
            question: "Describe a time you had to learn a new tool or technology quickly.".to_string(),
            skill_focus: "Learning agility".to_string(),
            guidance: "Show how you structure self-study and apply it under time pressure.".to_string(),
            sample_answer_structure: STAR.to_string(),
        },
        BehavioralQuestion {
            question: "How do you explain technical work to a non-technical audience?".to_string(),
            skill_focus: "Communication".to_string(),
            guidance: "Interviewers look for clarity, empathy and checking for understanding.".to_string(),
            sample_answer_structure: STAR.to_string(),
        },
    ]
}

fn capstone_project(role: &str, skills: Vec<String>) -> MiniProject {
    MiniProject {
        title: format!("{role} portfolio project"),
        description: format!(
            "A small end-to-end project that demonstrates {} in a realistic {role} scenario.",
            skills.join(", ")
        ),
        scope: "One focused use case with real or realistic sample data".to_string(),
        deliverables: vec![
            "Source code in a public repository".to_string(),
            "README describing the problem, approach and results".to_string(),
        ],
        estimated_time: "2 weeks".to_string(),
        difficulty: Difficulty::Intermediate,
        skills_demonstrated: skills,
    }
}
