//! Roadmap Planner: turns a skill gap report into a week-by-week plan.

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{ROADMAP_PROMPT_TEMPLATE, ROADMAP_SYSTEM};
use crate::agents::skill_gap::SkillGapReport;
use crate::extraction::schema::{Field, FieldType, Schema};
use crate::extraction::ExtractionTask;

pub const DEFAULT_WEEKS: u32 = 8;
pub const MAX_WEEKS: u32 = 52;
const MILESTONE_HOURS: u32 = 10;
const CAPSTONE_HOURS: u32 = 15;
const MAX_CAPSTONE_SKILLS: usize = 5;
const RETRIEVAL_SKILLS: usize = 5;

const MILESTONE: &[Field] = &[
    Field::required("title", FieldType::Text),
    Field::optional("description", FieldType::Text),
    Field::optional("skills_covered", FieldType::TextList),
    Field::optional("resources", FieldType::TextList),
    Field::optional("estimated_hours", FieldType::Integer),
];

const WEEK: &[Field] = &[
    Field::required("week_number", FieldType::Integer),
    Field::optional("focus_skills", FieldType::TextList),
    Field::optional("milestones", FieldType::ObjectList(MILESTONE)),
    Field::optional("learning_objectives", FieldType::TextList),
    Field::optional("practice_tasks", FieldType::TextList),
    Field::optional("checkpoint", FieldType::Text),
];

pub const ROADMAP: Schema = Schema {
    name: "Roadmap",
    fields: &[
        Field::required("total_weeks", FieldType::Integer),
        Field::required("weeks", FieldType::ObjectList(WEEK)),
        Field::optional("reasoning", FieldType::Text),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills_covered: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub estimated_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapWeek {
    pub week_number: u32,
    #[serde(default)]
    pub focus_skills: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub practice_tasks: Vec<String>,
    #[serde(default)]
    pub checkpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub total_weeks: u32,
    pub weeks: Vec<RoadmapWeek>,
    #[serde(default)]
    pub reasoning: String,
}

impl Roadmap {
    /// Milestones due by the end of `week`, in plan order.
    pub fn milestones_due_by(&self, week: u32) -> impl Iterator<Item = &Milestone> {
        self.weeks
            .iter()
            .filter(move |w| w.week_number <= week)
            .flat_map(|w| &w.milestones)
    }

    pub fn milestone_count(&self) -> usize {
        self.weeks.iter().map(|w| w.milestones.len()).sum()
    }

    pub fn week(&self, number: u32) -> Option<&RoadmapWeek> {
        self.weeks.iter().find(|w| w.week_number == number)
    }
}

fn default_weeks() -> u32 {
    DEFAULT_WEEKS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapInput {
    pub skill_gaps: SkillGapReport,
    #[serde(default)]
    pub role: String,
    #[serde(default = "default_weeks")]
    pub time_weeks: u32,
}

/// Whether the plan closes gaps or, with none left, sharpens existing skills.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PlanMode {
    Learn,
    Reinforce,
}

pub struct RoadmapPlanner;

impl ExtractionTask for RoadmapPlanner {
    type Input = RoadmapInput;
    type Output = Roadmap;

    fn kind(&self) -> &'static str {
        "roadmap"
    }

    fn schema(&self) -> &'static Schema {
        &ROADMAP
    }

    fn system_prompt(&self) -> &'static str {
        ROADMAP_SYSTEM
    }

    fn build_prompt(&self, input: &RoadmapInput) -> String {
        let gaps = serde_json::json!({
            "missing_skills": input.skill_gaps.missing_skills,
            "partial_skills": input.skill_gaps.partial_skills,
            "overall_assessment": input.skill_gaps.overall_assessment,
        });
        ROADMAP_PROMPT_TEMPLATE
            .replace("{time_weeks}", &input.time_weeks.to_string())
            .replace("{role}", role_or_default(&input.role))
            .replace(
                "{skill_gaps}",
                &serde_json::to_string_pretty(&gaps).unwrap_or_default(),
            )
    }

    /// Courses for the skills the student is missing.
    fn retrieval_query(&self, input: &RoadmapInput) -> Option<String> {
        let skills: Vec<String> = input
            .skill_gaps
            .learning_order()
            .into_iter()
            .take(RETRIEVAL_SKILLS)
            .collect();
        if skills.is_empty() {
            return None;
        }
        Some(format!("{} {}", skills.join(" "), input.role).trim().to_string())
    }

    fn fallback(&self, input: &RoadmapInput) -> Roadmap {
        let total_weeks = input.time_weeks.clamp(1, MAX_WEEKS);
        let role = role_or_default(&input.role);

        let mut skills = input.skill_gaps.learning_order();
        let mut mode = PlanMode::Learn;
        if skills.is_empty() {
            mode = PlanMode::Reinforce;
            skills = input
                .skill_gaps
                .strong_skills
                .iter()
                .map(|s| s.skill.clone())
                .collect();
        }
        if skills.is_empty() {
            skills = vec![format!("{role} fundamentals")];
        }

        let learning_weeks = if total_weeks > 1 { total_weeks - 1 } else { 1 };
        let mut weeks: Vec<RoadmapWeek> = (0..learning_weeks)
            .map(|k| learning_week(k, learning_weeks, &skills, mode))
            .collect();
        if total_weeks > 1 {
            weeks.push(capstone_week(total_weeks, role, &skills));
        }

        let reasoning = match mode {
            PlanMode::Learn => format!(
                "Rule-based plan (AI service unavailable): {} skills spread over {} learning weeks, \
                 high-priority gaps first, followed by a capstone week.",
                skills.len(),
                learning_weeks
            ),
            PlanMode::Reinforce => format!(
                "Rule-based plan (AI service unavailable): no gaps were found, so the {} weeks \
                 reinforce existing strengths toward interview readiness.",
                total_weeks
            ),
        };

        Roadmap {
            total_weeks,
            weeks,
            reasoning,
        }
    }
}

fn role_or_default(role: &str) -> &str {
    let role = role.trim();
    if role.is_empty() {
        "target"
    } else {
        role
    }
}

/// Week `k` (0-based) of `learning_weeks`. Skills are split evenly; with fewer
/// skills than weeks a skill spans consecutive weeks.
fn learning_week(k: u32, learning_weeks: u32, skills: &[String], mode: PlanMode) -> RoadmapWeek {
    let n = skills.len();
    let lw = learning_weeks as usize;
    let k = k as usize;
    let focus: Vec<String> = if n >= lw {
        skills[k * n / lw..(k + 1) * n / lw].to_vec()
    } else {
        vec![skills[k * n / lw].clone()]
    };

    let (verb, detail) = match mode {
        PlanMode::Learn => ("Learn", "Work through the fundamentals of {} and apply them in a small exercise"),
        PlanMode::Reinforce => ("Reinforce", "Deepen {} with advanced exercises toward interview readiness"),
    };

    RoadmapWeek {
        week_number: k as u32 + 1,
        milestones: focus
            .iter()
            .map(|skill| Milestone {
                title: format!("{verb} {skill}"),
                description: detail.replace("{}", skill),
                skills_covered: vec![skill.clone()],
                resources: vec![format!("Official {skill} documentation")],
                estimated_hours: MILESTONE_HOURS,
            })
            .collect(),
        learning_objectives: focus
            .iter()
            .map(|skill| format!("Explain and apply the core concepts of {skill}"))
            .collect(),
        practice_tasks: focus
            .iter()
            .map(|skill| format!("Complete a hands-on exercise using {skill}"))
            .collect(),
        checkpoint: format!(
            "Complete a short exercise using {} without referring to notes",
            focus.join(", ")
        ),
        focus_skills: focus,
    }
}

fn capstone_week(week_number: u32, role: &str, skills: &[String]) -> RoadmapWeek {
    let covered: Vec<String> = skills.iter().take(MAX_CAPSTONE_SKILLS).cloned().collect();
    RoadmapWeek {
        week_number,
        milestones: vec![Milestone {
            title: "Capstone project".to_string(),
            description: format!(
                "Build a portfolio project for the {role} role that combines {}",
                covered.join(", ")
            ),
            skills_covered: covered.clone(),
            resources: vec!["Project README and write-up".to_string()],
            estimated_hours: CAPSTONE_HOURS,
        }],
        learning_objectives: vec!["Integrate the skills from this roadmap in one project".to_string()],
        practice_tasks: vec![
            "Publish the project with a README".to_string(),
            "Prepare to walk through the project in an interview".to_string(),
        ],
        checkpoint: "Demo the project and check it against the job requirements".to_string(),
        focus_skills: covered,
    }
}
