//! Progress Reflector: compares reported progress with the roadmap and
//! adjusts the plan.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{REFLECTION_PROMPT_TEMPLATE, REFLECTION_SYSTEM};
use crate::agents::roadmap::Roadmap;
use crate::agents::vocabulary::dedup_case_insensitive;
use crate::extraction::schema::{Field, FieldType, Schema};
use crate::extraction::ExtractionTask;

/// Confidence is self-reported on a 1-5 scale.
pub const MIN_CONFIDENCE: f64 = 1.0;
pub const MAX_CONFIDENCE: f64 = 5.0;
const STRONG_CONFIDENCE: f64 = 4.0;
const WEAK_CONFIDENCE: f64 = 2.0;

const ATTENTION_AREA: &[Field] = &[
    Field::required("area", FieldType::Text),
    Field::optional("reason", FieldType::Text),
    Field::optional("recommendation", FieldType::Text),
];

const UPDATED_ROADMAP: &[Field] = &[
    Field::optional("adjustments", FieldType::TextList),
    Field::optional("next_priorities", FieldType::TextList),
    Field::optional("timeline_changes", FieldType::Text),
];

pub const PROGRESS_REFLECTION: Schema = Schema {
    name: "ProgressReflection",
    fields: &[
        Field::required("progress_summary", FieldType::Text),
        Field::required("updated_roadmap", FieldType::Object(UPDATED_ROADMAP)),
        Field::optional("strengths_identified", FieldType::TextList),
        Field::optional("areas_needing_attention", FieldType::ObjectList(ATTENTION_AREA)),
        Field::optional("encouragement", FieldType::Text),
        Field::optional("reasoning", FieldType::Text),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionArea {
    pub area: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapUpdate {
    #[serde(default)]
    pub adjustments: Vec<String>,
    #[serde(default)]
    pub next_priorities: Vec<String>,
    #[serde(default)]
    pub timeline_changes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReflection {
    pub progress_summary: String,
    pub updated_roadmap: RoadmapUpdate,
    #[serde(default)]
    pub strengths_identified: Vec<String>,
    #[serde(default)]
    pub areas_needing_attention: Vec<AttentionArea>,
    #[serde(default)]
    pub encouragement: String,
    #[serde(default)]
    pub reasoning: String,
}

fn first_week() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Titles of finished milestones.
    #[serde(default)]
    pub completed_milestones: Vec<String>,
    #[serde(default = "first_week")]
    pub current_week: u32,
    /// Any JSON number is accepted here so that off-scale ratings are
    /// reported by `out_of_range_confidence` rather than by the extractor.
    #[serde(default)]
    pub skill_confidence: BTreeMap<String, f64>,
    #[serde(default)]
    pub completed_practices: Vec<String>,
    #[serde(default)]
    pub challenges_faced: Vec<String>,
}

impl ProgressReport {
    /// Skills whose confidence is not a whole number from 1 to 5.
    pub fn out_of_range_confidence(&self) -> Vec<&str> {
        self.skill_confidence
            .iter()
            .filter(|(_, c)| c.fract() != 0.0 || !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(*c))
            .map(|(skill, _)| skill.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionInput {
    pub original_roadmap: Roadmap,
    pub progress: ProgressReport,
}

pub struct ProgressReflector;

impl ExtractionTask for ProgressReflector {
    type Input = ReflectionInput;
    type Output = ProgressReflection;

    fn kind(&self) -> &'static str {
        "progress_reflection"
    }

    fn schema(&self) -> &'static Schema {
        &PROGRESS_REFLECTION
    }

    fn system_prompt(&self) -> &'static str {
        REFLECTION_SYSTEM
    }

    fn build_prompt(&self, input: &ReflectionInput) -> String {
        REFLECTION_PROMPT_TEMPLATE
            .replace(
                "{roadmap}",
                &serde_json::to_string_pretty(&input.original_roadmap).unwrap_or_default(),
            )
            .replace(
                "{progress}",
                &serde_json::to_string_pretty(&input.progress).unwrap_or_default(),
            )
    }

    fn fallback(&self, input: &ReflectionInput) -> ProgressReflection {
        let roadmap = &input.original_roadmap;
        let progress = &input.progress;
        let week = progress.current_week;

        let done: BTreeSet<String> = progress
            .completed_milestones
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();
        let is_done = |title: &str| done.contains(&title.trim().to_lowercase());

        let total = roadmap.milestone_count();
        let completed = roadmap
            .weeks
            .iter()
            .flat_map(|w| &w.milestones)
            .filter(|m| is_done(&m.title))
            .count();
        let pct = if total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / total as f64
        };

        let overdue: Vec<&str> = roadmap
            .milestones_due_by(week)
            .filter(|m| !is_done(&m.title))
            .map(|m| m.title.as_str())
            .collect();
        let behind = !overdue.is_empty();

        let strengths: Vec<String> = progress
            .skill_confidence
            .iter()
            .filter(|(_, c)| **c >= STRONG_CONFIDENCE)
            .map(|(skill, _)| skill.clone())
            .collect();
        let weak: Vec<(&String, f64)> = progress
            .skill_confidence
            .iter()
            .filter(|(_, c)| **c <= WEAK_CONFIDENCE)
            .map(|(skill, c)| (skill, *c))
            .collect();

        let mut attention: Vec<AttentionArea> = weak
            .iter()
            .map(|(skill, c)| AttentionArea {
                area: skill.to_string(),
                reason: format!("Self-reported confidence is {c}/5"),
                recommendation: format!(
                    "Revisit the fundamentals of {skill} and complete one more practice exercise"
                ),
            })
            .collect();
        attention.extend(
            progress
                .challenges_faced
                .iter()
                .filter(|c| !c.trim().is_empty())
                .map(|challenge| AttentionArea {
                    area: challenge.trim().to_string(),
                    reason: "Reported as a challenge".to_string(),
                    recommendation: "Break it into smaller steps and ask a mentor or study group for help"
                        .to_string(),
                }),
        );

        let upcoming = [week, week.saturating_add(1)]
            .into_iter()
            .filter_map(|n| roadmap.week(n))
            .flat_map(|w| &w.focus_skills);
        let mut next_priorities = dedup_case_insensitive(upcoming);
        if next_priorities.is_empty() {
            next_priorities = weak.iter().map(|(skill, _)| skill.to_string()).collect();
        }
        if next_priorities.is_empty() {
            next_priorities.push("Interview preparation".to_string());
        }

        let mut adjustments = Vec::new();
        if behind {
            adjustments.push(format!(
                "Carry over {} overdue milestone(s) into week {}: {}",
                overdue.len(),
                week.saturating_add(1),
                overdue.join(", ")
            ));
        }
        for (skill, _) in &weak {
            adjustments.push(format!("Add review time for {skill}"));
        }
        if adjustments.is_empty() {
            adjustments.push("Continue with the plan as scheduled".to_string());
        }

        let timeline_changes = if behind {
            format!(
                "Behind schedule by {} milestone(s); consider extending the plan by one week",
                overdue.len()
            )
        } else {
            "No timeline changes needed".to_string()
        };

        let encouragement = if total > 0 && completed == total {
            "You finished every milestone in your roadmap. Great work, keep the momentum going into interviews!"
        } else if behind {
            "Progress is rarely linear. Focus on the next small step and you will catch up."
        } else {
            "You are on track. Keep up the steady work!"
        };

        ProgressReflection {
            progress_summary: format!(
                "Completed {completed} of {total} milestones ({pct:.0}%) by week {week} of {}. {}",
                roadmap.total_weeks,
                if behind { "Behind schedule." } else { "On track." }
            ),
            updated_roadmap: RoadmapUpdate {
                adjustments,
                next_priorities,
                timeline_changes,
            },
            strengths_identified: strengths,
            areas_needing_attention: attention,
            encouragement: encouragement.to_string(),
            reasoning: "Rule-based reflection (AI service unavailable): completion compared with \
                        milestones due by the current week, confidence of 4+ counted as strength \
                        and 2 or less as needing attention."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::extraction::testing::{assert_satisfies, pipeline_for};
    use crate::extraction::Provenance;
    use crate::llm_client::testing::ScriptedBackend;
    use crate::llm_client::FailureKind;

    /// Four learning weeks then a capstone.
    fn roadmap() -> Roadmap {
        let week = |n: u32, skill: &str, title: &str| {
            serde_json::json!({
                "week_number": n,
                "focus_skills": [skill],
                "milestones": [{"title": title}],
            })
        };
        serde_json::from_value(serde_json::json!({
            "total_weeks": 5,
            "weeks": [
                week(1, "SQL", "Learn SQL"),
                week(2, "Tableau", "Learn Tableau"),
                week(3, "Power BI", "Learn Power BI"),
                week(4, "Statistics", "Learn Statistics"),
                week(5, "SQL", "Capstone project"),
            ],
        }))
        .unwrap()
    }

    fn input(completed: &[&str], week: u32, confidence: &[(&str, u8)]) -> ReflectionInput {
        ReflectionInput {
            original_roadmap: roadmap(),
            progress: ProgressReport {
                completed_milestones: completed.iter().map(|s| s.to_string()).collect(),
                current_week: week,
                skill_confidence: confidence
                    .iter()
                    .map(|(s, c)| (s.to_string(), f64::from(*c)))
                    .collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_fallback_detects_behind_schedule() {
        let reflection = ProgressReflector.fallback(&input(
            &["learn sql"],
            3,
            &[("SQL", 4), ("Tableau", 2), ("Python", 5)],
        ));

        assert!(reflection
            .progress_summary
            .starts_with("Completed 1 of 5 milestones (20%) by week 3 of 5."));
        assert!(reflection.progress_summary.ends_with("Behind schedule."));
        assert_eq!(reflection.strengths_identified, vec!["Python", "SQL"]);
        assert_eq!(reflection.areas_needing_attention.len(), 1);
        assert_eq!(reflection.areas_needing_attention[0].area, "Tableau");
        assert_eq!(
            reflection.updated_roadmap.next_priorities,
            vec!["Power BI", "Statistics"]
        );
        assert!(reflection.updated_roadmap.adjustments[0]
            .contains("2 overdue milestone(s) into week 4: Learn Tableau, Learn Power BI"));
        assert!(reflection.updated_roadmap.timeline_changes.starts_with("Behind"));
        assert_satisfies(&reflection, &PROGRESS_REFLECTION);
    }

    #[test]
    fn test_fallback_on_track() {
        let reflection =
            ProgressReflector.fallback(&input(&["Learn SQL", "Learn Tableau"], 2, &[]));

        assert!(reflection.progress_summary.ends_with("On track."));
        assert_eq!(
            reflection.updated_roadmap.adjustments,
            vec!["Continue with the plan as scheduled"]
        );
        assert_eq!(reflection.updated_roadmap.timeline_changes, "No timeline changes needed");
        assert_eq!(
            reflection.updated_roadmap.next_priorities,
            vec!["Tableau", "Power BI"]
        );
    }

    #[test]
    fn test_reported_challenges_need_attention() {
        let mut input = input(&[], 1, &[]);
        input.progress.challenges_faced = vec!["Window functions".to_string(), "  ".to_string()];

        let reflection = ProgressReflector.fallback(&input);

        assert_eq!(reflection.areas_needing_attention.len(), 1);
        assert_eq!(reflection.areas_needing_attention[0].area, "Window functions");
    }

    #[test]
    fn test_past_the_end_prioritizes_weak_skills() {
        let reflection = ProgressReflector.fallback(&input(
            &["Learn SQL", "Learn Tableau", "Learn Power BI", "Learn Statistics", "Capstone project"],
            9,
            &[("Statistics", 1)],
        ));

        assert_eq!(reflection.updated_roadmap.next_priorities, vec!["Statistics"]);
        assert!(reflection.progress_summary.contains("(100%)"));
        assert!(reflection.encouragement.contains("every milestone"));
    }

    #[test]
    fn test_empty_roadmap_yields_zero_ratio() {
        let mut input = input(&[], 1, &[]);
        input.original_roadmap.weeks.clear();

        let reflection = ProgressReflector.fallback(&input);

        assert!(reflection.progress_summary.starts_with("Completed 0 of 0 milestones (0%)"));
        assert_eq!(
            reflection.updated_roadmap.next_priorities,
            vec!["Interview preparation"]
        );
        assert_satisfies(&reflection, &PROGRESS_REFLECTION);
    }

    #[test]
    fn test_out_of_range_confidence() {
        let input = input(&[], 1, &[("SQL", 0), ("Python", 3), ("Git", 6)]);
        assert_eq!(input.progress.out_of_range_confidence(), vec!["Git", "SQL"]);
    }

    #[test]
    fn test_fractional_confidence_is_out_of_range() {
        let mut input = input(&[], 1, &[("Python", 3)]);
        input.progress.skill_confidence.insert("SQL".to_string(), 2.5);
        input.progress.skill_confidence.insert("Git".to_string(), -1.0);
        input.progress.skill_confidence.insert("Excel".to_string(), 300.0);

        assert_eq!(
            input.progress.out_of_range_confidence(),
            vec!["Excel", "Git", "SQL"]
        );
    }

    #[test]
    fn test_off_scale_confidence_deserializes() {
        let progress: ProgressReport = serde_json::from_value(serde_json::json!({
            "skill_confidence": {"SQL": 300, "Git": -1, "Python": 2.5, "Excel": 4}
        }))
        .unwrap();

        assert_eq!(progress.current_week, 1);
        assert_eq!(progress.out_of_range_confidence(), vec!["Git", "Python", "SQL"]);
    }

    #[test]
    fn test_fallback_at_last_representable_week() {
        let mut empty = input(&["Learn SQL"], u32::MAX, &[("Tableau", 1)]);
        empty.original_roadmap.weeks.clear();
        let reflection = ProgressReflector.fallback(&empty);
        assert_eq!(reflection.updated_roadmap.next_priorities, vec!["Tableau"]);

        let behind = ProgressReflector.fallback(&input(&[], u32::MAX, &[]));
        assert!(behind.progress_summary.ends_with("Behind schedule."));
        assert!(behind.updated_roadmap.adjustments[0]
            .contains(&format!("into week {}", u32::MAX)));
        assert_satisfies(&behind, &PROGRESS_REFLECTION);
    }

    #[test]
    fn test_prompt_embeds_roadmap_and_progress() {
        let prompt = ProgressReflector.build_prompt(&input(&["Learn SQL"], 2, &[("SQL", 3)]));
        assert!(prompt.contains("\"Learn Tableau\""));
        assert!(prompt.contains("\"current_week\": 2"));
        assert!(prompt.contains("1-5 scale"));
    }

    #[tokio::test]
    async fn test_generated_reflection() {
        let backend = Arc::new(ScriptedBackend::replying(
            r#"{"progress_summary": "Good start", "updated_roadmap": {"next_priorities": ["Tableau"]},
                "areas_needing_attention": [{"area": "Tableau"}]}"#,
        ));
        let outcome = pipeline_for(backend)
            .extract(&ProgressReflector, &input(&["Learn SQL"], 2, &[]))
            .await;

        assert_eq!(outcome.provenance, Provenance::Generated);
        assert_eq!(outcome.value.updated_roadmap.next_priorities, vec!["Tableau"]);
        assert!(outcome.value.updated_roadmap.adjustments.is_empty());
        assert_eq!(outcome.value.areas_needing_attention[0].reason, "");
    }

    #[tokio::test]
    async fn test_missing_updated_roadmap_falls_back() {
        let backend = Arc::new(ScriptedBackend::replying(r#"{"progress_summary": "Good"}"#));
        let input = input(&["Learn SQL"], 2, &[]);
        let outcome = pipeline_for(backend).extract(&ProgressReflector, &input).await;

        assert_eq!(outcome.provenance, Provenance::Fallback);
        assert_eq!(outcome.value, ProgressReflector.fallback(&input));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let backend = Arc::new(ScriptedBackend::failing(FailureKind::Timeout));
        let outcome = pipeline_for(backend)
            .extract(&ProgressReflector, &input(&[], 1, &[]))
            .await;

        assert!(outcome.is_fallback());
    }
}
