use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::agents::jd_parser::{JdParser, JobRequirements};
use crate::agents::practice::{PracticeBundle, PracticeGenerator, PracticeInput};
use crate::agents::profile_analyzer::{NormalizedProfile, ProfileAnalyzer, ProfileInput};
use crate::agents::reflection::{ProgressReflection, ProgressReflector, ReflectionInput};
use crate::agents::roadmap::{Roadmap, RoadmapInput, RoadmapPlanner, MAX_WEEKS};
use crate::agents::skill_gap::{SkillGapAnalyzer, SkillGapInput, SkillGapReport};
use crate::db::{self, AnalysisCount, AnalysisRow};
use crate::errors::AppError;
use crate::extraction::{ExtractionOutcome, ExtractionTask, Provenance};
use crate::intake;
use crate::state::AppState;

/// Envelope shared by every analysis endpoint. A fallback result is still a
/// success at the HTTP level, reported as `partial_success`.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse<T> {
    pub analysis_id: Uuid,
    pub data: T,
    pub provenance: Provenance,
    pub status: &'static str,
    pub message: String,
}

impl<T> AnalysisResponse<T> {
    fn new(analysis_id: Uuid, label: &str, outcome: ExtractionOutcome<T>) -> Self {
        let (status, message) = match outcome.provenance {
            Provenance::Generated => ("success", format!("{label} completed")),
            Provenance::Fallback => (
                "partial_success",
                format!("{label} completed (using fallback - AI service unavailable)"),
            ),
        };
        Self {
            analysis_id,
            data: outcome.value,
            provenance: outcome.provenance,
            status,
            message,
        }
    }
}

/// Runs one extraction and records it.
async fn analyze<T>(
    state: &AppState,
    task: &T,
    input: &T::Input,
    label: &str,
) -> Result<AnalysisResponse<T::Output>, AppError>
where
    T: ExtractionTask,
    T::Input: Serialize,
{
    let outcome = state.pipeline.extract(task, input).await;

    let input_json = serde_json::to_value(input).map_err(anyhow::Error::from)?;
    let output_json = serde_json::to_value(&outcome.value).map_err(anyhow::Error::from)?;
    let id = db::record_analysis(
        &state.db,
        task.kind(),
        outcome.provenance,
        &input_json,
        &output_json,
    )
    .await?;

    info!(
        task = task.kind(),
        provenance = outcome.provenance.as_str(),
        analysis_id = %id,
        "Analysis recorded"
    );
    Ok(AnalysisResponse::new(id, label, outcome))
}

// ────────────────────────────────────────────────────────────────────────────
// Input validation
// ────────────────────────────────────────────────────────────────────────────

fn validate_job_description(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_profile(profile: &ProfileInput) -> Result<(), AppError> {
    let has_skills = profile.skills.iter().any(|s| !s.trim().is_empty());
    let has_degree = profile
        .degree
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty());
    if !has_skills && !has_degree {
        return Err(AppError::Validation(
            "Profile must include at least skills or degree".to_string(),
        ));
    }
    Ok(())
}

fn validate_roadmap(input: &RoadmapInput) -> Result<(), AppError> {
    if !(1..=MAX_WEEKS).contains(&input.time_weeks) {
        return Err(AppError::Validation(format!(
            "time_weeks must be between 1 and {MAX_WEEKS}"
        )));
    }
    Ok(())
}

fn validate_progress(input: &ReflectionInput) -> Result<(), AppError> {
    let last_week = input.original_roadmap.total_weeks.saturating_add(MAX_WEEKS);
    if !(1..=last_week).contains(&input.progress.current_week) {
        return Err(AppError::Validation(format!(
            "current_week must be between 1 and {last_week}"
        )));
    }
    let invalid = input.progress.out_of_range_confidence();
    if !invalid.is_empty() {
        return Err(AppError::Validation(format!(
            "skill_confidence must be between 1 and 5 (invalid: {})",
            invalid.join(", ")
        )));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct JobDescriptionRequest {
    pub job_description: String,
}

/// POST /api/v1/analyze-jd
pub async fn handle_analyze_jd(
    State(state): State<AppState>,
    Json(req): Json<JobDescriptionRequest>,
) -> Result<Json<AnalysisResponse<JobRequirements>>, AppError> {
    validate_job_description(&req.job_description)?;
    let response = analyze(&state, &JdParser, &req.job_description, "JD analysis").await?;
    Ok(Json(response))
}

/// POST /api/v1/analyze-profile
pub async fn handle_analyze_profile(
    State(state): State<AppState>,
    Json(profile): Json<ProfileInput>,
) -> Result<Json<AnalysisResponse<NormalizedProfile>>, AppError> {
    validate_profile(&profile)?;
    let response = analyze(&state, &ProfileAnalyzer, &profile, "Profile analysis").await?;
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct ResumeResponse {
    pub extracted_profile: ProfileInput,
    pub analysis: AnalysisResponse<NormalizedProfile>,
}

/// POST /api/v1/profile/resume
///
/// Multipart upload with a PDF in the `file` field.
pub async fn handle_resume_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("resume").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let text = intake::extract_pdf_text(&filename, &bytes)?;
    let profile = intake::profile_from_text(&text);
    if validate_profile(&profile).is_err() {
        return Err(AppError::UnprocessableEntity(format!(
            "No skills or education found in {filename}"
        )));
    }

    let analysis = analyze(&state, &ProfileAnalyzer, &profile, "Resume analysis").await?;
    Ok(Json(ResumeResponse {
        extracted_profile: profile,
        analysis,
    }))
}

/// POST /api/v1/skill-gap
pub async fn handle_skill_gap(
    State(state): State<AppState>,
    Json(input): Json<SkillGapInput>,
) -> Result<Json<AnalysisResponse<SkillGapReport>>, AppError> {
    let response = analyze(&state, &SkillGapAnalyzer, &input, "Skill gap analysis").await?;
    Ok(Json(response))
}

/// POST /api/v1/roadmap
pub async fn handle_roadmap(
    State(state): State<AppState>,
    Json(input): Json<RoadmapInput>,
) -> Result<Json<AnalysisResponse<Roadmap>>, AppError> {
    validate_roadmap(&input)?;
    let response = analyze(&state, &RoadmapPlanner, &input, "Roadmap generation").await?;
    Ok(Json(response))
}

/// POST /api/v1/practice
pub async fn handle_practice(
    State(state): State<AppState>,
    Json(input): Json<PracticeInput>,
) -> Result<Json<AnalysisResponse<PracticeBundle>>, AppError> {
    let response = analyze(&state, &PracticeGenerator, &input, "Practice generation").await?;
    Ok(Json(response))
}

/// POST /api/v1/progress
pub async fn handle_progress(
    State(state): State<AppState>,
    Json(input): Json<ReflectionInput>,
) -> Result<Json<AnalysisResponse<ProgressReflection>>, AppError> {
    validate_progress(&input)?;
    let response = analyze(&state, &ProgressReflector, &input, "Progress reflection").await?;
    Ok(Json(response))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisRow>, AppError> {
    let row = db::get_analysis(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))?;
    Ok(Json(row))
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_analyses: i64,
    pub fallback_analyses: i64,
    pub analyses: Vec<AnalysisCount>,
    pub courses: usize,
    pub job_samples: usize,
    pub status: &'static str,
}

impl DashboardSummary {
    fn new(analyses: Vec<AnalysisCount>, courses: usize, job_samples: usize) -> Self {
        let total_analyses = analyses.iter().map(|c| c.count).sum();
        let fallback_analyses = analyses
            .iter()
            .filter(|c| c.provenance == Provenance::Fallback.as_str())
            .map(|c| c.count)
            .sum();
        Self {
            total_analyses,
            fallback_analyses,
            analyses,
            courses,
            job_samples,
            status: "operational",
        }
    }
}

/// GET /api/v1/dashboard-summary
pub async fn handle_dashboard_summary(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, AppError> {
    let counts = db::analysis_counts(&state.db).await?;
    Ok(Json(DashboardSummary::new(
        counts,
        state.corpus.course_count(),
        state.corpus.job_sample_count(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roadmap_input(time_weeks: u32) -> RoadmapInput {
        RoadmapInput {
            skill_gaps: SkillGapReport::default(),
            role: "Data Analyst".to_string(),
            time_weeks,
        }
    }

    #[test]
    fn test_blank_job_description_is_rejected() {
        assert!(matches!(
            validate_job_description("  \n "),
            Err(AppError::Validation(_))
        ));
        assert!(validate_job_description("Data Analyst").is_ok());
    }

    #[test]
    fn test_profile_needs_skills_or_degree() {
        let mut profile = ProfileInput {
            skills: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(validate_profile(&profile).is_err());

        profile.degree = Some("BSc Computer Science".to_string());
        assert!(validate_profile(&profile).is_ok());

        profile.degree = None;
        profile.skills = vec!["SQL".to_string()];
        assert!(validate_profile(&profile).is_ok());
    }

    #[test]
    fn test_time_weeks_bounds() {
        assert!(validate_roadmap(&roadmap_input(0)).is_err());
        assert!(validate_roadmap(&roadmap_input(1)).is_ok());
        assert!(validate_roadmap(&roadmap_input(52)).is_ok());
        assert!(validate_roadmap(&roadmap_input(53)).is_err());
    }

    #[test]
    fn test_roadmap_request_defaults_to_eight_weeks() {
        let input: RoadmapInput = serde_json::from_value(serde_json::json!({
            "skill_gaps": {"missing_skills": [{"skill": "SQL"}]}
        }))
        .unwrap();
        assert_eq!(input.time_weeks, 8);
        assert!(validate_roadmap(&input).is_ok());
    }

    #[test]
    fn test_progress_confidence_must_be_on_scale() {
        let mut input = ReflectionInput {
            original_roadmap: Roadmap {
                total_weeks: 1,
                weeks: vec![],
                reasoning: String::new(),
            },
            progress: Default::default(),
        };
        input.progress.current_week = 1;
        input.progress.skill_confidence.insert("SQL".to_string(), 3.0);
        assert!(validate_progress(&input).is_ok());

        input.progress.skill_confidence.insert("Git".to_string(), 9.0);
        match validate_progress(&input) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Git")),
            other => panic!("expected validation error, got {other:?}"),
        }

        input.progress.current_week = 0;
        assert!(validate_progress(&input).is_err());
    }

    #[test]
    fn test_progress_week_is_bounded_by_roadmap() {
        let mut input: ReflectionInput = serde_json::from_value(serde_json::json!({
            "original_roadmap": {"total_weeks": 8, "weeks": []},
            "progress": {"current_week": 60}
        }))
        .unwrap();
        assert!(validate_progress(&input).is_ok());

        input.progress.current_week = 61;
        match validate_progress(&input) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("between 1 and 60")),
            other => panic!("expected validation error, got {other:?}"),
        }

        input.progress.current_week = u32::MAX;
        assert!(validate_progress(&input).is_err());

        input.original_roadmap.total_weeks = u32::MAX;
        input.progress.current_week = u32::MAX;
        assert!(validate_progress(&input).is_ok());
    }

    #[test]
    fn test_fractional_confidence_is_a_validation_error() {
        let input: ReflectionInput = serde_json::from_value(serde_json::json!({
            "original_roadmap": {"total_weeks": 4, "weeks": []},
            "progress": {"current_week": 2, "skill_confidence": {"SQL": 2.5, "Git": 300}}
        }))
        .unwrap();
        match validate_progress(&input) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Git, SQL")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_envelope_is_partial_success() {
        let id = Uuid::new_v4();
        let response = AnalysisResponse::new(
            id,
            "Roadmap generation",
            ExtractionOutcome {
                value: 1,
                provenance: Provenance::Fallback,
            },
        );
        assert_eq!(response.status, "partial_success");
        assert!(response.message.contains("using fallback"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["provenance"], "fallback");
        assert_eq!(json["analysis_id"], id.to_string());
    }

    #[test]
    fn test_generated_envelope_is_success() {
        let response = AnalysisResponse::new(
            Uuid::new_v4(),
            "JD analysis",
            ExtractionOutcome {
                value: (),
                provenance: Provenance::Generated,
            },
        );
        assert_eq!(response.status, "success");
        assert_eq!(response.message, "JD analysis completed");
    }

    #[test]
    fn test_dashboard_summary_totals() {
        let count = |kind: &str, provenance: &str, count| AnalysisCount {
            kind: kind.to_string(),
            provenance: provenance.to_string(),
            count,
        };
        let summary = DashboardSummary::new(
            vec![
                count("job_requirements", "fallback", 2),
                count("job_requirements", "generated", 5),
                count("roadmap", "fallback", 1),
            ],
            25,
            8,
        );
        assert_eq!(summary.total_analyses, 8);
        assert_eq!(summary.fallback_analyses, 3);
        assert_eq!(summary.courses, 25);
    }
}
