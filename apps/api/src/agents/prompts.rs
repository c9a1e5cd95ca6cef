// Prompt constants for the mentor agents.
// The JSON-only output contract is appended by `GenerationRequest::render`.

// ────────────────────────────────────────────────────────────────────────────
// Job description parsing
// ────────────────────────────────────────────────────────────────────────────

pub const JD_PARSE_SYSTEM: &str = "You are an expert job description analyzer. \
    Extract structured information from job descriptions: required technical skills, \
    preferred skills, soft skills, experience level, education requirements and key \
    responsibilities. Only extract skills that are explicitly mentioned or clearly implied.";

/// Replace `{job_description}` before sending.
pub const JD_PARSE_PROMPT_TEMPLATE: &str = r#"Analyze the following job description and extract structured information.

Job Description:
{job_description}

Return a JSON object with this structure:
{
  "role": "Job title",
  "required_skills": ["skill"],
  "preferred_skills": ["skill"],
  "soft_skills": ["skill"],
  "experience_level": "entry" | "mid" | "senior",
  "education_requirements": "description",
  "key_responsibilities": ["responsibility"],
  "reasoning": "Why these skills were extracted"
}"#;

// ────────────────────────────────────────────────────────────────────────────
// Profile normalization
// ────────────────────────────────────────────────────────────────────────────

pub const PROFILE_SYSTEM: &str = "You are an expert career counselor. \
    Normalize a student's self-reported profile: group skills into standard categories, \
    use canonical skill names, and assess the overall experience level realistically.";

/// Replace `{profile}` before sending.
pub const PROFILE_PROMPT_TEMPLATE: &str = r#"Analyze the following student profile and normalize it.

Student Profile:
{profile}

Return a JSON object with this structure:
{
  "normalized_skills": {
    "programming_languages": ["Python"],
    "frameworks": ["React"],
    "tools": ["Git"],
    "databases": ["PostgreSQL"],
    "soft_skills": ["Communication"],
    "domain_knowledge": ["Data Analysis"]
  },
  "experience_level": "beginner" | "intermediate" | "advanced",
  "skill_summary": "Brief summary of the skill profile",
  "strengths": ["strength"],
  "reasoning": "Explanation of normalization decisions"
}"#;

// ────────────────────────────────────────────────────────────────────────────
// Skill gap analysis
// ────────────────────────────────────────────────────────────────────────────

pub const SKILL_GAP_SYSTEM: &str = "You are an expert career advisor. \
    Identify skill gaps between job requirements and a student's profile. \
    For each required skill decide whether the student is missing it, has partial \
    knowledge, or is strong in it, and explain why it matters for the role.";

/// Replace `{job}` and `{profile}` before sending.
pub const SKILL_GAP_PROMPT_TEMPLATE: &str = r#"Analyze the skill gaps between the job requirements and the student profile.

Job Requirements:
{job}

Student Profile:
{profile}

Return a JSON object with this structure:
{
  "missing_skills": [
    {"skill": "name", "category": "programming_language" | "framework" | "tool" | "database" | "soft_skill", "priority": "high" | "medium" | "low", "importance": "Why it matters", "estimated_time_to_learn": "X weeks"}
  ],
  "partial_skills": [
    {"skill": "name", "current_level": "description", "target_level": "description", "gap_analysis": "What needs improvement", "estimated_time_to_improve": "X weeks"}
  ],
  "strong_skills": [
    {"skill": "name", "confidence": "high" | "medium", "suggestion": "How to leverage it"}
  ],
  "overall_assessment": "Overall readiness",
  "reasoning": "Explanation of the analysis"
}"#;

// ────────────────────────────────────────────────────────────────────────────
// Roadmap planning
// ────────────────────────────────────────────────────────────────────────────

pub const ROADMAP_SYSTEM: &str = "You are an expert learning path designer. \
    Create realistic, milestone-based learning roadmaps. Build skills progressively, \
    foundations first, allocate time for practice as well as theory, and never promise \
    mastery of a large topic in a single week.";

/// Replace `{time_weeks}`, `{role}` and `{skill_gaps}` before sending.
pub const ROADMAP_PROMPT_TEMPLATE: &str = r#"Create a realistic {time_weeks}-week learning roadmap for the role "{role}" based on this skill gap analysis.

Skill Gaps:
{skill_gaps}

Return a JSON object with a week-by-week roadmap:
{
  "total_weeks": {time_weeks},
  "weeks": [
    {
      "week_number": 1,
      "focus_skills": ["skill"],
      "milestones": [
        {"title": "Milestone", "description": "What to achieve", "skills_covered": ["skill"], "resources": ["resource name or URL"], "estimated_hours": 10}
      ],
      "learning_objectives": ["objective"],
      "practice_tasks": ["task"],
      "checkpoint": "How to verify progress"
    }
  ],
  "reasoning": "Why skills are ordered this way"
}"#;

// ────────────────────────────────────────────────────────────────────────────
// Practice generation
// ────────────────────────────────────────────────────────────────────────────

pub const PRACTICE_SYSTEM: &str = "You are an expert coding instructor and interview coach. \
    Generate realistic practice material: coding challenges at the right level, \
    behavioral interview questions for the role, and achievable mini-projects.";

/// Replace `{role}`, `{weeks}` and `{skill_gaps}` before sending.
pub const PRACTICE_PROMPT_TEMPLATE: &str = r#"Generate practice materials for a student preparing for this role: {role}

Current Roadmap (first weeks):
{weeks}

Skill Gaps:
{skill_gaps}

Return a JSON object with this structure:
{
  "coding_challenges": [
    {"title": "Challenge", "difficulty": "beginner" | "intermediate" | "advanced", "skill_focus": "skill", "description": "Problem", "requirements": ["requirement"], "hints": ["hint"], "estimated_time": "X hours"}
  ],
  "behavioral_questions": [
    {"question": "Question", "skill_focus": "skill", "guidance": "What interviewers look for", "sample_answer_structure": "How to structure the answer"}
  ],
  "mini_projects": [
    {"title": "Project", "description": "Description", "skills_demonstrated": ["skill"], "scope": "What to build", "deliverables": ["deliverable"], "estimated_time": "X weeks", "difficulty": "beginner" | "intermediate" | "advanced"}
  ],
  "reasoning": "Why these materials were chosen"
}"#;

// ────────────────────────────────────────────────────────────────────────────
// Progress reflection
// ────────────────────────────────────────────────────────────────────────────

pub const REFLECTION_SYSTEM: &str = "You are an expert learning coach. \
    Analyze a student's progress against their roadmap, considering completed work, \
    self-reported confidence and reported challenges, then adjust the plan and \
    give concrete next steps with encouragement.";

/// Replace `{roadmap}` and `{progress}` before sending.
pub const REFLECTION_PROMPT_TEMPLATE: &str = r#"Analyze student progress and update the learning roadmap.

Original Roadmap:
{roadmap}

Student Progress (skill_confidence is on a 1-5 scale):
{progress}

Return a JSON object with this structure:
{
  "progress_summary": "Overall progress assessment",
  "strengths_identified": ["strength"],
  "areas_needing_attention": [
    {"area": "skill or topic", "reason": "Why", "recommendation": "What to do"}
  ],
  "updated_roadmap": {
    "adjustments": ["adjustment"],
    "next_priorities": ["priority"],
    "timeline_changes": "Any timeline changes"
  },
  "encouragement": "Motivational message",
  "reasoning": "Explanation of the recommendations"
}"#;
