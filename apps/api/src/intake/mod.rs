//! Resume intake: PDF bytes to plain text to a `ProfileInput`.
//!
//! Text is split into sections by well-known headers. Skills come from the
//! skills section when one exists, otherwise from a vocabulary scan of the
//! whole document.

use thiserror::Error;
use tracing::debug;

use crate::agents::jd_parser::strip_bullet;
use crate::agents::profile_analyzer::ProfileInput;
use crate::agents::vocabulary::{contains_term, dedup_case_insensitive, scan, TECH_SKILLS};
use crate::errors::AppError;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
const MAX_SKILL_CHARS: usize = 50;
const MAX_PROJECTS: usize = 10;

const SKILL_SEPARATORS: &[char] = &[',', '|', ';', '•'];
const DEGREE_MARKERS: &[&str] = &[
    "bachelor", "master", "b.s.", "b.sc", "b.tech", "b.e.", "m.s.", "m.sc", "m.tech", "mba", "phd",
    "degree", "diploma",
];

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Resume exceeds the {} MiB limit", MAX_RESUME_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Unsupported file type: {0} (only PDF is accepted)")]
    Unsupported(String),

    #[error("Could not read text from PDF: {0}")]
    Unreadable(String),

    #[error("No text could be extracted from the resume")]
    Empty,
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        AppError::UnprocessableEntity(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Skills,
    Certifications,
    Projects,
    Education,
    Other,
}

const HEADERS: &[(&str, Section)] = &[
    ("skills", Section::Skills),
    ("technical skills", Section::Skills),
    ("core skills", Section::Skills),
    ("key skills", Section::Skills),
    ("skills & tools", Section::Skills),
    ("skills and tools", Section::Skills),
    ("technologies", Section::Skills),
    ("certifications", Section::Certifications),
    ("certificates", Section::Certifications),
    ("licenses & certifications", Section::Certifications),
    ("projects", Section::Projects),
    ("personal projects", Section::Projects),
    ("academic projects", Section::Projects),
    ("education", Section::Education),
    ("academic background", Section::Education),
    ("experience", Section::Other),
    ("work experience", Section::Other),
    ("professional experience", Section::Other),
    ("employment", Section::Other),
    ("summary", Section::Other),
    ("professional summary", Section::Other),
    ("objective", Section::Other),
    ("contact", Section::Other),
    ("awards", Section::Other),
    ("achievements", Section::Other),
    ("interests", Section::Other),
];

/// Extracts text from an uploaded PDF.
pub fn extract_pdf_text(filename: &str, bytes: &[u8]) -> Result<String, IntakeError> {
    if bytes.len() > MAX_RESUME_BYTES {
        return Err(IntakeError::TooLarge);
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(IntakeError::Unsupported(filename.to_string()));
    }

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| IntakeError::Unreadable(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(IntakeError::Empty);
    }
    debug!(chars = text.len(), "Extracted resume text");
    Ok(text)
}

/// Builds a profile from resume text.
pub fn profile_from_text(text: &str) -> ProfileInput {
    let mut section = Section::Preamble;
    let mut skills_section_found = false;
    let mut skill_lines = Vec::new();
    let mut certifications = Vec::new();
    let mut projects = Vec::new();
    let mut education = Vec::new();

    for line in clean_lines(text) {
        let (header, rest) = match detect_header(line) {
            Some((found, rest)) => (Some(found), rest),
            None => (None, line),
        };
        if let Some(found) = header {
            section = found;
            skills_section_found |= found == Section::Skills;
        }
        if rest.is_empty() {
            continue;
        }
        match section {
            Section::Skills => skill_lines.push(rest),
            Section::Certifications => certifications.push(rest.to_string()),
            Section::Projects => projects.push(rest.to_string()),
            Section::Education => education.push(rest),
            Section::Preamble | Section::Other => {}
        }
    }

    let mut skills = split_skills(&skill_lines);
    if !skills_section_found || skills.is_empty() {
        skills = scan(text, TECH_SKILLS)
            .into_iter()
            .map(|(_, name)| name.to_string())
            .collect();
    }

    let degree = education
        .iter()
        .find(|l| has_degree_marker(l))
        .or_else(|| education.first())
        .map(|l| l.to_string())
        .or_else(|| {
            clean_lines(text)
                .find(|l| has_degree_marker(l))
                .map(str::to_string)
        });

    projects.truncate(MAX_PROJECTS);

    ProfileInput {
        degree,
        skills,
        experience_level: None,
        projects,
        certifications: dedup_case_insensitive(certifications),
    }
}

/// Trimmed, non-empty lines with bullets removed and page numbers dropped.
fn clean_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_page_number(l))
        .map(strip_bullet)
        .filter(|l| !l.is_empty())
}

fn is_page_number(line: &str) -> bool {
    let lower = line.to_lowercase();
    let rest = lower.strip_prefix("page").map_or(lower.as_str(), str::trim);
    let number = rest.split(" of ").next().unwrap_or(rest).trim();
    !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) && rest.len() <= 12
}

/// Recognises `Skills`, `SKILLS:` and `Skills: Python, SQL`, returning the
/// section and any content after the colon.
fn detect_header(line: &str) -> Option<(Section, &str)> {
    let (label, rest) = match line.split_once(':') {
        Some((label, rest)) => (label, rest.trim()),
        None => (line, ""),
    };
    let label = label.trim().to_lowercase();
    HEADERS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, section)| (*section, rest))
}

fn split_skills(lines: &[&str]) -> Vec<String> {
    let items = lines.iter().copied().flat_map(|line| {
        // "Languages: Python, Java" keeps only the items
        let items = line.split_once(':').map_or(line, |(_, rest)| rest);
        items.split(SKILL_SEPARATORS)
    });
    dedup_case_insensitive(
        items
            .map(str::trim)
            .filter(|s| s.chars().count() <= MAX_SKILL_CHARS),
    )
}

fn has_degree_marker(line: &str) -> bool {
    let lower = line.to_lowercase();
    DEGREE_MARKERS.iter().any(|m| contains_term(&lower, m))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jordan Lee
jordan@example.com

SUMMARY
Aspiring analyst with a passion for data.

Technical Skills
Languages: Python, SQL
Tools: Excel | Tableau; Power BI
• Git • Docker

EDUCATION
State University
Bachelor of Science in Statistics, 2023

Projects
- Sales dashboard in Tableau
- Churn model with pandas

Certifications:
Google Data Analytics Certificate
google data analytics certificate

Page 1 of 2
";

    #[test]
    fn test_skills_section_is_split_on_separators() {
        let profile = profile_from_text(RESUME);
        assert_eq!(
            profile.skills,
            vec!["Python", "SQL", "Excel", "Tableau", "Power BI", "Git", "Docker"]
        );
    }

    #[test]
    fn test_sections_populate_profile() {
        let profile = profile_from_text(RESUME);

        assert_eq!(
            profile.degree.as_deref(),
            Some("Bachelor of Science in Statistics, 2023")
        );
        assert_eq!(
            profile.projects,
            vec!["Sales dashboard in Tableau", "Churn model with pandas"]
        );
        assert_eq!(profile.certifications, vec!["Google Data Analytics Certificate"]);
        assert_eq!(profile.experience_level, None);
    }

    #[test]
    fn test_without_skills_section_scans_vocabulary() {
        let text = "Experience\nBuilt REST APIs in Java with PostgreSQL.\nDeployed with Docker.";
        let profile = profile_from_text(text);

        assert_eq!(profile.skills, vec!["REST APIs", "Java", "PostgreSQL", "Docker"]);
        assert!(profile.degree.is_none());
    }

    #[test]
    fn test_inline_skills_header() {
        let profile = profile_from_text("Skills: Rust, Go, Kubernetes\nExperience\nSomething");
        assert_eq!(profile.skills, vec!["Rust", "Go", "Kubernetes"]);
    }

    #[test]
    fn test_degree_found_outside_education_section() {
        let profile = profile_from_text("Jordan\nMaster of Science, Data Science\nSkills: SQL");
        assert_eq!(profile.degree.as_deref(), Some("Master of Science, Data Science"));
    }

    #[test]
    fn test_page_numbers_are_dropped() {
        assert!(is_page_number("3"));
        assert!(is_page_number("Page 2 of 4"));
        assert!(!is_page_number("2023 graduate"));
        assert!(!is_page_number("Page layout design"));
    }

    #[test]
    fn test_non_pdf_is_rejected() {
        let err = extract_pdf_text("resume.docx", b"PK\x03\x04 not a pdf").unwrap_err();
        assert!(matches!(err, IntakeError::Unsupported(name) if name == "resume.docx"));
    }

    #[test]
    fn test_oversized_upload_is_rejected() {
        let mut bytes = b"%PDF-1.4".to_vec();
        bytes.resize(MAX_RESUME_BYTES + 1, b' ');
        assert!(matches!(
            extract_pdf_text("big.pdf", &bytes),
            Err(IntakeError::TooLarge)
        ));
    }

    #[test]
    fn test_intake_errors_are_unprocessable() {
        let err: AppError = IntakeError::Empty.into();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }
}
