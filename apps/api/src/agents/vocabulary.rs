//! Keyword tables and term matching shared by the heuristic fallbacks and
//! resume intake.
//!
//! Matching is case-insensitive and respects term boundaries, so "Java" is not
//! found inside "JavaScript" and "SQL" is not found inside "PostgreSQL".

/// A canonical skill name and the lowercase spellings that denote it.
pub struct Term {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

const fn term(name: &'static str, aliases: &'static [&'static str]) -> Term {
    Term { name, aliases }
}

/// Technical skills recognised in job descriptions and resumes.
pub const TECH_SKILLS: &[Term] = &[
    term("SQL", &["sql"]),
    term("Python", &["python"]),
    term("Tableau", &["tableau"]),
    term("Excel", &["excel", "spreadsheets"]),
    term("Power BI", &["power bi", "powerbi"]),
    term("Statistics", &["statistics", "statistical"]),
    term("Data Analysis", &["data analysis", "data analytics"]),
    term("Data Visualization", &["data visualization", "data visualisation"]),
    term("Machine Learning", &["machine learning", "ml"]),
    term("Pandas", &["pandas"]),
    term("NumPy", &["numpy"]),
    term("JavaScript", &["javascript"]),
    term("TypeScript", &["typescript"]),
    term("Java", &["java"]),
    term("C++", &["c++"]),
    term("C#", &["c#"]),
    term("Rust", &["rust"]),
    term("Kotlin", &["kotlin"]),
    term("Swift", &["swift"]),
    term("HTML", &["html"]),
    term("CSS", &["css"]),
    term("React", &["react"]),
    term("Angular", &["angular"]),
    term("Vue", &["vue"]),
    term("Node.js", &["node.js", "nodejs"]),
    term("Django", &["django"]),
    term("Flask", &["flask"]),
    term("Spring", &["spring boot", "spring"]),
    term("REST APIs", &["rest api", "rest apis", "restful"]),
    term("PostgreSQL", &["postgresql", "postgres"]),
    term("MySQL", &["mysql"]),
    term("MongoDB", &["mongodb", "mongo"]),
    term("AWS", &["aws", "amazon web services"]),
    term("Azure", &["azure"]),
    term("GCP", &["gcp", "google cloud"]),
    term("Docker", &["docker"]),
    term("Kubernetes", &["kubernetes", "k8s"]),
    term("Git", &["git", "github"]),
    term("Linux", &["linux"]),
];

pub const SOFT_SKILLS: &[Term] = &[
    term("Communication", &["communication", "communicate"]),
    term("Problem-solving", &["problem-solving", "problem solving"]),
    term("Teamwork", &["teamwork", "collaboration", "collaborate"]),
    term("Leadership", &["leadership"]),
    term("Attention to Detail", &["attention to detail", "detail-oriented"]),
    term("Time Management", &["time management"]),
    term("Stakeholder Management", &["stakeholder"]),
];

pub const DEFAULT_SOFT_SKILLS: &[&str] = &["Communication", "Problem-solving"];

/// Role titles, most specific first so "Senior Data Analyst" is not read as
/// a generic "Analyst".
pub const ROLE_TITLES: &[&str] = &[
    "Business Intelligence Analyst",
    "Machine Learning Engineer",
    "Full Stack Developer",
    "Frontend Developer",
    "Backend Developer",
    "Software Engineer",
    "Software Developer",
    "DevOps Engineer",
    "Cloud Engineer",
    "Data Scientist",
    "Data Engineer",
    "Data Analyst",
    "Business Analyst",
    "Product Manager",
    "QA Engineer",
    "Web Developer",
];

pub const DEFAULT_ROLE: &str = "Software Developer";

/// Markers after which listed skills are treated as optional.
pub const PREFERENCE_MARKERS: &[&str] = &[
    "preferred",
    "nice to have",
    "nice-to-have",
    "bonus",
    "a plus",
    "desirable",
];

pub const ENTRY_MARKERS: &[&str] = &["entry", "entry-level", "junior", "intern", "internship", "graduate"];
pub const SENIOR_MARKERS: &[&str] = &["senior", "lead", "principal", "architect", "staff"];

/// Skill buckets of a normalized profile, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillBucket {
    ProgrammingLanguages,
    Frameworks,
    Databases,
    SoftSkills,
    DomainKnowledge,
    Tools,
}

impl SkillBucket {
    pub fn category(&self) -> &'static str {
        match self {
            SkillBucket::ProgrammingLanguages => "programming_language",
            SkillBucket::Frameworks => "framework",
            SkillBucket::Databases => "database",
            SkillBucket::SoftSkills => "soft_skill",
            SkillBucket::DomainKnowledge => "domain_knowledge",
            SkillBucket::Tools => "tool",
        }
    }
}

const BUCKET_KEYWORDS: &[(SkillBucket, &[&str])] = &[
    (
        SkillBucket::ProgrammingLanguages,
        &[
            "python", "java", "javascript", "typescript", "c++", "c#", "golang", "go", "rust",
            "ruby", "php", "swift", "kotlin", "scala", "r",
        ],
    ),
    (
        SkillBucket::Frameworks,
        &[
            "react", "angular", "vue", "django", "flask", "spring", "express", "node", "node.js",
            "fastapi", "pandas", "numpy", "tensorflow", "pytorch", "next.js",
        ],
    ),
    (
        SkillBucket::Databases,
        &[
            "sql", "mysql", "postgresql", "postgres", "mongodb", "redis", "oracle", "sqlite",
            "database", "databases",
        ],
    ),
    (
        SkillBucket::SoftSkills,
        &[
            "communication", "teamwork", "leadership", "problem-solving", "problem solving",
            "collaboration", "presentation", "time management", "stakeholder",
        ],
    ),
    (
        SkillBucket::DomainKnowledge,
        &[
            "machine learning", "data analysis", "statistics", "web development",
            "data visualization", "analytics", "finance", "marketing", "deep learning",
        ],
    ),
    (
        SkillBucket::Tools,
        &[
            "git", "docker", "kubernetes", "aws", "azure", "gcp", "jenkins", "ci/cd", "excel",
            "tableau", "power bi", "jira", "linux",
        ],
    ),
];

/// Bucket for a single skill name. Unrecognised skills land in `Tools`.
pub fn classify_skill(skill: &str) -> SkillBucket {
    let lower = skill.to_lowercase();
    BUCKET_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_term(&lower, k)))
        .map(|(bucket, _)| *bucket)
        .unwrap_or(SkillBucket::Tools)
}

/// Byte offset of the first boundary-respecting occurrence of `term` in
/// `haystack`. Both arguments must already be lowercase.
pub fn find_term(haystack: &str, term: &str) -> Option<usize> {
    if term.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(found) = haystack[from..].find(term) {
        let start = from + found;
        let end = start + term.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

pub fn contains_term(haystack: &str, term: &str) -> bool {
    find_term(haystack, term).is_some()
}

/// Earliest position at which any alias of `term` occurs.
pub fn first_occurrence(haystack: &str, term: &Term) -> Option<usize> {
    term.aliases
        .iter()
        .filter_map(|alias| find_term(haystack, alias))
        .min()
}

/// Terms found in `text`, ordered by first occurrence, with their positions.
pub fn scan<'a>(text: &str, terms: &'a [Term]) -> Vec<(usize, &'a str)> {
    let lower = text.to_lowercase();
    let mut found: Vec<(usize, &str)> = terms
        .iter()
        .filter_map(|t| first_occurrence(&lower, t).map(|pos| (pos, t.name)))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);
    found
}

/// Case-insensitive de-duplication that keeps the first spelling seen.
pub fn dedup_case_insensitive<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::BTreeSet::new();
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_term_respects_boundaries() {
        assert_eq!(find_term("we use javascript", "java"), None);
        assert_eq!(find_term("java and javascript", "java"), Some(0));
        assert_eq!(find_term("postgresql or sql", "sql"), Some(14));
        assert_eq!(find_term("c++ developer", "c++"), Some(0));
        assert!(!contains_term("mongodb", "go"));
    }

    #[test]
    fn test_find_term_handles_multibyte_text() {
        assert_eq!(find_term("café sql", "sql"), Some(6));
        assert_eq!(find_term("naïve", "sql"), None);
    }

    #[test]
    fn test_scan_orders_by_first_occurrence() {
        let found = scan("Tableau, then SQL and Python", TECH_SKILLS);
        let names: Vec<&str> = found.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["Tableau", "SQL", "Python"]);
    }

    #[test]
    fn test_classify_skill_buckets() {
        assert_eq!(classify_skill("python"), SkillBucket::ProgrammingLanguages);
        assert_eq!(classify_skill("excel"), SkillBucket::Tools);
        assert_eq!(classify_skill("React Native"), SkillBucket::Frameworks);
        assert_eq!(classify_skill("PostgreSQL"), SkillBucket::Databases);
        assert_eq!(classify_skill("Public Speaking"), SkillBucket::Tools);
        assert_eq!(classify_skill("Communication"), SkillBucket::SoftSkills);
        assert_eq!(classify_skill("Machine Learning"), SkillBucket::DomainKnowledge);
    }

    #[test]
    fn test_dedup_keeps_first_spelling() {
        let skills = dedup_case_insensitive(["Python", "python ", "SQL", ""]);
        assert_eq!(skills, vec!["Python", "SQL"]);
    }
}
