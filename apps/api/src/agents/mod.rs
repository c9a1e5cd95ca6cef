//! The six mentor agents. Each is an `ExtractionTask`: a schema, a prompt
//! template and a deterministic fallback.

pub mod handlers;
pub mod jd_parser;
pub mod practice;
pub mod profile_analyzer;
pub mod prompts;
pub mod reflection;
pub mod roadmap;
pub mod skill_gap;
pub mod vocabulary;
