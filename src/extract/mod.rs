//! Extraction boundary — LLM client trait, response parsing, and candidate
//! validation
//!
//! Everything upstream of the consolidation core lives here. Raw LLM output
//! is loosely typed; nothing past this module sees an unvalidated record.

mod candidate;
mod llm;

pub use candidate::{dedupe_candidates, Candidate, CandidateValidator};
pub use llm::{
    parse_concepts_response, ConceptExtractor, ExtractError, MockExtractor, SidecarExtractor,
};
