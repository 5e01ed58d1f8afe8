//! LLM extraction boundary
//!
//! The consolidation engine treats concept extraction as a black box: an
//! extractor receives a paper and returns raw candidate records, or fails.
//! Two implementations ship with the crate:
//! - `SidecarExtractor`: reads pre-extracted JSON written next to the PDF
//! - `MockExtractor`: preconfigured responses (testing)

use crate::model::Paper;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Errors from extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extractor unavailable: {0}")]
    Unavailable(String),

    #[error("extraction failed: {0}")]
    Failed(String),

    #[error("source file not found: {0}")]
    SourceMissing(String),

    #[error("response parse error: {0}")]
    Parse(String),
}

/// The extraction contract.
///
/// Abstracts over transport (API call, subprocess, sidecar file, mock) so
/// the consolidation engine never depends on how candidates are produced.
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    /// Extract raw candidate records for one paper.
    ///
    /// Records are returned in extraction order; the engine preserves that
    /// order through storage.
    async fn extract(&self, paper: &Paper, pdf_path: &Path) -> Result<Vec<Value>, ExtractError>;
}

/// Extractor that reads candidate records from a JSON sidecar file
/// (`<paper>.pdf.json`) next to the source PDF.
///
/// Keeps the pipeline runnable without network access: an upstream step
/// (or a person) drops the LLM response beside the PDF and `analyze` picks
/// it up.
pub struct SidecarExtractor;

#[async_trait]
impl ConceptExtractor for SidecarExtractor {
    async fn extract(&self, paper: &Paper, pdf_path: &Path) -> Result<Vec<Value>, ExtractError> {
        let sidecar = pdf_path.with_extension("pdf.json");
        if !sidecar.exists() {
            return Err(ExtractError::SourceMissing(sidecar.display().to_string()));
        }

        debug!(paper = %paper, sidecar = %sidecar.display(), "reading extraction sidecar");
        let text = tokio::fs::read_to_string(&sidecar)
            .await
            .map_err(|e| ExtractError::Failed(format!("cannot read sidecar: {}", e)))?;

        parse_concepts_response(&text)
    }
}

/// Mock extractor for testing — preconfigured responses keyed by filename.
pub struct MockExtractor {
    responses: HashMap<String, Result<Vec<Value>, ExtractError>>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    /// Register candidate records for a specific paper filename.
    pub fn with_response(mut self, filename: impl Into<String>, records: Vec<Value>) -> Self {
        self.responses.insert(filename.into(), Ok(records));
        self
    }

    /// Register a failure for a specific paper filename.
    pub fn with_failure(mut self, filename: impl Into<String>, error: ExtractError) -> Self {
        self.responses.insert(filename.into(), Err(error));
        self
    }
}

#[async_trait]
impl ConceptExtractor for MockExtractor {
    async fn extract(&self, paper: &Paper, _pdf_path: &Path) -> Result<Vec<Value>, ExtractError> {
        match self.responses.get(&paper.filename) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(e)) => Err(ExtractError::Failed(format!(
                "mock failure for '{}': {}",
                paper.filename, e
            ))),
            None => Err(ExtractError::Failed(format!(
                "no mock response for '{}'",
                paper.filename
            ))),
        }
    }
}

/// Parse an LLM text reply into candidate records.
///
/// Accepts, in order of preference:
/// - a JSON object with a `concepts` array (fenced or bare)
/// - a bare JSON array of records
/// - a bare `"concepts": [...]` fragment, recovered by brace-wrapping
pub fn parse_concepts_response(text: &str) -> Result<Vec<Value>, ExtractError> {
    let body = strip_code_fences(text);

    let parsed: Value = match serde_json::from_str(body.trim()) {
        Ok(value) => value,
        Err(e) => {
            // Models sometimes emit the object body without its braces.
            if body.contains("\"concepts\"") && !body.trim_start().starts_with('{') {
                warn!("recovering concepts payload by brace-wrapping");
                serde_json::from_str(&format!("{{{}}}", body.trim()))
                    .map_err(|e| ExtractError::Parse(e.to_string()))?
            } else {
                return Err(ExtractError::Parse(e.to_string()));
            }
        }
    };

    match parsed {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("concepts") {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(ExtractError::Parse(
                "'concepts' is not an array".to_string(),
            )),
            None => Err(ExtractError::Parse(
                "response has no 'concepts' array".to_string(),
            )),
        },
        _ => Err(ExtractError::Parse(
            "response is neither an object nor an array".to_string(),
        )),
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line (e.g. ```json)
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
