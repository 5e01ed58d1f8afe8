//! Candidate record validation and normalization
//!
//! The extraction step returns loosely structured records with unreliable
//! field types. The validator turns each into a strict [`Candidate`] or
//! rejects it; the deduper then merges same-named candidates within one
//! document before storage.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A validated candidate concept record.
///
/// All fields are normalized: `name` is non-empty and trimmed, `confidence`
/// is within [0.0, 1.0], `related` holds deduplicated non-empty names.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub context: Option<String>,
    pub confidence: f64,
    pub related: Vec<String>,
    pub parent: Option<String>,
}

/// Validates raw extraction records against the candidate contract.
///
/// Pure over its input plus the configured default confidence; rejection is
/// signalled by `None`, never by panicking on malformed data.
#[derive(Debug, Clone)]
pub struct CandidateValidator {
    default_confidence: f64,
}

impl CandidateValidator {
    pub fn new(default_confidence: f64) -> Self {
        Self {
            default_confidence: default_confidence.clamp(0.0, 1.0),
        }
    }

    /// Normalize one raw record.
    ///
    /// Returns `None` when the record has no usable name (absent, not a
    /// string, or empty after trimming).
    pub fn validate(&self, raw: &Value) -> Option<Candidate> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        Some(Candidate {
            name: name.to_string(),
            category: opt_string(raw.get("category")),
            description: opt_string(raw.get("description")),
            context: opt_string(raw.get("context")),
            confidence: self.coerce_confidence(raw.get("confidence")),
            related: normalize_related(raw.get("related_concepts")),
            parent: opt_string(raw.get("parent_concept")),
        })
    }

    /// Coerce a confidence value from a number or numeric string, clamped
    /// to [0.0, 1.0]. Absent or uncoercible values take the configured
    /// default.
    fn coerce_confidence(&self, value: Option<&Value>) -> f64 {
        let coerced = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match coerced.filter(|c| c.is_finite()) {
            Some(c) => c.clamp(0.0, 1.0),
            None => self.default_confidence,
        }
    }
}

/// Non-empty trimmed string, or None.
fn opt_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalize `related_concepts` from a single string, a list, or absent
/// into a deduplicated list of non-empty names. Non-string list entries
/// are dropped. First-seen order is preserved.
fn normalize_related(value: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut related = Vec::new();

    let mut push = |raw: &str| {
        let name = raw.trim();
        if !name.is_empty() && seen.insert(name.to_string()) {
            related.push(name.to_string());
        }
    };

    match value {
        Some(Value::String(s)) => push(s),
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::String(s) = item {
                    push(s);
                }
            }
        }
        _ => {}
    }

    related
}

/// Merge same-named candidates (case-insensitive) within one document.
///
/// The first-seen candidate is the base; later duplicates contribute their
/// highest confidence, any missing optional fields, additional context
/// (concatenated when it differs), and the union of related names.
/// First-seen order of distinct names is preserved.
pub fn dedupe_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        let key = candidate.name.to_lowercase();
        match by_key.get(&key) {
            None => {
                by_key.insert(key, merged.len());
                merged.push(candidate);
            }
            Some(&idx) => {
                let existing = &mut merged[idx];
                existing.confidence = existing.confidence.max(candidate.confidence);

                if existing.category.is_none() {
                    existing.category = candidate.category;
                }
                if existing.description.is_none() {
                    existing.description = candidate.description;
                }
                if existing.parent.is_none() {
                    existing.parent = candidate.parent;
                }

                match (&mut existing.context, candidate.context) {
                    (Some(current), Some(incoming)) if *current != incoming => {
                        current.push_str("\n\n");
                        current.push_str(&incoming);
                    }
                    (None, Some(incoming)) => existing.context = Some(incoming),
                    _ => {}
                }

                for name in candidate.related {
                    if !existing.related.contains(&name) {
                        existing.related.push(name);
                    }
                }
                debug!(name = %existing.name, "merged duplicate candidate");
            }
        }
    }

    merged
}
