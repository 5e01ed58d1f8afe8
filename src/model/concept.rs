//! Concept, relation, and occurrence types
//!
//! These mirror the relational schema. Concepts are deduplicated by exact
//! name, relations are directed and unique per ordered pair, occurrences are
//! append-only evidence and never merged.

use super::paper::PaperId;
use serde::{Deserialize, Serialize};

/// Row identifier for a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(i64);

impl ConceptId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row identifier for a concept relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(i64);

impl RelationId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i64 {
        self.0
    }
}

/// Row identifier for an occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccurrenceId(i64);

impl OccurrenceId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i64 {
        self.0
    }
}

/// Clamp a scalar into [0.0, 1.0]; non-finite values collapse to 1.0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// A deduplicated named node in the concept graph.
///
/// `name` is the sole merge key: two candidates with the same name
/// (case-sensitively) always resolve to the same row. `category` and
/// `description` fill first-write-wins, per field independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique identifier
    pub id: ConceptId,
    /// Concept name (globally unique, case-sensitive)
    pub name: String,
    /// Optional category (e.g. "Algorithms", "Networking")
    pub category: Option<String>,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional parent concept, forming a hierarchy
    pub parent_id: Option<ConceptId>,
}

/// A directed, typed, weighted edge between two concepts.
///
/// At most one edge exists per ordered (source, target) pair; the reverse
/// pair is a distinct edge. Fixed at creation, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRelation {
    /// Unique identifier
    pub id: RelationId,
    /// Source concept
    pub source: ConceptId,
    /// Target concept
    pub target: ConceptId,
    /// Type of relationship (e.g. "related")
    pub relation_type: String,
    /// Strength of the relationship (0.0 - 1.0)
    pub strength: f64,
}

impl ConceptRelation {
    pub fn new(
        id: RelationId,
        source: ConceptId,
        target: ConceptId,
        relation_type: impl Into<String>,
        strength: f64,
    ) -> Self {
        Self {
            id,
            source,
            target,
            relation_type: relation_type.into(),
            strength: clamp_unit(strength),
        }
    }
}

/// Evidence that a concept was mentioned in a specific paper.
///
/// Append-only: the same concept may occur several times in one paper and
/// every occurrence is preserved independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Unique identifier
    pub id: OccurrenceId,
    /// The concept that occurred
    pub concept: ConceptId,
    /// The paper it occurred in
    pub paper: PaperId,
    /// Question identifier within the paper, when known
    pub question: Option<String>,
    /// Surrounding text snippet
    pub context: Option<String>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
}

impl Occurrence {
    pub fn new(
        id: OccurrenceId,
        concept: ConceptId,
        paper: PaperId,
        question: Option<String>,
        context: Option<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id,
            concept,
            paper,
            question,
            context,
            confidence: clamp_unit(confidence),
        }
    }
}
