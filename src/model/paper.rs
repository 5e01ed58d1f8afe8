//! Paper metadata — the unit of ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row identifier for a paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(i64);

impl PaperId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PaperId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered exam paper.
///
/// The consolidation engine treats this as an opaque foreign key plus the
/// processed flag: `processed_at` is set if and only if at least one concept
/// was durably stored for the paper, and a set flag excludes the paper from
/// future runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Unique identifier
    pub id: PaperId,
    /// Exam year
    pub year: i32,
    /// Paper number within the year
    pub paper_number: i32,
    /// Question label parsed from the filename (e.g. "q8")
    pub question: String,
    /// Source PDF filename (unique)
    pub filename: String,
    /// When consolidation committed for this paper, if it has
    pub processed_at: Option<DateTime<Utc>>,
}

impl Paper {
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }

    /// Question label recorded on occurrences, when the paper carries one.
    pub fn question_label(&self) -> Option<&str> {
        if self.question.is_empty() {
            None
        } else {
            Some(&self.question)
        }
    }
}

impl std::fmt::Display for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Paper({} p{:02} {})",
            self.year, self.paper_number, self.question
        )
    }
}
