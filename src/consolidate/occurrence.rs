//! Occurrence recording — append-only evidence
//!
//! Every successfully stored candidate yields exactly one occurrence row.
//! Occurrences are never queried for duplicates, updated, or deleted.

use crate::model::{Concept, Occurrence, Paper};
use crate::storage::{StorageResult, StoreSession};

/// Insert one occurrence linking `concept` to `paper`.
///
/// The validator guarantees `confidence` is already in range, but the
/// recorder does not trust its caller: the storage layer clamps again on
/// insert.
pub fn record_occurrence(
    session: &StoreSession<'_>,
    concept: &Concept,
    paper: &Paper,
    context: Option<&str>,
    confidence: f64,
) -> StorageResult<Occurrence> {
    session.insert_occurrence(
        concept.id,
        paper.id,
        paper.question_label(),
        context,
        confidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::resolve_concept;
    use crate::storage::{OpenStore, SqliteStore, StorageError};

    #[test]
    fn records_carry_paper_question_and_clamped_confidence() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .with_tx::<_, StorageError>(|s| {
                let paper = s.insert_paper(2021, 7, "q8", "p.pdf")?;
                let concept = resolve_concept(s, "Recursion", None, None)?;

                let occ = record_occurrence(s, &concept, &paper, Some("snippet"), 3.0)?;
                assert_eq!(occ.question.as_deref(), Some("q8"));
                assert_eq!(occ.context.as_deref(), Some("snippet"));
                assert_eq!(occ.confidence, 1.0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn repeated_records_are_preserved_independently() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .with_tx::<_, StorageError>(|s| {
                let paper = s.insert_paper(2021, 7, "q8", "p.pdf")?;
                let concept = resolve_concept(s, "Recursion", None, None)?;

                record_occurrence(s, &concept, &paper, None, 0.9)?;
                record_occurrence(s, &concept, &paper, None, 0.7)?;
                assert_eq!(s.occurrences_for_paper(paper.id)?.len(), 2);
                Ok(())
            })
            .unwrap();
    }
}
