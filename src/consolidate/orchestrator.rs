//! Consolidation orchestrator — one transaction per document
//!
//! Owns the per-document state machine: Pending → Extracting → Storing →
//! Committed, or Failed at either working state. Candidates are processed
//! in extraction order; an individual candidate that cannot land is logged
//! and skipped, while a storage-fatal error rolls back the whole document.
//! The processed flag flips inside the same transaction as the writes, so a
//! paper is marked processed if and only if at least one concept was
//! durably stored for it.

use super::occurrence::record_occurrence;
use super::relations::link_related;
use super::resolver::{assign_parent, resolve_concept};
use crate::config::Config;
use crate::extract::{dedupe_candidates, Candidate, CandidateValidator, ConceptExtractor};
use crate::model::Paper;
use crate::storage::{SqliteStore, StorageError, StorageResult, StoreSession};
use tracing::{info, warn};

/// Errors that end a consolidation run.
///
/// Per-document failures are not errors — they surface as
/// [`PaperOutcome::Failed`] and the paper stays unprocessed for retry.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Why a document ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The extraction collaborator failed
    Extraction(String),
    /// Extraction returned an empty candidate list
    NoCandidates,
    /// Every candidate was rejected or refused to store
    NothingStored,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Extraction(e) => write!(f, "extraction failed: {}", e),
            FailureReason::NoCandidates => write!(f, "extraction returned no candidates"),
            FailureReason::NothingStored => write!(f, "no candidate was stored"),
        }
    }
}

/// Per-document telemetry counters.
///
/// Observability output only; correctness is carried by the processed flag
/// and the stored rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentReport {
    /// Raw records received from extraction
    pub received: usize,
    /// Records that passed validation (after in-document merge)
    pub accepted: usize,
    /// Records rejected by validation
    pub rejected: usize,
    /// Candidates durably stored
    pub stored: usize,
    /// New relation edges created
    pub relations_created: usize,
}

/// Terminal state of one document's consolidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperOutcome {
    /// The transaction committed and the paper is marked processed.
    Committed { report: DocumentReport },
    /// Nothing durable happened; the paper stays unprocessed for retry.
    Failed {
        reason: FailureReason,
        report: DocumentReport,
    },
}

/// Counters for a sequential batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Papers committed and marked processed
    pub processed: usize,
    /// Papers left unprocessed
    pub failed: usize,
    /// Total candidates stored across committed papers
    pub concepts_stored: usize,
}

/// Transaction-scoped abort signal. `NothingStored` forces a rollback
/// without being a storage error.
enum TxAbort {
    Storage(StorageError),
    NothingStored,
}

impl From<StorageError> for TxAbort {
    fn from(e: StorageError) -> Self {
        TxAbort::Storage(e)
    }
}

/// Drives consolidation for papers, one at a time.
pub struct Consolidator {
    config: Config,
    validator: CandidateValidator,
}

impl Consolidator {
    pub fn new(config: Config) -> Self {
        let validator = CandidateValidator::new(config.default_confidence);
        Self { config, validator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consolidate one paper: extract, validate, store, flip the flag.
    ///
    /// Returns `Ok(Failed { .. })` for document-level failures (extraction
    /// error, nothing stored) and `Err` only when storage itself failed —
    /// the caller should stop the batch in that case.
    pub async fn consolidate_paper(
        &self,
        store: &SqliteStore,
        extractor: &dyn ConceptExtractor,
        paper: &Paper,
    ) -> Result<PaperOutcome, ConsolidateError> {
        // Pending → Extracting
        let pdf_path = self.config.pdf_dir.join(&paper.filename);
        let raw = match extractor.extract(paper, &pdf_path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(paper = %paper, error = %e, "extraction failed");
                return Ok(PaperOutcome::Failed {
                    reason: FailureReason::Extraction(e.to_string()),
                    report: DocumentReport::default(),
                });
            }
        };
        if raw.is_empty() {
            warn!(paper = %paper, "extraction returned no candidates");
            return Ok(PaperOutcome::Failed {
                reason: FailureReason::NoCandidates,
                report: DocumentReport::default(),
            });
        }

        // Validate in extraction order, then merge same-named duplicates
        let mut report = DocumentReport {
            received: raw.len(),
            ..DocumentReport::default()
        };
        let mut candidates = Vec::new();
        for (index, record) in raw.iter().enumerate() {
            match self.validator.validate(record) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    report.rejected += 1;
                    warn!(paper = %paper, index, record = %record, "rejected candidate");
                }
            }
        }
        let candidates = dedupe_candidates(candidates);
        report.accepted = candidates.len();

        // Extracting → Storing: one transaction for the whole document
        let stored =
            store.with_tx(|session| self.store_document(session, paper, &candidates));

        match stored {
            Ok((stored, relations_created)) => {
                report.stored = stored;
                report.relations_created = relations_created;
                info!(
                    paper = %paper,
                    received = report.received,
                    accepted = report.accepted,
                    rejected = report.rejected,
                    stored = report.stored,
                    relations = report.relations_created,
                    "paper consolidated"
                );
                Ok(PaperOutcome::Committed { report })
            }
            Err(TxAbort::NothingStored) => {
                warn!(paper = %paper, "nothing stored; leaving paper unprocessed");
                Ok(PaperOutcome::Failed {
                    reason: FailureReason::NothingStored,
                    report,
                })
            }
            Err(TxAbort::Storage(e)) => Err(ConsolidateError::Storage(e)),
        }
    }

    /// Storing phase body. Runs inside one transaction; returning `Err`
    /// rolls the whole document back.
    fn store_document(
        &self,
        session: &StoreSession<'_>,
        paper: &Paper,
        candidates: &[Candidate],
    ) -> Result<(usize, usize), TxAbort> {
        let mut stored = 0;
        let mut relations_created = 0;

        for candidate in candidates {
            match self.store_candidate(session, paper, candidate) {
                Ok(relations) => {
                    stored += 1;
                    relations_created += relations;
                }
                Err(e) if e.is_constraint_violation() => {
                    // One record refused to land; the document carries on
                    warn!(
                        paper = %paper,
                        candidate = %candidate.name,
                        error = %e,
                        "skipping candidate after constraint failure"
                    );
                }
                Err(e) => return Err(TxAbort::Storage(e)),
            }
        }

        if stored == 0 {
            return Err(TxAbort::NothingStored);
        }

        // Storing → Committed: the flag flips atomically with the writes
        session.mark_paper_processed(paper.id)?;
        Ok((stored, relations_created))
    }

    /// Resolve, attach, link, and record one candidate, in that order —
    /// relations and occurrences need the concept's storage identity.
    fn store_candidate(
        &self,
        session: &StoreSession<'_>,
        paper: &Paper,
        candidate: &Candidate,
    ) -> StorageResult<usize> {
        let concept = resolve_concept(
            session,
            &candidate.name,
            candidate.category.as_deref(),
            candidate.description.as_deref(),
        )?;

        if let Some(parent) = &candidate.parent {
            assign_parent(session, &concept, parent)?;
        }

        let relations = link_related(
            session,
            &concept,
            &candidate.related,
            &self.config.relation_type,
            self.config.relation_strength,
        )?;

        record_occurrence(
            session,
            &concept,
            paper,
            candidate.context.as_deref(),
            candidate.confidence,
        )?;

        Ok(relations)
    }

    /// Consolidate a batch of papers sequentially.
    ///
    /// Document-level failures are logged and skipped; a storage failure
    /// halts the remaining batch.
    pub async fn run_batch(
        &self,
        store: &SqliteStore,
        extractor: &dyn ConceptExtractor,
        papers: &[Paper],
    ) -> Result<BatchReport, ConsolidateError> {
        let mut batch = BatchReport::default();

        for paper in papers {
            match self.consolidate_paper(store, extractor, paper).await? {
                PaperOutcome::Committed { report } => {
                    batch.processed += 1;
                    batch.concepts_stored += report.stored;
                }
                PaperOutcome::Failed { reason, .. } => {
                    batch.failed += 1;
                    warn!(paper = %paper, %reason, "paper not consolidated");
                }
            }
        }

        info!(
            processed = batch.processed,
            failed = batch.failed,
            concepts = batch.concepts_stored,
            "batch complete"
        );
        Ok(batch)
    }
}
