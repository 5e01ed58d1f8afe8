//! Gnosis: Concept-Graph Consolidation Engine
//!
//! Ingests exam-paper PDFs, runs them through an LLM extraction boundary,
//! and folds the resulting candidate records into a deduplicated,
//! cross-referenced concept graph backed by SQLite.
//!
//! # Core Concepts
//!
//! - **Concepts**: named graph nodes, deduplicated by exact name
//! - **Relations**: directed, typed edges, at most one per ordered pair
//! - **Occurrences**: append-only evidence tying a concept to a paper
//! - **Papers**: ingested documents; `processed_at` is the durable
//!   completion signal and the retry gate
//!
//! # Example
//!
//! ```
//! use gnosis::{OpenStore, SqliteStore};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! // Store is ready for consolidation runs
//! ```

pub mod config;
pub mod consolidate;
pub mod extract;
pub mod ingest;
pub mod model;
pub mod query;
pub mod storage;

pub use config::Config;
pub use consolidate::{
    BatchReport, ConsolidateError, Consolidator, DocumentReport, FailureReason, PaperOutcome,
};
pub use extract::{
    Candidate, CandidateValidator, ConceptExtractor, ExtractError, MockExtractor,
    SidecarExtractor,
};
pub use ingest::{IngestError, PaperIngestor, PaperMeta};
pub use model::{
    Concept, ConceptId, ConceptRelation, Occurrence, OccurrenceId, Paper, PaperId, RelationId,
};
pub use storage::{OpenStore, SqliteStore, StorageError, StorageResult, StoreSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
