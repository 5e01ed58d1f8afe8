//! Paper discovery and registration
//!
//! Scans the PDF directory, parses filename metadata, and registers new
//! papers. Filenames follow `YYYY-pNN-qNN-solutions.pdf` (e.g.
//! `2021-p07-q08-solutions.pdf`); anything else is skipped with a warning.

use crate::config::Config;
use crate::model::Paper;
use crate::storage::{SqliteStore, StorageError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{4})-p(\d{2})-q(\d{2})-solutions\.pdf$")
        .expect("filename pattern is a valid regex")
});

/// Errors from ingestion operations.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata parsed from a paper filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperMeta {
    pub year: i32,
    pub paper_number: i32,
    pub question: String,
}

/// Parse `(year, paper_number, question)` out of a filename like
/// `2021-p07-q08-solutions.pdf`. Case-insensitive; returns `None` for any
/// other shape.
pub fn parse_filename(filename: &str) -> Option<PaperMeta> {
    let caps = FILENAME_PATTERN.captures(filename)?;
    Some(PaperMeta {
        year: caps[1].parse().ok()?,
        paper_number: caps[2].parse().ok()?,
        question: format!("q{}", caps[3].parse::<u32>().ok()?),
    })
}

/// Handles discovery and registration of PDF papers.
pub struct PaperIngestor {
    pdf_dir: PathBuf,
}

impl PaperIngestor {
    pub fn new(config: &Config) -> Self {
        Self {
            pdf_dir: config.pdf_dir.clone(),
        }
    }

    /// PDF files in the configured directory that are not yet registered.
    pub fn find_new_papers(&self, store: &SqliteStore) -> Result<Vec<PathBuf>, IngestError> {
        let registered = store.with_session(|s| s.registered_filenames())?;

        let mut new_files = Vec::new();
        for entry in std::fs::read_dir(&self.pdf_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pdf") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !registered.contains(name) {
                new_files.push(path);
            }
        }
        new_files.sort();

        info!(count = new_files.len(), "found new papers to register");
        Ok(new_files)
    }

    /// Register one paper from its path.
    ///
    /// Returns `None` when the filename carries no parseable metadata or the
    /// paper is already registered — neither is an error for the caller.
    pub fn register_paper(
        &self,
        store: &SqliteStore,
        pdf_path: &Path,
    ) -> Result<Option<Paper>, IngestError> {
        let Some(filename) = pdf_path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %pdf_path.display(), "path has no usable filename");
            return Ok(None);
        };

        let Some(meta) = parse_filename(filename) else {
            warn!(filename, "could not extract metadata from filename, skipping");
            return Ok(None);
        };

        let inserted = store.with_session(|s| {
            s.insert_paper(meta.year, meta.paper_number, &meta.question, filename)
        });
        match inserted {
            Ok(paper) => {
                info!(paper = %paper, "registered paper");
                Ok(Some(paper))
            }
            Err(e) if e.is_unique_violation() => {
                warn!(filename, "paper already registered");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find and register all new papers.
    pub fn process_new_papers(&self, store: &SqliteStore) -> Result<Vec<Paper>, IngestError> {
        let mut registered = Vec::new();
        for path in self.find_new_papers(store)? {
            if let Some(paper) = self.register_paper(store, &path)? {
                registered.push(paper);
            }
        }
        info!(count = registered.len(), "registered new papers");
        Ok(registered)
    }

    /// Papers still awaiting consolidation, oldest registration first.
    pub fn papers_for_processing(
        &self,
        store: &SqliteStore,
        limit: Option<usize>,
    ) -> Result<Vec<Paper>, IngestError> {
        Ok(store.with_session(|s| s.unprocessed_papers(limit))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OpenStore;

    #[test]
    fn parses_well_formed_filenames() {
        let meta = parse_filename("2021-p07-q08-solutions.pdf").unwrap();
        assert_eq!(meta.year, 2021);
        assert_eq!(meta.paper_number, 7);
        assert_eq!(meta.question, "q8");

        // Case-insensitive
        assert!(parse_filename("2019-P03-Q12-SOLUTIONS.PDF").is_some());
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_filename("lecture-notes.pdf").is_none());
        assert!(parse_filename("2021-p7-q8-solutions.pdf").is_none());
        assert!(parse_filename("2021-p07-q08-solutions.txt").is_none());
        assert!(parse_filename("2021-p07-q08.pdf").is_none());
    }

    fn test_setup() -> (tempfile::TempDir, Config, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_pdf_dir(dir.path());
        let store = SqliteStore::open_in_memory().unwrap();
        (dir, config, store)
    }

    #[test]
    fn registers_new_papers_once() {
        let (dir, config, store) = test_setup();
        std::fs::write(dir.path().join("2021-p07-q08-solutions.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        std::fs::write(dir.path().join("badly-named.pdf"), b"%PDF").unwrap();

        let ingestor = PaperIngestor::new(&config);
        let registered = ingestor.process_new_papers(&store).unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].filename, "2021-p07-q08-solutions.pdf");

        // Second pass finds nothing new
        let again = ingestor.process_new_papers(&store).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn duplicate_registration_is_not_an_error() {
        let (dir, config, store) = test_setup();
        let path = dir.path().join("2021-p07-q08-solutions.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let ingestor = PaperIngestor::new(&config);
        assert!(ingestor.register_paper(&store, &path).unwrap().is_some());
        assert!(ingestor.register_paper(&store, &path).unwrap().is_none());
    }

    #[test]
    fn papers_for_processing_excludes_processed() {
        let (_dir, config, store) = test_setup();
        let (pending, done) = store
            .with_session::<_, StorageError>(|s| {
                let pending = s.insert_paper(2021, 7, "q8", "a.pdf")?;
                let done = s.insert_paper(2021, 7, "q9", "b.pdf")?;
                s.mark_paper_processed(done.id)?;
                Ok((pending, done))
            })
            .unwrap();

        let ingestor = PaperIngestor::new(&config);
        let todo = ingestor.papers_for_processing(&store, None).unwrap();
        assert_eq!(todo.len(), 1);
        assert_eq!(todo[0].id, pending.id);
        assert_ne!(todo[0].id, done.id);
    }
}
