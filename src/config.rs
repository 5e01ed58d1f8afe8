//! Runtime configuration
//!
//! An explicit value struct handed to the components that need it. There is
//! no process-global configuration state; the binary builds one `Config` at
//! startup and passes it down.

use std::path::PathBuf;

/// Configuration for a consolidation run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for paper PDFs.
    pub pdf_dir: PathBuf,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Maximum number of papers consolidated in one run.
    pub batch_size: usize,
    /// Confidence assigned when a candidate's value is absent or unusable.
    ///
    /// Distinct from `relation_strength`: occurrence confidence defaults to
    /// 0.8, relation strength to 1.0.
    pub default_confidence: f64,
    /// Relation type recorded on peer edges.
    pub relation_type: String,
    /// Strength recorded on newly created relations.
    pub relation_strength: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("pdfs"),
            db_path: default_db_path(),
            batch_size: 5,
            default_confidence: 0.8,
            relation_type: "related".to_string(),
            relation_strength: 1.0,
        }
    }
}

impl Config {
    /// Overlay `GNOSIS_*` environment variables onto the defaults.
    ///
    /// Unparseable numeric values are ignored rather than fatal; the
    /// defaults stand in.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("GNOSIS_PDF_DIR") {
            config.pdf_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("GNOSIS_DB") {
            config.db_path = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var("GNOSIS_BATCH_SIZE") {
            if let Ok(n) = raw.parse() {
                config.batch_size = n;
            }
        }
        if let Ok(raw) = std::env::var("GNOSIS_DEFAULT_CONFIDENCE") {
            if let Ok(c) = raw.parse::<f64>() {
                config.default_confidence = c.clamp(0.0, 1.0);
            }
        }
        config
    }

    /// Set the PDF directory.
    pub fn with_pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pdf_dir = dir.into();
        self
    }

    /// Set the database path.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the per-run batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Default database path (~/.local/share/gnosis/gnosis.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("gnosis").join("gnosis.db")
}
