//! Gnosis CLI — ingest exam papers and consolidate extracted concepts.
//!
//! Usage:
//!   gnosis ingest [--pdf-dir path] [--db path]
//!   gnosis analyze [--limit N]
//!   gnosis papers
//!   gnosis top [--limit N]
//!   gnosis show <name> [--json]
//!   gnosis search <term>

use clap::{Parser, Subcommand};
use gnosis::{
    query, Config, Consolidator, OpenStore, PaperIngestor, SidecarExtractor, SqliteStore,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gnosis",
    version,
    about = "Concept-graph consolidation engine for exam-paper corpora"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory containing paper PDFs
    #[arg(long, global = true)]
    pdf_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register new PDF papers found in the PDF directory
    Ingest,
    /// Consolidate concepts for unprocessed papers
    Analyze {
        /// Maximum number of papers to process (defaults to the batch size)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List registered papers and their processing status
    Papers,
    /// Show the most frequent concepts
    Top {
        /// Number of concepts to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one concept in full
    Show {
        /// Concept name (exact match)
        name: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Search concepts by name substring
    Search {
        /// Substring to search for
        term: String,
    },
}

fn cmd_ingest(store: &SqliteStore, config: &Config) -> i32 {
    let ingestor = PaperIngestor::new(config);
    match ingestor.process_new_papers(store) {
        Ok(papers) => {
            println!("Registered {} new papers", papers.len());
            for paper in papers {
                println!("  {} ({})", paper, paper.filename);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_analyze(store: &SqliteStore, config: &Config, limit: Option<usize>) -> i32 {
    let ingestor = PaperIngestor::new(config);
    let limit = limit.or(Some(config.batch_size));
    let papers = match ingestor.papers_for_processing(store, limit) {
        Ok(papers) => papers,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if papers.is_empty() {
        println!("No papers to process");
        return 0;
    }

    let consolidator = Consolidator::new(config.clone());
    match consolidator
        .run_batch(store, &SidecarExtractor, &papers)
        .await
    {
        Ok(batch) => {
            println!(
                "Processed {} papers ({} concepts stored, {} failed)",
                batch.processed, batch.concepts_stored, batch.failed
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_papers(store: &SqliteStore) -> i32 {
    match store.with_session(|s| s.list_papers()) {
        Ok(papers) => {
            for paper in &papers {
                let status = if paper.is_processed() { "done" } else { "pending" };
                println!("  [{}] {} ({})", status, paper, paper.filename);
            }
            println!("{} papers registered", papers.len());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_top(store: &SqliteStore, limit: usize) -> i32 {
    match query::concept_frequency(store, Some(limit)) {
        Ok(ranked) => {
            for (rank, entry) in ranked.iter().enumerate() {
                let category = entry.concept.category.as_deref().unwrap_or("-");
                println!(
                    "{:3}. {} [{}] ({} occurrences)",
                    rank + 1,
                    entry.concept.name,
                    category,
                    entry.occurrences
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_show(store: &SqliteStore, name: &str, json: bool) -> i32 {
    let detail = match query::concept_detail(store, name) {
        Ok(Some(detail)) => detail,
        Ok(None) => {
            eprintln!("Error: no concept named '{}'", name);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if json {
        match serde_json::to_string_pretty(&detail) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        return 0;
    }

    println!("{}", detail.concept.name);
    if let Some(category) = &detail.concept.category {
        println!("  category:    {}", category);
    }
    if let Some(description) = &detail.concept.description {
        println!("  description: {}", description);
    }
    if let Some(parent) = &detail.parent {
        println!("  parent:      {}", parent.name);
    }
    if !detail.children.is_empty() {
        let names: Vec<&str> = detail.children.iter().map(|c| c.name.as_str()).collect();
        println!("  children:    {}", names.join(", "));
    }
    if !detail.related_to.is_empty() {
        let names: Vec<&str> = detail.related_to.iter().map(|(_, c)| c.name.as_str()).collect();
        println!("  related to:  {}", names.join(", "));
    }
    if !detail.related_from.is_empty() {
        let names: Vec<&str> = detail
            .related_from
            .iter()
            .map(|(_, c)| c.name.as_str())
            .collect();
        println!("  related from: {}", names.join(", "));
    }
    println!("  occurrences: {}", detail.occurrences);
    0
}

fn cmd_search(store: &SqliteStore, term: &str) -> i32 {
    match query::search_concepts(store, term) {
        Ok(concepts) => {
            for concept in &concepts {
                let category = concept.category.as_deref().unwrap_or("-");
                println!("  {} [{}]", concept.name, category);
            }
            println!("{} concepts matched", concepts.len());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(pdf_dir) = cli.pdf_dir {
        config.pdf_dir = pdf_dir;
    }

    let store = match SqliteStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Ingest => cmd_ingest(&store, &config),
        Commands::Analyze { limit } => cmd_analyze(&store, &config, limit).await,
        Commands::Papers => cmd_papers(&store),
        Commands::Top { limit } => cmd_top(&store, limit),
        Commands::Show { name, json } => cmd_show(&store, &name, json),
        Commands::Search { term } => cmd_search(&store, &term),
    };
    std::process::exit(code);
}
