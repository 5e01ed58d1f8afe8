//! SQLite storage backend
//!
//! A single database file holds the papers, concepts, concept_relations,
//! and occurrences tables. Uniqueness of concept names and of ordered
//! relation pairs is enforced by hard constraints, not only by engine-level
//! check-then-act.

use super::traits::{OpenStore, StorageError, StorageResult};
use crate::model::{
    Concept, ConceptId, ConceptRelation, Occurrence, OccurrenceId, Paper, PaperId, RelationId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed concept store
///
/// Thread-safe via internal mutex on the connection. All access happens
/// through a [`StoreSession`] handed out by `with_tx` (one transaction,
/// commit on `Ok`, rollback on `Err`) or `with_session` (autocommit).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Papers table: the unit of ingestion
            CREATE TABLE IF NOT EXISTS papers (
                id INTEGER PRIMARY KEY,
                year INTEGER NOT NULL,
                paper_number INTEGER NOT NULL,
                question TEXT NOT NULL,
                filename TEXT NOT NULL UNIQUE,
                processed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_papers_year ON papers(year);
            CREATE INDEX IF NOT EXISTS idx_papers_processed ON papers(processed_at);

            -- Concepts table: name is the sole merge key
            CREATE TABLE IF NOT EXISTS concepts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                category TEXT,
                description TEXT,
                parent_id INTEGER REFERENCES concepts(id)
            );
            CREATE INDEX IF NOT EXISTS idx_concepts_category ON concepts(category);

            -- Directed edges, at most one per ordered pair
            CREATE TABLE IF NOT EXISTS concept_relations (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES concepts(id),
                target_id INTEGER NOT NULL REFERENCES concepts(id),
                relation_type TEXT NOT NULL,
                strength REAL NOT NULL DEFAULT 1.0,
                UNIQUE (source_id, target_id)
            );
            CREATE INDEX IF NOT EXISTS idx_relations_target ON concept_relations(target_id);

            -- Append-only occurrence evidence
            CREATE TABLE IF NOT EXISTS occurrences (
                id INTEGER PRIMARY KEY,
                concept_id INTEGER NOT NULL REFERENCES concepts(id),
                paper_id INTEGER NOT NULL REFERENCES papers(id),
                question TEXT,
                context TEXT,
                confidence REAL NOT NULL DEFAULT 1.0
            );
            CREATE INDEX IF NOT EXISTS idx_occurrences_concept ON occurrences(concept_id);
            CREATE INDEX IF NOT EXISTS idx_occurrences_paper ON occurrences(paper_id);

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    /// Run `f` inside a single transaction.
    ///
    /// Commits when the closure returns `Ok`, rolls back on `Err`. The
    /// session sees its own uncommitted writes, so freshly inserted rows are
    /// valid foreign-key targets before commit.
    pub fn with_tx<T, E>(
        &self,
        f: impl FnOnce(&StoreSession<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(StorageError::from)
            .map_err(E::from)?;
        let conn_ref: &Connection = &tx;
        let session = StoreSession { conn: conn_ref };
        let out = f(&session)?;
        tx.commit().map_err(StorageError::from).map_err(E::from)?;
        Ok(out)
    }

    /// Run autocommit work against the store (reads, single-row writes).
    pub fn with_session<T, E>(
        &self,
        f: impl FnOnce(&StoreSession<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let conn = self.conn.lock().unwrap();
        let conn_ref: &Connection = &conn;
        let session = StoreSession { conn: conn_ref };
        f(&session)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// A live handle onto the store's connection, scoped to one `with_tx` or
/// `with_session` call.
pub struct StoreSession<'a> {
    conn: &'a Connection,
}

impl StoreSession<'_> {
    // === Paper operations ===

    pub fn insert_paper(
        &self,
        year: i32,
        paper_number: i32,
        question: &str,
        filename: &str,
    ) -> StorageResult<Paper> {
        self.conn.execute(
            "INSERT INTO papers (year, paper_number, question, filename) VALUES (?1, ?2, ?3, ?4)",
            params![year, paper_number, question, filename],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(Paper {
            id: PaperId::new(id),
            year,
            paper_number,
            question: question.to_string(),
            filename: filename.to_string(),
            processed_at: None,
        })
    }

    pub fn paper(&self, id: PaperId) -> StorageResult<Option<Paper>> {
        self.conn
            .query_row(
                "SELECT id, year, paper_number, question, filename, processed_at
                 FROM papers WHERE id = ?1",
                params![id.raw()],
                row_to_paper,
            )
            .optional()?
            .transpose()
    }

    pub fn find_paper_by_filename(&self, filename: &str) -> StorageResult<Option<Paper>> {
        self.conn
            .query_row(
                "SELECT id, year, paper_number, question, filename, processed_at
                 FROM papers WHERE filename = ?1",
                params![filename],
                row_to_paper,
            )
            .optional()?
            .transpose()
    }

    /// Filenames of every registered paper, processed or not.
    pub fn registered_filenames(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT filename FROM papers")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    /// Papers whose processed flag is still unset, in registration order.
    pub fn unprocessed_papers(&self, limit: Option<usize>) -> StorageResult<Vec<Paper>> {
        let mut sql = String::from(
            "SELECT id, year, paper_number, question, filename, processed_at
             FROM papers WHERE processed_at IS NULL ORDER BY id",
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_paper)?;
        collect_papers(rows)
    }

    pub fn list_papers(&self) -> StorageResult<Vec<Paper>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, year, paper_number, question, filename, processed_at
             FROM papers ORDER BY year, paper_number, question",
        )?;
        let rows = stmt.query_map([], row_to_paper)?;
        collect_papers(rows)
    }

    /// Flip the paper's processed flag, stamping the current time.
    ///
    /// Idempotent: re-flipping an already processed paper refreshes the
    /// timestamp but changes nothing else.
    pub fn mark_paper_processed(&self, id: PaperId) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE papers SET processed_at = ?2 WHERE id = ?1",
            params![id.raw(), Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StorageError::PaperNotFound(id.raw()));
        }
        Ok(())
    }

    // === Concept operations ===

    pub fn find_concept_by_name(&self, name: &str) -> StorageResult<Option<Concept>> {
        let concept = self
            .conn
            .query_row(
                "SELECT id, name, category, description, parent_id
                 FROM concepts WHERE name = ?1",
                params![name],
                row_to_concept,
            )
            .optional()?;
        Ok(concept)
    }

    pub fn concept(&self, id: ConceptId) -> StorageResult<Option<Concept>> {
        let concept = self
            .conn
            .query_row(
                "SELECT id, name, category, description, parent_id
                 FROM concepts WHERE id = ?1",
                params![id.raw()],
                row_to_concept,
            )
            .optional()?;
        Ok(concept)
    }

    pub fn insert_concept(
        &self,
        name: &str,
        category: Option<&str>,
        description: Option<&str>,
    ) -> StorageResult<Concept> {
        self.conn.execute(
            "INSERT INTO concepts (name, category, description) VALUES (?1, ?2, ?3)",
            params![name, category, description],
        )?;
        Ok(Concept {
            id: ConceptId::new(self.conn.last_insert_rowid()),
            name: name.to_string(),
            category: category.map(str::to_string),
            description: description.map(str::to_string),
            parent_id: None,
        })
    }

    /// First-write-wins fill of `category`. Returns true when the value
    /// actually landed (field was empty, value non-empty).
    pub fn fill_concept_category(&self, id: ConceptId, category: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE concepts SET category = ?2
             WHERE id = ?1 AND (category IS NULL OR category = '') AND ?2 <> ''",
            params![id.raw(), category],
        )?;
        Ok(changed > 0)
    }

    /// First-write-wins fill of `description`.
    pub fn fill_concept_description(
        &self,
        id: ConceptId,
        description: &str,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE concepts SET description = ?2
             WHERE id = ?1 AND (description IS NULL OR description = '') AND ?2 <> ''",
            params![id.raw(), description],
        )?;
        Ok(changed > 0)
    }

    /// Assign a parent only while the concept has none.
    pub fn set_concept_parent(&self, id: ConceptId, parent: ConceptId) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE concepts SET parent_id = ?2 WHERE id = ?1 AND parent_id IS NULL",
            params![id.raw(), parent.raw()],
        )?;
        Ok(changed > 0)
    }

    pub fn parent_of(&self, id: ConceptId) -> StorageResult<Option<ConceptId>> {
        let parent: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT parent_id FROM concepts WHERE id = ?1",
                params![id.raw()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(parent.flatten().map(ConceptId::new))
    }

    pub fn concept_children(&self, id: ConceptId) -> StorageResult<Vec<Concept>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, description, parent_id
             FROM concepts WHERE parent_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![id.raw()], row_to_concept)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn concept_count(&self) -> StorageResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM concepts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Concepts whose name contains `term` (case-insensitive for ASCII).
    pub fn search_concepts(&self, term: &str) -> StorageResult<Vec<Concept>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, description, parent_id
             FROM concepts WHERE name LIKE '%' || ?1 || '%' ORDER BY name",
        )?;
        let rows = stmt.query_map(params![term], row_to_concept)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Concepts carrying a category, for grouped views.
    pub fn categorized_concepts(&self) -> StorageResult<Vec<Concept>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, description, parent_id
             FROM concepts WHERE category IS NOT NULL AND category <> '' ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_concept)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Concepts ranked by occurrence count, most frequent first.
    pub fn concept_frequency(&self, limit: Option<usize>) -> StorageResult<Vec<(Concept, i64)>> {
        let mut sql = String::from(
            "SELECT c.id, c.name, c.category, c.description, c.parent_id, COUNT(o.id) AS occurrences
             FROM concepts c
             JOIN occurrences o ON o.concept_id = c.id
             GROUP BY c.id
             ORDER BY occurrences DESC, c.name",
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((row_to_concept(row)?, row.get::<_, i64>(5)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Concepts occurring in papers from the given year, ranked by count.
    pub fn concepts_for_year(&self, year: i32) -> StorageResult<Vec<(Concept, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.category, c.description, c.parent_id, COUNT(o.id) AS occurrences
             FROM concepts c
             JOIN occurrences o ON o.concept_id = c.id
             JOIN papers p ON p.id = o.paper_id
             WHERE p.year = ?1
             GROUP BY c.id
             ORDER BY occurrences DESC, c.name",
        )?;
        let rows = stmt.query_map(params![year], |row| {
            Ok((row_to_concept(row)?, row.get::<_, i64>(5)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // === Relation operations ===

    pub fn relation_exists(&self, source: ConceptId, target: ConceptId) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM concept_relations WHERE source_id = ?1 AND target_id = ?2",
                params![source.raw(), target.raw()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn insert_relation(
        &self,
        source: ConceptId,
        target: ConceptId,
        relation_type: &str,
        strength: f64,
    ) -> StorageResult<ConceptRelation> {
        let strength = crate::model::clamp_unit(strength);
        self.conn.execute(
            "INSERT INTO concept_relations (source_id, target_id, relation_type, strength)
             VALUES (?1, ?2, ?3, ?4)",
            params![source.raw(), target.raw(), relation_type, strength],
        )?;
        Ok(ConceptRelation::new(
            RelationId::new(self.conn.last_insert_rowid()),
            source,
            target,
            relation_type,
            strength,
        ))
    }

    /// Outgoing relations, paired with the target concept.
    pub fn relations_from(&self, id: ConceptId) -> StorageResult<Vec<(ConceptRelation, Concept)>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.source_id, r.target_id, r.relation_type, r.strength,
                    c.id, c.name, c.category, c.description, c.parent_id
             FROM concept_relations r
             JOIN concepts c ON c.id = r.target_id
             WHERE r.source_id = ?1
             ORDER BY c.name",
        )?;
        let rows = stmt.query_map(params![id.raw()], row_to_relation_with_concept)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Incoming relations, paired with the source concept.
    pub fn relations_to(&self, id: ConceptId) -> StorageResult<Vec<(ConceptRelation, Concept)>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.source_id, r.target_id, r.relation_type, r.strength,
                    c.id, c.name, c.category, c.description, c.parent_id
             FROM concept_relations r
             JOIN concepts c ON c.id = r.source_id
             WHERE r.target_id = ?1
             ORDER BY c.name",
        )?;
        let rows = stmt.query_map(params![id.raw()], row_to_relation_with_concept)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn relation_count(&self) -> StorageResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM concept_relations", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    // === Occurrence operations ===

    pub fn insert_occurrence(
        &self,
        concept: ConceptId,
        paper: PaperId,
        question: Option<&str>,
        context: Option<&str>,
        confidence: f64,
    ) -> StorageResult<Occurrence> {
        let confidence = crate::model::clamp_unit(confidence);
        self.conn.execute(
            "INSERT INTO occurrences (concept_id, paper_id, question, context, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![concept.raw(), paper.raw(), question, context, confidence],
        )?;
        Ok(Occurrence::new(
            OccurrenceId::new(self.conn.last_insert_rowid()),
            concept,
            paper,
            question.map(str::to_string),
            context.map(str::to_string),
            confidence,
        ))
    }

    pub fn occurrences_for_paper(&self, paper: PaperId) -> StorageResult<Vec<Occurrence>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, concept_id, paper_id, question, context, confidence
             FROM occurrences WHERE paper_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![paper.raw()], row_to_occurrence)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn occurrence_count_for_concept(&self, concept: ConceptId) -> StorageResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM occurrences WHERE concept_id = ?1",
            params![concept.raw()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// === Row mapping ===

fn row_to_concept(row: &Row<'_>) -> rusqlite::Result<Concept> {
    Ok(Concept {
        id: ConceptId::new(row.get(0)?),
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        parent_id: row.get::<_, Option<i64>>(4)?.map(ConceptId::new),
    })
}

fn row_to_relation_with_concept(row: &Row<'_>) -> rusqlite::Result<(ConceptRelation, Concept)> {
    let relation = ConceptRelation {
        id: RelationId::new(row.get(0)?),
        source: ConceptId::new(row.get(1)?),
        target: ConceptId::new(row.get(2)?),
        relation_type: row.get(3)?,
        strength: row.get(4)?,
    };
    let concept = Concept {
        id: ConceptId::new(row.get(5)?),
        name: row.get(6)?,
        category: row.get(7)?,
        description: row.get(8)?,
        parent_id: row.get::<_, Option<i64>>(9)?.map(ConceptId::new),
    };
    Ok((relation, concept))
}

fn row_to_occurrence(row: &Row<'_>) -> rusqlite::Result<Occurrence> {
    Ok(Occurrence {
        id: OccurrenceId::new(row.get(0)?),
        concept: ConceptId::new(row.get(1)?),
        paper: PaperId::new(row.get(2)?),
        question: row.get(3)?,
        context: row.get(4)?,
        confidence: row.get(5)?,
    })
}

/// Papers carry a parsed timestamp, so the row mapper returns a nested
/// result: the outer layer is rusqlite's, the inner layer date parsing.
fn row_to_paper(row: &Row<'_>) -> rusqlite::Result<StorageResult<Paper>> {
    let processed_raw: Option<String> = row.get(5)?;
    let processed_at = match processed_raw {
        Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => return Ok(Err(StorageError::DateParse(e.to_string()))),
        },
        None => None,
    };
    Ok(Ok(Paper {
        id: PaperId::new(row.get(0)?),
        year: row.get(1)?,
        paper_number: row.get(2)?,
        question: row.get(3)?,
        filename: row.get(4)?,
        processed_at,
    }))
}

fn collect_papers(
    rows: impl Iterator<Item = rusqlite::Result<StorageResult<Paper>>>,
) -> StorageResult<Vec<Paper>> {
    let mut papers = Vec::new();
    for row in rows {
        papers.push(row??);
    }
    Ok(papers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_find_paper() {
        let store = create_test_store();
        let paper = store
            .with_session(|s| s.insert_paper(2021, 7, "q8", "2021-p07-q08-solutions.pdf"))
            .unwrap();

        let found = store
            .with_session(|s| s.find_paper_by_filename("2021-p07-q08-solutions.pdf"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, paper.id);
        assert_eq!(found.year, 2021);
        assert!(found.processed_at.is_none());
    }

    #[test]
    fn test_duplicate_filename_is_unique_violation() {
        let store = create_test_store();
        store
            .with_session(|s| s.insert_paper(2021, 7, "q8", "dup.pdf"))
            .unwrap();

        let err = store
            .with_session(|s| s.insert_paper(2022, 8, "q9", "dup.pdf"))
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_mark_paper_processed_roundtrips_timestamp() {
        let store = create_test_store();
        let paper = store
            .with_session(|s| s.insert_paper(2021, 7, "q8", "p.pdf"))
            .unwrap();

        store
            .with_session(|s| s.mark_paper_processed(paper.id))
            .unwrap();

        let reloaded = store
            .with_session(|s| s.paper(paper.id))
            .unwrap()
            .unwrap();
        assert!(reloaded.is_processed());
    }

    #[test]
    fn test_mark_missing_paper_errors() {
        let store = create_test_store();
        let err = store
            .with_session(|s| s.mark_paper_processed(PaperId::new(99)))
            .unwrap_err();
        assert!(matches!(err, StorageError::PaperNotFound(99)));
    }

    #[test]
    fn test_unprocessed_papers_respects_limit() {
        let store = create_test_store();
        store
            .with_session(|s| {
                for i in 0..4 {
                    s.insert_paper(2021, i, "q1", &format!("p{}.pdf", i))?;
                }
                Ok::<_, StorageError>(())
            })
            .unwrap();

        let limited = store
            .with_session(|s| s.unprocessed_papers(Some(2)))
            .unwrap();
        assert_eq!(limited.len(), 2);

        let all = store.with_session(|s| s.unprocessed_papers(None)).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_concept_name_unique_constraint() {
        let store = create_test_store();
        store
            .with_session(|s| s.insert_concept("Recursion", None, None))
            .unwrap();

        let err = store
            .with_session(|s| s.insert_concept("Recursion", Some("Algorithms"), None))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_fill_concept_fields_first_write_wins() {
        let store = create_test_store();
        let concept = store
            .with_session(|s| s.insert_concept("Recursion", None, None))
            .unwrap();

        store.with_session::<_, StorageError>(|s| {
            assert!(s.fill_concept_category(concept.id, "Algorithms")?);
            // Second fill must not overwrite
            assert!(!s.fill_concept_category(concept.id, "Theory")?);
            let reloaded = s.find_concept_by_name("Recursion")?.unwrap();
            assert_eq!(reloaded.category.as_deref(), Some("Algorithms"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_set_parent_only_when_unset() {
        let store = create_test_store();
        store.with_session::<_, StorageError>(|s| {
            let child = s.insert_concept("Merge Sort", None, None)?;
            let parent = s.insert_concept("Sorting", None, None)?;
            let other = s.insert_concept("Algorithms", None, None)?;

            assert!(s.set_concept_parent(child.id, parent.id)?);
            assert!(!s.set_concept_parent(child.id, other.id)?);
            assert_eq!(s.parent_of(child.id)?, Some(parent.id));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_relation_ordered_pair_unique() {
        let store = create_test_store();
        store.with_session::<_, StorageError>(|s| {
            let a = s.insert_concept("Recursion", None, None)?;
            let b = s.insert_concept("Induction", None, None)?;

            s.insert_relation(a.id, b.id, "related", 1.0)?;
            let err = s.insert_relation(a.id, b.id, "related", 0.5).unwrap_err();
            assert!(err.is_unique_violation());

            // Reverse pair is a distinct edge
            s.insert_relation(b.id, a.id, "related", 1.0)?;
            assert_eq!(s.relation_count()?, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_with_tx_rolls_back_on_error() {
        let store = create_test_store();
        let result: Result<(), StorageError> = store.with_tx(|s| {
            s.insert_concept("Doomed", None, None)?;
            Err(StorageError::DateParse("forced".to_string()))
        });
        assert!(result.is_err());

        let found = store
            .with_session(|s| s.find_concept_by_name("Doomed"))
            .unwrap();
        assert!(found.is_none(), "rollback must discard the insert");
    }

    #[test]
    fn test_with_tx_read_your_writes_before_commit() {
        let store = create_test_store();
        let paper = store
            .with_session(|s| s.insert_paper(2021, 7, "q8", "p.pdf"))
            .unwrap();

        store
            .with_tx::<_, StorageError>(|s| {
                let concept = s.insert_concept("Recursion", None, None)?;
                // Uncommitted concept is a valid FK target within the tx
                s.insert_occurrence(concept.id, paper.id, Some("q8"), None, 0.9)?;
                let visible = s.find_concept_by_name("Recursion")?;
                assert!(visible.is_some());
                Ok(())
            })
            .unwrap();

        let occurrences = store
            .with_session(|s| s.occurrences_for_paper(paper.id))
            .unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].question.as_deref(), Some("q8"));
    }

    #[test]
    fn test_concept_frequency_ranks_by_occurrences() {
        let store = create_test_store();
        store.with_session::<_, StorageError>(|s| {
            let paper = s.insert_paper(2021, 7, "q8", "p.pdf")?;
            let a = s.insert_concept("Recursion", None, None)?;
            let b = s.insert_concept("Induction", None, None)?;
            s.insert_occurrence(a.id, paper.id, None, None, 1.0)?;
            s.insert_occurrence(a.id, paper.id, None, None, 1.0)?;
            s.insert_occurrence(b.id, paper.id, None, None, 1.0)?;
            Ok(())
        })
        .unwrap();

        let ranked = store
            .with_session(|s| s.concept_frequency(None))
            .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0.name, "Recursion");
        assert_eq!(ranked[0].1, 2);

        let top1 = store
            .with_session(|s| s.concept_frequency(Some(1)))
            .unwrap();
        assert_eq!(top1.len(), 1);
    }

    #[test]
    fn test_wal_mode_enabled_at_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test-wal.db");
        let store = SqliteStore::open(&db_path).unwrap();

        let journal_mode: String = store
            .conn
            .lock()
            .unwrap()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(journal_mode, "wal");
    }
}
