//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the QuoteStore trait.
//! Every write runs inside a `BEGIN IMMEDIATE` transaction, which takes the
//! database write lock up front so check-then-insert sequences cannot interleave
//! with another writer.

use crate::session::SessionStats;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{QuoteStore, StorageError, StorageResult};
use crate::storage::{
    normalize_author, normalize_tag, IngestResult, SessionRecord, SessionStatus, StoreStats,
    StoredQuote,
};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Params, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// Separator used when tag labels are concatenated in a single column
const TAG_SEPARATOR: char = '\u{1f}';

/// Column list shared by every quote query; `?`-parameters are appended by callers
const QUOTE_SELECT: &str = "
    SELECT q.id, q.text, a.name, q.source_url, q.scraped_at,
           (SELECT GROUP_CONCAT(t.name, char(31))
              FROM quote_tags qt JOIN tags t ON t.id = qt.tag_id
             WHERE qt.quote_id = q.id)
      FROM quotes q
      JOIN authors a ON a.id = q.author_id";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a store at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Another writer holding the lock makes us wait instead of failing
        conn.busy_timeout(Duration::from_secs(30))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store (tests, dry runs)
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_quotes<P: Params>(&self, filter: &str, args: P) -> StorageResult<Vec<StoredQuote>> {
        let sql = format!("{} {}", QUOTE_SELECT, filter);
        let mut stmt = self.conn.prepare(&sql)?;

        let quotes = stmt
            .query_map(args, |row| {
                let tags: Option<String> = row.get(5)?;
                Ok(StoredQuote {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    author: row.get(2)?,
                    source_url: row.get(3)?,
                    scraped_at: row.get(4)?,
                    tags: split_tags(tags),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(quotes)
    }
}

impl QuoteStore for SqliteStore {
    // ===== Natural-key upserts =====

    fn upsert_author(&mut self, name: &str) -> StorageResult<i64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = upsert_author_in(&tx, name)?;
        tx.commit()?;
        Ok(id)
    }

    fn upsert_tag(&mut self, label: &str) -> StorageResult<i64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = upsert_tag_in(&tx, label)?;
        tx.commit()?;
        Ok(id)
    }

    // ===== Ingestion =====

    fn ingest_quote(
        &mut self,
        text: &str,
        author_name: &str,
        tag_labels: &[String],
        source_url: Option<&str>,
    ) -> StorageResult<IngestResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StorageError::InvalidRecord(
                "quote text is empty".to_string(),
            ));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let author_id = upsert_author_in(&tx, author_name)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM quotes WHERE text = ?1",
                params![text],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(quote_id) = existing {
            tx.commit()?;
            tracing::debug!("Quote {} already stored, skipping", quote_id);
            return Ok(IngestResult::Duplicate);
        }

        let quote_id = match insert_quote_in(&tx, text, author_id, source_url)? {
            Some(quote_id) => quote_id,
            None => {
                // Lost an insert race against another writer
                tx.commit()?;
                tracing::debug!("Quote insert hit the uniqueness constraint, treating as duplicate");
                return Ok(IngestResult::Duplicate);
            }
        };

        let mut labels: Vec<String> = tag_labels
            .iter()
            .map(|label| normalize_tag(label))
            .filter(|label| !label.is_empty())
            .collect();
        labels.sort();
        labels.dedup();

        for label in &labels {
            let tag_id = upsert_tag_in(&tx, label)?;
            tx.execute(
                "INSERT OR IGNORE INTO quote_tags (quote_id, tag_id) VALUES (?1, ?2)",
                params![quote_id, tag_id],
            )
            .map_err(classify_error)?;
        }

        tx.commit()?;

        Ok(IngestResult::Added { quote_id })
    }

    // ===== Reporting =====

    fn stats(&self) -> StorageResult<StoreStats> {
        let count = |table: &str| -> StorageResult<u64> {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table),
                [],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        };

        Ok(StoreStats {
            author_count: count("authors")?,
            quote_count: count("quotes")?,
            tag_count: count("tags")?,
        })
    }

    fn top_authors(&self, n: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.name, COUNT(q.id) AS quote_count
               FROM authors a JOIN quotes q ON q.author_id = a.id
              GROUP BY a.id
              ORDER BY quote_count DESC, a.name ASC
              LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![n as i64], |row| {
                Ok((row.get(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn top_tags(&self, n: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name, COUNT(qt.quote_id) AS usage_count
               FROM tags t JOIN quote_tags qt ON qt.tag_id = t.id
              GROUP BY t.id
              ORDER BY usage_count DESC, t.name ASC
              LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![n as i64], |row| {
                Ok((row.get(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn all_quotes(&self) -> StorageResult<Vec<StoredQuote>> {
        self.query_quotes("ORDER BY q.scraped_at DESC, q.id DESC", [])
    }

    fn quotes_by_author(&self, pattern: &str) -> StorageResult<Vec<StoredQuote>> {
        self.query_quotes(
            "WHERE a.name LIKE ?1 ESCAPE '\\' ORDER BY q.id",
            params![like_pattern(pattern)],
        )
    }

    fn quotes_by_tag(&self, pattern: &str) -> StorageResult<Vec<StoredQuote>> {
        self.query_quotes(
            "WHERE EXISTS (SELECT 1 FROM quote_tags qt JOIN tags t ON t.id = qt.tag_id
                            WHERE qt.quote_id = q.id AND t.name LIKE ?1 ESCAPE '\\')
             ORDER BY q.id",
            params![like_pattern(pattern)],
        )
    }

    fn search_quotes(&self, keyword: &str) -> StorageResult<Vec<StoredQuote>> {
        self.query_quotes(
            "WHERE q.text LIKE ?1 ESCAPE '\\' ORDER BY q.id",
            params![like_pattern(keyword)],
        )
    }

    fn random_quote(&self) -> StorageResult<Option<StoredQuote>> {
        let mut quotes = self.query_quotes("ORDER BY RANDOM() LIMIT 1", [])?;
        Ok(quotes.pop())
    }

    fn tags_for_quote(&self, quote_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM quote_tags qt JOIN tags t ON t.id = qt.tag_id
              WHERE qt.quote_id = ?1 ORDER BY t.name",
        )?;

        let tags = stmt
            .query_map(params![quote_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    // ===== Session Management =====

    fn start_session(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scrape_sessions (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, SessionStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_session(
        &mut self,
        session_id: i64,
        stats: &SessionStats,
        status: SessionStatus,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE scrape_sessions
                SET finished_at = ?1, status = ?2, pages_fetched = ?3, records_added = ?4,
                    duplicates_skipped = ?5, errors = ?6
              WHERE id = ?7",
            params![
                now,
                status.to_db_string(),
                stats.pages_fetched as i64,
                stats.records_added as i64,
                stats.duplicates_skipped as i64,
                stats.errors() as i64,
                session_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, pages_fetched,
                    records_added, duplicates_skipped, errors
               FROM scrape_sessions WHERE id = ?1",
        )?;

        let session = stmt
            .query_row(params![session_id], |row| {
                Ok(SessionRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: SessionStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(SessionStatus::Running),
                    pages_fetched: row.get::<_, i64>(5)? as u64,
                    records_added: row.get::<_, i64>(6)? as u64,
                    duplicates_skipped: row.get::<_, i64>(7)? as u64,
                    errors: row.get::<_, i64>(8)? as u64,
                })
            })
            .optional()?;

        session.ok_or(StorageError::SessionNotFound(session_id))
    }

    fn count_sessions(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scrape_sessions", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Resolves an author id by name inside an open transaction
fn upsert_author_in(conn: &Connection, name: &str) -> StorageResult<i64> {
    let name = normalize_author(name);
    if name.is_empty() {
        return Err(StorageError::InvalidRecord(
            "author name is empty".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO authors (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, now],
    )
    .map_err(classify_error)?;

    let id = conn.query_row(
        "SELECT id FROM authors WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Resolves a tag id by label inside an open transaction
fn upsert_tag_in(conn: &Connection, label: &str) -> StorageResult<i64> {
    let label = normalize_tag(label);
    if label.is_empty() {
        return Err(StorageError::InvalidRecord("tag label is empty".to_string()));
    }

    conn.execute(
        "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![label],
    )
    .map_err(classify_error)?;

    let id = conn.query_row(
        "SELECT id FROM tags WHERE name = ?1",
        params![label],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Inserts a quote row; `None` when a row with the same text already exists
fn insert_quote_in(
    conn: &Connection,
    text: &str,
    author_id: i64,
    source_url: Option<&str>,
) -> StorageResult<Option<i64>> {
    let now = Utc::now().to_rfc3339();
    let inserted = conn.execute(
        "INSERT INTO quotes (text, author_id, source_url, scraped_at) VALUES (?1, ?2, ?3, ?4)",
        params![text, author_id, source_url, now],
    );

    match inserted {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(classify_error(e)),
    }
}

/// True when SQLite rejected a write because a UNIQUE or PRIMARY KEY already exists
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Lifts constraint failures into their own variant so callers can tell them apart
fn classify_error(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(err.to_string())
        }
        _ => StorageError::Sqlite(err),
    }
}

/// Wraps user input for a substring LIKE match, escaping wildcards
fn like_pattern(input: &str) -> String {
    let escaped = input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn split_tags(joined: Option<String>) -> Vec<String> {
    let mut tags: Vec<String> = joined
        .map(|s| s.split(TAG_SEPARATOR).map(str::to_string).collect())
        .unwrap_or_default();
    tags.sort();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn count(store: &SqliteStore, sql: &str) -> i64 {
        store.conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_create_in_memory() {
        let store = SqliteStore::new_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_upsert_author_is_stable() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let first = store.upsert_author("Mark Twain").unwrap();
        for _ in 0..5 {
            assert_eq!(store.upsert_author("Mark Twain").unwrap(), first);
        }

        assert_eq!(count(&store, "SELECT COUNT(*) FROM authors"), 1);
    }

    #[test]
    fn test_upsert_author_normalizes_whitespace_but_keeps_case() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let a = store.upsert_author("  Mark   Twain ").unwrap();
        let b = store.upsert_author("Mark Twain").unwrap();
        let c = store.upsert_author("mark twain").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_upsert_tag_is_stable_and_normalized() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let a = store.upsert_tag("Be Yourself").unwrap();
        let b = store.upsert_tag("be-yourself").unwrap();

        assert_eq!(a, b);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM tags"), 1);
        assert!(matches!(
            store.upsert_tag("   "),
            Err(StorageError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_ingest_twice_is_added_then_duplicate() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let first = store
            .ingest_quote("A quote.", "Einstein", &tags(&["wisdom"]), None)
            .unwrap();
        let second = store
            .ingest_quote("A quote.", "Einstein", &tags(&["wisdom"]), None)
            .unwrap();

        assert!(first.is_added());
        assert_eq!(second, IngestResult::Duplicate);
        assert_eq!(
            store.stats().unwrap(),
            StoreStats {
                author_count: 1,
                quote_count: 1,
                tag_count: 1
            }
        );
    }

    #[test]
    fn test_duplicate_keeps_first_tag_set() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let quote_id = match store
            .ingest_quote("A quote.", "Einstein", &tags(&["wisdom"]), None)
            .unwrap()
        {
            IngestResult::Added { quote_id } => quote_id,
            IngestResult::Duplicate => panic!("first ingestion must add"),
        };

        let again = store
            .ingest_quote("A quote.", "Einstein", &tags(&["science", "life"]), None)
            .unwrap();

        assert_eq!(again, IngestResult::Duplicate);
        assert_eq!(store.tags_for_quote(quote_id).unwrap(), vec!["wisdom"]);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM tags"), 1);
    }

    #[test]
    fn test_duplicate_text_from_different_author_is_still_duplicate() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        store
            .ingest_quote("Same words.", "Author One", &[], None)
            .unwrap();
        let result = store
            .ingest_quote("Same words.", "Author Two", &[], None)
            .unwrap();

        assert_eq!(result, IngestResult::Duplicate);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM quotes"), 1);
    }

    #[test]
    fn test_repeated_tag_labels_link_once() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        store
            .ingest_quote(
                "Tagged twice.",
                "Someone",
                &tags(&["Love", "love", " love ", ""]),
                None,
            )
            .unwrap();

        assert_eq!(count(&store, "SELECT COUNT(*) FROM tags"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM quote_tags"), 1);
    }

    #[test]
    fn test_invalid_records_are_rejected_without_writes() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        assert!(matches!(
            store.ingest_quote("  ", "Einstein", &[], None),
            Err(StorageError::InvalidRecord(_))
        ));
        assert!(matches!(
            store.ingest_quote("A quote.", " ", &tags(&["wisdom"]), None),
            Err(StorageError::InvalidRecord(_))
        ));

        assert_eq!(store.stats().unwrap(), StoreStats::default());
    }

    #[test]
    fn test_referential_integrity_holds() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        store
            .ingest_quote("One.", "A", &tags(&["x", "y"]), Some("https://q/page/1/"))
            .unwrap();
        store
            .ingest_quote("Two.", "B", &tags(&["y", "z"]), Some("https://q/page/1/"))
            .unwrap();
        store
            .ingest_quote("One.", "C", &tags(&["w"]), Some("https://q/page/2/"))
            .unwrap();

        let orphan_links = count(
            &store,
            "SELECT COUNT(*) FROM quote_tags qt
               LEFT JOIN quotes q ON q.id = qt.quote_id
               LEFT JOIN tags t ON t.id = qt.tag_id
              WHERE q.id IS NULL OR t.id IS NULL",
        );
        let orphan_quotes = count(
            &store,
            "SELECT COUNT(*) FROM quotes q LEFT JOIN authors a ON a.id = q.author_id
              WHERE a.id IS NULL",
        );
        let max_per_text = count(
            &store,
            "SELECT COALESCE(MAX(c), 0) FROM (SELECT COUNT(*) AS c FROM quotes GROUP BY text)",
        );

        assert_eq!(orphan_links, 0);
        assert_eq!(orphan_quotes, 0);
        assert_eq!(max_per_text, 1);
    }

    #[test]
    fn test_unique_violation_is_recognized() {
        let store = SqliteStore::new_in_memory().unwrap();

        store
            .conn
            .execute(
                "INSERT INTO authors (name, created_at) VALUES ('Einstein', 'now')",
                [],
            )
            .unwrap();
        let err = store
            .conn
            .execute(
                "INSERT INTO authors (name, created_at) VALUES ('Einstein', 'now')",
                [],
            )
            .unwrap_err();

        assert!(is_unique_violation(&err));
        assert!(matches!(
            classify_error(err),
            StorageError::ConstraintViolation(_)
        ));
    }

    #[test]
    fn test_insert_conflict_after_lookup_is_a_duplicate() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        store
            .ingest_quote("Raced.", "Einstein", &tags(&["first"]), None)
            .unwrap();
        let author_id = store.upsert_author("Einstein").unwrap();

        // Another writer's row landed after our lookup found nothing
        let tx = store
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();
        let inserted = insert_quote_in(&tx, "Raced.", author_id, Some("https://x/")).unwrap();
        tx.commit().unwrap();

        assert_eq!(inserted, None);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM quotes"), 1);
        assert_eq!(store.tags_for_quote(1).unwrap(), vec!["first".to_string()]);
    }

    #[test]
    fn test_insert_quote_returns_new_id() {
        let mut store = SqliteStore::new_in_memory().unwrap();
        let author_id = store.upsert_author("Einstein").unwrap();

        let inserted = insert_quote_in(&store.conn, "Fresh.", author_id, None).unwrap();

        assert!(inserted.is_some());
        assert!(matches!(
            insert_quote_in(&store.conn, "Orphan.", 999, None),
            Err(StorageError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_foreign_key_violation_is_not_a_duplicate() {
        let store = SqliteStore::new_in_memory().unwrap();

        let err = store
            .conn
            .execute(
                "INSERT INTO quotes (text, author_id, scraped_at) VALUES ('Orphan.', 999, 'now')",
                [],
            )
            .unwrap_err();

        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_top_authors_and_tags_ordering() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        store.ingest_quote("q1", "Zed", &tags(&["b"]), None).unwrap();
        store.ingest_quote("q2", "Zed", &tags(&["a", "b"]), None).unwrap();
        store.ingest_quote("q3", "Amy", &tags(&["a"]), None).unwrap();
        store.ingest_quote("q4", "Bob", &tags(&["c"]), None).unwrap();

        assert_eq!(
            store.top_authors(10).unwrap(),
            vec![
                ("Zed".to_string(), 2),
                ("Amy".to_string(), 1),
                ("Bob".to_string(), 1)
            ]
        );
        assert_eq!(
            store.top_tags(2).unwrap(),
            vec![("a".to_string(), 2), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn test_query_helpers() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        store
            .ingest_quote(
                "The world as we have created it is a process of our thinking.",
                "Albert Einstein",
                &tags(&["change", "thinking"]),
                Some("https://quotes.toscrape.com/"),
            )
            .unwrap();
        store
            .ingest_quote("100% sure_thing", "Jane Austen", &tags(&["humor"]), None)
            .unwrap();

        let by_author = store.quotes_by_author("einstein").unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].tags, vec!["change", "thinking"]);
        assert_eq!(
            by_author[0].source_url.as_deref(),
            Some("https://quotes.toscrape.com/")
        );

        assert_eq!(store.quotes_by_tag("hum").unwrap().len(), 1);
        assert_eq!(store.search_quotes("PROCESS").unwrap().len(), 1);
        assert_eq!(store.search_quotes("100%").unwrap().len(), 1);
        assert!(store.search_quotes("0%x").unwrap().is_empty());
        assert_eq!(store.all_quotes().unwrap().len(), 2);
        assert!(store.random_quote().unwrap().is_some());
    }

    #[test]
    fn test_random_quote_on_empty_store() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.random_quote().unwrap().is_none());
    }

    #[test]
    fn test_session_lifecycle() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        let session_id = store.start_session("abc123").unwrap();
        let started = store.get_session(session_id).unwrap();
        assert_eq!(started.status, SessionStatus::Running);
        assert!(started.finished_at.is_none());

        let stats = SessionStats {
            pages_fetched: 3,
            records_added: 25,
            duplicates_skipped: 5,
            fetch_errors: 1,
            ..SessionStats::default()
        };
        store
            .finish_session(session_id, &stats, SessionStatus::Completed)
            .unwrap();

        let finished = store.get_session(session_id).unwrap();
        assert_eq!(finished.status, SessionStatus::Completed);
        assert_eq!(finished.pages_fetched, 3);
        assert_eq!(finished.records_added, 25);
        assert_eq!(finished.duplicates_skipped, 5);
        assert_eq!(finished.errors, 1);
        assert!(finished.finished_at.is_some());
        assert_eq!(store.count_sessions().unwrap(), 1);
    }

    #[test]
    fn test_unknown_session() {
        let mut store = SqliteStore::new_in_memory().unwrap();

        assert!(matches!(
            store.get_session(42),
            Err(StorageError::SessionNotFound(42))
        ));
        assert!(matches!(
            store.finish_session(42, &SessionStats::default(), SessionStatus::Aborted),
            Err(StorageError::SessionNotFound(42))
        ));
    }

    #[test]
    fn test_file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");

        {
            let mut store = SqliteStore::new(&path).unwrap();
            store
                .ingest_quote("Persisted.", "Writer", &tags(&["disk"]), None)
                .unwrap();
        }

        let mut reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.stats().unwrap().quote_count, 1);
        assert_eq!(
            reopened
                .ingest_quote("Persisted.", "Writer", &tags(&["disk"]), None)
                .unwrap(),
            IngestResult::Duplicate
        );
    }
}
