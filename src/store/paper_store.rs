use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Result, StoreError};
use crate::models::{ApiSource, Paper};

const PAPER_COLUMNS: &str = "id, title, abstract, authors, year, doi, pmid, pmcid, url, pdf_url,
     publication_type, api_source, citation_count, downloaded, notes, ai_notes,
     local_path, created_at";

/// A paper row together with the state only the store tracks
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPaper {
    pub paper: Paper,
    /// Artifact written by the last successful acquisition
    pub local_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed paper store
///
/// The connection lives inside the store and is closed when the store is
/// dropped. Each operation takes the connection for the duration of one
/// statement or transaction.
#[derive(Debug)]
pub struct PaperStore {
    conn: Mutex<Connection>,
}

impl PaperStore {
    /// Open or create the database at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init_schema()?;
        tracing::debug!("Opened paper store at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS papers (
                id               TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                abstract         TEXT NOT NULL DEFAULT '',
                authors          TEXT NOT NULL DEFAULT '[]',
                year             INTEGER,
                doi              TEXT,
                pmid             TEXT,
                pmcid            TEXT,
                url              TEXT NOT NULL DEFAULT '',
                pdf_url          TEXT,
                publication_type TEXT,
                api_source       TEXT NOT NULL,
                citation_count   INTEGER NOT NULL DEFAULT 0,
                downloaded       INTEGER NOT NULL DEFAULT 0,
                notes            TEXT,
                ai_notes         TEXT,
                local_path       TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS keywords (
                paper_id TEXT NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
                keyword  TEXT NOT NULL,
                PRIMARY KEY (paper_id, keyword)
            );

            CREATE INDEX IF NOT EXISTS idx_papers_source ON papers(api_source);
            CREATE INDEX IF NOT EXISTS idx_papers_doi    ON papers(doi);
            ",
        )?;
        Ok(())
    }

    // ─── Writes ─────────────────────────────────────────────

    /// Insert a paper, or refresh the metadata of an existing one
    ///
    /// Re-adding a paper keeps its notes, AI notes and download state.
    pub fn add_paper(&self, paper: &Paper, source: ApiSource) -> Result<String> {
        let conn = self.conn();
        upsert(&conn, paper, source)?;
        Ok(paper.id.clone())
    }

    /// Add a batch of papers in one transaction, tagging each with `keyword`
    pub fn add_papers(
        &self,
        papers: &[Paper],
        source: ApiSource,
        keyword: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(papers.len());
        for paper in papers {
            upsert(&tx, paper, source)?;
            if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
                insert_keyword(&tx, &paper.id, keyword)?;
            }
            ids.push(paper.id.clone());
        }
        tx.commit()?;
        tracing::info!("Stored {} {} papers", ids.len(), source);
        Ok(ids)
    }

    /// Record whether an artifact exists for `id`
    ///
    /// Marking a paper as not downloaded clears its local path.
    pub fn update_download_status(
        &self,
        id: &str,
        downloaded: bool,
        local_path: Option<&Path>,
    ) -> Result<()> {
        let path = local_path.map(|p| p.to_string_lossy().into_owned());
        let updated = self.conn().execute(
            "UPDATE papers
             SET downloaded = ?2,
                 local_path = CASE WHEN ?2 THEN COALESCE(?3, local_path) ELSE NULL END
             WHERE id = ?1",
            params![id, downloaded, path],
        )?;
        expect_one(updated, id)
    }

    pub fn update_notes(&self, id: &str, notes: &str) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE papers SET notes = ?2 WHERE id = ?1",
            params![id, notes],
        )?;
        expect_one(updated, id)
    }

    pub fn update_ai_notes(&self, id: &str, ai_notes: &str) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE papers SET ai_notes = ?2 WHERE id = ?1",
            params![id, ai_notes],
        )?;
        expect_one(updated, id)
    }

    /// Attach a search keyword to a stored paper
    pub fn add_keyword(&self, id: &str, keyword: &str) -> Result<()> {
        let conn = self.conn();
        if !exists(&conn, id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }
        insert_keyword(&conn, id, keyword.trim())
    }

    /// Delete a paper and its keywords. Returns whether a row was removed.
    pub fn delete_paper(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM papers WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // ─── Reads ──────────────────────────────────────────────

    pub fn get_paper_by_id(&self, id: &str) -> Result<Option<StoredPaper>> {
        let sql = format!("SELECT {} FROM papers WHERE id = ?1", PAPER_COLUMNS);
        let paper = self
            .conn()
            .query_row(&sql, params![id], row_to_paper)
            .optional()?;
        Ok(paper)
    }

    /// Every stored paper, newest first
    pub fn get_all_papers(&self) -> Result<Vec<StoredPaper>> {
        self.query_papers("1 = 1", params![])
    }

    pub fn get_papers_by_source(&self, source: ApiSource) -> Result<Vec<StoredPaper>> {
        self.query_papers("api_source = ?1", params![source.id()])
    }

    /// Papers without an acquired artifact
    pub fn get_pending_downloads(&self) -> Result<Vec<StoredPaper>> {
        self.query_papers("downloaded = 0", params![])
    }

    /// Case-insensitive substring search over title, abstract, authors and notes
    pub fn search(&self, query: &str) -> Result<Vec<StoredPaper>> {
        let query = query.trim();
        if query.is_empty() {
            return self.get_all_papers();
        }
        let pattern = format!("%{}%", escape_like(query));
        self.query_papers(
            "title LIKE ?1 ESCAPE '\\' OR abstract LIKE ?1 ESCAPE '\\'
             OR authors LIKE ?1 ESCAPE '\\' OR notes LIKE ?1 ESCAPE '\\'",
            params![pattern],
        )
    }

    /// Keywords attached to a paper, alphabetically
    pub fn keywords(&self, id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT keyword FROM keywords WHERE paper_id = ?1 ORDER BY keyword")?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_papers(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<StoredPaper>> {
        let sql = format!(
            "SELECT {} FROM papers WHERE {} ORDER BY created_at DESC, rowid DESC",
            PAPER_COLUMNS, filter
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, row_to_paper)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

fn upsert(conn: &Connection, paper: &Paper, source: ApiSource) -> Result<()> {
    if paper.id.trim().is_empty() {
        return Err(StoreError::InvalidPaper(format!(
            "'{}' has an empty identifier",
            paper.title
        )));
    }
    let authors = serde_json::to_string(&paper.authors)?;

    conn.execute(
        "INSERT INTO papers
            (id, title, abstract, authors, year, doi, pmid, pmcid, url, pdf_url,
             publication_type, api_source, citation_count, downloaded, notes, ai_notes,
             created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            abstract = excluded.abstract,
            authors = excluded.authors,
            year = excluded.year,
            doi = excluded.doi,
            pmid = excluded.pmid,
            pmcid = excluded.pmcid,
            url = excluded.url,
            pdf_url = excluded.pdf_url,
            publication_type = excluded.publication_type,
            api_source = excluded.api_source,
            citation_count = excluded.citation_count",
        params![
            paper.id,
            paper.title,
            paper.r#abstract,
            authors,
            paper.year,
            paper.doi,
            paper.pmid,
            paper.pmcid,
            paper.url,
            paper.pdf_url,
            paper.publication_type,
            source.id(),
            paper.citation_count,
            paper.downloaded,
            paper.notes,
            paper.ai_notes,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_keyword(conn: &Connection, id: &str, keyword: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO keywords (paper_id, keyword) VALUES (?1, ?2)",
        params![id, keyword],
    )?;
    Ok(())
}

fn exists(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn
        .prepare("SELECT 1 FROM papers WHERE id = ?1")?
        .exists(params![id])?)
}

fn expect_one(updated: usize, id: &str) -> Result<()> {
    if updated == 0 {
        Err(StoreError::NotFound(id.to_string()))
    } else {
        Ok(())
    }
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn row_to_paper(row: &Row<'_>) -> rusqlite::Result<StoredPaper> {
    let authors: String = row.get(3)?;
    let api_source: String = row.get(11)?;
    let api_source = api_source
        .parse::<ApiSource>()
        .map_err(|e| conversion_error(11, e))?;
    let created_at: String = row.get(17)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_error(17, e))?
        .with_timezone(&Utc);

    let paper = Paper {
        id: row.get(0)?,
        title: row.get(1)?,
        r#abstract: row.get(2)?,
        authors: serde_json::from_str(&authors).unwrap_or_default(),
        year: row.get(4)?,
        doi: row.get(5)?,
        pmid: row.get(6)?,
        pmcid: row.get(7)?,
        url: row.get(8)?,
        pdf_url: row.get(9)?,
        publication_type: row.get(10)?,
        api_source,
        citation_count: row.get(12)?,
        downloaded: row.get(13)?,
        notes: row.get(14)?,
        ai_notes: row.get(15)?,
    };

    Ok(StoredPaper {
        paper,
        local_path: row.get::<_, Option<String>>(16)?.map(PathBuf::from),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;

    fn paper(id: &str, title: &str) -> Paper {
        PaperBuilder::new(id, title, ApiSource::PubMed)
            .authors(vec!["Ada Lovelace".into(), "Alan Turing".into()])
            .abstract_text("Analytical engines at 100% capacity.")
            .year(Some(2021))
            .pmid("123")
            .citation_count(4)
            .build()
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("papers.db");
        let store = PaperStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_add_and_get() {
        let store = PaperStore::open_in_memory().unwrap();
        let id = store
            .add_paper(&paper("10.1abc", "Engines"), ApiSource::PubMed)
            .unwrap();
        assert_eq!(id, "10.1abc");

        let stored = store.get_paper_by_id("10.1abc").unwrap().unwrap();
        assert_eq!(stored.paper, paper("10.1abc", "Engines"));
        assert!(stored.local_path.is_none());
        assert!(store.get_paper_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_readd_keeps_user_state() {
        let store = PaperStore::open_in_memory().unwrap();
        store.add_paper(&paper("p1", "Old title"), ApiSource::PubMed).unwrap();
        store.update_notes("p1", "read this").unwrap();
        store
            .update_download_status("p1", true, Some(Path::new("/tmp/p1.pdf")))
            .unwrap();

        let mut refreshed = paper("p1", "New title");
        refreshed.citation_count = 9;
        store.add_paper(&refreshed, ApiSource::PubMed).unwrap();

        let stored = store.get_paper_by_id("p1").unwrap().unwrap();
        assert_eq!(stored.paper.title, "New title");
        assert_eq!(stored.paper.citation_count, 9);
        assert_eq!(stored.paper.notes.as_deref(), Some("read this"));
        assert!(stored.paper.downloaded);
        assert_eq!(stored.local_path, Some(PathBuf::from("/tmp/p1.pdf")));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_download_status_roundtrip() {
        let store = PaperStore::open_in_memory().unwrap();
        store.add_paper(&paper("p1", "A"), ApiSource::PubMed).unwrap();
        store.add_paper(&paper("p2", "B"), ApiSource::PubMed).unwrap();

        store
            .update_download_status("p1", true, Some(Path::new("downloads/p1.txt")))
            .unwrap();
        let pending: Vec<_> = store
            .get_pending_downloads()
            .unwrap()
            .into_iter()
            .map(|s| s.paper.id)
            .collect();
        assert_eq!(pending, vec!["p2".to_string()]);

        store.update_download_status("p1", false, None).unwrap();
        let stored = store.get_paper_by_id("p1").unwrap().unwrap();
        assert!(!stored.paper.downloaded);
        assert!(stored.local_path.is_none());
    }

    #[test]
    fn test_updates_on_missing_id() {
        let store = PaperStore::open_in_memory().unwrap();
        assert!(matches!(
            store.update_notes("ghost", "x"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_download_status("ghost", true, None),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.add_keyword("ghost", "malaria"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_ai_notes() {
        let store = PaperStore::open_in_memory().unwrap();
        store.add_paper(&paper("p1", "A"), ApiSource::PubMed).unwrap();
        store.update_ai_notes("p1", "Summary.").unwrap();
        let stored = store.get_paper_by_id("p1").unwrap().unwrap();
        assert_eq!(stored.paper.ai_notes.as_deref(), Some("Summary."));
    }

    #[test]
    fn test_by_source_and_search() {
        let store = PaperStore::open_in_memory().unwrap();
        store.add_paper(&paper("p1", "Malaria vaccines"), ApiSource::PubMed).unwrap();
        let crossref = PaperBuilder::new("10.2x", "Graph theory", ApiSource::Crossref)
            .doi("10.2/x")
            .build();
        store.add_paper(&crossref, ApiSource::Crossref).unwrap();
        store.update_notes("10.2x", "cite in chapter 3").unwrap();

        let pubmed = store.get_papers_by_source(ApiSource::PubMed).unwrap();
        assert_eq!(pubmed.len(), 1);
        assert_eq!(pubmed[0].paper.id, "p1");

        assert_eq!(store.search("MALARIA").unwrap().len(), 1);
        assert_eq!(store.search("turing").unwrap().len(), 1);
        assert_eq!(store.search("chapter").unwrap()[0].paper.id, "10.2x");
        assert_eq!(store.search("100%").unwrap().len(), 1);
        assert!(store.search("50%").unwrap().is_empty());
        assert_eq!(store.search("  ").unwrap().len(), 2);
    }

    #[test]
    fn test_batch_with_keyword_and_delete() {
        let store = PaperStore::open_in_memory().unwrap();
        let ids = store
            .add_papers(
                &[paper("p1", "A"), paper("p2", "B")],
                ApiSource::PubMed,
                Some("malaria"),
            )
            .unwrap();
        assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
        store.add_keyword("p1", "nets").unwrap();
        assert_eq!(store.keywords("p1").unwrap(), vec!["malaria", "nets"]);

        assert!(store.delete_paper("p1").unwrap());
        assert!(!store.delete_paper("p1").unwrap());
        assert!(store.keywords("p1").unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_rejects_empty_id() {
        let store = PaperStore::open_in_memory().unwrap();
        let blank = Paper::new(String::new(), "Untitled".into(), ApiSource::Crossref);
        assert!(matches!(
            store.add_paper(&blank, ApiSource::Crossref),
            Err(StoreError::InvalidPaper(_))
        ));
    }
}
