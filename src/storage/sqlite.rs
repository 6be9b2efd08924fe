//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    FrontierSnapshot, LinkRecord, PageRecord, Posting, RobotsEntry, SearchHit, StoredPage, Tier,
};
use crate::DriftnetError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file at `path`
    pub fn new(path: &Path) -> Result<Self, DriftnetError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, DriftnetError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, table: &str) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Index Writes =====

    fn upsert_page(&mut self, page: &PageRecord) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (url, title, description) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET title = excluded.title, description = excluded.description",
            params![page.url, page.title, page.description],
        )?;

        let id = self
            .conn
            .query_row("SELECT id FROM pages WHERE url = ?1", params![page.url], |row| {
                row.get(0)
            })?;
        Ok(id)
    }

    fn upsert_links(&mut self, links: &LinkRecord) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO links (url) VALUES (?1) ON CONFLICT(url) DO NOTHING",
            params![links.url],
        )?;
        let link_id: i64 =
            tx.query_row("SELECT id FROM links WHERE url = ?1", params![links.url], |row| {
                row.get(0)
            })?;

        tx.execute("DELETE FROM link_targets WHERE link_id = ?1", params![link_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO link_targets (link_id, position, target_url) VALUES (?1, ?2, ?3)",
            )?;
            for (position, target) in links.outgoing.iter().enumerate() {
                stmt.execute(params![link_id, position as i64, target])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn add_postings(&mut self, url: &str, counts: &HashMap<String, u32>) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO postings (word, url, count) VALUES (?1, ?2, ?3)
                 ON CONFLICT(word, url) DO UPDATE SET count = count + excluded.count",
            )?;
            for (word, count) in counts {
                stmt.execute(params![word, url, count])?;
            }
        }
        tx.commit()?;
        Ok(counts.len())
    }

    // ===== Reads =====

    fn get_page(&self, url: &str) -> StorageResult<Option<StoredPage>> {
        let page = self
            .conn
            .query_row(
                "SELECT id, url, title, description, rank FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(StoredPage {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        rank: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(page)
    }

    fn get_posting(&self, word: &str, url: &str) -> StorageResult<Option<u64>> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT count FROM postings WHERE word = ?1 AND url = ?2",
                params![word, url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(|c| c as u64))
    }

    fn get_postings(&self, url: &str) -> StorageResult<Vec<Posting>> {
        let mut stmt = self
            .conn
            .prepare("SELECT word, url, count FROM postings WHERE url = ?1 ORDER BY word")?;

        let postings = stmt
            .query_map(params![url], |row| {
                Ok(Posting {
                    word: row.get(0)?,
                    url: row.get(1)?,
                    count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(postings)
    }

    fn load_links(&self) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.url, t.target_url
             FROM links l LEFT JOIN link_targets t ON t.link_id = l.id
             ORDER BY l.id, t.position",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut records: Vec<LinkRecord> = Vec::new();
        for row in rows {
            let (url, target) = row?;
            let same_source = records.last().map(|r| r.url == url).unwrap_or(false);
            if !same_source {
                records.push(LinkRecord {
                    url,
                    outgoing: Vec::new(),
                });
            }
            if let (Some(target), Some(record)) = (target, records.last_mut()) {
                record.outgoing.push(target);
            }
        }

        Ok(records)
    }

    fn load_page_ids(&self) -> StorageResult<HashMap<String, i64>> {
        let mut stmt = self.conn.prepare("SELECT url, id FROM pages")?;
        let ids = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(ids)
    }

    // ===== Ranking =====

    fn update_ranks(&mut self, ranks: &[(i64, f64)]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare("UPDATE pages SET rank = ?1 WHERE id = ?2")?;
            for (id, rank) in ranks {
                written += stmt.execute(params![rank, id])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    // ===== Query =====

    fn search(
        &self,
        terms: &[String],
        require_all: bool,
        limit: usize,
    ) -> StorageResult<Vec<SearchHit>> {
        let terms: BTreeSet<&str> = terms.iter().map(String::as_str).collect();
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; terms.len()].join(", ");
        let required = terms.len() as i64;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut bound: Vec<&dyn ToSql> = terms.iter().map(|t| t as &dyn ToSql).collect();
        let having = if require_all {
            bound.push(&required);
            "HAVING COUNT(DISTINCT po.word) = ?"
        } else {
            ""
        };
        bound.push(&limit);

        let sql = format!(
            "SELECT p.url, p.title, p.description, p.rank,
                    COUNT(DISTINCT po.word) AS match_count,
                    SUM(po.count) AS total_word_count
             FROM postings po JOIN pages p ON p.url = po.url
             WHERE po.word IN ({})
             GROUP BY p.id
             {}
             ORDER BY p.rank IS NULL, p.rank DESC, total_word_count DESC
             LIMIT ?",
            placeholders, having
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let hits = stmt
            .query_map(bound.as_slice(), |row| {
                Ok(SearchHit {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    rank: row.get(3)?,
                    match_count: row.get::<_, i64>(4)? as u32,
                    total_word_count: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hits)
    }

    // ===== Frontier Snapshot =====

    fn save_frontier(&mut self, snapshot: &FrontierSnapshot) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM frontier_queue; DELETE FROM seen_urls; DELETE FROM domain_robots;",
        )?;
        {
            let mut queue = tx.prepare(
                "INSERT INTO frontier_queue (url, tier, position) VALUES (?1, ?2, ?3)",
            )?;
            for (tier, urls) in [(Tier::High, &snapshot.high), (Tier::Low, &snapshot.low)] {
                for (position, url) in urls.iter().enumerate() {
                    queue.execute(params![url, tier.to_db_string(), position as i64])?;
                }
            }

            let mut seen = tx.prepare("INSERT OR IGNORE INTO seen_urls (url) VALUES (?1)")?;
            for url in &snapshot.seen {
                seen.execute(params![url])?;
            }

            let mut robots = tx.prepare(
                "INSERT OR REPLACE INTO domain_robots (domain, robots_txt, fetched_at) VALUES (?1, ?2, ?3)",
            )?;
            for entry in &snapshot.robots {
                robots.execute(params![
                    entry.domain,
                    entry.robots_txt,
                    entry.fetched_at.to_rfc3339()
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_frontier(&self) -> StorageResult<Option<FrontierSnapshot>> {
        let mut snapshot = FrontierSnapshot::default();

        let mut stmt = self
            .conn
            .prepare("SELECT url, tier FROM frontier_queue ORDER BY tier, position")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (url, tier) = row?;
            match Tier::from_db_string(&tier) {
                Some(Tier::High) => snapshot.high.push(url),
                Some(Tier::Low) => snapshot.low.push(url),
                None => return Err(StorageError::Corrupt(format!("unknown tier '{}'", tier))),
            }
        }

        let mut stmt = self.conn.prepare("SELECT url FROM seen_urls")?;
        snapshot.seen = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT domain, robots_txt, fetched_at FROM domain_robots")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (domain, robots_txt, fetched_at) = row?;
            let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
                .map_err(|e| StorageError::Corrupt(format!("robots fetched_at: {}", e)))?
                .with_timezone(&Utc);
            snapshot.robots.push(RobotsEntry {
                domain,
                robots_txt,
                fetched_at,
            });
        }

        if snapshot.is_empty() {
            Ok(None)
        } else {
            Ok(Some(snapshot))
        }
    }

    fn clear_frontier(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "DELETE FROM frontier_queue; DELETE FROM seen_urls; DELETE FROM domain_robots;",
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        self.count("pages")
    }

    fn count_links(&self) -> StorageResult<u64> {
        self.count("links")
    }

    fn count_postings(&self) -> StorageResult<u64> {
        self.count("postings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, title: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            description: format!("about {}", title),
        }
    }

    fn counts(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(w, c)| (w.to_string(), *c)).collect()
    }

    #[test]
    fn test_upsert_page_overwrites_metadata_keeps_rank() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.upsert_page(&page("https://a.com/", "First")).unwrap();
        storage.update_ranks(&[(id, 0.4)]).unwrap();

        let again = storage.upsert_page(&page("https://a.com/", "Second")).unwrap();
        assert_eq!(id, again);

        let stored = storage.get_page("https://a.com/").unwrap().unwrap();
        assert_eq!(stored.title, "Second");
        assert_eq!(stored.description, "about Second");
        assert_eq!(stored.rank, Some(0.4));
        assert_eq!(storage.count_pages().unwrap(), 1);
    }

    #[test]
    fn test_new_page_has_no_rank() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_page(&page("https://a.com/", "A")).unwrap();
        assert_eq!(storage.get_page("https://a.com/").unwrap().unwrap().rank, None);
        assert!(storage.get_page("https://missing.com/").unwrap().is_none());
    }

    #[test]
    fn test_upsert_links_replaces_outgoing() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .upsert_links(&LinkRecord {
                url: "https://a.com/".to_string(),
                outgoing: vec!["https://b.com/".to_string(), "https://c.com/".to_string()],
            })
            .unwrap();
        storage
            .upsert_links(&LinkRecord {
                url: "https://a.com/".to_string(),
                outgoing: vec!["https://d.com/".to_string()],
            })
            .unwrap();

        let links = storage.load_links().unwrap();
        assert_eq!(
            links,
            vec![LinkRecord {
                url: "https://a.com/".to_string(),
                outgoing: vec!["https://d.com/".to_string()],
            }]
        );
        assert_eq!(storage.count_links().unwrap(), 1);
    }

    #[test]
    fn test_load_links_keeps_order_and_empty_records() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let ordered = vec![
            "https://z.com/".to_string(),
            "https://m.com/".to_string(),
            "https://b.com/".to_string(),
        ];
        storage
            .upsert_links(&LinkRecord {
                url: "https://a.com/".to_string(),
                outgoing: ordered.clone(),
            })
            .unwrap();
        storage
            .upsert_links(&LinkRecord {
                url: "https://leaf.com/".to_string(),
                outgoing: vec![],
            })
            .unwrap();

        let links = storage.load_links().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].outgoing, ordered);
        assert!(links[1].outgoing.is_empty());
    }

    #[test]
    fn test_add_postings_accumulates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = "https://a.com/";

        storage.add_postings(url, &counts(&[("cat", 2), ("sat", 1)])).unwrap();
        storage.add_postings(url, &counts(&[("cat", 2), ("mat", 5)])).unwrap();

        assert_eq!(storage.get_posting("cat", url).unwrap(), Some(4));
        assert_eq!(storage.get_posting("sat", url).unwrap(), Some(1));
        assert_eq!(storage.get_posting("mat", url).unwrap(), Some(5));
        assert_eq!(storage.get_posting("dog", url).unwrap(), None);

        let words: Vec<String> = storage
            .get_postings(url)
            .unwrap()
            .into_iter()
            .map(|p| p.word)
            .collect();
        assert_eq!(words, vec!["cat", "mat", "sat"]);
    }

    #[test]
    fn test_update_ranks_skips_missing_ids() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.upsert_page(&page("https://a.com/", "A")).unwrap();

        let written = storage.update_ranks(&[(a, 0.7), (9_999, 0.3)]).unwrap();
        assert_eq!(written, 1);
        assert_eq!(storage.get_page("https://a.com/").unwrap().unwrap().rank, Some(0.7));
    }

    #[test]
    fn test_load_page_ids() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.upsert_page(&page("https://a.com/", "A")).unwrap();
        let b = storage.upsert_page(&page("https://b.com/", "B")).unwrap();

        let ids = storage.load_page_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids["https://a.com/"], a);
        assert_eq!(ids["https://b.com/"], b);
    }

    fn search_fixture() -> SqliteStorage {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.upsert_page(&page("https://a.com/", "A")).unwrap();
        let b = storage.upsert_page(&page("https://b.com/", "B")).unwrap();
        storage.upsert_page(&page("https://c.com/", "C")).unwrap();

        storage.add_postings("https://a.com/", &counts(&[("rust", 1), ("crawler", 1)])).unwrap();
        storage.add_postings("https://b.com/", &counts(&[("rust", 9)])).unwrap();
        storage.add_postings("https://c.com/", &counts(&[("rust", 3), ("crawler", 4)])).unwrap();
        // Postings without a page are not returned
        storage.add_postings("https://orphan.com/", &counts(&[("rust", 50)])).unwrap();

        storage.update_ranks(&[(a, 0.2), (b, 0.5)]).unwrap();
        storage
    }

    #[test]
    fn test_search_any_orders_by_rank_then_count() {
        let storage = search_fixture();
        let terms = vec!["rust".to_string(), "crawler".to_string()];

        let hits = storage.search(&terms, false, 10).unwrap();
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com/", "https://a.com/", "https://c.com/"]);

        let c = &hits[2];
        assert_eq!(c.match_count, 2);
        assert_eq!(c.total_word_count, 7);
        assert_eq!(c.rank, None);
        assert_eq!(c.title, "C");
    }

    #[test]
    fn test_search_unbounded_limit() {
        let storage = search_fixture();
        let terms = vec!["crawler".to_string()];

        let hits = storage.search(&terms, false, usize::MAX).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = storage.search(&terms, true, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://a.com/");
    }

    #[test]
    fn test_search_all_requires_every_term() {
        let storage = search_fixture();
        let terms = vec!["rust".to_string(), "crawler".to_string(), "rust".to_string()];

        let hits = storage.search(&terms, true, 10).unwrap();
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/", "https://c.com/"]);
    }

    #[test]
    fn test_search_limit_and_empty_terms() {
        let storage = search_fixture();
        assert_eq!(storage.search(&["rust".to_string()], false, 1).unwrap().len(), 1);
        assert!(storage.search(&[], false, 10).unwrap().is_empty());
    }

    #[test]
    fn test_frontier_snapshot_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.load_frontier().unwrap().is_none());

        let fetched_at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let snapshot = FrontierSnapshot {
            high: vec!["https://x.com/".to_string()],
            low: vec!["https://a.com/2".to_string(), "https://a.com/1".to_string()],
            seen: vec![
                "https://a.com/".to_string(),
                "https://a.com/1".to_string(),
                "https://a.com/2".to_string(),
                "https://x.com/".to_string(),
            ],
            robots: vec![RobotsEntry {
                domain: "a.com".to_string(),
                robots_txt: "User-agent: *\nDisallow: /p".to_string(),
                fetched_at,
            }],
        };
        storage.save_frontier(&snapshot).unwrap();

        let mut loaded = storage.load_frontier().unwrap().unwrap();
        loaded.seen.sort();
        assert_eq!(loaded, snapshot);

        storage.clear_frontier().unwrap();
        assert!(storage.load_frontier().unwrap().is_none());
    }

    #[test]
    fn test_save_frontier_replaces_previous() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = FrontierSnapshot {
            high: vec!["https://old.com/".to_string()],
            seen: vec!["https://old.com/".to_string()],
            ..Default::default()
        };
        let second = FrontierSnapshot {
            low: vec!["https://new.com/a".to_string()],
            seen: vec!["https://new.com/a".to_string()],
            ..Default::default()
        };
        storage.save_frontier(&first).unwrap();
        storage.save_frontier(&second).unwrap();

        assert_eq!(storage.load_frontier().unwrap().unwrap(), second);
    }

    #[test]
    fn test_file_backed_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftnet.db");
        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.upsert_page(&page("https://a.com/", "A")).unwrap();
        }
        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_pages().unwrap(), 1);
    }
}
