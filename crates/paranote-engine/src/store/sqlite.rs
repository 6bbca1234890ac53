//! SQLite-backed [`PageStore`].
//!
//! Schema and write patterns mirror the persisted format: a `pages` table
//! with the PARA metadata and soft-delete flag, and a `blocks` table that
//! cascades on page deletion. Block full-replace runs as one transaction
//! so the write is atomic and idempotent under retry.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{BlockRecord, PageStore, StoreError};
use crate::blocks::BlockKind;
use crate::models::{Category, Page, PageId, PageMetadata, PageRef, TagSet};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    category TEXT DEFAULT 'inbox',
    deadline TEXT,
    tags TEXT DEFAULT '',
    is_deleted INTEGER DEFAULT 0,
    created_at INTEGER DEFAULT (unixepoch()),
    updated_at INTEGER DEFAULT (unixepoch())
);

CREATE TABLE IF NOT EXISTS blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    content TEXT,
    order_index INTEGER NOT NULL,
    FOREIGN KEY(page_id) REFERENCES pages(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_pages_category ON pages(category);
CREATE INDEX IF NOT EXISTS idx_blocks_page_id ON blocks(page_id);
CREATE INDEX IF NOT EXISTS idx_pages_updated_at ON pages(updated_at);
";

const PAGE_COLUMNS: &str = "id, title, category, deadline, tags, is_deleted, created_at, updated_at";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Ephemeral store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn page_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Page> {
        Ok(Page {
            id: PageId(row.get(0)?),
            title: row.get(1)?,
            category: Category::parse(&row.get::<_, Option<String>>(2)?.unwrap_or_default()),
            deadline: row.get(3)?,
            tags: TagSet::parse(&row.get::<_, Option<String>>(4)?.unwrap_or_default()),
            is_deleted: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn select_pages(&self, is_deleted: i64) -> Result<Vec<Page>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE is_deleted = ?1 \
             ORDER BY updated_at DESC, id DESC"
        ))?;
        let pages = stmt
            .query_map(params![is_deleted], Self::page_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    fn touch(&mut self, id: PageId, sql: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(sql, params![id.0])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

impl PageStore for SqliteStore {
    fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1"),
                params![id.0],
                Self::page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn get_blocks(&self, page_id: PageId) -> Result<Vec<BlockRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, type, content, order_index FROM blocks \
             WHERE page_id = ?1 ORDER BY order_index ASC",
        )?;
        let blocks = stmt
            .query_map(params![page_id.0], |row| {
                Ok(BlockRecord {
                    id: Some(row.get(0)?),
                    kind: BlockKind::parse(&row.get::<_, String>(1)?).unwrap_or_default(),
                    content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    order_index: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(blocks)
    }

    fn replace_blocks(
        &mut self,
        page_id: PageId,
        blocks: &[BlockRecord],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM pages WHERE id = ?1)",
            params![page_id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound(page_id));
        }

        tx.execute("DELETE FROM blocks WHERE page_id = ?1", params![page_id.0])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO blocks (page_id, type, content, order_index) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for block in blocks {
                stmt.execute(params![
                    page_id.0,
                    block.kind.as_str(),
                    block.content,
                    block.order_index,
                ])?;
            }
        }
        tx.commit()?;
        debug!(page = page_id.0, count = blocks.len(), "replaced blocks");
        Ok(())
    }

    fn update_page_metadata(&mut self, id: PageId, meta: &PageMetadata) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE pages SET title = ?1, category = ?2, deadline = ?3, tags = ?4, \
             updated_at = unixepoch() WHERE id = ?5",
            params![
                meta.title,
                meta.category.as_str(),
                meta.deadline,
                meta.tags.canonical(),
                id.0,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(page = id.0, "updated page metadata");
        Ok(())
    }

    fn create_page(&mut self, title: &str, category: Category) -> Result<PageId, StoreError> {
        self.conn.execute(
            "INSERT INTO pages (title, category) VALUES (?1, ?2)",
            params![title, category.as_str()],
        )?;
        let id = PageId(self.conn.last_insert_rowid());
        debug!(page = id.0, title, "created page");
        Ok(id)
    }

    fn soft_delete(&mut self, id: PageId) -> Result<(), StoreError> {
        self.touch(
            id,
            "UPDATE pages SET is_deleted = 1, updated_at = unixepoch() WHERE id = ?1",
        )
    }

    fn restore(&mut self, id: PageId) -> Result<(), StoreError> {
        self.touch(
            id,
            "UPDATE pages SET is_deleted = 0, updated_at = unixepoch() WHERE id = ?1",
        )
    }

    fn hard_delete(&mut self, id: PageId) -> Result<(), StoreError> {
        self.touch(id, "DELETE FROM pages WHERE id = ?1")
    }

    fn empty_trash(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM pages WHERE is_deleted = 1", [])?;
        Ok(())
    }

    fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        self.select_pages(0)
    }

    fn list_trash(&self) -> Result<Vec<Page>, StoreError> {
        self.select_pages(1)
    }

    fn list_page_titles(&self) -> Result<Vec<PageRef>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title FROM pages WHERE is_deleted = 0 \
             ORDER BY updated_at DESC, id DESC",
        )?;
        let refs = stmt
            .query_map([], |row| {
                Ok(PageRef {
                    id: PageId(row.get(0)?),
                    title: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: BlockKind, content: &str, order_index: i64) -> BlockRecord {
        BlockRecord {
            id: None,
            kind,
            content: content.to_string(),
            order_index,
        }
    }

    #[test]
    fn schema_initializes_on_open() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.list_pages().unwrap().is_empty());
    }

    #[test]
    fn create_update_and_get_page() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_page("Untitled", Category::Inbox).unwrap();

        let meta = PageMetadata {
            title: "Renamed".to_string(),
            category: Category::Projects,
            deadline: Some("2026-09-01".to_string()),
            tags: TagSet::parse("rust,notes"),
        };
        store.update_page_metadata(id, &meta).unwrap();

        let page = store.get_page(id).unwrap().unwrap();
        assert_eq!(page.title, "Renamed");
        assert_eq!(page.category, Category::Projects);
        assert_eq!(page.deadline.as_deref(), Some("2026-09-01"));
        assert_eq!(page.tags.canonical(), "rust,notes");
    }

    #[test]
    fn update_missing_page_errors() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let result = store.update_page_metadata(PageId(9), &PageMetadata::default());
        assert!(matches!(result, Err(StoreError::NotFound(PageId(9)))));
    }

    #[test]
    fn replace_blocks_round_trips_and_orders() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_page("p", Category::Inbox).unwrap();
        store
            .replace_blocks(
                id,
                &[
                    record(BlockKind::Heading, "second", 1),
                    record(BlockKind::Paragraph, "first", 0),
                ],
            )
            .unwrap();

        let stored = store.get_blocks(id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "first");
        assert_eq!(stored[0].kind, BlockKind::Paragraph);
        assert_eq!(stored[1].content, "second");
    }

    #[test]
    fn replace_blocks_twice_does_not_duplicate() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_page("p", Category::Inbox).unwrap();
        let blocks = vec![record(BlockKind::Paragraph, "x", 0)];
        store.replace_blocks(id, &blocks).unwrap();
        store.replace_blocks(id, &blocks).unwrap();
        assert_eq!(store.get_blocks(id).unwrap().len(), 1);
    }

    #[test]
    fn replace_blocks_missing_page_errors() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let result = store.replace_blocks(PageId(5), &[]);
        assert!(matches!(result, Err(StoreError::NotFound(PageId(5)))));
    }

    #[test]
    fn unknown_block_type_falls_back_to_paragraph() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_page("p", Category::Inbox).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO blocks (page_id, type, content, order_index) \
                 VALUES (?1, 'callout', 'text', 0)",
                params![id.0],
            )
            .unwrap();
        let stored = store.get_blocks(id).unwrap();
        assert_eq!(stored[0].kind, BlockKind::Paragraph);
        assert_eq!(stored[0].content, "text");
    }

    #[test]
    fn hard_delete_cascades_to_blocks() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_page("p", Category::Inbox).unwrap();
        store
            .replace_blocks(id, &[record(BlockKind::Paragraph, "x", 0)])
            .unwrap();
        store.hard_delete(id).unwrap();

        assert!(store.get_page(id).unwrap().is_none());
        let orphans: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn trash_lifecycle() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_page("p", Category::Inbox).unwrap();

        store.soft_delete(id).unwrap();
        assert!(store.list_pages().unwrap().is_empty());
        assert_eq!(store.list_trash().unwrap().len(), 1);
        assert!(store.list_page_titles().unwrap().is_empty());

        store.restore(id).unwrap();
        assert_eq!(store.list_pages().unwrap().len(), 1);

        store.soft_delete(id).unwrap();
        store.empty_trash().unwrap();
        assert!(store.get_page(id).unwrap().is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");

        let id = {
            let mut store = SqliteStore::open(&path).unwrap();
            let id = store.create_page("durable", Category::Areas).unwrap();
            store
                .replace_blocks(id, &[record(BlockKind::Paragraph, "kept", 0)])
                .unwrap();
            id
        };

        let store = SqliteStore::open(&path).unwrap();
        let page = store.get_page(id).unwrap().unwrap();
        assert_eq!(page.title, "durable");
        assert_eq!(store.get_blocks(id).unwrap()[0].content, "kept");
    }
}
