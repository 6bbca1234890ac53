//! Page store: persistence seam for page metadata and blocks.
//!
//! The editing engine and autosave scheduler only ever talk to the
//! [`PageStore`] trait. Two implementations are provided: an in-memory
//! store for tests and embedding, and a SQLite store (`sqlite` module).

pub mod sqlite;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::blocks::BlockKind;
use crate::models::{Category, Page, PageId, PageMetadata, PageRef, TagSet};

pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Page not found: {0}")]
    NotFound(PageId),
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A block as exchanged with the store. `id` is filled on reads and
/// ignored on writes; a full-replace reassigns storage identity.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub id: Option<i64>,
    pub kind: BlockKind,
    pub content: String,
    pub order_index: i64,
}

/// Persistence contract consumed by the editing engine, the autosave
/// scheduler and wiki-link resolution.
pub trait PageStore {
    fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError>;

    /// Blocks for a page, ordered by `order_index`.
    fn get_blocks(&self, page_id: PageId) -> Result<Vec<BlockRecord>, StoreError>;

    /// Atomic delete-all-then-insert-all for one page. Idempotent: two
    /// identical calls leave the stored set equal to the input.
    fn replace_blocks(
        &mut self,
        page_id: PageId,
        blocks: &[BlockRecord],
    ) -> Result<(), StoreError>;

    /// Atomic metadata update; refreshes `updated_at`.
    fn update_page_metadata(&mut self, id: PageId, meta: &PageMetadata) -> Result<(), StoreError>;

    fn create_page(&mut self, title: &str, category: Category) -> Result<PageId, StoreError>;

    fn soft_delete(&mut self, id: PageId) -> Result<(), StoreError>;
    fn restore(&mut self, id: PageId) -> Result<(), StoreError>;
    fn hard_delete(&mut self, id: PageId) -> Result<(), StoreError>;
    fn empty_trash(&mut self) -> Result<(), StoreError>;

    /// Non-deleted pages, most recently updated first.
    fn list_pages(&self) -> Result<Vec<Page>, StoreError>;

    /// Soft-deleted pages, most recently updated first.
    fn list_trash(&self) -> Result<Vec<Page>, StoreError>;

    /// The wiki-link resolution snapshot: `{id, title}` of every
    /// non-deleted page.
    fn list_page_titles(&self) -> Result<Vec<PageRef>, StoreError>;
}

/// Find the page titled exactly `date` (ISO `YYYY-MM-DD`) or create it in
/// the inbox. Used for the daily-note workflow.
pub fn open_or_create_daily(
    store: &mut dyn PageStore,
    date: &str,
) -> Result<PageId, StoreError> {
    if let Some(existing) = store
        .list_page_titles()?
        .into_iter()
        .find(|page| page.title == date)
    {
        return Ok(existing.id);
    }
    store.create_page(date, Category::Inbox)
}

pub(crate) fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}

/// In-memory store used by tests and lightweight embeddings.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pages: BTreeMap<i64, Page>,
    blocks: BTreeMap<i64, Vec<BlockRecord>>,
    next_page_id: i64,
    next_block_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_mut(&mut self, id: PageId) -> Result<&mut Page, StoreError> {
        self.pages.get_mut(&id.0).ok_or(StoreError::NotFound(id))
    }

    fn sorted(mut pages: Vec<Page>) -> Vec<Page> {
        pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.0.cmp(&a.id.0)));
        pages
    }
}

impl PageStore for MemoryStore {
    fn get_page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
        Ok(self.pages.get(&id.0).cloned())
    }

    fn get_blocks(&self, page_id: PageId) -> Result<Vec<BlockRecord>, StoreError> {
        let mut blocks = self.blocks.get(&page_id.0).cloned().unwrap_or_default();
        blocks.sort_by_key(|block| block.order_index);
        Ok(blocks)
    }

    fn replace_blocks(
        &mut self,
        page_id: PageId,
        blocks: &[BlockRecord],
    ) -> Result<(), StoreError> {
        if !self.pages.contains_key(&page_id.0) {
            return Err(StoreError::NotFound(page_id));
        }
        let mut stored = Vec::with_capacity(blocks.len());
        for block in blocks {
            self.next_block_id += 1;
            stored.push(BlockRecord {
                id: Some(self.next_block_id),
                ..block.clone()
            });
        }
        self.blocks.insert(page_id.0, stored);
        Ok(())
    }

    fn update_page_metadata(&mut self, id: PageId, meta: &PageMetadata) -> Result<(), StoreError> {
        let page = self.page_mut(id)?;
        page.title = meta.title.clone();
        page.category = meta.category;
        page.deadline = meta.deadline.clone();
        page.tags = meta.tags.clone();
        page.updated_at = now_epoch();
        Ok(())
    }

    fn create_page(&mut self, title: &str, category: Category) -> Result<PageId, StoreError> {
        self.next_page_id += 1;
        let id = PageId(self.next_page_id);
        let now = now_epoch();
        self.pages.insert(
            id.0,
            Page {
                id,
                title: title.to_string(),
                category,
                deadline: None,
                tags: TagSet::new(),
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn soft_delete(&mut self, id: PageId) -> Result<(), StoreError> {
        let page = self.page_mut(id)?;
        page.is_deleted = true;
        page.updated_at = now_epoch();
        Ok(())
    }

    fn restore(&mut self, id: PageId) -> Result<(), StoreError> {
        let page = self.page_mut(id)?;
        page.is_deleted = false;
        page.updated_at = now_epoch();
        Ok(())
    }

    fn hard_delete(&mut self, id: PageId) -> Result<(), StoreError> {
        if self.pages.remove(&id.0).is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.blocks.remove(&id.0);
        Ok(())
    }

    fn empty_trash(&mut self) -> Result<(), StoreError> {
        let trashed: Vec<i64> = self
            .pages
            .values()
            .filter(|page| page.is_deleted)
            .map(|page| page.id.0)
            .collect();
        for id in trashed {
            self.pages.remove(&id);
            self.blocks.remove(&id);
        }
        Ok(())
    }

    fn list_pages(&self) -> Result<Vec<Page>, StoreError> {
        Ok(Self::sorted(
            self.pages
                .values()
                .filter(|page| !page.is_deleted)
                .cloned()
                .collect(),
        ))
    }

    fn list_trash(&self) -> Result<Vec<Page>, StoreError> {
        Ok(Self::sorted(
            self.pages
                .values()
                .filter(|page| page.is_deleted)
                .cloned()
                .collect(),
        ))
    }

    fn list_page_titles(&self) -> Result<Vec<PageRef>, StoreError> {
        Ok(self
            .list_pages()?
            .into_iter()
            .map(|page| PageRef {
                id: page.id,
                title: page.title,
            })
            .collect())
    }
}
