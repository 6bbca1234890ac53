//! Wiki-link resolution.
//!
//! Titles are resolved case-insensitively against a snapshot of
//! non-deleted page titles taken at page load; staleness between snapshot
//! refreshes is acceptable. A dead link (no matching title) is an
//! affordance only: creating the missing page is a side-effecting
//! operation that must run on explicit user interaction, never during
//! passive rendering.

use tracing::info;

use crate::markup::{TitleResolver, WIKI_LINK};
use crate::models::{Category, PageId, PageRef};
use crate::store::{PageStore, StoreError};

/// Snapshot of `{id, title}` for all non-deleted pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleIndex {
    entries: Vec<PageRef>,
}

impl TitleIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PageRef>) -> Self {
        Self { entries }
    }

    /// Refresh the snapshot from the store.
    pub fn from_store(store: &dyn PageStore) -> Result<Self, StoreError> {
        Ok(Self {
            entries: store.list_page_titles()?,
        })
    }

    pub fn entries(&self) -> &[PageRef] {
        &self.entries
    }

    /// Case-insensitive title lookup.
    pub fn lookup(&self, title: &str) -> Option<&PageRef> {
        self.entries
            .iter()
            .find(|page| page.title.eq_ignore_ascii_case(title))
    }
}

impl TitleResolver for TitleIndex {
    fn resolve(&self, title: &str) -> Option<PageId> {
        self.lookup(title).map(|page| page.id)
    }
}

/// Create the page a dead link points at, with that exact title, in the
/// inbox. Only call this from an explicit user interaction.
pub fn create_from_dead_link(
    store: &mut dyn PageStore,
    title: &str,
) -> Result<PageId, StoreError> {
    let id = store.create_page(title, Category::Inbox)?;
    info!(page = id.0, title, "created page from dead wiki-link");
    Ok(id)
}

/// Every `[[Title]]` occurrence in a block's content, in order.
pub fn wiki_link_titles(content: &str) -> Vec<&str> {
    WIKI_LINK
        .captures_iter(content)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Reverse content scan: non-deleted pages whose blocks reference
/// `title` with a wiki-link. Computed on demand, not indexed.
pub fn find_backlinks(
    store: &dyn PageStore,
    page_id: PageId,
    title: &str,
) -> Result<Vec<PageRef>, StoreError> {
    let needle = format!("[[{}]]", title).to_lowercase();
    let mut backlinks = Vec::new();

    for page in store.list_pages()? {
        if page.id == page_id {
            continue;
        }
        let references = store
            .get_blocks(page.id)?
            .iter()
            .any(|block| block.content.to_lowercase().contains(&needle));
        if references {
            backlinks.push(PageRef {
                id: page.id,
                title: page.title,
            });
        }
    }

    Ok(backlinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;
    use crate::store::{BlockRecord, MemoryStore};

    fn record(content: &str) -> BlockRecord {
        BlockRecord {
            id: None,
            kind: BlockKind::Paragraph,
            content: content.to_string(),
            order_index: 0,
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let index = TitleIndex::from_entries(vec![PageRef {
            id: PageId(1),
            title: "Reading List".to_string(),
        }]);
        assert_eq!(index.lookup("reading list").unwrap().id, PageId(1));
        assert!(index.lookup("Reading").is_none());
    }

    #[test]
    fn snapshot_excludes_deleted_pages() {
        let mut store = MemoryStore::new();
        let kept = store.create_page("kept", Category::Inbox).unwrap();
        let trashed = store.create_page("trashed", Category::Inbox).unwrap();
        store.soft_delete(trashed).unwrap();

        let index = TitleIndex::from_store(&store).unwrap();
        assert_eq!(index.entries().len(), 1);
        assert_eq!(index.lookup("kept").unwrap().id, kept);
    }

    #[test]
    fn dead_link_creation_lands_in_inbox_with_exact_title() {
        let mut store = MemoryStore::new();
        let id = create_from_dead_link(&mut store, "New Lead").unwrap();
        let page = store.get_page(id).unwrap().unwrap();
        assert_eq!(page.title, "New Lead");
        assert_eq!(page.category, Category::Inbox);
    }

    #[test]
    fn extracts_titles_in_order() {
        let titles = wiki_link_titles("see [[A]] then [[B|alias? no]] end");
        assert_eq!(titles, vec!["A", "B|alias? no"]);
    }

    #[test]
    fn no_links_means_no_titles() {
        assert!(wiki_link_titles("plain text [not a link]").is_empty());
    }

    #[test]
    fn backlinks_scan_skips_self_and_deleted() {
        let mut store = MemoryStore::new();
        let target = store.create_page("Target", Category::Inbox).unwrap();
        store
            .replace_blocks(target, &[record("self mention [[Target]]")])
            .unwrap();

        let linker = store.create_page("Linker", Category::Inbox).unwrap();
        store
            .replace_blocks(linker, &[record("points at [[target]]")])
            .unwrap();

        let trashed = store.create_page("Trashed", Category::Inbox).unwrap();
        store
            .replace_blocks(trashed, &[record("also [[Target]]")])
            .unwrap();
        store.soft_delete(trashed).unwrap();

        let unrelated = store.create_page("Unrelated", Category::Inbox).unwrap();
        store.replace_blocks(unrelated, &[record("nothing")]).unwrap();

        let backlinks = find_backlinks(&store, target, "Target").unwrap();
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].title, "Linker");
    }
}
