//! Corpus statistics: page/block/link totals, per-category counts and
//! the aggregated global tag set. Tags are never stored independently;
//! the global set exists only as this aggregation.

use std::collections::BTreeMap;

use crate::markup::WIKI_LINK;
use crate::models::Category;
use crate::store::{PageStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub total_pages: usize,
    pub total_blocks: usize,
    /// Blocks containing at least one wiki-link.
    pub total_links: usize,
    /// One entry per PARA category, in canonical order, zeroes included.
    pub category_counts: Vec<(Category, usize)>,
    pub tag_counts: BTreeMap<String, usize>,
}

pub fn collect_stats(store: &dyn PageStore) -> Result<Stats, StoreError> {
    let pages = store.list_pages()?;

    let mut total_blocks = 0;
    let mut total_links = 0;
    let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();

    for page in &pages {
        for tag in page.tags.iter() {
            *tag_counts.entry(tag.to_string()).or_default() += 1;
        }
        for block in store.get_blocks(page.id)? {
            total_blocks += 1;
            if WIKI_LINK.is_match(&block.content) {
                total_links += 1;
            }
        }
    }

    let category_counts = Category::ALL
        .iter()
        .map(|&category| {
            let count = pages.iter().filter(|page| page.category == category).count();
            (category, count)
        })
        .collect();

    Ok(Stats {
        total_pages: pages.len(),
        total_blocks,
        total_links,
        category_counts,
        tag_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;
    use crate::models::{PageMetadata, TagSet};
    use crate::store::{BlockRecord, MemoryStore, PageStore};

    fn record(content: &str, order_index: i64) -> BlockRecord {
        BlockRecord {
            id: None,
            kind: BlockKind::Paragraph,
            content: content.to_string(),
            order_index,
        }
    }

    #[test]
    fn empty_store_has_zeroed_stats() {
        let store = MemoryStore::new();
        let stats = collect_stats(&store).unwrap();
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.total_blocks, 0);
        assert_eq!(stats.total_links, 0);
        assert_eq!(stats.category_counts.len(), 5);
        assert!(stats.category_counts.iter().all(|(_, count)| *count == 0));
    }

    #[test]
    fn counts_pages_blocks_and_links() {
        let mut store = MemoryStore::new();
        let a = store.create_page("a", Category::Projects).unwrap();
        store
            .replace_blocks(
                a,
                &[
                    record("plain", 0),
                    record("see [[b]]", 1),
                    record("broken [[link", 2),
                ],
            )
            .unwrap();
        let b = store.create_page("b", Category::Inbox).unwrap();
        store.replace_blocks(b, &[record("[[a]] back", 0)]).unwrap();

        let stats = collect_stats(&store).unwrap();
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.total_blocks, 4);
        assert_eq!(stats.total_links, 2);

        let projects = stats
            .category_counts
            .iter()
            .find(|(category, _)| *category == Category::Projects)
            .unwrap();
        assert_eq!(projects.1, 1);
    }

    #[test]
    fn aggregates_tags_across_pages() {
        let mut store = MemoryStore::new();
        for (title, tags) in [("a", "rust,notes"), ("b", "rust"), ("c", "")] {
            let id = store.create_page(title, Category::Inbox).unwrap();
            let meta = PageMetadata {
                title: title.to_string(),
                tags: TagSet::parse(tags),
                ..PageMetadata::default()
            };
            store.update_page_metadata(id, &meta).unwrap();
        }

        let stats = collect_stats(&store).unwrap();
        assert_eq!(stats.tag_counts.get("rust"), Some(&2));
        assert_eq!(stats.tag_counts.get("notes"), Some(&1));
        assert_eq!(stats.tag_counts.len(), 2);
    }

    #[test]
    fn deleted_pages_do_not_count() {
        let mut store = MemoryStore::new();
        let id = store.create_page("gone", Category::Inbox).unwrap();
        store.replace_blocks(id, &[record("[[x]]", 0)]).unwrap();
        store.soft_delete(id).unwrap();

        let stats = collect_stats(&store).unwrap();
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.total_blocks, 0);
        assert_eq!(stats.total_links, 0);
    }
}
