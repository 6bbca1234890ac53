//! Case-insensitive search over page titles, tags and block content.
//!
//! One result per page: a page matched by title or tags appears without a
//! snippet; a content match attaches the first matching block's content
//! as the snippet, replacing any title-level hit for the same page.

use crate::models::{Category, PageId, TagSet};
use crate::store::{PageStore, StoreError};

pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Queries shorter than this return nothing.
const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: PageId,
    pub title: String,
    pub category: Category,
    pub tags: TagSet,
    /// Content of the first matching block, for content hits.
    pub snippet: Option<String>,
}

pub fn search(
    store: &dyn PageStore,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, StoreError> {
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }
    let needle = query.to_lowercase();
    let pages = store.list_pages()?;

    let mut results: Vec<SearchResult> = Vec::new();

    // Pass 1: titles and tags.
    for page in &pages {
        if results.len() >= limit {
            break;
        }
        if page.title.to_lowercase().contains(&needle)
            || page.tags.canonical().to_lowercase().contains(&needle)
        {
            results.push(SearchResult {
                id: page.id,
                title: page.title.clone(),
                category: page.category,
                tags: page.tags.clone(),
                snippet: None,
            });
        }
    }

    // Pass 2: block content. A content hit for an already-listed page
    // upgrades it in place with a snippet; order stays first-seen.
    let mut content_hits = 0;
    for page in &pages {
        if content_hits >= limit {
            break;
        }
        let snippet = store
            .get_blocks(page.id)?
            .into_iter()
            .find(|block| block.content.to_lowercase().contains(&needle))
            .map(|block| block.content);
        let Some(snippet) = snippet else {
            continue;
        };
        content_hits += 1;

        if let Some(existing) = results.iter_mut().find(|result| result.id == page.id) {
            existing.snippet = Some(snippet);
        } else {
            results.push(SearchResult {
                id: page.id,
                title: page.title.clone(),
                category: page.category,
                tags: page.tags.clone(),
                snippet: Some(snippet),
            });
        }
    }

    Ok(results)
}
