use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned page identifier. Opaque and immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub i64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five-way PARA classification every page belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Inbox,
    Projects,
    Areas,
    Resources,
    Archives,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Inbox,
        Category::Projects,
        Category::Areas,
        Category::Resources,
        Category::Archives,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Inbox => "inbox",
            Category::Projects => "projects",
            Category::Areas => "areas",
            Category::Resources => "resources",
            Category::Archives => "archives",
        }
    }

    /// Parse a stored category string. Unknown values fall back to `Inbox`
    /// rather than erroring, matching the reader-tolerance policy used for
    /// block payloads.
    pub fn parse(s: &str) -> Category {
        match s {
            "projects" => Category::Projects,
            "areas" => Category::Areas,
            "resources" => Category::Resources,
            "archives" => Category::Archives,
            _ => Category::Inbox,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of short tag strings.
///
/// Stored as a canonical comma-joined sequence. Parsing trims whitespace,
/// drops empties and removes duplicates while preserving first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        let mut tags: Vec<String> = Vec::new();
        for part in raw.split(',') {
            let tag = part.trim();
            if tag.is_empty() {
                continue;
            }
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        Self { tags }
    }

    /// Canonical comma-joined form, as persisted.
    pub fn canonical(&self) -> String {
        self.tags.join(",")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// The mutable page header the autosave metadata channel sends as one
/// atomic tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub category: Category,
    /// ISO `YYYY-MM-DD`; only meaningful when `category` is `Projects`.
    pub deadline: Option<String>,
    pub tags: TagSet,
}

/// A titled document composed of ordered blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub category: Category,
    pub deadline: Option<String>,
    pub tags: TagSet,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Page {
    pub fn metadata(&self) -> PageMetadata {
        PageMetadata {
            title: self.title.clone(),
            category: self.category,
            deadline: self.deadline.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// A `{id, title}` pair from the resolver snapshot of non-deleted pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub id: PageId,
    pub title: String,
}
