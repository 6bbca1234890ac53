//! Block model: the typed units a page's content is composed of.
//!
//! A block's `content` is an opaque string whose encoding depends on the
//! block kind: raw text for the textual kinds, a JSON payload for the
//! structured ones (`content` module). Malformed payloads are never
//! rejected at write time; readers fall back to a kind-specific default.

pub mod content;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use content::{BookmarkMeta, ChecklistItem, CodeSnippet, ImageSource, TableData};

/// Client-only transient identifier, used to track block identity across
/// reorders before persistence. Never sent to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientKey(Uuid);

impl ClientKey {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of block kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading,
    Bullet,
    Checkbox,
    Quote,
    Table,
    Code,
    Image,
    LinkPreview,
    Divider,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::Bullet => "bullet",
            BlockKind::Checkbox => "checkbox",
            BlockKind::Quote => "quote",
            BlockKind::Table => "table",
            BlockKind::Code => "code",
            BlockKind::Image => "image",
            BlockKind::LinkPreview => "link_preview",
            BlockKind::Divider => "divider",
        }
    }

    pub fn parse(s: &str) -> Option<BlockKind> {
        match s {
            "paragraph" => Some(BlockKind::Paragraph),
            "heading" => Some(BlockKind::Heading),
            "bullet" => Some(BlockKind::Bullet),
            "checkbox" => Some(BlockKind::Checkbox),
            "quote" => Some(BlockKind::Quote),
            "table" => Some(BlockKind::Table),
            "code" => Some(BlockKind::Code),
            "image" => Some(BlockKind::Image),
            "link_preview" => Some(BlockKind::LinkPreview),
            "divider" => Some(BlockKind::Divider),
            _ => None,
        }
    }

    /// The canonical empty content a freshly created or retyped block of
    /// this kind starts with. Code blocks carry their JSON envelope from
    /// the start; every other kind starts blank and relies on fallback
    /// decoding until first edited.
    pub fn empty_content(&self) -> String {
        match self {
            BlockKind::Code => CodeSnippet::default().encode(),
            _ => String::new(),
        }
    }

    /// List kinds that render adjacent-tight when consecutive.
    pub fn is_list(&self) -> bool {
        matches!(self, BlockKind::Bullet | BlockKind::Checkbox)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed unit of page content.
///
/// `id` is assigned by the store and absent for blocks that have not been
/// persisted yet; `client_key` is the stable in-session identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: Option<i64>,
    pub client_key: ClientKey,
    pub kind: BlockKind,
    pub content: String,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: None,
            client_key: ClientKey::new(),
            kind,
            content: kind.empty_content(),
        }
    }

    pub fn with_content(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id: None,
            client_key: ClientKey::new(),
            kind,
            content: content.into(),
        }
    }
}
