//! Fallible decode-from-storage and encode-to-storage conversions for the
//! structured block payloads.
//!
//! Decoding never fails: malformed JSON falls back to the kind's default
//! shape, so bad content degrades on display instead of erroring.

use serde::{Deserialize, Serialize};

/// Languages offered by the code-block picker. Unrecognized stored values
/// are passed through verbatim; rendering falls back, it does not error.
pub const CODE_LANGUAGES: [&str; 9] = [
    "javascript",
    "typescript",
    "python",
    "sql",
    "html",
    "css",
    "bash",
    "json",
    "markdown",
];

const CHECKED_PREFIX: &str = "[x] ";

/// Checklist state, represented internally as a discriminated pair.
///
/// The stored encoding is the literal `"[x] "` prefix on the raw text;
/// that string coupling lives only in `decode`/`encode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub checked: bool,
    pub text: String,
}

impl ChecklistItem {
    pub fn decode(raw: &str) -> Self {
        match raw.strip_prefix(CHECKED_PREFIX) {
            Some(text) => Self {
                checked: true,
                text: text.to_string(),
            },
            None => Self {
                checked: false,
                text: raw.to_string(),
            },
        }
    }

    pub fn encode(&self) -> String {
        if self.checked {
            format!("{CHECKED_PREFIX}{}", self.text)
        } else {
            self.text.clone()
        }
    }

    pub fn toggle(&mut self) {
        self.checked = !self.checked;
    }

    /// Toggle the checked prefix of a raw checkbox content string.
    pub fn toggle_raw(raw: &str) -> String {
        let mut item = Self::decode(raw);
        item.toggle();
        item.encode()
    }
}

/// Rectangular grid of cells; row 0 is conventionally the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    rows: Vec<Vec<String>>,
}

impl Default for TableData {
    fn default() -> Self {
        Self {
            rows: vec![
                vec!["Header 1".to_string(), "Header 2".to_string()],
                vec!["Cell 1".to_string(), "Cell 2".to_string()],
            ],
        }
    }
}

impl TableData {
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Vec<Vec<String>>>(raw) {
            Ok(rows) if !rows.is_empty() && !rows[0].is_empty() => Self { rows },
            _ => Self::default(),
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(&self.rows).unwrap_or_default()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn update_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value.into();
        }
    }

    pub fn add_row(&mut self) {
        let columns = self.column_count();
        self.rows.push(vec![String::new(); columns]);
    }

    pub fn add_column(&mut self) {
        for row in &mut self.rows {
            row.push(String::new());
        }
    }

    /// No-op when the table has a single row or `row` is out of range.
    pub fn remove_row(&mut self, row: usize) {
        if self.rows.len() <= 1 || row >= self.rows.len() {
            return;
        }
        self.rows.remove(row);
    }

    /// No-op when the table has a single column or `column` is out of range.
    pub fn remove_column(&mut self, column: usize) {
        if self.column_count() <= 1 || column >= self.column_count() {
            return;
        }
        for row in &mut self.rows {
            if column < row.len() {
                row.remove(column);
            }
        }
    }
}

/// Code payload: `{ language, code }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub language: String,
    pub code: String,
}

impl Default for CodeSnippet {
    fn default() -> Self {
        Self {
            language: "javascript".to_string(),
            code: String::new(),
        }
    }
}

impl CodeSnippet {
    pub fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Image payload: either a bare URL string (legacy encoding) or JSON
/// `{ url, width }`. Both forms must be accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSource {
    pub url: String,
    pub width: Option<u32>,
}

#[derive(Deserialize)]
struct ImagePayload {
    url: String,
    #[serde(default)]
    width: Option<u32>,
}

impl ImageSource {
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<ImagePayload>(raw) {
            Ok(payload) => Self {
                url: payload.url,
                width: payload.width,
            },
            Err(_) => Self {
                url: raw.to_string(),
                width: None,
            },
        }
    }

    pub fn encode(&self) -> String {
        match self.width {
            Some(width) => serde_json::to_string(&serde_json::json!({
                "url": self.url,
                "width": width,
            }))
            .unwrap_or_default(),
            None => self.url.clone(),
        }
    }
}

/// Bookmark payload filled in by an external metadata fetcher. Absent or
/// unparseable content means "unfilled bookmark, awaiting URL input".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkMeta {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl BookmarkMeta {
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
