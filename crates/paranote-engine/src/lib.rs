pub mod autosave;
pub mod blocks;
pub mod editing;
pub mod links;
pub mod markup;
pub mod models;
pub mod search;
pub mod stats;
pub mod store;
pub mod tasks;

// Re-export key types for easier usage
pub use autosave::{AutosaveScheduler, PageSession, SaveState};
pub use blocks::{Block, BlockKind, ClientKey};
pub use editing::{EditorSession, SlashMenu};
pub use links::TitleIndex;
pub use markup::{InlineSpan, render_markup, render_markup_plain};
pub use models::{Category, Page, PageId, PageMetadata, PageRef, TagSet};
pub use store::{BlockRecord, MemoryStore, PageStore, SqliteStore, StoreError};
