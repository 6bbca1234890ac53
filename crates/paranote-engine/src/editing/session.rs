use tracing::debug;

use crate::blocks::{Block, BlockKind, ClientKey, content::ChecklistItem};
use crate::editing::slash::SlashMenu;
use crate::models::{Category, Page, PageId, PageMetadata, TagSet};
use crate::store::BlockRecord;

/// In-memory editing state for the currently open page.
///
/// Owned exclusively by the single active editing session for that page
/// and passed explicitly to whatever surfaces edit it; there is no
/// ambient global state.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSession {
    page_id: PageId,
    meta: PageMetadata,
    blocks: Vec<Block>,
    focused: Option<ClientKey>,
    slash: SlashMenu,
}

impl EditorSession {
    pub fn new(page_id: PageId, meta: PageMetadata) -> Self {
        Self {
            page_id,
            meta,
            blocks: Vec::new(),
            focused: None,
            slash: SlashMenu::new(),
        }
    }

    /// Build a session from a loaded page and its stored blocks. Every
    /// block gets a fresh client key; store ids are kept for reference.
    pub fn from_store(page: &Page, records: Vec<BlockRecord>) -> Self {
        let blocks = records
            .into_iter()
            .map(|record| Block {
                id: record.id,
                client_key: ClientKey::new(),
                kind: record.kind,
                content: record.content,
            })
            .collect();
        Self {
            page_id: page.id,
            meta: page.metadata(),
            blocks,
            focused: None,
            slash: SlashMenu::new(),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn meta(&self) -> &PageMetadata {
        &self.meta
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn focused(&self) -> Option<&ClientKey> {
        self.focused.as_ref()
    }

    pub fn set_focused(&mut self, key: Option<ClientKey>) {
        self.focused = key;
    }

    pub fn slash(&self) -> &SlashMenu {
        &self.slash
    }

    pub fn block_index(&self, key: &ClientKey) -> Option<usize> {
        self.blocks.iter().position(|block| &block.client_key == key)
    }

    pub fn block(&self, key: &ClientKey) -> Option<&Block> {
        self.blocks.iter().find(|block| &block.client_key == key)
    }

    // ---- Metadata edits ----

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.meta.title = title.into();
    }

    pub fn set_category(&mut self, category: Category) {
        self.meta.category = category;
    }

    pub fn set_deadline(&mut self, deadline: Option<String>) {
        self.meta.deadline = deadline;
    }

    pub fn set_tags(&mut self, tags: TagSet) {
        self.meta.tags = tags;
    }

    // ---- Structural edits ----

    /// Create a block of `kind` with its canonical empty content, splice
    /// it immediately after `index` and focus it. Blocks after the
    /// insertion point shift down by one; no identity is lost.
    pub fn insert_after(&mut self, index: usize, kind: BlockKind) -> ClientKey {
        let block = Block::new(kind);
        let key = block.client_key;
        let at = (index + 1).min(self.blocks.len());
        self.blocks.insert(at, block);
        self.focused = Some(key);
        debug!(page = self.page_id.0, %kind, at, "inserted block");
        key
    }

    /// Enter on a block appends a fresh paragraph right after it.
    pub fn insert_paragraph_after(&mut self, key: &ClientKey) -> Option<ClientKey> {
        let index = self.block_index(key)?;
        Some(self.insert_after(index, BlockKind::Paragraph))
    }

    /// Remove a block. Focus is routed to the predecessor when the
    /// removed block held it. The last-block policy belongs to callers;
    /// see [`EditorSession::backspace_on_empty`].
    pub fn delete(&mut self, key: &ClientKey) -> bool {
        let Some(index) = self.block_index(key) else {
            return false;
        };
        self.blocks.remove(index);
        if self.focused.as_ref() == Some(key) {
            self.focused = index
                .checked_sub(1)
                .or(if self.blocks.is_empty() { None } else { Some(0) })
                .and_then(|i| self.blocks.get(i))
                .map(|block| block.client_key);
        }
        if self.slash.is_active_for(key) {
            self.slash.cancel();
        }
        true
    }

    /// Backspace on an empty block deletes it, except on the first block
    /// where it is a no-op (a page keeps at least its leading block).
    pub fn backspace_on_empty(&mut self, key: &ClientKey) -> bool {
        match self.block_index(key) {
            Some(index) if index > 0 => {
                let empty = self
                    .block(key)
                    .map(|block| block.content.is_empty())
                    .unwrap_or(false);
                empty && self.delete(key)
            }
            _ => false,
        }
    }

    /// Move one block from `from` to `to`, shifting the blocks between.
    /// The moved block keeps its identity and content; only its position
    /// changes. Out-of-range indices are a no-op.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from == to || from >= self.blocks.len() || to >= self.blocks.len() {
            return;
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        debug!(page = self.page_id.0, from, to, "reordered block");
    }

    /// Change a block's kind in place, resetting content to the new
    /// kind's canonical empty form. No content migration is attempted.
    pub fn retype(&mut self, key: &ClientKey, kind: BlockKind) -> bool {
        let Some(index) = self.block_index(key) else {
            return false;
        };
        let block = &mut self.blocks[index];
        block.kind = kind;
        block.content = kind.empty_content();
        true
    }

    /// Replace a block's content, leaving kind and position untouched.
    /// Also drives the slash menu: a leading `/` with no space yet opens
    /// (or re-queries) the menu for this block; anything else closes it.
    pub fn update_content(&mut self, key: &ClientKey, content: impl Into<String>) -> bool {
        let Some(index) = self.block_index(key) else {
            return false;
        };
        let content = content.into();
        let slash_query = content
            .strip_prefix('/')
            .filter(|_| !content.contains(' '))
            .map(str::to_string);
        self.blocks[index].content = content;

        match slash_query {
            Some(query) => self.slash.activate(*key, query),
            None => self.slash.cancel(),
        }
        true
    }

    /// Flip the checked state of a checkbox block.
    pub fn toggle_checkbox(&mut self, key: &ClientKey) -> bool {
        let Some(index) = self.block_index(key) else {
            return false;
        };
        let block = &mut self.blocks[index];
        if block.kind != BlockKind::Checkbox {
            return false;
        }
        block.content = ChecklistItem::toggle_raw(&block.content);
        true
    }

    // ---- Slash menu routing ----

    pub fn slash_move_up(&mut self) {
        self.slash.move_up();
    }

    pub fn slash_move_down(&mut self) {
        self.slash.move_down();
    }

    pub fn slash_cancel(&mut self) {
        self.slash.cancel();
    }

    /// Enter while the menu is open: retype the target block (content
    /// resets to the chosen kind's empty form) and close the menu.
    pub fn slash_commit(&mut self) -> Option<BlockKind> {
        let (key, kind) = self.slash.commit()?;
        self.retype(&key, kind);
        self.focused = Some(key);
        Some(kind)
    }

    // ---- Presentation & serialization ----

    /// Consecutive same-kind list items render with tighter spacing; a
    /// presentation rule derived from the predecessor's kind, not stored.
    pub fn is_tight_with_predecessor(&self, index: usize) -> bool {
        if index == 0 || index >= self.blocks.len() {
            return false;
        }
        let block = &self.blocks[index];
        block.kind.is_list() && self.blocks[index - 1].kind == block.kind
    }

    /// Materialize the sequence for the store: dense 0-based positions
    /// derived from the in-memory order.
    pub fn to_records(&self) -> Vec<BlockRecord> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| BlockRecord {
                id: block.id,
                kind: block.kind,
                content: block.content.clone(),
                order_index: index as i64,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session_with(kinds_and_content: &[(BlockKind, &str)]) -> EditorSession {
        let mut session = EditorSession::new(PageId(1), PageMetadata::default());
        for (kind, content) in kinds_and_content {
            let key = session.insert_after(session.blocks().len().saturating_sub(1), *kind);
            session.update_content(&key, *content);
        }
        session.slash_cancel();
        session
    }

    fn contents(session: &EditorSession) -> Vec<&str> {
        session
            .blocks()
            .iter()
            .map(|block| block.content.as_str())
            .collect()
    }

    // ============ Insert ============

    #[test]
    fn insert_after_splices_and_focuses() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "c"),
        ]);
        let key = session.insert_after(0, BlockKind::Paragraph);
        session.update_content(&key, "b");

        assert_eq!(contents(&session), vec!["a", "b", "c"]);
        assert_eq!(session.focused(), Some(&key));
    }

    #[test]
    fn insert_into_empty_session() {
        let mut session = EditorSession::new(PageId(1), PageMetadata::default());
        let key = session.insert_after(0, BlockKind::Heading);
        assert_eq!(session.blocks().len(), 1);
        assert_eq!(session.focused(), Some(&key));
    }

    #[test]
    fn insert_preserves_identities_of_shifted_blocks() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
        ]);
        let keys: Vec<ClientKey> = session.blocks().iter().map(|b| b.client_key).collect();
        session.insert_after(0, BlockKind::Divider);
        assert_eq!(session.blocks()[0].client_key, keys[0]);
        assert_eq!(session.blocks()[2].client_key, keys[1]);
    }

    #[test]
    fn enter_inserts_paragraph_after_current() {
        let mut session = session_with(&[(BlockKind::Bullet, "item")]);
        let first = session.blocks()[0].client_key;
        session.insert_paragraph_after(&first).unwrap();
        assert_eq!(session.blocks()[1].kind, BlockKind::Paragraph);
        assert_eq!(session.blocks()[1].content, "");
    }

    // ============ Delete ============

    #[test]
    fn delete_removes_block() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
        ]);
        let key = session.blocks()[0].client_key;
        assert!(session.delete(&key));
        assert_eq!(contents(&session), vec!["b"]);
    }

    #[test]
    fn delete_routes_focus_to_predecessor() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
        ]);
        let first = session.blocks()[0].client_key;
        let second = session.blocks()[1].client_key;
        session.set_focused(Some(second));
        session.delete(&second);
        assert_eq!(session.focused(), Some(&first));
    }

    #[test]
    fn backspace_on_empty_first_block_is_noop() {
        let mut session = session_with(&[(BlockKind::Paragraph, "")]);
        let key = session.blocks()[0].client_key;
        assert!(!session.backspace_on_empty(&key));
        assert_eq!(session.blocks().len(), 1);
    }

    #[test]
    fn backspace_on_empty_later_block_deletes() {
        let mut session = session_with(&[(BlockKind::Paragraph, "a")]);
        let key = session.insert_after(0, BlockKind::Paragraph);
        assert!(session.backspace_on_empty(&key));
        assert_eq!(session.blocks().len(), 1);
    }

    #[test]
    fn backspace_on_non_empty_block_is_noop() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
        ]);
        let key = session.blocks()[1].client_key;
        assert!(!session.backspace_on_empty(&key));
        assert_eq!(session.blocks().len(), 2);
    }

    // ============ Reorder ============

    #[test]
    fn reorder_moves_block_down() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
            (BlockKind::Paragraph, "c"),
        ]);
        session.reorder(0, 2);
        assert_eq!(contents(&session), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_moves_block_up() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
            (BlockKind::Paragraph, "c"),
        ]);
        session.reorder(2, 0);
        assert_eq!(contents(&session), vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_preserves_relative_order_of_untouched_blocks() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
            (BlockKind::Paragraph, "c"),
            (BlockKind::Paragraph, "d"),
            (BlockKind::Paragraph, "e"),
        ]);
        let untouched: Vec<ClientKey> = session
            .blocks()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, block)| block.client_key)
            .collect();

        session.reorder(1, 3);

        let after: Vec<ClientKey> = session
            .blocks()
            .iter()
            .map(|block| block.client_key)
            .filter(|key| untouched.contains(key))
            .collect();
        assert_eq!(after, untouched);
    }

    #[test]
    fn reorder_keeps_identity_and_content_of_moved_block() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Heading, "title"),
            (BlockKind::Paragraph, "c"),
        ]);
        let moved = session.blocks()[1].clone();
        session.reorder(1, 0);
        assert_eq!(session.blocks()[0], moved);
    }

    #[test]
    fn reorder_out_of_range_is_noop() {
        let mut session = session_with(&[(BlockKind::Paragraph, "a")]);
        session.reorder(0, 5);
        session.reorder(5, 0);
        assert_eq!(contents(&session), vec!["a"]);
    }

    // ============ Retype / update ============

    #[test]
    fn retype_resets_content_to_canonical_empty() {
        let mut session = session_with(&[(BlockKind::Paragraph, "text to discard")]);
        let key = session.blocks()[0].client_key;

        assert!(session.retype(&key, BlockKind::Table));
        let block = session.block(&key).unwrap();
        assert_eq!(block.kind, BlockKind::Table);
        assert_eq!(block.content, BlockKind::Table.empty_content());

        assert!(session.retype(&key, BlockKind::Code));
        let block = session.block(&key).unwrap();
        assert_eq!(block.kind, BlockKind::Code);
        assert_eq!(block.content, r#"{"language":"javascript","code":""}"#);
    }

    #[test]
    fn update_content_changes_only_content() {
        let mut session = session_with(&[(BlockKind::Quote, "old")]);
        let key = session.blocks()[0].client_key;
        session.update_content(&key, "new");
        let block = session.block(&key).unwrap();
        assert_eq!(block.kind, BlockKind::Quote);
        assert_eq!(block.content, "new");
    }

    #[test]
    fn toggle_checkbox_round_trips() {
        let mut session = session_with(&[(BlockKind::Checkbox, "task")]);
        let key = session.blocks()[0].client_key;
        session.toggle_checkbox(&key);
        assert_eq!(session.block(&key).unwrap().content, "[x] task");
        session.toggle_checkbox(&key);
        assert_eq!(session.block(&key).unwrap().content, "task");
    }

    #[test]
    fn toggle_checkbox_rejects_other_kinds() {
        let mut session = session_with(&[(BlockKind::Paragraph, "not a task")]);
        let key = session.blocks()[0].client_key;
        assert!(!session.toggle_checkbox(&key));
    }

    // ============ Slash menu ============

    #[test]
    fn slash_prefix_opens_menu() {
        let mut session = session_with(&[(BlockKind::Paragraph, "")]);
        let key = session.blocks()[0].client_key;
        session.update_content(&key, "/he");
        assert!(session.slash().is_active_for(&key));
        assert_eq!(session.slash().query(), Some("he"));
    }

    #[test]
    fn space_cancels_menu() {
        let mut session = session_with(&[(BlockKind::Paragraph, "")]);
        let key = session.blocks()[0].client_key;
        session.update_content(&key, "/he");
        session.update_content(&key, "/he llo");
        assert!(!session.slash().is_active());
    }

    #[test]
    fn slash_commit_scenario_head_to_heading() {
        // Query "head" filters to exactly the Heading option; Enter
        // retypes the active block and clears its content.
        let mut session = session_with(&[(BlockKind::Paragraph, "")]);
        let key = session.blocks()[0].client_key;
        session.update_content(&key, "/head");
        assert_eq!(session.slash().filtered().len(), 1);

        let kind = session.slash_commit().unwrap();
        assert_eq!(kind, BlockKind::Heading);
        let block = session.block(&key).unwrap();
        assert_eq!(block.kind, BlockKind::Heading);
        assert_eq!(block.content, "");
        assert!(!session.slash().is_active());
    }

    #[test]
    fn escape_cancels_without_retype() {
        let mut session = session_with(&[(BlockKind::Paragraph, "")]);
        let key = session.blocks()[0].client_key;
        session.update_content(&key, "/code");
        session.slash_cancel();
        assert_eq!(session.block(&key).unwrap().kind, BlockKind::Paragraph);
        assert!(session.slash_commit().is_none());
    }

    #[test]
    fn deleting_slash_block_closes_menu() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, ""),
        ]);
        let key = session.blocks()[1].client_key;
        session.update_content(&key, "/ta");
        session.delete(&key);
        assert!(!session.slash().is_active());
    }

    // ============ Presentation & serialization ============

    #[test]
    fn tight_list_rule_compares_adjacent_kinds() {
        let session = session_with(&[
            (BlockKind::Bullet, "a"),
            (BlockKind::Bullet, "b"),
            (BlockKind::Checkbox, "c"),
            (BlockKind::Checkbox, "d"),
            (BlockKind::Paragraph, "e"),
        ]);
        assert!(!session.is_tight_with_predecessor(0));
        assert!(session.is_tight_with_predecessor(1));
        assert!(!session.is_tight_with_predecessor(2));
        assert!(session.is_tight_with_predecessor(3));
        assert!(!session.is_tight_with_predecessor(4));
    }

    #[test]
    fn to_records_materializes_dense_positions() {
        let mut session = session_with(&[
            (BlockKind::Paragraph, "a"),
            (BlockKind::Paragraph, "b"),
            (BlockKind::Paragraph, "c"),
        ]);
        session.reorder(2, 0);
        let records = session.to_records();
        assert_eq!(
            records
                .iter()
                .map(|r| r.order_index)
                .collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(records[0].content, "c");
    }

    #[test]
    fn from_store_keeps_order_and_ids() {
        let page = Page {
            id: PageId(4),
            title: "t".to_string(),
            category: Category::Inbox,
            deadline: None,
            tags: TagSet::new(),
            is_deleted: false,
            created_at: 0,
            updated_at: 0,
        };
        let records = vec![
            BlockRecord {
                id: Some(10),
                kind: BlockKind::Heading,
                content: "h".to_string(),
                order_index: 0,
            },
            BlockRecord {
                id: Some(11),
                kind: BlockKind::Paragraph,
                content: "p".to_string(),
                order_index: 1,
            },
        ];
        let session = EditorSession::from_store(&page, records);
        assert_eq!(session.page_id(), PageId(4));
        assert_eq!(session.blocks()[0].id, Some(10));
        assert_eq!(session.blocks()[1].content, "p");
    }
}
