//! Task registry: every checkbox block across non-deleted pages, grouped
//! by the page that owns it.

use crate::blocks::{BlockKind, content::ChecklistItem};
use crate::models::{Category, PageId};
use crate::store::{PageStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub page_id: PageId,
    pub title: String,
    pub category: Category,
    pub deadline: Option<String>,
    pub tasks: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBoard {
    pub groups: Vec<TaskGroup>,
    /// Unchecked tasks across all groups.
    pub pending: usize,
}

pub fn collect_tasks(store: &dyn PageStore) -> Result<TaskBoard, StoreError> {
    let mut board = TaskBoard::default();

    for page in store.list_pages()? {
        let tasks: Vec<ChecklistItem> = store
            .get_blocks(page.id)?
            .iter()
            .filter(|block| block.kind == BlockKind::Checkbox)
            .map(|block| ChecklistItem::decode(&block.content))
            .collect();
        if tasks.is_empty() {
            continue;
        }
        board.pending += tasks.iter().filter(|task| !task.checked).count();
        board.groups.push(TaskGroup {
            page_id: page.id,
            title: page.title,
            category: page.category,
            deadline: page.deadline,
            tasks,
        });
    }

    Ok(board)
}
