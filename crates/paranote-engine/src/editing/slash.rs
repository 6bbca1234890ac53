use crate::blocks::{BlockKind, ClientKey};

/// One entry in the slash-command block palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashOption {
    pub label: &'static str,
    pub kind: BlockKind,
    pub description: &'static str,
}

/// The fixed block palette, in display order.
pub const BLOCK_OPTIONS: [SlashOption; 10] = [
    SlashOption {
        label: "Text",
        kind: BlockKind::Paragraph,
        description: "Just start writing",
    },
    SlashOption {
        label: "Heading",
        kind: BlockKind::Heading,
        description: "Section title",
    },
    SlashOption {
        label: "Checklist",
        kind: BlockKind::Checkbox,
        description: "Track tasks",
    },
    SlashOption {
        label: "Bullet List",
        kind: BlockKind::Bullet,
        description: "Simple list",
    },
    SlashOption {
        label: "Table",
        kind: BlockKind::Table,
        description: "Data grid",
    },
    SlashOption {
        label: "Quote",
        kind: BlockKind::Quote,
        description: "Capture quote",
    },
    SlashOption {
        label: "Code",
        kind: BlockKind::Code,
        description: "Technical script",
    },
    SlashOption {
        label: "Image",
        kind: BlockKind::Image,
        description: "Visual evidence",
    },
    SlashOption {
        label: "Bookmark",
        kind: BlockKind::LinkPreview,
        description: "Web reference",
    },
    SlashOption {
        label: "Divider",
        kind: BlockKind::Divider,
        description: "Separator",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum State {
    #[default]
    Inactive,
    Active {
        key: ClientKey,
        query: String,
        selected: usize,
    },
}

/// Slash-command state machine: `inactive → active(query, selected) →
/// {committed | cancelled} → inactive`.
///
/// Arrow movement wraps around the *currently filtered* option count, not
/// the full palette.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashMenu {
    state: State,
}

impl SlashMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)activate for a block; each keystroke re-activates with the new
    /// query and resets the selection to the top.
    pub fn activate(&mut self, key: ClientKey, query: impl Into<String>) {
        self.state = State::Active {
            key,
            query: query.into(),
            selected: 0,
        };
    }

    pub fn cancel(&mut self) {
        self.state = State::Inactive;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    pub fn is_active_for(&self, key: &ClientKey) -> bool {
        matches!(&self.state, State::Active { key: active, .. } if active == key)
    }

    pub fn query(&self) -> Option<&str> {
        match &self.state {
            State::Active { query, .. } => Some(query),
            State::Inactive => None,
        }
    }

    pub fn selected(&self) -> usize {
        match &self.state {
            State::Active { selected, .. } => *selected,
            State::Inactive => 0,
        }
    }

    /// Palette options matching the current query, by case-insensitive
    /// substring on labels. Empty when inactive.
    pub fn filtered(&self) -> Vec<&'static SlashOption> {
        let Some(query) = self.query() else {
            return Vec::new();
        };
        let needle = query.to_lowercase();
        BLOCK_OPTIONS
            .iter()
            .filter(|option| option.label.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn move_down(&mut self) {
        let count = self.filtered().len();
        if let State::Active { selected, .. } = &mut self.state
            && count > 0
        {
            *selected = (*selected + 1) % count;
        }
    }

    pub fn move_up(&mut self) {
        let count = self.filtered().len();
        if let State::Active { selected, .. } = &mut self.state
            && count > 0
        {
            *selected = if *selected == 0 {
                count - 1
            } else {
                *selected - 1
            };
        }
    }

    /// Commit the current selection, deactivating the menu. Returns the
    /// target block and chosen kind, or `None` when nothing matched the
    /// query.
    pub fn commit(&mut self) -> Option<(ClientKey, BlockKind)> {
        let chosen = match &self.state {
            State::Active { key, selected, .. } => self
                .filtered()
                .get(*selected)
                .map(|option| (*key, option.kind)),
            State::Inactive => None,
        };
        self.state = State::Inactive;
        chosen
    }
}
