/*!
 * # Autosave Scheduler
 *
 * Debounced synchronization of editing state to the page store, split
 * into two independent channels:
 *
 * - **Metadata** (1 s quiet period): fires only when title, category,
 *   deadline or tags differ from the baseline last confirmed from the
 *   store, and sends the full tuple as one atomic update.
 * - **Blocks** (2 s quiet period): fires when the block sequence changed
 *   and is non-empty, and sends the entire sequence as one atomic
 *   full-replace snapshot. The store deletes all prior blocks and
 *   re-inserts inside one transaction, so the write is idempotent under
 *   retry.
 *
 * The scheduler owns its timer lifecycle explicitly: callers notify it
 * on every relevant change (which restarts the channel's quiet window)
 * and poll it with injected instants, keeping the whole thing
 * deterministic under test. At most one save is in flight per channel;
 * edits arriving mid-flight extend the window for the *next* save.
 *
 * Every blocks fire carries a monotonic revision. A completion reported
 * for an older revision than the newest applied one is ignored, so a
 * stale full-replace finishing late can never clobber a newer snapshot
 * at the scheduling layer.
 *
 * A failed save is not retried immediately: the channel is re-marked
 * dirty at completion time, the indicator stays [`SaveState::Syncing`],
 * and the next quiet period attempts again.
 */

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::blocks::{BlockKind, ClientKey};
use crate::editing::EditorSession;
use crate::models::{Category, PageId, PageMetadata, TagSet};
use crate::store::{BlockRecord, PageStore, StoreError};

pub const DEFAULT_METADATA_QUIET: Duration = Duration::from_millis(1000);
pub const DEFAULT_BLOCKS_QUIET: Duration = Duration::from_millis(2000);

/// The only user-visible save status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Syncing,
}

/// A due metadata save: the full tuple, sent atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSave {
    pub revision: u64,
    pub meta: PageMetadata,
}

/// A due blocks save: the entire current sequence as a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BlocksSave {
    pub revision: u64,
    pub records: Vec<BlockRecord>,
}

#[derive(Debug)]
pub struct AutosaveScheduler {
    metadata_quiet: Duration,
    blocks_quiet: Duration,
    baseline: PageMetadata,
    meta_dirty_since: Option<Instant>,
    blocks_dirty_since: Option<Instant>,
    meta_in_flight: bool,
    blocks_in_flight: bool,
    next_revision: u64,
    applied_meta_revision: u64,
    applied_blocks_revision: u64,
}

impl AutosaveScheduler {
    /// `baseline` is the metadata tuple as last loaded from the store.
    pub fn new(baseline: PageMetadata) -> Self {
        Self::with_quiet_periods(baseline, DEFAULT_METADATA_QUIET, DEFAULT_BLOCKS_QUIET)
    }

    pub fn with_quiet_periods(
        baseline: PageMetadata,
        metadata_quiet: Duration,
        blocks_quiet: Duration,
    ) -> Self {
        Self {
            metadata_quiet,
            blocks_quiet,
            baseline,
            meta_dirty_since: None,
            blocks_dirty_since: None,
            meta_in_flight: false,
            blocks_in_flight: false,
            next_revision: 0,
            applied_meta_revision: 0,
            applied_blocks_revision: 0,
        }
    }

    /// Restart the metadata channel's quiet window.
    pub fn notify_metadata_changed(&mut self, now: Instant) {
        self.meta_dirty_since = Some(now);
    }

    /// Restart the blocks channel's quiet window.
    pub fn notify_blocks_changed(&mut self, now: Instant) {
        self.blocks_dirty_since = Some(now);
    }

    pub fn state(&self) -> SaveState {
        if self.meta_dirty_since.is_some()
            || self.blocks_dirty_since.is_some()
            || self.meta_in_flight
            || self.blocks_in_flight
        {
            SaveState::Syncing
        } else {
            SaveState::Saved
        }
    }

    pub fn baseline(&self) -> &PageMetadata {
        &self.baseline
    }

    /// Newest blocks revision confirmed applied; used by the stale guard.
    pub fn applied_blocks_revision(&self) -> u64 {
        self.applied_blocks_revision
    }

    fn quiet_elapsed(dirty_since: Option<Instant>, quiet: Duration, now: Instant) -> bool {
        dirty_since
            .map(|since| now.duration_since(since) >= quiet)
            .unwrap_or(false)
    }

    /// Take a due metadata save, if any. Consumes the dirty window; a
    /// tuple equal to the baseline clears the window without firing.
    pub fn begin_metadata_save(
        &mut self,
        current: &PageMetadata,
        now: Instant,
    ) -> Option<MetadataSave> {
        if self.meta_in_flight
            || !Self::quiet_elapsed(self.meta_dirty_since, self.metadata_quiet, now)
        {
            return None;
        }
        self.meta_dirty_since = None;
        if *current == self.baseline {
            return None;
        }
        self.meta_in_flight = true;
        self.next_revision += 1;
        debug!(revision = self.next_revision, "metadata save due");
        Some(MetadataSave {
            revision: self.next_revision,
            meta: current.clone(),
        })
    }

    pub fn complete_metadata_save(&mut self, save: MetadataSave, success: bool, now: Instant) {
        self.meta_in_flight = false;
        if success {
            if save.revision > self.applied_meta_revision {
                self.applied_meta_revision = save.revision;
                self.baseline = save.meta;
            }
        } else {
            // Not retried immediately; the next quiet period attempts again.
            self.meta_dirty_since = Some(now);
        }
    }

    /// Take a due blocks save, if any. Fires only for a non-empty
    /// sequence; an empty one clears the window without firing.
    pub fn begin_blocks_save(
        &mut self,
        session: &EditorSession,
        now: Instant,
    ) -> Option<BlocksSave> {
        if self.blocks_in_flight
            || !Self::quiet_elapsed(self.blocks_dirty_since, self.blocks_quiet, now)
        {
            return None;
        }
        self.blocks_dirty_since = None;
        if session.blocks().is_empty() {
            return None;
        }
        self.blocks_in_flight = true;
        self.next_revision += 1;
        debug!(
            revision = self.next_revision,
            count = session.blocks().len(),
            "blocks save due"
        );
        Some(BlocksSave {
            revision: self.next_revision,
            records: session.to_records(),
        })
    }

    /// Report a blocks save outcome. Completions for revisions older
    /// than the newest applied one are ignored.
    pub fn complete_blocks_save(&mut self, revision: u64, success: bool, now: Instant) {
        self.blocks_in_flight = false;
        if success {
            if revision > self.applied_blocks_revision {
                self.applied_blocks_revision = revision;
            }
        } else {
            self.blocks_dirty_since = Some(now);
        }
    }
}

/// One open page: the editing session plus its autosave scheduler.
///
/// Edits go through this facade so every mutation also restarts the
/// right debounce window; `poll` drives due saves against the store.
#[derive(Debug)]
pub struct PageSession {
    session: EditorSession,
    scheduler: AutosaveScheduler,
}

impl PageSession {
    pub fn load(store: &dyn PageStore, id: PageId) -> Result<Self, StoreError> {
        let page = store.get_page(id)?.ok_or(StoreError::NotFound(id))?;
        let records = store.get_blocks(id)?;
        let scheduler = AutosaveScheduler::new(page.metadata());
        Ok(Self {
            session: EditorSession::from_store(&page, records),
            scheduler,
        })
    }

    pub fn with_quiet_periods(mut self, metadata_quiet: Duration, blocks_quiet: Duration) -> Self {
        self.scheduler.metadata_quiet = metadata_quiet;
        self.scheduler.blocks_quiet = blocks_quiet;
        self
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn save_state(&self) -> SaveState {
        self.scheduler.state()
    }

    // ---- Metadata edits ----

    pub fn set_title(&mut self, title: impl Into<String>, now: Instant) {
        self.session.set_title(title);
        self.scheduler.notify_metadata_changed(now);
    }

    pub fn set_category(&mut self, category: Category, now: Instant) {
        self.session.set_category(category);
        self.scheduler.notify_metadata_changed(now);
    }

    pub fn set_deadline(&mut self, deadline: Option<String>, now: Instant) {
        self.session.set_deadline(deadline);
        self.scheduler.notify_metadata_changed(now);
    }

    pub fn set_tags(&mut self, tags: TagSet, now: Instant) {
        self.session.set_tags(tags);
        self.scheduler.notify_metadata_changed(now);
    }

    // ---- Block edits ----

    pub fn insert_after(
        &mut self,
        index: usize,
        kind: BlockKind,
        now: Instant,
    ) -> ClientKey {
        let key = self.session.insert_after(index, kind);
        self.scheduler.notify_blocks_changed(now);
        key
    }

    pub fn update_content(
        &mut self,
        key: &ClientKey,
        content: impl Into<String>,
        now: Instant,
    ) -> bool {
        let changed = self.session.update_content(key, content);
        if changed {
            self.scheduler.notify_blocks_changed(now);
        }
        changed
    }

    pub fn delete(&mut self, key: &ClientKey, now: Instant) -> bool {
        let deleted = self.session.delete(key);
        if deleted {
            self.scheduler.notify_blocks_changed(now);
        }
        deleted
    }

    pub fn reorder(&mut self, from: usize, to: usize, now: Instant) {
        self.session.reorder(from, to);
        self.scheduler.notify_blocks_changed(now);
    }

    pub fn retype(
        &mut self,
        key: &ClientKey,
        kind: BlockKind,
        now: Instant,
    ) -> bool {
        let changed = self.session.retype(key, kind);
        if changed {
            self.scheduler.notify_blocks_changed(now);
        }
        changed
    }

    pub fn toggle_checkbox(&mut self, key: &ClientKey, now: Instant) -> bool {
        let changed = self.session.toggle_checkbox(key);
        if changed {
            self.scheduler.notify_blocks_changed(now);
        }
        changed
    }

    pub fn slash_commit(&mut self, now: Instant) -> Option<BlockKind> {
        let kind = self.session.slash_commit();
        if kind.is_some() {
            self.scheduler.notify_blocks_changed(now);
        }
        kind
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    /// Drive due saves. Store failures are not propagated: the channel
    /// stays dirty and the next quiet period retries.
    pub fn poll(&mut self, store: &mut dyn PageStore, now: Instant) {
        if let Some(save) = self.scheduler.begin_metadata_save(self.session.meta(), now) {
            let result = store.update_page_metadata(self.session.page_id(), &save.meta);
            if let Err(error) = &result {
                warn!(page = self.session.page_id().0, %error, "metadata save failed");
            }
            let success = result.is_ok();
            self.scheduler.complete_metadata_save(save, success, now);
        }

        if let Some(save) = self.scheduler.begin_blocks_save(&self.session, now) {
            let result = store.replace_blocks(self.session.page_id(), &save.records);
            if let Err(error) = &result {
                warn!(page = self.session.page_id().0, %error, "blocks save failed");
            }
            self.scheduler
                .complete_blocks_save(save.revision, result.is_ok(), now);
        }
    }
}
