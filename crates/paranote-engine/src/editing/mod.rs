/*!
 * # Document Editing Engine
 *
 * In-memory editing model for one open page. The engine owns:
 *
 * - an ordered sequence of [`Block`](crate::blocks::Block)s; the vector
 *   order IS the document order, and a dense `order_index` is
 *   materialized only when serializing to the store,
 * - a single optional focused block, routed after structural operations
 *   (inserting focuses the new block, deleting moves focus to the
 *   predecessor),
 * - the slash-command state machine for the block-type picker.
 *
 * Structural operations (`insert_after`, `delete`, `reorder`, `retype`,
 * `update_content`) apply immediately to the in-memory sequence in the
 * order the user performs them; persistence happens separately through
 * the autosave scheduler, which reads the sequence as a full snapshot.
 * The sequence is never blocked on a pending save.
 *
 * The slash-command machine activates when a block's content starts with
 * `/` and contains no space yet; the query filters the fixed block
 * palette, arrow keys cycle the filtered options with wraparound, Enter
 * commits a `retype` (resetting content to the new kind's empty form),
 * and Escape or a typed space cancels.
 */

pub mod session;
pub mod slash;

pub use session::EditorSession;
pub use slash::{BLOCK_OPTIONS, SlashMenu, SlashOption};
