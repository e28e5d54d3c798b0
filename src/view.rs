//! Multi-cursor view (§3, §9 design note: "cursors are owned by the view as
//! ... an indexed arena with stable identity across edits; operators may
//! dispose by id"). A `View` is a set of cursors positioned within one
//! `File`; `Window` pairs a `View` with a `File` and UI handle.

use std::collections::BTreeMap;

use crate::cursor::{Cursor, CursorId};

/// Cursors owned by the view as an indexed arena. IDs are stable across
/// edits and across other cursors being disposed mid-iteration (§4.6 step
/// 3: "snapshot next pointer first so operators may dispose the current
/// cursor").
#[derive(Default)]
pub struct View {
    cursors: BTreeMap<CursorId, Cursor>,
    next_id: CursorId,
    /// The id primary editing/rendering operations key off of; always a
    /// live entry in `cursors` except transiently while the last cursor for
    /// a keystroke is being swapped out.
    primary: CursorId,
}

impl View {
    pub fn new(pos: usize) -> Self {
        let mut cursors = BTreeMap::new();
        cursors.insert(0, Cursor::new(pos));
        Self {
            cursors,
            next_id: 1,
            primary: 0,
        }
    }

    pub fn primary_id(&self) -> CursorId {
        self.primary
    }

    pub fn primary(&self) -> &Cursor {
        &self.cursors[&self.primary]
    }

    pub fn primary_mut(&mut self) -> &mut Cursor {
        self.cursors.get_mut(&self.primary).unwrap()
    }

    pub fn cursor(&self, id: CursorId) -> Option<&Cursor> {
        self.cursors.get(&id)
    }

    pub fn cursor_mut(&mut self, id: CursorId) -> Option<&mut Cursor> {
        self.cursors.get_mut(&id)
    }

    pub fn is_multi(&self) -> bool {
        self.cursors.len() > 1
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// A snapshot of every live cursor id, in position order, taken *before*
    /// an action runs so the executor's per-cursor loop is immune to
    /// disposals/insertions happening mid-loop (§4.6 step 3, §9).
    pub fn cursor_ids(&self) -> Vec<CursorId> {
        self.cursors.keys().copied().collect()
    }

    pub fn add_cursor(&mut self, pos: usize) -> CursorId {
        let id = self.next_id;
        self.next_id += 1;
        self.cursors.insert(id, Cursor::new(pos));
        id
    }

    /// Disposes a cursor (operator returned `EPOS`, §4.5/§4.6). If the
    /// primary was disposed, falls back to the lowest remaining id, or
    /// re-seeds a fresh cursor at 0 if none remain (a `View` is never
    /// empty for long: the last cursor of a window can't vanish).
    pub fn dispose(&mut self, id: CursorId) {
        self.cursors.remove(&id);
        if self.primary == id {
            self.primary = self.cursors.keys().next().copied().unwrap_or_else(|| {
                let fallback = self.next_id;
                self.next_id += 1;
                self.cursors.insert(fallback, Cursor::new(0));
                fallback
            });
        }
    }

    pub fn set_primary(&mut self, id: CursorId) {
        if self.cursors.contains_key(&id) {
            self.primary = id;
        }
    }

    /// Collapses back to a single cursor at `pos` (leaving visual mode,
    /// `<Esc>` in normal mode with multiple cursors, etc).
    pub fn collapse_to(&mut self, pos: usize) {
        self.cursors.clear();
        self.next_id = 1;
        self.cursors.insert(0, Cursor::new(pos));
        self.primary = 0;
    }

    pub fn clear_all_selections(&mut self) {
        for cursor in self.cursors.values_mut() {
            cursor.clear_selection();
        }
    }

    pub fn start_all_selections(&mut self) {
        for cursor in self.cursors.values_mut() {
            cursor.start_selection();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CursorId, &Cursor)> {
        self.cursors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_view_has_one_cursor() {
        let v = View::new(5);
        assert_eq!(v.len(), 1);
        assert_eq!(v.primary().pos, 5);
    }

    #[test]
    fn disposing_primary_falls_back_to_another_live_cursor() {
        let mut v = View::new(0);
        let second = v.add_cursor(10);
        v.dispose(v.primary_id());
        assert_eq!(v.primary_id(), second);
    }

    #[test]
    fn cursor_ids_snapshot_is_stable_under_disposal() {
        let mut v = View::new(0);
        let b = v.add_cursor(5);
        let c = v.add_cursor(9);
        let ids = v.cursor_ids();
        v.dispose(b);
        // The snapshot still names `b` even though it is now gone from the
        // arena; callers must tolerate `cursor(id) == None` afterward.
        assert!(ids.contains(&b));
        assert!(v.cursor(b).is_none());
        assert!(v.cursor(c).is_some());
    }

    #[test]
    fn disposing_last_cursor_reseeds_one() {
        let mut v = View::new(3);
        let id = v.primary_id();
        v.dispose(id);
        assert_eq!(v.len(), 1);
    }
}
