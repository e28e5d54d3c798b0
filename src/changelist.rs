//! The changelist (§3, §4.8): a per-window walk over a `Text`'s edit
//! history, driven by `g;`/`g,`. Resets to index 0 whenever the text's
//! history state token has moved since the last walk (i.e. an edit
//! happened), so `g;` after a fresh change always starts from that change.

use crate::text::{HistoryState, Text};

pub struct Changelist {
    index: usize,
    state: Option<HistoryState>,
}

impl Changelist {
    pub fn new() -> Self {
        Self {
            index: 0,
            state: None,
        }
    }

    fn sync(&mut self, text: &dyn Text) {
        let current = text.history_state();
        if self.state != Some(current) {
            self.index = 0;
            self.state = Some(current);
        }
    }

    /// `g;`: step to an older change. `None` ("past the end", §4.8) leaves
    /// the index where it was so a subsequent `g,` can still retrace.
    pub fn older(&mut self, text: &dyn Text) -> Option<usize> {
        self.sync(text);
        match text.history_pos(self.index) {
            Some(pos) => {
                self.index += 1;
                Some(pos)
            }
            None => None,
        }
    }

    /// `g,`: step to a newer change.
    pub fn newer(&mut self, text: &dyn Text) -> Option<usize> {
        self.sync(text);
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        text.history_pos(self.index)
    }
}

impl Default for Changelist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SimpleText;

    #[test]
    fn older_then_newer_retraces() {
        let mut t = SimpleText::new(*b"abc");
        t.insert(0, b"X");
        t.insert(0, b"Y");
        let mut cl = Changelist::new();
        let first = cl.older(&t);
        assert!(first.is_some());
        let second = cl.older(&t);
        assert!(second.is_some());
        assert_eq!(cl.newer(&t), second);
    }

    #[test]
    fn resets_when_text_changes_since_last_walk() {
        let mut t = SimpleText::new(*b"abc");
        t.insert(0, b"X");
        let mut cl = Changelist::new();
        cl.older(&t);
        t.insert(0, b"Y");
        // A new edit happened; the walk must restart from the most recent
        // change rather than continuing where it left off.
        assert_eq!(cl.older(&t), t.history_pos(0));
    }

    #[test]
    fn past_the_end_returns_none() {
        let mut t = SimpleText::new(*b"abc");
        t.insert(0, b"X");
        let mut cl = Changelist::new();
        cl.older(&t);
        assert_eq!(cl.older(&t), None);
    }
}
