//! `File` (§3): one `Text`, an optional filename, a vector of marks, a stat
//! record, and a truncation flag. Shared by windows through an `Rc<RefCell>`
//! in [`window::FileRegistry`](crate::window::FileRegistry); destroyed (by
//! `Rc` refcounting) when the last window referencing it closes.

use std::path::PathBuf;

use crate::text::{Stat, Text};

/// Reserved mark ids for the selection-endpoint marks kept per file (§3:
/// "file-global marks `'<`, `'>`").
pub const MARK_SELECTION_START: usize = 20_000;
pub const MARK_SELECTION_END: usize = 20_001;

/// Maps a lowercase mark letter `a`-`z` to its `Text` mark id.
pub fn mark_id(name: char) -> Option<usize> {
    if name.is_ascii_lowercase() {
        Some(name as usize - 'a' as usize)
    } else {
        None
    }
}

pub struct File {
    pub text: Box<dyn Text>,
    pub path: Option<PathBuf>,
    pub truncated: bool,
}

impl File {
    pub fn new(text: Box<dyn Text>, path: Option<PathBuf>) -> Self {
        Self {
            text,
            path,
            truncated: false,
        }
    }

    pub fn set_mark(&mut self, name: char, pos: usize) {
        if let Some(id) = mark_id(name) {
            self.text.mark_set(id, pos);
        }
    }

    pub fn get_mark(&self, name: char) -> Option<usize> {
        mark_id(name).and_then(|id| self.text.mark_get(id))
    }

    pub fn set_selection_marks(&mut self, start: usize, end: usize) {
        self.text.mark_set(MARK_SELECTION_START, start);
        self.text.mark_set(MARK_SELECTION_END, end);
    }

    pub fn selection_marks(&self) -> Option<(usize, usize)> {
        let start = self.text.mark_get(MARK_SELECTION_START)?;
        let end = self.text.mark_get(MARK_SELECTION_END)?;
        Some((start, end))
    }

    pub fn stat(&self) -> Stat {
        self.text.stat()
    }

    /// The `SIGBUS` cleanup path (§5, §7): mark the file as truncated and
    /// propagate to the `Text` collaborator so any mapped region it still
    /// refers to is known to be unreliable.
    pub fn mark_truncated(&mut self) {
        self.truncated = true;
        self.text.set_truncated(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SimpleText;

    #[test]
    fn named_marks_round_trip() {
        let mut f = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        f.set_mark('a', 6);
        assert_eq!(f.get_mark('a'), Some(6));
    }

    #[test]
    fn selection_marks_round_trip() {
        let mut f = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        f.set_selection_marks(2, 9);
        assert_eq!(f.selection_marks(), Some((2, 9)));
    }

    #[test]
    fn mark_id_rejects_non_lowercase() {
        assert_eq!(mark_id('A'), None);
        assert_eq!(mark_id('1'), None);
        assert_eq!(mark_id('a'), Some(0));
        assert_eq!(mark_id('z'), Some(25));
    }
}
