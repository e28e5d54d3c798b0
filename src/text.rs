//! The `Text` collaborator (§6): an abstract byte buffer with stable marks,
//! history snapshots and regex search. The core treats this as an external
//! interface; [`SimpleText`] is a reference implementation (an in-memory
//! `Vec<u8>`) good enough to drive the executor and the test suite without
//! a memory-mapped-file backend.

use std::ops::Range;

use regex::Regex;

use crate::error::{EditorError, Result};

/// Newline convention detected when a file is loaded. Not acted on by the
/// core beyond display/round-tripping; kept here because it is part of the
/// `Text` collaborator surface (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineKind {
    Lf,
    CrLf,
}

/// A minimal stat record, enough for the status line and for `:w` to detect
/// an out-of-band modification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stat {
    pub len: u64,
    pub mtime: u64,
}

/// Opaque token identifying a point in a `Text`'s undo history. Two reads
/// compare equal iff no snapshot has been taken between them; the
/// changelist (§4.8) uses this to decide whether to reset its walk index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryState(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// The abstract buffer primitive consumed by the core (§3, §6). Insertion,
/// deletion, line/position mapping, marks, snapshotting and regex search are
/// all collaborator concerns; the mode graph, motion/operator/executor code
/// only ever goes through this trait.
pub trait Text {
    fn size(&self) -> usize;
    fn byte(&self, pos: usize) -> Option<u8>;
    fn slice(&self, range: Range<usize>) -> Vec<u8>;

    fn insert(&mut self, pos: usize, bytes: &[u8]);
    fn delete(&mut self, pos: usize, len: usize);

    /// Start of the line containing `pos`.
    fn line_start(&self, pos: usize) -> usize;
    /// One past the last byte of the line containing `pos` (before its
    /// newline, if any).
    fn line_finish(&self, pos: usize) -> usize;
    /// Start of the line containing `pos`, including its newline.
    fn line_begin(&self, pos: usize) -> usize {
        self.line_start(pos)
    }
    /// One past the line's newline, or `size()` on the last line.
    fn line_end(&self, pos: usize) -> usize;
    fn line_prev(&self, pos: usize) -> Option<usize>;
    fn line_next(&self, pos: usize) -> Option<usize>;
    fn pos_by_lineno(&self, lineno: usize) -> Option<usize>;
    fn line_offset(&self, pos: usize) -> usize {
        pos - self.line_start(pos)
    }
    fn lineno_by_pos(&self, pos: usize) -> usize;
    fn line_count(&self) -> usize;

    fn mark_set(&mut self, id: usize, pos: usize);
    fn mark_get(&self, id: usize) -> Option<usize>;
    fn mark_clear(&mut self, id: usize);

    /// Records an undo point. Returns the new history token.
    fn snapshot(&mut self) -> HistoryState;
    fn history_state(&self) -> HistoryState;
    /// Position of the `idx`-th most recent recorded change (0 = most
    /// recent). `None` once `idx` runs past the end of history (§4.8).
    fn history_pos(&self, idx: usize) -> Option<usize>;
    fn undo(&mut self) -> Option<usize>;
    fn redo(&mut self) -> Option<usize>;

    fn regex_search(
        &self,
        pattern: &str,
        start: usize,
        dir: SearchDirection,
        wrap: bool,
    ) -> Result<Option<Range<usize>>>;

    fn sigbus(&self, addr: usize) -> bool;
    fn newline(&self) -> NewlineKind;
    fn stat(&self) -> Stat;
    fn truncated(&self) -> bool;
    fn set_truncated(&mut self, truncated: bool);

    fn as_bytes(&self) -> Vec<u8> {
        self.slice(0..self.size())
    }
}

/// Reference `Text` implementation backing the editor when no
/// memory-mapped backend is wired in (tests, the demo binary). Undo is
/// whole-buffer snapshotting, which is simple and exercises every part of
/// the `Text` contract the core depends on without needing a real rope.
pub struct SimpleText {
    buf: Vec<u8>,
    marks: std::collections::HashMap<usize, usize>,
    newline: NewlineKind,
    stat: Stat,
    truncated: bool,

    undo_stack: Vec<Vec<u8>>,
    redo_stack: Vec<Vec<u8>>,
    /// Byte position of each change, most-recent-last; mirrors whichever of
    /// `undo_stack`/`redo_stack` is "live" well enough for §4.8's walk.
    change_log: Vec<usize>,
    history_token: u64,
}

impl SimpleText {
    pub fn new(initial: impl Into<Vec<u8>>) -> Self {
        let buf = initial.into();
        let newline = if buf.windows(2).any(|w| w == b"\r\n") {
            NewlineKind::CrLf
        } else {
            NewlineKind::Lf
        };
        Self {
            buf,
            marks: std::collections::HashMap::new(),
            newline,
            stat: Stat::default(),
            truncated: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            change_log: Vec::new(),
            history_token: 0,
        }
    }

    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        match path {
            None => Ok(Self::new(Vec::new())),
            Some(p) => {
                let bytes = std::fs::read(p)?;
                let meta = std::fs::metadata(p)?;
                let mut text = Self::new(bytes);
                text.stat = Stat {
                    len: meta.len(),
                    mtime: meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| d.as_secs())
                        .unwrap_or(0),
                };
                Ok(text)
            }
        }
    }

    fn shift_marks(&mut self, at: usize, delta: isize) {
        for pos in self.marks.values_mut() {
            if *pos >= at {
                *pos = (*pos as isize + delta).max(at as isize) as usize;
            }
        }
    }
}

impl Text for SimpleText {
    fn size(&self) -> usize {
        self.buf.len()
    }

    fn byte(&self, pos: usize) -> Option<u8> {
        self.buf.get(pos).copied()
    }

    fn slice(&self, range: Range<usize>) -> Vec<u8> {
        self.buf[range.start.min(self.buf.len())..range.end.min(self.buf.len())].to_vec()
    }

    fn insert(&mut self, pos: usize, bytes: &[u8]) {
        let pos = pos.min(self.buf.len());
        self.buf.splice(pos..pos, bytes.iter().copied());
        self.shift_marks(pos, bytes.len() as isize);
        self.change_log.push(pos);
    }

    fn delete(&mut self, pos: usize, len: usize) {
        let pos = pos.min(self.buf.len());
        let end = (pos + len).min(self.buf.len());
        self.buf.drain(pos..end);
        let removed = end - pos;
        for mpos in self.marks.values_mut() {
            if *mpos >= end {
                *mpos -= removed;
            } else if *mpos > pos {
                *mpos = pos;
            }
        }
        self.change_log.push(pos);
    }

    fn line_start(&self, pos: usize) -> usize {
        let pos = pos.min(self.buf.len());
        self.buf[..pos].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1)
    }

    fn line_finish(&self, pos: usize) -> usize {
        let pos = pos.min(self.buf.len());
        self.buf[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.buf.len(), |i| pos + i)
    }

    fn line_end(&self, pos: usize) -> usize {
        let finish = self.line_finish(pos);
        (finish + 1).min(self.buf.len()).max(finish)
    }

    fn line_prev(&self, pos: usize) -> Option<usize> {
        let start = self.line_start(pos);
        if start == 0 {
            None
        } else {
            Some(self.line_start(start - 1))
        }
    }

    fn line_next(&self, pos: usize) -> Option<usize> {
        let end = self.line_end(pos);
        if end >= self.buf.len() {
            None
        } else {
            Some(end)
        }
    }

    fn pos_by_lineno(&self, lineno: usize) -> Option<usize> {
        if lineno == 0 {
            return Some(0);
        }
        let mut count = 0;
        for (i, &b) in self.buf.iter().enumerate() {
            if b == b'\n' {
                count += 1;
                if count == lineno {
                    return Some((i + 1).min(self.buf.len()));
                }
            }
        }
        None
    }

    fn lineno_by_pos(&self, pos: usize) -> usize {
        self.buf[..pos.min(self.buf.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
    }

    fn line_count(&self) -> usize {
        self.lineno_by_pos(self.buf.len()) + 1
    }

    fn mark_set(&mut self, id: usize, pos: usize) {
        self.marks.insert(id, pos.min(self.buf.len()));
    }

    fn mark_get(&self, id: usize) -> Option<usize> {
        self.marks.get(&id).copied()
    }

    fn mark_clear(&mut self, id: usize) {
        self.marks.remove(&id);
    }

    fn snapshot(&mut self) -> HistoryState {
        self.undo_stack.push(self.buf.clone());
        self.redo_stack.clear();
        self.history_token += 1;
        HistoryState(self.history_token)
    }

    fn history_state(&self) -> HistoryState {
        HistoryState(self.history_token)
    }

    fn history_pos(&self, idx: usize) -> Option<usize> {
        let len = self.change_log.len();
        if idx >= len {
            None
        } else {
            self.change_log.get(len - 1 - idx).copied()
        }
    }

    fn undo(&mut self) -> Option<usize> {
        let prev = self.undo_stack.pop()?;
        self.redo_stack.push(std::mem::replace(&mut self.buf, prev));
        self.history_token += 1;
        Some(0)
    }

    fn redo(&mut self) -> Option<usize> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(std::mem::replace(&mut self.buf, next));
        self.history_token += 1;
        Some(0)
    }

    fn regex_search(
        &self,
        pattern: &str,
        start: usize,
        dir: SearchDirection,
        wrap: bool,
    ) -> Result<Option<Range<usize>>> {
        let re = Regex::new(pattern).map_err(EditorError::Regex)?;
        let hay = String::from_utf8_lossy(&self.buf);
        let start = start.min(hay.len());

        match dir {
            SearchDirection::Forward => {
                if let Some(m) = re.find_at(&hay, start) {
                    return Ok(Some(m.start()..m.end()));
                }
                if wrap {
                    if let Some(m) = re.find(&hay) {
                        if m.start() < start {
                            return Ok(Some(m.start()..m.end()));
                        }
                    }
                }
                Ok(None)
            }
            SearchDirection::Backward => {
                let before = re
                    .find_iter(&hay[..start])
                    .last()
                    .map(|m| m.start()..m.end());
                if before.is_some() {
                    return Ok(before);
                }
                if wrap {
                    if let Some(m) = re.find_iter(&hay).last() {
                        if m.start() >= start {
                            return Ok(Some(m.start()..m.end()));
                        }
                    }
                }
                Ok(None)
            }
        }
    }

    fn sigbus(&self, _addr: usize) -> bool {
        false
    }

    fn newline(&self) -> NewlineKind {
        self.newline
    }

    fn stat(&self) -> Stat {
        self.stat
    }

    fn truncated(&self) -> bool {
        self.truncated
    }

    fn set_truncated(&mut self, truncated: bool) {
        self.truncated = truncated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shifts_marks_at_or_after_pos() {
        let mut t = SimpleText::new(*b"hello world");
        t.mark_set(0, 6);
        t.insert(0, b"XX");
        assert_eq!(t.mark_get(0), Some(8));
    }

    #[test]
    fn insert_does_not_shift_marks_before_pos() {
        let mut t = SimpleText::new(*b"hello world");
        t.mark_set(0, 2);
        t.insert(6, b"XX");
        assert_eq!(t.mark_get(0), Some(2));
    }

    #[test]
    fn delete_clamps_marks_inside_deleted_range() {
        let mut t = SimpleText::new(*b"hello world");
        t.mark_set(0, 3);
        t.delete(0, 5);
        assert_eq!(t.mark_get(0), Some(0));
    }

    #[test]
    fn line_navigation() {
        let t = SimpleText::new(*b"abc\ndef\nghi");
        assert_eq!(t.line_start(5), 4);
        assert_eq!(t.line_finish(5), 7);
        assert_eq!(t.line_next(1), Some(4));
        assert_eq!(t.line_prev(5), Some(0));
        assert_eq!(t.line_count(), 3);
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut t = SimpleText::new(*b"abc");
        t.snapshot();
        t.insert(3, b"def");
        assert_eq!(t.as_bytes(), b"abcdef");
        t.undo();
        assert_eq!(t.as_bytes(), b"abc");
        t.redo();
        assert_eq!(t.as_bytes(), b"abcdef");
    }

    #[test]
    fn search_wraps() {
        let t = SimpleText::new(*b"foo bar\nfoo baz\n");
        let hit = t
            .regex_search("foo", 1, SearchDirection::Forward, true)
            .unwrap()
            .unwrap();
        assert_eq!(hit, 8..11);
    }
}
