//! The motion table (§4.3, §9 design note): named functions from a starting
//! byte position to a target one, each tagged with the subset of
//! [`ActionFlags`] that govern how they combine with an operator
//! (`CHARWISE`/`LINEWISE`/`INCLUSIVE`/`JUMP`/`IDEMPOTENT`).
//!
//! A design note models motions as a tagged union over
//! `{TextFn, CursorFn, FileFn, ViewFn, VisFn, WinFn}` signatures. This
//! crate unifies all six behind one [`MotionCtx`] — a context bundling
//! everything any of those variants could need — and keeps [`MotionKind`]
//! purely as a categorizing tag, carried alongside each table entry for
//! tracing and documentation rather than for dispatch (see `DESIGN.md`).

use std::collections::HashMap;

use crate::action::ActionFlags;
use crate::config::Config;
use crate::file::File;
use crate::text::SearchDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionId {
    Left,
    Right,
    Up,
    Down,
    WordForward,
    WordBackward,
    WordEndForward,
    WordEndBackward,
    BigWordForward,
    BigWordBackward,
    BigWordEndForward,
    LineStart,
    LineFirstNonBlank,
    LineEnd,
    GotoLine,
    FileStart,
    FileEnd,
    FindCharForward,
    FindCharBackward,
    TillCharForward,
    TillCharBackward,
    RepeatFind,
    RepeatFindOpposite,
    MatchingBracket,
    ParagraphForward,
    ParagraphBackward,
    SearchForward,
    SearchBackward,
    SearchNext,
    SearchPrev,
    WordUnderCursorForward,
    WordUnderCursorBackward,
    MarkGoto,
    MarkGotoLine,
    Nop,
}

/// The categorizing tag from the design note above (§9). Not consulted by
/// the executor's dispatch (every entry shares one [`MotionCtx`] signature)
/// — it documents which collaborator the original, signature-polymorphic
/// version of each motion would have closed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Text,
    Cursor,
    File,
    View,
    Vis,
    Win,
}

/// Remembers enough cross-keystroke state to make `;`/`,` (repeat
/// find-char) and `n`/`N` (repeat search) work, and the last search pattern
/// for `*`/`#` (§4.3, §9A). One instance per window.
#[derive(Default)]
pub struct SearchState {
    pub last_find: Option<(char, bool, bool)>, // (char, forward, till)
    pub last_pattern: Option<String>,
    pub last_dir: SearchDirection2,
}

/// A plain mirror of [`SearchDirection`] with a `Default` impl, since the
/// collaborator's own type intentionally carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection2 {
    Forward,
    Backward,
}

impl Default for SearchDirection2 {
    fn default() -> Self {
        SearchDirection2::Forward
    }
}

impl From<SearchDirection2> for SearchDirection {
    fn from(d: SearchDirection2) -> Self {
        match d {
            SearchDirection2::Forward => SearchDirection::Forward,
            SearchDirection2::Backward => SearchDirection::Backward,
        }
    }
}

/// Everything a motion might need, unifying the six polymorphic
/// signatures above (§4.3, §9) behind one borrow set.
pub struct MotionCtx<'a> {
    pub file: &'a mut File,
    pub pos: usize,
    pub search: &'a mut SearchState,
    pub config: &'a Config,
    /// The find-char/mark-goto argument (the character after `f`/`` ` ``/…).
    pub arg: Option<char>,
    /// The explicit count typed before this motion (`None` if the user gave
    /// none). Distinct from the repetition count `run()` loops over: `G`
    /// treats its count as an absolute target line, not a repeat factor.
    pub count: Option<u32>,
}

pub type MotionFn = fn(&mut MotionCtx) -> Option<usize>;

pub struct MotionEntry {
    pub func: MotionFn,
    pub flags: ActionFlags,
    pub kind: MotionKind,
}

pub struct MotionTable {
    entries: HashMap<MotionId, MotionEntry>,
}

impl MotionTable {
    pub fn get(&self, id: MotionId) -> &MotionEntry {
        &self.entries[&id]
    }

    /// Runs a motion up to `count` times (unless `IDEMPOTENT`, §4.3),
    /// aborting the whole repetition if any step returns `None` ("if any
    /// step returns `EPOS` the motion aborts and the range stays empty").
    pub fn run(&self, id: MotionId, ctx: &mut MotionCtx, count: u32) -> Option<usize> {
        let entry = self.get(id);
        let reps = if entry.flags.contains(ActionFlags::IDEMPOTENT) {
            1
        } else {
            count.max(1)
        };
        let mut pos = ctx.pos;
        for _ in 0..reps {
            ctx.pos = pos;
            pos = (entry.func)(ctx)?;
        }
        Some(pos)
    }
}

fn classify(c: char) -> u8 {
    if c.is_whitespace() {
        0
    } else if c.is_alphanumeric() || c == '_' {
        1
    } else {
        2
    }
}

fn text_string(file: &File) -> String {
    String::from_utf8_lossy(&file.text.as_bytes()).into_owned()
}

fn word_forward(ctx: &mut MotionCtx, big: bool) -> Option<usize> {
    let s = text_string(ctx.file);
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let len = s.len();
    if ctx.pos >= len {
        return None;
    }
    let mut i = chars.iter().position(|&(b, _)| b >= ctx.pos).unwrap_or(chars.len());
    if i >= chars.len() {
        return Some(len);
    }
    let start_class = if big { u8::from(classify(chars[i].1) != 0) } else { classify(chars[i].1) };
    while i < chars.len() {
        let c = classify(chars[i].1);
        let c = if big { u8::from(c != 0) } else { c };
        if c != start_class {
            break;
        }
        i += 1;
    }
    while i < chars.len() && classify(chars[i].1) == 0 {
        i += 1;
    }
    Some(chars.get(i).map_or(len, |&(b, _)| b))
}

fn word_backward(ctx: &mut MotionCtx, big: bool) -> Option<usize> {
    let s = text_string(ctx.file);
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    if ctx.pos == 0 {
        return None;
    }
    let mut i = chars.iter().position(|&(b, _)| b >= ctx.pos).unwrap_or(chars.len());
    if i == 0 {
        return Some(0);
    }
    i -= 1;
    while i > 0 && classify(chars[i].1) == 0 {
        i -= 1;
    }
    let class = if big { u8::from(classify(chars[i].1) != 0) } else { classify(chars[i].1) };
    while i > 0 {
        let c = classify(chars[i - 1].1);
        let c = if big { u8::from(c != 0) } else { c };
        if c != class {
            break;
        }
        i -= 1;
    }
    Some(chars.get(i).map_or(0, |&(b, _)| b))
}

fn word_end_forward(ctx: &mut MotionCtx, big: bool) -> Option<usize> {
    let s = text_string(ctx.file);
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    if chars.is_empty() {
        return None;
    }
    let mut i = chars.iter().position(|&(b, _)| b >= ctx.pos).unwrap_or(chars.len());
    if i + 1 >= chars.len() {
        return None;
    }
    i += 1;
    while i < chars.len() && classify(chars[i].1) == 0 {
        i += 1;
    }
    if i >= chars.len() {
        return None;
    }
    let class = if big { u8::from(classify(chars[i].1) != 0) } else { classify(chars[i].1) };
    while i + 1 < chars.len() {
        let c = classify(chars[i + 1].1);
        let c = if big { u8::from(c != 0) } else { c };
        if c != class {
            break;
        }
        i += 1;
    }
    Some(chars[i].0)
}

fn find_char(ctx: &mut MotionCtx, forward: bool, till: bool) -> Option<usize> {
    let target = ctx.arg?;
    let s = text_string(ctx.file);
    if forward {
        let mut iter = s[ctx.pos..].char_indices().skip(1);
        loop {
            let (off, c) = iter.next()?;
            if c == target {
                let abs = ctx.pos + off;
                return Some(if till { abs - 1 } else { abs });
            }
        }
    } else {
        let head = &s[..ctx.pos];
        let mut rev: Vec<(usize, char)> = head.char_indices().collect();
        rev.reverse();
        for (off, c) in rev {
            if c == target {
                return Some(if till { off + c.len_utf8() } else { off });
            }
        }
        None
    }
}

fn matching_bracket(ctx: &mut MotionCtx) -> Option<usize> {
    const PAIRS: [(u8, u8); 4] = [(b'(', b')'), (b'[', b']'), (b'{', b'}'), (b'<', b'>')];
    let cur = ctx.file.text.byte(ctx.pos)?;
    let (open, close, forward) = PAIRS
        .iter()
        .find_map(|&(o, c)| {
            if cur == o {
                Some((o, c, true))
            } else if cur == c {
                Some((o, c, false))
            } else {
                None
            }
        })?;
    let size = ctx.file.text.size();
    let mut depth = 1i64;
    if forward {
        let mut i = ctx.pos + 1;
        while i < size {
            let b = ctx.file.text.byte(i)?;
            if b == open {
                depth += 1;
            } else if b == close {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            i += 1;
        }
    } else {
        let mut i = ctx.pos;
        while i > 0 {
            i -= 1;
            let b = ctx.file.text.byte(i)?;
            if b == close {
                depth += 1;
            } else if b == open {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
    }
    None
}

fn word_under_cursor(ctx: &mut MotionCtx, forward: bool) -> Option<usize> {
    let s = text_string(ctx.file);
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let mut i = chars.iter().position(|&(b, _)| b >= ctx.pos).unwrap_or(chars.len());
    while i < chars.len() && classify(chars[i].1) != 1 {
        i += 1;
    }
    let start = i;
    while i < chars.len() && classify(chars[i].1) == 1 {
        i += 1;
    }
    if start >= chars.len() {
        return None;
    }
    let word_start_byte = chars[start].0;
    let word_end_byte = chars.get(i).map_or(s.len(), |&(b, _)| b);
    let pattern = regex::escape(&s[word_start_byte..word_end_byte]);
    let pattern = format!(r"\b{pattern}\b");
    ctx.search.last_pattern = Some(pattern.clone());
    let dir = if forward { SearchDirection::Forward } else { SearchDirection::Backward };
    ctx.search.last_dir = if forward { SearchDirection2::Forward } else { SearchDirection2::Backward };
    let search_from = if forward { word_end_byte } else { word_start_byte };
    ctx.file
        .text
        .regex_search(&pattern, search_from, dir, ctx.config.wrap_search)
        .ok()
        .flatten()
        .map(|r| r.start)
}

fn search(ctx: &mut MotionCtx, dir: SearchDirection) -> Option<usize> {
    let pattern = ctx.arg.map(|c| c.to_string()).or_else(|| ctx.search.last_pattern.clone())?;
    ctx.search.last_pattern = Some(pattern.clone());
    ctx.search.last_dir = match dir {
        SearchDirection::Forward => SearchDirection2::Forward,
        SearchDirection::Backward => SearchDirection2::Backward,
    };
    let start = match dir {
        SearchDirection::Forward => ctx.pos + 1,
        SearchDirection::Backward => ctx.pos,
    };
    ctx.file
        .text
        .regex_search(&pattern, start, dir, ctx.config.wrap_search)
        .ok()
        .flatten()
        .map(|r| r.start)
}

pub fn default_table() -> MotionTable {
    let mut entries = HashMap::new();
    macro_rules! add {
        ($id:expr, $f:expr, $flags:expr, $kind:expr) => {
            entries.insert($id, MotionEntry { func: $f, flags: $flags, kind: $kind });
        };
    }

    add!(MotionId::Left, |ctx| Some(ctx.pos.saturating_sub(1).max(ctx.file.text.line_start(ctx.pos))), ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::Right, |ctx| {
        let end = ctx.file.text.line_finish(ctx.pos);
        if ctx.pos < end { Some(ctx.pos + 1) } else { None }
    }, ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::Up, |ctx| {
        let prev = ctx.file.text.line_prev(ctx.pos)?;
        let col = ctx.pos - ctx.file.text.line_start(ctx.pos);
        Some((prev + col).min(ctx.file.text.line_finish(prev)))
    }, ActionFlags::LINEWISE, MotionKind::Cursor);
    add!(MotionId::Down, |ctx| {
        let next = ctx.file.text.line_next(ctx.pos)?;
        let col = ctx.pos - ctx.file.text.line_start(ctx.pos);
        Some((next + col).min(ctx.file.text.line_finish(next)))
    }, ActionFlags::LINEWISE, MotionKind::Cursor);

    add!(MotionId::WordForward, |ctx| word_forward(ctx, false), ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::WordBackward, |ctx| word_backward(ctx, false), ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::WordEndForward, |ctx| word_end_forward(ctx, false), ActionFlags::CHARWISE | ActionFlags::INCLUSIVE, MotionKind::Text);
    add!(MotionId::WordEndBackward, |ctx| word_backward(ctx, false), ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::BigWordForward, |ctx| word_forward(ctx, true), ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::BigWordBackward, |ctx| word_backward(ctx, true), ActionFlags::CHARWISE, MotionKind::Text);
    add!(MotionId::BigWordEndForward, |ctx| word_end_forward(ctx, true), ActionFlags::CHARWISE | ActionFlags::INCLUSIVE, MotionKind::Text);

    add!(MotionId::LineStart, |ctx| Some(ctx.file.text.line_start(ctx.pos)), ActionFlags::CHARWISE | ActionFlags::IDEMPOTENT, MotionKind::Text);
    add!(MotionId::LineFirstNonBlank, |ctx| {
        let start = ctx.file.text.line_start(ctx.pos);
        let finish = ctx.file.text.line_finish(ctx.pos);
        let mut i = start;
        while i < finish && ctx.file.text.byte(i).is_some_and(|b| b == b' ' || b == b'\t') {
            i += 1;
        }
        Some(i)
    }, ActionFlags::CHARWISE | ActionFlags::IDEMPOTENT, MotionKind::Text);
    add!(MotionId::LineEnd, |ctx| Some(ctx.file.text.line_finish(ctx.pos).saturating_sub(1).max(ctx.file.text.line_start(ctx.pos))), ActionFlags::CHARWISE | ActionFlags::INCLUSIVE | ActionFlags::IDEMPOTENT, MotionKind::Text);

    add!(MotionId::GotoLine, |ctx| {
        match ctx.count {
            Some(n) => ctx.file.text.pos_by_lineno((n as usize).saturating_sub(1)),
            None => ctx.file.text.pos_by_lineno(ctx.file.text.line_count().saturating_sub(1)),
        }
    }, ActionFlags::LINEWISE | ActionFlags::JUMP | ActionFlags::IDEMPOTENT, MotionKind::File);
    add!(MotionId::FileStart, |_ctx| Some(0), ActionFlags::LINEWISE | ActionFlags::JUMP | ActionFlags::IDEMPOTENT, MotionKind::Text);
    add!(MotionId::FileEnd, |ctx| ctx.file.text.pos_by_lineno(ctx.file.text.line_count().saturating_sub(1)), ActionFlags::LINEWISE | ActionFlags::JUMP | ActionFlags::IDEMPOTENT, MotionKind::Text);

    add!(MotionId::FindCharForward, |ctx| {
        let r = find_char(ctx, true, false);
        if let Some(c) = ctx.arg { ctx.search.last_find = Some((c, true, false)); }
        r
    }, ActionFlags::CHARWISE | ActionFlags::INCLUSIVE, MotionKind::Vis);
    add!(MotionId::FindCharBackward, |ctx| {
        let r = find_char(ctx, false, false);
        if let Some(c) = ctx.arg { ctx.search.last_find = Some((c, false, false)); }
        r
    }, ActionFlags::CHARWISE, MotionKind::Vis);
    add!(MotionId::TillCharForward, |ctx| {
        let r = find_char(ctx, true, true);
        if let Some(c) = ctx.arg { ctx.search.last_find = Some((c, true, true)); }
        r
    }, ActionFlags::CHARWISE | ActionFlags::INCLUSIVE, MotionKind::Vis);
    add!(MotionId::TillCharBackward, |ctx| {
        let r = find_char(ctx, false, true);
        if let Some(c) = ctx.arg { ctx.search.last_find = Some((c, false, true)); }
        r
    }, ActionFlags::CHARWISE, MotionKind::Vis);
    add!(MotionId::RepeatFind, |ctx| {
        let (c, forward, till) = (*ctx.search).last_find?;
        ctx.arg = Some(c);
        find_char(ctx, forward, till)
    }, ActionFlags::CHARWISE, MotionKind::Vis);
    add!(MotionId::RepeatFindOpposite, |ctx| {
        let (c, forward, till) = (*ctx.search).last_find?;
        ctx.arg = Some(c);
        find_char(ctx, !forward, till)
    }, ActionFlags::CHARWISE, MotionKind::Vis);

    add!(MotionId::MatchingBracket, matching_bracket, ActionFlags::CHARWISE | ActionFlags::INCLUSIVE | ActionFlags::JUMP, MotionKind::Text);

    add!(MotionId::ParagraphForward, |ctx| {
        let size = ctx.file.text.size();
        let mut pos = ctx.file.text.line_end(ctx.pos);
        while pos < size {
            let s = ctx.file.text.line_start(pos);
            let f = ctx.file.text.line_finish(pos);
            if s == f {
                return Some(pos);
            }
            let Some(next) = ctx.file.text.line_next(pos) else { return Some(size) };
            pos = next;
        }
        Some(size)
    }, ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Text);
    add!(MotionId::ParagraphBackward, |ctx| {
        let mut pos = ctx.file.text.line_start(ctx.pos);
        while pos > 0 {
            let Some(prev) = ctx.file.text.line_prev(pos) else { return Some(0) };
            pos = prev;
            let f = ctx.file.text.line_finish(pos);
            if pos == f {
                return Some(pos);
            }
        }
        Some(0)
    }, ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Text);

    add!(MotionId::SearchForward, |ctx| search(ctx, SearchDirection::Forward), ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Vis);
    add!(MotionId::SearchBackward, |ctx| search(ctx, SearchDirection::Backward), ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Vis);
    add!(MotionId::SearchNext, |ctx| {
        let dir = ctx.search.last_dir;
        ctx.arg = None;
        search(ctx, dir.into())
    }, ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Vis);
    add!(MotionId::SearchPrev, |ctx| {
        let dir = match ctx.search.last_dir {
            SearchDirection2::Forward => SearchDirection::Backward,
            SearchDirection2::Backward => SearchDirection::Forward,
        };
        ctx.arg = None;
        search(ctx, dir)
    }, ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Vis);
    add!(MotionId::WordUnderCursorForward, |ctx| word_under_cursor(ctx, true), ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Vis);
    add!(MotionId::WordUnderCursorBackward, |ctx| word_under_cursor(ctx, false), ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::Vis);

    add!(MotionId::MarkGoto, |ctx| ctx.arg.and_then(|m| ctx.file.get_mark(m)), ActionFlags::CHARWISE | ActionFlags::JUMP, MotionKind::File);
    add!(MotionId::MarkGotoLine, |ctx| ctx.arg.and_then(|m| ctx.file.get_mark(m)).map(|p| ctx.file.text.line_start(p)), ActionFlags::LINEWISE | ActionFlags::JUMP, MotionKind::File);

    add!(MotionId::Nop, |ctx| Some(ctx.pos), ActionFlags::CHARWISE | ActionFlags::IDEMPOTENT, MotionKind::Text);

    MotionTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SimpleText;

    fn ctx<'a>(file: &'a mut File, search: &'a mut SearchState, config: &'a Config, pos: usize) -> MotionCtx<'a> {
        MotionCtx { file, pos, search, config, arg: None, count: None }
    }

    #[test]
    fn word_forward_skips_to_next_word() {
        let mut file = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        let pos = table.run(MotionId::WordForward, &mut c, 1).unwrap();
        assert_eq!(pos, 6);
    }

    #[test]
    fn line_end_is_inclusive_and_idempotent() {
        let mut file = File::new(Box::new(SimpleText::new(*b"abc\n")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let entry = table.get(MotionId::LineEnd);
        assert!(entry.flags.contains(ActionFlags::INCLUSIVE));
        assert!(entry.flags.contains(ActionFlags::IDEMPOTENT));
        let mut c = ctx(&mut file, &mut search, &config, 0);
        let once = table.run(MotionId::LineEnd, &mut c, 1).unwrap();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        let many = table.run(MotionId::LineEnd, &mut c, 5).unwrap();
        assert_eq!(once, many);
    }

    #[test]
    fn find_char_forward_inclusive() {
        let mut file = File::new(Box::new(SimpleText::new(*b"foo bar")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        c.arg = Some('b');
        let pos = table.run(MotionId::FindCharForward, &mut c, 1).unwrap();
        assert_eq!(pos, 4);
    }

    #[test]
    fn matching_bracket_finds_pair() {
        let mut file = File::new(Box::new(SimpleText::new(*b"(foo (bar) baz)")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        let pos = table.run(MotionId::MatchingBracket, &mut c, 1).unwrap();
        assert_eq!(pos, 14);
    }

    #[test]
    fn goto_line_uses_explicit_count_as_target_line() {
        let mut file = File::new(Box::new(SimpleText::new(*b"a\nb\nc\n")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        c.count = Some(2);
        let pos = table.run(MotionId::GotoLine, &mut c, 1).unwrap();
        assert_eq!(pos, 2);
    }

    #[test]
    fn goto_line_without_count_goes_to_last_line() {
        let mut file = File::new(Box::new(SimpleText::new(*b"a\nb\nc\n")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        let pos = table.run(MotionId::GotoLine, &mut c, 1).unwrap();
        assert_eq!(pos, 4);
    }

    #[test]
    fn motion_aborts_and_stays_none_on_epos() {
        let mut file = File::new(Box::new(SimpleText::new(*b"abc")), None);
        let mut search = SearchState::default();
        let config = Config::default();
        let table = default_table();
        let mut c = ctx(&mut file, &mut search, &config, 0);
        assert!(table.run(MotionId::WordBackward, &mut c, 1).is_none());
    }
}
