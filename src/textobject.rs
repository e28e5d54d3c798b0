//! The text-object table (§4.4): named functions returning a `[start,end)`
//! range around a position, each either an `INNER` or `OUTER` variant of
//! the same syntactic unit.

use std::collections::HashMap;
use std::ops::Range;

use crate::file::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextObjectId {
    Word,
    BigWord,
    Sentence,
    Paragraph,
    Paren,
    Bracket,
    Brace,
    Angle,
    DoubleQuote,
    SingleQuote,
    Backtick,
    File,
    Function,
    Line,
}

pub type TextObjectFn = fn(&File, usize, bool) -> Option<Range<usize>>;

pub struct TextObjectTable {
    entries: HashMap<TextObjectId, TextObjectFn>,
}

impl TextObjectTable {
    /// Runs `id` at `pos`; `inner` selects the `INNER` variant (delimiters
    /// excluded) vs `OUTER` (§4.4: "for `OUTER` one byte is added on each
    /// side when composing with a range").
    pub fn run(&self, id: TextObjectId, file: &File, pos: usize, inner: bool) -> Option<Range<usize>> {
        (self.entries[&id])(file, pos, inner)
    }

    /// Repeating `count > 1` (§4.4): unions the object at `pos` with
    /// objects seeded at each successive `end + 1`, clipped to buffer size.
    pub fn run_repeated(
        &self,
        id: TextObjectId,
        file: &File,
        pos: usize,
        inner: bool,
        count: u32,
    ) -> Option<Range<usize>> {
        let mut range = self.run(id, file, pos, inner)?;
        let size = file.text.size();
        for _ in 1..count.max(1) {
            let next_pos = (range.end + 1).min(size);
            let Some(more) = self.run(id, file, next_pos, inner) else { break };
            range = range.start.min(more.start)..range.end.max(more.end).min(size);
        }
        Some(range)
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

fn word_object(file: &File, pos: usize, big: bool, inner: bool) -> Option<Range<usize>> {
    let s = text_string(file);
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    if chars.is_empty() {
        return None;
    }
    let i = chars.iter().position(|&(b, _)| b >= pos).unwrap_or(chars.len() - 1).min(chars.len() - 1);
    let class = |c: char| if big { u8::from(classify(c) != 0) } else { classify(c) };
    let at_class = class(chars[i].1);

    let mut start = i;
    while start > 0 && class(chars[start - 1].1) == at_class {
        start -= 1;
    }
    let mut end = i;
    while end + 1 < chars.len() && class(chars[end + 1].1) == at_class {
        end += 1;
    }
    let start_byte = chars[start].0;
    let mut end_byte = chars.get(end + 1).map_or(s.len(), |&(b, _)| b);

    if !inner && at_class != 0 {
        let before_trailing = end_byte;
        let mut trail = end + 1;
        while trail < chars.len() && classify(chars[trail].1) == 0 {
            trail += 1;
        }
        end_byte = chars.get(trail).map_or(s.len(), |&(b, _)| b);
        if end_byte == before_trailing && start > 0 {
            // No trailing whitespace: fall back to swallowing leading
            // whitespace instead (familiar `aw` behaviour at EOF).
            let mut lead = start;
            while lead > 0 && classify(chars[lead - 1].1) == 0 {
                lead -= 1;
            }
            return Some(chars[lead].0..end_byte);
        }
    }
    Some(start_byte..end_byte)
}

fn line_object(file: &File, pos: usize, inner: bool) -> Option<Range<usize>> {
    let start = file.text.line_start(pos);
    let finish = file.text.line_finish(pos);
    if inner {
        Some(start..finish)
    } else {
        Some(start..file.text.line_end(pos).max(finish))
    }
}

fn paragraph_object(file: &File, pos: usize, inner: bool) -> Option<Range<usize>> {
    let mut start = file.text.line_start(pos);
    loop {
        let Some(prev) = file.text.line_prev(start) else { break };
        if file.text.line_start(prev) == file.text.line_finish(prev) {
            break;
        }
        start = prev;
    }
    let mut end = file.text.line_finish(pos);
    loop {
        let Some(next) = file.text.line_next(end) else { break };
        if file.text.line_start(next) == file.text.line_finish(next) {
            break;
        }
        end = file.text.line_finish(next);
    }
    if !inner {
        if let Some(next) = file.text.line_next(end) {
            if file.text.line_start(next) == file.text.line_finish(next) {
                end = file.text.line_end(next);
            }
        }
    }
    Some(start..end)
}

fn sentence_object(file: &File, pos: usize, _inner: bool) -> Option<Range<usize>> {
    let s = text_string(file);
    let is_end = |c: char| matches!(c, '.' | '!' | '?');
    let bytes: Vec<char> = s.chars().collect();
    let byte_offsets: Vec<usize> = s.char_indices().map(|(b, _)| b).collect();
    if bytes.is_empty() {
        return None;
    }
    let idx = byte_offsets.iter().position(|&b| b >= pos).unwrap_or(bytes.len() - 1).min(bytes.len() - 1);

    let mut start = idx;
    while start > 0 {
        let prev = bytes[start - 1];
        if is_end(prev) {
            break;
        }
        start -= 1;
    }
    while start < bytes.len() && bytes[start].is_whitespace() {
        start += 1;
    }
    let mut end = idx;
    while end < bytes.len() && !is_end(bytes[end]) {
        end += 1;
    }
    if end < bytes.len() {
        end += 1;
    }
    let start_byte = byte_offsets.get(start).copied().unwrap_or(s.len());
    let end_byte = byte_offsets.get(end).copied().unwrap_or(s.len());
    Some(start_byte.min(end_byte)..end_byte.max(start_byte))
}

fn enclosing_pair(file: &File, pos: usize, open: u8, close: u8) -> Option<(usize, usize)> {
    let size = file.text.size();
    if pos >= size {
        return None;
    }
    let mut depth: i64 = 0;
    let mut i = pos;
    let open_pos = loop {
        let b = file.text.byte(i)?;
        if b == close && i != pos {
            depth += 1;
        } else if b == open {
            if depth == 0 {
                break i;
            }
            depth -= 1;
        }
        if i == 0 {
            return None;
        }
        i -= 1;
    };

    let mut depth2: i64 = 0;
    let mut j = open_pos + 1;
    while j < size {
        let b = file.text.byte(j)?;
        if b == open {
            depth2 += 1;
        } else if b == close {
            if depth2 == 0 {
                return Some((open_pos, j));
            }
            depth2 -= 1;
        }
        j += 1;
    }
    None
}

fn pair_object(file: &File, pos: usize, open: u8, close: u8, inner: bool) -> Option<Range<usize>> {
    let (o, c) = enclosing_pair(file, pos, open, close)?;
    if inner {
        Some(o + 1..c)
    } else {
        Some(o..c + 1)
    }
}

fn quote_object(file: &File, pos: usize, quote: u8, inner: bool) -> Option<Range<usize>> {
    let line_start = file.text.line_start(pos);
    let line_finish = file.text.line_finish(pos);
    let mut quotes = Vec::new();
    let mut i = line_start;
    while i < line_finish {
        if file.text.byte(i) == Some(quote) {
            quotes.push(i);
        }
        i += 1;
    }
    for pair in quotes.chunks(2) {
        if let [open, close] = pair {
            if pos >= *open && pos <= *close {
                return if inner {
                    Some(open + 1..*close)
                } else {
                    Some(*open..*close + 1)
                };
            }
        }
    }
    None
}

pub fn default_table() -> TextObjectTable {
    let mut entries: HashMap<TextObjectId, TextObjectFn> = HashMap::new();
    entries.insert(TextObjectId::Word, |f, p, i| word_object(f, p, false, i));
    entries.insert(TextObjectId::BigWord, |f, p, i| word_object(f, p, true, i));
    entries.insert(TextObjectId::Sentence, sentence_object);
    entries.insert(TextObjectId::Paragraph, paragraph_object);
    entries.insert(TextObjectId::Paren, |f, p, i| pair_object(f, p, b'(', b')', i));
    entries.insert(TextObjectId::Bracket, |f, p, i| pair_object(f, p, b'[', b']', i));
    entries.insert(TextObjectId::Brace, |f, p, i| pair_object(f, p, b'{', b'}', i));
    entries.insert(TextObjectId::Function, |f, p, i| pair_object(f, p, b'{', b'}', i));
    entries.insert(TextObjectId::Angle, |f, p, i| pair_object(f, p, b'<', b'>', i));
    entries.insert(TextObjectId::DoubleQuote, |f, p, i| quote_object(f, p, b'"', i));
    entries.insert(TextObjectId::SingleQuote, |f, p, i| quote_object(f, p, b'\'', i));
    entries.insert(TextObjectId::Backtick, |f, p, i| quote_object(f, p, b'`', i));
    entries.insert(TextObjectId::File, |f, _p, _i| Some(0..f.text.size()));
    entries.insert(TextObjectId::Line, line_object);
    TextObjectTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SimpleText;

    #[test]
    fn inner_word_excludes_trailing_space() {
        let file = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        let table = default_table();
        let r = table.run(TextObjectId::Word, &file, 0, true).unwrap();
        assert_eq!(r, 0..5);
    }

    #[test]
    fn outer_word_includes_trailing_space() {
        let file = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        let table = default_table();
        let r = table.run(TextObjectId::Word, &file, 0, false).unwrap();
        assert_eq!(r, 0..6);
    }

    #[test]
    fn inner_paren_excludes_delimiters() {
        let file = File::new(Box::new(SimpleText::new(*b"foo(bar)baz")), None);
        let table = default_table();
        let r = table.run(TextObjectId::Paren, &file, 5, true).unwrap();
        assert_eq!(r, 4..7);
    }

    #[test]
    fn outer_paren_includes_delimiters() {
        let file = File::new(Box::new(SimpleText::new(*b"foo(bar)baz")), None);
        let table = default_table();
        let r = table.run(TextObjectId::Paren, &file, 5, false).unwrap();
        assert_eq!(r, 3..8);
    }

    #[test]
    fn quote_object_finds_span_on_line() {
        let file = File::new(Box::new(SimpleText::new(*b"say \"hello\" now")), None);
        let table = default_table();
        let r = table.run(TextObjectId::DoubleQuote, &file, 6, true).unwrap();
        assert_eq!(r, 5..10);
    }

    #[test]
    fn file_object_spans_everything() {
        let file = File::new(Box::new(SimpleText::new(*b"abc\ndef\n")), None);
        let table = default_table();
        let r = table.run(TextObjectId::File, &file, 3, true).unwrap();
        assert_eq!(r, 0..8);
    }

    #[test]
    fn repeated_count_unions_successive_objects() {
        let file = File::new(Box::new(SimpleText::new(*b"one two three")), None);
        let table = default_table();
        let r = table.run_repeated(TextObjectId::Word, &file, 0, true, 3).unwrap();
        assert_eq!(r.start, 0);
        assert!(r.end >= 11);
    }
}
