//! The operator table (§4.5): each operator consumes a `[start,end)` range
//! produced by a motion or text-object and performs one edit, writing
//! through a register where applicable. Follows the "compute a selection,
//! then apply one verb to it" shape of a delete/yank buffer operation,
//! generalized from a single clipboard register to the full register bank.

use std::ops::Range;

use crate::file::File;
use crate::register::Registers;
use crate::action::RegisterName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PutAnchor {
    /// `p`: charwise/linewise after the cursor.
    After,
    /// `P`: charwise/linewise before the cursor.
    Before,
    /// `]p`/`gp`-style: after, leaving the cursor past the inserted text.
    AfterLeaveEnd,
    /// `[p`/`gP`-style: before, leaving the cursor past the inserted text.
    BeforeLeaveEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    Delete,
    Change,
    Yank,
    Put(PutAnchor),
    ShiftRight,
    ShiftLeft,
    CaseChange,
    Join,
    /// Pseudo-operator: the range is discarded, the executor only uses this
    /// to enter `INSERT` at the motion's landing position.
    Insert,
    /// Pseudo-operator: as `Insert`, but for `REPLACE` mode (`R`-family).
    Replace,
    /// Pseudo-operator: moves the cursor to the start of the range without
    /// editing (used by motions bound directly under `NORMAL`, not a real
    /// operator, but sharing the executor's range-resolution path).
    CursorSol,
    CursorEol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorArg {
    Swap,
    Upper,
    Lower,
}

/// The context an operator runs under. `range` has already been normalised
/// (linewise-widened, clipped) by the executor (§4.6) before the operator
/// ever sees it.
pub struct OperatorCtx {
    pub range: Range<usize>,
    pub linewise: bool,
    pub reg: RegisterName,
    pub append: bool,
    pub count: u32,
    pub arg: Option<OperatorArg>,
    /// The indent step `SHIFT_RIGHT` inserts (`Config::expand_tab()`, §4.5).
    pub indent: String,
    /// `Config::tabwidth`, the cap `SHIFT_LEFT` strips up to (§4.5).
    pub tabwidth: u8,
}

/// Returns the cursor position to land on after the edit, or `None` to
/// leave the position computation to the caller's pre-edit pos (used by the
/// pseudo-operators that don't edit at all).
pub type OperatorFn = fn(&mut File, &mut Registers, &OperatorCtx) -> Option<usize>;

use std::collections::HashMap;

pub struct OperatorTable {
    entries: HashMap<OperatorId, OperatorFn>,
}

impl OperatorTable {
    pub fn run(&self, id: OperatorId, file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
        (self.entries[&id])(file, regs, ctx)
    }
}

/// Writes the operator's captured text to the register named in `ctx`
/// (already resolved by the executor, including the small-delete/unnamed
/// routing rules of §4.5 — this function just performs the write).
fn write_register(regs: &mut Registers, ctx: &OperatorCtx, data: Vec<u8>) {
    if ctx.append {
        regs.append(ctx.reg, &data, ctx.linewise);
    } else {
        regs.write(ctx.reg, data, ctx.linewise);
    }
}

fn delete_op(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    let range = ctx.range.clone();
    let data = file.text.slice(range.clone());
    write_register(regs, ctx, data);
    file.text.snapshot();
    file.text.delete(range.start, range.end - range.start);
    Some(range.start.min(file.text.size()))
}

fn yank_op(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    let data = file.text.slice(ctx.range.clone());
    write_register(regs, ctx, data);
    Some(ctx.range.start)
}

fn change_op(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    delete_op(file, regs, ctx)
}

fn put_anchor_at(file: &File, pos: usize, anchor: PutAnchor, linewise: bool) -> usize {
    match anchor {
        PutAnchor::Before | PutAnchor::BeforeLeaveEnd => {
            if linewise {
                file.text.line_start(pos)
            } else {
                pos
            }
        }
        PutAnchor::After | PutAnchor::AfterLeaveEnd => {
            if linewise {
                file.text.line_end(pos)
            } else {
                (pos + 1).min(file.text.size())
            }
        }
    }
}

fn put_op(anchor: PutAnchor) -> OperatorFn {
    match anchor {
        PutAnchor::After => put_after,
        PutAnchor::Before => put_before,
        PutAnchor::AfterLeaveEnd => put_after_leave_end,
        PutAnchor::BeforeLeaveEnd => put_before_leave_end,
    }
}

fn do_put(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx, anchor: PutAnchor, leave_end: bool) -> Option<usize> {
    let reg = regs.read(ctx.reg);
    if reg.data.is_empty() {
        return None;
    }
    let at = put_anchor_at(file, ctx.range.start, anchor, reg.linewise);
    file.text.snapshot();
    file.text.insert(at, &reg.data);
    if leave_end {
        Some((at + reg.data.len()).min(file.text.size()))
    } else if reg.linewise {
        Some(file.text.line_start(at))
    } else {
        Some(at)
    }
}

fn put_after(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    do_put(file, regs, ctx, PutAnchor::After, false)
}
fn put_before(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    do_put(file, regs, ctx, PutAnchor::Before, false)
}
fn put_after_leave_end(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    do_put(file, regs, ctx, PutAnchor::AfterLeaveEnd, true)
}
fn put_before_leave_end(file: &mut File, regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    do_put(file, regs, ctx, PutAnchor::BeforeLeaveEnd, true)
}

fn shift_lines(file: &mut File, ctx: &OperatorCtx, right: bool) -> Option<usize> {
    let start_line_no = file.text.lineno_by_pos(ctx.range.start);
    let end_line_no = file.text.lineno_by_pos(ctx.range.end.saturating_sub(1).max(ctx.range.start));
    let first_pos = file.text.line_start(ctx.range.start);
    let tabwidth = (ctx.tabwidth as usize).max(1);
    file.text.snapshot();
    let mut pos = first_pos;
    for _ in start_line_no..=end_line_no {
        if right {
            file.text.insert(pos, ctx.indent.as_bytes());
        } else {
            // One leading tab counts as a full indent level (§4.5); otherwise
            // strip up to `tabwidth` leading spaces.
            if file.text.byte(pos) == Some(b'\t') {
                file.text.delete(pos, 1);
            } else {
                let mut strip = 0;
                while strip < tabwidth && file.text.byte(pos + strip) == Some(b' ') {
                    strip += 1;
                }
                if strip > 0 {
                    file.text.delete(pos, strip);
                }
            }
        }
        match file.text.line_next(pos) {
            Some(next) => pos = next,
            None => break,
        }
    }
    Some(file.text.line_start(first_pos))
}

fn shift_right_op(file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    shift_lines(file, ctx, true)
}
fn shift_left_op(file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    shift_lines(file, ctx, false)
}

fn case_change_op(file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    let bytes = file.text.slice(ctx.range.clone());
    let arg = ctx.arg.unwrap_or(OperatorArg::Swap);
    let changed: Vec<u8> = bytes
        .iter()
        .map(|&b| match arg {
            OperatorArg::Upper => b.to_ascii_uppercase(),
            OperatorArg::Lower => b.to_ascii_lowercase(),
            OperatorArg::Swap => {
                if b.is_ascii_uppercase() {
                    b.to_ascii_lowercase()
                } else {
                    b.to_ascii_uppercase()
                }
            }
        })
        .collect();
    file.text.snapshot();
    file.text.delete(ctx.range.start, ctx.range.end - ctx.range.start);
    file.text.insert(ctx.range.start, &changed);
    Some(ctx.range.start)
}

fn join_op(file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    let start_line = file.text.lineno_by_pos(ctx.range.start);
    let end_line = file.text.lineno_by_pos(ctx.range.end.saturating_sub(1).max(ctx.range.start));
    let joins = (end_line.saturating_sub(start_line)).max(1);
    file.text.snapshot();
    let mut joined_at = file.text.line_finish(ctx.range.start);
    for _ in 0..joins {
        let finish = file.text.line_finish(joined_at);
        let Some(next) = file.text.line_next(finish) else { break };
        let gap_end = {
            let mut i = next;
            while file.text.byte(i).is_some_and(|b| b == b' ' || b == b'\t') {
                i += 1;
            }
            i
        };
        file.text.delete(finish, gap_end - finish);
        file.text.insert(finish, b" ");
        joined_at = finish;
    }
    Some(joined_at)
}

fn cursor_sol_op(file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    Some(file.text.line_start(ctx.range.start))
}
fn cursor_eol_op(file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    Some(file.text.line_finish(ctx.range.start))
}
fn noop_op(_file: &mut File, _regs: &mut Registers, ctx: &OperatorCtx) -> Option<usize> {
    Some(ctx.range.start)
}

pub fn default_table() -> OperatorTable {
    let mut entries: HashMap<OperatorId, OperatorFn> = HashMap::new();
    entries.insert(OperatorId::Delete, delete_op);
    entries.insert(OperatorId::Change, change_op);
    entries.insert(OperatorId::Yank, yank_op);
    entries.insert(OperatorId::Put(PutAnchor::After), put_op(PutAnchor::After));
    entries.insert(OperatorId::Put(PutAnchor::Before), put_op(PutAnchor::Before));
    entries.insert(OperatorId::Put(PutAnchor::AfterLeaveEnd), put_op(PutAnchor::AfterLeaveEnd));
    entries.insert(OperatorId::Put(PutAnchor::BeforeLeaveEnd), put_op(PutAnchor::BeforeLeaveEnd));
    entries.insert(OperatorId::ShiftRight, shift_right_op);
    entries.insert(OperatorId::ShiftLeft, shift_left_op);
    entries.insert(OperatorId::CaseChange, case_change_op);
    entries.insert(OperatorId::Join, join_op);
    entries.insert(OperatorId::Insert, noop_op);
    entries.insert(OperatorId::Replace, noop_op);
    entries.insert(OperatorId::CursorSol, cursor_sol_op);
    entries.insert(OperatorId::CursorEol, cursor_eol_op);
    OperatorTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SimpleText;

    fn ctx(range: Range<usize>) -> OperatorCtx {
        OperatorCtx {
            range,
            linewise: false,
            reg: RegisterName::Unnamed,
            append: false,
            count: 1,
            arg: None,
            indent: "\t".to_string(),
            tabwidth: 8,
        }
    }

    #[test]
    fn delete_removes_range_and_fills_unnamed() {
        let mut file = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        let mut regs = Registers::new();
        let table = default_table();
        let pos = table.run(OperatorId::Delete, &mut file, &mut regs, &ctx(0..6)).unwrap();
        assert_eq!(file.text.as_bytes(), b"world");
        assert_eq!(pos, 0);
        assert_eq!(regs.read(RegisterName::Unnamed).data, b"hello ");
    }

    #[test]
    fn yank_does_not_modify_buffer() {
        let mut file = File::new(Box::new(SimpleText::new(*b"hello world")), None);
        let mut regs = Registers::new();
        let table = default_table();
        table.run(OperatorId::Yank, &mut file, &mut regs, &ctx(0..5)).unwrap();
        assert_eq!(file.text.as_bytes(), b"hello world");
        assert_eq!(regs.read(RegisterName::Unnamed).data, b"hello");
    }

    #[test]
    fn put_after_inserts_past_cursor() {
        let mut file = File::new(Box::new(SimpleText::new(*b"ac")), None);
        let mut regs = Registers::new();
        regs.write(RegisterName::Unnamed, b"b".to_vec(), false);
        let table = default_table();
        let mut c = ctx(0..1);
        c.reg = RegisterName::Unnamed;
        table.run(OperatorId::Put(PutAnchor::After), &mut file, &mut regs, &c).unwrap();
        assert_eq!(file.text.as_bytes(), b"abc");
    }

    #[test]
    fn case_change_swap_flips_case() {
        let mut file = File::new(Box::new(SimpleText::new(*b"AbC")), None);
        let mut regs = Registers::new();
        let table = default_table();
        table.run(OperatorId::CaseChange, &mut file, &mut regs, &ctx(0..3)).unwrap();
        assert_eq!(file.text.as_bytes(), b"aBc");
    }

    #[test]
    fn join_merges_lines_with_single_space() {
        let mut file = File::new(Box::new(SimpleText::new(*b"foo\n  bar")), None);
        let mut regs = Registers::new();
        let table = default_table();
        table.run(OperatorId::Join, &mut file, &mut regs, &ctx(0..3)).unwrap();
        assert_eq!(file.text.as_bytes(), b"foo bar");
    }
}
