//! `action_do` (§4.6): consumes the pending `(count, register, operator,
//! motion|textobject)` tuple and runs it once per live cursor. Follows the
//! "compute a selection, then apply one verb" shape of a delete/yank
//! buffer operation, generalized to the multi-cursor arena and the
//! operator/motion/text-object tables.

use std::ops::Range;

use crate::action::{ActionFlags, RegisterName};
use crate::editor::Editor;
use crate::error::Result;
use crate::motion::MotionCtx;
use crate::operator::{OperatorCtx, OperatorId};

/// One cursor's resolved `[start,end)` range, before the operator (if any)
/// runs.
struct Resolved {
    range: Range<usize>,
    linewise: bool,
    /// Where the cursor lands if there is no operator to run (a bare
    /// motion); only set when this was a motion, not a text-object.
    bare_landing: Option<usize>,
    jump: bool,
}

/// `selection` is the cursor's current selection, if any (§4.6 step 3:
/// "seed range from visual selection (if in visual) ... union objects
/// iteratively"); `None` outside visual modes.
fn resolve_for_cursor(
    editor: &mut Editor,
    cursor_pos: usize,
    count: u32,
    selection: Option<Range<usize>>,
) -> Option<Resolved> {
    let pending = editor.pending.clone();

    if let Some(textobject) = pending.textobject {
        let inner = !pending.flags.contains(ActionFlags::OUTER);
        let mut range = {
            let file = editor.window.file.borrow();
            editor.textobjects.run_repeated(textobject, &file, cursor_pos, inner, count)?
        };
        if let Some(sel) = selection {
            if !sel.is_empty() {
                range = range.start.min(sel.start)..range.end.max(sel.end);
            }
        }
        return Some(Resolved {
            range,
            linewise: pending.flags.contains(ActionFlags::LINEWISE),
            bare_landing: None,
            jump: false,
        });
    }

    let motion = pending.motion?;
    let entry_flags = editor.motions.get(motion).flags;
    let (newpos, size) = {
        let mut file = editor.window.file.borrow_mut();
        let mut ctx = MotionCtx {
            file: &mut file,
            pos: cursor_pos,
            search: &mut editor.search,
            config: &editor.config,
            arg: pending.search_char,
            count: pending.count,
        };
        let newpos = editor.motions.run(motion, &mut ctx, count)?;
        let size = ctx.file.text.size();
        (newpos, size)
    };

    if pending.operator.is_none() {
        return Some(Resolved {
            range: cursor_pos.min(newpos)..cursor_pos.max(newpos),
            linewise: false,
            bare_landing: Some(newpos),
            jump: entry_flags.contains(ActionFlags::JUMP),
        });
    }

    let linewise = (pending.flags.contains(ActionFlags::LINEWISE) || entry_flags.contains(ActionFlags::LINEWISE))
        && !pending.flags.contains(ActionFlags::CHARWISE);
    let mut start = cursor_pos.min(newpos);
    let mut end = cursor_pos.max(newpos);
    if entry_flags.contains(ActionFlags::INCLUSIVE) {
        end = (end + 1).min(size);
    }
    if linewise {
        let file = editor.window.file.borrow();
        start = file.text.line_start(start);
        end = file.text.line_end(end.saturating_sub(1).max(start));
    }
    Some(Resolved {
        range: start..end,
        linewise,
        bare_landing: None,
        jump: entry_flags.contains(ActionFlags::JUMP),
    })
}

/// Runs the pending action over every live cursor (§4.6 step 3: snapshot
/// the id list first so operators may dispose cursors mid-loop), then
/// resets the pending tuple and the retargeted `OPERATOR` parent.
pub fn action_do(editor: &mut Editor) -> Result<()> {
    let pending = editor.pending.clone();
    if pending.motion.is_none() && pending.textobject.is_none() {
        editor.pending.reset();
        return Ok(());
    }

    let count = pending.count_or_default();
    let register = pending.register.unwrap_or(RegisterName::Unnamed);
    let was_visual = editor.mode.is_visual();
    // Rightmost cursor first: an edit at one cursor must never invalidate
    // the stored `pos` of a cursor still waiting its turn (§4.6 step 3).
    let mut ids: Vec<(crate::cursor::CursorId, usize)> =
        editor.window.view.iter().map(|(&id, c)| (id, c.pos)).collect();
    ids.sort_by(|a, b| b.1.cmp(&a.1));
    let multi = ids.len() > 1;

    for (id, _) in ids {
        let Some(cursor_pos) = editor.window.view.cursor(id).map(|c| c.pos) else { continue };
        let selection = editor.window.view.cursor(id).and_then(|c| c.selection.clone());
        let Some(resolved) = resolve_for_cursor(editor, cursor_pos, count, selection.clone()) else { continue };

        if resolved.jump {
            let mut file = editor.window.file.borrow_mut();
            editor.window.jumplist.push(&mut *file.text, cursor_pos);
        } else {
            editor.window.jumplist.invalidate_cursor();
        }

        if let Some(op) = pending.operator {
            let range_for_spawn = resolved.range.clone();
            let ctx = OperatorCtx {
                range: resolved.range,
                linewise: resolved.linewise,
                reg: if multi { RegisterName::Unnamed } else { register },
                append: !multi && pending.register_append,
                count,
                arg: pending.arg,
                indent: editor.config.expand_tab(),
                tabwidth: editor.config.tabwidth,
            };
            let landing = {
                let mut file = editor.window.file.borrow_mut();
                editor.operators.run(op, &mut file, &mut editor.registers, &ctx)
            };
            match landing {
                Some(pos) => {
                    if let Some(cursor) = editor.window.view.cursor_mut(id) {
                        cursor.pos = pos;
                        cursor.clear_selection();
                    }
                    if matches!(op, OperatorId::CursorSol | OperatorId::CursorEol) {
                        spawn_line_cursors(editor, op, &range_for_spawn);
                    }
                }
                None => editor.window.view.dispose(id),
            }
        } else if was_visual && pending.textobject.is_some() {
            // Text-object with no operator in a visual mode: the range
            // (already unioned with the prior selection above) becomes the
            // new selection; the cursor syncs to its end edge.
            if let Some(cursor) = editor.window.view.cursor_mut(id) {
                cursor.pos = resolved.range.end.saturating_sub(1).max(resolved.range.start);
                cursor.selection = Some(resolved.range);
            }
        } else if was_visual {
            // Bare motion in a visual mode: extend the selection from
            // whichever edge the cursor *wasn't* sitting on, the same edge
            // `Cursor::extend_selection_to` treats as the fixed anchor.
            if let Some(pos) = resolved.bare_landing {
                if let Some(cursor) = editor.window.view.cursor_mut(id) {
                    let anchor = match &selection {
                        Some(sel) if sel.start == cursor_pos => sel.end,
                        Some(sel) if sel.end == cursor_pos => sel.start,
                        _ => cursor_pos,
                    };
                    cursor.pos = pos;
                    cursor.extend_selection_to(anchor);
                }
            }
        } else if let Some(pos) = resolved.bare_landing {
            if let Some(cursor) = editor.window.view.cursor_mut(id) {
                cursor.pos = pos;
            }
        }
    }

    editor.modes.set_operator_parent(crate::mode::ModeId::Move);
    editor.pending.reset();
    Ok(())
}

/// `CURSOR_SOL`/`CURSOR_EOL` (§4.5): the operator table entry only lands the
/// triggering cursor on the range's first line; this adds one cursor per
/// remaining line in `range` so the net effect is one cursor per line.
fn spawn_line_cursors(editor: &mut Editor, op: OperatorId, range: &Range<usize>) {
    let positions: Vec<usize> = {
        let file = editor.window.file.borrow();
        let mut lineno = file.text.lineno_by_pos(range.start) + 1;
        let mut out = Vec::new();
        while let Some(start) = file.text.pos_by_lineno(lineno) {
            if start >= range.end {
                break;
            }
            out.push(if op == OperatorId::CursorSol { file.text.line_start(start) } else { file.text.line_finish(start) });
            lineno += 1;
        }
        out
    };
    for pos in positions {
        editor.window.view.add_cursor(pos);
    }
}

/// Runs `op` over every cursor's *existing selection* rather than a
/// motion/text-object range — the `VISUAL`/`VISUAL_LINE` counterpart to
/// `action_do` (§4.2: a visual mode's operator keys act on the selection
/// already on screen, not on a freshly-parsed motion).
pub fn action_do_visual(editor: &mut Editor, op: crate::operator::OperatorId, arg: Option<crate::operator::OperatorArg>) {
    let register = editor.pending.register.unwrap_or(RegisterName::Unnamed);
    let register_append = editor.pending.register_append;
    let linewise = editor.mode == crate::mode::ModeId::VisualLine;
    let mut ids: Vec<(crate::cursor::CursorId, usize)> =
        editor.window.view.iter().map(|(&id, c)| (id, c.selection_range().start)).collect();
    ids.sort_by(|a, b| b.1.cmp(&a.1));
    let multi = ids.len() > 1;

    for (id, _) in ids {
        let Some(mut range) = editor.window.view.cursor(id).map(|c| c.selection_range()) else { continue };
        if range.is_empty() {
            continue;
        }
        if linewise {
            let file = editor.window.file.borrow();
            range.start = file.text.line_start(range.start);
            range.end = file.text.line_end(range.end.saturating_sub(1).max(range.start));
        }
        let ctx = OperatorCtx {
            range,
            linewise,
            reg: if multi { RegisterName::Unnamed } else { register },
            append: !multi && register_append,
            count: 1,
            arg,
            indent: editor.config.expand_tab(),
            tabwidth: editor.config.tabwidth,
        };
        let landing = {
            let mut file = editor.window.file.borrow_mut();
            editor.operators.run(op, &mut file, &mut editor.registers, &ctx)
        };
        match landing {
            Some(pos) => {
                if let Some(cursor) = editor.window.view.cursor_mut(id) {
                    cursor.pos = pos;
                    cursor.clear_selection();
                }
            }
            None => editor.window.view.dispose(id),
        }
    }
    editor.pending.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RegisterName;
    use crate::config::Config;
    use crate::file::File;
    use crate::motion::MotionId;
    use crate::operator::OperatorId;
    use crate::text::SimpleText;
    use crate::ui::NullUi;
    use crate::window::{FileRegistry, Window};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_editor(contents: &[u8]) -> Editor {
        let config = Config::default();
        let file = Rc::new(RefCell::new(File::new(Box::new(SimpleText::new(contents.to_vec())), None)));
        let mut files = FileRegistry::new();
        let id = files.open(None).unwrap();
        let window = Window::new(id, file, Box::new(NullUi::default()), &config);
        Editor::new(files, window, config)
    }

    #[test]
    fn delete_word_operator_over_single_cursor() {
        let mut editor = make_editor(b"hello world");
        editor.pending.operator = Some(OperatorId::Delete);
        editor.pending.motion = Some(MotionId::WordForward);
        action_do(&mut editor).unwrap();
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"world");
        assert_eq!(editor.window.view.primary().pos, 0);
        assert_eq!(editor.registers.read(RegisterName::Unnamed).data, b"hello ");
    }

    #[test]
    fn bare_motion_moves_cursor_without_editing() {
        let mut editor = make_editor(b"hello world");
        editor.pending.motion = Some(MotionId::WordForward);
        action_do(&mut editor).unwrap();
        assert_eq!(editor.window.view.primary().pos, 6);
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"hello world");
    }

    #[test]
    fn multi_cursor_delete_runs_on_every_cursor() {
        let mut editor = make_editor(b"aa bb cc");
        editor.window.view.add_cursor(3);
        editor.pending.operator = Some(OperatorId::Delete);
        editor.pending.motion = Some(MotionId::Right);
        action_do(&mut editor).unwrap();
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"a b cc");
    }

    #[test]
    fn visual_operator_deletes_the_active_selection() {
        let mut editor = make_editor(b"hello world");
        editor.enter_visual(false);
        editor.window.view.primary_mut().pos = 5;
        editor.window.view.primary_mut().extend_selection_to(0);
        action_do_visual(&mut editor, OperatorId::Delete, None);
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b" world");
        assert_eq!(editor.registers.read(RegisterName::Unnamed).data, b"hello");
    }

    #[test]
    fn visual_line_operator_widens_to_whole_lines() {
        let mut editor = make_editor(b"abc\ndef\nghi\n");
        editor.enter_visual(true);
        editor.window.view.primary_mut().pos = 3;
        editor.window.view.primary_mut().extend_selection_to(0);
        action_do_visual(&mut editor, OperatorId::Delete, None);
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"def\nghi\n");
    }

    #[test]
    fn bare_motion_in_visual_mode_extends_the_selection() {
        let mut editor = make_editor(b"hello world");
        editor.enter_visual(false);
        editor.pending.motion = Some(MotionId::WordForward);
        action_do(&mut editor).unwrap();
        assert_eq!(editor.window.view.primary().selection_range(), 0..6);
        assert_eq!(editor.window.view.primary().pos, 6);
    }

    #[test]
    fn text_object_in_visual_mode_unions_with_the_existing_selection() {
        let mut editor = make_editor(b"hello world");
        editor.enter_visual(false);
        editor.window.view.primary_mut().pos = 0;
        editor.window.view.primary_mut().extend_selection_to(0);
        editor.pending.textobject = Some(crate::textobject::TextObjectId::Word);
        action_do(&mut editor).unwrap();
        assert_eq!(editor.window.view.primary().selection_range(), 0..5);
    }

    #[test]
    fn yank_leaves_buffer_untouched_and_cursor_at_start() {
        let mut editor = make_editor(b"hello world");
        editor.pending.operator = Some(OperatorId::Yank);
        editor.pending.motion = Some(MotionId::WordForward);
        action_do(&mut editor).unwrap();
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"hello world");
        assert_eq!(editor.window.view.primary().pos, 0);
        assert_eq!(editor.registers.read(RegisterName::Unnamed).data, b"hello ");
    }
}
