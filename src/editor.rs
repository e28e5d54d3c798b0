//! The top-level `Editor` (§2 control flow, §4.1-4.2, §4.6-4.7): owns every
//! collaborator the mode graph's bound actions close over, runs the
//! mainloop → key reader → mode graph → executor pipeline, and carries the
//! mode-transition hooks of §4.2 and the `.`-repeat/macro machinery of §4.7.
//!
//! Default keybindings are assembled by the binary (`main.rs`'s
//! `build_default_modes`), not here, per §1's Non-goal on shipped bindings;
//! this module only supplies the engine the bindings drive.

use crate::action::{ActionFlags, PendingAction, RegisterName};
use crate::config::Config;
use crate::error::Result;
use crate::executor;
use crate::key::{Key, NamedKey, next_key};
use crate::macros::{MacroId, Macros};
use crate::mode::{Binding, ModeGraph, ModeId, Resolution};
use crate::motion::{MotionId, MotionTable, SearchState};
use crate::operator::{OperatorArg, OperatorCtx, OperatorId, OperatorTable};
use crate::register::Registers;
use crate::textobject::{TextObjectId, TextObjectTable};
use crate::window::{FileRegistry, Window};

/// A binding may need exactly one more raw key that the mode graph itself
/// has no business resolving (a find-char argument, a register/mark name, a
/// macro slot letter). Rather than block inside the bound action waiting on
/// `Ui::getkey` — which would defeat fragmentation-transparent parsing —
/// the action records what it's waiting for here and `step()` special-cases
/// the very next key, however it is fragmented across `feed()` calls.
#[derive(Debug, Clone, Copy)]
pub enum Awaiting {
    /// The next key is a find/till-char argument for this motion.
    FindCharMotion(MotionId),
    /// The next key names a mark to set at the cursor (`m{x}`).
    SetMark,
    /// The next key names a mark for this goto motion (`` `{x} ``/`'{x}`).
    GotoMark(MotionId),
    /// The next key names a register (`"{x}`).
    SelectRegister,
    /// The next key replaces the character under the cursor (`r{x}`).
    ReplaceChar,
    /// The next key names the macro slot to start/stop recording into.
    MacroRegister,
    /// The next key names the macro slot to play back.
    PlayMacro,
}

pub struct Editor {
    pub files: FileRegistry,
    pub window: Window,
    pub mode: ModeId,
    /// The last user-visible mode (§4.2: "records `mode_prev` when leaving a
    /// user mode"), the pop target for `OPERATOR.input` and for an operator
    /// finishing while the parser is still sitting in `OPERATOR`.
    pub mode_prev: ModeId,
    pub modes: ModeGraph,
    pub pending: PendingAction,
    /// The growing input buffer of §4.1: raw, not-yet-fully-resolved
    /// keystrokes.
    pub input: String,
    pub registers: Registers,
    pub macros: Macros,
    pub search: SearchState,
    pub config: Config,
    pub motions: MotionTable,
    pub textobjects: TextObjectTable,
    pub operators: OperatorTable,
    pub quit: bool,
    /// Doubles as the status line shown by the `Ui` and, while `self.mode`
    /// is `PROMPT`, the in-progress `/`, `?` or `:` command line
    /// (`handle_unbound` is the only writer of the latter).
    pub status: String,
    /// `action_prev` (§4.6 step 5 / §4.7): the action `.` replays.
    pub last_repeatable: Option<PendingAction>,
    /// Anchor position recorded on entering a visual mode (`o` swaps ends
    /// against it; re-entering `VISUAL_LINE` from `VISUAL` does not disturb
    /// it).
    pub visual_anchor: usize,
    /// Set by a bound action that needs exactly one more raw key; consulted
    /// by `step()` before the next resolve, whatever `feed()` call the key
    /// ends up arriving in.
    pub awaiting: Option<Awaiting>,
    /// Which of the three `PROMPT` flavors `self.status` is accumulating
    /// for; `None` whenever `self.mode != ModeId::Prompt`.
    pub prompt_kind: Option<PromptKind>,
}

/// What a `PROMPT`-mode command line means once `<Enter>` commits it.
/// `/` and `?` enter `PROMPT` with this set to a `Search*` variant and a
/// pattern in `status`; `:` sets `Ex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Ex,
    SearchForward,
    SearchBackward,
}

impl Editor {
    pub fn new(files: FileRegistry, window: Window, config: Config) -> Self {
        Self {
            files,
            window,
            mode: ModeId::Normal,
            mode_prev: ModeId::Normal,
            modes: ModeGraph::new(),
            pending: PendingAction::default(),
            input: String::new(),
            registers: Registers::new(),
            macros: Macros::new(),
            search: SearchState::default(),
            config,
            motions: crate::motion::default_table(),
            textobjects: crate::textobject::default_table(),
            operators: crate::operator::default_table(),
            quit: false,
            status: String::new(),
            last_repeatable: None,
            visual_anchor: 0,
            awaiting: None,
            prompt_kind: None,
        }
    }

    /// Enters `PROMPT` for the given flavor with an empty command line
    /// (§6: `/pattern`, `?pattern`, `:cmd`).
    pub fn begin_prompt(&mut self, kind: PromptKind) {
        self.status.clear();
        self.prompt_kind = Some(kind);
        self.set_mode(ModeId::Prompt);
    }

    /// `<Esc>` in `PROMPT`: discards the command line without acting.
    pub fn cancel_prompt(&mut self) {
        self.status.clear();
        self.prompt_kind = None;
        let target = self.mode_prev;
        self.set_mode(target);
    }

    /// `<Enter>` in `PROMPT`: commits `self.status` per `self.prompt_kind`.
    /// A search pattern cannot travel through `MotionCtx::arg` (a single
    /// `char`), so it's written directly into `self.search.last_pattern`
    /// before running the motion.
    pub fn finish_prompt(&mut self) {
        let line = std::mem::take(&mut self.status);
        let kind = self.prompt_kind.take();
        let target = self.mode_prev;
        self.set_mode(target);
        match kind {
            Some(PromptKind::Ex) => {
                if let Err(err) = self.ex(&line) {
                    self.status = err.to_string();
                }
            }
            Some(PromptKind::SearchForward) => {
                self.search.last_pattern = Some(line);
                self.do_motion(MotionId::SearchForward);
            }
            Some(PromptKind::SearchBackward) => {
                self.search.last_pattern = Some(line);
                self.do_motion(MotionId::SearchBackward);
            }
            None => {}
        }
    }

    /// `<BS>` in `PROMPT`: drops the last character of the command line.
    pub fn prompt_backspace(&mut self) {
        self.status.pop();
    }

    /// `<BS>` in `INSERT`/`REPLACE`: deletes the character before each
    /// cursor, walking back over UTF-8 continuation bytes to land on a
    /// char boundary. Cursors at the start of the buffer are left alone.
    pub fn backspace_at_cursors(&mut self) {
        let mut ids: Vec<(crate::cursor::CursorId, usize)> =
            self.window.view.iter().map(|(&id, c)| (id, c.pos)).collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, _) in ids {
            let Some(pos) = self.window.view.cursor(id).map(|c| c.pos) else { continue };
            if pos == 0 {
                continue;
            }
            let mut file = self.window.file.borrow_mut();
            let mut start = pos - 1;
            while start > 0 {
                match file.text.byte(start) {
                    Some(b) if (0x80..0xC0).contains(&b) => start -= 1,
                    _ => break,
                }
            }
            file.text.delete(start, pos - start);
            drop(file);
            if let Some(cursor) = self.window.view.cursor_mut(id) {
                cursor.pos = start;
            }
        }
    }

    // ---- §4.1: key reader / binding resolver ---------------------------

    /// Appends `text` to the pending input buffer and resolves as much of
    /// it as currently possible.
    pub fn feed(&mut self, text: &str) {
        self.input.push_str(text);
        while self.step() {}
    }

    /// Resolves at most one binding (or one stray unbound key) from the
    /// front of `self.input`. Returns `false` when nothing more can be
    /// drained right now — either the buffer is empty, or what remains is
    /// only a still-growing prefix awaiting its next key.
    fn step(&mut self) -> bool {
        if self.input.is_empty() {
            return false;
        }
        if let Some(awaiting) = self.awaiting.take() {
            let Some((key, rest)) = next_key(&self.input, |_| false) else {
                self.awaiting = Some(awaiting);
                return false;
            };
            let consumed = self.input.len() - rest.len();
            let prefix = self.input[..consumed].to_string();
            self.input = rest.to_string();
            self.record_macro_keys(&prefix);
            self.resolve_awaiting(awaiting, key);
            return true;
        }
        let original = self.input.clone();
        let mut remainder: &str = &original;
        loop {
            let Some((_key, rest)) = next_key(remainder, |_| false) else {
                return false;
            };
            remainder = rest;
            let consumed = original.len() - remainder.len();
            let prefix = &original[..consumed];
            match self.modes.resolve(self.mode, prefix) {
                Resolution::Exact(binding) => {
                    self.input = remainder.to_string();
                    self.record_macro_keys(prefix);
                    tracing::trace!(mode = ?self.mode, keys = prefix, "resolved binding");
                    self.run_binding(binding);
                    return true;
                }
                Resolution::Prefix => continue,
                Resolution::None => {
                    self.input = remainder.to_string();
                    self.record_macro_keys(prefix);
                    self.handle_unbound(prefix);
                    return true;
                }
            }
        }
    }

    /// Completes an `Awaiting` state with the one key it was waiting on.
    /// `<Esc>` always cancels without acting, mirroring `OPERATOR.input`'s
    /// own reset-and-pop-out behaviour for a stray key.
    fn resolve_awaiting(&mut self, awaiting: Awaiting, key: Key) {
        if matches!(key, Key::Named(NamedKey::Esc)) {
            self.pending.reset();
            if self.mode == ModeId::Operator {
                let target = self.mode_prev;
                self.set_mode(target);
            }
            return;
        }
        let Key::Char(c) = key else { return };
        match awaiting {
            Awaiting::FindCharMotion(motion) => {
                self.pending.search_char = Some(c);
                self.pending.motion = Some(motion);
                let _ = self.run_action_do();
            }
            Awaiting::GotoMark(motion) => {
                self.pending.search_char = Some(c);
                self.pending.motion = Some(motion);
                let _ = self.run_action_do();
            }
            Awaiting::SetMark => self.set_mark_here(c),
            Awaiting::SelectRegister => {
                self.pending.register = Some(RegisterName::from_char(c));
                self.pending.register_append = RegisterName::is_append(c);
            }
            Awaiting::ReplaceChar => self.replace_char_at_cursors(c),
            Awaiting::MacroRegister => {
                let _ = self.toggle_macro_recording(c);
            }
            Awaiting::PlayMacro => self.play_macro(c),
        }
    }

    /// `r{c}` (§4.3/§4.5's character-replace verb, not table-listed as an
    /// operator since it never takes a motion): overwrites the character
    /// under each cursor still on the same line, leaving the cursor in
    /// place.
    fn replace_char_at_cursors(&mut self, c: char) {
        let mut ids: Vec<(crate::cursor::CursorId, usize)> =
            self.window.view.iter().map(|(&id, cur)| (id, cur.pos)).collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1));
        if ids.is_empty() {
            return;
        }
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        let mut file = self.window.file.borrow_mut();
        file.text.snapshot();
        for (_, pos) in ids {
            let eol = file.text.line_finish(pos);
            if pos < eol {
                file.text.delete(pos, 1);
                file.text.insert(pos, encoded.as_bytes());
            }
        }
    }

    fn record_macro_keys(&mut self, prefix: &str) {
        for key in crate::key::tokenize(prefix, |_| false) {
            self.macros.record_key(&key);
        }
    }

    fn run_binding(&mut self, binding: Binding) {
        match binding {
            Binding::Action(action) => {
                let remainder = std::mem::take(&mut self.input);
                self.input = action(self, &remainder);
            }
            Binding::Alias(alias) => {
                let rest = std::mem::take(&mut self.input);
                self.input = format!("{alias}{rest}");
            }
        }
    }

    /// §4.1's "none" branch once the bracketed-action-registry path is
    /// exhausted: hand the key to the current mode's input handler.
    /// §4.2's `OPERATOR.input` hook ("a stray non-binding byte while
    /// awaiting a motion resets the pending action and pops to
    /// `mode_prev`") is folded in here since `OPERATOR` is a transient
    /// `self.mode` value like any other.
    fn handle_unbound(&mut self, text: &str) {
        match self.mode {
            ModeId::Operator => {
                self.pending.reset();
                let target = self.mode_prev;
                self.set_mode(target);
            }
            ModeId::Insert => self.insert_text_at_cursors(text),
            ModeId::Replace => self.replace_text_at_cursors(text),
            ModeId::Prompt => self.status.push_str(text),
            _ => {}
        }
    }

    /// `REPLACE`'s input handler: overwrites the character(s) under each
    /// cursor instead of inserting (§3's mode list distinguishes `REPLACE`
    /// from `INSERT` on exactly this point). Typing past the last character
    /// of the buffer falls back to inserting, same as vi-likes do once `R`
    /// runs off the end of the text.
    fn replace_text_at_cursors(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut ids: Vec<(crate::cursor::CursorId, usize)> =
            self.window.view.iter().map(|(&id, c)| (id, c.pos)).collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, _) in ids {
            let Some(pos) = self.window.view.cursor(id).map(|c| c.pos) else { continue };
            {
                let mut file = self.window.file.borrow_mut();
                let size = file.text.size();
                let end = (pos + text.len()).min(size);
                if end > pos {
                    file.text.delete(pos, end - pos);
                }
                file.text.insert(pos, text.as_bytes());
            }
            if let Some(cursor) = self.window.view.cursor_mut(id) {
                cursor.pos = pos + text.len();
            }
        }
    }

    /// Inserts `text` at every live cursor, processing rightmost first so
    /// an earlier insertion never invalidates a not-yet-processed cursor's
    /// position (the same ordering rule `executor::action_do` uses).
    fn insert_text_at_cursors(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut ids: Vec<(crate::cursor::CursorId, usize)> =
            self.window.view.iter().map(|(&id, c)| (id, c.pos)).collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, _) in ids {
            let Some(pos) = self.window.view.cursor(id).map(|c| c.pos) else { continue };
            {
                let mut file = self.window.file.borrow_mut();
                file.text.insert(pos, text.as_bytes());
            }
            if let Some(cursor) = self.window.view.cursor_mut(id) {
                cursor.pos = pos + text.len();
            }
        }
    }

    // ---- §4.2: mode transitions -----------------------------------------

    pub fn set_mode(&mut self, new: ModeId) {
        if new == self.mode {
            return;
        }
        let old = self.mode;
        tracing::debug!(?old, ?new, "mode transition");
        self.leave_mode(old, new);
        if old.is_user() {
            self.mode_prev = old;
        }
        self.mode = new;
        self.enter_mode(new, old);
    }

    fn leave_mode(&mut self, old: ModeId, new: ModeId) {
        match old {
            ModeId::Operator => self.modes.set_operator_parent(ModeId::Move),
            ModeId::Visual | ModeId::VisualLine if !new.is_visual() => {
                self.window.view.clear_all_selections();
                self.modes.set_operator_parent(ModeId::Move);
            }
            ModeId::Insert | ModeId::Replace => {
                self.window.file.borrow_mut().text.snapshot();
                if new == ModeId::Normal {
                    self.macros.stop_operator();
                }
            }
            _ => {}
        }
    }

    fn enter_mode(&mut self, new: ModeId, old: ModeId) {
        match new {
            ModeId::Operator => self.modes.set_operator_parent(ModeId::OperatorOption),
            ModeId::Visual => {
                if !old.is_visual() {
                    self.window.view.start_all_selections();
                }
                self.modes.set_operator_parent(ModeId::TextObj);
            }
            ModeId::VisualLine => {
                if !old.is_visual() {
                    self.window.view.start_all_selections();
                }
                self.modes.set_operator_parent(ModeId::TextObj);
                self.extend_visual_line_ends();
            }
            ModeId::Insert | ModeId::Replace => {
                if !self.macros.is_operator_recording() {
                    let anchor = self.window.view.primary().pos;
                    self.macros.start_operator(anchor);
                    if self.pending.operator.is_none() {
                        self.pending.operator =
                            Some(if new == ModeId::Insert { OperatorId::Insert } else { OperatorId::Replace });
                    }
                }
            }
            _ => {}
        }
    }

    /// `VISUAL_LINE.enter`'s extra step (§4.2): extend every cursor's
    /// selection to the end of its current line.
    fn extend_visual_line_ends(&mut self) {
        let ends: Vec<(crate::cursor::CursorId, usize)> = {
            let file = self.window.file.borrow();
            self.window.view.iter().map(|(&id, c)| (id, file.text.line_finish(c.pos))).collect()
        };
        for (id, end) in ends {
            if let Some(cursor) = self.window.view.cursor_mut(id) {
                cursor.extend_selection_to(end);
            }
        }
    }

    pub fn enter_visual(&mut self, linewise: bool) {
        self.visual_anchor = self.window.view.primary().pos;
        self.set_mode(if linewise { ModeId::VisualLine } else { ModeId::Visual });
    }

    /// `o` in visual mode: swap which end of the selection the (primary)
    /// cursor sits on.
    pub fn swap_visual_ends(&mut self) {
        if !self.mode.is_visual() {
            return;
        }
        let pos = self.window.view.primary().pos;
        let range = self.window.view.primary().selection_range();
        let other = if pos == range.start { range.end.saturating_sub(1).max(range.start) } else { range.start };
        self.window.view.primary_mut().pos = other;
        self.visual_anchor = pos;
    }

    // ---- awaiting a second key --------------------------------------------

    /// `f`/`F`/`t`/`T`: the motion itself is already known, only its
    /// find-char argument is missing.
    pub fn await_find_char(&mut self, motion: MotionId) {
        self.awaiting = Some(Awaiting::FindCharMotion(motion));
    }

    /// `m`: the next key names the mark to drop at the cursor.
    pub fn await_set_mark(&mut self) {
        self.awaiting = Some(Awaiting::SetMark);
    }

    /// `` ` ``/`'`: the next key names the mark to jump to.
    pub fn await_goto_mark(&mut self, motion: MotionId) {
        self.awaiting = Some(Awaiting::GotoMark(motion));
    }

    /// `"`: the next key names the register the following operator/motion
    /// should read from or write to.
    pub fn await_select_register(&mut self) {
        self.awaiting = Some(Awaiting::SelectRegister);
    }

    /// `r`: the next key replaces the character under the cursor.
    pub fn await_replace_char(&mut self) {
        self.awaiting = Some(Awaiting::ReplaceChar);
    }

    /// `q`: the next key names the macro slot to start/stop recording into.
    pub fn await_macro_register(&mut self) {
        self.awaiting = Some(Awaiting::MacroRegister);
    }

    /// `@`: the next key names the macro slot to play back.
    pub fn await_play_macro(&mut self) {
        self.awaiting = Some(Awaiting::PlayMacro);
    }

    // ---- §4.6: running the pending action --------------------------------

    /// Sets the pending motion and resolves it (§4.6). Bound under `MOVE`
    /// for plain motions.
    pub fn do_motion(&mut self, id: MotionId) {
        self.pending.motion = Some(id);
        let _ = self.run_action_do();
    }

    /// Sets the pending text-object and resolves it (§4.4/§4.6). Bound
    /// under `TEXTOBJ`.
    pub fn do_textobject(&mut self, id: TextObjectId, outer: bool) {
        self.pending.textobject = Some(id);
        if outer {
            self.pending.flags |= ActionFlags::OUTER;
        }
        let _ = self.run_action_do();
    }

    /// Sets the pending operator and enters `OPERATOR` to await its
    /// motion/text-object (§4.2, §4.5). A doubled operator key (`dd`,
    /// `yy`, `gUU`, ...) is expected to be bound directly to a linewise
    /// motion/operator pair by the keymap rather than handled specially
    /// here.
    pub fn start_operator(&mut self, id: OperatorId) {
        self.pending.operator = Some(id);
        self.set_mode(ModeId::Operator);
    }

    /// Runs the pending action (§4.6), then applies the post-run mode
    /// transition and `.`-repeat bookkeeping of §4.6 steps 4-5.
    pub fn run_action_do(&mut self) -> Result<()> {
        let pending = self.pending.clone();
        let span = tracing::info_span!("action_do", operator = ?pending.operator, motion = ?pending.motion);
        let _enter = span.enter();
        executor::action_do(self)?;
        self.after_action(&pending);
        Ok(())
    }

    fn after_action(&mut self, pending: &PendingAction) {
        let Some(op) = pending.operator else {
            if self.mode == ModeId::Operator {
                let target = self.mode_prev;
                self.set_mode(target);
            }
            return;
        };

        match op {
            OperatorId::Insert => self.set_mode(ModeId::Insert),
            OperatorId::Change => self.set_mode(ModeId::Insert),
            OperatorId::Replace => self.set_mode(ModeId::Replace),
            _ => {
                if self.mode == ModeId::Operator {
                    let target = self.mode_prev;
                    self.set_mode(target);
                } else if self.mode.is_visual() {
                    self.set_mode(ModeId::Normal);
                }
            }
        }

        if !matches!(op, OperatorId::CursorSol | OperatorId::CursorEol) {
            let mut stamped = pending.clone();
            if matches!(op, OperatorId::Change | OperatorId::Insert | OperatorId::Replace) {
                stamped.macro_id = Some(MacroId::Operator);
            }
            self.last_repeatable = Some(stamped);
        }
    }

    /// A `VISUAL`/`VISUAL_LINE` operator key: acts on the selection already
    /// on screen instead of awaiting a motion, then returns to `NORMAL`.
    pub fn run_visual_operator(&mut self, op: OperatorId, arg: Option<OperatorArg>) {
        executor::action_do_visual(self, op, arg);
        if self.mode.is_visual() {
            self.set_mode(ModeId::Normal);
        }
    }

    /// A `VISUAL`/`VISUAL_LINE` `c`/`s` key: reuses `run_visual_operator`
    /// but, like `after_action`, lands in `INSERT` instead of popping back
    /// to `NORMAL` once the selection is gone.
    pub fn run_visual_change(&mut self, arg: Option<OperatorArg>) {
        executor::action_do_visual(self, OperatorId::Change, arg);
        self.set_mode(ModeId::Insert);
    }

    /// `dd`/`yy`/`cc`/`>>`/`<<`/`gUU`-style doubled linewise operators
    /// (§4.5's "doubled operator key" convention, e.g. vi-like `dd` as a
    /// keymap-level alias rather than a distinct core verb): acts on
    /// `count` whole lines starting at each cursor's own line, without
    /// going through a motion.
    pub fn run_doubled_linewise(&mut self, op: OperatorId) {
        let pending = self.pending.clone();
        let count = pending.count_or_default();
        let register = pending.register.unwrap_or(RegisterName::Unnamed);
        let append = pending.register_append;
        let arg = pending.arg;
        let mut ids: Vec<(crate::cursor::CursorId, usize)> =
            self.window.view.iter().map(|(&id, c)| (id, c.pos)).collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1));
        let multi = ids.len() > 1;
        for (id, pos) in ids {
            let (start, end) = {
                let file = self.window.file.borrow();
                let target_line = file.text.lineno_by_pos(pos) + count as usize - 1;
                let target_pos = file.text.pos_by_lineno(target_line).unwrap_or_else(|| file.text.size());
                (file.text.line_start(pos), file.text.line_end(target_pos.max(pos)))
            };
            let ctx = OperatorCtx {
                range: start..end,
                linewise: true,
                reg: if multi { RegisterName::Unnamed } else { register },
                append: !multi && append,
                count,
                arg,
                indent: self.config.expand_tab(),
                tabwidth: self.config.tabwidth,
            };
            let landing = {
                let mut file = self.window.file.borrow_mut();
                self.operators.run(op, &mut file, &mut self.registers, &ctx)
            };
            match landing {
                Some(p) => {
                    if let Some(cursor) = self.window.view.cursor_mut(id) {
                        cursor.pos = p;
                        cursor.clear_selection();
                    }
                }
                None => self.window.view.dispose(id),
            }
        }
        self.pending.reset();
    }

    // ---- §4.7: macros and `.` --------------------------------------------

    pub fn toggle_macro_recording(&mut self, reg: char) -> Result<()> {
        if self.macros.is_recording() {
            self.macros.stop_recording();
            Ok(())
        } else {
            self.macros.start_recording(reg)
        }
    }

    pub fn play_macro(&mut self, reg: char) {
        let text: String = self.macros.slot(reg).iter().map(Key::canonical).collect();
        self.feed(&text);
    }

    /// `.`: replays `last_repeatable`. If it carries the operator macro, the
    /// macro is first frozen into the `REPEAT` slot (§4.7) so a nested `.`
    /// during replay cannot alias back into history.
    pub fn repeat_last(&mut self) {
        let Some(mut action) = self.last_repeatable.clone() else { return };
        if action.macro_id == Some(MacroId::Operator) {
            self.macros.freeze_operator_into_repeat();
            action.macro_id = Some(MacroId::Repeat);
        }
        self.pending = action.clone();
        let _ = self.run_action_do();
        if let Some(id) = action.macro_id {
            let text: String = self.macros.resolve(id).iter().map(Key::canonical).collect();
            self.feed(&text);
        }
    }

    // ---- §4.8: jumplist and changelist ------------------------------------

    pub fn jump_back(&mut self) {
        let pos = {
            let file = self.window.file.borrow();
            self.window.jumplist.back(&*file.text)
        };
        if let Some(pos) = pos {
            self.window.view.primary_mut().pos = pos;
        }
    }

    pub fn jump_forward(&mut self) {
        let pos = {
            let file = self.window.file.borrow();
            self.window.jumplist.forward(&*file.text)
        };
        if let Some(pos) = pos {
            self.window.view.primary_mut().pos = pos;
        }
    }

    /// `g;`.
    pub fn change_older(&mut self) {
        let pos = {
            let file = self.window.file.borrow();
            self.window.changelist.older(&*file.text)
        };
        if let Some(pos) = pos {
            self.window.view.primary_mut().pos = pos;
        }
    }

    /// `g,`.
    pub fn change_newer(&mut self) {
        let pos = {
            let file = self.window.file.borrow();
            self.window.changelist.newer(&*file.text)
        };
        if let Some(pos) = pos {
            self.window.view.primary_mut().pos = pos;
        }
    }

    /// `u`.
    pub fn undo(&mut self) {
        let pos = self.window.file.borrow_mut().text.undo();
        if let Some(pos) = pos {
            self.window.view.primary_mut().pos = pos;
        }
    }

    /// `<C-r>`.
    pub fn redo(&mut self) {
        let pos = self.window.file.borrow_mut().text.redo();
        if let Some(pos) = pos {
            self.window.view.primary_mut().pos = pos;
        }
    }

    // ---- registers, marks, misc -------------------------------------------

    pub fn set_mark_here(&mut self, name: char) {
        let pos = self.window.view.primary().pos;
        self.window.file.borrow_mut().set_mark(name, pos);
    }

    pub fn register_name(c: char) -> RegisterName {
        RegisterName::from_char(c)
    }

    pub fn quit(&mut self) {
        self.quit = true;
    }

    /// `INSERT.idle` (§4.2, §5): fired by the mainloop once
    /// `config.idle_timeout_secs` have passed with no input while in
    /// `INSERT`/`REPLACE`, so undo granularity is sentence-sized rather than
    /// keystroke-sized. A no-op in every other mode.
    pub fn idle_tick(&mut self) {
        if matches!(self.mode, ModeId::Insert | ModeId::Replace) {
            self.window.file.borrow_mut().text.snapshot();
        }
    }

    pub fn ex(&mut self, cmd: &str) -> Result<()> {
        crate::ex::execute(self, cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::File;
    use crate::text::SimpleText;
    use crate::ui::NullUi;
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
    fn feeding_an_unbound_key_in_insert_mode_inserts_it() {
        let mut editor = make_editor(b"");
        editor.set_mode(ModeId::Insert);
        editor.feed("x");
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"x");
        assert_eq!(editor.window.view.primary().pos, 1);
    }

    #[test]
    fn replace_mode_overwrites_instead_of_inserting() {
        let mut editor = make_editor(b"abc");
        editor.set_mode(ModeId::Replace);
        editor.feed("x");
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"xbc");
        assert_eq!(editor.window.view.primary().pos, 1);
    }

    #[test]
    fn replace_mode_past_buffer_end_falls_back_to_inserting() {
        let mut editor = make_editor(b"");
        editor.set_mode(ModeId::Replace);
        editor.feed("x");
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"x");
    }

    #[test]
    fn entering_insert_mode_starts_the_operator_macro() {
        let mut editor = make_editor(b"");
        editor.set_mode(ModeId::Insert);
        assert!(editor.macros.is_operator_recording());
    }

    #[test]
    fn leaving_insert_to_normal_stops_the_operator_macro() {
        let mut editor = make_editor(b"");
        editor.set_mode(ModeId::Insert);
        editor.set_mode(ModeId::Normal);
        assert!(!editor.macros.is_operator_recording());
    }

    #[test]
    fn entering_operator_mode_retargets_its_parent_to_operator_option() {
        let mut editor = make_editor(b"abc");
        editor.start_operator(OperatorId::Delete);
        assert_eq!(editor.mode, ModeId::Operator);
        assert_eq!(editor.modes.operator_parent(), ModeId::OperatorOption);
    }

    #[test]
    fn dot_repeats_an_insert_and_returns_to_normal() {
        // SPEC_FULL.md §8 scenario 5: `ifoo<Esc>.` must double the inserted
        // text and leave the editor back in NORMAL, not stuck in INSERT.
        let mut editor = make_editor(b"x");
        editor.modes.bind_action(
            ModeId::Insert,
            "<Esc>",
            Rc::new(|ed: &mut Editor, rest: &str| {
                ed.set_mode(ModeId::Normal);
                rest.to_string()
            }),
        );
        editor.start_operator(OperatorId::Insert);
        editor.do_motion(MotionId::Nop);
        editor.feed("foo");
        editor.feed("<Esc>");
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"foox");
        assert_eq!(editor.mode, ModeId::Normal);
        assert_eq!(editor.last_repeatable.as_ref().and_then(|a| a.macro_id), Some(MacroId::Operator));

        editor.repeat_last();
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"foofoox");
        assert_eq!(editor.mode, ModeId::Normal);
    }

    #[test]
    fn running_a_delete_motion_pops_back_out_of_operator_mode() {
        let mut editor = make_editor(b"hello world");
        editor.start_operator(OperatorId::Delete);
        editor.do_motion(MotionId::WordForward);
        assert_eq!(editor.mode, ModeId::Normal);
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"world");
        assert!(editor.last_repeatable.is_some());
    }

    #[test]
    fn visual_line_entry_extends_selection_to_line_end() {
        let mut editor = make_editor(b"abc\ndef");
        editor.enter_visual(true);
        assert_eq!(editor.window.view.primary().selection_range(), 0..3);
    }

    #[test]
    fn leaving_visual_mode_clears_selections() {
        let mut editor = make_editor(b"abc");
        editor.enter_visual(false);
        editor.set_mode(ModeId::Normal);
        assert!(editor.window.view.primary().selection.is_none());
    }

    #[test]
    fn find_char_motion_completes_even_when_the_argument_arrives_in_a_later_feed() {
        let mut editor = make_editor(b"hello world");
        editor.await_find_char(MotionId::FindCharForward);
        editor.feed("l");
        assert!(editor.awaiting.is_none());
        assert_eq!(editor.window.view.primary().pos, 2);
    }

    #[test]
    fn uppercase_register_selection_sets_the_append_flag() {
        let mut editor = make_editor(b"abc");
        editor.await_select_register();
        editor.feed("A");
        assert_eq!(editor.pending.register, Some(RegisterName::Named('a')));
        assert!(editor.pending.register_append);
    }

    #[test]
    fn lowercase_register_selection_does_not_append() {
        let mut editor = make_editor(b"abc");
        editor.await_select_register();
        editor.feed("a");
        assert_eq!(editor.pending.register, Some(RegisterName::Named('a')));
        assert!(!editor.pending.register_append);
    }

    #[test]
    fn replace_char_overwrites_in_place_without_moving_the_cursor() {
        let mut editor = make_editor(b"abc");
        editor.await_replace_char();
        editor.feed("x");
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"xbc");
        assert_eq!(editor.window.view.primary().pos, 0);
    }

    #[test]
    fn escape_cancels_an_awaiting_state_without_acting() {
        let mut editor = make_editor(b"abc");
        editor.await_replace_char();
        editor.feed("<Esc>");
        assert!(editor.awaiting.is_none());
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b"abc");
    }

    #[test]
    fn visual_operator_returns_to_normal_after_acting() {
        let mut editor = make_editor(b"hello world");
        editor.enter_visual(false);
        editor.window.view.primary_mut().pos = 4;
        editor.window.view.primary_mut().extend_selection_to(0);
        editor.run_visual_operator(OperatorId::Delete, None);
        assert_eq!(editor.mode, ModeId::Normal);
        assert_eq!(editor.window.file.borrow().text.as_bytes(), b" world");
    }

    #[test]
    fn idle_tick_snapshots_in_insert_mode_only() {
        let mut editor = make_editor(b"");
        editor.set_mode(ModeId::Insert);
        editor.feed("x");
        let before = editor.window.file.borrow().text.history_state();
        editor.idle_tick();
        let after = editor.window.file.borrow().text.history_state();
        assert_ne!(before, after);

        editor.set_mode(ModeId::Normal);
        let before = editor.window.file.borrow().text.history_state();
        editor.idle_tick();
        let after = editor.window.file.borrow().text.history_state();
        assert_eq!(before, after);
    }

    #[test]
    fn stray_key_in_operator_mode_resets_pending_and_pops_out() {
        let mut editor = make_editor(b"abc");
        editor.start_operator(OperatorId::Delete);
        editor.feed("<Esc>");
        assert_eq!(editor.mode, ModeId::Normal);
        assert!(editor.pending.operator.is_none());
    }
}
