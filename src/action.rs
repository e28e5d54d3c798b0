//! The pending parse (§3 "Action") and its flag set.
//!
//! Modeled after the "one struct holds the whole pending vi-command"
//! pattern in `other_examples/58e49945_km-clay-vicut__src-vicmd.rs.rs`
//! (`ViCmd`/`CmdFlags`), generalized to this crate's byte-offset motions,
//! text-objects and operators instead of that crate's line-buffer ones.

use bitflags::bitflags;

use crate::macros::MacroId;
use crate::motion::MotionId;
use crate::operator::{OperatorArg, OperatorId};
use crate::textobject::TextObjectId;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionFlags: u32 {
        /// Force charwise range semantics even if the motion/mode would
        /// otherwise linewise-normalise.
        const CHARWISE   = 1 << 0;
        /// Force linewise range semantics.
        const LINEWISE    = 1 << 1;
        /// Operator end is inclusive of the final character (extends the
        /// range by one position after the motion runs).
        const INCLUSIVE   = 1 << 2;
        /// Motion pushes its start position onto the jumplist.
        const JUMP        = 1 << 3;
        /// Repeating the motion N times equals repeating it once.
        const IDEMPOTENT  = 1 << 4;
        /// Text-object variant selects the outer (delimiter-inclusive) span.
        const OUTER       = 1 << 5;
    }
}

/// A register name: `"` (unnamed, the default), a named register `a`-`z`
/// (uppercase means append), or a clipboard-backed register `*`/`+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName {
    Unnamed,
    Named(char),
    Clipboard,
    PrimarySelection,
    /// Small-delete register (`-`), auto-filled by sub-line deletes that did
    /// not name a register explicitly.
    SmallDelete,
    /// The slot `.` replays from; never written to directly by a user
    /// keystroke, only by the executor (§4.7).
    Repeat,
}

impl RegisterName {
    pub fn from_char(c: char) -> Self {
        match c {
            '"' => RegisterName::Unnamed,
            '*' => RegisterName::Clipboard,
            '+' => RegisterName::PrimarySelection,
            '-' => RegisterName::SmallDelete,
            '.' => RegisterName::Repeat,
            lower if lower.is_ascii_lowercase() => RegisterName::Named(lower),
            upper if upper.is_ascii_uppercase() => RegisterName::Named(upper.to_ascii_lowercase()),
            other => RegisterName::Named(other),
        }
    }

    /// Whether the register name was given in uppercase, meaning "append to
    /// the existing contents" rather than "overwrite".
    pub fn is_append(c: char) -> bool {
        c.is_ascii_uppercase()
    }
}

/// The pending `(count, register, operator, motion, text-object, mark, arg)`
/// tuple described in §3. Accumulated across keystrokes by the mode graph's
/// bound actions; consumed and reset by the executor once a motion or
/// text-object completes it.
#[derive(Debug, Clone, Default)]
pub struct PendingAction {
    pub count: Option<u32>,
    pub register: Option<RegisterName>,
    pub operator: Option<OperatorId>,
    pub motion: Option<MotionId>,
    pub textobject: Option<TextObjectId>,
    pub flags: ActionFlags,
    /// Mark id for mark-setting/-addressing actions (`m{x}`, `` `{x} ``).
    pub mark: Option<char>,
    /// Pending find-char/replace-char argument (the character after `f`,
    /// `t`, `r`, ...).
    pub search_char: Option<char>,
    pub arg: Option<OperatorArg>,
    /// The operator macro bytes captured for this action, if it is
    /// repeatable and was recorded under an operator macro (§4.7).
    pub macro_id: Option<MacroId>,
    /// Whether `register` was named in uppercase (append rather than
    /// overwrite, §3).
    pub register_append: bool,
}

impl PendingAction {
    pub fn count_or_default(&self) -> u32 {
        self.count.unwrap_or(1).max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.count.is_none()
            && self.register.is_none()
            && self.operator.is_none()
            && self.motion.is_none()
            && self.textobject.is_none()
            && self.mark.is_none()
            && self.search_char.is_none()
    }

    /// Folds a decimal digit into the pending count (`1`-`9` start a count;
    /// `0` only continues one, since a bare `0` is itself the
    /// "beginning-of-line" motion).
    pub fn push_count_digit(&mut self, digit: u32) {
        self.count = Some(self.count.unwrap_or(0) * 10 + digit);
    }

    pub fn reset(&mut self) {
        *self = PendingAction::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_accumulates_left_to_right() {
        let mut a = PendingAction::default();
        a.push_count_digit(2);
        a.push_count_digit(5);
        assert_eq!(a.count, Some(25));
    }

    #[test]
    fn default_count_is_one() {
        assert_eq!(PendingAction::default().count_or_default(), 1);
    }

    #[test]
    fn register_name_uppercase_appends() {
        assert!(RegisterName::is_append('A'));
        assert!(!RegisterName::is_append('a'));
        assert_eq!(RegisterName::from_char('A'), RegisterName::Named('a'));
    }
}
