//! The `Ui` collaborator (§6): the rendering surface consumed by the core.
//! Window layout arithmetic and terminal rendering are explicit Non-goals
//! of this crate (§1); the core only needs a handle it can ask to redraw,
//! prompt, and report input on. `main.rs` supplies the real `termion`
//! implementation; tests use a no-op stub.

use crate::key::Key;

/// Cursor rendering style a mode may request (block in `NORMAL`, bar in
/// `INSERT`, underline for `REPLACE` — purely advisory, the core never
/// inspects it itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Block,
    Bar,
    Underline,
}

/// The rendering/input surface a `Window` drives (§6). Every method that
/// can fail surfaces `std::io::Error` directly; the core wraps these with
/// `EditorError::Io` where it needs to via `?`.
pub trait Ui {
    /// Redraws the buffer from `lines` (already split on `\n` by the
    /// caller) with the cursor at `(row, col)`. Scrolling, wrapping and
    /// multi-window layout are explicit Non-goals (§1) — a `Ui` impl is
    /// free to clip to its own terminal size however it likes.
    fn redraw(&mut self, lines: &[String], cursor: (usize, usize)) -> std::io::Result<()>;
    fn draw_status(&mut self, message: &str) -> std::io::Result<()>;
    fn set_cursor_style(&mut self, style: CursorStyle);
    fn resize(&mut self, width: u16, height: u16);

    fn show_prompt(&mut self, prompt: &str) -> std::io::Result<()>;
    fn hide_prompt(&mut self) -> std::io::Result<()>;

    fn show_info(&mut self, message: &str) -> std::io::Result<()>;
    fn hide_info(&mut self) -> std::io::Result<()>;

    /// Blocking read of the next key (§5: one of the mainloop's suspension
    /// points).
    fn getkey(&mut self) -> std::io::Result<Option<Key>>;

    /// The fd the mainloop polls for readability before calling `getkey`
    /// (§5, §9A: "a checked mainloop that polls ... after each select" is
    /// written generically in the core against whatever fd the `Ui`
    /// collaborator exposes, rather than the core owning a terminal fd
    /// itself).
    fn input_fd(&self) -> std::os::fd::RawFd;

    fn suspend(&mut self) -> std::io::Result<()>;
    fn die(&mut self, message: &str);
}

/// A `Ui` that performs no actual I/O, for unit tests of the core that
/// never need a real terminal.
#[derive(Default)]
pub struct NullUi {
    pub status: String,
    pub cursor_style: CursorStyle,
}

impl Default for CursorStyle {
    fn default() -> Self {
        CursorStyle::Block
    }
}

impl Ui for NullUi {
    fn redraw(&mut self, _lines: &[String], _cursor: (usize, usize)) -> std::io::Result<()> {
        Ok(())
    }

    fn draw_status(&mut self, message: &str) -> std::io::Result<()> {
        self.status = message.to_string();
        Ok(())
    }

    fn set_cursor_style(&mut self, style: CursorStyle) {
        self.cursor_style = style;
    }

    fn resize(&mut self, _width: u16, _height: u16) {}

    fn show_prompt(&mut self, _prompt: &str) -> std::io::Result<()> {
        Ok(())
    }

    fn hide_prompt(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn show_info(&mut self, _message: &str) -> std::io::Result<()> {
        Ok(())
    }

    fn hide_info(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn getkey(&mut self) -> std::io::Result<Option<Key>> {
        Ok(None)
    }

    fn suspend(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn die(&mut self, _message: &str) {}
}
