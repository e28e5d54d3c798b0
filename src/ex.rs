//! The `:`-command evaluator (§1, §6): an external collaborator in the
//! spec's own words ("the ... :-ex command evaluator [is a] collaborator"),
//! kept minimal here so `+:cmd` and `PROMPT` have something real to drive
//! against. Command dispatch follows `state/apply_cmd.rs`'s
//! `cmd`/`args`-split-on-first-whitespace shape.

use crate::editor::Editor;
use crate::error::{EditorError, Result};

/// Runs one `:`-command line (without the leading `:`) against `editor`.
pub fn execute(editor: &mut Editor, line: &str) -> Result<()> {
    let line = line.trim();
    let (cmd, args) = match line.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => Ok(()),
        "q" | "quit" => {
            editor.quit();
            Ok(())
        }
        "q!" | "quit!" => {
            editor.quit();
            Ok(())
        }
        "w" | "write" => write(editor, args),
        "wq" | "x" => {
            write(editor, args)?;
            editor.quit();
            Ok(())
        }
        "e" | "edit" => edit(editor, args),
        _ => {
            if let Ok(lineno) = cmd.parse::<usize>() {
                goto_line(editor, lineno);
                return Ok(());
            }
            Err(EditorError::Message(format!("unrecognized command: {cmd:?}")))
        }
    }
}

fn write(editor: &mut Editor, args: &str) -> Result<()> {
    let file = editor.window.file.borrow();
    let path = if args.is_empty() {
        file.path.clone().ok_or(EditorError::NoFileName)?
    } else {
        std::path::PathBuf::from(args)
    };
    std::fs::write(&path, file.text.as_bytes())?;
    Ok(())
}

fn edit(editor: &mut Editor, args: &str) -> Result<()> {
    if args.is_empty() {
        return Err(EditorError::Message("usage: :e <path>".to_string()));
    }
    let path = std::path::PathBuf::from(args);
    let id = editor.files.open(Some(&path))?;
    let file = editor.files.get(id).expect("just opened");
    editor.window.file_id = id;
    editor.window.file = file;
    editor.window.view.collapse_to(0);
    Ok(())
}

fn goto_line(editor: &mut Editor, lineno: usize) {
    let pos = {
        let file = editor.window.file.borrow();
        file.text.pos_by_lineno(lineno.saturating_sub(1))
    };
    if let Some(pos) = pos {
        editor.window.view.primary_mut().pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::file::File;
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
    fn quit_sets_the_quit_flag() {
        let mut editor = make_editor(b"abc");
        execute(&mut editor, "q").unwrap();
        assert!(editor.quit);
    }

    #[test]
    fn unknown_command_is_an_error_but_does_not_quit() {
        let mut editor = make_editor(b"abc");
        assert!(execute(&mut editor, "bogus").is_err());
        assert!(!editor.quit);
    }

    #[test]
    fn numeric_command_jumps_to_line() {
        let mut editor = make_editor(b"one\ntwo\nthree\n");
        execute(&mut editor, "2").unwrap();
        assert_eq!(editor.window.view.primary().pos, 4);
    }

    #[test]
    fn write_without_path_or_filename_errors() {
        let mut editor = make_editor(b"abc");
        assert!(matches!(execute(&mut editor, "w"), Err(EditorError::NoFileName)));
    }
}
