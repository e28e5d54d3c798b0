//! `Window` and the shared-file registry (§3). A window pairs one `File`
//! with one `View`, plus its own jumplist, changelist, and `Ui` handle.
//! Files are reference-counted (`Rc<RefCell<File>>`) so two windows can
//! open the same path and edit through the same `Text` (§5's
//! shared-resource policy; §9's "cyclic references" design note: strong
//! ownership flows editor → files/windows → view → cursors, so the
//! registry — not the window — owns the `Rc`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::changelist::Changelist;
use crate::config::Config;
use crate::file::File;
use crate::jumplist::Jumplist;
use crate::text::SimpleText;
use crate::ui::Ui;
use crate::view::View;

pub type FileId = usize;

/// Owns every open `File`, keyed by filename so re-opening an already-open
/// path shares the existing buffer (§6 CLI surface: "duplicates (by name
/// match) share the existing `File`").
#[derive(Default)]
pub struct FileRegistry {
    files: HashMap<FileId, Rc<RefCell<File>>>,
    by_path: HashMap<PathBuf, FileId>,
    next_id: FileId,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` (or a scratch buffer if `None`), returning the existing
    /// `File` if the path is already open.
    pub fn open(&mut self, path: Option<&Path>) -> crate::error::Result<FileId> {
        if let Some(p) = path {
            if let Some(&id) = self.by_path.get(p) {
                return Ok(id);
            }
        }
        let text = SimpleText::load(path)?;
        let id = self.next_id;
        self.next_id += 1;
        self.files.insert(id, Rc::new(RefCell::new(File::new(Box::new(text), path.map(Path::to_path_buf)))));
        if let Some(p) = path {
            self.by_path.insert(p.to_path_buf(), id);
        }
        Ok(id)
    }

    pub fn get(&self, id: FileId) -> Option<Rc<RefCell<File>>> {
        self.files.get(&id).cloned()
    }

    /// Drops the registry's handle to `id`. The `File` itself is only
    /// actually destroyed once every window's `Rc` clone is gone too (§3
    /// invariant: refcount equals window references plus internal
    /// holders).
    pub fn forget(&mut self, id: FileId) {
        if let Some(file) = self.files.remove(&id) {
            if let Some(path) = file.borrow().path.clone() {
                self.by_path.remove(&path);
            }
        }
    }

    pub fn refcount(&self, id: FileId) -> usize {
        self.files.get(&id).map_or(0, Rc::strong_count)
    }
}

pub struct Window {
    pub file_id: FileId,
    pub file: Rc<RefCell<File>>,
    pub view: View,
    pub jumplist: Jumplist,
    pub changelist: Changelist,
    pub ui: Box<dyn Ui>,
}

impl Window {
    pub fn new(file_id: FileId, file: Rc<RefCell<File>>, ui: Box<dyn Ui>, config: &Config) -> Self {
        Self {
            file_id,
            file,
            view: View::new(0),
            jumplist: Jumplist::new(config.jumplist_capacity),
            changelist: Changelist::new(),
            ui,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::NullUi;

    #[test]
    fn reopening_same_path_shares_the_file() {
        let dir = std::env::temp_dir().join("vex-window-test.txt");
        std::fs::write(&dir, b"hello").unwrap();
        let mut reg = FileRegistry::new();
        let a = reg.open(Some(&dir)).unwrap();
        let b = reg.open(Some(&dir)).unwrap();
        assert_eq!(a, b);
        std::fs::remove_file(&dir).ok();
    }

    #[test]
    fn refcount_tracks_live_window_handles() {
        let mut reg = FileRegistry::new();
        let id = reg.open(None).unwrap();
        let file = reg.get(id).unwrap();
        let config = Config::default();
        let _w1 = Window::new(id, Rc::clone(&file), Box::new(NullUi::default()), &config);
        assert_eq!(reg.refcount(id), 3); // registry + file clone + window
    }
}
