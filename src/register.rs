//! Register storage (§3): a byte buffer plus a `linewise` flag, addressed by
//! [`RegisterName`](crate::action::RegisterName). Named/unnamed/small-delete
//! registers are plain in-memory buffers; `*`/`+` bridge to the OS
//! clipboard via `arboard`, generalized from a single default clipboard
//! register to the full named-register bank.

use std::collections::HashMap;

use crate::action::RegisterName;

/// The contents of one register: raw bytes plus whether they were yanked
/// linewise (so `p`/`P` knows to paste as whole lines, §4.5 `PUT`).
#[derive(Debug, Clone, Default)]
pub struct Register {
    pub data: Vec<u8>,
    pub linewise: bool,
}

impl Register {
    pub fn set(&mut self, data: Vec<u8>, linewise: bool) {
        self.data = data;
        self.linewise = linewise;
    }

    pub fn append(&mut self, data: &[u8], linewise: bool) {
        if self.linewise && !self.data.ends_with(b"\n") {
            self.data.push(b'\n');
        }
        self.data.extend_from_slice(data);
        self.linewise = self.linewise || linewise;
    }
}

/// The full register bank: the fixed named slots plus clipboard bridging.
/// Per-cursor registers used during multi-cursor yanks (§3, §4.6) live on
/// the [`View`](crate::view::View) itself, not here.
pub struct Registers {
    named: HashMap<char, Register>,
    unnamed: Register,
    small_delete: Register,
    repeat: Register,
    clipboard: Option<arboard::Clipboard>,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            named: HashMap::new(),
            unnamed: Register::default(),
            small_delete: Register::default(),
            repeat: Register::default(),
            clipboard: arboard::Clipboard::new().ok(),
        }
    }

    /// Writes `data` into `name`. Uppercase naming at the keystroke layer is
    /// translated into `append` by the caller before reaching here
    /// ([`RegisterName`] folds case into the name itself); this always
    /// overwrites. The unnamed register is always refreshed alongside any
    /// explicitly named target, matching familiar vi-like semantics.
    pub fn write(&mut self, name: RegisterName, data: Vec<u8>, linewise: bool) {
        self.unnamed.set(data.clone(), linewise);
        match name {
            RegisterName::Unnamed => {}
            RegisterName::Named(c) => {
                self.named.entry(c).or_default().set(data, linewise);
            }
            RegisterName::SmallDelete => self.small_delete.set(data, linewise),
            RegisterName::Repeat => self.repeat.set(data, linewise),
            RegisterName::Clipboard | RegisterName::PrimarySelection => {
                if let Some(cb) = &mut self.clipboard {
                    let _ = cb.set_text(String::from_utf8_lossy(&data).into_owned());
                }
            }
        }
    }

    pub fn append(&mut self, name: RegisterName, data: &[u8], linewise: bool) {
        match name {
            RegisterName::Unnamed => self.unnamed.append(data, linewise),
            RegisterName::Named(c) => self.named.entry(c).or_default().append(data, linewise),
            RegisterName::SmallDelete => self.small_delete.append(data, linewise),
            RegisterName::Repeat => self.repeat.append(data, linewise),
            RegisterName::Clipboard | RegisterName::PrimarySelection => {
                if let Some(cb) = &mut self.clipboard {
                    let existing = cb.get_text().unwrap_or_default();
                    let mut merged = existing.into_bytes();
                    merged.extend_from_slice(data);
                    let _ = cb.set_text(String::from_utf8_lossy(&merged).into_owned());
                }
            }
        }
    }

    pub fn read(&mut self, name: RegisterName) -> Register {
        match name {
            RegisterName::Unnamed => self.unnamed.clone(),
            RegisterName::Named(c) => self.named.get(&c).cloned().unwrap_or_default(),
            RegisterName::SmallDelete => self.small_delete.clone(),
            RegisterName::Repeat => self.repeat.clone(),
            RegisterName::Clipboard | RegisterName::PrimarySelection => {
                let text = self
                    .clipboard
                    .as_mut()
                    .and_then(|cb| cb.get_text().ok())
                    .unwrap_or_default();
                Register {
                    data: text.into_bytes(),
                    linewise: false,
                }
            }
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_refreshes_unnamed_too() {
        let mut regs = Registers::new();
        regs.write(RegisterName::Named('a'), b"hello".to_vec(), false);
        assert_eq!(regs.read(RegisterName::Named('a')).data, b"hello");
        assert_eq!(regs.read(RegisterName::Unnamed).data, b"hello");
    }

    #[test]
    fn append_adds_newline_between_linewise_chunks() {
        let mut regs = Registers::new();
        regs.write(RegisterName::Named('a'), b"one".to_vec(), true);
        regs.append(RegisterName::Named('a'), b"two", true);
        assert_eq!(regs.read(RegisterName::Named('a')).data, b"one\ntwo");
    }

    #[test]
    fn linewise_flag_tracked_per_register() {
        let mut regs = Registers::new();
        regs.write(RegisterName::Named('a'), b"line\n".to_vec(), true);
        assert!(regs.read(RegisterName::Named('a')).linewise);
    }
}
