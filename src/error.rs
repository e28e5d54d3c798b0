//! Typed error hierarchy for the editor core.
//!
//! Per-motion/per-text-object "no such position" results stay `Option`-shaped
//! at the call site (an unmatched search or an out-of-range mark is an
//! ordinary outcome, not a failure). `EditorError` is reserved for conditions
//! a caller actually has to branch on: I/O, malformed regexes, unknown
//! names, and "there is nothing left to operate on".

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("unknown register: {0:?}")]
    UnknownRegister(char),

    #[error("unknown mark: {0:?}")]
    UnknownMark(char),

    #[error("unknown mode: {0}")]
    UnknownMode(&'static str),

    #[error("no window is focused")]
    NoFocusedWindow,

    #[error("file has no associated path")]
    NoFileName,

    #[error("file content was truncated by an asynchronous fault")]
    Truncated,

    #[error("a macro is already recording")]
    AlreadyRecording,

    #[error("unparseable key sequence: {0:?}")]
    KeyParse(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;
