//! Error kinds surfaced to the CLI, with a single exit code (1) for all of them.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while logging a create or installing the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("name invalid: must be 1..{max} bytes, got {len}")]
    NameInvalid { len: usize, max: usize },

    #[error("root inode is not a directory")]
    RootNotDir,

    #[error("root directory has no data block")]
    RootNoBlock,

    #[error("no free inode")]
    NoFreeInode,

    #[error("directory is full")]
    DirFull,

    #[error("file '{0}' already exists")]
    Exists(String),

    #[error("inode bitmap says free but inode slot is not empty")]
    CorruptBitmap,

    #[error("journal full, run `install` first")]
    JournalFull,

    #[error("journal not initialized")]
    JournalMissing,

    #[error("install encountered a transaction with too many records")]
    TxnTooLarge,
}

pub type JournalResult<T> = Result<T, JournalError>;

impl JournalError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JournalError::Io {
            path: path.into(),
            source,
        }
    }
}
