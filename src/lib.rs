//! Crash-safe write-ahead journal for a small fixed-layout VSFS disk image.
//!
//! Two operations are exposed: [`transaction::create`] appends a new
//! directory-entry transaction to the journal without touching the live
//! file system, and [`journal::install::install`] replays every committed
//! transaction into its live blocks and resets the journal. See `journal`
//! for the on-disk record format and `layout` for the image's fixed layout.

pub mod block;
pub mod cli;
pub mod error;
pub mod journal;
pub mod layout;
pub mod transaction;

pub use block::BlockDevice;
pub use error::{JournalError, JournalResult};
