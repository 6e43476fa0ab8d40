//! The crash-safe write-ahead journal: a fixed-size region of the image that
//! records whole-block images before they are installed into their live
//! locations. A transaction is zero or more DATA records followed by exactly
//! one COMMIT record; only a transaction with a COMMIT record on disk is
//! considered durable.
//!
//! `header` owns the 8-byte on-disk header and the append primitive that
//! anchors crash consistency. `record` encodes/decodes individual records and
//! exposes the one scanner both `overlay` (a soft-capped read view used while
//! building a transaction) and `install` (a hard-capped replay pass) walk.

pub mod header;
pub mod install;
pub mod overlay;
pub mod record;

pub use header::JournalHeader;
pub use overlay::CommittedView;
