//! Command-line surface, in the same derive style as `crate_rootfs`'s `Args`.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "vsfs-journal", about = "Crash-safe write-ahead journal for a VSFS image")]
pub struct Cli {
    /// Path to the disk image to operate on.
    #[arg(long, default_value = "vsfs.img")]
    pub image: PathBuf,

    /// Increase log verbosity; repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log the creation of a new directory entry to the journal.
    Create {
        /// Name of the entry to create (1..28 bytes). Taken as a raw OS
        /// string rather than `String` so a non-UTF-8 argv name is rejected
        /// by `JournalError::NameInvalid`, not by clap's argument parser.
        name: OsString,
    },
    /// Replay every committed transaction in the journal into the live image.
    Install,
}
