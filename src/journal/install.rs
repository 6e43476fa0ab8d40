//! Replay every committed transaction into the live blocks, then reset the
//! journal to its empty state.

use log::info;

use crate::block::BlockDevice;
use crate::error::{JournalError, JournalResult};
use crate::layout::BLOCK_SIZE;

use super::header::{clear_region, header_write, require_present, JournalHeader};
use super::record::{scan, ScanEvent};

const PENDING_MAX: usize = 64;

/// Replay the journal's committed transactions into the live image, in
/// commit order, then clear the journal region and install a fresh header.
///
/// Returns the number of committed transactions replayed.
pub fn install(dev: &mut BlockDevice) -> JournalResult<u32> {
    let header = require_present(dev)?;

    // The scanner needs `dev` to read journal records, so it cannot also hand
    // out a second mutable borrow for live-block writes; collect the decoded
    // events first, then apply them once the scan itself is done reading.
    let mut events: Vec<ScanEvent> = Vec::new();
    scan(dev, header.nbytes_used, |event| events.push(event))?;

    let commits = apply_events(dev, events)?;

    clear_region(dev)?;
    header_write(dev, JournalHeader::fresh())?;

    info!("install: replayed {commits} committed transaction(s)");
    Ok(commits)
}

/// Replay decoded events into their live blocks, in order, returning the
/// number of COMMIT records seen. Any records left pending when the events
/// run out belong to an uncommitted trailing transaction and are discarded,
/// per §4.R/§4.I. Split out from `install` so the hard pending cap can be
/// exercised directly, without needing a journal large enough to physically
/// hold more DATA records than the real on-disk capacity ever allows.
fn apply_events(dev: &mut BlockDevice, events: Vec<ScanEvent>) -> JournalResult<u32> {
    let mut pending: Vec<(u32, Box<[u8; BLOCK_SIZE]>)> = Vec::new();
    let mut commits: u32 = 0;

    for event in events {
        match event {
            ScanEvent::Data { block_no, image } => {
                if pending.len() >= PENDING_MAX {
                    return Err(JournalError::TxnTooLarge);
                }
                pending.push((block_no, image));
            }
            ScanEvent::Commit => {
                for (block_no, image) in pending.drain(..) {
                    dev.write_block(block_no, &image)?;
                }
                commits += 1;
            }
        }
    }

    Ok(commits)
}
