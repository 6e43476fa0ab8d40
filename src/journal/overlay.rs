//! The committed-view overlay: replays the journal's record stream entirely
//! in memory to answer "what is the latest committed image of block X",
//! without touching the live file-system blocks.

use log::debug;

use crate::block::BlockDevice;
use crate::error::JournalResult;
use crate::layout::BLOCK_SIZE;

use super::header::JournalHeader;
use super::record::{scan, ScanEvent};

const PENDING_MAX: usize = 32;
const LATEST_MAX: usize = 64;

/// Latest committed image per block, built by scanning the whole record area once.
pub struct CommittedView {
    latest: Vec<(u32, Box<[u8; BLOCK_SIZE]>)>,
}

impl CommittedView {
    pub fn overlay_find(&self, block_no: u32) -> Option<&[u8; BLOCK_SIZE]> {
        self.latest
            .iter()
            .find(|(b, _)| *b == block_no)
            .map(|(_, img)| img.as_ref())
    }
}

fn upsert(latest: &mut Vec<(u32, Box<[u8; BLOCK_SIZE]>)>, block_no: u32, image: Box<[u8; BLOCK_SIZE]>) {
    if let Some(slot) = latest.iter_mut().find(|(b, _)| *b == block_no) {
        slot.1 = image;
        return;
    }
    if latest.len() >= LATEST_MAX {
        return; // soft stop: overlay is a best-effort read view, capped per §4.V
    }
    latest.push((block_no, image));
}

/// Scan the journal and build the latest-committed-image overlay. Uncommitted
/// trailing DATA records (no matching COMMIT yet) contribute nothing.
pub fn build_overlay(dev: &mut BlockDevice, header: &JournalHeader) -> JournalResult<CommittedView> {
    let mut latest: Vec<(u32, Box<[u8; BLOCK_SIZE]>)> = Vec::new();
    let mut pending: Vec<(u32, Box<[u8; BLOCK_SIZE]>)> = Vec::new();
    let mut pending_overflowed = false;

    scan(dev, header.nbytes_used, |event| {
        if pending_overflowed {
            return;
        }
        match event {
            ScanEvent::Data { block_no, image } => {
                if let Some(slot) = pending.iter_mut().find(|(b, _)| *b == block_no) {
                    slot.1 = image;
                } else if pending.len() < PENDING_MAX {
                    pending.push((block_no, image));
                } else {
                    pending_overflowed = true;
                }
            }
            ScanEvent::Commit => {
                for (block_no, image) in pending.drain(..) {
                    upsert(&mut latest, block_no, image);
                }
            }
        }
    })?;

    debug!("overlay built: {} committed block images", latest.len());
    Ok(CommittedView { latest })
}
