//! The journal header: an 8-byte magic + byte-count pair at the start of the
//! journal region, and the append primitive that is the crash-consistency
//! anchor for the whole design (see module docs in `journal/mod.rs`).

use log::{debug, warn};

use crate::block::BlockDevice;
use crate::error::{JournalError, JournalResult};
use crate::layout::{BLOCK_SIZE, JOURNAL_BLOCKS, JOURNAL_START_BLK};

pub const JOURNAL_MAGIC: u32 = 0x4A52_4E4C;
pub const HEADER_SIZE: u32 = 8;

pub fn journal_base_offset() -> u64 {
    JOURNAL_START_BLK as u64 * BLOCK_SIZE as u64
}

pub fn capacity_bytes() -> u32 {
    JOURNAL_BLOCKS * BLOCK_SIZE as u32
}

/// In-memory mirror of the on-disk 8-byte header. Every function here keeps
/// the invariant that, at its return, the on-disk header equals `self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    pub magic: u32,
    pub nbytes_used: u32,
}

impl JournalHeader {
    pub fn fresh() -> Self {
        JournalHeader {
            magic: JOURNAL_MAGIC,
            nbytes_used: HEADER_SIZE,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == JOURNAL_MAGIC
            && self.nbytes_used >= HEADER_SIZE
            && self.nbytes_used <= capacity_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.nbytes_used <= HEADER_SIZE
    }

    fn from_bytes(bytes: &[u8; 8]) -> Self {
        JournalHeader {
            magic: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            nbytes_used: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
        }
    }

    fn to_bytes(self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.nbytes_used.to_le_bytes());
        buf
    }
}

/// Read the raw header without validating it.
pub fn header_read(dev: &mut BlockDevice) -> JournalResult<JournalHeader> {
    let mut buf = [0u8; 8];
    dev.read_at(journal_base_offset(), &mut buf)?;
    Ok(JournalHeader::from_bytes(&buf))
}

/// Persist `header` at the journal base.
pub fn header_write(dev: &mut BlockDevice, header: JournalHeader) -> JournalResult<()> {
    dev.write_at(journal_base_offset(), &header.to_bytes())
}

/// Zero every block of the journal region.
pub fn clear_region(dev: &mut BlockDevice) -> JournalResult<()> {
    let zero = [0u8; BLOCK_SIZE];
    for i in 0..JOURNAL_BLOCKS {
        dev.write_block(JOURNAL_START_BLK + i, &zero)?;
    }
    Ok(())
}

/// Read the header; if it is absent or corrupt, zero the region and install a
/// fresh one. Returns the header now on disk either way.
pub fn init_if_absent(dev: &mut BlockDevice) -> JournalResult<JournalHeader> {
    let header = header_read(dev)?;
    if header.is_valid() {
        return Ok(header);
    }
    warn!("journal header invalid or absent, formatting a fresh journal region");
    clear_region(dev)?;
    let fresh = JournalHeader::fresh();
    header_write(dev, fresh)?;
    Ok(fresh)
}

/// Read the header, failing if it is absent or corrupt.
pub fn require_present(dev: &mut BlockDevice) -> JournalResult<JournalHeader> {
    let header = header_read(dev)?;
    if !header.is_valid() {
        return Err(JournalError::JournalMissing);
    }
    Ok(header)
}

/// Append `src` to the record area, failing if it would overflow the
/// journal's fixed capacity. On success the header is rewritten to reflect
/// the new tail *after* the bytes themselves are durable, so a crash between
/// the two leaves the on-disk header pointing just past the last successful
/// append and the just-written bytes are an ignorable, truncated tail.
pub fn append_bytes(dev: &mut BlockDevice, header: &mut JournalHeader, src: &[u8]) -> JournalResult<()> {
    let n = src.len() as u32;
    if header.nbytes_used.checked_add(n).is_none() || header.nbytes_used + n > capacity_bytes() {
        return Err(JournalError::JournalFull);
    }
    let offset = journal_base_offset() + header.nbytes_used as u64;
    dev.write_at(offset, src)?;
    header.nbytes_used += n;
    header_write(dev, *header)?;
    debug!(
        "journal append: {} bytes, nbytes_used now {}",
        n, header.nbytes_used
    );
    Ok(())
}
