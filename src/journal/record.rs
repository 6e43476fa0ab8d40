//! Encode/decode for DATA and COMMIT records, and the stateless scanner that
//! both the committed-view overlay (`journal::overlay`) and the installer
//! (`journal::install`) walk with identical stop conditions.

use crate::block::BlockDevice;
use crate::error::JournalResult;
use crate::layout::BLOCK_SIZE;

use super::header::{append_bytes, journal_base_offset, JournalHeader};

pub const REC_DATA: u16 = 1;
pub const REC_COMMIT: u16 = 2;
pub const REC_HEADER_SIZE: u16 = 4;
pub const DATA_RECORD_SIZE: u16 = REC_HEADER_SIZE + 4 + BLOCK_SIZE as u16;
pub const COMMIT_RECORD_SIZE: u16 = REC_HEADER_SIZE;

/// Append one DATA record (new, post-mutation image of `block_no`) to the journal.
///
/// Emitted as three separate `append_bytes` calls — header, block number,
/// image — each of which durably advances `nbytes_used` before the next
/// chunk is written, exactly like the reference implementation.
pub fn append_data(
    dev: &mut BlockDevice,
    header: &mut JournalHeader,
    block_no: u32,
    image: &[u8; BLOCK_SIZE],
) -> JournalResult<()> {
    let rec_header: [u8; 4] = [
        (REC_DATA & 0xff) as u8,
        (REC_DATA >> 8) as u8,
        (DATA_RECORD_SIZE & 0xff) as u8,
        (DATA_RECORD_SIZE >> 8) as u8,
    ];
    append_bytes(dev, header, &rec_header)?;
    append_bytes(dev, header, &block_no.to_le_bytes())?;
    append_bytes(dev, header, image)?;
    Ok(())
}

/// Append the COMMIT record that terminates the current transaction.
pub fn append_commit(dev: &mut BlockDevice, header: &mut JournalHeader) -> JournalResult<()> {
    let rec_header: [u8; 4] = [
        (REC_COMMIT & 0xff) as u8,
        (REC_COMMIT >> 8) as u8,
        (COMMIT_RECORD_SIZE & 0xff) as u8,
        (COMMIT_RECORD_SIZE >> 8) as u8,
    ];
    append_bytes(dev, header, &rec_header)
}

/// One decoded record-area event.
pub enum ScanEvent {
    Data { block_no: u32, image: Box<[u8; BLOCK_SIZE]> },
    Commit,
}

/// Walk the record area from byte 8 to `nbytes_used`, calling `on_event` for
/// every well-formed record, and stopping silently (not an error) the moment
/// any of the §4.R stop conditions is hit: a too-short header, a record that
/// would run past `nbytes_used` (a truncated, uncommitted tail), a DATA/COMMIT
/// record with the wrong declared size, or an unknown type.
pub fn scan(
    dev: &mut BlockDevice,
    nbytes_used: u32,
    mut on_event: impl FnMut(ScanEvent),
) -> JournalResult<()> {
    let base = journal_base_offset();
    let mut pos: u32 = 8;

    while pos as u64 + 4 <= nbytes_used as u64 {
        let mut rh = [0u8; 4];
        dev.read_at(base + pos as u64, &mut rh)?;
        let rec_type = u16::from_le_bytes([rh[0], rh[1]]);
        let size = u16::from_le_bytes([rh[2], rh[3]]);

        if size < 4 {
            break;
        }
        if pos as u64 + size as u64 > nbytes_used as u64 {
            break;
        }

        match rec_type {
            REC_DATA if size == DATA_RECORD_SIZE => {
                let mut block_no_bytes = [0u8; 4];
                dev.read_at(base + pos as u64 + 4, &mut block_no_bytes)?;
                let block_no = u32::from_le_bytes(block_no_bytes);
                let mut image = Box::new([0u8; BLOCK_SIZE]);
                dev.read_at(base + pos as u64 + 8, &mut *image)?;
                on_event(ScanEvent::Data { block_no, image });
            }
            REC_COMMIT if size == COMMIT_RECORD_SIZE => {
                on_event(ScanEvent::Commit);
            }
            _ => break,
        }

        pos += size as u32;
    }

    Ok(())
}
