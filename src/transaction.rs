//! The `create` transaction builder: validates a new directory entry against
//! the journal's committed view, builds its in-memory mutation, and logs it
//! as one journal transaction. Never touches a live block directly — that is
//! `journal::install`'s job.

use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::block::BlockDevice;
use crate::error::{JournalError, JournalResult};
use crate::journal::header::{capacity_bytes, header_read, init_if_absent};
use crate::journal::overlay::{build_overlay, CommittedView};
use crate::journal::record::{append_commit, append_data, DATA_RECORD_SIZE, COMMIT_RECORD_SIZE};
use crate::layout::{
    DirEntry, Inode, BLOCK_SIZE, DIRENTS_PER_BLOCK, INODES_PER_BLOCK, INODE_BMAP_BLK,
    INODE_TABLE_BLK, INODE_TYPE_DIR, INODE_TYPE_FREE, INODE_TYPE_REGULAR, NAME_LEN,
};

const ROOT_INODE_NUM: u32 = 0;
const FIRST_ALLOCATABLE_INODE: u32 = 1;
const LAST_ALLOCATABLE_INODE: u32 = 63;

fn read_with_overlay(dev: &mut BlockDevice, view: &CommittedView, blk: u32) -> JournalResult<[u8; BLOCK_SIZE]> {
    match view.overlay_find(blk) {
        Some(image) => Ok(*image),
        None => dev.read_block(blk),
    }
}

fn validate_root(root: &Inode) -> JournalResult<()> {
    if root.kind != INODE_TYPE_DIR {
        return Err(JournalError::RootNotDir);
    }
    if root.direct[0] == 0 {
        return Err(JournalError::RootNoBlock);
    }
    Ok(())
}

/// Copy `name` verbatim into a 28-byte NUL-padded field. `name` is an
/// arbitrary byte string straight from argv: no encoding is assumed beyond
/// byte-safety, only length is validated.
fn encode_name(name: &[u8]) -> JournalResult<[u8; NAME_LEN]> {
    if name.is_empty() || name.len() >= NAME_LEN {
        return Err(JournalError::NameInvalid {
            len: name.len(),
            max: NAME_LEN - 1,
        });
    }
    let mut buf = [0u8; NAME_LEN];
    buf[..name.len()].copy_from_slice(name);
    Ok(buf)
}

fn now_u32() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Log the creation of a new directory entry named `name` to the journal.
/// Returns once the transaction's records (and its terminating COMMIT) are
/// durable on disk; the live blocks are not touched until `install` runs.
pub fn create(dev: &mut BlockDevice, name: &[u8]) -> JournalResult<()> {
    let encoded_name = encode_name(name)?;

    let mut header = init_if_absent(dev)?;
    let view = build_overlay(dev, &header)?;

    let mut table0 = read_with_overlay(dev, &view, INODE_TABLE_BLK)?;
    let root = Inode::read_slot(&table0, ROOT_INODE_NUM);
    validate_root(&root)?;

    let mut bitmap = read_with_overlay(dev, &view, INODE_BMAP_BLK)?;

    let inum = (FIRST_ALLOCATABLE_INODE..=LAST_ALLOCATABLE_INODE)
        .find(|&i| {
            let byte = bitmap[(i / 8) as usize];
            byte & (1 << (i % 8)) == 0
        })
        .ok_or(JournalError::NoFreeInode)?;

    let block_index = inum / INODES_PER_BLOCK;
    let slot = inum % INODES_PER_BLOCK;
    debug_assert!(block_index < 2, "inode numbers above 63 are never allocated");

    let mut table1 = if block_index == 1 {
        Some(read_with_overlay(dev, &view, INODE_TABLE_BLK + 1)?)
    } else {
        None
    };

    let existing = match block_index {
        0 => Inode::read_slot(&table0, slot),
        _ => Inode::read_slot(table1.as_ref().unwrap(), slot),
    };
    if existing.kind != INODE_TYPE_FREE {
        return Err(JournalError::CorruptBitmap);
    }

    let used = (root.size / 32).max(2);
    if used >= DIRENTS_PER_BLOCK {
        return Err(JournalError::DirFull);
    }

    let mut dir_block = read_with_overlay(dev, &view, root.direct[0])?;
    for i in 0..used {
        let entry = DirEntry::read_slot(&dir_block, i);
        if entry.inode != 0 && entry.name == encoded_name {
            return Err(JournalError::Exists(String::from_utf8_lossy(name).into_owned()));
        }
    }

    let nmods: u32 = if block_index == 1 { 4 } else { 3 };
    let txn_bytes = nmods * DATA_RECORD_SIZE as u32 + COMMIT_RECORD_SIZE as u32;
    let available = capacity_bytes()
        .checked_sub(header.nbytes_used)
        .ok_or(JournalError::JournalFull)?;
    if txn_bytes > available {
        return Err(JournalError::JournalFull);
    }

    // Mutate the in-memory copies; nothing here touches a live block.
    let byte_idx = (inum / 8) as usize;
    bitmap[byte_idx] |= 1 << (inum % 8);

    let now = now_u32();
    let new_inode = Inode {
        kind: INODE_TYPE_REGULAR,
        links: 1,
        size: 0,
        direct: [0; 8],
        ctime: now,
        mtime: now,
    };
    match block_index {
        0 => new_inode.write_slot(&mut table0, slot),
        _ => new_inode.write_slot(table1.as_mut().unwrap(), slot),
    }

    let dirent = DirEntry {
        inode: inum,
        name: encoded_name,
    };
    dirent.write_slot(&mut dir_block, used);

    let mut root = root;
    root.size += 32;
    root.mtime = now;
    root.write_slot(&mut table0, ROOT_INODE_NUM);

    // table0 always holds the updated root; table1, when touched, holds the
    // new inode instead.
    append_data(dev, &mut header, INODE_BMAP_BLK, &bitmap)?;
    append_data(dev, &mut header, INODE_TABLE_BLK, &table0)?;
    if let Some(table1) = table1.as_ref() {
        append_data(dev, &mut header, INODE_TABLE_BLK + 1, table1)?;
    }
    append_data(dev, &mut header, root.direct[0], &dir_block)?;
    append_commit(dev, &mut header)?;

    info!(
        "create: logged inode {inum} ('{}') at dirent slot {used}",
        String::from_utf8_lossy(name)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DATA_START_BLK;
    use std::io::Write as _;

    fn synthetic_image() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let total_blocks = DATA_START_BLK + 4;
        f.write_all(&vec![0u8; total_blocks as usize * BLOCK_SIZE]).unwrap();
        f.flush().unwrap();
        f
    }

    fn seed_root(dev: &mut BlockDevice) {
        let mut bitmap = [0u8; BLOCK_SIZE];
        bitmap[0] = 0x01; // inode 0 (root) allocated
        dev.write_block(INODE_BMAP_BLK, &bitmap).unwrap();

        let mut table0 = [0u8; BLOCK_SIZE];
        let root = Inode {
            kind: INODE_TYPE_DIR,
            links: 2,
            size: 64, // two reserved, unwritten slots for "." and ".."
            direct: [DATA_START_BLK, 0, 0, 0, 0, 0, 0, 0],
            ctime: 1,
            mtime: 1,
        };
        root.write_slot(&mut table0, ROOT_INODE_NUM);
        dev.write_block(INODE_TABLE_BLK, &table0).unwrap();
        dev.write_block(INODE_TABLE_BLK + 1, &[0u8; BLOCK_SIZE]).unwrap();
        dev.write_block(DATA_START_BLK, &[0u8; BLOCK_SIZE]).unwrap();
    }

    #[test]
    fn create_logs_a_transaction_and_leaves_live_blocks_untouched() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        create(&mut dev, b"a").unwrap();

        // Live root dir block is untouched until install runs.
        let live_dir = dev.read_block(DATA_START_BLK).unwrap();
        assert_eq!(live_dir, [0u8; BLOCK_SIZE]);

        let header = header_read(&mut dev).unwrap();
        assert!(header.nbytes_used > 8);
    }

    #[test]
    fn create_rejects_a_duplicate_name_before_install() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        create(&mut dev, b"a").unwrap();
        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::Exists(_)));
    }

    #[test]
    fn create_rejects_an_oversized_name() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        let long_name = "x".repeat(NAME_LEN);
        let err = create(&mut dev, long_name.as_bytes()).unwrap_err();
        assert!(matches!(err, JournalError::NameInvalid { .. }));
    }

    #[test]
    fn create_fails_when_root_is_not_a_directory() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        let mut table0 = dev.read_block(INODE_TABLE_BLK).unwrap();
        let mut root = Inode::read_slot(&table0, ROOT_INODE_NUM);
        root.kind = INODE_TYPE_REGULAR;
        root.write_slot(&mut table0, ROOT_INODE_NUM);
        dev.write_block(INODE_TABLE_BLK, &table0).unwrap();

        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::RootNotDir));
    }

    #[test]
    fn create_fails_when_root_has_no_data_block() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        let mut table0 = dev.read_block(INODE_TABLE_BLK).unwrap();
        let mut root = Inode::read_slot(&table0, ROOT_INODE_NUM);
        root.direct[0] = 0;
        root.write_slot(&mut table0, ROOT_INODE_NUM);
        dev.write_block(INODE_TABLE_BLK, &table0).unwrap();

        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::RootNoBlock));
    }

    #[test]
    fn create_fails_when_no_inode_is_free() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        // Mark inodes 0..=63 (the whole allocatable range) used.
        let mut bitmap = [0u8; BLOCK_SIZE];
        bitmap[..8].fill(0xFF);
        dev.write_block(INODE_BMAP_BLK, &bitmap).unwrap();

        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::NoFreeInode));
    }

    #[test]
    fn create_fails_when_bitmap_says_free_but_slot_is_occupied() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        // Bit 1 is left clear (free) in the bitmap, but slot 1 of the inode
        // table already holds a non-free inode: a corrupt combination that
        // must never be trusted blindly.
        let mut table0 = dev.read_block(INODE_TABLE_BLK).unwrap();
        let stray = Inode {
            kind: INODE_TYPE_REGULAR,
            links: 1,
            size: 0,
            direct: [0; 8],
            ctime: 1,
            mtime: 1,
        };
        stray.write_slot(&mut table0, 1);
        dev.write_block(INODE_TABLE_BLK, &table0).unwrap();

        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::CorruptBitmap));
    }

    #[test]
    fn create_fails_when_directory_is_full() {
        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        let mut table0 = dev.read_block(INODE_TABLE_BLK).unwrap();
        let mut root = Inode::read_slot(&table0, ROOT_INODE_NUM);
        root.size = DIRENTS_PER_BLOCK * 32; // every slot already considered used
        root.write_slot(&mut table0, ROOT_INODE_NUM);
        dev.write_block(INODE_TABLE_BLK, &table0).unwrap();

        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::DirFull));
    }

    #[test]
    fn create_fails_when_journal_has_no_room_left_for_a_new_transaction() {
        use crate::journal::header::{header_write, JournalHeader, JOURNAL_MAGIC};

        let img = synthetic_image();
        let mut dev = BlockDevice::open(img.path()).unwrap();
        seed_root(&mut dev);

        // Leave only a sliver of capacity: far less than one create's
        // 3 DATA records + COMMIT (3 * 4104 + 4 bytes) could ever fit.
        let header = JournalHeader {
            magic: JOURNAL_MAGIC,
            nbytes_used: capacity_bytes() - 50,
        };
        header_write(&mut dev, header).unwrap();

        let err = create(&mut dev, b"a").unwrap_err();
        assert!(matches!(err, JournalError::JournalFull));
    }
}
