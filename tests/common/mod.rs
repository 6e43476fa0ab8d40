//! Synthesizes a minimal VSFS image for the integration tests: just enough
//! of the fixed layout (an empty journal region, an inode bitmap with the
//! root inode marked used, a two-block inode table holding the root
//! directory inode, and one empty root-directory data block) for `create`
//! and `install` to operate on. This tool never formats an image itself —
//! that is `mkfs`'s job, out of scope here — so tests build the minimum a
//! real `mkfs` would have produced.

use std::io::Write;

use tempfile::NamedTempFile;

use vsfs_journal::layout::{
    Inode, BLOCK_SIZE, DATA_START_BLK, INODE_BMAP_BLK, INODE_TABLE_BLK, INODE_TYPE_DIR,
};
use vsfs_journal::BlockDevice;

pub const IMAGE_BLOCKS: u32 = DATA_START_BLK + 4;

pub fn new_image() -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create scratch image file");
    f.write_all(&vec![0u8; IMAGE_BLOCKS as usize * BLOCK_SIZE])
        .expect("extend scratch image to full size");
    f.flush().expect("flush scratch image");
    f
}

/// Open `path` and seed it with a root directory at inode 0, empty, with its
/// single data block at `DATA_START_BLK`.
pub fn open_seeded(path: &std::path::Path) -> BlockDevice {
    let mut dev = BlockDevice::open(path).expect("open scratch image");

    let mut bitmap = [0u8; BLOCK_SIZE];
    bitmap[0] = 0x01; // inode 0 (root) allocated
    dev.write_block(INODE_BMAP_BLK, &bitmap).unwrap();

    let mut table0 = [0u8; BLOCK_SIZE];
    let root = Inode {
        kind: INODE_TYPE_DIR,
        links: 2,
        // Two reserved (but unwritten) slots for "." and "..", as a real
        // mkfs would leave them; `create` never populates slots 0/1 itself.
        size: 64,
        direct: [DATA_START_BLK, 0, 0, 0, 0, 0, 0, 0],
        ctime: 1,
        mtime: 1,
    };
    root.write_slot(&mut table0, 0);
    dev.write_block(INODE_TABLE_BLK, &table0).unwrap();
    dev.write_block(INODE_TABLE_BLK + 1, &[0u8; BLOCK_SIZE]).unwrap();
    dev.write_block(DATA_START_BLK, &[0u8; BLOCK_SIZE]).unwrap();

    dev
}
