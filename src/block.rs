//! Positioned, exact-sized I/O over the image file.
//!
//! Mirrors `xtask/crate_rootfs`'s `FileBlockDev`: every operation seeks to an
//! absolute offset and uses `read_exact`/`write_all` so a short read or write
//! becomes an error instead of silently under-filling a buffer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{JournalError, JournalResult};
use crate::layout::BLOCK_SIZE;

/// A file-backed image, addressed in fixed 4096-byte blocks.
pub struct BlockDevice {
    file: File,
    path: PathBuf,
}

impl BlockDevice {
    pub fn open(path: impl AsRef<Path>) -> JournalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::options()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| JournalError::io(&path, e))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read exactly `BLOCK_SIZE` bytes from block `blk`.
    pub fn read_block(&mut self, blk: u32) -> JournalResult<[u8; BLOCK_SIZE]> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.read_at(blk as u64 * BLOCK_SIZE as u64, &mut buf)?;
        Ok(buf)
    }

    /// Write exactly `BLOCK_SIZE` bytes to block `blk`.
    pub fn write_block(&mut self, blk: u32, image: &[u8; BLOCK_SIZE]) -> JournalResult<()> {
        self.write_at(blk as u64 * BLOCK_SIZE as u64, image)
    }

    /// Byte-granular positioned read, used by the record codec and journal header.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> JournalResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| JournalError::io(&self.path, e))?;
        self.file
            .read_exact(buf)
            .map_err(|e| JournalError::io(&self.path, e))
    }

    /// Byte-granular positioned write, used by the record codec and journal header.
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> JournalResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| JournalError::io(&self.path, e))?;
        self.file
            .write_all(buf)
            .map_err(|e| JournalError::io(&self.path, e))
    }
}
