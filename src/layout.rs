// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk layout: block geometry, region offsets, and the structures
//! that are read and written verbatim as block-sized byte buffers.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert;

/// Size of a single block, in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Total number of blocks on the device, including metadata regions.
pub const NUM_BLOCKS: usize = 8192;

/// Number of blocks available for file data.
pub const DATA_BLOCKS: usize = 4096;

/// Maximum number of files the directory can hold at once.
pub const MAX_FILES: usize = 64;

/// Maximum length of a file name, not counting the NUL terminator.
pub const MAX_FILE_NAME: usize = 15;

/// Maximum number of simultaneously open file descriptors.
pub const MAX_FD: usize = 32;

/// Magic number identifying a formatted volume ("FSFS").
pub const MAGIC: u32 = 0x4653_4653;

/// Sentinel FAT/block index meaning "no block" or "end of chain".
pub const NIL: u32 = 0xFFFF_FFFF;

/// Block index of the superblock.
pub const SUPERBLOCK_BLOCK: u32 = 0;

/// First block of the FAT region.
pub const FAT_START: u32 = 1;

/// Number of blocks occupied by the FAT region.
pub const FAT_BLOCKS: u32 = 4;

/// First block of the directory region.
pub const DIR_START: u32 = FAT_START + FAT_BLOCKS;

/// Number of blocks occupied by the directory region.
pub const DIR_BLOCKS: u32 = 1;

/// First block of the data region. Data block `k` lives at disk block
/// `DATA_START + k`.
pub const DATA_START: u32 = DIR_START + DIR_BLOCKS;

const_assert!(DATA_START as usize + DATA_BLOCKS <= NUM_BLOCKS);

/// Number of FAT entries that fit in one block.
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / core::mem::size_of::<u32>();

const_assert!(FAT_BLOCKS as usize * FAT_ENTRIES_PER_BLOCK >= DATA_BLOCKS);

/// The persisted, singleton volume header.
///
/// Read and written as the first `size_of::<Superblock>()` bytes of
/// block 0; the remainder of that block is unused.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Superblock {
    pub magic: u32,
    pub fat_start: u32,
    pub fat_blocks: u32,
    pub dir_start: u32,
    pub dir_blocks: u32,
    pub data_start: u32,
    pub free_blocks: u32,
    pub created: u32,
    pub last_mounted: u32,
}

const_assert!(core::mem::size_of::<Superblock>() <= BLOCK_SIZE);

impl Superblock {
    pub fn new(created: u32) -> Superblock {
        Superblock {
            magic: MAGIC,
            fat_start: FAT_START,
            fat_blocks: FAT_BLOCKS,
            dir_start: DIR_START,
            dir_blocks: DIR_BLOCKS,
            data_start: DATA_START,
            free_blocks: DATA_BLOCKS as u32,
            created,
            last_mounted: created,
        }
    }
}

/// The persisted, fixed-size representation of one directory slot.
///
/// `MAX_FILES` of these live back-to-back starting at `DIR_START`;
/// the directory region (`DIR_BLOCKS` blocks) holds more slots than
/// that in principle, but only the first `MAX_FILES` are meaningful.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct RawDirEntry {
    pub name: [u8; MAX_FILE_NAME + 1],
    pub size: u32,
    pub first_block: u32,
    pub created: u32,
    pub modified: u32,
    pub used: u8,
    pub(crate) _pad: [u8; 3],
}

const_assert!(core::mem::size_of::<RawDirEntry>() <= 64);
const_assert!(
    MAX_FILES * core::mem::size_of::<RawDirEntry>() <= DIR_BLOCKS as usize * BLOCK_SIZE
);

impl RawDirEntry {
    pub const EMPTY: RawDirEntry = RawDirEntry {
        name: [0; MAX_FILE_NAME + 1],
        size: 0,
        first_block: NIL,
        created: 0,
        modified: 0,
        used: 0,
        _pad: [0; 3],
    };
}

/// Number of directory slots that fit in one block.
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / core::mem::size_of::<RawDirEntry>();

const_assert!(DIR_BLOCKS as usize * DIR_ENTRIES_PER_BLOCK >= MAX_FILES);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock_round_trips_through_bytes() {
        let sb = Superblock::new(42);
        let bytes = bytemuck::bytes_of(&sb);
        let back: Superblock = *bytemuck::from_bytes(bytes);
        assert_eq!(back.magic, MAGIC);
        assert_eq!(back.created, 42);
        assert_eq!(back.free_blocks, DATA_BLOCKS as u32);
    }

    #[test]
    fn dir_entry_default_is_free_with_nil_head() {
        let e = RawDirEntry::EMPTY;
        assert_eq!(e.used, 0);
        assert_eq!(e.first_block, NIL);
    }
}
