// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The byte-offset-to-block traversal and the `read`/`write`/
//! `truncate` algorithms built on top of it.
//!
//! The traversal walks the chain block by block, copying the
//! overlapping span at each hop and advancing. `write` preserves
//! `byte_in_block` across a mid-write chain extension (it only resets
//! once a block is fully consumed) and, on partial allocation failure,
//! commits the file's size to exactly the prefix that was actually
//! written rather than the originally intended size.

use crate::dir::DirSlot;
use crate::fat::{Fat, FatEntry};
use crate::layout::{BLOCK_SIZE, DATA_BLOCKS, DATA_START};
use crate::result::Result;

/// Returns the data-block index `hops` links past `first`, or `None`
/// if the chain ends (hits `Nil`) before that many hops.
fn block_at(fat: &Fat, first: u32, hops: u32) -> Option<u32> {
    let mut block = first;
    for _ in 0..hops {
        match fat.get(block) {
            FatEntry::Next(next) => block = next,
            FatEntry::Nil | FatEntry::Free => return None,
        }
    }
    Some(block)
}

pub(crate) fn read(
    device: &crate::device::BlockDevice,
    fat: &Fat,
    slot: &DirSlot,
    offset: u64,
    buf: &mut [u8],
) -> Result<usize> {
    let size = slot.size as u64;
    if offset >= size {
        return Ok(0);
    }
    let to_read = std::cmp::min(buf.len() as u64, size - offset) as usize;

    let block_offset = (offset / BLOCK_SIZE as u64) as u32;
    let mut byte_in_block = (offset % BLOCK_SIZE as u64) as usize;

    let Some(first_block) = slot.first_block else {
        return Ok(0);
    };
    let mut block = block_at(fat, first_block, block_offset);

    let mut read_so_far = 0usize;
    let mut block_buf = [0u8; BLOCK_SIZE];
    while read_so_far < to_read {
        let Some(b) = block else { break };
        device.read_block(DATA_START + b, &mut block_buf)?;

        let span = std::cmp::min(BLOCK_SIZE - byte_in_block, to_read - read_so_far);
        buf[read_so_far..read_so_far + span]
            .copy_from_slice(&block_buf[byte_in_block..byte_in_block + span]);
        read_so_far += span;
        byte_in_block = 0;

        block = match fat.get(b) {
            FatEntry::Next(next) => Some(next),
            FatEntry::Nil | FatEntry::Free => None,
        };
    }
    Ok(read_so_far)
}

/// Commits `size` (and bumps `modified`) after a write. Callers pass
/// the size that should actually be visible: the full run's
/// `max(old_size, offset + written)` on success, or the bare
/// `offset + written` prefix when allocation ran out partway through,
/// so a short write never reports more bytes committed than were
/// actually copied to the chain.
fn commit(slot: &mut DirSlot, size: u64, now: u32) {
    slot.size = size as u32;
    slot.modified = now;
}

pub(crate) fn write(
    device: &crate::device::BlockDevice,
    fat: &mut Fat,
    slot: &mut DirSlot,
    offset: u64,
    buf: &[u8],
    now: u32,
) -> Result<usize> {
    let cap = DATA_BLOCKS as u64 * BLOCK_SIZE as u64;
    let nbyte = if offset >= cap { 0 } else { std::cmp::min(buf.len() as u64, cap - offset) } as usize;

    let old_size = slot.size as u64;
    let intended_size = old_size.max(offset + nbyte as u64);

    if nbyte == 0 {
        // Nothing to write; size cannot shrink from a write, so leave
        // it as is (this also covers offset == cap exactly).
        return Ok(0);
    }

    if slot.first_block.is_none() {
        let head = match fat.allocate_chain_head() {
            Ok(b) => b,
            Err(_) => {
                commit(slot, offset, now);
                return Ok(0);
            }
        };
        slot.first_block = Some(head);
    }
    let first_block = slot.first_block.expect("just ensured above");

    let block_offset = (offset / BLOCK_SIZE as u64) as u32;
    // Computed once from `offset` and preserved through the walk and
    // the write loop below; a chain extension never resets it, only
    // fully consuming a block does.
    let mut byte_in_block = (offset % BLOCK_SIZE as u64) as usize;

    let mut block = first_block;
    for _ in 0..block_offset {
        block = match fat.get(block) {
            FatEntry::Next(next) => next,
            FatEntry::Nil => match fat.extend_chain(block) {
                Ok(b) => b,
                Err(_) => {
                    commit(slot, offset, now);
                    return Ok(0);
                }
            },
            FatEntry::Free => unreachable!("a live chain entry cannot be free"),
        };
    }

    let mut written = 0usize;
    let mut block_buf = [0u8; BLOCK_SIZE];
    loop {
        if written == nbyte {
            break;
        }
        let span = std::cmp::min(BLOCK_SIZE - byte_in_block, nbyte - written);

        if byte_in_block != 0 || span < BLOCK_SIZE {
            if device.read_block(DATA_START + block, &mut block_buf).is_err() {
                commit(slot, offset + written as u64, now);
                return Ok(written);
            }
        } else {
            block_buf = [0u8; BLOCK_SIZE];
        }
        block_buf[byte_in_block..byte_in_block + span]
            .copy_from_slice(&buf[written..written + span]);
        if device.write_block(DATA_START + block, &block_buf).is_err() {
            commit(slot, offset + written as u64, now);
            return Ok(written);
        }
        written += span;
        byte_in_block = 0;

        if written < nbyte {
            block = match fat.get(block) {
                FatEntry::Next(next) => next,
                FatEntry::Nil => match fat.extend_chain(block) {
                    Ok(b) => b,
                    Err(_) => {
                        commit(slot, offset + written as u64, now);
                        return Ok(written);
                    }
                },
                FatEntry::Free => unreachable!("a live chain entry cannot be free"),
            };
        }
    }

    commit(slot, intended_size, now);
    Ok(written)
}

pub(crate) fn truncate(fat: &mut Fat, slot: &mut DirSlot, length: u64, now: u32) -> Result<()> {
    let size = slot.size as u64;
    if length > size {
        return Err(crate::result::Error::BadOffset);
    }
    if length == size {
        return Ok(());
    }
    if length == 0 {
        if let Some(head) = slot.first_block.take() {
            fat.free_chain(head);
        }
        slot.size = 0;
        slot.modified = now;
        return Ok(());
    }

    let trunc_block = ((length - 1) / BLOCK_SIZE as u64) as u32;
    let first_block = slot.first_block.expect("size > 0 implies an allocated chain");
    let last_kept = block_at(fat, first_block, trunc_block)
        .expect("chain length matches ceil(size / BLOCK_SIZE)");
    fat.truncate_after(last_kept);
    slot.size = length as u32;
    slot.modified = now;
    Ok(())
}
