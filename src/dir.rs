// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The flat directory table: `MAX_FILES` fixed slots, each naming a
//! file and pointing at the head of its FAT chain.
//!
//! A typed wrapper over on-disk directory records with name-based
//! lookup, using a fixed-size slot array rather than variable-length
//! directory blocks.

use crate::layout::{RawDirEntry, MAX_FILES, MAX_FILE_NAME, NIL};
use crate::result::{Error, Result};

/// One in-memory directory slot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DirSlot {
    pub used: bool,
    name: [u8; MAX_FILE_NAME + 1],
    pub size: u32,
    pub first_block: Option<u32>,
    pub created: u32,
    pub modified: u32,
}

impl DirSlot {
    const EMPTY: DirSlot = DirSlot {
        used: false,
        name: [0; MAX_FILE_NAME + 1],
        size: 0,
        first_block: None,
        created: 0,
        modified: 0,
    };

    /// Returns the name as stored, up to (not including) its NUL
    /// terminator.
    pub(crate) fn name(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        &self.name[..end]
    }

    fn from_raw(raw: &RawDirEntry) -> DirSlot {
        if raw.used == 0 {
            return DirSlot::EMPTY;
        }
        DirSlot {
            used: true,
            name: raw.name,
            size: raw.size,
            first_block: if raw.first_block == NIL { None } else { Some(raw.first_block) },
            created: raw.created,
            modified: raw.modified,
        }
    }

    fn to_raw(self) -> RawDirEntry {
        if !self.used {
            return RawDirEntry::EMPTY;
        }
        RawDirEntry {
            name: self.name,
            size: self.size,
            first_block: self.first_block.unwrap_or(NIL),
            created: self.created,
            modified: self.modified,
            used: 1,
            ..RawDirEntry::EMPTY
        }
    }
}

/// The in-memory directory table.
pub(crate) struct Directory {
    slots: [DirSlot; MAX_FILES],
}

impl Directory {
    pub(crate) fn zeroed() -> Directory {
        Directory { slots: [DirSlot::EMPTY; MAX_FILES] }
    }

    pub(crate) fn from_raw(raw: &[RawDirEntry]) -> Directory {
        let mut slots = [DirSlot::EMPTY; MAX_FILES];
        for (slot, entry) in slots.iter_mut().zip(raw.iter()) {
            *slot = DirSlot::from_raw(entry);
        }
        Directory { slots }
    }

    pub(crate) fn to_raw(&self, out: &mut [RawDirEntry]) {
        for (entry, slot) in out.iter_mut().zip(self.slots.iter()) {
            *entry = slot.to_raw();
        }
    }

    pub(crate) fn get(&self, index: usize) -> &DirSlot {
        &self.slots[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut DirSlot {
        &mut self.slots[index]
    }

    /// Byte-exact name comparison over used entries: no case folding,
    /// no prefix matching.
    pub(crate) fn find_by_name(&self, name: &[u8]) -> Option<usize> {
        self.slots.iter().position(|s| s.used && s.name() == name)
    }

    pub(crate) fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.used)
    }

    /// Validates and claims a free slot for a new, empty file.
    pub(crate) fn occupy(&mut self, slot: usize, name: &[u8], created: u32) -> Result<()> {
        if name.is_empty() || name.len() > MAX_FILE_NAME {
            return Err(Error::NameTooLong);
        }
        let mut stored = [0u8; MAX_FILE_NAME + 1];
        stored[..name.len()].copy_from_slice(name);
        self.slots[slot] = DirSlot {
            used: true,
            name: stored,
            size: 0,
            first_block: None,
            created,
            modified: created,
        };
        Ok(())
    }

    pub(crate) fn free(&mut self, slot: usize) {
        self.slots[slot] = DirSlot::EMPTY;
    }
}
