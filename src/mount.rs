// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mount lifecycle and the [`FileSystem`] type that ties the
//! device, FAT, directory, and handle table together: a single owning
//! value constructed by a `mount` call and threaded through every
//! subsequent operation, rather than scattered global statics.

use std::mem::size_of;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::device::BlockDevice;
use crate::dir::Directory;
use crate::fat::Fat;
use crate::handle::HandleTable;
use crate::layout::{
    RawDirEntry, Superblock, BLOCK_SIZE, DATA_BLOCKS, DIR_START, FAT_BLOCKS,
    FAT_ENTRIES_PER_BLOCK, FAT_START, MAGIC, MAX_FILES, SUPERBLOCK_BLOCK,
};
use crate::result::{Error, Result};

fn now() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0)
}

fn read_superblock(device: &BlockDevice) -> Result<Superblock> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(SUPERBLOCK_BLOCK, &mut buf)?;
    Ok(*bytemuck::from_bytes(&buf[..size_of::<Superblock>()]))
}

fn write_superblock(device: &BlockDevice, sb: &Superblock) -> Result<()> {
    let mut buf = [0u8; BLOCK_SIZE];
    buf[..size_of::<Superblock>()].copy_from_slice(bytemuck::bytes_of(sb));
    device.write_block(SUPERBLOCK_BLOCK, &buf)
}

fn read_fat(device: &BlockDevice) -> Result<Vec<u32>> {
    let mut raw = vec![0u32; DATA_BLOCKS];
    for i in 0..FAT_BLOCKS {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(FAT_START + i, &mut buf)?;
        let entries: &[u32] = bytemuck::cast_slice(&buf);
        let start = i as usize * FAT_ENTRIES_PER_BLOCK;
        raw[start..start + FAT_ENTRIES_PER_BLOCK].copy_from_slice(&entries[..FAT_ENTRIES_PER_BLOCK]);
    }
    Ok(raw)
}

fn write_fat(device: &BlockDevice, fat: &Fat) -> Result<()> {
    let mut raw = vec![0u32; DATA_BLOCKS];
    fat.to_raw(&mut raw);
    for i in 0..FAT_BLOCKS {
        let start = i as usize * FAT_ENTRIES_PER_BLOCK;
        let mut buf = [0u8; BLOCK_SIZE];
        let bytes: &[u8] = bytemuck::cast_slice(&raw[start..start + FAT_ENTRIES_PER_BLOCK]);
        buf[..bytes.len()].copy_from_slice(bytes);
        device.write_block(FAT_START + i, &buf)?;
    }
    Ok(())
}

fn read_dir(device: &BlockDevice) -> Result<Directory> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(DIR_START, &mut buf)?;
    // `BLOCK_SIZE` isn't an exact multiple of `size_of::<RawDirEntry>()`,
    // so only the byte range actually holding `MAX_FILES` entries may be
    // reinterpreted; `cast_slice` requires an exact length match.
    let entry_bytes = MAX_FILES * size_of::<RawDirEntry>();
    let entries: &[RawDirEntry] = bytemuck::cast_slice(&buf[..entry_bytes]);
    Ok(Directory::from_raw(entries))
}

fn write_dir(device: &BlockDevice, dir: &Directory) -> Result<()> {
    let mut raw = vec![RawDirEntry::EMPTY; MAX_FILES];
    dir.to_raw(&mut raw);
    let mut buf = [0u8; BLOCK_SIZE];
    let bytes: &[u8] = bytemuck::cast_slice(raw.as_slice());
    buf[..bytes.len()].copy_from_slice(bytes);
    device.write_block(DIR_START, &buf)
}

/// A mounted volume. Owns the open device and the in-memory FAT,
/// directory, and file-descriptor caches for as long as it lives.
///
/// There is at most one of these alive at a time in a well-behaved
/// process; `capi` enforces that globally by holding one behind a
/// `Mutex<Option<FileSystem>>`, but nothing in this type itself
/// prevents a caller from mounting the same file twice through two
/// independent `FileSystem` values.
pub struct FileSystem {
    device: BlockDevice,
    sb: Superblock,
    fat: Fat,
    dir: Directory,
    handles: HandleTable,
}

impl FileSystem {
    /// Creates a new, empty volume at `path`: a zeroed host file of
    /// exactly `NUM_BLOCKS * BLOCK_SIZE` bytes with a fresh
    /// superblock, FAT, and directory written to it. Leaves the
    /// volume unmounted.
    pub fn format<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let mut device = BlockDevice::new();
        device.make(path)?;
        device.open(path)?;

        let created = now();
        write_superblock(&device, &Superblock::new(created))?;
        write_fat(&device, &Fat::zeroed())?;
        write_dir(&device, &Directory::zeroed())?;

        device.close();
        log::info!("formatted volume at {}", path.display());
        Ok(())
    }

    /// Opens an existing volume at `path`, reading its superblock,
    /// FAT, and directory into memory. Fails with `Error::BadMagic`
    /// if the volume was never formatted.
    pub fn mount<P: AsRef<Path>>(path: P) -> Result<FileSystem> {
        let path = path.as_ref();
        let mut device = BlockDevice::new();
        device.open(path)?;

        let mut sb = match read_superblock(&device) {
            Ok(sb) => sb,
            Err(e) => {
                device.close();
                return Err(e);
            }
        };
        if sb.magic != MAGIC {
            device.close();
            return Err(Error::BadMagic);
        }

        let raw_fat = match read_fat(&device) {
            Ok(raw) => raw,
            Err(e) => {
                device.close();
                return Err(e);
            }
        };
        let fat = Fat::from_raw(&raw_fat, sb.free_blocks);

        let dir = match read_dir(&device) {
            Ok(d) => d,
            Err(e) => {
                device.close();
                return Err(e);
            }
        };

        sb.last_mounted = now();
        write_superblock(&device, &sb)?;

        log::info!("mounted volume at {}", path.display());
        Ok(FileSystem { device, sb, fat, dir, handles: HandleTable::new() })
    }

    /// Releases every open handle, flushes metadata, and closes the
    /// device. Consumes the `FileSystem`; there is no mounted state
    /// to return to without calling `mount` again.
    pub fn unmount(mut self) -> Result<()> {
        self.handles.release_all();
        self.flush_metadata()?;
        self.device.close();
        log::info!("unmounted volume");
        Ok(())
    }

    fn flush_metadata(&mut self) -> Result<()> {
        self.sb.free_blocks = self.fat.free_blocks();
        write_fat(&self.device, &self.fat)?;
        write_dir(&self.device, &self.dir)?;
        write_superblock(&self.device, &self.sb)?;
        Ok(())
    }

    pub fn create(&mut self, name: &[u8]) -> Result<()> {
        if self.dir.find_by_name(name).is_some() {
            return Err(Error::DuplicateName);
        }
        let slot = self.dir.find_free_slot().ok_or(Error::DirectoryFull)?;
        self.dir.occupy(slot, name, now())?;
        self.flush_metadata()?;
        Ok(())
    }

    pub fn delete(&mut self, name: &[u8]) -> Result<()> {
        let slot = self.dir.find_by_name(name).ok_or(Error::NoSuchFile)?;
        if self.handles.is_slot_open(slot) {
            log::warn!("delete of an open file rejected");
            return Err(Error::FileBusy);
        }
        if let Some(head) = self.dir.get(slot).first_block {
            self.fat.free_chain(head);
        }
        self.dir.free(slot);
        self.flush_metadata()?;
        Ok(())
    }

    /// Opens a fresh handle onto `name`, positioned at offset 0.
    pub fn open(&mut self, name: &[u8]) -> Result<usize> {
        let slot = self.dir.find_by_name(name).ok_or(Error::NoSuchFile)?;
        self.handles.alloc(slot)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.handles.release(fd)
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        let handle = *self.handles.get(fd)?;
        let slot = self.dir.get(handle.dir_slot);
        let n = crate::file::read(&self.device, &self.fat, slot, handle.offset, buf)?;
        self.handles.get_mut(fd)?.offset += n as u64;
        Ok(n)
    }

    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize> {
        let handle = *self.handles.get(fd)?;
        let when = now();
        let n = {
            let slot = self.dir.get_mut(handle.dir_slot);
            crate::file::write(&self.device, &mut self.fat, slot, handle.offset, buf, when)?
        };
        self.handles.get_mut(fd)?.offset += n as u64;
        if n < buf.len() {
            log::warn!("short write: {} of {} bytes (fd {fd})", n, buf.len());
        }
        self.flush_metadata()?;
        Ok(n)
    }

    pub fn truncate(&mut self, fd: usize, length: u64) -> Result<()> {
        let handle = *self.handles.get(fd)?;
        let when = now();
        {
            let slot = self.dir.get_mut(handle.dir_slot);
            crate::file::truncate(&mut self.fat, slot, length, when)?;
        }
        let h = self.handles.get_mut(fd)?;
        if h.offset > length {
            h.offset = length;
        }
        self.flush_metadata()?;
        Ok(())
    }

    pub fn lseek(&mut self, fd: usize, offset: u64) -> Result<u64> {
        let handle = *self.handles.get(fd)?;
        let size = self.dir.get(handle.dir_slot).size as u64;
        if offset > size {
            return Err(Error::BadOffset);
        }
        self.handles.get_mut(fd)?.offset = offset;
        Ok(offset)
    }

    pub fn get_filesize(&self, fd: usize) -> Result<u64> {
        let handle = self.handles.get(fd)?;
        Ok(self.dir.get(handle.dir_slot).size as u64)
    }
}
