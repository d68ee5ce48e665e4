// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A fixed-capacity block device backed by a host file.
//!
//! The backing store is a host file opened through positioned reads
//! and writes (`FileExt::read_at` / `write_at`) rather than a borrowed
//! byte slice, since the volume outlives any one process and must be
//! reopened across mount cycles.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::layout::{BLOCK_SIZE, NUM_BLOCKS};
use crate::result::{Error, Result};

/// Exactly one of these may be open at a time: the process as a whole
/// has at most one active device.
pub(crate) struct BlockDevice {
    file: Option<File>,
}

impl BlockDevice {
    pub(crate) fn new() -> BlockDevice {
        BlockDevice { file: None }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Creates a new host file of exactly `NUM_BLOCKS * BLOCK_SIZE`
    /// zero bytes, then closes it again. Fails if a device is already
    /// open.
    pub(crate) fn make(&mut self, path: &Path) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyMounted);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((NUM_BLOCKS * BLOCK_SIZE) as u64)?;
        let zero = [0u8; BLOCK_SIZE];
        for i in 0..NUM_BLOCKS {
            file.write_at(&zero, (i * BLOCK_SIZE) as u64)?;
        }
        Ok(())
    }

    /// Attaches to an existing host file. Fails if a device is already
    /// open.
    pub(crate) fn open(&mut self, path: &Path) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyMounted);
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        self.file = Some(file);
        Ok(())
    }

    /// Detaches from the host file.
    pub(crate) fn close(&mut self) {
        self.file = None;
    }

    /// Reads one full block at index `index` into `buf`.
    pub(crate) fn read_block(&self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        let file = self.file.as_ref().ok_or(Error::NotMounted)?;
        if index as usize >= NUM_BLOCKS {
            return Err(Error::BadOffset);
        }
        let n = file.read_at(buf, index as u64 * BLOCK_SIZE as u64)?;
        if n != BLOCK_SIZE {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read: got {n} of {BLOCK_SIZE} bytes"),
            )));
        }
        Ok(())
    }

    /// Writes one full block at index `index` from `buf`.
    pub(crate) fn write_block(&self, index: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        let file = self.file.as_ref().ok_or(Error::NotMounted)?;
        if index as usize >= NUM_BLOCKS {
            return Err(Error::BadOffset);
        }
        file.write_at(buf, index as u64 * BLOCK_SIZE as u64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("blockfs-device-test-{name}-{}", std::process::id()));
        p
    }

    #[test]
    fn make_then_open_round_trips_a_block() {
        let path = temp_path("roundtrip");
        let mut dev = BlockDevice::new();
        dev.make(&path).unwrap();
        dev.open(&path).unwrap();

        let mut buf = [0xABu8; BLOCK_SIZE];
        dev.write_block(3, &buf).unwrap();
        let mut readback = [0u8; BLOCK_SIZE];
        dev.read_block(3, &mut readback).unwrap();
        assert_eq!(buf, readback);

        // Other blocks remain zeroed.
        dev.read_block(4, &mut buf).unwrap();
        assert_eq!(buf, [0u8; BLOCK_SIZE]);

        dev.close();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_twice_fails() {
        let path = temp_path("opentwice");
        let mut dev = BlockDevice::new();
        dev.make(&path).unwrap();
        dev.open(&path).unwrap();
        assert!(matches!(dev.open(&path), Err(Error::AlreadyMounted)));
        dev.close();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn read_out_of_range_fails() {
        let path = temp_path("outofrange");
        let mut dev = BlockDevice::new();
        dev.make(&path).unwrap();
        dev.open(&path).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(matches!(dev.read_block(NUM_BLOCKS as u32, &mut buf), Err(Error::BadOffset)));
        dev.close();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn ops_on_closed_device_fail() {
        let dev = BlockDevice::new();
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(matches!(dev.read_block(0, &mut buf), Err(Error::NotMounted)));
    }
}
