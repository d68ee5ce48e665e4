// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A user-space, single-volume FAT-chain file system over a
//! fixed-size block device.
//!
//! Files are flat (no subdirectories), named by short strings, and
//! stored as chains of fixed-size blocks tracked by a File Allocation
//! Table. [`FileSystem`] is the idiomatic entry point; [`capi`] is a
//! thin C-ABI compatibility facade over a single process-wide mount.

mod device;
mod dir;
mod fat;
mod file;
mod handle;
mod layout;
mod mount;
mod result;

pub mod capi;

pub use layout::{
    BLOCK_SIZE, DATA_BLOCKS, MAGIC, MAX_FD, MAX_FILES, MAX_FILE_NAME, NIL, NUM_BLOCKS,
};
pub use mount::FileSystem;
pub use result::{Error, Result};
