// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A C-shaped compatibility facade over [`crate::FileSystem`]: free
//! functions taking plain names/descriptors and returning a single
//! negative sentinel on failure, holding the one permitted mounted
//! volume behind a process-wide `Mutex<Option<FileSystem>>`.
//!
//! A single mutable value threaded through otherwise-stateless command
//! entry points, here made a lazily-initialized global instead of a
//! value passed down from `main`.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::{Mutex, OnceLock};

use crate::mount::FileSystem;

fn global() -> &'static Mutex<Option<FileSystem>> {
    static MOUNT: OnceLock<Mutex<Option<FileSystem>>> = OnceLock::new();
    MOUNT.get_or_init(|| Mutex::new(None))
}

/// Reads a NUL-terminated C string; returns `None` if `ptr` is null
/// or not valid UTF-8.
///
/// # Safety
/// `ptr` must either be null or point at a valid, NUL-terminated
/// byte string that the caller guarantees remains valid for the
/// duration of this call.
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok() }
}

/// Creates a new, empty volume at `name`. Returns `0` on success, `-1`
/// on failure, including when a volume is already mounted (the device
/// is a process-wide singleton, so formatting over a mounted volume's
/// backing file is never allowed).
///
/// # Safety
/// `name` must be a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn make_fs(name: *const c_char) -> i32 {
    let Some(name) = (unsafe { c_str(name) }) else { return -1 };
    let slot = global().lock().unwrap();
    if slot.is_some() {
        return -1;
    }
    drop(slot);
    match FileSystem::format(name) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Mounts the volume at `name` as the process's single active mount.
/// Returns `0` on success, `-1` on failure (including "already
/// mounted").
///
/// # Safety
/// `name` must be a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mount_fs(name: *const c_char) -> i32 {
    let Some(name) = (unsafe { c_str(name) }) else { return -1 };
    let mut slot = global().lock().unwrap();
    if slot.is_some() {
        return -1;
    }
    match FileSystem::mount(name) {
        Ok(fs) => {
            *slot = Some(fs);
            0
        }
        Err(_) => -1,
    }
}

/// Unmounts the active volume. `name` is accepted for symmetry with
/// `mount_fs` but not otherwise consulted. Returns `0` on success,
/// `-1` if nothing is mounted or the flush fails.
///
/// # Safety
/// `name` must be a valid, NUL-terminated C string, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn umount_fs(_name: *const c_char) -> i32 {
    let mut slot = global().lock().unwrap();
    match slot.take() {
        Some(fs) => match fs.unmount() {
            Ok(()) => 0,
            Err(_) => -1,
        },
        None => -1,
    }
}

/// Runs `f` against the active mount, returning `-1` if nothing is
/// mounted. `T` is always a type that fits the non-negative-on-success
/// convention when cast to `i64`.
fn with_mount<T>(f: impl FnOnce(&mut FileSystem) -> crate::result::Result<T>) -> i64
where
    T: TryInto<i64>,
{
    let mut slot = global().lock().unwrap();
    match slot.as_mut() {
        Some(fs) => match f(fs) {
            Ok(v) => v.try_into().unwrap_or(-1),
            Err(_) => -1,
        },
        None => -1,
    }
}

/// # Safety
/// `name` must be a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_create(name: *const c_char) -> i32 {
    let Some(name) = (unsafe { c_str(name) }) else { return -1 };
    with_mount(|fs| fs.create(name.as_bytes()).map(|()| 0i64)) as i32
}

/// # Safety
/// `name` must be a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_delete(name: *const c_char) -> i32 {
    let Some(name) = (unsafe { c_str(name) }) else { return -1 };
    with_mount(|fs| fs.delete(name.as_bytes()).map(|()| 0i64)) as i32
}

/// Returns a non-negative descriptor id on success, `-1` on failure.
///
/// # Safety
/// `name` must be a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_open(name: *const c_char) -> i32 {
    let Some(name) = (unsafe { c_str(name) }) else { return -1 };
    with_mount(|fs| fs.open(name.as_bytes()).map(|fd| fd as i64)) as i32
}

#[unsafe(no_mangle)]
pub extern "C" fn fs_close(fd: i32) -> i32 {
    if fd < 0 {
        return -1;
    }
    with_mount(|fs| fs.close(fd as usize).map(|()| 0i64)) as i32
}

/// Reads up to `n` bytes into `buf`. Returns the number of bytes
/// read, or `-1` on failure.
///
/// # Safety
/// `buf` must be valid for writes of at least `n` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_read(fd: i32, buf: *mut u8, n: usize) -> i64 {
    if fd < 0 || buf.is_null() {
        return -1;
    }
    let slice = unsafe { std::slice::from_raw_parts_mut(buf, n) };
    with_mount(|fs| fs.read(fd as usize, slice).map(|r| r as i64))
}

/// Writes up to `n` bytes from `buf`. Returns the number of bytes
/// written, or `-1` on failure.
///
/// # Safety
/// `buf` must be valid for reads of at least `n` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fs_write(fd: i32, buf: *const u8, n: usize) -> i64 {
    if fd < 0 || buf.is_null() {
        return -1;
    }
    let slice = unsafe { std::slice::from_raw_parts(buf, n) };
    with_mount(|fs| fs.write(fd as usize, slice).map(|w| w as i64))
}

#[unsafe(no_mangle)]
pub extern "C" fn fs_get_filesize(fd: i32) -> i64 {
    if fd < 0 {
        return -1;
    }
    with_mount(|fs| fs.get_filesize(fd as usize).map(|s| s as i64))
}

#[unsafe(no_mangle)]
pub extern "C" fn fs_lseek(fd: i32, offset: i64) -> i64 {
    if fd < 0 || offset < 0 {
        return -1;
    }
    with_mount(|fs| fs.lseek(fd as usize, offset as u64).map(|o| o as i64))
}

#[unsafe(no_mangle)]
pub extern "C" fn fs_truncate(fd: i32, length: i64) -> i32 {
    if fd < 0 || length < 0 {
        return -1;
    }
    with_mount(|fs| fs.truncate(fd as usize, length as u64).map(|()| 0i64)) as i32
}
