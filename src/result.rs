// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

/// Every way a block file system operation can fail.
///
/// The C-shaped facade in [`crate::capi`] collapses all of these to a
/// single negative sentinel; callers going through the idiomatic
/// [`crate::FileSystem`] API see the distinction.
pub enum Error {
    /// A file operation was attempted while no device was mounted.
    NotMounted,
    /// `make`/`mount` was called while a device was already open.
    AlreadyMounted,
    /// The superblock's magic number did not match.
    BadMagic,
    /// No directory entry with the given name exists.
    NoSuchFile,
    /// `create` was called with a name already in use.
    DuplicateName,
    /// A file name exceeded `MAX_FILE_NAME` bytes.
    NameTooLong,
    /// All directory slots are in use.
    DirectoryFull,
    /// `delete` was called on a file with at least one open handle.
    FileBusy,
    /// All file descriptor slots are in use.
    FdTableFull,
    /// A file descriptor was out of range or not open.
    BadFd,
    /// The FAT has no free blocks left to allocate.
    NoSpace,
    /// `lseek` was asked for an offset outside `[0, size]`, or
    /// `truncate` was asked for a length outside `[0, size]`.
    BadOffset,
    /// The underlying host file I/O failed, carrying the source error
    /// so callers and tests can distinguish a host I/O failure from a
    /// logical one instead of matching on a bare marker.
    Io(std::io::Error),
}

impl Error {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NotMounted => "no file system is currently mounted",
            Self::AlreadyMounted => "a file system is already mounted",
            Self::BadMagic => "bad magic number in superblock",
            Self::NoSuchFile => "no such file",
            Self::DuplicateName => "a file with that name already exists",
            Self::NameTooLong => "file name too long",
            Self::DirectoryFull => "directory is full",
            Self::FileBusy => "file is open and cannot be deleted",
            Self::FdTableFull => "too many open files",
            Self::BadFd => "bad file descriptor",
            Self::NoSpace => "no space left on device",
            Self::BadOffset => "offset out of range",
            Self::Io(_) => "device I/O error",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{}: {e}", self.as_str()),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{}: {e}", self.as_str()),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
