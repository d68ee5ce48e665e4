// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios driving the public API the way a client
//! program would: format, mount, a sequence of file operations,
//! unmount. Each test gets its own temp-file-backed volume so tests
//! never share on-disk state.

use blockfs::{Error, FileSystem, BLOCK_SIZE, DATA_BLOCKS, MAX_FD, MAX_FILES};

fn fresh_volume() -> (tempfile::TempPath, FileSystem) {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    FileSystem::format(&path).unwrap();
    let fs = FileSystem::mount(&path).unwrap();
    (path, fs)
}

#[test]
fn s1_create_write_read() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();

    let fd = fs.open(b"a").unwrap();
    assert_eq!(fd, 0);
    let payload = b"Hello, File System!\0";
    assert_eq!(fs.write(fd, payload).unwrap(), payload.len());
    fs.close(fd).unwrap();

    let fd = fs.open(b"a").unwrap();
    assert_eq!(fd, 0);
    let mut buf = [0u8; 100];
    let n = fs.read(fd, &mut buf).unwrap();
    assert_eq!(n, payload.len());
    assert_eq!(&buf[..n], payload);
}

#[test]
fn s2_truncate() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    fs.write(fd, b"Hello, File System!\0").unwrap();

    fs.lseek(fd, 0).unwrap();
    fs.truncate(fd, 5).unwrap();
    fs.lseek(fd, 0).unwrap();

    let mut buf = [0u8; 20];
    let n = fs.read(fd, &mut buf).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf[..5], b"Hello");
}

#[test]
fn s3_no_space() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"big").unwrap();
    let fd = fs.open(b"big").unwrap();

    let cap = DATA_BLOCKS * BLOCK_SIZE;
    let payload = vec![0xAAu8; cap];
    assert_eq!(fs.write(fd, &payload).unwrap(), cap);

    assert_eq!(fs.write(fd, b"x").unwrap(), 0);
}

#[test]
fn s4_delete_frees_blocks() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    fs.write(fd, &vec![1u8; 10_000]).unwrap();
    fs.close(fd).unwrap();

    fs.delete(b"a").unwrap();

    fs.create(b"b").unwrap();
    let fd = fs.open(b"b").unwrap();
    assert_eq!(fs.write(fd, &vec![2u8; DATA_BLOCKS * BLOCK_SIZE]).unwrap(), DATA_BLOCKS * BLOCK_SIZE);
}

#[test]
fn s5_persistence_across_unmount() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    FileSystem::format(&path).unwrap();

    let mut fs = FileSystem::mount(&path).unwrap();
    fs.create(b"p").unwrap();
    let fd = fs.open(b"p").unwrap();
    fs.write(fd, b"abc").unwrap();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(&path).unwrap();
    let fd = fs.open(b"p").unwrap();
    assert_eq!(fs.get_filesize(fd).unwrap(), 3);
    let mut buf = [0u8; 3];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf, b"abc");
}

#[test]
fn s6_busy_delete() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"x").unwrap();
    let fd = fs.open(b"x").unwrap();

    assert!(matches!(fs.delete(b"x"), Err(Error::FileBusy)));

    fs.close(fd).unwrap();
    fs.delete(b"x").unwrap();
}

#[test]
fn writing_exactly_one_block_allocates_exactly_one_block() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    let n = fs.write(fd, &vec![7u8; BLOCK_SIZE]).unwrap();
    assert_eq!(n, BLOCK_SIZE);
    assert_eq!(fs.get_filesize(fd).unwrap(), BLOCK_SIZE as u64);
}

#[test]
fn full_volume_write_then_next_file_gets_no_space() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    let cap = DATA_BLOCKS * BLOCK_SIZE;
    assert_eq!(fs.write(fd, &vec![1u8; cap]).unwrap(), cap);

    fs.create(b"b").unwrap();
    let fd_b = fs.open(b"b").unwrap();
    assert_eq!(fs.write(fd_b, b"x").unwrap(), 0);
}

#[test]
fn max_files_plus_one_create_fails() {
    let (_path, mut fs) = fresh_volume();
    for i in 0..MAX_FILES {
        fs.create(format!("f{i}").as_bytes()).unwrap();
    }
    assert!(matches!(fs.create(b"one-too-many"), Err(Error::DirectoryFull)));
}

#[test]
fn max_fd_plus_one_open_fails() {
    let (_path, mut fs) = fresh_volume();
    for i in 0..MAX_FD {
        fs.create(format!("f{i}").as_bytes()).unwrap();
        fs.open(format!("f{i}").as_bytes()).unwrap();
    }
    fs.create(b"one-too-many").unwrap();
    assert!(matches!(fs.open(b"one-too-many"), Err(Error::FdTableFull)));
}

#[test]
fn read_past_eof_returns_zero_and_does_not_advance_offset() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    fs.write(fd, b"abc").unwrap();
    fs.lseek(fd, 3).unwrap();

    let mut buf = [0u8; 10];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    assert_eq!(fs.lseek(fd, 0).unwrap(), 0);
    assert_eq!(fs.lseek(fd, 3).unwrap(), 3);
}

#[test]
fn lseek_to_exactly_size_is_allowed_past_it_fails() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    fs.write(fd, b"abc").unwrap();

    assert_eq!(fs.lseek(fd, 3).unwrap(), 3);
    assert!(matches!(fs.lseek(fd, 4), Err(Error::BadOffset)));
}

#[test]
fn truncate_to_current_size_is_a_no_op() {
    let (_path, mut fs) = fresh_volume();
    fs.create(b"a").unwrap();
    let fd = fs.open(b"a").unwrap();
    fs.write(fd, b"abcdef").unwrap();
    let size = fs.get_filesize(fd).unwrap();
    fs.truncate(fd, size).unwrap();
    assert_eq!(fs.get_filesize(fd).unwrap(), size);
}

#[test]
fn operations_fail_before_a_mount_exists() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.into_temp_path();
    assert!(matches!(FileSystem::mount(&path), Err(Error::BadMagic) | Err(Error::Io(_))));
}

