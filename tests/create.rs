extern crate bucketfile;

mod common;

use std::fs;

use bucketfile::{
    BucketFile, Error, FileHeader, OpenMode, BUCKETFILE_MAGIC, FILE_HEADER_SIZE, MAJOR_VERSION,
    MINOR_VERSION,
};
use common::{path_in, scratch_dir};

#[test]
fn api_create_geometry() {
    let dir = scratch_dir();
    let path = path_in(&dir, "geometry.bkt");

    let bf = BucketFile::create(&path, 512, 1024).expect("create failed");
    let header = bf.file_header();

    assert_eq!(header.magic, BUCKETFILE_MAGIC);
    assert_eq!(header.major_version, MAJOR_VERSION);
    assert_eq!(header.minor_version, MINOR_VERSION);
    assert_eq!(header.header_size, FILE_HEADER_SIZE as i16);
    assert_eq!(header.bucket_size, 512);
    assert_eq!(header.number_of_buckets, 1024);
    assert_eq!(header.number_of_empty_buckets, 1024);
    assert_eq!(header.index_of_empty_bucket, 0);
    assert!(!bf.is_full());

    let on_disk = fs::metadata(&path).expect("stat failed").len();
    assert_eq!(on_disk, FILE_HEADER_SIZE as u64 + 512 * 1024);
}

#[test]
fn api_create_existing_path_fails() {
    let dir = scratch_dir();
    let path = path_in(&dir, "dup.bkt");

    BucketFile::create(&path, 64, 4).expect("first create failed");
    assert!(matches!(
        BucketFile::create(&path, 64, 4),
        Err(Error::Io(_))
    ));
}

#[test]
fn api_create_bad_geometry() {
    let dir = scratch_dir();

    // a slot must at least hold its own header
    assert!(matches!(
        BucketFile::create(path_in(&dir, "tiny.bkt"), 8, 4),
        Err(Error::BadGeometry { .. })
    ));
    assert!(matches!(
        BucketFile::create(path_in(&dir, "neg.bkt"), 64, -1),
        Err(Error::BadGeometry { .. })
    ));
}

#[test]
fn api_open_missing_file() {
    let dir = scratch_dir();
    assert!(matches!(
        BucketFile::open(path_in(&dir, "nope.bkt"), OpenMode::ReadOnly),
        Err(Error::Io(_))
    ));
}

#[test]
fn api_open_short_file() {
    let dir = scratch_dir();
    let path = path_in(&dir, "short.bkt");
    fs::write(&path, b"BF").expect("writing stub file");

    assert!(matches!(
        BucketFile::open(&path, OpenMode::ReadOnly),
        Err(Error::InvalidFileLength { length: 2, .. })
    ));
}

#[test]
fn api_open_bad_magic() {
    let dir = scratch_dir();
    let path = path_in(&dir, "garbage.bkt");
    fs::write(&path, vec![0xa5u8; 64]).expect("writing stub file");

    assert!(matches!(
        BucketFile::open(&path, OpenMode::ReadOnly),
        Err(Error::BadMagic { .. })
    ));
}

#[test]
fn api_open_future_major_version() {
    let dir = scratch_dir();
    let path = path_in(&dir, "future.bkt");

    let mut header = FileHeader::new(64, 4);
    header.major_version = MAJOR_VERSION + 1;
    fs::write(&path, header.serialize()).expect("writing stub file");

    assert!(matches!(
        BucketFile::open(&path, OpenMode::ReadOnly),
        Err(Error::BadVersion { .. })
    ));
}

#[test]
fn api_open_undersized_bucket_size() {
    let dir = scratch_dir();
    let path = path_in(&dir, "narrow.bkt");

    // an on-disk bucket size smaller than the slot header is unusable
    let mut header = FileHeader::new(64, 4);
    header.bucket_size = 4;
    fs::write(&path, header.serialize()).expect("writing stub file");

    assert!(matches!(
        BucketFile::open(&path, OpenMode::ReadOnly),
        Err(Error::BadGeometry { bucket_size: 4, .. })
    ));
}

#[test]
fn api_open_bad_counts() {
    let dir = scratch_dir();
    let path = path_in(&dir, "counts.bkt");

    let mut header = FileHeader::new(64, 4);
    header.number_of_empty_buckets = 5;
    fs::write(&path, header.serialize()).expect("writing stub file");

    assert!(matches!(
        BucketFile::open(&path, OpenMode::ReadOnly),
        Err(Error::BadHeaderCounts { .. })
    ));
}

#[test]
fn api_open_readonly_rejects_writes() {
    let dir = scratch_dir();
    let path = path_in(&dir, "ro.bkt");

    {
        let bf = BucketFile::create(&path, 64, 4).expect("create failed");
        bf.write(b"seed").expect("seed write failed");
    }

    let bf = BucketFile::open(&path, OpenMode::ReadOnly).expect("open failed");
    assert!(matches!(bf.write(b"nope"), Err(Error::NotWritable)));
    assert!(matches!(bf.empty(0), Err(Error::NotWritable)));

    let (data, _) = bf.read(0).expect("read failed").expect("slot 0 in use");
    assert_eq!(data, b"seed");
}

#[test]
fn api_reopen_upgrades_mode() {
    let dir = scratch_dir();
    let path = path_in(&dir, "upgrade.bkt");

    {
        BucketFile::create(&path, 64, 4).expect("create failed");
    }

    let bf = BucketFile::open(&path, OpenMode::ReadOnly).expect("open failed");
    assert!(matches!(bf.write(b"early"), Err(Error::NotWritable)));

    bf.reopen(OpenMode::ReadWrite).expect("reopen failed");
    assert_eq!(bf.write(b"late").expect("write failed"), 0);
}

#[test]
fn api_reopen_picks_up_external_state() {
    let dir = scratch_dir();
    let path = path_in(&dir, "rotate.bkt");

    let bf = BucketFile::create(&path, 64, 4).expect("create failed");
    bf.write(b"one").expect("write failed");

    // another handle consumes a slot behind our back
    let other = BucketFile::open(&path, OpenMode::ReadWrite).expect("open failed");
    other.write(b"two").expect("write failed");

    bf.reopen(OpenMode::ReadWrite).expect("reopen failed");
    assert_eq!(bf.file_header().number_of_empty_buckets, 2);
    assert_eq!(bf.file_header().index_of_empty_bucket, 2);
}

#[test]
fn api_close_releases_handle() {
    let dir = scratch_dir();
    let path = path_in(&dir, "close.bkt");

    let bf = BucketFile::create(&path, 64, 4).expect("create failed");
    bf.write(b"kept").expect("write failed");

    bf.close().expect("close failed");
    assert!(matches!(bf.close(), Err(Error::Closed)));
    assert_eq!(bf.file_header(), FileHeader::sentinel());
    assert!(bf.read(0).is_err());
    assert!(bf.write(b"more").is_err());

    // data written before the close is durable
    let bf = BucketFile::open(&path, OpenMode::ReadOnly).expect("open failed");
    let (data, _) = bf.read(0).expect("read failed").expect("slot 0 in use");
    assert_eq!(data, b"kept");
}
