//
// lib.rs -- bucketfile core library API routines
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

//! Bucket-file object storage.
//!
//! A bucket file is a single on-disk container of fixed-size record slots
//! ("buckets") with an embedded LIFO free list. A [`Pool`] aggregates many
//! open bucket files, groups them into size classes, and packs each
//! incoming payload into the smallest bucket size that fits.
//!
//! # Examples
//! ```
//! # use tempfile::tempdir;
//! # fn main() -> Result<(), String> {
//! #     let tmp_dir = tempdir().map_err(|e| e.to_string())?;
//! #     let path = tmp_dir.path().join("demo.bkt");
//! #     || -> bucketfile::Result<()> {
//! use bucketfile::BucketFile;
//!
//! // Create a file of 128 slots, 256 bytes each
//! let bf = BucketFile::create(&path, 256, 128)?;
//!
//! let index = bf.write(b"hello bucket")?;
//! let (data, _stamp) = bf.read(index)?.expect("slot is in use");
//! assert_eq!(data, b"hello bucket");
//!
//! bf.empty(index)?;
//! assert!(bf.read(index)?.is_none());
//! #         Ok(())
//! #     }().map_err(|e| e.to_string())
//! # }
//! ```

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

mod bucket;
mod config;
pub mod dataid;
mod error;
mod header;
mod placement;
mod pool;
mod ser;

pub use bucket::{BucketHeader, BucketStatus, BUCKET_HEADER_SIZE};
pub use config::{validate_mount, BucketGroup, Config, FileEntry, BUCKET_SIZE_UNIT};
pub use error::Error;
pub use header::{
    FileHeader, BUCKETFILE_MAGIC, FILE_HEADER_SIZE, MAJOR_VERSION, MINOR_VERSION,
};
pub use placement::Handle;
pub use pool::Pool;

/// The crate Result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Mode to open an existing bucket file in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

// open the descriptor and load+validate the header
fn open_file(path: &Path, mode: OpenMode) -> Result<(File, FileHeader)> {
    let f = std::fs::OpenOptions::new()
        .read(true)
        .write(mode == OpenMode::ReadWrite)
        .open(path)?;

    let length = f.metadata()?.len();
    if length < FILE_HEADER_SIZE as u64 {
        return Err(Error::InvalidFileLength {
            length,
            minimum: FILE_HEADER_SIZE as u64,
        });
    }

    let mut buf = [0u8; FILE_HEADER_SIZE];
    f.read_exact_at(&mut buf, 0)?;
    let header = FileHeader::from_reader(&mut &buf[..])?;

    Ok((f, header))
}

struct Inner {
    header: FileHeader,
    file: Option<File>,
    writable: bool,
    path: PathBuf,
}

impl Inner {
    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::Closed)
    }

    fn check_index(&self, index: i32) -> Result<()> {
        if index < 0 || index >= self.header.number_of_buckets {
            return Err(Error::IndexOverflow {
                index,
                buckets: self.header.number_of_buckets,
            });
        }
        Ok(())
    }

    fn read_bucket_header(&self, index: i32) -> Result<BucketHeader> {
        let mut buf = [0u8; BUCKET_HEADER_SIZE];
        self.file()?
            .read_exact_at(&mut buf, self.header.index_to_pointer(index))?;
        Ok(BucketHeader::from_reader(&mut &buf[..])?)
    }

    fn flush_header(&mut self) -> Result<()> {
        let buf = self.header.serialize();
        let f = self.file.as_mut().ok_or(Error::Closed)?;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(&buf)?;
        Ok(())
    }

    // file header first, then the slot; a crash in between leaks at most
    // the target slot
    fn store_slot(&mut self, index: i32, bucket: &BucketHeader, data: &[u8]) -> Result<()> {
        self.flush_header()?;

        let offset = self.header.index_to_pointer(index);
        let mut buf = bucket.serialize();
        buf.extend_from_slice(data);
        let f = self.file.as_mut().ok_or(Error::Closed)?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(&buf)?;
        Ok(())
    }
}

/// An open bucket file.
///
/// All operations take `&self`; an internal mutex serializes them per
/// file, so a `BucketFile` can be shared across threads. Operations on
/// distinct files never contend.
pub struct BucketFile {
    inner: Mutex<Inner>,
}

impl BucketFile {
    /// Creates a new bucket file of `number_of_buckets` slots of
    /// `bucket_size` bytes each.
    ///
    /// Fails if `path` already exists. The file is pre-allocated to its
    /// final length and zero-filled; the zeroed slots form the initial
    /// implicit free-list chain. The returned handle is open read-write.
    pub fn create<P: AsRef<Path>>(
        path: P,
        bucket_size: i32,
        number_of_buckets: i32,
    ) -> Result<BucketFile> {
        if bucket_size < BUCKET_HEADER_SIZE as i32 || number_of_buckets < 0 {
            return Err(Error::BadGeometry {
                bucket_size,
                buckets: number_of_buckets,
            });
        }

        let mut f = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        let header = FileHeader::new(bucket_size, number_of_buckets);
        let file_size =
            FILE_HEADER_SIZE as u64 + bucket_size as u64 * number_of_buckets as u64;
        f.set_len(file_size)?;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(&header.serialize())?;

        Ok(BucketFile {
            inner: Mutex::new(Inner {
                header,
                file: Some(f),
                writable: true,
                path: path.as_ref().to_path_buf(),
            }),
        })
    }

    /// Opens an existing bucket file.
    ///
    /// Fails with [`Error::InvalidFileLength`] on a file shorter than the
    /// file header and with [`Error::BadMagic`]/[`Error::BadVersion`] on
    /// anything that is not a readable bucket file.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<BucketFile> {
        let (file, header) = open_file(path.as_ref(), mode)?;

        Ok(BucketFile {
            inner: Mutex::new(Inner {
                header,
                file: Some(file),
                writable: mode == OpenMode::ReadWrite,
                path: path.as_ref().to_path_buf(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reads the slot at `index`.
    ///
    /// Returns `Some((payload, time_stamp))` for a used slot and `None`
    /// for an empty, deleted or errored one.
    pub fn read(&self, index: i32) -> Result<Option<(Vec<u8>, i64)>> {
        let inner = self.lock();
        inner.check_index(index)?;

        let bucket = inner.read_bucket_header(index)?;
        if !bucket.is_used() {
            return Ok(None);
        }

        let capacity = inner.header.bucket_size - bucket.header_size as i32;
        if bucket.data_length < 0 || bucket.data_length > capacity {
            return Err(Error::BadBucketDataSize {
                index,
                length: bucket.data_length,
                capacity,
            });
        }

        let mut data = vec![0u8; bucket.data_length as usize];
        let offset = inner.header.index_to_pointer(index) + bucket.header_size as u64;
        inner.file()?.read_exact_at(&mut data, offset)?;

        Ok(Some((data, bucket.time_stamp)))
    }

    /// Writes `data` into the slot at the head of the free list and
    /// returns its index.
    ///
    /// The file header goes to disk before the slot does: a crash between
    /// the two loses at most the target slot, and never leaves the
    /// free-list head pointing at live data. On a failed write the
    /// in-memory header is rolled back so the same slot is retried next.
    ///
    /// # Examples
    /// ```
    /// # use tempfile::tempdir;
    /// # fn main() -> Result<(), String> {
    /// #     let tmp_dir = tempdir().map_err(|e| e.to_string())?;
    /// #     let path = tmp_dir.path().join("test.bkt");
    /// #     || -> bucketfile::Result<()> {
    /// #         let bf = bucketfile::BucketFile::create(&path, 64, 4)?;
    /// assert_eq!(bf.write(b"first")?, 0);
    /// assert_eq!(bf.write(b"second")?, 1);
    /// #         Ok(())
    /// #     }().map_err(|e| e.to_string())
    /// # }
    /// ```
    pub fn write(&self, data: &[u8]) -> Result<i32> {
        let mut inner = self.lock();
        inner.file()?;

        let capacity = inner.header.payload_capacity().max(0) as usize;
        if data.len() > capacity {
            return Err(Error::DataTooLong {
                length: data.len(),
                capacity,
            });
        }

        if !inner.writable {
            return Err(Error::NotWritable);
        }

        if inner.header.is_full() {
            return Err(Error::FileFull);
        }

        let index = inner.header.index_of_empty_bucket;
        let bucket = inner.read_bucket_header(index)?;
        if !bucket.is_empty() {
            return Err(Error::UnexpectedBucketStatus {
                index,
                status: bucket.status.as_raw(),
            });
        }

        let next_empty = bucket.next_empty_bucket(index);
        let used = BucketHeader::used(data.len() as i32, unix_now());

        inner.header.index_of_empty_bucket = next_empty;
        inner.header.number_of_empty_buckets -= 1;

        if let Err(e) = inner.store_slot(index, &used, data) {
            // retry the same slot on the next write
            inner.header.index_of_empty_bucket = index;
            inner.header.number_of_empty_buckets += 1;
            return Err(e);
        }

        Ok(index)
    }

    /// Marks the slot at `index` empty and links it at the head of the
    /// free list. No-op on an already-empty slot.
    ///
    /// Inverse order to [`write`](BucketFile::write): the slot goes to
    /// disk before the file header, so a failed header rewrite orphans
    /// the slot instead of corrupting the chain.
    pub fn empty(&self, index: i32) -> Result<()> {
        let mut inner = self.lock();
        inner.check_index(index)?;

        if !inner.writable {
            return Err(Error::NotWritable);
        }

        let bucket = inner.read_bucket_header(index)?;
        if bucket.is_empty() {
            return Ok(());
        }

        let empty = BucketHeader::empty(inner.header.index_of_empty_bucket, unix_now());
        let offset = inner.header.index_to_pointer(index);
        let buf = empty.serialize();
        {
            let f = inner.file.as_mut().ok_or(Error::Closed)?;
            f.seek(SeekFrom::Start(offset))?;
            f.write_all(&buf)?;
        }

        inner.header.number_of_empty_buckets += 1;
        inner.header.index_of_empty_bucket = index;
        inner.flush_header()
    }

    /// Swaps the underlying descriptor for a freshly opened one and
    /// re-reads the header.
    ///
    /// Used to upgrade a read-only handle or to recover after an external
    /// rotation. Serializes behind any in-flight operation on this
    /// handle; on failure the existing descriptor and header are kept.
    pub fn reopen(&self, mode: OpenMode) -> Result<()> {
        let mut inner = self.lock();
        let path = inner.path.clone();
        let (file, header) = open_file(&path, mode)?;

        inner.file = Some(file);
        inner.header = header;
        inner.writable = mode == OpenMode::ReadWrite;
        Ok(())
    }

    /// Releases the descriptor and resets the header to sentinel values.
    ///
    /// A second close fails with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.file.take().is_none() {
            return Err(Error::Closed);
        }

        inner.header = FileHeader::sentinel();
        inner.writable = false;
        Ok(())
    }

    /// Snapshot of the in-memory file header.
    pub fn file_header(&self) -> FileHeader {
        self.lock().header
    }

    /// True iff no empty buckets remain.
    pub fn is_full(&self) -> bool {
        self.lock().header.number_of_empty_buckets == 0
    }

    /// Path the file was opened or created under.
    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }
}
