//
// error.rs -- bucketfile error types
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

use std::{fmt::Display, fmt::Formatter, io};

#[derive(Debug)]
pub enum Error {
    /// IO error from the underlying filesystem, propagated unchanged.
    Io(io::Error),
    /// File is shorter than the fixed file header.
    InvalidFileLength {
        /// Actual file length in bytes.
        length: u64,
        /// Minimum is sizeof file header.
        minimum: u64,
    },
    /// Magic number mismatch: not a bucket file.
    BadMagic {
        /// Magic found in the file.
        magic: u16,
    },
    /// File format major version is newer than this implementation.
    BadVersion {
        /// Major version from the header.
        major: u8,
        /// Minor version from the header.
        minor: u8,
    },
    /// Empty-bucket count or free-list head outside the valid range.
    BadHeaderCounts {
        /// Empty-bucket count from the header.
        empty: i32,
        /// Free-list head index from the header.
        head: i32,
        /// Total bucket count from the header.
        buckets: i32,
    },
    /// Requested geometry cannot describe a usable file.
    BadGeometry {
        /// Requested bucket size in bytes.
        bucket_size: i32,
        /// Requested bucket count.
        buckets: i32,
    },
    /// Bucket index at or beyond the end of the bucket array.
    IndexOverflow {
        /// Requested index.
        index: i32,
        /// Number of buckets in the file.
        buckets: i32,
    },
    /// A used slot's stored payload length exceeds the slot capacity.
    BadBucketDataSize {
        /// Slot index.
        index: i32,
        /// Stored payload length.
        length: i32,
        /// Maximum payload a slot can hold.
        capacity: i32,
    },
    /// The free-list head pointed at a slot that is not empty.
    UnexpectedBucketStatus {
        /// Slot index.
        index: i32,
        /// Raw status byte found in the slot.
        status: i8,
    },
    /// Payload does not fit a single bucket of this file.
    DataTooLong {
        /// Payload length.
        length: usize,
        /// Maximum payload a slot can hold.
        capacity: usize,
    },
    /// The free list is exhausted.
    FileFull,
    /// Write operation on a file opened read-only.
    NotWritable,
    /// Operation on a closed handle.
    Closed,
    /// Malformed datum id.
    BadDataId(String),
    /// No pool entry for the file identity.
    UnknownFile(String),
    /// File identity already present in the pool or configuration.
    FileIdExists(String),
    /// No size class in the pool can hold the payload.
    DataTooLarge {
        /// Payload length.
        length: usize,
    },
    /// The pool has no open, non-full bucket files.
    NoBucketFiles,
    /// Bucket size unit outside the valid mount range.
    InvalidBucketSize {
        /// Requested size in allocation units.
        size: i64,
    },
    /// Mounted file would exceed the total-size cap.
    InvalidFileSize {
        /// Resulting file size in bytes.
        size: i64,
    },
    /// Bucket group id not present in the configuration.
    UnknownBucketGroup(String),
    /// Configuration file could not be parsed or rendered.
    Config(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::InvalidFileLength { length, minimum } => {
                write!(f, "invalid file length {length}, minimum {minimum}")
            }
            Error::BadMagic { magic } => {
                write!(f, "not a valid bucket file: magic {magic:#06x}")
            }
            Error::BadVersion { major, minor } => {
                write!(f, "not a valid bucket file: version {major}.{minor}")
            }
            Error::BadHeaderCounts {
                empty,
                head,
                buckets,
            } => write!(
                f,
                "not a valid bucket file: {empty} empty of {buckets} buckets, head {head}"
            ),
            Error::BadGeometry {
                bucket_size,
                buckets,
            } => write!(f, "bad geometry: {buckets} buckets of {bucket_size} bytes"),
            Error::IndexOverflow { index, buckets } => {
                write!(f, "index overflow: {index} of {buckets}")
            }
            Error::BadBucketDataSize {
                index,
                length,
                capacity,
            } => write!(
                f,
                "invalid bucket data size at {index}: {length}, capacity {capacity}"
            ),
            Error::UnexpectedBucketStatus { index, status } => write!(
                f,
                "empty bucket wanted at {index}, but status {status} found"
            ),
            Error::DataTooLong { length, capacity } => {
                write!(f, "data too long: {length}, capacity {capacity}")
            }
            Error::FileFull => write!(f, "bucket file is full"),
            Error::NotWritable => write!(f, "file is not writable"),
            Error::Closed => write!(f, "file is closed"),
            Error::BadDataId(id) => write!(f, "invalid data id: {id}"),
            Error::UnknownFile(id) => write!(f, "no such file: {id}"),
            Error::FileIdExists(id) => write!(f, "file id already exists: {id}"),
            Error::DataTooLarge { length } => write!(f, "data too large: {length}"),
            Error::NoBucketFiles => write!(f, "no valid bucket files"),
            Error::InvalidBucketSize { size } => {
                write!(f, "bucket size {size} outside valid range [1, 2048]")
            }
            Error::InvalidFileSize { size } => {
                write!(f, "file size {size} exceeds the 16 GiB cap")
            }
            Error::UnknownBucketGroup(id) => write!(f, "no such bucket group: {id}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
