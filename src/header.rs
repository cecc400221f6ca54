//
// header.rs -- bucket file header routines
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

use std::io::Read;

use serde::Serialize;

use crate::bucket::BUCKET_HEADER_SIZE;
use crate::ser::{read_i16, read_i32, read_u16, read_u8, w16, w16i, w32i, w8};
use crate::{Error, Result};

/// "BF", little-endian.
pub const BUCKETFILE_MAGIC: u16 = 0x4642;

pub const MAJOR_VERSION: u8 = 0;
pub const MINOR_VERSION: u8 = 1;

/// Byte size of the on-disk file header.
pub const FILE_HEADER_SIZE: usize = 22;

/// On-disk header at offset 0 of every bucket file.
///
/// `number_of_empty_buckets` and `index_of_empty_bucket` are the only
/// fields that change after creation. `index_of_empty_bucket` equals
/// `number_of_buckets` when the free list is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub magic: u16,
    pub major_version: u8,
    pub minor_version: u8,
    pub header_size: i16,
    pub bucket_size: i32,
    pub number_of_buckets: i32,
    pub number_of_empty_buckets: i32,
    pub index_of_empty_bucket: i32,
}

impl FileHeader {
    /// Header of a freshly created file: every slot on the implicit
    /// free-list chain rooted at slot 0.
    pub fn new(bucket_size: i32, number_of_buckets: i32) -> Self {
        FileHeader {
            magic: BUCKETFILE_MAGIC,
            major_version: MAJOR_VERSION,
            minor_version: MINOR_VERSION,
            header_size: FILE_HEADER_SIZE as i16,
            bucket_size,
            number_of_buckets,
            number_of_empty_buckets: number_of_buckets,
            index_of_empty_bucket: 0,
        }
    }

    /// Sentinel header of a closed handle.
    pub fn sentinel() -> Self {
        FileHeader {
            magic: 0,
            major_version: 0,
            minor_version: 0,
            header_size: 0,
            bucket_size: 0,
            number_of_buckets: 0,
            number_of_empty_buckets: 0,
            index_of_empty_bucket: 0,
        }
    }

    pub fn from_reader(rdr: &mut impl Read) -> Result<Self> {
        let magic = read_u16(rdr)?;
        let major_version = read_u8(rdr)?;
        let minor_version = read_u8(rdr)?;
        let header_size = read_i16(rdr)?;
        let bucket_size = read_i32(rdr)?;
        let number_of_buckets = read_i32(rdr)?;
        let number_of_empty_buckets = read_i32(rdr)?;
        let index_of_empty_bucket = read_i32(rdr)?;

        let header = FileHeader {
            magic,
            major_version,
            minor_version,
            header_size,
            bucket_size,
            number_of_buckets,
            number_of_empty_buckets,
            index_of_empty_bucket,
        };
        header.validate()?;

        Ok(header)
    }

    // A minor-version bump may append fields; `header_size` keeps the
    // bucket array addressable without understanding them.
    fn validate(&self) -> Result<()> {
        if self.magic != BUCKETFILE_MAGIC {
            return Err(Error::BadMagic { magic: self.magic });
        }

        if self.major_version > MAJOR_VERSION {
            return Err(Error::BadVersion {
                major: self.major_version,
                minor: self.minor_version,
            });
        }

        if self.header_size < FILE_HEADER_SIZE as i16
            || self.bucket_size < BUCKET_HEADER_SIZE as i32
        {
            return Err(Error::BadGeometry {
                bucket_size: self.bucket_size,
                buckets: self.number_of_buckets,
            });
        }

        if self.number_of_empty_buckets < 0
            || self.number_of_empty_buckets > self.number_of_buckets
            || self.index_of_empty_bucket < 0
            || self.index_of_empty_bucket > self.number_of_buckets
        {
            return Err(Error::BadHeaderCounts {
                empty: self.number_of_empty_buckets,
                head: self.index_of_empty_bucket,
                buckets: self.number_of_buckets,
            });
        }

        Ok(())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FILE_HEADER_SIZE);
        buf.append(&mut w16(self.magic));
        buf.append(&mut w8(self.major_version));
        buf.append(&mut w8(self.minor_version));
        buf.append(&mut w16i(self.header_size));
        buf.append(&mut w32i(self.bucket_size));
        buf.append(&mut w32i(self.number_of_buckets));
        buf.append(&mut w32i(self.number_of_empty_buckets));
        buf.append(&mut w32i(self.index_of_empty_bucket));

        buf
    }

    /// File offset of the slot at `index`.
    pub fn index_to_pointer(&self, index: i32) -> u64 {
        self.header_size as u64 + index as u64 * self.bucket_size as u64
    }

    pub fn is_full(&self) -> bool {
        self.number_of_empty_buckets == 0
            || self.index_of_empty_bucket == self.number_of_buckets
    }

    /// Largest payload one slot of this file can hold.
    pub fn payload_capacity(&self) -> i32 {
        self.bucket_size - BUCKET_HEADER_SIZE as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_roundtrip() {
        let hdr = FileHeader::new(512, 1024);
        let buf = hdr.serialize();
        assert_eq!(buf.len(), FILE_HEADER_SIZE);
        assert_eq!(&buf[0..2], b"BF");

        let back = FileHeader::from_reader(&mut &buf[..]).unwrap();
        assert_eq!(back, hdr);
    }

    #[test]
    fn test_reject_bad_magic() {
        let mut buf = FileHeader::new(512, 16).serialize();
        buf[0] = b'X';
        assert!(matches!(
            FileHeader::from_reader(&mut &buf[..]),
            Err(Error::BadMagic { .. })
        ));
    }

    #[test]
    fn test_reject_undersized_bucket_size() {
        // a slot must at least hold its own header
        let mut hdr = FileHeader::new(64, 16);
        hdr.bucket_size = 4;
        let buf = hdr.serialize();
        assert!(matches!(
            FileHeader::from_reader(&mut &buf[..]),
            Err(Error::BadGeometry { bucket_size: 4, .. })
        ));
    }

    #[test]
    fn test_reject_future_major() {
        let mut hdr = FileHeader::new(512, 16);
        hdr.major_version = MAJOR_VERSION + 1;
        let buf = hdr.serialize();
        assert!(matches!(
            FileHeader::from_reader(&mut &buf[..]),
            Err(Error::BadVersion { .. })
        ));
    }

    #[test]
    fn test_reject_bad_counts() {
        let mut hdr = FileHeader::new(512, 16);
        hdr.number_of_empty_buckets = 17;
        let buf = hdr.serialize();
        assert!(matches!(
            FileHeader::from_reader(&mut &buf[..]),
            Err(Error::BadHeaderCounts { .. })
        ));

        let mut hdr = FileHeader::new(512, 16);
        hdr.index_of_empty_bucket = -1;
        let buf = hdr.serialize();
        assert!(matches!(
            FileHeader::from_reader(&mut &buf[..]),
            Err(Error::BadHeaderCounts { .. })
        ));
    }

    #[test]
    fn test_offsets_and_fullness() {
        let mut hdr = FileHeader::new(64, 4);
        assert_eq!(hdr.index_to_pointer(0), FILE_HEADER_SIZE as u64);
        assert_eq!(hdr.index_to_pointer(3), FILE_HEADER_SIZE as u64 + 3 * 64);
        assert!(!hdr.is_full());

        hdr.number_of_empty_buckets = 0;
        assert!(hdr.is_full());

        hdr.number_of_empty_buckets = 1;
        hdr.index_of_empty_bucket = 4;
        assert!(hdr.is_full());
    }
}
