//
// config.rs -- declarative bucket-group configuration
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

//! On-disk description of the bucket files a pool serves: a list of
//! bucket groups, each with an id, a directory path and member files.
//!
//! ```toml
//! [[bucket]]
//! id = "media"
//! path = "/srv/buckets/media"
//!
//! [[bucket.file]]
//! id = "0"
//! name = "0_512.bkt"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mounted bucket sizes are configured in units of this many bytes.
pub const BUCKET_SIZE_UNIT: i64 = 4096;

const MAX_BUCKET_SIZE_UNITS: i64 = 2048;
const MAX_FILE_SIZE: i64 = 1 << 34; // 16 GiB

/// One member file of a bucket group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
}

/// A directory of bucket files sharing one group id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketGroup {
    pub id: String,
    pub path: String,
    #[serde(default, rename = "file")]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, rename = "bucket")]
    pub buckets: Vec<BucketGroup>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }

    fn group(&self, bucket_id: &str) -> Result<&BucketGroup> {
        self.buckets
            .iter()
            .find(|g| g.id == bucket_id)
            .ok_or_else(|| Error::UnknownBucketGroup(bucket_id.to_string()))
    }

    /// Allocates the next file entry of a group without adding it.
    ///
    /// The new file id is one past the group's highest (ids are lowercase
    /// hex); the file name is derived as `<fid>_<seed>.bkt`. Returns the
    /// group (for its path) and the allocated entry.
    pub fn assign_file(&self, bucket_id: &str, seed: &str) -> Result<(&BucketGroup, FileEntry)> {
        let group = self.group(bucket_id)?;

        let mut max_id: i64 = -1;
        for entry in &group.files {
            let fid = i64::from_str_radix(&entry.id, 16)
                .map_err(|_| Error::Config(format!("bad file id: {}", entry.id)))?;
            max_id = max_id.max(fid);
        }

        let fid = format!("{:x}", max_id + 1);
        let name = format!("{fid}_{seed}.bkt");
        Ok((group, FileEntry { id: fid, name }))
    }

    /// Adds a file entry to a group.
    pub fn add_file(&mut self, bucket_id: &str, entry: FileEntry) -> Result<()> {
        let group = self
            .buckets
            .iter_mut()
            .find(|g| g.id == bucket_id)
            .ok_or_else(|| Error::UnknownBucketGroup(bucket_id.to_string()))?;

        if group
            .files
            .iter()
            .any(|f| f.id == entry.id || f.name == entry.name)
        {
            return Err(Error::FileIdExists(entry.id));
        }

        group.files.push(entry);
        Ok(())
    }

    /// Adds a file entry to a group and persists the configuration.
    pub fn add_file_and_save<P: AsRef<Path>>(
        &mut self,
        bucket_id: &str,
        entry: FileEntry,
        path: P,
    ) -> Result<()> {
        self.add_file(bucket_id, entry)?;
        self.save(path)
    }
}

/// Validates mount geometry given in allocation units and returns the
/// on-disk bucket size in bytes.
///
/// Bucket sizes are accepted in `[1, 2048]` units of [`BUCKET_SIZE_UNIT`]
/// bytes, and the resulting file may not exceed 16 GiB. These bounds are
/// adapter policy; the file engine itself accepts any sane geometry.
pub fn validate_mount(bucket_size_units: i64, number_of_buckets: i64) -> Result<i32> {
    if !(1..=MAX_BUCKET_SIZE_UNITS).contains(&bucket_size_units) {
        return Err(Error::InvalidBucketSize {
            size: bucket_size_units,
        });
    }

    let bucket_size = bucket_size_units * BUCKET_SIZE_UNIT;

    if number_of_buckets < 0 {
        return Err(Error::BadGeometry {
            bucket_size: bucket_size as i32,
            buckets: number_of_buckets.max(i32::MIN as i64) as i32,
        });
    }

    match bucket_size.checked_mul(number_of_buckets) {
        Some(file_size) if file_size <= MAX_FILE_SIZE => Ok(bucket_size as i32),
        Some(file_size) => Err(Error::InvalidFileSize { size: file_size }),
        None => Err(Error::InvalidFileSize { size: i64::MAX }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            buckets: vec![BucketGroup {
                id: "media".to_string(),
                path: "/srv/buckets/media".to_string(),
                files: vec![
                    FileEntry {
                        id: "0".to_string(),
                        name: "0_512.bkt".to_string(),
                    },
                    FileEntry {
                        id: "a".to_string(),
                        name: "a_512.bkt".to_string(),
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_assign_file() {
        let config = sample();
        let (group, entry) = config.assign_file("media", "512").unwrap();
        assert_eq!(group.path, "/srv/buckets/media");
        assert_eq!(entry.id, "b");
        assert_eq!(entry.name, "b_512.bkt");

        assert!(matches!(
            config.assign_file("missing", "512"),
            Err(Error::UnknownBucketGroup(_))
        ));
    }

    #[test]
    fn test_add_file_rejects_duplicates() {
        let mut config = sample();
        let dup = FileEntry {
            id: "a".to_string(),
            name: "other.bkt".to_string(),
        };
        assert!(matches!(
            config.add_file("media", dup),
            Err(Error::FileIdExists(_))
        ));

        let fresh = FileEntry {
            id: "b".to_string(),
            name: "b_512.bkt".to_string(),
        };
        config.add_file("media", fresh).unwrap();
        assert_eq!(config.buckets[0].files.len(), 3);
    }

    #[test]
    fn test_validate_mount() {
        assert_eq!(validate_mount(1, 16).unwrap(), 4096);
        assert_eq!(validate_mount(2048, 1).unwrap(), 2048 * 4096);

        assert!(matches!(
            validate_mount(0, 16),
            Err(Error::InvalidBucketSize { .. })
        ));
        assert!(matches!(
            validate_mount(2049, 16),
            Err(Error::InvalidBucketSize { .. })
        ));
        // 2048 units * 4 KiB * 4096 buckets is 32 GiB
        assert!(matches!(
            validate_mount(2048, 4096),
            Err(Error::InvalidFileSize { .. })
        ));

        // bucket counts that overflow the size computation are oversized,
        // not wrapped back into range
        assert!(matches!(
            validate_mount(2048, i64::MAX),
            Err(Error::InvalidFileSize { .. })
        ));
        assert!(matches!(
            validate_mount(1, -1),
            Err(Error::BadGeometry { buckets: -1, .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = sample();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
