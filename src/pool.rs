//
// pool.rs -- placement pool over open bucket files
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};

use crate::config::Config;
use crate::dataid;
use crate::placement::{FileSet, Handle};
use crate::{BucketFile, Error, OpenMode, Result};

/// The in-memory aggregator of all open bucket files.
///
/// Maintains a dictionary from file identity to handle for direct
/// read/delete resolution, and size classes for placement. The identity
/// map lock is released before any file I/O runs, so writes to distinct
/// files proceed in parallel.
///
/// # Examples
/// ```
/// # use tempfile::tempdir;
/// # fn main() -> Result<(), String> {
/// #     let tmp_dir = tempdir().map_err(|e| e.to_string())?;
/// #     let path = tmp_dir.path().join("small.bkt");
/// #     || -> bucketfile::Result<()> {
/// use bucketfile::Pool;
///
/// let pool = Pool::new();
/// pool.mount_file("media", "0", &path, 256, 64)?;
///
/// let data_id = pool.write(b"a small object")?;
/// let (data, _stamp) = pool.read(&data_id)?.expect("just stored");
/// assert_eq!(data, b"a small object");
///
/// pool.delete(&data_id)?;
/// assert!(pool.read(&data_id)?.is_none());
/// #         Ok(())
/// #     }().map_err(|e| e.to_string())
/// # }
/// ```
pub struct Pool {
    handles: RwLock<HashMap<String, Arc<Handle>>>,
    files: FileSet,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// An empty pool with no files mounted.
    pub fn new() -> Self {
        Pool {
            handles: RwLock::new(HashMap::new()),
            files: FileSet::new(),
        }
    }

    /// Builds a pool from a configuration, opening every listed file
    /// read-write. Files that fail to open are logged and skipped.
    pub fn init(config: &Config) -> Pool {
        let pool = Pool::new();

        for group in &config.buckets {
            for entry in &group.files {
                let name = Path::new(&group.path).join(&entry.name);
                let id = dataid::identity(&group.id, &entry.id);
                match pool.load_file(&id, &name) {
                    Ok(()) => info!("({id}) loaded: {}", name.display()),
                    Err(e) => warn!("failed to load file {}: {e}", name.display()),
                }
            }
        }

        pool
    }

    fn read_handles(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Handle>>> {
        self.handles.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_handles(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Handle>>> {
        self.handles.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle registered under `id`, if any.
    pub fn get_file(&self, id: &str) -> Option<Arc<Handle>> {
        self.read_handles().get(id).cloned()
    }

    fn load_file(&self, id: &str, path: &Path) -> Result<()> {
        let file = BucketFile::open(path, OpenMode::ReadWrite)?;
        self.insert_handle(id, file)
    }

    fn insert_handle(&self, id: &str, file: BucketFile) -> Result<()> {
        let handle = Arc::new(Handle::new(id.to_string(), file));
        {
            let mut handles = self.write_handles();
            if handles.contains_key(id) {
                return Err(Error::FileIdExists(id.to_string()));
            }
            handles.insert(id.to_string(), handle.clone());
        }

        // full files stay reachable for read/delete but take no writes
        self.files.add_file(&handle);
        Ok(())
    }

    /// Creates a new bucket file at `path` and registers it under
    /// `bucketId:fileId`.
    pub fn mount_file<P: AsRef<Path>>(
        &self,
        bucket_id: &str,
        file_id: &str,
        path: P,
        bucket_size: i32,
        number_of_buckets: i32,
    ) -> Result<()> {
        let id = dataid::identity(bucket_id, file_id);
        if self.get_file(&id).is_some() {
            return Err(Error::FileIdExists(id));
        }

        let file = BucketFile::create(path, bucket_size, number_of_buckets)?;
        self.insert_handle(&id, file)
    }

    /// Opens an existing bucket file at `path` and registers it under
    /// `bucketId:fileId`.
    pub fn add_file<P: AsRef<Path>>(
        &self,
        bucket_id: &str,
        file_id: &str,
        path: P,
    ) -> Result<()> {
        let id = dataid::identity(bucket_id, file_id);
        if self.get_file(&id).is_some() {
            return Err(Error::FileIdExists(id));
        }

        let file = BucketFile::open(path, OpenMode::ReadWrite)?;
        self.insert_handle(&id, file)
    }

    /// Reopens the registered file's descriptor read-write.
    pub fn reload_file(&self, bucket_id: &str, file_id: &str) -> Result<()> {
        let id = dataid::identity(bucket_id, file_id);
        match self.get_file(&id) {
            Some(handle) => handle.file().reopen(OpenMode::ReadWrite),
            None => Err(Error::UnknownFile(id)),
        }
    }

    /// Stores `data` in the smallest bucket size that fits and returns
    /// its datum id.
    pub fn write(&self, data: &[u8]) -> Result<String> {
        self.files.write(data)
    }

    fn resolve(&self, data_id: &str) -> Result<(Arc<Handle>, i32)> {
        let (id, index) = dataid::parse(data_id)?;
        let handle = self
            .get_file(id)
            .ok_or_else(|| Error::UnknownFile(id.to_string()))?;
        Ok((handle, index))
    }

    /// Reads the payload stored under `data_id`.
    ///
    /// Returns `None` when the slot has since been emptied.
    pub fn read(&self, data_id: &str) -> Result<Option<(Vec<u8>, i64)>> {
        let (handle, index) = self.resolve(data_id)?;
        handle.file().read(index)
    }

    /// Empties the slot stored under `data_id`.
    ///
    /// A file that was full and gained a free slot here re-enters its
    /// size class and takes writes again.
    pub fn delete(&self, data_id: &str) -> Result<()> {
        let (handle, index) = self.resolve(data_id)?;

        let was_full = handle.file().is_full();
        let res = handle.file().empty(index);
        if was_full && !handle.file().is_full() {
            self.files.add_file(&handle);
        }

        res
    }
}
