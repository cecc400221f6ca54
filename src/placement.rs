//
// placement.rs -- size classes and weight-ordered file selection
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bucket::BUCKET_HEADER_SIZE;
use crate::dataid;
use crate::{BucketFile, Error, Result};

/// A pool-level wrapper pairing a file identity with an open bucket file.
pub struct Handle {
    id: String,
    file: BucketFile,
}

impl Handle {
    pub fn new(id: String, file: BucketFile) -> Self {
        Handle { id, file }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file(&self) -> &BucketFile {
        &self.file
    }

    /// Fill weight: fraction of this file's slots that are empty. Heavier
    /// files are preferred write targets.
    pub fn weight(&self) -> f64 {
        let header = self.file.file_header();
        if header.number_of_buckets == 0 {
            return 0.0;
        }
        header.number_of_empty_buckets as f64 / header.number_of_buckets as f64
    }

    /// Datum id of the slot at `index` within this file.
    pub fn gen_id(&self, index: i32) -> String {
        dataid::render(&self.id, index)
    }
}

// All files of one bucket size, ordered by decreasing weight. The head is
// the current write target; files that fill up are evicted.
struct SizeClass {
    size: i32,
    files: Vec<Arc<Handle>>,
}

impl SizeClass {
    fn new(size: i32, handle: Arc<Handle>) -> Self {
        SizeClass {
            size,
            files: vec![handle],
        }
    }

    // largest payload a slot of this class can hold
    fn usable(&self) -> i64 {
        self.size as i64 - BUCKET_HEADER_SIZE as i64
    }

    fn sort(&mut self) {
        self.files.sort_by(|a, b| {
            b.weight()
                .partial_cmp(&a.weight())
                .unwrap_or(Ordering::Equal)
        });
    }

    fn push(&mut self, handle: Arc<Handle>) {
        if self.files.iter().any(|f| Arc::ptr_eq(f, &handle)) {
            return;
        }
        self.files.push(handle);
        self.sort();
    }

    fn head(&self) -> Option<Arc<Handle>> {
        self.files.first().cloned()
    }

    // reorder after a write through `handle`; a failed write may still
    // have filled the file
    fn settle(&mut self, handle: &Arc<Handle>) {
        if handle.file().is_full() {
            self.files.retain(|f| !Arc::ptr_eq(f, handle));
        } else {
            self.sort();
        }
    }

    fn is_exhausted(&self) -> bool {
        self.files.is_empty()
    }
}

// Size classes ordered by increasing bucket size; a write goes to the
// smallest class whose slots can hold the payload.
pub(crate) struct FileSet {
    classes: Mutex<Vec<SizeClass>>,
}

impl FileSet {
    pub(crate) fn new() -> Self {
        FileSet {
            classes: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SizeClass>> {
        self.classes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes `handle` eligible for placement. Full files are not listed;
    /// they come back through here when a delete frees a slot.
    pub(crate) fn add_file(&self, handle: &Arc<Handle>) {
        if handle.file().is_full() {
            return;
        }

        let size = handle.file().file_header().bucket_size;
        let mut classes = self.lock();

        let i = classes.partition_point(|c| c.size < size);
        if i < classes.len() && classes[i].size == size {
            classes[i].push(handle.clone());
        } else {
            classes.insert(i, SizeClass::new(size, handle.clone()));
        }
    }

    // The class-list lock covers target selection and the post-write
    // reorder, never the file I/O itself.
    pub(crate) fn write(&self, data: &[u8]) -> Result<String> {
        let handle = {
            let classes = self.lock();
            if classes.is_empty() {
                return Err(Error::NoBucketFiles);
            }

            let i = classes.partition_point(|c| c.usable() < data.len() as i64);
            if i >= classes.len() {
                return Err(Error::DataTooLarge { length: data.len() });
            }

            match classes[i].head() {
                Some(handle) => handle,
                None => return Err(Error::NoBucketFiles),
            }
        };

        let res = handle.file().write(data);

        {
            let size = handle.file().file_header().bucket_size;
            let mut classes = self.lock();
            let i = classes.partition_point(|c| c.size < size);
            if i < classes.len() && classes[i].size == size {
                classes[i].settle(&handle);
                if classes[i].is_exhausted() {
                    classes.remove(i);
                }
            }
        }

        res.map(|index| handle.gen_id(index))
    }
}
