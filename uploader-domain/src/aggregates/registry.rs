// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Registry Aggregate
//!
//! The `Registry` is the insertion-ordered collection of every `UploadFile`
//! discovered in a run. Entries are created once by the scanner and never
//! removed; the control loop and delivery-callback threads only read the
//! collection or mutate an individual `UploadFile` through its own interior
//! synchronization -- the registry's lock is held only long enough to look
//! up or insert an `Arc` handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::entities::UploadFile;

/// Insertion-ordered mapping from absolute path to `UploadFile`.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<PathBuf>,
    by_path: HashMap<PathBuf, Arc<UploadFile>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `path` has already been registered.
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().expect("registry lock poisoned").by_path.contains_key(path)
    }

    /// Inserts `file` if its path is not already present, returning the
    /// handle that ends up in the registry either way (the newly inserted
    /// one, or the pre-existing one if a concurrent caller won the race).
    pub fn insert_if_absent(&self, path: PathBuf, file: UploadFile) -> Arc<UploadFile> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(existing) = inner.by_path.get(&path) {
            return Arc::clone(existing);
        }
        let handle = Arc::new(file);
        inner.order.push(path.clone());
        inner.by_path.insert(path, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, path: &Path) -> Option<Arc<UploadFile>> {
        self.inner.read().expect("registry lock poisoned").by_path.get(path).cloned()
    }

    /// Returns every registered file in insertion order.
    pub fn all_in_order(&self) -> Vec<Arc<UploadFile>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.order.iter().filter_map(|p| inner.by_path.get(p).cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ChunkSize;

    fn file(name: &str) -> UploadFile {
        UploadFile::new(PathBuf::from(name), PathBuf::new(), name.to_string(), true, ChunkSize::default())
    }

    #[test]
    fn insert_and_lookup() {
        let registry = Registry::new();
        registry.insert_if_absent(PathBuf::from("a"), file("a"));
        assert!(registry.contains(Path::new("a")));
        assert!(!registry.contains(Path::new("b")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn preserves_insertion_order() {
        let registry = Registry::new();
        registry.insert_if_absent(PathBuf::from("b"), file("b"));
        registry.insert_if_absent(PathBuf::from("a"), file("a"));
        registry.insert_if_absent(PathBuf::from("c"), file("c"));

        let names: Vec<String> =
            registry.all_in_order().iter().map(|f| f.filename().to_string()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn insert_if_absent_does_not_overwrite() {
        let registry = Registry::new();
        let first = registry.insert_if_absent(PathBuf::from("a"), file("a"));
        let second = registry.insert_if_absent(PathBuf::from("a"), file("a"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }
}
