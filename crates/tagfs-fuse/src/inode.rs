//! Inode ↔ virtual path table.
//!
//! The VFS is path-based and the kernel is not. An inode is handed out when
//! `lookup` first succeeds for a path and carries the kernel's lookup count;
//! `forget` drops it again once that count reaches zero, so the table only
//! holds nodes the kernel still references. The VFS answers `ENOENT` for a
//! live inode whose node has left the index.
//!
//! Listings never allocate. Names the kernel has not looked up yet are
//! reported with [`UNKNOWN_INO`] and get a real inode on their first lookup.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// The mount point's inode.
pub const ROOT_INO: u64 = fuser::FUSE_ROOT_ID;

/// `d_ino` for listed names without an inode, as libfuse reports them.
pub const UNKNOWN_INO: u64 = 0xffff_ffff;

#[derive(Debug)]
struct Slot {
    path: PathBuf,
    lookups: u64,
}

#[derive(Debug)]
pub struct InodeTable {
    next: AtomicU64,
    paths: DashMap<u64, Slot>,
    inodes: DashMap<PathBuf, u64>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        let table = Self {
            next: AtomicU64::new(ROOT_INO + 1),
            paths: DashMap::new(),
            inodes: DashMap::new(),
        };
        table.paths.insert(
            ROOT_INO,
            Slot {
                path: root.clone(),
                lookups: 1,
            },
        );
        table.inodes.insert(root, ROOT_INO);
        table
    }

    /// Virtual path of a live inode.
    pub fn path(&self, ino: u64) -> Option<PathBuf> {
        self.paths.get(&ino).map(|slot| slot.path.clone())
    }

    /// Virtual path of `name` inside directory `parent`.
    pub fn child(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.paths.get(&parent).map(|slot| slot.path.join(name))
    }

    /// Inode already assigned to `path`, if any.
    pub fn known(&self, path: &Path) -> Option<u64> {
        self.inodes.get(path).map(|ino| *ino)
    }

    /// Record one successful kernel lookup of `path` and return its inode,
    /// allocating on first sight.
    pub fn lookup(&self, path: &Path) -> u64 {
        // Lock order: `inodes` entry, then `paths`. `forget` takes the same order.
        match self.inodes.entry(path.to_path_buf()) {
            Entry::Occupied(e) => {
                let ino = *e.get();
                if let Some(mut slot) = self.paths.get_mut(&ino) {
                    slot.lookups += 1;
                }
                ino
            }
            Entry::Vacant(e) => {
                let ino = self.next.fetch_add(1, Ordering::Relaxed);
                self.paths.insert(
                    ino,
                    Slot {
                        path: path.to_path_buf(),
                        lookups: 1,
                    },
                );
                e.insert(ino);
                ino
            }
        }
    }

    /// Drop `nlookup` kernel references to `ino`; evict it at zero.
    ///
    /// The root is never evicted. Unknown inodes are ignored.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INO {
            return;
        }
        let Some(path) = self.path(ino) else {
            return;
        };
        let Entry::Occupied(e) = self.inodes.entry(path) else {
            return;
        };
        if *e.get() != ino {
            return;
        }
        let released = match self.paths.get_mut(&ino) {
            Some(mut slot) => {
                slot.lookups = slot.lookups.saturating_sub(nlookup);
                slot.lookups == 0
            }
            None => false,
        };
        if released {
            self.paths.remove(&ino);
            let (path, _) = e.remove_entry();
            tracing::trace!(ino, path = %path.display(), "inode forgotten");
        }
    }

    /// Inode of the directory containing `ino`. The root is its own parent,
    /// and so is anything whose parent is no longer known.
    pub fn parent(&self, ino: u64) -> u64 {
        self.path(ino)
            .as_deref()
            .and_then(Path::parent)
            .and_then(|parent| self.known(parent))
            .unwrap_or(ROOT_INO)
    }

    /// Number of live inodes, root included.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_root_is_preassigned() {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INO), Some(PathBuf::from("/")));
        assert_eq!(table.known(Path::new("/")), Some(ROOT_INO));
        assert_eq!(table.parent(ROOT_INO), ROOT_INO);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup_is_stable() {
        let table = InodeTable::new();
        let tag = table.child(ROOT_INO, OsStr::new("project")).unwrap();
        assert_eq!(tag, PathBuf::from("/project"));
        assert_eq!(table.known(&tag), None);

        let ino = table.lookup(&tag);
        assert_ne!(ino, ROOT_INO);
        assert_eq!(table.lookup(&tag), ino);
        assert_eq!(table.known(&tag), Some(ino));
        assert_eq!(table.path(ino), Some(tag));

        let link = table.child(ino, OsStr::new("report.txt")).unwrap();
        let link_ino = table.lookup(&link);
        assert_eq!(table.parent(link_ino), ino);
        assert_eq!(table.parent(ino), ROOT_INO);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_forget_evicts_at_zero() {
        let table = InodeTable::new();
        let path = Path::new("/project");
        let ino = table.lookup(path);
        table.lookup(path);

        table.forget(ino, 1);
        assert_eq!(table.path(ino), Some(path.to_path_buf()));

        table.forget(ino, 1);
        assert!(table.path(ino).is_none());
        assert!(table.known(path).is_none());
        assert_eq!(table.len(), 1);

        // A later lookup gets a fresh inode.
        let again = table.lookup(path);
        assert_ne!(again, ino);
        assert_eq!(table.path(again), Some(path.to_path_buf()));
    }

    #[test]
    fn test_forget_batch_count_and_unknowns() {
        let table = InodeTable::new();
        let path = Path::new("/project");
        let ino = table.lookup(path);
        table.lookup(path);
        table.lookup(path);

        // The kernel may release several references at once.
        table.forget(ino, 3);
        assert!(table.path(ino).is_none());

        table.forget(ino, 1);
        table.forget(12345, 1);
        table.forget(ROOT_INO, 100);
        assert_eq!(table.path(ROOT_INO), Some(PathBuf::from("/")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_does_not_grow_across_lookup_cycles() {
        let table = InodeTable::new();
        for i in 0..1000 {
            let path = PathBuf::from(format!("/tag{i}"));
            let ino = table.lookup(&path);
            table.forget(ino, 1);
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_parent_of_orphan_is_root() {
        let table = InodeTable::new();
        let tag = table.lookup(Path::new("/project"));
        let link = table.lookup(Path::new("/project/report.txt"));
        table.forget(tag, 1);
        assert_eq!(table.parent(link), ROOT_INO);
    }

    #[test]
    fn test_unknown_inode() {
        let table = InodeTable::new();
        assert!(table.path(42).is_none());
        assert!(table.child(42, OsStr::new("x")).is_none());
    }

    #[test]
    fn test_concurrent_lookups_agree() {
        let table = Arc::new(InodeTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| table.lookup(Path::new(&format!("/tag{}", i % 10))))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
        assert_eq!(table.len(), 11);

        // 80 lookups each; releasing them all empties the table.
        for &ino in &results[0][..10] {
            table.forget(ino, 80);
        }
        assert_eq!(table.len(), 1);
    }
}
