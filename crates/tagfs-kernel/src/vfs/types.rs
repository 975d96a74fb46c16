//! Core VFS types.
//!
//! Path-based and inode-free; the bridge layer turns these into whatever its
//! protocol needs.

use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::time::SystemTime;

/// Permissions of the synthetic directories (nothing is writable).
pub const DIR_PERM: u32 = 0o555;

/// Permissions reported for file links.
pub const LINK_PERM: u32 = 0o777;

/// File type enumeration.
///
/// The tag view only ever contains directories and symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o555).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time.
    pub atime: SystemTime,
    /// Status change time.
    pub ctime: SystemTime,
    /// Number of hard links.
    pub nlink: u32,
    /// User ID; `None` lets the bridge fill in the mount owner.
    pub uid: Option<u32>,
    /// Group ID; `None` lets the bridge fill in the mount owner.
    pub gid: Option<u32>,
}

impl FileAttr {
    /// Attributes for a synthetic directory.
    pub fn directory(time: SystemTime) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm: DIR_PERM,
            mtime: time,
            atime: time,
            ctime: time,
            nlink: 2, // . and ..
            uid: None,
            gid: None,
        }
    }

    /// Attributes for a link whose target has metadata `target`.
    ///
    /// The size is the byte length of the target path; times and owner
    /// mirror the target so the link looks as fresh as the file it names.
    pub fn symlink(target_len: u64, target: &Metadata) -> Self {
        let mtime = target.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            size: target_len,
            kind: FileType::Symlink,
            perm: LINK_PERM,
            mtime,
            atime: target.accessed().unwrap_or(mtime),
            ctime: ctime_of(target).unwrap_or(mtime),
            nlink: 1,
            uid: Some(target.uid()),
            gid: Some(target.gid()),
        }
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

fn ctime_of(meta: &Metadata) -> Option<SystemTime> {
    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(std::time::Duration::new(secs, nanos))
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }

    /// Create a symlink entry.
    pub fn symlink(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Symlink)
    }

    /// Returns true for the `.` and `..` entries.
    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type() {
        assert!(FileType::Directory.is_dir());
        assert!(!FileType::Directory.is_symlink());
        assert!(FileType::Symlink.is_symlink());
    }

    #[test]
    fn test_directory_attr() {
        let now = SystemTime::now();
        let dir = FileAttr::directory(now);
        assert!(dir.is_dir());
        assert_eq!(dir.perm, 0o555);
        assert_eq!(dir.nlink, 2);
        assert_eq!(dir.mtime, now);
        assert!(dir.uid.is_none());
    }

    #[test]
    fn test_symlink_attr_mirrors_target() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let meta = std::fs::metadata(file.path()).unwrap();
        let target = file.path().to_str().unwrap();

        let attr = FileAttr::symlink(target.len() as u64, &meta);
        assert!(attr.is_symlink());
        assert_eq!(attr.size, target.len() as u64);
        assert_eq!(attr.mtime, meta.modified().unwrap());
        assert_eq!(attr.uid, Some(meta.uid()));
        assert_eq!(attr.nlink, 1);
    }

    #[test]
    fn test_dir_entry() {
        let link = DirEntry::symlink("report.txt");
        assert_eq!(link.name, "report.txt");
        assert!(link.kind.is_symlink());

        assert!(DirEntry::directory("..").is_dot());
        assert!(!DirEntry::directory("project").is_dot());
    }
}
