//! `fuser::Filesystem` over [`VfsOps`].
//!
//! fuser drives this from its own session thread. Allow-listed calls are
//! moved onto the tokio runtime as independent tasks that own their reply,
//! so a slow index query never holds up the session loop or another caller.
//! Every other call is refused inline through [`VfsOps::reject`].

use std::ffi::OsStr;
use std::ops::ControlFlow;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use fuser::{
    Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use libc::c_int;
use tagfs_kernel::{DirEntry, FsOp, VfsError, VfsOps};
use tokio::runtime::Handle;

use crate::attr::{Owner, TTL, fuse_kind};
use crate::errno::errno;
use crate::inode::{InodeTable, UNKNOWN_INO};

/// Refuse an unsupported call on the session thread.
macro_rules! reject {
    ($self:ident, $op:expr, $path:expr, $reply:ident) => {{
        let err = $self.vfs.reject($op, &$path);
        $reply.error(errno(&err));
    }};
}

/// Resolve an inode to its path or answer `ENOENT`.
macro_rules! path_or_enoent {
    ($self:ident, $ino:expr, $reply:ident) => {
        match $self.inodes.path($ino) {
            Some(path) => path,
            None => {
                $reply.error(libc::ENOENT);
                return;
            }
        }
    };
}

/// FUSE front end for a path-based VFS.
pub struct TagFs {
    rt: Handle,
    vfs: Arc<dyn VfsOps>,
    inodes: Arc<InodeTable>,
    owner: Owner,
}

impl std::fmt::Debug for TagFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagFs")
            .field("inodes", &self.inodes.len())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl TagFs {
    /// Bridge `vfs`, running its calls on `rt`. Directories are owned by
    /// the current process's user and group.
    pub fn new(vfs: Arc<dyn VfsOps>, rt: Handle) -> Self {
        Self::with_owner(vfs, rt, Owner::current())
    }

    pub fn with_owner(vfs: Arc<dyn VfsOps>, rt: Handle, owner: Owner) -> Self {
        Self {
            rt,
            vfs,
            inodes: Arc::new(InodeTable::new()),
            owner,
        }
    }

    pub fn inodes(&self) -> &Arc<InodeTable> {
        &self.inodes
    }

    /// Path for a call addressed by inode; unknown inodes read as `/?`.
    fn path_of(&self, ino: u64) -> PathBuf {
        self.inodes
            .path(ino)
            .unwrap_or_else(|| PathBuf::from(format!("/?{ino}")))
    }

    /// Path for a call addressed by parent and name.
    fn child_of(&self, parent: u64, name: &OsStr) -> PathBuf {
        self.inodes
            .child(parent, name)
            .unwrap_or_else(|| self.path_of(parent).join(name))
    }
}

/// Log a failed allow-listed call and return its errno.
fn failed(op: FsOp, path: &Path, err: &VfsError) -> c_int {
    if err.is_not_found() {
        tracing::trace!(%op, path = %path.display(), "not found");
    } else {
        tracing::warn!(%op, path = %path.display(), error = %err, "call failed");
    }
    errno(err)
}

/// Offset bookkeeping for one `readdir` reply.
///
/// Entry n (1-based) of a listing carries offset n and the kernel resumes by
/// passing back the last offset it kept. Listings are re-derived on every
/// call, so everything up to that offset is skipped.
#[derive(Debug)]
struct DirPager {
    skip: usize,
    index: usize,
}

impl DirPager {
    fn new(offset: i64) -> Self {
        Self {
            skip: usize::try_from(offset).unwrap_or(0),
            index: 0,
        }
    }

    /// Offer the next listed entry. `add` gets the entry with its offset and
    /// returns true when the reply buffer is full, which leaves the entry
    /// for the next call and stops the listing.
    fn offer(
        &mut self,
        entry: DirEntry,
        add: impl FnOnce(DirEntry, i64) -> bool,
    ) -> ControlFlow<()> {
        self.index += 1;
        if self.index <= self.skip {
            return ControlFlow::Continue(());
        }
        if add(entry, self.index as i64) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Which single-purpose call a `setattr` stands for.
fn setattr_op(mode: Option<u32>, uid: Option<u32>, gid: Option<u32>, size: Option<u64>) -> FsOp {
    if size.is_some() {
        FsOp::Truncate
    } else if mode.is_some() {
        FsOp::Chmod
    } else if uid.is_some() || gid.is_some() {
        FsOp::Chown
    } else {
        FsOp::Utimens
    }
}

impl Filesystem for TagFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        tracing::info!(read_only = self.vfs.read_only(), "filesystem mounted");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!(inodes = self.inodes.len(), "filesystem unmounted");
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    // ========================================================================
    // Allow-listed calls
    // ========================================================================

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.inodes.child(parent, name) {
            Some(path) => path,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };
        let vfs = Arc::clone(&self.vfs);
        let inodes = Arc::clone(&self.inodes);
        let owner = self.owner;
        self.rt.spawn(async move {
            match vfs.getattr(&path).await {
                Ok(attr) => {
                    let ino = inodes.lookup(&path);
                    reply.entry(&TTL, &owner.fuse_attr(ino, &attr), 0);
                }
                Err(err) => reply.error(failed(FsOp::Getattr, &path, &err)),
            }
        });
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = path_or_enoent!(self, ino, reply);
        let vfs = Arc::clone(&self.vfs);
        let owner = self.owner;
        self.rt.spawn(async move {
            match vfs.getattr(&path).await {
                Ok(attr) => reply.attr(&TTL, &owner.fuse_attr(ino, &attr)),
                Err(err) => reply.error(failed(FsOp::Getattr, &path, &err)),
            }
        });
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path = path_or_enoent!(self, ino, reply);
        let vfs = Arc::clone(&self.vfs);
        self.rt.spawn(async move {
            match vfs.readlink(&path).await {
                Ok(target) => reply.data(target.as_os_str().as_bytes()),
                Err(err) => reply.error(failed(FsOp::Readlink, &path, &err)),
            }
        });
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = path_or_enoent!(self, ino, reply);
        let vfs = Arc::clone(&self.vfs);
        self.rt.spawn(async move {
            match vfs.opendir(&path).await {
                Ok(()) => reply.opened(0, 0),
                Err(err) => reply.error(failed(FsOp::Opendir, &path, &err)),
            }
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = path_or_enoent!(self, ino, reply);
        let vfs = Arc::clone(&self.vfs);
        let inodes = Arc::clone(&self.inodes);
        self.rt.spawn(async move {
            let mut pager = DirPager::new(offset);
            let result = {
                let mut fill = |entry: DirEntry| {
                    pager.offer(entry, |entry, off| {
                        let child = match entry.name.as_str() {
                            "." => ino,
                            ".." => inodes.parent(ino),
                            name => inodes.known(&path.join(name)).unwrap_or(UNKNOWN_INO),
                        };
                        reply.add(child, off, fuse_kind(entry.kind), &entry.name)
                    })
                };
                vfs.readdir(&path, &mut fill).await
            };
            match result {
                Ok(()) => reply.ok(),
                Err(err) => reply.error(failed(FsOp::Readdir, &path, &err)),
            }
        });
    }

    fn releasedir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        let path = self.path_of(ino);
        let vfs = Arc::clone(&self.vfs);
        self.rt.spawn(async move {
            if let Err(err) = vfs.releasedir(&path).await {
                tracing::debug!(path = %path.display(), error = %err, "releasedir");
            }
            reply.ok();
        });
    }

    // ========================================================================
    // Everything else is refused
    // ========================================================================

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        reject!(self, FsOp::Statfs, self.path_of(ino), reply);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        reject!(self, FsOp::Mknod, self.child_of(parent, name), reply);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reject!(self, FsOp::Mkdir, self.child_of(parent, name), reply);
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        reject!(self, FsOp::Unlink, self.child_of(parent, name), reply);
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        reject!(self, FsOp::Rmdir, self.child_of(parent, name), reply);
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        _target: &Path,
        reply: ReplyEntry,
    ) {
        reject!(self, FsOp::Symlink, self.child_of(parent, link_name), reply);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reject!(self, FsOp::Rename, self.child_of(parent, name), reply);
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        reject!(self, FsOp::Link, self.child_of(newparent, newname), reply);
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let op = setattr_op(mode, uid, gid, size);
        reject!(self, op, self.path_of(ino), reply);
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        reject!(self, FsOp::Access, self.path_of(ino), reply);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        reject!(self, FsOp::Create, self.child_of(parent, name), reply);
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        reject!(self, FsOp::Open, self.path_of(ino), reply);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        _size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        reject!(self, FsOp::Read, self.path_of(ino), reply);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        reject!(self, FsOp::Write, self.path_of(ino), reply);
    }

    fn flush(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reject!(self, FsOp::Flush, self.path_of(ino), reply);
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reject!(self, FsOp::Release, self.path_of(ino), reply);
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        reject!(self, FsOp::Fsync, self.path_of(ino), reply);
    }

    fn fsyncdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        reject!(self, FsOp::Fsyncdir, self.path_of(ino), reply);
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        reject!(self, FsOp::Setxattr, self.path_of(ino), reply);
    }

    fn getxattr(&mut self, _req: &Request<'_>, ino: u64, _name: &OsStr, _size: u32, reply: ReplyXattr) {
        reject!(self, FsOp::Getxattr, self.path_of(ino), reply);
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, _size: u32, reply: ReplyXattr) {
        reject!(self, FsOp::Listxattr, self.path_of(ino), reply);
    }

    fn removexattr(&mut self, _req: &Request<'_>, ino: u64, _name: &OsStr, reply: ReplyEmpty) {
        reject!(self, FsOp::Removexattr, self.path_of(ino), reply);
    }
}
