//! VFS error to errno mapping.

use libc::c_int;
use tagfs_kernel::VfsError;

/// The errno a kernel caller sees for `err`.
///
/// Rejected calls report `ENOSYS`, so tools print "function not
/// implemented" for anything outside the read-only allow-list.
pub fn errno(err: &VfsError) -> c_int {
    match err {
        VfsError::NotFound(_) => libc::ENOENT,
        VfsError::NotSupported { .. } => libc::ENOSYS,
        VfsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        VfsError::Store(_) | VfsError::Other(_) => libc::EIO,
    }
}
