//! Mounting.

use std::io;
use std::path::Path;

use fuser::MountOption;

use crate::fs::TagFs;

/// How the tag view is presented to the kernel.
///
/// The mount is always read-only regardless of these options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Source name shown in the mount table.
    pub fs_name: String,
    /// Unmount automatically when the process exits.
    pub auto_unmount: bool,
    /// Let root see the mount as well as the mounting user.
    pub allow_root: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            fs_name: "tagfs".to_string(),
            auto_unmount: false,
            allow_root: false,
        }
    }
}

impl MountOptions {
    /// The fuser option list for these settings.
    pub fn to_fuser(&self) -> Vec<MountOption> {
        let mut opts = vec![
            MountOption::RO,
            MountOption::FSName(self.fs_name.clone()),
            MountOption::Subtype("tagfs".to_string()),
        ];
        if self.auto_unmount {
            opts.push(MountOption::AutoUnmount);
        }
        if self.allow_root {
            opts.push(MountOption::AllowRoot);
        }
        opts
    }
}

/// Mount `fs` at `mountpoint` and serve until it is unmounted.
///
/// Blocks the calling thread. The runtime `fs` was built with must stay
/// alive and must not be the thread calling this.
pub fn mount(fs: TagFs, mountpoint: &Path, options: &MountOptions) -> io::Result<()> {
    tracing::info!(
        mountpoint = %mountpoint.display(),
        fs_name = %options.fs_name,
        auto_unmount = options.auto_unmount,
        "mounting tag filesystem"
    );
    fuser::mount2(fs, mountpoint, &options.to_fuser())?;
    tracing::info!(mountpoint = %mountpoint.display(), "mount session ended");
    Ok(())
}
