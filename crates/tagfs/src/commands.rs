//! Subcommand implementations.
//!
//! Each takes an open [`TagDb`] so it can be driven from tests without a
//! config file.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tagfs_fuse::{MountOptions, TagFs};
use tagfs_kernel::{TagBackend, VfsOps};
use tagfs_store::{Tag, TagDb, parse_tag};
use tokio::runtime::Handle;

/// Most tag arguments one invocation accepts.
pub const MAX_TAG_ARGS: usize = 10;

/// Make `path` absolute against the working directory and fold `.` and
/// `..` out of it lexically, without touching symlinks.
///
/// Every spelling of one file yields the same key in the index.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let path =
        std::path::absolute(path).with_context(|| format!("cannot resolve {}", path.display()))?;
    Ok(clean(&path))
}

/// Lexical `.`/`..` folding. `..` at the root stays at the root.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}

/// Tag an existing file with `name[=value]` arguments.
pub fn tag(db: &TagDb, path: &Path, args: &[String]) -> Result<Vec<Tag>> {
    if args.len() > MAX_TAG_ARGS {
        bail!("at most {MAX_TAG_ARGS} tags per call, got {}", args.len());
    }
    let path = absolutize(path)?;
    if !path.exists() {
        bail!("file {} does not exist", path.display());
    }
    let key = path_str(&path)?;

    for arg in args {
        let (name, value) = parse_tag(arg);
        db.tag_file(key, &name, &value)
            .with_context(|| format!("cannot tag {key} with {arg:?}"))?;
        tracing::debug!(path = key, tag = %name, "tagged");
    }
    Ok(db.tags_for_file(key)?)
}

/// Write `name=value` for every tag of `path`, one per line.
pub fn show(db: &TagDb, path: &Path, out: &mut impl Write) -> Result<()> {
    let path = absolutize(path)?;
    for tag in db.tags_for_file(path_str(&path)?)? {
        writeln!(out, "{}={}", tag.name, tag.value)?;
    }
    Ok(())
}

/// Remove the named tags from `path`. Blank names are skipped.
///
/// Returns how many tags were actually removed.
pub fn delete(db: &TagDb, path: &Path, names: &[String]) -> Result<usize> {
    if names.len() > MAX_TAG_ARGS {
        bail!("at most {MAX_TAG_ARGS} tags per call, got {}", names.len());
    }
    let path = absolutize(path)?;
    let key = path_str(&path)?;

    let mut removed = 0;
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if db.delete_tag(key, name)? {
            removed += 1;
        } else {
            tracing::debug!(path = key, tag = name, "no such tag");
        }
    }
    Ok(removed)
}

/// Remove every tag of `path` and forget the file.
pub fn clear(db: &TagDb, path: &Path) -> Result<usize> {
    let path = absolutize(path)?;
    Ok(db.clear_file(path_str(&path)?)?)
}

/// Serve the tag view at `mountpoint` until it is unmounted.
///
/// Must be called from inside a multi-threaded tokio runtime; the mount
/// session itself runs on the blocking pool.
pub async fn mount(db: Arc<TagDb>, mountpoint: &Path, options: MountOptions) -> Result<()> {
    let mountpoint = absolutize(mountpoint)?;
    if !mountpoint.is_dir() {
        bail!("mount point {} is not a directory", mountpoint.display());
    }

    let vfs: Arc<dyn VfsOps> = Arc::new(TagBackend::new(db));
    let fs = TagFs::new(vfs, Handle::current());

    let target = mountpoint.clone();
    tokio::task::spawn_blocking(move || tagfs_fuse::mount(fs, &target, &options))
        .await
        .context("mount task panicked")?
        .with_context(|| format!("cannot mount at {}", mountpoint.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagfs_store::TagStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TagDb, PathBuf) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, b"q3").unwrap();
        (dir, TagDb::in_memory().unwrap(), file)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tag_and_show() {
        let (_dir, db, file) = setup();
        let tags = tag(&db, &file, &args(&["project=alpha", "draft", " x = y "])).unwrap();
        assert_eq!(tags.len(), 3);

        let mut out = Vec::new();
        show(&db, &file, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "project=alpha\ndraft=\nx=y\n"
        );
    }

    #[test]
    fn test_tag_missing_file() {
        let (dir, db, _file) = setup();
        let missing = dir.path().join("nope.txt");
        let err = tag(&db, &missing, &args(&["a"])).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(db.list_tag_names().unwrap().is_empty());
    }

    #[test]
    fn test_tag_invalid_name() {
        let (_dir, db, file) = setup();
        assert!(tag(&db, &file, &args(&["a/b"])).is_err());
        assert!(tag(&db, &file, &args(&["=value"])).is_err());
    }

    #[test]
    fn test_too_many_args() {
        let (_dir, db, file) = setup();
        let many: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
        assert!(tag(&db, &file, &many).is_err());
        assert!(delete(&db, &file, &many).is_err());
        assert!(tag(&db, &file, &many[..10]).is_ok());
    }

    #[test]
    fn test_delete_skips_blank_names() {
        let (_dir, db, file) = setup();
        tag(&db, &file, &args(&["a", "b", "c"])).unwrap();

        let removed = delete(&db, &file, &args(&["a", "  ", "", "missing", "c"])).unwrap();
        assert_eq!(removed, 2);

        let mut out = Vec::new();
        show(&db, &file, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "b=\n");
    }

    #[test]
    fn test_clear() {
        let (_dir, db, file) = setup();
        tag(&db, &file, &args(&["a", "b"])).unwrap();
        assert_eq!(clear(&db, &file).unwrap(), 2);
        assert_eq!(clear(&db, &file).unwrap(), 0);
        assert!(db.file_entry(file.to_str().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_absolutize() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new("a/b.txt")).unwrap(), cwd.join("a/b.txt"));
        assert_eq!(absolutize(Path::new("/x/y")).unwrap(), PathBuf::from("/x/y"));
    }

    #[test]
    fn test_absolutize_folds_dot_segments() {
        let cases = [
            ("/a/./b/../c", "/a/c"),
            ("/a/b/../../c/", "/c"),
            ("/..", "/"),
            ("/../../x", "/x"),
            ("//a//b", "/a/b"),
        ];
        for (input, expected) in cases {
            assert_eq!(absolutize(Path::new(input)).unwrap(), PathBuf::from(expected), "{input}");
        }
    }

    #[test]
    fn test_one_entry_per_file_across_spellings() {
        let (dir, db, file) = setup();
        let via_parent = dir.path().join("sub").join("..").join("report.txt");
        let via_dot = dir.path().join(".").join("report.txt");

        tag(&db, &file, &args(&["project"])).unwrap();
        tag(&db, &via_parent, &args(&["project=alpha"])).unwrap();
        tag(&db, &via_dot, &args(&["draft"])).unwrap();

        let files = db.list_files_for_tag("project").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, file.to_str().unwrap());

        let tags = db.tags_for_file(file.to_str().unwrap()).unwrap();
        let pairs: Vec<_> = tags.iter().map(|t| (t.name.as_str(), t.value.as_str())).collect();
        assert_eq!(pairs, vec![("project", "alpha"), ("draft", "")]);

        // Other commands resolve the same key.
        assert_eq!(delete(&db, &via_parent, &args(&["draft"])).unwrap(), 1);
        assert_eq!(clear(&db, &via_dot).unwrap(), 1);
        assert!(db.file_entry(file.to_str().unwrap()).unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mount_rejects_missing_mountpoint() {
        let (dir, db, _file) = setup();
        let err = mount(Arc::new(db), &dir.path().join("nope"), MountOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
