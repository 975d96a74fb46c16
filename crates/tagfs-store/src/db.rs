//! SQLite persistence for the tag index.
//!
//! Two relations: one row per tagged file, one row per (file, name) tag.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreResult;
use crate::model::{FileEntry, Tag, base_name, validate_tag_name};
use crate::store::TagStore;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Tagged files (absolute host paths)
CREATE TABLE IF NOT EXISTS file_entries (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE
);

-- Tags, at most one per (file, name)
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES file_entries(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    value TEXT NOT NULL DEFAULT '',
    UNIQUE (file_id, name)
);
CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
"#;

/// Database handle for the tag index.
///
/// The connection sits behind a mutex so one handle can be shared by every
/// filesystem worker; each query holds the lock only for its own duration.
pub struct TagDb {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for TagDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagDb").finish_non_exhaustive()
    }
}

impl TagDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        tracing::debug!(path = %path.as_ref().display(), "opening tag index");
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Tag a file, creating its entry on first use.
    ///
    /// Tagging the same name again replaces the value.
    pub fn tag_file(&self, path: &str, name: &str, value: &str) -> StoreResult<()> {
        validate_tag_name(name)?;
        tracing::trace!(path, name, value, "tag file");

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO file_entries (path) VALUES (?1) ON CONFLICT(path) DO NOTHING",
            params![path],
        )?;
        let file_id: i64 = tx.query_row(
            "SELECT id FROM file_entries WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO tags (file_id, name, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(file_id, name) DO UPDATE SET value = excluded.value",
            params![file_id, name, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Tags of one file, oldest first. Empty for unknown files.
    pub fn tags_for_file(&self, path: &str) -> StoreResult<Vec<Tag>> {
        tracing::trace!(path, "tags for file");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.file_id, t.name, t.value
             FROM tags t JOIN file_entries f ON f.id = t.file_id
             WHERE f.path = ?1 ORDER BY t.id",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            Ok(Tag {
                id: row.get(0)?,
                file_id: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Remove one tag from a file. Returns whether a tag was removed.
    pub fn delete_tag(&self, path: &str, name: &str) -> StoreResult<bool> {
        tracing::trace!(path, name, "delete tag");
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM tags
             WHERE name = ?2 AND file_id = (SELECT id FROM file_entries WHERE path = ?1)",
            params![path, name],
        )?;
        Ok(removed > 0)
    }

    /// Remove every tag of a file along with its entry.
    ///
    /// Returns the number of tags removed.
    pub fn clear_file(&self, path: &str) -> StoreResult<usize> {
        tracing::trace!(path, "clear file");
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM tags WHERE file_id = (SELECT id FROM file_entries WHERE path = ?1)",
            params![path],
        )?;
        tx.execute("DELETE FROM file_entries WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(removed)
    }

    /// Look up a file entry by path.
    pub fn file_entry(&self, path: &str) -> StoreResult<Option<FileEntry>> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                "SELECT id, path FROM file_entries WHERE path = ?1",
                params![path],
                |row| {
                    Ok(FileEntry {
                        id: row.get(0)?,
                        path: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }
}

impl TagStore for TagDb {
    fn list_tag_names(&self) -> StoreResult<Vec<String>> {
        tracing::trace!("list tag names");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM tags GROUP BY name ORDER BY MIN(id)")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }

    fn list_files_for_tag(&self, name: &str) -> StoreResult<Vec<FileEntry>> {
        tracing::trace!(name, "list files for tag");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT f.id, f.path
             FROM file_entries f JOIN tags t ON t.file_id = f.id
             WHERE t.name = ?1 ORDER BY f.id",
        )?;
        let rows = stmt.query_map(params![name], |row| {
            Ok(FileEntry {
                id: row.get(0)?,
                path: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_file_by_tag_and_base_name(
        &self,
        tag: &str,
        name: &str,
    ) -> StoreResult<Option<FileEntry>> {
        // SQLite has no basename(); filter the (usually short) tag listing here.
        let entry = self
            .list_files_for_tag(tag)?
            .into_iter()
            .find(|entry| base_name(&entry.path) == Some(name));
        Ok(entry)
    }

    fn tag_exists(&self, name: &str) -> StoreResult<bool> {
        tracing::trace!(name, "tag exists");
        let conn = self.conn.lock();
        let exists = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM tags WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn test_tag_and_show() {
        let db = TagDb::in_memory().unwrap();
        db.tag_file("/home/u/report.txt", "project", "alpha").unwrap();
        db.tag_file("/home/u/report.txt", "year", "").unwrap();

        let tags = db.tags_for_file("/home/u/report.txt").unwrap();
        let pairs: Vec<_> = tags.iter().map(|t| (t.name.as_str(), t.value.as_str())).collect();
        assert_eq!(pairs, vec![("project", "alpha"), ("year", "")]);

        assert!(db.tags_for_file("/nowhere").unwrap().is_empty());
    }

    #[test]
    fn test_retag_updates_value() {
        let db = TagDb::in_memory().unwrap();
        db.tag_file("/a/x.txt", "project", "alpha").unwrap();
        db.tag_file("/a/x.txt", "project", "beta").unwrap();

        let tags = db.tags_for_file("/a/x.txt").unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, "beta");
        assert_eq!(db.list_files_for_tag("project").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let db = TagDb::in_memory().unwrap();
        let result = db.tag_file("/a/x.txt", "a/b", "");
        assert!(matches!(result, Err(StoreError::InvalidTagName(_))));
        assert!(db.file_entry("/a/x.txt").unwrap().is_none());
    }

    #[test]
    fn test_list_tag_names_distinct() {
        let db = TagDb::in_memory().unwrap();
        db.tag_file("/a/x.txt", "project", "").unwrap();
        db.tag_file("/b/y.txt", "project", "").unwrap();
        db.tag_file("/b/y.txt", "draft", "").unwrap();

        assert_eq!(db.list_tag_names().unwrap(), vec!["project", "draft"]);
        assert!(db.tag_exists("draft").unwrap());
        assert!(!db.tag_exists("missing").unwrap());
    }

    #[test]
    fn test_base_name_collision_first_wins() {
        let db = TagDb::in_memory().unwrap();
        db.tag_file("/a/x.txt", "project", "").unwrap();
        db.tag_file("/b/x.txt", "project", "").unwrap();

        let files = db.list_files_for_tag("project").unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/a/x.txt", "/b/x.txt"]);

        let found = db.find_file_by_tag_and_base_name("project", "x.txt").unwrap();
        assert_eq!(found.unwrap().path, "/a/x.txt");
        assert!(db.find_file_by_tag_and_base_name("project", "y.txt").unwrap().is_none());
        assert!(db.find_file_by_tag_and_base_name("other", "x.txt").unwrap().is_none());
    }

    #[test]
    fn test_delete_tag_keeps_entry() {
        let db = TagDb::in_memory().unwrap();
        db.tag_file("/a/x.txt", "project", "").unwrap();

        assert!(db.delete_tag("/a/x.txt", "project").unwrap());
        assert!(!db.delete_tag("/a/x.txt", "project").unwrap());
        assert!(!db.tag_exists("project").unwrap());
        assert!(db.file_entry("/a/x.txt").unwrap().is_some());
    }

    #[test]
    fn test_clear_file() {
        let db = TagDb::in_memory().unwrap();
        db.tag_file("/a/x.txt", "project", "").unwrap();
        db.tag_file("/a/x.txt", "draft", "").unwrap();
        db.tag_file("/b/y.txt", "project", "").unwrap();

        assert_eq!(db.clear_file("/a/x.txt").unwrap(), 2);
        assert!(db.file_entry("/a/x.txt").unwrap().is_none());
        assert_eq!(db.list_tag_names().unwrap(), vec!["project"]);
        assert_eq!(db.clear_file("/a/x.txt").unwrap(), 0);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags.db");
        {
            let db = TagDb::open(&path).unwrap();
            db.tag_file("/a/x.txt", "project", "alpha").unwrap();
        }
        let db = TagDb::open(&path).unwrap();
        assert_eq!(db.tags_for_file("/a/x.txt").unwrap()[0].value, "alpha");
    }
}
