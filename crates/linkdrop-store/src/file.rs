// ABOUTME: Filesystem key-value backend storing one `<key>.json` file per key in a directory.
// ABOUTME: Writes go through a temp file, fsync, and atomic rename so a crash never leaves half a value.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::backend::{BackendError, KvBackend};

const EXTENSION: &str = "json";

/// Directory-backed store. Each key maps to `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, BackendError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        let safe = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !safe {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }
}

fn write_synced(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let final_path = self.path_for(key)?;
        let tmp_path = final_path.with_extension("json.tmp");

        let written =
            write_synced(&tmp_path, value).and_then(|()| fs::rename(&tmp_path, &final_path));
        if let Err(e) = written {
            // The previous value is untouched; only the temp file needs removing
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        // Best-effort: the rename already succeeded, so the value is consistent
        // even if the directory fsync fails.
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(key) = name_str.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_backend_round_trip() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        backend.set("am_urls", r#"[{"code":"abc"}]"#).unwrap();

        assert_eq!(
            backend.get("am_urls").unwrap().as_deref(),
            Some(r#"[{"code":"abc"}]"#)
        );
        assert!(dir.path().join("am_urls.json").exists());
        assert!(!dir.path().join("am_urls.json.tmp").exists());
    }

    #[test]
    fn file_backend_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(backend.get("nothing_here").unwrap(), None);
    }

    #[test]
    fn file_backend_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("store");

        let backend = FileBackend::open(&nested).unwrap();
        backend.set("am_logs", "[]").unwrap();

        assert!(nested.join("am_logs.json").exists());
        assert_eq!(backend.dir(), nested.as_path());
    }

    #[test]
    fn file_backend_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        for key in ["../escape", "a/b", "", ".hidden"] {
            assert!(
                matches!(backend.set(key, "x"), Err(BackendError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn file_backend_remove_and_keys() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        backend.set("am_urls", "[]").unwrap();
        backend.set("am_clicks", "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(backend.keys().unwrap(), vec!["am_clicks", "am_urls"]);

        backend.remove("am_urls").unwrap();
        backend.remove("am_urls").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["am_clicks"]);
    }

    #[test]
    fn failed_set_removes_temp_file_and_keeps_target() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        // A non-empty directory where the value file should go makes the rename fail
        let blocker = dir.path().join("am_urls.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        assert!(matches!(
            backend.set("am_urls", "[]"),
            Err(BackendError::Io(_))
        ));
        assert!(!dir.path().join("am_urls.json.tmp").exists());
        assert!(blocker.join("keep").exists());
    }

    #[test]
    fn file_backend_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let backend = FileBackend::open(dir.path()).unwrap();
            backend.set("am_clicks", "[1,2,3]").unwrap();
        }

        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.get("am_clicks").unwrap().as_deref(), Some("[1,2,3]"));
    }
}
