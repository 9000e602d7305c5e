use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tempbuddy_common::storage::{BlockStore, StoreError};

/// Settings block kept in a single file under the data directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous block readable.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }
}

impl BlockStore for FileStore {
    fn read(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(raw) if raw.is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, block: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, block)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn wipe(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempbuddy_common::settings::SettingsStore;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tempbuddy-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_reads_as_blank() {
        let dir = scratch_dir("missing");
        let mut store = FileStore::new(dir.join("settings.bin"));

        assert_eq!(store.read().expect("read"), None);
        store.wipe().expect("wipe of missing file");
    }

    #[test]
    fn write_then_read_back() {
        let dir = scratch_dir("write");
        let mut store = FileStore::new(dir.join("nested").join("settings.bin"));

        store.write(&[1, 2, 3]).expect("write");
        assert_eq!(store.read().expect("read"), Some(vec![1, 2, 3]));
        assert!(!store.staging_path().exists());

        store.wipe().expect("wipe");
        assert_eq!(store.read().expect("read"), None);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn settings_survive_reopen() {
        let dir = scratch_dir("reopen");
        let path = dir.join("settings.bin");

        let mut settings = SettingsStore::new(FileStore::new(&path));
        assert!(!settings.load().expect("first load"));
        settings.set_title("Greenhouse");
        settings.save().expect("save");

        let mut reopened = SettingsStore::new(FileStore::new(&path));
        assert!(reopened.load().expect("second load"));
        assert_eq!(reopened.title(), "Greenhouse");

        let mut raw = fs::read(&path).expect("raw block");
        raw[20] ^= 0xFF;
        fs::write(&path, raw).expect("corrupt");

        let mut corrupted = SettingsStore::new(FileStore::new(&path));
        assert!(!corrupted.load().expect("third load"));
        assert!(corrupted.is_factory_default());
        let _ = fs::remove_dir_all(&dir);
    }
}
