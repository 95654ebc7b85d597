use std::fs;
use std::io;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::ZooError;
use crate::zoo::{DatasetDescriptor, DatasetFormat};

pub const ZOO_DIR_ENV: &str = "DATASET_ZOO_DIR";

#[derive(Debug, Clone)]
pub struct Store {
    zoo_root: Utf8PathBuf,
}

impl Store {
    /// Resolves the zoo root from `DATASET_ZOO_DIR`, falling back to
    /// `~/.cache/dataset-zoo`.
    pub fn new() -> Result<Self, ZooError> {
        if let Ok(dir) = std::env::var(ZOO_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Ok(Self::new_with_root(Utf8PathBuf::from(dir.trim())));
            }
        }

        let zoo_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("dataset-zoo")).ok()
            })
            .ok_or_else(|| ZooError::Filesystem("unable to resolve zoo directory".to_string()))?;
        Ok(Self { zoo_root })
    }

    pub fn new_with_root(zoo_root: Utf8PathBuf) -> Self {
        Self { zoo_root }
    }

    pub fn zoo_root(&self) -> &Utf8Path {
        &self.zoo_root
    }

    pub fn dataset_dir(&self, name: &str) -> Utf8PathBuf {
        self.zoo_root.join(name)
    }

    pub fn info_path(&self, name: &str) -> Utf8PathBuf {
        self.zoo_root.join("metadata").join(format!("{name}.json"))
    }

    pub fn ensure_zoo_root(&self) -> Result<(), ZooError> {
        fs::create_dir_all(self.zoo_root.as_std_path())
            .map_err(|err| ZooError::Filesystem(err.to_string()))
    }

    pub fn is_downloaded(&self, name: &str) -> bool {
        self.dataset_dir(name).as_std_path().is_dir() && self.info_path(name).as_std_path().is_file()
    }

    pub fn read_info(&self, name: &str) -> Result<Option<ZooDatasetInfo>, ZooError> {
        let path = self.info_path(name);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        let info = serde_json::from_str(&content)
            .map_err(|err| ZooError::Filesystem(format!("{path}: {err}")))?;
        Ok(Some(info))
    }

    pub fn write_info(&self, info: &ZooDatasetInfo) -> Result<(), ZooError> {
        let path = self.info_path(&info.name);
        let content = serde_json::to_vec_pretty(info)
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)
    }

    /// Removes a dataset and its info file. Returns whether anything existed.
    pub fn remove_dataset(&self, name: &str) -> Result<bool, ZooError> {
        let dir = self.dataset_dir(name);
        let info = self.info_path(name);
        let mut removed = false;
        if dir.as_std_path().exists() {
            fs::remove_dir_all(dir.as_std_path())
                .map_err(|err| ZooError::Filesystem(err.to_string()))?;
            removed = true;
        }
        if info.as_std_path().exists() {
            fs::remove_file(info.as_std_path())
                .map_err(|err| ZooError::Filesystem(err.to_string()))?;
            removed = true;
        }
        Ok(removed)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ZooError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn list_info(&self) -> Result<Vec<ZooDatasetInfo>, ZooError> {
        let metadata_root = self.zoo_root.join("metadata");
        if !metadata_root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(metadata_root.as_std_path())
            .map_err(|err| ZooError::Filesystem(err.to_string()))?
        {
            let path = entry
                .map_err(|err| ZooError::Filesystem(err.to_string()))?
                .path();
            if path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)
                    .map_err(|err| ZooError::Filesystem(err.to_string()))?;
                let info: ZooDatasetInfo = serde_json::from_str(&content)
                    .map_err(|err| ZooError::Filesystem(err.to_string()))?;
                entries.push(info);
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZooDatasetInfo {
    pub name: String,
    pub format: DatasetFormat,
    pub num_samples: usize,
    pub classes: Option<Vec<String>>,
    pub dataset_dir: String,
    pub downloaded_at: String,
    pub tool: String,
}

impl ZooDatasetInfo {
    pub fn new(descriptor: DatasetDescriptor, dataset_dir: &Utf8Path) -> Self {
        Self {
            name: descriptor.name,
            format: descriptor.format,
            num_samples: descriptor.num_samples,
            classes: descriptor.classes,
            dataset_dir: dataset_dir.to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: crate::http::user_agent(),
        }
    }

    pub fn descriptor(&self) -> DatasetDescriptor {
        DatasetDescriptor {
            name: self.name.clone(),
            format: self.format,
            num_samples: self.num_samples,
            classes: self.classes.clone(),
        }
    }
}

pub fn atomic_rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_root(Utf8PathBuf::from("/tmp/zoo"));
        assert!(store.dataset_dir("quickstart").ends_with("zoo/quickstart"));
        assert!(
            store
                .info_path("quickstart")
                .ends_with("metadata/quickstart.json")
        );
    }
}
