//! Built-in zoo datasets that are shipped as prepackaged archives.

pub mod quickstart;
pub mod registry;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::ZooError;
use crate::fs_util;
use crate::remote::RemoteFileClient;

pub use quickstart::QuickstartDataset;
pub use registry::ZooRegistry;

pub const METADATA_FILE: &str = "metadata.json";
pub const DATA_DIR: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// Directory with a `data/` folder of samples and an optional `metadata.json`.
    Native,
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetFormat::Native => write!(f, "native"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub format: DatasetFormat,
    pub num_samples: usize,
    pub classes: Option<Vec<String>>,
}

pub trait ZooDataset: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_splits(&self) -> Option<&'static [&'static str]> {
        None
    }

    /// Materializes the dataset into `dataset_dir`, using `scratch_dir` for
    /// intermediate downloads.
    fn download_and_prepare(
        &self,
        dataset_dir: &Path,
        scratch_dir: &Path,
        remote: &dyn RemoteFileClient,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetDescriptor, ZooError>;
}

/// Downloads the Drive archive `file_id`, unpacks it into `dataset_dir` and
/// describes what landed there.
pub fn prepare_drive_archive(
    name: &str,
    file_id: &str,
    dataset_dir: &Path,
    scratch_dir: &Path,
    remote: &dyn RemoteFileClient,
    sink: &dyn ProgressSink,
) -> Result<DatasetDescriptor, ZooError> {
    fs::create_dir_all(scratch_dir).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    fs::create_dir_all(dataset_dir).map_err(|err| ZooError::Filesystem(err.to_string()))?;

    let zip_path = scratch_dir.join(format!("{name}.zip"));
    sink.event(ProgressEvent {
        message: format!("phase=Fetch; downloading {name} to {}", zip_path.display()),
        elapsed: None,
    });
    tracing::info!(dataset = name, path = %zip_path.display(), "downloading dataset");
    let start = std::time::Instant::now();
    remote.download_drive_file(file_id, &zip_path)?;
    sink.event(ProgressEvent {
        message: "remote.response".to_string(),
        elapsed: Some(start.elapsed()),
    });
    if !zip_path.exists() {
        return Err(ZooError::Download(format!(
            "download produced no archive at {}",
            zip_path.display()
        )));
    }

    sink.event(ProgressEvent {
        message: format!("phase=Extract; extracting to {}", dataset_dir.display()),
        elapsed: None,
    });
    tracing::info!(dataset = name, dir = %dataset_dir.display(), "extracting dataset");
    fs_util::extract_zip_and_delete(&zip_path, dataset_dir)?;
    if !dataset_dir.join(DATA_DIR).exists() && fs_util::hoist_single_root(dataset_dir)? {
        tracing::debug!(dataset = name, "flattened nested archive root");
    }

    sink.event(ProgressEvent {
        message: "phase=Scan; parsing dataset metadata".to_string(),
        elapsed: None,
    });
    let classes = read_classes(dataset_dir);
    let num_samples = fs_util::count_files(&dataset_dir.join(DATA_DIR))?;
    tracing::info!(dataset = name, num_samples, "found samples");

    Ok(DatasetDescriptor {
        name: name.to_string(),
        format: DatasetFormat::Native,
        num_samples,
        classes,
    })
}

/// Class list from `metadata.json`, if the file exists and is well formed.
pub fn read_classes(dataset_dir: &Path) -> Option<Vec<String>> {
    let path = dataset_dir.join(METADATA_FILE);
    if !path.is_file() {
        return None;
    }
    let parsed = fs::read_to_string(&path)
        .map_err(|err| ZooError::MetadataParse(err.to_string()))
        .and_then(|content| parse_classes(&content));
    match parsed {
        Ok(classes) => classes,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring dataset metadata");
            None
        }
    }
}

pub fn parse_classes(content: &str) -> Result<Option<Vec<String>>, ZooError> {
    let metadata: Value =
        serde_json::from_str(content).map_err(|err| ZooError::MetadataParse(err.to_string()))?;
    let Some(classes) = metadata.get("info").and_then(|info| info.get("classes")) else {
        return Ok(None);
    };
    if classes.is_null() {
        return Ok(None);
    }
    let classes = classes
        .as_array()
        .ok_or_else(|| ZooError::MetadataParse("info.classes is not an array".to_string()))?;
    classes
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(|value| value.to_string())
                .ok_or_else(|| ZooError::MetadataParse(format!("non-string class: {value}")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
