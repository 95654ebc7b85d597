use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::cifar::Cifar100;
use crate::convert::{self, ConversionReport, ConvertOptions};
use crate::error::ZooError;
use crate::fs_util::ensure_empty_dir;
use crate::remote::RemoteFileClient;
use crate::store::{Store, ZooDatasetInfo, atomic_rename_dir};
use crate::zoo::{DatasetDescriptor, ZooRegistry};

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub name: String,
    pub action: String,
    pub dataset_dir: String,
    pub descriptor: Option<DatasetDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableResult {
    pub datasets: Vec<AvailableEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableEntry {
    pub name: String,
    pub downloaded: bool,
    pub supported_splits: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub datasets: Vec<ZooDatasetInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub name: String,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Directory holding (or receiving) the CIFAR-100 binary release.
    pub root: PathBuf,
    pub out: PathBuf,
    pub options: ConvertOptions,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Download,
    Convert,
    List,
    Info,
    Delete,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<R: RemoteFileClient> {
    store: Store,
    registry: ZooRegistry,
    remote: R,
}

impl<R: RemoteFileClient> App<R> {
    pub fn new(store: Store, registry: ZooRegistry, remote: R) -> Self {
        Self {
            store,
            registry,
            remote,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn available(&self) -> AvailableResult {
        let datasets = self
            .registry
            .names()
            .into_iter()
            .filter_map(|name| self.registry.get(name).ok())
            .map(|dataset| AvailableEntry {
                name: dataset.name().to_string(),
                downloaded: self.store.is_downloaded(dataset.name()),
                supported_splits: dataset
                    .supported_splits()
                    .map(|splits| splits.iter().map(|split| split.to_string()).collect()),
            })
            .collect();
        AvailableResult { datasets }
    }

    /// Runs the registered installer for `name` against caller-chosen
    /// directories, bypassing the zoo store.
    pub fn prepare(
        &self,
        name: &str,
        dataset_dir: &Path,
        scratch_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetDescriptor, ZooError> {
        let dataset = self.registry.get(name)?;
        dataset.download_and_prepare(dataset_dir, scratch_dir, &self.remote, sink)
    }

    pub fn download(
        &self,
        name: &str,
        options: DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, ZooError> {
        let dataset = self.registry.get(name)?;
        let name = dataset.name();
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; dataset {name}"),
            elapsed: None,
        });

        let dataset_dir = self.store.dataset_dir(name);
        if !options.force && self.store.is_downloaded(name) {
            sink.event(ProgressEvent {
                message: "phase=Store; already downloaded".to_string(),
                elapsed: None,
            });
            let info = self.store.read_info(name)?;
            return Ok(DownloadResult {
                name: name.to_string(),
                action: "cached".to_string(),
                dataset_dir: dataset_dir.to_string(),
                descriptor: info.map(|info| info.descriptor()),
            });
        }

        if options.dry_run {
            return Ok(DownloadResult {
                name: name.to_string(),
                action: "download".to_string(),
                dataset_dir: dataset_dir.to_string(),
                descriptor: None,
            });
        }

        self.store.ensure_zoo_root()?;
        let scratch = tempfile::Builder::new()
            .prefix("dzoo-scratch")
            .tempdir_in(self.store.zoo_root().as_std_path())
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        let staging_dir = scratch.path().join("stage");
        let download_dir = scratch.path().join("downloads");

        sink.event(ProgressEvent {
            message: "phase=Prepare; preparing download".to_string(),
            elapsed: None,
        });
        let descriptor =
            dataset.download_and_prepare(&staging_dir, &download_dir, &self.remote, sink)?;

        sink.event(ProgressEvent {
            message: format!("phase=Store; moving dataset to {dataset_dir}"),
            elapsed: None,
        });
        atomic_rename_dir(&staging_dir, dataset_dir.as_std_path())
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
        let info = ZooDatasetInfo::new(descriptor.clone(), &dataset_dir);
        self.store.write_info(&info)?;
        tracing::info!(dataset = name, dir = %dataset_dir, "dataset ready");

        Ok(DownloadResult {
            name: name.to_string(),
            action: "download".to_string(),
            dataset_dir: dataset_dir.to_string(),
            descriptor: Some(descriptor),
        })
    }

    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, ZooError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; scanning zoo directory".to_string(),
            elapsed: None,
        });
        Ok(ListResult {
            datasets: self.store.list_info()?,
        })
    }

    pub fn info(&self, name: &str, sink: &dyn ProgressSink) -> Result<ZooDatasetInfo, ZooError> {
        let dataset = self.registry.get(name)?;
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; reading info for {}", dataset.name()),
            elapsed: None,
        });
        self.store
            .read_info(dataset.name())?
            .ok_or_else(|| ZooError::NotDownloaded(dataset.name().to_string()))
    }

    pub fn delete(&self, name: &str, sink: &dyn ProgressSink) -> Result<DeleteResult, ZooError> {
        let dataset = self.registry.get(name)?;
        sink.event(ProgressEvent {
            message: format!("phase=Store; deleting {}", dataset.name()),
            elapsed: None,
        });
        let deleted = self.store.remove_dataset(dataset.name())?;
        Ok(DeleteResult {
            name: dataset.name().to_string(),
            deleted,
        })
    }

    pub fn convert(
        &self,
        request: ConvertRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ConversionReport, ZooError> {
        let ConvertRequest { root, out, options } = request;
        options.validate()?;
        // Fail on a dirty output directory before spending time on a download.
        ensure_empty_dir(&out)?;

        let dataset = Cifar100::load(&root, options.split, &self.remote, sink)?;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        convert::convert(dataset.samples(), &out, &options, rng, sink)
    }
}
