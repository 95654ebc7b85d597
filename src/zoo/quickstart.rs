use std::path::Path;

use crate::app::ProgressSink;
use crate::error::ZooError;
use crate::remote::RemoteFileClient;

use super::{DatasetDescriptor, ZooDataset, prepare_drive_archive};

/// A small detection dataset with ground truth boxes and model predictions,
/// drawn from the COCO-2017 validation split.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickstartDataset;

impl QuickstartDataset {
    pub const NAME: &'static str = "quickstart";
    pub const DRIVE_ID: &'static str = "1Clg45_r7ApaSypqs9X-UzFezvnfHd5Db";
}

impl ZooDataset for QuickstartDataset {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn download_and_prepare(
        &self,
        dataset_dir: &Path,
        scratch_dir: &Path,
        remote: &dyn RemoteFileClient,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetDescriptor, ZooError> {
        prepare_drive_archive(
            Self::NAME,
            Self::DRIVE_ID,
            dataset_dir,
            scratch_dir,
            remote,
            sink,
        )
    }
}
