use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use flate2::read::GzDecoder;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::ZooError;
use crate::remote::RemoteFileClient;

const URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz";
const MD5: &str = "03b5dce01913d631647c71ecec9e9cb8";
const ARCHIVE_NAME: &str = "cifar-100-binary.tar.gz";
const TRAIN_FILE: &str = "cifar-100-binary/train.bin";
const TEST_FILE: &str = "cifar-100-binary/test.bin";

pub const IMAGE_SIDE: u32 = 32;
const PIXELS: usize = (IMAGE_SIDE * IMAGE_SIDE) as usize;
const RECORD_LEN: usize = 2 + 3 * PIXELS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    fn file(self) -> &'static str {
        match self {
            Split::Train => TRAIN_FILE,
            Split::Test => TEST_FILE,
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LabeledSample {
    pub image: RgbImage,
    pub fine_label: u8,
}

pub struct Cifar100 {
    samples: Vec<LabeledSample>,
    pub split: Split,
}

impl Cifar100 {
    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    /// Loads `split` from `root`, downloading the binary release when it is
    /// not already unpacked there.
    pub fn load(
        root: &Path,
        split: Split,
        remote: &dyn RemoteFileClient,
        sink: &dyn ProgressSink,
    ) -> Result<Self, ZooError> {
        let root = dataset_root(root);
        let file = root.join(split.file());
        if !file.exists() {
            download_release(&root, remote, sink)?;
        }
        sink.event(ProgressEvent {
            message: format!("phase=Load; reading {}", file.display()),
            elapsed: None,
        });
        let samples = load_bin(&file)?;
        tracing::info!(split = %split, samples = samples.len(), "loaded CIFAR-100");
        Ok(Self { samples, split })
    }
}

pub fn dataset_root(root: &Path) -> PathBuf {
    if root.ends_with("cifar100") {
        root.to_path_buf()
    } else {
        root.join("cifar100")
    }
}

fn download_release(
    root: &Path,
    remote: &dyn RemoteFileClient,
    sink: &dyn ProgressSink,
) -> Result<(), ZooError> {
    fs::create_dir_all(root).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    let archive_path = root.join(ARCHIVE_NAME);

    sink.event(ProgressEvent {
        message: format!("phase=Fetch; downloading {URL}"),
        elapsed: None,
    });
    tracing::info!(url = URL, "downloading CIFAR-100");
    let start = std::time::Instant::now();
    remote.download_url(URL, &archive_path)?;
    sink.event(ProgressEvent {
        message: "remote.response".to_string(),
        elapsed: Some(start.elapsed()),
    });

    sink.event(ProgressEvent {
        message: format!("phase=Verify; checking md5 {MD5}"),
        elapsed: None,
    });
    let compressed =
        fs::read(&archive_path).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    let digest = format!("{:x}", md5::compute(&compressed));
    if digest != MD5 {
        return Err(ZooError::ChecksumMismatch {
            path: archive_path,
            expected: MD5.to_string(),
            actual: digest,
        });
    }

    sink.event(ProgressEvent {
        message: format!("phase=Extract; unpacking into {}", root.display()),
        elapsed: None,
    });
    let decoder = GzDecoder::new(&compressed[..]);
    tar::Archive::new(decoder)
        .unpack(root)
        .map_err(|err| ZooError::Extraction(err.to_string()))?;
    fs::remove_file(&archive_path).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Reads CIFAR-100 binary records: coarse byte, fine byte, then the red,
/// green and blue planes of a 32x32 image.
pub fn load_bin(path: &Path) -> Result<Vec<LabeledSample>, ZooError> {
    let f = File::open(path).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    let len = f
        .metadata()
        .map_err(|err| ZooError::Filesystem(err.to_string()))?
        .len() as usize;
    if len % RECORD_LEN != 0 {
        return Err(ZooError::DatasetFormat(format!(
            "{}: {len} bytes is not a multiple of the {RECORD_LEN} byte record",
            path.display()
        )));
    }
    let num = len / RECORD_LEN;

    let mut r = BufReader::new(f);
    let mut data = Vec::with_capacity(num);
    let mut record = vec![0u8; RECORD_LEN];
    for _ in 0..num {
        r.read_exact(&mut record)
            .map_err(|err| ZooError::DatasetFormat(err.to_string()))?;
        let fine_label = record[1];
        let img_buf = &record[2..];
        let image = RgbImage::from_fn(IMAGE_SIDE, IMAGE_SIDE, |x, y| {
            let offset = y as usize * IMAGE_SIDE as usize + x as usize;
            Rgb([
                img_buf[offset],
                img_buf[PIXELS + offset],
                img_buf[2 * PIXELS + offset],
            ])
        });
        data.push(LabeledSample { image, fine_label });
    }
    Ok(data)
}
