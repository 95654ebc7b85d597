//! Materializes a labeled image collection as `{fine_label}/{i}.jpg` files.
//!
//! Roughly one position in twenty is deliberately filled with a randomly
//! chosen sample instead of its own, so positional labels are only
//! trustworthy for the positions missing from [`ConversionReport::resampled`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::app::{ProgressEvent, ProgressSink};
use crate::cifar::{LabeledSample, Split};
use crate::error::ZooError;
use crate::fs_util::ensure_empty_dir;
use crate::taxonomy;

pub const DEFAULT_NOISE_RATE: f64 = 0.05;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// What to do when a resampling draw lands on index `len`, one past the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexOverflow {
    /// Use the last sample instead.
    #[default]
    Clamp,
    /// Abort the conversion.
    Fail,
    /// Draw from `[0, len)` so the overflow never happens.
    Exclusive,
}

impl fmt::Display for IndexOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOverflow::Clamp => write!(f, "clamp"),
            IndexOverflow::Fail => write!(f, "fail"),
            IndexOverflow::Exclusive => write!(f, "exclusive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub split: Split,
    pub noise_rate: f64,
    pub index_overflow: IndexOverflow,
    pub seed: Option<u64>,
    pub jpeg_quality: u8,
    pub write_label_files: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            split: Split::Test,
            noise_rate: DEFAULT_NOISE_RATE,
            index_overflow: IndexOverflow::Clamp,
            seed: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            write_label_files: false,
        }
    }
}

impl ConvertOptions {
    pub fn validate(&self) -> Result<(), ZooError> {
        if !(0.0..=1.0).contains(&self.noise_rate) {
            return Err(ZooError::InvalidOption(format!(
                "noise rate must be within [0, 1], got {}",
                self.noise_rate
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ZooError::InvalidOption(format!(
                "jpeg quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Positional(usize),
    Resampled { source: usize, clamped: bool },
}

impl Selection {
    pub fn source(self) -> usize {
        match self {
            Selection::Positional(index) => index,
            Selection::Resampled { source, .. } => source,
        }
    }
}

pub struct IndexSelector<R: Rng> {
    rng: R,
    threshold: f64,
    overflow: IndexOverflow,
}

impl<R: Rng> IndexSelector<R> {
    pub fn new(rng: R, noise_rate: f64, overflow: IndexOverflow) -> Self {
        Self {
            rng,
            threshold: 1.0 - noise_rate,
            overflow,
        }
    }

    /// Picks the sample that fills `position` in a collection of `len` samples.
    pub fn select(&mut self, position: usize, len: usize) -> Result<Selection, ZooError> {
        let draw: f64 = self.rng.random();
        if draw <= self.threshold {
            return Ok(Selection::Positional(position));
        }

        let candidate = match self.overflow {
            IndexOverflow::Exclusive => self.rng.random_range(0..len),
            IndexOverflow::Clamp | IndexOverflow::Fail => self.rng.random_range(0..=len),
        };
        if candidate < len {
            return Ok(Selection::Resampled {
                source: candidate,
                clamped: false,
            });
        }
        match self.overflow {
            IndexOverflow::Fail => Err(ZooError::SampleIndexOutOfRange {
                index: candidate,
                len,
            }),
            _ => {
                tracing::warn!(position, index = candidate, len, "clamping out of range draw");
                Ok(Selection::Resampled {
                    source: len - 1,
                    clamped: true,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resample {
    pub position: usize,
    pub source: usize,
    pub clamped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub data_dir: String,
    pub split: Split,
    pub samples: usize,
    pub written: usize,
    pub resampled: Vec<Resample>,
    pub label_files: Vec<String>,
}

impl ConversionReport {
    pub fn clamped(&self) -> usize {
        self.resampled.iter().filter(|item| item.clamped).count()
    }
}

pub fn image_rel_path(fine_label: &str, position: usize) -> PathBuf {
    Path::new(fine_label).join(format!("{position}.jpg"))
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ZooError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode_image(image)
        .map_err(|err| ZooError::ImageEncode(err.to_string()))?;
    Ok(buffer.into_inner())
}

/// Writes every position of `samples` below `data_dir`.
///
/// `data_dir` must be empty or absent; nothing is written otherwise.
pub fn convert<R: Rng>(
    samples: &[LabeledSample],
    data_dir: &Path,
    options: &ConvertOptions,
    rng: R,
    sink: &dyn ProgressSink,
) -> Result<ConversionReport, ZooError> {
    options.validate()?;
    ensure_empty_dir(data_dir)?;

    let len = samples.len();
    let mut selector = IndexSelector::new(rng, options.noise_rate, options.index_overflow);
    let mut resampled = Vec::new();
    let mut fine_labels = BTreeMap::new();
    let mut coarse_labels = BTreeMap::new();
    let progress_step = (len / 20).max(1);

    sink.event(ProgressEvent {
        message: format!("phase=Convert; writing {len} images to {}", data_dir.display()),
        elapsed: None,
    });
    let start = std::time::Instant::now();

    for position in 0..len {
        let selection = selector.select(position, len)?;
        let source = selection.source();
        if let Selection::Resampled { clamped, .. } = selection {
            resampled.push(Resample {
                position,
                source,
                clamped,
            });
        }

        let sample = &samples[source];
        let fine = taxonomy::fine_label(sample.fine_label)
            .ok_or(ZooError::UnknownLabel(sample.fine_label))?;

        let path = data_dir.join(image_rel_path(fine, position));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ZooError::Filesystem(err.to_string()))?;
        }
        let bytes = encode_jpeg(&sample.image, options.jpeg_quality)?;
        fs::write(&path, bytes).map_err(|err| ZooError::Filesystem(err.to_string()))?;

        if options.write_label_files {
            let coarse = taxonomy::coarse_label(fine)
                .ok_or(ZooError::UnknownLabel(sample.fine_label))?;
            fine_labels.insert(position, fine);
            coarse_labels.insert(position, coarse);
        }

        if (position + 1) % progress_step == 0 {
            sink.event(ProgressEvent {
                message: format!("progress {}/{len}", position + 1),
                elapsed: Some(start.elapsed()),
            });
        }
    }

    let mut label_files = Vec::new();
    if options.write_label_files {
        for (granularity, labels) in [("fine", &fine_labels), ("coarse", &coarse_labels)] {
            let path = data_dir.join(format!("{}_{granularity}.json", options.split));
            let content = serde_json::to_vec_pretty(labels)
                .map_err(|err| ZooError::Filesystem(err.to_string()))?;
            fs::write(&path, content).map_err(|err| ZooError::Filesystem(err.to_string()))?;
            label_files.push(path.display().to_string());
        }
    }

    tracing::info!(
        written = len,
        resampled = resampled.len(),
        dir = %data_dir.display(),
        "conversion finished"
    );

    Ok(ConversionReport {
        data_dir: data_dir.display().to_string(),
        split: options.split,
        samples: len,
        written: len,
        resampled,
        label_files,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn zero_noise_is_positional() {
        let mut selector = IndexSelector::new(StdRng::seed_from_u64(7), 0.0, IndexOverflow::Fail);
        for position in 0..500 {
            assert_eq!(
                selector.select(position, 500).unwrap(),
                Selection::Positional(position)
            );
        }
    }

    #[test]
    fn exclusive_never_overflows() {
        let mut selector =
            IndexSelector::new(StdRng::seed_from_u64(11), 1.0, IndexOverflow::Exclusive);
        for position in 0..200 {
            let selection = selector.select(position, 2).unwrap();
            assert!(selection.source() < 2);
            assert!(!matches!(selection, Selection::Resampled { clamped: true, .. }));
        }
    }

    #[test]
    fn clamp_maps_overflow_to_last() {
        let mut selector = IndexSelector::new(StdRng::seed_from_u64(3), 1.0, IndexOverflow::Clamp);
        let mut saw_clamp = false;
        for position in 0..200 {
            let selection = selector.select(position, 1).unwrap();
            assert_eq!(selection.source(), 0);
            saw_clamp |= matches!(selection, Selection::Resampled { clamped: true, .. });
        }
        assert!(saw_clamp);
    }

    #[test]
    fn default_rate_resamples_about_five_percent() {
        let mut selector = IndexSelector::new(
            StdRng::seed_from_u64(42),
            DEFAULT_NOISE_RATE,
            IndexOverflow::Clamp,
        );
        let n = 20_000;
        let resampled = (0..n)
            .filter(|&i| !matches!(selector.select(i, n).unwrap(), Selection::Positional(_)))
            .count();
        let rate = resampled as f64 / n as f64;
        assert!((0.035..0.065).contains(&rate), "rate {rate}");
    }

    #[test]
    fn options_are_validated() {
        let options = ConvertOptions {
            noise_rate: 1.5,
            ..ConvertOptions::default()
        };
        assert!(matches!(options.validate(), Err(ZooError::InvalidOption(_))));

        let options = ConvertOptions {
            jpeg_quality: 0,
            ..ConvertOptions::default()
        };
        assert!(matches!(options.validate(), Err(ZooError::InvalidOption(_))));
    }
}
