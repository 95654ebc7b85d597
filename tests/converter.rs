use std::fs;

use assert_matches::assert_matches;
use image::{Rgb, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;

use dataset_zoo::app::{ProgressEvent, ProgressSink};
use dataset_zoo::cifar::{LabeledSample, Split};
use dataset_zoo::convert::{self, ConvertOptions, IndexOverflow, encode_jpeg};
use dataset_zoo::error::ZooError;
use dataset_zoo::taxonomy;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

fn sample(seed: u8, fine_label: u8) -> LabeledSample {
    let image = RgbImage::from_fn(32, 32, |x, y| {
        Rgb([
            seed.wrapping_add(x as u8),
            seed.wrapping_mul(3).wrapping_add(y as u8),
            seed ^ (x as u8).wrapping_mul(y as u8),
        ])
    });
    LabeledSample { image, fine_label }
}

fn samples(n: usize) -> Vec<LabeledSample> {
    (0..n).map(|i| sample(i as u8, (i % 100) as u8)).collect()
}

fn options(noise_rate: f64, index_overflow: IndexOverflow) -> ConvertOptions {
    ConvertOptions {
        noise_rate,
        index_overflow,
        seed: Some(1),
        ..ConvertOptions::default()
    }
}

#[test]
fn rejects_non_empty_directory_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("existing.txt"), b"keep").unwrap();

    let result = convert::convert(
        &samples(3),
        dir.path(),
        &options(0.0, IndexOverflow::Clamp),
        StdRng::seed_from_u64(0),
        &NoopSink,
    );

    assert_matches!(result, Err(ZooError::DirectoryNotEmpty(_)));
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn zero_noise_writes_every_position_under_its_label() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let input = samples(12);

    let report = convert::convert(
        &input,
        &data_dir,
        &options(0.0, IndexOverflow::Fail),
        StdRng::seed_from_u64(3),
        &NoopSink,
    )
    .unwrap();

    assert_eq!(report.samples, 12);
    assert_eq!(report.written, 12);
    assert!(report.resampled.is_empty());
    for (position, item) in input.iter().enumerate() {
        let fine = taxonomy::fine_label(item.fine_label).unwrap();
        let path = data_dir.join(fine).join(format!("{position}.jpg"));
        let expected = encode_jpeg(&item.image, ConvertOptions::default().jpeg_quality).unwrap();
        assert_eq!(fs::read(&path).unwrap(), expected, "{}", path.display());
    }
}

#[test]
fn untouched_positions_keep_their_own_image() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let input = samples(200);

    let report = convert::convert(
        &input,
        &data_dir,
        &options(0.3, IndexOverflow::Exclusive),
        StdRng::seed_from_u64(11),
        &NoopSink,
    )
    .unwrap();

    assert!(!report.resampled.is_empty());
    for (position, item) in input.iter().enumerate() {
        let resample = report.resampled.iter().find(|r| r.position == position);
        let source = resample.map(|r| r.source).unwrap_or(position);
        let written = &input[source];
        let fine = taxonomy::fine_label(written.fine_label).unwrap();
        let path = data_dir.join(fine).join(format!("{position}.jpg"));
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes, encode_jpeg(&written.image, 95).unwrap());
        if resample.is_none() {
            assert_eq!(written.fine_label, item.fine_label);
        }
    }
}

#[test]
fn fail_policy_reports_out_of_range_draw() {
    let input = samples(1);
    let mut failed = false;
    for seed in 0..64 {
        let dir = tempfile::tempdir().unwrap();
        let result = convert::convert(
            &input,
            &dir.path().join("data"),
            &options(1.0, IndexOverflow::Fail),
            StdRng::seed_from_u64(seed),
            &NoopSink,
        );
        match result {
            Err(ZooError::SampleIndexOutOfRange { index, len }) => {
                assert_eq!((index, len), (1, 1));
                failed = true;
            }
            Ok(_) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert!(failed);
}

#[test]
fn clamp_and_exclusive_never_fail() {
    let input = samples(1);
    for overflow in [IndexOverflow::Clamp, IndexOverflow::Exclusive] {
        for seed in 0..32 {
            let dir = tempfile::tempdir().unwrap();
            let report = convert::convert(
                &input,
                &dir.path().join("data"),
                &options(1.0, overflow),
                StdRng::seed_from_u64(seed),
                &NoopSink,
            )
            .unwrap();
            assert_eq!(report.written, 1);
            assert!(report.resampled.iter().all(|r| r.source == 0));
            if overflow == IndexOverflow::Exclusive {
                assert_eq!(report.clamped(), 0);
            }
        }
    }
}

#[test]
fn label_files_are_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let mut opts = options(0.0, IndexOverflow::Clamp);
    opts.split = Split::Train;
    opts.write_label_files = true;

    let report = convert::convert(
        &samples(3),
        &data_dir,
        &opts,
        StdRng::seed_from_u64(0),
        &NoopSink,
    )
    .unwrap();

    assert_eq!(report.label_files.len(), 2);
    let fine: serde_json::Value =
        serde_json::from_slice(&fs::read(data_dir.join("train_fine.json")).unwrap()).unwrap();
    let coarse: serde_json::Value =
        serde_json::from_slice(&fs::read(data_dir.join("train_coarse.json")).unwrap()).unwrap();
    assert_eq!(fine["1"], "aquarium_fish");
    assert_eq!(coarse["1"], "fish");

    let plain = tempfile::tempdir().unwrap();
    let report = convert::convert(
        &samples(3),
        &plain.path().join("data"),
        &options(0.0, IndexOverflow::Clamp),
        StdRng::seed_from_u64(0),
        &NoopSink,
    )
    .unwrap();
    assert!(report.label_files.is_empty());
    assert!(!plain.path().join("data").join("test_fine.json").exists());
}

#[test]
fn invalid_options_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = convert::convert(
        &samples(1),
        &dir.path().join("data"),
        &options(1.5, IndexOverflow::Clamp),
        StdRng::seed_from_u64(0),
        &NoopSink,
    );
    assert_matches!(result, Err(ZooError::InvalidOption(_)));
}
