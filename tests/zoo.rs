use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use zip::write::SimpleFileOptions;

use dataset_zoo::app::{ProgressEvent, ProgressSink};
use dataset_zoo::error::ZooError;
use dataset_zoo::remote::RemoteFileClient;
use dataset_zoo::zoo::{DatasetFormat, QuickstartDataset, ZooDataset, ZooRegistry};

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

/// Serves a generated archive for every Drive download.
struct MockRemote {
    prefix: &'static str,
    samples: usize,
    metadata: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    fn new(samples: usize, metadata: Option<&'static str>) -> Self {
        Self {
            prefix: "",
            samples,
            metadata,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RemoteFileClient for MockRemote {
    fn download_drive_file(&self, file_id: &str, destination: &Path) -> Result<(), ZooError> {
        self.calls.lock().unwrap().push(file_id.to_string());
        write_archive(destination, self.prefix, self.samples, self.metadata);
        Ok(())
    }

    fn download_url(&self, url: &str, _destination: &Path) -> Result<(), ZooError> {
        Err(ZooError::Download(format!("unexpected url {url}")))
    }
}

struct FailingRemote;

impl RemoteFileClient for FailingRemote {
    fn download_drive_file(&self, file_id: &str, _destination: &Path) -> Result<(), ZooError> {
        Err(ZooError::Download(format!("connection reset fetching {file_id}")))
    }

    fn download_url(&self, url: &str, _destination: &Path) -> Result<(), ZooError> {
        Err(ZooError::Download(format!("unexpected url {url}")))
    }
}

/// Writes an HTML page where the archive should be.
struct CorruptRemote;

impl RemoteFileClient for CorruptRemote {
    fn download_drive_file(&self, _file_id: &str, destination: &Path) -> Result<(), ZooError> {
        fs::write(destination, b"<html>quota exceeded</html>").unwrap();
        Ok(())
    }

    fn download_url(&self, url: &str, _destination: &Path) -> Result<(), ZooError> {
        Err(ZooError::Download(format!("unexpected url {url}")))
    }
}

fn write_archive(path: &Path, prefix: &str, samples: usize, metadata: Option<&str>) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for i in 0..samples {
        writer
            .start_file(format!("{prefix}data/{i:03}.jpg"), options)
            .unwrap();
        writer.write_all(&[0xFF, 0xD8, i as u8]).unwrap();
    }
    if let Some(metadata) = metadata {
        writer
            .start_file(format!("{prefix}metadata.json"), options)
            .unwrap();
        writer.write_all(metadata.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn quickstart_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let dataset_dir = dir.path().join("quickstart");
    let scratch_dir = dir.path().join("scratch");
    let remote = MockRemote::new(37, None);

    let descriptor = QuickstartDataset
        .download_and_prepare(&dataset_dir, &scratch_dir, &remote, &NoopSink)
        .unwrap();

    assert_eq!(descriptor.name, "quickstart");
    assert_eq!(descriptor.format, DatasetFormat::Native);
    assert_eq!(descriptor.num_samples, 37);
    assert_eq!(descriptor.classes, None);
    assert_eq!(
        *remote.calls.lock().unwrap(),
        vec!["1Clg45_r7ApaSypqs9X-UzFezvnfHd5Db".to_string()]
    );
    assert!(!scratch_dir.join("quickstart.zip").exists());
    assert!(dataset_dir.join("data").join("000.jpg").is_file());
}

#[test]
fn quickstart_reads_classes_from_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MockRemote::new(37, Some(r#"{"info": {"classes": ["a", "b"]}}"#));

    let descriptor = QuickstartDataset
        .download_and_prepare(
            &dir.path().join("ds"),
            &dir.path().join("scratch"),
            &remote,
            &NoopSink,
        )
        .unwrap();

    assert_eq!(descriptor.num_samples, 37);
    assert_eq!(
        descriptor.classes,
        Some(vec!["a".to_string(), "b".to_string()])
    );
}

#[test]
fn malformed_metadata_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MockRemote::new(4, Some("{not json"));

    let descriptor = QuickstartDataset
        .download_and_prepare(
            &dir.path().join("ds"),
            &dir.path().join("scratch"),
            &remote,
            &NoopSink,
        )
        .unwrap();

    assert_eq!(descriptor.num_samples, 4);
    assert_eq!(descriptor.classes, None);
}

#[test]
fn nested_archive_root_is_flattened() {
    let dir = tempfile::tempdir().unwrap();
    let dataset_dir = dir.path().join("ds");
    let mut remote = MockRemote::new(5, Some(r#"{"info": {"classes": ["x"]}}"#));
    remote.prefix = "quickstart/";

    let descriptor = QuickstartDataset
        .download_and_prepare(&dataset_dir, &dir.path().join("scratch"), &remote, &NoopSink)
        .unwrap();

    assert_eq!(descriptor.num_samples, 5);
    assert_eq!(descriptor.classes, Some(vec!["x".to_string()]));
    assert!(dataset_dir.join("data").is_dir());
    assert!(!dataset_dir.join("quickstart").exists());
}

#[test]
fn archive_without_data_dir_has_no_samples() {
    let dir = tempfile::tempdir().unwrap();
    let dataset_dir = dir.path().join("ds");
    let scratch_dir = dir.path().join("scratch");
    fs::create_dir_all(&scratch_dir).unwrap();
    let remote = MockRemote::new(0, Some(r#"{"info": {}}"#));

    let descriptor = QuickstartDataset
        .download_and_prepare(&dataset_dir, &scratch_dir, &remote, &NoopSink)
        .unwrap();

    assert_eq!(descriptor.num_samples, 0);
    assert_eq!(descriptor.classes, None);
}

#[test]
fn download_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = QuickstartDataset.download_and_prepare(
        &dir.path().join("ds"),
        &dir.path().join("scratch"),
        &FailingRemote,
        &NoopSink,
    );
    assert_matches!(
        result,
        Err(ZooError::Download(message)) if message.contains("connection reset")
    );
}

#[test]
fn corrupt_archive_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let dataset_dir = dir.path().join("ds");
    let result = QuickstartDataset.download_and_prepare(
        &dataset_dir,
        &dir.path().join("scratch"),
        &CorruptRemote,
        &NoopSink,
    );
    assert_matches!(result, Err(ZooError::Extraction(_)));
    assert!(!dataset_dir.join("data").exists());
}

#[test]
fn hidden_files_in_data_are_not_samples() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MockRemote::new(3, None);
    let dataset_dir = dir.path().join("ds");
    let scratch_dir = dir.path().join("scratch");
    fs::create_dir_all(&scratch_dir).unwrap();

    QuickstartDataset
        .download_and_prepare(&dataset_dir, &scratch_dir, &remote, &NoopSink)
        .unwrap();
    fs::write(dataset_dir.join("data").join(".DS_Store"), b"x").unwrap();

    assert_eq!(
        dataset_zoo::fs_util::count_files(&dataset_dir.join("data")).unwrap(),
        3
    );
}

#[test]
fn registry_lookup() {
    let registry = ZooRegistry::builtin().unwrap();
    assert_eq!(registry.get("quickstart").unwrap().name(), "quickstart");
    assert!(registry.contains("quickstart"));
    assert_eq!(registry.names(), vec!["quickstart"]);
    assert_matches!(
        registry.get("nonexistent").err(),
        Some(ZooError::UnknownDataset(name)) if name == "nonexistent"
    );
}

#[test]
fn registry_rejects_duplicates() {
    let mut registry = ZooRegistry::builtin().unwrap();
    assert_matches!(
        registry.register(Box::new(QuickstartDataset)),
        Err(ZooError::DuplicateDataset(name)) if name == "quickstart"
    );
    assert_eq!(registry.names().len(), 1);
}
