use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::ZooError;

pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), ZooError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| ZooError::Extraction(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive = ZipArchive::new(file).map_err(|err| ZooError::Extraction(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| ZooError::Extraction(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(ZooError::Extraction(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| ZooError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| ZooError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            fs::File::create(&entry_path).map_err(|err| ZooError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| ZooError::Extraction(err.to_string()))?;
    }
    Ok(())
}

/// Extracts `zip_path` into `target_dir` and removes the archive once every
/// entry has been written.
pub fn extract_zip_and_delete(zip_path: &Path, target_dir: &Path) -> Result<(), ZooError> {
    extract_zip(zip_path, target_dir)?;
    fs::remove_file(zip_path).map_err(|err| ZooError::Filesystem(err.to_string()))
}

/// Moves the contents of a lone top-level directory up into `root`.
///
/// Returns `true` when a directory was hoisted.
pub fn hoist_single_root(root: &Path) -> Result<bool, ZooError> {
    let entries = fs::read_dir(root)
        .map_err(|err| ZooError::Filesystem(err.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ZooError::Filesystem(err.to_string()))?;
    let [entry] = entries.as_slice() else {
        return Ok(false);
    };
    let nested = entry.path();
    if !nested.is_dir() || entry.file_name() == "data" {
        return Ok(false);
    }

    let children = fs::read_dir(&nested)
        .map_err(|err| ZooError::Filesystem(err.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ZooError::Filesystem(err.to_string()))?;
    // A child sharing the wrapper's name cannot be moved over it.
    if children
        .iter()
        .any(|child| child.file_name() == entry.file_name())
    {
        return Ok(false);
    }

    for child in children {
        fs::rename(child.path(), root.join(child.file_name()))
            .map_err(|err| ZooError::Filesystem(err.to_string()))?;
    }
    fs::remove_dir(&nested).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    Ok(true)
}

/// Counts regular, non-hidden files directly under `dir`. A missing directory
/// holds zero files.
pub fn count_files(dir: &Path) -> Result<usize, ZooError> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir).map_err(|err| ZooError::Filesystem(err.to_string()))? {
        let entry = entry.map_err(|err| ZooError::Filesystem(err.to_string()))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Creates `dir` if needed, failing when it already holds anything.
pub fn ensure_empty_dir(dir: &Path) -> Result<(), ZooError> {
    if dir.exists() {
        let mut entries = fs::read_dir(dir).map_err(|err| ZooError::Filesystem(err.to_string()))?;
        if entries.next().is_some() {
            return Err(ZooError::DirectoryNotEmpty(dir.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|err| ZooError::Filesystem(err.to_string()))
}
