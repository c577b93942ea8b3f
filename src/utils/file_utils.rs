use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Files in `dir` with the given extension, sorted by name. An empty result is not an error.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == extension)
        })
        .collect();

    files.sort();
    Ok(files)
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))
}

/// Write through a sibling temp file and rename, so readers never see a half-written file.
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data).with_context(|| format!("Failed to write file: {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {:?} to {:?}", tmp, path))
}

/// `<dir>/<stem>.<extension>`
pub fn named_file(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, extension))
}
