use crate::error::{CatalogError, CatalogResult};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Strips any directory components from a client-supplied file name and
/// rejects names without a usable stem.
pub fn sanitize_file_name(raw: &str) -> CatalogResult<String> {
    let safe = Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CatalogError::InvalidPath(raw.to_string()))?;

    if safe != raw
        || Path::new(safe)
            .file_stem()
            .map(|stem| stem.is_empty())
            .unwrap_or(true)
    {
        return Err(CatalogError::InvalidPath(raw.to_string()));
    }

    Ok(safe.to_string())
}

/// The deterministic collision sequence: `photo.jpg`, `photo_1.jpg`,
/// `photo_2.jpg`, ...
pub fn numbered(name: &str, counter: u32) -> String {
    if counter == 0 {
        return name.to_string();
    }
    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    match Path::new(name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}_{counter}.{ext}"),
        None => format!("{stem}_{counter}"),
    }
}

/// An exclusively-created hidden scratch file inside the destination
/// directory. Hidden names keep in-flight uploads out of listings, and
/// same-directory placement keeps the final link on one filesystem.
pub struct ScratchFile {
    pub file: tokio::fs::File,
    pub path: PathBuf,
}

pub async fn open_scratch(dir: &Path, name: &str) -> CatalogResult<ScratchFile> {
    let mut counter = 0u32;
    loop {
        let scratch_name = format!(".{}.{counter}.part", name);
        let path = dir.join(scratch_name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok(ScratchFile { file, path }),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Publishes a finished scratch file under the first free name in the
/// collision sequence and removes the scratch. `hard_link` refuses to
/// replace an existing file, so two uploads racing to the same name settle
/// on distinct final names without a lock, and a crash before this point
/// leaves nothing visible under a final name.
pub async fn commit_scratch(dir: &Path, scratch: &Path, desired: &str) -> CatalogResult<String> {
    let mut counter = 0u32;
    let stored = loop {
        let candidate = numbered(desired, counter);
        match tokio::fs::hard_link(scratch, dir.join(&candidate)).await {
            Ok(()) => break candidate,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(err) => {
                let _ = tokio::fs::remove_file(scratch).await;
                return Err(err.into());
            }
        }
    };
    tokio::fs::remove_file(scratch).await?;
    Ok(stored)
}

/// Removes a scratch file after a failed upload.
pub async fn discard_scratch(scratch: &mut ScratchFile) {
    let _ = scratch.file.flush().await;
    let _ = tokio::fs::remove_file(&scratch.path).await;
}
