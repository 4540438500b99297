use crate::config::Settings;
use crate::error::{CatalogError, CatalogResult};
use std::path::{Path, PathBuf};

/// Normalizes a client-supplied catalog-relative path. Separators are
/// unified to `/`, leading and trailing separators are trimmed, and empty,
/// `.`, `..` and absolute forms are rejected. The empty string maps to the
/// catalog root (the implicit uncategorized area).
pub fn sanitize_relative(raw: &str) -> CatalogResult<PathBuf> {
    let normalized = raw.replace('\\', "/");
    let trimmed = normalized.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(PathBuf::new());
    }

    let mut rel = PathBuf::new();
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(CatalogError::InvalidPath(raw.to_string()));
        }
        rel.push(segment);
    }

    if rel.is_absolute() {
        return Err(CatalogError::InvalidPath(raw.to_string()));
    }

    Ok(rel)
}

/// Like `sanitize_relative`, but the root itself is not an acceptable
/// answer.
pub fn sanitize_non_empty(raw: &str) -> CatalogResult<PathBuf> {
    let rel = sanitize_relative(raw)?;
    if rel.as_os_str().is_empty() {
        return Err(CatalogError::InvalidPath(raw.to_string()));
    }
    Ok(rel)
}

/// Joins a sanitized relative path under the catalog root. Lexical only;
/// safe because `sanitize_relative` admits no escaping segments. Used for
/// destinations that need not exist yet.
pub fn resolve_target(settings: &Settings, rel: &Path) -> PathBuf {
    if rel.as_os_str().is_empty() {
        settings.media_root_canon.clone()
    } else {
        settings.media_root_canon.join(rel)
    }
}

/// Resolves a client-supplied media file path to its on-disk location.
/// The extension must be allow-listed, the file must exist, and its
/// canonical form must stay under the catalog root.
pub async fn resolve_existing_file(settings: &Settings, raw: &str) -> CatalogResult<PathBuf> {
    let rel = sanitize_non_empty(raw)?;
    let name = rel
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CatalogError::InvalidPath(raw.to_string()))?;
    if !settings.is_allowed_file(name) {
        return Err(CatalogError::DisallowedExtension(name.to_string()));
    }

    let full = resolve_target(settings, &rel);
    let canon = tokio::fs::canonicalize(&full)
        .await
        .map_err(|_| CatalogError::NotFound(raw.to_string()))?;
    if !canon.starts_with(&settings.media_root_canon) {
        return Err(CatalogError::InvalidPath(raw.to_string()));
    }

    Ok(canon)
}

/// Resolves an existing category directory, canonicalized and contained.
pub async fn resolve_existing_dir(settings: &Settings, rel: &Path) -> CatalogResult<PathBuf> {
    let full = resolve_target(settings, rel);
    let canon = tokio::fs::canonicalize(&full)
        .await
        .map_err(|_| CatalogError::NotFound(rel.to_string_lossy().to_string()))?;
    if !canon.starts_with(&settings.media_root_canon) {
        return Err(CatalogError::InvalidPath(rel.to_string_lossy().to_string()));
    }
    let meta = tokio::fs::metadata(&canon)
        .await
        .map_err(|_| CatalogError::NotFound(rel.to_string_lossy().to_string()))?;
    if !meta.is_dir() {
        return Err(CatalogError::NotFound(rel.to_string_lossy().to_string()));
    }
    Ok(canon)
}

pub fn rel_to_string(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
