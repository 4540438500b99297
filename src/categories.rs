use crate::config::Settings;
use crate::error::{CatalogError, CatalogResult};
use crate::paths;
use serde::Serialize;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub path: String,
}

impl Category {
    fn from_rel(rel: &Path) -> Self {
        Category {
            name: rel
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: paths::rel_to_string(rel),
        }
    }

    /// The implicit pseudo-category backed by the catalog root itself.
    pub fn uncategorized() -> Self {
        Category {
            name: "Uncategorized".to_string(),
            path: String::new(),
        }
    }
}

/// Walks the catalog tree and reports every directory as a category,
/// ordered by path, with the implicit uncategorized entry first.
pub async fn list(settings: &Settings) -> CatalogResult<Vec<Category>> {
    let mut found = Vec::new();

    let mut pending = vec![settings.media_root_canon.clone()];
    while let Some(dir) = pending.pop() {
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(_) => continue,
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            if !file_type.is_dir() {
                continue;
            }

            let path = entry.path();
            let rel = path
                .strip_prefix(&settings.media_root_canon)
                .unwrap_or(&path)
                .to_path_buf();
            found.push(Category::from_rel(&rel));
            pending.push(path);
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));

    let mut categories = vec![Category::uncategorized()];
    categories.extend(found);
    Ok(categories)
}

/// Creates a category directory directly under the catalog root.
pub async fn create(settings: &Settings, name: &str) -> CatalogResult<Category> {
    let rel = paths::sanitize_non_empty(name)?;
    if rel.components().count() != 1 {
        return Err(CatalogError::InvalidPath(name.to_string()));
    }

    let full = paths::resolve_target(settings, &rel);
    if tokio::fs::metadata(&full).await.is_ok() {
        return Err(CatalogError::Collision(paths::rel_to_string(&rel)));
    }
    tokio::fs::create_dir(&full).await.map_err(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            CatalogError::Collision(paths::rel_to_string(&rel))
        } else {
            err.into()
        }
    })?;

    Ok(Category::from_rel(&rel))
}

/// Renames or moves a category directory. Media inside it inherit the new
/// location on the next listing, since category membership is derived from
/// directory structure. The move is a single rename, so a failure never
/// leaves a half-moved tree.
pub async fn rename(
    settings: &Settings,
    name: &str,
    new_name: Option<&str>,
    new_path: Option<&str>,
) -> CatalogResult<Category> {
    let source_rel = paths::sanitize_non_empty(name)?;
    let source = paths::resolve_existing_dir(settings, &source_rel).await?;

    let dest_rel = match (new_path, new_name) {
        (Some(path), _) => paths::sanitize_non_empty(path)?,
        (None, Some(leaf)) => {
            let leaf_rel = paths::sanitize_non_empty(leaf)?;
            if leaf_rel.components().count() != 1 {
                return Err(CatalogError::InvalidPath(leaf.to_string()));
            }
            match source_rel.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.join(leaf_rel),
                _ => leaf_rel,
            }
        }
        (None, None) => return Err(CatalogError::BadRequest("No updates provided".to_string())),
    };

    if dest_rel == source_rel {
        return Ok(Category::from_rel(&source_rel));
    }
    if dest_rel.starts_with(&source_rel) {
        return Err(CatalogError::InvalidPath(
            "cannot move a category into itself".to_string(),
        ));
    }

    let dest = paths::resolve_target(settings, &dest_rel);
    if tokio::fs::metadata(&dest).await.is_ok() {
        return Err(CatalogError::Collision(paths::rel_to_string(&dest_rel)));
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if let Err(err) = tokio::fs::rename(&source, &dest).await {
        if is_cross_device_link(&err) {
            return Err(CatalogError::InvalidPath(
                "cross-device category move not supported".to_string(),
            ));
        }
        return Err(err.into());
    }

    Ok(Category::from_rel(&dest_rel))
}

/// Removes a category directory and everything inside it. Destructive:
/// contained media are deleted along with the directory.
pub async fn delete(settings: &Settings, name: &str) -> CatalogResult<Category> {
    let rel = paths::sanitize_non_empty(name)?;
    let full = paths::resolve_existing_dir(settings, &rel).await?;

    tokio::fs::remove_dir_all(&full).await?;
    Ok(Category::from_rel(&rel))
}

fn is_cross_device_link(err: &io::Error) -> bool {
    #[cfg(target_family = "unix")]
    {
        return err.raw_os_error() == Some(libc::EXDEV);
    }

    #[cfg(not(target_family = "unix"))]
    {
        let _ = err;
        return false;
    }
}
