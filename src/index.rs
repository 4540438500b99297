use crate::config::Settings;
use crate::error::CatalogResult;
use crate::links::{self, LinkRecord};
use crate::paths;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    File,
    Link,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaRecord {
    pub path: String,
    pub name: String,
    pub category_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub source: MediaSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub modified: i64,
    pub url: String,
}

impl MediaRecord {
    pub fn from_link(link: &LinkRecord) -> Self {
        MediaRecord {
            path: link.catalog_path(),
            name: link.name.clone(),
            category_path: link.category_path.clone(),
            mime_type: None,
            source: MediaSource::Link,
            size: None,
            modified: link.added,
            url: link.url.clone(),
        }
    }
}

/// Enumerates the catalog: every allow-listed regular file under the root
/// plus every registered link. `category_path` is derived from the file's
/// parent directory on every call, so listings always reflect the current
/// tree and survive concurrent renames without a cache to invalidate.
pub async fn list(
    settings: &Settings,
    pool: &SqlitePool,
    category: Option<&str>,
) -> CatalogResult<Vec<MediaRecord>> {
    let mut records = Vec::new();

    let mut pending = vec![settings.media_root_canon.clone()];
    while let Some(dir) = pending.pop() {
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(_) => continue,
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };

            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() || !settings.is_allowed_file(&name) {
                continue;
            }

            let rel = path
                .strip_prefix(&settings.media_root_canon)
                .unwrap_or(&path)
                .to_path_buf();
            let category_path = parent_category(&rel);

            let (size, modified) = match entry.metadata().await {
                Ok(meta) => (Some(meta.len()), to_unix_seconds(meta.modified().ok())),
                Err(_) => (None, 0),
            };

            let rel_str = paths::rel_to_string(&rel);
            records.push(MediaRecord {
                url: format!("/media/{rel_str}"),
                path: rel_str,
                name,
                category_path,
                mime_type: Some(
                    mime_guess::from_path(&path)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string(),
                ),
                source: MediaSource::File,
                size,
                modified,
            });
        }
    }

    for link in links::list_links(pool).await? {
        records.push(MediaRecord::from_link(&link));
    }

    if let Some(category) = category {
        records.retain(|record| record.category_path == category);
    }

    Ok(records)
}

fn parent_category(rel: &Path) -> String {
    rel.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(paths::rel_to_string)
        .unwrap_or_default()
}

pub fn to_unix_seconds(time: Option<SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use tempfile::tempdir;

    fn seed(root: &std::path::Path) {
        std::fs::write(root.join("solo.jpg"), b"a").unwrap();
        std::fs::create_dir_all(root.join("trips/2024")).unwrap();
        std::fs::write(root.join("trips/beach.jpg"), b"b").unwrap();
        std::fs::write(root.join("trips/2024/city.mp4"), b"c").unwrap();
        std::fs::write(root.join("trips/notes.txt"), b"skip").unwrap();
        std::fs::write(root.join(".hidden.jpg"), b"skip").unwrap();
    }

    #[tokio::test]
    async fn walk_derives_categories_from_directories() {
        let dir = tempdir().unwrap();
        let settings = config::test_settings(dir.path());
        let pool = links::test_pool().await;
        seed(dir.path());

        let mut records = list(&settings, &pool, None).await.unwrap();
        records.sort_by(|a, b| a.path.cmp(&b.path));

        let paths: Vec<_> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["solo.jpg", "trips/2024/city.mp4", "trips/beach.jpg"]);

        assert_eq!(records[0].category_path, "");
        assert_eq!(records[1].category_path, "trips/2024");
        assert_eq!(records[2].category_path, "trips");
        assert_eq!(records[0].mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(records[0].url, "/media/solo.jpg");
        assert_eq!(records[0].size, Some(1));
    }

    #[tokio::test]
    async fn category_filter_is_an_exact_match() {
        let dir = tempdir().unwrap();
        let settings = config::test_settings(dir.path());
        let pool = links::test_pool().await;
        seed(dir.path());

        let records = list(&settings, &pool, Some("trips")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "trips/beach.jpg");

        let records = list(&settings, &pool, Some("")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "solo.jpg");
    }

    #[tokio::test]
    async fn links_merge_into_the_listing() {
        let dir = tempdir().unwrap();
        let settings = config::test_settings(dir.path());
        let pool = links::test_pool().await;
        links::add_link(&pool, "https://example.com/clip", Some("Clip"), Some("trips"))
            .await
            .unwrap();

        let records = list(&settings, &pool, Some("trips")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, MediaSource::Link);
        assert_eq!(records[0].mime_type, None);
        assert_eq!(records[0].url, "https://example.com/clip");
        assert!(records[0].path.starts_with("links/"));
    }
}
