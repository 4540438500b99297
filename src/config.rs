use anyhow::{Context, Result};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,gif,webp,mp4,mov,mkv,avi";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub media_root: PathBuf,
    pub media_root_canon: PathBuf,
    pub data_dir: PathBuf,
    pub upload_token: Option<String>,
    pub allowed_extensions: HashSet<String>,
    pub max_upload_bytes: u64,
    pub addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let media_root =
            PathBuf::from(env::var("GALLERY_MEDIA_DIR").unwrap_or_else(|_| "media".to_string()));
        fs::create_dir_all(&media_root)
            .with_context(|| format!("create media dir {:?}", media_root))?;
        let media_root_canon = media_root
            .canonicalize()
            .with_context(|| format!("canonicalize media dir {:?}", media_root))?;

        let data_dir =
            PathBuf::from(env::var("GALLERY_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        fs::create_dir_all(&data_dir).with_context(|| format!("create data dir {:?}", data_dir))?;

        let upload_token = env::var("UPLOAD_TOKEN").ok().and_then(|raw| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        let raw_exts =
            env::var("ALLOWED_EXTENSIONS").unwrap_or_else(|_| DEFAULT_EXTENSIONS.to_string());
        let allowed_extensions = parse_extensions(&raw_exts);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let addr = env::var("GALLERY_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Settings {
            media_root,
            media_root_canon,
            data_dir,
            upload_token,
            allowed_extensions,
            max_upload_bytes,
            addr,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("links.db")
    }

    pub fn is_allowed_file(&self, name: &str) -> bool {
        Path::new(&name.to_lowercase())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.allowed_extensions.contains(ext))
            .unwrap_or(false)
    }
}

fn parse_extensions(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
pub fn test_settings(root: &Path) -> Settings {
    Settings {
        media_root: root.to_path_buf(),
        media_root_canon: root.canonicalize().unwrap(),
        data_dir: root.to_path_buf(),
        upload_token: Some("secret".to_string()),
        allowed_extensions: parse_extensions(DEFAULT_EXTENSIONS),
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        addr: "127.0.0.1:0".to_string(),
    }
}
