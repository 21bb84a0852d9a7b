//! Site file layout and `file_url` shape classification

use std::path::{Component, Path, PathBuf};

/// Redirect endpoint that exchanges a reference for a signed URL.
pub const GENERATE_FILE_ENDPOINT: &str = "/api/method/offload.generate_file";

const PUBLIC_FILES_PREFIX: &str = "/files/";
const PRIVATE_FILES_PREFIX: &str = "/private/files/";

/// True when `file_url` is one of the two local shapes served from the site directory.
pub fn is_local_file_url(file_url: &str) -> bool {
    file_url.starts_with(PUBLIC_FILES_PREFIX) || file_url.starts_with(PRIVATE_FILES_PREFIX)
}

/// True when `file_url` already points at remote storage or at the redirect endpoint.
pub fn is_cloud_file_url(file_url: &str) -> bool {
    if file_url.is_empty() {
        return false;
    }

    if file_url.starts_with(GENERATE_FILE_ENDPOINT)
        || file_url.starts_with("https://storage.googleapis.com/")
        || file_url.starts_with("https://storage.cloud.google.com/")
    {
        return true;
    }

    // http(s)://<bucket>.s3[.<region>].amazonaws.com/<key>
    let Some(rest) = file_url
        .strip_prefix("https://")
        .or_else(|| file_url.strip_prefix("http://"))
    else {
        return false;
    };
    let Some((host, _)) = rest.split_once('/') else {
        return false;
    };
    host.ends_with(".amazonaws.com") && (host.contains(".s3.") || host.contains(".s3-"))
}

/// Resolves local file URLs against the host site directory.
///
/// Public files live under `<site>/public/files`, private ones under `<site>/private/files`.
#[derive(Debug, Clone)]
pub struct SitePaths {
    root: PathBuf,
}

impl SitePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn public_files_dir(&self) -> PathBuf {
        self.root.join("public").join("files")
    }

    pub fn private_files_dir(&self) -> PathBuf {
        self.root.join("private").join("files")
    }

    /// Absolute path of the file behind `file_url`.
    ///
    /// Returns `None` for URLs escaping the site directory (`..` segments) or with nothing
    /// left to resolve.
    pub fn resolve(&self, file_url: &str, is_private: bool) -> Option<PathBuf> {
        let (base, relative) = if let Some(rel) = file_url.strip_prefix(PRIVATE_FILES_PREFIX) {
            (self.private_files_dir(), rel)
        } else if let Some(rel) = file_url.strip_prefix(PUBLIC_FILES_PREFIX) {
            (self.public_files_dir(), rel)
        } else if is_private {
            (self.root.clone(), file_url)
        } else {
            (self.root.join("public"), file_url)
        };

        let relative = Path::new(relative.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        Some(base.join(relative))
    }
}
