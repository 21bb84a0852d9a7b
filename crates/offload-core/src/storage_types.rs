use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Remote storage providers
///
/// Defined in core because it's used by configuration and by the storage factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Gcs,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    /// Accepts the short names (`s3`, `gcs`) as well as the display names shown
    /// on the configuration screen of the host application.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" | "amazon s3" => Ok(StorageBackend::S3),
            "gcs" | "google cloud storage" => Ok(StorageBackend::Gcs),
            _ => Err(anyhow::anyhow!("Invalid storage provider: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Gcs => write!(f, "gcs"),
        }
    }
}

/// Visibility class of a stored object: which bucket partition it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn from_is_private(is_private: bool) -> Self {
        if is_private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn is_private(self) -> bool {
        self == Visibility::Private
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(anyhow::anyhow!("Invalid visibility: {}", s)),
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_display_names() {
        assert_eq!(
            "Amazon S3".parse::<StorageBackend>().unwrap(),
            StorageBackend::S3
        );
        assert_eq!(
            "Google Cloud Storage".parse::<StorageBackend>().unwrap(),
            StorageBackend::Gcs
        );
        assert_eq!("GCS".parse::<StorageBackend>().unwrap(), StorageBackend::Gcs);
        assert!("azure".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_visibility_parse_is_case_sensitive() {
        assert_eq!("public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert!("Public".parse::<Visibility>().is_err());
        assert_eq!(Visibility::default(), Visibility::Private);
    }
}
