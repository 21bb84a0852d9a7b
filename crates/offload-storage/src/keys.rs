//! Shared key generation for storage backends.
//!
//! Key format: `[{folder}/]{YYYY}/{MM}/{DD}/{owner_type}/{SUFFIX}_{sanitized_file_name}`.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rand::Rng;

const SUFFIX_LEN: usize = 8;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Deployment-supplied key override.
///
/// Called with `(file_name, owner_type, owner_id)`. `Ok(Some(key))` replaces the default
/// layout; `Ok(None)`, an empty key or an error fall back to it.
pub type KeyOverride = Arc<dyn Fn(&str, &str, &str) -> Result<Option<String>, String> + Send + Sync>;

/// How file names are cleaned before they become part of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizePolicy {
    /// Keep alphanumerics and `._- `, then turn spaces into underscores (GCS).
    KeepThenUnderscore,
    /// Turn spaces into underscores, then keep only ASCII alphanumerics and `._-` (S3).
    AsciiSafe,
}

impl SanitizePolicy {
    pub fn apply(self, file_name: &str) -> String {
        match self {
            SanitizePolicy::KeepThenUnderscore => file_name
                .chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
                .collect::<String>()
                .replace(' ', "_"),
            SanitizePolicy::AsciiSafe => file_name
                .replace(' ', "_")
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                .collect(),
        }
    }
}

/// Derives object keys for one backend
#[derive(Clone)]
pub struct KeyGenerator {
    folder_name: Option<String>,
    policy: SanitizePolicy,
    key_override: Option<KeyOverride>,
}

impl fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGenerator")
            .field("folder_name", &self.folder_name)
            .field("policy", &self.policy)
            .field("key_override", &self.key_override.is_some())
            .finish()
    }
}

impl KeyGenerator {
    pub fn new(policy: SanitizePolicy, folder_name: Option<String>) -> Self {
        Self {
            folder_name: folder_name
                .map(|f| f.trim().trim_matches('/').to_string())
                .filter(|f| !f.is_empty()),
            policy,
            key_override: None,
        }
    }

    pub fn with_override(mut self, key_override: Option<KeyOverride>) -> Self {
        self.key_override = key_override;
        self
    }

    /// Generate a key dated today (local time).
    pub fn generate(&self, file_name: &str, owner_type: &str, owner_id: &str) -> String {
        self.generate_on(Local::now().date_naive(), file_name, owner_type, owner_id)
    }

    pub fn generate_on(
        &self,
        date: NaiveDate,
        file_name: &str,
        owner_type: &str,
        owner_id: &str,
    ) -> String {
        if let Some(key) = self.override_key(file_name, owner_type, owner_id) {
            return key;
        }

        let sanitized = self.policy.apply(file_name);
        let mut prefix = format!("{}/{}", date.format("%Y/%m/%d"), owner_type);
        if let Some(folder) = &self.folder_name {
            prefix = format!("{}/{}", folder, prefix);
        }

        format!("{}/{}_{}", prefix, random_suffix(), sanitized)
    }

    fn override_key(&self, file_name: &str, owner_type: &str, owner_id: &str) -> Option<String> {
        let hook = self.key_override.as_ref()?;
        match hook(file_name, owner_type, owner_id) {
            Ok(Some(key)) => {
                let key = key.trim_matches('/');
                (!key.is_empty()).then(|| key.to_string())
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    file_name = %file_name,
                    owner_type = %owner_type,
                    "Key override failed, using default key layout"
                );
                None
            }
        }
    }
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}
