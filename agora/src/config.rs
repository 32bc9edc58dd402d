//! Runtime configuration loaded from `agora.toml`.
//!
//! ```toml
//! [store]
//! backend = "redis"
//! redis_url = "${REDIS_URL}"
//! key_prefix = "agora"
//! max_in_values = 30
//!
//! [aggregation]
//! request_timeout_ms = 5000
//!
//! [placeholders]
//! profile = "https://cdn.example.com/default-avatar.png"
//! ```

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{models::ImageRole, store::DEFAULT_MAX_IN_VALUES};

pub const DEFAULT_CONFIG_FILE: &str = "agora.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {0} referenced by the configuration is not set")]
    MissingVariable(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub placeholders: Placeholders,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_max_in_values")]
    pub max_in_values: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            max_in_values: default_max_in_values(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1/".to_string()
}

fn default_key_prefix() -> String {
    "agora".to_string()
}

fn default_max_in_values() -> usize {
    DEFAULT_MAX_IN_VALUES
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// Deadline for one aggregation call. Unset means no deadline.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl AggregationSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

/// Default image URLs shown for roles a user never filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placeholders {
    #[serde(default = "default_profile_placeholder")]
    pub profile: String,
    #[serde(default = "default_cover_placeholder")]
    pub cover: String,
    #[serde(default = "default_profile_placeholder")]
    pub job: String,
    #[serde(default = "default_profile_placeholder")]
    pub post: String,
    #[serde(default = "default_company_placeholder")]
    pub company: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            profile: default_profile_placeholder(),
            cover: default_cover_placeholder(),
            job: default_profile_placeholder(),
            post: default_profile_placeholder(),
            company: default_company_placeholder(),
        }
    }
}

impl Placeholders {
    pub fn for_role(&self, role: ImageRole) -> &str {
        match role {
            ImageRole::Profile => &self.profile,
            ImageRole::CoverProfile => &self.cover,
            ImageRole::JobProfile => &self.job,
            ImageRole::PostProfile => &self.post,
            ImageRole::CompanyProfile => &self.company,
        }
    }
}

fn default_profile_placeholder() -> String {
    "/images/default-profile.png".to_string()
}

fn default_cover_placeholder() -> String {
    "/images/default-cover.png".to_string()
}

fn default_company_placeholder() -> String {
    "/images/default-company.png".to_string()
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file is absent.
    /// `REDIS_URL` and `AGORA_KEY_PREFIX` override the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let expanded = expand_env(&content)?;
        toml::from_str(&expanded).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Ok(prefix) = std::env::var("AGORA_KEY_PREFIX") {
            self.store.key_prefix = prefix;
        }
    }
}

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env reference pattern is valid"));

/// Replaces `${VAR}` references with the variable's value.
fn expand_env(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = ENV_REFERENCE.replace_all(content, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        std::env::var(name).unwrap_or_else(|_| {
            missing.get_or_insert_with(|| name.to_string());
            String::new()
        })
    });
    match missing {
        Some(name) => Err(ConfigError::MissingVariable(name)),
        None => Ok(expanded.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_missing_sections() {
        let settings: Settings = toml::from_str("[store]\nbackend = \"redis\"\n").unwrap();
        assert_eq!(settings.store.backend, Backend::Redis);
        assert_eq!(settings.store.key_prefix, "agora");
        assert_eq!(settings.store.max_in_values, DEFAULT_MAX_IN_VALUES);
        assert!(settings.aggregation.request_timeout().is_none());
        assert_eq!(settings.placeholders.for_role(ImageRole::CoverProfile), "/images/default-cover.png");
    }

    #[test]
    fn file_values_expand_environment_references() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("AGORA_TEST_PLACEHOLDER_HOST", "cdn.test") };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[placeholders]\nprofile = \"https://${{AGORA_TEST_PLACEHOLDER_HOST}}/p.png\"\n[aggregation]\nrequest_timeout_ms = 250"
        )
        .unwrap();
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.placeholders.profile, "https://cdn.test/p.png");
        assert_eq!(settings.aggregation.request_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn unset_references_are_reported() {
        let err = expand_env("url = \"${AGORA_TEST_DEFINITELY_UNSET}\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(name) if name == "AGORA_TEST_DEFINITELY_UNSET"));
    }
}
