use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use archiver_engine::{FetchSettings, SiteConfig, DEFAULT_ARCHIVE_SUBDIR, DEFAULT_COMMIT_MESSAGE};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "sites.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("{0}")]
    Invalid(String),
}

/// HTTP client settings shared by every site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchEntry {
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl FetchEntry {
    pub fn settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteEntry {
    pub name: String,
    pub api_url: String,
    pub repository: PathBuf,
    #[serde(default)]
    pub archive_subdir: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default = "enabled")]
    pub publish: bool,
    #[serde(default = "enabled")]
    pub pull: bool,
}

fn enabled() -> bool {
    true
}

impl SiteEntry {
    pub fn to_site_config(&self) -> SiteConfig {
        SiteConfig {
            name: self.name.clone(),
            api_url: self.api_url.clone(),
            repository: self.repository.clone(),
            archive_subdir: self
                .archive_subdir
                .clone()
                .unwrap_or_else(|| DEFAULT_ARCHIVE_SUBDIR.to_string()),
            commit_message: self
                .commit_message
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            per_page: self.per_page,
            publish: self.publish,
            pull: self.pull,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArchiverConfig {
    #[serde(default)]
    pub fetch: FetchEntry,
    pub sites: Vec<SiteEntry>,
}

impl ArchiverConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: ArchiverConfig =
            ron::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid("no sites configured".to_string()));
        }
        for (idx, site) in self.sites.iter().enumerate() {
            if site.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("site #{} has no name", idx + 1)));
            }
            if site.api_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "site {} has no api_url",
                    site.name
                )));
            }
            if site.repository.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "site {} has no repository",
                    site.name
                )));
            }
            if self.sites[..idx].iter().any(|other| other.name == site.name) {
                return Err(ConfigError::Invalid(format!(
                    "site {} is configured twice",
                    site.name
                )));
            }
        }
        Ok(())
    }

    /// The sites to run: all of them, or only the one named.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&SiteEntry>, ConfigError> {
        match name {
            None => Ok(self.sites.iter().collect()),
            Some(name) => self
                .sites
                .iter()
                .find(|site| site.name == name)
                .map(|site| vec![site])
                .ok_or_else(|| ConfigError::Invalid(format!("no site named {name}"))),
        }
    }
}
