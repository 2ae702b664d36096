use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const MAX_CONTENT_CHARS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RamifyConfig {
    pub api_port: u16,
    pub paths: RamifyPaths,
    pub comments: CommentConfig,
}

impl RamifyConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("RAMIFY_HOME") {
            Ok(raw) if !raw.trim().is_empty() => RamifyPaths::from_base_dir(raw.trim())?,
            _ => RamifyPaths::discover()?,
        };
        let api_port = env::var("RAMIFY_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let comments = CommentConfig::from_env();
        Ok(Self {
            api_port,
            paths,
            comments,
        })
    }

    pub fn new(api_port: u16, paths: RamifyPaths) -> Self {
        Self {
            api_port,
            paths,
            comments: CommentConfig::default(),
        }
    }
}

/// Limits applied by the read projections and the content validator.
#[derive(Debug, Clone, Copy)]
pub struct CommentConfig {
    pub max_content_chars: usize,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            max_content_chars: MAX_CONTENT_CHARS,
            default_page_limit: 20,
            max_page_limit: 100,
        }
    }
}

impl CommentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_page_limit = env::var("RAMIFY_DEFAULT_PAGE_LIMIT")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.default_page_limit);
        let max_page_limit = env::var("RAMIFY_MAX_PAGE_LIMIT")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(defaults.max_page_limit);
        Self {
            max_content_chars: defaults.max_content_chars,
            default_page_limit: default_page_limit.min(max_page_limit),
            max_page_limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RamifyPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl RamifyPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("ramify.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_base_dir() {
        let paths = RamifyPaths::from_base_dir("/tmp/ramify-test").unwrap();
        assert_eq!(paths.db_path, PathBuf::from("/tmp/ramify-test/data/ramify.db"));
        assert_eq!(paths.logs_dir, PathBuf::from("/tmp/ramify-test/logs"));
    }

    #[test]
    fn default_limits_are_sane() {
        let config = CommentConfig::default();
        assert!(config.default_page_limit <= config.max_page_limit);
        assert_eq!(config.max_content_chars, 10_000);
    }
}
