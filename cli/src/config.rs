//! CLI profile file
//!
//! `~/.envstack/config.toml`, or `config.<profile>.toml` when a profile is named.
//! Command-line flags and environment variables win over anything stored here.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Deployment config file used when `--config` is absent
    pub deployment: Option<PathBuf>,
    /// Account used when neither the flag nor the environment supplies one
    pub account: Option<String>,
    pub default_format: Option<String>,
    pub parallel: Option<bool>,
}

pub const KEYS: [&str; 4] = ["deployment", "account", "default_format", "parallel"];

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing profile {}", path.display()))
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing profile {}", path.display()))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match key {
            "deployment" => self.deployment.as_ref().map(|p| p.display().to_string()),
            "account" => self.account.clone(),
            "default_format" => self.default_format.clone(),
            "parallel" => self.parallel.map(|p| p.to_string()),
            _ => bail!("unknown profile key: {}", key),
        })
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "deployment" => self.deployment = Some(PathBuf::from(value)),
            "account" => self.account = Some(value.to_string()),
            "default_format" => self.default_format = Some(value.to_string()),
            "parallel" => {
                self.parallel = Some(
                    value
                        .parse()
                        .map_err(|_| anyhow!("parallel must be true or false, got {}", value))?,
                )
            }
            _ => bail!("unknown profile key: {}", key),
        }
        Ok(())
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot find home directory"))?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".envstack").join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load_from(Path::new("/nonexistent/envstack/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_get_and_save() {
        let mut config = Config::default();
        config.set("account", "123456789012").unwrap();
        config.set("parallel", "true").unwrap();
        config.set("deployment", "deploy/envstack.toml").unwrap();
        assert_eq!(config.get("account").unwrap().as_deref(), Some("123456789012"));
        assert_eq!(config.get("parallel").unwrap().as_deref(), Some("true"));
        assert_eq!(config.get("default_format").unwrap(), None);

        assert!(config.set("parallel", "sometimes").is_err());
        assert!(config.set("api_key", "x").is_err());
        assert!(config.get("api_key").is_err());

        let path = std::env::temp_dir()
            .join(format!("envstack-cli-{}", std::process::id()))
            .join("config.toml");
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
