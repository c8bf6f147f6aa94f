//! Configuration file handling for the bootstrap configurator.
//!
//! Every field has a default, so an absent or partial JSON file is valid.
//! The home directory falls back to `$HOME` when not set explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};

/// Default VCS host for short `org/repo` identifiers
pub const DEFAULT_GIT_HOST: &str = "github.com";

/// How GitHub credentials are handed to git
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CredentialMode {
    /// Register a global git credential helper reading `GH_USER`/`GH_PAT`
    #[default]
    Helper,
    /// Only export token variables; no git config is written
    TokenEnv,
}

/// Program names for the external tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub wget: String,
    pub git: String,
    pub pip: String,
    pub nvidia_smi: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            wget: "wget".to_string(),
            git: "git".to_string(),
            pip: "pip".to_string(),
            nvidia_smi: "nvidia-smi".to_string(),
        }
    }
}

/// Bootstrap configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Home directory holding `.kaggle/` (None = `$HOME`)
    pub home_dir: Option<PathBuf>,
    /// Directory for downloads and checkouts
    pub work_dir: PathBuf,
    /// Host used to expand `org/repo`
    pub git_host: String,
    pub credential_mode: CredentialMode,
    pub tools: ToolPaths,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            home_dir: None,
            work_dir: PathBuf::from("."),
            git_host: DEFAULT_GIT_HOST.to_string(),
            credential_mode: CredentialMode::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl BootstrapConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let host = self.git_host.trim();
        if host.is_empty() {
            anyhow::bail!("git_host must not be empty");
        }
        if host.contains('/') || host.contains(char::is_whitespace) {
            anyhow::bail!("git_host must be a bare host name, got {:?}", self.git_host);
        }

        for (name, program) in [
            ("wget", &self.tools.wget),
            ("git", &self.tools.git),
            ("pip", &self.tools.pip),
            ("nvidia_smi", &self.tools.nvidia_smi),
        ] {
            if program.trim().is_empty() {
                anyhow::bail!("tools.{} must not be empty", name);
            }
        }

        if self.work_dir.as_os_str().is_empty() {
            anyhow::bail!("work_dir must not be empty");
        }

        Ok(())
    }

    /// Resolve the home directory, falling back to `$HOME`
    pub fn resolve_home(&self) -> crate::error::Result<PathBuf> {
        if let Some(ref home) = self.home_dir {
            return Ok(home.clone());
        }
        std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                crate::error::BootstrapError::config("home directory unknown: set HOME or home_dir")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = BootstrapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.git_host, "github.com");
        assert_eq!(config.credential_mode, CredentialMode::Helper);
        assert_eq!(config.tools.nvidia_smi, "nvidia-smi");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BootstrapConfig =
            serde_json::from_str(r#"{"credential_mode": "token-env", "tools": {"pip": "pip3"}}"#)
                .unwrap();
        assert_eq!(config.credential_mode, CredentialMode::TokenEnv);
        assert_eq!(config.tools.pip, "pip3");
        assert_eq!(config.tools.git, "git");
        assert_eq!(config.work_dir, PathBuf::from("."));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("colabstrap.json");

        let config = BootstrapConfig {
            home_dir: Some(dir.path().to_path_buf()),
            git_host: "gitlab.com".to_string(),
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let loaded = BootstrapConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        let config = BootstrapConfig {
            git_host: "github.com/org".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_tool() {
        let mut config = BootstrapConfig::default();
        config.tools.wget = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tools.wget"));
    }

    #[test]
    fn test_explicit_home_wins() {
        let config = BootstrapConfig {
            home_dir: Some(PathBuf::from("/tmp/home")),
            ..Default::default()
        };
        assert_eq!(config.resolve_home().unwrap(), PathBuf::from("/tmp/home"));
    }

    #[test]
    fn test_credential_mode_parse() {
        assert_eq!("token-env".parse::<CredentialMode>().ok(), Some(CredentialMode::TokenEnv));
        assert_eq!(CredentialMode::Helper.to_string(), "helper");
    }
}
