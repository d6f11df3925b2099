//! Configuration loaded from `config.toml`.
//!
//! Every field has a default, so an empty or missing file yields a working
//! setup. The default location comes from the platform config dir
//! (`~/.config/impactdesk/config.toml` on Linux).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the ledger and session files live. `~` is expanded.
    /// Defaults to the platform data dir.
    pub data_dir: Option<String>,
    pub auth: AuthConfig,
    pub kdf: KdfConfig,
}

/// What `register` does when the email is already in the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateEmailPolicy {
    /// Last write wins: the old account is dropped.
    #[default]
    Replace,
    /// Fail with `EmailTaken`.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Artificial round-trip delay of the simulated transport.
    pub simulated_latency_ms: u64,
    /// Upper bound on one transport round trip.
    pub request_timeout_ms: u64,
    pub duplicate_email: DuplicateEmailPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 1000,
            request_timeout_ms: 10_000,
            duplicate_email: DuplicateEmailPolicy::Replace,
        }
    }
}

impl AuthConfig {
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Argon2id cost parameters for new secret hashes. Existing hashes keep the
/// parameters they were created with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        // OWASP baseline for Argon2id
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.request_timeout_ms == 0 {
            bail!("auth.request_timeout_ms must be greater than 0");
        }
        if self.kdf.iterations == 0 {
            bail!("kdf.iterations must be at least 1");
        }
        if self.kdf.parallelism == 0 {
            bail!("kdf.parallelism must be at least 1");
        }
        if self.kdf.memory_kib < 8 * self.kdf.parallelism {
            bail!(
                "kdf.memory_kib must be at least 8 * parallelism ({})",
                8 * self.kdf.parallelism
            );
        }
        if let Some(dir) = &self.data_dir {
            if dir.trim().is_empty() {
                bail!("data_dir cannot be empty. Remove the key to use the default location");
            }
        }
        Ok(())
    }

    /// `~/.config/impactdesk/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|d| d.config_dir().join("config.toml"))
    }

    /// Resolved storage directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            let expanded = shellexpand::tilde(dir);
            return Ok(PathBuf::from(expanded.as_ref()));
        }
        match project_dirs() {
            Some(d) => Ok(d.data_dir().to_path_buf()),
            None => bail!("Could not determine a home directory; set data_dir in config"),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "impactdesk", "impactdesk")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.auth.simulated_latency_ms, 1000);
        assert_eq!(config.auth.request_timeout_ms, 10_000);
        assert_eq!(config.auth.duplicate_email, DuplicateEmailPolicy::Replace);
        assert_eq!(config.kdf.memory_kib, 19 * 1024);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [auth]
            duplicate_email = "reject"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.duplicate_email, DuplicateEmailPolicy::Reject);
        assert_eq!(config.auth.simulated_latency_ms, 1000);
        assert_eq!(config.kdf.iterations, 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_toml("[auth]\nrequest_timeout_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("request_timeout_ms"));
    }

    #[test]
    fn undersized_kdf_memory_is_rejected() {
        let err = Config::from_toml("[kdf]\nmemory_kib = 4\n").unwrap_err();
        assert!(err.to_string().contains("memory_kib"));
    }

    #[test]
    fn unknown_policy_fails_to_parse() {
        assert!(Config::from_toml("[auth]\nduplicate_email = \"merge\"\n").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(Some(&tmp.path().join("nope.toml"))).unwrap();
        assert_eq!(config.auth.request_timeout_ms, 10_000);
    }

    #[test]
    fn load_reads_file_and_reports_path_on_error() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.toml");
        std::fs::write(&good, "data_dir = \"/srv/impactdesk\"\n").unwrap();
        let config = Config::load(Some(&good)).unwrap();
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/srv/impactdesk"));

        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "auth = 3\n").unwrap();
        let err = Config::load(Some(&bad)).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }

    #[test]
    fn data_dir_expands_tilde() {
        let config = Config {
            data_dir: Some("~/impactdesk-data".into()),
            ..Config::default()
        };
        let dir = config.data_dir().unwrap();
        assert!(dir.ends_with("impactdesk-data"));
        if std::env::var_os("HOME").is_some() {
            assert!(!dir.to_string_lossy().starts_with('~'));
        }
    }
}
