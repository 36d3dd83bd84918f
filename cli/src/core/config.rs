//! # Dockhand Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module loads, merges, and validates the client configuration: where the
//! Docker daemon listens, which API version to address, and the defaults used by
//! `image build`.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line `--host` (or the `DOCKER_HOST` environment variable)
//! 2. Project-specific `.dockhand.toml` in the current directory or its ancestors
//!    (the search stops at a directory containing `.git`)
//! 3. User-specific `config.toml` in the platform config directory
//! 4. Default values defined in the code
//!
//! ## Examples
//!
//! ```toml
//! [daemon]
//! host = "tcp://127.0.0.1:2375"
//! api_version = "1.41"
//!
//! [build]
//! dockerfile = "Dockerfile.dev"
//! quiet = true
//! ```
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

/// How to reach the Docker daemon.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Daemon address: `unix:///path/to/socket`, `tcp://host:port` or `http://host:port`.
    #[serde(default = "default_host")]
    pub host: String,
    /// Remote API version used as the `/v{version}` path prefix.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Defaults for `image build`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Dockerfile name looked up inside a build directory.
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    /// Remove intermediate containers after a successful build.
    #[serde(default = "default_true")]
    pub remove_intermediate: bool,
    /// Suppress the live progress output and print only the final summary.
    #[serde(default)]
    pub quiet: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dockerfile: default_dockerfile(),
            remove_intermediate: true,
            quiet: false,
        }
    }
}

fn default_host() -> String {
    "unix:///var/run/docker.sock".to_string()
}
fn default_api_version() -> String {
    "1.41".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}
fn default_true() -> bool {
    true
}

const PROJECT_CONFIG_FILENAME: &str = ".dockhand.toml";

/// Loads the merged configuration, applying `host_override` (from `--host` /
/// `DOCKER_HOST`) last.
pub fn load_config(host_override: Option<&str>) -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    if let Some(host) = host_override {
        debug!("Daemon host overridden from command line: {}", host);
        merged_config.daemon.host = host.to_string();
    }
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "Dockhand", "dockhand") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.dockhand.toml) found.");
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = Config::default();
    let mut merged = user;

    if project_cfg.daemon.host != defaults.daemon.host {
        merged.daemon.host = project_cfg.daemon.host;
    }
    if project_cfg.daemon.api_version != defaults.daemon.api_version {
        merged.daemon.api_version = project_cfg.daemon.api_version;
    }
    if project_cfg.daemon.timeout_secs != defaults.daemon.timeout_secs {
        merged.daemon.timeout_secs = project_cfg.daemon.timeout_secs;
    }
    if project_cfg.build.dockerfile != defaults.build.dockerfile {
        merged.build.dockerfile = project_cfg.build.dockerfile;
    }
    if project_cfg.build.remove_intermediate != defaults.build.remove_intermediate {
        merged.build.remove_intermediate = project_cfg.build.remove_intermediate;
    }
    if project_cfg.build.quiet != defaults.build.quiet {
        merged.build.quiet = project_cfg.build.quiet;
    }
    merged
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    if let Some(socket) = config.daemon.host.strip_prefix("unix://") {
        let expanded = shellexpand::tilde(socket).into_owned();
        debug!("Expanded daemon socket path: {}", expanded);
        config.daemon.host = format!("unix://{}", expanded);
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    let host = &config.daemon.host;
    if host.starts_with("https://") {
        return Err(anyhow!(DockhandError::Config(format!(
            "Daemon host '{}' requires TLS, which this client does not configure.",
            host
        ))));
    }
    if !["unix://", "tcp://", "http://"]
        .iter()
        .any(|scheme| host.starts_with(scheme))
    {
        return Err(anyhow!(DockhandError::Config(format!(
            "Unsupported daemon host '{}'. Expected unix://, tcp:// or http://.",
            host
        ))));
    }

    let version = &config.daemon.api_version;
    let valid_version = version
        .split_once('.')
        .map(|(major, minor)| {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);
    if !valid_version {
        return Err(anyhow!(DockhandError::Config(format!(
            "Invalid API version '{}'. Expected MAJOR.MINOR, e.g. 1.41.",
            version
        ))));
    }

    if config.build.dockerfile.trim().is_empty() {
        return Err(anyhow!(DockhandError::Config(
            "build.dockerfile cannot be empty.".to_string()
        )));
    }
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_basic_toml() {
        let toml_content = r#"
            [daemon]
            host = "tcp://127.0.0.1:2375"

            [build]
            dockerfile = "Dockerfile.dev"
            quiet = true
        "#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert_eq!(config.daemon.host, "tcp://127.0.0.1:2375");
        assert_eq!(config.daemon.api_version, "1.41"); // Default
        assert_eq!(config.daemon.timeout_secs, 120); // Default
        assert_eq!(config.build.dockerfile, "Dockerfile.dev");
        assert!(config.build.quiet);
        assert!(config.build.remove_intermediate); // Default
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[daemon]\nsocket = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_project_overrides_user() {
        let user = Config {
            daemon: DaemonConfig {
                api_version: "1.40".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let project = Config {
            daemon: DaemonConfig {
                host: "tcp://10.0.0.5:2375".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = merge_configs(user, Some(project));
        assert_eq!(merged.daemon.host, "tcp://10.0.0.5:2375");
        // The project file left api_version at its default, so the user value survives.
        assert_eq!(merged.daemon.api_version, "1.40");
    }

    #[test]
    fn test_socket_path_expansion() {
        let mut config = Config {
            daemon: DaemonConfig {
                host: "unix://~/.docker/run/docker.sock".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        expand_config_paths(&mut config).unwrap();
        let home_dir = dirs::home_dir().unwrap();
        assert_eq!(
            config.daemon.host,
            format!(
                "unix://{}",
                home_dir.join(".docker/run/docker.sock").to_string_lossy()
            )
        );
    }

    #[test]
    fn test_validate_rejects_https() {
        let config = Config {
            daemon: DaemonConfig {
                host: "https://docker.example.com:2376".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("requires TLS"));
    }

    #[test]
    fn test_validate_rejects_bad_api_version() {
        let config = Config {
            daemon: DaemonConfig {
                api_version: "v1".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_find_project_config_stops_at_git() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        let nested = repo.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        // A config above the repository root must not be picked up.
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILENAME), "").unwrap();
        assert!(find_project_config_path(&nested).is_none());

        fs::write(repo.join("a").join(PROJECT_CONFIG_FILENAME), "").unwrap();
        assert_eq!(
            find_project_config_path(&nested),
            Some(repo.join("a").join(PROJECT_CONFIG_FILENAME))
        );
    }
}
