//! Connection settings
//!
//! Each value resolves from the command line (or its environment variable),
//! then the settings file, then the built-in default.
//!
//! ```toml
//! url = "https://portainer.example.com:9443"
//! token = "ptr_..."
//! timeout = 30
//! insecure = false
//! ```

use crate::cli::ConnectionArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of the settings file; every key is optional
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<u64>,
    pub insecure: Option<bool>,
}

impl SettingsFile {
    /// Parse a settings file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Load the explicit file, or the default one when it exists
    fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(&paths::expand(&path.to_string_lossy()));
        }

        let path = paths::config_file()?;
        if path.exists() {
            log::debug!("Loading settings from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Fully resolved connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
    pub insecure: bool,
}

impl Settings {
    /// Resolve settings from arguments and the settings file
    pub fn resolve(args: &ConnectionArgs) -> Result<Self> {
        let file = SettingsFile::discover(args.config.as_deref())?;
        Self::merge(args, file)
    }

    fn merge(args: &ConnectionArgs, file: SettingsFile) -> Result<Self> {
        let Some(url) = args.url.clone().or(file.url) else {
            bail!(
                "No Portainer URL configured: pass --url, set PORTAINER_URL or add `url` to the settings file"
            );
        };
        let Some(token) = args.token.clone().or(file.token) else {
            bail!(
                "No API token configured: pass --token, set PORTAINER_TOKEN or add `token` to the settings file"
            );
        };
        if url.trim().is_empty() {
            bail!("Portainer URL must not be empty");
        }

        let timeout = args
            .timeout
            .or(file.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token,
            timeout: Duration::from_secs(timeout),
            insecure: args.insecure || file.insecure.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_arguments_win_over_file() {
        let args = ConnectionArgs {
            url: Some("https://cli:9443/".into()),
            token: None,
            timeout: Some(5),
            ..Default::default()
        };
        let file = SettingsFile {
            url: Some("https://file:9443".into()),
            token: Some("ptr_file".into()),
            timeout: Some(60),
            insecure: Some(true),
        };

        let settings = Settings::merge(&args, file).unwrap();
        assert_eq!(settings.url, "https://cli:9443");
        assert_eq!(settings.token, "ptr_file");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.insecure);
    }

    #[test]
    fn test_defaults() {
        let args = ConnectionArgs {
            url: Some("https://portainer:9443".into()),
            token: Some("ptr_x".into()),
            ..Default::default()
        };

        let settings = Settings::merge(&args, SettingsFile::default()).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!settings.insecure);
    }

    #[test]
    fn test_missing_url_or_token() {
        let no_url = ConnectionArgs {
            token: Some("t".into()),
            ..Default::default()
        };
        let err = Settings::merge(&no_url, SettingsFile::default()).unwrap_err();
        assert!(err.to_string().contains("No Portainer URL"));

        let no_token = ConnectionArgs {
            url: Some("https://p".into()),
            ..Default::default()
        };
        let err = Settings::merge(&no_token, SettingsFile::default()).unwrap_err();
        assert!(err.to_string().contains("No API token"));
    }

    #[test]
    fn test_load_explicit_file() {
        let file = settings_file(
            r#"
url = "https://portainer.example.com"
token = "ptr_abc"
timeout = 10
"#,
        );
        let args = ConnectionArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.url, "https://portainer.example.com");
        assert_eq!(settings.token, "ptr_abc");
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let file = settings_file("url = \"x\"\nendpoint = 1\n");
        assert!(SettingsFile::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let args = ConnectionArgs {
            config: Some("/nonexistent/portainer-reconcile.toml".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(&args).is_err());
    }
}
