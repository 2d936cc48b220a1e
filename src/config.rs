use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::SourceError;

/// FTP transfer type: binary (image) or ascii (text) mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum XferMode {
    Binary,
    Ascii,
}

/// Connection parameters and batch options for one FTP download run.
///
/// Immutable for the duration of a batch. Loaded from a JSON config file
/// and/or applied from case-insensitive `key=value` properties using the
/// same property names the original routing configuration used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Remote base directory; blank means the server root.
    pub remote_dir: String,
    /// Local staging directory for downloaded files.
    pub local_dir: PathBuf,
    /// Whitespace-separated list of file names to download, in order.
    /// Duplicates are allowed and downloaded independently.
    pub filenames: String,
    pub xfer_mode: XferMode,
    /// Delete each file from the server after a successful download.
    pub delete_from_server: bool,
    /// Use active mode instead of the default passive mode.
    pub active_mode: bool,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: String::new(),
            password: String::new(),
            remote_dir: String::new(),
            local_dir: default_staging_dir(),
            filenames: String::new(),
            xfer_mode: XferMode::Binary,
            delete_from_server: false,
            active_mode: false,
        }
    }
}

/// Staging default, resolved once when the config value is built: the
/// per-user cache directory, or the process temp directory without one.
pub fn default_staging_dir() -> PathBuf {
    ProjectDirs::from("io", "ftp-ingest", "ftp-ingest")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
}

impl FtpConfig {
    /// Loads the config from `path`, or from the per-user config location
    /// when no path is given. No file at the default location yields the
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let content = fs::read_to_string(path)
                .with_context(|| format!("cannot read config file '{}'", path.display()))?;
            let config = serde_json::from_str(&content)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            return Ok(config);
        }
        if let Some(path) = Self::config_path() {
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                return Ok(serde_json::from_str(&content)?);
            }
        }
        Ok(Self::default())
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "ftp-ingest", "ftp-ingest")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Applies a single named property. Names are case-insensitive and
    /// match the original property set (`remoteDir`, `xferMode`, ...).
    /// Returns false for an unrecognized name.
    ///
    /// A non-numeric `port` keeps the current value and only warns, the
    /// behavior the original property handling had.
    pub fn apply_property(&mut self, name: &str, value: &str) -> bool {
        let name = name.trim();
        if name.eq_ignore_ascii_case("host") {
            self.host = value.to_string();
        } else if name.eq_ignore_ascii_case("port") {
            match value.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(
                    value,
                    "non-numeric port, keeping {}", self.port
                ),
            }
        } else if name.eq_ignore_ascii_case("username") {
            self.username = value.to_string();
        } else if name.eq_ignore_ascii_case("password") {
            self.password = value.to_string();
        } else if name.eq_ignore_ascii_case("remoteDir") {
            self.remote_dir = value.to_string();
        } else if name.eq_ignore_ascii_case("localDir") {
            self.local_dir = PathBuf::from(value);
        } else if name.eq_ignore_ascii_case("filenames") {
            self.filenames = value.to_string();
        } else if name.eq_ignore_ascii_case("xferMode") || name.eq_ignore_ascii_case("ftpMode") {
            // Anything starting with 'a' selects ascii, everything else binary.
            self.xfer_mode = if value.to_ascii_lowercase().starts_with('a') {
                XferMode::Ascii
            } else {
                XferMode::Binary
            };
        } else if name.eq_ignore_ascii_case("deleteFromServer") {
            self.delete_from_server = parse_bool(value);
        } else if name.eq_ignore_ascii_case("ftpActiveMode") || name.eq_ignore_ascii_case("activeMode")
        {
            self.active_mode = parse_bool(value);
        } else {
            return false;
        }
        true
    }

    /// Builds a config from defaults plus a property set, warning about
    /// unrecognized names.
    pub fn from_properties<'a, I>(properties: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (name, value) in properties {
            if !config.apply_property(name, value) {
                warn!(name, "ignoring unrecognized property");
            }
        }
        config
    }

    /// Checks the mandatory connection properties. Must pass before any
    /// network activity is attempted.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.host.trim().is_empty() {
            return Err(SourceError::MissingProperty("host"));
        }
        if self.username.trim().is_empty() {
            return Err(SourceError::MissingProperty("username"));
        }
        if self.password.trim().is_empty() {
            return Err(SourceError::MissingProperty("password"));
        }
        Ok(())
    }

    /// The ordered file-name list, whitespace-split and trimmed.
    pub fn file_list(&self) -> Vec<&str> {
        self.filenames.split_whitespace().collect()
    }
}

/// Accepts the usual property-file spellings: true/yes/1 and friends.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().chars().next().map(|c| c.to_ascii_lowercase()),
        Some('t' | 'y' | '1')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FtpConfig::default();
        assert_eq!(config.host, "");
        assert_eq!(config.port, 21);
        assert_eq!(config.username, "");
        assert_eq!(config.password, "");
        assert_eq!(config.remote_dir, "");
        assert_eq!(config.xfer_mode, XferMode::Binary);
        assert!(!config.delete_from_server);
        assert!(!config.active_mode);
    }

    #[test]
    fn test_apply_property_case_insensitive() {
        let mut config = FtpConfig::default();
        assert!(config.apply_property("HOST", "ftp.example.com"));
        assert!(config.apply_property("Port", "2121"));
        assert!(config.apply_property("REMOTEDIR", "data/incoming"));
        assert!(config.apply_property("ftpactivemode", "true"));

        assert_eq!(config.host, "ftp.example.com");
        assert_eq!(config.port, 2121);
        assert_eq!(config.remote_dir, "data/incoming");
        assert!(config.active_mode);
    }

    #[test]
    fn test_apply_property_unrecognized() {
        let mut config = FtpConfig::default();
        assert!(!config.apply_property("bogus", "value"));
    }

    #[test]
    fn test_bad_port_keeps_default() {
        let mut config = FtpConfig::default();
        assert!(config.apply_property("port", "twenty-one"));
        assert_eq!(config.port, 21);
        assert!(config.apply_property("port", "70000"));
        assert_eq!(config.port, 21);
    }

    #[test]
    fn test_xfer_mode_values() {
        let mut config = FtpConfig::default();
        config.apply_property("xferMode", "ascii");
        assert_eq!(config.xfer_mode, XferMode::Ascii);
        config.apply_property("xferMode", "binary");
        assert_eq!(config.xfer_mode, XferMode::Binary);
        config.apply_property("ftpMode", "A");
        assert_eq!(config.xfer_mode, XferMode::Ascii);
        config.apply_property("xferMode", "");
        assert_eq!(config.xfer_mode, XferMode::Binary);
    }

    #[test]
    fn test_bool_properties() {
        let mut config = FtpConfig::default();
        config.apply_property("deleteFromServer", "yes");
        assert!(config.delete_from_server);
        config.apply_property("deleteFromServer", "false");
        assert!(!config.delete_from_server);
        config.apply_property("deleteFromServer", "1");
        assert!(config.delete_from_server);
    }

    #[test]
    fn test_file_list_parsing() {
        let mut config = FtpConfig::default();
        config.filenames = "  a.txt   b.txt\tc.txt  a.txt ".to_string();
        assert_eq!(config.file_list(), vec!["a.txt", "b.txt", "c.txt", "a.txt"]);

        config.filenames = String::new();
        assert!(config.file_list().is_empty());
    }

    #[test]
    fn test_from_properties() {
        let config = FtpConfig::from_properties(vec![
            ("host", "ftp.example.com"),
            ("username", "user"),
            ("password", "secret"),
            ("filenames", "a.txt b.txt"),
        ]);
        assert_eq!(config.host, "ftp.example.com");
        assert_eq!(config.file_list(), vec!["a.txt", "b.txt"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_properties() {
        let mut config = FtpConfig::default();
        assert!(matches!(
            config.validate(),
            Err(SourceError::MissingProperty("host"))
        ));

        config.host = "ftp.example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(SourceError::MissingProperty("username"))
        ));

        config.username = "user".to_string();
        assert!(matches!(
            config.validate(),
            Err(SourceError::MissingProperty("password"))
        ));

        config.password = "secret".to_string();
        assert!(config.validate().is_ok());

        // Whitespace-only values do not count.
        config.host = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(SourceError::MissingProperty("host"))
        ));
    }

    #[test]
    fn test_config_serialization_skips_password() {
        let mut config = FtpConfig::default();
        config.host = "10.0.0.1".to_string();
        config.username = "testuser".to_string();
        config.password = "testpass".to_string();

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("10.0.0.1"));
        assert!(json.contains("testuser"));
        assert!(!json.contains("testpass"));

        let decoded: FtpConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.host, "10.0.0.1");
        assert_eq!(decoded.password, "");
    }

    #[test]
    fn test_load_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"host": "ftp.example.com", "username": "u", "password": "p"}"#,
        )
        .unwrap();

        let config = FtpConfig::load(Some(&path)).unwrap();
        assert_eq!(config.host, "ftp.example.com");
        assert_eq!(config.port, 21);
        assert_eq!(config.xfer_mode, XferMode::Binary);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(FtpConfig::load(Some(&path)).is_err());
    }
}
