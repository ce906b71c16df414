//! Configuration vault – reads/writes `~/.hearth/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use hearth_types::HearthError;
use serde::{Deserialize, Serialize};

/// How the bootstrap report is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = HearthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(HearthError::Config(format!("unknown report format '{other}'"))),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Persisted configuration stored in `~/.hearth/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Format of the bootstrap report printed on stdout.
    #[serde(default)]
    pub report_format: ReportFormat,

    /// Print the registry contents after bootstrap.
    #[serde(default = "default_dump_services")]
    pub dump_services: bool,

    /// Names of sparks that must not be started.
    #[serde(default)]
    pub disabled_sparks: Vec<String>,

    /// Display name published by the `personal-details` service unless
    /// `--display-name` is given on the command line.
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_dump_services() -> bool {
    true
}
fn default_display_name() -> String {
    "Anonymous".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_format: ReportFormat::default(),
            dump_services: default_dump_services(),
            disabled_sparks: Vec::new(),
            display_name: default_display_name(),
        }
    }
}

impl Config {
    /// `true` unless `spark` is listed in `disabled_sparks`.
    pub fn is_enabled(&self, spark: &str) -> bool {
        !self.disabled_sparks.iter().any(|name| name == spark)
    }
}

/// Return the path to `~/.hearth/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".hearth").join("config.toml")
}

/// Load the config from disk and apply `HEARTH_*` overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, HearthError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, HearthError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| {
        HearthError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(cfg))
}

/// Apply `HEARTH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HEARTH_REPORT_FORMAT` | `report_format` (`text` or `json`) |
/// | `HEARTH_DUMP_SERVICES` | `dump_services` (`true` or `false`) |
/// | `HEARTH_DISABLED_SPARKS` | `disabled_sparks` (comma separated) |
/// | `HEARTH_DISPLAY_NAME` | `display_name` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("HEARTH_REPORT_FORMAT")
        && let Ok(format) = v.parse::<ReportFormat>()
    {
        cfg.report_format = format;
    }
    if let Ok(v) = std::env::var("HEARTH_DUMP_SERVICES")
        && let Ok(dump) = v.trim().parse::<bool>()
    {
        cfg.dump_services = dump;
    }
    if let Ok(v) = std::env::var("HEARTH_DISABLED_SPARKS") {
        cfg.disabled_sparks = v
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Ok(v) = std::env::var("HEARTH_DISPLAY_NAME") {
        cfg.display_name = v;
    }
}

/// Save the config to disk, creating `~/.hearth/` if necessary.
pub fn save(cfg: &Config) -> Result<(), HearthError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), HearthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| HearthError::Config(format!("failed to serialize config: {e}")))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(raw.as_bytes())?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)?;
    Ok(())
}
