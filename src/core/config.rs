//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AhcError, Result};

/// Full AHC configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub rules: RulesConfig,
    pub store: StoreConfig,
    pub paths: PathsConfig,
}

/// Which assets a scan considers, and which types play special roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// Primary content namespace; only assets under it are scanned.
    pub namespace: String,
    /// Type whose instances seed the reachability analysis (levels/worlds).
    pub root_type: String,
    /// Type of redirection stubs.
    pub redirector_type: String,
    /// Drop assets whose display name differs from their path's base name.
    pub require_name_match: bool,
    /// Shell-style globs of asset paths that are never scanned.
    pub excluded_paths: Vec<String>,
}

/// Where the naming rule set lives inside the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    pub section: String,
    pub key: String,
}

/// Key-value store location: per-project or per-user settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub use_project_settings: bool,
    pub project_file: PathBuf,
    pub user_file: PathBuf,
}

/// Filesystem paths used by ahc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
    pub inventory: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            namespace: "/Game/".to_string(),
            root_type: "/Script/Engine.World".to_string(),
            redirector_type: "/Script/CoreUObject.ObjectRedirector".to_string(),
            require_name_match: true,
            excluded_paths: Vec::new(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            section: "Actions".to_string(),
            key: "NamingPatterns".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            use_project_settings: false,
            project_file: PathBuf::from(".ahc").join("settings.toml"),
            user_file: home_dir().join(".config").join("ahc").join("settings.toml"),
        }
    }
}

impl StoreConfig {
    /// The settings file currently in effect.
    #[must_use]
    pub fn active_file(&self) -> &Path {
        if self.use_project_settings {
            &self.project_file
        } else {
            &self.user_file
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            config_file: home.join(".config").join("ahc").join("config.toml"),
            activity_log: home
                .join(".local")
                .join("share")
                .join("ahc")
                .join("activity.jsonl"),
            inventory: PathBuf::from("inventory.json"),
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[AHC-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| AhcError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(AhcError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("AHC_SCAN_NAMESPACE") {
            self.scan.namespace = raw;
        }
        if let Some(raw) = lookup("AHC_SCAN_ROOT_TYPE") {
            self.scan.root_type = raw;
        }
        if let Some(raw) = lookup("AHC_SCAN_REDIRECTOR_TYPE") {
            self.scan.redirector_type = raw;
        }
        if let Some(raw) = lookup("AHC_SCAN_REQUIRE_NAME_MATCH") {
            self.scan.require_name_match = parse_env_bool("AHC_SCAN_REQUIRE_NAME_MATCH", &raw)?;
        }
        if let Some(raw) = lookup("AHC_STORE_USE_PROJECT_SETTINGS") {
            self.store.use_project_settings =
                parse_env_bool("AHC_STORE_USE_PROJECT_SETTINGS", &raw)?;
        }
        if let Some(raw) = lookup("AHC_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("AHC_INVENTORY") {
            self.paths.inventory = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Give the namespace its canonical `/Name/` form and trim type names.
    fn normalize(&mut self) {
        let trimmed = self.scan.namespace.trim();
        if !trimmed.is_empty() {
            let mut ns = trimmed.to_string();
            if !ns.starts_with('/') {
                ns.insert(0, '/');
            }
            if !ns.ends_with('/') {
                ns.push('/');
            }
            self.scan.namespace = ns;
        }
        self.scan.root_type = self.scan.root_type.trim().to_string();
        self.scan.redirector_type = self.scan.redirector_type.trim().to_string();
    }

    fn validate(&self) -> Result<()> {
        let ns = &self.scan.namespace;
        if ns.len() < 3 || !ns.starts_with('/') || !ns.ends_with('/') {
            return Err(AhcError::InvalidConfig {
                details: format!("scan.namespace must look like \"/Game/\", got {ns:?}"),
            });
        }

        for (name, val) in [
            ("scan.root_type", &self.scan.root_type),
            ("scan.redirector_type", &self.scan.redirector_type),
            ("rules.section", &self.rules.section),
            ("rules.key", &self.rules.key),
        ] {
            if val.trim().is_empty() {
                return Err(AhcError::InvalidConfig {
                    details: format!("{name} must not be empty"),
                });
            }
        }

        for pattern in &self.scan.excluded_paths {
            crate::scanner::exclusion::validate_glob_pattern(pattern)?;
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| AhcError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
