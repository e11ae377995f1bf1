//! AHC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AhcError>;

/// Top-level error type for the asset hygiene checker.
#[derive(Debug, Error)]
pub enum AhcError {
    #[error("[AHC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[AHC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[AHC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[AHC-2001] inventory parse failure: {details}")]
    InventoryParse { details: String },

    #[error("[AHC-2002] unknown asset: {path}")]
    UnknownAsset { path: String },

    #[error("[AHC-2003] unknown check id {id}")]
    UnknownCheck { id: u16 },

    #[error("[AHC-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[AHC-3001] mutation failed for {path}: {details}")]
    Mutation { path: String, details: String },

    #[error("[AHC-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AHC-3003] scan orchestrator already started")]
    AlreadyStarted,

    #[error("[AHC-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl AhcError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "AHC-1001",
            Self::MissingConfig { .. } => "AHC-1002",
            Self::ConfigParse { .. } => "AHC-1003",
            Self::InventoryParse { .. } => "AHC-2001",
            Self::UnknownAsset { .. } => "AHC-2002",
            Self::UnknownCheck { .. } => "AHC-2003",
            Self::Serialization { .. } => "AHC-2101",
            Self::Mutation { .. } => "AHC-3001",
            Self::Io { .. } => "AHC-3002",
            Self::AlreadyStarted => "AHC-3003",
            Self::Runtime { .. } => "AHC-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for host-side mutation failures.
    #[must_use]
    pub fn mutation(path: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Mutation {
            path: path.into(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for AhcError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for AhcError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for AhcError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
