//! Asset snapshot model: identity path, display name, type, dependencies, properties.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assets::types::TypeRef;

/// Unique package path of an asset, e.g. `/Game/Mats/MyMat`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetPath(String);

impl AssetPath {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment: `/Game/Mats/MyMat` → `MyMat`.
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Containing folder: `/Game/Mats/MyMat` → `/Game/Mats`.
    #[must_use]
    pub fn folder(&self) -> &str {
        self.0.rfind('/').map_or("", |idx| &self.0[..idx])
    }

    /// ASCII case-insensitive prefix test against a namespace like `/Game/`.
    #[must_use]
    pub fn is_in_namespace(&self, namespace: &str) -> bool {
        self.0
            .get(..namespace.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(namespace))
    }

    /// Sibling path with a different base name.
    #[must_use]
    pub fn with_base_name(&self, name: &str) -> Self {
        Self(format!("{}/{name}", self.folder()))
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind of a property a rule predicate reads. Wire values are 0-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    String,
    Byte,
    Int32,
    Float,
}

impl PropertyKind {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::String => 0,
            Self::Byte => 1,
            Self::Int32 => 2,
            Self::Float => 3,
        }
    }

    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::String),
            1 => Some(Self::Byte),
            2 => Some(Self::Int32),
            3 => Some(Self::Float),
            _ => None,
        }
    }

    /// Normalized value of a property that is absent or of another kind.
    #[must_use]
    pub fn default_value(self) -> String {
        match self {
            Self::String => String::new(),
            Self::Byte | Self::Int32 => "0".to_string(),
            Self::Float => format_float(0.0),
        }
    }
}

/// A typed property value carried on an asset snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValue {
    String(String),
    Byte(u8),
    Int32(i32),
    Float(f32),
}

impl PropertyValue {
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        match self {
            Self::String(_) => PropertyKind::String,
            Self::Byte(_) => PropertyKind::Byte,
            Self::Int32(_) => PropertyKind::Int32,
            Self::Float(_) => PropertyKind::Float,
        }
    }

    /// String form used for predicate comparison.
    #[must_use]
    pub fn normalized(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            Self::Byte(value) => value.to_string(),
            Self::Int32(value) => value.to_string(),
            Self::Float(value) => format_float(*value),
        }
    }
}

/// Canonical float text: integral values keep a trailing `.0` (`2` → `2.0`).
#[must_use]
pub fn format_float(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Read access to named, typed properties of an asset instance.
pub trait PropertySource {
    /// Normalized value of `name` read as `kind`.
    ///
    /// Absent properties, or properties stored as a different kind, read as
    /// the kind's default value instead of failing.
    fn read_property(&self, name: &str, kind: PropertyKind) -> String;
}

/// Immutable per-scan snapshot of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub path: AssetPath,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: TypeRef,
    #[serde(default)]
    pub dependencies: Vec<AssetPath>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Full object path of the destination, for redirection stubs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
}

impl Asset {
    /// Asset whose display name is its path's base name.
    #[must_use]
    pub fn new(path: impl Into<String>, asset_type: TypeRef) -> Self {
        let path = AssetPath::new(path);
        let name = path.base_name().to_string();
        Self {
            path,
            name,
            asset_type,
            dependencies: Vec::new(),
            properties: BTreeMap::new(),
            redirect_target: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, path: impl Into<String>) -> Self {
        self.dependencies.push(AssetPath::new(path));
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = Some(target.into());
        self
    }

    /// True when the display name equals the base name of the path.
    #[must_use]
    pub fn name_matches_path(&self) -> bool {
        self.name == self.path.base_name()
    }
}

impl PropertySource for Asset {
    fn read_property(&self, name: &str, kind: PropertyKind) -> String {
        self.properties
            .get(name)
            .filter(|value| value.kind() == kind)
            .map_or_else(|| kind.default_value(), PropertyValue::normalized)
    }
}
