//! Single-rooted type hierarchy: parent-pointer table with name resolution.
//!
//! Types are identified by their full path (`/Script/Engine.Material`). The
//! registry also resolves the short name after the last `.` (`Material`) as
//! long as exactly one registered type carries it.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{AhcError, Result};

/// Reference to a type by its full path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `/Script/Engine.Material` → `Material`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        short_name_of(&self.0)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn short_name_of(path: &str) -> &str {
    path.rsplit(['.', '/']).next().unwrap_or(path)
}

/// Type hierarchy queries used by the rule engine and the checks.
pub trait TypeSystem: Send + Sync {
    /// True when `ty` is `ancestor` or derives from it.
    fn is_subtype_of(&self, ty: &TypeRef, ancestor: &TypeRef) -> bool;

    /// Resolve a full path or unambiguous short name to a known type.
    fn resolve_type(&self, name: &str) -> Option<TypeRef>;

    /// True when `ty` derives from `ancestor` and is not `ancestor` itself.
    fn is_strict_subtype_of(&self, ty: &TypeRef, ancestor: &TypeRef) -> bool {
        ty != ancestor && self.is_subtype_of(ty, ancestor)
    }
}

pub const OBJECT: &str = "/Script/CoreUObject.Object";

/// Engine types known out of the box, as `(type, parent)` in parent-first order.
const ENGINE_TYPES: &[(&str, &str)] = &[
    ("/Script/CoreUObject.ObjectRedirector", OBJECT),
    ("/Script/Engine.World", OBJECT),
    ("/Script/Engine.Blueprint", OBJECT),
    ("/Script/Engine.AnimBlueprint", "/Script/Engine.Blueprint"),
    ("/Script/UMGEditor.WidgetBlueprint", "/Script/Engine.Blueprint"),
    ("/Script/Engine.UserDefinedStruct", OBJECT),
    ("/Script/Engine.UserDefinedEnum", OBJECT),
    ("/Script/Engine.MaterialInterface", OBJECT),
    ("/Script/Engine.Material", "/Script/Engine.MaterialInterface"),
    ("/Script/Engine.MaterialInstance", "/Script/Engine.MaterialInterface"),
    (
        "/Script/Engine.MaterialInstanceConstant",
        "/Script/Engine.MaterialInstance",
    ),
    ("/Script/Engine.StreamableRenderAsset", OBJECT),
    ("/Script/Engine.StaticMesh", "/Script/Engine.StreamableRenderAsset"),
    ("/Script/Engine.SkeletalMesh", "/Script/Engine.StreamableRenderAsset"),
    ("/Script/Engine.Texture", "/Script/Engine.StreamableRenderAsset"),
    ("/Script/Engine.Texture2D", "/Script/Engine.Texture"),
    ("/Script/Engine.TextureCube", "/Script/Engine.Texture"),
    ("/Script/Engine.TextureRenderTarget", "/Script/Engine.Texture"),
    (
        "/Script/Engine.TextureRenderTarget2D",
        "/Script/Engine.TextureRenderTarget",
    ),
    (
        "/Script/Engine.TextureRenderTargetCube",
        "/Script/Engine.TextureRenderTarget",
    ),
    ("/Script/MediaAssets.MediaTexture", "/Script/Engine.Texture"),
    ("/Script/MediaAssets.MediaPlayer", OBJECT),
    ("/Script/Engine.ParticleSystem", OBJECT),
    ("/Script/Engine.AnimationAsset", OBJECT),
    ("/Script/Engine.AnimSequenceBase", "/Script/Engine.AnimationAsset"),
    ("/Script/Engine.AnimSequence", "/Script/Engine.AnimSequenceBase"),
    ("/Script/Engine.AnimCompositeBase", "/Script/Engine.AnimSequenceBase"),
    ("/Script/Engine.AnimComposite", "/Script/Engine.AnimCompositeBase"),
    ("/Script/Engine.AnimMontage", "/Script/Engine.AnimCompositeBase"),
    ("/Script/Engine.BlendSpace", "/Script/Engine.AnimationAsset"),
    ("/Script/Engine.BlendSpace1D", "/Script/Engine.BlendSpace"),
    ("/Script/Engine.AimOffsetBlendSpace", "/Script/Engine.BlendSpace"),
    ("/Script/Engine.AimOffsetBlendSpace1D", "/Script/Engine.BlendSpace1D"),
    ("/Script/Engine.Rig", OBJECT),
    ("/Script/Engine.Skeleton", OBJECT),
    ("/Script/Engine.Font", OBJECT),
];

/// Parent-pointer table built at startup.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    parents: HashMap<String, Option<String>>,
    by_short_name: HashMap<String, Vec<String>>,
}

impl TypeRegistry {
    /// Registry holding only the root object type.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.insert(OBJECT, None);
        registry
    }

    /// Registry pre-populated with the engine hierarchy.
    #[must_use]
    pub fn with_engine_types() -> Self {
        let mut registry = Self::new();
        for (name, parent) in ENGINE_TYPES {
            registry.insert(name, Some(parent));
        }
        registry
    }

    /// Add a type under an already-known parent.
    ///
    /// Re-registering a type with the same parent is a no-op; moving an
    /// existing type to another parent is rejected.
    pub fn register(&mut self, name: &str, parent: &str) -> Result<TypeRef> {
        let Some(parent_ref) = self.resolve_type(parent) else {
            return Err(AhcError::InventoryParse {
                details: format!("type {name:?} declares unknown parent {parent:?}"),
            });
        };
        if let Some(existing) = self.parents.get(name) {
            return if existing.as_deref() == Some(parent_ref.as_str()) {
                Ok(TypeRef::new(name))
            } else {
                Err(AhcError::InventoryParse {
                    details: format!("type {name:?} is already registered under another parent"),
                })
            };
        }
        self.insert(name, Some(parent_ref.as_str()));
        Ok(TypeRef::new(name))
    }

    #[must_use]
    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.parents.contains_key(ty.as_str())
    }

    #[must_use]
    pub fn parent_of(&self, ty: &TypeRef) -> Option<TypeRef> {
        self.parents
            .get(ty.as_str())
            .and_then(Clone::clone)
            .map(TypeRef::new)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn insert(&mut self, name: &str, parent: Option<&str>) {
        self.parents
            .insert(name.to_string(), parent.map(str::to_string));
        self.by_short_name
            .entry(short_name_of(name).to_string())
            .or_default()
            .push(name.to_string());
    }
}

impl TypeSystem for TypeRegistry {
    fn is_subtype_of(&self, ty: &TypeRef, ancestor: &TypeRef) -> bool {
        if ty == ancestor {
            return true;
        }
        let mut current = ty.as_str();
        // Chains are acyclic by construction; the bound only guards corrupted input.
        for _ in 0..self.parents.len() {
            match self.parents.get(current) {
                Some(Some(parent)) if parent == ancestor.as_str() => return true,
                Some(Some(parent)) => current = parent,
                _ => return false,
            }
        }
        false
    }

    fn resolve_type(&self, name: &str) -> Option<TypeRef> {
        let name = name.trim();
        if self.parents.contains_key(name) {
            return Some(TypeRef::new(name));
        }
        match self.by_short_name.get(name).map(Vec::as_slice) {
            Some([only]) => Some(TypeRef::new(only.clone())),
            _ => None,
        }
    }
}
