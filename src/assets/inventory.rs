//! Asset inventory: the pull-model source of asset snapshots.
//!
//! `AssetInventory` is the in-memory provider used by the CLI and tests. It
//! loads from a JSON manifest:
//!
//! ```json
//! {
//!   "types":  [{"name": "/Script/Game.EnemyBlueprint", "parent": "Blueprint"}],
//!   "assets": [{"path": "/Game/Mats/MyMat", "name": "MyMat", "type": "Material",
//!               "dependencies": [], "properties": {}}]
//! }
//! ```
//!
//! Asset types may be given as full paths or unambiguous short names; they are
//! canonicalized against the type registry at load time. Unknown type names
//! are kept verbatim and only ever match themselves.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::assets::model::{Asset, AssetPath};
use crate::assets::types::{TypeRef, TypeRegistry, TypeSystem};
use crate::core::errors::{AhcError, Result};

/// Read access to the asset inventory. Each call returns a consistent snapshot.
///
/// Dependency edges travel on each snapshot's `dependencies` field.
pub trait InventoryProvider: Send + Sync {
    /// Every asset, ordered by path.
    fn all_assets(&self) -> Vec<Asset>;

    /// Assets whose type is `ty` or derives from it.
    fn assets_by_type(&self, ty: &TypeRef) -> Vec<Asset>;

    fn asset(&self, path: &AssetPath) -> Option<Asset>;
}

/// Project-defined type declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub parent: String,
}

/// On-disk inventory manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// In-memory inventory keyed by asset path.
pub struct AssetInventory {
    types: Arc<TypeRegistry>,
    declared_types: Vec<TypeDecl>,
    assets: RwLock<BTreeMap<AssetPath, Asset>>,
}

impl AssetInventory {
    /// Inventory over the engine type hierarchy.
    #[must_use]
    pub fn new(assets: impl IntoIterator<Item = Asset>) -> Self {
        Self::with_types(Arc::new(TypeRegistry::with_engine_types()), assets)
    }

    #[must_use]
    pub fn with_types(types: Arc<TypeRegistry>, assets: impl IntoIterator<Item = Asset>) -> Self {
        let assets = assets
            .into_iter()
            .map(|asset| (asset.path.clone(), asset))
            .collect();
        Self {
            types,
            declared_types: Vec::new(),
            assets: RwLock::new(assets),
        }
    }

    /// Build from a parsed manifest; declared types are registered in order.
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let mut registry = TypeRegistry::with_engine_types();
        for decl in &manifest.types {
            registry.register(&decl.name, &decl.parent)?;
        }

        let mut assets = BTreeMap::new();
        for mut asset in manifest.assets {
            if asset.path.as_str().is_empty() {
                return Err(AhcError::InventoryParse {
                    details: "asset with empty path".to_string(),
                });
            }
            if let Some(resolved) = registry.resolve_type(asset.asset_type.as_str()) {
                asset.asset_type = resolved;
            }
            if asset.name.is_empty() {
                asset.name = asset.path.base_name().to_string();
            }
            if assets.insert(asset.path.clone(), asset).is_some() {
                return Err(AhcError::InventoryParse {
                    details: "duplicate asset path in manifest".to_string(),
                });
            }
        }

        Ok(Self {
            types: Arc::new(registry),
            declared_types: manifest.types,
            assets: RwLock::new(assets),
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(raw).map_err(|err| AhcError::InventoryParse {
                details: err.to_string(),
            })?;
        Self::from_manifest(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| AhcError::io(path, source))?;
        Self::from_json(&raw)
    }

    /// Current content as a manifest, assets ordered by path.
    #[must_use]
    pub fn to_manifest(&self) -> Manifest {
        Manifest {
            types: self.declared_types.clone(),
            assets: self.all_assets(),
        }
    }

    /// Write the manifest back atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = serde_json::to_string_pretty(&self.to_manifest())?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        fs::write(&tmp, rendered).map_err(|source| AhcError::io(&tmp, source))?;
        fs::rename(&tmp, path).map_err(|source| AhcError::io(path, source))
    }

    #[must_use]
    pub fn types(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.types)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    /// Insert or replace an asset; returns the previous snapshot.
    pub fn upsert(&self, asset: Asset) -> Option<Asset> {
        self.assets.write().insert(asset.path.clone(), asset)
    }

    pub fn remove(&self, path: &AssetPath) -> Option<Asset> {
        self.assets.write().remove(path)
    }

    /// Apply `edit` to every asset under one write lock.
    pub(crate) fn edit_all(&self, mut edit: impl FnMut(&mut Asset)) {
        for asset in self.assets.write().values_mut() {
            edit(asset);
        }
    }
}

impl InventoryProvider for AssetInventory {
    fn all_assets(&self) -> Vec<Asset> {
        self.assets.read().values().cloned().collect()
    }

    fn assets_by_type(&self, ty: &TypeRef) -> Vec<Asset> {
        self.assets
            .read()
            .values()
            .filter(|asset| self.types.is_subtype_of(&asset.asset_type, ty))
            .cloned()
            .collect()
    }

    fn asset(&self, path: &AssetPath) -> Option<Asset> {
        self.assets.read().get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "types": [{"name": "/Script/Game.EnemyBlueprint", "parent": "Blueprint"}],
        "assets": [
            {"path": "/Game/Levels/L1", "name": "L1", "type": "World",
             "dependencies": ["/Game/Mats/MyMat"]},
            {"path": "/Game/Mats/MyMat", "name": "MyMat", "type": "/Script/Engine.Material"},
            {"path": "/Game/BP/Grunt", "name": "Grunt", "type": "EnemyBlueprint"},
            {"path": "/Game/Misc/Gizmo", "name": "", "type": "/Script/Plugin.Gizmo"}
        ]
    }"#;

    #[test]
    fn manifest_types_are_canonicalized() {
        let inventory = AssetInventory::from_json(MANIFEST).unwrap();
        let level = inventory.asset(&AssetPath::new("/Game/Levels/L1")).unwrap();
        assert_eq!(level.asset_type.as_str(), "/Script/Engine.World");
        let grunt = inventory.asset(&AssetPath::new("/Game/BP/Grunt")).unwrap();
        assert_eq!(grunt.asset_type.as_str(), "/Script/Game.EnemyBlueprint");
    }

    #[test]
    fn unknown_type_is_kept_verbatim_and_name_defaults_to_base_name() {
        let inventory = AssetInventory::from_json(MANIFEST).unwrap();
        let gizmo = inventory.asset(&AssetPath::new("/Game/Misc/Gizmo")).unwrap();
        assert_eq!(gizmo.asset_type.as_str(), "/Script/Plugin.Gizmo");
        assert_eq!(gizmo.name, "Gizmo");
    }

    #[test]
    fn assets_by_type_includes_subtypes() {
        let inventory = AssetInventory::from_json(MANIFEST).unwrap();
        let blueprints = inventory.assets_by_type(&TypeRef::new("/Script/Engine.Blueprint"));
        assert_eq!(blueprints.len(), 1);
        assert_eq!(blueprints[0].path.as_str(), "/Game/BP/Grunt");
    }

    #[test]
    fn duplicate_paths_and_bad_parents_are_rejected() {
        let dup = r#"{"assets": [
            {"path": "/Game/A", "name": "A", "type": "Material"},
            {"path": "/Game/A", "name": "A", "type": "Material"}
        ]}"#;
        assert_eq!(AssetInventory::from_json(dup).err().unwrap().code(), "AHC-2001");

        let orphan_type = r#"{"types": [{"name": "/Script/X.Y", "parent": "Nope"}]}"#;
        assert!(AssetInventory::from_json(orphan_type).is_err());
        assert!(AssetInventory::from_json("[1, 2").is_err());
    }

    #[test]
    fn save_then_load_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let inventory = AssetInventory::from_json(MANIFEST).unwrap();
        inventory.save(&path).unwrap();

        let reloaded = AssetInventory::load(&path).unwrap();
        assert_eq!(reloaded.all_assets(), inventory.all_assets());
        assert_eq!(reloaded.to_manifest().types.len(), 1);
    }

    #[test]
    fn upsert_and_remove() {
        let inventory = AssetInventory::new(Vec::new());
        assert!(inventory.is_empty());
        let asset = Asset::new("/Game/Tex/Grass", TypeRef::new("/Script/Engine.Texture2D"));
        assert!(inventory.upsert(asset).is_none());
        assert_eq!(inventory.len(), 1);
        assert!(inventory.remove(&AssetPath::new("/Game/Tex/Grass")).is_some());
        assert!(inventory.is_empty());
    }
}
