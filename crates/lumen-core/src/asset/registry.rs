// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::{shared, AssetId, Material, Mesh, SharedAsset, Texture};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves asset ids to the assets owned by the asset layer.
///
/// The renderer never caches a failed resolution; it asks again the next time
/// the reference changes.
pub trait AssetResolver: Send + Sync + std::fmt::Debug {
    /// Looks up a mesh.
    fn resolve_mesh(&self, id: AssetId) -> Option<SharedAsset<Mesh>>;
    /// Looks up a material.
    fn resolve_material(&self, id: AssetId) -> Option<SharedAsset<Material>>;
    /// Looks up a texture.
    fn resolve_texture(&self, id: AssetId) -> Option<SharedAsset<Texture>>;
}

/// A generic, thread-safe map from [`AssetId`] to shared assets of one type.
#[derive(Debug)]
struct AssetMap<T> {
    assets: RwLock<HashMap<AssetId, SharedAsset<T>>>,
}

impl<T> Default for AssetMap<T> {
    fn default() -> Self {
        Self {
            assets: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> AssetMap<T> {
    fn insert(&self, id: AssetId, asset: T) -> SharedAsset<T> {
        let handle = shared(asset);
        self.assets.write().insert(id, handle.clone());
        handle
    }

    fn get(&self, id: AssetId) -> Option<SharedAsset<T>> {
        self.assets.read().get(&id).cloned()
    }

    fn remove(&self, id: AssetId) -> Option<SharedAsset<T>> {
        self.assets.write().remove(&id)
    }

    fn contains(&self, id: AssetId) -> bool {
        self.assets.read().contains_key(&id)
    }

    fn len(&self) -> usize {
        self.assets.read().len()
    }
}

/// An in-memory [`AssetResolver`].
///
/// Insertion returns the shared handle so that callers can keep editing the
/// asset after handing it over.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    meshes: AssetMap<Mesh>,
    materials: AssetMap<Material>,
    textures: AssetMap<Texture>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a mesh under a fresh id.
    pub fn add_mesh(&self, mesh: Mesh) -> (AssetId, SharedAsset<Mesh>) {
        let id = AssetId::new();
        (id, self.meshes.insert(id, mesh))
    }

    /// Stores a material under a fresh id.
    pub fn add_material(&self, material: Material) -> (AssetId, SharedAsset<Material>) {
        let id = AssetId::new();
        (id, self.materials.insert(id, material))
    }

    /// Stores a texture under a fresh id.
    pub fn add_texture(&self, texture: Texture) -> (AssetId, SharedAsset<Texture>) {
        let id = AssetId::new();
        (id, self.textures.insert(id, texture))
    }

    /// Stores or replaces a mesh under a known id.
    pub fn insert_mesh(&self, id: AssetId, mesh: Mesh) -> SharedAsset<Mesh> {
        self.meshes.insert(id, mesh)
    }

    /// Stores or replaces a material under a known id.
    pub fn insert_material(&self, id: AssetId, material: Material) -> SharedAsset<Material> {
        self.materials.insert(id, material)
    }

    /// Stores or replaces a texture under a known id.
    pub fn insert_texture(&self, id: AssetId, texture: Texture) -> SharedAsset<Texture> {
        self.textures.insert(id, texture)
    }

    /// Removes a mesh.
    pub fn remove_mesh(&self, id: AssetId) -> Option<SharedAsset<Mesh>> {
        self.meshes.remove(id)
    }

    /// Removes a material.
    pub fn remove_material(&self, id: AssetId) -> Option<SharedAsset<Material>> {
        self.materials.remove(id)
    }

    /// Removes a texture.
    pub fn remove_texture(&self, id: AssetId) -> Option<SharedAsset<Texture>> {
        self.textures.remove(id)
    }

    /// Whether any asset of any kind is stored under `id`.
    pub fn contains(&self, id: AssetId) -> bool {
        self.meshes.contains(id) || self.materials.contains(id) || self.textures.contains(id)
    }

    /// Total number of stored assets.
    pub fn len(&self) -> usize {
        self.meshes.len() + self.materials.len() + self.textures.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetResolver for AssetRegistry {
    fn resolve_mesh(&self, id: AssetId) -> Option<SharedAsset<Mesh>> {
        self.meshes.get(id)
    }

    fn resolve_material(&self, id: AssetId) -> Option<SharedAsset<Material>> {
        self.materials.get(id)
    }

    fn resolve_texture(&self, id: AssetId) -> Option<SharedAsset<Texture>> {
        self.textures.get(id)
    }
}
