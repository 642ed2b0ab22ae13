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

//! The owner of every pooled device object and instanced draw object.
//!
//! Device objects never point back at the manager. Instanced draw objects hold
//! the asset ids of their mesh, material and shader, and the manager returns
//! those references to the pools on their behalf.

use crate::config::RendererConfig;
use crate::error::{ErrorScope, RenderCoreError, Result, ScopedError};
use crate::instanced::{InstanceKey, InstanceUpdate, InstancedDrawObject};
use crate::objects::{MaterialObject, MeshObject, ResourceContext, ShaderObject, TextureObject};
use crate::pool::DevicePool;
use lumen_core::asset::{AssetId, AssetResolver};
use lumen_core::renderer::{GraphicsDevice, LightCounts};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Live object counts per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Pooled mesh objects.
    pub meshes: usize,
    /// Pooled material objects.
    pub materials: usize,
    /// Pooled shader objects.
    pub shaders: usize,
    /// Pooled texture objects.
    pub textures: usize,
    /// Instanced draw objects.
    pub instanced: usize,
}

/// Totals of one [`DeviceObjectManager::update`] pass.
#[derive(Debug, Default)]
pub struct PoolUpdate {
    /// Bytes uploaded by every object.
    pub uploaded_bytes: u64,
    /// Variants compiled or re-acquired.
    pub shader_compilations: usize,
    /// Per-object failures.
    pub errors: Vec<ScopedError>,
}

/// Owns the mesh, material, shader and texture pools and the instanced draw objects.
#[derive(Debug)]
pub struct DeviceObjectManager {
    device: Arc<dyn GraphicsDevice>,
    resolver: Arc<dyn AssetResolver>,
    config: RendererConfig,
    meshes: DevicePool<MeshObject>,
    materials: DevicePool<MaterialObject>,
    shaders: DevicePool<ShaderObject>,
    textures: DevicePool<TextureObject>,
    instanced: BTreeMap<InstanceKey, InstancedDrawObject>,
}

/// Borrows only the fields a context needs, so the pools stay free for `&mut` use.
fn context<'a>(
    device: &'a Arc<dyn GraphicsDevice>,
    resolver: &'a Arc<dyn AssetResolver>,
    config: &'a RendererConfig,
) -> ResourceContext<'a> {
    ResourceContext {
        device: device.as_ref(),
        resolver: resolver.as_ref(),
        config,
    }
}

impl DeviceObjectManager {
    /// Creates a manager with empty pools.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        resolver: Arc<dyn AssetResolver>,
        config: RendererConfig,
    ) -> Self {
        Self {
            device,
            resolver,
            config,
            meshes: DevicePool::new("mesh"),
            materials: DevicePool::new("material"),
            shaders: DevicePool::new("shader"),
            textures: DevicePool::new("texture"),
            instanced: BTreeMap::new(),
        }
    }

    fn ctx(&self) -> ResourceContext<'_> {
        context(&self.device, &self.resolver, &self.config)
    }

    /// Acquires the mesh object for `id`, creating it on first use.
    pub fn acquire_mesh(&mut self, id: AssetId) -> Result<&MeshObject> {
        let ctx = context(&self.device, &self.resolver, &self.config);
        self.meshes
            .get_or_create(id, || MeshObject::new(ctx, id))
            .map(|mesh| &*mesh)
    }

    /// Acquires the material object for `id`, creating it and its textures on first use.
    pub fn acquire_material(&mut self, id: AssetId) -> Result<&MaterialObject> {
        let ctx = context(&self.device, &self.resolver, &self.config);
        let textures = &mut self.textures;
        self.materials
            .get_or_create(id, || MaterialObject::new(ctx, id, textures))
            .map(|material| &*material)
    }

    /// Drops one owner of a mesh object.
    pub fn release_mesh(&mut self, id: AssetId) -> Result<bool> {
        self.meshes.release(id, self.device.as_ref())
    }

    /// Drops one owner of a material object, returning its textures when it is destroyed.
    pub fn release_material(&mut self, id: AssetId) -> Result<bool> {
        let ctx = context(&self.device, &self.resolver, &self.config);
        if self.materials.ref_count(id) == Some(1) {
            if let Some(material) = self.materials.get_mut(id) {
                material.release_textures(ctx, &mut self.textures);
            }
        }
        self.materials.release(id, ctx.device)
    }

    /// Returns the draw object for `key`, creating it and acquiring its mesh and material on first use.
    pub fn get_or_add_instanced(&mut self, key: InstanceKey) -> Result<&mut InstancedDrawObject> {
        if !self.instanced.contains_key(&key) {
            self.acquire_mesh(key.mesh)?;
            if let Err(e) = self.acquire_material(key.material) {
                self.release_mesh(key.mesh)?;
                return Err(e);
            }
            let capacity = self.config.initial_instance_capacity;
            match InstancedDrawObject::new(self.ctx(), key, capacity) {
                Ok(object) => {
                    log::debug!("Created instanced draw object {key}");
                    self.instanced.insert(key, object);
                }
                Err(e) => {
                    self.release_material(key.material)?;
                    self.release_mesh(key.mesh)?;
                    return Err(e);
                }
            }
        }
        self.instanced.get_mut(&key).ok_or_else(|| {
            RenderCoreError::InvariantViolation(format!("instanced draw object {key} vanished"))
        })
    }

    /// Destroys the draw object for `key` and returns its shader, material and mesh references.
    pub fn remove_instanced(&mut self, key: InstanceKey) -> Result<()> {
        let Some(mut object) = self.instanced.remove(&key) else {
            return Err(RenderCoreError::InvariantViolation(format!(
                "instanced draw object {key} does not exist"
            )));
        };
        object.destroy(self.device.as_ref(), &mut self.shaders);
        self.release_material(key.material)?;
        self.release_mesh(key.mesh)?;
        log::debug!("Destroyed instanced draw object {key}");
        Ok(())
    }

    /// The draw object for `key`.
    pub fn instanced(&self, key: InstanceKey) -> Option<&InstancedDrawObject> {
        self.instanced.get(&key)
    }

    /// The draw object for `key`, mutably.
    pub fn instanced_mut(&mut self, key: InstanceKey) -> Option<&mut InstancedDrawObject> {
        self.instanced.get_mut(&key)
    }

    /// Every draw object in key order.
    pub fn instanced_objects(&self) -> impl Iterator<Item = &InstancedDrawObject> {
        self.instanced.values()
    }

    /// Refreshes every pooled object from its asset, then every draw object.
    ///
    /// Textures go first so materials see their new device textures, meshes and
    /// materials before the draw objects that compile against them. A failure
    /// is recorded against the failing object and the pass continues.
    pub fn update(&mut self, lights: LightCounts) -> PoolUpdate {
        let ctx = context(&self.device, &self.resolver, &self.config);
        let mut report = PoolUpdate::default();

        for (id, texture) in self.textures.iter_mut() {
            match texture.update(ctx) {
                Ok(bytes) => report.uploaded_bytes += bytes,
                Err(e) => report.errors.push(ScopedError::new(ErrorScope::Texture(id), e)),
            }
        }
        for (id, mesh) in self.meshes.iter_mut() {
            match mesh.update(ctx) {
                Ok(bytes) => report.uploaded_bytes += bytes,
                Err(e) => report.errors.push(ScopedError::new(ErrorScope::Mesh(id), e)),
            }
        }
        let textures = &mut self.textures;
        for (id, material) in self.materials.iter_mut() {
            match material.update(ctx, textures) {
                Ok(bytes) => report.uploaded_bytes += bytes,
                Err(e) => report.errors.push(ScopedError::new(ErrorScope::Material(id), e)),
            }
        }

        for (key, object) in self.instanced.iter_mut() {
            let (Some(mesh), Some(material)) =
                (self.meshes.get(key.mesh), self.materials.get(key.material))
            else {
                report.errors.push(ScopedError::new(
                    ErrorScope::Instanced(*key),
                    RenderCoreError::InvariantViolation(format!(
                        "{key} lost its mesh or material"
                    )),
                ));
                continue;
            };
            match object.update(ctx, mesh, material, &mut self.shaders, lights) {
                Ok(InstanceUpdate {
                    uploaded_bytes,
                    compiled,
                    ..
                }) => {
                    report.uploaded_bytes += uploaded_bytes;
                    report.shader_compilations += usize::from(compiled);
                }
                Err(e) => report.errors.push(ScopedError::new(ErrorScope::Instanced(*key), e)),
            }
        }
        report
    }

    /// Clears every object's per-frame flags.
    pub fn after_update(&mut self) {
        for (_, texture) in self.textures.iter_mut() {
            texture.after_update();
        }
        for (_, mesh) in self.meshes.iter_mut() {
            mesh.after_update();
        }
        for (_, material) in self.materials.iter_mut() {
            material.after_update();
        }
        for object in self.instanced.values_mut() {
            object.after_update();
        }
    }

    /// Destroys every draw object, then anything still pooled.
    pub fn shutdown(&mut self) {
        let keys: Vec<InstanceKey> = self.instanced.keys().copied().collect();
        for key in keys {
            if let Err(e) = self.remove_instanced(key) {
                log::warn!("{e}");
            }
        }
        let device = self.device.as_ref();
        let leaked = self.shaders.clear(device)
            + self.materials.clear(device)
            + self.meshes.clear(device)
            + self.textures.clear(device);
        if leaked > 0 {
            log::warn!("{leaked} device object(s) were still owned at shutdown");
        }
    }

    /// Live object counts.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            meshes: self.meshes.len(),
            materials: self.materials.len(),
            shaders: self.shaders.len(),
            textures: self.textures.len(),
            instanced: self.instanced.len(),
        }
    }

    /// The mesh pool.
    pub fn meshes(&self) -> &DevicePool<MeshObject> {
        &self.meshes
    }

    /// The material pool.
    pub fn materials(&self) -> &DevicePool<MaterialObject> {
        &self.materials
    }

    /// The shader pool.
    pub fn shaders(&self) -> &DevicePool<ShaderObject> {
        &self.shaders
    }

    /// The texture pool.
    pub fn textures(&self) -> &DevicePool<TextureObject> {
        &self.textures
    }

    /// The device objects are created on.
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// The renderer settings.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
}
