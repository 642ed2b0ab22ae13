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

//! The unit of batching: every entity sharing one mesh and one material.

use crate::error::{RenderCoreError, Result};
use crate::objects::{CompiledShader, MaterialObject, MeshObject, ResourceContext, ShaderObject};
use crate::pool::DevicePool;
use crate::variant::{BindingSlots, INSTANCE_MATRIX_LOCATIONS};
use lumen_core::asset::AssetId;
use lumen_core::math::Mat4;
use lumen_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, LightCounts, VertexAttributeDescriptor,
    VertexBufferLayout, VertexFormat, VertexStepMode,
};
use lumen_core::scene::{EntityId, TransformRef};
use std::collections::BTreeMap;
use std::fmt;

/// Bytes of one instance record: a column-major model matrix.
pub const INSTANCE_STRIDE: u64 = std::mem::size_of::<Mat4>() as u64;

/// Identifies an instanced draw object by the pair it batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    /// The shared mesh.
    pub mesh: AssetId,
    /// The shared material.
    pub material: AssetId,
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.mesh, self.material)
    }
}

/// Capacity, in instances, after growing to fit `required`.
///
/// Capacity never shrinks and at least doubles when it grows.
pub fn grown_capacity(current: usize, required: usize) -> usize {
    if required <= current {
        current
    } else {
        (current * 2).max(required)
    }
}

/// The instance-matrix layout for a variant whose mesh inputs end at `first_location`.
pub fn instance_layout(first_location: u32) -> VertexBufferLayout {
    VertexBufferLayout {
        array_stride: INSTANCE_STRIDE,
        step_mode: VertexStepMode::Instance,
        attributes: (0..INSTANCE_MATRIX_LOCATIONS)
            .map(|column| VertexAttributeDescriptor {
                format: VertexFormat::Float32x4,
                offset: u64::from(column) * VertexFormat::Float32x4.size(),
                shader_location: first_location + column,
            })
            .collect(),
    }
}

/// What an update of one draw object did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceUpdate {
    /// Instance bytes written.
    pub uploaded_bytes: u64,
    /// Whether a variant was compiled or re-acquired.
    pub compiled: bool,
    /// Whether the instance buffer was reallocated.
    pub resized: bool,
}

/// The read-only state the renderer needs to draw an object.
#[derive(Debug, Clone, Copy)]
pub struct DrawBindings<'a> {
    /// Pool id of the bound shader.
    pub shader: AssetId,
    /// Where each resource goes.
    pub bindings: &'a BindingSlots,
    /// The instance buffer.
    pub instance_buffer: BufferId,
    /// The instance layout.
    pub instance_layout: &'a VertexBufferLayout,
    /// Instances to draw.
    pub instance_count: u32,
}

/// One (mesh, material) pair and the transforms of every entity drawn with it.
///
/// Holds one pool reference each to its mesh and material (taken by the
/// manager) and to its current shader variant.
#[derive(Debug)]
pub struct InstancedDrawObject {
    key: InstanceKey,
    transforms: BTreeMap<EntityId, TransformRef>,
    instance_buffer: BufferId,
    capacity: usize,
    uploaded_count: usize,
    force_update: bool,
    shader: Option<CompiledShader>,
    instance_layout: VertexBufferLayout,
    compiled_lights: LightCounts,
    compile_failed: bool,
}

impl InstancedDrawObject {
    /// Creates an empty object with an instance buffer for `capacity` instances.
    pub fn new(ctx: ResourceContext<'_>, key: InstanceKey, capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let instance_buffer = create_instance_buffer(ctx, key, capacity)?;
        Ok(Self {
            key,
            transforms: BTreeMap::new(),
            instance_buffer,
            capacity,
            uploaded_count: 0,
            force_update: true,
            shader: None,
            instance_layout: instance_layout(0),
            compiled_lights: LightCounts::default(),
            compile_failed: false,
        })
    }

    /// Adds or replaces the transform of `entity`.
    pub fn insert(&mut self, entity: EntityId, transform: TransformRef) {
        self.transforms.insert(entity, transform);
        self.force_update = true;
    }

    /// Removes the transform of `entity`. Returns whether it was present.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let removed = self.transforms.remove(&entity).is_some();
        self.force_update |= removed;
        removed
    }

    /// Uploads instance data and recompiles the variant as needed.
    ///
    /// Recompiles when no variant is bound yet, when the material's texture set
    /// changed, when the mesh was rebuilt, or, for lit materials, when the
    /// light counts changed. The new variant is acquired before the old one is
    /// released. On failure no variant stays bound and the object is skipped
    /// at draw time until one of those inputs changes again.
    pub fn update(
        &mut self,
        ctx: ResourceContext<'_>,
        mesh: &MeshObject,
        material: &MaterialObject,
        shaders: &mut DevicePool<ShaderObject>,
        lights: LightCounts,
    ) -> Result<InstanceUpdate> {
        let mut outcome = InstanceUpdate::default();

        let required = self.transforms.len();
        let capacity = grown_capacity(self.capacity, required);
        if capacity != self.capacity {
            let buffer = create_instance_buffer(ctx, self.key, capacity)?;
            destroy_buffer(ctx.device, self.instance_buffer);
            log::debug!(
                "Instance buffer of {} grew {} -> {capacity}",
                self.key,
                self.capacity
            );
            self.instance_buffer = buffer;
            self.capacity = capacity;
            outcome.resized = true;
        }

        outcome.uploaded_bytes = self.upload(ctx.device, outcome.resized)?;

        let lights_changed = material.is_lit() && lights != self.compiled_lights;
        let inputs_changed = material.needs_recompile() || mesh.rebuilt() || lights_changed;
        let unbound = self.shader.is_none() && !self.compile_failed;
        if inputs_changed || unbound {
            self.recompile(ctx, mesh, material, shaders, lights)?;
            outcome.compiled = true;
        }
        Ok(outcome)
    }

    fn upload(&mut self, device: &dyn GraphicsDevice, resized: bool) -> Result<u64> {
        let count = self.transforms.len();
        let full = resized || self.force_update || count != self.uploaded_count;
        if full {
            let matrices: Vec<Mat4> = self.transforms.values().map(TransformRef::world_matrix).collect();
            let bytes: &[u8] = bytemuck::cast_slice(&matrices);
            if !bytes.is_empty() {
                device.write_buffer(self.instance_buffer, 0, bytes)?;
            }
            self.uploaded_count = count;
            log::trace!("Uploaded {count} instances of {}", self.key);
            return Ok(bytes.len() as u64);
        }

        // Only moved transforms, coalesced into contiguous runs.
        let mut uploaded = 0;
        let mut run: Vec<Mat4> = Vec::new();
        let mut run_start = 0;
        for (index, transform) in self.transforms.values().enumerate() {
            if transform.world_changed() {
                if run.is_empty() {
                    run_start = index;
                }
                run.push(transform.world_matrix());
                continue;
            }
            uploaded += self.flush_run(device, run_start, &mut run)?;
        }
        uploaded += self.flush_run(device, run_start, &mut run)?;
        Ok(uploaded)
    }

    fn flush_run(&self, device: &dyn GraphicsDevice, start: usize, run: &mut Vec<Mat4>) -> Result<u64> {
        if run.is_empty() {
            return Ok(0);
        }
        let bytes: &[u8] = bytemuck::cast_slice(run);
        device.write_buffer(self.instance_buffer, start as u64 * INSTANCE_STRIDE, bytes)?;
        let written = bytes.len() as u64;
        run.clear();
        Ok(written)
    }

    fn recompile(
        &mut self,
        ctx: ResourceContext<'_>,
        mesh: &MeshObject,
        material: &MaterialObject,
        shaders: &mut DevicePool<ShaderObject>,
        lights: LightCounts,
    ) -> Result<()> {
        self.compiled_lights = lights;
        let compiled = material.compile_shader(ctx, shaders, mesh, lights);
        let previous = self.shader.take();
        if let Some(previous) = previous {
            if let Err(e) = shaders.release(previous.id, ctx.device) {
                log::warn!("{e}");
            }
        }
        match compiled {
            Ok(shader) => {
                self.instance_layout = instance_layout(shader.bindings.instance_location);
                self.shader = Some(shader);
                self.compile_failed = false;
                Ok(())
            }
            Err(e) => {
                self.compile_failed = true;
                Err(e)
            }
        }
    }

    /// Clears the per-frame update marker.
    pub fn after_update(&mut self) {
        self.force_update = false;
    }

    /// What the renderer binds to draw this object, or `None` if it cannot be drawn.
    pub fn draw_bindings(&self) -> Option<DrawBindings<'_>> {
        let shader = self.shader.as_ref()?;
        if self.transforms.is_empty() {
            return None;
        }
        Some(DrawBindings {
            shader: shader.id,
            bindings: &shader.bindings,
            instance_buffer: self.instance_buffer,
            instance_layout: &self.instance_layout,
            instance_count: self.transforms.len() as u32,
        })
    }

    /// The binding slots of the current variant.
    ///
    /// Querying before the first successful update is a contract violation.
    pub fn bindings(&self) -> Result<&BindingSlots> {
        self.shader.as_ref().map(|s| &s.bindings).ok_or_else(|| {
            RenderCoreError::InvariantViolation(format!(
                "binding slots of {} queried before a variant was compiled",
                self.key
            ))
        })
    }

    /// Releases the shader reference and frees the instance buffer.
    ///
    /// Mesh and material references are returned by the manager.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice, shaders: &mut DevicePool<ShaderObject>) {
        if let Some(shader) = self.shader.take() {
            if let Err(e) = shaders.release(shader.id, device) {
                log::warn!("{e}");
            }
        }
        destroy_buffer(device, self.instance_buffer);
    }

    /// The pair this object batches.
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether no entity uses this pair anymore.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Whether `entity` is batched here.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.transforms.contains_key(&entity)
    }

    /// Instance buffer capacity in instances.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The instance buffer.
    pub fn instance_buffer(&self) -> BufferId {
        self.instance_buffer
    }

    /// Pool id of the bound shader, if any.
    pub fn shader(&self) -> Option<AssetId> {
        self.shader.as_ref().map(|s| s.id)
    }
}

fn create_instance_buffer(
    ctx: ResourceContext<'_>,
    key: InstanceKey,
    capacity: usize,
) -> Result<BufferId> {
    Ok(ctx.device.create_buffer(&BufferDescriptor::new(
        ctx.label("instances", &key.to_string()),
        capacity as u64 * INSTANCE_STRIDE,
        BufferUsage::INSTANCE,
    ))?)
}

fn destroy_buffer(device: &dyn GraphicsDevice, buffer: BufferId) {
    if let Err(e) = device.destroy_buffer(buffer) {
        log::warn!("Failed to destroy instance buffer: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use lumen_core::asset::{AssetRegistry, Material, Mesh, ShaderTemplate};
    use lumen_core::renderer::HeadlessDevice;

    #[test]
    fn capacity_doubles_or_fits() {
        assert_eq!(grown_capacity(16, 16), 16);
        assert_eq!(grown_capacity(16, 17), 32);
        assert_eq!(grown_capacity(4, 100), 100);
        assert_eq!(grown_capacity(8, 3), 8);
    }

    #[test]
    fn capacity_is_monotonic_over_insertions() {
        let mut capacity = 1;
        for required in 0..500 {
            let next = grown_capacity(capacity, required);
            assert!(next >= capacity);
            assert!(next >= required);
            if next != capacity {
                assert!(next >= capacity * 2);
            }
            capacity = next;
        }
    }

    #[test]
    fn instance_layout_follows_mesh_locations() {
        let layout = instance_layout(3);
        assert_eq!(layout.array_stride, 64);
        assert_eq!(layout.step_mode, VertexStepMode::Instance);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![3, 4, 5, 6]);
        assert_eq!(layout.attributes[2].offset, 32);
    }

    #[test]
    fn bindings_fail_until_a_variant_is_compiled() {
        let device = HeadlessDevice::new();
        let registry = AssetRegistry::new();
        let config = RendererConfig::default();
        let ctx = ResourceContext {
            device: &device,
            resolver: &registry,
            config: &config,
        };
        let (mesh_id, _) = registry.add_mesh(Mesh::quad("quad"));
        let (material_id, _) =
            registry.add_material(Material::new("flat", ShaderTemplate::default()));
        let mut textures = DevicePool::new("texture");
        let mut shaders = DevicePool::new("shader");
        let mesh = MeshObject::new(ctx, mesh_id).unwrap();
        let material = MaterialObject::new(ctx, material_id, &mut textures).unwrap();
        let key = InstanceKey {
            mesh: mesh_id,
            material: material_id,
        };
        let mut object = InstancedDrawObject::new(ctx, key, 4).unwrap();
        object.insert(EntityId::new(0, 0), TransformRef::default());

        assert!(matches!(
            object.bindings(),
            Err(RenderCoreError::InvariantViolation(_))
        ));
        assert!(object.draw_bindings().is_none());

        let outcome = object
            .update(ctx, &mesh, &material, &mut shaders, LightCounts::default())
            .unwrap();
        assert!(outcome.compiled);
        assert!(object.bindings().is_ok());
        assert!(object.draw_bindings().is_some());
    }
}
