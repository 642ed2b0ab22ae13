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

use super::{acquire_texture, release_texture, unresolved, MeshObject, ResourceContext, ShaderObject, TextureObject};
use crate::error::{AssetKind, RenderCoreError, Result};
use crate::pool::{DeviceObject, DevicePool};
use crate::variant::{BindingSlots, BlockSignature, ShaderVariantKey, TextureSignature};
use lumen_core::asset::{AssetId, Material, ParameterBlock, SharedAsset};
use lumen_core::renderer::{BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, LightCounts};

/// Minimum size and size granularity of a uniform block.
const BLOCK_ALIGNMENT: u64 = 16;

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Member offsets and total size of a packed parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    /// Byte offset of each member in declaration order.
    pub offsets: Vec<u64>,
    /// Total size, rounded up to 16 bytes.
    pub size: u64,
}

impl BlockLayout {
    /// Computes the std140 layout of a block from its member types.
    pub fn of(block: &ParameterBlock) -> Self {
        let mut cursor = 0;
        let offsets = block
            .parameters()
            .iter()
            .map(|p| {
                let ty = p.value.ty();
                let offset = align_up(cursor, ty.alignment());
                cursor = offset + ty.size();
                offset
            })
            .collect();
        Self {
            offsets,
            size: align_up(cursor, BLOCK_ALIGNMENT).max(BLOCK_ALIGNMENT),
        }
    }

    /// Packs the block's current values into bytes.
    pub fn pack(&self, block: &ParameterBlock) -> Vec<u8> {
        let mut bytes = vec![0u8; self.size as usize];
        for (parameter, offset) in block.parameters().iter().zip(&self.offsets) {
            let value = parameter.value.bytes();
            let start = *offset as usize;
            bytes[start..start + value.len()].copy_from_slice(&value);
        }
        bytes
    }
}

fn signature(block: &ParameterBlock) -> BlockSignature {
    BlockSignature {
        name: block.name.clone(),
        members: block
            .parameters()
            .iter()
            .map(|p| (p.name.clone(), p.value.ty()))
            .collect(),
    }
}

#[derive(Debug)]
struct UniformBlock {
    signature: BlockSignature,
    layout: BlockLayout,
    buffer: BufferId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BoundTexture {
    slot: String,
    texture: Option<AssetId>,
}

/// A compiled variant acquired from the shader pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    /// Pool id of the shader object.
    pub id: AssetId,
    /// Where the variant expects each resource.
    pub bindings: BindingSlots,
}

/// The uniform buffers and texture references of one logical material.
#[derive(Debug)]
pub struct MaterialObject {
    id: AssetId,
    asset: SharedAsset<Material>,
    blocks: Vec<UniformBlock>,
    textures: Vec<BoundTexture>,
    dirty_seen: bool,
    textures_changed: bool,
    blocks_relaid: bool,
}

impl MaterialObject {
    /// Resolves the material, uploads its blocks and acquires its textures.
    pub fn new(
        ctx: ResourceContext<'_>,
        id: AssetId,
        textures: &mut DevicePool<TextureObject>,
    ) -> Result<Self> {
        let asset = ctx
            .resolver
            .resolve_material(id)
            .ok_or_else(|| unresolved(AssetKind::Material, id))?;
        let mut object = Self {
            id,
            asset: asset.clone(),
            blocks: Vec::new(),
            textures: Vec::new(),
            dirty_seen: false,
            textures_changed: false,
            blocks_relaid: false,
        };
        let material = asset.read();
        let created = object
            .create_blocks(ctx, &material)
            .and_then(|_| object.resolve_textures(ctx, &material, textures));
        if let Err(e) = created {
            object.release_textures(ctx, textures);
            object.destroy(ctx.device);
            return Err(e);
        }
        Ok(object)
    }

    /// Re-uploads parameters and re-resolves textures according to the asset's dirty flags.
    ///
    /// Returns the bytes uploaded. A texture that fails to resolve leaves its
    /// slot unbound and is reported after every other slot has been processed.
    pub fn update(
        &mut self,
        ctx: ResourceContext<'_>,
        textures: &mut DevicePool<TextureObject>,
    ) -> Result<u64> {
        let asset = self.asset.clone();
        let material = asset.read();
        let mut uploaded = 0;
        if material.params_dirty() {
            self.dirty_seen = true;
            uploaded += self.upload_blocks(ctx, &material)?;
        }
        if material.textures_dirty() {
            self.dirty_seen = true;
            self.resolve_textures(ctx, &material, textures)?;
        }
        Ok(uploaded)
    }

    /// Clears the asset's dirty flags and this frame's change markers.
    pub fn after_update(&mut self) {
        if self.dirty_seen {
            self.asset.write().clear_dirty();
            self.dirty_seen = false;
        }
        self.textures_changed = false;
        self.blocks_relaid = false;
    }

    /// Whether the texture set or block structure changed this frame.
    pub fn needs_recompile(&self) -> bool {
        self.textures_changed || self.blocks_relaid
    }

    /// Whether the material reads light data.
    pub fn is_lit(&self) -> bool {
        self.asset.read().is_lit()
    }

    /// Uniform buffers in block declaration order.
    pub fn block_buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.blocks.iter().map(|b| b.buffer)
    }

    /// Texture held by each slot in declaration order.
    pub fn bound_textures(&self) -> impl Iterator<Item = Option<AssetId>> + '_ {
        self.textures.iter().map(|t| t.texture)
    }

    /// Generates the variant for a mesh and light counts and acquires it from the shader pool.
    ///
    /// The caller owns one reference to the returned shader.
    pub fn compile_shader(
        &self,
        ctx: ResourceContext<'_>,
        shaders: &mut DevicePool<ShaderObject>,
        mesh: &MeshObject,
        lights: LightCounts,
    ) -> Result<CompiledShader> {
        let material = self.asset.read();
        let key = ShaderVariantKey::new(
            mesh.slots(),
            self.blocks.iter().map(|b| b.signature.clone()).collect(),
            self.textures
                .iter()
                .map(|t| TextureSignature {
                    name: t.slot.clone(),
                    bound: t.texture.is_some(),
                })
                .collect(),
            material.is_lit(),
            lights,
        );
        let variant = key.generate(&ctx.config.shader_header, material.template());
        let label = ctx.label("shader", &material.label);
        shaders.get_or_create(variant.id, || {
            ShaderObject::compile(ctx, variant.id, &label, &variant.vertex, &variant.fragment)
        })?;
        Ok(CompiledShader {
            id: variant.id,
            bindings: variant.bindings,
        })
    }

    /// Releases every texture this material holds.
    pub fn release_textures(
        &mut self,
        ctx: ResourceContext<'_>,
        textures: &mut DevicePool<TextureObject>,
    ) {
        for bound in &mut self.textures {
            if let Some(id) = bound.texture.take() {
                release_texture(ctx, textures, id);
            }
        }
    }

    fn create_blocks(&mut self, ctx: ResourceContext<'_>, material: &Material) -> Result<u64> {
        let mut uploaded = 0;
        for block in material.blocks() {
            let layout = BlockLayout::of(block);
            let bytes = layout.pack(block);
            let buffer = ctx.device.create_buffer_with_data(
                &BufferDescriptor::new(
                    ctx.label("material", &format!("{}.{}", material.label, block.name)),
                    layout.size,
                    BufferUsage::UNIFORM,
                ),
                &bytes,
            )?;
            uploaded += bytes.len() as u64;
            self.blocks.push(UniformBlock {
                signature: signature(block),
                layout,
                buffer,
            });
        }
        Ok(uploaded)
    }

    fn upload_blocks(&mut self, ctx: ResourceContext<'_>, material: &Material) -> Result<u64> {
        let same_structure = self.blocks.len() == material.blocks().len()
            && self
                .blocks
                .iter()
                .zip(material.blocks())
                .all(|(ours, theirs)| ours.signature == signature(theirs));

        if !same_structure {
            log::debug!("Material {} block structure changed, relaying buffers", self.id);
            for block in self.blocks.drain(..) {
                if let Err(e) = ctx.device.destroy_buffer(block.buffer) {
                    log::warn!("Failed to destroy material buffer of {}: {e}", self.id);
                }
            }
            self.blocks_relaid = true;
            return self.create_blocks(ctx, material);
        }

        let mut uploaded = 0;
        for (ours, theirs) in self.blocks.iter().zip(material.blocks()) {
            let bytes = ours.layout.pack(theirs);
            ctx.device.write_buffer(ours.buffer, 0, &bytes)?;
            uploaded += bytes.len() as u64;
        }
        log::trace!("Re-uploaded {uploaded} bytes of material {}", self.id);
        Ok(uploaded)
    }

    fn resolve_textures(
        &mut self,
        ctx: ResourceContext<'_>,
        material: &Material,
        pool: &mut DevicePool<TextureObject>,
    ) -> Result<()> {
        let slots = material.texture_slots();
        let mut resolved = Vec::with_capacity(slots.len());
        let mut first_error: Option<RenderCoreError> = None;

        for (index, slot) in slots.iter().enumerate() {
            let previous = self.textures.get_mut(index);
            let kept = previous
                .as_ref()
                .is_some_and(|p| p.slot == slot.name && p.texture == slot.texture);
            if kept {
                if let Some(previous) = previous {
                    resolved.push(previous.clone());
                    previous.texture = None;
                }
                continue;
            }
            if let Some(old) = previous.and_then(|p| p.texture.take()) {
                release_texture(ctx, pool, old);
            }
            let texture = match slot.texture {
                Some(id) => match acquire_texture(ctx, pool, id) {
                    Ok(()) => Some(id),
                    Err(e) => {
                        first_error.get_or_insert(e);
                        None
                    }
                },
                None => None,
            };
            resolved.push(BoundTexture {
                slot: slot.name.clone(),
                texture,
            });
        }

        // Slots the material no longer declares.
        for stale in self.textures.iter_mut().skip(slots.len()) {
            if let Some(old) = stale.texture.take() {
                release_texture(ctx, pool, old);
            }
        }

        self.textures = resolved;
        self.textures_changed = true;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl DeviceObject for MaterialObject {
    fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for block in self.blocks.drain(..) {
            if let Err(e) = device.destroy_buffer(block.buffer) {
                log::warn!("Failed to destroy material buffer of {}: {e}", self.id);
            }
        }
        if self.textures.iter().any(|t| t.texture.is_some()) {
            log::warn!("Material {} destroyed while still holding textures", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use lumen_core::asset::{AssetRegistry, Mesh, ParameterValue, ShaderTemplate, Texture};
    use lumen_core::math::{LinearRgba, Vec3};
    use lumen_core::renderer::HeadlessDevice;

    struct Fixture {
        device: HeadlessDevice,
        registry: AssetRegistry,
        config: RendererConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                device: HeadlessDevice::new(),
                registry: AssetRegistry::new(),
                config: RendererConfig::default(),
            }
        }

        fn ctx(&self) -> ResourceContext<'_> {
            ResourceContext {
                device: &self.device,
                resolver: &self.registry,
                config: &self.config,
            }
        }
    }

    fn standard(albedo: Option<AssetId>) -> Material {
        Material::new("standard", ShaderTemplate::default())
            .with_block(
                ParameterBlock::new("surface")
                    .with("tint", ParameterValue::Vec3(Vec3::ONE))
                    .with("roughness", ParameterValue::Float(0.5)),
            )
            .with_texture_slot("albedo", albedo)
            .with_lighting(true)
    }

    #[test]
    fn layout_follows_std140_rules() {
        let block = ParameterBlock::new("b")
            .with("a", ParameterValue::Vec3(Vec3::ZERO))
            .with("b", ParameterValue::Float(1.0))
            .with("c", ParameterValue::Vec2([0.0; 2]))
            .with("d", ParameterValue::Color(LinearRgba::WHITE));
        let layout = BlockLayout::of(&block);
        assert_eq!(layout.offsets, vec![0, 12, 16, 32]);
        assert_eq!(layout.size, 48);

        let packed = layout.pack(&block);
        let roughness: f32 = bytemuck::pod_read_unaligned(&packed[12..16]);
        assert_eq!(roughness, 1.0);
        assert_eq!(BlockLayout::of(&ParameterBlock::new("empty")).size, 16);
    }

    #[test]
    fn dirty_parameters_are_rewritten_in_place() {
        let f = Fixture::new();
        let (id, asset) = f.registry.add_material(standard(None));
        let mut textures = DevicePool::new("texture");
        let mut material = MaterialObject::new(f.ctx(), id, &mut textures).unwrap();
        assert!(material.needs_recompile(), "a new material has no variant yet");
        material.after_update();
        let buffer = material.block_buffers().next().unwrap();

        asset
            .write()
            .set_parameter("surface", "roughness", ParameterValue::Float(0.25))
            .unwrap();
        assert_eq!(material.update(f.ctx(), &mut textures).unwrap(), 16);
        assert_eq!(material.block_buffers().next(), Some(buffer));
        let data = f.device.buffer_data(buffer).unwrap();
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&data[12..16]), 0.25);
        assert!(!material.needs_recompile());

        material.after_update();
        assert!(!asset.read().params_dirty());
    }

    #[test]
    fn texture_swap_releases_old_before_acquiring_new() {
        let f = Fixture::new();
        let (red, _) = f.registry.add_texture(Texture::solid("red", [255, 0, 0, 255]));
        let (blue, _) = f.registry.add_texture(Texture::solid("blue", [0, 0, 255, 255]));
        let (id, asset) = f.registry.add_material(standard(Some(red)));
        let mut textures = DevicePool::new("texture");
        let mut material = MaterialObject::new(f.ctx(), id, &mut textures).unwrap();
        assert_eq!(textures.ref_count(red), Some(1));

        asset.write().set_texture("albedo", Some(blue)).unwrap();
        material.update(f.ctx(), &mut textures).unwrap();
        assert!(!textures.contains(red));
        assert_eq!(textures.ref_count(blue), Some(1));
        assert!(material.needs_recompile());
        assert_eq!(f.device.stats().live_textures(), 1);
        assert_eq!(material.bound_textures().collect::<Vec<_>>(), vec![Some(blue)]);
    }

    #[test]
    fn unresolvable_texture_leaves_slot_unbound() {
        let f = Fixture::new();
        let (id, asset) = f.registry.add_material(standard(None));
        let mut textures = DevicePool::new("texture");
        let mut material = MaterialObject::new(f.ctx(), id, &mut textures).unwrap();

        let missing = AssetId::new();
        asset.write().set_texture("albedo", Some(missing)).unwrap();
        let err = material.update(f.ctx(), &mut textures).unwrap_err();
        assert_eq!(
            err,
            RenderCoreError::ResourceResolution {
                kind: AssetKind::Texture,
                id: missing
            }
        );
        assert_eq!(material.bound_textures().collect::<Vec<_>>(), vec![None]);
        assert!(textures.is_empty());
    }

    #[test]
    fn creation_failure_frees_everything() {
        let f = Fixture::new();
        let (id, _) = f.registry.add_material(standard(Some(AssetId::new())));
        let mut textures = DevicePool::new("texture");
        assert!(MaterialObject::new(f.ctx(), id, &mut textures).is_err());
        assert_eq!(f.device.stats().live_buffers(), 0);
    }

    #[test]
    fn same_inputs_share_one_compiled_shader() {
        let f = Fixture::new();
        let (mesh_id, _) = f.registry.add_mesh(Mesh::quad("quad"));
        let (id, _) = f.registry.add_material(standard(None));
        let mut textures = DevicePool::new("texture");
        let mut shaders = DevicePool::new("shader");
        let material = MaterialObject::new(f.ctx(), id, &mut textures).unwrap();
        let mesh = MeshObject::new(f.ctx(), mesh_id).unwrap();

        let lights = LightCounts {
            directional: 1,
            ..Default::default()
        };
        let a = material.compile_shader(f.ctx(), &mut shaders, &mesh, lights).unwrap();
        let b = material.compile_shader(f.ctx(), &mut shaders, &mesh, lights).unwrap();
        assert_eq!(a, b);
        assert_eq!(shaders.ref_count(a.id), Some(2));
        assert_eq!(f.device.stats().programs_created, 1);
        assert_eq!(a.bindings.lights, Some(1));
        assert_eq!(a.bindings.textures, vec![None]);

        let c = material
            .compile_shader(f.ctx(), &mut shaders, &mesh, LightCounts::default())
            .unwrap();
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn compile_error_is_not_cached() {
        let f = Fixture::new();
        let (mesh_id, _) = f.registry.add_mesh(Mesh::quad("quad"));
        let broken = ShaderTemplate {
            vertex: ShaderTemplate::default().vertex,
            fragment: "#error unsupported\nvoid main() {}\n".to_string(),
        };
        let (id, _) = f.registry.add_material(Material::new("broken", broken));
        let mut textures = DevicePool::new("texture");
        let mut shaders = DevicePool::new("shader");
        let material = MaterialObject::new(f.ctx(), id, &mut textures).unwrap();
        let mesh = MeshObject::new(f.ctx(), mesh_id).unwrap();

        let err = material
            .compile_shader(f.ctx(), &mut shaders, &mesh, LightCounts::default())
            .unwrap_err();
        match err {
            RenderCoreError::ShaderCompile { details, .. } => {
                assert!(details.contains("#error unsupported"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(shaders.is_empty());
    }
}
