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

use super::{unresolved, ResourceContext};
use crate::error::{AssetKind, RenderCoreError, Result};
use crate::pool::DeviceObject;
use lumen_core::asset::{AssetId, Mesh, SharedAsset, VertexAttribute};
use lumen_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, VertexAttributeDescriptor,
    VertexBufferLayout, VertexStepMode,
};

/// Vertex buffer slot of every attribute, `-1` when the mesh lacks it.
pub type AttributeSlots = [i32; VertexAttribute::COUNT];

#[derive(Debug)]
struct MeshBuffers {
    vertex: BufferId,
    index: Option<BufferId>,
    layout: VertexBufferLayout,
    slots: AttributeSlots,
    element_count: u32,
    bytes: u64,
}

/// The interleaved vertex buffer and index buffer of one logical mesh.
#[derive(Debug)]
pub struct MeshObject {
    id: AssetId,
    asset: SharedAsset<Mesh>,
    buffers: MeshBuffers,
    dirty_seen: bool,
    rebuilt: bool,
}

impl MeshObject {
    /// Resolves the mesh and uploads its buffers.
    pub fn new(ctx: ResourceContext<'_>, id: AssetId) -> Result<Self> {
        let asset = ctx
            .resolver
            .resolve_mesh(id)
            .ok_or_else(|| unresolved(AssetKind::Mesh, id))?;
        let buffers = build(ctx, id, &asset.read())?;
        Ok(Self {
            id,
            asset,
            buffers,
            dirty_seen: false,
            rebuilt: false,
        })
    }

    /// Rebuilds both buffers when the asset is dirty. Returns the bytes uploaded.
    ///
    /// An invalid edit leaves the previous buffers in place and is reported once.
    pub fn update(&mut self, ctx: ResourceContext<'_>) -> Result<u64> {
        let asset = self.asset.read();
        if !asset.is_dirty() {
            return Ok(0);
        }
        self.dirty_seen = true;
        let buffers = build(ctx, self.id, &asset)?;
        destroy_buffers(ctx.device, &self.buffers);
        let bytes = buffers.bytes;
        self.buffers = buffers;
        self.rebuilt = true;
        log::debug!("Rebuilt mesh {} ({bytes} bytes)", self.id);
        Ok(bytes)
    }

    /// Clears the asset's dirty flag and the rebuilt marker.
    pub fn after_update(&mut self) {
        if self.dirty_seen {
            self.asset.write().clear_dirty();
            self.dirty_seen = false;
        }
        self.rebuilt = false;
    }

    /// Whether the buffers, and possibly the attribute layout, were rebuilt this frame.
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }

    /// The slot of `attribute` in the vertex layout, `-1` if absent.
    pub fn slot(&self, attribute: VertexAttribute) -> i32 {
        self.buffers.slots[attribute.index()]
    }

    /// Every attribute slot in declaration order.
    pub fn slots(&self) -> &AttributeSlots {
        &self.buffers.slots
    }

    /// Number of attributes present, which is also the first free shader location.
    pub fn attribute_count(&self) -> u32 {
        self.buffers.layout.attributes.len() as u32
    }

    /// The interleaved vertex buffer.
    pub fn vertex_buffer(&self) -> BufferId {
        self.buffers.vertex
    }

    /// The index buffer, if the mesh is indexed.
    pub fn index_buffer(&self) -> Option<BufferId> {
        self.buffers.index
    }

    /// The interleaved layout.
    pub fn layout(&self) -> &VertexBufferLayout {
        &self.buffers.layout
    }

    /// Indices, or vertices when not indexed, drawn per instance.
    pub fn element_count(&self) -> u32 {
        self.buffers.element_count
    }
}

impl DeviceObject for MeshObject {
    fn destroy(&mut self, device: &dyn GraphicsDevice) {
        destroy_buffers(device, &self.buffers);
    }
}

fn build(ctx: ResourceContext<'_>, id: AssetId, mesh: &Mesh) -> Result<MeshBuffers> {
    let vertex_count = mesh.validate().map_err(|e| RenderCoreError::InvalidAsset {
        id,
        reason: e.to_string(),
    })?;

    let mut slots: AttributeSlots = [-1; VertexAttribute::COUNT];
    let mut streams = Vec::new();
    let mut attributes = Vec::new();
    let mut stride = 0;
    for attribute in VertexAttribute::all() {
        let Some(stream) = mesh.stream(attribute) else {
            continue;
        };
        let location = attributes.len() as u32;
        slots[attribute.index()] = location as i32;
        attributes.push(VertexAttributeDescriptor {
            format: attribute.format(),
            offset: stride,
            shader_location: location,
        });
        stride += attribute.format().size();
        streams.push((stream, attribute.format().components()));
    }

    let floats_per_vertex = (stride / 4) as usize;
    let mut interleaved = Vec::with_capacity(vertex_count * floats_per_vertex);
    for vertex in 0..vertex_count {
        for &(stream, components) in &streams {
            let start = vertex * components;
            interleaved.extend_from_slice(&stream[start..start + components]);
        }
    }
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&interleaved);
    let vertex = ctx.device.create_buffer_with_data(
        &BufferDescriptor::new(
            ctx.label("vertices", &mesh.label),
            vertex_bytes.len() as u64,
            BufferUsage::VERTEX,
        ),
        vertex_bytes,
    )?;

    let (index, element_count, index_bytes) = match mesh.indices() {
        Some(indices) => {
            let bytes: &[u8] = bytemuck::cast_slice(indices);
            let created = ctx.device.create_buffer_with_data(
                &BufferDescriptor::new(
                    ctx.label("indices", &mesh.label),
                    bytes.len() as u64,
                    BufferUsage::INDEX,
                ),
                bytes,
            );
            match created {
                Ok(buffer) => (Some(buffer), indices.len() as u32, bytes.len() as u64),
                Err(e) => {
                    if let Err(destroy) = ctx.device.destroy_buffer(vertex) {
                        log::warn!("Failed to destroy vertex buffer of '{}': {destroy}", mesh.label);
                    }
                    return Err(e.into());
                }
            }
        }
        None => (None, vertex_count as u32, 0),
    };

    Ok(MeshBuffers {
        vertex,
        index,
        layout: VertexBufferLayout {
            array_stride: stride,
            step_mode: VertexStepMode::Vertex,
            attributes,
        },
        slots,
        element_count,
        bytes: vertex_bytes.len() as u64 + index_bytes,
    })
}

fn destroy_buffers(device: &dyn GraphicsDevice, buffers: &MeshBuffers) {
    let ids = std::iter::once(buffers.vertex).chain(buffers.index);
    for id in ids {
        if let Err(e) = device.destroy_buffer(id) {
            log::warn!("Failed to destroy mesh buffer {id:?}: {e}");
        }
    }
}
