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

//! The single draw primitive the renderer submits.

use super::buffer::{BufferId, VertexBufferLayout};
use super::shader::ShaderProgramId;
use super::texture::{FrameBufferId, TextureId};

/// Binds a uniform block buffer to a binding slot for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBinding {
    /// The binding slot declared in the shader.
    pub slot: u32,
    /// The buffer bound to it.
    pub buffer: BufferId,
}

/// Binds a texture to a sampler binding slot for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    /// The binding slot declared in the shader.
    pub slot: u32,
    /// The texture bound to it.
    pub texture: TextureId,
}

/// Everything a device needs to issue one instanced draw.
///
/// The device binds the program, the vertex/index/instance buffers and every
/// entry of the binding tables, draws `instance_count` instances and unbinds.
#[derive(Debug, Clone)]
pub struct InstancedDrawCommand<'a> {
    /// A debug label for the draw.
    pub label: &'a str,
    /// The render target, or `None` for the default surface.
    pub target: Option<FrameBufferId>,
    /// The program to draw with.
    pub program: ShaderProgramId,
    /// The interleaved per-vertex buffer.
    pub vertex_buffer: BufferId,
    /// The per-vertex buffer layout.
    pub vertex_layout: &'a VertexBufferLayout,
    /// The `u32` index buffer, if the mesh is indexed.
    pub index_buffer: Option<BufferId>,
    /// Number of indices (or vertices if not indexed) per instance.
    pub element_count: u32,
    /// The per-instance attribute buffer.
    pub instance_buffer: BufferId,
    /// The per-instance buffer layout.
    pub instance_layout: &'a VertexBufferLayout,
    /// The number of instances to draw.
    pub instance_count: u32,
    /// Uniform blocks to bind.
    pub uniforms: &'a [UniformBinding],
    /// Textures to bind.
    pub textures: &'a [TextureBinding],
}
