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

//! The backend-agnostic device capability.

use super::buffer::{BufferDescriptor, BufferId};
use super::draw::InstancedDrawCommand;
use super::error::ResourceError;
use super::shader::{ShaderProgramDescriptor, ShaderProgramId};
use super::texture::{FrameBufferDescriptor, FrameBufferId, TextureDescriptor, TextureId};
use std::fmt::Debug;

/// The capability interface the renderer consumes to reach the GPU.
///
/// Every creation primitive either returns a handle or an error; none of them
/// fails silently. Methods take `&self` so a device can be shared between the
/// renderer and the objects it owns, backends use interior mutability.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a new GPU buffer with undefined contents.
    /// ## Arguments
    /// * `descriptor` - The buffer configuration; its usage selects vertex, index,
    ///   instance or uniform block buffers.
    /// ## Errors
    /// * `ResourceError` - If the allocation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    /// ## Arguments
    /// * `descriptor` - The buffer configuration.
    /// * `data` - The initial contents, at most `descriptor.size` bytes.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Writes data to a GPU buffer.
    /// ## Arguments
    /// * `id` - The buffer to write to.
    /// * `offset` - The byte offset of the write.
    /// * `data` - The bytes to write.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write does not fit the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Destroys a GPU buffer, freeing its memory.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates a texture and uploads its full contents.
    /// ## Arguments
    /// * `descriptor` - The texture configuration.
    /// * `data` - Tightly packed texel data.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Compiles and links a program.
    /// ## Errors
    /// * `ResourceError::Shader` - Carries the compiler diagnostic when compilation fails.
    fn create_shader_program(
        &self,
        descriptor: &ShaderProgramDescriptor,
    ) -> Result<ShaderProgramId, ResourceError>;

    /// Destroys a program.
    fn destroy_shader_program(&self, id: ShaderProgramId) -> Result<(), ResourceError>;

    /// Creates an off-screen render target.
    fn create_frame_buffer(
        &self,
        descriptor: &FrameBufferDescriptor,
    ) -> Result<FrameBufferId, ResourceError>;

    /// Destroys an off-screen render target.
    fn destroy_frame_buffer(&self, id: FrameBufferId) -> Result<(), ResourceError>;

    /// Binds everything referenced by `command`, issues one instanced draw and unbinds.
    fn draw_instanced(&self, command: &InstancedDrawCommand) -> Result<(), ResourceError>;
}
