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

//! A complete in-memory [`GraphicsDevice`] backend.
//!
//! The headless device keeps every buffer's bytes, every texture and every
//! program source in host memory and records the draws it is asked to issue.
//! It is used for tooling without a GPU and by the test suites, which inspect
//! its [`DeviceStats`] to observe the traffic the renderer generates.
//!
//! "Compiling" a program validates that each stage declares `void main` and
//! that no `#error` directive survived preprocessing, which is how a real GLSL
//! front end rejects a variant.

use super::buffer::{BufferDescriptor, BufferId, BufferUsage};
use super::device::GraphicsDevice;
use super::draw::{InstancedDrawCommand, TextureBinding, UniformBinding};
use super::error::{ResourceError, ShaderError};
use super::shader::{ShaderProgramDescriptor, ShaderProgramId, ShaderSourceData};
use super::texture::{FrameBufferDescriptor, FrameBufferId, TextureDescriptor, TextureId};
use parking_lot::Mutex;
use ahash::AHashMap;

/// Counters describing the traffic a [`HeadlessDevice`] has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Buffers created since the device was created.
    pub buffers_created: u64,
    /// Buffers destroyed since the device was created.
    pub buffers_destroyed: u64,
    /// Textures created.
    pub textures_created: u64,
    /// Textures destroyed.
    pub textures_destroyed: u64,
    /// Programs created.
    pub programs_created: u64,
    /// Programs destroyed.
    pub programs_destroyed: u64,
    /// Frame buffers created.
    pub frame_buffers_created: u64,
    /// Frame buffers destroyed.
    pub frame_buffers_destroyed: u64,
    /// Number of `write_buffer` calls.
    pub buffer_writes: u64,
    /// Bytes uploaded through creation and writes.
    pub bytes_uploaded: u64,
}

impl DeviceStats {
    /// Buffers currently alive.
    pub fn live_buffers(&self) -> u64 {
        self.buffers_created - self.buffers_destroyed
    }

    /// Programs currently alive.
    pub fn live_programs(&self) -> u64 {
        self.programs_created - self.programs_destroyed
    }

    /// Textures currently alive.
    pub fn live_textures(&self) -> u64 {
        self.textures_created - self.textures_destroyed
    }
}

/// One draw recorded by the [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDraw {
    /// The draw's debug label.
    pub label: String,
    /// The program used.
    pub program: ShaderProgramId,
    /// The render target.
    pub target: Option<FrameBufferId>,
    /// Indices or vertices per instance.
    pub element_count: u32,
    /// The instance buffer.
    pub instance_buffer: BufferId,
    /// Number of instances drawn.
    pub instance_count: u32,
    /// Uniform blocks bound for the draw.
    pub uniforms: Vec<UniformBinding>,
    /// Textures bound for the draw.
    pub textures: Vec<TextureBinding>,
}

#[derive(Debug)]
struct HeadlessBuffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug)]
struct HeadlessProgram {
    vertex: String,
    fragment: String,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_id: usize,
    buffers: AHashMap<usize, HeadlessBuffer>,
    textures: AHashMap<usize, Vec<u8>>,
    programs: AHashMap<usize, HeadlessProgram>,
    frame_buffers: AHashMap<usize, (u32, u32)>,
    stats: DeviceStats,
    draws: Vec<RecordedDraw>,
}

impl HeadlessState {
    fn allocate_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

/// An in-memory graphics device.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
}

impl HeadlessDevice {
    /// Creates a new, empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the device counters.
    pub fn stats(&self) -> DeviceStats {
        self.state.lock().stats.clone()
    }

    /// The draws issued since the last call to [`HeadlessDevice::take_draws`].
    pub fn draws(&self) -> Vec<RecordedDraw> {
        self.state.lock().draws.clone()
    }

    /// Returns and clears the recorded draws.
    pub fn take_draws(&self) -> Vec<RecordedDraw> {
        std::mem::take(&mut self.state.lock().draws)
    }

    /// The current contents of a buffer.
    pub fn buffer_data(&self, id: BufferId) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&id.0).map(|b| b.data.clone())
    }

    /// The size of a buffer in bytes.
    pub fn buffer_size(&self, id: BufferId) -> Option<u64> {
        self.state
            .lock()
            .buffers
            .get(&id.0)
            .map(|b| b.data.len() as u64)
    }

    /// Whether the buffer is alive.
    pub fn contains_buffer(&self, id: BufferId) -> bool {
        self.state.lock().buffers.contains_key(&id.0)
    }

    /// Whether the program is alive.
    pub fn contains_program(&self, id: ShaderProgramId) -> bool {
        self.state.lock().programs.contains_key(&id.0)
    }

    /// Whether the texture is alive.
    pub fn contains_texture(&self, id: TextureId) -> bool {
        self.state.lock().textures.contains_key(&id.0)
    }

    /// The vertex and fragment sources a program was compiled from.
    pub fn program_source(&self, id: ShaderProgramId) -> Option<(String, String)> {
        self.state
            .lock()
            .programs
            .get(&id.0)
            .map(|p| (p.vertex.clone(), p.fragment.clone()))
    }

    fn compile_stage(label: &str, stage: &str, source: &ShaderSourceData) -> Result<(), ShaderError> {
        let text = source.as_str();
        if let Some((line_no, line)) = text
            .lines()
            .enumerate()
            .find(|(_, line)| line.trim_start().starts_with("#error"))
        {
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: format!("{stage}:{}: {}", line_no + 1, line.trim()),
            });
        }
        if !text.contains("void main") {
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: format!("{stage}: missing entry point 'void main'"),
            });
        }
        Ok(())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.buffers.insert(
            id,
            HeadlessBuffer {
                usage: descriptor.usage,
                data: vec![0; descriptor.size as usize],
            },
        );
        state.stats.buffers_created += 1;
        log::trace!(
            "Headless buffer {id} created ({} bytes, {:?})",
            descriptor.size,
            descriptor.label
        );
        Ok(BufferId(id))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        if data.len() as u64 > descriptor.size {
            return Err(ResourceError::OutOfBounds);
        }
        let id = self.create_buffer(descriptor)?;
        let mut state = self.state.lock();
        if let Some(buffer) = state.buffers.get_mut(&id.0) {
            buffer.data[..data.len()].copy_from_slice(data);
        }
        state.stats.bytes_uploaded += data.len() as u64;
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        let buffer = state
            .buffers
            .get_mut(&id.0)
            .ok_or(ResourceError::InvalidHandle)?;
        if !buffer.usage.contains(BufferUsage::COPY_DST) {
            return Err(ResourceError::BackendError(format!(
                "buffer {} was not created with COPY_DST",
                id.0
            )));
        }
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.data.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer.data[start..end].copy_from_slice(data);
        state.stats.buffer_writes += 1;
        state.stats.bytes_uploaded += data.len() as u64;
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        state
            .buffers
            .remove(&id.0)
            .ok_or(ResourceError::InvalidHandle)?;
        state.stats.buffers_destroyed += 1;
        Ok(())
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<TextureId, ResourceError> {
        if data.len() as u64 != descriptor.byte_size() {
            return Err(ResourceError::BackendError(format!(
                "texture {:?} expects {} bytes, got {}",
                descriptor.label,
                descriptor.byte_size(),
                data.len()
            )));
        }
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.textures.insert(id, data.to_vec());
        state.stats.textures_created += 1;
        state.stats.bytes_uploaded += data.len() as u64;
        Ok(TextureId(id))
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        state
            .textures
            .remove(&id.0)
            .ok_or(ResourceError::InvalidHandle)?;
        state.stats.textures_destroyed += 1;
        Ok(())
    }

    fn create_shader_program(
        &self,
        descriptor: &ShaderProgramDescriptor,
    ) -> Result<ShaderProgramId, ResourceError> {
        let label = descriptor.label.unwrap_or("unnamed");
        Self::compile_stage(label, "vertex", &descriptor.vertex)?;
        Self::compile_stage(label, "fragment", &descriptor.fragment)?;

        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.programs.insert(
            id,
            HeadlessProgram {
                vertex: descriptor.vertex.as_str().to_string(),
                fragment: descriptor.fragment.as_str().to_string(),
            },
        );
        state.stats.programs_created += 1;
        Ok(ShaderProgramId(id))
    }

    fn destroy_shader_program(&self, id: ShaderProgramId) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        state
            .programs
            .remove(&id.0)
            .ok_or(ShaderError::NotFound { id: id.0 })?;
        state.stats.programs_destroyed += 1;
        Ok(())
    }

    fn create_frame_buffer(
        &self,
        descriptor: &FrameBufferDescriptor,
    ) -> Result<FrameBufferId, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::BackendError(
                "frame buffer dimensions must be non-zero".to_string(),
            ));
        }
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state
            .frame_buffers
            .insert(id, (descriptor.width, descriptor.height));
        state.stats.frame_buffers_created += 1;
        Ok(FrameBufferId(id))
    }

    fn destroy_frame_buffer(&self, id: FrameBufferId) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        state
            .frame_buffers
            .remove(&id.0)
            .ok_or(ResourceError::InvalidHandle)?;
        state.stats.frame_buffers_destroyed += 1;
        Ok(())
    }

    fn draw_instanced(&self, command: &InstancedDrawCommand) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        if !state.programs.contains_key(&command.program.0) {
            return Err(ShaderError::NotFound {
                id: command.program.0,
            }
            .into());
        }
        let buffers = [Some(command.vertex_buffer), command.index_buffer]
            .into_iter()
            .flatten()
            .chain(command.uniforms.iter().map(|u| u.buffer));
        for buffer in buffers {
            if !state.buffers.contains_key(&buffer.0) {
                return Err(ResourceError::InvalidHandle);
            }
        }
        if command
            .textures
            .iter()
            .any(|t| !state.textures.contains_key(&t.texture.0))
        {
            return Err(ResourceError::InvalidHandle);
        }
        if let Some(target) = command.target {
            if !state.frame_buffers.contains_key(&target.0) {
                return Err(ResourceError::InvalidHandle);
            }
        }
        let instance_bytes =
            u64::from(command.instance_count) * command.instance_layout.array_stride;
        let instance_capacity = state
            .buffers
            .get(&command.instance_buffer.0)
            .map(|b| b.data.len() as u64)
            .ok_or(ResourceError::InvalidHandle)?;
        if instance_bytes > instance_capacity {
            return Err(ResourceError::OutOfBounds);
        }

        state.draws.push(RecordedDraw {
            label: command.label.to_string(),
            program: command.program,
            target: command.target,
            element_count: command.element_count,
            instance_buffer: command.instance_buffer,
            instance_count: command.instance_count,
            uniforms: command.uniforms.to_vec(),
            textures: command.textures.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn program<'a>(vertex: &'a str, fragment: &'a str) -> ShaderProgramDescriptor<'a> {
        ShaderProgramDescriptor {
            label: Some("test"),
            vertex: ShaderSourceData::Glsl(Cow::Borrowed(vertex)),
            fragment: ShaderSourceData::Glsl(Cow::Borrowed(fragment)),
        }
    }

    #[test]
    fn buffer_writes_are_bounds_checked() {
        let device = HeadlessDevice::new();
        let id = device
            .create_buffer(&BufferDescriptor::new("b", 8, BufferUsage::UNIFORM))
            .unwrap();
        device.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_data(id).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(
            device.write_buffer(id, 6, &[0; 4]),
            Err(ResourceError::OutOfBounds)
        );
        assert_eq!(device.stats().buffer_writes, 1);
    }

    #[test]
    fn destroyed_buffers_are_invalid() {
        let device = HeadlessDevice::new();
        let id = device
            .create_buffer(&BufferDescriptor::new("b", 4, BufferUsage::VERTEX))
            .unwrap();
        device.destroy_buffer(id).unwrap();
        assert_eq!(device.destroy_buffer(id), Err(ResourceError::InvalidHandle));
        assert_eq!(device.stats().live_buffers(), 0);
    }

    #[test]
    fn error_directive_fails_compilation_with_line() {
        let device = HeadlessDevice::new();
        let err = device
            .create_shader_program(&program("void main() {}", "#error bad variant\nvoid main() {}"))
            .unwrap_err();
        match err {
            ResourceError::Shader(ShaderError::CompilationError { details, .. }) => {
                assert_eq!(details, "fragment:1: #error bad variant");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(device.stats().programs_created, 0);
    }

    #[test]
    fn program_without_entry_point_is_rejected() {
        let device = HeadlessDevice::new();
        assert!(device
            .create_shader_program(&program("", "void main() {}"))
            .is_err());
        let ok = device
            .create_shader_program(&program("void main() {}", "void main() {}"))
            .unwrap();
        assert!(device.contains_program(ok));
    }
}
