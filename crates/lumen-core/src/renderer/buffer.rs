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

//! Defines data structures related to GPU buffer resources.

use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// A set of flags describing the allowed usages of a [`BufferId`].
    ///
    /// The usage selects which kind of buffer the device creates: a vertex
    /// buffer, an index buffer, a per-instance attribute buffer or a uniform block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// The buffer can be used as the destination of a write.
        const COPY_DST = 1 << 0;
        /// The buffer can be bound as a per-vertex attribute buffer.
        const VERTEX = 1 << 1;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 2;
        /// The buffer can be bound as a per-instance attribute buffer.
        const INSTANCE = 1 << 3;
        /// The buffer can be bound as a uniform block.
        const UNIFORM = 1 << 4;
    }
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
}

impl<'a> BufferDescriptor<'a> {
    /// Shorthand for a writable buffer of the given usage and size.
    pub fn new(label: impl Into<Cow<'a, str>>, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(label.into()),
            size,
            usage: usage | BufferUsage::COPY_DST,
        }
    }
}

/// An opaque handle to a GPU buffer resource.
///
/// This ID is returned by [`GraphicsDevice::create_buffer`](super::GraphicsDevice::create_buffer)
/// and is used to reference the buffer in all subsequent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// The format of a single vertex or instance attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
}

impl VertexFormat {
    /// The size of one attribute of this format in bytes.
    pub const fn size(self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }

    /// The number of `f32` components.
    pub const fn components(self) -> usize {
        (self.size() / 4) as usize
    }
}

/// Describes one attribute inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// The attribute format.
    pub format: VertexFormat,
    /// Byte offset from the start of the element.
    pub offset: u64,
    /// The shader input location the attribute feeds.
    pub shader_location: u32,
}

/// Whether a buffer advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// One element per vertex.
    Vertex,
    /// One element per instance.
    Instance,
}

/// Describes how an interleaved buffer is read by the input assembler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    /// The size of one element in bytes.
    pub array_stride: u64,
    /// How the buffer advances.
    pub step_mode: VertexStepMode,
    /// The attributes contained in one element.
    pub attributes: Vec<VertexAttributeDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_new_is_always_writable() {
        let desc = BufferDescriptor::new("instances", 64, BufferUsage::INSTANCE);
        assert!(desc.usage.contains(BufferUsage::COPY_DST | BufferUsage::INSTANCE));
        assert_eq!(desc.label.as_deref(), Some("instances"));
    }

    #[test]
    fn vertex_format_sizes() {
        assert_eq!(VertexFormat::Float32x2.size(), 8);
        assert_eq!(VertexFormat::Float32x3.components(), 3);
        assert_eq!(VertexFormat::Float32x4.size(), 16);
    }
}
