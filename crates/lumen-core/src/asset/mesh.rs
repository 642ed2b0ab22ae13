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

use super::AssetError;
use crate::renderer::VertexFormat;
use std::fmt;

/// Maximum number of texture coordinate channels a mesh can carry.
pub const MAX_UV_CHANNELS: usize = 8;

/// The optional vertex streams a [`Mesh`] may provide, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexAttribute {
    /// Object-space position, `vec3`.
    Position,
    /// Vertex normal, `vec3`.
    Normal,
    /// Tangent with handedness in `w`, `vec4`.
    Tangent,
    /// Vertex color, `vec4`.
    Color,
    /// Texture coordinates for the given channel, `vec2`.
    Uv(u8),
}

impl VertexAttribute {
    /// Total number of attribute slots.
    pub const COUNT: usize = 4 + MAX_UV_CHANNELS;

    /// Every attribute in declaration order.
    pub fn all() -> impl Iterator<Item = VertexAttribute> {
        [
            VertexAttribute::Position,
            VertexAttribute::Normal,
            VertexAttribute::Tangent,
            VertexAttribute::Color,
        ]
        .into_iter()
        .chain((0..MAX_UV_CHANNELS as u8).map(VertexAttribute::Uv))
    }

    /// The attribute's position in declaration order.
    pub fn index(self) -> usize {
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Normal => 1,
            VertexAttribute::Tangent => 2,
            VertexAttribute::Color => 3,
            VertexAttribute::Uv(channel) => 4 + channel as usize,
        }
    }

    /// The per-vertex format of the stream.
    pub fn format(self) -> VertexFormat {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal => VertexFormat::Float32x3,
            VertexAttribute::Tangent | VertexAttribute::Color => VertexFormat::Float32x4,
            VertexAttribute::Uv(_) => VertexFormat::Float32x2,
        }
    }

    /// Upper-case name used for `HAS_<NAME>` defines and `a_<name>` inputs.
    pub fn define_name(self) -> String {
        match self {
            VertexAttribute::Position => "POSITION".to_string(),
            VertexAttribute::Normal => "NORMAL".to_string(),
            VertexAttribute::Tangent => "TANGENT".to_string(),
            VertexAttribute::Color => "COLOR".to_string(),
            VertexAttribute::Uv(channel) => format!("UV{channel}"),
        }
    }
}

impl fmt::Display for VertexAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.define_name().to_lowercase())
    }
}

/// Vertex and index data for one logical mesh.
///
/// Every stream is optional except positions, which define the vertex count.
/// Setters mark the mesh dirty; the renderer rebuilds its GPU buffers when it
/// observes the flag and then clears it.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Debug label.
    pub label: String,
    positions: Option<Vec<[f32; 3]>>,
    normals: Option<Vec<[f32; 3]>>,
    tangents: Option<Vec<[f32; 4]>>,
    colors: Option<Vec<[f32; 4]>>,
    uvs: [Option<Vec<[f32; 2]>>; MAX_UV_CHANNELS],
    indices: Option<Vec<u32>>,
    dirty: bool,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// A unit quad in the XY plane with normals and one UV channel.
    pub fn quad(label: impl Into<String>) -> Self {
        Self::new(label)
            .with_positions(vec![
                [-0.5, -0.5, 0.0],
                [0.5, -0.5, 0.0],
                [0.5, 0.5, 0.0],
                [-0.5, 0.5, 0.0],
            ])
            .with_normals(vec![[0.0, 0.0, 1.0]; 4])
            .with_uvs(0, vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]])
            .with_indices(vec![0, 1, 2, 0, 2, 3])
    }

    /// Sets the position stream.
    pub fn with_positions(mut self, positions: Vec<[f32; 3]>) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Sets the normal stream.
    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Sets the tangent stream.
    pub fn with_tangents(mut self, tangents: Vec<[f32; 4]>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    /// Sets the color stream.
    pub fn with_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Sets a texture coordinate channel. Channels past [`MAX_UV_CHANNELS`] are ignored.
    pub fn with_uvs(mut self, channel: usize, uvs: Vec<[f32; 2]>) -> Self {
        if let Some(slot) = self.uvs.get_mut(channel) {
            *slot = Some(uvs);
        } else {
            log::warn!("Mesh '{}': uv channel {channel} ignored", self.label);
        }
        self
    }

    /// Sets the index list.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Replaces the position stream and marks the mesh dirty.
    pub fn set_positions(&mut self, positions: Vec<[f32; 3]>) {
        self.positions = Some(positions);
        self.dirty = true;
    }

    /// Replaces or removes the normal stream and marks the mesh dirty.
    pub fn set_normals(&mut self, normals: Option<Vec<[f32; 3]>>) {
        self.normals = normals;
        self.dirty = true;
    }

    /// Replaces or removes the tangent stream and marks the mesh dirty.
    pub fn set_tangents(&mut self, tangents: Option<Vec<[f32; 4]>>) {
        self.tangents = tangents;
        self.dirty = true;
    }

    /// Replaces or removes the color stream and marks the mesh dirty.
    pub fn set_colors(&mut self, colors: Option<Vec<[f32; 4]>>) {
        self.colors = colors;
        self.dirty = true;
    }

    /// Replaces or removes a texture coordinate channel and marks the mesh dirty.
    pub fn set_uvs(&mut self, channel: usize, uvs: Option<Vec<[f32; 2]>>) {
        if let Some(slot) = self.uvs.get_mut(channel) {
            *slot = uvs;
            self.dirty = true;
        }
    }

    /// Replaces or removes the index list and marks the mesh dirty.
    pub fn set_indices(&mut self, indices: Option<Vec<u32>>) {
        self.indices = indices;
        self.dirty = true;
    }

    /// Flags the mesh for re-upload without changing it.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the payload changed since the renderer last consumed it.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Whether the mesh provides the given stream.
    pub fn has_attribute(&self, attribute: VertexAttribute) -> bool {
        self.stream(attribute).is_some()
    }

    /// The stream's components as a flat slice.
    pub fn stream(&self, attribute: VertexAttribute) -> Option<&[f32]> {
        match attribute {
            VertexAttribute::Position => self.positions.as_deref().map(bytemuck::cast_slice),
            VertexAttribute::Normal => self.normals.as_deref().map(bytemuck::cast_slice),
            VertexAttribute::Tangent => self.tangents.as_deref().map(bytemuck::cast_slice),
            VertexAttribute::Color => self.colors.as_deref().map(bytemuck::cast_slice),
            VertexAttribute::Uv(channel) => self
                .uvs
                .get(channel as usize)
                .and_then(|uv| uv.as_deref())
                .map(bytemuck::cast_slice),
        }
    }

    /// The index list, if the mesh is indexed.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Checks that every stream has one element per vertex and that all indices are in range.
    ///
    /// Returns the vertex count.
    pub fn validate(&self) -> Result<usize, AssetError> {
        let vertex_count = self
            .positions
            .as_ref()
            .map(Vec::len)
            .ok_or(AssetError::MissingPositions)?;

        for attribute in VertexAttribute::all().skip(1) {
            if let Some(stream) = self.stream(attribute) {
                let found = stream.len() / attribute.format().components();
                if found != vertex_count {
                    return Err(AssetError::StreamLengthMismatch {
                        attribute: attribute.to_string(),
                        expected: vertex_count,
                        found,
                    });
                }
            }
        }

        if let Some(&index) = self
            .indices()
            .and_then(|indices| indices.iter().find(|&&i| i as usize >= vertex_count))
        {
            return Err(AssetError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(vertex_count)
    }
}
