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

use std::fmt;

/// An error raised when an asset's payload is inconsistent or an edit is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// A mesh has no position stream.
    MissingPositions,
    /// A vertex stream does not have one element per vertex.
    StreamLengthMismatch {
        /// The stream's name.
        attribute: String,
        /// Vertex count implied by the position stream.
        expected: usize,
        /// Element count of the offending stream.
        found: usize,
    },
    /// An index refers past the end of the vertex streams.
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
    /// No parameter with this name exists in the block.
    UnknownParameter {
        /// Block name.
        block: String,
        /// Parameter name.
        name: String,
    },
    /// The new value does not have the parameter's declared type.
    ParameterTypeMismatch {
        /// Parameter name.
        name: String,
    },
    /// No texture slot with this name exists.
    UnknownTextureSlot(String),
    /// Texel data does not match the texture's dimensions and format.
    TexelSizeMismatch {
        /// Byte size implied by width, height and format.
        expected: u64,
        /// Byte size provided.
        found: u64,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::MissingPositions => write!(f, "mesh has no position stream"),
            AssetError::StreamLengthMismatch {
                attribute,
                expected,
                found,
            } => write!(
                f,
                "stream '{attribute}' has {found} elements, expected {expected}"
            ),
            AssetError::IndexOutOfRange {
                index,
                vertex_count,
            } => write!(
                f,
                "index {index} is out of range for {vertex_count} vertices"
            ),
            AssetError::UnknownParameter { block, name } => {
                write!(f, "no parameter '{name}' in block '{block}'")
            }
            AssetError::ParameterTypeMismatch { name } => {
                write!(f, "value type does not match parameter '{name}'")
            }
            AssetError::UnknownTextureSlot(name) => write!(f, "no texture slot '{name}'"),
            AssetError::TexelSizeMismatch { expected, found } => {
                write!(f, "texel data is {found} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for AssetError {}
