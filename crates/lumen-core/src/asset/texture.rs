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
use crate::renderer::{TextureDescriptor, TextureFormat};
use std::borrow::Cow;

/// Texel data for one logical texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// Debug label.
    pub label: String,
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
    dirty: bool,
}

impl Texture {
    /// Creates a texture, checking the data size against dimensions and format.
    pub fn new(
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Result<Self, AssetError> {
        let expected =
            u64::from(width) * u64::from(height) * u64::from(format.bytes_per_texel());
        if expected != data.len() as u64 {
            return Err(AssetError::TexelSizeMismatch {
                expected,
                found: data.len() as u64,
            });
        }
        Ok(Self {
            label: label.into(),
            width,
            height,
            format,
            data,
            dirty: false,
        })
    }

    /// A 1x1 RGBA texture of a single color.
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            data: rgba.to_vec(),
            dirty: false,
        }
    }

    /// Replaces the texel data, keeping dimensions and format, and marks the texture dirty.
    pub fn set_data(&mut self, data: Vec<u8>) -> Result<(), AssetError> {
        if data.len() != self.data.len() {
            return Err(AssetError::TexelSizeMismatch {
                expected: self.data.len() as u64,
                found: data.len() as u64,
            });
        }
        self.data = data;
        self.dirty = true;
        Ok(())
    }

    /// The device descriptor for this texture.
    pub fn descriptor(&self) -> TextureDescriptor<'_> {
        TextureDescriptor {
            label: Some(Cow::Borrowed(self.label.as_str())),
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    /// The texel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the texels changed since the renderer last uploaded them.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
