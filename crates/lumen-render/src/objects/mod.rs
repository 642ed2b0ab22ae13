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

//! GPU-resident mirrors of logical assets.
//!
//! Each object follows the two-phase frame protocol: `update` observes the
//! asset's dirty flags and re-uploads what changed, `after_update` clears the
//! flags once every consumer has seen them.

mod material;
mod mesh;
mod shader;
mod texture;

pub use material::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;

use crate::config::RendererConfig;
use crate::error::{AssetKind, RenderCoreError, Result};
use lumen_core::asset::{AssetId, AssetResolver};
use lumen_core::renderer::GraphicsDevice;

/// What device objects need to create or refresh themselves.
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    /// The device resources are created on.
    pub device: &'a dyn GraphicsDevice,
    /// Where asset ids are resolved.
    pub resolver: &'a dyn AssetResolver,
    /// Renderer settings.
    pub config: &'a RendererConfig,
}

impl ResourceContext<'_> {
    /// A device object debug label under the configured prefix.
    pub fn label(&self, kind: &str, name: &str) -> String {
        format!("{}/{kind}/{name}", self.config.label)
    }
}

pub(crate) fn unresolved(kind: AssetKind, id: AssetId) -> RenderCoreError {
    RenderCoreError::ResourceResolution { kind, id }
}
