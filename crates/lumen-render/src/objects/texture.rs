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
use crate::error::{AssetKind, Result};
use crate::pool::{DeviceObject, DevicePool};
use lumen_core::asset::{AssetId, SharedAsset, Texture};
use lumen_core::renderer::{GraphicsDevice, TextureId};

/// The device texture for one logical texture.
#[derive(Debug)]
pub struct TextureObject {
    id: AssetId,
    asset: SharedAsset<Texture>,
    texture: TextureId,
    dirty_seen: bool,
}

impl TextureObject {
    /// Resolves the texture and uploads its texels.
    pub fn new(ctx: ResourceContext<'_>, id: AssetId) -> Result<Self> {
        let asset = ctx
            .resolver
            .resolve_texture(id)
            .ok_or_else(|| unresolved(AssetKind::Texture, id))?;
        let texture = {
            let data = asset.read();
            ctx.device.create_texture(&data.descriptor(), data.data())?
        };
        Ok(Self {
            id,
            asset,
            texture,
            dirty_seen: false,
        })
    }

    /// Recreates the device texture when the asset is dirty. Returns the bytes uploaded.
    pub fn update(&mut self, ctx: ResourceContext<'_>) -> Result<u64> {
        let asset = self.asset.read();
        if !asset.is_dirty() {
            return Ok(0);
        }
        self.dirty_seen = true;
        let texture = ctx.device.create_texture(&asset.descriptor(), asset.data())?;
        if let Err(e) = ctx.device.destroy_texture(self.texture) {
            log::warn!("Failed to destroy previous texture of {}: {e}", self.id);
        }
        self.texture = texture;
        log::trace!("Re-uploaded texture {}", self.id);
        Ok(asset.data().len() as u64)
    }

    /// Clears the asset's dirty flag once an update has observed it.
    pub fn after_update(&mut self) {
        if self.dirty_seen {
            self.asset.write().clear_dirty();
            self.dirty_seen = false;
        }
    }

    /// The current device texture.
    pub fn texture(&self) -> TextureId {
        self.texture
    }
}

impl DeviceObject for TextureObject {
    fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if let Err(e) = device.destroy_texture(self.texture) {
            log::warn!("Failed to destroy texture {}: {e}", self.id);
        }
    }
}

/// Acquires the pooled texture for `id`, creating it on first use.
pub fn acquire_texture(
    ctx: ResourceContext<'_>,
    pool: &mut DevicePool<TextureObject>,
    id: AssetId,
) -> Result<()> {
    pool.get_or_create(id, || TextureObject::new(ctx, id))
        .map(|_| ())
}

/// Drops one owner of the pooled texture for `id`.
pub fn release_texture(ctx: ResourceContext<'_>, pool: &mut DevicePool<TextureObject>, id: AssetId) {
    if let Err(e) = pool.release(id, ctx.device) {
        log::warn!("{e}");
    }
}
