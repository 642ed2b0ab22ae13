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

//! Logical assets: the source-of-truth data the renderer mirrors on the GPU.
//!
//! The asset layer owns meshes, materials and textures; the renderer only
//! references them through [`SharedAsset`] handles obtained from an
//! [`AssetResolver`]. Every asset carries explicit dirty flags that its owner
//! sets when the payload changes and the renderer clears once it has re-uploaded
//! the data.

mod error;
mod id;
mod material;
mod mesh;
mod registry;
mod texture;

pub use error::*;
pub use id::*;
pub use material::*;
pub use mesh::*;
pub use registry::*;
pub use texture::*;

use parking_lot::RwLock;
use std::sync::Arc;

/// A shared, lockable reference to an asset owned by the asset layer.
pub type SharedAsset<T> = Arc<RwLock<T>>;

/// Wraps an asset so it can be handed out as a [`SharedAsset`].
pub fn shared<T>(asset: T) -> SharedAsset<T> {
    Arc::new(RwLock::new(asset))
}
