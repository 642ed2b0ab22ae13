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

//! # Lumen Core
//!
//! Foundational crate containing the contracts the instanced renderer is built on:
//! the backend-agnostic [`renderer::GraphicsDevice`] capability, the logical assets
//! it mirrors on the GPU, and the scene-facing component handles and events it
//! observes.

#![warn(missing_docs)]

pub mod asset;
pub mod event;
pub mod math;
pub mod renderer;
pub mod scene;

pub use asset::{AssetId, AssetResolver, SharedAsset};
pub use event::EventBus;
pub use scene::{EntityId, SceneEvent};
