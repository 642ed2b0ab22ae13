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

//! # Lumen Render
//!
//! The instanced forward renderer. Scene events flow through the
//! [`tracking`] pipeline into instanced draw objects, which share their
//! meshes, materials, shaders and textures through the reference-counted
//! pools of the [`DeviceObjectManager`].
//!
//! Every frame is split in two phases: `update` applies the frame's changes
//! and uploads what changed, then `after_update` clears the transient flags so
//! each consumer observes a change exactly once.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod instanced;
pub mod lights;
pub mod manager;
pub mod objects;
pub mod pool;
pub mod renderer;
pub mod tracking;
pub mod variant;

pub use config::{RenderTargetConfig, RendererConfig};
pub use error::{DrawReport, ErrorScope, FrameReport, RenderCoreError, Result, ScopedError};
pub use instanced::InstanceKey;
pub use manager::{DeviceObjectManager, PoolStats};
pub use renderer::ForwardRenderer;
