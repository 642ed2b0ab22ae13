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

//! The scene-facing side of the renderer.
//!
//! The scene graph itself lives outside this workspace. It talks to the
//! renderer through shared component handles ([`TransformRef`], [`LightRef`],
//! [`CameraRef`]) and a stream of [`SceneEvent`]s announcing which components
//! appeared, changed or disappeared.

mod components;
mod entity;
mod event;
mod transform;

pub use components::*;
pub use entity::*;
pub use event::*;
pub use transform::*;
