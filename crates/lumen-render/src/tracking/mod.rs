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

//! The scene-to-batch pipeline run at the start of every frame.
//!
//! [`ChangeTracker`] buffers scene events, [`MaterialLoader`] resolves the
//! references of changed mesh renderers, [`MeshBatcher`] turns them into
//! net batch deltas and [`InstancingCoordinator`] applies those deltas to the
//! instanced draw objects.

mod batcher;
mod change_tracker;
mod coordinator;
mod material_loader;

pub use batcher::*;
pub use change_tracker::*;
pub use coordinator::*;
pub use material_loader::*;
