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

use crate::math::Mat4;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug)]
struct TransformState {
    world: Mat4,
    changed: bool,
}

/// A shared handle to an entity's world transform.
///
/// The scene's transform system writes the world matrix and raises the
/// `world_changed` flag; the renderer reads both during its update. The scene
/// clears the flag once per frame after the renderer has run. Clones share the
/// same state.
#[derive(Debug, Clone)]
pub struct TransformRef(Arc<RwLock<TransformState>>);

impl TransformRef {
    /// Creates a transform with the given world matrix and the changed flag clear.
    pub fn new(world: Mat4) -> Self {
        Self(Arc::new(RwLock::new(TransformState {
            world,
            changed: false,
        })))
    }

    /// The current world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.0.read().world
    }

    /// Whether the world matrix changed since the flag was last cleared.
    pub fn world_changed(&self) -> bool {
        self.0.read().changed
    }

    /// Replaces the world matrix and raises the changed flag.
    pub fn set_world_matrix(&self, world: Mat4) {
        let mut state = self.0.write();
        state.world = world;
        state.changed = true;
    }

    /// Clears the changed flag.
    pub fn clear_changed(&self) {
        self.0.write().changed = false;
    }

    /// Whether both handles point at the same transform.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for TransformRef {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn clones_share_state() {
        let a = TransformRef::default();
        let b = a.clone();
        assert!(!a.world_changed());
        b.set_world_matrix(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert!(a.world_changed());
        assert_eq!(a.world_matrix().translation().x, 1.0);
        assert!(a.ptr_eq(&b));
        a.clear_changed();
        assert!(!b.world_changed());
        assert!(!a.ptr_eq(&TransformRef::default()));
    }
}
