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

use super::TransformRef;
use crate::asset::AssetId;
use crate::math::{Mat4, Vec3};
use crate::renderer::LightType;
use parking_lot::RwLock;
use std::sync::Arc;

/// Makes an entity renderable with a mesh and a material.
///
/// The entity is drawn only while both references are set and resolvable.
#[derive(Debug, Clone)]
pub struct MeshRenderer {
    /// The mesh asset.
    pub mesh: Option<AssetId>,
    /// The material asset.
    pub material: Option<AssetId>,
    /// The entity's world transform.
    pub transform: TransformRef,
}

impl MeshRenderer {
    /// Creates a renderer with both references set.
    pub fn new(mesh: AssetId, material: AssetId, transform: TransformRef) -> Self {
        Self {
            mesh: Some(mesh),
            material: Some(material),
            transform,
        }
    }
}

/// A light component's parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    /// The light's type and parameters.
    pub light: LightType,
    /// Disabled lights are ignored by the renderer.
    pub enabled: bool,
}

#[derive(Debug)]
struct LightState {
    source: LightSource,
    changed: bool,
}

/// A shared handle to a light component and the transform that places it.
#[derive(Debug, Clone)]
pub struct LightRef {
    state: Arc<RwLock<LightState>>,
    transform: TransformRef,
}

impl LightRef {
    /// Creates an enabled light.
    pub fn new(light: LightType, transform: TransformRef) -> Self {
        Self {
            state: Arc::new(RwLock::new(LightState {
                source: LightSource {
                    light,
                    enabled: true,
                },
                changed: false,
            })),
            transform,
        }
    }

    /// The current parameters.
    pub fn source(&self) -> LightSource {
        self.state.read().source
    }

    /// Replaces the light's parameters and raises the changed flag.
    pub fn set_light(&self, light: LightType) {
        let mut state = self.state.write();
        state.source.light = light;
        state.changed = true;
    }

    /// Enables or disables the light and raises the changed flag.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.write();
        state.source.enabled = enabled;
        state.changed = true;
    }

    /// Whether the parameters or the transform changed since the flags were cleared.
    pub fn changed(&self) -> bool {
        self.state.read().changed || self.transform.world_changed()
    }

    /// Clears the parameter changed flag. The transform flag is owned by the scene.
    pub fn clear_changed(&self) {
        self.state.write().changed = false;
    }

    /// The light's transform.
    pub fn transform(&self) -> &TransformRef {
        &self.transform
    }

    /// Whether both handles point at the same light component.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Camera parameters the renderer needs to draw a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-to-view matrix.
    pub view: Mat4,
    /// View-to-clip matrix.
    pub projection: Mat4,
    /// World-space eye position.
    pub position: Vec3,
    /// Only active cameras are drawn from.
    pub active: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            active: true,
        }
    }
}

/// A shared handle to a camera component.
#[derive(Debug, Clone)]
pub struct CameraRef(Arc<RwLock<Camera>>);

impl CameraRef {
    /// Wraps a camera.
    pub fn new(camera: Camera) -> Self {
        Self(Arc::new(RwLock::new(camera)))
    }

    /// A copy of the current parameters.
    pub fn get(&self) -> Camera {
        *self.0.read()
    }

    /// Replaces the parameters.
    pub fn set(&self, camera: Camera) {
        *self.0.write() = camera;
    }

    /// Activates or deactivates the camera.
    pub fn set_active(&self, active: bool) {
        self.0.write().active = active;
    }

    /// Whether the camera is active.
    pub fn is_active(&self) -> bool {
        self.0.read().active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::PointLight;

    #[test]
    fn light_changed_follows_parameters_and_transform() {
        let transform = TransformRef::default();
        let light = LightRef::new(LightType::Point(PointLight::default()), transform.clone());
        assert!(!light.changed());

        light.set_enabled(false);
        assert!(light.changed());
        assert!(!light.source().enabled);
        light.clear_changed();
        assert!(!light.changed());

        transform.set_world_matrix(Mat4::from_translation(Vec3::ONE));
        assert!(light.changed());
    }

    #[test]
    fn camera_activation() {
        let camera = CameraRef::new(Camera::default());
        assert!(camera.is_active());
        camera.set_active(false);
        assert!(!camera.get().active);
    }
}
