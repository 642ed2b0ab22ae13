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

//! Light parameters as authored on scene entities.
//!
//! Lights are attached to scene entities; the entity's world transform provides
//! the position (point, spot) and orientation (directional, spot) used when the
//! light is packed for the GPU.

use crate::math::{LinearRgba, Vec3};

/// Parallel rays from an infinitely distant source.
///
/// `direction` is local to the light and rotated by its transform when packed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Unit direction the rays travel.
    pub direction: Vec3,
    /// Linear color.
    pub color: LinearRgba,
    /// Multiplier applied to `color`.
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -0.5).normalize(),
            color: LinearRgba::WHITE,
            intensity: 1.0,
        }
    }
}

/// Omnidirectional light placed by its transform's translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Linear color.
    pub color: LinearRgba,
    /// Multiplier applied to `color`.
    pub intensity: f32,
    /// Distance at which the contribution reaches zero.
    pub range: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: LinearRgba::WHITE,
            intensity: 100.0,
            range: 10.0,
        }
    }
}

/// A cone of light placed and aimed by its transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// Unit axis of the cone, local to the light.
    pub direction: Vec3,
    /// Linear color.
    pub color: LinearRgba,
    /// Multiplier applied to `color`.
    pub intensity: f32,
    /// Distance at which the contribution reaches zero.
    pub range: f32,
    /// Half angle, in radians, of the fully lit core.
    pub inner_cone_angle: f32,
    /// Half angle, in radians, past which nothing is lit.
    pub outer_cone_angle: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, 0.0),
            color: LinearRgba::WHITE,
            intensity: 200.0,
            range: 15.0,
            inner_cone_angle: 20.0_f32.to_radians(),
            outer_cone_angle: 35.0_f32.to_radians(),
        }
    }
}

/// The parameters of one light, by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightType {
    /// See [`DirectionalLight`].
    Directional(DirectionalLight),
    /// See [`PointLight`].
    Point(PointLight),
    /// See [`SpotLight`].
    Spot(SpotLight),
}

impl LightType {
    /// The kind of this light, without its parameters.
    pub fn kind(&self) -> LightKind {
        match self {
            LightType::Directional(_) => LightKind::Directional,
            LightType::Point(_) => LightKind::Point,
            LightType::Spot(_) => LightKind::Spot,
        }
    }
}

impl Default for LightType {
    fn default() -> Self {
        LightType::Directional(DirectionalLight::default())
    }
}

/// The three light kinds, in the order they are packed on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LightKind {
    /// Directional lights come first.
    Directional,
    /// Then point lights.
    Point,
    /// Spot lights come last.
    Spot,
}

impl LightKind {
    /// All kinds in packing order.
    pub const ALL: [LightKind; 3] = [LightKind::Directional, LightKind::Point, LightKind::Spot];
}

/// The active light-count tuple `(directional, point, spot)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct LightCounts {
    /// Number of active directional lights.
    pub directional: u32,
    /// Number of active point lights.
    pub point: u32,
    /// Number of active spot lights.
    pub spot: u32,
}

impl LightCounts {
    /// The count for one kind.
    pub fn get(&self, kind: LightKind) -> u32 {
        match kind {
            LightKind::Directional => self.directional,
            LightKind::Point => self.point,
            LightKind::Spot => self.spot,
        }
    }

    /// Increments the count for one kind.
    pub fn increment(&mut self, kind: LightKind) {
        match kind {
            LightKind::Directional => self.directional += 1,
            LightKind::Point => self.point += 1,
            LightKind::Spot => self.spot += 1,
        }
    }

    /// Sum of all kinds.
    pub fn total(&self) -> u32 {
        self.directional + self.point + self.spot
    }

    /// Returns `true` when at least one light is active.
    pub fn any(&self) -> bool {
        self.total() > 0
    }
}
