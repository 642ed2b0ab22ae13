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

//! Aggregation of every active light into one uniform buffer.
//!
//! Records are packed contiguously by kind: directional lights first, then
//! point lights, then spot lights. A kind with no active light takes no space.
//! The buffer is recreated whenever a per-kind count changes and patched one
//! kind region at a time otherwise.

use crate::error::Result;
use bytemuck::{Pod, Zeroable};
use lumen_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, LightCounts, LightKind, LightType,
};
use lumen_core::scene::{EntityId, LightRef, LightSource};
use std::collections::BTreeMap;

/// GPU record of a directional light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightRecord {
    /// World-space direction, `w` unused.
    pub direction: [f32; 4],
    /// Linear color in `rgb`, intensity in `a`.
    pub color: [f32; 4],
}

/// GPU record of a point light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightRecord {
    /// World-space position in `xyz`, range in `w`.
    pub position_range: [f32; 4],
    /// Linear color in `rgb`, intensity in `a`.
    pub color: [f32; 4],
}

/// GPU record of a spot light.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightRecord {
    /// World-space position in `xyz`, range in `w`.
    pub position_range: [f32; 4],
    /// World-space direction, `w` unused.
    pub direction: [f32; 4],
    /// Linear color in `rgb`, intensity in `a`.
    pub color: [f32; 4],
    /// Cosines of the inner and outer cone angles in `xy`.
    pub cone: [f32; 4],
}

/// Byte size of one record of `kind`.
pub const fn record_size(kind: LightKind) -> u64 {
    match kind {
        LightKind::Directional => std::mem::size_of::<DirectionalLightRecord>() as u64,
        LightKind::Point => std::mem::size_of::<PointLightRecord>() as u64,
        LightKind::Spot => std::mem::size_of::<SpotLightRecord>() as u64,
    }
}

/// Byte offset of the region of `kind` for the given counts.
pub fn region_offset(kind: LightKind, counts: &LightCounts) -> u64 {
    LightKind::ALL
        .iter()
        .take_while(|k| **k != kind)
        .map(|k| u64::from(counts.get(*k)) * record_size(*k))
        .sum()
}

fn kind_index(kind: LightKind) -> usize {
    match kind {
        LightKind::Directional => 0,
        LightKind::Point => 1,
        LightKind::Spot => 2,
    }
}

fn pack(source: &LightSource, light: &LightRef) -> Vec<u8> {
    let world = light.transform().world_matrix();
    let position = world.translation();
    match source.light {
        LightType::Directional(l) => {
            let direction = world.transform_vector(l.direction).normalize();
            bytemuck::bytes_of(&DirectionalLightRecord {
                direction: direction.extend(0.0),
                color: with_intensity(l.color.to_array(), l.intensity),
            })
            .to_vec()
        }
        LightType::Point(l) => bytemuck::bytes_of(&PointLightRecord {
            position_range: position.extend(l.range),
            color: with_intensity(l.color.to_array(), l.intensity),
        })
        .to_vec(),
        LightType::Spot(l) => {
            let direction = world.transform_vector(l.direction).normalize();
            bytemuck::bytes_of(&SpotLightRecord {
                position_range: position.extend(l.range),
                direction: direction.extend(0.0),
                color: with_intensity(l.color.to_array(), l.intensity),
                cone: [l.inner_cone_angle.cos(), l.outer_cone_angle.cos(), 0.0, 0.0],
            })
            .to_vec()
        }
    }
}

fn with_intensity(mut color: [f32; 4], intensity: f32) -> [f32; 4] {
    color[3] = intensity;
    color
}

type Grouped<'a> = [Vec<(EntityId, &'a LightRef, LightSource)>; 3];

/// Packs active lights into one uniform buffer and tracks per-kind counts.
#[derive(Debug, Default)]
pub struct LightAggregator {
    buffer: Option<BufferId>,
    counts: LightCounts,
    members: [Vec<(EntityId, LightRef)>; 3],
    number_of_lights_changed: bool,
    recreations: u64,
    patches: u64,
}

impl LightAggregator {
    /// Creates an aggregator with no lights and no buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repacks the buffer from the current lights. Returns the bytes uploaded.
    ///
    /// Disabled lights are skipped. Lights are ordered by entity within each kind.
    pub fn update(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        lights: &BTreeMap<EntityId, LightRef>,
    ) -> Result<u64> {
        let mut grouped: Grouped<'_> = Default::default();
        let mut counts = LightCounts::default();
        for (entity, light) in lights {
            let source = light.source();
            if !source.enabled {
                continue;
            }
            let kind = source.light.kind();
            counts.increment(kind);
            grouped[kind_index(kind)].push((*entity, light, source));
        }

        if counts != self.counts {
            return self.recreate(device, label, counts, &grouped);
        }

        let mut uploaded = 0;
        let Some(buffer) = self.buffer else {
            return Ok(0);
        };
        for kind in LightKind::ALL {
            let group = &grouped[kind_index(kind)];
            let moved = group.iter().any(|(_, light, _)| light.changed());
            if !moved && same_members(group, &self.members[kind_index(kind)]) {
                continue;
            }
            let bytes = pack_group(group);
            device.write_buffer(buffer, region_offset(kind, &counts), &bytes)?;
            self.members[kind_index(kind)] = member_handles(group);
            self.patches += 1;
            uploaded += bytes.len() as u64;
            log::trace!("Patched {kind:?} light region ({} bytes)", bytes.len());
        }
        Ok(uploaded)
    }

    fn recreate(
        &mut self,
        device: &dyn GraphicsDevice,
        label: &str,
        counts: LightCounts,
        grouped: &Grouped<'_>,
    ) -> Result<u64> {
        if let Some(old) = self.buffer.take() {
            if let Err(e) = device.destroy_buffer(old) {
                log::warn!("Failed to destroy light buffer: {e}");
            }
        }
        log::debug!(
            "Light counts changed {:?} -> {:?}, recreating light buffer",
            self.counts,
            counts
        );
        self.counts = counts;
        self.number_of_lights_changed = true;
        self.recreations += 1;
        self.members = Default::default();

        if !counts.any() {
            return Ok(0);
        }
        let data: Vec<u8> = grouped.iter().flat_map(|group| pack_group(group)).collect();
        let buffer = device.create_buffer_with_data(
            &BufferDescriptor::new(format!("{label}/lights"), data.len() as u64, BufferUsage::UNIFORM),
            &data,
        )?;
        self.buffer = Some(buffer);
        for (members, group) in self.members.iter_mut().zip(grouped) {
            *members = member_handles(group);
        }
        Ok(data.len() as u64)
    }

    /// Clears the per-frame change marker and the lights' parameter flags.
    pub fn after_update(&mut self, lights: &BTreeMap<EntityId, LightRef>) {
        self.number_of_lights_changed = false;
        for light in lights.values() {
            light.clear_changed();
        }
    }

    /// Active lights per kind.
    pub fn counts(&self) -> LightCounts {
        self.counts
    }

    /// The light buffer, absent while no light is active.
    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Whether a per-kind count changed during this frame's update.
    pub fn number_of_lights_changed(&self) -> bool {
        self.number_of_lights_changed
    }

    /// How many times the buffer was re-laid out.
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// How many kind regions were patched in place.
    pub fn patches(&self) -> u64 {
        self.patches
    }

    /// Frees the buffer.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if let Some(buffer) = self.buffer.take() {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("Failed to destroy light buffer: {e}");
            }
        }
        self.counts = LightCounts::default();
        self.members = Default::default();
    }
}

fn member_handles(group: &[(EntityId, &LightRef, LightSource)]) -> Vec<(EntityId, LightRef)> {
    group.iter().map(|(e, light, _)| (*e, (*light).clone())).collect()
}

/// A replaced component on the same entity counts as a different member.
fn same_members(group: &[(EntityId, &LightRef, LightSource)], members: &[(EntityId, LightRef)]) -> bool {
    group.len() == members.len()
        && group
            .iter()
            .zip(members)
            .all(|((e, light, _), (member, handle))| e == member && light.ptr_eq(handle))
}

fn pack_group(group: &[(EntityId, &LightRef, LightSource)]) -> Vec<u8> {
    group
        .iter()
        .flat_map(|(_, light, source)| pack(source, light))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lumen_core::math::{Mat4, Vec3};
    use lumen_core::renderer::{DirectionalLight, HeadlessDevice, PointLight, SpotLight};
    use lumen_core::scene::TransformRef;

    fn point_at(x: f32) -> LightRef {
        LightRef::new(
            LightType::Point(PointLight::default()),
            TransformRef::new(Mat4::from_translation(Vec3::new(x, 0.0, 0.0))),
        )
    }

    #[test]
    fn record_sizes() {
        assert_eq!(record_size(LightKind::Directional), 32);
        assert_eq!(record_size(LightKind::Point), 32);
        assert_eq!(record_size(LightKind::Spot), 64);
    }

    #[test]
    fn regions_are_contiguous_by_kind() {
        let counts = LightCounts {
            directional: 1,
            point: 2,
            spot: 1,
        };
        assert_eq!(region_offset(LightKind::Directional, &counts), 0);
        assert_eq!(region_offset(LightKind::Point, &counts), 32);
        assert_eq!(region_offset(LightKind::Spot, &counts), 96);
    }

    #[test]
    fn no_lights_means_no_buffer() {
        let device = HeadlessDevice::new();
        let mut lights = LightAggregator::new();
        assert_eq!(lights.update(&device, "t", &BTreeMap::new()).unwrap(), 0);
        assert!(lights.buffer().is_none());
        assert!(!lights.number_of_lights_changed());
        assert_eq!(device.stats().buffers_created, 0);
    }

    #[test]
    fn count_change_recreates_once() {
        let device = HeadlessDevice::new();
        let mut agg = LightAggregator::new();
        let mut lights = BTreeMap::new();
        lights.insert(EntityId::new(1, 0), point_at(1.0));

        assert_eq!(agg.update(&device, "t", &lights).unwrap(), 32);
        assert!(agg.number_of_lights_changed());
        assert_eq!(agg.counts().point, 1);
        agg.after_update(&lights);
        assert!(!agg.number_of_lights_changed());

        assert_eq!(agg.update(&device, "t", &lights).unwrap(), 0);
        assert!(!agg.number_of_lights_changed());
        assert_eq!(agg.recreations(), 1);
    }

    #[test]
    fn moving_a_light_patches_only_its_region() {
        let device = HeadlessDevice::new();
        let mut agg = LightAggregator::new();
        let mut lights = BTreeMap::new();
        let sun = LightRef::new(
            LightType::Directional(DirectionalLight::default()),
            TransformRef::default(),
        );
        let bulb = point_at(1.0);
        lights.insert(EntityId::new(1, 0), sun);
        lights.insert(EntityId::new(2, 0), bulb.clone());
        agg.update(&device, "t", &lights).unwrap();
        agg.after_update(&lights);
        let buffer = agg.buffer().unwrap();
        let writes_before = device.stats().buffer_writes;

        bulb.transform()
            .set_world_matrix(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(agg.update(&device, "t", &lights).unwrap(), 32);
        assert_eq!(agg.recreations(), 1);
        assert_eq!(agg.patches(), 1);
        assert_eq!(agg.buffer(), Some(buffer));
        assert_eq!(device.stats().buffer_writes, writes_before + 1);

        let data = device.buffer_data(buffer).unwrap();
        let point: PointLightRecord = bytemuck::pod_read_unaligned(&data[32..64]);
        assert_relative_eq!(point.position_range[0], 5.0);
    }

    #[test]
    fn replacing_a_light_handle_repacks_its_region() {
        let device = HeadlessDevice::new();
        let mut agg = LightAggregator::new();
        let mut lights = BTreeMap::new();
        let entity = EntityId::new(7, 0);
        lights.insert(entity, point_at(1.0));
        agg.update(&device, "t", &lights).unwrap();
        agg.after_update(&lights);

        lights.insert(entity, point_at(9.0));
        assert_eq!(agg.update(&device, "t", &lights).unwrap(), 32);
        assert_eq!(agg.recreations(), 1);
        assert_eq!(agg.patches(), 1);

        let data = device.buffer_data(agg.buffer().unwrap()).unwrap();
        let point: PointLightRecord = bytemuck::pod_read_unaligned(&data[0..32]);
        assert_relative_eq!(point.position_range[0], 9.0);
    }

    #[test]
    fn disabling_a_light_changes_counts() {
        let device = HeadlessDevice::new();
        let mut agg = LightAggregator::new();
        let mut lights = BTreeMap::new();
        let spot = LightRef::new(LightType::Spot(SpotLight::default()), TransformRef::default());
        lights.insert(EntityId::new(3, 0), spot.clone());
        agg.update(&device, "t", &lights).unwrap();
        agg.after_update(&lights);

        spot.set_enabled(false);
        agg.update(&device, "t", &lights).unwrap();
        assert!(agg.number_of_lights_changed());
        assert!(agg.buffer().is_none());
        assert_eq!(device.stats().live_buffers(), 0);
    }

    #[test]
    fn spot_record_carries_cone_cosines() {
        let light = LightRef::new(LightType::Spot(SpotLight::default()), TransformRef::default());
        let bytes = pack(&light.source(), &light);
        let record: SpotLightRecord = bytemuck::pod_read_unaligned(&bytes);
        assert_relative_eq!(record.cone[0], 20.0_f32.to_radians().cos());
        assert_relative_eq!(record.direction[1], -1.0);
    }
}
