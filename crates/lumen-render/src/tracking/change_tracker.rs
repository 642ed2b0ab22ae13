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

//! Buffers one frame of scene events.

use lumen_core::scene::{CameraRef, Component, ComponentKind, EntityId, LightRef, MeshRenderer, SceneEvent};
use std::collections::{BTreeMap, BTreeSet};

/// Applies scene events to the renderer's view of the components it cares about.
///
/// Mesh renderers, cameras and lights are mirrored by entity. Every mesh
/// renderer that was added, changed or removed during the frame is listed in
/// [`ChangeTracker::changed_renderers`] until [`ChangeTracker::after_update`].
#[derive(Debug)]
pub struct ChangeTracker {
    receiver: flume::Receiver<SceneEvent>,
    renderers: BTreeMap<EntityId, MeshRenderer>,
    cameras: BTreeMap<EntityId, CameraRef>,
    lights: BTreeMap<EntityId, LightRef>,
    changed_renderers: BTreeSet<EntityId>,
    events_this_frame: usize,
}

impl ChangeTracker {
    /// Creates a tracker draining `receiver`.
    pub fn new(receiver: flume::Receiver<SceneEvent>) -> Self {
        Self {
            receiver,
            renderers: BTreeMap::new(),
            cameras: BTreeMap::new(),
            lights: BTreeMap::new(),
            changed_renderers: BTreeSet::new(),
            events_this_frame: 0,
        }
    }

    /// Drains and applies every pending event in publication order.
    pub fn update(&mut self) {
        let events: Vec<SceneEvent> = self.receiver.try_iter().collect();
        self.events_this_frame += events.len();
        for event in events {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::ComponentAdded { entity, component }
            | SceneEvent::ComponentChanged { entity, component } => match component {
                Component::MeshRenderer(renderer) => {
                    self.renderers.insert(entity, renderer);
                    self.changed_renderers.insert(entity);
                }
                Component::Camera(camera) => {
                    self.cameras.insert(entity, camera);
                }
                Component::Light(light) => {
                    self.lights.insert(entity, light);
                }
            },
            SceneEvent::ComponentRemoved { entity, kind } => self.remove(entity, kind),
            SceneEvent::EntityDestroyed { entity } => {
                for kind in [ComponentKind::MeshRenderer, ComponentKind::Camera, ComponentKind::Light] {
                    self.remove(entity, kind);
                }
            }
        }
    }

    fn remove(&mut self, entity: EntityId, kind: ComponentKind) {
        let removed = match kind {
            ComponentKind::MeshRenderer => {
                let removed = self.renderers.remove(&entity).is_some();
                if removed {
                    self.changed_renderers.insert(entity);
                }
                removed
            }
            ComponentKind::Camera => self.cameras.remove(&entity).is_some(),
            ComponentKind::Light => self.lights.remove(&entity).is_some(),
        };
        if !removed {
            log::trace!("Ignoring removal of untracked {kind:?} on entity {entity}");
        }
    }

    /// Forgets this frame's changes.
    pub fn after_update(&mut self) {
        self.changed_renderers.clear();
        self.events_this_frame = 0;
    }

    /// Entities whose mesh renderer was added, changed or removed this frame.
    pub fn changed_renderers(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.changed_renderers.iter().copied()
    }

    /// The current mesh renderer of `entity`.
    pub fn renderer(&self, entity: EntityId) -> Option<&MeshRenderer> {
        self.renderers.get(&entity)
    }

    /// Every tracked camera in entity order.
    pub fn cameras(&self) -> &BTreeMap<EntityId, CameraRef> {
        &self.cameras
    }

    /// Every tracked light in entity order.
    pub fn lights(&self) -> &BTreeMap<EntityId, LightRef> {
        &self.lights
    }

    /// The first active camera in entity order.
    pub fn active_camera(&self) -> Option<(EntityId, &CameraRef)> {
        self.cameras
            .iter()
            .find(|(_, camera)| camera.is_active())
            .map(|(entity, camera)| (*entity, camera))
    }

    /// Events applied since the last [`ChangeTracker::after_update`].
    pub fn events_this_frame(&self) -> usize {
        self.events_this_frame
    }

    /// Forgets every tracked component.
    pub fn clear(&mut self) {
        self.renderers.clear();
        self.cameras.clear();
        self.lights.clear();
        self.changed_renderers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::asset::AssetId;
    use lumen_core::event::EventBus;
    use lumen_core::renderer::{LightType, PointLight};
    use lumen_core::scene::{Camera, TransformRef};

    fn renderer() -> Component {
        Component::MeshRenderer(MeshRenderer::new(
            AssetId::new(),
            AssetId::new(),
            TransformRef::default(),
        ))
    }

    #[test]
    fn renderer_changes_are_listed_for_one_frame() {
        let bus = EventBus::new();
        let mut tracker = ChangeTracker::new(bus.receiver().clone());
        let entity = EntityId::new(0, 0);
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: renderer(),
        });

        tracker.update();
        assert_eq!(tracker.changed_renderers().collect::<Vec<_>>(), vec![entity]);
        assert!(tracker.renderer(entity).is_some());
        assert_eq!(tracker.events_this_frame(), 1);

        tracker.after_update();
        tracker.update();
        assert_eq!(tracker.changed_renderers().count(), 0);
        assert!(tracker.renderer(entity).is_some());
    }

    #[test]
    fn add_then_remove_in_one_frame_leaves_no_renderer() {
        let bus = EventBus::new();
        let mut tracker = ChangeTracker::new(bus.receiver().clone());
        let entity = EntityId::new(4, 1);
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: renderer(),
        });
        bus.publish(SceneEvent::ComponentRemoved {
            entity,
            kind: ComponentKind::MeshRenderer,
        });

        tracker.update();
        assert!(tracker.renderer(entity).is_none());
        assert_eq!(tracker.changed_renderers().collect::<Vec<_>>(), vec![entity]);
    }

    #[test]
    fn entity_destruction_removes_every_component() {
        let bus = EventBus::new();
        let mut tracker = ChangeTracker::new(bus.receiver().clone());
        let entity = EntityId::new(1, 0);
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::Light(LightRef::new(
                LightType::Point(PointLight::default()),
                TransformRef::default(),
            )),
        });
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::Camera(CameraRef::new(Camera::default())),
        });
        tracker.update();
        assert_eq!(tracker.lights().len(), 1);
        assert_eq!(tracker.active_camera().map(|(e, _)| e), Some(entity));

        bus.publish(SceneEvent::EntityDestroyed { entity });
        tracker.update();
        assert!(tracker.lights().is_empty());
        assert!(tracker.active_camera().is_none());
    }

    #[test]
    fn first_active_camera_in_entity_order_wins() {
        let bus = EventBus::new();
        let mut tracker = ChangeTracker::new(bus.receiver().clone());
        let inactive = CameraRef::new(Camera {
            active: false,
            ..Default::default()
        });
        for (index, camera) in [(2, CameraRef::new(Camera::default())), (1, inactive)] {
            bus.publish(SceneEvent::ComponentAdded {
                entity: EntityId::new(index, 0),
                component: Component::Camera(camera),
            });
        }
        tracker.update();
        assert_eq!(tracker.active_camera().map(|(e, _)| e), Some(EntityId::new(2, 0)));
    }
}
