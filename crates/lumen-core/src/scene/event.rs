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

use super::{CameraRef, EntityId, LightRef, MeshRenderer};

/// The kinds of component the renderer observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// [`MeshRenderer`]
    MeshRenderer,
    /// [`CameraRef`]
    Camera,
    /// [`LightRef`]
    Light,
}

/// A component payload carried by a [`SceneEvent`].
#[derive(Debug, Clone)]
pub enum Component {
    /// A mesh renderer.
    MeshRenderer(MeshRenderer),
    /// A camera.
    Camera(CameraRef),
    /// A light.
    Light(LightRef),
}

impl Component {
    /// The component's kind.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::MeshRenderer(_) => ComponentKind::MeshRenderer,
            Component::Camera(_) => ComponentKind::Camera,
            Component::Light(_) => ComponentKind::Light,
        }
    }
}

/// A change to a component of interest, published by the scene.
#[derive(Debug, Clone)]
pub enum SceneEvent {
    /// A component was attached to an entity.
    ComponentAdded {
        /// The entity.
        entity: EntityId,
        /// The new component.
        component: Component,
    },
    /// A component's references were replaced (for example a new material).
    ComponentChanged {
        /// The entity.
        entity: EntityId,
        /// The component's new state.
        component: Component,
    },
    /// A component was detached from an entity.
    ComponentRemoved {
        /// The entity.
        entity: EntityId,
        /// Which component.
        kind: ComponentKind,
    },
    /// The entity and all its components are gone.
    EntityDestroyed {
        /// The entity.
        entity: EntityId,
    },
}

impl SceneEvent {
    /// The entity the event is about.
    pub fn entity(&self) -> EntityId {
        match self {
            SceneEvent::ComponentAdded { entity, .. }
            | SceneEvent::ComponentChanged { entity, .. }
            | SceneEvent::ComponentRemoved { entity, .. }
            | SceneEvent::EntityDestroyed { entity } => *entity,
        }
    }
}
