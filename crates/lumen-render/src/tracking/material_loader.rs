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

//! Resolves mesh renderer references against the asset layer.

use super::ChangeTracker;
use crate::error::{AssetKind, ErrorScope, RenderCoreError, ScopedError};
use lumen_core::asset::{AssetId, AssetResolver};
use lumen_core::scene::{EntityId, MeshRenderer, TransformRef};
use std::collections::{BTreeMap, BTreeSet};

/// A mesh renderer whose mesh and material both resolved.
#[derive(Debug, Clone)]
pub struct ResolvedRenderer {
    /// The resolved mesh.
    pub mesh: AssetId,
    /// The resolved material.
    pub material: AssetId,
    /// The entity's transform.
    pub transform: TransformRef,
}

/// Keeps the resolved state of every mesh renderer.
///
/// Resolution only happens when the tracker reports the renderer as changed,
/// so an id that fails to resolve is retried when the reference changes again.
#[derive(Debug, Default)]
pub struct MaterialLoader {
    resolved: BTreeMap<EntityId, ResolvedRenderer>,
    changed: BTreeSet<EntityId>,
}

impl MaterialLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-resolves every renderer the tracker saw change this frame.
    pub fn update(
        &mut self,
        tracker: &ChangeTracker,
        resolver: &dyn AssetResolver,
    ) -> Vec<ScopedError> {
        let mut errors = Vec::new();
        for entity in tracker.changed_renderers() {
            let next = match tracker.renderer(entity) {
                Some(renderer) => match resolve(renderer, resolver) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        errors.push(ScopedError::new(ErrorScope::Entity(entity), e));
                        None
                    }
                },
                None => None,
            };
            match next {
                Some(resolved) => {
                    self.resolved.insert(entity, resolved);
                }
                None => {
                    self.resolved.remove(&entity);
                }
            }
            self.changed.insert(entity);
        }
        errors
    }

    /// Forgets this frame's changes.
    pub fn after_update(&mut self) {
        self.changed.clear();
    }

    /// Entities whose resolved state was recomputed this frame.
    pub fn changed(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.changed.iter().copied()
    }

    /// The resolved renderer of `entity`, if both references resolved.
    pub fn resolved(&self, entity: EntityId) -> Option<&ResolvedRenderer> {
        self.resolved.get(&entity)
    }

    /// Number of fully resolved renderers.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Whether no renderer is resolved.
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// `Ok(None)` when a reference is unset, an error when a set reference does not resolve.
fn resolve(
    renderer: &MeshRenderer,
    resolver: &dyn AssetResolver,
) -> Result<Option<ResolvedRenderer>, RenderCoreError> {
    let (Some(mesh), Some(material)) = (renderer.mesh, renderer.material) else {
        return Ok(None);
    };
    if resolver.resolve_mesh(mesh).is_none() {
        return Err(RenderCoreError::ResourceResolution {
            kind: AssetKind::Mesh,
            id: mesh,
        });
    }
    if resolver.resolve_material(material).is_none() {
        return Err(RenderCoreError::ResourceResolution {
            kind: AssetKind::Material,
            id: material,
        });
    }
    Ok(Some(ResolvedRenderer {
        mesh,
        material,
        transform: renderer.transform.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::asset::{AssetRegistry, Material, Mesh, ShaderTemplate};
    use lumen_core::event::EventBus;
    use lumen_core::scene::{Component, SceneEvent};

    fn setup() -> (EventBus<SceneEvent>, ChangeTracker, AssetRegistry) {
        let bus = EventBus::new();
        let tracker = ChangeTracker::new(bus.receiver().clone());
        (bus, tracker, AssetRegistry::new())
    }

    #[test]
    fn resolves_renderer_with_both_references() {
        let (bus, mut tracker, registry) = setup();
        let (mesh, _) = registry.add_mesh(Mesh::quad("quad"));
        let (material, _) = registry.add_material(Material::new("flat", ShaderTemplate::default()));
        let entity = EntityId::new(0, 0);
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::MeshRenderer(MeshRenderer::new(
                mesh,
                material,
                TransformRef::default(),
            )),
        });

        let mut loader = MaterialLoader::new();
        tracker.update();
        assert!(loader.update(&tracker, &registry).is_empty());
        let resolved = loader.resolved(entity).map(|r| (r.mesh, r.material));
        assert_eq!(resolved, Some((mesh, material)));
        assert_eq!(loader.changed().collect::<Vec<_>>(), vec![entity]);

        loader.after_update();
        assert_eq!(loader.changed().count(), 0);
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn unresolvable_mesh_is_reported_against_the_entity() {
        let (bus, mut tracker, registry) = setup();
        let (material, _) = registry.add_material(Material::new("flat", ShaderTemplate::default()));
        let missing = AssetId::new();
        let entity = EntityId::new(3, 0);
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::MeshRenderer(MeshRenderer::new(
                missing,
                material,
                TransformRef::default(),
            )),
        });

        let mut loader = MaterialLoader::new();
        tracker.update();
        let errors = loader.update(&tracker, &registry);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].scope, ErrorScope::Entity(entity));
        assert_eq!(
            errors[0].error,
            RenderCoreError::ResourceResolution {
                kind: AssetKind::Mesh,
                id: missing
            }
        );
        assert!(loader.resolved(entity).is_none());
    }

    #[test]
    fn clearing_a_reference_unresolves_the_renderer() {
        let (bus, mut tracker, registry) = setup();
        let (mesh, _) = registry.add_mesh(Mesh::quad("quad"));
        let (material, _) = registry.add_material(Material::new("flat", ShaderTemplate::default()));
        let entity = EntityId::new(1, 0);
        let mut renderer = MeshRenderer::new(mesh, material, TransformRef::default());
        bus.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::MeshRenderer(renderer.clone()),
        });
        let mut loader = MaterialLoader::new();
        tracker.update();
        loader.update(&tracker, &registry);
        tracker.after_update();
        loader.after_update();

        renderer.material = None;
        bus.publish(SceneEvent::ComponentChanged {
            entity,
            component: Component::MeshRenderer(renderer),
        });
        tracker.update();
        assert!(loader.update(&tracker, &registry).is_empty());
        assert!(loader.is_empty());
        assert_eq!(loader.changed().collect::<Vec<_>>(), vec![entity]);
    }
}
