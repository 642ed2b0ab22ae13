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

//! Groups resolved renderers by (mesh, material) and records per-frame deltas.

use super::MaterialLoader;
use crate::instanced::InstanceKey;
use lumen_core::scene::{EntityId, TransformRef};
use std::collections::BTreeMap;

/// One entity eligible for rendering.
#[derive(Debug, Clone)]
pub struct Batch {
    /// The (mesh, material) pair the entity is drawn with.
    pub key: InstanceKey,
    /// The entity's transform.
    pub transform: TransformRef,
}

impl Batch {
    fn same_as(&self, other: &Batch) -> bool {
        self.key == other.key && self.transform.ptr_eq(&other.transform)
    }
}

/// The authoritative set of batches plus the net additions and removals since
/// the last [`MeshBatcher::after_update`].
///
/// An entity that is batched and unbatched again before `after_update` leaves
/// no delta behind, and neither does one that returns to the batch it had.
#[derive(Debug, Default)]
pub struct MeshBatcher {
    batches: BTreeMap<EntityId, Batch>,
    added: BTreeMap<EntityId, Batch>,
    removed: BTreeMap<EntityId, Batch>,
}

impl MeshBatcher {
    /// Creates an empty batcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every renderer the loader recomputed into or out of the batch set.
    pub fn update(&mut self, loader: &MaterialLoader) {
        for entity in loader.changed() {
            let next = loader.resolved(entity).map(|resolved| Batch {
                key: InstanceKey {
                    mesh: resolved.mesh,
                    material: resolved.material,
                },
                transform: resolved.transform.clone(),
            });
            if let (Some(current), Some(next)) = (self.batches.get(&entity), next.as_ref()) {
                if current.same_as(next) {
                    continue;
                }
            }
            if let Some(old) = self.batches.remove(&entity) {
                self.record_removed(entity, old);
            }
            if let Some(next) = next {
                self.batches.insert(entity, next.clone());
                self.record_added(entity, next);
            }
        }
    }

    fn record_removed(&mut self, entity: EntityId, batch: Batch) {
        if self.added.remove(&entity).is_none() {
            self.removed.entry(entity).or_insert(batch);
        }
    }

    fn record_added(&mut self, entity: EntityId, batch: Batch) {
        match self.removed.get(&entity) {
            Some(previous) if previous.same_as(&batch) => {
                self.removed.remove(&entity);
            }
            _ => {
                self.added.insert(entity, batch);
            }
        }
    }

    /// Forgets this frame's deltas.
    pub fn after_update(&mut self) {
        self.added.clear();
        self.removed.clear();
    }

    /// Batches created since the last `after_update`.
    pub fn added(&self) -> impl Iterator<Item = (EntityId, &Batch)> {
        self.added.iter().map(|(entity, batch)| (*entity, batch))
    }

    /// Batches removed since the last `after_update`, as they were before removal.
    pub fn removed(&self) -> impl Iterator<Item = (EntityId, &Batch)> {
        self.removed.iter().map(|(entity, batch)| (*entity, batch))
    }

    /// The current batch of `entity`.
    pub fn batch(&self, entity: EntityId) -> Option<&Batch> {
        self.batches.get(&entity)
    }

    /// Number of batched entities.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether no entity is batched.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Whether there is no pending delta.
    pub fn is_settled(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
