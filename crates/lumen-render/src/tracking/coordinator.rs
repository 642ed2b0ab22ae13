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

//! Applies batch deltas to the instanced draw objects.

use super::MeshBatcher;
use crate::error::{ErrorScope, ScopedError};
use crate::instanced::InstanceKey;
use crate::manager::DeviceObjectManager;
use std::collections::BTreeSet;

/// Reconciles [`MeshBatcher`] deltas into instanced draw objects.
///
/// Removals are applied before additions so an entity moving between pairs
/// never sits in two objects. A draw object whose transform set is empty once
/// both are applied is destroyed, returning its mesh, material and shader.
#[derive(Debug, Default)]
pub struct InstancingCoordinator {
    touched: BTreeSet<InstanceKey>,
}

impl InstancingCoordinator {
    /// Creates a coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies this frame's deltas.
    pub fn update(
        &mut self,
        batcher: &MeshBatcher,
        manager: &mut DeviceObjectManager,
    ) -> Vec<ScopedError> {
        let mut errors = Vec::new();
        self.touched.clear();

        for (entity, batch) in batcher.removed() {
            match manager.instanced_mut(batch.key) {
                Some(object) => {
                    object.remove(entity);
                    self.touched.insert(batch.key);
                }
                // The object was never created because its creation failed.
                None => log::trace!("No draw object {} to remove {entity} from", batch.key),
            }
        }

        for (entity, batch) in batcher.added() {
            match manager.get_or_add_instanced(batch.key) {
                Ok(object) => {
                    object.insert(entity, batch.transform.clone());
                    self.touched.insert(batch.key);
                }
                Err(e) => errors.push(ScopedError::new(ErrorScope::Instanced(batch.key), e)),
            }
        }

        for key in &self.touched {
            if manager.instanced(*key).is_some_and(|object| object.is_empty()) {
                if let Err(e) = manager.remove_instanced(*key) {
                    errors.push(ScopedError::new(ErrorScope::Instanced(*key), e));
                }
            }
        }
        errors
    }
}
