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

//! Reference-counted caches of device objects.
//!
//! One [`DevicePool`] exists per device object kind. A pool maps the id of a
//! logical asset to at most one device object: the first request creates it,
//! later requests share it and bump its count, and the last release destroys
//! it on the device. Failed creations are never cached.

mod refcount;

pub use refcount::RefCounted;

use crate::error::{RenderCoreError, Result};
use ahash::AHashMap;
use lumen_core::asset::AssetId;
use lumen_core::renderer::GraphicsDevice;

/// A GPU-resident object that frees its device resources explicitly.
pub trait DeviceObject {
    /// Frees every device resource the object owns.
    fn destroy(&mut self, device: &dyn GraphicsDevice);
}

/// A cache of reference-counted device objects keyed by asset id.
#[derive(Debug)]
pub struct DevicePool<T> {
    kind: &'static str,
    objects: AHashMap<AssetId, RefCounted<T>>,
    created: u64,
    destroyed: u64,
}

impl<T: DeviceObject> DevicePool<T> {
    /// Creates an empty pool. `kind` names the pooled objects in logs and errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            objects: AHashMap::new(),
            created: 0,
            destroyed: 0,
        }
    }

    /// Returns the object for `id`, creating it with `create` on first request.
    ///
    /// Either way the caller becomes one more owner and must call
    /// [`DevicePool::release`] once it is done. If `create` fails nothing is
    /// cached and the next request tries again.
    pub fn get_or_create<F>(&mut self, id: AssetId, create: F) -> Result<&mut T>
    where
        F: FnOnce() -> Result<T>,
    {
        if !self.objects.contains_key(&id) {
            let object = create()?;
            log::debug!("Created {} device object {id}", self.kind);
            self.created += 1;
            self.objects.insert(id, RefCounted::new(object));
        } else if let Some(entry) = self.objects.get_mut(&id) {
            entry.acquire();
        }
        let kind = self.kind;
        self.objects
            .get_mut(&id)
            .map(RefCounted::get_mut)
            .ok_or_else(|| missing(kind, id))
    }

    /// Adds an owner to an object that already exists.
    pub fn acquire(&mut self, id: AssetId) -> Result<()> {
        let kind = self.kind;
        let entry = self.objects.get_mut(&id).ok_or_else(|| missing(kind, id))?;
        entry.acquire();
        Ok(())
    }

    /// Drops an owner. The object is destroyed and evicted when its last owner releases it.
    ///
    /// Returns whether the object was destroyed.
    pub fn release(&mut self, id: AssetId, device: &dyn GraphicsDevice) -> Result<bool> {
        let kind = self.kind;
        let entry = self.objects.get_mut(&id).ok_or_else(|| {
            RenderCoreError::InvariantViolation(format!("release of {kind} {id} that is not pooled"))
        })?;
        if !entry.release() {
            return Ok(false);
        }
        if let Some(entry) = self.objects.remove(&id) {
            entry.into_inner().destroy(device);
            self.destroyed += 1;
            log::debug!("Destroyed {} device object {id}", self.kind);
        }
        Ok(true)
    }

    /// The object for `id`, if pooled.
    pub fn get(&self, id: AssetId) -> Option<&T> {
        self.objects.get(&id).map(RefCounted::get)
    }

    /// The object for `id`, mutably, if pooled.
    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut T> {
        self.objects.get_mut(&id).map(RefCounted::get_mut)
    }

    /// Number of owners of `id`, if pooled.
    pub fn ref_count(&self, id: AssetId) -> Option<u32> {
        self.objects.get(&id).map(RefCounted::count)
    }

    /// Whether `id` is pooled.
    pub fn contains(&self, id: AssetId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of pooled objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects created over the pool's lifetime.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Objects destroyed over the pool's lifetime.
    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    /// Every pooled object with its id.
    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &T)> {
        self.objects.iter().map(|(id, entry)| (*id, entry.get()))
    }

    /// Every pooled object with its id, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AssetId, &mut T)> {
        self.objects
            .iter_mut()
            .map(|(id, entry)| (*id, entry.get_mut()))
    }

    /// Destroys every object regardless of its count. Returns how many were still owned.
    pub fn clear(&mut self, device: &dyn GraphicsDevice) -> usize {
        let leaked = self.objects.len();
        for (id, entry) in self.objects.drain() {
            log::warn!(
                "Destroying {} {id} with {} outstanding owner(s)",
                self.kind,
                entry.count()
            );
            entry.into_inner().destroy(device);
            self.destroyed += 1;
        }
        leaked
    }
}

fn missing(kind: &str, id: AssetId) -> RenderCoreError {
    RenderCoreError::InvariantViolation(format!("{kind} {id} is not pooled"))
}
