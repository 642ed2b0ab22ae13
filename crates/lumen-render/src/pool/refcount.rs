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

/// A device object paired with the number of owners currently holding it.
#[derive(Debug)]
pub struct RefCounted<T> {
    object: T,
    count: u32,
}

impl<T> RefCounted<T> {
    /// Wraps a freshly created object with one owner.
    pub fn new(object: T) -> Self {
        Self { object, count: 1 }
    }

    /// Registers one more owner.
    pub fn acquire(&mut self) {
        self.count += 1;
    }

    /// Drops one owner. Returns `true` when no owner is left and the object must be destroyed.
    ///
    /// The count saturates at zero.
    pub fn release(&mut self) -> bool {
        self.count = self.count.saturating_sub(1);
        self.count == 0
    }

    /// Current number of owners.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The wrapped object.
    pub fn get(&self) -> &T {
        &self.object
    }

    /// The wrapped object, mutably.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.object
    }

    /// Unwraps the object.
    pub fn into_inner(self) -> T {
        self.object
    }
}
