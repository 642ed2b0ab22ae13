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

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for content-derived identifiers.
const CONTENT_NAMESPACE: Uuid = Uuid::from_u128(0x6c75_6d65_6e2d_4173_7365_7449_6421_0001);

/// A stable, unique identifier for a logical asset.
///
/// Authored assets get a random (version 4) id. Generated content, such as the
/// source of a compiled shader variant, gets a deterministic (version 5) id
/// derived from its bytes so that identical content always maps to the same id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Creates a new, random (version 4) `AssetId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives an id from content bytes. Equal content yields equal ids.
    pub fn from_content(bytes: &[u8]) -> Self {
        Self(Uuid::new_v5(&CONTENT_NAMESPACE, bytes))
    }

    /// Builds an id from a raw 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
