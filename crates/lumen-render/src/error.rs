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

//! Errors produced by the render core and the per-frame report that scopes them.

use crate::instanced::InstanceKey;
use lumen_core::asset::AssetId;
use lumen_core::renderer::{ResourceError, ShaderError};
use lumen_core::scene::EntityId;
use std::fmt;
use thiserror::Error;

/// The kind of logical asset a resolution was attempted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// A mesh.
    Mesh,
    /// A material.
    Material,
    /// A texture.
    Texture,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Mesh => write!(f, "mesh"),
            AssetKind::Material => write!(f, "material"),
            AssetKind::Texture => write!(f, "texture"),
        }
    }
}

/// The error type of the render core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderCoreError {
    /// A referenced asset could not be resolved by the asset layer.
    #[error("Failed to resolve {kind} asset {id}")]
    ResourceResolution {
        /// What was being resolved.
        kind: AssetKind,
        /// The unresolved id.
        id: AssetId,
    },

    /// A generated shader variant failed to compile on the device.
    #[error("Shader compilation failed for '{label}': {details}")]
    ShaderCompile {
        /// The variant's label.
        label: String,
        /// The compiler's diagnostic text.
        details: String,
    },

    /// A programming-contract error, such as querying state before the first update.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// An asset's payload cannot be turned into device data.
    #[error("Invalid asset {id}: {reason}")]
    InvalidAsset {
        /// The asset.
        id: AssetId,
        /// Why it was rejected.
        reason: String,
    },

    /// The device rejected an operation.
    #[error("Device error: {0}")]
    Device(ResourceError),

    /// The renderer configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<ResourceError> for RenderCoreError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Shader(ShaderError::CompilationError { label, details }) => {
                RenderCoreError::ShaderCompile { label, details }
            }
            other => RenderCoreError::Device(other),
        }
    }
}

/// A specialized `Result` for render core operations.
pub type Result<T> = std::result::Result<T, RenderCoreError>;

/// What a failure is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// One entity's mesh renderer.
    Entity(EntityId),
    /// One instanced draw object.
    Instanced(InstanceKey),
    /// One mesh device object.
    Mesh(AssetId),
    /// One material device object.
    Material(AssetId),
    /// One texture device object.
    Texture(AssetId),
    /// The light source buffer.
    Lights,
    /// Frame-wide state owned by the renderer.
    Frame,
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorScope::Entity(entity) => write!(f, "entity {entity}"),
            ErrorScope::Instanced(key) => write!(f, "instanced {key}"),
            ErrorScope::Mesh(id) => write!(f, "mesh {id}"),
            ErrorScope::Material(id) => write!(f, "material {id}"),
            ErrorScope::Texture(id) => write!(f, "texture {id}"),
            ErrorScope::Lights => write!(f, "lights"),
            ErrorScope::Frame => write!(f, "frame"),
        }
    }
}

/// An error that aborted the frame for one scope only.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedError {
    /// What failed.
    pub scope: ErrorScope,
    /// Why.
    pub error: RenderCoreError,
}

impl ScopedError {
    /// Pairs an error with its scope and logs it.
    pub fn new(scope: ErrorScope, error: RenderCoreError) -> Self {
        log::error!("[{scope}] {error}");
        Self { scope, error }
    }
}

/// What one call to [`ForwardRenderer::update`](crate::ForwardRenderer::update) did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// The frame number, starting at 1.
    pub frame: u64,
    /// Live instanced draw objects after the update.
    pub draw_objects: usize,
    /// Total instances across those objects.
    pub instances: usize,
    /// Shader variants compiled or re-acquired this frame.
    pub shader_compilations: usize,
    /// Bytes uploaded to the device this frame.
    pub uploaded_bytes: u64,
    /// Failures confined to one object each.
    pub errors: Vec<ScopedError>,
}

impl FrameReport {
    /// Whether nothing failed this frame.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What one call to [`ForwardRenderer::draw`](crate::ForwardRenderer::draw) did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawReport {
    /// Draw calls submitted.
    pub draw_calls: usize,
    /// Instances drawn across all calls.
    pub instances: usize,
    /// Non-empty draw objects skipped because no variant is compiled.
    pub skipped: usize,
    /// Draws the device rejected.
    pub errors: Vec<ScopedError>,
}
