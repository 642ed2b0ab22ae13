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

use super::ResourceContext;
use crate::error::Result;
use crate::pool::DeviceObject;
use lumen_core::asset::AssetId;
use lumen_core::renderer::{
    GraphicsDevice, ShaderProgramDescriptor, ShaderProgramId, ShaderSourceData,
};
use std::borrow::Cow;

/// One compiled program. Immutable once created.
///
/// Shader objects are pooled under the content id of their full source, so
/// every draw object that generates the same variant shares one program.
#[derive(Debug)]
pub struct ShaderObject {
    id: AssetId,
    label: String,
    program: ShaderProgramId,
}

impl ShaderObject {
    /// Compiles a program from complete stage sources.
    pub fn compile(
        ctx: ResourceContext<'_>,
        id: AssetId,
        label: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self> {
        if ctx.config.log_shader_source {
            log::debug!("Variant '{label}' vertex source:\n{vertex}");
            log::debug!("Variant '{label}' fragment source:\n{fragment}");
        }
        let program = ctx.device.create_shader_program(&ShaderProgramDescriptor {
            label: Some(label),
            vertex: ShaderSourceData::Glsl(Cow::Borrowed(vertex)),
            fragment: ShaderSourceData::Glsl(Cow::Borrowed(fragment)),
        })?;
        log::debug!("Compiled shader variant '{label}' ({id})");
        Ok(Self {
            id,
            label: label.to_string(),
            program,
        })
    }

    /// The device program.
    pub fn program(&self) -> ShaderProgramId {
        self.program
    }

    /// The variant's label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl DeviceObject for ShaderObject {
    fn destroy(&mut self, device: &dyn GraphicsDevice) {
        if let Err(e) = device.destroy_shader_program(self.program) {
            log::warn!("Failed to destroy shader {}: {e}", self.id);
        }
    }
}
