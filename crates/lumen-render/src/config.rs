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

//! Renderer settings, loadable from RON.

use crate::error::{RenderCoreError, Result};
use serde::{Deserialize, Serialize};

/// Size of the off-screen frame buffer the renderer draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderTargetConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Settings for a [`ForwardRenderer`](crate::ForwardRenderer).
///
/// Every field has a default, so a RON document only needs to name what it changes:
///
/// ```
/// use lumen_render::RendererConfig;
///
/// let config = RendererConfig::from_ron_str("(initial_instance_capacity: 64)").unwrap();
/// assert_eq!(config.initial_instance_capacity, 64);
/// assert_eq!(config.shader_header, "#version 450");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Instances every new instance buffer has room for.
    pub initial_instance_capacity: usize,
    /// First line of every generated shader stage.
    pub shader_header: String,
    /// Prefix for device object debug labels.
    pub label: String,
    /// Draw into an off-screen frame buffer instead of the default target.
    pub render_target: Option<RenderTargetConfig>,
    /// Log every generated variant's source at `debug` level.
    pub log_shader_source: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_instance_capacity: 16,
            shader_header: "#version 450".to_string(),
            label: "lumen".to_string(),
            render_target: None,
            log_shader_source: false,
        }
    }
}

impl RendererConfig {
    /// Parses and validates a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(source).map_err(|e| RenderCoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| RenderCoreError::Config(e.to_string()))
    }

    /// Checks the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.initial_instance_capacity == 0 {
            return Err(RenderCoreError::Config(
                "initial_instance_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(target) = self.render_target {
            if target.width == 0 || target.height == 0 {
                return Err(RenderCoreError::Config(format!(
                    "render target size {}x{} must be non-zero",
                    target.width, target.height
                )));
            }
        }
        Ok(())
    }
}
