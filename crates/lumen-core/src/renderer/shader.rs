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

//! Describes the shader programs a device compiles.

use std::borrow::Cow;

/// The programmable stages of a render program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The fragment stage.
    Fragment,
}

/// Represents the source data for one shader stage.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    /// GLSL-style source with a preprocessor.
    Glsl(Cow<'a, str>),
}

impl ShaderSourceData<'_> {
    /// The source text.
    pub fn as_str(&self) -> &str {
        match self {
            ShaderSourceData::Glsl(src) => src,
        }
    }
}

/// Describes a complete program (vertex + fragment) to be created by the `GraphicsDevice`.
#[derive(Debug, Clone)]
pub struct ShaderProgramDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The vertex stage source.
    pub vertex: ShaderSourceData<'a>,
    /// The fragment stage source.
    pub fragment: ShaderSourceData<'a>,
}

/// An opaque handle representing a compiled and linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderProgramId(pub usize);
