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

//! Shader variant generation.
//!
//! A variant is selected by a [`ShaderVariantKey`]: which vertex attributes the
//! mesh provides, the material's parameter blocks and bound textures, and the
//! active light counts when the material is lit. The key expands into a
//! preamble of defines and binding declarations that is prepended to the
//! material's shader bodies. Generation is a pure function of the key, the
//! header and the bodies, so equal inputs give byte-identical sources and the
//! same content id.
//!
//! Binding slots are assigned in one append-only order: frame details first,
//! the light block next when any light is active, then material blocks in
//! declaration order, then bound textures in declaration order.

use crate::objects::AttributeSlots;
use lumen_core::asset::{AssetId, ParameterType, ShaderTemplate, VertexAttribute};
use lumen_core::renderer::{LightCounts, LightKind};
use std::fmt::Write;

/// Binding slot of the frame details block in every variant.
pub const FRAME_DETAILS_SLOT: u32 = 0;

/// Shader locations taken by the per-instance model matrix.
pub const INSTANCE_MATRIX_LOCATIONS: u32 = 4;

/// The member layout of one material parameter block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockSignature {
    /// Block name.
    pub name: String,
    /// Member names and types in declaration order.
    pub members: Vec<(String, ParameterType)>,
}

/// One material texture slot as seen by the variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureSignature {
    /// Slot name.
    pub name: String,
    /// Whether a texture is bound. Unbound slots get no binding.
    pub bound: bool,
}

/// The structural signature that selects a shader variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderVariantKey {
    /// Present vertex attributes ordered by their slot.
    pub attributes: Vec<VertexAttribute>,
    /// Material parameter blocks.
    pub blocks: Vec<BlockSignature>,
    /// Material texture slots.
    pub textures: Vec<TextureSignature>,
    /// Active light counts. Always zero for unlit materials.
    pub lights: LightCounts,
}

impl ShaderVariantKey {
    /// Builds a key. `lights` is ignored unless `lit` is set.
    pub fn new(
        slots: &AttributeSlots,
        blocks: Vec<BlockSignature>,
        textures: Vec<TextureSignature>,
        lit: bool,
        lights: LightCounts,
    ) -> Self {
        let mut attributes: Vec<(i32, VertexAttribute)> = VertexAttribute::all()
            .map(|attribute| (slots[attribute.index()], attribute))
            .filter(|(slot, _)| *slot >= 0)
            .collect();
        attributes.sort_by_key(|(slot, _)| *slot);
        Self {
            attributes: attributes.into_iter().map(|(_, a)| a).collect(),
            blocks,
            textures,
            lights: if lit { lights } else { LightCounts::default() },
        }
    }

    /// The binding slots this key assigns.
    pub fn bindings(&self) -> BindingSlots {
        let mut next = FRAME_DETAILS_SLOT + 1;
        let mut take = || {
            let slot = next;
            next += 1;
            slot
        };
        let lights = self.lights.any().then(&mut take);
        let blocks = self.blocks.iter().map(|_| take()).collect();
        let textures = self
            .textures
            .iter()
            .map(|t| t.bound.then(&mut take))
            .collect();
        BindingSlots {
            frame_details: FRAME_DETAILS_SLOT,
            lights,
            blocks,
            textures,
            instance_location: self.attributes.len() as u32,
        }
    }

    /// Generates both stage sources for this key.
    pub fn generate(&self, header: &str, template: &ShaderTemplate) -> ShaderVariant {
        let bindings = self.bindings();
        let common = self.common_preamble(header, &bindings);

        let mut vertex = common.clone();
        for (location, attribute) in self.attributes.iter().enumerate() {
            let _ = writeln!(
                vertex,
                "layout(location = {location}) in {} a_{};",
                glsl_vertex_type(*attribute),
                attribute
            );
        }
        let _ = writeln!(
            vertex,
            "layout(location = {}) in mat4 i_model;",
            bindings.instance_location
        );
        vertex.push('\n');
        vertex.push_str(&template.vertex);

        let mut fragment = common;
        fragment.push('\n');
        fragment.push_str(&template.fragment);

        let mut content = Vec::with_capacity(vertex.len() + fragment.len() + 1);
        content.extend_from_slice(vertex.as_bytes());
        content.push(0);
        content.extend_from_slice(fragment.as_bytes());

        ShaderVariant {
            id: AssetId::from_content(&content),
            vertex,
            fragment,
            bindings,
        }
    }

    fn common_preamble(&self, header: &str, bindings: &BindingSlots) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{header}");
        for attribute in &self.attributes {
            let _ = writeln!(out, "#define HAS_{} 1", attribute.define_name());
        }
        for kind in LightKind::ALL {
            let _ = writeln!(
                out,
                "#define {} {}",
                light_count_define(kind),
                self.lights.get(kind)
            );
        }
        for texture in self.textures.iter().filter(|t| t.bound) {
            let _ = writeln!(out, "#define HAS_TEXTURE_{} 1", identifier(&texture.name).to_uppercase());
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "layout(std140, binding = {}) uniform FrameDetails {{\n    mat4 view;\n    mat4 projection;\n    mat4 view_projection;\n    vec4 camera_position;\n    uvec4 light_counts;\n}} u_frame;",
            bindings.frame_details
        );

        if let Some(slot) = bindings.lights {
            for kind in LightKind::ALL {
                if self.lights.get(kind) > 0 {
                    out.push_str(light_struct(kind));
                }
            }
            let _ = writeln!(out, "layout(std140, binding = {slot}) uniform LightSources {{");
            for kind in LightKind::ALL {
                if self.lights.get(kind) > 0 {
                    let (ty, array) = light_array(kind);
                    let _ = writeln!(out, "    {ty} {array}[{}];", light_count_define(kind));
                }
            }
            let _ = writeln!(out, "}} u_lights;");
        }

        for (block, slot) in self.blocks.iter().zip(&bindings.blocks) {
            let name = identifier(&block.name);
            let _ = writeln!(out, "layout(std140, binding = {slot}) uniform Material_{name} {{");
            for (member, ty) in &block.members {
                let _ = writeln!(out, "    {} {};", ty.glsl_type(), identifier(member));
            }
            let _ = writeln!(out, "}} u_{name};");
        }

        for (texture, slot) in self.textures.iter().zip(&bindings.textures) {
            if let Some(slot) = slot {
                let _ = writeln!(
                    out,
                    "layout(binding = {slot}) uniform sampler2D t_{};",
                    identifier(&texture.name)
                );
            }
        }
        out
    }
}

/// Where each resource of a variant is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSlots {
    /// The frame details block.
    pub frame_details: u32,
    /// The light block, when any light is active and the material is lit.
    pub lights: Option<u32>,
    /// One slot per material parameter block.
    pub blocks: Vec<u32>,
    /// One entry per material texture slot, `None` when unbound.
    pub textures: Vec<Option<u32>>,
    /// First shader location of the instance model matrix.
    pub instance_location: u32,
}

/// A generated variant ready for compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariant {
    /// Content id of both sources.
    pub id: AssetId,
    /// Vertex stage source.
    pub vertex: String,
    /// Fragment stage source.
    pub fragment: String,
    /// Binding slot maps.
    pub bindings: BindingSlots,
}

fn glsl_vertex_type(attribute: VertexAttribute) -> &'static str {
    match attribute.format().components() {
        2 => "vec2",
        3 => "vec3",
        _ => "vec4",
    }
}

fn light_count_define(kind: LightKind) -> &'static str {
    match kind {
        LightKind::Directional => "NUM_DIRECTIONAL_LIGHTS",
        LightKind::Point => "NUM_POINT_LIGHTS",
        LightKind::Spot => "NUM_SPOT_LIGHTS",
    }
}

fn light_array(kind: LightKind) -> (&'static str, &'static str) {
    match kind {
        LightKind::Directional => ("DirectionalLight", "directional_lights"),
        LightKind::Point => ("PointLight", "point_lights"),
        LightKind::Spot => ("SpotLight", "spot_lights"),
    }
}

// Must match the records packed by the light aggregator.
fn light_struct(kind: LightKind) -> &'static str {
    match kind {
        LightKind::Directional => {
            "struct DirectionalLight {\n    vec4 direction;\n    vec4 color;\n};\n"
        }
        LightKind::Point => "struct PointLight {\n    vec4 position_range;\n    vec4 color;\n};\n",
        LightKind::Spot => {
            "struct SpotLight {\n    vec4 position_range;\n    vec4 direction;\n    vec4 color;\n    vec4 cone;\n};\n"
        }
    }
}

fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
