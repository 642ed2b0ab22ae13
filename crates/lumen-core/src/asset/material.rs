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

use super::{AssetError, AssetId};
use crate::math::{LinearRgba, Mat4, Vec3};

/// The type of a material parameter as seen by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `vec4` holding a linear color.
    Color,
    /// `mat4`
    Mat4,
}

impl ParameterType {
    /// Size of the value in bytes.
    pub const fn size(self) -> u64 {
        match self {
            ParameterType::Float | ParameterType::Int => 4,
            ParameterType::Vec2 => 8,
            ParameterType::Vec3 => 12,
            ParameterType::Vec4 | ParameterType::Color => 16,
            ParameterType::Mat4 => 64,
        }
    }

    /// Required offset alignment inside a uniform block.
    pub const fn alignment(self) -> u64 {
        match self {
            ParameterType::Float | ParameterType::Int => 4,
            ParameterType::Vec2 => 8,
            ParameterType::Vec3 | ParameterType::Vec4 | ParameterType::Color | ParameterType::Mat4 => 16,
        }
    }

    /// The GLSL type name.
    pub const fn glsl_type(self) -> &'static str {
        match self {
            ParameterType::Float => "float",
            ParameterType::Int => "int",
            ParameterType::Vec2 => "vec2",
            ParameterType::Vec3 => "vec3",
            ParameterType::Vec4 | ParameterType::Color => "vec4",
            ParameterType::Mat4 => "mat4",
        }
    }
}

/// A typed material parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    /// A scalar float.
    Float(f32),
    /// A scalar integer.
    Int(i32),
    /// Two floats.
    Vec2([f32; 2]),
    /// Three floats.
    Vec3(Vec3),
    /// Four floats.
    Vec4([f32; 4]),
    /// A linear color.
    Color(LinearRgba),
    /// A column-major matrix.
    Mat4(Mat4),
}

impl ParameterValue {
    /// The value's type.
    pub fn ty(&self) -> ParameterType {
        match self {
            ParameterValue::Float(_) => ParameterType::Float,
            ParameterValue::Int(_) => ParameterType::Int,
            ParameterValue::Vec2(_) => ParameterType::Vec2,
            ParameterValue::Vec3(_) => ParameterType::Vec3,
            ParameterValue::Vec4(_) => ParameterType::Vec4,
            ParameterValue::Color(_) => ParameterType::Color,
            ParameterValue::Mat4(_) => ParameterType::Mat4,
        }
    }

    /// The value's raw bytes, exactly [`ParameterType::size`] long.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            ParameterValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Vec2(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Vec3(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Vec4(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Color(v) => bytemuck::bytes_of(v).to_vec(),
            ParameterValue::Mat4(v) => bytemuck::bytes_of(v).to_vec(),
        }
    }
}

/// A named parameter inside a [`ParameterBlock`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name used as the uniform member name.
    pub name: String,
    /// Current value.
    pub value: ParameterValue,
}

/// An ordered group of parameters uploaded as one uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    /// Block name, used for the uniform block declaration.
    pub name: String,
    parameters: Vec<Parameter>,
}

impl ParameterBlock {
    /// Creates an empty block.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn with(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            value,
        });
        self
    }

    /// The parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Looks up a parameter value by name.
    pub fn get(&self, name: &str) -> Option<ParameterValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }

    fn set(&mut self, name: &str, value: ParameterValue) -> Result<(), AssetError> {
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| AssetError::UnknownParameter {
                block: self.name.clone(),
                name: name.to_string(),
            })?;
        if parameter.value.ty() != value.ty() {
            return Err(AssetError::ParameterTypeMismatch {
                name: name.to_string(),
            });
        }
        parameter.value = value;
        Ok(())
    }
}

/// A named texture binding of a material. `None` leaves the slot unbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    /// Slot name, used for the sampler declaration and `HAS_TEXTURE_<NAME>`.
    pub name: String,
    /// The bound texture, if any.
    pub texture: Option<AssetId>,
}

/// The shader bodies a material contributes.
///
/// The renderer prepends a generated preamble (version header, defines and
/// binding declarations) to each body before compiling a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    /// Vertex stage body.
    pub vertex: String,
    /// Fragment stage body.
    pub fragment: String,
}

impl Default for ShaderTemplate {
    fn default() -> Self {
        Self {
            vertex: concat!(
                "void main() {\n",
                "    vec4 world = i_model * vec4(a_position, 1.0);\n",
                "    gl_Position = u_frame.view_projection * world;\n",
                "}\n"
            )
            .to_string(),
            fragment: concat!(
                "layout(location = 0) out vec4 o_color;\n",
                "void main() {\n",
                "    o_color = vec4(1.0);\n",
                "}\n"
            )
            .to_string(),
        }
    }
}

/// Surface description of a renderable: parameter blocks, texture slots and shader bodies.
///
/// Parameter edits set `params_dirty`; texture slot edits set `textures_dirty`.
/// The renderer re-uploads or re-resolves on the flag and clears it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Debug label.
    pub label: String,
    blocks: Vec<ParameterBlock>,
    textures: Vec<TextureSlot>,
    template: ShaderTemplate,
    lit: bool,
    params_dirty: bool,
    textures_dirty: bool,
}

impl Material {
    /// Creates a material with no blocks and no texture slots.
    pub fn new(label: impl Into<String>, template: ShaderTemplate) -> Self {
        Self {
            label: label.into(),
            blocks: Vec::new(),
            textures: Vec::new(),
            template,
            lit: false,
            params_dirty: false,
            textures_dirty: false,
        }
    }

    /// Appends a parameter block.
    pub fn with_block(mut self, block: ParameterBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Appends a texture slot.
    pub fn with_texture_slot(mut self, name: impl Into<String>, texture: Option<AssetId>) -> Self {
        self.textures.push(TextureSlot {
            name: name.into(),
            texture,
        });
        self
    }

    /// Marks the material as reading light data.
    pub fn with_lighting(mut self, lit: bool) -> Self {
        self.lit = lit;
        self
    }

    /// Updates one parameter and marks parameters dirty.
    pub fn set_parameter(
        &mut self,
        block: &str,
        name: &str,
        value: ParameterValue,
    ) -> Result<(), AssetError> {
        let target = self
            .blocks
            .iter_mut()
            .find(|b| b.name == block)
            .ok_or_else(|| AssetError::UnknownParameter {
                block: block.to_string(),
                name: name.to_string(),
            })?;
        target.set(name, value)?;
        self.params_dirty = true;
        Ok(())
    }

    /// Binds or clears a texture slot and marks textures dirty.
    pub fn set_texture(&mut self, slot: &str, texture: Option<AssetId>) -> Result<(), AssetError> {
        let target = self
            .textures
            .iter_mut()
            .find(|s| s.name == slot)
            .ok_or_else(|| AssetError::UnknownTextureSlot(slot.to_string()))?;
        target.texture = texture;
        self.textures_dirty = true;
        Ok(())
    }

    /// The parameter blocks in declaration order.
    pub fn blocks(&self) -> &[ParameterBlock] {
        &self.blocks
    }

    /// The texture slots in declaration order.
    pub fn texture_slots(&self) -> &[TextureSlot] {
        &self.textures
    }

    /// The shader bodies.
    pub fn template(&self) -> &ShaderTemplate {
        &self.template
    }

    /// Whether the material reads light data.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Whether parameters changed since the renderer last uploaded them.
    pub fn params_dirty(&self) -> bool {
        self.params_dirty
    }

    /// Whether texture slots changed since the renderer last resolved them.
    pub fn textures_dirty(&self) -> bool {
        self.textures_dirty
    }

    /// Clears both dirty flags.
    pub fn clear_dirty(&mut self) {
        self.params_dirty = false;
        self.textures_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> Material {
        Material::new("standard", ShaderTemplate::default())
            .with_block(
                ParameterBlock::new("surface")
                    .with("base_color", ParameterValue::Color(LinearRgba::WHITE))
                    .with("roughness", ParameterValue::Float(0.5)),
            )
            .with_texture_slot("albedo", None)
    }

    #[test]
    fn set_parameter_marks_params_dirty_only() {
        let mut m = material();
        m.set_parameter("surface", "roughness", ParameterValue::Float(0.9))
            .unwrap();
        assert!(m.params_dirty());
        assert!(!m.textures_dirty());
        assert_eq!(
            m.blocks()[0].get("roughness"),
            Some(ParameterValue::Float(0.9))
        );
    }

    #[test]
    fn set_parameter_rejects_type_change() {
        let mut m = material();
        let err = m
            .set_parameter("surface", "roughness", ParameterValue::Int(1))
            .unwrap_err();
        assert_eq!(
            err,
            AssetError::ParameterTypeMismatch {
                name: "roughness".to_string()
            }
        );
        assert!(!m.params_dirty());
    }

    #[test]
    fn set_texture_marks_textures_dirty() {
        let mut m = material();
        let tex = AssetId::new();
        m.set_texture("albedo", Some(tex)).unwrap();
        assert!(m.textures_dirty());
        assert_eq!(m.texture_slots()[0].texture, Some(tex));
        assert!(m.set_texture("normal", None).is_err());
        m.clear_dirty();
        assert!(!m.textures_dirty());
    }

    #[test]
    fn value_bytes_match_type_size() {
        let values = [
            ParameterValue::Float(1.0),
            ParameterValue::Vec3(Vec3::ONE),
            ParameterValue::Color(LinearRgba::BLACK),
            ParameterValue::Mat4(Mat4::IDENTITY),
        ];
        for value in values {
            assert_eq!(value.bytes().len() as u64, value.ty().size());
        }
    }
}
