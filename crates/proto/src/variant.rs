//! Variant list codec for `CallFunction` game packets.
//!
//! A variant list is the argument pack of a server-to-client RPC. The blob
//! starts with an argument count, then each argument carries its own index
//! and type tag. Argument 0 is the function name by convention.

use crate::bytestream::{ByteReader, ByteWriter};
use glam::{Vec2, Vec3};

const TYPE_FLOAT: u8 = 1;
const TYPE_STR: u8 = 2;
const TYPE_VEC2: u8 = 3;
const TYPE_VEC3: u8 = 4;
const TYPE_UNSIGNED: u8 = 5;
const TYPE_SIGNED: u8 = 9;

/// A single variant argument.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    /// 32-bit float.
    Float(f32),
    /// Length-prefixed string.
    Str(String),
    /// Two-component vector.
    Vec2(Vec2),
    /// Three-component vector.
    Vec3(Vec3),
    /// Unsigned 32-bit integer.
    Unsigned(u32),
    /// Signed 32-bit integer.
    Signed(i32),
}

impl From<f32> for VariantValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for VariantValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for VariantValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec2> for VariantValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec3> for VariantValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<u32> for VariantValue {
    fn from(value: u32) -> Self {
        Self::Unsigned(value)
    }
}

impl From<i32> for VariantValue {
    fn from(value: i32) -> Self {
        Self::Signed(value)
    }
}

/// An ordered variant argument list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketVariant {
    args: Vec<VariantValue>,
}

impl PacketVariant {
    /// Empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from already-typed arguments.
    pub fn from_values(args: Vec<VariantValue>) -> Self {
        Self { args }
    }

    /// Append an argument.
    pub fn push(&mut self, value: impl Into<VariantValue>) {
        self.args.push(value.into());
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Argument at `index`.
    pub fn get(&self, index: usize) -> Option<&VariantValue> {
        self.args.get(index)
    }

    /// String argument at `index`.
    pub fn get_str(&self, index: usize) -> Option<&str> {
        match self.get(index)? {
            VariantValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Signed integer at `index`. Unsigned arguments are reinterpreted, the
    /// client is not consistent about which tag it emits.
    pub fn get_i32(&self, index: usize) -> Option<i32> {
        match self.get(index)? {
            VariantValue::Signed(value) => Some(*value),
            VariantValue::Unsigned(value) => Some(*value as i32),
            _ => None,
        }
    }

    /// Unsigned integer at `index`, reinterpreting signed arguments.
    pub fn get_u32(&self, index: usize) -> Option<u32> {
        match self.get(index)? {
            VariantValue::Unsigned(value) => Some(*value),
            VariantValue::Signed(value) => Some(*value as u32),
            _ => None,
        }
    }

    /// Float argument at `index`.
    pub fn get_f32(&self, index: usize) -> Option<f32> {
        match self.get(index)? {
            VariantValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Vector argument at `index`.
    pub fn get_vec2(&self, index: usize) -> Option<Vec2> {
        match self.get(index)? {
            VariantValue::Vec2(value) => Some(*value),
            _ => None,
        }
    }

    /// Vector argument at `index`.
    pub fn get_vec3(&self, index: usize) -> Option<Vec3> {
        match self.get(index)? {
            VariantValue::Vec3(value) => Some(*value),
            _ => None,
        }
    }

    /// The RPC function name, argument 0.
    pub fn function_name(&self) -> Option<&str> {
        self.get_str(0)
    }

    /// Decode an argument list, `None` on any malformed argument.
    ///
    /// Arguments must be indexed sequentially from zero. Bytes past the
    /// declared count are ignored.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        let mut reader = ByteReader::new(data);
        let count = reader.read_u8()?;

        let mut args = Vec::with_capacity(count as usize);
        for expected in 0..count {
            let index = reader.read_u8()?;
            if index != expected {
                return None;
            }

            let value = match reader.read_u8()? {
                TYPE_FLOAT => VariantValue::Float(reader.read_f32()?),
                TYPE_STR => VariantValue::Str(reader.read_string_u32()?),
                TYPE_VEC2 => {
                    VariantValue::Vec2(Vec2::new(reader.read_f32()?, reader.read_f32()?))
                }
                TYPE_VEC3 => VariantValue::Vec3(Vec3::new(
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                )),
                TYPE_UNSIGNED => VariantValue::Unsigned(reader.read_u32()?),
                TYPE_SIGNED => VariantValue::Signed(reader.read_i32()?),
                _ => return None,
            };
            args.push(value);
        }

        Some(Self { args })
    }

    /// Encode the argument list.
    pub fn serialize(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_u8(self.args.len() as u8);

        for (index, value) in self.args.iter().enumerate() {
            writer.write_u8(index as u8);
            match value {
                VariantValue::Float(v) => {
                    writer.write_u8(TYPE_FLOAT);
                    writer.write_f32(*v);
                }
                VariantValue::Str(v) => {
                    writer.write_u8(TYPE_STR);
                    writer.write_string_u32(v);
                }
                VariantValue::Vec2(v) => {
                    writer.write_u8(TYPE_VEC2);
                    writer.write_f32(v.x);
                    writer.write_f32(v.y);
                }
                VariantValue::Vec3(v) => {
                    writer.write_u8(TYPE_VEC3);
                    writer.write_f32(v.x);
                    writer.write_f32(v.y);
                    writer.write_f32(v.z);
                }
                VariantValue::Unsigned(v) => {
                    writer.write_u8(TYPE_UNSIGNED);
                    writer.write_u32(*v);
                }
                VariantValue::Signed(v) => {
                    writer.write_u8(TYPE_SIGNED);
                    writer.write_i32(*v);
                }
            }
        }

        writer.into_inner()
    }
}
