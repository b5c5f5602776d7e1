//! Typed wrappers around the signed value-type tags used pervasively by
//! section entries and operator immediates (`form`, `contentType`,
//! `elementType`, block types, params/returns).
//!
//! Grounded in the teacher's `PwasmCompat` conversion trait
//! (`parity_wasm::elements::ValueType` <-> `wasmi_core::ValueType`): a small
//! closed enum with fallible conversion from the raw encoded tag, rather than
//! passing `i8`/`i32` everywhere.

use core::fmt;

/// One of the four Wasm MVP value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    /// Decodes a value type from its signed LEB128 encoding
    /// (`-0x01`, `-0x02`, `-0x03`, `-0x04`).
    pub fn from_tag(tag: i64) -> Result<Self, UnknownValueType> {
        match tag {
            -0x01 => Ok(ValueType::I32),
            -0x02 => Ok(ValueType::I64),
            -0x03 => Ok(ValueType::F32),
            -0x04 => Ok(ValueType::F64),
            other => Err(UnknownValueType(other)),
        }
    }

    /// Encodes the value type back to its signed LEB128 tag.
    pub fn to_tag(self) -> i64 {
        match self {
            ValueType::I32 => -0x01,
            ValueType::I64 => -0x02,
            ValueType::F32 => -0x03,
            ValueType::F64 => -0x04,
        }
    }

    /// The `.wat` mnemonic for this type (`i32`, `i64`, `f32`, `f64`).
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a section entry carries a value-type tag outside the MVP set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownValueType(pub i64);

impl fmt::Display for UnknownValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value type tag {}", self.0)
    }
}

/// A `block`/`loop`/`if` signature: either a single result type or the
/// `empty_block_type` (`0x40`) sentinel meaning "no result".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Value(ValueType),
}

impl BlockType {
    pub const EMPTY_TAG: i64 = -0x40;

    pub fn from_tag(tag: i64) -> Result<Self, UnknownValueType> {
        if tag == Self::EMPTY_TAG {
            Ok(BlockType::Empty)
        } else {
            ValueType::from_tag(tag).map(BlockType::Value)
        }
    }

    pub fn to_tag(self) -> i64 {
        match self {
            BlockType::Empty => Self::EMPTY_TAG,
            BlockType::Value(ty) => ty.to_tag(),
        }
    }
}

/// A table's element type. The MVP defines exactly one (`anyfunc`, signed
/// tag `-0x10`) — a distinct tag space from [`ValueType`], which only
/// covers `-0x01..-0x04`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    AnyFunc,
}

impl ElementType {
    pub const ANY_FUNC_TAG: i64 = -0x10;

    pub fn from_tag(tag: i64) -> Result<Self, UnknownValueType> {
        match tag {
            Self::ANY_FUNC_TAG => Ok(ElementType::AnyFunc),
            other => Err(UnknownValueType(other)),
        }
    }

    pub fn to_tag(self) -> i64 {
        match self {
            ElementType::AnyFunc => Self::ANY_FUNC_TAG,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::AnyFunc => "anyfunc",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
