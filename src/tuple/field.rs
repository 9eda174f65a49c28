//! Field types and values.

use std::fmt;

use crate::common::config::STRING_LEN;

/// Type of a tuple field.
///
/// Every type has a fixed serialized width so that tuples of a given schema
/// all occupy the same number of bytes in a page slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer, 4 bytes big-endian.
    Int,
    /// String: 4-byte big-endian length followed by `STRING_LEN` bytes.
    Str,
}

impl Type {
    /// Serialized width of a value of this type.
    pub const fn byte_len(self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str => 4 + STRING_LEN,
        }
    }

    /// Decode a value of this type from the front of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes.len() < self.byte_len()`.
    pub fn parse(self, bytes: &[u8]) -> Field {
        match self {
            Type::Int => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&bytes[..4]);
                Field::Int(i32::from_be_bytes(raw))
            }
            Type::Str => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&bytes[..4]);
                let len = (u32::from_be_bytes(raw) as usize).min(STRING_LEN);
                Field::Str(String::from_utf8_lossy(&bytes[4..4 + len]).into_owned())
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Str => write!(f, "STRING"),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    /// The type of this value.
    pub fn field_type(&self) -> Type {
        match self {
            Field::Int(_) => Type::Int,
            Field::Str(_) => Type::Str,
        }
    }

    /// Encode into the front of `out`, which must be at least
    /// `self.field_type().byte_len()` bytes long.
    ///
    /// Strings longer than `STRING_LEN` bytes are truncated at a char
    /// boundary.
    pub fn serialize_into(&self, out: &mut [u8]) {
        match self {
            Field::Int(v) => out[..4].copy_from_slice(&v.to_be_bytes()),
            Field::Str(s) => {
                let mut len = s.len().min(STRING_LEN);
                while !s.is_char_boundary(len) {
                    len -= 1;
                }
                out[..4].copy_from_slice(&(len as u32).to_be_bytes());
                out[4..4 + len].copy_from_slice(&s.as_bytes()[..len]);
                out[4 + len..4 + STRING_LEN].fill(0);
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Str(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Str(s)
    }
}
