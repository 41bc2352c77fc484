//! Field values exchanged with records, and the coercions applied on write.

use std::fmt;

use crate::errors::{Error, Result};

/// A value read from or written to a record field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Raw bytes of a char, text or rest field.
    Bytes(Vec<u8>),
    /// No value: the pad placeholder, or "use the zero value" on write.
    #[default]
    Empty,
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Unsigned(v) => Some(v),
            Value::Signed(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Signed(v) => Some(v),
            Value::Unsigned(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The bytes of a char/text/rest value, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Coerces to an integer wide enough to hold any `u64` or `i64`.
    ///
    /// Floats are truncated toward zero and byte strings are parsed as
    /// decimal text. `Empty` is zero.
    pub(crate) fn to_integer(&self) -> Result<i128> {
        match self {
            Value::Unsigned(v) => Ok(i128::from(*v)),
            Value::Signed(v) => Ok(i128::from(*v)),
            Value::Float(f) if f.is_finite() => Ok(f.trunc() as i128),
            Value::Float(f) => Err(Error::argument(format!(
                "cannot convert {f} into an integer"
            ))),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse::<i128>().ok())
                .ok_or_else(|| {
                    Error::argument(format!(
                        "invalid value for integer: \"{}\"",
                        b.escape_ascii()
                    ))
                }),
            Value::Empty => Ok(0),
        }
    }

    pub(crate) fn to_float(&self) -> Result<f64> {
        match self {
            Value::Unsigned(v) => Ok(*v as f64),
            Value::Signed(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .ok_or_else(|| {
                    Error::argument(format!("invalid value for float: \"{}\"", b.escape_ascii()))
                }),
            Value::Empty => Ok(0.0),
        }
    }

    /// Renders the value as the raw bytes of a char/text/rest block.
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        match self {
            Value::Bytes(b) => b,
            Value::Unsigned(v) => v.to_string().into_bytes(),
            Value::Signed(v) => v.to_string().into_bytes(),
            Value::Float(v) => v.to_string().into_bytes(),
            Value::Empty => Vec::new(),
        }
    }
}

/// Reduces `value` modulo `2^bits` (two's complement for negative input).
pub(crate) fn truncate(value: i128, bits: usize) -> u64 {
    let mask = if bits >= 64 {
        u128::from(u64::MAX)
    } else {
        (1u128 << bits) - 1
    };
    (value as u128 & mask) as u64
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Bytes(b) => write!(f, "\"{}\"", b.escape_ascii()),
            Value::Empty => f.write_str("nil"),
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Unsigned(u64::from(v))
                }
            }
        )*
    };
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Signed(i64::from(v))
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u16, u32, u64);
impl_from_signed!(i8, i16, i32, i64);

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Unsigned(v as u64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Signed(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Bytes(v.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(v: &[u8; N]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Empty, Into::into)
    }
}
