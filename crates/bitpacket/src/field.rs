//! Declarations of the fields that make up a [crate::schema::Schema].

use crate::{
    bits::{Endian, sign_extend},
    errors::{Error, Result},
    schema::{SchemaBuilder, Scope},
    value::{Value, truncate},
};

/// A single field declaration: name, bit length, default value and kind.
///
/// Scalar kinds are created with their length up front; composite and array
/// fields start empty and receive sub-fields with [`FieldSpec::add_field`]
/// or [`FieldSpec::with_field`].
///
/// ```
/// use bitpacket::{Endian, FieldSpec};
///
/// let seq = FieldSpec::unsigned("seq", 14).default(7).description("sequence count");
/// let temps = FieldSpec::array("temps", 4)
///     .with_field(FieldSpec::signed("", 16).endian(Endian::Little))
///     .unwrap();
/// assert_eq!(seq.bit_length(), 14);
/// assert_eq!(temps.bit_length(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: Option<String>,
    pub(crate) bits: usize,
    pub(crate) description: String,
    pub(crate) default: Value,
    pub(crate) unique: bool,
    pub(crate) kind: FieldKind,
}

/// The closed set of field kinds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Unsigned integer, stored modulo `2^bits`.
    Unsigned { endian: Endian },
    /// Two's-complement signed integer.
    Signed { endian: Endian },
    /// IEEE 754 float of 32 or 64 bits.
    Float { endian: Endian },
    /// Fixed byte block, null filled, read back verbatim.
    Char,
    /// Fixed byte block, space filled, trailing padding stripped on parse.
    Text,
    /// Reserved bits without a value.
    Pad,
    /// Variable-length remainder of the buffer.
    Rest,
    /// A nested set of fields.
    Composite(SchemaBuilder),
    /// One sub-field repeated `len` times.
    Array { len: usize, element: SchemaBuilder },
}

impl FieldKind {
    /// Display name of the kind, as used in field descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Unsigned { .. } => "Unsigned",
            FieldKind::Signed { .. } => "Signed",
            FieldKind::Float { .. } => "Float",
            FieldKind::Char => "Char",
            FieldKind::Text => "Text",
            FieldKind::Pad => "Pad",
            FieldKind::Rest => "Rest",
            FieldKind::Composite(_) => "Composite",
            FieldKind::Array { .. } => "Array",
        }
    }
}

fn named(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}

impl FieldSpec {
    fn new(name: &str, bits: usize, kind: FieldKind) -> Self {
        FieldSpec {
            name: named(name),
            bits,
            description: String::new(),
            default: Value::Empty,
            unique: true,
            kind,
        }
    }

    /// Unsigned integer of `bits` bits, big endian unless changed.
    pub fn unsigned(name: &str, bits: usize) -> Self {
        Self::new(name, bits, FieldKind::Unsigned { endian: Endian::Big })
    }

    /// Two's-complement signed integer of `bits` bits.
    pub fn signed(name: &str, bits: usize) -> Self {
        Self::new(name, bits, FieldKind::Signed { endian: Endian::Big })
    }

    /// IEEE 754 float; `bits` must be 32 or 64.
    pub fn float(name: &str, bits: usize) -> Self {
        Self::new(name, bits, FieldKind::Float { endian: Endian::Big })
    }

    /// Fixed block of `bits / 8` bytes, null padded.
    pub fn char(name: &str, bits: usize) -> Self {
        Self::new(name, bits, FieldKind::Char)
    }

    /// Fixed block of `bits / 8` bytes, space padded and trimmed on parse.
    pub fn text(name: &str, bits: usize) -> Self {
        Self::new(name, bits, FieldKind::Text)
    }

    /// Padding has no name and may appear any number of times.
    pub fn pad(bits: usize) -> Self {
        let mut spec = Self::new("", bits, FieldKind::Pad);
        spec.unique = false;
        spec
    }

    /// Trailing variable-length bytes. Must be the last field of a record.
    pub fn rest(name: &str) -> Self {
        Self::new(name, 0, FieldKind::Rest)
    }

    /// A group of named sub-fields, added afterwards.
    pub fn composite(name: &str) -> Self {
        Self::new(name, 0, FieldKind::Composite(SchemaBuilder::scoped(name, Scope::Composite)))
    }

    /// An array of `len` elements; its single sub-field is added afterwards.
    pub fn array(name: &str, len: usize) -> Self {
        Self::new(
            name,
            0,
            FieldKind::Array {
                len,
                element: SchemaBuilder::scoped(name, Scope::Array),
            },
        )
    }

    /// Sets the byte order. Only meaningful for integer and float fields.
    pub fn endian(mut self, order: Endian) -> Self {
        match &mut self.kind {
            FieldKind::Unsigned { endian }
            | FieldKind::Signed { endian }
            | FieldKind::Float { endian } => *endian = order,
            _ => {}
        }
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Whether the name must be unique within the enclosing schema.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Adds a sub-field to a composite or array field.
    pub fn add_field(&mut self, field: FieldSpec) -> Result<&mut Self> {
        match &mut self.kind {
            FieldKind::Composite(inner) | FieldKind::Array { element: inner, .. } => {
                inner.add_field(field)?;
                Ok(self)
            }
            kind => Err(Error::schema(format!(
                "{} field '{}' cannot hold sub-fields",
                kind.name(),
                self.name.as_deref().unwrap_or_default()
            ))),
        }
    }

    /// Builder-style [`FieldSpec::add_field`].
    pub fn with_field(mut self, field: FieldSpec) -> Result<Self> {
        self.add_field(field)?;
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Length in bits. Composite and array fields report the length of the
    /// sub-fields added so far; rest fields report zero.
    pub fn bit_length(&self) -> usize {
        match &self.kind {
            FieldKind::Composite(inner) => inner.bit_length(),
            FieldKind::Array { len, element } => len.saturating_mul(element.bit_length()),
            _ => self.bits,
        }
    }

    pub fn description_text(&self) -> &str {
        &self.description
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Number of elements of an array field.
    pub fn array_length(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Array { len, .. } => Some(len),
            _ => None,
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("'{}'", self.name.as_deref().unwrap_or_default())
    }

    /// Validates the declared lengths that do not depend on placement.
    pub(crate) fn check_length(&self) -> Result<()> {
        match &self.kind {
            FieldKind::Rest | FieldKind::Composite(_) => Ok(()),
            FieldKind::Array { len: 0, .. } => Err(Error::argument(
                "array length must be greater than zero '0'",
            )),
            FieldKind::Array { len, element } => match len.checked_mul(element.bit_length()) {
                Some(_) => Ok(()),
                None => Err(Error::argument(format!("array length is too large '{len}'"))),
            },
            _ if self.bits == 0 => Err(Error::argument("length must be greater than zero '0'")),
            FieldKind::Unsigned { .. } | FieldKind::Signed { .. } if self.bits > 64 => {
                Err(Error::argument(format!(
                    "integer fields are limited to 64 bits '{}'",
                    self.bits
                )))
            }
            _ => Ok(()),
        }
    }

    /// Converts `value` into the form stored by this kind, truncating
    /// integers to the field width and blocks to the field's byte length.
    pub(crate) fn coerce(&self, value: Value) -> Result<Value> {
        Ok(match &self.kind {
            FieldKind::Unsigned { .. } => {
                Value::Unsigned(truncate(value.to_integer()?, self.bits))
            }
            FieldKind::Signed { .. } => Value::Signed(sign_extend(
                truncate(value.to_integer()?, self.bits),
                self.bits,
            )),
            FieldKind::Float { .. } if self.bits == 32 => {
                Value::Float(f64::from(value.to_float()? as f32))
            }
            FieldKind::Float { .. } => Value::Float(value.to_float()?),
            FieldKind::Char | FieldKind::Text => {
                let mut bytes = value.into_bytes();
                bytes.truncate(self.bits / 8);
                Value::Bytes(bytes)
            }
            FieldKind::Rest => Value::Bytes(value.into_bytes()),
            FieldKind::Pad | FieldKind::Composite(_) | FieldKind::Array { .. } => Value::Empty,
        })
    }
}
