//! Compiled field accessors.
//!
//! Adding a [`FieldSpec`] to a schema compiles it, at the schema's current
//! bit offset and slot index, into an [`Accessor`] (how to get and set the
//! field inside a record's slot values) and a [`Contribution`] to the slot
//! layout.

use std::sync::Arc;

use crate::{
    bits::{self, Endian, sign_extend},
    errors::{Error, Result},
    field::{FieldKind, FieldSpec},
    schema::Schema,
    slot::{Slot, SlotValue},
    value::{Value, truncate},
    view::OffsetView,
};

/// Widths that map onto a native integer slot.
const NATIVE_INT_BITS: [usize; 4] = [8, 16, 32, 64];

/// Where the next field lands in the schema being built.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor {
    /// Running bit offset from the start of the schema.
    pub offset: usize,
    /// Index of the slot the field starts in.
    pub slot: usize,
    /// Bits already used in the open bit-string slot, if any.
    pub open_bits: Option<usize>,
}

/// What a compiled field adds to the slot layout.
#[derive(Debug, Clone)]
pub(crate) enum Contribution {
    /// Whole slots, appended in order.
    Slots(Vec<Slot>),
    /// Bits merged into the open bit-string slot.
    Bits(usize),
    /// The trailing variable-length slot.
    Rest,
}

/// Get/set logic for one field, bound to slot indices relative to the
/// schema's base.
#[derive(Debug, Clone)]
pub(crate) enum Accessor {
    Int { slot: usize, bits: usize, signed: bool },
    Float { slot: usize },
    Block { slot: usize },
    Packed { slot: usize, offset: usize, bits: usize, endian: Endian, signed: bool },
    Composite { slot: usize, schema: Arc<Schema> },
    Array { slot: usize, len: usize, stride: usize, element: Arc<Schema> },
    Rest { slot: usize },
    Pad,
}

fn aligned(what: &str, cursor: &Cursor) -> Result<()> {
    if cursor.offset % 8 != 0 {
        return Err(Error::alignment(format!("{what} values must be byte aligned")));
    }
    Ok(())
}

fn whole_bytes(what: &str, bits: usize) -> Result<()> {
    if bits % 8 != 0 {
        return Err(Error::alignment(format!(
            "{what} values must have integer byte length"
        )));
    }
    Ok(())
}

fn integer(spec: &FieldSpec, endian: Endian, signed: bool, cursor: &Cursor) -> (Accessor, Contribution) {
    if cursor.offset % 8 == 0 && NATIVE_INT_BITS.contains(&spec.bits) {
        let slot = Slot::Int {
            bytes: spec.bits / 8,
            endian: endian.resolve(),
        };
        let accessor = Accessor::Int {
            slot: cursor.slot,
            bits: spec.bits,
            signed,
        };
        return (accessor, Contribution::Slots(vec![slot]));
    }

    let accessor = Accessor::Packed {
        slot: cursor.slot,
        offset: cursor.open_bits.unwrap_or(0),
        bits: spec.bits,
        endian,
        signed,
    };
    (accessor, Contribution::Bits(spec.bits))
}

/// Compiles `spec` at `cursor`. Composite and array sub-schemas are closed
/// as a side effect.
pub(crate) fn compile(spec: &mut FieldSpec, cursor: &Cursor) -> Result<(Accessor, Contribution)> {
    spec.check_length()?;
    let bits = spec.bits;

    match &mut spec.kind {
        FieldKind::Unsigned { endian } | FieldKind::Signed { endian } => {
            let endian = *endian;
            let signed = matches!(spec.kind, FieldKind::Signed { .. });
            if endian == Endian::Little {
                aligned("little endian", cursor)?;
                whole_bytes("little endian", bits)?;
            }
            Ok(integer(spec, endian, signed, cursor))
        }
        FieldKind::Float { endian } => {
            let endian = endian.resolve();
            aligned("float", cursor)?;
            if bits != 32 && bits != 64 {
                return Err(Error::alignment(format!(
                    "float values must be 32 or 64 bits in length '{bits}'"
                )));
            }
            let slot = Slot::Float {
                bytes: bits / 8,
                endian,
            };
            Ok((Accessor::Float { slot: cursor.slot }, Contribution::Slots(vec![slot])))
        }
        FieldKind::Char | FieldKind::Text => {
            let text = matches!(spec.kind, FieldKind::Text);
            let what = if text { "text" } else { "char" };
            aligned(what, cursor)?;
            whole_bytes(what, bits)?;
            let slot = Slot::Block {
                bytes: bits / 8,
                fill: if text { b' ' } else { 0 },
                trim: text,
            };
            Ok((Accessor::Block { slot: cursor.slot }, Contribution::Slots(vec![slot])))
        }
        FieldKind::Pad => {
            if cursor.offset % 8 == 0 && bits % 8 == 0 {
                let slot = Slot::Skip { bytes: bits / 8 };
                Ok((Accessor::Pad, Contribution::Slots(vec![slot])))
            } else {
                Ok((Accessor::Pad, Contribution::Bits(bits)))
            }
        }
        FieldKind::Rest => {
            if cursor.offset % 8 != 0 {
                return Err(Error::alignment(
                    "beginning the 'rest' field must fall on a byte boundary",
                ));
            }
            Ok((Accessor::Rest { slot: cursor.slot }, Contribution::Rest))
        }
        FieldKind::Composite(inner) => {
            let schema = inner.finish()?;
            if schema.bit_length() % 8 != 0 {
                return Err(Error::alignment(format!(
                    "composite field length does not fall on a byte boundary '{}'",
                    schema.bit_length()
                )));
            }
            if cursor.offset % 8 != 0 {
                return Err(Error::alignment("composite fields must be byte aligned"));
            }
            let slots = schema.slots().to_vec();
            Ok((
                Accessor::Composite {
                    slot: cursor.slot,
                    schema,
                },
                Contribution::Slots(slots),
            ))
        }
        FieldKind::Array { len, element } => {
            let len = *len;
            let element = element.finish()?;
            if element.fields().is_empty() {
                return Err(Error::schema(format!(
                    "array field {} has no sub-field",
                    spec.label()
                )));
            }
            if element.bit_length() % 8 != 0 {
                return Err(Error::alignment(format!(
                    "array sub-field length does not fall on a byte boundary '{}'",
                    element.bit_length()
                )));
            }
            if cursor.offset % 8 != 0 {
                return Err(Error::alignment("array values must be byte aligned"));
            }
            let stride = element.slots().len();
            let total_bits = len.checked_mul(element.bit_length());
            if stride.checked_mul(len).is_none() || total_bits.is_none() {
                return Err(Error::argument(format!("array length is too large '{len}'")));
            }
            let slots = element.slots().repeat(len);
            Ok((
                Accessor::Array {
                    slot: cursor.slot,
                    len,
                    stride,
                    element,
                },
                Contribution::Slots(slots),
            ))
        }
    }
}

fn int_slot(value: &SlotValue) -> Result<u64> {
    match value {
        SlotValue::Int(v) => Ok(*v),
        other => Err(Error::argument(format!("expected an integer slot, found {other:?}"))),
    }
}

fn bytes_slot(value: &SlotValue) -> Result<&[u8]> {
    match value {
        SlotValue::Bytes(b) => Ok(b),
        other => Err(Error::argument(format!("expected a byte slot, found {other:?}"))),
    }
}

fn bytes_slot_mut(value: &mut SlotValue) -> Result<&mut Vec<u8>> {
    match value {
        SlotValue::Bytes(b) => Ok(b),
        other => Err(Error::argument(format!("expected a byte slot, found {other:?}"))),
    }
}

fn integer_value(raw: u64, bits: usize, signed: bool) -> Value {
    if signed {
        Value::Signed(sign_extend(raw, bits))
    } else {
        Value::Unsigned(raw)
    }
}

impl Accessor {
    /// Reads a scalar field. Composite and array accessors have no scalar
    /// value and read as [`Value::Empty`].
    pub(crate) fn read<S: AsRef<[SlotValue]>>(&self, slots: &OffsetView<S>) -> Result<Value> {
        match *self {
            Accessor::Int { slot, bits, signed } => {
                Ok(integer_value(int_slot(slots.get(slot)?)?, bits, signed))
            }
            Accessor::Float { slot } => match slots.get(slot)? {
                SlotValue::Float(v) => Ok(Value::Float(*v)),
                other => Err(Error::argument(format!("expected a float slot, found {other:?}"))),
            },
            Accessor::Block { slot } | Accessor::Rest { slot } => {
                Ok(Value::Bytes(bytes_slot(slots.get(slot)?)?.to_vec()))
            }
            Accessor::Packed {
                slot,
                offset,
                bits,
                endian,
                signed,
            } => {
                let raw = bits::read_bits(bytes_slot(slots.get(slot)?)?, offset, bits, endian)?;
                Ok(integer_value(raw, bits, signed))
            }
            Accessor::Composite { .. } | Accessor::Array { .. } | Accessor::Pad => Ok(Value::Empty),
        }
    }

    /// Writes a value already coerced by [`FieldSpec::coerce`]. Writing to a
    /// composite or array resets every element to its default.
    pub(crate) fn write<S: AsMut<[SlotValue]>>(
        &self,
        slots: &mut OffsetView<S>,
        value: Value,
    ) -> Result<()> {
        match *self {
            Accessor::Int { slot, bits, .. } => {
                *slots.get_mut(slot)? = SlotValue::Int(truncate(value.to_integer()?, bits));
            }
            Accessor::Float { slot } => {
                *slots.get_mut(slot)? = SlotValue::Float(value.to_float()?);
            }
            Accessor::Block { slot } | Accessor::Rest { slot } => {
                *slots.get_mut(slot)? = SlotValue::Bytes(value.into_bytes());
            }
            Accessor::Packed {
                slot,
                offset,
                bits,
                endian,
                ..
            } => {
                let raw = truncate(value.to_integer()?, bits);
                bits::write_bits(bytes_slot_mut(slots.get_mut(slot)?)?, offset, bits, endian, raw)?;
            }
            Accessor::Composite { slot, ref schema } => {
                slots.copy_from(slot, schema.template())?;
            }
            Accessor::Array {
                slot,
                len,
                stride,
                ref element,
            } => {
                for i in 0..len {
                    slots.copy_from(slot + i * stride, element.template())?;
                }
            }
            Accessor::Pad => {}
        }
        Ok(())
    }
}
