//! Layout slots: the units a closed schema packs into and parses out of a
//! flat byte buffer, and the per-record values stored for each of them.

use std::fmt;

use crate::bits::Endian;

/// One unit of the serialized buffer, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Native integer of 1, 2, 4 or 8 bytes. `endian` is resolved (big or little).
    Int { bytes: usize, endian: Endian },
    /// IEEE 754 float of 4 or 8 bytes. `endian` is resolved (big or little).
    Float { bytes: usize, endian: Endian },
    /// Fixed-length byte block, filled with `fill` on write. Text blocks
    /// `trim` trailing spaces and nulls on parse.
    Block { bytes: usize, fill: u8, trim: bool },
    /// Raw bytes shared by one or more bit-packed fields.
    Bits { bytes: usize },
    /// Reserved bytes with no value.
    Skip { bytes: usize },
    /// Everything after the fixed part of the buffer.
    Rest,
}

/// The value held for one [`Slot`] of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Int(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Skip,
}

impl Slot {
    /// Width of the slot in bytes, `None` for the variable-length rest slot.
    pub fn byte_len(&self) -> Option<usize> {
        match *self {
            Slot::Int { bytes, .. }
            | Slot::Float { bytes, .. }
            | Slot::Block { bytes, .. }
            | Slot::Bits { bytes }
            | Slot::Skip { bytes } => Some(bytes),
            Slot::Rest => None,
        }
    }

    /// The value a slot holds before any field default is applied.
    pub(crate) fn zero(&self) -> SlotValue {
        match *self {
            Slot::Int { .. } => SlotValue::Int(0),
            Slot::Float { .. } => SlotValue::Float(0.0),
            Slot::Bits { bytes } => SlotValue::Bytes(vec![0; bytes]),
            Slot::Block { .. } | Slot::Rest => SlotValue::Bytes(Vec::new()),
            Slot::Skip { .. } => SlotValue::Skip,
        }
    }

    /// Appends the encoding of `value` to `out`.
    pub(crate) fn pack(&self, value: &SlotValue, out: &mut Vec<u8>) {
        match (*self, value) {
            (Slot::Int { bytes, endian }, SlotValue::Int(v)) => {
                pack_int(*v, bytes, endian, out);
            }
            (Slot::Float { bytes: 4, endian }, SlotValue::Float(v)) => {
                pack_int(u64::from((*v as f32).to_bits()), 4, endian, out);
            }
            (Slot::Float { bytes, endian }, SlotValue::Float(v)) => {
                pack_int(v.to_bits(), bytes, endian, out);
            }
            (Slot::Block { bytes, fill, .. }, SlotValue::Bytes(b)) => {
                pack_block(b, bytes, fill, out);
            }
            (Slot::Bits { bytes }, SlotValue::Bytes(b)) => pack_block(b, bytes, 0, out),
            (Slot::Rest, SlotValue::Bytes(b)) => out.extend_from_slice(b),
            (slot, _) => {
                out.resize(out.len() + slot.byte_len().unwrap_or(0), 0);
            }
        }
    }

    /// Decodes a value from `data`, which holds exactly this slot's bytes
    /// (or the whole remainder for [`Slot::Rest`]).
    pub(crate) fn unpack(&self, data: &[u8]) -> SlotValue {
        match *self {
            Slot::Int { endian, .. } => SlotValue::Int(unpack_int(data, endian)),
            Slot::Float { bytes: 4, endian } => {
                SlotValue::Float(f64::from(f32::from_bits(unpack_int(data, endian) as u32)))
            }
            Slot::Float { endian, .. } => SlotValue::Float(f64::from_bits(unpack_int(data, endian))),
            Slot::Block { trim: true, .. } => {
                let end = data
                    .iter()
                    .rposition(|&b| b != b' ' && b != 0)
                    .map_or(0, |i| i + 1);
                SlotValue::Bytes(data[..end].to_vec())
            }
            Slot::Block { .. } | Slot::Bits { .. } | Slot::Rest => SlotValue::Bytes(data.to_vec()),
            Slot::Skip { .. } => SlotValue::Skip,
        }
    }
}

fn pack_int(value: u64, bytes: usize, endian: Endian, out: &mut Vec<u8>) {
    match endian {
        Endian::Little => out.extend_from_slice(&value.to_le_bytes()[..bytes]),
        _ => out.extend_from_slice(&value.to_be_bytes()[8 - bytes..]),
    }
}

fn unpack_int(data: &[u8], endian: Endian) -> u64 {
    let fold = |acc: u64, &b: &u8| (acc << 8) | u64::from(b);
    match endian {
        Endian::Little => data.iter().rev().fold(0, fold),
        _ => data.iter().fold(0, fold),
    }
}

fn pack_block(value: &[u8], bytes: usize, fill: u8, out: &mut Vec<u8>) {
    let n = value.len().min(bytes);
    out.extend_from_slice(&value[..n]);
    out.resize(out.len() + bytes - n, fill);
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = |endian: &Endian| match endian {
            Endian::Little => "le",
            _ => "be",
        };
        match self {
            Slot::Int { bytes: 1, .. } => f.write_str("u8"),
            Slot::Int { bytes, endian } => write!(f, "u{}{}", bytes * 8, order(endian)),
            Slot::Float { bytes, endian } => write!(f, "f{}{}", bytes * 8, order(endian)),
            Slot::Block { bytes, trim: true, .. } => write!(f, "text{bytes}"),
            Slot::Block { bytes, .. } => write!(f, "char{bytes}"),
            Slot::Bits { bytes } => write!(f, "bits{bytes}"),
            Slot::Skip { bytes } => write!(f, "skip{bytes}"),
            Slot::Rest => f.write_str("rest"),
        }
    }
}
