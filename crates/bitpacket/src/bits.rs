//! Low-level bit read and write utilities for byte buffers.
//!
//! Bits are addressed in MSB-first order: bit 0 is the high bit of the first
//! byte. Big (and native) requests may start and end anywhere inside a byte;
//! little-endian requests must be byte aligned and span whole bytes, and are
//! read as a little-endian integer over the addressed bytes.

use std::{
    fmt,
    ops::{Bound, RangeBounds},
    str::FromStr,
};

use crate::errors::{Error, Result};

/// Widest integer that can be read or written in a single request.
pub const MAX_BITS: usize = 64;

/// Byte order used when accessing a multi-byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Network order, most significant byte first.
    #[default]
    Big,
    /// Least significant byte first. Requires byte alignment.
    Little,
    /// Host order for native-width slots. Bit-packed runs use the big path.
    Native,
}

impl Endian {
    /// Resolves [`Endian::Native`] to the byte order of the host.
    pub fn resolve(self) -> Endian {
        match self {
            Endian::Native if cfg!(target_endian = "little") => Endian::Little,
            Endian::Native => Endian::Big,
            other => other,
        }
    }
}

impl FromStr for Endian {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "little" => Ok(Endian::Little),
            "big" | "network" => Ok(Endian::Big),
            "native" => Ok(Endian::Native),
            other => Err(Error::argument(format!("unknown endian option '{other}'"))),
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endian::Big => "big",
            Endian::Little => "little",
            Endian::Native => "native",
        })
    }
}

fn check(offset: usize, len: usize, endian: Endian) -> Result<()> {
    if len == 0 {
        return Err(Error::range("length must be greater than zero '0'"));
    }
    if len > MAX_BITS {
        return Err(Error::range(format!(
            "cannot access more than {MAX_BITS} bits at once '{len}'"
        )));
    }
    if offset.checked_add(len).is_none() {
        return Err(Error::range(format!(
            "bit range starting at {offset} overflows '{len}'"
        )));
    }
    if endian == Endian::Little {
        if offset % 8 != 0 {
            return Err(Error::alignment("little endian values must be byte aligned"));
        }
        if len % 8 != 0 {
            return Err(Error::alignment(
                "little endian values must have integer byte length",
            ));
        }
    }
    Ok(())
}

/// Number of bits the last addressed byte has after the requested range.
fn trailing_bits(offset: usize, len: usize) -> usize {
    (8 - (offset + len) % 8) % 8
}

/// Reads the single bit at `bit_pos` (0 = MSB of first byte). Returns 0 or 1.
pub fn read_bit_at(data: &[u8], bit_pos: usize) -> Result<u8> {
    read_bits(data, bit_pos, 1, Endian::Big).map(|bit| bit as u8)
}

/// Reads `len` bits starting at `offset` as an unsigned value (max 64 bits).
pub fn read_bits(data: &[u8], offset: usize, len: usize, endian: Endian) -> Result<u64> {
    check(offset, len, endian)?;

    let first = offset / 8;
    let last = (offset + len - 1) / 8;
    if last >= data.len() {
        return Err(Error::range(format!(
            "not enough bits in buffer: need {} bytes, have {}",
            last + 1,
            data.len()
        )));
    }

    match endian {
        Endian::Little => Ok(data[first..=last]
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))),
        Endian::Big | Endian::Native => {
            let head = 0xFFu8 >> (offset % 8);
            let acc = data[first + 1..=last]
                .iter()
                .fold(u128::from(data[first] & head), |acc, &b| {
                    (acc << 8) | u128::from(b)
                });

            Ok((acc >> trailing_bits(offset, len)) as u64)
        }
    }
}

/// Writes the low `len` bits of `value` at `offset`, growing `data` with zero
/// bytes when the range ends past it. Bits outside the range are preserved.
pub fn write_bits(
    data: &mut Vec<u8>,
    offset: usize,
    len: usize,
    endian: Endian,
    value: u64,
) -> Result<()> {
    check(offset, len, endian)?;

    let value = if len == MAX_BITS {
        value
    } else {
        value & ((1u64 << len) - 1)
    };

    let first = offset / 8;
    let last = (offset + len - 1) / 8;
    if last >= data.len() {
        data.resize(last + 1, 0);
    }

    let span = &mut data[first..=last];
    match endian {
        Endian::Little => {
            let mut v = value;
            for b in span.iter_mut() {
                *b = v as u8;
                v >>= 8;
            }
        }
        Endian::Big | Endian::Native => {
            let tail = trailing_bits(offset, len);
            let mask = ((1u128 << len) - 1) << tail;
            let current = span.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
            let mut acc = (current & !mask) | (u128::from(value) << tail);

            for b in span.iter_mut().rev() {
                *b = acc as u8;
                acc >>= 8;
            }
        }
    }

    Ok(())
}

fn range_to_offset_len(range: impl RangeBounds<usize>) -> Result<(usize, usize)> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s
            .checked_add(1)
            .ok_or_else(|| Error::range(format!("range start overflows '{s}'")))?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e
            .checked_add(1)
            .ok_or_else(|| Error::range(format!("range end overflows '{e}'")))?,
        Bound::Excluded(&e) => e,
        Bound::Unbounded => {
            return Err(Error::argument("expecting a range with an end bit"));
        }
    };

    if end <= start {
        let sign = if start > end { "-" } else { "" };
        return Err(Error::range(format!(
            "length must be greater than zero '{sign}{}'",
            start - end
        )));
    }

    Ok((start, end - start))
}

/// Like [`read_bits`], addressing the bits with a range such as `0..16` or `7..=9`.
pub fn read_range(data: &[u8], range: impl RangeBounds<usize>, endian: Endian) -> Result<u64> {
    let (offset, len) = range_to_offset_len(range)?;
    read_bits(data, offset, len, endian)
}

/// Like [`write_bits`], addressing the bits with a range.
pub fn write_range(
    data: &mut Vec<u8>,
    range: impl RangeBounds<usize>,
    endian: Endian,
    value: u64,
) -> Result<()> {
    let (offset, len) = range_to_offset_len(range)?;
    write_bits(data, offset, len, endian, value)
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    debug_assert!((1..=MAX_BITS).contains(&bits));
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONES: [u8; 2] = [0x31, 0x31];
    const POWERS: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

    fn be(offset: usize, len: usize) -> u64 {
        read_bits(&ONES, offset, len, Endian::Big).unwrap()
    }

    #[test]
    fn test_read_single_bits() {
        assert_eq!(read_bit_at(&ONES, 0).unwrap(), 0);
        assert_eq!(read_bit_at(&ONES, 2).unwrap(), 1);
        assert_eq!(read_bit_at(&ONES, 6).unwrap(), 0);
        assert_eq!(read_bit_at(&ONES, 7).unwrap(), 1);
        assert_eq!(read_bit_at(&ONES, 8).unwrap(), 0);
    }

    #[test]
    fn test_read_multi_bit_values() {
        assert_eq!(be(0, 2), 0);
        assert_eq!(be(0, 3), 1);
        assert_eq!(be(0, 4), 3);
        assert_eq!(be(0, 8), 49);
        assert_eq!(be(2, 2), 0b11);
        assert_eq!(be(2, 6), 0b110001);
        assert_eq!(be(3, 5), 0b10001);
    }

    #[test]
    fn test_read_spans_byte_boundaries() {
        assert_eq!(be(0, 16), 0b0011000100110001);
        assert_eq!(be(2, 12), 0b110001001100);
        assert_eq!(be(2, 10), 0b1100010011);
        assert_eq!(be(5, 6), 0b001001);
        assert_eq!(be(7, 3), 0b100);

        assert_eq!(read_range(&POWERS, 0..40, Endian::Big).unwrap(), 4328785936);
        assert_eq!(read_range(&POWERS, 7..40, Endian::Big).unwrap(), 4328785936);
        assert_eq!(read_range(&POWERS, 7..36, Endian::Big).unwrap(), 270549121);
    }

    #[test]
    fn test_read_ranges() {
        assert_eq!(read_range(&ONES, 0..=15, Endian::Big).unwrap(), 0x3131);
        assert_eq!(read_range(&ONES, 0..16, Endian::Big).unwrap(), 0x3131);
        assert_eq!(read_range(&ONES, 7..=9, Endian::Big).unwrap(), 0b100);
        assert_eq!(read_range(&ONES, 7..10, Endian::Big).unwrap(), 0b100);
    }

    #[test]
    fn test_read_little_endian() {
        assert_eq!(read_range(&POWERS, 0..40, Endian::Little).unwrap(), 68853957121);
        assert_eq!(read_bits(&POWERS, 8, 40, Endian::Little).unwrap(), 137707914242);
        assert_eq!(read_range(&POWERS, 48..56, Endian::Little).unwrap(), 64);
        assert_eq!(read_bits(&POWERS, 48, 16, Endian::Little).unwrap(), 32832);

        assert!(matches!(
            read_range(&POWERS, 1..8, Endian::Little),
            Err(Error::Alignment(_))
        ));
        assert!(matches!(
            read_range(&POWERS, 0..=8, Endian::Little),
            Err(Error::Alignment(_))
        ));
    }

    #[test]
    fn test_native_bit_path_matches_big() {
        assert_eq!(read_bits(&ONES, 2, 10, Endian::Native).unwrap(), be(2, 10));
    }

    #[test]
    fn test_read_out_of_bounds() {
        assert!(matches!(read_bits(&ONES, 0, 17, Endian::Big), Err(Error::Range(_))));
    }

    #[test]
    fn test_overflowing_offsets_rejected() {
        assert!(matches!(
            read_bits(&[0; 2], usize::MAX - 3, 8, Endian::Big),
            Err(Error::Range(_))
        ));
        let mut data = vec![0; 2];
        assert!(matches!(
            write_bits(&mut data, usize::MAX - 3, 8, Endian::Big, 1),
            Err(Error::Range(_))
        ));
        assert_eq!(data, vec![0; 2]);
        assert!(matches!(
            read_range(&ONES, usize::MAX - 3..=usize::MAX, Endian::Big),
            Err(Error::Range(_))
        ));
    }

    #[test]
    fn test_read_more_than_64() {
        assert!(matches!(
            read_bits(&[0xFF; 16], 0, 65, Endian::Big),
            Err(Error::Range(_))
        ));
    }

    #[test]
    fn test_empty_lengths_rejected() {
        assert!(matches!(read_bits(&ONES, 0, 0, Endian::Big), Err(Error::Range(_))));
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = read_range(&ONES, 7..2, Endian::Big);
        assert!(matches!(inverted, Err(Error::Range(_))));
        assert!(matches!(read_range(&ONES, 5..5, Endian::Big), Err(Error::Range(_))));
        assert!(matches!(read_range(&ONES, 5.., Endian::Big), Err(Error::Argument(_))));
    }

    #[test]
    fn test_write_grows_buffer() {
        let mut data = Vec::new();
        write_bits(&mut data, 0, 8, Endian::Big, 255).unwrap();
        assert_eq!(data.len(), 1);
        write_bits(&mut data, 8, 1, Endian::Big, 1).unwrap();
        assert_eq!(data.len(), 2);
        write_bits(&mut data, 15, 1, Endian::Big, 1).unwrap();
        assert_eq!(data.len(), 2);
        write_bits(&mut data, 38, 1, Endian::Big, 1).unwrap();
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_write_single_bits() {
        let mut data = Vec::new();
        let steps = [
            (7, 1, 1),
            (5, 1, 5),
            (1, 1, 69),
            (0, 1, 197),
            (2, 1, 229),
            (5, 0, 225),
            (1, 0, 161),
        ];
        for base in [0usize, 8, 24] {
            for &(bit, value, expected) in &steps {
                write_bits(&mut data, base + bit, 1, Endian::Big, value).unwrap();
                assert_eq!(read_bits(&data, base, 8, Endian::Big).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_write_multi_bit_values() {
        let mut data = Vec::new();
        write_range(&mut data, 5..=7, Endian::Big, 5).unwrap();
        assert_eq!(be_of(&data, 0, 8), 5);
        write_range(&mut data, 0..=7, Endian::Big, 123).unwrap();
        assert_eq!(be_of(&data, 0, 8), 123);
        write_range(&mut data, 0..=7, Endian::Big, 0).unwrap();
        write_range(&mut data, 1..=4, Endian::Big, 15).unwrap();
        assert_eq!(be_of(&data, 0, 8), 120);
        write_range(&mut data, 19..=23, Endian::Big, 17).unwrap();
        assert_eq!(be_of(&data, 16, 8), 17);
        assert_eq!(be_of(&data, 0, 24), 7864337);
    }

    fn be_of(data: &[u8], offset: usize, len: usize) -> u64 {
        read_bits(data, offset, len, Endian::Big).unwrap()
    }

    #[test]
    fn test_write_spans_byte_boundaries() {
        let mut data = Vec::new();
        write_range(&mut data, 7..=8, Endian::Big, 3).unwrap();
        assert_eq!(be_of(&data, 0, 16), 384);

        write_bits(&mut data, 1, 1, Endian::Big, 1).unwrap();
        write_bits(&mut data, 15, 1, Endian::Big, 1).unwrap();
        write_range(&mut data, 5..=12, Endian::Big, 255).unwrap();
        assert_eq!(be_of(&data, 0, 16), 18425);

        write_range(&mut data, 14..=39, Endian::Big, 0xFFFF_FFFF).unwrap();
        assert_eq!(be_of(&data, 0, 40), 309170536447);
    }

    #[test]
    fn test_write_truncates_values() {
        let mut data = Vec::new();
        write_range(&mut data, 13..=15, Endian::Big, 15).unwrap();
        assert_eq!(be_of(&data, 8, 8), 7);
        write_range(&mut data, 8..=9, Endian::Big, 15).unwrap();
        assert_eq!(be_of(&data, 8, 8), 199);
        write_range(&mut data, 10..=12, Endian::Big, 3).unwrap();
        assert_eq!(be_of(&data, 8, 8), 223);
        write_range(&mut data, 13..=15, Endian::Big, 8).unwrap();
        assert_eq!(be_of(&data, 8, 8), 216);

        write_range(&mut data, 0..=39, Endian::Big, 0).unwrap();
        write_range(&mut data, 14..=39, Endian::Big, 0xFFFF_FFFF).unwrap();
        assert_eq!(be_of(&data, 0, 40), 67108863);
    }

    #[test]
    fn test_write_all_ones_pattern() {
        let mut data = Vec::new();
        write_range(&mut data, 0..=3, Endian::Big, u64::MAX).unwrap();
        assert_eq!(be_of(&data, 0, 8), 0xF0);
        write_range(&mut data, 8..=11, Endian::Big, u64::MAX).unwrap();
        assert_eq!(be_of(&data, 0, 16), 0xF0F0);
    }

    #[test]
    fn test_write_little_endian() {
        let mut data = Vec::new();
        write_range(&mut data, 0..40, Endian::Little, 68853957121).unwrap();
        assert_eq!(data, POWERS[..5]);
        write_range(&mut data, 8..48, Endian::Little, 137707914242).unwrap();
        assert_eq!(data, POWERS[..6]);
        write_bits(&mut data, 48, 8, Endian::Little, 64).unwrap();
        assert_eq!(data, POWERS[..7]);
        write_bits(&mut data, 48, 16, Endian::Little, 32832).unwrap();
        assert_eq!(data, POWERS);

        assert!(matches!(
            write_range(&mut data, 1..8, Endian::Little, 0),
            Err(Error::Alignment(_))
        ));
    }

    #[test]
    fn test_write_full_width_unaligned() {
        let mut data = vec![0xFF; 9];
        write_bits(&mut data, 7, 64, Endian::Big, 0).unwrap();
        assert_eq!(data[0], 0xFE);
        assert_eq!(data[8], 0x01);
        assert_eq!(read_bits(&data, 7, 64, Endian::Big).unwrap(), 0);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b11111111, 8), -1);
        assert_eq!(sign_extend(0b0111, 4), 7);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
    }

    #[test]
    fn test_endian_from_str() {
        assert_eq!("network".parse::<Endian>().unwrap(), Endian::Big);
        assert_eq!("little".parse::<Endian>().unwrap(), Endian::Little);
        assert_eq!(
            "bad".parse::<Endian>().unwrap_err().to_string(),
            "unknown endian option 'bad'"
        );
    }
}
