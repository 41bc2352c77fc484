//! # bitpacket
//!
//! Declarative bit-level packet layouts.
//!
//! A record type is declared as an ordered list of fields (integers of any
//! width, floats, fixed text blocks, padding, nested composites, fixed-length
//! arrays and a trailing variable-length remainder). Closing the schema
//! freezes it into a flat slot layout; records built from it pack to and
//! parse from contiguous byte buffers.
//!
//! ## Example
//!
//! ```
//! use bitpacket::{FieldSpec, Record, SchemaBuilder};
//!
//! let mut builder = SchemaBuilder::new("Telemetry");
//! builder
//!     .add_field(FieldSpec::unsigned("version", 3).default(1))?
//!     .add_field(FieldSpec::unsigned("channel", 5))?
//!     .add_field(
//!         FieldSpec::array("samples", 2).with_field(FieldSpec::signed("", 16))?,
//!     )?
//!     .add_field(FieldSpec::rest("payload"))?;
//! let schema = builder.finish()?;
//!
//! let mut record = Record::new(schema);
//! record.set("channel", 4)?;
//! record.array_mut("samples")?.set(1, -1)?;
//! record.set("payload", "abc")?;
//! assert_eq!(record.to_bytes(), b"\x24\x00\x00\xff\xffabc");
//! assert_eq!(record.get_path("samples[1]")?.as_i64(), Some(-1));
//! # Ok::<(), bitpacket::Error>(())
//! ```

pub mod bits;
mod compiled;
mod describe;
pub mod errors;
pub mod field;
mod path;
pub mod record;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod slot;
pub mod value;
pub mod view;

pub use bits::Endian;
pub use describe::FieldRow;
pub use errors::{Error, Result};
pub use field::{FieldKind, FieldSpec};
pub use record::Record;
pub use schema::{Schema, SchemaBuilder};
pub use slot::{Slot, SlotValue};
pub use value::Value;
pub use view::{ArrayView, CompositeView, OffsetView};
