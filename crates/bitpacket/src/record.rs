//! Records: the slot values of one instance of a closed schema.

use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    errors::{Error, Result},
    field::{FieldKind, FieldSpec},
    schema::Schema,
    slot::SlotValue,
    value::Value,
    view::{ArrayView, CompositeView, OffsetView},
};

/// One record: a schema plus one value per slot of its layout.
///
/// ```
/// use bitpacket::{FieldSpec, Record, SchemaBuilder};
///
/// let mut builder = SchemaBuilder::new("Sample");
/// builder
///     .add_field(FieldSpec::unsigned("flags", 4))?
///     .add_field(FieldSpec::signed("level", 12))?
///     .add_field(FieldSpec::text("tag", 32))?;
/// let schema = builder.finish()?;
///
/// let mut record = Record::new(schema.clone());
/// record.set("flags", 9)?;
/// record.set("level", -2)?;
/// record.set("tag", "ok")?;
/// let bytes = record.to_bytes();
/// assert_eq!(bytes, [0x9f, 0xfe, b'o', b'k', b' ', b' ']);
///
/// let parsed = Record::from_bytes(schema, &bytes)?;
/// assert_eq!(parsed.get("level")?.as_i64(), Some(-2));
/// assert_eq!(parsed.get("tag")?.as_str(), Some("ok"));
/// # Ok::<(), bitpacket::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<SlotValue>,
}

impl Record {
    /// A record holding every field's default value.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema.template().to_vec();
        Record { schema, values }
    }

    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        let mut record = Record::new(schema);
        record.parse(data)?;
        Ok(record)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Replaces every value with those decoded from `data`. On error the
    /// record is left unchanged.
    pub fn parse(&mut self, data: &[u8]) -> Result<()> {
        trace!(schema = %self.schema.name(), bytes = data.len(), "parse");
        self.values = self.schema.unpack(data)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let bytes = self.schema.pack(&self.values);
        trace!(schema = %self.schema.name(), bytes = bytes.len(), "serialize");
        bytes
    }

    pub fn view(&self) -> CompositeView<'_, &[SlotValue]> {
        CompositeView::new(&self.schema, OffsetView::new(self.values.as_slice(), 0))
    }

    pub fn view_mut(&mut self) -> CompositeView<'_, &mut [SlotValue]> {
        CompositeView::new(&self.schema, OffsetView::new(self.values.as_mut_slice(), 0))
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.view().get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.view_mut().set(name, value)
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        self.view_mut().reset(name)
    }

    pub fn composite(&self, name: &str) -> Result<CompositeView<'_, &[SlotValue]>> {
        self.view().into_composite(name)
    }

    pub fn composite_mut(&mut self, name: &str) -> Result<CompositeView<'_, &mut [SlotValue]>> {
        self.view_mut().into_composite(name)
    }

    pub fn array(&self, name: &str) -> Result<ArrayView<'_, &[SlotValue]>> {
        self.view().into_array(name)
    }

    pub fn array_mut(&mut self, name: &str) -> Result<ArrayView<'_, &mut [SlotValue]>> {
        self.view_mut().into_array(name)
    }

    /// Reads a field by dotted path, e.g. `"ary[2].cnt"`.
    pub fn get_path(&self, path: &str) -> Result<Value> {
        self.view().get_path(path)
    }

    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.view_mut().set_path(path, value)
    }
}

fn element_of(field: &FieldSpec) -> Option<&FieldSpec> {
    match &field.kind {
        FieldKind::Array { element, .. } => element.fields().first(),
        _ => None,
    }
}

fn fmt_composite(f: &mut fmt::Formatter<'_>, view: CompositeView<'_, &[SlotValue]>) -> Result<()> {
    let mut first = true;
    for field in view.schema().fields() {
        let Some(name) = field.name() else { continue };
        if matches!(field.kind, FieldKind::Pad) {
            continue;
        }
        if !first {
            write_str(f, ", ")?;
        }
        first = false;
        write_str(f, &format!("{name}="))?;
        match &field.kind {
            FieldKind::Composite(_) => {
                write_str(f, "{")?;
                fmt_composite(f, view.composite(name)?)?;
                write_str(f, "}")?;
            }
            FieldKind::Array { .. } => {
                write_str(f, "[")?;
                fmt_array(f, view.array(name)?, element_of(field))?;
                write_str(f, "]")?;
            }
            _ => write_str(f, &view.get(name)?.to_string())?,
        }
    }
    Ok(())
}

fn fmt_array(
    f: &mut fmt::Formatter<'_>,
    view: ArrayView<'_, &[SlotValue]>,
    element: Option<&FieldSpec>,
) -> Result<()> {
    let Some(element) = element else { return Ok(()) };
    for i in 0..view.len() as isize {
        if i > 0 {
            write_str(f, ", ")?;
        }
        match &element.kind {
            FieldKind::Composite(_) => {
                write_str(f, "{")?;
                fmt_composite(f, view.composite(i)?)?;
                write_str(f, "}")?;
            }
            FieldKind::Array { .. } => {
                write_str(f, "[")?;
                fmt_array(f, view.array(i)?, element_of(element))?;
                write_str(f, "]")?;
            }
            _ => write_str(f, &view.get(i)?.to_string())?,
        }
    }
    Ok(())
}

fn write_str(f: &mut fmt::Formatter<'_>, s: &str) -> Result<()> {
    f.write_str(s)
        .map_err(|_| Error::argument("failed to format record"))
}

/// `Name field=value, cmp={a=1}, ary=[1, 2]`. Pad fields are omitted.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.schema.name())?;
        fmt_composite(f, self.view()).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn schema() -> Arc<Schema> {
        let mut builder = SchemaBuilder::new("Small");
        builder
            .add_field(FieldSpec::unsigned("hi", 4).default(1))
            .unwrap()
            .add_field(FieldSpec::unsigned("lo", 4).default(2))
            .unwrap()
            .add_field(FieldSpec::rest("tail"))
            .unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_new_uses_defaults() {
        let record = Record::new(schema());
        assert_eq!(record.to_bytes(), vec![0x12]);
        assert_eq!(record.get("lo").unwrap(), Value::Unsigned(2));
    }

    #[test]
    fn test_parse_keeps_record_on_error() {
        let mut record = Record::new(schema());
        assert!(matches!(record.parse(&[]), Err(Error::Range(_))));
        assert_eq!(record.to_bytes(), vec![0x12]);
        record.parse(&[0xab, 1, 2]).unwrap();
        assert_eq!(record.get("hi").unwrap(), Value::Unsigned(0xa));
        assert_eq!(record.get("tail").unwrap(), Value::from(&[1u8, 2]));
        assert_eq!(record.to_bytes(), vec![0xab, 1, 2]);
    }

    #[test]
    fn test_unknown_field() {
        let mut record = Record::new(schema());
        assert!(matches!(record.get("nope"), Err(Error::Argument(_))));
        assert!(matches!(record.set("nope", 1), Err(Error::Argument(_))));
    }

    #[test]
    fn test_display() {
        let mut record = Record::new(schema());
        record.set("tail", "xy").unwrap();
        assert_eq!(record.to_string(), "Small hi=1, lo=2, tail=\"xy\"");
    }
}
