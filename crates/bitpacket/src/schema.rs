//! Schemas: the ordered field and slot layout of one record type.
//!
//! A [`SchemaBuilder`] is open while fields are added. [`SchemaBuilder::finish`]
//! closes it exactly once and yields a shared, immutable [`Schema`] that
//! records are created from.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    compiled::{self, Accessor, Contribution, Cursor},
    errors::{Error, Result},
    field::{FieldKind, FieldSpec},
    slot::{Slot, SlotValue},
    value::Value,
    view::OffsetView,
};

/// Name under which anonymous pad fields are reachable.
const PAD_NAME: &str = "pad";

/// What a schema describes, which decides the rules applied to its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// A top-level record: must close on a byte boundary, may end in a rest field.
    Record,
    /// The inside of a composite field.
    Composite,
    /// The single element of an array field.
    Array,
}

/// Fields, accessors and slots accumulated so far.
#[derive(Debug, Clone, Default)]
struct Layout {
    fields: Vec<FieldSpec>,
    accessors: Vec<Accessor>,
    names: HashMap<String, usize>,
    slots: Vec<Slot>,
    bits: usize,
    /// Bits used in the trailing bit-string slot while it is still open.
    open_bits: Option<usize>,
    rest: Option<usize>,
}

impl Layout {
    fn cursor(&self) -> Cursor {
        let slot = match self.open_bits {
            Some(_) => self.slots.len() - 1,
            None => self.slots.len(),
        };
        Cursor {
            offset: self.bits,
            slot,
            open_bits: self.open_bits,
        }
    }

    fn merge_bits(&mut self, bits: usize) {
        let used = self.open_bits.unwrap_or(0) + bits;
        match (self.open_bits, self.slots.last_mut()) {
            (Some(_), Some(Slot::Bits { bytes })) => *bytes = used.div_ceil(8),
            _ => self.slots.push(Slot::Bits {
                bytes: used.div_ceil(8),
            }),
        }
        self.open_bits = (used % 8 != 0).then_some(used);
    }

    fn entry(&self, index: usize) -> Option<(&FieldSpec, &Accessor)> {
        Some((self.fields.get(index)?, self.accessors.get(index)?))
    }
}

/// An open schema that fields are added to.
///
/// ```
/// use bitpacket::{FieldSpec, SchemaBuilder};
///
/// let mut builder = SchemaBuilder::new("Header");
/// builder
///     .add_field(FieldSpec::unsigned("version", 3))?
///     .add_field(FieldSpec::unsigned("kind", 5))?
///     .add_field(FieldSpec::unsigned("length", 16))?;
/// let schema = builder.finish()?;
/// assert_eq!(schema.byte_length(), 3);
/// # Ok::<(), bitpacket::Error>(())
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    scope: Scope,
    layout: Layout,
    closed: Option<Arc<Schema>>,
}

/// A clone is always open, even when cloned from a closed builder.
impl Clone for SchemaBuilder {
    fn clone(&self) -> Self {
        self.derive(&self.name)
    }
}

impl SchemaBuilder {
    /// Starts an empty record schema.
    pub fn new(name: &str) -> Self {
        Self::scoped(name, Scope::Record)
    }

    pub(crate) fn scoped(name: &str, scope: Scope) -> Self {
        SchemaBuilder {
            name: name.to_string(),
            scope,
            layout: Layout::default(),
            closed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// Bits declared so far, excluding any rest field.
    pub fn bit_length(&self) -> usize {
        self.layout.bits
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.layout.fields
    }

    /// Appends a field. Nothing changes if the field is rejected.
    pub fn add_field(&mut self, spec: FieldSpec) -> Result<&mut Self> {
        let label = spec.label();
        if let Err(err) = self.install(spec) {
            debug!(schema = %self.name, field = %label, error = %err, "field rejected");
            return Err(err);
        }
        Ok(self)
    }

    fn install(&mut self, mut spec: FieldSpec) -> Result<()> {
        if self.closed.is_some() {
            return Err(Error::schema(format!(
                "cannot add field {} to closed schema '{}'",
                spec.label(),
                self.name
            )));
        }
        let is_rest = matches!(spec.kind, FieldKind::Rest);
        if let Some(rest) = self.layout.rest {
            let first = self.layout.fields[rest].label();
            return Err(if is_rest {
                Error::schema(format!("rest field already defined as {first}"))
            } else {
                Error::schema(format!(
                    "field {} cannot follow the rest field {first}",
                    spec.label()
                ))
            });
        }
        if self.scope == Scope::Array {
            if !self.layout.fields.is_empty() {
                return Err(Error::schema("array fields can only contain one sub-field"));
            }
            spec.name = None;
        }
        self.check_name(&spec)?;
        if is_rest && self.scope != Scope::Record {
            return Err(Error::schema(format!(
                "rest field {} is only allowed at the top level of a record",
                spec.label()
            )));
        }
        let default = std::mem::take(&mut spec.default);
        spec.default = spec.coerce(default)?;

        let cursor = self.layout.cursor();
        let (accessor, contribution) = compiled::compile(&mut spec, &cursor)?;
        let bits = self
            .layout
            .bits
            .checked_add(spec.bit_length())
            .ok_or_else(|| Error::argument(format!("schema '{}' is too large", self.name)))?;

        trace!(
            schema = %self.name,
            field = %spec.label(),
            kind = spec.kind().name(),
            slot = cursor.slot,
            offset = cursor.offset,
            "field installed"
        );
        let index = self.layout.fields.len();
        match contribution {
            Contribution::Slots(slots) => self.layout.slots.extend(slots),
            Contribution::Bits(bits) => self.layout.merge_bits(bits),
            Contribution::Rest => self.layout.rest = Some(index),
        }
        self.layout.bits = bits;
        match spec.name() {
            Some(name) => {
                self.layout.names.insert(name.to_string(), index);
            }
            None if matches!(spec.kind, FieldKind::Pad) => {
                self.layout.names.entry(PAD_NAME.to_string()).or_insert(index);
            }
            None => {}
        }
        self.layout.fields.push(spec);
        self.layout.accessors.push(accessor);
        Ok(())
    }

    fn check_name(&self, spec: &FieldSpec) -> Result<()> {
        let Some(name) = spec.name() else {
            if self.scope == Scope::Array || matches!(spec.kind, FieldKind::Pad) {
                return Ok(());
            }
            return Err(Error::schema(format!(
                "{} fields require a name in '{}'",
                spec.kind().name(),
                self.name
            )));
        };
        if name.contains(['.', '[', ']']) {
            return Err(Error::argument(format!("invalid field name '{name}'")));
        }
        if !spec.is_unique() {
            return Ok(());
        }
        match self.layout.names.get(name).map(|&i| &self.layout.fields[i]) {
            Some(existing) if existing.name().is_some() => Err(Error::schema(format!(
                "field '{name}' is already defined as a field in '{}'",
                self.name
            ))),
            Some(_) => Err(Error::schema(format!(
                "field '{name}' is already defined as an accessor in '{}'",
                self.name
            ))),
            None => Ok(()),
        }
    }

    /// Replaces the default value of an already added field.
    pub fn default_for(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        if self.closed.is_some() {
            return Err(Error::schema(format!(
                "cannot change defaults of closed schema '{}'",
                self.name
            )));
        }
        let index = *self
            .layout
            .names
            .get(name)
            .ok_or_else(|| Error::schema(format!("unknown field '{name}'")))?;
        let field = &mut self.layout.fields[index];
        field.default = field.coerce(value.into())?;
        Ok(self)
    }

    /// Starts a new open schema holding copies of every field added so far.
    pub fn derive(&self, name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            scope: self.scope,
            layout: self.layout.clone(),
            closed: None,
        }
    }

    /// Closes the schema, freezing its layout. Later calls return the same
    /// schema.
    pub fn finish(&mut self) -> Result<Arc<Schema>> {
        if let Some(schema) = &self.closed {
            return Ok(Arc::clone(schema));
        }
        if self.scope == Scope::Record && self.layout.bits % 8 != 0 {
            debug!(schema = %self.name, bits = self.layout.bits, "schema is not byte aligned");
            return Err(Error::alignment("packet length does not fall on a byte boundary"));
        }

        let mut slots = self.layout.slots.clone();
        if self.layout.rest.is_some() {
            slots.push(Slot::Rest);
        }
        let mut template: Vec<SlotValue> = slots.iter().map(Slot::zero).collect();
        {
            let mut view = OffsetView::new(template.as_mut_slice(), 0);
            for (field, accessor) in self.layout.fields.iter().zip(&self.layout.accessors) {
                accessor.write(&mut view, field.default.clone())?;
            }
        }

        let schema = Arc::new(Schema {
            name: self.name.clone(),
            scope: self.scope,
            layout: self.layout.clone(),
            slots,
            template,
        });
        debug!(
            schema = %schema.name,
            bits = schema.bit_length(),
            slots = schema.slots.len(),
            fields = schema.fields().len(),
            "schema closed"
        );
        self.closed = Some(Arc::clone(&schema));
        Ok(schema)
    }
}

/// A closed schema. Shared between all records of its type.
#[derive(Debug)]
pub struct Schema {
    name: String,
    scope: Scope,
    layout: Layout,
    slots: Vec<Slot>,
    /// Slot values of a record holding only defaults.
    template: Vec<SlotValue>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of the fixed part in bits. A rest field adds nothing.
    pub fn bit_length(&self) -> usize {
        self.layout.bits
    }

    pub fn byte_length(&self) -> usize {
        self.layout.bits.div_ceil(8)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.layout.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.layout.names.get(name).map(|&i| &self.layout.fields[i])
    }

    /// The rest field, if one was declared.
    pub fn rest(&self) -> Option<&FieldSpec> {
        self.layout.rest.map(|i| &self.layout.fields[i])
    }

    /// The slot layout as space-separated tokens, e.g. `"u8 bits2 f32be rest"`.
    pub fn layout(&self) -> String {
        self.slots
            .iter()
            .map(Slot::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Starts a new open schema holding copies of every field of this one.
    pub fn derive(&self, name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            scope: self.scope,
            layout: self.layout.clone(),
            closed: None,
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<(&FieldSpec, &Accessor)> {
        self.layout
            .names
            .get(name)
            .and_then(|&i| self.layout.entry(i))
            .ok_or_else(|| {
                Error::argument(format!("unknown field '{name}' in '{}'", self.name))
            })
    }

    pub(crate) fn entry(&self, index: usize) -> Result<(&FieldSpec, &Accessor)> {
        self.layout.entry(index).ok_or_else(|| {
            Error::argument(format!("'{}' has no field at index {index}", self.name))
        })
    }

    pub(crate) fn template(&self) -> &[SlotValue] {
        &self.template
    }

    /// Serializes slot values laid out by this schema.
    pub(crate) fn pack(&self, values: &[SlotValue]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_length());
        for (slot, value) in self.slots.iter().zip(values) {
            slot.pack(value, &mut out);
        }
        out
    }

    /// Splits `data` into slot values. `data` must hold at least the fixed
    /// length; the remainder goes to the rest slot, or is ignored.
    pub(crate) fn unpack(&self, data: &[u8]) -> Result<Vec<SlotValue>> {
        if data.len() < self.byte_length() {
            return Err(Error::range(format!(
                "'{}' needs at least {} bytes, got {}",
                self.name,
                self.byte_length(),
                data.len()
            )));
        }
        let mut offset = 0;
        let mut values = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let end = slot.byte_len().map_or(data.len(), |n| offset + n);
            values.push(slot.unpack(&data[offset..end]));
            offset = end;
        }
        Ok(values)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.layout())
    }
}
