//! Nested addressing into a record's slot values.
//!
//! Composite and array fields do not own storage. Their views hold the
//! sub-schema plus an [`OffsetView`] over the record's values, so element
//! `i` of an array of composites is simply the element schema applied at
//! `base + i * stride`.
//!
//! Every view is generic over its store: `&[SlotValue]` for reading,
//! `&mut [SlotValue]` for writing.

use crate::{
    compiled::Accessor,
    errors::{Error, Result},
    field::FieldSpec,
    schema::Schema,
    slot::SlotValue,
    value::Value,
};

/// A store of slot values seen through an adjustable base offset: index `i`
/// of the view is index `base + i` of the store.
#[derive(Debug, Clone, Copy)]
pub struct OffsetView<S> {
    store: S,
    base: usize,
}

impl<S> OffsetView<S> {
    pub fn new(store: S, base: usize) -> Self {
        OffsetView { store, base }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn set_base(&mut self, base: usize) {
        self.base = base;
    }

    /// Consumes the view, returning one whose base is moved forward by `by`.
    pub fn shift(self, by: usize) -> Self {
        OffsetView {
            store: self.store,
            base: self.base + by,
        }
    }
}

fn outside(index: usize, len: usize) -> Error {
    Error::range(format!("slot {index} is outside the record's {len} slots"))
}

impl<S: AsRef<[SlotValue]>> OffsetView<S> {
    pub fn get(&self, index: usize) -> Result<&SlotValue> {
        let store = self.store.as_ref();
        store
            .get(self.base + index)
            .ok_or_else(|| outside(self.base + index, store.len()))
    }

    pub fn reborrow(&self) -> OffsetView<&[SlotValue]> {
        OffsetView::new(self.store.as_ref(), self.base)
    }
}

impl<S: AsMut<[SlotValue]>> OffsetView<S> {
    pub fn get_mut(&mut self, index: usize) -> Result<&mut SlotValue> {
        let store = self.store.as_mut();
        let len = store.len();
        store
            .get_mut(self.base + index)
            .ok_or_else(|| outside(self.base + index, len))
    }

    pub fn reborrow_mut(&mut self) -> OffsetView<&mut [SlotValue]> {
        OffsetView::new(self.store.as_mut(), self.base)
    }

    /// Overwrites the slots starting at `index` with `values`.
    pub(crate) fn copy_from(&mut self, index: usize, values: &[SlotValue]) -> Result<()> {
        let store = self.store.as_mut();
        let start = self.base + index;
        let end = start + values.len();
        if end > store.len() {
            return Err(outside(end - 1, store.len()));
        }
        store[start..end].clone_from_slice(values);
        Ok(())
    }
}

fn not_scalar(spec: &FieldSpec) -> Error {
    Error::argument(format!(
        "field {} is a {} field and has no scalar value",
        spec.label(),
        spec.kind().name()
    ))
}

fn not_composite(what: &str) -> Error {
    Error::argument(format!("{what} is not a composite field"))
}

fn not_array(what: &str) -> Error {
    Error::argument(format!("{what} is not an array field"))
}

/// The fields of a composite (or of a whole record) bound to a slot store.
#[derive(Debug)]
pub struct CompositeView<'s, S> {
    schema: &'s Schema,
    slots: OffsetView<S>,
}

impl<'s, S> CompositeView<'s, S> {
    pub(crate) fn new(schema: &'s Schema, slots: OffsetView<S>) -> Self {
        CompositeView { schema, slots }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Consumes the view and descends into the composite field `name`.
    pub fn into_composite(self, name: &str) -> Result<CompositeView<'s, S>> {
        match self.schema.lookup(name)?.1 {
            Accessor::Composite { slot, schema } => {
                Ok(CompositeView::new(schema, self.slots.shift(*slot)))
            }
            _ => Err(not_composite(&format!("field '{name}'"))),
        }
    }

    /// Consumes the view and descends into the array field `name`.
    pub fn into_array(self, name: &str) -> Result<ArrayView<'s, S>> {
        match self.schema.lookup(name)?.1 {
            Accessor::Array {
                slot,
                len,
                stride,
                element,
            } => Ok(ArrayView::new(element, *len, *stride, self.slots.shift(*slot))),
            _ => Err(not_array(&format!("field '{name}'"))),
        }
    }
}

impl<'s, S: AsRef<[SlotValue]>> CompositeView<'s, S> {
    pub fn reborrow(&self) -> CompositeView<'s, &[SlotValue]> {
        CompositeView::new(self.schema, self.slots.reborrow())
    }

    /// Reads the scalar field `name`.
    pub fn get(&self, name: &str) -> Result<Value> {
        let (spec, accessor) = self.schema.lookup(name)?;
        match accessor {
            Accessor::Composite { .. } | Accessor::Array { .. } => Err(not_scalar(spec)),
            _ => accessor.read(&self.slots),
        }
    }

    pub fn composite(&self, name: &str) -> Result<CompositeView<'s, &[SlotValue]>> {
        self.reborrow().into_composite(name)
    }

    pub fn array(&self, name: &str) -> Result<ArrayView<'s, &[SlotValue]>> {
        self.reborrow().into_array(name)
    }
}

impl<'s, S: AsMut<[SlotValue]>> CompositeView<'s, S> {
    pub fn reborrow_mut(&mut self) -> CompositeView<'s, &mut [SlotValue]> {
        CompositeView::new(self.schema, self.slots.reborrow_mut())
    }

    /// Writes the field `name`. Assigning to a composite or array field
    /// resets all of its sub-fields to their defaults.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let (spec, accessor) = self.schema.lookup(name)?;
        let value = spec.coerce(value.into())?;
        accessor.write(&mut self.slots, value)
    }

    /// Restores the field `name` (and everything nested in it) to its default.
    pub fn reset(&mut self, name: &str) -> Result<()> {
        let (spec, accessor) = self.schema.lookup(name)?;
        accessor.write(&mut self.slots, spec.default_value().clone())
    }

    pub fn composite_mut(&mut self, name: &str) -> Result<CompositeView<'s, &mut [SlotValue]>> {
        self.reborrow_mut().into_composite(name)
    }

    pub fn array_mut(&mut self, name: &str) -> Result<ArrayView<'s, &mut [SlotValue]>> {
        self.reborrow_mut().into_array(name)
    }
}

/// Index access to the elements of an array field.
///
/// Element `i` lives at `base + i * stride`, where the stride is the number
/// of slots one element occupies.
#[derive(Debug)]
pub struct ArrayView<'s, S> {
    element: &'s Schema,
    len: usize,
    stride: usize,
    slots: OffsetView<S>,
}

impl<'s, S> ArrayView<'s, S> {
    pub(crate) fn new(element: &'s Schema, len: usize, stride: usize, slots: OffsetView<S>) -> Self {
        ArrayView {
            element,
            len,
            stride,
            slots,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, index: isize) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.len)
            .ok_or_else(|| Error::index(index, self.len))
    }

    fn element(&self) -> Result<(&'s FieldSpec, &'s Accessor)> {
        self.element.entry(0)
    }

    /// Consumes the view and selects element `index`, which must be a composite.
    pub fn into_composite(self, index: isize) -> Result<CompositeView<'s, S>> {
        let i = self.check(index)?;
        match self.element()?.1 {
            Accessor::Composite { slot, schema } => Ok(CompositeView::new(
                schema,
                self.slots.shift(i * self.stride + slot),
            )),
            _ => Err(not_composite(&format!("element {index}"))),
        }
    }

    /// Consumes the view and selects element `index`, which must be an array.
    pub fn into_array(self, index: isize) -> Result<ArrayView<'s, S>> {
        let i = self.check(index)?;
        match self.element()?.1 {
            Accessor::Array {
                slot,
                len,
                stride,
                element,
            } => Ok(ArrayView::new(
                element,
                *len,
                *stride,
                self.slots.shift(i * self.stride + slot),
            )),
            _ => Err(not_array(&format!("element {index}"))),
        }
    }
}

impl<'s, S: AsRef<[SlotValue]>> ArrayView<'s, S> {
    pub fn reborrow(&self) -> ArrayView<'s, &[SlotValue]> {
        ArrayView::new(self.element, self.len, self.stride, self.slots.reborrow())
    }

    /// Reads scalar element `index`.
    pub fn get(&self, index: isize) -> Result<Value> {
        let i = self.check(index)?;
        let (spec, accessor) = self.element()?;
        match accessor {
            Accessor::Composite { .. } | Accessor::Array { .. } => Err(not_scalar(spec)),
            _ => accessor.read(&self.slots.reborrow().shift(i * self.stride)),
        }
    }

    /// Reads every scalar element in order.
    pub fn values(&self) -> Result<Vec<Value>> {
        (0..self.len as isize).map(|i| self.get(i)).collect()
    }

    pub fn composite(&self, index: isize) -> Result<CompositeView<'s, &[SlotValue]>> {
        self.reborrow().into_composite(index)
    }

    pub fn array(&self, index: isize) -> Result<ArrayView<'s, &[SlotValue]>> {
        self.reborrow().into_array(index)
    }
}

impl<'s, S: AsMut<[SlotValue]>> ArrayView<'s, S> {
    pub fn reborrow_mut(&mut self) -> ArrayView<'s, &mut [SlotValue]> {
        ArrayView::new(self.element, self.len, self.stride, self.slots.reborrow_mut())
    }

    /// Writes element `index`. Assigning to a composite or array element
    /// resets it to its defaults.
    pub fn set(&mut self, index: isize, value: impl Into<Value>) -> Result<()> {
        let i = self.check(index)?;
        let (spec, accessor) = self.element()?;
        let value = spec.coerce(value.into())?;

        let base = self.slots.base();
        self.slots.set_base(base + i * self.stride);
        let written = accessor.write(&mut self.slots, value);
        self.slots.set_base(base);
        written
    }

    /// Restores element `index` to its default.
    pub fn reset(&mut self, index: isize) -> Result<()> {
        let i = self.check(index)?;
        let (spec, accessor) = self.element()?;
        accessor.write(
            &mut self.slots.reborrow_mut().shift(i * self.stride),
            spec.default_value().clone(),
        )
    }

    pub fn composite_mut(&mut self, index: isize) -> Result<CompositeView<'s, &mut [SlotValue]>> {
        self.reborrow_mut().into_composite(index)
    }

    pub fn array_mut(&mut self, index: isize) -> Result<ArrayView<'s, &mut [SlotValue]>> {
        self.reborrow_mut().into_array(index)
    }
}
