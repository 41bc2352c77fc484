//! Dotted-path field access: `"outer.inner[2].flag"`.
//!
//! A path is a sequence of field names separated by `.`, each optionally
//! followed by one or more `[index]` selectors.

use crate::{
    errors::{Error, Result},
    slot::SlotValue,
    value::Value,
    view::{ArrayView, CompositeView},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step<'p> {
    Field(&'p str),
    Index(isize),
}

fn invalid(path: &str) -> Error {
    Error::argument(format!("invalid field path '{path}'"))
}

fn parse(path: &str) -> Result<Vec<Step<'_>>> {
    let mut steps = Vec::new();
    for part in path.split('.') {
        let (name, mut rest) = part.split_at(part.find('[').unwrap_or(part.len()));
        if name.is_empty() {
            return Err(invalid(path));
        }
        steps.push(Step::Field(name));
        while !rest.is_empty() {
            let Some((index, tail)) = rest.strip_prefix('[').and_then(|r| r.split_once(']'))
            else {
                return Err(invalid(path));
            };
            let index = index.trim().parse().map_err(|_| invalid(path))?;
            steps.push(Step::Index(index));
            rest = tail;
        }
    }
    Ok(steps)
}

enum Node<'s, S> {
    Composite(CompositeView<'s, S>),
    Array(ArrayView<'s, S>),
}

/// Follows every step but the last, returning the view the last step applies to.
fn walk<'s, 'p, S>(view: CompositeView<'s, S>, path: &'p str) -> Result<(Node<'s, S>, Step<'p>)> {
    let steps = parse(path)?;
    let Some((last, init)) = steps.split_last() else {
        return Err(invalid(path));
    };

    let mut node = Node::Composite(view);
    for (n, step) in init.iter().enumerate() {
        let into_array = matches!(steps[n + 1], Step::Index(_));
        node = match (node, *step) {
            (Node::Composite(v), Step::Field(name)) if into_array => Node::Array(v.into_array(name)?),
            (Node::Composite(v), Step::Field(name)) => Node::Composite(v.into_composite(name)?),
            (Node::Array(v), Step::Index(i)) if into_array => Node::Array(v.into_array(i)?),
            (Node::Array(v), Step::Index(i)) => Node::Composite(v.into_composite(i)?),
            _ => return Err(invalid(path)),
        };
    }
    Ok((node, *last))
}

impl<'s, S: AsRef<[SlotValue]>> CompositeView<'s, S> {
    /// Reads the scalar at `path`, relative to this view.
    pub fn get_path(&self, path: &str) -> Result<Value> {
        match walk(self.reborrow(), path)? {
            (Node::Composite(v), Step::Field(name)) => v.get(name),
            (Node::Array(v), Step::Index(i)) => v.get(i),
            _ => Err(invalid(path)),
        }
    }
}

impl<'s, S: AsMut<[SlotValue]>> CompositeView<'s, S> {
    /// Writes the field at `path`, relative to this view.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        match walk(self.reborrow_mut(), path)? {
            (Node::Composite(mut v), Step::Field(name)) => v.set(name, value),
            (Node::Array(mut v), Step::Index(i)) => v.set(i, value),
            _ => Err(invalid(path)),
        }
    }
}
