//! Tabular field descriptions.

use std::fmt;

use crate::{
    field::{FieldKind, FieldSpec},
    schema::Schema,
};

/// One row of a schema description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// Byte offset of the field, absent for composite and array headers.
    pub byte_offset: Option<usize>,
    pub kind: &'static str,
    /// Qualified name such as `ary[0].cnt`; absent for pad fields.
    pub name: Option<String>,
    /// `"<bits>b"` for leaf fields, `"<n> "` for array headers, `"var"` for
    /// the rest field; absent for composite headers.
    pub size: Option<String>,
    pub description: String,
}

fn line(byte: &str, kind: &str, name: &str, size: &str, description: &str) -> String {
    format!("{byte:<7}: {kind:<10} {name:<15} [{size:>5}] {description}")
}

impl fmt::Display for FieldRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = self.byte_offset.map(|b| format!("@{b}")).unwrap_or_default();
        f.write_str(&line(
            &byte,
            self.kind,
            self.name.as_deref().unwrap_or_default(),
            self.size.as_deref().unwrap_or_default(),
            &self.description,
        ))
    }
}

impl FieldSpec {
    /// Describes this field starting at bit `offset`: one row per leaf, plus
    /// a header row before the members of a composite or array.
    pub fn describe(&self, offset: usize) -> Vec<FieldRow> {
        let mut rows = Vec::new();
        let mut offset = offset;
        self.describe_into(self.name.clone(), &mut offset, &mut rows);
        rows
    }

    fn describe_into(&self, name: Option<String>, offset: &mut usize, rows: &mut Vec<FieldRow>) {
        let mut row = FieldRow {
            byte_offset: None,
            kind: self.kind.name(),
            name: name.clone(),
            size: None,
            description: self.description.clone(),
        };

        match &self.kind {
            FieldKind::Composite(inner) => {
                rows.push(row);
                let prefix = name.unwrap_or_default();
                for child in inner.fields() {
                    let child_name = child.name().map(|c| format!("{prefix}.{c}"));
                    child.describe_into(child_name, offset, rows);
                }
            }
            FieldKind::Array { len, element } => {
                row.size = Some(format!("{len} "));
                rows.push(row);
                let prefix = name.unwrap_or_default();
                if let Some(field) = element.fields().first() {
                    for i in 0..*len {
                        let element_name = format!("{prefix}[{i}]");
                        let element_name = match field.kind {
                            FieldKind::Pad => None,
                            _ => Some(element_name),
                        };
                        field.describe_into(element_name, offset, rows);
                    }
                }
            }
            FieldKind::Rest => {
                row.byte_offset = Some(*offset / 8);
                row.size = Some("var".to_string());
                rows.push(row);
            }
            FieldKind::Pad => {
                row.byte_offset = Some(*offset / 8);
                row.name = None;
                row.size = Some(format!("{}b", self.bits));
                *offset += self.bits;
                rows.push(row);
            }
            _ => {
                row.byte_offset = Some(*offset / 8);
                row.size = Some(format!("{}b", self.bits));
                *offset += self.bits;
                rows.push(row);
            }
        }
    }
}

impl Schema {
    /// One [`FieldRow`] per field, in declaration order, rest field last.
    pub fn describe_fields(&self) -> Vec<FieldRow> {
        let mut offset = 0;
        let mut rows = Vec::new();
        for field in self.fields() {
            field.describe_into(field.name.clone(), &mut offset, &mut rows);
        }
        rows
    }

    /// Formats [`Schema::describe_fields`] as a table, preceded by a header
    /// unless `omit_header` is set.
    pub fn describe(&self, omit_header: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if !omit_header {
            lines.push(line("byte", "type", "name", "size", "description"));
            lines.push("-".repeat(70));
        }
        lines.extend(self.describe_fields().iter().map(FieldRow::to_string));
        lines
    }
}
