//! JSON-deserializable schema description.
//!
//! These types describe a record layout as data, for example a schema file
//! shipped with an application, and compile into a closed [`Schema`].
//!
//! ```
//! use bitpacket::serde::SchemaDef;
//!
//! let def = SchemaDef::from_json(r#"{
//!     "name": "Ping",
//!     "fields": [
//!         { "name": "kind", "kind": "unsigned", "bits": 4, "default": 8 },
//!         { "name": "seq", "kind": "unsigned", "bits": 12 },
//!         { "name": "data", "kind": "rest" }
//!     ]
//! }"#)?;
//! let schema = def.compile()?;
//! assert_eq!(schema.byte_length(), 2);
//! # Ok::<(), bitpacket::Error>(())
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    bits::Endian,
    errors::{Error, Result},
    field::FieldSpec,
    schema::{Schema, SchemaBuilder},
    value::Value,
};

/// Top-level schema definition: a record name and its fields in order.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    /// Omitted for pad fields and array elements.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKindDef,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<DefaultDef>,
    /// Overrides the kind's uniqueness requirement.
    #[serde(default)]
    pub unique: Option<bool>,
}

/// Kind of field, selected by the `kind` key.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKindDef {
    Unsigned {
        bits: usize,
        /// `little`, `big`, `network` or `native`; big when absent.
        #[serde(default)]
        endian: Option<String>,
    },
    Signed {
        bits: usize,
        #[serde(default)]
        endian: Option<String>,
    },
    Float {
        bits: usize,
        #[serde(default)]
        endian: Option<String>,
    },
    Char {
        bits: usize,
    },
    Text {
        bits: usize,
    },
    Pad {
        bits: usize,
    },
    Rest,
    Composite {
        fields: Vec<FieldDef>,
    },
    Array {
        len: usize,
        field: Box<FieldDef>,
    },
}

/// A default value as written in JSON.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum DefaultDef {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl From<&DefaultDef> for Value {
    fn from(def: &DefaultDef) -> Self {
        match def {
            DefaultDef::Unsigned(v) => Value::Unsigned(*v),
            DefaultDef::Signed(v) => Value::Signed(*v),
            DefaultDef::Float(v) => Value::Float(*v),
            DefaultDef::Text(v) => Value::from(v.as_str()),
        }
    }
}

fn endian(order: &Option<String>) -> Result<Endian> {
    order.as_deref().map_or(Ok(Endian::Big), str::parse)
}

impl TryFrom<&FieldDef> for FieldSpec {
    type Error = Error;

    fn try_from(def: &FieldDef) -> Result<Self> {
        let name = def.name.as_deref().unwrap_or_default();
        let mut spec = match &def.kind {
            FieldKindDef::Unsigned { bits, endian: order } => {
                FieldSpec::unsigned(name, *bits).endian(endian(order)?)
            }
            FieldKindDef::Signed { bits, endian: order } => {
                FieldSpec::signed(name, *bits).endian(endian(order)?)
            }
            FieldKindDef::Float { bits, endian: order } => {
                FieldSpec::float(name, *bits).endian(endian(order)?)
            }
            FieldKindDef::Char { bits } => FieldSpec::char(name, *bits),
            FieldKindDef::Text { bits } => FieldSpec::text(name, *bits),
            FieldKindDef::Pad { bits } => FieldSpec::pad(*bits),
            FieldKindDef::Rest => FieldSpec::rest(name),
            FieldKindDef::Composite { fields } => {
                let mut spec = FieldSpec::composite(name);
                for field in fields {
                    spec.add_field(field.try_into()?)?;
                }
                spec
            }
            FieldKindDef::Array { len, field } => {
                FieldSpec::array(name, *len).with_field(FieldSpec::try_from(&**field)?)?
            }
        };
        if let Some(description) = &def.description {
            spec = spec.description(description);
        }
        if let Some(default) = &def.default {
            spec = spec.default(default);
        }
        if let Some(unique) = def.unique {
            spec = spec.unique(unique);
        }
        Ok(spec)
    }
}

impl SchemaDef {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::argument(format!("invalid schema description: {e}")))
    }

    /// Declares every field on a new schema and closes it.
    pub fn compile(&self) -> Result<Arc<Schema>> {
        let mut builder = SchemaBuilder::new(&self.name);
        for field in &self.fields {
            builder.add_field(field.try_into()?)?;
        }
        builder.finish()
    }
}
