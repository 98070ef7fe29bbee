//! Scalar requirements resolved from the database.

use serde_yaml::{Mapping, Value};

use crate::database::Database;
use crate::material::normalize_material;
use crate::spec::{MetadataScope, MetadataSpec, Normalize};
use crate::{MetadataError, MetadataResult};

fn load_value(
    db: &dyn Database,
    spec: &MetadataSpec,
    part: Option<&str>,
) -> MetadataResult<Option<Value>> {
    let value = db.load(spec, part, None)?;
    if value.is_none() {
        tracing::warn!(requirement = %spec.name, part = ?part, "database has no value");
    }
    Ok(value.map(|v| {
        if spec.normalize == Normalize::Material {
            if let Some(raw) = v.as_str() {
                return Value::from(normalize_material(raw));
            }
        }
        v
    }))
}

fn to_entry(value: &Option<Value>, unit: &str) -> Value {
    let mut map = Mapping::new();
    map.insert(Value::from("value"), value.clone().unwrap_or(Value::Null));
    map.insert(Value::from("unit"), Value::from(unit));
    Value::Mapping(map)
}

fn check_scope(spec: &MetadataSpec, expected: MetadataScope) -> MetadataResult<()> {
    if spec.scope == expected {
        Ok(())
    } else {
        Err(MetadataError::WrongScope {
            name: spec.name.clone(),
            scope: spec.scope,
        })
    }
}

/// A build-wide value, loaded eagerly on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildMetadata {
    pub name: String,
    pub value: Option<Value>,
    pub unit: String,
}

impl BuildMetadata {
    pub fn load(db: &dyn Database, spec: &MetadataSpec) -> MetadataResult<Self> {
        check_scope(spec, MetadataScope::Build)?;
        Ok(Self {
            name: spec.name.clone(),
            value: load_value(db, spec, None)?,
            unit: spec.unit.clone(),
        })
    }

    /// `{value, unit}` as stored in the settings document.
    pub fn to_value(&self) -> Value {
        to_entry(&self.value, &self.unit)
    }
}

/// A per-part value, loaded eagerly on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PartMetadata {
    pub name: String,
    pub part: String,
    pub value: Option<Value>,
    pub unit: String,
}

impl PartMetadata {
    pub fn load(db: &dyn Database, spec: &MetadataSpec, part: &str) -> MetadataResult<Self> {
        check_scope(spec, MetadataScope::Part)?;
        Ok(Self {
            name: spec.name.clone(),
            part: part.to_string(),
            value: load_value(db, spec, Some(part))?,
            unit: spec.unit.clone(),
        })
    }

    pub fn to_value(&self) -> Value {
        to_entry(&self.value, &self.unit)
    }
}
