//! Settings document validation.

use serde_yaml::{Mapping, Value};

use myna_core::document::key;

/// Step keys that must be present for a step to be applied.
pub const REQUIRED_STEP_FIELDS: [&str; 4] =
    ["configure", "execute", "postprocess", "output_template"];

/// Top-level sections every loaded document carries.
pub const REQUIRED_SECTIONS: [&str; 3] = ["steps", "data", "myna"];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid step #{index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("Step \"{step}\" is missing required fields: {}", .fields.join(", "))]
    MissingFields { step: String, fields: Vec<String> },

    #[error("Missing required data: {path}")]
    MissingData { path: String },
}

/// Insert empty mappings for absent or null `steps`, `data` and `myna`.
///
/// Present values are left untouched.
pub fn validate_required_input_keys(doc: &mut Value) -> Result<(), ValidationError> {
    if doc.is_null() {
        *doc = Value::Mapping(Mapping::new());
    }
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "<document>".to_string(),
            value: "<non-mapping>".to_string(),
            reason: "settings document must be a mapping".to_string(),
        })?;
    for section in REQUIRED_SECTIONS {
        let entry = root.entry(key(section)).or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn missing_sections_are_added() {
        let mut doc: Value = serde_yaml::from_str("data:\n  build:\n    name: B\n").unwrap();
        validate_required_input_keys(&mut doc).unwrap();
        let map = doc.as_mapping().unwrap();
        assert_eq!(map.get("steps"), Some(&Value::Mapping(Mapping::new())));
        assert_eq!(map.get("myna"), Some(&Value::Mapping(Mapping::new())));
        assert!(map.get("data").unwrap().get("build").is_some());
    }

    #[test]
    fn null_section_becomes_mapping() {
        let mut doc: Value = serde_yaml::from_str("steps: ~\n").unwrap();
        validate_required_input_keys(&mut doc).unwrap();
        assert!(doc.get("steps").unwrap().is_mapping());
    }

    #[test]
    fn scalar_document_is_rejected() {
        let mut doc = Value::from(3);
        assert!(validate_required_input_keys(&mut doc).is_err());
    }

    fn arb_section() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(Value::Null)),
            "[a-z]{1,6}".prop_map(|s| Some(Value::from(s))),
            prop::collection::vec(any::<i32>(), 0..4)
                .prop_map(|v| Some(Value::Sequence(v.into_iter().map(Value::from).collect()))),
        ]
    }

    proptest! {
        #[test]
        fn present_values_are_preserved(
            steps in arb_section(),
            data in arb_section(),
            myna in arb_section(),
        ) {
            let mut map = Mapping::new();
            for (name, section) in [("steps", &steps), ("data", &data), ("myna", &myna)] {
                if let Some(v) = section {
                    map.insert(key(name), v.clone());
                }
            }
            let mut doc = Value::Mapping(map);
            validate_required_input_keys(&mut doc).unwrap();
            for (name, section) in [("steps", &steps), ("data", &data), ("myna", &myna)] {
                let got = doc.get(name).unwrap();
                match section {
                    Some(v) if !v.is_null() => prop_assert_eq!(got, v),
                    _ => prop_assert_eq!(got, &Value::Mapping(Mapping::new())),
                }
            }
        }
    }
}
