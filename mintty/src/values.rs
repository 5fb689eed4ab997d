use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::SchemaErrorKind;
use crate::format::{Format, FormatValue};

/// Encodings of one field, keyed by format id.
pub type FormatMap = BTreeMap<String, FormatValue>;

/// Current values of a block: field name -> format id -> value.
///
/// One field may carry several encodings at once (e.g. markdown source and
/// the html derived from it). Partial updates use the same type with only
/// the changed fields present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    fields: BTreeMap<String, FormatMap>,
}

impl Values {
    pub fn new() -> Self {
        Values::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: &str, format: &Format, value: FormatValue) -> Self {
        self.insert(field, format.id, value);
        self
    }

    pub fn insert(&mut self, field: &str, format_id: &str, value: FormatValue) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .insert(format_id.to_string(), value);
    }

    pub fn field(&self, field: &str) -> Option<&FormatMap> {
        self.fields.get(field)
    }

    pub fn get(&self, field: &str, format: &Format) -> Option<&FormatValue> {
        self.fields.get(field)?.get(format.id)
    }

    pub fn text(&self, field: &str, format: &Format) -> Option<&str> {
        self.get(field, format)?.as_text()
    }

    pub fn number(&self, field: &str, format: &Format) -> Option<f64> {
        self.get(field, format)?.as_number()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FormatMap> {
        self.fields.iter()
    }

    /// Merge `other` on top of `self`. Later encodings win per (field, format);
    /// other encodings of the same field are kept.
    pub fn merge(&mut self, other: &Values) {
        for (field, formats) in other.iter() {
            let into = self.fields.entry(field.clone()).or_default();
            for (id, value) in formats {
                into.insert(id.clone(), value.clone());
            }
        }
    }

    pub fn merged(values: &[&Values]) -> Values {
        let mut into = Values::new();
        for v in values {
            into.merge(v);
        }
        into
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = (&'a String, &'a FormatMap);
    type IntoIter = btree_map::Iter<'a, String, FormatMap>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One declared field: the lossless format the block treats as the source.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub format: Format,
}

/// Declared fields of a block (or of a slot item's standoff record).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesConfig {
    fields: BTreeMap<String, FieldConfig>,
}

impl ValuesConfig {
    pub fn new() -> Self {
        ValuesConfig::default()
    }

    pub fn field(mut self, name: &str, format: Format) -> Self {
        self.fields.insert(name.to_string(), FieldConfig { format });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> btree_map::Iter<'_, String, FieldConfig> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that `values` carries exactly the declared fields, each in its
    /// declared format and valid for it. Extra encodings of a declared field
    /// are allowed.
    pub fn check(&self, values: &Values) -> Vec<SchemaErrorKind> {
        let mut errors = Vec::new();
        for (name, config) in &self.fields {
            match values.get(name, &config.format) {
                None => errors.push(SchemaErrorKind::MissingField {
                    field: name.clone(),
                    format: config.format.id.to_string(),
                }),
                Some(value) => {
                    if let Err(error) = config.format.validate(value) {
                        errors.push(SchemaErrorKind::InvalidValue {
                            field: name.clone(),
                            error,
                        });
                    }
                }
            }
        }
        for (name, _) in values {
            if !self.fields.contains_key(name) {
                errors.push(SchemaErrorKind::UnexpectedField(name.clone()));
            }
        }
        errors
    }
}
