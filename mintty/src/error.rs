use std::fmt;

use crate::path::ItemPath;

/// A value could not be coerced into a format.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The format's parse contract rejected the input.
    Invalid { format: String, message: String },
    /// No format with this id is registered.
    UnknownFormat(String),
}

impl ValidationError {
    pub fn invalid(format: &str, message: impl Into<String>) -> Self {
        ValidationError::Invalid {
            format: format.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Invalid { format, message } => {
                write!(f, "invalid {}: {}", format, message)
            }
            ValidationError::UnknownFormat(id) => write!(f, "unknown format: {}", id),
        }
    }
}

impl std::error::Error for ValidationError {}

/// What went wrong when checking a data tree against a block schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaErrorKind {
    MissingField { field: String, format: String },
    UnexpectedField(String),
    InvalidValue { field: String, error: ValidationError },
    UnknownSlot(String),
    DuplicateItem { slot: String, id: String },
    /// A standoff record does not match its slot's value config.
    InvalidStandoff { slot: String, id: String, reason: Box<SchemaErrorKind> },
}

impl fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaErrorKind::MissingField { field, format } => {
                write!(f, "missing field `{}` in format {}", field, format)
            }
            SchemaErrorKind::UnexpectedField(field) => {
                write!(f, "field `{}` is not declared by the schema", field)
            }
            SchemaErrorKind::InvalidValue { field, error } => {
                write!(f, "field `{}`: {}", field, error)
            }
            SchemaErrorKind::UnknownSlot(slot) => {
                write!(f, "slot `{}` is not declared by the schema", slot)
            }
            SchemaErrorKind::DuplicateItem { slot, id } => {
                write!(f, "item id `{}` appears more than once in slot `{}`", id, slot)
            }
            SchemaErrorKind::InvalidStandoff { slot, id, reason } => {
                write!(f, "standoff of `{}` in slot `{}`: {}", id, slot, reason)
            }
        }
    }
}

/// A data tree does not match the schema that is meant to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// Schema the node was checked against.
    pub schema: String,
    /// Where in the tree the mismatch is.
    pub path: ItemPath,
    pub kind: SchemaErrorKind,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.schema, self.path, self.kind)
    }
}

impl std::error::Error for SchemaError {}

/// The selector found no implementation for a data tree node.
/// Reported as a diagnostic only; the fallback implementation is used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct UnclassifiedData {
    pub kind: Option<String>,
    pub fields: Vec<String>,
    pub slots: Vec<String>,
}

impl fmt::Display for UnclassifiedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unclassified block data")?;
        if let Some(kind) = &self.kind {
            write!(f, " (unknown kind `{}`)", kind)?;
        }
        write!(
            f,
            ": fields [{}], slots [{}]",
            self.fields.join(", "),
            self.slots.join(", ")
        )
    }
}

impl std::error::Error for UnclassifiedData {}

#[derive(Debug, Clone, PartialEq)]
pub enum MountError {
    /// An implementation could not build its live surface.
    Failed { block: String, message: String },
    /// Teardown of a mounted surface failed.
    Teardown { block: String, message: String },
    /// One destroy pass observed several failures; all were attempted.
    Many(Vec<MountError>),
}

impl MountError {
    pub fn failed(block: &str, message: impl Into<String>) -> Self {
        MountError::Failed {
            block: block.to_string(),
            message: message.into(),
        }
    }

    pub fn teardown(block: &str, message: impl Into<String>) -> Self {
        MountError::Teardown {
            block: block.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::Failed { block, message } => {
                write!(f, "mount of {} failed: {}", block, message)
            }
            MountError::Teardown { block, message } => {
                write!(f, "destroy of {} failed: {}", block, message)
            }
            MountError::Many(errors) => {
                write!(f, "{} errors during destroy", errors.len())?;
                for error in errors {
                    write!(f, "; {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MountError {}
