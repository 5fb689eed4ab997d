//! Named, validating value encodings.
//!
//! A [`Format`] pairs a stable identifier (`"text/html"`, `"number/natural"`)
//! with a parse function from untyped input to a [`FormatValue`]. Formats are
//! plain `Copy` descriptors; the [`FormatRegistry`] maps identifiers back to
//! descriptors when parsing authored data and knows how to derive one encoding
//! of a field from another.

use std::collections::BTreeMap;
use std::fmt;

use pulldown_cmark::{Options, Parser as CmarkParser};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::values::Values;

/// Untyped input as it arrives from authored data, before any format has
/// looked at it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl RawValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Bool(_) => "boolean",
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::String(_) => "string",
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::String(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Float(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Integer(n)
    }
}

/// Raw values keyed by field name, then by format id.
pub type RawValues = BTreeMap<String, BTreeMap<String, RawValue>>;

/// A value that passed its format's parse contract.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Text(String),
    Number(f64),
}

impl FormatValue {
    pub fn text(s: impl Into<String>) -> Self {
        FormatValue::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormatValue::Text(s) => Some(s),
            FormatValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormatValue::Number(n) => Some(*n),
            FormatValue::Text(_) => None,
        }
    }

    /// Back to untyped input, so the value can be run through a parser again.
    pub fn to_raw(&self) -> RawValue {
        match self {
            FormatValue::Text(s) => RawValue::String(s.clone()),
            FormatValue::Number(n) => RawValue::Float(*n),
        }
    }
}

impl fmt::Display for FormatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatValue::Text(s) => write!(f, "{}", s),
            FormatValue::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}

type ParseFn = fn(&RawValue) -> Result<FormatValue, String>;

/// A named encoding for one value.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    pub id: &'static str,
    parser: ParseFn,
}

impl Format {
    /// Parse untyped input. Deterministic, and never touches `input`.
    pub fn parse(&self, input: &RawValue) -> Result<FormatValue, ValidationError> {
        (self.parser)(input).map_err(|message| ValidationError::invalid(self.id, message))
    }

    /// Re-check an already typed value against this format.
    pub fn validate(&self, value: &FormatValue) -> Result<(), ValidationError> {
        self.parse(&value.to_raw()).map(|_| ())
    }
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Format {}

pub const fn define_format(id: &'static str, parser: ParseFn) -> Format {
    Format { id, parser }
}

// ---------------------------------------------------------------------------
// Built-in formats
// ---------------------------------------------------------------------------

/// Raw HTML. Accepted as is; sanitizing is the renderer's job.
pub const TEXT_HTML: Format = define_format("text/html", parse_string);
pub const TEXT_MARKDOWN: Format = define_format("text/markdown", parse_string);
pub const DATA_URI: Format = define_format("data-uri", parse_string);
pub const NUMBER_DECIMAL: Format = define_format("number/decimal", parse_decimal);
pub const NUMBER_NATURAL: Format = define_format("number/natural", parse_natural);
pub const ITEM_ID: Format = define_format("mintter/item-id", parse_short_id);
pub const SIGNER: Format = define_format("mintter/signer", parse_short_id);
pub const UNIX_SECS: Format = define_format("time/unix-secs", parse_natural);

const MIN_ID_LEN: usize = 6;

fn parse_string(input: &RawValue) -> Result<FormatValue, String> {
    match input {
        RawValue::String(s) => Ok(FormatValue::Text(s.clone())),
        other => Err(format!("expected a string, got {}", other.type_name())),
    }
}

fn decimal(input: &RawValue) -> Result<f64, String> {
    let n = match input {
        RawValue::Integer(n) => *n as f64,
        RawValue::Float(n) => *n,
        RawValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("`{}` is not a number", s))?,
        RawValue::Bool(b) => return Err(format!("`{}` is not a number", b)),
    };
    if !n.is_finite() {
        return Err(format!("`{}` is not a finite number", n));
    }
    Ok(n)
}

fn parse_decimal(input: &RawValue) -> Result<FormatValue, String> {
    decimal(input).map(FormatValue::Number)
}

fn parse_natural(input: &RawValue) -> Result<FormatValue, String> {
    let n = decimal(input)?;
    if n < 0.0 {
        return Err(format!("number ({}) cannot be natural if it's negative", n));
    }
    Ok(FormatValue::Number(n))
}

fn parse_short_id(input: &RawValue) -> Result<FormatValue, String> {
    let s = match input {
        RawValue::String(s) => s,
        other => return Err(format!("expected a string, got {}", other.type_name())),
    };
    if s.chars().count() < MIN_ID_LEN {
        return Err(format!(
            "`{}` is shorter than {} characters",
            s, MIN_ID_LEN
        ));
    }
    Ok(FormatValue::Text(s.clone()))
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

type DeriveFn = fn(&FormatValue) -> Result<FormatValue, String>;

/// Produces the `into` encoding of a field from its `from` encoding.
#[derive(Debug, Clone, Copy)]
pub struct Derivation {
    pub from: &'static str,
    pub into: &'static str,
    derive: DeriveFn,
}

impl Derivation {
    pub const fn new(from: &Format, into: &Format, derive: DeriveFn) -> Self {
        Derivation {
            from: from.id,
            into: into.id,
            derive,
        }
    }
}

pub const MARKDOWN_TO_HTML: Derivation =
    Derivation::new(&TEXT_MARKDOWN, &TEXT_HTML, markdown_to_html);

fn markdown_to_html(value: &FormatValue) -> Result<FormatValue, String> {
    let source = value
        .as_text()
        .ok_or_else(|| "markdown must be stored as a string".to_string())?;
    let mut out = String::new();
    let parser = CmarkParser::new_ext(source, Options::ENABLE_STRIKETHROUGH);
    pulldown_cmark::html::push_html(&mut out, parser);

    // A single paragraph is a line, not a document.
    let trimmed = out.trim_end();
    let html = match trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("</p>") => inner,
        _ => trimmed,
    };
    Ok(FormatValue::Text(html.to_string()))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Explicit mapping from format id to format, passed around as configuration.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<&'static str, Format>,
    derivations: Vec<Derivation>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry::default()
    }

    /// All built-in formats plus the markdown-to-html derivation.
    pub fn standard() -> Self {
        let mut registry = FormatRegistry::new();
        for format in [
            TEXT_HTML,
            TEXT_MARKDOWN,
            DATA_URI,
            NUMBER_DECIMAL,
            NUMBER_NATURAL,
            ITEM_ID,
            SIGNER,
            UNIX_SECS,
        ] {
            registry.register(format);
        }
        registry.register_derivation(MARKDOWN_TO_HTML);
        registry
    }

    pub fn register(&mut self, format: Format) -> &mut Self {
        self.formats.insert(format.id, format);
        self
    }

    pub fn register_derivation(&mut self, derivation: Derivation) -> &mut Self {
        self.derivations.push(derivation);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Format> {
        self.formats.get(id)
    }

    pub fn parse(&self, id: &str, input: &RawValue) -> Result<FormatValue, ValidationError> {
        self.get(id)
            .ok_or_else(|| ValidationError::UnknownFormat(id.to_string()))?
            .parse(input)
    }

    /// Parse every (field, format) pair, then fill in derivable encodings.
    pub fn parse_values(&self, raw: &RawValues) -> Result<Values, ValidationError> {
        let mut values = Values::new();
        for (field, formats) in raw {
            for (id, input) in formats {
                values.insert(field, id, self.parse(id, input)?);
            }
        }
        self.complete(&mut values)?;
        Ok(values)
    }

    /// Add derived encodings that are missing. Present encodings are never
    /// overwritten, and the source encoding is kept alongside.
    pub fn complete(&self, values: &mut Values) -> Result<(), ValidationError> {
        let mut derived = Vec::new();
        for (field, formats) in values.iter() {
            for derivation in &self.derivations {
                if formats.contains_key(derivation.into) {
                    continue;
                }
                if let Some(source) = formats.get(derivation.from) {
                    let value = (derivation.derive)(source)
                        .map_err(|message| ValidationError::invalid(derivation.into, message))?;
                    derived.push((field.clone(), derivation.into, value));
                }
            }
        }
        for (field, id, value) in derived {
            values.insert(&field, id, value);
        }
        Ok(())
    }
}
