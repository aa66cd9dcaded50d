//! Strict JSON decoding for every payload the service sends.
//!
//! All wire types in this crate are declared with
//! `#[serde(deny_unknown_fields)]`, so a field the service adds that we do not
//! model fails here instead of being dropped on the floor.

use serde::de::DeserializeOwned;
use serde_json::error::Category;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The payload carried a field the target type does not declare.
    UnknownField,
    /// The payload is not valid JSON.
    Syntax,
    /// Valid JSON that does not match the target type.
    Data,
    /// The payload ended early.
    Eof,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self {
            DecodeErrorKind::UnknownField => "unknown field",
            DecodeErrorKind::Syntax => "syntax",
            DecodeErrorKind::Data => "data",
            DecodeErrorKind::Eof => "unexpected end of input",
        };
        f.write_str(v)
    }
}

#[derive(Debug, Error)]
#[error("failed to decode response ({kind}): {source}")]
pub struct DecodeError {
    kind: DecodeErrorKind,
    field: Option<String>,
    #[source]
    source: serde_json::Error,
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Name of the rejected field for [`DecodeErrorKind::UnknownField`].
    pub fn unknown_field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn line(&self) -> usize {
        self.source.line()
    }

    pub fn column(&self) -> usize {
        self.source.column()
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(source: serde_json::Error) -> Self {
        let field = unknown_field_name(&source.to_string());
        let kind = match source.classify() {
            Category::Data if field.is_some() => DecodeErrorKind::UnknownField,
            Category::Data => DecodeErrorKind::Data,
            Category::Syntax => DecodeErrorKind::Syntax,
            Category::Eof => DecodeErrorKind::Eof,
            // Only reachable when reading from an io::Read, which we never do.
            Category::Io => DecodeErrorKind::Syntax,
        };
        Self {
            kind,
            field,
            source,
        }
    }
}

// serde reports the field as: unknown field `name`, expected ...
fn unknown_field_name(message: &str) -> Option<String> {
    let rest = message.strip_prefix("unknown field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

/// Decode `bytes` into `T`, rejecting unknown fields and trailing data.
pub fn decode<T>(bytes: &[u8]) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(DecodeError::from)
}
