//! Stats and list documents
//!
//! The server answers `stats*` and `list-tubes*` with a YAML body. How that
//! body is turned into a value is a capability injected into the connection:
//! [`YamlDecoder`] parses it, [`RawDecoder`] hands the text back untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{Result, StalkError};

/// A scalar value inside a document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Scalar {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Int(n) => u64::try_from(*n).ok(),
            Scalar::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Null => Ok(()),
        }
    }
}

/// A decoded stats or list body
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// `stats`, `stats-tube`, `stats-job`
    Mapping(BTreeMap<String, Scalar>),
    /// `list-tubes`, `list-tubes-watched`, entries exactly as the server
    /// wrote them
    Sequence(Vec<String>),
    /// Undecoded YAML text
    Raw(String),
}

impl Document {
    /// Look up a key of a mapping document
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        match self {
            Document::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Entries of a sequence document
    pub fn items(&self) -> Option<&[String]> {
        match self {
            Document::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Document::Raw(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Mapping(map) => {
                for (key, value) in map {
                    writeln!(f, "{}: {}", key, value)?;
                }
                Ok(())
            }
            Document::Sequence(items) => {
                for item in items {
                    writeln!(f, "- {}", item)?;
                }
                Ok(())
            }
            Document::Raw(text) => f.write_str(text),
        }
    }
}

/// Turns document text into a [`Document`]
pub trait DocumentDecoder: Send {
    fn decode(&self, text: &str) -> Result<Document>;
}

/// Parses YAML mappings of scalars and sequences of names.
///
/// Sequence entries are kept as text, so a tube called `1.10` stays `1.10`.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlDecoder;

/// Returns the text unparsed
#[derive(Debug, Default, Clone, Copy)]
pub struct RawDecoder;

impl DocumentDecoder for YamlDecoder {
    fn decode(&self, text: &str) -> Result<Document> {
        // Sequence first, so entries reach the `String` visitor untyped
        if let Ok(items) = serde_yaml::from_str::<Vec<String>>(text) {
            return Ok(Document::Sequence(items));
        }
        serde_yaml::from_str::<BTreeMap<String, Scalar>>(text)
            .map(Document::Mapping)
            .map_err(|e| StalkError::Document(e.to_string()))
    }
}

impl DocumentDecoder for RawDecoder {
    fn decode(&self, text: &str) -> Result<Document> {
        Ok(Document::Raw(text.to_string()))
    }
}

/// Decoder selected by the `decode_documents` setting
pub fn decoder_for(decode_documents: bool) -> Box<dyn DocumentDecoder> {
    if decode_documents {
        Box::new(YamlDecoder)
    } else {
        Box::new(RawDecoder)
    }
}
