//! Album config file parsing.

use super::FieldMap;
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("config file is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config file must be a mapping of topics")]
    NotAMapping,
}

/// Top-level key → its fields. Keys whose value is not a mapping are dropped.
pub type Sections = BTreeMap<String, FieldMap>;

const BOM: char = '\u{feff}';

/// Parse the raw bytes of an album config file.
///
/// A leading UTF-8 byte-order marker is ignored. An empty file (or one with
/// only comments) yields no sections.
pub fn parse_album_config(bytes: &[u8]) -> Result<Sections, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let blank = text
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Ok(Sections::new());
    }

    let document: Value = serde_yaml::from_str(text)?;
    let mapping = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(Sections::new()),
        _ => return Err(ParseError::NotAMapping),
    };

    let mut sections = Sections::new();
    for (key, value) in mapping {
        let (Some(key), Value::Mapping(fields)) = (key_string(&key), value) else {
            continue;
        };
        let fields: FieldMap = fields
            .into_iter()
            .filter_map(|(k, v)| key_string(&k).map(|k| (k, v)))
            .collect();
        sections.insert(key, fields);
    }
    Ok(sections)
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
