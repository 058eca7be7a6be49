//! Dictionary file formats
//!
//! Three on-disk formats share one entry model:
//!
//! - plain list: `key<TAB>value value...`, one entry per line
//! - flat JSON (`.jlist`): `{"key": ["value", ...]}`
//! - nested trie JSON (`.tlist`): per-unit objects with `""` terminal keys
//!
//! The format is resolved from the file extension exactly once, at this
//! boundary; nothing downstream ever sniffs extensions.

use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Dict;
use crate::error::HanconvError;
use crate::{unicode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictFormat {
    List,
    Jlist,
    Tlist,
}

impl DictFormat {
    /// Resolve a format from a file extension, defaulting to the plain list.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jlist") | Some("json") => DictFormat::Jlist,
            Some("tlist") => DictFormat::Tlist,
            _ => DictFormat::List,
        }
    }
}

impl FromStr for DictFormat {
    type Err = HanconvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "list" | "txt" => Ok(DictFormat::List),
            "jlist" | "json" => Ok(DictFormat::Jlist),
            "tlist" => Ok(DictFormat::Tlist),
            other => Err(HanconvError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// How a dictionary build step combines its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Load,
    Swap,
    Join,
}

impl FromStr for Mode {
    type Err = HanconvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "load" => Ok(Mode::Load),
            "swap" => Ok(Mode::Swap),
            "join" => Ok(Mode::Join),
            other => Err(HanconvError::UnsupportedMode(other.to_string())),
        }
    }
}

/// Parse the plain line format.
///
/// Blank lines and lines opening with `#` are skipped. A line without a tab
/// is the legacy shorthand for an identity entry. Extra tab-separated fields
/// beyond the second are dropped. An empty value field parses as one
/// empty-string value, which makes the entry present but inert.
pub(super) fn parse_list<D: Dict>(dict: &mut D, text: &str, _source: &str) -> Result<()> {
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('\t') {
            None => dict.add(line, std::slice::from_ref(&line.to_string()), false),
            Some((key, rest)) => {
                let field = rest.split('\t').next().unwrap_or(rest);
                let values: Vec<String> = field.split(' ').map(str::to_string).collect();
                dict.add(key, &values, false);
            }
        }
    }
    Ok(())
}

/// Parse flat JSON: an object of key -> values, where a value may be a single
/// string or an array of strings, or an array of `[key, values]` pairs.
pub(super) fn parse_flat_json<D: Dict>(dict: &mut D, text: &str, source: &str) -> Result<()> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| HanconvError::malformed(source, e.to_string()))?;
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                add_json_entry(dict, &key, v, source)?;
            }
        }
        Value::Array(pairs) => {
            for pair in pairs {
                let Value::Array(mut kv) = pair else {
                    return Err(HanconvError::malformed(source, "expected a [key, values] pair"));
                };
                if kv.len() != 2 {
                    return Err(HanconvError::malformed(source, "expected a [key, values] pair"));
                }
                let v = kv.pop().unwrap_or(Value::Null);
                let Some(Value::String(key)) = kv.pop() else {
                    return Err(HanconvError::malformed(source, "pair key must be a string"));
                };
                add_json_entry(dict, &key, v, source)?;
            }
        }
        _ => {
            return Err(HanconvError::malformed(
                source,
                "expected an object or an array of pairs",
            ));
        }
    }
    Ok(())
}

fn add_json_entry<D: Dict>(dict: &mut D, key: &str, value: Value, source: &str) -> Result<()> {
    let values = json_values(value, key, source)?;
    dict.add(key, &values, false);
    Ok(())
}

fn json_values(value: Value, key: &str, source: &str) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(HanconvError::malformed(
                    source,
                    format!("non-string value for key {key:?}"),
                )),
            })
            .collect(),
        _ => Err(HanconvError::malformed(
            source,
            format!("value for key {key:?} must be a string or array"),
        )),
    }
}

/// Parse nested trie JSON: each level maps a unit to a child object, with the
/// values of a completed key under the empty-string terminal.
pub(super) fn parse_trie_json<D: Dict>(dict: &mut D, text: &str, source: &str) -> Result<()> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| HanconvError::malformed(source, e.to_string()))?;
    let Value::Object(root) = value else {
        return Err(HanconvError::malformed(source, "expected a nested object"));
    };
    let mut prefix = String::new();
    walk_trie_json(dict, &mut prefix, root, source)
}

fn walk_trie_json<D: Dict>(
    dict: &mut D,
    prefix: &mut String,
    map: Map<String, Value>,
    source: &str,
) -> Result<()> {
    for (unit, value) in map {
        if unit.is_empty() {
            let key = prefix.clone();
            let values = json_values(value, &key, source)?;
            dict.add(&key, &values, false);
        } else {
            let Value::Object(child) = value else {
                return Err(HanconvError::malformed(
                    source,
                    format!("expected an object under unit {unit:?}"),
                ));
            };
            let len = prefix.len();
            prefix.push_str(&unit);
            walk_trie_json(dict, prefix, child, source)?;
            prefix.truncate(len);
        }
    }
    Ok(())
}

fn bad_key(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
}

fn bad_value(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Write the plain line format, optionally sorted by key. Under `check`, an
/// entry containing a record or field separator aborts the dump with nothing
/// written.
pub(super) fn dump_list<D: Dict>(
    dict: &D,
    writer: &mut impl Write,
    sort: bool,
    check: bool,
) -> Result<()> {
    let mut entries = dict.entries();
    if sort {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
    }
    let mut out = String::new();
    for (key, values) in &entries {
        if check && (key.contains(bad_key) || values.iter().any(|v| v.contains(bad_value))) {
            return Err(HanconvError::InvalidRecord { key: key.clone() });
        }
        out.push_str(key);
        out.push('\t');
        out.push_str(&values.join(" "));
        out.push('\n');
    }
    writer.write_all(out.as_bytes())?;
    Ok(())
}

/// Write flat JSON in iteration order.
pub(super) fn dump_flat_json<D: Dict>(dict: &D, writer: &mut impl Write) -> Result<()> {
    let mut map = Map::new();
    for (key, values) in dict.iter() {
        let values = values.iter().cloned().map(Value::String).collect();
        map.insert(key, Value::Array(values));
    }
    serde_json::to_writer(&mut *writer, &Value::Object(map))?;
    Ok(())
}

/// Write nested trie JSON. Works for any backend; for a [`super::Trie`] the
/// output mirrors its node structure.
pub(super) fn dump_trie_json<D: Dict>(dict: &D, writer: &mut impl Write) -> Result<()> {
    let mut root = Map::new();
    for (key, values) in dict.iter() {
        let mut node = &mut root;
        for unit in unicode::split(&key) {
            node = node
                .entry(unit)
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| {
                    HanconvError::malformed("trie dump", format!("unit path collides in {key:?}"))
                })?;
        }
        let values = values.iter().cloned().map(Value::String).collect();
        node.insert(String::new(), Value::Array(values));
    }
    serde_json::to_writer(&mut *writer, &Value::Object(root))?;
    Ok(())
}
