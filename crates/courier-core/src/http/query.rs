//! URL query merging
//!
//! Two merge modes exist. [`merge_params`] *sets* each key, replacing any
//! values already in the URL. [`merge_struct`] *appends* the encoded values
//! of a structured object, leaving existing values in place. Either way the
//! query is re-encoded with keys in sorted order; scheme, host, path and
//! fragment are left untouched.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use url::form_urlencoded;
use url::Url;

use crate::http::options::Encodable;
use crate::{Error, Result};

/// Ordered query multimap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(BTreeMap<String, Vec<String>>);

impl QueryValues {
    /// Parse a raw query string, rejecting malformed percent-escapes
    pub fn parse(raw: &str) -> Result<Self> {
        validate_escapes(raw)?;
        let mut values = QueryValues::default();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            values.add(key.into_owned(), value.into_owned());
        }
        Ok(values)
    }

    /// Replace every value of `key`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Append a value to `key`
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-encode, keys sorted, values in insertion order
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.0 {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

/// Merge `params` into `url`, overwriting same-named values
pub fn merge_params(url: &str, params: &HashMap<String, String>) -> Result<String> {
    let mut parsed = parse_url(url)?;
    let mut query = QueryValues::parse(parsed.query().unwrap_or_default())?;

    for (key, value) in params {
        query.set(key.as_str(), value.as_str());
    }

    Ok(reassemble(&mut parsed, &query))
}

/// Merge the encoded fields of `object` into `url`, appending to existing values
pub fn merge_struct(url: &str, object: &dyn Encodable) -> Result<String> {
    let mut parsed = parse_url(url)?;
    let mut query = QueryValues::parse(parsed.query().unwrap_or_default())?;

    for (key, value) in encode_struct(object)? {
        query.add(key, value);
    }

    Ok(reassemble(&mut parsed, &query))
}

/// Flatten a serializable object into query pairs
///
/// Scalars become strings, `null` is skipped, sequences become repeated
/// keys and nested objects become `parent[child]`.
pub fn encode_struct(object: &dyn Encodable) -> Result<Vec<(String, String)>> {
    let value = object.to_json_value().map_err(|source| Error::Query {
        message: "failed to encode query object".to_string(),
        source: Some(source),
    })?;

    let mut pairs = Vec::new();
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (key, field) in &fields {
                flatten(key, field, &mut pairs);
            }
        }
        other => {
            return Err(Error::Query {
                message: format!("query object must serialize to a map, got {}", kind_of(&other)),
                source: None,
            })
        }
    }
    Ok(pairs)
}

fn flatten(key: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key.to_string(), b.to_string())),
        Value::Number(n) => pairs.push((key.to_string(), n.to_string())),
        Value::String(s) => pairs.push((key.to_string(), s.clone())),
        Value::Array(items) => {
            for item in items {
                flatten(key, item, pairs);
            }
        }
        Value::Object(fields) => {
            for (child, field) in fields {
                flatten(&format!("{}[{}]", key, child), field, pairs);
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a map",
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::invalid_url(format!("cannot parse {:?}", url), e))
}

fn reassemble(url: &mut Url, query: &QueryValues) -> String {
    if query.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&query.encode()));
    }
    url.to_string()
}

fn validate_escapes(raw: &str) -> Result<()> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(Error::Query {
                    message: format!("invalid escape {:?} in query", &raw[i..end]),
                    source: None,
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
