//! Client-visible header representation.
//!
//! # Design Decisions
//! - A name that occurs once maps to `Single`, repeated names map to `Multi`
//! - `Multi` keeps the original order; values are never joined with commas
//! - Names are stored as given; lookups are ASCII case-insensitive

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::DispatchError;

/// Value(s) of one header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderField {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderField {
    /// Iterate the values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderField::Single(value) => std::slice::from_ref(value),
            HeaderField::Multi(values) => values,
        };
        values.iter().map(String::as_str)
    }

    /// The single value, or the first of several.
    pub fn first(&self) -> Option<&str> {
        self.values().next()
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderField::Single(first) => {
                let first = std::mem::take(first);
                *self = HeaderField::Multi(vec![first, value]);
            }
            HeaderField::Multi(values) => values.push(value),
        }
    }
}

impl From<&str> for HeaderField {
    fn from(value: &str) -> Self {
        HeaderField::Single(value.to_string())
    }
}

impl From<String> for HeaderField {
    fn from(value: String) -> Self {
        HeaderField::Single(value)
    }
}

impl From<Vec<String>> for HeaderField {
    fn from(values: Vec<String>) -> Self {
        HeaderField::Multi(values)
    }
}

impl<const N: usize> From<[&str; N]> for HeaderField {
    fn from(values: [&str; N]) -> Self {
        HeaderField::Multi(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Ordered header set with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderField)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any field stored under exactly the same name.
    pub fn insert(&mut self, name: impl Into<String>, field: impl Into<HeaderField>) {
        let name = name.into();
        let field = field.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = field,
            None => self.entries.push((name, field)),
        }
    }

    /// Add one value under `name`, turning an existing single value into a sequence.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((name, HeaderField::Single(value))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderField> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| field)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderField)> {
        self.entries.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group a `HeaderMap` by name, keeping repeated values in order.
    ///
    /// Values that are not valid UTF-8 are decoded lossily.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Headers::new();
        for name in map.keys() {
            let mut values: Vec<String> = map
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            let field = if values.len() == 1 {
                HeaderField::Single(values.remove(0))
            } else {
                HeaderField::Multi(values)
            };
            headers.entries.push((name.as_str().to_string(), field));
        }
        headers
    }

    /// Build a `HeaderMap`, one header line per value.
    pub fn to_header_map(&self) -> Result<HeaderMap, DispatchError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, field) in &self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DispatchError::InvalidRequest(format!("header name `{name}`: {e}")))?;
            for value in field.values() {
                let header_value = HeaderValue::from_str(value)
                    .map_err(|e| DispatchError::InvalidRequest(format!("header `{name}`: {e}")))?;
                map.append(header_name.clone(), header_value);
            }
        }
        Ok(map)
    }
}

impl<N, F> FromIterator<(N, F)> for Headers
where
    N: Into<String>,
    F: Into<HeaderField>,
{
    fn from_iter<I: IntoIterator<Item = (N, F)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, field) in iter {
            headers.insert(name, field);
        }
        headers
    }
}
