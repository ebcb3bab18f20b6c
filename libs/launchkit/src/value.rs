//! `LaunchValue`, the structured data a supervisor answers with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::os::fd::RawFd;

/// Structured data exchanged with the supervisor.
///
/// Mirrors the launch data types: dictionaries, arrays and scalars. When a
/// value goes through serde, descriptors and errno values serialize as plain
/// integers and opaque data as an array of bytes; reading them back yields
/// [`LaunchValue::Integer`] and [`LaunchValue::Array`]. Accessors such as
/// [`LaunchValue::as_integer`] therefore accept all integer-like variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaunchValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    Array(Vec<LaunchValue>),
    Dictionary(BTreeMap<String, LaunchValue>),
    #[serde(skip_deserializing)]
    Fd(RawFd),
    #[serde(skip_deserializing)]
    Errno(i32),
    #[serde(skip_deserializing)]
    Opaque(Vec<u8>),
}

impl LaunchValue {
    /// Build a dictionary from key/value pairs.
    #[must_use]
    pub fn dictionary<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, LaunchValue)>,
    {
        Self::Dictionary(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build an array of descriptor values.
    #[must_use]
    pub fn fds<I: IntoIterator<Item = RawFd>>(fds: I) -> Self {
        Self::Array(fds.into_iter().map(Self::Fd).collect())
    }

    #[must_use]
    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, LaunchValue>> {
        match self {
            Self::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[LaunchValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of integer, descriptor and errno values.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Fd(fd) => Some(i64::from(*fd)),
            Self::Errno(code) => Some(i64::from(*code)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look a key up when this value is a dictionary.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LaunchValue> {
        self.as_dictionary().and_then(|map| map.get(key))
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Fd(_) => "fd",
            Self::Errno(_) => "errno",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl From<bool> for LaunchValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for LaunchValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for LaunchValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for LaunchValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<LaunchValue>> for LaunchValue {
    fn from(value: Vec<LaunchValue>) -> Self {
        Self::Array(value)
    }
}
