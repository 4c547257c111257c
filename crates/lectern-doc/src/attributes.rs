//! Conversion attributes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::blocks::BlockMap;

static ATTRIBUTE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_][A-Za-z0-9_-]*)\}").expect("valid regex"));

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Bool(bool),
}

impl AttributeValue {
    /// Text form of the value. Booleans render as `true`/`false`.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Whether the value counts as enabled.
    ///
    /// `false`, `"false"`, `"no"`, `"off"` and `"0"` are disabled; everything
    /// else, including an empty string, is enabled.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(t) => !matches!(
                t.trim().to_ascii_lowercase().as_str(),
                "false" | "no" | "off" | "0"
            ),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(t) => serializer.serialize_str(t),
            Self::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Value shapes accepted from YAML and TOML.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Unset(()),
    List(Vec<RawValue>),
    Other(IgnoredAny),
}

impl RawValue {
    /// Scalars map directly and lists of scalars join with commas.
    fn into_value(self) -> Option<AttributeValue> {
        match self {
            Self::Bool(b) => Some(AttributeValue::Bool(b)),
            Self::Int(i) => Some(AttributeValue::Text(i.to_string())),
            Self::Float(f) => Some(AttributeValue::Text(f.to_string())),
            Self::Text(t) => Some(AttributeValue::Text(t)),
            Self::Unset(()) => Some(AttributeValue::Text(String::new())),
            Self::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Self::List(_) | Self::Other(_) => None,
                    scalar => scalar.into_value().map(|v| v.as_text()),
                })
                .collect::<Option<Vec<_>>>()
                .map(|parts| AttributeValue::Text(parts.join(","))),
            Self::Other(_) => None,
        }
    }
}

/// Named options controlling how a document is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeSet {
    entries: BTreeMap<String, AttributeValue>,
}

impl<'de> Deserialize<'de> for AttributeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawValue>::deserialize(deserializer)?;
        let mut set = Self::new();

        for (name, value) in raw {
            match value.into_value() {
                Some(value) => set.set(name, value),
                None => tracing::warn!(
                    "Ignoring attribute '{}': only scalars and lists of scalars are supported",
                    name
                ),
            }
        }

        Ok(set)
    }
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Builder form of [`AttributeSet::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }

    /// Text value of an attribute, if set.
    pub fn text(&self, name: &str) -> Option<String> {
        self.entries.get(name).map(AttributeValue::as_text)
    }

    /// Text value of an attribute, or `default` when unset.
    pub fn text_or(&self, name: &str, default: &str) -> String {
        self.text(name).unwrap_or_else(|| default.to_string())
    }

    /// Whether an attribute is set and enabled.
    pub fn flag(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(AttributeValue::is_enabled)
    }

    /// Overlay `other` onto this set. Values in `other` win.
    pub fn merge(&mut self, other: &AttributeSet) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace `{name}` references in body text with attribute values.
    ///
    /// Code blocks are left alone, as are references to unset attributes.
    pub fn substitute(&self, body: &str) -> String {
        let blocks = BlockMap::new(body);
        let mut out = String::with_capacity(body.len());
        let mut offset = 0;

        for line in body.split_inclusive('\n') {
            let start = offset;
            offset += line.len();
            if blocks.in_code(start..offset) {
                out.push_str(line);
                continue;
            }
            let replaced = ATTRIBUTE_REF.replace_all(line, |caps: &Captures| {
                match self.entries.get(&caps[1]) {
                    Some(value) => value.as_text(),
                    None => caps[0].to_string(),
                }
            });
            out.push_str(&replaced);
        }

        out
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.set(name, value);
        }
        set
    }
}
