//! Confidence-weighted property assertions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Region;
use crate::error::{Error, Result};

/// Value carried by a property assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// No value; the assertion itself is the evidence
    Null,
    /// Boolean flag
    Flag(bool),
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
    /// Page geometry
    Region(Region),
}

impl PropertyValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Region content, if this is a region.
    pub fn as_region(&self) -> Option<&Region> {
        match self {
            PropertyValue::Region(r) => Some(r),
            _ => None,
        }
    }

    /// Flag content, if this is a boolean.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Flag(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Region(r) => write!(
                f,
                "page {} @ ({}, {}) {}x{}",
                r.page_no, r.x, r.y, r.width, r.height
            ),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Flag(b)
    }
}

impl From<Region> for PropertyValue {
    fn from(r: Region) -> Self {
        PropertyValue::Region(r)
    }
}

/// A single source-attributed assertion about an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property key (e.g. `"text"`, `"region"`)
    pub key: String,
    /// Asserted value
    pub value: PropertyValue,
    /// Name of the stage that made the assertion
    pub source: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

impl Property {
    /// Create a new assertion.
    ///
    /// Fails with [`Error::InvalidConfidence`] if `confidence` lies outside
    /// `[0, 1]` (NaN included).
    pub fn new(
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        source: impl Into<String>,
        confidence: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidConfidence(confidence));
        }
        Ok(Self {
            key: key.into(),
            value: value.into(),
            source: source.into(),
            confidence,
        })
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}: {})",
            self.key, self.value, self.source, self.confidence
        )
    }
}

/// Append-only, multi-valued property store.
///
/// Assertions are kept per key in insertion order. Resolution picks the
/// assertion with the strictly greatest confidence; on ties the
/// first-inserted assertion wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    entries: BTreeMap<String, Vec<Property>>,
}

impl PropertyBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an assertion.
    pub fn insert(&mut self, property: Property) {
        self.entries
            .entry(property.key.clone())
            .or_default()
            .push(property);
    }

    /// All assertions for a key, in insertion order.
    pub fn assertions(&self, key: &str) -> &[Property] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The winning assertion for a key.
    pub fn resolve(&self, key: &str) -> Option<&Property> {
        let mut strongest: Option<&Property> = None;
        for prop in self.assertions(key) {
            // Strict comparison: equal confidence never displaces an earlier entry.
            if strongest.map_or(true, |s| prop.confidence > s.confidence) {
                strongest = Some(prop);
            }
        }
        strongest
    }

    /// Resolved value for a key, or `None` if there are no assertions.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.resolve(key).map(|p| &p.value)
    }

    /// Resolved value for a key.
    ///
    /// Fails with [`Error::PropertyNotFound`] if there are no assertions.
    pub fn get_property(&self, key: &str) -> Result<&PropertyValue> {
        self.get(key)
            .ok_or_else(|| Error::PropertyNotFound(key.to_string()))
    }

    /// Whether any assertion exists for the key.
    pub fn contains_key(&self, key: &str) -> bool {
        !self.assertions(key).is_empty()
    }

    /// Keys with at least one assertion, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.as_str())
    }

    /// Resolved value per key, in sorted key order.
    pub fn resolved(&self) -> BTreeMap<String, PropertyValue> {
        self.keys()
            .filter_map(|k| self.get(k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    /// Iterate over every assertion, grouped by key.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.entries.values().flatten()
    }

    /// Number of keys with assertions.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    /// Whether the bag holds no assertions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
