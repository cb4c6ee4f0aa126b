//! Tree node data.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ElementType, Property, PropertyBag, PropertyValue, Region};
use crate::error::Result;

/// Key of the text property.
pub const TEXT_KEY: &str = "text";

/// Key of the region property.
pub const REGION_KEY: &str = "region";

/// Handle of an element inside a [`DocumentTree`](super::DocumentTree).
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Arena index of the element.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the document tree.
///
/// An element is characterized by its category, the region of the physical
/// document it refers to, and the properties asserted about it. Structure
/// (parent and children) is owned by the tree; the element only records the
/// handles.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) category: ElementType,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) properties: PropertyBag,
}

impl Element {
    pub(crate) fn new(category: ElementType) -> Self {
        Self {
            category,
            parent: None,
            children: Vec::new(),
            properties: PropertyBag::new(),
        }
    }

    /// Category of the element.
    pub fn category(&self) -> ElementType {
        self.category
    }

    /// Parent handle, `None` for roots and detached elements.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Child handles in document order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the element has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All asserted properties.
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Append an assertion. Never overwrites earlier assertions.
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        source: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        let property = Property::new(key, value, source, confidence)?;
        self.properties.insert(property);
        Ok(())
    }

    /// Resolved value of a key; fails if the key has no assertions.
    pub fn get_property(&self, key: &str) -> Result<&PropertyValue> {
        self.properties.get_property(key)
    }

    /// Resolved value of a key, `None` if absent.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Assert a text value.
    pub fn set_text(&mut self, text: impl Into<String>, source: impl Into<String>, confidence: f64) -> Result<()> {
        self.set_property(TEXT_KEY, PropertyValue::Text(text.into()), source, confidence)
    }

    /// Resolved text, or the empty string when none was asserted.
    pub fn text(&self) -> &str {
        self.get(TEXT_KEY).and_then(PropertyValue::as_text).unwrap_or("")
    }

    /// Resolved region, if one was asserted.
    pub fn region(&self) -> Option<Region> {
        self.get(REGION_KEY).and_then(PropertyValue::as_region).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_text_defaults_to_empty() {
        let element = Element::new(ElementType::Page);
        assert_eq!(element.text(), "");
        assert!(element.region().is_none());
    }

    #[test]
    fn test_set_property_appends() {
        let mut element = Element::new(ElementType::TextLine);
        element.set_text("first", "ocr-a", 0.4).unwrap();
        element.set_text("second", "ocr-b", 0.7).unwrap();
        assert_eq!(element.text(), "second");
        assert_eq!(element.properties().assertions(TEXT_KEY).len(), 2);
    }

    #[test]
    fn test_invalid_confidence_leaves_element_unchanged() {
        let mut element = Element::new(ElementType::TextLine);
        let err = element.set_text("x", "ocr", 2.0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfidence(_)));
        assert!(element.properties().is_empty());
    }
}
