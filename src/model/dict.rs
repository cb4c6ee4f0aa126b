//! Interchange projection of a tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ElementType, PropertyValue};

/// Plain, recursive projection of an element.
///
/// Carries only the resolved value per property key; the assertion history
/// (sources, confidences, losing values) is not part of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDict {
    /// Category of the element
    pub category: ElementType,
    /// Children in document order
    #[serde(default)]
    pub children: Vec<ElementDict>,
    /// Resolved value per property key
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ElementDict {
    /// Resolved text, empty when absent.
    pub fn text(&self) -> &str {
        self.properties
            .get(super::TEXT_KEY)
            .and_then(PropertyValue::as_text)
            .unwrap_or("")
    }

    /// Children with the given category.
    pub fn children_of(&self, category: ElementType) -> impl Iterator<Item = &ElementDict> {
        self.children.iter().filter(move |c| c.category == category)
    }

    /// Number of elements in this subtree, self included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ElementDict::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let dict = ElementDict {
            category: ElementType::Paragraph,
            children: vec![],
            properties: BTreeMap::from([(
                "text".to_string(),
                PropertyValue::from("Bye."),
            )]),
        };
        let json = serde_json::to_value(&dict).unwrap();
        assert_eq!(json["category"], "paragraph");
        assert_eq!(json["properties"]["text"], "Bye.");
        assert!(json["children"].as_array().unwrap().is_empty());
        assert_eq!(dict.text(), "Bye.");
        assert_eq!(dict.count(), 1);
    }

    #[test]
    fn test_parse_minimal_form() {
        let dict: ElementDict =
            serde_json::from_str(r#"{"category": "document", "children": [{"category": "page"}]}"#)
                .unwrap();
        assert_eq!(dict.children_of(ElementType::Page).count(), 1);
        assert!(dict.properties.is_empty());
    }
}
