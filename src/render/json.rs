//! JSON rendering of the interchange projection.

use crate::error::Result;
use crate::model::{DocumentTree, ElementDict};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a tree to JSON.
///
/// The output is the projection returned by [`DocumentTree::to_dict`]:
/// categories, children in order and one resolved value per property.
pub fn to_json(tree: &DocumentTree, format: JsonFormat) -> Result<String> {
    let dict = tree.to_dict();
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&dict)?,
        JsonFormat::Compact => serde_json::to_string(&dict)?,
    };
    Ok(json)
}

/// Parse a tree from its JSON projection.
pub fn from_json(json: &str) -> Result<DocumentTree> {
    let dict: ElementDict = serde_json::from_str(json)?;
    DocumentTree::from_dict(&dict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ElementType, Region};

    fn sample() -> DocumentTree {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let para = tree.create(ElementType::Paragraph);
        tree.set_text(para, "Hello", "ocr", 0.4).unwrap();
        tree.set_text(para, "Hallo", "ocr", 0.3).unwrap();
        tree.set_region(para, Region::new(1, 2.0, 3.0, 4.0, 5.0), "detector", 1.0)
            .unwrap();
        tree.add_child(root, para).unwrap();
        tree
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"paragraph\""));
        assert!(json.contains("Hello"));
        assert!(!json.contains("Hallo"));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
    }

    #[test]
    fn test_from_json_rebuilds_projection() {
        let tree = sample();
        let json = to_json(&tree, JsonFormat::Compact).unwrap();
        let rebuilt = from_json(&json).unwrap();
        assert_eq!(rebuilt.to_dict(), tree.to_dict());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(from_json("{\"category\": 7}"), Err(Error::Json(_))));
    }
}
