//! Element categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The category of an element.
///
/// Categories name physical propositions (a text line, a table area),
/// organizational ones (a page, a partition) or logical ones (a heading,
/// a paragraph). Capability flags are derived from the category by
/// exhaustive matches, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// The whole document
    Document,
    /// A physical page
    Page,
    /// A first level heading
    Heading1,
    /// A second level heading
    Heading2,
    /// A third level heading
    Heading3,
    /// A fourth level heading
    Heading4,
    /// A fifth level heading
    Heading5,
    /// A sixth level heading
    Heading6,
    /// A logical paragraph of text
    Paragraph,
    /// A physical box containing text
    TextArea,
    /// A physical box containing the depiction of a table
    TableArea,
    /// A physical area of some significance (e.g. a column)
    Partition,
    /// A physical area containing a continuous line of text
    TextLine,
    /// A logical table
    Table,
    /// A row of a logical table
    TableRow,
    /// A cell of a logical table
    TableCell,
    /// Running header of a page
    PageHeader,
    /// Running footer of a page
    PageFooter,
    /// An image or drawing
    Figure,
}

impl ElementType {
    /// All categories, in declaration order.
    pub const ALL: [ElementType; 19] = [
        ElementType::Document,
        ElementType::Page,
        ElementType::Heading1,
        ElementType::Heading2,
        ElementType::Heading3,
        ElementType::Heading4,
        ElementType::Heading5,
        ElementType::Heading6,
        ElementType::Paragraph,
        ElementType::TextArea,
        ElementType::TableArea,
        ElementType::Partition,
        ElementType::TextLine,
        ElementType::Table,
        ElementType::TableRow,
        ElementType::TableCell,
        ElementType::PageHeader,
        ElementType::PageFooter,
        ElementType::Figure,
    ];

    /// Whether the category may stand as a direct structural child of a
    /// page or partition.
    pub fn is_block(self) -> bool {
        match self {
            ElementType::Heading1
            | ElementType::Heading2
            | ElementType::Heading3
            | ElementType::Heading4
            | ElementType::Heading5
            | ElementType::Heading6
            | ElementType::Paragraph
            | ElementType::TableCell
            | ElementType::Table
            | ElementType::PageHeader
            | ElementType::PageFooter => true,
            ElementType::Document
            | ElementType::Page
            | ElementType::TextArea
            | ElementType::TableArea
            | ElementType::Partition
            | ElementType::TextLine
            | ElementType::TableRow
            | ElementType::Figure => false,
        }
    }

    /// Whether the category is one of the heading levels.
    pub fn is_heading(self) -> bool {
        self.heading_level().is_some()
    }

    /// Whether the category is an organizational container that holds blocks
    /// rather than being one.
    pub fn is_structural(self) -> bool {
        match self {
            ElementType::Document | ElementType::Page | ElementType::Partition => true,
            ElementType::Heading1
            | ElementType::Heading2
            | ElementType::Heading3
            | ElementType::Heading4
            | ElementType::Heading5
            | ElementType::Heading6
            | ElementType::Paragraph
            | ElementType::TextArea
            | ElementType::TableArea
            | ElementType::TextLine
            | ElementType::Table
            | ElementType::TableRow
            | ElementType::TableCell
            | ElementType::PageHeader
            | ElementType::PageFooter
            | ElementType::Figure => false,
        }
    }

    /// Whether the category belongs to the logical (as opposed to physical)
    /// vocabulary.
    pub fn is_logical(self) -> bool {
        match self {
            ElementType::Document
            | ElementType::Heading1
            | ElementType::Heading2
            | ElementType::Heading3
            | ElementType::Heading4
            | ElementType::Heading5
            | ElementType::Heading6
            | ElementType::Paragraph
            | ElementType::Table
            | ElementType::TableRow
            | ElementType::TableCell
            | ElementType::TextLine => true,
            ElementType::Page
            | ElementType::TextArea
            | ElementType::TableArea
            | ElementType::Partition
            | ElementType::PageHeader
            | ElementType::PageFooter
            | ElementType::Figure => false,
        }
    }

    /// Heading level (1-6), or `None` for non-headings.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            ElementType::Heading1 => Some(1),
            ElementType::Heading2 => Some(2),
            ElementType::Heading3 => Some(3),
            ElementType::Heading4 => Some(4),
            ElementType::Heading5 => Some(5),
            ElementType::Heading6 => Some(6),
            _ => None,
        }
    }

    /// Heading category for a level. Levels are clamped to 1..=6.
    pub fn heading(level: u8) -> ElementType {
        match level {
            0 | 1 => ElementType::Heading1,
            2 => ElementType::Heading2,
            3 => ElementType::Heading3,
            4 => ElementType::Heading4,
            5 => ElementType::Heading5,
            _ => ElementType::Heading6,
        }
    }

    /// Lowercase name used in the interchange form.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Document => "document",
            ElementType::Page => "page",
            ElementType::Heading1 => "heading1",
            ElementType::Heading2 => "heading2",
            ElementType::Heading3 => "heading3",
            ElementType::Heading4 => "heading4",
            ElementType::Heading5 => "heading5",
            ElementType::Heading6 => "heading6",
            ElementType::Paragraph => "paragraph",
            ElementType::TextArea => "textarea",
            ElementType::TableArea => "tablearea",
            ElementType::Partition => "partition",
            ElementType::TextLine => "textline",
            ElementType::Table => "table",
            ElementType::TableRow => "tablerow",
            ElementType::TableCell => "tablecell",
            ElementType::PageHeader => "pageheader",
            ElementType::PageFooter => "pagefooter",
            ElementType::Figure => "figure",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ElementType::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| Error::InvalidCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_flags() {
        assert!(ElementType::Paragraph.is_block());
        assert!(ElementType::Table.is_block());
        assert!(ElementType::TableCell.is_block());
        assert!(ElementType::PageFooter.is_block());
        assert!(!ElementType::TextLine.is_block());
        assert!(!ElementType::Figure.is_block());
        assert!(!ElementType::Page.is_block());
    }

    #[test]
    fn test_heading_flags() {
        for level in 1..=6 {
            let category = ElementType::heading(level);
            assert!(category.is_heading());
            assert!(category.is_block());
            assert_eq!(category.heading_level(), Some(level));
        }
        assert!(!ElementType::Paragraph.is_heading());
        assert_eq!(ElementType::heading(9), ElementType::Heading6);
    }

    #[test]
    fn test_parse_round_trip_names() {
        for category in ElementType::ALL {
            let parsed: ElementType = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert_eq!("TextArea".parse::<ElementType>().unwrap(), ElementType::TextArea);
        assert!(matches!(
            "sidebar".parse::<ElementType>(),
            Err(Error::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_serde_name_matches_display() {
        let json = serde_json::to_string(&ElementType::PageHeader).unwrap();
        assert_eq!(json, "\"pageheader\"");
    }
}
