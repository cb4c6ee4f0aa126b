//! # semdoc
//!
//! Reconstruction of semantic document trees from physically detected page
//! regions.
//!
//! Detectors and recognizers produce a flat set of primitives per page
//! (text lines, table areas, figures, each carrying a `region` and possibly
//! a `text` property). The logical pipeline groups them spatially, turns
//! table areas into tables, relabels text containers as headings and
//! paragraphs and tidies the result into a valid logical hierarchy.
//!
//! ## Quick Start
//!
//! ```
//! use semdoc::{DocumentTree, ElementType, Region};
//!
//! fn main() -> semdoc::Result<()> {
//!     let mut tree = DocumentTree::with_root(ElementType::Page);
//!     let page = tree.root();
//!
//!     let line = tree.create(ElementType::TextLine);
//!     tree.set_region(line, Region::new(0, 10.0, 10.0, 200.0, 20.0), "detector", 1.0)?;
//!     tree.set_text(line, "Hello, world!", "ocr", 0.95)?;
//!     tree.add_child(page, line)?;
//!
//!     let tree = semdoc::reconstruct(tree)?;
//!     let json = semdoc::render::to_json(&tree, semdoc::JsonFormat::Pretty)?;
//!     println!("{}", json);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Confidence-weighted properties**: every value keeps its assertion
//!   history; readers see the most confident one
//! - **Pluggable stages**: anything implementing [`Analyzer`] composes with
//!   [`Sequential`]
//! - **Parallel page planning**: uses Rayon for multi-page documents
//! - **Diagnostics**: non-fatal anomalies go to an injectable sink

pub mod analyzer;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod render;

// Re-export commonly used types
pub use analyzer::{
    Analyzer, HeadingLevelTidier, Logicalizer, LogicalizerConfig, NonBlockWrapper, Organizer,
    OrganizerConfig, PipelineConfig, Sequential, TableConfig, Tablelizer,
};
pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsCollector, LogDiagnostics, Severity};
pub use error::{Error, Result};
pub use model::{
    DocumentTree, Element, ElementDict, ElementId, ElementType, Property, PropertyBag,
    PropertyValue, Region,
};
pub use render::JsonFormat;

/// Run the logical pipeline with default options.
///
/// # Example
///
/// ```
/// use semdoc::{DocumentTree, ElementType};
///
/// let tree = semdoc::reconstruct(DocumentTree::with_root(ElementType::Page)).unwrap();
/// assert_eq!(tree.category(tree.root()), ElementType::Document);
/// ```
pub fn reconstruct(tree: DocumentTree) -> Result<DocumentTree> {
    reconstruct_with_config(tree, &PipelineConfig::default())
}

/// Run the logical pipeline with custom options.
///
/// The configuration is validated first.
pub fn reconstruct_with_config(tree: DocumentTree, config: &PipelineConfig) -> Result<DocumentTree> {
    config.validate()?;
    Sequential::logical(config).run(tree)
}
