//! Document tree model.
//!
//! This module defines the node representation shared by every pipeline
//! stage: categories, page geometry, confidence-weighted properties and the
//! arena-backed tree that owns the elements.

mod category;
mod dict;
mod element;
pub mod ordering;
mod property;
mod region;
mod tree;

pub use category::ElementType;
pub use dict::ElementDict;
pub use element::{Element, ElementId, REGION_KEY, TEXT_KEY};
pub use property::{Property, PropertyBag, PropertyValue};
pub use region::Region;
pub use tree::{Ancestors, Descendants, DocumentTree, InvariantViolation, INTERCHANGE_SOURCE};
