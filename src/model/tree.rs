//! Arena-backed document tree.

use std::fmt;
use std::sync::Arc;

use super::ordering::sort_geometric;
use super::{Element, ElementDict, ElementId, ElementType, PropertyValue, Region, REGION_KEY};
use crate::diagnostics::{Diagnostic, Diagnostics, LogDiagnostics};
use crate::error::{Error, Result};

/// Source tag used for properties restored from the interchange form.
pub const INTERCHANGE_SOURCE: &str = "interchange";

/// A document tree.
///
/// Elements live in an arena owned by the tree and refer to each other
/// through [`ElementId`] handles. The parent link is a plain handle and
/// never participates in ownership. Removing a child detaches it; the
/// detached element stays in the arena but is no longer reachable from the
/// root.
///
/// Methods taking an `ElementId` panic if the handle was issued by another
/// tree, like slice indexing does for an out-of-range index.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    elements: Vec<Element>,
    root: ElementId,
    diagnostics: Arc<dyn Diagnostics>,
}

impl DocumentTree {
    /// Create a tree with a `Document` root.
    pub fn new() -> Self {
        Self::with_root(ElementType::Document)
    }

    /// Create a tree whose root has the given category.
    pub fn with_root(category: ElementType) -> Self {
        Self {
            elements: vec![Element::new(category)],
            root: ElementId(0),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    /// Replace the diagnostics sink and return self.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replace the diagnostics sink.
    pub fn set_diagnostics(&mut self, diagnostics: Arc<dyn Diagnostics>) {
        self.diagnostics = diagnostics;
    }

    /// The installed diagnostics sink.
    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.diagnostics
    }

    /// Report a diagnostic to the installed sink.
    pub fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    /// Handle of the root element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Make another element the root. It is detached from its parent first.
    pub fn set_root(&mut self, id: ElementId) {
        self.detach(id);
        self.root = id;
    }

    /// Number of elements in the arena, detached ones included.
    ///
    /// Detached elements are never reclaimed, so this only grows while a
    /// tree is edited. [`compact`](Self::compact) drops them.
    pub fn arena_len(&self) -> usize {
        self.elements.len()
    }

    /// Drop every element not reachable from the root.
    ///
    /// Reachable elements keep their category, structure and full property
    /// history, renumbered in pre-order with the root first. Handles issued
    /// before the call are invalidated; the returned table maps an old
    /// handle's index to its new handle, `None` for dropped elements.
    pub fn compact(&mut self) -> Vec<Option<ElementId>> {
        let order: Vec<ElementId> = std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .collect();
        let mut remap: Vec<Option<ElementId>> = vec![None; self.elements.len()];
        for (index, old) in order.iter().enumerate() {
            remap[old.0] = Some(ElementId(index));
        }

        let mut old_elements: Vec<Option<Element>> =
            std::mem::take(&mut self.elements).into_iter().map(Some).collect();
        let mut elements = Vec::with_capacity(order.len());
        for old in &order {
            if let Some(mut element) = old_elements[old.0].take() {
                element.parent = element.parent.and_then(|p| remap[p.0]);
                element.children = element.children.iter().filter_map(|c| remap[c.0]).collect();
                elements.push(element);
            }
        }

        log::debug!(
            "DocumentTree: compacted {} elements into {}",
            remap.len(),
            elements.len()
        );
        self.elements = elements;
        self.root = ElementId(0);
        remap
    }

    /// Number of elements reachable from the root.
    pub fn len(&self) -> usize {
        1 + self.descendants(self.root).count()
    }

    /// A tree always has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Create a detached element.
    ///
    /// The element gets the next arena slot; slots are not reused.
    pub fn create(&mut self, category: ElementType) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(Element::new(category));
        id
    }

    /// Borrow an element.
    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    fn element_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0]
    }

    /// Category of an element.
    pub fn category(&self, id: ElementId) -> ElementType {
        self.element(id).category
    }

    /// Relabel an element.
    pub fn set_category(&mut self, id: ElementId, category: ElementType) {
        self.element_mut(id).category = category;
    }

    /// Parent of an element.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).parent
    }

    /// Children of an element in document order.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.element(id).children
    }

    /// Whether `ancestor` lies on the path from `id` to its root (inclusive).
    pub fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// Iterate over the proper ancestors of an element, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Append a child. A child that already has a parent is moved.
    ///
    /// Fails with [`Error::CycleDetected`] if `child` is `parent` or one of
    /// its ancestors.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Insert a child at a position (clamped to the number of children).
    pub fn insert_child(&mut self, parent: ElementId, index: usize, child: ElementId) -> Result<()> {
        if self.is_ancestor(child, parent) {
            return Err(Error::CycleDetected {
                parent: parent.0,
                child: child.0,
            });
        }
        self.detach(child);
        let children = &mut self.element_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.element_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Remove a child from a parent.
    ///
    /// Returns `true` if the child was removed. Removing an element that is
    /// not a child leaves the tree unchanged and reports
    /// [`Diagnostic::DetachedChild`].
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        let position = self.children(parent).iter().position(|c| *c == child);
        match position {
            Some(index) => {
                self.element_mut(parent).children.remove(index);
                self.element_mut(child).parent = None;
                true
            }
            None => {
                self.report(Diagnostic::DetachedChild { parent, child });
                false
            }
        }
    }

    /// Put `replacement` in the position `old` occupies under `parent`.
    ///
    /// `old` is detached. Returns `false` (and reports) if `old` is not a
    /// child of `parent`.
    pub fn replace_child(
        &mut self,
        parent: ElementId,
        old: ElementId,
        replacement: ElementId,
    ) -> Result<bool> {
        let Some(index) = self.children(parent).iter().position(|c| *c == old) else {
            self.report(Diagnostic::DetachedChild { parent, child: old });
            return Ok(false);
        };
        if self.is_ancestor(replacement, parent) {
            return Err(Error::CycleDetected {
                parent: parent.0,
                child: replacement.0,
            });
        }
        self.detach(replacement);
        // Detaching the replacement may have shifted `old` if they were siblings.
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == old)
            .unwrap_or(index);
        self.element_mut(parent).children[index] = replacement;
        self.element_mut(replacement).parent = Some(parent);
        self.element_mut(old).parent = None;
        Ok(true)
    }

    /// Replace the whole child list of an element.
    ///
    /// Previous children that are not in the new list are detached.
    pub fn set_children(&mut self, parent: ElementId, children: Vec<ElementId>) -> Result<()> {
        for child in &children {
            if self.is_ancestor(*child, parent) {
                return Err(Error::CycleDetected {
                    parent: parent.0,
                    child: child.0,
                });
            }
        }
        let previous = std::mem::take(&mut self.element_mut(parent).children);
        for child in previous {
            self.element_mut(child).parent = None;
        }
        for child in children {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.element(id).parent {
            self.element_mut(parent).children.retain(|c| *c != id);
            self.element_mut(id).parent = None;
        }
    }

    /// Append a property assertion to an element.
    pub fn set_property(
        &mut self,
        id: ElementId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        source: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        self.element_mut(id)
            .set_property(key, value, source, confidence)
    }

    /// Resolved value of a property; fails if the key has no assertions.
    pub fn get_property(&self, id: ElementId, key: &str) -> Result<&PropertyValue> {
        self.element(id).get_property(key)
    }

    /// Resolved value of a property, `None` if absent.
    pub fn get(&self, id: ElementId, key: &str) -> Option<&PropertyValue> {
        self.element(id).get(key)
    }

    /// Assert a text value.
    pub fn set_text(
        &mut self,
        id: ElementId,
        text: impl Into<String>,
        source: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        self.element_mut(id).set_text(text, source, confidence)
    }

    /// Resolved text of an element, empty when absent.
    pub fn text(&self, id: ElementId) -> &str {
        self.element(id).text()
    }

    /// Assert a region.
    pub fn set_region(
        &mut self,
        id: ElementId,
        region: Region,
        source: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        self.set_property(id, REGION_KEY, region, source, confidence)
    }

    /// Resolved region of an element.
    pub fn region(&self, id: ElementId) -> Option<Region> {
        self.element(id).region()
    }

    /// Regions of an element and all its descendants, in pre-order.
    pub fn iter_regions(&self, id: ElementId) -> impl Iterator<Item = Region> + '_ {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(move |e| self.region(e))
    }

    /// Own text if present, otherwise the non-empty texts of the children
    /// joined by spaces.
    pub fn text_content(&self, id: ElementId) -> String {
        let own = self.text(id);
        if !own.is_empty() {
            return own.to_string();
        }
        self.children(id)
            .iter()
            .map(|c| self.text_content(*c))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pre-order traversal of the descendants of an element (excluding it).
    pub fn descendants(&self, id: ElementId) -> Descendants<'_> {
        let mut stack: Vec<ElementId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Pre-order traversal visiting siblings in reading order.
    ///
    /// Every descendant is traversed; only those matching `filter` are
    /// returned.
    pub fn iter_sorted<F>(&self, id: ElementId, filter: F) -> Vec<ElementId>
    where
        F: Fn(&DocumentTree, ElementId) -> bool,
    {
        let mut out = Vec::new();
        self.collect_sorted(id, &filter, &mut out);
        out
    }

    fn collect_sorted<F>(&self, id: ElementId, filter: &F, out: &mut Vec<ElementId>)
    where
        F: Fn(&DocumentTree, ElementId) -> bool,
    {
        let mut children = self.children(id).to_vec();
        sort_geometric(self, &mut children);
        for child in children {
            if filter(self, child) {
                out.push(child);
            }
            self.collect_sorted(child, filter, out);
        }
    }

    /// Recursive projection of the subtree rooted at the tree root.
    pub fn to_dict(&self) -> ElementDict {
        self.element_to_dict(self.root)
    }

    /// Recursive projection of the subtree rooted at `id`.
    ///
    /// Carries the category, the children in order and the resolved value
    /// per property key. Does not mutate the tree.
    pub fn element_to_dict(&self, id: ElementId) -> ElementDict {
        let element = self.element(id);
        ElementDict {
            category: element.category,
            children: element
                .children
                .iter()
                .map(|c| self.element_to_dict(*c))
                .collect(),
            properties: element.properties.resolved(),
        }
    }

    /// Rebuild a tree from its interchange projection.
    ///
    /// Each resolved value becomes a single assertion with source
    /// [`INTERCHANGE_SOURCE`] and confidence 1.0.
    pub fn from_dict(dict: &ElementDict) -> Result<Self> {
        let mut tree = Self::with_root(dict.category);
        let root = tree.root();
        tree.fill_from_dict(root, dict)?;
        Ok(tree)
    }

    fn fill_from_dict(&mut self, id: ElementId, dict: &ElementDict) -> Result<()> {
        for (key, value) in &dict.properties {
            self.set_property(id, key.clone(), value.clone(), INTERCHANGE_SOURCE, 1.0)?;
        }
        for child_dict in &dict.children {
            let child = self.create(child_dict.category);
            self.add_child(id, child)?;
            self.fill_from_dict(child, child_dict)?;
        }
        Ok(())
    }

    /// Verify the structural invariants of the reachable tree.
    ///
    /// Returns every violation found: children whose parent link disagrees
    /// with the child list, elements reachable twice (shared or cyclic), and
    /// a root that has a parent.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        if let Some(parent) = self.parent(self.root) {
            violations.push(InvariantViolation::RootHasParent {
                root: self.root,
                parent,
            });
        }

        let mut seen = vec![false; self.elements.len()];
        let mut stack = vec![self.root];
        seen[self.root.0] = true;
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                if self.parent(*child) != Some(id) {
                    violations.push(InvariantViolation::ParentMismatch {
                        parent: id,
                        child: *child,
                    });
                }
                if seen[child.0] {
                    violations.push(InvariantViolation::ReachedTwice { element: *child });
                    continue;
                }
                seen[child.0] = true;
                stack.push(*child);
            }
        }
        violations
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural invariant broken in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root is linked to a parent.
    RootHasParent {
        /// Root handle
        root: ElementId,
        /// Its parent
        parent: ElementId,
    },
    /// A child's parent link does not point at the element listing it.
    ParentMismatch {
        /// Element listing the child
        parent: ElementId,
        /// The child
        child: ElementId,
    },
    /// An element is reachable along more than one path.
    ReachedTwice {
        /// The shared element
        element: ElementId,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::RootHasParent { root, parent } => {
                write!(f, "root {} has parent {}", root, parent)
            }
            InvariantViolation::ParentMismatch { parent, child } => {
                write!(f, "child {} of {} links to another parent", child, parent)
            }
            InvariantViolation::ReachedTwice { element } => {
                write!(f, "element {} is reachable more than once", element)
            }
        }
    }
}

/// Iterator over proper ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a DocumentTree,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over descendants.
pub struct Descendants<'a> {
    tree: &'a DocumentTree,
    stack: Vec<ElementId>,
}

impl Iterator for Descendants<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsCollector;

    fn line(tree: &mut DocumentTree, text: &str) -> ElementId {
        let id = tree.create(ElementType::TextLine);
        tree.set_text(id, text, "test", 1.0).unwrap();
        id
    }

    #[test]
    fn test_add_child_links_parent() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let page = tree.create(ElementType::Page);
        tree.add_child(root, page).unwrap();

        assert_eq!(tree.parent(page), Some(root));
        assert_eq!(tree.children(root), &[page]);
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_add_child_moves_between_parents() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let a = tree.create(ElementType::Page);
        let b = tree.create(ElementType::Page);
        let l = line(&mut tree, "x");
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        tree.add_child(a, l).unwrap();
        tree.add_child(b, l).unwrap();

        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[l]);
        assert_eq!(tree.parent(l), Some(b));
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let page = tree.create(ElementType::Page);
        tree.add_child(root, page).unwrap();

        assert!(matches!(
            tree.add_child(page, root),
            Err(Error::CycleDetected { .. })
        ));
        assert!(matches!(
            tree.add_child(page, page),
            Err(Error::CycleDetected { .. })
        ));
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_remove_child() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let page = tree.create(ElementType::Page);
        tree.add_child(root, page).unwrap();

        assert!(tree.remove_child(root, page));
        assert_eq!(tree.parent(page), None);
        assert!(tree.children(root).is_empty());
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_remove_non_member_reports() {
        let collector = DiagnosticsCollector::shared();
        let mut tree = DocumentTree::new().with_diagnostics(collector.clone());
        let root = tree.root();
        let stray = tree.create(ElementType::TextLine);

        assert!(!tree.remove_child(root, stray));
        assert_eq!(
            collector.diagnostics(),
            vec![Diagnostic::DetachedChild {
                parent: root,
                child: stray
            }]
        );
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let a = line(&mut tree, "a");
        let b = line(&mut tree, "b");
        let c = line(&mut tree, "c");
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        tree.add_child(root, c).unwrap();

        let wrapper = tree.create(ElementType::Paragraph);
        assert!(tree.replace_child(root, b, wrapper).unwrap());
        tree.add_child(wrapper, b).unwrap();

        assert_eq!(tree.children(root), &[a, wrapper, c]);
        assert_eq!(tree.parent(b), Some(wrapper));
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_insert_child_clamps_index() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let a = line(&mut tree, "a");
        let b = line(&mut tree, "b");
        tree.insert_child(root, 10, a).unwrap();
        tree.insert_child(root, 0, b).unwrap();
        assert_eq!(tree.children(root), &[b, a]);
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let page = tree.create(ElementType::Page);
        let a = line(&mut tree, "a");
        let b = line(&mut tree, "b");
        tree.add_child(root, page).unwrap();
        tree.add_child(page, a).unwrap();
        tree.add_child(page, b).unwrap();

        let order: Vec<_> = tree.descendants(root).collect();
        assert_eq!(order, vec![page, a, b]);
        assert_eq!(tree.ancestors(b).collect::<Vec<_>>(), vec![page, root]);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_iter_sorted_uses_reading_order() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let lower = line(&mut tree, "lower");
        let upper = line(&mut tree, "upper");
        tree.set_region(lower, Region::new(0, 0.0, 50.0, 10.0, 10.0), "t", 1.0)
            .unwrap();
        tree.set_region(upper, Region::new(0, 0.0, 0.0, 10.0, 10.0), "t", 1.0)
            .unwrap();
        tree.add_child(root, lower).unwrap();
        tree.add_child(root, upper).unwrap();

        let texts: Vec<_> = tree
            .iter_sorted(root, |t, id| t.category(id) == ElementType::TextLine)
            .into_iter()
            .map(|id| tree.text(id).to_string())
            .collect();
        assert_eq!(texts, vec!["upper", "lower"]);
    }

    #[test]
    fn test_text_content_falls_back_to_children() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let a = line(&mut tree, "Hello,");
        let b = line(&mut tree, "world!");
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        assert_eq!(tree.text(root), "");
        assert_eq!(tree.text_content(root), "Hello, world!");
    }

    #[test]
    fn test_to_dict_is_pure_and_deterministic() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let a = line(&mut tree, "a");
        tree.set_text(a, "better", "ocr", 1.0).unwrap();
        tree.add_child(root, a).unwrap();

        let first = tree.to_dict();
        let second = tree.to_dict();
        assert_eq!(first, second);
        assert_eq!(first.children[0].properties["text"], PropertyValue::from("a"));
        assert_eq!(tree.element(a).properties().assertions("text").len(), 2);
    }

    #[test]
    fn test_from_dict_rebuilds_structure() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let page = tree.create(ElementType::Page);
        let a = line(&mut tree, "a");
        tree.add_child(root, page).unwrap();
        tree.add_child(page, a).unwrap();

        let dict = tree.to_dict();
        let rebuilt = DocumentTree::from_dict(&dict).unwrap();
        assert_eq!(rebuilt.to_dict(), dict);
        let rebuilt_line = rebuilt.children(rebuilt.children(rebuilt.root())[0])[0];
        let history = rebuilt.element(rebuilt_line).properties().assertions("text");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, INTERCHANGE_SOURCE);
    }

    #[test]
    fn test_set_root_detaches() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        let doc = tree.create(ElementType::Document);
        tree.add_child(doc, page).unwrap();
        tree.set_root(doc);
        assert_eq!(tree.root(), doc);
        assert_eq!(tree.parent(page), Some(doc));
        assert!(tree.check_invariants().is_empty());
    }
}
