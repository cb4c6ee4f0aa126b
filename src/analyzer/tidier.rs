//! Structural clean-up passes run after logical relabeling.

use super::Analyzer;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::{DocumentTree, ElementId, ElementType, TEXT_KEY};

/// Removes skipped heading levels.
///
/// Along every root-to-leaf path a heading may be at most one level deeper
/// than its nearest heading ancestor; a heading without heading ancestors
/// is capped at level 1. Deeper headings are demoted (their level number
/// lowered), levels are never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingLevelTidier;

impl HeadingLevelTidier {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for HeadingLevelTidier {
    fn name(&self) -> &str {
        "heading-level-tidier"
    }

    fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
        let root = tree.root();
        let order: Vec<ElementId> = std::iter::once(root).chain(tree.descendants(root)).collect();

        for id in order {
            let Some(level) = tree.category(id).heading_level() else {
                continue;
            };

            // Pre-order: ancestors are already tidied when a heading is visited.
            let cap = tree
                .ancestors(id)
                .find_map(|a| tree.category(a).heading_level())
                .map_or(1, |l| l + 1);

            if level > cap {
                tree.set_category(id, ElementType::heading(cap));
                tree.report(Diagnostic::HeadingDemoted {
                    element: id,
                    from: level,
                    to: cap,
                });
            }
        }
        Ok(tree)
    }
}

/// Wraps non-block elements standing directly in pages and partitions.
///
/// Structural children (pages, partitions) are descended into; any other
/// child that is not a block (a stray line, a figure, a leftover area) is
/// replaced by a paragraph that contains it. The paragraph takes over the
/// wrapped element's region and resolved text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonBlockWrapper;

const WRAPPER_SOURCE: &str = "non-block-wrapper";

impl NonBlockWrapper {
    /// Create the pass.
    pub fn new() -> Self {
        Self
    }

    fn wrap_children(&self, tree: &mut DocumentTree, parent: ElementId) -> Result<()> {
        let children = tree.children(parent).to_vec();
        for child in children {
            let category = tree.category(child);
            if category.is_structural() {
                self.wrap_children(tree, child)?;
            } else if !category.is_block() {
                self.wrap(tree, parent, child)?;
            }
        }
        Ok(())
    }

    fn wrap(&self, tree: &mut DocumentTree, parent: ElementId, child: ElementId) -> Result<()> {
        let paragraph = tree.create(ElementType::Paragraph);
        if let Some(region) = tree.region(child) {
            tree.set_region(paragraph, region, WRAPPER_SOURCE, 1.0)?;
        }
        let text = tree
            .element(child)
            .properties()
            .resolve(TEXT_KEY)
            .map(|p| (p.value.clone(), p.confidence));
        if let Some((value, confidence)) = text {
            tree.set_property(paragraph, TEXT_KEY, value, WRAPPER_SOURCE, confidence)?;
        }

        tree.replace_child(parent, child, paragraph)?;
        tree.add_child(paragraph, child)?;
        tree.report(Diagnostic::WrappedNonBlock {
            element: child,
            category: tree.category(child),
        });
        Ok(())
    }
}

impl Analyzer for NonBlockWrapper {
    fn name(&self) -> &str {
        WRAPPER_SOURCE
    }

    fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
        let root = tree.root();
        if tree.category(root).is_structural() {
            self.wrap_children(&mut tree, root)?;
        }
        Ok(tree)
    }
}
