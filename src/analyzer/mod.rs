//! Tree transformation passes.
//!
//! Every stage implements [`Analyzer`]: it consumes a tree and returns a
//! tree. [`Sequential`] threads a tree through an ordered list of stages.
//! The logical reconstruction pipeline is, in order:
//!
//! 1. [`Organizer`] - spatial hierarchy (pages, partitions, text areas)
//! 2. [`Tablelizer`] - table areas into rows and cells
//! 3. [`Logicalizer`] - physical text containers into headings/paragraphs
//! 4. [`HeadingLevelTidier`] - no skipped heading levels
//! 5. [`NonBlockWrapper`] - every loose non-block gets a paragraph

mod logicalizer;
mod options;
mod organizer;
mod tablelizer;
mod text;
mod tidier;

pub use logicalizer::{Logicalizer, CATEGORY_KEY, HEADING_LIKELIHOOD_KEY};
pub use options::{LogicalizerConfig, OrganizerConfig, PipelineConfig, TableConfig};
pub use organizer::Organizer;
pub use tablelizer::{Tablelizer, COLUMN_KEY, ROW_KEY};
pub use text::TextAssembler;
pub use tidier::{HeadingLevelTidier, NonBlockWrapper};

use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::model::DocumentTree;

/// A pipeline stage.
///
/// Detector and recognizer backends implement this trait too: they attach
/// elements carrying a `region` and, where applicable, a `text` property.
pub trait Analyzer: Send + Sync {
    /// Stage name, used as the source tag of the properties it asserts.
    fn name(&self) -> &str;

    /// Transform a tree. The returned tree may be the input, mutated.
    fn run(&self, tree: DocumentTree) -> Result<DocumentTree>;
}

/// Ordered composition of stages.
///
/// Each stage's output is the next stage's input. Stages run strictly in
/// insertion order; nothing is validated between them.
#[derive(Default)]
pub struct Sequential {
    stages: Vec<Box<dyn Analyzer>>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl Sequential {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the logical reconstruction pipeline from a configuration.
    pub fn logical(config: &PipelineConfig) -> Self {
        let mut pipeline = Self::new();
        pipeline.add(Organizer::with_config(config.organizer.clone()));
        pipeline.add(Tablelizer::with_config(config.table.clone()));
        pipeline.add(Logicalizer::with_config(config.logicalizer.clone()));
        pipeline.add(HeadingLevelTidier::new());
        pipeline.add(NonBlockWrapper::new());
        pipeline
    }

    /// Install a diagnostics sink on every tree this pipeline runs.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Append a stage.
    pub fn add(&mut self, stage: impl Analyzer + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Append a stage and return self.
    pub fn with_stage(mut self, stage: impl Analyzer + 'static) -> Self {
        self.add(stage);
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Analyzer for Sequential {
    fn name(&self) -> &str {
        "sequential"
    }

    fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
        if let Some(diagnostics) = &self.diagnostics {
            tree.set_diagnostics(Arc::clone(diagnostics));
        }
        for stage in &self.stages {
            log::debug!("Sequential: running stage '{}'", stage.name());
            tree = stage.run(tree)?;
            log::debug!(
                "Sequential: stage '{}' produced {} reachable elements",
                stage.name(),
                tree.len()
            );
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::ElementType;

    struct Tag(&'static str);

    impl Analyzer for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
            let root = tree.root();
            tree.set_property(root, "trace", self.0, self.0, 0.5)?;
            Ok(tree)
        }
    }

    struct Failing;

    impl Analyzer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(&self, _tree: DocumentTree) -> Result<DocumentTree> {
            Err(Error::analyzer("failing", "boom"))
        }
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = Sequential::new().with_stage(Tag("first")).with_stage(Tag("second"));
        let tree = pipeline.run(DocumentTree::new()).unwrap();

        let trace: Vec<_> = tree
            .element(tree.root())
            .properties()
            .assertions("trace")
            .iter()
            .map(|p| p.source.clone())
            .collect();
        assert_eq!(trace, vec!["first", "second"]);
        // Equal confidence: the first stage's assertion stays current.
        assert_eq!(tree.text(tree.root()), "");
        assert_eq!(
            tree.get(tree.root(), "trace").and_then(|v| v.as_text()),
            Some("first")
        );
    }

    #[test]
    fn test_failure_stops_pipeline() {
        let pipeline = Sequential::new().with_stage(Failing).with_stage(Tag("never"));
        assert!(matches!(
            pipeline.run(DocumentTree::new()),
            Err(Error::Analyzer { .. })
        ));
    }

    #[test]
    fn test_logical_pipeline_stage_order() {
        let pipeline = Sequential::logical(&PipelineConfig::default());
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "organizer",
                "tablelizer",
                "logicalizer",
                "heading-level-tidier",
                "non-block-wrapper"
            ]
        );
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let tree = DocumentTree::with_root(ElementType::Page);
        let out = Sequential::new().run(tree).unwrap();
        assert_eq!(out.category(out.root()), ElementType::Page);
    }
}
