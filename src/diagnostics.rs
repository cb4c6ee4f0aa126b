//! Diagnostics emitted while building and transforming trees.
//!
//! Non-fatal anomalies (removing a node that is not a child, a node without
//! geometry, a demoted heading) are reported to a [`Diagnostics`] sink that
//! travels with the tree. The default sink forwards to the `log` facade;
//! tests install a [`DiagnosticsCollector`] and assert on what was reported.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::model::{ElementId, ElementType};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Expected repair performed by a pass
    Info,
    /// Input did not have the expected shape; a fallback was applied
    Warning,
}

/// A non-fatal event worth reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Removal of an element that is not a child of the given parent.
    DetachedChild {
        /// Element removal was requested on
        parent: ElementId,
        /// Element that was not among its children
        child: ElementId,
    },
    /// An element needed for geometric grouping has no `region`.
    MissingRegion {
        /// The element lacking geometry
        element: ElementId,
        /// Its category
        category: ElementType,
    },
    /// A heading was demoted to keep the outline free of skipped levels.
    HeadingDemoted {
        /// The heading element
        element: ElementId,
        /// Original level
        from: u8,
        /// New level
        to: u8,
    },
    /// A non-block element was wrapped in a synthetic paragraph.
    WrappedNonBlock {
        /// The wrapped element
        element: ElementId,
        /// Its category
        category: ElementType,
    },
    /// A table area had no content and became an empty table.
    EmptyTable {
        /// The table element
        element: ElementId,
    },
}

impl Diagnostic {
    /// Severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::DetachedChild { .. } | Diagnostic::MissingRegion { .. } => {
                Severity::Warning
            }
            Diagnostic::HeadingDemoted { .. }
            | Diagnostic::WrappedNonBlock { .. }
            | Diagnostic::EmptyTable { .. } => Severity::Info,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DetachedChild { parent, child } => write!(
                f,
                "tried to remove element {} that is not a child of {}",
                child, parent
            ),
            Diagnostic::MissingRegion { element, category } => {
                write!(f, "{} element {} has no region", category, element)
            }
            Diagnostic::HeadingDemoted { element, from, to } => write!(
                f,
                "heading {} demoted from level {} to level {}",
                element, from, to
            ),
            Diagnostic::WrappedNonBlock { element, category } => write!(
                f,
                "wrapped non-block {} element {} in a paragraph",
                category, element
            ),
            Diagnostic::EmptyTable { element } => {
                write!(f, "table {} has no detectable content", element)
            }
        }
    }
}

/// Sink receiving diagnostics.
pub trait Diagnostics: Send + Sync + fmt::Debug {
    /// Report a diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Info => log::debug!("{}", diagnostic),
        }
    }
}

/// Records diagnostics in memory.
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    reported: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector ready to be installed on a tree or pipeline.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reported
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of diagnostics reported so far.
    pub fn len(&self) -> usize {
        self.diagnostics().len()
    }

    /// Whether nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Diagnostics for DiagnosticsCollector {
    fn report(&self, diagnostic: Diagnostic) {
        match self.reported.lock() {
            Ok(mut d) => d.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
