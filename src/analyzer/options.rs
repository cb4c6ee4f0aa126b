//! Pass configuration.
//!
//! Clustering thresholds are relative to element heights where possible, so
//! the same defaults work for pixel and point coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options for the [`Organizer`](super::Organizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Minimum vertical overlap (fraction of the smaller height) for two
    /// lines to share a visual row
    pub row_overlap_ratio: f32,

    /// Maximum horizontal gap between lines of one row, as a multiple of
    /// the line height
    pub word_gap_factor: f32,

    /// Maximum vertical gap between consecutive rows of one text area, as a
    /// multiple of the line height
    pub line_gap_factor: f32,

    /// Minimum width of the whitespace gutter separating two partitions
    pub min_gutter_width: f32,

    /// Compute per-page grouping plans in parallel
    pub parallel: bool,
}

impl OrganizerConfig {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row overlap ratio.
    pub fn with_row_overlap_ratio(mut self, ratio: f32) -> Self {
        self.row_overlap_ratio = ratio;
        self
    }

    /// Set the word gap factor.
    pub fn with_word_gap_factor(mut self, factor: f32) -> Self {
        self.word_gap_factor = factor;
        self
    }

    /// Set the line gap factor.
    pub fn with_line_gap_factor(mut self, factor: f32) -> Self {
        self.line_gap_factor = factor;
        self
    }

    /// Set the minimum gutter width.
    pub fn with_min_gutter_width(mut self, width: f32) -> Self {
        self.min_gutter_width = width;
        self
    }

    /// Enable or disable parallel planning.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel planning.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            row_overlap_ratio: 0.5,
            word_gap_factor: 1.5,
            line_gap_factor: 0.8,
            min_gutter_width: 12.0,
            parallel: true,
        }
    }
}

/// Options for the [`Tablelizer`](super::Tablelizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Y tolerance for grouping elements into rows (fraction of element
    /// height)
    pub row_tolerance_factor: f32,

    /// Width of the buckets left edges are grouped into when looking for
    /// column starts
    pub column_bucket_size: f32,

    /// Minimum fraction of rows a left edge must appear in to start a
    /// column (0.0-1.0)
    pub min_alignment_ratio: f32,
}

impl TableConfig {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row tolerance factor.
    pub fn with_row_tolerance_factor(mut self, factor: f32) -> Self {
        self.row_tolerance_factor = factor;
        self
    }

    /// Set the column bucket size.
    pub fn with_column_bucket_size(mut self, size: f32) -> Self {
        self.column_bucket_size = size;
        self
    }

    /// Set the minimum alignment ratio.
    pub fn with_min_alignment_ratio(mut self, ratio: f32) -> Self {
        self.min_alignment_ratio = ratio;
        self
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_tolerance_factor: 0.5,
            column_bucket_size: 5.0,
            min_alignment_ratio: 0.3,
        }
    }
}

/// Options for the [`Logicalizer`](super::Logicalizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicalizerConfig {
    /// Confidence of the baseline "this is a paragraph" candidate that
    /// layout evidence has to beat
    pub paragraph_confidence: f64,

    /// Minimum vertical overlap, as a fraction of the smaller height, for
    /// two lines of a block to share a row. Rows are the unit of text order
    /// and of heading/paragraph decisions.
    pub row_overlap_ratio: f32,

    /// Join words hyphenated across line breaks
    pub dehyphenate: bool,

    /// Normalize assembled text to Unicode NFC
    pub normalize_unicode: bool,
}

impl LogicalizerConfig {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the baseline paragraph confidence.
    pub fn with_paragraph_confidence(mut self, confidence: f64) -> Self {
        self.paragraph_confidence = confidence;
        self
    }

    /// Set the row overlap ratio.
    pub fn with_row_overlap_ratio(mut self, ratio: f32) -> Self {
        self.row_overlap_ratio = ratio;
        self
    }

    /// Enable or disable dehyphenation.
    pub fn with_dehyphenate(mut self, dehyphenate: bool) -> Self {
        self.dehyphenate = dehyphenate;
        self
    }

    /// Enable or disable NFC normalization.
    pub fn with_normalize_unicode(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }
}

impl Default for LogicalizerConfig {
    fn default() -> Self {
        Self {
            paragraph_confidence: 0.5,
            row_overlap_ratio: 0.5,
            dehyphenate: true,
            normalize_unicode: true,
        }
    }
}

/// Configuration of the whole logical pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Organizer options
    pub organizer: OrganizerConfig,
    /// Tablelizer options
    pub table: TableConfig,
    /// Logicalizer options
    pub logicalizer: LogicalizerConfig,
}

impl PipelineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        let o = &self.organizer;
        unit_interval("organizer.row_overlap_ratio", o.row_overlap_ratio as f64)?;
        non_negative("organizer.word_gap_factor", o.word_gap_factor)?;
        non_negative("organizer.line_gap_factor", o.line_gap_factor)?;
        non_negative("organizer.min_gutter_width", o.min_gutter_width)?;

        let t = &self.table;
        non_negative("table.row_tolerance_factor", t.row_tolerance_factor)?;
        if !(t.column_bucket_size > 0.0) {
            return Err(Error::Config(format!(
                "table.column_bucket_size must be positive, got {}",
                t.column_bucket_size
            )));
        }
        unit_interval("table.min_alignment_ratio", t.min_alignment_ratio as f64)?;

        unit_interval(
            "logicalizer.paragraph_confidence",
            self.logicalizer.paragraph_confidence,
        )?;
        unit_interval(
            "logicalizer.row_overlap_ratio",
            self.logicalizer.row_overlap_ratio as f64,
        )?;
        Ok(())
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must not be negative, got {}",
            name, value
        )))
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}
