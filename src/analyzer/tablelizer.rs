//! Table reconstruction.
//!
//! Each `TableArea` becomes a `Table` of `TableRow`s of `TableCell`s. Rows
//! are formed by clustering the area's content on near-equal `y`; column
//! starts are left edges that line up across rows (bucketed, in the spirit
//! of stream-mode table detection). Content falling into the same row and
//! column shares one cell.

use std::collections::{BTreeSet, HashMap};

use super::{Analyzer, TableConfig};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::ordering::sort_table;
use crate::model::{DocumentTree, ElementId, ElementType, Region, TEXT_KEY};

const SOURCE: &str = "tablelizer";

/// Key of the zero-based row index asserted on rows and cells.
pub const ROW_KEY: &str = "row";

/// Key of the zero-based column index asserted on cells.
pub const COLUMN_KEY: &str = "column";

/// Turns table areas into row/column structure.
#[derive(Debug, Clone, Default)]
pub struct Tablelizer {
    config: TableConfig,
}

impl Tablelizer {
    /// Create a tablelizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tablelizer with custom options.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Group content into rows by `y`. Content without a region forms a
    /// leading row of its own.
    fn group_into_rows(&self, tree: &DocumentTree, content: &[ElementId]) -> Vec<Vec<ElementId>> {
        let mut sorted = content.to_vec();
        sort_table(tree, &mut sorted);

        let mut rows: Vec<Vec<ElementId>> = Vec::new();
        let unplaced: Vec<ElementId> = sorted
            .iter()
            .copied()
            .filter(|id| tree.region(*id).is_none())
            .collect();
        if !unplaced.is_empty() {
            rows.push(unplaced);
        }

        let mut current: Vec<ElementId> = Vec::new();
        let mut current_y: Option<f32> = None;
        for id in sorted {
            let Some(region) = tree.region(id) else {
                continue;
            };
            let tolerance = region.height * self.config.row_tolerance_factor;
            match current_y {
                Some(y) if (region.y - y).abs() <= tolerance => current.push(id),
                _ => {
                    if !current.is_empty() {
                        rows.push(std::mem::take(&mut current));
                    }
                    current_y = Some(region.y);
                    current.push(id);
                }
            }
        }
        if !current.is_empty() {
            rows.push(current);
        }

        // Within a row, cells run left to right.
        for row in &mut rows {
            row.sort_by(|a, b| {
                let ax = tree.region(*a).map_or(0.0, |r| r.x);
                let bx = tree.region(*b).map_or(0.0, |r| r.x);
                ax.total_cmp(&bx)
            });
        }
        rows
    }

    fn bucket(&self, x: f32) -> i64 {
        (x / self.config.column_bucket_size).round() as i64
    }

    /// Bucketed left edges shared by enough rows to start a column.
    fn detect_columns(&self, tree: &DocumentTree, rows: &[Vec<ElementId>]) -> Vec<i64> {
        let mut edge_counts: HashMap<i64, usize> = HashMap::new();
        let mut placed_rows = 0usize;
        for row in rows {
            let buckets: BTreeSet<i64> = row
                .iter()
                .filter_map(|id| tree.region(*id))
                .map(|r| self.bucket(r.x))
                .collect();
            if !buckets.is_empty() {
                placed_rows += 1;
            }
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((placed_rows as f32 * self.config.min_alignment_ratio).ceil() as usize).max(1);
        let mut columns: Vec<i64> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket)
            .collect();
        columns.sort_unstable();

        log::debug!(
            "Tablelizer: {} rows, column starts at buckets {:?}",
            rows.len(),
            columns
        );
        columns
    }

    /// Column index for a region: the last column start at or left of it.
    fn column_of(&self, columns: &[i64], region: Option<Region>) -> usize {
        let Some(region) = region else {
            return 0;
        };
        let bucket = self.bucket(region.x);
        columns
            .iter()
            .rposition(|start| *start <= bucket)
            .unwrap_or(0)
    }

    fn build_table(&self, tree: &mut DocumentTree, area: ElementId) -> Result<()> {
        let content = tree.children(area).to_vec();
        tree.set_category(area, ElementType::Table);
        if content.is_empty() {
            tree.report(Diagnostic::EmptyTable { element: area });
            return Ok(());
        }

        let rows = self.group_into_rows(tree, &content);
        let columns = self.detect_columns(tree, &rows);

        let mut row_ids = Vec::with_capacity(rows.len());
        for (row_index, members) in rows.iter().enumerate() {
            // Members sharing a column share a cell, keeping left-to-right order.
            let mut cells: Vec<(usize, Vec<ElementId>)> = Vec::new();
            for id in members {
                let column = self.column_of(&columns, tree.region(*id));
                match cells.iter_mut().find(|(c, _)| *c == column) {
                    Some((_, cell_members)) => cell_members.push(*id),
                    None => cells.push((column, vec![*id])),
                }
            }

            let row = tree.create(ElementType::TableRow);
            tree.set_property(row, ROW_KEY, row_index as f64, SOURCE, 1.0)?;
            let regions: Vec<Region> = members.iter().filter_map(|id| tree.region(*id)).collect();
            if let Some(region) = Region::bounding(regions.iter()) {
                tree.set_region(row, region, SOURCE, 1.0)?;
            }

            let mut cell_ids = Vec::with_capacity(cells.len());
            for (column, cell_members) in cells {
                let cell = self.build_cell(tree, &cell_members, row_index, column)?;
                cell_ids.push(cell);
            }
            tree.set_children(row, cell_ids)?;
            row_ids.push(row);
        }

        log::debug!(
            "Tablelizer: table {} -> {} rows, {} columns",
            area,
            row_ids.len(),
            columns.len().max(1)
        );
        tree.set_children(area, row_ids)
    }

    fn build_cell(
        &self,
        tree: &mut DocumentTree,
        members: &[ElementId],
        row: usize,
        column: usize,
    ) -> Result<ElementId> {
        let cell = tree.create(ElementType::TableCell);
        tree.set_property(cell, ROW_KEY, row as f64, SOURCE, 1.0)?;
        tree.set_property(cell, COLUMN_KEY, column as f64, SOURCE, 1.0)?;

        let regions: Vec<Region> = members.iter().filter_map(|id| tree.region(*id)).collect();
        if let Some(region) = Region::bounding(regions.iter()) {
            tree.set_region(cell, region, SOURCE, 1.0)?;
        }

        let texts: Vec<String> = members
            .iter()
            .map(|id| tree.text_content(*id))
            .filter(|t| !t.is_empty())
            .collect();
        if !texts.is_empty() {
            let confidence = members
                .iter()
                .filter_map(|id| tree.element(*id).properties().resolve(TEXT_KEY))
                .map(|p| p.confidence)
                .fold(1.0_f64, f64::min);
            tree.set_text(cell, texts.join(" "), SOURCE, confidence)?;
        }

        tree.set_children(cell, members.to_vec())?;
        Ok(cell)
    }
}

impl Analyzer for Tablelizer {
    fn name(&self) -> &str {
        SOURCE
    }

    fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
        let areas: Vec<ElementId> = tree
            .descendants(tree.root())
            .filter(|id| tree.category(*id) == ElementType::TableArea)
            .collect();
        log::debug!("Tablelizer: {} table areas", areas.len());

        for area in areas {
            self.build_table(&mut tree, area)?;
        }
        Ok(tree)
    }
}
