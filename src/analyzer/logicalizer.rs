//! Physical-to-logical relabeling.
//!
//! Text areas become headings or paragraphs. The decision weighs the
//! evidence asserted by upstream classifiers on the area and on its lines:
//!
//! - a `category` property naming a text block category, and
//! - a `heading-likelihood` property whose confidence is the likelihood and
//!   whose (optional) numeric value is the heading level.
//!
//! Both compete with a baseline paragraph candidate; the candidate with the
//! strictly greatest confidence wins, earlier candidates win ties.
//!
//! Lines are grouped into visual rows and each row is decided on its own
//! evidence plus the area's. Consecutive rows with the same outcome form a
//! run; an area holding several runs (a heading set tight above its body
//! text, say) is replaced by one block per run. The lines are then
//! absorbed: their texts are joined row by row, left to right within a
//! row, into the text of the block and the line elements are removed.

use super::{Analyzer, LogicalizerConfig, TextAssembler};
use crate::error::Result;
use crate::model::ordering::sort_table;
use crate::model::{
    DocumentTree, ElementId, ElementType, Property, PropertyValue, Region, REGION_KEY, TEXT_KEY,
};

const SOURCE: &str = "logicalizer";

/// Property naming the category an upstream classifier suggests.
pub const CATEGORY_KEY: &str = "category";

/// Property carrying the likelihood that a block is a heading.
pub const HEADING_LIKELIHOOD_KEY: &str = "heading-likelihood";

/// Relabels physical text containers with logical categories.
#[derive(Debug, Clone)]
pub struct Logicalizer {
    config: LogicalizerConfig,
    assembler: TextAssembler,
}

/// Consecutive rows of an area that share a category.
type Run = (ElementType, Vec<ElementId>);

impl Logicalizer {
    /// Create a logicalizer with default options.
    pub fn new() -> Self {
        Self::with_config(LogicalizerConfig::default())
    }

    /// Create a logicalizer with custom options.
    pub fn with_config(config: LogicalizerConfig) -> Self {
        let assembler = TextAssembler::new(&config);
        Self { config, assembler }
    }

    /// Pick the logical category of a text area from its evidence.
    fn classify(&self, tree: &DocumentTree, area: ElementId, lines: &[ElementId]) -> ElementType {
        let mut candidates: Vec<(ElementType, f64)> = Vec::with_capacity(3);

        if let Some(property) = strongest(tree, area, lines, CATEGORY_KEY) {
            match property.value.as_text().map(str::parse::<ElementType>) {
                Some(Ok(category)) if is_text_block(category) => {
                    candidates.push((category, property.confidence))
                }
                _ => log::debug!(
                    "Logicalizer: ignoring category evidence '{}' on {}",
                    property.value,
                    area
                ),
            }
        }

        if let Some(property) = strongest(tree, area, lines, HEADING_LIKELIHOOD_KEY) {
            candidates.push((
                ElementType::heading(heading_level(&property.value)),
                property.confidence,
            ));
        }

        candidates.push((ElementType::Paragraph, self.config.paragraph_confidence));

        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 > best.1 {
                best = *candidate;
            }
        }
        best.0
    }

    /// Classify each row of an area and merge neighbouring rows that agree.
    fn classify_runs(&self, tree: &DocumentTree, area: ElementId, rows: &[Vec<ElementId>]) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for row in rows {
            let category = self.classify(tree, area, row);
            match runs.last_mut() {
                Some((last, lines)) if *last == category => lines.extend(row.iter().copied()),
                _ => runs.push((category, row.clone())),
            }
        }
        runs
    }

    /// Replace `area` in its parent by one new block per run.
    ///
    /// Blocks take the area's assertions other than region and text, a
    /// region bounding their own lines, and the text of those lines. Any
    /// non-line content of the area goes to the first block.
    fn split_area(
        &self,
        tree: &mut DocumentTree,
        parent: ElementId,
        area: ElementId,
        runs: Vec<Run>,
    ) -> Result<()> {
        let inherited: Vec<Property> = tree
            .element(area)
            .properties()
            .iter()
            .filter(|p| p.key != REGION_KEY && p.key != TEXT_KEY)
            .cloned()
            .collect();
        let mut rest: Vec<ElementId> = tree
            .children(area)
            .iter()
            .copied()
            .filter(|id| tree.category(*id) != ElementType::TextLine)
            .collect();
        let mut position = tree
            .children(parent)
            .iter()
            .position(|c| *c == area)
            .unwrap_or(0);

        for (category, lines) in runs {
            let block = tree.create(category);
            for p in &inherited {
                tree.set_property(block, p.key.clone(), p.value.clone(), p.source.clone(), p.confidence)?;
            }
            let regions: Vec<Region> = lines.iter().filter_map(|id| tree.region(*id)).collect();
            if let Some(region) = Region::bounding(regions.iter()) {
                tree.set_region(block, region, SOURCE, 1.0)?;
            }
            self.absorb_lines(tree, area, block, &lines)?;
            for child in rest.drain(..) {
                tree.add_child(block, child)?;
            }
            position += 1;
            tree.insert_child(parent, position, block)?;
        }

        tree.remove_child(parent, area);
        Ok(())
    }

    /// Move the texts of `lines` onto `block` and drop the lines from
    /// `container`. The lines are expected in text order.
    fn absorb_lines(
        &self,
        tree: &mut DocumentTree,
        container: ElementId,
        block: ElementId,
        lines: &[ElementId],
    ) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = lines.iter().map(|id| tree.text(*id)).collect();
        let text = self.assembler.assemble(texts);
        let confidence = lines
            .iter()
            .filter_map(|id| tree.element(*id).properties().resolve(TEXT_KEY))
            .map(|p| p.confidence)
            .fold(1.0_f64, f64::min);

        for line in lines {
            tree.remove_child(container, *line);
        }
        if !text.is_empty() {
            tree.set_text(block, text, SOURCE, confidence)?;
        }
        Ok(())
    }
}

impl Default for Logicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for Logicalizer {
    fn name(&self) -> &str {
        SOURCE
    }

    fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
        let containers: Vec<ElementId> = tree
            .descendants(tree.root())
            .filter(|id| {
                matches!(
                    tree.category(*id),
                    ElementType::TextArea | ElementType::PageHeader | ElementType::PageFooter
                )
            })
            .collect();

        let mut relabeled = 0usize;
        let mut split = 0usize;
        for container in containers {
            let lines: Vec<ElementId> = tree
                .children(container)
                .iter()
                .copied()
                .filter(|id| tree.category(*id) == ElementType::TextLine)
                .collect();
            let rows = group_rows(&tree, &lines, self.config.row_overlap_ratio);
            let ordered: Vec<ElementId> = rows.iter().flatten().copied().collect();

            if tree.category(container) == ElementType::TextArea {
                relabeled += 1;
                let runs = self.classify_runs(&tree, container, &rows);
                if runs.len() > 1 {
                    if let Some(parent) = tree.parent(container) {
                        self.split_area(&mut tree, parent, container, runs)?;
                        split += 1;
                        continue;
                    }
                }
                let category = match runs.as_slice() {
                    [(category, _)] => *category,
                    _ => self.classify(&tree, container, &ordered),
                };
                tree.set_category(container, category);
            }
            self.absorb_lines(&mut tree, container, container, &ordered)?;
        }

        log::debug!(
            "Logicalizer: relabeled {} text areas, split {}",
            relabeled,
            split
        );
        Ok(tree)
    }
}

/// Group lines into visual rows, top to bottom, each running left to right.
///
/// A line joins the row above when it overlaps the row's vertical extent by
/// at least `overlap_ratio` of the smaller height. Lines without a region
/// form rows of their own and come first.
fn group_rows(tree: &DocumentTree, lines: &[ElementId], overlap_ratio: f32) -> Vec<Vec<ElementId>> {
    let mut sorted = lines.to_vec();
    sort_table(tree, &mut sorted);

    let mut rows: Vec<(Option<Region>, Vec<ElementId>)> = Vec::new();
    for id in sorted {
        let region = tree.region(id);
        match (rows.last_mut(), region) {
            (Some((Some(band), members)), Some(line)) if shares_row(band, &line, overlap_ratio) => {
                *band = band.union(&line);
                members.push(id);
            }
            _ => rows.push((region, vec![id])),
        }
    }

    rows.into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| {
                let ax = tree.region(*a).map_or(0.0, |r| r.x);
                let bx = tree.region(*b).map_or(0.0, |r| r.x);
                ax.total_cmp(&bx)
            });
            members
        })
        .collect()
}

fn shares_row(band: &Region, line: &Region, overlap_ratio: f32) -> bool {
    if band.page_no != line.page_no {
        return false;
    }
    let min_h = band.height.min(line.height);
    if min_h > 0.0 {
        band.vertical_overlap(line) >= overlap_ratio * min_h
    } else {
        band.y == line.y
    }
}

/// Categories a text area may turn into.
fn is_text_block(category: ElementType) -> bool {
    category.is_heading()
        || matches!(
            category,
            ElementType::Paragraph | ElementType::PageHeader | ElementType::PageFooter
        )
}

/// Heading level carried by a likelihood value; 1 unless a number in 1..=6.
fn heading_level(value: &PropertyValue) -> u8 {
    match value.as_number() {
        Some(n) if (1.0..=6.0).contains(&n) => n as u8,
        _ => 1,
    }
}

/// The strongest assertion of `key` on the container or its lines.
///
/// The container's own assertions come first, then the lines' in the given
/// order; the first of equally confident assertions wins.
fn strongest<'a>(
    tree: &'a DocumentTree,
    container: ElementId,
    lines: &[ElementId],
    key: &str,
) -> Option<&'a Property> {
    let mut best: Option<&Property> = None;
    for id in std::iter::once(&container).chain(lines) {
        for property in tree.element(*id).properties().assertions(key) {
            if best.map_or(true, |b| property.confidence > b.confidence) {
                best = Some(property);
            }
        }
    }
    best
}
