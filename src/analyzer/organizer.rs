//! Spatial organization of detected regions.
//!
//! Turns pages holding flat, unordered detection primitives into a nested
//! hierarchy: pages, partitions (columns separated by a whitespace gutter),
//! text areas (lines that abut on a row or across consecutive rows) and
//! lines. Primitives falling inside a detected container (table area,
//! figure, header, footer, pre-detected text area) are moved under the
//! smallest one, so nested layout boxes nest in the tree too.
//!
//! Grouping plans are computed per page from a read-only snapshot, which
//! lets pages be planned in parallel. Plans are applied in page order and
//! every level is sorted in reading order afterwards, so the result does
//! not depend on execution order.

use rayon::prelude::*;

use super::{Analyzer, OrganizerConfig};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::ordering::{cmp_geometric, geometric_key, sort_geometric};
use crate::model::{DocumentTree, ElementId, ElementType, Region};

const SOURCE: &str = "organizer";

/// Groups physical regions into a spatial hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Organizer {
    config: OrganizerConfig,
}

impl Organizer {
    /// Create an organizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an organizer with custom options.
    pub fn with_config(config: OrganizerConfig) -> Self {
        Self { config }
    }

    /// The active options.
    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }
}

impl Analyzer for Organizer {
    fn name(&self) -> &str {
        SOURCE
    }

    fn run(&self, mut tree: DocumentTree) -> Result<DocumentTree> {
        if tree.category(tree.root()) == ElementType::Page {
            let page = tree.root();
            let document = tree.create(ElementType::Document);
            tree.add_child(document, page)?;
            tree.set_root(document);
        }

        let root = tree.root();
        let mut top = tree.children(root).to_vec();
        top.sort_by_key(|id| page_number(&tree, *id));
        tree.set_children(root, top)?;

        let snapshots: Vec<PageSnapshot> = tree
            .children(root)
            .iter()
            .filter(|id| tree.category(**id) == ElementType::Page)
            .map(|page| PageSnapshot::capture(&tree, *page))
            .collect();

        log::debug!("Organizer: planning {} pages", snapshots.len());

        let plans: Vec<PagePlan> = if self.config.parallel {
            snapshots
                .par_iter()
                .map(|s| plan_page(s, &self.config))
                .collect()
        } else {
            snapshots
                .iter()
                .map(|s| plan_page(s, &self.config))
                .collect()
        };

        for plan in plans {
            apply_plan(&mut tree, plan)?;
        }
        Ok(tree)
    }
}

/// Page number of an element: its own region's page, else the lowest page
/// among its descendants, else 0.
fn page_number(tree: &DocumentTree, id: ElementId) -> u32 {
    tree.iter_regions(id)
        .map(|r| r.page_no)
        .min()
        .unwrap_or(0)
}

/// What the planner needs to know about one direct child of a page.
#[derive(Debug, Clone)]
struct Item {
    id: ElementId,
    category: ElementType,
    region: Option<Region>,
}

#[derive(Debug, Clone)]
struct PageSnapshot {
    page: ElementId,
    items: Vec<Item>,
}

impl PageSnapshot {
    fn capture(tree: &DocumentTree, page: ElementId) -> Self {
        let items = tree
            .children(page)
            .iter()
            .map(|id| Item {
                id: *id,
                category: tree.category(*id),
                region: tree.region(*id),
            })
            .collect();
        Self { page, items }
    }
}

/// A top-level entry of a planned page.
#[derive(Debug, Clone, Copy)]
enum Entry {
    /// A child the page already had
    Existing(ElementId),
    /// The n-th planned text area
    NewArea(usize),
}

#[derive(Debug, Clone)]
struct PlannedArea {
    lines: Vec<ElementId>,
    region: Region,
}

#[derive(Debug, Clone)]
struct PlannedPartition {
    entries: Vec<Entry>,
    region: Region,
}

#[derive(Debug, Clone)]
struct PagePlan {
    page: ElementId,
    /// Primitives moving under an existing container
    adoptions: Vec<(ElementId, Vec<ElementId>)>,
    areas: Vec<PlannedArea>,
    /// Top-level entries without geometry; they sort first
    unplaced: Vec<Entry>,
    /// Placed top-level entries, when the page is a single partition
    placed: Vec<Entry>,
    /// Partitions, when the page splits into several
    partitions: Vec<PlannedPartition>,
    missing_region: Vec<(ElementId, ElementType)>,
}

fn is_container(category: ElementType) -> bool {
    matches!(
        category,
        ElementType::TableArea
            | ElementType::Figure
            | ElementType::PageHeader
            | ElementType::PageFooter
            | ElementType::TextArea
    )
}

fn plan_page(snapshot: &PageSnapshot, config: &OrganizerConfig) -> PagePlan {
    let mut missing_region = Vec::new();
    let mut unplaced: Vec<Entry> = Vec::new();
    let mut located: Vec<(&Item, Region)> = Vec::new();

    for item in &snapshot.items {
        match item.region {
            None => {
                missing_region.push((item.id, item.category));
                unplaced.push(Entry::Existing(item.id));
            }
            Some(region) => located.push((item, region)),
        }
    }

    // Containment: every primitive, containers included, goes to the
    // smallest container holding its center.
    let enclosing: Vec<Option<usize>> = located
        .iter()
        .enumerate()
        .map(|(i, (_, inner))| {
            located
                .iter()
                .enumerate()
                .filter(|(c, (item, outer))| {
                    is_container(item.category)
                        && encloses((outer, *c), (inner, i))
                        && outer.contains_center_of(inner)
                })
                .min_by(|(a, (_, ra)), (b, (_, rb))| ra.area().total_cmp(&rb.area()).then(a.cmp(b)))
                .map(|(c, _)| c)
        })
        .collect();

    let mut adopted: Vec<Vec<ElementId>> = vec![Vec::new(); located.len()];
    let mut free: Vec<(ElementId, Region)> = Vec::new();
    let mut placed: Vec<(Entry, Region)> = Vec::new();
    for (i, (item, region)) in located.iter().enumerate() {
        match enclosing[i] {
            Some(c) => adopted[c].push(item.id),
            None if item.category == ElementType::TextLine => free.push((item.id, *region)),
            None => placed.push((Entry::Existing(item.id), *region)),
        }
    }

    let areas = cluster_lines(free, config);
    placed.extend(areas.iter().enumerate().map(|(i, a)| (Entry::NewArea(i), a.region)));

    let mut partitions = split_partitions(placed.clone(), config.min_gutter_width);
    let placed = if partitions.len() > 1 {
        Vec::new()
    } else {
        partitions.clear();
        sort_entries(placed)
    };

    let adoptions = located
        .iter()
        .zip(adopted)
        .filter(|(_, children)| !children.is_empty())
        .map(|((item, _), children)| (item.id, children))
        .collect();

    PagePlan {
        page: snapshot.page,
        adoptions,
        areas,
        unplaced,
        placed,
        partitions,
        missing_region,
    }
}

/// Strict order in which a container may hold another primitive: larger
/// area first, earlier position on equal area. Nesting along it never
/// forms a cycle and never puts an element inside itself.
fn encloses(outer: (&Region, usize), inner: (&Region, usize)) -> bool {
    let (outer_area, inner_area) = (outer.0.area(), inner.0.area());
    outer_area > inner_area || (outer_area == inner_area && outer.1 < inner.1)
}

fn sort_entries(mut entries: Vec<(Entry, Region)>) -> Vec<Entry> {
    entries.sort_by(|(_, a), (_, b)| cmp_geometric(geometric_key(Some(a)), geometric_key(Some(b))));
    entries.into_iter().map(|(e, _)| e).collect()
}

/// Whether two lines sit on the same visual row, close enough to be one run
/// of text.
fn same_row(a: &Region, b: &Region, config: &OrganizerConfig) -> bool {
    let min_h = a.height.min(b.height);
    let max_h = a.height.max(b.height);
    let overlapping = if min_h > 0.0 {
        a.vertical_overlap(b) >= config.row_overlap_ratio * min_h
    } else {
        a.y == b.y
    };
    overlapping && a.horizontal_gap(b) <= config.word_gap_factor * max_h
}

/// Whether two lines are consecutive rows of the same block.
fn stacked(a: &Region, b: &Region, config: &OrganizerConfig) -> bool {
    let max_h = a.height.max(b.height);
    a.horizontal_overlap(b) > 0.0 && a.vertical_gap(b) <= config.line_gap_factor * max_h
}

/// Cluster free lines into text areas (connected components of the
/// adjacency relation). Areas are ordered by their first line in reading
/// order; lines inside an area are in reading order.
fn cluster_lines(mut lines: Vec<(ElementId, Region)>, config: &OrganizerConfig) -> Vec<PlannedArea> {
    lines.sort_by(|(_, a), (_, b)| cmp_geometric(geometric_key(Some(a)), geometric_key(Some(b))));

    let n = lines.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&lines[i].1, &lines[j].1);
            if a.page_no != b.page_no {
                continue;
            }
            if same_row(a, b, config) || stacked(a, b, config) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // Keep the earlier line as representative so area order
                    // follows reading order.
                    let (lo, hi) = if ri < rj { (ri, rj) } else { (rj, ri) };
                    parent[hi] = lo;
                }
            }
        }
    }

    let mut areas: Vec<PlannedArea> = Vec::new();
    let mut area_of_root: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let r = find(&mut parent, i);
        let (id, region) = lines[i];
        match area_of_root[r] {
            Some(a) => {
                let area = &mut areas[a];
                area.lines.push(id);
                area.region = area.region.union(&region);
            }
            None => {
                area_of_root[r] = Some(areas.len());
                areas.push(PlannedArea {
                    lines: vec![id],
                    region,
                });
            }
        }
    }
    areas
}

/// Split placed entries into partitions separated by vertical whitespace
/// gutters at least `min_gutter` wide. Returns one partition when there is
/// no such gutter.
fn split_partitions(mut placed: Vec<(Entry, Region)>, min_gutter: f32) -> Vec<PlannedPartition> {
    if placed.is_empty() {
        return Vec::new();
    }
    placed.sort_by(|(_, a), (_, b)| a.x.total_cmp(&b.x));

    let mut groups: Vec<(f32, Vec<(Entry, Region)>)> = Vec::new();
    for (entry, region) in placed {
        match groups.last_mut() {
            Some((right, members)) if region.x - *right < min_gutter => {
                *right = right.max(region.right());
                members.push((entry, region));
            }
            _ => groups.push((region.right(), vec![(entry, region)])),
        }
    }

    let mut partitions: Vec<PlannedPartition> = groups
        .into_iter()
        .filter_map(|(_, members)| {
            let region = Region::bounding(members.iter().map(|(_, r)| r))?;
            Some(PlannedPartition {
                entries: sort_entries(members),
                region,
            })
        })
        .collect();
    partitions.sort_by(|a, b| {
        cmp_geometric(geometric_key(Some(&a.region)), geometric_key(Some(&b.region)))
    });
    partitions
}

fn apply_plan(tree: &mut DocumentTree, plan: PagePlan) -> Result<()> {
    for (element, category) in &plan.missing_region {
        tree.report(Diagnostic::MissingRegion {
            element: *element,
            category: *category,
        });
    }

    for (container, adoptees) in &plan.adoptions {
        let mut children = tree.children(*container).to_vec();
        children.extend(adoptees.iter().copied());
        sort_geometric(tree, &mut children);
        tree.set_children(*container, children)?;
    }

    let mut area_ids = Vec::with_capacity(plan.areas.len());
    for area in &plan.areas {
        let id = tree.create(ElementType::TextArea);
        tree.set_region(id, area.region, SOURCE, 1.0)?;
        tree.set_children(id, area.lines.clone())?;
        area_ids.push(id);
    }
    let resolve = |entry: &Entry| match entry {
        Entry::Existing(id) => *id,
        Entry::NewArea(i) => area_ids[*i],
    };

    let mut children: Vec<ElementId> = plan.unplaced.iter().map(resolve).collect();
    children.extend(plan.placed.iter().map(resolve));
    for partition in &plan.partitions {
        let id = tree.create(ElementType::Partition);
        tree.set_region(id, partition.region, SOURCE, 1.0)?;
        tree.set_children(id, partition.entries.iter().map(resolve).collect())?;
        children.push(id);
    }

    log::debug!(
        "Organizer: page {} -> {} text areas, {} partitions, {} adopted containers",
        plan.page,
        plan.areas.len(),
        plan.partitions.len(),
        plan.adoptions.len()
    );
    tree.set_children(plan.page, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsCollector;

    fn add_line(tree: &mut DocumentTree, page: ElementId, text: &str, region: Region) -> ElementId {
        let id = tree.create(ElementType::TextLine);
        tree.set_region(id, region, "detector", 0.9).unwrap();
        tree.set_text(id, text, "ocr", 0.9).unwrap();
        tree.add_child(page, id).unwrap();
        id
    }

    fn texts(tree: &DocumentTree, id: ElementId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|c| tree.text_content(*c))
            .collect()
    }

    #[test]
    fn test_page_root_is_wrapped_in_document() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        add_line(&mut tree, page, "x", Region::new(0, 0.0, 0.0, 10.0, 10.0));

        let tree = Organizer::new().run(tree).unwrap();
        assert_eq!(tree.category(tree.root()), ElementType::Document);
        assert_eq!(tree.children(tree.root()), &[page]);
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_rows_and_blocks() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        add_line(&mut tree, page, "Bye.", Region::new(0, 10.0, 60.0, 40.0, 20.0));
        add_line(&mut tree, page, "world!", Region::new(0, 80.0, 10.0, 60.0, 20.0));
        add_line(&mut tree, page, "Hello,", Region::new(0, 10.0, 10.0, 60.0, 20.0));

        let tree = Organizer::new().run(tree).unwrap();
        let areas = tree.children(page);
        assert_eq!(areas.len(), 2);
        assert!(areas
            .iter()
            .all(|a| tree.category(*a) == ElementType::TextArea));
        assert_eq!(texts(&tree, page), vec!["Hello, world!", "Bye."]);
        assert_eq!(
            tree.region(areas[0]),
            Some(Region::new(0, 10.0, 10.0, 130.0, 20.0))
        );
    }

    #[test]
    fn test_consecutive_rows_share_an_area() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        add_line(&mut tree, page, "second", Region::new(0, 10.0, 35.0, 200.0, 20.0));
        add_line(&mut tree, page, "first", Region::new(0, 10.0, 10.0, 200.0, 20.0));

        let tree = Organizer::new().run(tree).unwrap();
        assert_eq!(tree.children(page).len(), 1);
        assert_eq!(texts(&tree, page), vec!["first second"]);
    }

    #[test]
    fn test_lines_move_into_containers() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        let table = tree.create(ElementType::TableArea);
        tree.set_region(table, Region::new(0, 0.0, 100.0, 300.0, 100.0), "layout", 0.8)
            .unwrap();
        tree.add_child(page, table).unwrap();
        let inside = add_line(&mut tree, page, "cell", Region::new(0, 10.0, 110.0, 50.0, 20.0));
        add_line(&mut tree, page, "body", Region::new(0, 10.0, 10.0, 50.0, 20.0));

        let tree = Organizer::new().run(tree).unwrap();
        assert_eq!(tree.parent(inside), Some(table));
        let top = tree.children(page);
        assert_eq!(top.len(), 2);
        assert_eq!(tree.category(top[0]), ElementType::TextArea);
        assert_eq!(top[1], table);
    }

    #[test]
    fn test_nested_containers_move_under_smallest_enclosing() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        let container = |tree: &mut DocumentTree, category, region| {
            let id = tree.create(category);
            tree.set_region(id, region, "layout", 0.8).unwrap();
            tree.add_child(page, id).unwrap();
            id
        };
        let table = container(&mut tree, ElementType::TableArea, Region::new(0, 0.0, 0.0, 300.0, 100.0));
        let left = container(&mut tree, ElementType::TextArea, Region::new(0, 10.0, 10.0, 100.0, 30.0));
        let right = container(&mut tree, ElementType::TextArea, Region::new(0, 150.0, 10.0, 100.0, 30.0));
        let logo = container(&mut tree, ElementType::Figure, Region::new(0, 10.0, 60.0, 40.0, 30.0));
        // Same box twice: the earlier one holds the later one.
        let twin = container(&mut tree, ElementType::TextArea, Region::new(0, 150.0, 10.0, 100.0, 30.0));
        let line = add_line(&mut tree, page, "a", Region::new(0, 15.0, 15.0, 50.0, 20.0));

        let tree = Organizer::new().run(tree).unwrap();
        assert_eq!(tree.children(page), &[table]);
        assert_eq!(tree.children(table), &[left, right, logo]);
        assert_eq!(tree.children(right), &[twin]);
        assert_eq!(tree.parent(line), Some(left));
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_columns_become_partitions() {
        let mut tree = DocumentTree::with_root(ElementType::Page);
        let page = tree.root();
        add_line(&mut tree, page, "right", Region::new(0, 300.0, 10.0, 200.0, 20.0));
        add_line(&mut tree, page, "left", Region::new(0, 10.0, 10.0, 200.0, 20.0));
        add_line(&mut tree, page, "left 2", Region::new(0, 10.0, 35.0, 200.0, 20.0));

        let tree = Organizer::new().run(tree).unwrap();
        let partitions = tree.children(page);
        assert_eq!(partitions.len(), 2);
        assert!(partitions
            .iter()
            .all(|p| tree.category(*p) == ElementType::Partition));
        assert_eq!(texts(&tree, page), vec!["left left 2", "right"]);
        assert!(tree.check_invariants().is_empty());
    }

    #[test]
    fn test_missing_region_sorts_first_and_is_reported() {
        let collector = DiagnosticsCollector::shared();
        let mut tree = DocumentTree::with_root(ElementType::Page).with_diagnostics(collector.clone());
        let page = tree.root();
        add_line(&mut tree, page, "placed", Region::new(0, 10.0, 10.0, 50.0, 20.0));
        let bare = tree.create(ElementType::TextLine);
        tree.set_text(bare, "bare", "ocr", 0.5).unwrap();
        tree.add_child(page, bare).unwrap();

        let tree = Organizer::new().run(tree).unwrap();
        assert_eq!(tree.children(page)[0], bare);
        assert_eq!(tree.children(page).len(), 2);
        assert_eq!(
            collector.diagnostics(),
            vec![Diagnostic::MissingRegion {
                element: bare,
                category: ElementType::TextLine
            }]
        );
    }

    #[test]
    fn test_pages_sorted_by_number() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let mut pages = Vec::new();
        for page_no in [2u32, 0, 1] {
            let page = tree.create(ElementType::Page);
            tree.add_child(root, page).unwrap();
            add_line(&mut tree, page, "x", Region::new(page_no, 0.0, 0.0, 10.0, 10.0));
            pages.push(page);
        }

        let tree = Organizer::new().run(tree).unwrap();
        assert_eq!(tree.children(root), &[pages[1], pages[2], pages[0]]);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let build = || {
            let mut tree = DocumentTree::new();
            let root = tree.root();
            for page_no in 0..4u32 {
                let page = tree.create(ElementType::Page);
                tree.add_child(root, page).unwrap();
                for row in 0..5 {
                    let y = row as f32 * 40.0;
                    add_line(&mut tree, page, "a", Region::new(page_no, 10.0, y, 80.0, 20.0));
                    add_line(&mut tree, page, "b", Region::new(page_no, 400.0, y, 80.0, 20.0));
                }
            }
            tree
        };
        let parallel = Organizer::new().run(build()).unwrap();
        let sequential = Organizer::with_config(OrganizerConfig::new().sequential())
            .run(build())
            .unwrap();
        assert_eq!(parallel.to_dict(), sequential.to_dict());
    }
}
