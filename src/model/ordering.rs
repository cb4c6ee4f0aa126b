//! Deterministic geometric orderings.
//!
//! Both orderings are total (`f32::total_cmp`) and used with stable sorts,
//! so elements with equal keys keep their insertion order.

use std::cmp::Ordering;

use super::{DocumentTree, ElementId, Region};

/// Weight of the vertical coordinate in the reading-order key.
pub const ROW_WEIGHT: f32 = 5.0;

/// Reading-order key: page first, then `x + 5*y`.
///
/// Weighting `y` makes rows dominate columns, approximating a
/// left-to-right, top-to-bottom scan. Elements without a region get
/// `(0, 0.0)` and therefore sort first.
pub fn geometric_key(region: Option<&Region>) -> (u32, f32) {
    match region {
        Some(r) => (r.page_no, r.x + r.y * ROW_WEIGHT),
        None => (0, 0.0),
    }
}

/// Table key: page, then `y`, then `x`. Missing regions sort first.
pub fn table_key(region: Option<&Region>) -> (u32, f32, f32) {
    match region {
        Some(r) => (r.page_no, r.y, r.x),
        None => (0, 0.0, 0.0),
    }
}

/// Compare two reading-order keys.
pub fn cmp_geometric(a: (u32, f32), b: (u32, f32)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1))
}

/// Compare two table keys.
pub fn cmp_table(a: (u32, f32, f32), b: (u32, f32, f32)) -> Ordering {
    a.0.cmp(&b.0)
        .then_with(|| a.1.total_cmp(&b.1))
        .then_with(|| a.2.total_cmp(&b.2))
}

/// Stable sort of element handles in reading order.
pub fn sort_geometric(tree: &DocumentTree, ids: &mut [ElementId]) {
    ids.sort_by(|a, b| {
        cmp_geometric(
            geometric_key(tree.region(*a).as_ref()),
            geometric_key(tree.region(*b).as_ref()),
        )
    });
}

/// Stable sort of element handles in table order.
pub fn sort_table(tree: &DocumentTree, ids: &mut [ElementId]) {
    ids.sort_by(|a, b| {
        cmp_table(
            table_key(tree.region(*a).as_ref()),
            table_key(tree.region(*b).as_ref()),
        )
    });
}
