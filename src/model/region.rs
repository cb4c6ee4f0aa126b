//! Page-relative geometry.

use serde::{Deserialize, Serialize};

/// A rectangular area on a page.
///
/// Coordinates grow rightwards (`x`) and downwards (`y`) from the top-left
/// corner of the page, in whatever unit the detector reports (pixels or
/// points). Regions are plain values: they are copied, never shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Page index the region lives on
    pub page_no: u32,
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Horizontal extent
    #[serde(default)]
    pub width: f32,
    /// Vertical extent
    #[serde(default)]
    pub height: f32,
}

impl Region {
    /// Create a new region.
    pub fn new(page_no: u32, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            page_no,
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zero-sized region at a point.
    pub fn point(page_no: u32, x: f32, y: f32) -> Self {
        Self::new(page_no, x, y, 0.0, 0.0)
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point as `(x, y)`.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Area of the region.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Check whether a point lies inside this region (edges inclusive).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Check whether another region's center lies inside this one.
    pub fn contains_center_of(&self, other: &Region) -> bool {
        if self.page_no != other.page_no {
            return false;
        }
        let (cx, cy) = other.center();
        self.contains_point(cx, cy)
    }

    /// Length of the overlap of the two vertical extents (0 when disjoint).
    pub fn vertical_overlap(&self, other: &Region) -> f32 {
        (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0)
    }

    /// Length of the overlap of the two horizontal extents (0 when disjoint).
    pub fn horizontal_overlap(&self, other: &Region) -> f32 {
        (self.right().min(other.right()) - self.x.max(other.x)).max(0.0)
    }

    /// Horizontal whitespace between the two regions (0 when they overlap).
    pub fn horizontal_gap(&self, other: &Region) -> f32 {
        (self.x.max(other.x) - self.right().min(other.right())).max(0.0)
    }

    /// Vertical whitespace between the two regions (0 when they overlap).
    pub fn vertical_gap(&self, other: &Region) -> f32 {
        (self.y.max(other.y) - self.bottom().min(other.bottom())).max(0.0)
    }

    /// Smallest region covering both. The page of `self` is kept.
    pub fn union(&self, other: &Region) -> Region {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Region {
            page_no: self.page_no,
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Bounding region of a set of regions, `None` when empty.
    pub fn bounding<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Option<Region> {
        regions
            .into_iter()
            .fold(None, |acc: Option<Region>, r| match acc {
                Some(a) => Some(a.union(r)),
                None => Some(*r),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_and_center() {
        let r = Region::new(0, 10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.center(), (25.0, 40.0));
        assert_eq!(r.area(), 1200.0);
    }

    #[test]
    fn test_overlap_and_gap() {
        let a = Region::new(0, 0.0, 0.0, 50.0, 20.0);
        let b = Region::new(0, 60.0, 5.0, 40.0, 20.0);
        assert_eq!(a.vertical_overlap(&b), 15.0);
        assert_eq!(a.horizontal_overlap(&b), 0.0);
        assert_eq!(a.horizontal_gap(&b), 10.0);
        assert_eq!(a.vertical_gap(&b), 0.0);
    }

    #[test]
    fn test_containment_respects_page() {
        let outer = Region::new(1, 0.0, 0.0, 100.0, 100.0);
        let inner = Region::new(1, 10.0, 10.0, 10.0, 10.0);
        let elsewhere = Region::new(2, 10.0, 10.0, 10.0, 10.0);
        assert!(outer.contains_center_of(&inner));
        assert!(!outer.contains_center_of(&elsewhere));
    }

    #[test]
    fn test_bounding() {
        let regions = [
            Region::new(0, 10.0, 10.0, 10.0, 10.0),
            Region::new(0, 50.0, 0.0, 10.0, 5.0),
        ];
        let b = Region::bounding(regions.iter()).unwrap();
        assert_eq!(b, Region::new(0, 10.0, 0.0, 50.0, 20.0));
        assert!(Region::bounding(std::iter::empty()).is_none());
    }
}
