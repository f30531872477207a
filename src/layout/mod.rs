// Overlap resolution for node rectangles on a canvas.
//
// Goals:
// - Deterministic: pending nodes are settled in insertion order
// - Fixed nodes never move
// - Nodes that already fit keep their position exactly
// - Colliding nodes move along an expanding diamond around where they were
// - No overlap between settled rectangles
//
// Submodules:
// - occupancy: settled rectangles, overlap queries, free cell search
// - resolver: fixed/pending bookkeeping and the placement search

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

mod occupancy;
mod resolver;

pub use occupancy::SpatialOccupancy;
pub use resolver::{OverlapResolver, resolve_position};

/// Largest accepted coordinate magnitude and rectangle extent. Keeps every
/// edge and every search candidate well inside `i32`.
pub const COORD_LIMIT: i32 = 1 << 28;

/// Largest accepted free cell grid resolution.
pub const MAX_GRID_DIVISIONS: i32 = 1000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointI {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeI {
    pub w: i32,
    pub h: i32,
}

impl SizeI {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.w <= 0 || self.h <= 0 || self.w > COORD_LIMIT || self.h > COORD_LIMIT {
            return Err(LayoutError::InvalidSize { size: *self });
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl RectI {
    pub fn right(&self) -> i32 { self.x + self.w }
    pub fn bottom(&self) -> i32 { self.y + self.h }

    pub fn size(&self) -> SizeI {
        SizeI { w: self.w, h: self.h }
    }

    pub fn center(&self) -> PointI {
        PointI { x: self.x + self.w / 2, y: self.y + self.h / 2 }
    }

    /// Interiors intersect. Shared edges and corners are not an overlap.
    pub fn overlaps(&self, other: &RectI) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn union(&self, other: &RectI) -> RectI {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        RectI { x: x0, y: y0, w: x1 - x0, h: y1 - y0 }
    }

    /// Positive size no larger than [`COORD_LIMIT`], origin within
    /// `±COORD_LIMIT`.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let in_range = |v: i32| (-COORD_LIMIT..=COORD_LIMIT).contains(&v);
        if self.w <= 0 || self.h <= 0 || self.w > COORD_LIMIT || self.h > COORD_LIMIT {
            return Err(LayoutError::InvalidRect { rect: *self });
        }
        if !in_range(self.x) || !in_range(self.y) {
            return Err(LayoutError::InvalidRect { rect: *self });
        }
        Ok(())
    }
}

/// Read/write access to the rectangle of a node kept elsewhere.
///
/// After `assign(node, r)`, `fetch(node)` must return `r`.
pub trait Mapping {
    type Node;

    fn fetch(&self, node: &Self::Node) -> RectI;
    fn assign(&mut self, node: &Self::Node, rect: RectI);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance moved per search offset unit.
    pub step: i32,
    /// Grid resolution per axis when looking for a free cell.
    pub grid_divisions: i32,
    /// Edge length of the spatial hash buckets.
    pub bucket_size: i32,
    /// Upper bound on the search radius. `None` derives it from the
    /// occupied extent, which always leaves room for a free candidate.
    pub max_search_radius: Option<i32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            step: 5,
            grid_divisions: 10,
            bucket_size: 100,
            max_search_radius: None,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        check_range("step", self.step, COORD_LIMIT)?;
        check_range("grid_divisions", self.grid_divisions, MAX_GRID_DIVISIONS)?;
        check_range("bucket_size", self.bucket_size, COORD_LIMIT)?;
        if let Some(radius) = self.max_search_radius {
            check_range("max_search_radius", radius, COORD_LIMIT)?;
        }
        Ok(())
    }
}

fn check_range(name: &str, value: i32, max: i32) -> Result<(), LayoutError> {
    if value <= 0 || value > max {
        return Err(LayoutError::InvalidConfig(format!(
            "{name} must be in 1..={max}, got {value}"
        )));
    }
    Ok(())
}
