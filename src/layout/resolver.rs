// Fixed/pending bookkeeping and the placement search.
//
// Nodes start out pending. Fixed nodes are committed to the occupancy as
// they are. `resolve` then walks the pending nodes in order: a node that
// fits stays put, a node that collides is moved to the first free spot of
// an expanding diamond around its old position. Every settled rectangle is
// committed before the next node is checked, so displacement cascades.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use log::{debug, trace, warn};

use super::{COORD_LIMIT, LayoutConfig, Mapping, PointI, RectI, SizeI, SpatialOccupancy};
use crate::error::LayoutError;

/// Settles a collection of nodes so that no two rectangles overlap.
///
/// Built per request and consumed by [`OverlapResolver::resolve`].
pub struct OverlapResolver<'m, M: Mapping> {
    mapping: &'m mut M,
    /// Not yet checked, in insertion order.
    pending: Vec<M::Node>,
    fixed: HashSet<M::Node>,
    occupancy: SpatialOccupancy,
    config: LayoutConfig,
}

impl<'m, M> OverlapResolver<'m, M>
where
    M: Mapping,
    M::Node: Clone + Eq + Hash + Debug,
{
    /// All `nodes` start pending. Duplicates keep their first position.
    pub fn new(
        nodes: impl IntoIterator<Item = M::Node>,
        mapping: &'m mut M,
        config: LayoutConfig,
    ) -> Result<Self, LayoutError> {
        config.validate()?;

        let mut seen = HashSet::new();
        let pending: Vec<M::Node> = nodes.into_iter().filter(|n| seen.insert(n.clone())).collect();

        Ok(Self {
            mapping,
            pending,
            fixed: HashSet::new(),
            occupancy: SpatialOccupancy::new(config.bucket_size),
            config,
        })
    }

    /// Commit `node` where it is. It will not be moved by `resolve`.
    pub fn fix(&mut self, node: &M::Node) -> Result<(), LayoutError> {
        if self.fixed.contains(node) {
            trace!(node:?; "Node already fixed");
            return Ok(());
        }
        let idx = self
            .pending
            .iter()
            .position(|n| n == node)
            .ok_or_else(|| LayoutError::UnknownNode(format!("{node:?}")))?;

        let rect = self.mapping.fetch(node);
        rect.validate()?;

        let node = self.pending.remove(idx);
        self.occupancy.add(rect);
        self.fixed.insert(node);
        Ok(())
    }

    /// Commit every pending node where it is.
    pub fn fix_everything(&mut self) -> Result<(), LayoutError> {
        for node in &self.pending {
            self.mapping.fetch(node).validate()?;
        }

        for node in std::mem::take(&mut self.pending) {
            self.occupancy.add(self.mapping.fetch(&node));
            self.fixed.insert(node);
        }
        Ok(())
    }

    /// Settle every pending node and return the ones that had to move,
    /// in the order they were settled.
    pub fn resolve(mut self) -> Result<Vec<M::Node>, LayoutError> {
        // Reject bad geometry before anything is searched.
        for node in &self.pending {
            self.mapping.fetch(node).validate()?;
        }

        // Nothing is written back until every node has a place.
        let mut placements = Vec::new();
        for node in std::mem::take(&mut self.pending) {
            let start = self.mapping.fetch(&node);

            let rect = if self.occupancy.overlaps(&start) {
                let placed = resolve_position(
                    &self.occupancy,
                    start,
                    self.config.step,
                    self.config.max_search_radius,
                )?;
                debug!(node:?, from:? = start, to:? = placed; "Node displaced");
                placements.push((node.clone(), placed));
                placed
            } else {
                trace!(node:?; "Node fits in place");
                start
            };

            self.occupancy.add(rect);
            self.fixed.insert(node);
        }

        let mut moved = Vec::with_capacity(placements.len());
        for (node, rect) in placements {
            self.mapping.assign(&node, rect);
            moved.push(node);
        }
        Ok(moved)
    }

    /// Free grid point for a `size`-sized node below `references`,
    /// checked against everything committed so far.
    pub fn free_point_below(
        &self,
        area: SizeI,
        size: SizeI,
        references: &[M::Node],
    ) -> Result<Option<PointI>, LayoutError> {
        let mut reference_rects = Vec::with_capacity(references.len());
        for node in references {
            if !self.fixed.contains(node) && !self.pending.contains(node) {
                return Err(LayoutError::UnknownNode(format!("{node:?}")));
            }
            reference_rects.push(self.mapping.fetch(node));
        }
        self.occupancy
            .find_free_cell(area, size, self.config.grid_divisions, &reference_rects)
    }

    pub fn pending(&self) -> &[M::Node] {
        &self.pending
    }

    pub fn is_fixed(&self, node: &M::Node) -> bool {
        self.fixed.contains(node)
    }

    pub fn occupancy(&self) -> &SpatialOccupancy {
        &self.occupancy
    }
}

/// Far edge a search candidate may reach. Validated starts leave the
/// guaranteed candidate of the derived bound below this, and unions of
/// settled rectangles stay inside `i32`.
const SEARCH_LIMIT: i64 = 4 * COORD_LIMIT as i64;

/// Find the first rectangle of `start`'s size that overlaps nothing in
/// `occupancy`, searching outward from `start`.
///
/// Offsets are scaled by `step`. For each radius `sum = 1, 2, ...`, `x`
/// runs from `-sum` to `sum` and for each `x` the vertical offset
/// `sum - |x|` is tried downward first, then upward. Candidates with a
/// negative coordinate are skipped. The first free candidate wins; no
/// distance comparison is made within a radius.
///
/// Without `max_radius` the bound is derived from the occupied extent. It
/// can only be exhausted once settled rectangles crowd [`SEARCH_LIMIT`].
pub fn resolve_position(
    occupancy: &SpatialOccupancy,
    start: RectI,
    step: i32,
    max_radius: Option<i32>,
) -> Result<RectI, LayoutError> {
    start.validate()?;
    if step <= 0 || step > COORD_LIMIT {
        return Err(LayoutError::InvalidConfig(format!("step must be in 1..={COORD_LIMIT}, got {step}")));
    }
    let limit = max_radius.unwrap_or_else(|| derived_radius(occupancy, start, step));

    // Offsets are computed in i64. Candidates that go negative or reach past
    // SEARCH_LIMIT are skipped.
    let coord = |origin: i32, offset: i32, extent: i32| -> Option<i32> {
        let v = i64::from(origin) + i64::from(step) * i64::from(offset);
        if v < 0 || v + i64::from(extent) > SEARCH_LIMIT {
            return None;
        }
        i32::try_from(v).ok()
    };

    for sum in 1..=limit {
        for x in -sum..=sum {
            let Some(cx) = coord(start.x, x, start.w) else {
                continue;
            };
            let dy = sum - x.abs();
            let tries = if dy == 0 { 1 } else { 2 };
            for &y in &[dy, -dy][..tries] {
                let Some(cy) = coord(start.y, y, start.h) else {
                    continue;
                };
                let candidate = RectI { x: cx, y: cy, w: start.w, h: start.h };
                if !occupancy.overlaps(&candidate) {
                    return Ok(candidate);
                }
            }
        }
    }

    warn!(start:?, radius = limit; "Placement search exhausted");
    Err(LayoutError::SearchExhausted { start, radius: limit })
}

/// Radius at which the candidate `sum` steps to the right (and down far
/// enough to leave negative space) clears the right edge of everything
/// stored, so it is guaranteed to be free.
fn derived_radius(occupancy: &SpatialOccupancy, start: RectI, step: i32) -> i32 {
    let step = i64::from(step);
    let right = occupancy.extent().map_or(0, |e| i64::from(e.right())).max(0);
    let across = ceil_div((right - i64::from(start.x)).max(0), step);
    let down = ceil_div((-i64::from(start.y)).max(0), step);
    i32::try_from((across + down).max(1)).unwrap_or(i32::MAX)
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}
