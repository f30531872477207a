// Settled rectangles, bucketed by a spatial hash.
//
// Overlap queries only look at rectangles sharing a bucket with the query,
// so checks stay cheap while the search tries many candidates. Rectangles
// spanning more than MAX_BUCKETS_PER_RECT buckets are kept in a flat list
// and checked linearly instead.

use std::collections::HashMap;

use log::debug;

use super::{MAX_GRID_DIVISIONS, PointI, RectI, SizeI};
use crate::error::LayoutError;

const MAX_BUCKETS_PER_RECT: i64 = 64;

/// A set of rectangles that overlap queries are answered against.
#[derive(Debug, Clone)]
pub struct SpatialOccupancy {
    /// Edge length of each bucket.
    bucket_size: i32,
    /// Map from bucket coordinates to the rectangles touching that bucket.
    buckets: HashMap<(i32, i32), Vec<RectI>>,
    /// Rectangles too large to bucket.
    large: Vec<RectI>,
    len: usize,
    /// Bounding box of everything ever added. Not shrunk on removal.
    extent: Option<RectI>,
}

impl SpatialOccupancy {
    /// Bucket size should be roughly the size of a typical node.
    pub fn new(bucket_size: i32) -> Self {
        Self {
            bucket_size: bucket_size.max(1), // Avoid division by zero
            buckets: HashMap::new(),
            large: Vec::new(),
            len: 0,
            extent: None,
        }
    }

    /// Inclusive bucket coordinates `(min_x, max_x, min_y, max_y)`.
    fn bucket_bounds(&self, rect: &RectI) -> (i32, i32, i32, i32) {
        (
            rect.x.div_euclid(self.bucket_size),
            (rect.right() - 1).div_euclid(self.bucket_size),
            rect.y.div_euclid(self.bucket_size),
            (rect.bottom() - 1).div_euclid(self.bucket_size),
        )
    }

    fn is_large(&self, rect: &RectI) -> bool {
        let (min_x, max_x, min_y, max_y) = self.bucket_bounds(rect);
        let cols = i64::from(max_x) - i64::from(min_x) + 1;
        let rows = i64::from(max_y) - i64::from(min_y) + 1;
        cols > 0 && rows > 0 && cols * rows > MAX_BUCKETS_PER_RECT
    }

    fn bucket_range(&self, rect: &RectI) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (min_x, max_x, min_y, max_y) = self.bucket_bounds(rect);
        (min_x..=max_x).flat_map(move |bx| (min_y..=max_y).map(move |by| (bx, by)))
    }

    /// Insert a rectangle. Callers check for overlap first where it matters.
    /// The rectangle is expected to pass [`RectI::validate`].
    pub fn add(&mut self, rect: RectI) {
        if self.is_large(&rect) {
            self.large.push(rect);
        } else {
            for bucket in self.bucket_range(&rect) {
                self.buckets.entry(bucket).or_default().push(rect);
            }
        }
        self.len += 1;
        self.extent = Some(match self.extent {
            Some(e) => e.union(&rect),
            None => rect,
        });
    }

    /// Remove one stored copy of `rect`. Returns false if none was stored.
    pub fn remove(&mut self, rect: &RectI) -> bool {
        if self.is_large(rect) {
            let Some(idx) = self.large.iter().position(|r| r == rect) else {
                return false;
            };
            self.large.swap_remove(idx);
            self.len -= 1;
            return true;
        }

        let stored = self
            .bucket_range(rect)
            .next()
            .and_then(|b| self.buckets.get(&b))
            .is_some_and(|list| list.contains(rect));
        if !stored {
            return false;
        }

        for bucket in self.bucket_range(rect) {
            if let Some(list) = self.buckets.get_mut(&bucket) {
                if let Some(idx) = list.iter().position(|r| r == rect) {
                    list.swap_remove(idx);
                }
                if list.is_empty() {
                    self.buckets.remove(&bucket);
                }
            }
        }
        self.len -= 1;
        true
    }

    /// Check if the given rectangle overlaps anything stored right now.
    pub fn overlaps(&self, rect: &RectI) -> bool {
        if self.large.iter().any(|r| rect.overlaps(r)) {
            return true;
        }
        if self.is_large(rect) {
            return self.buckets.values().flatten().any(|r| rect.overlaps(r));
        }
        self.bucket_range(rect).any(|bucket| {
            self.buckets
                .get(&bucket)
                .is_some_and(|list| list.iter().any(|r| rect.overlaps(r)))
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn extent(&self) -> Option<RectI> {
        self.extent
    }

    /// Find a free `cell`-sized slot on a coarse grid over `area`, below the
    /// reference rectangles.
    ///
    /// Grid positions are `col * pitch_x, row * pitch_y` for `row` and `col`
    /// in `0..=divisions`, so the last row and column end flush with the
    /// area. Rows are scanned top to bottom, columns left to right. A cell
    /// is rejected if it overlaps the occupancy or sits higher than a
    /// reference within one horizontal pitch of it. Returns the center of
    /// the first admissible cell.
    pub fn find_free_cell(
        &self,
        area: SizeI,
        cell: SizeI,
        divisions: i32,
        references: &[RectI],
    ) -> Result<Option<PointI>, LayoutError> {
        cell.validate()?;
        if divisions <= 0 || divisions > MAX_GRID_DIVISIONS {
            return Err(LayoutError::InvalidConfig(format!(
                "grid divisions must be in 1..={MAX_GRID_DIVISIONS}, got {divisions}"
            )));
        }
        if area.w < cell.w || area.h < cell.h {
            return Ok(None);
        }

        let pitch_x = (area.w - cell.w) / divisions;
        let pitch_y = (area.h - cell.h) / divisions;

        for row in 0..=divisions {
            for col in 0..=divisions {
                let candidate = RectI { x: col * pitch_x, y: row * pitch_y, w: cell.w, h: cell.h };
                if self.overlaps(&candidate) {
                    continue;
                }
                let above_reference = references
                    .iter()
                    .any(|r| candidate.y < r.y && (candidate.x - r.x).abs() <= pitch_x);
                if above_reference {
                    continue;
                }

                let center = candidate.center();
                debug!(row, col, x = center.x, y = center.y; "Found free grid cell");
                return Ok(Some(center));
            }
        }
        Ok(None)
    }
}
