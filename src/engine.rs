//! Layout assistance entry points used by the editor.
//!
//! [`GraphEngine`] owns the node collection behind a mutex and builds a
//! fresh [`OverlapResolver`] for each request. Every entry point holds the
//! lock for the whole call.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::{debug, trace};

use crate::error::LayoutError;
use crate::layout::{
    LayoutConfig, Mapping, OverlapResolver, PointI, RectI, SizeI, SpatialOccupancy, resolve_position,
};

/// The editor's node storage as seen by the engine.
pub trait NodeCollection: Mapping {
    fn all_nodes(&self) -> Vec<Self::Node>;
    /// Canvas bounds, used for the free cell grid.
    fn area_size(&self) -> SizeI;
    /// Nodes with an edge into `node`.
    fn income_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
    /// Nodes `node` has an edge to.
    fn outcome_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
}

pub struct GraphEngine<G> {
    graph: Mutex<G>,
    config: LayoutConfig,
    layout_assist: AtomicBool,
}

impl<G> GraphEngine<G>
where
    G: NodeCollection,
    G::Node: Clone + Eq + Hash + Debug,
{
    /// Layout assistance starts enabled.
    pub fn new(graph: G, config: LayoutConfig) -> Result<Self, LayoutError> {
        config.validate()?;
        Ok(Self {
            graph: Mutex::new(graph),
            config,
            layout_assist: AtomicBool::new(true),
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn layout_assist(&self) -> bool {
        self.layout_assist.load(Ordering::Relaxed)
    }

    pub fn set_layout_assist(&self, enabled: bool) {
        self.layout_assist.store(enabled, Ordering::Relaxed);
    }

    fn lock(&self) -> Result<MutexGuard<'_, G>, LayoutError> {
        self.graph.lock().map_err(|_| LayoutError::Poisoned)
    }

    /// Run `f` with exclusive access to the graph.
    pub fn with_graph<R>(&self, f: impl FnOnce(&mut G) -> R) -> Result<R, LayoutError> {
        let mut graph = self.lock()?;
        Ok(f(&mut graph))
    }

    pub fn into_graph(self) -> Result<G, LayoutError> {
        self.graph.into_inner().map_err(|_| LayoutError::Poisoned)
    }

    /// `moved` has a new authoritative position. Push away whatever it now
    /// overlaps, and whatever those pushes overlap in turn.
    ///
    /// Returns the displaced nodes. A no-op while layout assistance is off.
    pub fn update_position(&self, moved: &G::Node) -> Result<Vec<G::Node>, LayoutError> {
        if !self.layout_assist() {
            trace!(moved:?; "Layout assist off, leaving nodes in place");
            return Ok(Vec::new());
        }

        let mut graph = self.lock()?;
        let nodes = graph.all_nodes();
        let mut resolver = OverlapResolver::new(nodes, &mut *graph, self.config.clone())?;
        resolver.fix(moved)?;
        let displaced = resolver.resolve()?;

        debug!(moved:?, displaced = displaced.len(); "Settled nodes after move");
        Ok(displaced)
    }

    /// Free spot for a new `size`-sized node below `references`. Nothing
    /// is moved to make room. `None` when the coarse grid has no slot.
    pub fn new_node_point(
        &self,
        size: SizeI,
        references: &[G::Node],
    ) -> Result<Option<PointI>, LayoutError> {
        size.validate()?;

        let mut graph = self.lock()?;
        let area = graph.area_size();
        let nodes = graph.all_nodes();
        let mut resolver = OverlapResolver::new(nodes, &mut *graph, self.config.clone())?;
        resolver.fix_everything()?;
        resolver.free_point_below(area, size, references)
    }

    /// Placement for when [`Self::new_node_point`] finds nothing: search
    /// outward from just below the references (or the origin without any),
    /// ignoring the canvas bounds.
    pub fn fallback_point(&self, size: SizeI, references: &[G::Node]) -> Result<PointI, LayoutError> {
        size.validate()?;

        let graph = self.lock()?;
        let nodes = graph.all_nodes();
        if let Some(unknown) = references.iter().find(|n| !nodes.contains(n)) {
            return Err(LayoutError::UnknownNode(format!("{unknown:?}")));
        }

        let mut occupancy = SpatialOccupancy::new(self.config.bucket_size);
        for node in &nodes {
            let rect = graph.fetch(node);
            rect.validate()?;
            occupancy.add(rect);
        }

        let start = match references.iter().map(|n| graph.fetch(n)).reduce(|a, b| a.union(&b)) {
            Some(below) => RectI { x: below.x.max(0), y: below.bottom().max(0), w: size.w, h: size.h },
            None => RectI { x: 0, y: 0, w: size.w, h: size.h },
        };
        let rect = if occupancy.overlaps(&start) {
            resolve_position(&occupancy, start, self.config.step, self.config.max_search_radius)?
        } else {
            start
        };
        Ok(rect.center())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, NodeId};

    fn r(x: i32, y: i32, w: i32, h: i32) -> RectI {
        RectI { x, y, w, h }
    }

    fn canvas(area: SizeI, rects: &[RectI]) -> Canvas {
        let mut canvas = Canvas::new(area);
        for (i, rect) in rects.iter().enumerate() {
            canvas.add_node(&format!("n{i}"), *rect).unwrap();
        }
        canvas
    }

    #[test]
    fn test_update_position_nudges_overlapped_nodes() {
        let c = canvas(SizeI { w: 500, h: 500 }, &[r(0, 0, 50, 50), r(100, 0, 50, 50)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();

        // Drag n1 onto n0.
        engine.with_graph(|g| g.assign(&NodeId(1), r(10, 0, 50, 50))).unwrap();
        let displaced = engine.update_position(&NodeId(1)).unwrap();
        assert_eq!(displaced, vec![NodeId(0)]);

        let g = engine.into_graph().unwrap();
        assert_eq!(g.fetch(&NodeId(1)), r(10, 0, 50, 50));
        assert!(!g.fetch(&NodeId(0)).overlaps(&g.fetch(&NodeId(1))));
    }

    #[test]
    fn test_update_position_noop_without_assist() {
        let c = canvas(SizeI { w: 500, h: 500 }, &[r(0, 0, 50, 50), r(10, 0, 50, 50)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();
        engine.set_layout_assist(false);
        assert!(!engine.layout_assist());

        let displaced = engine.update_position(&NodeId(1)).unwrap();
        assert!(displaced.is_empty());
        let g = engine.into_graph().unwrap();
        assert_eq!(g.fetch(&NodeId(0)), r(0, 0, 50, 50));
    }

    #[test]
    fn test_update_position_unknown_node() {
        let c = canvas(SizeI { w: 500, h: 500 }, &[r(0, 0, 50, 50)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();
        assert!(matches!(engine.update_position(&NodeId(5)), Err(LayoutError::UnknownNode(_))));
    }

    #[test]
    fn test_new_node_point_below_references() {
        let c = canvas(SizeI { w: 100, h: 100 }, &[r(0, 0, 50, 50), r(50, 0, 50, 50)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();

        let point = engine
            .new_node_point(SizeI { w: 50, h: 50 }, &[NodeId(0), NodeId(1)])
            .unwrap();
        assert_eq!(point, Some(PointI { x: 25, y: 75 }));

        // Nothing moved to make room.
        let g = engine.into_graph().unwrap();
        assert_eq!(g.fetch(&NodeId(0)), r(0, 0, 50, 50));
        assert_eq!(g.fetch(&NodeId(1)), r(50, 0, 50, 50));
    }

    #[test]
    fn test_new_node_point_keeps_overlapping_nodes() {
        let c = canvas(SizeI { w: 400, h: 400 }, &[r(0, 0, 50, 50), r(10, 10, 50, 50)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();
        engine.new_node_point(SizeI { w: 20, h: 20 }, &[]).unwrap();

        let g = engine.into_graph().unwrap();
        assert_eq!(g.fetch(&NodeId(1)), r(10, 10, 50, 50));
    }

    #[test]
    fn test_new_node_point_none_and_fallback() {
        let c = canvas(SizeI { w: 100, h: 100 }, &[r(0, 0, 100, 100)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();
        let size = SizeI { w: 50, h: 50 };

        assert_eq!(engine.new_node_point(size, &[NodeId(0)]).unwrap(), None);

        let point = engine.fallback_point(size, &[NodeId(0)]).unwrap();
        assert_eq!(point, PointI { x: 25, y: 125 });
    }

    #[test]
    fn test_fallback_point_without_references_searches_from_origin() {
        let c = canvas(SizeI { w: 100, h: 100 }, &[r(0, 0, 10, 10)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();

        // Both radius 1 candidates, (0,5) and (5,0), still overlap.
        // Radius 2 reaches (0,10) first.
        let point = engine.fallback_point(SizeI { w: 10, h: 10 }, &[]).unwrap();
        assert_eq!(point, PointI { x: 5, y: 15 });
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let c = canvas(SizeI { w: 100, h: 100 }, &[r(0, 0, 10, 10)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();
        let size = SizeI { w: 10, h: 10 };

        let result = engine.new_node_point(size, &[NodeId(5)]);
        assert!(matches!(result, Err(LayoutError::UnknownNode(_))));
        let result = engine.fallback_point(size, &[NodeId(0), NodeId(5)]);
        assert!(matches!(result, Err(LayoutError::UnknownNode(_))));
    }

    #[test]
    fn test_update_position_rejects_out_of_range_move() {
        let c = canvas(SizeI { w: 500, h: 500 }, &[r(0, 0, 50, 50), r(100, 0, 50, 50)]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();

        let far = r(2_147_483_600, 0, 100, 10);
        engine.with_graph(|g| g.assign(&NodeId(1), far)).unwrap();
        let result = engine.update_position(&NodeId(1));
        assert!(matches!(result, Err(LayoutError::InvalidRect { .. })));

        let g = engine.into_graph().unwrap();
        assert_eq!(g.fetch(&NodeId(0)), r(0, 0, 50, 50));
    }

    #[test]
    fn test_new_node_point_rejects_invalid_size() {
        let c = canvas(SizeI { w: 100, h: 100 }, &[]);
        let engine = GraphEngine::new(c, LayoutConfig::default()).unwrap();
        let result = engine.new_node_point(SizeI { w: -1, h: 10 }, &[]);
        assert!(matches!(result, Err(LayoutError::InvalidSize { .. })));
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let cfg = LayoutConfig { grid_divisions: 0, ..LayoutConfig::default() };
        assert!(GraphEngine::new(Canvas::new(SizeI { w: 10, h: 10 }), cfg).is_err());
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let rects: Vec<RectI> = (0..8).map(|i| r(i * 10, 0, 40, 40)).collect();
        let engine = GraphEngine::new(canvas(SizeI { w: 800, h: 800 }, &rects), LayoutConfig::default()).unwrap();

        std::thread::scope(|s| {
            for i in 0..4 {
                let engine = &engine;
                s.spawn(move || engine.update_position(&NodeId(i)).unwrap());
            }
        });

        let g = engine.into_graph().unwrap();
        let settled: Vec<RectI> = g.all_nodes().iter().map(|n| g.fetch(n)).collect();
        for (i, a) in settled.iter().enumerate() {
            for b in &settled[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }
}
