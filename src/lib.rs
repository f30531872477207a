//! Layout assistance for a diagram editor canvas.
//!
//! - [`layout`]: rectangle geometry, the occupancy set and the overlap
//!   resolver
//! - [`engine`]: `update_position` / `new_node_point` over a node collection
//! - [`canvas`]: an in-memory node collection
//! - `wasm`: JSON entry points for the editor front end

pub mod canvas;
pub mod engine;
pub mod error;
pub mod layout;
pub mod output;
mod wasm;

pub use canvas::{Canvas, NodeId};
pub use engine::{GraphEngine, NodeCollection};
pub use error::LayoutError;
pub use layout::{LayoutConfig, Mapping, OverlapResolver, PointI, RectI, SizeI, SpatialOccupancy};
pub use wasm::{new_node_point, settle_after_move};
