//! Output types for the editor front end.
//!
//! These structs are serialized to JSON and handed back across the wasm
//! boundary.

use serde::Serialize;

use crate::error::LayoutError;
use crate::layout::{PointI, RectI};

/// A node's settled rectangle
#[derive(Debug, Clone, Serialize)]
pub struct NodeOutput {
    pub id: String,
    pub bounds: RectI,
    /// Whether the node was pushed away from where it was
    pub moved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl From<&LayoutError> for ErrorInfo {
    fn from(err: &LayoutError) -> Self {
        Self { message: err.to_string() }
    }
}

/// Result of settling the canvas after a move
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettleOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Where to put a new node
#[derive(Debug, Clone, Default, Serialize)]
pub struct PointOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<PointI>,
    /// True when the coarse grid had no slot and the outward search was used
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}
