//! Error type shared by the layout, engine and boundary layers.

use thiserror::Error;

use crate::layout::{RectI, SizeI};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid rectangle {rect:?}: size must be positive and coordinates within ±2^28")]
    InvalidRect { rect: RectI },

    #[error("invalid size {size:?}: width and height must be in 1..=2^28")]
    InvalidSize { size: SizeI },

    #[error("invalid layout config: {0}")]
    InvalidConfig(String),

    #[error("no free position for {start:?} within search radius {radius}")]
    SearchExhausted { start: RectI, radius: i32 },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    #[error("graph lock poisoned")]
    Poisoned,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
