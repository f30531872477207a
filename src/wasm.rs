//! WASM bindings for the nodeplace-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Each one takes the canvas as JSON and returns JSON; failures are
//! reported in the `error` field of the output.

use std::collections::HashSet;

use log::warn;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::canvas::{Canvas, CanvasInput, NodeId};
use crate::engine::GraphEngine;
use crate::error::LayoutError;
use crate::layout::SizeI;
use crate::output::{ErrorInfo, NodeOutput, PointOutput, SettleOutput};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

fn to_json<T: Serialize>(output: &T) -> String {
    serde_json::to_string(output)
        .unwrap_or_else(|_| "{\"error\": {\"message\": \"failed to serialize output\"}}".to_string())
}

/// `moved_id` was dragged to the position given in the canvas. Returns
/// every node's settled bounds.
#[wasm_bindgen]
pub fn settle_after_move(canvas_json: &str, moved_id: &str, assist: bool) -> String {
    let output = settle(canvas_json, moved_id, assist).unwrap_or_else(|e| {
        console_error(&format!("Error settling canvas: {e}"));
        SettleOutput { nodes: vec![], error: Some(ErrorInfo::from(&e)) }
    });
    to_json(&output)
}

/// Point for a new `width` x `height` node below the nodes listed in
/// `references_json` (a JSON array of node ids).
#[wasm_bindgen]
pub fn new_node_point(canvas_json: &str, width: i32, height: i32, references_json: &str) -> String {
    let output = place_new_node(canvas_json, SizeI { w: width, h: height }, references_json)
        .unwrap_or_else(|e| {
            console_error(&format!("Error placing new node: {e}"));
            PointOutput { point: None, fallback: false, error: Some(ErrorInfo::from(&e)) }
        });
    to_json(&output)
}

fn load(canvas_json: &str) -> Result<(Canvas, CanvasInput), LayoutError> {
    let input: CanvasInput = serde_json::from_str(canvas_json)?;
    let canvas = Canvas::from_input(&input)?;
    Ok((canvas, input))
}

fn settle(canvas_json: &str, moved_id: &str, assist: bool) -> Result<SettleOutput, LayoutError> {
    let (canvas, input) = load(canvas_json)?;
    let moved = canvas
        .find(moved_id)
        .ok_or_else(|| LayoutError::UnknownNode(moved_id.to_string()))?;

    let engine = GraphEngine::new(canvas, input.config)?;
    engine.set_layout_assist(assist);
    let displaced: HashSet<NodeId> = engine.update_position(&moved)?.into_iter().collect();

    let canvas = engine.into_graph()?;
    let nodes = canvas
        .nodes
        .iter()
        .map(|n| NodeOutput {
            id: n.id.clone(),
            bounds: n.bounds,
            moved: displaced.contains(&n.nid),
        })
        .collect();
    Ok(SettleOutput { nodes, error: None })
}

fn place_new_node(canvas_json: &str, size: SizeI, references_json: &str) -> Result<PointOutput, LayoutError> {
    let (canvas, input) = load(canvas_json)?;
    let reference_ids: Vec<String> = serde_json::from_str(references_json)?;
    let references = reference_ids
        .iter()
        .map(|id| canvas.find(id).ok_or_else(|| LayoutError::UnknownNode(id.clone())))
        .collect::<Result<Vec<NodeId>, _>>()?;

    let engine = GraphEngine::new(canvas, input.config)?;
    if let Some(point) = engine.new_node_point(size, &references)? {
        return Ok(PointOutput { point: Some(point), fallback: false, error: None });
    }

    warn!(w = size.w, h = size.h; "No free grid cell, falling back to outward search");
    let point = engine.fallback_point(size, &references)?;
    Ok(PointOutput { point: Some(point), fallback: true, error: None })
}
