//! JSON contract with the reference layout engine.

use serde::{Deserialize, Serialize};

use crate::errors::{ParityError, Result};
use crate::model::{Direction, Edge, InputGraph, NodeId, PlacedNode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRequest {
    pub input_node_ids: Vec<NodeId>,
    pub input_edges: Vec<Edge>,
    pub direction: Direction,
}

impl ReferenceRequest {
    pub fn from_graph(graph: &InputGraph, direction: Direction) -> Self {
        Self {
            input_node_ids: graph.nodes().to_vec(),
            input_edges: graph.edges().to_vec(),
            direction,
        }
    }
}

/// Either bare coordinates, or coordinates plus explicit per-rank logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReferenceResponse {
    Coordinates(Vec<PlacedNode>),
    Detailed {
        rows: Vec<PlacedNode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        layers: Option<Vec<Vec<NodeId>>>,
    },
}

impl ReferenceResponse {
    pub fn rows(&self) -> &[PlacedNode] {
        match self {
            Self::Coordinates(rows) | Self::Detailed { rows, .. } => rows,
        }
    }

    pub fn layers(&self) -> Option<&[Vec<NodeId>]> {
        match self {
            Self::Coordinates(_) => None,
            Self::Detailed { layers, .. } => layers.as_deref(),
        }
    }

    /// Decode a response payload. Missing fields are parse errors; fields of
    /// the wrong element type are shape errors.
    pub fn from_json(fixture: &str, text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            ParityError::parse(fixture, format!("reference response is not JSON: {e}"))
        })?;
        match value {
            serde_json::Value::Array(_) => Ok(Self::Coordinates(decode_rows(fixture, value)?)),
            serde_json::Value::Object(mut obj) => {
                let rows = obj.remove("rows").ok_or_else(|| {
                    ParityError::parse(fixture, "reference response is missing 'rows'")
                })?;
                let rows = decode_rows(fixture, rows)?;
                let layers = match obj.remove("layers") {
                    None | Some(serde_json::Value::Null) => None,
                    Some(raw) => Some(serde_json::from_value(raw.clone()).map_err(|_| {
                        ParityError::shape(fixture, "layers", truncate(&raw.to_string()))
                    })?),
                };
                Ok(Self::Detailed { rows, layers })
            }
            other => Err(ParityError::shape(
                fixture,
                "reference response",
                truncate(&other.to_string()),
            )),
        }
    }
}

fn decode_rows(fixture: &str, value: serde_json::Value) -> Result<Vec<PlacedNode>> {
    let serde_json::Value::Array(items) = value else {
        return Err(ParityError::shape(
            fixture,
            "rows",
            truncate(&value.to_string()),
        ));
    };
    items
        .into_iter()
        .map(|item| {
            if let Some(obj) = item.as_object() {
                for key in ["id", "x", "y"] {
                    if !obj.contains_key(key) {
                        return Err(ParityError::parse(
                            fixture,
                            format!("reference row is missing '{key}'"),
                        ));
                    }
                }
            }
            serde_json::from_value::<PlacedNode>(item.clone())
                .map_err(|_| ParityError::shape(fixture, "reference row", truncate(&item.to_string())))
        })
        .collect()
}

fn truncate(s: &str) -> String {
    s.chars().take(120).collect()
}
