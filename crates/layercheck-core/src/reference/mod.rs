//! Reference layering reconstruction.
//!
//! Explicit per-rank logs from the reference engine are taken as-is. Without
//! them, layers are rebuilt from final coordinates by bucketing along the
//! major axis of the layout direction.

mod engine;
mod protocol;

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::model::{Direction, InputGraph, Layer, Layering, PlacedNode};

pub use engine::{CommandReferenceEngine, RecordedReferenceEngine, ReferenceEngine};
pub use protocol::{ReferenceRequest, ReferenceResponse};

/// Major-axis distance (layout units) beyond which a node opens a new layer.
pub const LAYER_EPSILON: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrigin {
    ExplicitLayers,
    Coordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLayering {
    pub layering: Layering,
    pub origin: LayerOrigin,
}

/// Reference layering over the node set of `graph`. Ids outside the graph
/// are dropped.
pub fn build_reference_layering(
    graph: &InputGraph,
    direction: Direction,
    response: &ReferenceResponse,
) -> ReferenceLayering {
    let known = graph.node_set();
    match response.layers() {
        Some(layers) => {
            let layers: Vec<Layer> = layers
                .iter()
                .map(|layer| {
                    layer
                        .iter()
                        .filter(|id| known.contains(id.as_str()))
                        .cloned()
                        .collect::<Layer>()
                })
                .filter(|layer| !layer.is_empty())
                .collect();
            ReferenceLayering {
                layering: Layering::new(layers),
                origin: LayerOrigin::ExplicitLayers,
            }
        }
        None => {
            let rows: Vec<PlacedNode> = response
                .rows()
                .iter()
                .filter(|row| known.contains(row.id.as_str()))
                .cloned()
                .collect();
            ReferenceLayering {
                layering: bucket_by_coordinate(&rows, direction, LAYER_EPSILON),
                origin: LayerOrigin::Coordinates,
            }
        }
    }
}

/// Group placed nodes into layers along the major axis.
///
/// Nodes are sorted by (major, minor, id); a node whose major coordinate is
/// more than `epsilon` from the current layer's anchor opens a new layer and
/// becomes its anchor. Repeated ids keep their first row.
pub fn bucket_by_coordinate(rows: &[PlacedNode], direction: Direction, epsilon: f64) -> Layering {
    let major = direction.major_axis();
    let mut seen = HashSet::with_capacity(rows.len());
    let mut sorted: Vec<&PlacedNode> = rows.iter().filter(|r| seen.insert(&r.id)).collect();
    if sorted.len() < rows.len() {
        tracing::warn!(
            dropped = rows.len() - sorted.len(),
            "duplicate node ids in reference coordinates"
        );
    }
    sorted.sort_by(|a, b| coordinate_order(a, b, direction));

    let mut layers: Vec<Layer> = Vec::new();
    let mut anchor: Option<f64> = None;
    for node in sorted {
        let c = node.coord(major);
        match anchor {
            Some(a) if (c - a).abs() <= epsilon => {}
            _ => {
                layers.push(Vec::new());
                anchor = Some(c);
            }
        }
        if let Some(layer) = layers.last_mut() {
            layer.push(node.id.clone());
        }
    }
    Layering::new(layers)
}

/// Total order used for coordinate sorts: major, then minor, then id.
pub fn coordinate_order(a: &PlacedNode, b: &PlacedNode, direction: Direction) -> Ordering {
    let major = direction.major_axis();
    let minor = major.other();
    a.coord(major)
        .total_cmp(&b.coord(major))
        .then_with(|| a.coord(minor).total_cmp(&b.coord(minor)))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edge;

    fn graph(ids: &[&str]) -> InputGraph {
        InputGraph::new(
            ids.iter().map(|s| (*s).to_string()).collect(),
            vec![Edge {
                source: ids[0].to_string(),
                target: ids[0].to_string(),
            }],
        )
    }

    #[test]
    fn buckets_vertical_layout_by_y_with_jitter() {
        let rows = vec![
            PlacedNode::new("c", 40.0, 100.4),
            PlacedNode::new("b", 80.0, 0.3),
            PlacedNode::new("a", 10.0, 0.0),
            PlacedNode::new("d", 5.0, 100.0),
        ];
        let l = bucket_by_coordinate(&rows, Direction::TB, LAYER_EPSILON);
        assert_eq!(l, Layering::from_slices(&[&["a", "b"], &["d", "c"]]));
    }

    #[test]
    fn buckets_horizontal_layout_by_x() {
        let rows = vec![
            PlacedNode::new("a", 0.0, 30.0),
            PlacedNode::new("b", 0.0, 10.0),
            PlacedNode::new("c", 120.0, 0.0),
        ];
        let l = bucket_by_coordinate(&rows, Direction::LR, LAYER_EPSILON);
        assert_eq!(l, Layering::from_slices(&[&["b", "a"], &["c"]]));
    }

    #[test]
    fn anchor_resets_at_each_boundary() {
        // 0.0 -> 0.4 stays, 0.9 is > 0.5 from anchor 0.0 and opens a layer.
        let rows = vec![
            PlacedNode::new("a", 0.0, 0.0),
            PlacedNode::new("b", 1.0, 0.4),
            PlacedNode::new("c", 2.0, 0.9),
            PlacedNode::new("d", 3.0, 1.3),
        ];
        let l = bucket_by_coordinate(&rows, Direction::TB, LAYER_EPSILON);
        assert_eq!(l, Layering::from_slices(&[&["a", "b"], &["c", "d"]]));
    }

    #[test]
    fn gap_of_exactly_epsilon_stays_in_layer() {
        let rows = vec![
            PlacedNode::new("a", 0.0, 0.0),
            PlacedNode::new("b", 1.0, 0.5),
            PlacedNode::new("c", 2.0, 1.0),
        ];
        let l = bucket_by_coordinate(&rows, Direction::TB, LAYER_EPSILON);
        assert_eq!(l, Layering::from_slices(&[&["a", "b"], &["c"]]));
    }

    #[test]
    fn ties_on_both_axes_break_by_id() {
        let rows = vec![
            PlacedNode::new("z", 0.0, 0.0),
            PlacedNode::new("m", 0.0, 0.0),
        ];
        let l = bucket_by_coordinate(&rows, Direction::TB, LAYER_EPSILON);
        assert_eq!(l, Layering::from_slices(&[&["m", "z"]]));
    }

    #[test]
    fn no_placed_nodes_yield_empty_layering() {
        let resp = ReferenceResponse::Coordinates(vec![PlacedNode::new("ghost", 0.0, 0.0)]);
        let built = build_reference_layering(&graph(&["a"]), Direction::TB, &resp);
        assert!(built.layering.is_empty());
        assert_eq!(built.origin, LayerOrigin::Coordinates);
    }

    #[test]
    fn explicit_layers_take_precedence_over_coordinates() {
        let resp = ReferenceResponse::Detailed {
            rows: vec![
                PlacedNode::new("a", 0.0, 0.0),
                PlacedNode::new("b", 0.0, 0.0),
            ],
            layers: Some(vec![
                vec!["b".into(), "cluster_1".into()],
                vec![],
                vec!["a".into()],
            ]),
        };
        let built = build_reference_layering(&graph(&["a", "b"]), Direction::TB, &resp);
        assert_eq!(built.origin, LayerOrigin::ExplicitLayers);
        assert_eq!(built.layering, Layering::from_slices(&[&["b"], &["a"]]));
    }

    #[test]
    fn coordinate_order_is_total() {
        let a = PlacedNode::new("a", 1.0, 5.0);
        let b = PlacedNode::new("b", 0.0, 5.0);
        assert_eq!(coordinate_order(&a, &b, Direction::TB), Ordering::Greater);
        assert_eq!(coordinate_order(&a, &b, Direction::LR), Ordering::Greater);
        assert_eq!(coordinate_order(&a, &a, Direction::LR), Ordering::Equal);
    }
}
