use std::collections::{BTreeMap, HashMap};

use layercheck_core::errors::{ParityError, Result};
use layercheck_core::metrics_api::{GeometryResult, NodeDrift};
use layercheck_core::model::{Direction, NodeId, PlacedNode};
use layercheck_core::reference::coordinate_order;

pub const MIN_SHARED_NODES: usize = 2;
pub const DEFAULT_TOP_DRIFT: usize = 5;

/// Guards min-max normalization against zero-width spans.
const SPAN_EPSILON: f64 = 1e-9;

/// Compare two renderings over the node ids they share.
///
/// Each side is min-max normalized on its own shared subset, so only
/// relative placement matters. Inversions count unordered pairs whose
/// major-axis order differs between the sides.
pub fn compare_geometry(
    fixture: &str,
    candidate: &[PlacedNode],
    reference: &[PlacedNode],
    direction: Direction,
    top_n: usize,
) -> Result<GeometryResult> {
    let cand = first_by_id(candidate);
    let refr = first_by_id(reference);
    let shared: Vec<&str> = cand
        .keys()
        .filter(|id| refr.contains_key(*id))
        .copied()
        .collect();
    if shared.len() < MIN_SHARED_NODES {
        return Err(ParityError::InsufficientData {
            fixture: fixture.to_string(),
            shared: shared.len(),
            required: MIN_SHARED_NODES,
        });
    }

    let a: Vec<&PlacedNode> = shared.iter().map(|id| cand[id]).collect();
    let b: Vec<&PlacedNode> = shared.iter().map(|id| refr[id]).collect();
    let na = normalize(&a);
    let nb = normalize(&b);

    let mut drifts: Vec<NodeDrift> = shared
        .iter()
        .zip(na.iter().zip(&nb))
        .map(|(id, ((ax, ay), (bx, by)))| NodeDrift {
            id: (*id).to_string(),
            distance: (ax - bx).hypot(ay - by),
        })
        .collect();
    let n = drifts.len() as f64;
    let rmse = (drifts.iter().map(|d| d.distance * d.distance).sum::<f64>() / n).sqrt();
    let max_drift = drifts.iter().map(|d| d.distance).fold(0.0, f64::max);
    drifts.sort_by(|x, y| y.distance.total_cmp(&x.distance).then_with(|| x.id.cmp(&y.id)));
    drifts.truncate(top_n);

    let inversion_count = count_inversions(&a, &b, direction);
    let k = shared.len();
    let pair_count = k * (k - 1) / 2;

    tracing::debug!(
        fixture,
        shared = k,
        inversion_count,
        rmse,
        "geometry comparison"
    );
    Ok(GeometryResult {
        shared_nodes: k,
        rmse,
        max_drift,
        top_drift: drifts,
        inversion_count,
        pair_count,
        inversion_rate: inversion_count as f64 / pair_count as f64,
    })
}

/// First placement per id, keyed in id order.
fn first_by_id(nodes: &[PlacedNode]) -> BTreeMap<&str, &PlacedNode> {
    let mut out = BTreeMap::new();
    for n in nodes {
        out.entry(n.id.as_str()).or_insert(n);
    }
    out
}

fn normalize(nodes: &[&PlacedNode]) -> Vec<(f64, f64)> {
    let span = |get: fn(&PlacedNode) -> f64| {
        let lo = nodes.iter().map(|n| get(n)).fold(f64::INFINITY, f64::min);
        let hi = nodes.iter().map(|n| get(n)).fold(f64::NEG_INFINITY, f64::max);
        (lo, (hi - lo).max(SPAN_EPSILON))
    };
    let (min_x, w) = span(|n| n.x);
    let (min_y, h) = span(|n| n.y);
    nodes
        .iter()
        .map(|n| ((n.x - min_x) / w, (n.y - min_y) / h))
        .collect()
}

/// `a` and `b` hold the same ids at the same positions.
fn count_inversions(a: &[&PlacedNode], b: &[&PlacedNode], direction: Direction) -> usize {
    let ranked = |nodes: &[&PlacedNode]| -> HashMap<NodeId, usize> {
        let mut sorted = nodes.to_vec();
        sorted.sort_by(|x, y| coordinate_order(x, y, direction));
        sorted
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect()
    };
    let pos_a = ranked(a);
    let pos_b = ranked(b);

    let mut order: Vec<(usize, usize)> = a
        .iter()
        .filter_map(|n| Some((*pos_a.get(&n.id)?, *pos_b.get(&n.id)?)))
        .collect();
    order.sort_unstable();

    order
        .iter()
        .enumerate()
        .map(|(i, (_, bi))| order[i + 1..].iter().filter(|(_, bj)| bi > bj).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(spec: &[(&str, f64, f64)]) -> Vec<PlacedNode> {
        spec.iter().map(|(id, x, y)| PlacedNode::new(*id, *x, *y)).collect()
    }

    #[test]
    fn identical_up_to_scale_has_no_drift() {
        let a = nodes(&[("a", 0.0, 0.0), ("b", 10.0, 50.0), ("c", 20.0, 100.0)]);
        let b = nodes(&[("a", 0.0, 0.0), ("b", 20.0, 100.0), ("c", 40.0, 200.0)]);
        let g = compare_geometry("fx", &a, &b, Direction::TB, 5).unwrap();
        assert_eq!(g.shared_nodes, 3);
        assert!(g.rmse < 1e-12);
        assert_eq!(g.inversion_count, 0);
        assert_eq!(g.pair_count, 3);
        assert_eq!(g.inversion_rate, 0.0);
    }

    #[test]
    fn reversed_major_axis_inverts_every_pair() {
        let a = nodes(&[("a", 0.0, 0.0), ("b", 0.0, 10.0), ("c", 0.0, 20.0)]);
        let b = nodes(&[("a", 0.0, 20.0), ("b", 0.0, 10.0), ("c", 0.0, 0.0)]);
        let g = compare_geometry("fx", &a, &b, Direction::TB, 2).unwrap();
        assert_eq!(g.inversion_count, 3);
        assert_eq!(g.inversion_rate, 1.0);
        assert!((g.max_drift - 1.0).abs() < 1e-9);
        assert_eq!(g.top_drift.len(), 2);
        assert_eq!(g.top_drift[0].id, "a");
        assert_eq!(g.top_drift[1].id, "c");
    }

    #[test]
    fn horizontal_layouts_order_by_x() {
        // y order flips, x order is identical: LR sees no inversion.
        let a = nodes(&[("a", 0.0, 0.0), ("b", 10.0, 5.0)]);
        let b = nodes(&[("a", 0.0, 5.0), ("b", 10.0, 0.0)]);
        assert_eq!(
            compare_geometry("fx", &a, &b, Direction::LR, 5)
                .unwrap()
                .inversion_count,
            0
        );
        assert_eq!(
            compare_geometry("fx", &a, &b, Direction::TB, 5)
                .unwrap()
                .inversion_count,
            1
        );
    }

    #[test]
    fn degenerate_span_does_not_divide_by_zero() {
        let a = nodes(&[("a", 5.0, 5.0), ("b", 5.0, 5.0)]);
        let b = nodes(&[("a", 1.0, 1.0), ("b", 1.0, 1.0)]);
        let g = compare_geometry("fx", &a, &b, Direction::TB, 5).unwrap();
        assert!(g.rmse.is_finite());
        assert_eq!(g.rmse, 0.0);
    }

    #[test]
    fn fewer_than_two_shared_nodes_is_insufficient() {
        let a = nodes(&[("a", 0.0, 0.0), ("b", 1.0, 1.0)]);
        let b = nodes(&[("a", 0.0, 0.0), ("z", 1.0, 1.0)]);
        let err = compare_geometry("flow_09", &a, &b, Direction::TB, 5).unwrap_err();
        assert!(matches!(
            err,
            ParityError::InsufficientData { shared: 1, required: 2, .. }
        ));
        assert!(err.to_string().contains("flow_09"));
    }

    #[test]
    fn unshared_nodes_are_ignored() {
        let a = nodes(&[("a", 0.0, 0.0), ("b", 0.0, 10.0), ("only_a", 0.0, 99.0)]);
        let b = nodes(&[("b", 0.0, 10.0), ("a", 0.0, 0.0), ("only_b", 0.0, -99.0)]);
        let g = compare_geometry("fx", &a, &b, Direction::TB, 5).unwrap();
        assert_eq!(g.shared_nodes, 2);
        assert_eq!(g.inversion_count, 0);
    }
}
