//! Structured trace parsing: input graph plus named layerings.
//!
//! Contract:
//! - Node order of the input graph follows the declared index, not emission order.
//! - Layerings are materialized from rank -> nodes entries; missing or empty
//!   ranks produce no layer.
//! - Missing markers and corrupt numeric fields are fatal.

mod records;
mod trials;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::errors::{ParityError, Result};
use crate::model::{Candidate, Direction, Edge, InputGraph, Layering, NodeId, PlacedNode};
use records::Record;

pub use records::{
    INPUT_DIRECTION, INPUT_EDGE, INPUT_NODE, ORDER_CANDIDATE_LAYER, ORDER_SELECTED,
    ORDER_TRIAL_LAYER, ORDER_TRIAL_PASS, OUTPUT_NODE,
};
pub use trials::{PassData, TrialIndex};

/// Stage name carried by `ORDER_CANDIDATE_LAYER` records.
pub const CANDIDATE_STAGE: &str = "ORDER_CANDIDATE";
/// Stage name carried by `ORDER_TRIAL_LAYER` records.
pub const TRIAL_STAGE: &str = "ORDER_TRIAL";

/// Identifies one layering inside a trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayeringTag {
    pub stage: String,
    pub source: Option<String>,
    pub trial: Option<u32>,
    pub pass: Option<u32>,
}

impl LayeringTag {
    pub fn stage(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            source: None,
            trial: None,
            pass: None,
        }
    }

    pub fn candidate(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::stage(CANDIDATE_STAGE)
        }
    }

    pub fn trial_pass(source: impl Into<String>, trial: u32, pass: u32) -> Self {
        Self {
            stage: TRIAL_STAGE.to_string(),
            source: Some(source.into()),
            trial: Some(trial),
            pass: Some(pass),
        }
    }
}

impl fmt::Display for LayeringTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stage)?;
        match (&self.source, self.trial, self.pass) {
            (Some(s), Some(t), Some(p)) => write!(f, "[{s}#t{t}/p{p}]"),
            (Some(s), Some(t), None) => write!(f, "[{s}#t{t}]"),
            (Some(s), _, _) => write!(f, "[{s}]"),
            _ => Ok(()),
        }
    }
}

/// Rank -> nodes entries for one tag, before materialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankTable {
    ranks: BTreeMap<u32, Vec<NodeId>>,
}

impl RankTable {
    pub(crate) fn insert(
        &mut self,
        fixture: &str,
        label: &str,
        rank: u32,
        nodes: &[&str],
    ) -> Result<()> {
        if self.ranks.contains_key(&rank) {
            return Err(ParityError::parse(
                fixture,
                format!("duplicate rank {rank} for {label}"),
            ));
        }
        let mut seen = HashSet::with_capacity(nodes.len());
        for id in nodes {
            if !seen.insert(*id) {
                return Err(ParityError::shape(
                    fixture,
                    format!("rank {rank} of {label}"),
                    format!("duplicate node {id}"),
                ));
            }
        }
        self.ranks
            .insert(rank, nodes.iter().map(|s| (*s).to_string()).collect());
        Ok(())
    }

    pub fn max_rank(&self) -> Option<u32> {
        self.ranks.keys().next_back().copied()
    }

    /// Ranks 0..=max in order; absent or empty ranks are skipped.
    pub fn materialize(&self) -> Layering {
        let Some(max) = self.max_rank() else {
            return Layering::default();
        };
        let mut layers = Vec::new();
        for r in 0..=max {
            match self.ranks.get(&r) {
                Some(nodes) if !nodes.is_empty() => layers.push(nodes.clone()),
                _ => {}
            }
        }
        Layering::new(layers)
    }
}

/// Which candidate, trial and (optionally) pass the engine kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub source: String,
    pub trial: u32,
    pub pass: Option<u32>,
}

/// A fully parsed trace for one fixture.
#[derive(Debug, Clone)]
pub struct Trace {
    pub fixture: String,
    pub graph: InputGraph,
    pub direction: Option<Direction>,
    pub trials: TrialIndex,
    pub selection: Option<Selection>,
    pub coordinates: Vec<PlacedNode>,
    layerings: BTreeMap<LayeringTag, RankTable>,
}

impl Trace {
    pub fn tags(&self) -> impl Iterator<Item = &LayeringTag> {
        self.layerings.keys()
    }

    pub fn has_stage(&self, stage: &str) -> bool {
        self.layerings.keys().any(|t| t.stage == stage)
    }

    /// Materialized layering for `tag`; a tag with no data is a parse error.
    pub fn layering(&self, tag: &LayeringTag) -> Result<Layering> {
        if tag.stage == TRIAL_STAGE {
            if let (Some(source), Some(trial), Some(pass)) = (&tag.source, tag.trial, tag.pass) {
                if let Some(data) = self.trials.pass(source, trial, pass) {
                    return Ok(data.ranks.materialize());
                }
            }
        } else if let Some(table) = self.layerings.get(tag) {
            return Ok(table.materialize());
        }
        Err(ParityError::parse(
            &self.fixture,
            format!("no layering data for tag {tag}"),
        ))
    }

    pub fn stage_layering(&self, stage: &str) -> Result<Layering> {
        self.layering(&LayeringTag::stage(stage))
    }

    /// Independent named candidates (`ORDER_CANDIDATE_LAYER`), in source-name order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.layerings
            .iter()
            .filter(|(tag, _)| tag.stage == CANDIDATE_STAGE)
            .filter_map(|(tag, table)| {
                let source = tag.source.clone()?;
                Some(Candidate::named(source, table.materialize()))
            })
            .collect()
    }

    /// Passes of the selected trial, plus the selected pass index.
    ///
    /// Without an explicit pass in the selection record, the final pass is
    /// the selected one. Returns `Ok(None)` when the trace has no selection
    /// or no multi-pass data.
    pub fn selected_passes(&self) -> Result<Option<(Vec<Candidate>, u32)>> {
        let Some(sel) = &self.selection else {
            return Ok(None);
        };
        if self.trials.is_empty() {
            return Ok(None);
        }
        let Some(passes) = self.trials.passes(&sel.source, sel.trial) else {
            return Err(ParityError::parse(
                &self.fixture,
                format!(
                    "{ORDER_SELECTED} names {} trial {} but no {ORDER_TRIAL_LAYER} rows exist for it",
                    sel.source, sel.trial
                ),
            ));
        };
        let selected = match sel.pass {
            Some(p) => {
                if !passes.iter().any(|c| c.pass == Some(p)) {
                    return Err(ParityError::parse(
                        &self.fixture,
                        format!("{ORDER_SELECTED} names missing pass {p}"),
                    ));
                }
                p
            }
            None => passes.iter().filter_map(|c| c.pass).max().unwrap_or(0),
        };
        Ok(Some((passes, selected)))
    }
}

/// Parse raw trace text for `fixture`.
pub fn parse_trace(fixture: &str, text: &str) -> Result<Trace> {
    let mut nodes: BTreeMap<usize, &str> = BTreeMap::new();
    let mut edges: Vec<(&str, &str)> = Vec::new();
    let mut direction = None;
    let mut layerings: BTreeMap<LayeringTag, RankTable> = BTreeMap::new();
    let mut trials = TrialIndex::default();
    let mut selection = None;
    let mut coordinates = Vec::new();

    for line in text.lines() {
        let Some(record) = records::parse_line(fixture, line)? else {
            continue;
        };
        match record {
            Record::InputNode { index, id } => {
                if let Some(prev) = nodes.insert(index, id) {
                    return Err(ParityError::parse(
                        fixture,
                        format!("{INPUT_NODE} index {index} declared twice ({prev}, {id})"),
                    ));
                }
            }
            Record::InputEdge { source, target } => edges.push((source, target)),
            Record::Direction(d) => direction = Some(d),
            Record::StageLayer { stage, rank, nodes } => {
                let tag = LayeringTag::stage(stage);
                let label = tag.to_string();
                layerings
                    .entry(tag)
                    .or_default()
                    .insert(fixture, &label, rank, &nodes)?;
            }
            Record::CandidateLayer {
                source,
                rank,
                nodes,
            } => {
                let tag = LayeringTag::candidate(source);
                let label = tag.to_string();
                layerings
                    .entry(tag)
                    .or_default()
                    .insert(fixture, &label, rank, &nodes)?;
            }
            Record::TrialLayer {
                source,
                trial,
                pass,
                rank,
                nodes,
            } => trials.insert_layer(fixture, (source, trial, pass), rank, &nodes)?,
            Record::TrialPass {
                source,
                trial,
                pass,
                crossings,
                changed,
            } => trials.insert_pass(fixture, (source, trial, pass), crossings, changed)?,
            Record::Selected {
                source,
                trial,
                pass,
            } => {
                selection = Some(Selection {
                    source: source.to_string(),
                    trial,
                    pass,
                })
            }
            Record::OutputNode { id, x, y } => coordinates.push(PlacedNode::new(id, x, y)),
        }
    }

    if nodes.is_empty() {
        return Err(ParityError::parse(
            fixture,
            format!("missing {INPUT_NODE} records"),
        ));
    }
    if edges.is_empty() {
        return Err(ParityError::parse(
            fixture,
            format!("missing {INPUT_EDGE} records"),
        ));
    }

    let mut declared = HashSet::with_capacity(nodes.len());
    for id in nodes.values() {
        if !declared.insert(*id) {
            return Err(ParityError::parse(
                fixture,
                format!("{INPUT_NODE} id {id} declared twice"),
            ));
        }
    }
    for (s, t) in &edges {
        for endpoint in [s, t] {
            if !declared.contains(endpoint) {
                return Err(ParityError::parse(
                    fixture,
                    format!("{INPUT_EDGE} references undeclared node {endpoint}"),
                ));
            }
        }
    }

    let graph = InputGraph::new(
        nodes.into_values().map(str::to_string).collect(),
        edges
            .into_iter()
            .map(|(s, t)| Edge {
                source: s.to_string(),
                target: t.to_string(),
            })
            .collect(),
    );
    tracing::debug!(
        fixture,
        nodes = graph.nodes().len(),
        edges = graph.edges().len(),
        layerings = layerings.len(),
        "parsed trace"
    );

    Ok(Trace {
        fixture: fixture.to_string(),
        graph,
        direction,
        trials,
        selection,
        coordinates,
        layerings,
    })
}
