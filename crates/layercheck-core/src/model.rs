use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub type NodeId = String;

/// Ordered sequence of node ids within one rank.
pub type Layer = Vec<NodeId>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

/// Node set in declaration-index order plus the edge list. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputGraph {
    nodes: Vec<NodeId>,
    edges: Vec<Edge>,
}

impl InputGraph {
    pub fn new(nodes: Vec<NodeId>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_set(&self) -> HashSet<&str> {
        self.nodes.iter().map(String::as_str).collect()
    }
}

/// Ordered sequence of layers, rank 0 first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layering(Vec<Layer>);

impl Layering {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self(layers)
    }

    pub fn from_slices(ranks: &[&[&str]]) -> Self {
        Self(
            ranks
                .iter()
                .map(|rank| rank.iter().map(|id| (*id).to_string()).collect())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Nodes of rank `r`; missing ranks read as empty.
    pub fn rank(&self, r: usize) -> &[NodeId] {
        self.0.get(r).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn layers(&self) -> &[Layer] {
        &self.0
    }

    pub fn node_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    pub fn into_layers(self) -> Vec<Layer> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    TB,
    TD,
    BT,
    LR,
    RL,
}

impl Direction {
    /// Axis along which ranks are separated.
    pub fn major_axis(self) -> Axis {
        match self {
            Direction::LR | Direction::RL => Axis::X,
            Direction::TB | Direction::TD | Direction::BT => Axis::Y,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::TB => "TB",
            Direction::TD => "TD",
            Direction::BT => "BT",
            Direction::LR => "LR",
            Direction::RL => "RL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TB" => Ok(Direction::TB),
            "TD" => Ok(Direction::TD),
            "BT" => Ok(Direction::BT),
            "LR" => Ok(Direction::LR),
            "RL" => Ok(Direction::RL),
            other => Err(format!("unknown layout direction: {other}")),
        }
    }
}

/// A node with final layout coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl PlacedNode {
    pub fn new(id: impl Into<NodeId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
        }
    }

    pub fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// A layering tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossings: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    pub layering: Layering,
}

impl Candidate {
    pub fn named(source: impl Into<String>, layering: Layering) -> Self {
        Self {
            source: source.into(),
            trial: None,
            pass: None,
            crossings: None,
            changed: None,
            layering,
        }
    }

    pub fn label(&self) -> String {
        match (self.trial, self.pass) {
            (Some(t), Some(p)) => format!("{}#t{}/p{}", self.source, t, p),
            (Some(t), None) => format!("{}#t{}", self.source, t),
            _ => self.source.clone(),
        }
    }
}

/// One input file of the fixture corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub path: PathBuf,
}

impl Fixture {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = fixture_name(&path);
        Self { name, path }
    }
}

fn fixture_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
