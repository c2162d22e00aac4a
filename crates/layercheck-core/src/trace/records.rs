//! Line-level decoding of the tab-separated trace protocol.

use crate::errors::{ParityError, Result};
use crate::model::Direction;

pub const INPUT_NODE: &str = "INPUT_NODE";
pub const INPUT_EDGE: &str = "INPUT_EDGE";
pub const INPUT_DIRECTION: &str = "INPUT_DIRECTION";
pub const ORDER_CANDIDATE_LAYER: &str = "ORDER_CANDIDATE_LAYER";
pub const ORDER_TRIAL_LAYER: &str = "ORDER_TRIAL_LAYER";
pub const ORDER_TRIAL_PASS: &str = "ORDER_TRIAL_PASS";
pub const ORDER_SELECTED: &str = "ORDER_SELECTED";
pub const OUTPUT_NODE: &str = "OUTPUT_NODE";
const LAYER_SUFFIX: &str = "_LAYER";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Record<'a> {
    InputNode {
        index: usize,
        id: &'a str,
    },
    InputEdge {
        source: &'a str,
        target: &'a str,
    },
    Direction(Direction),
    StageLayer {
        stage: &'a str,
        rank: u32,
        nodes: Vec<&'a str>,
    },
    CandidateLayer {
        source: &'a str,
        rank: u32,
        nodes: Vec<&'a str>,
    },
    TrialLayer {
        source: &'a str,
        trial: u32,
        pass: u32,
        rank: u32,
        nodes: Vec<&'a str>,
    },
    TrialPass {
        source: &'a str,
        trial: u32,
        pass: u32,
        crossings: u64,
        changed: bool,
    },
    Selected {
        source: &'a str,
        trial: u32,
        pass: Option<u32>,
    },
    OutputNode {
        id: &'a str,
        x: f64,
        y: f64,
    },
}

/// Decode one trace line. Lines whose first field is not a record kind
/// yield `Ok(None)`; a known kind with the wrong field count is fatal.
pub(crate) fn parse_line<'a>(fixture: &str, line: &'a str) -> Result<Option<Record<'a>>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split('\t').collect();
    let f = Fields {
        fixture,
        line,
        fields: &fields,
    };

    let record = match fields[0] {
        INPUT_NODE => {
            f.expect_len(3)?;
            Record::InputNode {
                index: f.num("node index", 1)?,
                id: f.id("node id", 2)?,
            }
        }
        INPUT_EDGE => {
            f.expect_len(3)?;
            Record::InputEdge {
                source: f.id("edge source", 1)?,
                target: f.id("edge target", 2)?,
            }
        }
        INPUT_DIRECTION => {
            f.expect_len(2)?;
            let raw = fields[1];
            let dir = raw
                .parse::<Direction>()
                .map_err(|_| ParityError::shape(fixture, "direction", raw))?;
            Record::Direction(dir)
        }
        ORDER_CANDIDATE_LAYER => {
            f.expect_layer_len(4)?;
            Record::CandidateLayer {
                source: f.id("candidate source", 1)?,
                rank: f.num("rank", 2)?,
                nodes: f.node_list(3)?,
            }
        }
        ORDER_TRIAL_LAYER => {
            f.expect_layer_len(6)?;
            Record::TrialLayer {
                source: f.id("trial source", 1)?,
                trial: f.num("trial index", 2)?,
                pass: f.num("pass index", 3)?,
                rank: f.num("rank", 4)?,
                nodes: f.node_list(5)?,
            }
        }
        ORDER_TRIAL_PASS => {
            f.expect_len(6)?;
            Record::TrialPass {
                source: f.id("trial source", 1)?,
                trial: f.num("trial index", 2)?,
                pass: f.num("pass index", 3)?,
                crossings: f.num("crossings", 4)?,
                changed: f.flag("changed", 5)?,
            }
        }
        ORDER_SELECTED => {
            if fields.len() != 3 && fields.len() != 4 {
                return Err(f.bad_record());
            }
            let pass = match fields.get(3) {
                Some(raw) if !raw.is_empty() => Some(f.num("selected pass", 3)?),
                _ => None,
            };
            Record::Selected {
                source: f.id("selected source", 1)?,
                trial: f.num("selected trial", 2)?,
                pass,
            }
        }
        OUTPUT_NODE => {
            f.expect_len(4)?;
            Record::OutputNode {
                id: f.id("output node id", 1)?,
                x: f.coord("x", 2)?,
                y: f.coord("y", 3)?,
            }
        }
        kind => match stage_of(kind) {
            Some(stage) => {
                f.expect_layer_len(3)?;
                Record::StageLayer {
                    stage,
                    rank: f.num("rank", 1)?,
                    nodes: f.node_list(2)?,
                }
            }
            None => return Ok(None),
        },
    };
    Ok(Some(record))
}

/// `ORDER_LAYER` -> `ORDER`; anything that is not an upper-case `<STAGE>_LAYER` kind -> None.
fn stage_of(kind: &str) -> Option<&str> {
    let stage = kind.strip_suffix(LAYER_SUFFIX)?;
    let valid = !stage.is_empty()
        && stage
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(stage)
}

struct Fields<'f, 'a> {
    fixture: &'f str,
    line: &'a str,
    fields: &'f [&'a str],
}

impl<'a> Fields<'_, 'a> {
    fn bad_record(&self) -> ParityError {
        ParityError::shape(
            self.fixture,
            format!("{} record", self.fields[0]),
            self.line.chars().take(80).collect::<String>(),
        )
    }

    fn expect_len(&self, n: usize) -> Result<()> {
        if self.fields.len() == n {
            Ok(())
        } else {
            Err(self.bad_record())
        }
    }

    /// Layer records may drop the trailing (empty) node list.
    fn expect_layer_len(&self, n: usize) -> Result<()> {
        if self.fields.len() == n || self.fields.len() == n - 1 {
            Ok(())
        } else {
            Err(self.bad_record())
        }
    }

    fn id(&self, field: &str, idx: usize) -> Result<&'a str> {
        let raw = self.fields[idx].trim();
        if raw.is_empty() {
            return Err(ParityError::parse(
                self.fixture,
                format!("{} record is missing its {}", self.fields[0], field),
            ));
        }
        Ok(raw)
    }

    fn num<T: std::str::FromStr>(&self, field: &str, idx: usize) -> Result<T> {
        let raw = self.fields[idx].trim();
        raw.parse::<T>()
            .map_err(|_| ParityError::shape(self.fixture, field, raw))
    }

    fn coord(&self, field: &str, idx: usize) -> Result<f64> {
        let v: f64 = self.num(field, idx)?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(ParityError::shape(self.fixture, field, self.fields[idx]))
        }
    }

    fn flag(&self, field: &str, idx: usize) -> Result<bool> {
        match self.fields[idx].trim() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(ParityError::shape(self.fixture, field, other)),
        }
    }

    fn node_list(&self, idx: usize) -> Result<Vec<&'a str>> {
        let raw = self.fields.get(idx).copied().unwrap_or("").trim();
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',')
            .map(|id| {
                let id = id.trim();
                if id.is_empty() {
                    Err(ParityError::shape(self.fixture, "node list", raw))
                } else {
                    Ok(id)
                }
            })
            .collect()
    }
}
