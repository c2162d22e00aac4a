//! Multi-pass correlation: `ORDER_TRIAL_LAYER` rows joined to `ORDER_TRIAL_PASS`
//! rows by (source, trial, pass).

use std::collections::BTreeMap;

use super::RankTable;
use crate::errors::{ParityError, Result};
use crate::model::Candidate;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassData {
    pub crossings: Option<u64>,
    pub changed: Option<bool>,
    pub(crate) ranks: RankTable,
}

/// Index keyed by (source, trial) built once while reading the trace; lookups
/// by pass and rank never rescan the trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialIndex {
    trials: BTreeMap<(String, u32), BTreeMap<u32, PassData>>,
}

impl TrialIndex {
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn trial_keys(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.trials.keys().map(|(s, t)| (s.as_str(), *t))
    }

    fn entry(&mut self, source: &str, trial: u32, pass: u32) -> &mut PassData {
        self.trials
            .entry((source.to_string(), trial))
            .or_default()
            .entry(pass)
            .or_default()
    }

    pub(crate) fn insert_layer(
        &mut self,
        fixture: &str,
        key: (&str, u32, u32),
        rank: u32,
        nodes: &[&str],
    ) -> Result<()> {
        let (source, trial, pass) = key;
        let label = format!("ORDER_TRIAL[{source}#t{trial}/p{pass}]");
        self.entry(source, trial, pass)
            .ranks
            .insert(fixture, &label, rank, nodes)
    }

    pub(crate) fn insert_pass(
        &mut self,
        fixture: &str,
        key: (&str, u32, u32),
        crossings: u64,
        changed: bool,
    ) -> Result<()> {
        let (source, trial, pass) = key;
        let data = self.entry(source, trial, pass);
        if data.crossings.is_some() {
            return Err(ParityError::parse(
                fixture,
                format!("duplicate ORDER_TRIAL_PASS for {source} trial {trial} pass {pass}"),
            ));
        }
        data.crossings = Some(crossings);
        data.changed = Some(changed);
        Ok(())
    }

    pub fn pass(&self, source: &str, trial: u32, pass: u32) -> Option<&PassData> {
        self.trials.get(&(source.to_string(), trial))?.get(&pass)
    }

    /// All passes of one trial, in pass order, as candidates.
    pub fn passes(&self, source: &str, trial: u32) -> Option<Vec<Candidate>> {
        let passes = self.trials.get(&(source.to_string(), trial))?;
        Some(
            passes
                .iter()
                .map(|(pass, data)| Candidate {
                    source: source.to_string(),
                    trial: Some(trial),
                    pass: Some(*pass),
                    crossings: data.crossings,
                    changed: data.changed,
                    layering: data.ranks.materialize(),
                })
                .collect(),
        )
    }
}
