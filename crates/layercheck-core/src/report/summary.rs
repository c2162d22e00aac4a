//! Summary line protocol: `=== <case> ===` headers followed by `key=value`
//! lines, then run-wide `key=value` lines.
//!
//! Every key has a fixed scope and value shape. The parser rejects unknown
//! keys, misplaced keys and values of the wrong shape: format drift is a
//! contract break, not something to skip over.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::RunReport;
use crate::errors::{ParityError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Case,
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Count,
    Float,
    Ratio,
}

#[derive(Debug)]
pub struct SummaryKey {
    pub name: &'static str,
    pub scope: Scope,
    pub shape: ValueShape,
}

const fn key(name: &'static str, scope: Scope, shape: ValueShape) -> SummaryKey {
    SummaryKey { name, scope, shape }
}

pub const SUMMARY_KEYS: &[SummaryKey] = &[
    key("ranks", Scope::Case, ValueShape::Count),
    key("comparable_layers", Scope::Case, ValueShape::Count),
    key("composition_mismatch", Scope::Case, ValueShape::Count),
    key("order_mismatch", Scope::Case, ValueShape::Count),
    key("exact_order_match_rate", Scope::Case, ValueShape::Float),
    key("avg_order_displacement", Scope::Case, ValueShape::Float),
    key("inversion_rate", Scope::Case, ValueShape::Float),
    key("rmse", Scope::Case, ValueShape::Float),
    key("max_drift", Scope::Case, ValueShape::Float),
    key("candidate_oracle_best", Scope::Case, ValueShape::Count),
    key("candidate_selection_gap", Scope::Case, ValueShape::Count),
    key("pass_oracle_best", Scope::Case, ValueShape::Count),
    key("pass_selection_gap", Scope::Case, ValueShape::Count),
    key("best_pass", Scope::Case, ValueShape::Count),
    key("fixtures", Scope::Run, ValueShape::Count),
    key("total_mismatch", Scope::Run, ValueShape::Ratio),
    key("total_composition_mismatch", Scope::Run, ValueShape::Count),
    key("total_order_mismatch", Scope::Run, ValueShape::Count),
    key("avg_inversion_rate", Scope::Run, ValueShape::Float),
    key("selected_equals_oracle", Scope::Run, ValueShape::Ratio),
    key("total_selection_gap", Scope::Run, ValueShape::Count),
    key("pass_selected_equals_oracle", Scope::Run, ValueShape::Ratio),
    key("total_pass_selection_gap", Scope::Run, ValueShape::Count),
];

pub fn lookup_key(name: &str) -> Option<&'static SummaryKey> {
    SUMMARY_KEYS.iter().find(|k| k.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SummaryValue {
    Count(u64),
    Float(f64),
    Ratio(u64, u64),
}

impl SummaryValue {
    /// Value compared by scalar operators; ratios compare their numerator.
    pub fn scalar(&self) -> f64 {
        match *self {
            SummaryValue::Count(n) => n as f64,
            SummaryValue::Float(v) => v,
            SummaryValue::Ratio(n, _) => n as f64,
        }
    }
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryValue::Count(n) => write!(f, "{n}"),
            SummaryValue::Float(v) => write!(f, "{v:.6}"),
            SummaryValue::Ratio(n, m) => write!(f, "{n}/{m}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseSummary {
    pub name: String,
    pub values: BTreeMap<String, SummaryValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSummary {
    pub cases: Vec<CaseSummary>,
    pub run: BTreeMap<String, SummaryValue>,
}

impl ParsedSummary {
    pub fn any_case_has(&self, key: &str) -> bool {
        self.cases.iter().any(|c| c.values.contains_key(key))
    }
}

/// Render the summary lines for a run, newline-terminated.
pub fn render_summary(run: &RunReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    for fx in &run.fixtures {
        lines.push(format!("=== {} ===", fx.name));
        if let Some(p) = &fx.parity {
            lines.push(format!("ranks={}", p.max_rank));
            lines.push(format!("comparable_layers={}", p.comparable_layers));
            lines.push(format!("composition_mismatch={}", p.composition_mismatch_layers));
            lines.push(format!("order_mismatch={}", p.order_mismatch_layers));
            lines.push(format!("exact_order_match_rate={:.6}", p.exact_order_match_rate));
            lines.push(format!("avg_order_displacement={:.6}", p.avg_order_displacement));
        }
        if let Some(g) = &fx.geometry {
            lines.push(format!("inversion_rate={:.6}", g.inversion_rate));
            lines.push(format!("rmse={:.6}", g.rmse));
            lines.push(format!("max_drift={:.6}", g.max_drift));
        }
        if let Some(gap) = &fx.candidates {
            lines.push(format!("candidate_oracle_best={}", gap.oracle_best));
            lines.push(format!("candidate_selection_gap={}", gap.selection_gap));
        }
        if let Some(gap) = &fx.passes {
            lines.push(format!("pass_oracle_best={}", gap.oracle_best));
            lines.push(format!("pass_selection_gap={}", gap.selection_gap));
            if let Some(p) = gap.best_pass {
                lines.push(format!("best_pass={p}"));
            }
        }
    }

    let t = &run.totals;
    lines.push(format!("fixtures={}", t.fixtures));
    lines.push(format!(
        "total_mismatch={}/{}",
        t.mismatched_layers, t.compared_layers
    ));
    lines.push(format!("total_composition_mismatch={}", t.composition_mismatch));
    lines.push(format!("total_order_mismatch={}", t.order_mismatch));
    if let Some(avg) = t.avg_inversion_rate() {
        lines.push(format!("avg_inversion_rate={avg:.6}"));
    }
    if t.candidate_cases > 0 {
        lines.push(format!(
            "selected_equals_oracle={}/{}",
            t.selected_equals_oracle, t.candidate_cases
        ));
        lines.push(format!("total_selection_gap={}", t.total_selection_gap));
    }
    if t.pass_cases > 0 {
        lines.push(format!(
            "pass_selected_equals_oracle={}/{}",
            t.pass_selected_equals_oracle, t.pass_cases
        ));
        lines.push(format!("total_pass_selection_gap={}", t.total_pass_selection_gap));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

struct Grammar {
    header: Regex,
    pair: Regex,
    count: Regex,
    float: Regex,
    ratio: Regex,
}

impl Grammar {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(r"^=== (\S(?:.*\S)?) ===$")?,
            pair: Regex::new(r"^([a-z][a-z0-9_]*)=(\S+)$")?,
            count: Regex::new(r"^\d+$")?,
            float: Regex::new(r"^-?\d+\.\d+$")?,
            ratio: Regex::new(r"^(\d+)/(\d+)$")?,
        })
    }
}

/// Parse summary text produced by [`render_summary`]. `source` names the
/// summary in error messages.
pub fn parse_summary(source: &str, text: &str) -> Result<ParsedSummary> {
    let g = Grammar::compile()
        .map_err(|e| ParityError::parse(source, format!("summary grammar: {e}")))?;
    let mut parsed = ParsedSummary::default();
    let mut in_run_section = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if let Some(caps) = g.header.captures(line) {
            if in_run_section {
                return Err(ParityError::parse(
                    source,
                    format!("line {line_no}: case header after run-wide counters"),
                ));
            }
            parsed.cases.push(CaseSummary {
                name: caps[1].to_string(),
                values: BTreeMap::new(),
            });
            continue;
        }
        let Some(caps) = g.pair.captures(line) else {
            return Err(ParityError::parse(
                source,
                format!("line {line_no}: unrecognized summary line '{line}'"),
            ));
        };
        let name = &caps[1];
        let raw_value = &caps[2];
        let Some(spec) = lookup_key(name) else {
            return Err(ParityError::parse(
                source,
                format!("line {line_no}: unknown summary key '{name}'"),
            ));
        };
        let value = parse_value(&g, source, spec, raw_value)?;

        let slot = match spec.scope {
            Scope::Case => {
                if in_run_section {
                    return Err(ParityError::parse(
                        source,
                        format!("line {line_no}: case key '{name}' after run-wide counters"),
                    ));
                }
                match parsed.cases.last_mut() {
                    Some(case) => &mut case.values,
                    None => {
                        return Err(ParityError::parse(
                            source,
                            format!("line {line_no}: case key '{name}' before any case header"),
                        ))
                    }
                }
            }
            Scope::Run => {
                in_run_section = true;
                &mut parsed.run
            }
        };
        if slot.insert(name.to_string(), value).is_some() {
            return Err(ParityError::parse(
                source,
                format!("line {line_no}: duplicate key '{name}'"),
            ));
        }
    }

    tracing::debug!(
        source,
        cases = parsed.cases.len(),
        run_keys = parsed.run.len(),
        "parsed summary"
    );
    Ok(parsed)
}

fn parse_value(g: &Grammar, source: &str, spec: &SummaryKey, raw: &str) -> Result<SummaryValue> {
    let bad = || ParityError::shape(source, spec.name, raw);
    match spec.shape {
        ValueShape::Count if g.count.is_match(raw) => {
            raw.parse().map(SummaryValue::Count).map_err(|_| bad())
        }
        ValueShape::Float if g.float.is_match(raw) => {
            raw.parse().map(SummaryValue::Float).map_err(|_| bad())
        }
        ValueShape::Ratio => {
            let caps = g.ratio.captures(raw).ok_or_else(bad)?;
            let n = caps[1].parse().map_err(|_| bad())?;
            let m = caps[2].parse().map_err(|_| bad())?;
            Ok(SummaryValue::Ratio(n, m))
        }
        _ => Err(bad()),
    }
}
