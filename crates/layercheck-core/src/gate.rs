//! Gate Evaluator: fixed pass/fail thresholds over a parsed summary.
//!
//! Gates run in order. Within a gate, rules run in order and cases in
//! summary order; the first violation is returned and nothing after it is
//! checked.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{ConfigError, GateViolation, ParityError, Result};
use crate::report::summary::{
    lookup_key, parse_summary, ParsedSummary, Scope, SummaryValue, ValueShape,
};

/// Tolerance for `eq` on float-valued keys.
const FLOAT_EQ_TOLERANCE: f64 = 1e-9;

pub const DEFAULT_MAX_AVG_INVERSION_RATE: f64 = 0.0333;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOp {
    Eq,
    Le,
    Ge,
    /// Ratio `n/m` with `n == m`.
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateRule {
    pub key: String,
    #[serde(default)]
    pub scope: Scope,
    pub op: GateOp,
    #[serde(default)]
    pub value: f64,
    /// Skip instead of failing when the summary lacks the key.
    #[serde(default)]
    pub optional: bool,
}

impl GateRule {
    fn expected(&self) -> String {
        match self.op {
            GateOp::Eq => format!("== {}", self.value),
            GateOp::Le => format!("<= {}", self.value),
            GateOp::Ge => format!(">= {}", self.value),
            GateOp::All => "n == m".to_string(),
        }
    }

    fn holds(&self, observed: &SummaryValue) -> bool {
        let v = observed.scalar();
        match self.op {
            GateOp::Eq => match observed {
                SummaryValue::Float(_) => (v - self.value).abs() <= FLOAT_EQ_TOLERANCE,
                _ => v == self.value,
            },
            GateOp::Le => v <= self.value,
            GateOp::Ge => v >= self.value,
            GateOp::All => matches!(observed, SummaryValue::Ratio(n, m) if n == m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateSpec {
    pub name: String,
    pub rules: Vec<GateRule>,
}

impl fmt::Display for GateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} rules)", self.name, self.rules.len())
    }
}

/// Built-in gates. The layering gate is only included when the summary
/// carries layering lines; the geometry rule is skipped when the run made
/// no geometry comparison.
pub fn default_gates(summary: &ParsedSummary) -> Vec<GateSpec> {
    let mut gates = Vec::new();
    if summary.any_case_has("composition_mismatch") {
        gates.push(GateSpec {
            name: "layering".into(),
            rules: vec![GateRule {
                key: "composition_mismatch".into(),
                scope: Scope::Case,
                op: GateOp::Eq,
                value: 0.0,
                optional: false,
            }],
        });
    }
    gates.push(GateSpec {
        name: "geometry".into(),
        rules: vec![GateRule {
            key: "avg_inversion_rate".into(),
            scope: Scope::Run,
            op: GateOp::Le,
            value: DEFAULT_MAX_AVG_INVERSION_RATE,
            optional: true,
        }],
    });
    gates
}

/// Reject rules that could never match a well-formed summary.
pub fn validate_gates(gates: &[GateSpec]) -> Result<(), ConfigError> {
    for gate in gates {
        if gate.name.trim().is_empty() {
            return Err(ConfigError("gate name must not be empty".into()));
        }
        if gate.rules.is_empty() {
            return Err(ConfigError(format!("gate '{}' has no rules", gate.name)));
        }
        for rule in &gate.rules {
            let Some(spec) = lookup_key(&rule.key) else {
                return Err(ConfigError(format!(
                    "gate '{}': unknown summary key '{}'",
                    gate.name, rule.key
                )));
            };
            if spec.scope != rule.scope {
                return Err(ConfigError(format!(
                    "gate '{}': key '{}' has {:?} scope, rule says {:?}",
                    gate.name, rule.key, spec.scope, rule.scope
                )));
            }
            if rule.op == GateOp::All && spec.shape != ValueShape::Ratio {
                return Err(ConfigError(format!(
                    "gate '{}': op 'all' needs a ratio key, '{}' is not one",
                    gate.name, rule.key
                )));
            }
            if !rule.value.is_finite() {
                return Err(ConfigError(format!(
                    "gate '{}': threshold for '{}' must be finite",
                    gate.name, rule.key
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateOutcome {
    pub gates_run: usize,
    pub checks: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct GateEvaluator {
    gates: Option<Vec<GateSpec>>,
}

impl GateEvaluator {
    /// `None` selects the built-in defaults for each summary.
    pub fn new(gates: Option<Vec<GateSpec>>) -> Result<Self, ConfigError> {
        if let Some(g) = &gates {
            validate_gates(g)?;
        }
        Ok(Self { gates })
    }

    pub fn evaluate_text(&self, source: &str, text: &str) -> Result<GateOutcome> {
        let parsed = parse_summary(source, text)?;
        self.evaluate(source, &parsed)
    }

    pub fn evaluate(&self, source: &str, summary: &ParsedSummary) -> Result<GateOutcome> {
        let gates = match &self.gates {
            Some(g) => g.clone(),
            None => default_gates(summary),
        };
        let mut outcome = GateOutcome::default();
        for gate in &gates {
            for rule in &gate.rules {
                match rule.scope {
                    Scope::Case => {
                        for case in &summary.cases {
                            let observed = case.values.get(&rule.key);
                            check(source, gate, rule, &case.name, observed, &mut outcome)?;
                        }
                    }
                    Scope::Run => {
                        let observed = summary.run.get(&rule.key);
                        check(source, gate, rule, "run", observed, &mut outcome)?;
                    }
                }
            }
            outcome.gates_run += 1;
            tracing::info!(gate = %gate.name, "gate passed");
        }
        Ok(outcome)
    }
}

fn check(
    source: &str,
    gate: &GateSpec,
    rule: &GateRule,
    case: &str,
    observed: Option<&SummaryValue>,
    outcome: &mut GateOutcome,
) -> Result<()> {
    let Some(observed) = observed else {
        if rule.optional {
            tracing::debug!(
                gate = %gate.name,
                key = %rule.key,
                case,
                "optional key absent, rule skipped"
            );
            outcome.skipped += 1;
            return Ok(());
        }
        return Err(ParityError::parse(
            source,
            format!(
                "gate '{}' needs '{}' for {} but the summary does not carry it",
                gate.name, rule.key, case
            ),
        ));
    };
    outcome.checks += 1;
    if rule.holds(observed) {
        return Ok(());
    }
    Err(GateViolation {
        gate: gate.name.clone(),
        case: case.to_string(),
        metric: rule.key.clone(),
        expected: rule.expected(),
        observed: observed.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = "\
=== a ===
ranks=2
comparable_layers=2
composition_mismatch=0
order_mismatch=1
exact_order_match_rate=0.500000
avg_order_displacement=0.666667
=== b ===
ranks=1
comparable_layers=1
composition_mismatch=0
order_mismatch=0
exact_order_match_rate=1.000000
avg_order_displacement=0.000000
fixtures=2
total_mismatch=1/3
total_composition_mismatch=0
total_order_mismatch=1
selected_equals_oracle=2/2
total_selection_gap=0
";

    #[test]
    fn clean_layering_run_passes_default_gates() {
        let out = GateEvaluator::new(None).unwrap().evaluate_text("s", CLEAN).unwrap();
        assert_eq!(out.gates_run, 2);
        assert_eq!(out.checks, 2);
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn first_violation_names_case_metric_and_bound() {
        let text = CLEAN.replacen("composition_mismatch=0", "composition_mismatch=2", 2);
        let err = GateEvaluator::new(None).unwrap().evaluate_text("s", &text).unwrap_err();
        let ParityError::Gate(v) = err else {
            panic!("expected gate violation, got {err}");
        };
        assert_eq!(v.gate, "layering");
        assert_eq!(v.case, "a");
        assert_eq!(v.metric, "composition_mismatch");
        assert_eq!(v.expected, "== 0");
        assert_eq!(v.observed, "2");
    }

    #[test]
    fn geometry_gate_applies_when_present() {
        let text = format!("{CLEAN}avg_inversion_rate=0.041000\n");
        let err = GateEvaluator::new(None).unwrap().evaluate_text("s", &text).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("geometry"), "{msg}");
        assert!(msg.contains("<= 0.0333"), "{msg}");
        assert!(msg.contains("0.041000"), "{msg}");
    }

    #[test]
    fn ratio_rules_compare_numerator_or_require_all() {
        let gates = vec![GateSpec {
            name: "selection".into(),
            rules: vec![
                GateRule {
                    key: "total_mismatch".into(),
                    scope: Scope::Run,
                    op: GateOp::Le,
                    value: 1.0,
                    optional: false,
                },
                GateRule {
                    key: "selected_equals_oracle".into(),
                    scope: Scope::Run,
                    op: GateOp::All,
                    value: 0.0,
                    optional: false,
                },
            ],
        }];
        let eval = GateEvaluator::new(Some(gates)).unwrap();
        assert!(eval.evaluate_text("s", CLEAN).is_ok());

        let text = CLEAN.replace("selected_equals_oracle=2/2", "selected_equals_oracle=1/2");
        let err = eval.evaluate_text("s", &text).unwrap_err();
        assert!(err.to_string().contains("n == m"));
    }

    #[test]
    fn configured_rule_on_absent_key_is_format_drift() {
        let gates = vec![GateSpec {
            name: "geometry".into(),
            rules: vec![GateRule {
                key: "avg_inversion_rate".into(),
                scope: Scope::Run,
                op: GateOp::Le,
                value: 0.05,
                optional: false,
            }],
        }];
        let err = GateEvaluator::new(Some(gates))
            .unwrap()
            .evaluate_text("s", CLEAN)
            .unwrap_err();
        assert!(matches!(err, ParityError::Parse { .. }), "{err}");
    }

    #[test]
    fn gates_run_in_order_and_stop_at_first_failure() {
        let failing = |name: &str, key: &str| GateSpec {
            name: name.into(),
            rules: vec![GateRule {
                key: key.into(),
                scope: Scope::Case,
                op: GateOp::Eq,
                value: 99.0,
                optional: false,
            }],
        };
        let eval = GateEvaluator::new(Some(vec![
            failing("first", "ranks"),
            failing("second", "order_mismatch"),
        ]))
        .unwrap();
        let err = eval.evaluate_text("s", CLEAN).unwrap_err();
        assert!(err.to_string().contains("gate 'first'"));
    }

    #[test]
    fn invalid_rules_are_config_errors() {
        let rule = |key: &str, scope: Scope, op: GateOp| GateSpec {
            name: "g".into(),
            rules: vec![GateRule {
                key: key.into(),
                scope,
                op,
                value: 0.0,
                optional: false,
            }],
        };
        assert!(GateEvaluator::new(Some(vec![rule("nope", Scope::Case, GateOp::Eq)])).is_err());
        assert!(GateEvaluator::new(Some(vec![rule("fixtures", Scope::Case, GateOp::Eq)])).is_err());
        assert!(GateEvaluator::new(Some(vec![rule("ranks", Scope::Case, GateOp::All)])).is_err());
    }

    #[test]
    fn float_equality_is_tolerant() {
        let r = GateRule {
            key: "exact_order_match_rate".into(),
            scope: Scope::Case,
            op: GateOp::Eq,
            value: 0.5,
            optional: false,
        };
        assert!(r.holds(&SummaryValue::Float(0.500000)));
        assert!(!r.holds(&SummaryValue::Float(0.5001)));
    }
}
