#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const REFERENCE: &str = r#"[
  {"id": "a", "x": 0, "y": 0},
  {"id": "b", "x": 50, "y": 0},
  {"id": "c", "x": 25, "y": 100}
]"#;

fn trace(order: &[&str]) -> String {
    let mut lines = vec![
        "INPUT_NODE\t0\ta".to_string(),
        "INPUT_NODE\t1\tb".to_string(),
        "INPUT_NODE\t2\tc".to_string(),
        "INPUT_EDGE\ta\tc".to_string(),
        "INPUT_EDGE\tb\tc".to_string(),
    ];
    for (rank, nodes) in order.iter().enumerate() {
        lines.push(format!("ORDER_LAYER\t{rank}\t{nodes}"));
    }
    lines.push("OUTPUT_NODE\ta\t0\t0".into());
    lines.push("OUTPUT_NODE\tb\t50\t0".into());
    lines.push("OUTPUT_NODE\tc\t25\t100".into());
    lines.join("\n") + "\n"
}

/// Writes `<dir>/traces/<name>.trace` and `<dir>/refs/<name>.json`.
fn write_case(dir: &Path, name: &str, trace_text: &str) -> PathBuf {
    let traces = dir.join("traces");
    let refs = dir.join("refs");
    fs::create_dir_all(&traces).unwrap();
    fs::create_dir_all(&refs).unwrap();
    fs::write(refs.join(format!("{name}.json")), REFERENCE).unwrap();
    let path = traces.join(format!("{name}.trace"));
    fs::write(&path, trace_text).unwrap();
    path
}

fn layercheck(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("layercheck").expect("layercheck binary");
    cmd.current_dir(dir).env_remove("RUST_LOG").env_remove("LAYERCHECK_LOG");
    cmd
}

#[test]
fn matching_layering_passes_gates() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs", "--mode", "both"])
        .arg(&fx)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("=== flow_ok ==="))
        .stdout(predicate::str::contains("composition_mismatch=0"))
        .stdout(predicate::str::contains("order_mismatch=0"))
        .stdout(predicate::str::contains("inversion_rate=0.000000"))
        .stdout(predicate::str::contains("total_mismatch=0/2"))
        .stdout(predicate::str::contains("fixtures=1"));
}

#[test]
fn order_mismatch_alone_does_not_fail_default_gates() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_swap", &trace(&["b,a", "c"]));

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs"])
        .arg(&fx)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("order_mismatch=1"))
        .stdout(predicate::str::contains("exact_order_match_rate=0.500000"))
        .stdout(predicate::str::contains("total_mismatch=1/2"));
}

#[test]
fn composition_mismatch_exits_one() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_comp", &trace(&["a", "b,c"]));

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs"])
        .arg(&fx)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("composition_mismatch=2"))
        .stderr(predicate::str::contains("GATE FAILED"))
        .stderr(predicate::str::contains("flow_comp"));
}

#[test]
fn no_gates_reports_without_failing() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_comp", &trace(&["a", "b,c"]));

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs", "--no-gates"])
        .arg(&fx)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("composition_mismatch=2"));
}

#[test]
fn malformed_trace_exits_three() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "broken", "INPUT_NODE\tx\ta\n");

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs"])
        .arg(&fx)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("broken"))
        .stderr(predicate::str::contains("node index"));
}

#[test]
fn missing_reference_response_exits_three() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));
    fs::remove_file(dir.path().join("refs/flow_ok.json")).unwrap();

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs"])
        .arg(&fx)
        .assert()
        .code(3);
}

#[test]
fn bad_config_exits_two() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));
    fs::write(dir.path().join("layercheck.yaml"), "version: 1\nunknown_field: true\n").unwrap();

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs"])
        .arg(&fx)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ConfigError"));
}

#[test]
fn missing_engine_exits_two() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));

    layercheck(dir.path())
        .args(["run", "--recorded-traces"])
        .arg(&fx)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no reference engine"));
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempdir().unwrap();
    write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));
    write_case(dir.path(), "flow_swap", &trace(&["b,a", "c"]));
    fs::write(
        dir.path().join("layercheck.yaml"),
        r#"version: 1
corpus:
  root: traces
  pattern: "*.trace"
candidate:
  recorded: true
reference:
  recorded_dir: refs
gates:
  - name: strict-order
    rules:
      - key: order_mismatch
        op: eq
        value: 0
"#,
    )
    .unwrap();

    layercheck(dir.path())
        .arg("run")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("=== flow_ok ==="))
        .stdout(predicate::str::contains("=== flow_swap ==="))
        .stdout(predicate::str::contains("fixtures=2"))
        .stderr(predicate::str::contains("strict-order"))
        .stderr(predicate::str::contains("flow_swap"));
}

#[test]
fn json_report_and_saved_summary_round_trip_through_gate() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));

    layercheck(dir.path())
        .args(["run", "--recorded-traces", "--reference-dir", "refs", "--mode", "both"])
        .args(["--json", "out/report.json", "--summary-out", "out/summary.txt"])
        .arg(&fx)
        .assert()
        .code(0);

    let report: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/report.json")).unwrap())
            .unwrap();
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["fixtures"][0]["name"], "flow_ok");
    assert_eq!(report["fixtures"][0]["reference_origin"], "coordinates");
    assert_eq!(report["fixtures"][0]["geometry"]["shared_nodes"], 3);
    assert_eq!(report["totals"]["fixtures"], 1);

    layercheck(dir.path())
        .args(["gate", "out/summary.txt"])
        .assert()
        .code(0);
}

#[test]
fn gate_rejects_violating_and_malformed_summaries() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("bad.txt"),
        "=== flow_01 ===\ncomposition_mismatch=3\nfixtures=1\n",
    )
    .unwrap();
    fs::write(dir.path().join("garbage.txt"), "composition_mismatch=0\n").unwrap();

    layercheck(dir.path())
        .args(["gate", "bad.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("composition_mismatch"));

    layercheck(dir.path())
        .args(["gate", "garbage.txt"])
        .assert()
        .code(3);
}

#[test]
fn compare_prints_rank_diffs() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_comp", &trace(&["a", "b,c"]));

    layercheck(dir.path())
        .arg("compare")
        .arg(&fx)
        .arg("refs/flow_comp.json")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("=== flow_comp ==="))
        .stdout(predicate::str::contains("# rank 0 Composition: missing=[b] extra=[]"))
        .stdout(predicate::str::contains("# rank 1 Composition: missing=[] extra=[b]"));

    let out = layercheck(dir.path())
        .args(["compare", "--json"])
        .arg(&fx)
        .arg("refs/flow_comp.json")
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["parity"]["composition_mismatch_layers"], 2);
}

#[cfg(unix)]
#[test]
fn candidate_command_receives_fixture_path() {
    let dir = tempdir().unwrap();
    let fx = write_case(dir.path(), "flow_ok", &trace(&["a,b", "c"]));

    layercheck(dir.path())
        .args(["run", "--candidate-cmd", "cat", "--reference-dir", "refs"])
        .arg(&fx)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("=== flow_ok ==="));
}

#[test]
fn invalid_log_level_is_reported_not_ignored() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("ok.txt"),
        "=== flow_01 ===\ncomposition_mismatch=0\nfixtures=1\n",
    )
    .unwrap();

    layercheck(dir.path())
        .args(["--log-level", "layercheck=loud", "gate", "ok.txt"])
        .assert()
        .code(0)
        .stderr(predicate::str::contains("invalid --log-level 'layercheck=loud'"));
}
