use std::net::TcpListener;
use std::process::{Command, Output};

use serde_json::Value;

const RECORDS: &str =
    r#"[{"mem":100,"cpu":10,"epm":1,"apdex":0.9,"rpm":50,"endpoints":5,"_appname":"orders","_id":"i-1"}]"#;
const COEFFICIENTS: &str =
    r#"{"mem":1,"cpu":1000,"epm":100,"apdex":1000,"rpm":1000,"endpoints":100,"total":1000}"#;

fn mswyw(args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mswyw"));
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("MSWYW_") {
            cmd.env_remove(key);
        }
    }
    cmd.args(args).output().expect("run mswyw")
}

fn stdout_json(output: &Output) -> Value {
    let text = String::from_utf8(output.stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&text).expect("parse report json")
}

#[test]
fn scores_static_records_and_prints_json() {
    let runtime = format!("--runtimeProvider={RECORDS}");
    let coefficients = format!("--coefficients={COEFFICIENTS}");
    let output = mswyw(&[&runtime, &coefficients, "--interval=15"]);
    assert_eq!(output.status.code(), Some(0));

    let report = stdout_json(&output);
    let score = report["mswyw-score"].as_f64().expect("score");
    assert!((score - 5039.215_686).abs() < 1e-3);
    assert_eq!(report["failed-performance"], false);
    assert_eq!(report["runtime-data"][0]["_id"], "i-1");
    assert_eq!(report["arguments"]["interval"], "15");
    assert!(report["arguments"].get("providerParams").is_none());
    assert!(report["start-time"].as_str().expect("start").ends_with('Z'));
}

#[test]
fn below_threshold_exits_with_its_own_code() {
    let runtime = format!("--runtimeProvider={RECORDS}");
    let coefficients = format!("--coefficients={COEFFICIENTS}");
    let output = mswyw(&[&runtime, &coefficients, "--minResult=10000"]);
    assert_eq!(output.status.code(), Some(10));
    let report = stdout_json(&output);
    assert_eq!(report["failed-performance"], true);
}

#[test]
fn missing_coefficient_is_configuration_failure() {
    let runtime = format!("--runtimeProvider={RECORDS}");
    let output = mswyw(&[
        &runtime,
        r#"--coefficients={"mem":1,"cpu":1,"apdex":1,"rpm":1,"endpoints":1,"total":1}"#,
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("problem: configuration error: missing coefficient epm"));
}

#[test]
fn unknown_provider_is_resolution_failure() {
    let output = mswyw(&["--runtimeProvider=datadog"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot resolve `datadog`"));
}

#[test]
fn verbose_prints_human_report() {
    let runtime = format!("--runtimeProvider={RECORDS}");
    let coefficients = format!("--coefficients={COEFFICIENTS}");
    let output = mswyw(&[&runtime, &coefficients, "--verbose"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sampling Start time:"));
    assert!(stdout.contains("mswyw score: 5039.2"));
}

#[test]
fn unreachable_metrics_source_is_execution_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let params = format!(r#"--providerParams={{"elastic.URL":"http://{addr}","elastic.APPS":"orders"}}"#);
    let output = mswyw(&["--runtimeProvider=elastic", &params, "--timeoutSecs=1"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("problem: provider `elastic` failed: http error"));
}

#[test]
fn zero_timeout_is_refused_by_the_parser() {
    let output = mswyw(&["--timeoutSecs=0"]);
    assert_eq!(output.status.code(), Some(2));
}
