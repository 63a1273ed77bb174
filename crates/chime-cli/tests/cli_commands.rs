#![forbid(unsafe_code)]

use std::path::Path;

use chime_cli::cli::{Cli, load_config};
use chime_cli::{CliError, run};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::tempdir;

fn run_args(args: &[&str]) -> Result<String, CliError> {
    let cli = Cli::try_parse_from(std::iter::once("chime").chain(args.iter().copied()))
        .expect("arguments parse");
    let config = load_config(&cli)?;
    let mut out = Vec::new();
    run(cli, &config, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

fn write_script(dir: &Path, body: &str) -> String {
    let path = dir.join("script.json");
    std::fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_owned()
}

/// Split pretty-printed JSON documents written back to back.
fn documents(output: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(output)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn decode_prints_field_values() {
    let output = run_args(&["decode", "#n_days=60;market_share=2.5;bogus=1"]).unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value, serde_json::json!({"n_days": 60, "market_share": 2.5}));
}

#[test]
fn params_scales_percentages() {
    let output = run_args(&["params", "#n_days=60;market_share=25"]).unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["parameters"]["market_share"], 0.25);
    assert_eq!(value["parameters"]["n_days"], 60);
    assert_eq!(value["parameters"]["growth"], serde_json::json!({"doubling_time": 4.0}));
    assert_eq!(value["display"]["show_tables"], false);
}

#[test]
fn params_accepts_export_queries() {
    let output = run_args(&["params", "--query", "?icu_rate=10&n_days=45"]).unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["parameters"]["icu"]["rate"], 0.1);
}

#[test]
fn params_validation_failure_exits_2() {
    let err = run_args(&["params", "#n_days=10"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("n_days: 10 is outside [30, ∞)"));
}

#[test]
fn export_query_builds_link() {
    let output = run_args(&["export-query", "#n_days=60;market_share=25"]).unwrap();
    assert_eq!(output, "/download-as-pdf?market_share=25&n_days=60\n");
}

#[test]
fn config_defaults_flow_into_params() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("chime.toml");
    std::fs::write(&path, "[defaults]\nn_days = 45\n").unwrap();
    let output = run_args(&["--config", path.to_str().unwrap(), "params", ""]).unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["parameters"]["n_days"], 45);
}

#[test]
fn replay_reports_commands_and_final_state() {
    let dir = tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r##"[
            {"at": 3, "event": {"hash_changed": "#icu_rate=20"}},
            {"at": 5, "event": {"fields_submitted": {"icu_rate": 10}}}
        ]"##,
    );
    let output = run_args(&["replay", &script]).unwrap();
    let docs = documents(&output);
    assert_eq!(docs.len(), 3);

    assert_eq!(docs[0]["event"], "hash_changed");
    assert_eq!(docs[1]["event"], "fields_submitted");
    assert_eq!(docs[1]["at"], 5);

    let summary = &docs[2];
    assert_eq!(summary["steps"], 2);
    assert_eq!(summary["root"]["values"]["icu_rate"], 10);
    assert!(
        summary["location_hash"]
            .as_str()
            .unwrap()
            .starts_with("#icu_rate=10;")
    );
    assert_eq!(summary["errors"], serde_json::json!([]));
}

#[test]
fn replay_with_echo_settles() {
    let dir = tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r##"[{"at": 100, "event": {"hash_changed": "#n_days=60"}}]"##,
    );
    let output = run_args(&["replay", "--echo", &script]).unwrap();
    let docs = documents(&output);
    let summary = docs.last().unwrap();

    assert_eq!(summary["root"]["values"], summary["sidebar"]["values"]);
    assert!(docs[1]["echo"].as_bool().unwrap());
    assert_eq!(summary["location_hash"], "#n_days=60");
    assert_eq!(summary["root"]["values"]["show_tables"], false);
    assert_eq!(docs[1]["commands"], serde_json::json!([]));
}

#[test]
fn replay_stamps_never_repeat() {
    let dir = tempdir().unwrap();
    let script = write_script(
        dir.path(),
        r#"[
            {"at": 7, "event": "stores_changed"},
            {"at": 7, "event": "stores_changed"}
        ]"#,
    );
    let docs = documents(&run_args(&["replay", &script]).unwrap());
    assert_eq!(docs[0]["at"], 7);
    assert_eq!(docs[1]["at"], 8);
}

#[test]
fn missing_script_exits_1() {
    let err = run_args(&["replay", "/nonexistent/script.json"]).unwrap_err();
    assert!(matches!(err, CliError::Script { .. }));
    assert_eq!(err.exit_code(), 1);
}
