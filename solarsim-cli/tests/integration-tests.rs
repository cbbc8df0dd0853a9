use std::process::Command;

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::predicate;

#[test]
fn test_optimize_produces_summary() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("solarsim-cli")?;
    cmd.args(["optimize", "--ghi10", "800", "--ghi90", "800"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Optimal speed"))
        .stdout(predicate::str::contains("Final SOC"));
    Ok(())
}

#[test]
fn test_optimize_json_output_parses() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("solarsim-cli")?;
    cmd.args(["optimize", "--json"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output)?;
    let speed = parsed["speed_opt_mps"].as_f64().unwrap();
    assert!(speed >= 10.0 / 3.6 && speed <= 60.0 / 3.6);
    assert!(parsed["sim"]["soc_final"].as_f64().is_some());
    Ok(())
}

#[test]
fn test_optimize_rejects_inverted_bounds() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("solarsim-cli")?;
    cmd.args(["optimize", "--min-speed", "20", "--max-speed", "10"]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn test_dataset_writes_csv() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("samples.csv");
    let mut cmd = Command::cargo_bin("solarsim-cli")?;
    cmd.args([
        "dataset",
        "--out",
        out.to_str().unwrap(),
        "--num-samples",
        "5",
        "--seed",
        "7",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wrote 5 samples"));
    let contents = std::fs::read_to_string(&out)?;
    assert_eq!(contents.lines().count(), 6); // header + 5 rows
    assert!(contents.lines().next().unwrap().contains("speed_opt_kph"));
    Ok(())
}
