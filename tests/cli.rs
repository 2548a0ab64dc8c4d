use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/input/social.json")
}

#[test]
fn renders_svg_from_graph_file() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = fixture();
    assert!(fixture.exists(), "fixture graph definition should exist");

    let tmp = tempdir()?;
    let output_path = tmp.path().join("scene.svg");

    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input").arg(&fixture).arg("--output").arg(&output_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Rendered scene"));

    let svg_contents = fs::read_to_string(&output_path)?;
    assert!(
        svg_contents.contains("<svg"),
        "output should contain an <svg> element"
    );
    assert!(
        svg_contents.contains("Alice"),
        "node labels should survive into the output"
    );

    Ok(())
}

#[test]
fn writes_svg_to_stdout_when_asked() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input").arg(fixture()).arg("--output").arg("-");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<svg"))
        .stdout(predicate::str::contains("</svg>"));

    Ok(())
}

#[test]
fn reads_graph_definition_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let definition = fs::read_to_string(fixture())?;

    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input").arg("-").arg("--output").arg("-");
    cmd.write_stdin(definition);

    cmd.assert().success().stdout(predicate::str::contains("<svg"));

    Ok(())
}

#[test]
fn derives_output_name_from_input() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let input_path = tmp.path().join("social.json");
    fs::copy(fixture(), &input_path)?;

    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input").arg(&input_path);
    cmd.assert().success();

    let derived = tmp.path().join("social.json.svg");
    assert!(derived.exists(), "output should land next to the input");

    Ok(())
}

#[test]
fn quiet_flag_suppresses_the_summary() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let output_path = tmp.path().join("scene.svg");

    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input")
        .arg(fixture())
        .arg("--output")
        .arg(&output_path)
        .arg("--quiet");

    cmd.assert().success().stdout(predicate::str::is_empty());
    assert!(output_path.exists());

    Ok(())
}

#[test]
fn zoom_flag_controls_level_of_detail() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempdir()?;
    let output_path = tmp.path().join("far.svg");

    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input")
        .arg(fixture())
        .arg("--output")
        .arg(&output_path)
        .arg("--zoom")
        .arg("0.05");
    cmd.assert().success();

    let svg_contents = fs::read_to_string(&output_path)?;
    assert!(
        !svg_contents.contains("<text"),
        "labels should drop out at the farthest zoom step"
    );
    assert!(
        svg_contents.contains("<circle"),
        "node bodies should survive every zoom step"
    );

    Ok(())
}

#[test]
fn inspect_reports_scene_counts() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("inspect").arg("--input").arg(fixture());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("nodes:      5"))
        .stdout(predicate::str::contains("edges:      6"));

    Ok(())
}

#[test]
fn inspect_json_is_machine_readable() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("inspect").arg("--input").arg(fixture()).arg("--json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let report: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(report["nodes"], 5);
    assert_eq!(report["edges"], 6);
    assert!(report["zoom"].is_number());

    Ok(())
}

#[test]
fn missing_input_fails_with_context() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input").arg("no-such-graph.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    Ok(())
}

#[test]
fn malformed_definition_fails_with_context() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("graphstage")?;
    cmd.arg("--input").arg("-").arg("--output").arg("-");
    cmd.write_stdin("{ not json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse graph definition"));

    Ok(())
}
