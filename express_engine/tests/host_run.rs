use std::fs;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn simulate_writes_save_trace_and_sound_log() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for host outputs")?;
    let save_path = temp_dir.path().join("run.lxsv");
    let trace_path = temp_dir.path().join("trace.json");
    let sound_path = temp_dir.path().join("sound.json");

    let output = Command::new(env!("CARGO_BIN_EXE_express_engine"))
        .arg("--ticks")
        .arg("30")
        .arg("--save-out")
        .arg(&save_path)
        .arg("--trace-json")
        .arg(&trace_path)
        .arg("--sound-log-json")
        .arg(&sound_path)
        .output()
        .context("executing express_engine")?;
    assert!(
        output.status.success(),
        "express_engine exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let save = fs::read(&save_path).context("reading save image")?;
    assert_eq!(&save[..4], b"LXSV");

    let trace: Value = serde_json::from_str(&fs::read_to_string(&trace_path)?)?;
    assert_eq!(trace["chapter"], 1);
    assert_eq!(trace["final_tick"], 30);
    let ticks = trace["ticks"].as_array().context("ticks array")?;
    assert_eq!(ticks.len(), 30);
    assert_eq!(ticks[0]["tick"], 1);

    let sound: Value = serde_json::from_str(&fs::read_to_string(&sound_path)?)?;
    assert!(sound.is_array());
    Ok(())
}

#[test]
fn skipped_ticks_count_toward_the_clock() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for trace")?;
    let trace_path = temp_dir.path().join("trace.json");

    let output = Command::new(env!("CARGO_BIN_EXE_express_engine"))
        .args(["--ticks", "5", "--skip-ticks", "20", "--trace-json"])
        .arg(&trace_path)
        .output()
        .context("executing express_engine")?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Skipped 20 ticks"));

    let trace: Value = serde_json::from_str(&fs::read_to_string(&trace_path)?)?;
    assert_eq!(trace["final_tick"], 25);
    let ticks = trace["ticks"].as_array().context("ticks array")?;
    assert_eq!(ticks.len(), 5);
    assert_eq!(ticks[0]["tick"], 21);
    Ok(())
}

#[test]
fn inspect_reads_back_a_saved_run() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for save image")?;
    let save_path = temp_dir.path().join("run.lxsv");

    let status = Command::new(env!("CARGO_BIN_EXE_express_engine"))
        .args(["--ticks", "5", "--chapter", "1", "--player-car", "red", "--player-slot", "14"])
        .arg("--save-out")
        .arg(&save_path)
        .status()
        .context("executing express_engine simulate")?;
    assert!(status.success(), "express_engine exited with {status:?}");

    let output = Command::new(env!("CARGO_BIN_EXE_express_engine"))
        .arg("--inspect")
        .arg(&save_path)
        .output()
        .context("executing express_engine inspect")?;
    assert!(output.status.success(), "inspect exited with {:?}", output.status);
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("chapter 1"), "unexpected output:\n{stdout}");
    assert!(stdout.contains("Player: red slot 14"), "unexpected output:\n{stdout}");
    assert!(stdout.contains("Active characters:"));
    Ok(())
}

#[test]
fn inspect_rejects_a_foreign_file() -> Result<()> {
    let temp_dir = tempdir()?;
    let bogus = temp_dir.path().join("bogus.lxsv");
    fs::write(&bogus, b"GRIM\x00\x01")?;

    let output = Command::new(env!("CARGO_BIN_EXE_express_engine"))
        .arg("--inspect")
        .arg(&bogus)
        .output()
        .context("executing express_engine inspect")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("magic"), "unexpected stderr:\n{stderr}");
    Ok(())
}
