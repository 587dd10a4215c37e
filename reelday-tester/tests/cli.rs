use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "reelday-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn exe() -> &'static str {
    env!("CARGO_BIN_EXE_reelday-tester")
}

#[test]
fn cli_list_scenarios_writes_output() {
    let output_path = temp_path("list");
    let status = Command::new(exe())
        .args(["scenarios", "--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("corruption"));
    std::fs::remove_file(&output_path).ok();
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let output_path = temp_path("run.json");
    let output = Command::new(exe())
        .args([
            "scenarios",
            "--scenarios",
            "all",
            "--iterations",
            "3",
            "--seeds",
            "1,2",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = std::fs::read_to_string(&output_path).expect("read output");
    let results: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let results = results.as_array().expect("array");
    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| r["passed"] == true));
    std::fs::remove_file(&output_path).ok();
}

#[test]
fn cli_console_report_prints_banner() {
    let output = Command::new(exe())
        .args(["scenarios", "--iterations", "1", "--seeds", "5"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Reelday Automated Tester"));
    assert!(stdout.contains("Total time"));
}

#[test]
fn cli_maintains_a_directory_store() {
    let dir = temp_path("store");
    std::fs::create_dir_all(&dir).expect("create dir");
    std::fs::write(
        dir.join("reelday.state.2024-05-01.json"),
        r#"{"attempts":1,"maxAttempts":3,"guesses":[{"id":"a","title":"Heat","tmdbId":949,
            "mediaType":"movie","correct":true,"timestamp":1}],"completed":false,
            "won":false,"currentHintLevel":1}"#,
    )
    .expect("seed record");
    std::fs::write(dir.join("reelday.state.2024-06-20.json"), "{oops").expect("seed record");

    let inspect = Command::new(exe())
        .args(["inspect", "--date", "2024-05-01", "--report", "json", "--dir"])
        .arg(&dir)
        .output()
        .expect("run inspect");
    assert!(inspect.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&inspect.stdout).expect("inspect json");
    assert_eq!(report["wasFixed"], true);
    assert_eq!(report["validatedState"]["won"], true);
    assert_eq!(report["validatedState"]["date"], "2024-05-01");

    let stats = Command::new(exe())
        .args(["stats", "--today", "2024-05-02", "--report", "json", "--dir"])
        .arg(&dir)
        .output()
        .expect("run stats");
    assert!(stats.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&stats.stdout).expect("stats json");
    assert_eq!(stats["played"], 1);
    assert_eq!(stats["current_streak"], 1);

    let sweep = Command::new(exe())
        .args(["sweep", "--today", "2024-06-30", "--report", "json", "--dir"])
        .arg(&dir)
        .output()
        .expect("run sweep");
    assert!(sweep.status.success());
    let sweep: serde_json::Value = serde_json::from_slice(&sweep.stdout).expect("sweep json");
    assert_eq!(sweep["deleted"], serde_json::json!(["2024-05-01"]));
    assert!(!dir.join("reelday.state.2024-05-01.json").exists());
    assert!(dir.join("reelday.state.2024-06-20.json").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_rejects_bad_dates_and_missing_files() {
    let status = Command::new(exe())
        .args(["inspect", "--dir", "/tmp", "--date", "someday"])
        .status()
        .expect("run cli");
    assert!(!status.success());

    let status = Command::new(exe())
        .args(["normalize"])
        .arg(temp_path("does-not-exist.json"))
        .status()
        .expect("run cli");
    assert!(!status.success());
}
