use std::process::Command;

fn classweave() -> Command {
    let binary = std::env::var("CARGO_BIN_EXE_classweave").unwrap_or_else(|_| {
        let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("target");
        path.push("debug");
        path.push("classweave");
        if cfg!(windows) {
            path.set_extension("exe");
        }
        path.to_string_lossy().to_string()
    });
    Command::new(binary)
}

#[test]
fn classweave_exits_non_zero_on_missing_input() {
    let output = classweave()
        .arg("--input")
        .arg("missing.class")
        .output()
        .expect("run classweave");

    assert!(!output.status.success());
}

#[test]
fn classweave_exits_non_zero_on_invalid_class_file() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let class_path = temp_dir.path().join("Broken.class");
    std::fs::write(&class_path, b"not a class").expect("write class");

    let output = classweave()
        .arg("--input")
        .arg(&class_path)
        .arg("--quiet")
        .output()
        .expect("run classweave");

    assert!(!output.status.success());
}

#[test]
fn classweave_writes_sarif_for_empty_directory() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let report = temp_dir.path().join("report.sarif");

    let output = classweave()
        .arg("--input")
        .arg(temp_dir.path())
        .arg("--output")
        .arg(&report)
        .arg("--quiet")
        .output()
        .expect("run classweave");

    assert!(output.status.success());
    let sarif: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("read report"))
            .expect("parse report");
    assert_eq!(sarif["version"], "2.1.0");
    assert_eq!(
        sarif["runs"][0]["invocations"][0]["properties"]["classweave.class_count"],
        0
    );
}
