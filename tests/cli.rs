//! Exit code checks against the compiled binary

use std::process::Command;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rest-api-tests"))
}

fn empty_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();
    path
}

#[test]
fn test_binary_with_other_engine_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let status = binary()
        .args(["--engine", "elasticsearch", "--binary", "/nonexistent/quickwit"])
        .arg("--config")
        .arg(empty_config(&dir))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn test_unknown_flag_exits_3() {
    let status = binary().arg("--no-such-flag").status().unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn test_empty_scenario_root_passes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("scenarii");
    std::fs::create_dir(&root).unwrap();
    let status = binary()
        .arg("--root")
        .arg(&root)
        .arg("--config")
        .arg(empty_config(&dir))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_failing_scenario_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("scenarii");
    std::fs::create_dir(&root).unwrap();
    // unsupported verb fails before any request is sent
    std::fs::write(
        root.join("patch.yaml"),
        "api_root: http://127.0.0.1:9\nmethod: PATCH\nendpoint: /x\n",
    )
    .unwrap();
    let status = binary()
        .arg("--root")
        .arg(&root)
        .arg("--config")
        .arg(empty_config(&dir))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}
