use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const CUT_MAP: &str = "0\nSECTION\n2\nENTITIES\n\
0\nLWPOLYLINE\n8\n0\n90\n4\n10\n0\n20\n0\n10\n100\n20\n0\n10\n100\n20\n50\n10\n0\n20\n50\n\
0\nLWPOLYLINE\n8\ndetails\n90\n4\n10\n10\n20\n10\n10\n30\n20\n10\n10\n30\n20\n20\n10\n10\n20\n20\n\
0\nENDSEC\n0\nEOF\n";

fn mdfview(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mdfview").expect("binary is built");
    cmd.current_dir(workdir)
        .env_remove("MDFVIEW_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

fn workspace_with_drawing() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::create_dir_all(dir.path().join("drawings")).unwrap();
    fs::write(dir.path().join("drawings").join("sheet_01.dxf"), CUT_MAP).unwrap();
    dir
}

#[test]
fn render_writes_svg_file() {
    let dir = workspace_with_drawing();
    let out = dir.path().join("sheet.svg");

    mdfview(dir.path())
        .args(["--source-dir", "drawings", "render", "sheet_01", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("ready"));

    let markup = fs::read_to_string(out).unwrap();
    assert!(markup.starts_with("<svg"));
    assert_eq!(markup.matches("<path").count(), 2);
    assert!(markup.contains("data-layer=\"details\""));
}

#[test]
fn render_applies_view_commands() {
    let dir = workspace_with_drawing();
    let out = dir.path().join("zoomed.svg");

    mdfview(dir.path())
        .args(["--source-dir", "drawings", "render", "sheet_01"])
        .args(["--view", "zoom_in", "--view", "zoom_in", "--view", "zoom_in"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let markup = fs::read_to_string(out).unwrap();
    assert!(markup.contains("scale(1.331)"));
}

#[test]
fn missing_drawing_fails_with_exit_code() {
    let dir = workspace_with_drawing();

    mdfview(dir.path())
        .args(["--source-dir", "drawings", "render", "absent"])
        .assert()
        .failure()
        .code(1);

    let placeholder = fs::read_to_string(dir.path().join("absent.svg")).unwrap();
    assert!(placeholder.contains("<text"));
}

#[test]
fn inspect_json_reports_statistics() {
    let dir = workspace_with_drawing();

    let output = mdfview(dir.path())
        .args(["--source-dir", "drawings", "inspect", "sheet_01", "--json"])
        .output()
        .expect("run inspect");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("\"piece_count\": 1"));
    assert!(stdout.contains("\"layer\": \"details\""));
}

#[test]
fn download_saves_original_bytes() {
    let dir = workspace_with_drawing();

    mdfview(dir.path())
        .args(["--source-dir", "drawings", "download", "sheet_01"])
        .args(["--to", "saved", "--filename", "copy.dxf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("copy.dxf"));

    let saved = fs::read_to_string(dir.path().join("saved").join("copy.dxf")).unwrap();
    assert_eq!(saved, CUT_MAP);
}

#[test]
fn config_file_provides_source_directory() {
    let dir = workspace_with_drawing();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config").join("default.toml"),
        "[source]\ndirectory = \"drawings\"\n\n[output]\ndirectory = \"svg\"\n",
    )
    .unwrap();

    mdfview(dir.path())
        .args(["render", "sheet_01"])
        .assert()
        .success();

    assert!(dir.path().join("svg").join("sheet_01.svg").exists());
}

#[test]
fn rejected_config_file_is_reported_and_fails() {
    let dir = workspace_with_drawing();
    fs::write(dir.path().join("bad.toml"), "[viewer]\nwidth = 0\n").unwrap();

    mdfview(dir.path())
        .args(["--config", "bad.toml", "--source-dir", "drawings", "render", "sheet_01"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("加载指定配置失败"))
        .stderr(predicate::str::contains("bad.toml"));

    assert!(!dir.path().join("sheet_01.svg").exists());
}

#[test]
fn broken_discovered_config_falls_back_with_warning() {
    let dir = workspace_with_drawing();
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(dir.path().join("config").join("default.toml"), "[viewer\n").unwrap();

    mdfview(dir.path())
        .args(["--source-dir", "drawings", "render", "sheet_01"])
        .assert()
        .success()
        .stderr(predicate::str::contains("加载默认配置失败"));

    assert!(dir.path().join("sheet_01.svg").exists());
}

#[test]
fn rust_log_overrides_configured_level() {
    let dir = workspace_with_drawing();
    fs::write(dir.path().join("quiet.toml"), "[logging]\nlevel = \"error\"\n").unwrap();

    mdfview(dir.path())
        .args(["--config", "quiet.toml", "--source-dir", "drawings", "render", "sheet_01"])
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("启动 MDF 裁切图查看器"));

    mdfview(dir.path())
        .args(["--config", "quiet.toml", "--source-dir", "drawings", "render", "sheet_01"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("启动 MDF 裁切图查看器").not());
}

#[test]
fn no_source_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");

    mdfview(dir.path())
        .args(["inspect", "sheet_01"])
        .assert()
        .failure();
}
