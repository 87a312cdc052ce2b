#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::process::Command;

mod common;
use common::temp_files::create_app_dir;

fn segroute() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_segroute"));
    cmd.env("SEGROUTE_LOG_LEVEL", "error");
    cmd
}

#[test]
fn test_cli_check_and_match_directory() {
    let app = create_app_dir(&["layout.tsx", "blog/[slug]/page.tsx", "blog/featured/page.tsx"]);
    let dir = app.path().to_str().unwrap();

    let output = segroute().args(["check", "--dir", dir]).output().expect("run cli");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("ok: 3 routes"));

    let output = segroute()
        .args(["match", "--dir", dir, "/blog/my-post"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#"params:   {"slug":"my-post"}"#), "{stdout}");
    assert!(stdout.contains("layouts:  [layout.tsx]"), "{stdout}");
}

#[test]
fn test_cli_check_fails_on_conflicts() {
    let app = create_app_dir(&["users/[id]/page.tsx", "users/[userId]/edit/page.tsx"]);
    let output = segroute()
        .args(["check", "--dir", app.path().to_str().unwrap()])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("route tree build failed"), "{stdout}");
}

#[test]
fn test_cli_missing_source_is_an_error() {
    let output = segroute()
        .args(["routes", "--dir", "/definitely/not/here"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}
