use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cluster-conductor"))
}

/// Temporary input file removed when the test finishes.
struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn write(file_name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "cluster-conductor-{}-{file_name}",
            std::process::id()
        ));
        fs::write(&path, contents).expect("failed to write temporary file");
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn write_script(name: &str, contents: &str) -> TempFile {
    TempFile::write(&format!("{name}.script"), contents)
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("stdout is utf-8")
}

const FIRST_LEVEL: &str = "\
start
begin
move frontend-a node-1
move backend-a node-3
move frontend-b node-1
move backend-a node-2
";

#[test]
fn lists_bundled_levels() {
    let output = binary().arg("levels").output().expect("binary runs");
    let text = stdout(&output);

    assert!(text.starts_with("Welcome to Cluster Conductor."), "{text}");
    assert!(text.contains(" 1. Pod Scheduling 101"), "{text}");
    assert!(text.contains(" 5. Stateful Services & Quorum"), "{text}");
}

#[test]
fn scripted_play_completes_the_first_level() {
    let script = write_script("play", FIRST_LEVEL);
    let output = binary()
        .args(["play", "--script"])
        .arg(&script.path)
        .output()
        .expect("binary runs");
    let text = stdout(&output);

    assert!(text.contains("ok: briefing"), "{text}");
    assert!(text.contains("scheduled backend-a on node-2"), "{text}");
    assert!(text.contains("level complete: Pod Scheduling 101 (+100)"), "{text}");
    assert!(text.contains("phase: level complete"), "{text}");
    assert!(text.contains("[x] Deploy 2 frontend pods to worker-1"), "{text}");
}

#[test]
fn refused_actions_do_not_abort_the_script() {
    let script = write_script(
        "refusals",
        "begin\nreveal\nstart\njump 42\nbegin\nmove ghost node-1\nreveal\nreveal\nreveal\n",
    );
    let output = binary()
        .args(["--json", "play", "--script"])
        .arg(&script.path)
        .output()
        .expect("binary runs");
    let text = stdout(&output);

    assert!(text.contains("refused: cannot begin during menu"), "{text}");
    assert!(text.contains("ignored: unknown pod ghost"), "{text}");
    assert!(text.contains("solution revealed (0 remaining)"), "{text}");
    assert!(text.contains("refused: no solution reveals remaining"), "{text}");
    assert!(text.contains("\"solution_revealed\": true"), "{text}");
    assert!(text.contains("\"score\": 0"), "{text}");
}

#[test]
fn exported_placement_imports_into_a_fresh_session() {
    let script = write_script("export", &FIRST_LEVEL.replace("move backend-a node-2\n", ""));
    let output = binary()
        .args(["export", "--script"])
        .arg(&script.path)
        .output()
        .expect("binary runs");
    let code = stdout(&output).trim().to_owned();
    assert!(code.starts_with("cluster:v1:1:"), "{code}");

    let output = binary().args(["import", &code]).output().expect("binary runs");
    let text = stdout(&output);

    assert!(text.contains("scheduled frontend-a on node-1"), "{text}");
    assert!(text.contains("scheduled backend-a on node-3"), "{text}");
    assert!(text.contains("phase: playing"), "{text}");
}

#[test]
fn malformed_scripts_fail_with_line_numbers() {
    let script = write_script("malformed", "start\nteleport frontend-a\n");
    let output = binary()
        .args(["play", "--script"])
        .arg(&script.path)
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("script line 2"), "{stderr}");
    assert!(stderr.contains("unknown action 'teleport'"), "{stderr}");
}

#[test]
fn temporary_inputs_are_removed_after_use() {
    let script = write_script("cleanup", "start\n");
    let path = script.path.clone();
    let output = binary()
        .args(["play", "--script"])
        .arg(&script.path)
        .output()
        .expect("binary runs");
    let _ = stdout(&output);

    assert!(path.exists(), "script exists while the guard is alive");
    drop(script);
    assert!(!path.exists(), "script is removed once the guard drops");
}

#[test]
fn custom_catalog_is_validated() {
    let catalog = TempFile::write("catalog.toml", "version = 1\nlevels = []\n");

    let output = binary()
        .arg("--catalog")
        .arg(&catalog.path)
        .arg("levels")
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("catalog contains no levels"), "{stderr}");
}
