//! End-to-end tests driving the phpshift binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// Test Infrastructure
// ============================================================================

fn setup_workspace(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    (dir, root)
}

/// Run the binary inside `root` so no stray config file is picked up.
fn phpshift(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_phpshift"))
        .current_dir(root)
        .args(args)
        .output()
        .expect("failed to run phpshift")
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

const SHAPES: &str = "<?php
class Shape {
    public function area() { return 0; }
}
$s = new Shape();
$s->area();
function measure($thing) {
    return $thing->area();
}
";

// ============================================================================
// Tests
// ============================================================================

#[test]
fn conservative_method_rename_reports_json() {
    let (_dir, root) = setup_workspace(&[("shapes.php", SHAPES)]);
    let output = phpshift(
        &root,
        &["--format", "json", "rename-method", "Shape", "area", "size", "."],
    );
    assert_eq!(output.status.code(), Some(0));

    let response = json(&output);
    assert_eq!(response["status"], "ok");
    assert_eq!(response["operation"], "rename_method");
    assert_eq!(response["mode"], "conservative");
    assert_eq!(response["edits_applied"], 2);
    assert_eq!(response["withheld"].as_array().unwrap().len(), 1);
    assert_eq!(response["withheld"][0]["line"], 8);

    let content = fs::read_to_string(root.join("shapes.php")).unwrap();
    assert!(content.contains("public function size()"));
    assert!(content.contains("$s->size();"));
    assert!(content.contains("$thing->area()"));
}

#[test]
fn config_file_supplies_the_mode() {
    let (_dir, root) = setup_workspace(&[
        ("shapes.php", SHAPES),
        ("phpshift.toml", "[phpshift]\nmode = \"aggressive\"\n"),
    ]);
    let output = phpshift(&root, &["rename-method", "Shape", "area", "size", "."]);
    assert_eq!(output.status.code(), Some(0));

    let content = fs::read_to_string(root.join("shapes.php")).unwrap();
    assert!(content.contains("$thing->size()"));
}

#[test]
fn flag_overrides_config_mode() {
    let (_dir, root) = setup_workspace(&[
        ("shapes.php", SHAPES),
        ("phpshift.toml", "[phpshift]\nmode = \"aggressive\"\n"),
    ]);
    let output = phpshift(
        &root,
        &["--mode", "timid", "rename-class", "Shape", "Figure", "."],
    );
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(fs::read_to_string(root.join("shapes.php")).unwrap(), SHAPES);
}

#[test]
fn rename_file_moves_and_rewrites_includes() {
    let (_dir, root) = setup_workspace(&[
        ("lib/util.php", "<?php\nfunction helper() {}\n"),
        ("main.php", "<?php\nrequire_once 'lib/util.php';\nhelper();\n"),
    ]);
    let output = phpshift(
        &root,
        &["--format", "json", "rename-file", "lib/util.php", "lib/helpers.php", "."],
    );
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json(&output)["moved"].as_array().unwrap().len(), 1);

    assert!(!root.join("lib/util.php").exists());
    assert!(root.join("lib/helpers.php").exists());
    assert_eq!(
        fs::read_to_string(root.join("main.php")).unwrap(),
        "<?php\nrequire_once 'lib/helpers.php';\nhelper();\n"
    );
}

#[test]
fn missing_path_exits_with_resolution_error() {
    let (_dir, root) = setup_workspace(&[]);
    let output = phpshift(
        &root,
        &["--format", "json", "rename-class", "A", "B", "does-not-exist"],
    );
    assert_eq!(output.status.code(), Some(3));
    let response = json(&output);
    assert_eq!(response["status"], "error");
    assert_eq!(response["error"]["code"], 3);
}

#[test]
fn reserved_new_name_exits_with_invalid_arguments() {
    let (_dir, root) = setup_workspace(&[("a.php", "<?php class A {}\n")]);
    let output = phpshift(&root, &["rename-class", "A", "list", "."]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("phpshift:"));
}

#[test]
fn malformed_config_exits_with_invalid_arguments() {
    let (_dir, root) = setup_workspace(&[
        ("a.php", "<?php class A {}\n"),
        ("phpshift.toml", "[phpshift\n"),
    ]);
    let output = phpshift(&root, &["rename-class", "A", "B", "."]);
    assert_eq!(output.status.code(), Some(2));
}
