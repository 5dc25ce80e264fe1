//! End-to-end rename tests: scan a temporary tree, apply under an edit
//! mode, and compare the files on disk.
//!
//! # Running These Tests
//!
//! ```bash
//! cargo nextest run -p phpshift-php rename_scenarios
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use phpshift_core::apply::apply_all;
use phpshift_core::edit::EditMode;
use phpshift_core::output::RunReport;
use phpshift_php::{Refactoring, Scanner};
use tempfile::TempDir;

/// Helper to set up a workspace with the given files.
fn setup_workspace(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir
        .path()
        .canonicalize()
        .expect("Failed to canonicalize temp dir");
    for (path, content) in files {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directories");
        }
        fs::write(&full_path, content).expect("Failed to write file");
    }
    (temp_dir, root)
}

/// Scan every `.php` file under `root`, apply under `mode`, and report.
fn run(root: &Path, refactoring: &Refactoring, mode: EditMode) -> RunReport {
    let mut scanner = Scanner::new().expect("Failed to create scanner");
    let mut paths = Vec::new();
    collect(root, &mut paths);
    paths.sort();
    for path in &paths {
        scanner.add_file(path).expect("Failed to add file");
    }
    let mut changes = scanner.run(refactoring).expect("Scan failed");
    let summary = apply_all(&mut changes, mode);
    RunReport::from_summary(mode, &summary)
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("Failed to read dir") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            collect(&path, out);
        } else if path.extension().is_some_and(|e| e == "php") {
            out.push(path);
        }
    }
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).expect("Failed to read file")
}

fn rename_method() -> Refactoring {
    Refactoring::RenameMethod {
        class: "Foo".to_string(),
        old: "bar".to_string(),
        new: "baz".to_string(),
    }
}

const CLASSES: &str = "<?php\nclass Foo { function bar() {} }\nclass NotFoo { function bar() {} }\n";
const RENAMED_CLASSES: &str =
    "<?php\nclass Foo { function baz() {} }\nclass NotFoo { function bar() {} }\n";

/// Rename `Foo::bar` with the classes in their own file and `code` in
/// `main.php`; return the new `main.php` and the report.
fn rename_in_main(code: &str, mode: EditMode) -> (String, RunReport) {
    let main = format!("<?php\nrequire_once 'classes.php';\n{}", code);
    let (_dir, root) = setup_workspace(&[("classes.php", CLASSES), ("main.php", &main)]);
    let report = run(&root, &rename_method(), mode);
    assert_eq!(read(&root, "classes.php"), RENAMED_CLASSES);
    (read(&root, "main.php"), report)
}

// ============================================================================
// End-to-end Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    #[test]
    fn scenario_a_declaration_and_call_site() {
        let (_dir, root) = setup_workspace(&[(
            "foo.php",
            "<?php\nclass Foo { function bar() {} }\n$f = new Foo();\n$f->bar();\n",
        )]);
        let report = run(&root, &rename_method(), EditMode::Conservative);
        assert_eq!(
            read(&root, "foo.php"),
            "<?php\nclass Foo { function baz() {} }\n$f = new Foo();\n$f->baz();\n"
        );
        assert_eq!(report.files_changed, 1);
        assert!(report.withheld.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn scenario_b_last_assignment_wins_per_variable() {
        let (main, _) = rename_in_main(
            "$a = new Foo();\n$b = new NotFoo();\n$a = new NotFoo();\n$b = new Foo();\n$a->bar();\n$b->bar();\n",
            EditMode::Conservative,
        );
        assert!(main.ends_with("$a->bar();\n$b->baz();\n"), "{}", main);
    }

    #[test]
    fn scenario_c_file_move_rewrites_includes() {
        let (_dir, root) = setup_workspace(&[
            ("lib/stuff.php", "<?php\nfunction helper() {}\n"),
            ("main.php", "<?php\nrequire_once 'lib/stuff.php';\nhelper();\n"),
            ("pages/page.php", "<?php\ninclude(\"../lib/stuff.php\");\n"),
            ("other.php", "<?php\ninclude 'lib/other.php';\n"),
        ]);
        let refactoring = Refactoring::RenameFile {
            old: root.join("lib/stuff.php"),
            new: root.join("lib/things.php"),
        };
        let report = run(&root, &refactoring, EditMode::Conservative);

        assert!(!root.join("lib/stuff.php").exists());
        assert_eq!(read(&root, "lib/things.php"), "<?php\nfunction helper() {}\n");
        assert_eq!(
            read(&root, "main.php"),
            "<?php\nrequire_once 'lib/things.php';\nhelper();\n"
        );
        assert_eq!(
            read(&root, "pages/page.php"),
            "<?php\ninclude(\"../lib/things.php\");\n"
        );
        assert_eq!(read(&root, "other.php"), "<?php\ninclude 'lib/other.php';\n");
        assert_eq!(report.moved.len(), 1);
        assert_eq!(report.files_changed, 3);
    }
}

// ============================================================================
// Method Rename Cases
// ============================================================================

mod method_rename {
    use super::*;

    #[test]
    fn copied_variables() {
        let (main, _) = rename_in_main(
            "$f = new Foo();\n$f->bar();\n$f2 = $f;\n$f2->bar();\n",
            EditMode::Conservative,
        );
        assert!(main.ends_with("$f->baz();\n$f2 = $f;\n$f2->baz();\n"), "{}", main);
    }

    #[test]
    fn calls_inside_the_class() {
        let (_dir, root) = setup_workspace(&[(
            "foo.php",
            "<?php\nclass Foo {\n  function bar() {}\n  function a() { $this->bar(); }\n  function b() { $foo = $this; $foo->bar(); }\n  function c() { self::bar(); static::bar(); }\n}\n",
        )]);
        run(&root, &rename_method(), EditMode::Conservative);
        assert_eq!(
            read(&root, "foo.php"),
            "<?php\nclass Foo {\n  function baz() {}\n  function a() { $this->baz(); }\n  function b() { $foo = $this; $foo->baz(); }\n  function c() { self::baz(); static::baz(); }\n}\n"
        );
    }

    #[test]
    fn overwritten_variable_is_left_alone() {
        let (main, report) = rename_in_main(
            "$f = new Foo();\n$f = new NotFoo();\n$f->bar();\n",
            EditMode::Conservative,
        );
        assert!(main.ends_with("$f->bar();\n"));
        assert!(report.withheld.is_empty());
    }

    #[test]
    fn function_scopes_are_separate() {
        let (main, _) = rename_in_main(
            "$f = new Foo();\nfunction g() { $f = new NotFoo(); $f->bar(); }\n$f->bar();\n",
            EditMode::Conservative,
        );
        assert!(
            main.ends_with("function g() { $f = new NotFoo(); $f->bar(); }\n$f->baz();\n"),
            "{}",
            main
        );
    }

    #[test]
    fn global_declaration_reaches_top_level() {
        let (main, _) = rename_in_main(
            "$f = new Foo();\nfunction g() {\n  global $f;\n  $f->bar();\n}\n",
            EditMode::Conservative,
        );
        assert!(main.contains("  $f->baz();"), "{}", main);
    }

    #[test]
    fn non_global_inside_function_is_only_a_notification() {
        let code = "$f = new Foo();\nfunction g() {\n  $f->bar();\n}\n";
        let (main, report) = rename_in_main(code, EditMode::Conservative);
        assert!(main.contains("  $f->bar();"));
        assert_eq!(report.withheld.len(), 1);
        assert_eq!(report.withheld[0].line, Some(5));

        let (main, _) = rename_in_main(code, EditMode::Aggressive);
        assert!(main.contains("  $f->baz();"));
    }

    #[test]
    fn branches_follow_source_order() {
        let (main, _) = rename_in_main(
            "if ($x) {\n  $f = new Foo();\n  $f->bar();\n} else {\n  $f = new NotFoo();\n  $f->bar();\n}\n",
            EditMode::Conservative,
        );
        assert!(
            main.ends_with("  $f->baz();\n} else {\n  $f = new NotFoo();\n  $f->bar();\n}\n"),
            "{}",
            main
        );
    }

    #[test]
    fn static_calls() {
        let (main, _) = rename_in_main("Foo::bar();\nNotFoo::bar();\n", EditMode::Conservative);
        assert!(main.ends_with("Foo::baz();\nNotFoo::bar();\n"), "{}", main);
    }

    #[test]
    fn typed_parameters_and_return_types() {
        let (main, _) = rename_in_main(
            "function make(): Foo { return new Foo(); }\nfunction use_it(Foo $x) { $x->bar(); }\nmake()->bar();\n",
            EditMode::Conservative,
        );
        assert!(main.contains("{ $x->baz(); }"), "{}", main);
        assert!(main.ends_with("make()->baz();\n"), "{}", main);
    }

    #[test]
    fn doc_comment_after_first_use() {
        let (main, report) = rename_in_main(
            "function g() { $f->bar(); /** @var Foo $f */ }\n",
            EditMode::Conservative,
        );
        assert!(main.ends_with("function g() { $f->baz(); /** @var Foo $f */ }\n"), "{}", main);
        assert!(report.withheld.is_empty());
    }

    #[test]
    fn timid_mode_changes_nothing() {
        let code = "$f = new Foo();\n$f->bar();\n";
        let main = format!("<?php\nrequire_once 'classes.php';\n{}", code);
        let (_dir, root) = setup_workspace(&[("classes.php", CLASSES), ("main.php", &main)]);
        let report = run(&root, &rename_method(), EditMode::Timid);
        assert_eq!(read(&root, "classes.php"), CLASSES);
        assert_eq!(read(&root, "main.php"), main);
        assert_eq!(report.files_changed, 0);
        assert_eq!(report.withheld.len(), 2);
    }
}

// ============================================================================
// Class Rename
// ============================================================================

mod class_rename {
    use super::*;

    const MAIN: &str = "<?php\n// build a Foo\n$f = new Foo();\nif ($f instanceof Foo) {}\n";

    fn rename_class() -> Refactoring {
        Refactoring::RenameClass {
            old: "Foo".to_string(),
            new: "Bar".to_string(),
        }
    }

    #[test]
    fn code_references_across_files() {
        let (_dir, root) = setup_workspace(&[
            ("foo.php", "<?php\nclass Foo {}\nclass Sub extends Foo {}\n"),
            ("main.php", MAIN),
        ]);
        let report = run(&root, &rename_class(), EditMode::Conservative);
        assert_eq!(
            read(&root, "foo.php"),
            "<?php\nclass Bar {}\nclass Sub extends Bar {}\n"
        );
        assert_eq!(
            read(&root, "main.php"),
            "<?php\n// build a Foo\n$f = new Bar();\nif ($f instanceof Bar) {}\n"
        );
        assert_eq!(report.withheld.len(), 1);
    }

    #[test]
    fn aggressive_mode_renames_comments() {
        let (_dir, root) = setup_workspace(&[("main.php", MAIN)]);
        run(&root, &rename_class(), EditMode::Aggressive);
        assert_eq!(
            read(&root, "main.php"),
            "<?php\n// build a Bar\n$f = new Bar();\nif ($f instanceof Bar) {}\n"
        );
    }
}
