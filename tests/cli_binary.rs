//! End-to-end tests driving the `dirsync` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use test_support::{TreeGen, b, generated_bytes, test_tree};
use tree::{Repository, index_dir};

fn dirsync() -> Command {
    Command::cargo_bin("dirsync").expect("dirsync binary")
}

fn digest(path: &Path) -> String {
    let repo = index_dir(path).expect("index");
    repo.tree().strong(repo.tree().root()).to_string()
}

#[test]
fn version_and_help_succeed() {
    dirsync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("dirsync "));
    dirsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync").and(predicate::str::contains("index")));
}

#[test]
fn usage_errors_exit_two() {
    dirsync().assert().code(2);
    dirsync()
        .args(["sync", "only-source"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("DST"));
}

#[test]
fn sync_makes_destination_identical() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d(
        "foo",
        vec![
            tg.f("moved", vec![b(1, 20_000)]),
            tg.d("sub", vec![tg.f("grown", vec![b(2, 40_000), b(3, 10)])]),
        ],
    ));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d(
        "foo",
        vec![
            tg.f("renamed", vec![b(1, 20_000)]),
            tg.f("sub", vec![b(4, 50)]),
            tg.f("grown", vec![b(2, 40_000)]),
        ],
    ));

    dirsync()
        .args(["sync", "-v"])
        .arg(src.root())
        .arg(dst.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("Transfer file renamed to moved"));

    assert_eq!(digest(src.root()), digest(dst.root()));
    assert_eq!(
        fs::read(dst.root().join("sub/grown")).expect("read"),
        [generated_bytes(2, 40_000), generated_bytes(3, 10)].concat()
    );
}

#[test]
fn dry_run_reports_without_changes() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("a", vec![b(5, 10)])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.f("z", vec![b(6, 10)])]));

    dirsync()
        .args(["sync", "--dry-run"])
        .arg(src.root())
        .arg(dst.root())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Copy entire source")
                .and(predicate::str::contains("Would remove z")),
        );

    assert!(!dst.root().join("a").exists());
    assert!(dst.root().join("z").exists());
}

#[test]
fn no_delete_keeps_extraneous_entries() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("a", vec![b(7, 10)])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.f("z", vec![b(8, 10)])]));

    dirsync()
        .args(["sync", "--no-delete", "--no-perms"])
        .arg(src.root())
        .arg(dst.root())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(dst.root().join("a").is_file());
    assert!(dst.root().join("z").is_file());
}

#[test]
fn failures_are_prefixed_and_exit_one() {
    let temp = tempfile::tempdir().expect("tempdir");
    dirsync()
        .arg("sync")
        .arg(temp.path().join("missing"))
        .arg(temp.path().join("dst"))
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("dirsync: "));
}

#[test]
fn index_writes_record_stream() {
    let tg = TreeGen::new();
    let tree = test_tree(&tg.d("foo", vec![tg.d("bar", vec![]), tg.f("baz", vec![b(9, 1)])]));
    let output = tree.temp_dir().join("records.bin");

    dirsync()
        .arg("index")
        .arg(tree.root())
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("4 records written"));

    // bar, baz's single block, baz, root
    assert_eq!(fs::metadata(&output).expect("stat").len(), 4 * 29);
}
