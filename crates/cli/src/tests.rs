use std::fs;

use test_support::{TreeGen, b, generated_bytes, test_tree};
use tree::records::{RECORD_SIZE, RecordReader};

use super::*;

fn run_capture(args: &[&str]) -> (i32, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let status = run(args.iter().copied(), &mut stdout, &mut stderr);
    (
        status,
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

#[test]
fn help_goes_to_stdout_with_success() {
    let (status, stdout, stderr) = run_capture(&["dirsync", "--help"]);
    assert_eq!(status, 0);
    assert!(stdout.contains("index"));
    assert!(stdout.contains("sync"));
    assert!(stderr.is_empty());
}

#[test]
fn usage_errors_exit_with_two() {
    let (status, stdout, stderr) = run_capture(&["dirsync", "sync", "--bogus", "a", "b"]);
    assert_eq!(status, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("--bogus"));
}

#[test]
fn missing_source_is_reported() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("nope");
    let dst = temp.path().join("dst");
    let (status, _, stderr) = run_capture(&[
        "dirsync",
        "sync",
        missing.to_str().expect("utf-8"),
        dst.to_str().expect("utf-8"),
    ]);
    assert_eq!(status, 1);
    assert!(stderr.starts_with("dirsync: "), "{stderr}");
}

#[test]
fn index_writes_whole_records() {
    let tg = TreeGen::new();
    let tree = test_tree(&tg.d("foo", vec![tg.f("bar", vec![b(1, 9000)])]));
    let output = tree.temp_dir().join("out.rec");

    let (status, stdout, _) = run_capture(&[
        "dirsync",
        "index",
        tree.root().to_str().expect("utf-8"),
        output.to_str().expect("utf-8"),
    ]);
    assert_eq!(status, 0);
    // two blocks, one file, one directory
    assert_eq!(stdout.trim(), format!("4 records written to {}", output.display()));

    let bytes = fs::read(&output).expect("read");
    assert_eq!(bytes.len(), 4 * RECORD_SIZE);
    let records: Vec<_> = RecordReader::new(bytes.as_slice())
        .collect::<Result<_, _>>()
        .expect("decode");
    assert_eq!(records.len(), 4);
}

#[test]
fn dry_run_prints_plan_only() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("bar", vec![b(2, 100)])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.f("old", vec![b(3, 100)])]));

    let (status, stdout, _) = run_capture(&[
        "dirsync",
        "sync",
        "-n",
        src.root().to_str().expect("utf-8"),
        dst.root().to_str().expect("utf-8"),
    ]);
    assert_eq!(status, 0);
    assert!(stdout.contains("Copy entire source"), "{stdout}");
    assert!(stdout.contains("Would remove old"), "{stdout}");
    assert!(!dst.root().join("bar").exists());
    assert!(dst.root().join("old").exists());
}

#[test]
fn sync_is_quiet_unless_verbose() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("bar", vec![b(4, 100)])]));
    let dst = src.root().join("copy");

    let (status, stdout, stderr) = run_capture(&[
        "dirsync",
        "sync",
        src.root().to_str().expect("utf-8"),
        dst.to_str().expect("utf-8"),
    ]);
    assert_eq!(status, 1, "copy lives inside the source: {stderr}");
    assert!(stdout.is_empty());
    assert!(!dst.exists());

    let target = tempfile::tempdir().expect("tempdir");
    let (status, stdout, _) = run_capture(&[
        "dirsync",
        "sync",
        src.root().to_str().expect("utf-8"),
        target.path().to_str().expect("utf-8"),
    ]);
    assert_eq!(status, 0);
    assert!(stdout.is_empty());
    assert_eq!(
        fs::read(target.path().join("bar")).expect("read"),
        generated_bytes(4, 100)
    );
}
