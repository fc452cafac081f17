use std::fs;
use std::path::{Path, PathBuf};

use engine::{EngineError, SyncOptions, clean, extraneous, sync};
use test_support::{TreeGen, b, generated_bytes, test_tree};
use tree::{Repository, index_dir};

#[test]
fn clean_removes_only_outermost_extraneous_paths() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("bar", vec![b(1, 100)])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d(
        "foo",
        vec![
            tg.f("bar", vec![b(1, 100)]),
            tg.f("stray", vec![b(2, 10)]),
            tg.d("extra", vec![tg.f("deep", vec![b(3, 10)])]),
        ],
    ));

    let repo = index_dir(src.temp_dir()).expect("index");
    let removed = clean(repo.tree(), dst.temp_dir()).expect("clean");
    assert_eq!(
        removed,
        vec![PathBuf::from("foo/extra"), PathBuf::from("foo/stray")]
    );
    assert!(dst.root().join("bar").is_file());
    assert!(!dst.root().join("stray").exists());
    assert!(!dst.root().join("extra").exists());
    assert!(extraneous(repo.tree(), dst.temp_dir()).expect("walk").is_empty());
}

#[test]
fn clean_replaces_kind_mismatches() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.d("same", vec![])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.f("same", vec![b(4, 4)])]));

    let repo = index_dir(src.temp_dir()).expect("index");
    let found = extraneous(repo.tree(), dst.temp_dir()).expect("walk");
    assert_eq!(found, vec![PathBuf::from("foo/same")]);
}

#[test]
fn sync_mirrors_and_prunes() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d(
        "foo",
        vec![
            tg.f("kept", vec![b(10, 20_000)]),
            tg.d("empty", vec![]),
            tg.d("nested", vec![tg.f("grown", vec![b(11, 30_000), b(12, 500)])]),
        ],
    ));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d(
        "foo",
        vec![
            tg.f("kept", vec![b(10, 20_000)]),
            tg.f("obsolete", vec![b(13, 99)]),
            tg.d("nested", vec![tg.f("grown", vec![b(11, 30_000)])]),
        ],
    ));

    let summary = sync(src.root(), dst.root(), &SyncOptions::new()).expect("sync");
    assert!(summary.exec().is_some());
    assert_eq!(summary.removed(), [PathBuf::from("obsolete")]);
    assert_eq!(summary.created_dirs(), 1);
    assert!(dst.root().join("empty").is_dir());

    let mut expected = generated_bytes(11, 30_000);
    expected.extend(generated_bytes(12, 500));
    assert_eq!(fs::read(dst.root().join("nested/grown")).expect("read"), expected);

    let digest = |path: &Path| {
        let repo = index_dir(path).expect("index");
        repo.tree().strong(repo.tree().root())
    };
    assert_eq!(digest(src.root()), digest(dst.root()));

    let again = sync(src.root(), dst.root(), &SyncOptions::new()).expect("second sync");
    assert!(again.plan().is_noop());
    assert!(again.removed().is_empty());
}

#[test]
fn dry_run_leaves_destination_alone() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("new", vec![b(20, 50)])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.f("old", vec![b(21, 50)])]));

    let options = SyncOptions::new().dry_run(true);
    let summary = sync(src.root(), dst.root(), &options).expect("dry run");
    assert!(summary.exec().is_none());
    assert_eq!(summary.plan().len(), 1);
    assert_eq!(summary.removed(), [PathBuf::from("old")]);
    assert!(dst.root().join("old").is_file());
    assert!(!dst.root().join("new").exists());

    let missing = dst.temp_dir().join("missing");
    let summary = sync(src.root(), &missing, &options).expect("dry run into missing dir");
    assert_eq!(summary.plan().len(), 1);
    assert!(!missing.exists());
}

#[test]
fn sync_without_prune_keeps_extra_entries() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("a", vec![b(30, 10)])]));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.f("z", vec![b(31, 10)])]));

    let options = SyncOptions::new().prune(false).preserve_modes(false);
    let summary = sync(src.root(), dst.root(), &options).expect("sync");
    assert!(summary.removed().is_empty());
    assert!(summary.modes().is_none());
    assert!(dst.root().join("a").is_file());
    assert!(dst.root().join("z").is_file());
}

#[test]
fn sync_creates_missing_destination() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.f("a", vec![b(40, 10)])]));
    let target = tempfile::tempdir().expect("tempdir");
    let dst = target.path().join("fresh/copy");

    sync(src.root(), &dst, &SyncOptions::new()).expect("sync");
    assert_eq!(fs::read(dst.join("a")).expect("read"), generated_bytes(40, 10));
}

#[test]
fn bookkeeping_lookalikes_are_synced() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d(
        "foo",
        vec![
            tg.f("_relocate.txt", vec![b(41, 10)]),
            tg.d("sub", vec![tg.f("_reloc3", vec![b(42, 10)])]),
        ],
    ));
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![tg.d("_reloc0", vec![tg.f("left", vec![b(43, 10)])])]));

    let summary = sync(src.root(), dst.root(), &SyncOptions::new()).expect("sync");
    assert!(summary.removed().is_empty());
    assert_eq!(
        fs::read(dst.root().join("_relocate.txt")).expect("read"),
        generated_bytes(41, 10)
    );
    assert_eq!(
        fs::read(dst.root().join("sub/_reloc3")).expect("read"),
        generated_bytes(42, 10)
    );
    assert!(dst.root().join("_reloc0/left").is_file());

    let again = sync(src.root(), dst.root(), &SyncOptions::new()).expect("second sync");
    assert!(again.plan().is_noop());
}

#[test]
fn overlapping_roots_are_rejected() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.d("inner", vec![])]));

    let error = sync(src.root(), &src.root().join("inner"), &SyncOptions::new())
        .expect_err("nested destination");
    assert!(matches!(error, EngineError::OverlappingRoots { .. }), "{error}");
}

#[cfg(unix)]
#[test]
fn modes_follow_the_source() {
    use std::os::unix::fs::PermissionsExt;

    let tg = TreeGen::new();
    let src = test_tree(&tg.d("foo", vec![tg.d("dir", vec![tg.f("file", vec![b(50, 10)])])]));
    fs::set_permissions(src.root().join("dir/file"), fs::Permissions::from_mode(0o765))
        .expect("chmod file");
    fs::set_permissions(src.root().join("dir"), fs::Permissions::from_mode(0o711))
        .expect("chmod dir");
    let tg = TreeGen::new();
    let dst = test_tree(&tg.d("foo", vec![]));

    let summary = sync(src.root(), dst.root(), &SyncOptions::new()).expect("sync");
    let modes = summary.modes().expect("modes applied");
    assert_eq!(modes.files, 1);
    assert_eq!(modes.dirs, 2);

    let mode = |path: PathBuf| fs::metadata(path).expect("stat").permissions().mode() & 0o7777;
    assert_eq!(mode(dst.root().join("dir/file")), 0o765);
    assert_eq!(mode(dst.root().join("dir")), 0o711);
}
