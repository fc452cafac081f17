use std::ffi::OsString;
use std::fs;
use std::path::Path;

use checksums::{BLOCK_SIZE, strong_checksum, weak_checksum};
use matching::{MatchError, Matcher, RangePair, match_file};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_support::{TreeGen, b, generated_bytes, test_tree, write_runs};
use tree::{DirInfo, NodeId, Tree, index_file};

fn source_tree(path: &Path) -> (Tree, NodeId) {
    let (info, blocks) = index_file(path).expect("index source");
    let mut tree = Tree::new(DirInfo {
        name: OsString::from("src"),
        mode: 0o755,
    });
    let root = tree.root();
    let file = tree.add_file(root, info, blocks).expect("add file");
    (tree, file)
}

#[test]
fn identical_file_matches_every_block_in_place() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.f("bar", vec![b(42, 65537)]));
    let dst = test_tree(&tg.f("bar", vec![b(42, 65537)]));
    let (tree, file) = source_tree(src.root());

    let result = match_file(&tree, file, dst.root()).expect("match");
    assert_eq!(result.block_matches.len(), 9);
    assert_eq!(result.src_size, 65537);
    assert_eq!(result.dst_size, 65537);
    for m in &result.block_matches {
        assert_eq!(m.dst_offset % BLOCK_SIZE as u64, 0);
        assert_eq!(m.dst_offset, m.src_offset);
    }
    assert!(result.not_matched().is_empty());
}

#[test]
fn appended_source_leaves_tail_unmatched() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.f("bar", vec![b(42, 65537), b(43, 65537)]));
    let dst = test_tree(&tg.f("bar", vec![b(42, 65537)]));
    let (tree, file) = source_tree(src.root());
    assert_eq!(tree.file(file).expect("file").blocks().len(), 17);

    let result = match_file(&tree, file, dst.root()).expect("match");
    assert_eq!(result.block_matches.len(), 8);
    assert_eq!(
        result.not_matched(),
        vec![RangePair {
            from: 65536,
            to: 65537 + 65537
        }]
    );
}

#[test]
fn truncated_source_needs_only_its_last_byte() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.f("bar", vec![b(42, 65537)]));
    let dst = test_tree(&tg.f("bar", vec![b(42, 65537), b(43, 65537)]));
    let (tree, file) = source_tree(src.root());

    let result = match_file(&tree, file, dst.root()).expect("match");
    assert_eq!(result.block_matches.len(), 8);
    assert_eq!(result.dst_size, 131_074);
    let gaps = result.not_matched();
    assert_eq!(gaps, vec![RangePair { from: 65536, to: 65537 }]);
    assert_eq!(gaps[0].len(), 1);
}

#[test]
fn shifted_content_is_found_unaligned() {
    let temp = tempfile::tempdir().expect("tempdir");
    let src_path = temp.path().join("src");
    let dst_path = temp.path().join("dst");
    write_runs(&src_path, &[b(42, 3 * BLOCK_SIZE as u64)]).expect("src");
    write_runs(&dst_path, &[b(7, 100), b(42, 3 * BLOCK_SIZE as u64)]).expect("dst");
    let (tree, file) = source_tree(&src_path);

    let result = match_file(&tree, file, &dst_path).expect("match");
    let offsets: Vec<_> = result
        .block_matches
        .iter()
        .map(|m| (m.src_offset, m.dst_offset))
        .collect();
    assert_eq!(offsets, vec![(0, 100), (8192, 8292), (16384, 16484)]);
    assert!(result.not_matched().is_empty());
}

#[test]
fn weak_collision_never_matches() {
    let mut rng = StdRng::seed_from_u64(11);
    let original: Vec<u8> = (0..BLOCK_SIZE).map(|_| rng.gen_range(16..240)).collect();
    let mut forged = original.clone();
    forged[10] += 1;
    forged[11] -= 1;
    forged[100] -= 1;
    forged[101] += 1;
    assert_eq!(weak_checksum(&original), weak_checksum(&forged));
    assert_ne!(strong_checksum(&original), strong_checksum(&forged));

    let temp = tempfile::tempdir().expect("tempdir");
    let src_path = temp.path().join("src");
    let dst_path = temp.path().join("dst");
    fs::write(&src_path, &original).expect("src");
    fs::write(&dst_path, &forged).expect("dst");
    let (tree, file) = source_tree(&src_path);

    let result = match_file(&tree, file, &dst_path).expect("match");
    assert!(result.block_matches.is_empty());
    assert_eq!(
        result.not_matched(),
        vec![RangePair {
            from: 0,
            to: BLOCK_SIZE as u64
        }]
    );
}

#[test]
fn repeated_source_blocks_all_match_one_window() {
    let block = generated_bytes(3, BLOCK_SIZE as u64);
    let temp = tempfile::tempdir().expect("tempdir");
    let src_path = temp.path().join("src");
    let dst_path = temp.path().join("dst");
    fs::write(&src_path, [block.as_slice(), block.as_slice()].concat()).expect("src");
    fs::write(&dst_path, &block).expect("dst");
    let (tree, file) = source_tree(&src_path);

    let result = match_file(&tree, file, &dst_path).expect("match");
    let mut src_offsets: Vec<_> = result.block_matches.iter().map(|m| m.src_offset).collect();
    src_offsets.sort_unstable();
    assert_eq!(src_offsets, vec![0, 8192]);
    assert!(result.block_matches.iter().all(|m| m.dst_offset == 0));
    assert!(result.not_matched().is_empty());
}

#[test]
fn empty_destination_matches_nothing() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.f("bar", vec![b(1, 5000)]));
    let (tree, file) = source_tree(src.root());
    let result = Matcher::for_file(&tree, file)
        .expect("matcher")
        .match_reader(std::io::empty())
        .expect("match");
    assert_eq!(result.dst_size, 0);
    assert_eq!(result.not_matched(), vec![RangePair { from: 0, to: 5000 }]);
}

#[test]
fn destination_must_be_a_regular_file() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.f("bar", vec![b(1, 10)]));
    let (tree, file) = source_tree(src.root());
    let temp = tempfile::tempdir().expect("tempdir");
    let error = match_file(&tree, file, temp.path()).expect_err("directory");
    assert!(matches!(error, MatchError::NotRegularFile(_)));

    let missing = temp.path().join("missing");
    let error = match_file(&tree, file, &missing).expect_err("missing");
    assert!(error.to_string().starts_with("failed to inspect"));
}

#[test]
fn matcher_requires_a_file_node() {
    let tg = TreeGen::new();
    let src = test_tree(&tg.f("bar", vec![b(1, 10)]));
    let (tree, _) = source_tree(src.root());
    assert!(matches!(
        Matcher::for_file(&tree, tree.root()),
        Err(MatchError::SourceNotFile)
    ));
}
