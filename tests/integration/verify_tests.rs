use duppur::index::{ContentIndexer, Index, IndexerConfig};
use duppur::progress::{Phase, ProgressMonitor};
use duppur::scanner::{Crawler, ExclusionSet, HashAlgorithm};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("docs/old")).unwrap();
    fs::write(dir.path().join("docs/report.txt"), "quarterly numbers").unwrap();
    fs::write(dir.path().join("docs/old/report.txt"), "quarterly numbers").unwrap();
    fs::write(dir.path().join("docs/notes.md"), "# notes").unwrap();
    dir
}

fn index_tree(root: &Path, config: IndexerConfig) -> Index {
    let exclusions = ExclusionSet::empty();
    let monitor = ProgressMonitor::silent();
    let files = Crawler::new(&exclusions, &monitor).list(root).unwrap();
    ContentIndexer::new(config, &exclusions, &monitor)
        .build_index(&files)
        .unwrap()
}

fn stored_pairs(index: &Index) -> Vec<(String, String)> {
    index
        .pairs()
        .map(|(h, p)| (h.to_string(), p.to_string()))
        .collect()
}

#[test]
fn test_parallel_and_sequential_agree() {
    let dir = setup_tree();

    let sequential = index_tree(dir.path(), IndexerConfig::default());
    let parallel = index_tree(dir.path(), IndexerConfig::default().with_parallel(true));

    assert_eq!(sequential.pair_set(), parallel.pair_set());
    assert_eq!(sequential.file_count(), 3);
    assert_eq!(sequential.len(), 2);
}

#[test]
fn test_algorithm_determines_hash_length() {
    let dir = setup_tree();
    for algorithm in HashAlgorithm::ALL {
        let index = index_tree(dir.path(), IndexerConfig::default().with_algorithm(algorithm));
        assert!(index.iter().all(|(hash, _)| hash.len() == algorithm.hex_len()));
    }
}

#[test]
fn test_verify_unchanged_tree() {
    let dir = setup_tree();
    let index = index_tree(dir.path(), IndexerConfig::default());
    let exclusions = ExclusionSet::empty();
    let monitor = ProgressMonitor::silent();

    let verification = ContentIndexer::new(IndexerConfig::default(), &exclusions, &monitor)
        .verify(stored_pairs(&index))
        .unwrap();

    assert_eq!(verification.ok, 3);
    assert_eq!(verification.failed, 0);
    assert_eq!(verification.skipped, 0);
    assert_eq!(verification.index, index);
    assert_eq!(monitor.phase(), Phase::Stopped);
}

#[test]
fn test_verify_ignores_hash_case() {
    let dir = setup_tree();
    let index = index_tree(dir.path(), IndexerConfig::default());
    let upper: Vec<(String, String)> = stored_pairs(&index)
        .into_iter()
        .map(|(h, p)| (h.to_uppercase(), p))
        .collect();
    let exclusions = ExclusionSet::empty();
    let monitor = ProgressMonitor::silent();

    let verification = ContentIndexer::new(IndexerConfig::default(), &exclusions, &monitor)
        .verify(upper)
        .unwrap();

    assert_eq!(verification.ok, 3);
    assert_eq!(verification.index, index);
}

#[test]
fn test_verify_changed_and_missing_files() {
    let dir = setup_tree();
    let index = index_tree(dir.path(), IndexerConfig::default());
    fs::write(dir.path().join("docs/notes.md"), "# rewritten").unwrap();
    fs::remove_file(dir.path().join("docs/old/report.txt")).unwrap();
    let exclusions = ExclusionSet::empty();
    let monitor = ProgressMonitor::silent();

    let verification = ContentIndexer::new(IndexerConfig::default(), &exclusions, &monitor)
        .verify(stored_pairs(&index))
        .unwrap();

    assert_eq!(verification.ok, 1);
    assert_eq!(verification.failed, 1);
    assert_eq!(verification.skipped, 1);
    assert_eq!(verification.index.file_count(), 1);
    assert!(verification
        .index
        .pairs()
        .all(|(_, p)| p.ends_with("docs/report.txt")));
}

#[test]
fn test_verify_drops_excluded_entries() {
    let dir = setup_tree();
    let index = index_tree(dir.path(), IndexerConfig::default());
    let exclusions = ExclusionSet::new([".*\\.md"]).unwrap();
    let monitor = ProgressMonitor::silent();

    let verification = ContentIndexer::new(IndexerConfig::default(), &exclusions, &monitor)
        .verify(stored_pairs(&index))
        .unwrap();

    assert_eq!(verification.ok, 2);
    assert_eq!(verification.skipped, 0);
    assert!(verification.index.pairs().all(|(_, p)| !p.ends_with(".md")));
}

#[test]
fn test_prune_missing_keeps_hashes() {
    let dir = setup_tree();
    let index = index_tree(dir.path(), IndexerConfig::default());
    fs::remove_file(dir.path().join("docs/notes.md")).unwrap();
    let exclusions = ExclusionSet::empty();
    let monitor = ProgressMonitor::silent();

    let pruned = ContentIndexer::new(IndexerConfig::default(), &exclusions, &monitor)
        .prune_missing(index.clone());

    assert_eq!(pruned.kept, 2);
    assert_eq!(pruned.removed, 1);
    let mut expected = index;
    expected.retain(|_, p| !p.ends_with("notes.md"));
    assert_eq!(pruned.index, expected);
}
