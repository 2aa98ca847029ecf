use duppur::duplicates::{DuplicateEngine, DIRECTORY_LABEL, FILE_LABEL};
use duppur::index::Index;
use duppur::scanner::{normalize_path, ExclusionSet, HashAlgorithm};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, content: &str) -> String {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    normalize_path(path)
}

fn index_of<S: AsRef<str>>(paths: &[S]) -> Index {
    paths
        .iter()
        .map(|p| {
            let hash = HashAlgorithm::default()
                .hash_file(Path::new(p.as_ref()))
                .unwrap();
            (hash, p.as_ref())
        })
        .collect()
}

struct Trees {
    _dir: TempDir,
    primary: PathBuf,
    purgatory: PathBuf,
}

fn trees() -> Trees {
    let dir = TempDir::new().unwrap();
    Trees {
        primary: dir.path().join("primary"),
        purgatory: dir.path().join("purgatory"),
        _dir: dir,
    }
}

#[test]
fn test_unique_files_never_listed() {
    let t = trees();
    let kept = write(&t.primary.join("a.txt"), "alpha");
    let unique = write(&t.purgatory.join("b.txt"), "beta");

    let exclusions = ExclusionSet::empty();
    let list = DuplicateEngine::new(&exclusions)
        .purge_list(&index_of(&[&kept]), &index_of(&[&unique]));

    assert!(list.is_empty());
}

#[test]
fn test_every_extra_copy_listed() {
    let t = trees();
    let kept = write(&t.primary.join("a.txt"), "alpha");
    let copy1 = write(&t.purgatory.join("one/a.txt"), "alpha");
    let copy2 = write(&t.purgatory.join("two/renamed.txt"), "alpha");

    let exclusions = ExclusionSet::empty();
    let list = DuplicateEngine::new(&exclusions)
        .purge_list(&index_of(&[&kept]), &index_of(&[&copy1, &copy2]));

    let expected: Vec<String> = vec![format!("{FILE_LABEL}{copy1}"), format!("{FILE_LABEL}{copy2}")];
    assert_eq!(list.into_iter().collect::<Vec<_>>(), expected);
}

#[test]
fn test_forged_hash_reported_as_collision() {
    let t = trees();
    let kept = write(&t.primary.join("a.txt"), "alpha");
    let other = write(&t.purgatory.join("a.txt"), "not alpha");
    let primary: Index = [("cafe", kept.as_str())].into_iter().collect();
    let purgatory: Index = [("cafe", other.as_str())].into_iter().collect();

    let exclusions = ExclusionSet::empty();
    let outcome = DuplicateEngine::new(&exclusions).diff(&primary, &purgatory);

    assert!(outcome.files.is_empty());
    assert_eq!(outcome.collisions.len(), 1);
    assert_eq!(outcome.collisions[0].candidate, other);
    assert!(outcome.purge_candidates().is_empty());
}

#[test]
fn test_mirrored_directory_consolidated() {
    let t = trees();
    let mut primary = Vec::new();
    let mut purgatory = Vec::new();
    for name in ["x.txt", "y.txt"] {
        primary.push(write(&t.primary.join("set").join(name), name));
        purgatory.push(write(&t.purgatory.join("set").join(name), name));
    }

    let exclusions = ExclusionSet::empty();
    let outcome = DuplicateEngine::new(&exclusions)
        .with_consolidation(true)
        .diff(&index_of(&primary), &index_of(&purgatory));

    assert_eq!(outcome.directories.len(), 1);
    assert_eq!(
        outcome.directories[0].redundant,
        normalize_path(&t.purgatory.join("set"))
    );
    assert!(outcome.files.is_empty());
    let list = outcome.purge_candidates();
    assert_eq!(list.len(), 1);
    assert!(list.iter().all(|l| l.starts_with(DIRECTORY_LABEL)));
}

#[test]
fn test_partial_mirror_stays_file_level() {
    let t = trees();
    let kept = write(&t.primary.join("set/x.txt"), "x");
    let copy = write(&t.purgatory.join("set/x.txt"), "x");
    write(&t.purgatory.join("set/extra.txt"), "extra");

    let exclusions = ExclusionSet::empty();
    let outcome = DuplicateEngine::new(&exclusions)
        .with_consolidation(true)
        .diff(&index_of(&[&kept]), &index_of(&[&copy]));

    assert!(outcome.directories.is_empty());
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.files[0].redundant, copy);
}

#[test]
fn test_excluded_copy_not_kept_within_one_index() {
    let t = trees();
    let archived = write(&t.primary.join("archive/a.txt"), "alpha");
    let current = write(&t.primary.join("current/a.txt"), "alpha");
    let index = index_of(&[&archived, &current]);

    let exclusions = ExclusionSet::new([".*/archive/.*"]).unwrap();
    let outcome = DuplicateEngine::new(&exclusions).find_duplicates(&index);

    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.files[0].kept, current);
    assert_eq!(outcome.files[0].redundant, archived);
}

#[test]
fn test_same_index_pairs_are_distinct() {
    let t = trees();
    let a = write(&t.primary.join("a.txt"), "dup");
    let b = write(&t.primary.join("b.txt"), "dup");
    let c = write(&t.primary.join("c.txt"), "dup");
    let index = index_of(&[&a, &b, &c]);

    let exclusions = ExclusionSet::empty();
    let outcome = DuplicateEngine::new(&exclusions).find_duplicates(&index);

    assert_eq!(outcome.files.len(), 2);
    assert!(outcome.files.iter().all(|p| p.kept == a && p.redundant != a));
}
