//! Full command runs through `run_app`.

use clap::Parser;
use duppur::cli::Cli;
use duppur::error::ExitCode;
use duppur::index::codec;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// a/x.txt and b/x.txt share content, c/y.txt is unique.
fn setup_tree() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");
    for sub in ["a", "b", "c"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    fs::write(root.join("a/x.txt"), "same content").unwrap();
    fs::write(root.join("b/x.txt"), "same content").unwrap();
    fs::write(root.join("c/y.txt"), "other content").unwrap();
    (dir, root)
}

/// Empty config file so a user's own configuration does not leak in.
fn empty_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();
    path
}

fn run(config: &Path, args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec![
        "duppur".to_string(),
        "-q".to_string(),
        "--config".to_string(),
        config.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| (*a).to_string()));
    duppur::run_app(Cli::try_parse_from(argv).unwrap())
}

fn read_index(path: &Path) -> duppur::index::Index {
    codec::read(BufReader::new(File::open(path).unwrap())).unwrap()
}

fn s(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_index_writes_grouped_index() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let out = dir.path().join("data.idx");

    let code = run(&config, &["index", &s(&root), "-o", &s(&out)]).unwrap();

    assert_eq!(code, ExitCode::Success);
    let index = read_index(&out);
    assert_eq!(index.file_count(), 3);
    assert_eq!(index.len(), 2);
    assert!(index
        .iter()
        .any(|(_, paths)| paths.len() == 2 && paths.iter().all(|p| p.ends_with("x.txt"))));
}

#[test]
fn test_index_sorted_by_path() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let out = dir.path().join("data.idx");

    run(&config, &["index", &s(&root), "-s", "2", "-o", &s(&out)]).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let paths: Vec<&str> = text
        .lines()
        .map(|l| codec::parse_line(l).unwrap().1)
        .collect();
    let mut sorted = paths.clone();
    sorted.sort_unstable();
    assert_eq!(paths, sorted);
    assert!(paths[0].ends_with("a/x.txt"));
}

#[test]
fn test_index_requires_duplicates_or_output() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);

    let err = run(&config, &["index", &s(&root)]).unwrap_err();

    assert!(err.to_string().contains("-d"));
}

#[test]
fn test_index_refuses_existing_output() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let out = dir.path().join("data.idx");
    fs::write(&out, "keep me").unwrap();

    assert!(run(&config, &["index", &s(&root), "-o", &s(&out)]).is_err());
    assert_eq!(fs::read_to_string(&out).unwrap(), "keep me");
}

#[test]
fn test_index_rejects_relative_root() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let out = dir.path().join("out.idx");

    let err = run(&config, &["index", "relative/dir", "-o", &s(&out)]).unwrap_err();

    assert!(format!("{err:#}").contains("must be absolute"));
    assert!(!out.exists());
}

#[test]
fn test_failed_runs_leave_no_output_behind() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let missing = dir.path().join("missing.idx");
    let malformed = dir.path().join("bad.idx");
    fs::write(&malformed, "no separator\n").unwrap();
    let out = dir.path().join("out.idx");

    assert!(run(&config, &["check", &s(&missing), "-o", &s(&out)]).is_err());
    assert!(run(&config, &["update", &s(&malformed), "-o", &s(&out)]).is_err());
    assert!(run(
        &config,
        &["purge-list", &s(&missing), &s(&malformed), "-o", &s(&out)]
    )
    .is_err());
    assert!(!out.exists());

    let code = run(&config, &["index", &s(&root), "-o", &s(&out)]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(read_index(&out).file_count(), 3);
}

#[test]
fn test_index_duplicate_check_succeeds() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);

    let code = run(&config, &["index", &s(&root), "-d", "-n"]).unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_index_honours_exclusions() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let out = dir.path().join("data.idx");

    run(
        &config,
        &["index", &s(&root), "-e", ".*/c/.*", "-o", &s(&out)],
    )
    .unwrap();

    let index = read_index(&out);
    assert_eq!(index.file_count(), 2);
    assert!(index.pairs().all(|(_, p)| !p.contains("/c/")));
}

#[test]
fn test_check_reports_changed_file() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let stored = dir.path().join("data.idx");
    let verified = dir.path().join("verified.idx");
    run(&config, &["index", &s(&root), "-o", &s(&stored)]).unwrap();

    fs::write(root.join("b/x.txt"), "tampered").unwrap();
    let code = run(&config, &["check", &s(&stored), "-o", &s(&verified)]).unwrap();

    assert_eq!(code, ExitCode::IntegrityFailure);
    let index = read_index(&verified);
    assert_eq!(index.file_count(), 2);
    assert!(index.pairs().all(|(_, p)| !p.ends_with("b/x.txt")));
}

#[test]
fn test_check_unchanged_tree_succeeds() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let stored = dir.path().join("data.idx");
    run(&config, &["index", &s(&root), "-o", &s(&stored)]).unwrap();

    let code = run(&config, &["check", &s(&stored), "-d"]).unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_check_rejects_malformed_index() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let stored = dir.path().join("bad.idx");
    fs::write(&stored, "no separator here\n").unwrap();

    let err = run(&config, &["check", &s(&stored), "-d"]).unwrap_err();

    assert!(format!("{err:#}").contains("line 1"));
}

#[test]
fn test_update_replaces_index_in_place() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let stored = dir.path().join("data.idx");
    run(&config, &["index", &s(&root), "-o", &s(&stored)]).unwrap();

    fs::remove_file(root.join("c/y.txt")).unwrap();
    let code = run(&config, &["update", &s(&stored)]).unwrap();

    assert_eq!(code, ExitCode::Success);
    let index = read_index(&stored);
    assert_eq!(index.file_count(), 2);
    assert_eq!(index.len(), 1);
    assert!(!dir.path().join("data.idx.new").exists());
}

#[test]
fn test_update_to_separate_output_keeps_original() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);
    let stored = dir.path().join("data.idx");
    let pruned = dir.path().join("pruned.idx");
    run(&config, &["index", &s(&root), "-o", &s(&stored)]).unwrap();

    fs::remove_file(root.join("a/x.txt")).unwrap();
    run(&config, &["update", &s(&stored), "-o", &s(&pruned)]).unwrap();

    assert_eq!(read_index(&stored).file_count(), 3);
    assert_eq!(read_index(&pruned).file_count(), 2);
}

#[test]
fn test_purge_list_files() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let primary = dir.path().join("primary");
    let purgatory = dir.path().join("purgatory");
    fs::create_dir_all(&primary).unwrap();
    fs::create_dir_all(&purgatory).unwrap();
    fs::write(primary.join("x.txt"), "shared").unwrap();
    fs::write(purgatory.join("x.txt"), "shared").unwrap();
    fs::write(purgatory.join("y.txt"), "unique").unwrap();

    let primary_idx = dir.path().join("primary.idx");
    let purgatory_idx = dir.path().join("purgatory.idx");
    let list = dir.path().join("purge.txt");
    run(&config, &["index", &s(&primary), "-o", &s(&primary_idx)]).unwrap();
    run(&config, &["index", &s(&purgatory), "-o", &s(&purgatory_idx)]).unwrap();

    let code = run(
        &config,
        &[
            "purge-list",
            &s(&primary_idx),
            &s(&purgatory_idx),
            "-n",
            "-o",
            &s(&list),
        ],
    )
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let expected = format!("(file) {}\n", purgatory.join("x.txt").display());
    assert_eq!(fs::read_to_string(&list).unwrap(), expected);
}

#[test]
fn test_purge_list_mirrored_directory() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);
    let primary = dir.path().join("primary/photos");
    let purgatory = dir.path().join("purgatory/photos");
    for tree in [&primary, &purgatory] {
        fs::create_dir_all(tree).unwrap();
        fs::write(tree.join("one.jpg"), "first").unwrap();
        fs::write(tree.join("two.jpg"), "second").unwrap();
    }

    let primary_idx = dir.path().join("primary.idx");
    let purgatory_idx = dir.path().join("purgatory.idx");
    let list = dir.path().join("purge.txt");
    run(&config, &["index", &s(&primary), "-o", &s(&primary_idx)]).unwrap();
    run(&config, &["index", &s(&purgatory), "-o", &s(&purgatory_idx)]).unwrap();

    run(
        &config,
        &[
            "purge-list",
            &s(&primary_idx),
            &s(&purgatory_idx),
            "-n",
            "-o",
            &s(&list),
        ],
    )
    .unwrap();

    let expected = format!("(directory) {}\n", purgatory.display());
    assert_eq!(fs::read_to_string(&list).unwrap(), expected);
}

#[test]
fn test_purge_list_requires_absolute_indexes() {
    let dir = TempDir::new().unwrap();
    let config = empty_config(&dir);

    let err = run(&config, &["purge-list", "a.idx", "b.idx"]).unwrap_err();

    assert!(err.to_string().contains("must be absolute"));
}

#[test]
fn test_invalid_hash_function_is_fatal() {
    let (dir, root) = setup_tree();
    let config = empty_config(&dir);

    let err = run(&config, &["index", &s(&root), "-d", "-@", "crc32"]).unwrap_err();

    assert!(format!("{err:#}").to_lowercase().contains("crc32"));
}

#[test]
fn test_missing_config_file_is_fatal() {
    let (dir, root) = setup_tree();
    let missing = dir.path().join("missing.toml");

    let err = run(&missing, &["index", &s(&root), "-d"]).unwrap_err();

    assert!(err.to_string().contains("not found"));
}
