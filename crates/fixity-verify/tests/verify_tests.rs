//! Integration tests for fixity-verify.

use std::fs;
use std::path::Path;

use fixity_core::SnapshotLoadError;
use fixity_verify::{AuditConfig, AuditError, Auditor, HashAlgorithm, check, save};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn config(temp: &TempDir, algorithm: HashAlgorithm) -> AuditConfig {
    let root = temp.path().join("tree");
    fs::create_dir_all(&root).unwrap();
    AuditConfig::builder()
        .root(root)
        .snapshot_path(temp.path().join("baseline.csv"))
        .algorithm(algorithm)
        .batch_size(3usize)
        .workers(2usize)
        .build()
        .unwrap()
}

fn names<T: ToString>(list: &[T]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[test]
fn test_check_right_after_save_is_clean() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);
    for i in 0..10 {
        write(&config.root, &format!("d{}/f{i}.txt", i % 4), &format!("body {i}"));
    }

    let saved = save(&config).unwrap();
    assert_eq!(saved.files_written, 10);
    assert_eq!(saved.folders, 4);
    assert!(saved.failures.is_empty());

    let outcome = check(&config).unwrap();
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.baseline_entries, 10);
    assert_eq!(outcome.files_hashed, 10);
}

#[test]
fn test_modified_added_and_kept_files() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);
    write(&config.root, "a.txt", "alpha");
    write(&config.root, "b.txt", "bravo");
    save(&config).unwrap();

    write(&config.root, "b.txt", "bravo, edited");
    write(&config.root, "c.txt", "charlie");

    let report = check(&config).unwrap().report;
    assert_eq!(names(&report.corrupt), vec!["b.txt"]);
    assert_eq!(names(&report.new), vec!["c.txt"]);
    assert!(report.missing.is_empty());
    assert!(report.new_folders.is_empty());
    assert!(report.missing_folders.is_empty());
}

#[test]
fn test_removed_folder_reports_files_and_folder() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Blake3);
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        write(&config.root, &format!("archive/2020/{name}"), name);
    }
    write(&config.root, "archive/index.txt", "index");
    save(&config).unwrap();

    fs::remove_dir_all(config.root.join("archive/2020")).unwrap();

    let report = check(&config).unwrap().report;
    assert_eq!(
        names(&report.missing),
        vec!["archive/2020/a.pdf", "archive/2020/b.pdf", "archive/2020/c.pdf"]
    );
    assert_eq!(names(&report.missing_folders), vec!["archive/2020"]);
    assert!(report.corrupt.is_empty());
    assert!(report.new.is_empty());
}

#[test]
fn test_new_folder_detected() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);
    write(&config.root, "keep.txt", "keep");
    save(&config).unwrap();

    write(&config.root, "photos/2024/img.jpg", "jpeg");

    let report = check(&config).unwrap().report;
    assert_eq!(names(&report.new), vec!["photos/2024/img.jpg"]);
    assert_eq!(names(&report.new_folders), vec!["photos/2024"]);
}

#[test]
fn test_empty_root_round_trip() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);

    let saved = save(&config).unwrap();
    assert_eq!(saved.files_written, 0);
    assert_eq!(
        fs::read_to_string(&config.snapshot_path).unwrap(),
        "path,digest\n"
    );

    let outcome = check(&config).unwrap();
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.files_found, 0);
}

#[test]
fn test_resave_drops_deleted_files() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);
    write(&config.root, "old.txt", "old");
    write(&config.root, "stay.txt", "stay");
    save(&config).unwrap();

    fs::remove_file(config.root.join("old.txt")).unwrap();
    let saved = save(&config).unwrap();
    assert_eq!(saved.files_written, 1);

    let content = fs::read_to_string(&config.snapshot_path).unwrap();
    assert!(!content.contains("old.txt"));
    assert!(check(&config).unwrap().report.is_clean());
}

#[test]
fn test_snapshot_inside_root_is_not_hashed() {
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp, HashAlgorithm::Sha256);
    config.snapshot_path = config.root.join("fixity.csv");
    write(&config.root, "data.bin", "data");

    assert_eq!(save(&config).unwrap().files_written, 1);

    // The snapshot changed on disk since the save, but it is never compared
    let outcome = check(&config).unwrap();
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.files_found, 1);
}

#[test]
fn test_check_with_other_algorithm_fails() {
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp, HashAlgorithm::Sha256);
    write(&config.root, "a.txt", "alpha");
    save(&config).unwrap();

    config.algorithm = HashAlgorithm::Sha512;
    let result = check(&config);
    assert!(matches!(
        result,
        Err(AuditError::SnapshotLoad(SnapshotLoadError::AlgorithmMismatch { .. }))
    ));
}

#[test]
fn test_excluded_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    let mut config = config(&temp, HashAlgorithm::Sha256);
    config.exclude_patterns = vec!["*.tmp".to_string()];
    write(&config.root, "doc.txt", "doc");
    write(&config.root, "scratch.tmp", "one");
    save(&config).unwrap();

    write(&config.root, "scratch.tmp", "two");
    write(&config.root, "more.tmp", "three");

    let outcome = check(&config).unwrap();
    assert!(outcome.report.is_clean());
}

#[test]
fn test_legacy_snapshot_with_root_prefix_checks_clean() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);
    write(&config.root, "sub/a.txt", "hello\n");

    // Header-less rows carrying the root they were saved from
    let hello = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";
    let row_path = config.root.canonicalize().unwrap().join("sub").join("a.txt");
    fs::write(
        &config.snapshot_path,
        format!("{},{hello}\n", row_path.display()),
    )
    .unwrap();

    let report = check(&config).unwrap().report;
    assert!(report.is_clean(), "{report:?}");
}

#[test]
fn test_legacy_md5_snapshot() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Md5);
    write(&config.root, "a.txt", "hello\n");
    write(&config.root, "b.txt", "changed");

    fs::write(
        &config.snapshot_path,
        "a.txt,b1946ac92492d2347c6235b4d2611184\nb.txt,d41d8cd98f00b204e9800998ecf8427e\n",
    )
    .unwrap();

    let report = check(&config).unwrap().report;
    assert_eq!(names(&report.corrupt), vec!["b.txt"]);
    assert!(report.new.is_empty());
    assert!(report.missing.is_empty());
}

#[test]
fn test_cancelled_check_is_interrupted() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, HashAlgorithm::Sha256);
    write(&config.root, "a.txt", "alpha");
    save(&config).unwrap();

    let auditor = Auditor::new(config).unwrap();
    auditor
        .cancel_handle()
        .store(true, std::sync::atomic::Ordering::Relaxed);
    assert!(matches!(auditor.check(), Err(AuditError::Interrupted)));
}
