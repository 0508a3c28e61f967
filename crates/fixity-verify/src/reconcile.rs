//! Baseline reconciliation.

use std::collections::{BTreeSet, HashMap};

use fixity_core::{Digest, FilePath, FolderSet, ReconciliationReport, Snapshot};

/// Classify the differences between a fresh walk and a baseline.
///
/// - a baseline path that is still present is `corrupt` when its fresh
///   digest differs, and `unverified` when there is no fresh digest;
/// - a baseline path that is gone is `missing`;
/// - a current path the baseline does not know is `new`.
///
/// Folder changes compare the parent folders of both path sets. Paths whose
/// digest matches appear nowhere in the report.
pub fn reconcile<'a>(
    current: impl IntoIterator<Item = &'a FilePath>,
    baseline: &Snapshot,
    fresh: &HashMap<FilePath, Digest>,
) -> ReconciliationReport {
    let current: BTreeSet<&FilePath> = current.into_iter().collect();
    let mut report = ReconciliationReport::default();

    for (path, stored) in baseline.iter() {
        if !current.contains(path) {
            report.missing.push(path.clone());
            continue;
        }
        match fresh.get(path) {
            Some(digest) if digest == stored => {}
            Some(_) => report.corrupt.push(path.clone()),
            None => report.unverified.push(path.clone()),
        }
    }

    report.new = current
        .iter()
        .filter(|path| !baseline.contains(path))
        .map(|path| (*path).clone())
        .collect();

    let current_folders: FolderSet = current.iter().map(|path| path.parent()).collect();
    let baseline_folders = baseline.folders();
    report.new_folders = current_folders.difference(&baseline_folders);
    report.missing_folders = baseline_folders.difference(&current_folders);

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(byte: u8) -> Digest {
        Digest::new(vec![byte; 4])
    }

    fn paths(names: &[&str]) -> Vec<FilePath> {
        names.iter().map(|n| FilePath::new(n)).collect()
    }

    fn names(list: &[FilePath]) -> Vec<&str> {
        list.iter().map(FilePath::as_str).collect()
    }

    #[test]
    fn test_corrupt_new_and_clean() {
        let baseline: Snapshot = [
            (FilePath::new("a.txt"), digest(1)),
            (FilePath::new("b.txt"), digest(2)),
        ]
        .into_iter()
        .collect();
        let current = paths(&["a.txt", "b.txt", "c.txt"]);
        let fresh: HashMap<_, _> = [
            (FilePath::new("a.txt"), digest(1)),
            (FilePath::new("b.txt"), digest(3)),
        ]
        .into_iter()
        .collect();

        let report = reconcile(&current, &baseline, &fresh);

        assert_eq!(names(&report.corrupt), vec!["b.txt"]);
        assert_eq!(names(&report.new), vec!["c.txt"]);
        assert!(report.missing.is_empty());
        assert!(report.unverified.is_empty());
        assert!(report.new_folders.is_empty());
        assert!(report.missing_folders.is_empty());
    }

    #[test]
    fn test_removed_folder() {
        let baseline: Snapshot = [
            "archive/2020/a.pdf",
            "archive/2020/b.pdf",
            "archive/2020/c.pdf",
            "keep.txt",
        ]
        .into_iter()
        .map(|p| (FilePath::new(p), digest(5)))
        .collect();
        let current = paths(&["keep.txt"]);
        let fresh: HashMap<_, _> = [(FilePath::new("keep.txt"), digest(5))].into_iter().collect();

        let report = reconcile(&current, &baseline, &fresh);

        assert_eq!(
            names(&report.missing),
            vec!["archive/2020/a.pdf", "archive/2020/b.pdf", "archive/2020/c.pdf"]
        );
        assert!(report.corrupt.is_empty());
        assert!(report.new.is_empty());
        assert_eq!(report.missing_folders.len(), 1);
        assert_eq!(report.missing_folders[0].as_str(), "archive/2020");
        assert!(report.new_folders.is_empty());
    }

    #[test]
    fn test_new_folder() {
        let baseline: Snapshot = [(FilePath::new("a.txt"), digest(1))].into_iter().collect();
        let current = paths(&["a.txt", "photos/x.jpg"]);
        let fresh: HashMap<_, _> = [(FilePath::new("a.txt"), digest(1))].into_iter().collect();

        let report = reconcile(&current, &baseline, &fresh);

        assert_eq!(names(&report.new), vec!["photos/x.jpg"]);
        assert_eq!(report.new_folders.len(), 1);
        assert_eq!(report.new_folders[0].as_str(), "photos");
    }

    #[test]
    fn test_empty_baseline_reports_everything_new() {
        let current = paths(&["x/1", "y/2"]);
        let report = reconcile(&current, &Snapshot::new(), &HashMap::new());

        assert_eq!(names(&report.new), vec!["x/1", "y/2"]);
        assert!(report.corrupt.is_empty());
        assert!(report.missing.is_empty());
        assert_eq!(report.new_folders.len(), 2);
    }

    #[test]
    fn test_empty_tree_reports_everything_missing() {
        let baseline: Snapshot = ["a", "b/c"]
            .into_iter()
            .map(|p| (FilePath::new(p), digest(0)))
            .collect();

        let report = reconcile(std::iter::empty(), &baseline, &HashMap::new());

        assert_eq!(names(&report.missing), vec!["a", "b/c"]);
        assert!(report.corrupt.is_empty());
        assert!(report.new.is_empty());
        assert_eq!(report.missing_folders.len(), 2);
    }

    #[test]
    fn test_both_empty() {
        let report = reconcile(std::iter::empty(), &Snapshot::new(), &HashMap::new());
        assert!(report.is_clean());
    }

    #[test]
    fn test_unhashed_file_is_unverified_not_corrupt() {
        let baseline: Snapshot = [(FilePath::new("locked.db"), digest(1))].into_iter().collect();
        let current = paths(&["locked.db"]);

        let report = reconcile(&current, &baseline, &HashMap::new());

        assert_eq!(names(&report.unverified), vec!["locked.db"]);
        assert!(report.corrupt.is_empty());
        assert!(report.missing.is_empty());
    }
}
