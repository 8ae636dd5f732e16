use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use treerings_analyze::{Analysis, analyze};
use treerings_ops::{BackupExecutor, BackupOutcome, BackupPlan, BackupResult, start_backup};
use treerings_scan::{JwalkScanner, ScanConfig, Tree};

fn workdir() -> TempDir {
    tempfile::Builder::new()
        .prefix("treerings-")
        .tempdir()
        .unwrap()
}

fn scan(root: &Path) -> Tree {
    JwalkScanner::new().scan(&ScanConfig::new(root)).unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn analyze_dirs(dirs: &[&TempDir]) -> Analysis {
    analyze(dirs.iter().map(|d| scan(d.path())).collect()).unwrap()
}

#[test]
fn test_conflicting_backups_get_numbered_names() {
    let base = workdir();
    let second = workdir();
    let third = workdir();
    write(base.path(), "docs/report.txt", "version one");
    write(second.path(), "docs/report.txt", "version two");
    write(third.path(), "docs/report.txt", "version three");

    let analysis = analyze_dirs(&[&base, &second, &third]);
    let outcomes = BackupExecutor::new().backup_missing(&analysis);

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(BackupOutcome::is_copied));

    let docs = base.path().join("docs");
    assert_eq!(fs::read_to_string(docs.join("report.txt")).unwrap(), "version one");
    assert_eq!(fs::read_to_string(docs.join("report-1.txt")).unwrap(), "version two");
    assert_eq!(fs::read_to_string(docs.join("report-2.txt")).unwrap(), "version three");
}

#[test]
fn test_backup_creates_parent_directories() {
    let base = workdir();
    let other = workdir();
    write(base.path(), "keep.txt", "keep");
    write(other.path(), "a/b/c/deep.bin", "deep");

    let analysis = analyze_dirs(&[&base, &other]);
    let outcomes = BackupExecutor::new().backup_missing(&analysis);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        fs::read_to_string(base.path().join("a/b/c/deep.bin")).unwrap(),
        "deep"
    );

    // The baseline now holds everything; a fresh analysis finds nothing missing
    assert!(analyze_dirs(&[&base, &other]).missing.is_empty());
}

#[test]
fn test_vanished_source_does_not_stop_backup() {
    let base = workdir();
    let other = workdir();
    write(other.path(), "gone.txt", "soon deleted");
    write(other.path(), "stays.txt", "still here");

    let analysis = analyze_dirs(&[&base, &other]);
    fs::remove_file(other.path().join("gone.txt")).unwrap();

    let outcomes = BackupExecutor::new().backup_missing(&analysis);

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes.iter().filter(|o| o.is_copied()).count(), 1);
    assert!(base.path().join("stays.txt").exists());
    assert!(!base.path().join("gone.txt").exists());
}

#[test]
fn test_plan_describes_jobs() {
    let base = workdir();
    let other = workdir();
    write(other.path(), "x/new.txt", "twelve bytes");

    let analysis = analyze_dirs(&[&base, &other]);
    let plan = BackupPlan::from_analysis(&analysis);
    let base_root = base.path().canonicalize().unwrap();
    let other_root = other.path().canonicalize().unwrap();

    assert_eq!(plan.baseline, base_root);
    assert_eq!(plan.len(), 1);
    let job = &plan.jobs[0];
    assert_eq!(job.relative, PathBuf::from("x/new.txt"));
    assert_eq!(job.source, other_root.join("x/new.txt"));
    assert_eq!(job.destination, base_root.join("x/new.txt"));
    assert_eq!(plan.total_bytes(), 12);

    // Planning alone copies nothing
    assert!(!job.destination.exists());
}

#[test]
fn test_baseline_only_plans_nothing() {
    let base = workdir();
    write(base.path(), "a", "a");

    let plan = BackupPlan::from_analysis(&analyze_dirs(&[&base]));
    assert!(plan.is_empty());
}

#[tokio::test]
async fn test_async_backup_reports_progress_and_completion() {
    let base = workdir();
    let other = workdir();
    write(other.path(), "one.txt", "1");
    write(other.path(), "two.txt", "22");

    let plan = BackupPlan::from_analysis(&analyze_dirs(&[&base, &other]));
    let mut rx = start_backup(plan);

    let mut progress_updates = 0;
    let mut items = Vec::new();
    let mut complete = None;
    while let Some(result) = rx.recv().await {
        match result {
            BackupResult::Progress(_) => progress_updates += 1,
            BackupResult::Item(outcome) => items.push(outcome),
            BackupResult::Complete(done) => complete = Some(done),
        }
    }

    let complete = complete.unwrap();
    assert_eq!(progress_updates, 2);
    assert_eq!(items.len(), 2);
    assert!(complete.is_success());
    assert_eq!(complete.succeeded, 2);
    assert_eq!(complete.bytes_processed, 3);
    assert!(base.path().join("one.txt").exists());
    assert!(base.path().join("two.txt").exists());
}

#[tokio::test]
async fn test_async_backup_of_empty_plan_completes() {
    let mut rx = start_backup(BackupPlan::default());

    match rx.recv().await {
        Some(BackupResult::Complete(done)) => {
            assert_eq!(done.succeeded, 0);
            assert_eq!(done.failed, 0);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());
}

#[cfg(unix)]
#[test]
fn test_file_behind_outside_link_is_located() {
    use std::os::unix::fs::symlink;

    let base = workdir();
    let other = workdir();
    let outside = workdir();
    write(outside.path(), "far.txt", "far away");
    symlink(outside.path(), other.path().join("portal")).unwrap();

    let analysis = analyze_dirs(&[&base, &other]);
    let plan = BackupPlan::from_analysis(&analysis);
    let far = outside.path().canonicalize().unwrap().join("far.txt");

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.jobs[0].source, far);
    assert!(plan.jobs[0].destination.starts_with(&plan.baseline));

    let outcomes = BackupExecutor::new().run(&plan);
    assert!(outcomes[0].is_copied());
    assert_eq!(
        fs::read_to_string(outcomes[0].destination().unwrap()).unwrap(),
        "far away"
    );
}
