//! `GitChangeSource` against throwaway git repositories.
//!
//! Tests return early when no `git` binary is available.

use std::fs;
use std::path::Path;
use std::process::Command;

use ctxforge_core::RevisionId;
use ctxforge_vcs::{BaseRevision, ChangeSource, GitChangeSource, ReferenceStore, VcsError};
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=ctxforge",
            "-c",
            "user.email=ctxforge@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn commit_all(root: &Path, message: &str) -> RevisionId {
    git(root, &["add", "-A"]);
    git(root, &["commit", "-q", "-m", message]);
    RevisionId::from(git(root, &["rev-parse", "HEAD"]))
}

fn init_repo() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    git(dir.path(), &["init", "-q"]);
    dir
}

#[tokio::test]
async fn single_commit_without_reference_reports_everything_added() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    write(repo.path(), "generators/a.ts", "a");
    write(repo.path(), "generators/b.ts", "b");
    write(repo.path(), "services/c.ts", "c");
    let head = commit_all(repo.path(), "initial");

    let source = GitChangeSource::new(repo.path());
    let changes = source.changes_since(None).await.expect("changes");

    assert_eq!(changes.base, BaseRevision::Root);
    assert_eq!(changes.head, head);
    assert_eq!(
        changes.set.added,
        ["generators/a.ts", "generators/b.ts", "services/c.ts"]
    );
    assert!(changes.set.modified.is_empty());
    assert!(changes.set.deleted.is_empty());
    assert!(changes.set.renamed.is_empty());
}

#[tokio::test]
async fn reference_diff_reports_typed_changes() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    write(repo.path(), "generators/x.ts", "export const x = 1;\n");
    write(repo.path(), "services/y.ts", "export const y = 1;\n");
    write(
        repo.path(),
        "lib/old/name.ts",
        "a long enough body so rename detection has something to match\n",
    );
    let base = commit_all(repo.path(), "initial");

    write(repo.path(), "generators/x.ts", "export const x = 2;\n");
    fs::remove_file(repo.path().join("services/y.ts")).expect("rm");
    fs::create_dir_all(repo.path().join("lib/new")).expect("mkdir");
    fs::rename(
        repo.path().join("lib/old/name.ts"),
        repo.path().join("lib/new/name.ts"),
    )
    .expect("mv");
    write(repo.path(), "docs/guide.md", "# Guide\n");
    commit_all(repo.path(), "second");

    let source = GitChangeSource::new(repo.path());
    let changes = source.changes_since(Some(&base)).await.expect("changes");

    assert_eq!(changes.base, BaseRevision::Reference(base));
    assert_eq!(changes.set.added, ["docs/guide.md"]);
    assert_eq!(changes.set.modified, ["generators/x.ts"]);
    assert_eq!(changes.set.deleted, ["services/y.ts"]);
    assert_eq!(changes.set.renamed.len(), 1);
    assert_eq!(changes.set.renamed[0].from, "lib/old/name.ts");
    assert_eq!(changes.set.renamed[0].to, "lib/new/name.ts");
}

#[tokio::test]
async fn missing_reference_falls_back_to_parent() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    write(repo.path(), "a.txt", "1");
    let first = commit_all(repo.path(), "one");
    write(repo.path(), "a.txt", "2");
    commit_all(repo.path(), "two");

    let source = GitChangeSource::new(repo.path());
    let bogus = RevisionId::from("0123456789abcdef0123456789abcdef01234567");
    let changes = source.changes_since(Some(&bogus)).await.expect("changes");

    assert_eq!(changes.stale_reference, Some(bogus));
    assert_eq!(changes.base, BaseRevision::Parent(first));
    assert_eq!(changes.set.modified, ["a.txt"]);
}

#[tokio::test]
async fn absent_reference_with_history_diffs_against_parent() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    write(repo.path(), "a.txt", "1");
    commit_all(repo.path(), "one");
    write(repo.path(), "b.txt", "2");
    commit_all(repo.path(), "two");

    let source = GitChangeSource::new(repo.path());
    let changes = source.changes_since(None).await.expect("changes");
    assert!(matches!(changes.base, BaseRevision::Parent(_)));
    assert_eq!(changes.set.added, ["b.txt"]);
    assert!(changes.stale_reference.is_none());
}

#[tokio::test]
async fn tracked_files_excludes_untracked() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    write(repo.path(), "tracked.rs", "fn a() {}");
    commit_all(repo.path(), "one");
    write(repo.path(), "scratch.rs", "fn b() {}");

    let source = GitChangeSource::new(repo.path());
    let tracked = source.tracked_files().await.expect("tracked");
    assert!(tracked.contains("tracked.rs"));
    assert!(!tracked.contains("scratch.rs"));
}

#[tokio::test]
async fn non_repository_is_an_environment_error() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().expect("tempdir");
    let source = GitChangeSource::new(dir.path());
    let err = source.current_revision().await.unwrap_err();
    assert!(
        matches!(err, VcsError::NotAVersionControlledTree { .. }),
        "got: {err}"
    );

    let err = GitChangeSource::discover(dir.path()).await.unwrap_err();
    assert!(matches!(err, VcsError::NotAVersionControlledTree { .. }));
}

#[tokio::test]
async fn empty_history_is_reported() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    let source = GitChangeSource::new(repo.path());
    let err = source.current_revision().await.unwrap_err();
    assert!(matches!(err, VcsError::EmptyHistory { .. }), "got: {err}");
}

#[tokio::test]
async fn reference_pointer_roundtrips_and_tolerates_corruption() {
    if !git_available() {
        return;
    }
    let repo = init_repo();
    write(repo.path(), "a.txt", "1");
    let head = commit_all(repo.path(), "one");

    let source = GitChangeSource::new(repo.path());
    assert!(source.load_reference().is_none());
    source.persist_reference(&head).expect("persist");
    assert_eq!(source.load_reference(), Some(head));

    let store = ReferenceStore::for_repo(repo.path());
    fs::write(store.path(), "{ definitely not json").expect("corrupt");
    assert!(source.load_reference().is_none());
}
