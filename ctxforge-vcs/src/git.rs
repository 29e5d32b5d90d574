//! Git change source using the `git` CLI.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use ctxforge_core::{ChangeSet, RenamedPath, RevisionId};

use crate::error::VcsError;
use crate::reference::ReferenceStore;
use crate::source::{BaseRevision, ChangeSource, Changes, VcsFuture};

/// Change source backed by a git work tree. Shells out to `git -C <root>`.
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    root: PathBuf,
    store: ReferenceStore,
}

impl GitChangeSource {
    /// Use `root` as-is; it must be the top level of the work tree.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store = ReferenceStore::for_repo(&root);
        Self { root, store }
    }

    /// Locate the work tree containing `path` and build a source at its top level.
    ///
    /// # Errors
    ///
    /// [`VcsError::NotAVersionControlledTree`] if `path` is not inside one.
    pub async fn discover(path: &Path) -> Result<Self, VcsError> {
        let output = run_git(path, &["rev-parse", "--show-toplevel"]).await?;
        if !output.success {
            return Err(VcsError::NotAVersionControlledTree {
                path: path.to_path_buf(),
            });
        }
        let top = output.stdout.trim();
        if top.is_empty() {
            return Err(VcsError::NotAVersionControlledTree {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::new(PathBuf::from(top)))
    }

    /// Override where the reference record lives.
    pub fn with_store(mut self, store: ReferenceStore) -> Self {
        self.store = store;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn git(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = run_git(&self.root, args).await?;
        if !output.success {
            if output.stderr.contains("not a git repository") {
                return Err(VcsError::NotAVersionControlledTree {
                    path: self.root.clone(),
                });
            }
            return Err(VcsError::Command {
                args: args.join(" "),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Full hash of `rev` if it names a commit, `None` otherwise.
    async fn resolve_commit(&self, rev: &str) -> Result<Option<RevisionId>, VcsError> {
        let spec = format!("{rev}^{{commit}}");
        let args = ["rev-parse", "--verify", "--quiet", spec.as_str()];
        let output = run_git(&self.root, &args).await?;
        if !output.success {
            return Ok(None);
        }
        let hash = output.stdout.trim();
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(RevisionId::from(hash)))
    }

    async fn ensure_work_tree(&self) -> Result<(), VcsError> {
        let output = run_git(&self.root, &["rev-parse", "--is-inside-work-tree"]).await?;
        if !output.success || output.stdout.trim() != "true" {
            return Err(VcsError::NotAVersionControlledTree {
                path: self.root.clone(),
            });
        }
        Ok(())
    }

    async fn head(&self) -> Result<RevisionId, VcsError> {
        self.ensure_work_tree().await?;
        self.resolve_commit("HEAD")
            .await?
            .ok_or_else(|| VcsError::EmptyHistory {
                path: self.root.clone(),
            })
    }

    async fn diff(&self, base: &RevisionId, head: &RevisionId) -> Result<ChangeSet, VcsError> {
        let stdout = self
            .git(&[
                "diff",
                "--name-status",
                "-M",
                "-z",
                "--no-color",
                "--no-ext-diff",
                base.0.as_str(),
                head.0.as_str(),
            ])
            .await?;
        parse_name_status(&stdout)
    }

    async fn ls_files(&self) -> Result<BTreeSet<String>, VcsError> {
        let stdout = self.git(&["ls-files", "-z"]).await?;
        Ok(stdout
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn compute_changes(&self, reference: Option<&RevisionId>) -> Result<Changes, VcsError> {
        let head = self.head().await?;
        let mut stale_reference = None;

        if let Some(reference) = reference {
            match self.resolve_commit(&reference.0).await? {
                Some(base) => {
                    let set = self.diff(&base, &head).await?;
                    return Ok(Changes {
                        set,
                        head,
                        base: BaseRevision::Reference(base),
                        stale_reference,
                    });
                }
                None => {
                    tracing::warn!(
                        reference = %reference,
                        "reference revision no longer exists in history; falling back to the previous revision"
                    );
                    stale_reference = Some(reference.clone());
                }
            }
        }

        let parent_spec = format!("{}~1", head.0);
        if let Some(parent) = self.resolve_commit(&parent_spec).await? {
            let set = self.diff(&parent, &head).await?;
            return Ok(Changes {
                set,
                head,
                base: BaseRevision::Parent(parent),
                stale_reference,
            });
        }

        tracing::debug!("single-revision history; reporting every tracked file as added");
        let tracked = self.ls_files().await?;
        Ok(Changes {
            set: ChangeSet::all_added(tracked),
            head,
            base: BaseRevision::Root,
            stale_reference,
        })
    }
}

impl ChangeSource for GitChangeSource {
    fn current_revision(&self) -> VcsFuture<'_, RevisionId> {
        Box::pin(self.head())
    }

    fn changes_since<'a>(&'a self, reference: Option<&'a RevisionId>) -> VcsFuture<'a, Changes> {
        Box::pin(self.compute_changes(reference))
    }

    fn tracked_files(&self) -> VcsFuture<'_, BTreeSet<String>> {
        Box::pin(async move {
            self.ensure_work_tree().await?;
            self.ls_files().await
        })
    }

    fn load_reference(&self) -> Option<RevisionId> {
        match self.store.load() {
            Ok(record) => record.map(|r| r.last_revision),
            Err(err) => {
                tracing::warn!(
                    path = %self.store.path().display(),
                    "ignoring unreadable reference record: {err}"
                );
                None
            }
        }
    }

    fn persist_reference(&self, revision: &RevisionId) -> Result<(), VcsError> {
        self.store.save(revision)
    }
}

// ---------------------------------------------------------------------------
// Process plumbing
// ---------------------------------------------------------------------------

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

async fn run_git(dir: &Path, args: &[&str]) -> Result<GitOutput, VcsError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_OPTIONAL_LOCKS", "0")
        .env("LC_ALL", "C")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(VcsError::Spawn)?;
    Ok(GitOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Parse `git diff --name-status -z` output.
///
/// Records are NUL-separated: `<status>\0<path>\0` or, for renames and
/// copies, `<status><score>\0<from>\0<to>\0`. Copies are reported as an
/// addition of the destination; type changes and unmerged entries as
/// modifications.
pub fn parse_name_status(output: &str) -> Result<ChangeSet, VcsError> {
    let mut set = ChangeSet::default();
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());

    while let Some(status) = tokens.next() {
        let code = status.trim().chars().next().unwrap_or(' ');
        let mut path = || {
            tokens
                .next()
                .map(str::to_string)
                .ok_or_else(|| VcsError::Parse(format!("missing path after status '{status}'")))
        };
        match code {
            'A' => set.added.push(path()?),
            'M' | 'T' | 'U' => set.modified.push(path()?),
            'D' => set.deleted.push(path()?),
            'R' => {
                let from = path()?;
                let to = path()?;
                set.renamed.push(RenamedPath { from, to });
            }
            'C' => {
                let _source = path()?;
                set.added.push(path()?);
            }
            other => {
                return Err(VcsError::Parse(format!("unknown status '{other}' in diff output")));
            }
        }
    }
    Ok(set)
}
