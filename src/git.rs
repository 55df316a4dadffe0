use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use git2::build::RepoBuilder;
use git2::{FetchOptions, RemoteCallbacks, Repository, Sort};
use std::path::Path;
use tempfile::TempDir;

use crate::history::{Commit, Commits, History};
use crate::notifier::Notifier;

/// Git repository whose history is walked during identification.
///
/// Either opened in place or cloned into a temporary directory that lives as
/// long as this value.
pub struct GitRepo {
    repo: Repository,
    branch: Option<String>,
    _checkout: Option<TempDir>,
}

impl GitRepo {
    /// Opens an existing repository. History starts at `branch` when given,
    /// at `HEAD` otherwise.
    pub fn open(path: &Path, branch: Option<&str>) -> Result<Self> {
        let repo = Repository::open(path)
            .context(format!("Failed to open git repository at {}", path.display()))?;

        Ok(Self {
            repo,
            branch: branch.map(str::to_string),
            _checkout: None,
        })
    }

    /// Clones `url` into a fresh temporary directory, checking out `branch`
    /// or the remote's default branch.
    pub fn clone_remote(url: &str, branch: Option<&str>, notifier: &Notifier) -> Result<Self> {
        let checkout = TempDir::with_prefix("gitimages")
            .context("Failed to create temporary directory")?;
        notifier.info(&format!(
            "Cloning {} to {}",
            url,
            checkout.path().display()
        ));

        let progress = notifier.create_progress_bar(0, "Receiving objects");
        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(|stats| {
            let received = stats.received_objects() as u64;
            let total = stats.total_objects() as u64;
            match &progress {
                Some(bar) => {
                    bar.set_length(total);
                    bar.set_position(received);
                }
                None => notifier.progress(received, total, "Receiving objects"),
            }
            true
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let Some(branch) = branch {
            builder.branch(branch);
        }

        let repo = builder
            .clone(url, checkout.path())
            .context(format!("Failed to clone {}", url))?;

        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }

        Ok(Self {
            repo,
            branch: None,
            _checkout: Some(checkout),
        })
    }

    pub fn path(&self) -> &Path {
        self.repo.workdir().unwrap_or_else(|| self.repo.path())
    }

    fn revwalk(&self) -> Result<git2::Revwalk<'_>> {
        let path = self.path().display();
        let mut revwalk = self
            .repo
            .revwalk()
            .context(format!("Failed to create revwalk for {}", path))?;
        match &self.branch {
            Some(branch) => revwalk
                .push_ref(&format!("refs/heads/{}", branch))
                .context(format!("Failed to find branch {} in {}", branch, path))?,
            None => revwalk
                .push_head()
                .context(format!("Failed to push HEAD of {} to revwalk", path))?,
        }
        revwalk
            .set_sorting(Sort::TIME)
            .context("Failed to set sorting")?;
        Ok(revwalk)
    }

    fn load_commit(&self, oid: git2::Oid) -> Result<Commit> {
        let commit = self
            .repo
            .find_commit(oid)
            .context(format!(
                "Failed to find commit {} in {}",
                oid,
                self.path().display()
            ))?;
        let time = DateTime::from_timestamp(commit.time().seconds(), 0)
            .ok_or_else(|| anyhow!("Commit {} has an invalid timestamp", oid))?;

        Ok(Commit::new(
            oid.to_string(),
            commit.summary().unwrap_or_default(),
            time,
        ))
    }
}

impl History for GitRepo {
    fn commits(&self) -> Result<Commits<'_>> {
        if self.branch.is_none() && self.repo.is_empty()? {
            return Ok(Box::new(std::iter::empty()));
        }

        let revwalk = self.revwalk()?;
        Ok(Box::new(revwalk.map(move |oid| {
            let oid = oid.context(format!(
                "Failed to read commit history of {}",
                self.path().display()
            ))?;
            self.load_commit(oid)
        })))
    }
}
