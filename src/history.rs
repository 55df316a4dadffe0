//! Commit history as seen by the identifier.
//!
//! A [`History`] hands out commits newest-first as a lazy iterator; [`walk`]
//! visits them in that order until the visitor breaks out with a value or the
//! history runs dry.

use std::ops::ControlFlow;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// A single commit, detached from the repository that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    hash: String,
    summary: String,
    time: DateTime<Utc>,
}

impl Commit {
    pub fn new(hash: impl Into<String>, summary: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            hash: hash.into(),
            summary: summary.into(),
            time,
        }
    }

    /// Full hex object id.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Abbreviated hash for log output.
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(7)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }
}

pub type Commits<'a> = Box<dyn Iterator<Item = anyhow::Result<Commit>> + 'a>;

/// Source of commits, most recent first.
pub trait History {
    fn commits(&self) -> anyhow::Result<Commits<'_>>;
}

impl History for [Commit] {
    fn commits(&self) -> anyhow::Result<Commits<'_>> {
        Ok(Box::new(self.iter().cloned().map(Ok)))
    }
}

impl History for Vec<Commit> {
    fn commits(&self) -> anyhow::Result<Commits<'_>> {
        self.as_slice().commits()
    }
}

/// Visits commits in history order.
///
/// Returns `Break` with the visitor's value as soon as it asks to stop, or
/// `Continue` once every commit has been seen. Errors from the history are
/// wrapped as [`Error::Traversal`]; errors from the visitor pass through as-is.
pub fn walk<H, T, F>(history: &H, mut visit: F) -> Result<ControlFlow<T>>
where
    H: History + ?Sized,
    F: FnMut(&Commit) -> Result<ControlFlow<T>>,
{
    let commits = history
        .commits()
        .map_err(|source| Error::Traversal { source })?;

    for commit in commits {
        let commit = commit.map_err(|source| Error::Traversal { source })?;
        if let ControlFlow::Break(found) = visit(&commit)? {
            return Ok(ControlFlow::Break(found));
        }
    }

    Ok(ControlFlow::Continue(()))
}
