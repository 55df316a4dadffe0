//! Commit history → published image identification.
//!
//! [`ImageIdentifier`] walks a [`History`] newest-first and asks its
//! [`Matcher`] about each commit:
//! - the first commit the matcher recognises ends the walk, and its tag is the
//!   answer;
//! - running out of commits is a normal outcome and yields `None`;
//! - any error from the history or the matcher ends the walk and is returned
//!   unchanged.
//!
//! The walk stops through [`ControlFlow::Break`], never through the error
//! channel, so a match can't be mistaken for a failure.

use std::ops::ControlFlow;

use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use serde::Serialize;

use crate::error::Result;
use crate::history::{self, Commit, History};
use crate::matchers::Matcher;

/// A tag together with the commit it was matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identification {
    pub tag: String,
    pub commit: String,
    pub summary: String,
    pub committed_at: DateTime<Utc>,
}

impl Identification {
    fn new(tag: String, commit: &Commit) -> Self {
        Self {
            tag,
            commit: commit.hash().to_string(),
            summary: commit.summary().to_string(),
            committed_at: commit.time(),
        }
    }
}

/// Finds the most recent image for a commit history using a [`Matcher`].
///
/// The identifier owns its matcher, and with it the matcher's registry cache,
/// so running several identifications through the same instance reuses
/// everything fetched so far.
pub struct ImageIdentifier<M: Matcher> {
    matcher: M,
}

impl<M: Matcher> ImageIdentifier<M> {
    pub fn new(matcher: M) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn into_matcher(self) -> M {
        self.matcher
    }

    /// Tag of the most recent commit in `history` that has an image, or
    /// `None` when no commit does.
    ///
    /// # Errors
    /// - [`crate::Error::Traversal`] when the history can't be read.
    /// - Whatever the matcher raises, typically a registry error.
    pub fn find_most_recent_image<H: History + ?Sized>(
        &mut self,
        history: &H,
    ) -> Result<Option<String>> {
        Ok(self.identify(history)?.map(|found| found.tag))
    }

    /// Like [`Self::find_most_recent_image`], but also reports which commit
    /// the tag was matched against.
    pub fn identify<H: History + ?Sized>(&mut self, history: &H) -> Result<Option<Identification>> {
        let mut visited = 0usize;
        let matcher = &mut self.matcher;

        let flow = history::walk(history, |commit| {
            visited += 1;
            trace!("Checking commit {} {}", commit.short_hash(), commit.summary());

            Ok(match matcher.identify(commit)? {
                Some(tag) => ControlFlow::Break(Identification::new(tag, commit)),
                None => ControlFlow::Continue(()),
            })
        })?;

        match flow {
            ControlFlow::Break(found) => {
                info!(
                    "Identified {:?} from commit {} after {} commits",
                    found.tag, found.commit, visited
                );
                Ok(Some(found))
            }
            ControlFlow::Continue(()) => {
                debug!("No image found in {} commits", visited);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::history::Commits;
    use crate::matchers::{LabelMatcher, REVISION_LABEL};
    use crate::registry::testing::FakeRegistry;
    use chrono::{TimeZone, Utc};

    const C1: &str = "1111111111111111111111111111111111111111";
    const C2: &str = "2222222222222222222222222222222222222222";
    const C3: &str = "3333333333333333333333333333333333333333";

    fn commit(hash: &str) -> Commit {
        Commit::new(
            hash,
            format!("commit {}", &hash[..4]),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn history() -> Vec<Commit> {
        vec![commit(C1), commit(C2), commit(C3)]
    }

    /// Matches one hash and records every commit it is shown.
    struct OneCommit {
        hash: &'static str,
        tag: &'static str,
        seen: Vec<String>,
    }

    impl OneCommit {
        fn new(hash: &'static str, tag: &'static str) -> Self {
            Self {
                hash,
                tag,
                seen: Vec::new(),
            }
        }
    }

    impl Matcher for OneCommit {
        fn identify(&mut self, commit: &Commit) -> Result<Option<String>> {
            self.seen.push(commit.hash().to_string());
            Ok((commit.hash() == self.hash).then(|| self.tag.to_string()))
        }
    }

    struct TruncatedHistory;

    impl History for TruncatedHistory {
        fn commits(&self) -> anyhow::Result<Commits<'_>> {
            Ok(Box::new(
                vec![Ok(commit(C1)), Err(anyhow::anyhow!("packfile is truncated"))].into_iter(),
            ))
        }
    }

    #[test]
    fn test_stops_at_first_matching_commit() {
        let mut identifier = ImageIdentifier::new(OneCommit::new(C2, "v2"));

        let found = identifier.find_most_recent_image(&history()).unwrap();

        assert_eq!(found, Some("v2".to_string()));
        assert_eq!(identifier.matcher().seen, vec![C1, C2]);
    }

    #[test]
    fn test_identify_reports_commit() {
        let mut identifier = ImageIdentifier::new(OneCommit::new(C3, "v3"));

        let found = identifier.identify(&history()).unwrap().unwrap();

        assert_eq!(found.tag, "v3");
        assert_eq!(found.commit, C3);
        assert_eq!(found.summary, "commit 3333");
        assert_eq!(found.committed_at, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());

        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["committed_at"], "2023-01-01T00:00:00Z");
        assert_eq!(json["tag"], "v3");
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let mut identifier = ImageIdentifier::new(OneCommit::new("ffff", "never"));
        assert_eq!(identifier.find_most_recent_image(&history()).unwrap(), None);
        assert_eq!(identifier.into_matcher().seen.len(), 3);
    }

    #[test]
    fn test_empty_history() {
        let mut identifier = ImageIdentifier::new(OneCommit::new(C1, "v1"));
        let empty: Vec<Commit> = Vec::new();

        assert_eq!(identifier.find_most_recent_image(&empty).unwrap(), None);
        assert!(identifier.matcher().seen.is_empty());
    }

    #[test]
    fn test_most_recent_commit_wins_over_listing_order() {
        let registry = FakeRegistry::with_tags(&["old", "new"])
            .label("old", REVISION_LABEL, C2)
            .label("new", REVISION_LABEL, C1);
        let matcher = LabelMatcher::new(&registry, "bigkevmcd/go-demo", REVISION_LABEL).unwrap();

        let mut identifier = ImageIdentifier::new(matcher);
        let found = identifier.find_most_recent_image(&history()).unwrap();

        assert_eq!(found, Some("new".to_string()));
    }

    #[test]
    fn test_registry_error_aborts_walk() {
        let registry = FakeRegistry::with_tags(&["v1", "broken"])
            .label("v1", REVISION_LABEL, C2)
            .failing_tag("broken");
        let matcher = LabelMatcher::new(&registry, "bigkevmcd/go-demo", REVISION_LABEL).unwrap();

        let mut identifier = ImageIdentifier::new(matcher);
        let result = identifier.find_most_recent_image(&history());

        match result {
            Err(Error::FetchLabels { tag, .. }) => assert_eq!(tag, "broken"),
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert_eq!(registry.fetches(), vec!["v1", "broken"]);
    }

    #[test]
    fn test_traversal_error_aborts_walk() {
        let mut identifier = ImageIdentifier::new(OneCommit::new(C2, "v2"));

        let result = identifier.find_most_recent_image(&TruncatedHistory);

        assert!(matches!(result, Err(Error::Traversal { .. })));
        assert_eq!(identifier.matcher().seen, vec![C1]);
    }

    #[test]
    fn test_boxed_matcher() {
        let boxed: Box<dyn Matcher> = Box::new(OneCommit::new(C1, "v1"));
        let mut identifier = ImageIdentifier::new(boxed);

        assert_eq!(
            identifier.find_most_recent_image(&history()).unwrap(),
            Some("v1".to_string())
        );
    }
}
