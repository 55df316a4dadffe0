use log::{debug, trace};

use super::{snapshot_tags, Matcher};
use crate::error::{Error, Result};
use crate::history::Commit;
use crate::label_cache::LabelCache;
use crate::registry::{ImageRepository, Registry};

/// Standard OCI annotation recording the source revision an image was built from.
pub const REVISION_LABEL: &str = "org.opencontainers.image.revision";

/// Matches a commit against an image label holding the commit hash.
///
/// Tags are listed once when the matcher is built. Each tag's labels are
/// fetched the first time the tag is examined and reused for every later
/// commit.
pub struct LabelMatcher<R: Registry> {
    registry: R,
    repository: ImageRepository,
    label: String,
    tags: Vec<String>,
    labels: LabelCache,
}

impl<R: Registry> LabelMatcher<R> {
    pub fn new(registry: R, image: &str, label: impl Into<String>) -> Result<Self> {
        let (repository, tags) = snapshot_tags(&registry, image)?;
        Ok(Self {
            registry,
            repository,
            label: label.into(),
            tags,
            labels: LabelCache::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Number of tags whose labels have been fetched so far.
    pub fn cached_tags(&self) -> usize {
        self.labels.len()
    }
}

impl<R: Registry> Matcher for LabelMatcher<R> {
    fn identify(&mut self, commit: &Commit) -> Result<Option<String>> {
        for tag in &self.tags {
            let labels = self.labels.get_or_fetch(tag, || {
                trace!("Fetching labels for {}:{}", self.repository, tag);
                self.registry
                    .image_labels(&self.repository, tag)
                    .map_err(|source| Error::FetchLabels {
                        repository: self.repository.to_string(),
                        tag: tag.clone(),
                        source,
                    })
            })?;

            if labels
                .get(&self.label)
                .is_some_and(|value| value == commit.hash())
            {
                debug!(
                    "Tag {} carries {}={}",
                    tag,
                    self.label,
                    commit.short_hash()
                );
                return Ok(Some(tag.clone()));
            }
        }

        Ok(None)
    }
}
