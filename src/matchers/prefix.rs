use log::debug;

use super::{snapshot_tags, Matcher};
use crate::error::Result;
use crate::history::Commit;
use crate::registry::{ImageRepository, Registry};

/// Matches tags named after an abbreviated commit hash, e.g. `sha-abcd123`.
///
/// The prefix is stripped from each tag (tags without it are used whole) and
/// the commit matches when its hash starts with what remains. Only the tag
/// listing is needed, so the registry is not kept after construction.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    repository: ImageRepository,
    prefix: String,
    tags: Vec<String>,
}

impl PrefixMatcher {
    pub fn new<R: Registry + ?Sized>(
        registry: &R,
        image: &str,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let (repository, tags) = snapshot_tags(registry, image)?;
        Ok(Self {
            repository,
            prefix: prefix.into(),
            tags,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Matcher for PrefixMatcher {
    fn identify(&mut self, commit: &Commit) -> Result<Option<String>> {
        let found = self.tags.iter().find(|tag| {
            let tag = tag.as_str();
            let abbreviated = tag.strip_prefix(self.prefix.as_str()).unwrap_or(tag);
            commit.hash().starts_with(abbreviated)
        });

        if let Some(tag) = found {
            debug!(
                "Tag {}:{} names commit {}",
                self.repository,
                tag,
                commit.short_hash()
            );
        }
        Ok(found.cloned())
    }
}
