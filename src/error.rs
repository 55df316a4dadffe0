//! Errors raised while identifying an image.
//!
//! A missing match is never an error: matchers and the identifier report it as
//! `Ok(None)`. Everything here is fatal to the run and carries the image
//! repository (and tag, where one is involved) that was being looked at.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The image repository reference could not be parsed.
    #[error("unable to parse image {reference:?}")]
    Config {
        reference: String,
        #[source]
        source: anyhow::Error,
    },

    /// The registry refused or failed to list the repository's tags.
    #[error("unable to get tags for {repository:?}")]
    ListTags {
        repository: String,
        #[source]
        source: anyhow::Error,
    },

    /// The registry failed to return the image configuration for a tag.
    #[error("failed to get image labels for \"{repository}:{tag}\"")]
    FetchLabels {
        repository: String,
        tag: String,
        #[source]
        source: anyhow::Error,
    },

    /// The commit history could not be produced.
    #[error("failed to walk commit history")]
    Traversal {
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// True for failures that came back from the registry.
    pub fn is_registry(&self) -> bool {
        matches!(self, Error::ListTags { .. } | Error::FetchLabels { .. })
    }
}
