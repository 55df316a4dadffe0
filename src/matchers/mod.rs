pub mod label;
pub mod matcher;
pub mod prefix;

pub use label::{LabelMatcher, REVISION_LABEL};
pub use matcher::Matcher;
pub use prefix::PrefixMatcher;

use log::debug;

use crate::error::{Error, Result};
use crate::registry::{ImageRepository, Registry};

/// Parses `image` and takes the one tag listing a matcher works from.
fn snapshot_tags<R: Registry + ?Sized>(
    registry: &R,
    image: &str,
) -> Result<(ImageRepository, Vec<String>)> {
    let repository = image
        .parse::<ImageRepository>()
        .map_err(|source| Error::Config {
            reference: image.to_string(),
            source,
        })?;

    let tags = registry
        .list_tags(&repository)
        .map_err(|source| Error::ListTags {
            repository: repository.to_string(),
            source,
        })?;

    debug!("Found {} tags for {}", tags.len(), repository);
    Ok((repository, tags))
}
