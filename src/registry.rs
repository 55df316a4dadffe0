//! Registry access.
//!
//! [`Registry`] is the narrow view the matchers need: list a repository's
//! tags, and read the labels from one tag's image configuration.
//! [`OciRegistry`] implements it over the OCI distribution API with
//! `oci-client`, blocking on a private current-thread runtime.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, trace};
use oci_client::client::{linux_amd64_resolver, ClientConfig};
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use oci_spec::image::ImageConfiguration;
use tokio::runtime::Runtime;

/// Image configuration labels, key to value.
pub type Labels = HashMap<String, String>;

/// Number of tags requested per page when listing.
const TAG_PAGE_SIZE: usize = 1000;

/// A registry and repository pair, e.g. `docker.io/bigkevmcd/go-demo`.
///
/// Parsed with the usual image reference rules: a bare `name` or
/// `namespace/name` resolves against Docker Hub. Any tag or digest on the
/// input is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRepository {
    registry: String,
    repository: String,
}

impl ImageRepository {
    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Reference to `tag` within this repository.
    pub fn tag(&self, tag: &str) -> Reference {
        Reference::with_tag(
            self.registry.clone(),
            self.repository.clone(),
            tag.to_string(),
        )
    }
}

impl FromStr for ImageRepository {
    type Err = anyhow::Error;

    fn from_str(image: &str) -> Result<Self> {
        let reference: Reference = image.parse()?;
        Ok(Self {
            registry: reference.registry().to_string(),
            repository: reference.repository().to_string(),
        })
    }
}

impl fmt::Display for ImageRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)
    }
}

/// Read-only registry operations used while matching.
pub trait Registry {
    /// All tags of `repository`, in the order the registry lists them.
    fn list_tags(&self, repository: &ImageRepository) -> Result<Vec<String>>;

    /// Labels of the image `repository:tag`; empty when the image has none.
    fn image_labels(&self, repository: &ImageRepository, tag: &str) -> Result<Labels>;
}

impl<R: Registry + ?Sized> Registry for &R {
    fn list_tags(&self, repository: &ImageRepository) -> Result<Vec<String>> {
        (**self).list_tags(repository)
    }

    fn image_labels(&self, repository: &ImageRepository, tag: &str) -> Result<Labels> {
        (**self).image_labels(repository, tag)
    }
}

/// [`Registry`] backed by an OCI distribution endpoint.
pub struct OciRegistry {
    client: Client,
    auth: RegistryAuth,
    runtime: Runtime,
    timeout: Option<Duration>,
}

impl OciRegistry {
    /// Creates a client authenticating with `auth`. When `timeout` is set,
    /// every registry request fails once it runs longer than that.
    pub fn new(auth: RegistryAuth, timeout: Option<Duration>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create async runtime")?;

        Ok(Self {
            client: Client::new(client_config()),
            auth,
            runtime,
            timeout,
        })
    }

    fn block_on<T, E, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let Some(limit) = self.timeout else {
            return self.runtime.block_on(request).map_err(anyhow::Error::from);
        };

        match self
            .runtime
            .block_on(async { tokio::time::timeout(limit, request).await })
        {
            Ok(response) => response.map_err(anyhow::Error::from),
            Err(_) => Err(anyhow!("Registry request timed out after {:?}", limit)),
        }
    }
}

impl Registry for OciRegistry {
    fn list_tags(&self, repository: &ImageRepository) -> Result<Vec<String>> {
        let reference = repository.tag("latest");

        let tags = collect_tag_pages(|last| {
            trace!("Listing tags of {} after {:?}", repository, last);
            let page = self.block_on(self.client.list_tags(
                &reference,
                &self.auth,
                Some(TAG_PAGE_SIZE),
                last,
            ))?;
            Ok(page.tags)
        })
        .context(format!("Failed to list tags of {}", repository))?;

        debug!("Registry lists {} tags for {}", tags.len(), repository);
        Ok(tags)
    }

    fn image_labels(&self, repository: &ImageRepository, tag: &str) -> Result<Labels> {
        let reference = repository.tag(tag);
        debug!("Fetching image configuration for {}", reference);

        let (_manifest, _digest, config) = self
            .block_on(
                self.client
                    .pull_manifest_and_config(&reference, &self.auth),
            )
            .context(format!("Failed to pull image configuration for {}", reference))?;

        labels_from_config(&config)
            .context(format!("Failed to parse image configuration for {}", reference))
    }
}

/// Client configuration used for every registry.
///
/// Multi-platform images resolve to their linux/amd64 entry whatever the host
/// platform is, so the same tag always yields the same labels.
fn client_config() -> ClientConfig {
    ClientConfig {
        platform_resolver: Some(Box::new(linux_amd64_resolver)),
        ..Default::default()
    }
}

/// Requests tag pages until the registry has nothing more to give.
///
/// `fetch_page` receives the last tag seen so far. Listing ends on an empty
/// page, or on a page ending where the previous one did, which is what a
/// registry ignoring `last` sends back.
fn collect_tag_pages<F>(mut fetch_page: F) -> Result<Vec<String>>
where
    F: FnMut(Option<&str>) -> Result<Vec<String>>,
{
    let mut tags: Vec<String> = Vec::new();

    loop {
        let last = tags.last().map(String::as_str);
        let page = fetch_page(last)?;
        if page.is_empty() || page.last().map(String::as_str) == last {
            break;
        }
        tags.extend(page);
    }

    Ok(tags)
}

/// Extracts the labels from a raw image configuration document.
pub fn labels_from_config(config: &str) -> Result<Labels> {
    let config: ImageConfiguration = serde_json::from_str(config)?;
    Ok(config
        .config()
        .as_ref()
        .and_then(|c| c.labels().clone())
        .unwrap_or_default())
}
