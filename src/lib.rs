pub mod error;
pub mod git;
pub mod history;
pub mod identifier;
pub mod label_cache;
pub mod matchers;
pub mod notifier;
pub mod registry;

// Re-exports for easy access
pub use error::{Error, Result};
pub use git::GitRepo;
pub use history::{Commit, History};
pub use identifier::{Identification, ImageIdentifier};
pub use matchers::{LabelMatcher, Matcher, PrefixMatcher, REVISION_LABEL};
pub use notifier::Notifier;
pub use registry::{ImageRepository, Labels, OciRegistry, Registry};
