use crate::error::Result;
use crate::history::Commit;

/// Strategy that maps a commit to the image tag built from it.
pub trait Matcher {
    /// Returns the tag corresponding to `commit`, or `None` when no tag does.
    ///
    /// Implementations may fetch and cache registry data as a side effect,
    /// which is why this takes `&mut self`.
    fn identify(&mut self, commit: &Commit) -> Result<Option<String>>;
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn identify(&mut self, commit: &Commit) -> Result<Option<String>> {
        (**self).identify(commit)
    }
}
