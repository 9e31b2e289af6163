//! Registry trait for fetching package releases

#[cfg(test)]
use mockall::automock;

use crate::release::error::RegistryError;
use crate::release::types::Release;

/// Trait for fetching the published releases of a package
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches every release of a package that has at least one uploaded file
    ///
    /// # Arguments
    /// * `package_name` - The normalized package name (e.g., "praw")
    ///
    /// # Returns
    /// * `Ok(Vec<Release>)` - Releases in no particular order
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_releases(&self, package_name: &str) -> Result<Vec<Release>, RegistryError>;
}
