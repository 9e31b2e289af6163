//! Latest-release resolution backed by the release cache

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
#[cfg(test)]
use mockall::automock;
use pep508_rs::pep440_rs::Version;
use tracing::{debug, error, info, warn};

use crate::check::is_standard_release;
use crate::release::error::ResolveError;
use crate::release::registry::Registry;
use crate::release::types::{CachedReleases, Release};
use crate::store::StoreError;

/// Trait for storing and retrieving cached releases
#[cfg_attr(test, automock)]
pub trait ReleaseStorer: Send + Sync + 'static {
    /// Cached releases for a package, or None if never fetched
    fn cached_releases(&self, package_name: &str) -> Result<Option<CachedReleases>, StoreError>;

    /// Replace the cached releases for a package
    fn replace_releases(
        &self,
        package_name: &str,
        releases: &[Release],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Try to take the fetch lock for a package; false if another fetch is running
    fn try_start_fetch(&self, package_name: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Release the fetch lock for a package
    fn finish_fetch(&self, package_name: &str) -> Result<(), StoreError>;

    /// Remember the latest stable release on the package row
    fn set_latest_release(&self, package_name: &str, release: &Release) -> Result<(), StoreError>;
}

/// Pick the highest eligible release by PEP 440 ordering.
///
/// Without `include_prerelease` only standard releases are eligible.
/// Versions that do not parse are skipped.
pub fn select_latest(releases: &[Release], include_prerelease: bool) -> Option<Release> {
    releases
        .iter()
        .filter(|release| include_prerelease || is_standard_release(&release.version))
        .filter_map(|release| {
            Version::from_str(&release.version)
                .ok()
                .map(|parsed| (release, parsed))
        })
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(release, _)| release.clone())
}

pub struct ReleaseResolver<S: ReleaseStorer> {
    storer: Arc<S>,
    registry: Arc<dyn Registry>,
    refresh_interval: TimeDelta,
}

impl<S: ReleaseStorer> ReleaseResolver<S> {
    /// `refresh_interval_ms` is the age after which cached releases are refetched
    pub fn new(storer: Arc<S>, registry: Arc<dyn Registry>, refresh_interval_ms: i64) -> Self {
        Self {
            storer,
            registry,
            refresh_interval: TimeDelta::milliseconds(refresh_interval_ms),
        }
    }

    /// Latest release of `package_name` on the requested channel
    pub async fn latest(
        &self,
        package_name: &str,
        include_prerelease: bool,
        now: DateTime<Utc>,
    ) -> Result<Release, ResolveError> {
        let candidates = self.candidates(package_name, now).await?;

        let release = select_latest(&candidates, include_prerelease)
            .ok_or_else(|| ResolveError::NoRelease(package_name.to_string()))?;

        if !include_prerelease {
            let _ = self
                .storer
                .set_latest_release(package_name, &release)
                .inspect_err(|e| {
                    warn!("Failed to store latest release for {}: {}", package_name, e)
                });
        }

        Ok(release)
    }

    /// Cached releases while fresh, otherwise a registry fetch that refreshes the cache
    async fn candidates(
        &self,
        package_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Release>, ResolveError> {
        let cached = self.storer.cached_releases(package_name)?;

        if let Some(cached) = &cached
            && now - cached.updated_at < self.refresh_interval
        {
            debug!("Using cached releases for {}", package_name);
            return Ok(cached.releases.clone());
        }

        let locked = self
            .storer
            .try_start_fetch(package_name, now)
            .inspect_err(|e| error!("Failed to start fetch for {}: {}", package_name, e))
            .unwrap_or(false);

        if !locked && let Some(cached) = &cached {
            info!(
                "Skipping fetch of {}: already being fetched, using cached releases",
                package_name
            );
            return Ok(cached.releases.clone());
        }

        let fetched = self.registry.fetch_releases(package_name).await;

        if locked {
            let _ = self
                .storer
                .finish_fetch(package_name)
                .inspect_err(|e| error!("Failed to finish fetch for {}: {}", package_name, e));
        }

        match fetched {
            Ok(releases) => {
                info!("Fetched {} releases for {}", releases.len(), package_name);
                let _ = self
                    .storer
                    .replace_releases(package_name, &releases, now)
                    .inspect_err(|e| {
                        error!("Failed to cache releases for {}: {}", package_name, e)
                    });
                Ok(releases)
            }
            Err(e) => match cached {
                Some(cached) => {
                    warn!(
                        "Failed to fetch releases for {}, using stale cache: {}",
                        package_name, e
                    );
                    Ok(cached.releases)
                }
                None => Err(e.into()),
            },
        }
    }
}
