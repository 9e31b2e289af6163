//! Registry test utilities

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use update_checker::release::{Registry, RegistryError, Release};

/// Mock registry for testing
#[derive(Default)]
pub struct MockRegistry {
    releases: HashMap<String, Vec<Release>>,
    fetches: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, package: &str, releases: &[(&str, &str)]) -> Self {
        self.releases.insert(
            package.to_string(),
            releases
                .iter()
                .map(|(version, upload_time)| Release::new(*version, parse_time(upload_time)))
                .collect(),
        );
        self
    }

    /// Number of times `fetch_releases` has been called
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

pub fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .unwrap()
        .with_timezone(&Utc)
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_releases(&self, package_name: &str) -> Result<Vec<Release>, RegistryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.releases.get(package_name) {
            Some(releases) => Ok(releases.clone()),
            None => Err(RegistryError::NotFound(package_name.to_string())),
        }
    }
}
