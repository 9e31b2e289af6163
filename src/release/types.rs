use chrono::{DateTime, Utc};
use serde::Serialize;

/// A published version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub version: String,
    /// Time the first file of this version was uploaded
    pub upload_time: DateTime<Utc>,
}

impl Release {
    pub fn new(version: impl Into<String>, upload_time: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            upload_time,
        }
    }
}

/// Releases held in the store for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedReleases {
    pub releases: Vec<Release>,
    /// When the releases were last fetched from the registry
    pub updated_at: DateTime<Utc>,
}
