//! PyPI registry client for fetching Python package releases

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::DEFAULT_REGISTRY_URL;
use crate::release::error::RegistryError;
use crate::release::registry::Registry;
use crate::release::types::Release;

/// Format of the legacy, timezone-less `upload_time` field
const LEGACY_UPLOAD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// PyPI registry client
pub struct PypiRegistry {
    client: Client,
    base_url: String,
}

impl Default for PypiRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL.to_string())
    }
}

impl PypiRegistry {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// PyPI JSON API response structure
#[derive(Debug, Deserialize)]
struct PypiResponse {
    releases: HashMap<String, Vec<PypiFile>>,
}

/// A distribution file belonging to a release
#[derive(Debug, Deserialize)]
struct PypiFile {
    upload_time: Option<String>,
    upload_time_iso_8601: Option<String>,
    #[serde(default)]
    yanked: bool,
}

impl PypiFile {
    fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        if let Some(iso) = &self.upload_time_iso_8601
            && let Ok(time) = DateTime::parse_from_rfc3339(iso)
        {
            return Some(time.with_timezone(&Utc));
        }

        let legacy = self.upload_time.as_deref()?;
        NaiveDateTime::parse_from_str(legacy, LEGACY_UPLOAD_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Earliest upload among the non-yanked files of a release
fn first_upload(files: &[PypiFile]) -> Option<DateTime<Utc>> {
    files
        .iter()
        .filter(|file| !file.yanked)
        .filter_map(PypiFile::uploaded_at)
        .min()
}

#[async_trait]
impl Registry for PypiRegistry {
    async fn fetch_releases(&self, package_name: &str) -> Result<Vec<Release>, RegistryError> {
        let url = format!("{}/pypi/{}/json", self.base_url, package_name);
        debug!("Fetching PyPI package: {}", url);

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if !response.status().is_success() {
            return Err(RegistryError::InvalidResponse(format!(
                "PyPI API returned status {}",
                response.status()
            )));
        }

        let pypi_response: PypiResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        // Releases without any live file cannot be installed, so they are not candidates
        let releases: Vec<Release> = pypi_response
            .releases
            .into_iter()
            .filter_map(|(version, files)| {
                first_upload(&files).map(|upload_time| Release::new(version, upload_time))
            })
            .collect();

        debug!(
            "Found {} releases for package {}",
            releases.len(),
            package_name
        );

        Ok(releases)
    }
}
