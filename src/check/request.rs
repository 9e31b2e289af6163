//! Typed check request schema
//!
//! The raw body is parsed exactly once into [`CheckRequest`], then validated
//! into a [`Check`] whose fields are already normalized. Nothing downstream
//! looks at the raw payload again.

use std::collections::HashSet;

use serde::Deserialize;

use crate::check::classify::is_standard_release;
use crate::check::error::CheckError;
use crate::check::normalize::{normalize, normalize_package_name};

/// Body of `PUT /check` as sent by client libraries
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CheckRequest {
    pub package_name: String,
    pub package_version: String,
    pub platform: String,
    pub python_version: String,
}

/// A validated check, ready to be recorded and resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub package_name: String,
    pub package_version: String,
    pub platform: String,
    pub python_version: String,
}

impl CheckRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, CheckError> {
        serde_json::from_slice(body)
            .map_err(|_| CheckError::ClientInput("body must contain all required string fields"))
    }

    /// Normalize every field and enforce the package allow-list.
    ///
    /// The allow-list is checked before blank fields, so an empty package
    /// name is reported as an unsupported package.
    pub fn validate(self, allowed_packages: &HashSet<String>) -> Result<Check, CheckError> {
        let package_name = normalize_package_name(&self.package_name);
        if !allowed_packages.contains(&package_name) {
            return Err(CheckError::UnknownPackage(package_name));
        }

        let package_version = self.package_version.trim().to_string();
        let platform = normalize(&self.platform);
        let python_version = normalize(&self.python_version);

        if package_version.is_empty() {
            return Err(CheckError::ClientInput("package_version is blank"));
        }
        if platform.is_empty() {
            return Err(CheckError::ClientInput("platform is blank"));
        }
        if python_version.is_empty() {
            return Err(CheckError::ClientInput("python_version is blank"));
        }

        Ok(Check {
            package_name,
            package_version,
            platform,
            python_version,
        })
    }
}

impl Check {
    /// Whether the answer should come from the pre-release channel
    pub fn wants_prerelease(&self) -> bool {
        !is_standard_release(&self.package_version)
    }
}
