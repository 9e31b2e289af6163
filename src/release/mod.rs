//! Release resolution: which version a client should be told about
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Registry  │────▶│  Resolver   │────▶│   Store     │
//! │   (fetch)   │     │  (select)   │◀────│  (cache)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching releases from a package index
//! - [`pypi`]: PyPI JSON API implementation of [`Registry`]
//! - [`resolver`]: Channel-aware latest release selection with cache refresh
//! - [`error`]: Error types for registry and resolution failures
//! - [`types`]: `Release` and `CachedReleases`

pub mod error;
pub mod pypi;
pub mod registry;
pub mod resolver;
pub mod types;

pub use error::{RegistryError, ResolveError};
pub use pypi::PypiRegistry;
pub use registry::Registry;
pub use resolver::{ReleaseResolver, ReleaseStorer, select_latest};
pub use types::{CachedReleases, Release};
