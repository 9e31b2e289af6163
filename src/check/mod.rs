//! Inbound check handling: identifier normalization, version classification
//! and the typed request schema.
//!
//! # Modules
//!
//! - [`normalize`]: Canonicalizes package, platform and interpreter strings
//! - [`classify`]: Decides between the stable and pre-release channels
//! - [`request`]: Parses and validates the `PUT /check` body
//! - [`error`]: Rejection reasons for a check

pub mod classify;
pub mod error;
pub mod normalize;
pub mod request;

pub use classify::is_standard_release;
pub use error::CheckError;
pub use normalize::{normalize, normalize_package_name};
pub use request::{Check, CheckRequest};
