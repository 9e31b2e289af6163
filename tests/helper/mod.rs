//! Shared integration test utilities
#![allow(dead_code)]

pub mod app;
pub mod registry;

pub use app::{CHECK_ATTRS, TestApp, body_bytes, body_json, check_data, praw_registry};
pub use registry::{MockRegistry, parse_time};
