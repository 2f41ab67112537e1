//! # channelhub-core
//!
//! Core crate for ChannelHub. Contains the configuration schemas, the
//! cache provider trait, and the unified error system shared by every
//! other crate in the workspace.
//!
//! This crate has **no** internal dependencies on other ChannelHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
