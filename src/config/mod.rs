// src/config/mod.rs

//! Project descriptor loading and validation.
//!
//! - [`model`] holds the serde types for the TOML descriptor.
//! - [`validate`] checks a `RawProject` and resolves its paths into a
//!   [`Project`].
//! - [`develop`] decodes the per-service `x-develop` watch triggers.

pub mod develop;
pub mod loader;
pub mod model;
pub mod validate;

pub use develop::{load_development_config, DevelopmentConfig, Trigger, DEVELOP_EXTENSION};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{BuildConfig, Project, RawProject, ServiceConfig, VolumeConfig, VolumeType};
