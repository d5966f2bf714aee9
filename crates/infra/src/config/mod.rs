//! Client configuration sources
//!
//! Resolves a [`momo_domain::MomoConfig`] from `MOMO_*` environment
//! variables (with `.env` support) or a JSON/TOML file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
