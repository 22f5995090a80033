//! Core module: plan models, state codec, storage backends, and progress

pub mod codec;
pub mod config;
pub mod models;
pub mod progress;
pub mod storage;
pub mod sync;

/// Returns the current version of the `plan-tracker` crate
#[must_use]
pub const fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
