//! Shared library for `plan-tracker`
//! Contains the academic-state persistence layer used by the CLI

#[macro_use]
pub mod logger;

pub mod core;

pub use core::{config, get_version};
