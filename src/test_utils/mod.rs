//! Shared components between the crate's unit tests.
mod common;
pub mod mock_type_config;

pub use common::*;
pub use mock_type_config::*;
