//! Command implementations.
//!
//! - [`dev`] - development server with hot module replacement
//! - [`check`] - configuration validation

pub mod check;
pub mod dev;

pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
