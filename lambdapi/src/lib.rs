//! A dependently typed lambda calculus, checked bidirectionally and
//! normalised by evaluation.

// Supporting modules
pub mod env;
pub mod files;
pub mod source;
pub mod symbol;

// Intermediate languages
pub mod core;
pub mod surface;

// Top level driver
mod driver;

pub use crate::driver::{Driver, Error, Status};
