//! Utility types and functions for the renderer.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, plus [`Ray`] and the optics helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
