//! Media Matcher Library
//!
//! A library for matching local media files against episode and movie
//! metadata using a prioritized cascade of fuzzy similarity metrics.

pub mod cli;
pub mod core;
pub mod error;
pub mod models;
pub mod utils;

pub use error::{Error, Result};
