//! Data model modules.

pub mod media;
