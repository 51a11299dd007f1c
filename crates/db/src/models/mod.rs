//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` row struct matching the table, an
//! insert DTO where rows are written from Rust, and the conversion into the
//! engine's own types.

pub mod classification;
pub mod envelope;
pub mod snapshot;
pub mod video;
