//! Performance baseline and envelope engine.
//!
//! Pure statistics live in [`stats`], [`envelope`], [`baseline`],
//! [`backfill`], [`channel_envelope`] and [`classification`]; [`engine`]
//! wires them to the injected [`stores`].

pub mod backfill;
pub mod baseline;
pub mod cache;
pub mod channel_envelope;
pub mod classification;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod stats;
pub mod stores;
pub mod threshold_validation;
pub mod types;
