//! One-shot reclassification job for the performance engine.

pub mod config;
pub mod reclassify;
