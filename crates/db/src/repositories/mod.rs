//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod classification_repo;
pub mod envelope_repo;
pub mod snapshot_repo;
pub mod video_repo;

pub use classification_repo::ClassificationRepo;
pub use envelope_repo::EnvelopeRepo;
pub use snapshot_repo::SnapshotRepo;
pub use video_repo::VideoRepo;
