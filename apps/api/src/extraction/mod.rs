// Resume field extraction: pattern registry, segmentation, per-field engine.
// Conversion and extraction are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod convert;
pub mod engine;
pub mod field;
pub mod handlers;
pub mod registry;
pub mod segmenter;
