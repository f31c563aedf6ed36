//! Report module - summarizing fitted pipelines and model assessment

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
