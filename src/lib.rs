//! prepflow: Leakage-Free Preprocessing Library
//!
//! Ordered preprocessing steps (log transform, rare-level pooling, dummy
//! encoding, centering/scaling, basis expansion, interactions) are fit once
//! on a reference dataset and applied unchanged to any other dataset. A
//! small modelling workflow cross-validates a recipe with linear or KNN
//! regression.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod resample;
pub mod utils;
pub mod workflow;

pub use error::{PipelineError, RangeWarning, Result, WarningKind};
