//! Pipeline module - fit/apply preprocessing of tabular data

pub mod dataset;
pub mod loader;
pub mod recipe;
pub mod selector;
pub mod steps;

pub use dataset::ColumnType;
pub use loader::*;
pub use recipe::{FittedPipeline, Pipeline, Transformed};
pub use selector::{Role, Roles, Selector};
pub use steps::{Apply, Basis, FittedStep, StepSpec};
