//! JSON recipe files
//!
//! A recipe names column roles, the ordered preprocessing steps and
//! optionally the model used by `validate`:
//!
//! ```json
//! {
//!   "roles": { "Sale_Price": "outcome", "PID": "id" },
//!   "steps": [
//!     { "kind": "log", "columns": { "by_name": ["Sale_Price"] }, "base": 10 },
//!     { "kind": "rare_pool", "columns": { "by_name": ["Neighborhood"] }, "threshold": 0.01 },
//!     { "kind": "encode", "columns": { "by_type": "nominal" } }
//!   ],
//!   "model": { "type": "knn", "neighbors": 5 }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::ModelSpec;
use crate::pipeline::recipe::Pipeline;
use crate::pipeline::selector::{Role, Roles};
use crate::pipeline::steps::StepSpec;

fn default_retain() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeConfig {
    #[serde(default)]
    pub roles: Roles,
    pub steps: Vec<StepSpec>,
    #[serde(default = "default_retain")]
    pub retain: bool,
    #[serde(default)]
    pub model: Option<ModelSpec>,
}

impl RecipeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), steps = config.steps.len(), "loaded recipe");
        Ok(config)
    }

    /// Make `column` the only outcome. Any previous outcome becomes a predictor.
    pub fn set_outcome(&mut self, column: &str) {
        let previous: Vec<String> = self
            .roles
            .with_role(Role::Outcome)
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        for name in previous {
            self.roles.assign(name, Role::Predictor);
        }
        self.roles.assign(column, Role::Outcome);
    }

    /// Build the pipeline, validating every step as it is added.
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new()
            .with_roles(self.roles.clone())
            .with_retain(self.retain);
        for step in &self.steps {
            pipeline.add_step(step.clone())?;
        }
        Ok(pipeline)
    }
}
