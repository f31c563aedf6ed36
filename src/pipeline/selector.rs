//! Column selection and column roles
//!
//! A [`Selector`] is resolved once per step at fit time against the
//! intermediate dataset the step sees. The fitted step stores the resulting
//! column names and never re-resolves them.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::dataset::ColumnType;

/// Role a column plays in the modelling workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Outcome,
    Predictor,
    Id,
}

/// Role assignments by column name. Unassigned columns are predictors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roles(BTreeMap<String, Role>);

impl Roles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, column: impl Into<String>, role: Role) {
        self.0.insert(column.into(), role);
    }

    pub fn role_of(&self, column: &str) -> Role {
        self.0.get(column).copied().unwrap_or(Role::Predictor)
    }

    /// Columns explicitly assigned `role`, in name order.
    pub fn with_role(&self, role: Role) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Role)> {
        self.0.iter().map(|(name, role)| (name.as_str(), *role))
    }
}

/// Which columns a step applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// Explicit column names; every name must exist.
    ByName(Vec<String>),
    ByRole(Role),
    ByType(ColumnType),
    /// Columns whose name starts with the prefix, e.g. dummies of one variable.
    ByPrefix(String),
    /// Intersection of all inner selectors.
    All(Vec<Selector>),
}

impl Selector {
    pub fn name(column: impl Into<String>) -> Self {
        Selector::ByName(vec![column.into()])
    }

    pub fn names<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selector::ByName(columns.into_iter().map(Into::into).collect())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Selector::ByPrefix(prefix.into())
    }

    pub fn numeric_predictors() -> Self {
        Selector::All(vec![
            Selector::ByType(ColumnType::Numeric),
            Selector::ByRole(Role::Predictor),
        ])
    }

    pub fn nominal_predictors() -> Self {
        Selector::All(vec![
            Selector::ByType(ColumnType::Nominal),
            Selector::ByRole(Role::Predictor),
        ])
    }

    /// Resolve against a dataset schema. Fails with a configuration error when
    /// nothing matches or a named column does not exist.
    pub fn resolve(&self, df: &DataFrame, roles: &Roles, step: &str) -> Result<Vec<String>> {
        let matched = self.matches(df, roles, step)?;
        if matched.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "Step '{}': selector {} matched no columns",
                step, self
            )));
        }
        Ok(matched)
    }

    fn matches(&self, df: &DataFrame, roles: &Roles, step: &str) -> Result<Vec<String>> {
        let columns = df.get_columns();
        let matched = match self {
            Selector::ByName(names) => {
                for name in names {
                    if df.column(name).is_err() {
                        return Err(PipelineError::Configuration(format!(
                            "Step '{}': column '{}' not found in dataset",
                            step, name
                        )));
                    }
                }
                let mut unique: Vec<String> = Vec::with_capacity(names.len());
                for name in names {
                    if !unique.contains(name) {
                        unique.push(name.clone());
                    }
                }
                unique
            }
            Selector::ByRole(role) => columns
                .iter()
                .filter(|c| roles.role_of(c.name().as_str()) == *role)
                .map(|c| c.name().to_string())
                .collect(),
            Selector::ByType(kind) => columns
                .iter()
                .filter(|c| ColumnType::of(c.dtype()) == Some(*kind))
                .map(|c| c.name().to_string())
                .collect(),
            Selector::ByPrefix(prefix) => columns
                .iter()
                .filter(|c| c.name().as_str().starts_with(prefix.as_str()))
                .map(|c| c.name().to_string())
                .collect(),
            Selector::All(inner) => {
                let mut current: Option<Vec<String>> = None;
                for selector in inner {
                    let next = selector.matches(df, roles, step)?;
                    current = Some(match current {
                        None => next,
                        Some(prev) => prev.into_iter().filter(|c| next.contains(c)).collect(),
                    });
                }
                current.unwrap_or_default()
            }
        };
        Ok(matched)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::ByName(names) => write!(f, "names({})", names.join(", ")),
            Selector::ByRole(role) => write!(f, "role({:?})", role),
            Selector::ByType(kind) => write!(f, "type({})", kind),
            Selector::ByPrefix(prefix) => write!(f, "prefix({})", prefix),
            Selector::All(inner) => {
                let parts: Vec<String> = inner.iter().map(|s| s.to_string()).collect();
                write!(f, "all({})", parts.join(" & "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DataFrame, Roles) {
        let df = df! {
            "Sale_Price" => [100.0f64, 200.0, 300.0],
            "Gr_Liv_Area" => [1000i64, 1500, 2000],
            "Neighborhood" => ["A", "B", "A"],
            "Bldg_Type_Duplex" => [0.0f64, 1.0, 0.0],
            "Bldg_Type_Twnhs" => [1.0f64, 0.0, 0.0],
        }
        .unwrap();
        let mut roles = Roles::new();
        roles.assign("Sale_Price", Role::Outcome);
        (df, roles)
    }

    #[test]
    fn test_by_name_preserves_listed_order() {
        let (df, roles) = sample();
        let sel = Selector::names(["Neighborhood", "Gr_Liv_Area"]);
        let cols = sel.resolve(&df, &roles, "s").unwrap();
        assert_eq!(cols, vec!["Neighborhood", "Gr_Liv_Area"]);
    }

    #[test]
    fn test_by_name_missing_column_is_configuration_error() {
        let (df, roles) = sample();
        let err = Selector::name("Lot_Area").resolve(&df, &roles, "s").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_numeric_predictors_excludes_outcome() {
        let (df, roles) = sample();
        let cols = Selector::numeric_predictors()
            .resolve(&df, &roles, "s")
            .unwrap();
        assert_eq!(
            cols,
            vec!["Gr_Liv_Area", "Bldg_Type_Duplex", "Bldg_Type_Twnhs"]
        );
    }

    #[test]
    fn test_prefix_selects_dummies() {
        let (df, roles) = sample();
        let cols = Selector::prefix("Bldg_Type_")
            .resolve(&df, &roles, "s")
            .unwrap();
        assert_eq!(cols.len(), 2);
    }

    #[test]
    fn test_zero_matches_is_configuration_error() {
        let (df, roles) = sample();
        let err = Selector::ByRole(Role::Id)
            .resolve(&df, &roles, "step_x")
            .unwrap_err();
        assert!(err.to_string().contains("matched no columns"));
    }

    #[test]
    fn test_selector_json_form() {
        let sel: Selector = serde_json::from_str(r#"{"by_name": ["a", "b"]}"#).unwrap();
        assert_eq!(sel, Selector::names(["a", "b"]));
        let sel: Selector = serde_json::from_str(r#"{"by_type": "nominal"}"#).unwrap();
        assert_eq!(sel, Selector::ByType(ColumnType::Nominal));
    }
}
