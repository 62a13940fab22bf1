//! The explain result: a two-column table of `explain_key` / `explain_value`
//! rows, one per requested plan aspect.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const LOGICAL_PLAN_KEY: &str = "logical_plan";
pub const PHYSICAL_PLAN_KEY: &str = "physical_plan";

/// Which plan renderings an explain request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Logical,
    #[default]
    Physical,
    /// Logical first, then physical.
    All,
}

impl PlanKind {
    pub fn includes_logical(self) -> bool {
        matches!(self, PlanKind::Logical | PlanKind::All)
    }

    pub fn includes_physical(self) -> bool {
        matches!(self, PlanKind::Physical | PlanKind::All)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainRow {
    pub explain_key: String,
    pub explain_value: String,
}

/// Immutable result of one explain request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExplainDocument {
    rows: Vec<ExplainRow>,
}

impl ExplainDocument {
    pub(crate) fn new(rows: Vec<ExplainRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ExplainRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of the row with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.explain_key == key)
            .map(|r| r.explain_value.as_str())
    }

    pub fn physical_plan(&self) -> Option<&str> {
        self.get(PHYSICAL_PLAN_KEY)
    }

    pub fn logical_plan(&self) -> Option<&str> {
        self.get(LOGICAL_PLAN_KEY)
    }
}

impl fmt::Display for ExplainDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}:", row.explain_key)?;
            write!(f, "{}", row.explain_value)?;
        }
        Ok(())
    }
}
