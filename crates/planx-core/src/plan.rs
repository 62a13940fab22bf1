//! # Plan Trees
//!
//! A `PlanNode` owns its operator and its ordered children, so a plan is always
//! a finite, rooted, acyclic tree. The same type holds logical plans (input to
//! the translator, output of the consumer) and physical plans (output of the
//! physical planner, input to the renderer).

use crate::error::PlanError;
use crate::expr::{JoinType, LogicalOp, OpKind, Operator, PhysicalOp};
use crate::types::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};

/// One operator together with its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub op: Operator,
    pub children: Vec<PlanNode>,
    /// Estimated output cardinality, filled in by the physical planner when
    /// statistics are available.
    pub estimated_rows: Option<u64>,
}

impl PlanNode {
    pub fn new(op: Operator, children: Vec<PlanNode>) -> Self {
        Self {
            op,
            children,
            estimated_rows: None,
        }
    }

    pub fn logical(op: LogicalOp, children: Vec<PlanNode>) -> Self {
        Self::new(Operator::Logical(op), children)
    }

    pub fn physical(op: PhysicalOp, children: Vec<PlanNode>) -> Self {
        Self::new(Operator::Physical(op), children)
    }

    pub fn with_estimated_rows(mut self, rows: Option<u64>) -> Self {
        self.estimated_rows = rows;
        self
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Total number of nodes in this tree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PlanNode::node_count).sum::<usize>()
    }

    /// Pre-order list of operator kinds, used to compare tree shapes.
    pub fn shape(&self) -> Vec<(OpKind, usize)> {
        let mut out = Vec::new();
        self.collect_shape(&mut out);
        out
    }

    fn collect_shape(&self, out: &mut Vec<(OpKind, usize)>) {
        out.push((self.kind(), self.children.len()));
        for c in &self.children {
            c.collect_shape(out);
        }
    }

    fn expect_children(&self, op: &'static str, expected: usize) -> Result<(), PlanError> {
        if self.children.len() != expected {
            return Err(PlanError::ArityMismatch {
                op,
                expected,
                actual: self.children.len(),
            });
        }
        Ok(())
    }

    /// Output schema of a logical plan.
    ///
    /// Walks the whole tree, so it doubles as validation: child counts, column
    /// references and expression types are all checked.
    pub fn output_schema(&self) -> Result<Schema, PlanError> {
        let op = match &self.op {
            Operator::Logical(op) => op,
            Operator::Physical(p) => {
                return Err(PlanError::InvalidPlan(format!(
                    "output schema requested for physical operator {:?}",
                    p.kind()
                )))
            }
        };
        match op {
            LogicalOp::Scan {
                schema,
                projection,
                predicate,
                ..
            } => {
                self.expect_children("Scan", 0)?;
                if let Some(p) = predicate {
                    p.data_type(schema)?;
                }
                match projection {
                    Some(indices) => schema.project(indices),
                    None => Ok(schema.clone()),
                }
            }
            LogicalOp::Values { schema, rows } => {
                self.expect_children("Values", 0)?;
                if let Some(row) = rows.iter().find(|r| r.len() != schema.len()) {
                    return Err(PlanError::InvalidPlan(format!(
                        "values row has {} columns, schema has {}",
                        row.len(),
                        schema.len()
                    )));
                }
                Ok(schema.clone())
            }
            LogicalOp::Filter { predicate } => {
                self.expect_children("Filter", 1)?;
                let input = self.children[0].output_schema()?;
                match predicate.data_type(&input)? {
                    DataType::Boolean | DataType::Null => Ok(input),
                    other => Err(PlanError::TypeMismatch(format!(
                        "filter predicate must be BOOLEAN, got {}",
                        other
                    ))),
                }
            }
            LogicalOp::Project { exprs, aliases } => {
                self.expect_children("Project", 1)?;
                if !aliases.is_empty() && aliases.len() != exprs.len() {
                    return Err(PlanError::InvalidPlan(format!(
                        "{} projection aliases for {} expressions",
                        aliases.len(),
                        exprs.len()
                    )));
                }
                let input = self.children[0].output_schema()?;
                let fields = exprs
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        let name = aliases.get(i).cloned().unwrap_or_else(|| e.output_name());
                        Ok(Field::new(name, e.data_type(&input)?, true))
                    })
                    .collect::<Result<Vec<_>, PlanError>>()?;
                Ok(Schema::new(fields))
            }
            LogicalOp::Join {
                join_type,
                condition,
            } => {
                self.expect_children("Join", 2)?;
                let left = self.children[0].output_schema()?;
                let right = self.children[1].output_schema()?;
                condition.data_type(&left.join(&right))?;
                Ok(match join_type {
                    JoinType::Inner => left.join(&right),
                    JoinType::Left | JoinType::Single => left.join(&right.to_nullable()),
                    JoinType::Right => left.to_nullable().join(&right),
                    JoinType::Full => left.to_nullable().join(&right.to_nullable()),
                    JoinType::Semi | JoinType::Anti => left,
                })
            }
            LogicalOp::CrossProduct => {
                self.expect_children("CrossProduct", 2)?;
                let left = self.children[0].output_schema()?;
                let right = self.children[1].output_schema()?;
                Ok(left.join(&right))
            }
            LogicalOp::Aggregate {
                group_by,
                aggregates,
            } => {
                self.expect_children("Aggregate", 1)?;
                let input = self.children[0].output_schema()?;
                let mut fields = Vec::with_capacity(group_by.len() + aggregates.len());
                for g in group_by {
                    fields.push(Field::new(g.output_name(), g.data_type(&input)?, true));
                }
                for a in aggregates {
                    fields.push(Field::new(a.to_string(), a.data_type(&input)?, true));
                }
                Ok(Schema::new(fields))
            }
            LogicalOp::Sort { order } => {
                self.expect_children("Sort", 1)?;
                let input = self.children[0].output_schema()?;
                for key in order {
                    key.expr.data_type(&input)?;
                }
                Ok(input)
            }
            LogicalOp::Limit { .. } => {
                self.expect_children("Limit", 1)?;
                self.children[0].output_schema()
            }
            LogicalOp::Sample { percentage } => {
                self.expect_children("Sample", 1)?;
                if !(0.0..=100.0).contains(percentage) {
                    return Err(PlanError::InvalidPlan(format!(
                        "sample percentage {} outside [0, 100]",
                        percentage
                    )));
                }
                self.children[0].output_schema()
            }
            LogicalOp::SetOperation { .. } => {
                if self.children.len() < 2 {
                    return Err(PlanError::ArityMismatch {
                        op: "SetOperation",
                        expected: 2,
                        actual: self.children.len(),
                    });
                }
                let first = self.children[0].output_schema()?;
                for child in &self.children[1..] {
                    let other = child.output_schema()?;
                    if other.len() != first.len() {
                        return Err(PlanError::InvalidPlan(format!(
                            "set operation inputs have {} and {} columns",
                            first.len(),
                            other.len()
                        )));
                    }
                }
                Ok(first)
            }
            LogicalOp::Write { .. } => {
                self.expect_children("Write", 1)?;
                self.children[0].output_schema()?;
                Ok(Schema::new(vec![Field::new("Count", DataType::Int64, false)]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Expr, ScalarValue, TableRef};

    fn scan() -> PlanNode {
        PlanNode::logical(
            LogicalOp::Scan {
                table: TableRef::bare("t"),
                schema: Schema::new(vec![
                    Field::new("a", DataType::Int32, false),
                    Field::new("b", DataType::Varchar, true),
                ]),
                projection: Some(vec![1]),
                predicate: None,
                statistics: None,
            },
            vec![],
        )
    }

    #[test]
    fn test_projection_narrows_scan_schema() {
        assert_eq!(scan().output_schema().unwrap().names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_out_of_range_reference_is_rejected() {
        let filter = PlanNode::logical(
            LogicalOp::Filter {
                predicate: Expr::binary(
                    BinaryOp::Eq,
                    Expr::column("a", 3),
                    Expr::literal(ScalarValue::Int32(1)),
                ),
            },
            vec![scan()],
        );
        assert!(matches!(
            filter.output_schema(),
            Err(PlanError::ColumnIndexOutOfRange { index: 3, width: 1 })
        ));
    }

    #[test]
    fn test_join_arity_checked() {
        let join = PlanNode::logical(LogicalOp::CrossProduct, vec![scan()]);
        assert!(matches!(
            join.output_schema(),
            Err(PlanError::ArityMismatch { expected: 2, actual: 1, .. })
        ));
        let ok = PlanNode::logical(LogicalOp::CrossProduct, vec![scan(), scan()]);
        assert_eq!(ok.output_schema().unwrap().len(), 2);
        assert_eq!(ok.node_count(), 3);
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let plan = PlanNode::logical(
            LogicalOp::Limit {
                offset: 0,
                count: Some(10),
            },
            vec![scan()],
        )
        .with_estimated_rows(Some(10));
        let json = serde_json::to_string(&plan).unwrap();
        let back: PlanNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
