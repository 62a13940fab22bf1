//! Fluent construction of logical plans.
//!
//! ```
//! use planx_core::builder::PlanBuilder;
//! use planx_core::catalog::InMemoryCatalog;
//! use planx_core::expr::TableRef;
//! use planx_core::types::{DataType, Field, Schema};
//!
//! let mut catalog = InMemoryCatalog::new();
//! let table = TableRef::bare("integers");
//! catalog.add_table(&table, Schema::new(vec![Field::new("i", DataType::Int32, true)]), None);
//!
//! let plan = PlanBuilder::scan(&catalog, &table)
//!     .unwrap()
//!     .limit(0, Some(5))
//!     .build()
//!     .unwrap();
//! assert_eq!(plan.node_count(), 2);
//! ```

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::expr::{
    AggExpr, Expr, JoinType, LogicalOp, Operator, ScalarValue, SetOpKind, SortKey, TableRef,
    WriteKind,
};
use crate::plan::PlanNode;
use crate::types::Schema;

/// Stacks logical operators on top of a starting relation.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    root: PlanNode,
}

impl PlanBuilder {
    pub fn from_node(root: PlanNode) -> Self {
        Self { root }
    }

    /// Start from a full scan of a catalog table.
    pub fn scan(catalog: &dyn Catalog, table: &TableRef) -> Result<Self, PlanError> {
        let meta = catalog
            .get_table(table)
            .ok_or_else(|| PlanError::TableNotFound(table.to_string()))?;
        Ok(Self::from_node(PlanNode::logical(
            LogicalOp::Scan {
                table: table.clone(),
                schema: meta.schema,
                projection: None,
                predicate: None,
                statistics: meta.statistics,
            },
            vec![],
        )))
    }

    /// Start from a scan producing only the named columns, in that order.
    pub fn scan_columns(
        catalog: &dyn Catalog,
        table: &TableRef,
        columns: &[&str],
    ) -> Result<Self, PlanError> {
        let mut builder = Self::scan(catalog, table)?;
        if let Operator::Logical(LogicalOp::Scan {
            schema, projection, ..
        }) = &mut builder.root.op
        {
            let indices = columns
                .iter()
                .map(|c| {
                    schema
                        .index_of(c)
                        .ok_or_else(|| PlanError::ColumnNotFound(c.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            *projection = Some(indices);
        }
        Ok(builder)
    }

    pub fn values(schema: Schema, rows: Vec<Vec<ScalarValue>>) -> Self {
        Self::from_node(PlanNode::logical(LogicalOp::Values { schema, rows }, vec![]))
    }

    /// Column reference by name against the current output schema.
    pub fn col(&self, name: &str) -> Result<Expr, PlanError> {
        let schema = self.root.output_schema()?;
        let index = schema
            .index_of(name)
            .ok_or_else(|| PlanError::ColumnNotFound(name.to_string()))?;
        Ok(Expr::column(name, index as u32))
    }

    pub fn schema(&self) -> Result<Schema, PlanError> {
        self.root.output_schema()
    }

    fn wrap(self, op: LogicalOp) -> Self {
        Self::from_node(PlanNode::logical(op, vec![self.root]))
    }

    pub fn filter(self, predicate: Expr) -> Self {
        self.wrap(LogicalOp::Filter { predicate })
    }

    pub fn project(self, exprs: Vec<Expr>, aliases: Vec<String>) -> Self {
        self.wrap(LogicalOp::Project { exprs, aliases })
    }

    pub fn aggregate(self, group_by: Vec<Expr>, aggregates: Vec<AggExpr>) -> Self {
        self.wrap(LogicalOp::Aggregate {
            group_by,
            aggregates,
        })
    }

    pub fn sort(self, order: Vec<SortKey>) -> Self {
        self.wrap(LogicalOp::Sort { order })
    }

    pub fn limit(self, offset: u64, count: Option<u64>) -> Self {
        self.wrap(LogicalOp::Limit { offset, count })
    }

    pub fn sample(self, percentage: f64) -> Self {
        self.wrap(LogicalOp::Sample { percentage })
    }

    pub fn write(self, table: TableRef, kind: WriteKind) -> Self {
        self.wrap(LogicalOp::Write { table, kind })
    }

    /// Join with `right`; the condition refers to the concatenated schemas.
    pub fn join(self, right: PlanBuilder, join_type: JoinType, condition: Expr) -> Self {
        Self::from_node(PlanNode::logical(
            LogicalOp::Join {
                join_type,
                condition,
            },
            vec![self.root, right.root],
        ))
    }

    pub fn cross_product(self, right: PlanBuilder) -> Self {
        Self::from_node(PlanNode::logical(
            LogicalOp::CrossProduct,
            vec![self.root, right.root],
        ))
    }

    pub fn set_operation(self, op: SetOpKind, others: Vec<PlanBuilder>) -> Self {
        let mut children = vec![self.root];
        children.extend(others.into_iter().map(|b| b.root));
        Self::from_node(PlanNode::logical(LogicalOp::SetOperation { op }, children))
    }

    /// Validate and return the plan.
    pub fn build(self) -> Result<PlanNode, PlanError> {
        self.root.output_schema()?;
        Ok(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::expr::{BinaryOp, LogicalOpKind, OpKind};
    use crate::types::{DataType, Field};

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_table(
            &TableRef::bare("people"),
            Schema::new(vec![
                Field::new("id", DataType::Int64, false),
                Field::new("name", DataType::Varchar, true),
                Field::new("age", DataType::Int32, true),
            ]),
            None,
        );
        catalog
    }

    #[test]
    fn test_unknown_table() {
        let err = PlanBuilder::scan(&catalog(), &TableRef::bare("missing")).unwrap_err();
        assert_eq!(err, PlanError::TableNotFound("main.missing".into()));
    }

    #[test]
    fn test_scan_columns_and_filter() {
        let builder =
            PlanBuilder::scan_columns(&catalog(), &TableRef::bare("people"), &["age", "id"])
                .unwrap();
        let age = builder.col("age").unwrap();
        assert_eq!(age, Expr::column("age", 0));
        let plan = builder
            .filter(Expr::binary(
                BinaryOp::GtEq,
                age,
                Expr::literal(ScalarValue::Int32(18)),
            ))
            .build()
            .unwrap();
        assert_eq!(plan.kind(), OpKind::Logical(LogicalOpKind::Filter));
        assert_eq!(
            plan.output_schema().unwrap().names(),
            vec!["age".to_string(), "id".to_string()]
        );
    }

    #[test]
    fn test_build_validates() {
        let plan = PlanBuilder::scan(&catalog(), &TableRef::bare("people"))
            .unwrap()
            .project(vec![Expr::column("x", 9)], vec!["x".into()])
            .build();
        assert!(plan.is_err());
    }
}
