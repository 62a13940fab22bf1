//! # Physical Planning
//!
//! Maps a logical plan onto the physical operators the host engine would run,
//! one node at a time and bottom-up. There is no search: every logical
//! operator has exactly one implementation, picked by shape.
//!
//! ## Implementation Rules
//!
//! | logical                      | physical                              |
//! |------------------------------|---------------------------------------|
//! | Scan                         | SeqScan                               |
//! | Values                       | ColumnDataScan                        |
//! | Limit over Sort (bounded)    | TopN (the Sort is absorbed)           |
//! | Limit, offset 0              | StreamingLimit                        |
//! | Limit, offset > 0            | Limit                                 |
//! | Sort                         | OrderBy                               |
//! | Aggregate without groups     | UngroupedAggregate                    |
//! | Aggregate with groups        | HashGroupBy                           |
//! | Join with a `col = col` key  | HashJoin                              |
//! | Join without one             | NestedLoopJoin                        |
//! | Union (all / distinct)       | Union                                 |
//! | Except / Intersect           | HashJoin (Anti / Semi) on all columns |
//! | Write                        | Insert / CreateTableAs / Delete       |
//!
//! ## Cardinality
//!
//! When the scans carry statistics, every node gets an estimated row count
//! derived with the formulas in [`crate::stats`]. Limit-like nodes (StreamingLimit,
//! Limit, TopN) and writes are never annotated, though the bound they impose
//! still flows up to their parents.

use crate::error::PlanError;
use crate::expr::{
    BinaryOp, Expr, JoinType, LogicalOp, Operator, PhysicalOp, SetOpKind, WriteKind,
};
use crate::plan::PlanNode;
use crate::stats::{self, Statistics};
use crate::types::Schema;
use tracing::{debug, trace};

/// Produce the physical plan for a logical plan.
pub fn create_physical_plan(plan: &PlanNode) -> Result<PlanNode, PlanError> {
    plan.output_schema()?;
    debug!("Creating physical plan for {} logical nodes", plan.node_count());
    let (physical, stats) = plan_node(plan)?;
    debug!(
        "Physical plan has {} nodes, estimated root rows={:?}",
        physical.node_count(),
        stats.as_ref().map(Statistics::estimated_rows)
    );
    Ok(physical)
}

type Planned = (PlanNode, Option<Statistics>);

fn annotated(op: PhysicalOp, children: Vec<PlanNode>, stats: Option<Statistics>) -> Planned {
    let rows = stats.as_ref().map(Statistics::estimated_rows);
    (PlanNode::physical(op, children).with_estimated_rows(rows), stats)
}

fn plan_children(node: &PlanNode) -> Result<(Vec<PlanNode>, Vec<Option<Statistics>>), PlanError> {
    let mut children = Vec::with_capacity(node.children.len());
    let mut stats = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let (c, s) = plan_node(child)?;
        children.push(c);
        stats.push(s);
    }
    Ok((children, stats))
}

fn cap_rows(stats: Option<Statistics>, offset: u64, count: Option<u64>) -> Option<Statistics> {
    stats.map(|s| {
        let remaining = (s.row_count - offset as f64).max(0.0);
        let rows = match count {
            Some(c) => remaining.min(c as f64),
            None => remaining,
        };
        let ratio = if s.row_count > 0.0 { rows / s.row_count } else { 1.0 };
        Statistics {
            row_count: rows,
            total_size_bytes: s.total_size_bytes * ratio,
            column_stats: s.column_stats,
        }
    })
}

fn plan_node(node: &PlanNode) -> Result<Planned, PlanError> {
    let op = match &node.op {
        Operator::Logical(op) => op,
        Operator::Physical(p) => {
            return Err(PlanError::InvalidPlan(format!(
                "plan already contains physical operator {:?}",
                p.kind()
            )))
        }
    };
    trace!("Planning {:?}", op.kind());

    match op {
        LogicalOp::Scan {
            table,
            predicate,
            statistics,
            ..
        } => {
            let columns = node.output_schema()?.names();
            let stats = match (statistics, predicate) {
                (Some(s), Some(p)) => {
                    Some(stats::derive_filter_stats(s, stats::estimate_selectivity(p, s)))
                }
                (s, _) => s.clone(),
            };
            Ok(annotated(
                PhysicalOp::SeqScan {
                    table: table.clone(),
                    columns,
                    predicate: predicate.clone(),
                },
                vec![],
                stats,
            ))
        }
        LogicalOp::Values { schema, rows } => {
            let n = rows.len() as f64;
            let stats = Statistics::new(n, n * 8.0 * schema.len() as f64);
            Ok(annotated(
                PhysicalOp::ColumnDataScan {
                    columns: schema.names(),
                    rows: rows.len(),
                },
                vec![],
                Some(stats),
            ))
        }
        LogicalOp::Filter { predicate } => {
            let (children, mut stats) = plan_children(node)?;
            let stats = stats.remove(0).map(|s| {
                stats::derive_filter_stats(&s, stats::estimate_selectivity(predicate, &s))
            });
            Ok(annotated(
                PhysicalOp::Filter {
                    predicate: predicate.clone(),
                },
                children,
                stats,
            ))
        }
        LogicalOp::Project { exprs, .. } => {
            let (children, mut stats) = plan_children(node)?;
            Ok(annotated(
                PhysicalOp::Projection {
                    exprs: exprs.clone(),
                },
                children,
                stats.remove(0),
            ))
        }
        LogicalOp::Limit { offset, count } => plan_limit(node, *offset, *count),
        LogicalOp::Sort { order } => {
            let (children, mut stats) = plan_children(node)?;
            Ok(annotated(
                PhysicalOp::OrderBy {
                    order: order.clone(),
                },
                children,
                stats.remove(0),
            ))
        }
        LogicalOp::Aggregate {
            group_by,
            aggregates,
        } => {
            let (children, mut stats) = plan_children(node)?;
            let group_cols: Vec<String> = group_by.iter().map(Expr::output_name).collect();
            let stats = stats
                .remove(0)
                .map(|s| stats::derive_aggregate_stats(&s, &group_cols));
            let op = if group_by.is_empty() {
                PhysicalOp::UngroupedAggregate {
                    aggregates: aggregates.clone(),
                }
            } else {
                PhysicalOp::HashGroupBy {
                    group_by: group_by.clone(),
                    aggregates: aggregates.clone(),
                }
            };
            Ok(annotated(op, children, stats))
        }
        LogicalOp::Join {
            join_type,
            condition,
        } => {
            let (children, stats) = plan_children(node)?;
            let stats = join_stats(*join_type, condition, &stats[0], &stats[1]);
            let op = if condition.has_equi_conjunct() {
                PhysicalOp::HashJoin {
                    join_type: *join_type,
                    condition: condition.clone(),
                }
            } else {
                PhysicalOp::NestedLoopJoin {
                    join_type: *join_type,
                    condition: condition.clone(),
                }
            };
            Ok(annotated(op, children, stats))
        }
        LogicalOp::CrossProduct => {
            let (children, stats) = plan_children(node)?;
            let stats = match (&stats[0], &stats[1]) {
                (Some(l), Some(r)) => Some(stats::derive_cross_stats(l, r)),
                _ => None,
            };
            Ok(annotated(PhysicalOp::CrossProduct, children, stats))
        }
        LogicalOp::SetOperation { op } => plan_set_operation(node, *op),
        LogicalOp::Write { table, kind } => {
            let (children, _) = plan_children(node)?;
            let table = table.clone();
            let op = match kind {
                WriteKind::Insert => PhysicalOp::Insert { table },
                WriteKind::CreateTableAs => PhysicalOp::CreateTableAs { table },
                WriteKind::Delete => PhysicalOp::Delete { table },
            };
            Ok((PlanNode::physical(op, children), None))
        }
        LogicalOp::Sample { percentage } => {
            let (children, mut stats) = plan_children(node)?;
            let stats = stats
                .remove(0)
                .map(|s| stats::derive_filter_stats(&s, percentage / 100.0));
            Ok(annotated(
                PhysicalOp::Sample {
                    percentage: *percentage,
                },
                children,
                stats,
            ))
        }
    }
}

fn plan_limit(node: &PlanNode, offset: u64, count: Option<u64>) -> Result<Planned, PlanError> {
    let input = &node.children[0];
    if let (Operator::Logical(LogicalOp::Sort { order }), Some(count)) = (&input.op, count) {
        let (children, mut stats) = plan_children(input)?;
        let stats = cap_rows(stats.remove(0), offset, Some(count));
        let op = PhysicalOp::TopN {
            order: order.clone(),
            offset,
            count,
        };
        return Ok((PlanNode::physical(op, children), stats));
    }

    let (children, mut stats) = plan_children(node)?;
    let stats = cap_rows(stats.remove(0), offset, count);
    let op = if offset == 0 {
        PhysicalOp::StreamingLimit { count }
    } else {
        PhysicalOp::Limit { offset, count }
    };
    Ok((PlanNode::physical(op, children), stats))
}

fn join_stats(
    join_type: JoinType,
    condition: &Expr,
    left: &Option<Statistics>,
    right: &Option<Statistics>,
) -> Option<Statistics> {
    let (l, r) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return None,
    };
    let joined = stats::derive_join_stats(l, r, &stats::equi_join_columns(condition));
    let floor = match join_type {
        JoinType::Inner => return Some(joined),
        JoinType::Semi | JoinType::Anti => return Some(l.clone()),
        JoinType::Left | JoinType::Single => l.row_count,
        JoinType::Right => r.row_count,
        JoinType::Full => l.row_count + r.row_count,
    };
    Some(Statistics {
        row_count: joined.row_count.max(floor),
        ..joined
    })
}

/// `left.i = right.i` for every column position.
fn all_columns_equal(left: &Schema, right: &Schema) -> Expr {
    let width = left.len() as u32;
    let mut conjuncts: Vec<Expr> = left
        .fields
        .iter()
        .zip(right.fields.iter())
        .enumerate()
        .map(|(i, (l, r))| {
            Expr::binary(
                BinaryOp::Eq,
                Expr::column(l.name.clone(), i as u32),
                Expr::column(r.name.clone(), width + i as u32),
            )
        })
        .collect();
    if conjuncts.len() == 1 {
        conjuncts.remove(0)
    } else {
        Expr::And(conjuncts)
    }
}

fn plan_set_operation(node: &PlanNode, op: SetOpKind) -> Result<Planned, PlanError> {
    let (children, stats) = plan_children(node)?;
    match op {
        SetOpKind::UnionAll | SetOpKind::UnionDistinct => {
            let stats = stats
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .map(|s| stats::derive_union_stats(&s));
            Ok(annotated(
                PhysicalOp::Union {
                    all: op == SetOpKind::UnionAll,
                },
                children,
                stats,
            ))
        }
        SetOpKind::Except | SetOpKind::Intersect => {
            let join_type = if op == SetOpKind::Except {
                JoinType::Anti
            } else {
                JoinType::Semi
            };
            let left_schema = node.children[0].output_schema()?;
            let mut children = children.into_iter();
            let mut stats = stats.into_iter();
            let mut acc = children
                .next()
                .ok_or_else(|| PlanError::InvalidPlan("set operation without inputs".into()))?;
            let mut acc_stats = stats.next().flatten();
            // More than two inputs fold left: ((a - b) - c).
            for (right, (right_stats, right_node)) in children
                .zip(stats.zip(node.children.iter().skip(1)))
            {
                let right_schema = right_node.output_schema()?;
                let condition = all_columns_equal(&left_schema, &right_schema);
                acc_stats = match (acc_stats, right_stats) {
                    (Some(l), Some(r)) if join_type == JoinType::Semi => {
                        let rows = l.row_count.min(r.row_count);
                        Some(Statistics { row_count: rows, ..l })
                    }
                    (l, _) => l,
                };
                let (joined, _) = annotated(
                    PhysicalOp::HashJoin {
                        join_type,
                        condition,
                    },
                    vec![acc, right],
                    acc_stats.clone(),
                );
                acc = joined;
            }
            Ok((acc, acc_stats))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PlanBuilder;
    use crate::catalog::InMemoryCatalog;
    use crate::expr::{
        AggExpr, AggFunc, PhysicalOpKind, OpKind, ScalarValue, SortKey, TableRef,
    };
    use crate::stats::ColumnStatistics;
    use crate::types::{DataType, Field};

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_table(
            &TableRef::bare("integers"),
            Schema::new(vec![Field::new("i", DataType::Int32, true)]),
            None,
        );
        catalog.add_table(
            &TableRef::bare("orders"),
            Schema::new(vec![
                Field::new("o_id", DataType::Int64, false),
                Field::new("o_custkey", DataType::Int64, false),
            ]),
            Some(
                Statistics::new(1000.0, 16_000.0)
                    .with_column("o_custkey", ColumnStatistics::new(100.0, 0.0)),
            ),
        );
        catalog.add_table(
            &TableRef::bare("customer"),
            Schema::new(vec![Field::new("c_custkey", DataType::Int64, false)]),
            Some(
                Statistics::new(100.0, 800.0)
                    .with_column("c_custkey", ColumnStatistics::new(100.0, 0.0)),
            ),
        );
        catalog
    }

    fn kinds(plan: &PlanNode) -> Vec<OpKind> {
        plan.shape().into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_limit_without_offset_streams() {
        let plan = PlanBuilder::scan(&catalog(), &TableRef::bare("integers"))
            .unwrap()
            .limit(0, Some(5))
            .build()
            .unwrap();
        let physical = create_physical_plan(&plan).unwrap();
        assert_eq!(
            kinds(&physical),
            vec![
                OpKind::Physical(PhysicalOpKind::StreamingLimit),
                OpKind::Physical(PhysicalOpKind::SeqScan),
            ]
        );
        assert_eq!(physical.estimated_rows, None);
    }

    #[test]
    fn test_limit_over_sort_becomes_top_n() {
        let builder = PlanBuilder::scan(&catalog(), &TableRef::bare("integers")).unwrap();
        let key = SortKey {
            expr: builder.col("i").unwrap(),
            ascending: false,
            nulls_first: false,
        };
        let plan = builder.sort(vec![key]).limit(2, Some(10)).build().unwrap();
        let physical = create_physical_plan(&plan).unwrap();
        assert_eq!(
            kinds(&physical),
            vec![
                OpKind::Physical(PhysicalOpKind::TopN),
                OpKind::Physical(PhysicalOpKind::SeqScan),
            ]
        );
    }

    #[test]
    fn test_join_selection_and_cardinality() {
        let orders = PlanBuilder::scan(&catalog(), &TableRef::bare("orders")).unwrap();
        let customer = PlanBuilder::scan(&catalog(), &TableRef::bare("customer")).unwrap();
        let cond = Expr::binary(
            BinaryOp::Eq,
            Expr::column("o_custkey", 1),
            Expr::column("c_custkey", 2),
        );
        let plan = orders
            .join(customer, JoinType::Inner, cond)
            .build()
            .unwrap();
        let physical = create_physical_plan(&plan).unwrap();
        assert_eq!(physical.kind(), OpKind::Physical(PhysicalOpKind::HashJoin));
        assert_eq!(physical.estimated_rows, Some(1000));
        assert_eq!(physical.children[0].estimated_rows, Some(1000));
        assert_eq!(physical.children[1].estimated_rows, Some(100));

        let orders = PlanBuilder::scan(&catalog(), &TableRef::bare("orders")).unwrap();
        let customer = PlanBuilder::scan(&catalog(), &TableRef::bare("customer")).unwrap();
        let non_equi = Expr::binary(
            BinaryOp::Lt,
            Expr::column("o_custkey", 1),
            Expr::column("c_custkey", 2),
        );
        let plan = orders
            .join(customer, JoinType::Left, non_equi)
            .build()
            .unwrap();
        let physical = create_physical_plan(&plan).unwrap();
        assert_eq!(
            physical.kind(),
            OpKind::Physical(PhysicalOpKind::NestedLoopJoin)
        );
    }

    #[test]
    fn test_aggregates_and_set_operations() {
        let builder = PlanBuilder::scan(&catalog(), &TableRef::bare("orders")).unwrap();
        let key = builder.col("o_custkey").unwrap();
        let grouped = builder
            .clone()
            .aggregate(vec![key], vec![AggExpr::count_star()])
            .build()
            .unwrap();
        let physical = create_physical_plan(&grouped).unwrap();
        assert_eq!(physical.kind(), OpKind::Physical(PhysicalOpKind::HashGroupBy));
        assert_eq!(physical.estimated_rows, Some(100));

        let ungrouped = builder
            .clone()
            .aggregate(vec![], vec![AggExpr::new(AggFunc::Max, Expr::column("o_id", 0))])
            .build()
            .unwrap();
        let physical = create_physical_plan(&ungrouped).unwrap();
        assert_eq!(
            physical.kind(),
            OpKind::Physical(PhysicalOpKind::UngroupedAggregate)
        );
        assert_eq!(physical.estimated_rows, Some(1));

        let except = builder
            .clone()
            .set_operation(SetOpKind::Except, vec![builder.clone(), builder])
            .build()
            .unwrap();
        let physical = create_physical_plan(&except).unwrap();
        assert_eq!(
            kinds(&physical),
            vec![
                OpKind::Physical(PhysicalOpKind::HashJoin),
                OpKind::Physical(PhysicalOpKind::HashJoin),
                OpKind::Physical(PhysicalOpKind::SeqScan),
                OpKind::Physical(PhysicalOpKind::SeqScan),
                OpKind::Physical(PhysicalOpKind::SeqScan),
            ]
        );
    }

    #[test]
    fn test_physical_input_rejected() {
        let plan = PlanBuilder::values(
            Schema::new(vec![Field::new("x", DataType::Int32, false)]),
            vec![vec![ScalarValue::Int32(1)]],
        )
        .build()
        .unwrap();
        let physical = create_physical_plan(&plan).unwrap();
        assert_eq!(physical.estimated_rows, Some(1));
        assert!(create_physical_plan(&physical).is_err());
    }
}
