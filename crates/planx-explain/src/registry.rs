//! # Node Renderers
//!
//! A [`NodeRenderer`] turns one operator into the text of its box: an
//! upper-case name and zero or more extra-info lines. Renderers are looked up
//! by operator kind in a [`RendererRegistry`]; a node whose kind has no
//! renderer cannot be explained.
//!
//! The default registry covers every logical and physical operator with the
//! names the host engine prints (`SEQ_SCAN`, `STREAMING_LIMIT`, `HASH_JOIN`, ...).
//! Embedders can replace a renderer for a kind or remove it.

use planx_core::expr::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Text content of one box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    pub name: String,
    pub extra: Vec<String>,
}

impl RenderedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, line: impl Into<String>) -> Self {
        self.extra.push(line.into());
        self
    }
}

/// Renders the operators of the kinds it declares.
pub trait NodeRenderer: Send + Sync {
    fn kinds(&self) -> Vec<OpKind>;
    fn render(&self, op: &Operator) -> RenderedNode;
}

/// Renderers keyed by operator kind.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<OpKind, Arc<dyn NodeRenderer>>,
}

impl RendererRegistry {
    /// A registry with no renderers at all.
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Register `renderer` for each kind it declares, replacing earlier ones.
    pub fn register(&mut self, renderer: Arc<dyn NodeRenderer>) {
        for kind in renderer.kinds() {
            self.renderers.insert(kind, Arc::clone(&renderer));
        }
    }

    /// Remove the renderer for `kind`. Returns whether one was registered.
    pub fn remove(&mut self, kind: OpKind) -> bool {
        self.renderers.remove(&kind).is_some()
    }

    pub fn get(&self, kind: OpKind) -> Option<&dyn NodeRenderer> {
        self.renderers.get(&kind).map(|r| r.as_ref())
    }

    pub fn contains(&self, kind: OpKind) -> bool {
        self.renderers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(LogicalRenderer));
        registry.register(Arc::new(PhysicalRenderer));
        registry
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn set_op_name(op: SetOpKind) -> &'static str {
    match op {
        SetOpKind::UnionAll => "UNION ALL",
        SetOpKind::UnionDistinct => "UNION",
        SetOpKind::Except => "EXCEPT",
        SetOpKind::Intersect => "INTERSECT",
    }
}

fn write_kind_name(kind: WriteKind) -> &'static str {
    match kind {
        WriteKind::Insert => "INSERT",
        WriteKind::CreateTableAs => "CREATE TABLE AS",
        WriteKind::Delete => "DELETE",
    }
}

/// Built-in renderer for logical operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalRenderer;

const LOGICAL_KINDS: [LogicalOpKind; 12] = [
    LogicalOpKind::Scan,
    LogicalOpKind::Values,
    LogicalOpKind::Filter,
    LogicalOpKind::Project,
    LogicalOpKind::Join,
    LogicalOpKind::CrossProduct,
    LogicalOpKind::Aggregate,
    LogicalOpKind::Sort,
    LogicalOpKind::Limit,
    LogicalOpKind::SetOperation,
    LogicalOpKind::Write,
    LogicalOpKind::Sample,
];

impl NodeRenderer for LogicalRenderer {
    fn kinds(&self) -> Vec<OpKind> {
        LOGICAL_KINDS.iter().map(|k| OpKind::Logical(*k)).collect()
    }

    fn render(&self, op: &Operator) -> RenderedNode {
        let Operator::Logical(op) = op else {
            return PhysicalRenderer.render(op);
        };
        match op {
            LogicalOp::Scan {
                table,
                schema,
                projection,
                predicate,
                ..
            } => {
                let columns = match projection {
                    Some(indices) => indices
                        .iter()
                        .filter_map(|&i| schema.fields.get(i).map(|f| f.name.clone()))
                        .collect(),
                    None => schema.names(),
                };
                let mut node = RenderedNode::new("READ")
                    .with_extra(format!("Table: {}", table))
                    .with_extra(format!("Columns: {}", columns.join(", ")));
                if let Some(p) = predicate {
                    node = node.with_extra(format!("Filters: {}", p));
                }
                node
            }
            LogicalOp::Values { rows, .. } => {
                RenderedNode::new("VALUES").with_extra(format!("Rows: {}", rows.len()))
            }
            LogicalOp::Filter { predicate } => {
                RenderedNode::new("FILTER").with_extra(predicate.to_string())
            }
            LogicalOp::Project { exprs, aliases } => {
                let mut node = RenderedNode::new("PROJECT");
                for (i, e) in exprs.iter().enumerate() {
                    node = match aliases.get(i) {
                        Some(alias) if *alias != e.output_name() => {
                            node.with_extra(format!("{} AS {}", e, alias))
                        }
                        _ => node.with_extra(e.to_string()),
                    };
                }
                node
            }
            LogicalOp::Join {
                join_type,
                condition,
            } => RenderedNode::new("JOIN")
                .with_extra(format!("Join Type: {}", join_type))
                .with_extra(format!("Conditions: {}", condition)),
            LogicalOp::CrossProduct => RenderedNode::new("CROSS_PRODUCT"),
            LogicalOp::Aggregate {
                group_by,
                aggregates,
            } => {
                let mut node = RenderedNode::new("AGGREGATE");
                if !group_by.is_empty() {
                    node = node.with_extra(format!("Groups: {}", join(group_by)));
                }
                node.with_extra(format!("Aggregates: {}", join(aggregates)))
            }
            LogicalOp::Sort { order } => {
                RenderedNode::new("SORT").with_extra(format!("Order By: {}", join(order)))
            }
            LogicalOp::Limit { offset, count } => {
                let mut node = RenderedNode::new("LIMIT");
                if let Some(c) = count {
                    node = node.with_extra(format!("Limit: {}", c));
                }
                if *offset > 0 {
                    node = node.with_extra(format!("Offset: {}", offset));
                }
                node
            }
            LogicalOp::SetOperation { op } => {
                RenderedNode::new("SET_OPERATION").with_extra(set_op_name(*op))
            }
            LogicalOp::Write { table, kind } => RenderedNode::new("WRITE")
                .with_extra(write_kind_name(*kind))
                .with_extra(format!("Table: {}", table)),
            LogicalOp::Sample { percentage } => {
                RenderedNode::new("SAMPLE").with_extra(format!("Percentage: {}%", percentage))
            }
        }
    }
}

/// Built-in renderer for physical operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalRenderer;

const PHYSICAL_KINDS: [PhysicalOpKind; 18] = [
    PhysicalOpKind::SeqScan,
    PhysicalOpKind::ColumnDataScan,
    PhysicalOpKind::Filter,
    PhysicalOpKind::Projection,
    PhysicalOpKind::StreamingLimit,
    PhysicalOpKind::Limit,
    PhysicalOpKind::TopN,
    PhysicalOpKind::OrderBy,
    PhysicalOpKind::HashGroupBy,
    PhysicalOpKind::UngroupedAggregate,
    PhysicalOpKind::HashJoin,
    PhysicalOpKind::NestedLoopJoin,
    PhysicalOpKind::CrossProduct,
    PhysicalOpKind::Union,
    PhysicalOpKind::Insert,
    PhysicalOpKind::CreateTableAs,
    PhysicalOpKind::Delete,
    PhysicalOpKind::Sample,
];

impl NodeRenderer for PhysicalRenderer {
    fn kinds(&self) -> Vec<OpKind> {
        PHYSICAL_KINDS.iter().map(|k| OpKind::Physical(*k)).collect()
    }

    fn render(&self, op: &Operator) -> RenderedNode {
        let Operator::Physical(op) = op else {
            return LogicalRenderer.render(op);
        };
        match op {
            PhysicalOp::SeqScan {
                table,
                columns,
                predicate,
            } => {
                let mut node = RenderedNode::new("SEQ_SCAN")
                    .with_extra(format!("Table: {}", table.name))
                    .with_extra("Type: Sequential Scan");
                if !columns.is_empty() {
                    node = node.with_extra(format!("Projections: {}", columns.join(", ")));
                }
                if let Some(p) = predicate {
                    node = node.with_extra(format!("Filters: {}", p));
                }
                node
            }
            PhysicalOp::ColumnDataScan { .. } => RenderedNode::new("COLUMN_DATA_SCAN"),
            PhysicalOp::Filter { predicate } => {
                RenderedNode::new("FILTER").with_extra(predicate.to_string())
            }
            PhysicalOp::Projection { exprs } => {
                exprs.iter().fold(RenderedNode::new("PROJECTION"), |node, e| {
                    node.with_extra(e.output_name())
                })
            }
            PhysicalOp::StreamingLimit { .. } => RenderedNode::new("STREAMING_LIMIT"),
            PhysicalOp::Limit { .. } => RenderedNode::new("LIMIT"),
            PhysicalOp::TopN {
                order,
                offset,
                count,
            } => {
                let mut node = RenderedNode::new("TOP_N").with_extra(format!("Top: {}", count));
                if *offset > 0 {
                    node = node.with_extra(format!("Offset: {}", offset));
                }
                node.with_extra(format!("Order By: {}", join(order)))
            }
            PhysicalOp::OrderBy { order } => {
                order.iter().fold(RenderedNode::new("ORDER_BY"), |node, key| {
                    node.with_extra(key.to_string())
                })
            }
            PhysicalOp::HashGroupBy {
                group_by,
                aggregates,
            } => RenderedNode::new("HASH_GROUP_BY")
                .with_extra(format!("Groups: {}", join(group_by)))
                .with_extra(format!("Aggregates: {}", join(aggregates))),
            PhysicalOp::UngroupedAggregate { aggregates } => {
                RenderedNode::new("UNGROUPED_AGGREGATE")
                    .with_extra(format!("Aggregates: {}", join(aggregates)))
            }
            PhysicalOp::HashJoin {
                join_type,
                condition,
            } => RenderedNode::new("HASH_JOIN")
                .with_extra(format!("Join Type: {}", join_type))
                .with_extra(format!("Conditions: {}", condition)),
            PhysicalOp::NestedLoopJoin {
                join_type,
                condition,
            } => RenderedNode::new("NESTED_LOOP_JOIN")
                .with_extra(format!("Join Type: {}", join_type))
                .with_extra(format!("Conditions: {}", condition)),
            PhysicalOp::CrossProduct => RenderedNode::new("CROSS_PRODUCT"),
            PhysicalOp::Union { all } => {
                let node = RenderedNode::new("UNION");
                if *all {
                    node
                } else {
                    node.with_extra("Distinct")
                }
            }
            PhysicalOp::Insert { table } => {
                RenderedNode::new("INSERT").with_extra(format!("Table: {}", table.name))
            }
            PhysicalOp::CreateTableAs { table } => {
                RenderedNode::new("CREATE_TABLE_AS").with_extra(format!("Table: {}", table.name))
            }
            PhysicalOp::Delete { table } => {
                RenderedNode::new("DELETE").with_extra(format!("Table: {}", table.name))
            }
            PhysicalOp::Sample { percentage } => {
                RenderedNode::new("SAMPLE").with_extra(format!("Percentage: {}%", percentage))
            }
        }
    }
}
