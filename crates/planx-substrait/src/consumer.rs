//! # Substrait Consumer (Deserialization)
//!
//! This module converts a Substrait `Plan` protobuf back into a logical
//! `PlanNode` tree. It is the ingestion step of the explainer:
//!
//! ```text
//! Substrait Plan (protobuf bytes or JSON)
//!   -> consumer::decode_plan()
//!   -> logical PlanNode
//!   -> physical planner
//!   -> text rendering
//! ```
//!
//! ## Conversion Strategy
//!
//! The consumer recursively walks the Substrait `Rel` tree. Every relation
//! yields the node together with its output schema, so that field references
//! in the parent can be bounds-checked and named:
//!
//! - **ReadRel** -> `LogicalOp::Scan` (named table) or `LogicalOp::Values` (virtual table)
//! - **FilterRel** -> `LogicalOp::Filter`
//! - **ProjectRel** -> `LogicalOp::Project`
//! - **JoinRel** -> `LogicalOp::Join`, plus a `Filter` for a post-join filter
//! - **CrossRel** -> `LogicalOp::CrossProduct`
//! - **AggregateRel** -> `LogicalOp::Aggregate` (at most one grouping set)
//! - **SortRel** -> `LogicalOp::Sort`
//! - **FetchRel** -> `LogicalOp::Limit`
//! - **SetRel** -> `LogicalOp::SetOperation`
//! - **WriteRel** -> `LogicalOp::Write`
//!
//! An emit mapping on any relation other than a project becomes a `Project`
//! of plain column references on top of it.
//!
//! ## Expression Conversion
//!
//! Field references become `Expr::Column` named after the input column.
//! Scalar functions resolve through the plan's extension declarations; the
//! comparison, arithmetic and boolean functions map back to structured
//! expressions, everything else becomes `Expr::Function` under its internal
//! name.
//!
//! ## Error Handling
//!
//! The consumer returns `ConsumeError` for malformed or unsupported Substrait
//! plans. Unsupported relation types are rejected rather than silently ignored.

use crate::extensions::decode_statistics;
use crate::functions::{internal_name, FunctionMap};
use crate::types::{from_named_struct, from_substrait_type, variant_name};
use planx_core::expr::*;
use planx_core::plan::PlanNode;
use planx_core::types::{DataType, Schema};
use planx_core::PlanError;
use prost::Message;
use substrait::proto;
use substrait::proto::expression::{field_reference, literal, reference_segment, RexType};
use substrait::proto::rel::RelType;
use thiserror::Error;
use tracing::{debug, trace};

/// Decode protobuf bytes and convert the plan.
pub fn decode_plan(bytes: &[u8]) -> Result<PlanNode, ConsumeError> {
    if bytes.is_empty() {
        return Err(ConsumeError::EmptyPlan);
    }
    let plan = proto::Plan::decode(bytes)?;
    consume_plan(&plan)
}

/// Parse Substrait JSON and convert the plan.
pub fn decode_json(json: &str) -> Result<PlanNode, ConsumeError> {
    let plan: proto::Plan = serde_json::from_str(json)?;
    consume_plan(&plan)
}

/// Convert a Substrait Plan into a logical plan tree.
///
/// Only the first relation is used. When it is a `RelRoot`, its names become
/// the output column names.
pub fn consume_plan(plan: &proto::Plan) -> Result<PlanNode, ConsumeError> {
    let root_rel = plan.relations.first().ok_or(ConsumeError::EmptyPlan)?;
    let functions = FunctionMap::from_plan(plan);
    debug!(
        "Consuming Substrait plan: {} relations, {} function declarations",
        plan.relations.len(),
        functions.len()
    );

    let (rel, names) = match root_rel.rel_type.as_ref().ok_or(ConsumeError::MissingRelType)? {
        proto::plan_rel::RelType::Root(root) => (
            root.input.as_ref().ok_or(ConsumeError::MissingInput)?,
            root.names.as_slice(),
        ),
        proto::plan_rel::RelType::Rel(rel) => (rel, &[][..]),
    };

    let consumer = Consumer {
        functions: &functions,
    };
    let (node, schema) = consumer.consume_rel(rel)?;
    let node = apply_root_names(node, &schema, names)?;
    debug!("Consumed plan with {} nodes", node.node_count());
    Ok(node)
}

/// Errors raised for malformed or unsupported Substrait plans.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plan has no relations")]
    EmptyPlan,
    #[error("relation has no type")]
    MissingRelType,
    #[error("relation is missing an input")]
    MissingInput,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field reference {index} out of range for {width} input columns")]
    InvalidFieldReference { index: i64, width: usize },
    #[error("unknown function anchor {0}")]
    UnknownFunctionAnchor(u32),
    #[error("{function} expects {expected} argument(s), got {actual}")]
    InvalidArity {
        function: String,
        expected: String,
        actual: usize,
    },
    #[error("invalid value {value} for enum field {field}")]
    InvalidEnumValue { field: &'static str, value: i32 },
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("root has {actual} names but the plan produces {expected} columns")]
    InvalidRootNames { expected: usize, actual: usize },
    #[error("unsupported relation type: {0}")]
    UnsupportedRelType(String),
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),
}

impl ConsumeError {
    /// Name of the relation type when the plan is well formed but uses an
    /// operator without a counterpart.
    pub fn unsupported_operator(&self) -> Option<&str> {
        match self {
            ConsumeError::UnsupportedRelType(name) => Some(name),
            _ => None,
        }
    }
}

fn apply_root_names(
    mut node: PlanNode,
    schema: &Schema,
    names: &[String],
) -> Result<PlanNode, ConsumeError> {
    if names.is_empty() || names == schema.names().as_slice() {
        return Ok(node);
    }
    if names.len() != schema.len() {
        return Err(ConsumeError::InvalidRootNames {
            expected: schema.len(),
            actual: names.len(),
        });
    }
    if rename_outputs(&mut node, names) {
        return Ok(node);
    }
    let exprs = column_exprs(schema, 0..schema.len());
    Ok(PlanNode::logical(
        LogicalOp::Project {
            exprs,
            aliases: names.to_vec(),
        },
        vec![node],
    ))
}

/// Rename the output columns in place: through operators that pass their
/// input schema on unchanged, down to the nearest `Project`.
fn rename_outputs(node: &mut PlanNode, names: &[String]) -> bool {
    match &mut node.op {
        Operator::Logical(LogicalOp::Project { aliases, .. }) => {
            *aliases = names.to_vec();
            true
        }
        Operator::Logical(
            LogicalOp::Filter { .. }
            | LogicalOp::Sort { .. }
            | LogicalOp::Limit { .. }
            | LogicalOp::Sample { .. },
        ) => node
            .children
            .first_mut()
            .is_some_and(|child| rename_outputs(child, names)),
        _ => false,
    }
}

fn column_exprs(schema: &Schema, indices: impl IntoIterator<Item = usize>) -> Vec<Expr> {
    indices
        .into_iter()
        .map(|i| Expr::column(schema.fields[i].name.clone(), i as u32))
        .collect()
}

fn field_index(index: i32, width: usize) -> Result<usize, ConsumeError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < width)
        .ok_or(ConsumeError::InvalidFieldReference {
            index: i64::from(index),
            width,
        })
}

fn required<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, ConsumeError> {
    value.as_ref().ok_or(ConsumeError::MissingField(field))
}

fn input<T>(value: &Option<Box<T>>) -> Result<&T, ConsumeError> {
    value.as_deref().ok_or(ConsumeError::MissingInput)
}

fn check_arity(function: &str, expected: usize, actual: usize) -> Result<(), ConsumeError> {
    if expected == actual {
        return Ok(());
    }
    Err(ConsumeError::InvalidArity {
        function: function.to_string(),
        expected: expected.to_string(),
        actual,
    })
}

fn table_ref(names: &[String]) -> Result<TableRef, ConsumeError> {
    match names {
        [] => Err(ConsumeError::MissingField("names")),
        [name] => Ok(TableRef::bare(name.clone())),
        [schema, name] => Ok(TableRef::new(schema.clone(), name.clone())),
        [qualifiers @ .., name] => Ok(TableRef::new(qualifiers.join("."), name.clone())),
    }
}

fn schema_of(ns: &Option<proto::NamedStruct>, field: &'static str) -> Result<Schema, ConsumeError> {
    from_named_struct(required(ns, field)?).map_err(ConsumeError::UnsupportedType)
}

/// Wrap `node` in a column-selecting `Project` when the relation has an emit mapping.
fn apply_emit(
    node: PlanNode,
    schema: Schema,
    common: Option<&proto::RelCommon>,
) -> Result<(PlanNode, Schema), ConsumeError> {
    let Some(proto::rel_common::EmitKind::Emit(emit)) = common.and_then(|c| c.emit_kind.as_ref())
    else {
        return Ok((node, schema));
    };
    let indices = emit
        .output_mapping
        .iter()
        .map(|&i| field_index(i, schema.len()))
        .collect::<Result<Vec<_>, _>>()?;
    if indices.iter().copied().eq(0..schema.len()) {
        return Ok((node, schema));
    }
    let output = schema.project(&indices)?;
    let project = PlanNode::logical(
        LogicalOp::Project {
            exprs: column_exprs(&schema, indices),
            aliases: output.names(),
        },
        vec![node],
    );
    Ok((project, output))
}

/// Finish a relation: validate it and derive its output schema.
fn finish(node: PlanNode) -> Result<(PlanNode, Schema), ConsumeError> {
    let schema = node.output_schema()?;
    Ok((node, schema))
}

struct Consumer<'a> {
    functions: &'a FunctionMap,
}

impl Consumer<'_> {
    /// Recursively convert a Substrait Rel.
    fn consume_rel(&self, rel: &proto::Rel) -> Result<(PlanNode, Schema), ConsumeError> {
        let rel_type = rel.rel_type.as_ref().ok_or(ConsumeError::MissingRelType)?;
        trace!("Consuming {}Rel", variant_name(rel_type));

        let (node, common) = match rel_type {
            RelType::Read(read) => (self.consume_read(read)?, read.common.as_ref()),
            RelType::Filter(filter) => (self.consume_filter(filter)?, filter.common.as_ref()),
            RelType::Project(project) => return self.consume_project(project),
            RelType::Join(join) => (self.consume_join(join)?, join.common.as_ref()),
            RelType::Cross(cross) => (self.consume_cross(cross)?, cross.common.as_ref()),
            RelType::Aggregate(agg) => (self.consume_aggregate(agg)?, agg.common.as_ref()),
            RelType::Sort(sort) => (self.consume_sort(sort)?, sort.common.as_ref()),
            RelType::Fetch(fetch) => (self.consume_fetch(fetch)?, fetch.common.as_ref()),
            RelType::Set(set) => (self.consume_set(set)?, set.common.as_ref()),
            RelType::Write(write) => (self.consume_write(write)?, write.common.as_ref()),
            other => {
                return Err(ConsumeError::UnsupportedRelType(format!(
                    "{}Rel",
                    variant_name(other)
                )))
            }
        };
        let (node, schema) = finish(node)?;
        apply_emit(node, schema, common)
    }

    /// Table scan or inline rows.
    #[allow(deprecated)]
    fn consume_read(&self, read: &proto::ReadRel) -> Result<PlanNode, ConsumeError> {
        let schema = schema_of(&read.base_schema, "base_schema")?;
        match required(&read.read_type, "read_type")? {
            proto::read_rel::ReadType::NamedTable(nt) => {
                let predicate = match &read.filter {
                    Some(f) => Some(self.convert_expression(f, &schema)?),
                    None => None,
                };
                let projection = match read.projection.as_ref().and_then(|m| m.select.as_ref()) {
                    Some(select) => Some(
                        select
                            .struct_items
                            .iter()
                            .map(|item| field_index(item.field, schema.len()))
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                    None => None,
                };
                let statistics = match &read.advanced_extension {
                    Some(ext) => decode_statistics(ext)?,
                    None => None,
                };
                Ok(PlanNode::logical(
                    LogicalOp::Scan {
                        table: table_ref(&nt.names)?,
                        schema,
                        projection,
                        predicate,
                        statistics,
                    },
                    vec![],
                ))
            }
            proto::read_rel::ReadType::VirtualTable(vt) => {
                let rows = vt
                    .values
                    .iter()
                    .map(|row| row.fields.iter().map(convert_literal).collect())
                    .collect::<Result<Vec<Vec<_>>, _>>()?;
                Ok(PlanNode::logical(LogicalOp::Values { schema, rows }, vec![]))
            }
            other => Err(ConsumeError::UnsupportedRelType(format!(
                "ReadRel {}",
                variant_name(other)
            ))),
        }
    }

    fn consume_filter(&self, filter: &proto::FilterRel) -> Result<PlanNode, ConsumeError> {
        let (child, schema) = self.consume_rel(input(&filter.input)?)?;
        let condition = filter
            .condition
            .as_deref()
            .ok_or(ConsumeError::MissingField("condition"))?;
        let predicate = self.convert_expression(condition, &schema)?;
        Ok(PlanNode::logical(LogicalOp::Filter { predicate }, vec![child]))
    }

    /// A ProjectRel outputs its input columns followed by its expressions;
    /// the emit mapping, when present, selects among those.
    fn consume_project(
        &self,
        project: &proto::ProjectRel,
    ) -> Result<(PlanNode, Schema), ConsumeError> {
        let (child, schema) = self.consume_rel(input(&project.input)?)?;
        let mut exprs = column_exprs(&schema, 0..schema.len());
        for e in &project.expressions {
            exprs.push(self.convert_expression(e, &schema)?);
        }

        let emit = project
            .common
            .as_ref()
            .and_then(|c| c.emit_kind.as_ref());
        if let Some(proto::rel_common::EmitKind::Emit(emit)) = emit {
            let mut selected = Vec::with_capacity(emit.output_mapping.len());
            for &i in &emit.output_mapping {
                selected.push(exprs[field_index(i, exprs.len())?].clone());
            }
            exprs = selected;
        }

        let aliases = exprs.iter().map(Expr::output_name).collect();
        finish(PlanNode::logical(
            LogicalOp::Project { exprs, aliases },
            vec![child],
        ))
    }

    fn consume_join(&self, join: &proto::JoinRel) -> Result<PlanNode, ConsumeError> {
        let (left, left_schema) = self.consume_rel(input(&join.left)?)?;
        let (right, right_schema) = self.consume_rel(input(&join.right)?)?;
        let joined = left_schema.join(&right_schema);

        let join_type = convert_join_type(join.r#type)?;
        let condition = match &join.expression {
            Some(e) => self.convert_expression(e, &joined)?,
            None => Expr::literal(ScalarValue::Bool(true)),
        };
        let node = PlanNode::logical(
            LogicalOp::Join {
                join_type,
                condition,
            },
            vec![left, right],
        );

        match &join.post_join_filter {
            Some(f) => {
                let (node, schema) = finish(node)?;
                let predicate = self.convert_expression(f, &schema)?;
                Ok(PlanNode::logical(LogicalOp::Filter { predicate }, vec![node]))
            }
            None => Ok(node),
        }
    }

    fn consume_cross(&self, cross: &proto::CrossRel) -> Result<PlanNode, ConsumeError> {
        let (left, _) = self.consume_rel(input(&cross.left)?)?;
        let (right, _) = self.consume_rel(input(&cross.right)?)?;
        Ok(PlanNode::logical(LogicalOp::CrossProduct, vec![left, right]))
    }

    #[allow(deprecated)]
    fn consume_aggregate(&self, agg: &proto::AggregateRel) -> Result<PlanNode, ConsumeError> {
        let (child, schema) = self.consume_rel(input(&agg.input)?)?;
        let group_by = match agg.groupings.as_slice() {
            [] => vec![],
            [grouping] => grouping
                .grouping_expressions
                .iter()
                .map(|e| self.convert_expression(e, &schema))
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(ConsumeError::UnsupportedRelType(
                    "AggregateRel with multiple grouping sets".into(),
                ))
            }
        };
        let aggregates = agg
            .measures
            .iter()
            .map(|m| self.convert_measure(m, &schema))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlanNode::logical(
            LogicalOp::Aggregate {
                group_by,
                aggregates,
            },
            vec![child],
        ))
    }

    fn consume_sort(&self, sort: &proto::SortRel) -> Result<PlanNode, ConsumeError> {
        use proto::sort_field::{SortDirection, SortKind};
        let (child, schema) = self.consume_rel(input(&sort.input)?)?;
        let order = sort
            .sorts
            .iter()
            .map(|field| {
                let expr = self.convert_expression(required(&field.expr, "sort expr")?, &schema)?;
                let direction = match required(&field.sort_kind, "sort_kind")? {
                    SortKind::Direction(d) => *d,
                    SortKind::ComparisonFunctionReference(_) => {
                        return Err(ConsumeError::UnsupportedExpression(
                            "sort by comparison function".into(),
                        ))
                    }
                };
                let (ascending, nulls_first) = match SortDirection::try_from(direction) {
                    Ok(SortDirection::AscNullsFirst) => (true, true),
                    Ok(SortDirection::AscNullsLast) => (true, false),
                    Ok(SortDirection::DescNullsFirst) => (false, true),
                    Ok(SortDirection::DescNullsLast) => (false, false),
                    Ok(other) => {
                        return Err(ConsumeError::UnsupportedExpression(format!(
                            "sort direction {:?}",
                            other
                        )))
                    }
                    Err(_) => {
                        return Err(ConsumeError::InvalidEnumValue {
                            field: "sort direction",
                            value: direction,
                        })
                    }
                };
                Ok(SortKey {
                    expr,
                    ascending,
                    nulls_first,
                })
            })
            .collect::<Result<Vec<_>, ConsumeError>>()?;
        Ok(PlanNode::logical(LogicalOp::Sort { order }, vec![child]))
    }

    fn consume_fetch(&self, fetch: &proto::FetchRel) -> Result<PlanNode, ConsumeError> {
        let (child, _) = self.consume_rel(input(&fetch.input)?)?;
        let offset = u64::try_from(fetch.offset)
            .map_err(|_| ConsumeError::InvalidValue(format!("fetch offset {}", fetch.offset)))?;
        let count = match fetch.count {
            -1 => None,
            c => Some(
                u64::try_from(c)
                    .map_err(|_| ConsumeError::InvalidValue(format!("fetch count {}", c)))?,
            ),
        };
        Ok(PlanNode::logical(LogicalOp::Limit { offset, count }, vec![child]))
    }

    fn consume_set(&self, set: &proto::SetRel) -> Result<PlanNode, ConsumeError> {
        use proto::set_rel::SetOp;
        if set.inputs.len() < 2 {
            return Err(ConsumeError::MissingInput);
        }
        let op = match SetOp::try_from(set.op) {
            Ok(SetOp::UnionAll) => SetOpKind::UnionAll,
            Ok(SetOp::UnionDistinct) => SetOpKind::UnionDistinct,
            Ok(SetOp::MinusPrimary) => SetOpKind::Except,
            Ok(SetOp::IntersectionPrimary) => SetOpKind::Intersect,
            Ok(other) => {
                return Err(ConsumeError::UnsupportedRelType(format!(
                    "SetRel {:?}",
                    other
                )))
            }
            Err(_) => {
                return Err(ConsumeError::InvalidEnumValue {
                    field: "set op",
                    value: set.op,
                })
            }
        };
        let children = set
            .inputs
            .iter()
            .map(|r| Ok(self.consume_rel(r)?.0))
            .collect::<Result<Vec<_>, ConsumeError>>()?;
        Ok(PlanNode::logical(LogicalOp::SetOperation { op }, children))
    }

    fn consume_write(&self, write: &proto::WriteRel) -> Result<PlanNode, ConsumeError> {
        use proto::write_rel::{WriteOp, WriteType};
        let table = match required(&write.write_type, "write_type")? {
            WriteType::NamedTable(nt) => table_ref(&nt.names)?,
            other => {
                return Err(ConsumeError::UnsupportedRelType(format!(
                    "WriteRel {}",
                    variant_name(other)
                )))
            }
        };
        let kind = match WriteOp::try_from(write.op) {
            Ok(WriteOp::Insert) => WriteKind::Insert,
            Ok(WriteOp::Ctas) => WriteKind::CreateTableAs,
            Ok(WriteOp::Delete) => WriteKind::Delete,
            Ok(other) => {
                return Err(ConsumeError::UnsupportedRelType(format!(
                    "WriteRel {:?}",
                    other
                )))
            }
            Err(_) => {
                return Err(ConsumeError::InvalidEnumValue {
                    field: "write op",
                    value: write.op,
                })
            }
        };
        let (child, _) = self.consume_rel(input(&write.input)?)?;
        Ok(PlanNode::logical(LogicalOp::Write { table, kind }, vec![child]))
    }

    fn function_name(&self, anchor: u32) -> Result<&str, ConsumeError> {
        self.functions
            .get(anchor)
            .ok_or(ConsumeError::UnknownFunctionAnchor(anchor))
    }

    fn convert_arguments(
        &self,
        arguments: &[proto::FunctionArgument],
        schema: &Schema,
    ) -> Result<Vec<Expr>, ConsumeError> {
        arguments
            .iter()
            .map(|a| match &a.arg_type {
                Some(proto::function_argument::ArgType::Value(e)) => {
                    self.convert_expression(e, schema)
                }
                Some(other) => Err(ConsumeError::UnsupportedExpression(format!(
                    "{} function argument",
                    variant_name(other)
                ))),
                None => Err(ConsumeError::MissingField("argument")),
            })
            .collect()
    }

    fn convert_measure(
        &self,
        measure: &proto::aggregate_rel::Measure,
        schema: &Schema,
    ) -> Result<AggExpr, ConsumeError> {
        use proto::aggregate_function::AggregationInvocation;
        if measure.filter.is_some() {
            return Err(ConsumeError::UnsupportedExpression(
                "aggregate with filter".into(),
            ));
        }
        let function = required(&measure.measure, "measure")?;
        let name = internal_name(self.function_name(function.function_reference)?);
        let mut args = self.convert_arguments(&function.arguments, schema)?;
        let distinct = function.invocation == AggregationInvocation::Distinct as i32;

        let func = match (name, args.len()) {
            ("count", 0) | ("count_star", 0) => AggFunc::CountStar,
            ("count", _) => AggFunc::Count,
            ("sum", _) => AggFunc::Sum,
            ("avg", _) => AggFunc::Avg,
            ("min", _) => AggFunc::Min,
            ("max", _) => AggFunc::Max,
            (other, _) => {
                return Err(ConsumeError::UnsupportedExpression(format!(
                    "aggregate function {}",
                    other
                )))
            }
        };
        let arg = if func == AggFunc::CountStar {
            None
        } else {
            check_arity(name, 1, args.len())?;
            args.pop()
        };
        Ok(AggExpr {
            func,
            arg,
            distinct,
        })
    }

    /// Convert an expression evaluated over rows of `schema`.
    fn convert_expression(
        &self,
        expr: &proto::Expression,
        schema: &Schema,
    ) -> Result<Expr, ConsumeError> {
        let rex = expr
            .rex_type
            .as_ref()
            .ok_or(ConsumeError::MissingField("rex_type"))?;
        match rex {
            RexType::Selection(fr) => convert_field_reference(fr, schema),
            RexType::Literal(lit) => Ok(Expr::Literal(convert_literal(lit)?)),
            RexType::ScalarFunction(f) => {
                let name = self.function_name(f.function_reference)?;
                let args = self.convert_arguments(&f.arguments, schema)?;
                let return_type = match &f.output_type {
                    Some(t) => from_substrait_type(t)
                        .map_err(ConsumeError::UnsupportedType)?
                        .0,
                    None => DataType::Null,
                };
                convert_function(name, args, return_type)
            }
            RexType::Cast(cast) => {
                let (to, _) = from_substrait_type(required(&cast.r#type, "cast type")?)
                    .map_err(ConsumeError::UnsupportedType)?;
                let inner = cast
                    .input
                    .as_deref()
                    .ok_or(ConsumeError::MissingField("cast input"))?;
                Ok(Expr::Cast {
                    expr: Box::new(self.convert_expression(inner, schema)?),
                    to,
                })
            }
            RexType::SingularOrList(list) => {
                let value = list
                    .value
                    .as_deref()
                    .ok_or(ConsumeError::MissingField("singular_or_list value"))?;
                let options = list
                    .options
                    .iter()
                    .map(|o| self.convert_expression(o, schema))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::InList {
                    expr: Box::new(self.convert_expression(value, schema)?),
                    list: options,
                })
            }
            RexType::IfThen(if_then) => {
                let branches = if_then
                    .ifs
                    .iter()
                    .map(|clause| {
                        Ok((
                            self.convert_expression(required(&clause.r#if, "if")?, schema)?,
                            self.convert_expression(required(&clause.then, "then")?, schema)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, ConsumeError>>()?;
                let else_expr = match &if_then.r#else {
                    Some(e) => Some(Box::new(self.convert_expression(e, schema)?)),
                    None => None,
                };
                Ok(Expr::Case {
                    branches,
                    else_expr,
                })
            }
            other => Err(ConsumeError::UnsupportedExpression(variant_name(other))),
        }
    }
}

fn convert_join_type(value: i32) -> Result<JoinType, ConsumeError> {
    use proto::join_rel::JoinType as J;
    match J::try_from(value) {
        Ok(J::Inner) => Ok(JoinType::Inner),
        Ok(J::Left) => Ok(JoinType::Left),
        Ok(J::Right) => Ok(JoinType::Right),
        Ok(J::Outer) => Ok(JoinType::Full),
        Ok(J::LeftSemi) => Ok(JoinType::Semi),
        Ok(J::LeftAnti) => Ok(JoinType::Anti),
        Ok(J::LeftSingle) => Ok(JoinType::Single),
        Ok(other) => Err(ConsumeError::UnsupportedRelType(format!(
            "JoinRel {:?}",
            other
        ))),
        Err(_) => Err(ConsumeError::InvalidEnumValue {
            field: "join type",
            value,
        }),
    }
}

fn convert_field_reference(
    fr: &proto::expression::FieldReference,
    schema: &Schema,
) -> Result<Expr, ConsumeError> {
    if let Some(field_reference::RootType::OuterReference(_)) = &fr.root_type {
        return Err(ConsumeError::UnsupportedExpression("outer reference".into()));
    }
    let segment = match &fr.reference_type {
        Some(field_reference::ReferenceType::DirectReference(seg)) => seg,
        Some(_) => {
            return Err(ConsumeError::UnsupportedExpression(
                "masked field reference".into(),
            ))
        }
        None => return Err(ConsumeError::MissingField("reference_type")),
    };
    match &segment.reference_type {
        Some(reference_segment::ReferenceType::StructField(sf)) if sf.child.is_none() => {
            let index = field_index(sf.field, schema.len())?;
            Ok(Expr::column(schema.fields[index].name.clone(), index as u32))
        }
        Some(_) => Err(ConsumeError::UnsupportedExpression(
            "nested field reference".into(),
        )),
        None => Err(ConsumeError::MissingField("reference segment")),
    }
}

/// Rebuild the structured expression for functions with one.
fn convert_function(
    name: &str,
    mut args: Vec<Expr>,
    return_type: DataType,
) -> Result<Expr, ConsumeError> {
    let binary = match name {
        "equal" => Some(BinaryOp::Eq),
        "not_equal" => Some(BinaryOp::NotEq),
        "lt" => Some(BinaryOp::Lt),
        "lte" => Some(BinaryOp::LtEq),
        "gt" => Some(BinaryOp::Gt),
        "gte" => Some(BinaryOp::GtEq),
        "add" => Some(BinaryOp::Add),
        "subtract" => Some(BinaryOp::Sub),
        "multiply" => Some(BinaryOp::Mul),
        "divide" => Some(BinaryOp::Div),
        "modulus" => Some(BinaryOp::Mod),
        _ => None,
    };
    if let Some(op) = binary {
        check_arity(name, 2, args.len())?;
        let right = args.pop();
        let left = args.pop();
        if let (Some(left), Some(right)) = (left, right) {
            return Ok(Expr::binary(op, left, right));
        }
    }

    let unary = match name {
        "not" => Some(UnaryOp::Not),
        "negate" => Some(UnaryOp::Neg),
        "is_null" => Some(UnaryOp::IsNull),
        "is_not_null" => Some(UnaryOp::IsNotNull),
        _ => None,
    };
    if let Some(op) = unary {
        check_arity(name, 1, args.len())?;
        if let Some(operand) = args.pop() {
            return Ok(Expr::unary(op, operand));
        }
    }

    match name {
        "and" => Ok(Expr::And(args)),
        "or" => Ok(Expr::Or(args)),
        "between" => {
            check_arity(name, 3, args.len())?;
            let mut it = args.into_iter();
            match (it.next(), it.next(), it.next()) {
                (Some(expr), Some(low), Some(high)) => Ok(Expr::Between {
                    expr: Box::new(expr),
                    low: Box::new(low),
                    high: Box::new(high),
                }),
                _ => Err(ConsumeError::MissingField("between argument")),
            }
        }
        other => Ok(Expr::Function {
            name: internal_name(other).to_string(),
            args,
            return_type,
        }),
    }
}

/// Convert a Substrait literal to a scalar value.
fn convert_literal(lit: &proto::expression::Literal) -> Result<ScalarValue, ConsumeError> {
    use literal::LiteralType;
    let literal_type = lit
        .literal_type
        .as_ref()
        .ok_or(ConsumeError::MissingField("literal_type"))?;
    let narrow = |v: i32, what: &str| ConsumeError::InvalidLiteral(format!("{} {}", what, v));
    Ok(match literal_type {
        LiteralType::Boolean(v) => ScalarValue::Bool(*v),
        LiteralType::I8(v) => ScalarValue::Int8(i8::try_from(*v).map_err(|_| narrow(*v, "i8"))?),
        LiteralType::I16(v) => {
            ScalarValue::Int16(i16::try_from(*v).map_err(|_| narrow(*v, "i16"))?)
        }
        LiteralType::I32(v) => ScalarValue::Int32(*v),
        LiteralType::I64(v) => ScalarValue::Int64(*v),
        LiteralType::Fp32(v) => ScalarValue::Float32((*v).into()),
        LiteralType::Fp64(v) => ScalarValue::Float64((*v).into()),
        LiteralType::String(v) => ScalarValue::Utf8(v.clone()),
        LiteralType::FixedChar(v) => ScalarValue::Utf8(v.clone()),
        LiteralType::VarChar(v) => ScalarValue::Utf8(v.value.clone()),
        LiteralType::Date(v) => ScalarValue::Date(*v),
        LiteralType::Decimal(d) => {
            let bytes: [u8; 16] = d.value[..].try_into().map_err(|_| {
                ConsumeError::InvalidLiteral(format!("decimal of {} bytes", d.value.len()))
            })?;
            let precision = u8::try_from(d.precision).map_err(|_| narrow(d.precision, "precision"))?;
            let scale = u8::try_from(d.scale).map_err(|_| narrow(d.scale, "scale"))?;
            ScalarValue::Decimal {
                value: i128::from_le_bytes(bytes),
                precision,
                scale,
            }
        }
        LiteralType::Null(t) => {
            let (data_type, _) = from_substrait_type(t).map_err(ConsumeError::UnsupportedType)?;
            ScalarValue::Null(data_type)
        }
        other => {
            return Err(ConsumeError::UnsupportedExpression(format!(
                "{} literal",
                variant_name(other)
            )))
        }
    })
}
