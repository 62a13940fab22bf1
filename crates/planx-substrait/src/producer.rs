//! # Substrait Producer (Translation)
//!
//! This module converts a logical `PlanNode` tree into a Substrait `Plan`
//! protobuf. It is the "Plan Translator" half of the system:
//!
//! ```text
//! logical PlanNode
//!   -> Translator::translate_plan()
//!   -> Substrait Plan (RelRoot + extension declarations)
//!   -> protobuf bytes / JSON
//! ```
//!
//! ## Conversion Strategy
//!
//! The producer walks the tree top-down and emits one `Rel` per node:
//!
//! - **Scan** -> `ReadRel` with a named table, base schema, projection mask and filter
//! - **Values** -> `ReadRel` with a virtual table
//! - **Filter** -> `FilterRel`
//! - **Project** -> `ProjectRel`, with an emit mapping that keeps only the new expressions
//! - **Join** -> `JoinRel`, **CrossProduct** -> `CrossRel`
//! - **Aggregate** -> `AggregateRel` (a single grouping set)
//! - **Sort** -> `SortRel`
//! - **Limit** -> `FetchRel` (`count = -1` means no upper bound)
//! - **SetOperation** -> `SetRel`
//! - **Write** -> `WriteRel` (insert / create-table-as / delete)
//!
//! The root is wrapped in a `RelRoot` naming the output columns.
//!
//! ## Fail Closed
//!
//! Anything without a faithful Substrait rendering is an error rather than an
//! approximation: `Sample`, physical operators, functions missing from
//! [`crate::functions::SCALAR_FUNCTIONS`], untyped NULL literals and arity
//! violations all yield a [`TranslationError`].
//!
//! ## Determinism
//!
//! Translation is a pure function of the plan. Function anchors are assigned
//! in first-use order during a single pre-order walk, and statistics are
//! encoded from ordered maps, so the same plan always produces the same bytes.

use crate::extensions::encode_statistics;
use crate::functions::{self, compound_name, lookup_scalar, ExtensionSet};
use crate::types::{to_named_struct, to_substrait_type};
use planx_core::expr::*;
use planx_core::plan::PlanNode;
use planx_core::types::{DataType, Schema};
use planx_core::PlanError;
use prost::Message;
use serde::Deserialize;
use substrait::proto;
use substrait::proto::expression::{
    field_reference, if_then, literal, mask_expression, reference_segment, RexType,
};
use substrait::proto::rel::RelType;
use thiserror::Error;
use tracing::{debug, trace};

/// Substrait specification version stamped on produced plans.
pub const SUBSTRAIT_MINOR_VERSION: u32 = 54;

/// Producer settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Recorded in `Plan.version.producer`.
    pub producer: String,
    /// Attach scan statistics as `ReadRel` advanced extensions.
    pub include_statistics: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            producer: "planx".to_string(),
            include_statistics: true,
        }
    }
}

/// Errors raised while translating a plan to Substrait.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("operator {0} has no Substrait equivalent")]
    UnsupportedOperator(String),
    #[error("physical operator {0} cannot be translated, translate the logical plan instead")]
    PhysicalOperator(String),
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("{function} expects {expected} argument(s), got {actual}")]
    InvalidArity {
        function: String,
        expected: String,
        actual: usize,
    },
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Translates logical plans into Substrait.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: ProducerConfig,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProducerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Translate and encode as protobuf bytes.
    pub fn translate(&self, plan: &PlanNode) -> Result<Vec<u8>, TranslationError> {
        let bytes = self.translate_plan(plan)?.encode_to_vec();
        debug!("Encoded Substrait plan: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Translate and encode as Substrait JSON.
    pub fn translate_to_json(&self, plan: &PlanNode) -> Result<String, TranslationError> {
        Ok(serde_json::to_string_pretty(&self.translate_plan(plan)?)?)
    }

    /// Translate into a Substrait `Plan` message.
    pub fn translate_plan(&self, plan: &PlanNode) -> Result<proto::Plan, TranslationError> {
        if let Some(kind) = first_physical(plan) {
            return Err(TranslationError::PhysicalOperator(format!("{:?}", kind)));
        }
        let schema = plan.output_schema()?;
        debug!("Translating plan with {} nodes", plan.node_count());

        let mut producer = Producer {
            extensions: ExtensionSet::new(),
            include_statistics: self.config.include_statistics,
        };
        let rel = producer.produce_rel(plan)?;
        debug!(
            "Translation complete: {} function declarations",
            producer.extensions.declarations().len()
        );

        Ok(proto::Plan {
            version: Some(proto::Version {
                major_number: 0,
                minor_number: SUBSTRAIT_MINOR_VERSION,
                patch_number: 0,
                producer: self.config.producer.clone(),
                ..Default::default()
            }),
            extension_uris: producer.extensions.uris(),
            extensions: producer.extensions.declarations(),
            relations: vec![proto::PlanRel {
                rel_type: Some(proto::plan_rel::RelType::Root(proto::RelRoot {
                    input: Some(rel),
                    names: schema.names(),
                    ..Default::default()
                })),
            }],
            ..Default::default()
        })
    }
}

/// Translate with the default configuration.
pub fn translate(plan: &PlanNode) -> Result<Vec<u8>, TranslationError> {
    Translator::new().translate(plan)
}

/// Translate with the default configuration, returning the `Plan` message.
pub fn translate_plan(plan: &PlanNode) -> Result<proto::Plan, TranslationError> {
    Translator::new().translate_plan(plan)
}

/// Translate with the default configuration, returning Substrait JSON.
pub fn translate_to_json(plan: &PlanNode) -> Result<String, TranslationError> {
    Translator::new().translate_to_json(plan)
}

fn first_physical(node: &PlanNode) -> Option<PhysicalOpKind> {
    match &node.op {
        Operator::Physical(p) => Some(p.kind()),
        Operator::Logical(_) => node.children.iter().find_map(first_physical),
    }
}

fn rel(rel_type: RelType) -> proto::Rel {
    proto::Rel {
        rel_type: Some(rel_type),
    }
}

fn field_reference(index: usize) -> proto::Expression {
    proto::Expression {
        rex_type: Some(RexType::Selection(Box::new(proto::expression::FieldReference {
            reference_type: Some(field_reference::ReferenceType::DirectReference(
                proto::expression::ReferenceSegment {
                    reference_type: Some(reference_segment::ReferenceType::StructField(
                        Box::new(reference_segment::StructField {
                            field: index as i32,
                            child: None,
                        }),
                    )),
                },
            )),
            root_type: Some(field_reference::RootType::RootReference(
                field_reference::RootReference {},
            )),
        }))),
    }
}

fn projection_mask(indices: &[usize]) -> proto::expression::MaskExpression {
    proto::expression::MaskExpression {
        select: Some(mask_expression::StructSelect {
            struct_items: indices
                .iter()
                .map(|&i| mask_expression::StructItem {
                    field: i as i32,
                    child: None,
                })
                .collect(),
        }),
        maintain_singular_struct: true,
    }
}

fn named_struct(schema: &Schema) -> Result<proto::NamedStruct, TranslationError> {
    to_named_struct(schema).ok_or_else(|| {
        TranslationError::UnsupportedType("column of type NULL in relation schema".into())
    })
}

fn convert_join_type(jt: JoinType) -> proto::join_rel::JoinType {
    match jt {
        JoinType::Inner => proto::join_rel::JoinType::Inner,
        JoinType::Left => proto::join_rel::JoinType::Left,
        JoinType::Right => proto::join_rel::JoinType::Right,
        JoinType::Full => proto::join_rel::JoinType::Outer,
        JoinType::Semi => proto::join_rel::JoinType::LeftSemi,
        JoinType::Anti => proto::join_rel::JoinType::LeftAnti,
        JoinType::Single => proto::join_rel::JoinType::LeftSingle,
    }
}

fn convert_set_op(op: SetOpKind) -> proto::set_rel::SetOp {
    match op {
        SetOpKind::UnionAll => proto::set_rel::SetOp::UnionAll,
        SetOpKind::UnionDistinct => proto::set_rel::SetOp::UnionDistinct,
        SetOpKind::Except => proto::set_rel::SetOp::MinusPrimary,
        SetOpKind::Intersect => proto::set_rel::SetOp::IntersectionPrimary,
    }
}

fn sort_direction(key: &SortKey) -> proto::sort_field::SortDirection {
    use proto::sort_field::SortDirection;
    match (key.ascending, key.nulls_first) {
        (true, true) => SortDirection::AscNullsFirst,
        (true, false) => SortDirection::AscNullsLast,
        (false, true) => SortDirection::DescNullsFirst,
        (false, false) => SortDirection::DescNullsLast,
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, TranslationError> {
    i64::try_from(value)
        .map_err(|_| TranslationError::OutOfRange(format!("{} {} exceeds i64", what, value)))
}

fn check_arity(
    function: &str,
    min: usize,
    max: Option<usize>,
    actual: usize,
) -> Result<(), TranslationError> {
    let ok = actual >= min && max.map_or(true, |m| actual <= m);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(m) if m == min => min.to_string(),
        Some(m) => format!("{}..={}", min, m),
        None => format!("at least {}", min),
    };
    Err(TranslationError::InvalidArity {
        function: function.to_string(),
        expected,
        actual,
    })
}

struct Producer {
    extensions: ExtensionSet,
    include_statistics: bool,
}

impl Producer {
    fn child_rel(&mut self, node: &PlanNode, i: usize) -> Result<Box<proto::Rel>, TranslationError> {
        Ok(Box::new(self.produce_rel(&node.children[i])?))
    }

    /// Convert one node (and its subtree) to a Substrait Rel.
    fn produce_rel(&mut self, node: &PlanNode) -> Result<proto::Rel, TranslationError> {
        let op = match &node.op {
            Operator::Logical(op) => op,
            Operator::Physical(p) => {
                return Err(TranslationError::PhysicalOperator(format!("{:?}", p.kind())))
            }
        };
        trace!("Producing rel for {:?}", op.kind());

        let rel_type = match op {
            LogicalOp::Scan {
                table,
                schema,
                projection,
                predicate,
                statistics,
            } => {
                let filter = match predicate {
                    Some(p) => Some(Box::new(self.produce_expression(p, schema)?)),
                    None => None,
                };
                let advanced_extension = statistics
                    .as_ref()
                    .filter(|_| self.include_statistics)
                    .map(encode_statistics);
                RelType::Read(Box::new(proto::ReadRel {
                    base_schema: Some(named_struct(schema)?),
                    filter,
                    projection: projection.as_deref().map(projection_mask),
                    advanced_extension,
                    read_type: Some(proto::read_rel::ReadType::NamedTable(
                        proto::read_rel::NamedTable {
                            names: vec![table.schema.clone(), table.name.clone()],
                            ..Default::default()
                        },
                    )),
                    ..Default::default()
                }))
            }
            LogicalOp::Values { schema, rows } => {
                let values = rows
                    .iter()
                    .map(|row| {
                        let fields = row
                            .iter()
                            .map(produce_literal)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(literal::Struct { fields })
                    })
                    .collect::<Result<Vec<_>, TranslationError>>()?;
                #[allow(deprecated)]
                let virtual_table = proto::read_rel::VirtualTable {
                    values,
                    ..Default::default()
                };
                RelType::Read(Box::new(proto::ReadRel {
                    base_schema: Some(named_struct(schema)?),
                    read_type: Some(proto::read_rel::ReadType::VirtualTable(virtual_table)),
                    ..Default::default()
                }))
            }
            LogicalOp::Filter { predicate } => {
                let input_schema = node.children[0].output_schema()?;
                let condition = self.produce_expression(predicate, &input_schema)?;
                RelType::Filter(Box::new(proto::FilterRel {
                    input: Some(self.child_rel(node, 0)?),
                    condition: Some(Box::new(condition)),
                    ..Default::default()
                }))
            }
            LogicalOp::Project { exprs, .. } => {
                let input_schema = node.children[0].output_schema()?;
                let expressions = exprs
                    .iter()
                    .map(|e| self.produce_expression(e, &input_schema))
                    .collect::<Result<Vec<_>, _>>()?;
                // ProjectRel appends its expressions to the input columns;
                // emit only the appended ones.
                let n_in = input_schema.len() as i32;
                let output_mapping = (n_in..n_in + exprs.len() as i32).collect();
                RelType::Project(Box::new(proto::ProjectRel {
                    common: Some(proto::RelCommon {
                        emit_kind: Some(proto::rel_common::EmitKind::Emit(
                            proto::rel_common::Emit { output_mapping },
                        )),
                        ..Default::default()
                    }),
                    input: Some(self.child_rel(node, 0)?),
                    expressions,
                    ..Default::default()
                }))
            }
            LogicalOp::Join {
                join_type,
                condition,
            } => {
                let joined = node.children[0]
                    .output_schema()?
                    .join(&node.children[1].output_schema()?);
                let expression = self.produce_expression(condition, &joined)?;
                RelType::Join(Box::new(proto::JoinRel {
                    left: Some(self.child_rel(node, 0)?),
                    right: Some(self.child_rel(node, 1)?),
                    expression: Some(Box::new(expression)),
                    r#type: convert_join_type(*join_type) as i32,
                    ..Default::default()
                }))
            }
            LogicalOp::CrossProduct => RelType::Cross(Box::new(proto::CrossRel {
                left: Some(self.child_rel(node, 0)?),
                right: Some(self.child_rel(node, 1)?),
                ..Default::default()
            })),
            LogicalOp::Aggregate {
                group_by,
                aggregates,
            } => {
                let input_schema = node.children[0].output_schema()?;
                let grouping_expressions = group_by
                    .iter()
                    .map(|g| self.produce_expression(g, &input_schema))
                    .collect::<Result<Vec<_>, _>>()?;
                let measures = aggregates
                    .iter()
                    .map(|a| self.produce_measure(a, &input_schema))
                    .collect::<Result<Vec<_>, _>>()?;
                let groupings = if grouping_expressions.is_empty() {
                    vec![]
                } else {
                    #[allow(deprecated)]
                    let grouping = proto::aggregate_rel::Grouping {
                        grouping_expressions,
                        ..Default::default()
                    };
                    vec![grouping]
                };
                RelType::Aggregate(Box::new(proto::AggregateRel {
                    input: Some(self.child_rel(node, 0)?),
                    groupings,
                    measures,
                    ..Default::default()
                }))
            }
            LogicalOp::Sort { order } => {
                let input_schema = node.children[0].output_schema()?;
                let sorts = order
                    .iter()
                    .map(|key| {
                        Ok(proto::SortField {
                            expr: Some(self.produce_expression(&key.expr, &input_schema)?),
                            sort_kind: Some(proto::sort_field::SortKind::Direction(
                                sort_direction(key) as i32,
                            )),
                        })
                    })
                    .collect::<Result<Vec<_>, TranslationError>>()?;
                RelType::Sort(Box::new(proto::SortRel {
                    input: Some(self.child_rel(node, 0)?),
                    sorts,
                    ..Default::default()
                }))
            }
            LogicalOp::Limit { offset, count } => {
                let count = match count {
                    Some(c) => to_i64(*c, "limit")?,
                    None => -1,
                };
                RelType::Fetch(Box::new(proto::FetchRel {
                    input: Some(self.child_rel(node, 0)?),
                    offset: to_i64(*offset, "offset")?,
                    count,
                    ..Default::default()
                }))
            }
            LogicalOp::SetOperation { op } => {
                let inputs = node
                    .children
                    .iter()
                    .map(|c| self.produce_rel(c))
                    .collect::<Result<Vec<_>, _>>()?;
                RelType::Set(proto::SetRel {
                    inputs,
                    op: convert_set_op(*op) as i32,
                    ..Default::default()
                })
            }
            LogicalOp::Write { table, kind } => {
                let input_schema = node.children[0].output_schema()?;
                let write_op = match kind {
                    WriteKind::Insert => proto::write_rel::WriteOp::Insert,
                    WriteKind::CreateTableAs => proto::write_rel::WriteOp::Ctas,
                    WriteKind::Delete => proto::write_rel::WriteOp::Delete,
                };
                RelType::Write(Box::new(proto::WriteRel {
                    table_schema: Some(named_struct(&input_schema)?),
                    op: write_op as i32,
                    input: Some(self.child_rel(node, 0)?),
                    output: proto::write_rel::OutputMode::ModifiedRecords as i32,
                    write_type: Some(proto::write_rel::WriteType::NamedTable(
                        proto::NamedObjectWrite {
                            names: vec![table.schema.clone(), table.name.clone()],
                            ..Default::default()
                        },
                    )),
                    ..Default::default()
                }))
            }
            LogicalOp::Sample { .. } => {
                return Err(TranslationError::UnsupportedOperator("SAMPLE".into()))
            }
        };
        Ok(rel(rel_type))
    }

    /// Register `name` for the given argument types and build the call.
    fn call(
        &mut self,
        file: &str,
        name: &str,
        signature: &[DataType],
        arguments: Vec<proto::Expression>,
        output: DataType,
    ) -> proto::Expression {
        let function_reference = self
            .extensions
            .register(file, compound_name(name, signature));
        proto::Expression {
            rex_type: Some(RexType::ScalarFunction(proto::expression::ScalarFunction {
                function_reference,
                arguments: arguments.into_iter().map(value_argument).collect(),
                output_type: to_substrait_type(output, true),
                ..Default::default()
            })),
        }
    }

    fn produce_args(
        &mut self,
        args: &[&Expr],
        input: &Schema,
    ) -> Result<(Vec<DataType>, Vec<proto::Expression>), TranslationError> {
        let mut types = Vec::with_capacity(args.len());
        let mut exprs = Vec::with_capacity(args.len());
        for a in args {
            types.push(a.data_type(input)?);
            exprs.push(self.produce_expression(a, input)?);
        }
        Ok((types, exprs))
    }

    /// Convert an expression evaluated over rows of `input`.
    fn produce_expression(
        &mut self,
        expr: &Expr,
        input: &Schema,
    ) -> Result<proto::Expression, TranslationError> {
        let output = expr.data_type(input)?;
        match expr {
            Expr::Column(c) => Ok(field_reference(c.index as usize)),
            Expr::Literal(v) => Ok(proto::Expression {
                rex_type: Some(RexType::Literal(produce_literal(v)?)),
            }),
            Expr::BinaryOp { op, left, right } => {
                let (types, args) = self.produce_args(&[&**left, &**right], input)?;
                let (file, name) = binary_function(*op, &types);
                Ok(self.call(file, name, &types, args, output))
            }
            Expr::UnaryOp { op, operand } => {
                let (types, args) = self.produce_args(&[&**operand], input)?;
                let (file, name) = match op {
                    UnaryOp::Not => (functions::BOOLEAN, "not"),
                    UnaryOp::Neg => (functions::ARITHMETIC, "negate"),
                    UnaryOp::IsNull => (functions::COMPARISON, "is_null"),
                    UnaryOp::IsNotNull => (functions::COMPARISON, "is_not_null"),
                };
                Ok(self.call(file, name, &types, args, output))
            }
            Expr::Function { name, args, .. } => {
                let spec =
                    lookup_scalar(name).ok_or_else(|| TranslationError::UnknownFunction(name.clone()))?;
                check_arity(name, spec.min_args, spec.max_args, args.len())?;
                let refs: Vec<&Expr> = args.iter().collect();
                let (types, exprs) = self.produce_args(&refs, input)?;
                let signature = if spec.max_args.is_none() {
                    &types[..1]
                } else {
                    &types[..]
                };
                Ok(self.call(spec.file, spec.substrait, signature, exprs, output))
            }
            Expr::And(items) | Expr::Or(items) => {
                let name = if matches!(expr, Expr::And(_)) { "and" } else { "or" };
                let refs: Vec<&Expr> = items.iter().collect();
                let (_, exprs) = self.produce_args(&refs, input)?;
                Ok(self.call(
                    functions::BOOLEAN,
                    name,
                    &[DataType::Boolean],
                    exprs,
                    output,
                ))
            }
            Expr::Between { expr: e, low, high } => {
                let (types, args) = self.produce_args(&[&**e, &**low, &**high], input)?;
                Ok(self.call(functions::COMPARISON, "between", &types, args, output))
            }
            Expr::Cast { expr: e, to } => {
                let target = to_substrait_type(*to, true).ok_or_else(|| {
                    TranslationError::UnsupportedType("CAST to NULL".into())
                })?;
                Ok(proto::Expression {
                    rex_type: Some(RexType::Cast(Box::new(proto::expression::Cast {
                        r#type: Some(target),
                        input: Some(Box::new(self.produce_expression(e, input)?)),
                        ..Default::default()
                    }))),
                })
            }
            Expr::InList { expr: e, list } => {
                let value = self.produce_expression(e, input)?;
                let options = list
                    .iter()
                    .map(|o| self.produce_expression(o, input))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(proto::Expression {
                    rex_type: Some(RexType::SingularOrList(Box::new(
                        proto::expression::SingularOrList {
                            value: Some(Box::new(value)),
                            options,
                        },
                    ))),
                })
            }
            Expr::Case {
                branches,
                else_expr,
            } => {
                let ifs = branches
                    .iter()
                    .map(|(when, then)| {
                        Ok(if_then::IfClause {
                            r#if: Some(self.produce_expression(when, input)?),
                            then: Some(self.produce_expression(then, input)?),
                        })
                    })
                    .collect::<Result<Vec<_>, TranslationError>>()?;
                let r#else = match else_expr {
                    Some(e) => Some(Box::new(self.produce_expression(e, input)?)),
                    None => None,
                };
                Ok(proto::Expression {
                    rex_type: Some(RexType::IfThen(Box::new(proto::expression::IfThen {
                        ifs,
                        r#else,
                    }))),
                })
            }
        }
    }

    fn produce_measure(
        &mut self,
        agg: &AggExpr,
        input: &Schema,
    ) -> Result<proto::aggregate_rel::Measure, TranslationError> {
        let output = agg.data_type(input)?;
        let (file, name, signature, arguments) = match (&agg.arg, agg.func) {
            (None, AggFunc::CountStar) => (functions::AGGREGATE_GENERIC, "count", vec![], vec![]),
            (Some(arg), AggFunc::Count) => {
                let value = self.produce_expression(arg, input)?;
                (
                    functions::AGGREGATE_GENERIC,
                    "count",
                    vec![DataType::Null],
                    vec![value],
                )
            }
            (Some(arg), func @ (AggFunc::Sum | AggFunc::Avg | AggFunc::Min | AggFunc::Max)) => {
                let arg_type = arg.data_type(input)?;
                let file = if matches!(arg_type, DataType::Decimal { .. }) {
                    functions::ARITHMETIC_DECIMAL
                } else {
                    functions::ARITHMETIC
                };
                let value = self.produce_expression(arg, input)?;
                (file, func.name(), vec![arg_type], vec![value])
            }
            (arg, func) => {
                return Err(TranslationError::InvalidArity {
                    function: func.name().to_string(),
                    expected: if func == AggFunc::CountStar { "0" } else { "1" }.to_string(),
                    actual: usize::from(arg.is_some()),
                })
            }
        };
        let function_reference = self
            .extensions
            .register(file, compound_name(name, &signature));
        let invocation = if agg.distinct {
            proto::aggregate_function::AggregationInvocation::Distinct
        } else {
            proto::aggregate_function::AggregationInvocation::All
        };
        Ok(proto::aggregate_rel::Measure {
            measure: Some(proto::AggregateFunction {
                function_reference,
                arguments: arguments.into_iter().map(value_argument).collect(),
                output_type: to_substrait_type(output, true),
                phase: proto::AggregationPhase::InitialToResult as i32,
                invocation: invocation as i32,
                ..Default::default()
            }),
            filter: None,
        })
    }
}

fn value_argument(e: proto::Expression) -> proto::FunctionArgument {
    proto::FunctionArgument {
        arg_type: Some(proto::function_argument::ArgType::Value(e)),
    }
}

fn binary_function(op: BinaryOp, types: &[DataType]) -> (&'static str, &'static str) {
    let decimal = types
        .iter()
        .any(|t| matches!(t, DataType::Decimal { .. }));
    let arithmetic = if decimal {
        functions::ARITHMETIC_DECIMAL
    } else {
        functions::ARITHMETIC
    };
    match op {
        BinaryOp::Eq => (functions::COMPARISON, "equal"),
        BinaryOp::NotEq => (functions::COMPARISON, "not_equal"),
        BinaryOp::Lt => (functions::COMPARISON, "lt"),
        BinaryOp::LtEq => (functions::COMPARISON, "lte"),
        BinaryOp::Gt => (functions::COMPARISON, "gt"),
        BinaryOp::GtEq => (functions::COMPARISON, "gte"),
        BinaryOp::Add => (arithmetic, "add"),
        BinaryOp::Sub => (arithmetic, "subtract"),
        BinaryOp::Mul => (arithmetic, "multiply"),
        BinaryOp::Div => (arithmetic, "divide"),
        BinaryOp::Mod => (arithmetic, "modulus"),
    }
}

/// Convert a scalar value to a Substrait literal.
fn produce_literal(value: &ScalarValue) -> Result<proto::expression::Literal, TranslationError> {
    use literal::LiteralType;
    let literal_type = match value {
        ScalarValue::Null(t) => {
            let ty = to_substrait_type(*t, true).ok_or_else(|| {
                TranslationError::UnsupportedType("NULL literal without a type".into())
            })?;
            LiteralType::Null(ty)
        }
        ScalarValue::Bool(v) => LiteralType::Boolean(*v),
        ScalarValue::Int8(v) => LiteralType::I8(i32::from(*v)),
        ScalarValue::Int16(v) => LiteralType::I16(i32::from(*v)),
        ScalarValue::Int32(v) => LiteralType::I32(*v),
        ScalarValue::Int64(v) => LiteralType::I64(*v),
        ScalarValue::Float32(v) => LiteralType::Fp32(v.into_inner()),
        ScalarValue::Float64(v) => LiteralType::Fp64(v.into_inner()),
        ScalarValue::Decimal {
            value,
            precision,
            scale,
        } => LiteralType::Decimal(literal::Decimal {
            value: value.to_le_bytes().to_vec().into(),
            precision: i32::from(*precision),
            scale: i32::from(*scale),
        }),
        ScalarValue::Utf8(v) => LiteralType::String(v.clone()),
        ScalarValue::Date(v) => LiteralType::Date(*v),
    };
    Ok(proto::expression::Literal {
        nullable: value.is_null(),
        literal_type: Some(literal_type),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use planx_core::types::Field;

    fn integers() -> PlanNode {
        PlanNode::logical(
            LogicalOp::Scan {
                table: TableRef::bare("integers"),
                schema: Schema::new(vec![Field::new("i", DataType::Int32, true)]),
                projection: None,
                predicate: None,
                statistics: None,
            },
            vec![],
        )
    }

    fn root_input(plan: &proto::Plan) -> &proto::Rel {
        match &plan.relations[0].rel_type {
            Some(proto::plan_rel::RelType::Root(root)) => root.input.as_ref().unwrap(),
            other => panic!("expected root relation, got {:?}", other),
        }
    }

    #[test]
    fn test_limit_becomes_fetch() {
        let plan = PlanNode::logical(
            LogicalOp::Limit {
                offset: 0,
                count: Some(5),
            },
            vec![integers()],
        );
        let produced = translate_plan(&plan).unwrap();
        match &root_input(&produced).rel_type {
            Some(RelType::Fetch(fetch)) => {
                assert_eq!(fetch.count, 5);
                assert_eq!(fetch.offset, 0);
            }
            other => panic!("expected FetchRel, got {:?}", other),
        }
        match &produced.relations[0].rel_type {
            Some(proto::plan_rel::RelType::Root(root)) => assert_eq!(root.names, vec!["i"]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unbounded_limit_uses_minus_one() {
        let plan = PlanNode::logical(
            LogicalOp::Limit {
                offset: 3,
                count: None,
            },
            vec![integers()],
        );
        match &root_input(&translate_plan(&plan).unwrap()).rel_type {
            Some(RelType::Fetch(fetch)) => assert_eq!((fetch.offset, fetch.count), (3, -1)),
            other => panic!("expected FetchRel, got {:?}", other),
        }
    }

    #[test]
    fn test_project_emits_only_new_columns() {
        let plan = PlanNode::logical(
            LogicalOp::Project {
                exprs: vec![Expr::binary(
                    BinaryOp::Add,
                    Expr::column("i", 0),
                    Expr::literal(ScalarValue::Int32(1)),
                )],
                aliases: vec!["j".into()],
            },
            vec![integers()],
        );
        let produced = translate_plan(&plan).unwrap();
        match &root_input(&produced).rel_type {
            Some(RelType::Project(project)) => {
                let emit = project.common.as_ref().and_then(|c| c.emit_kind.as_ref());
                match emit {
                    Some(proto::rel_common::EmitKind::Emit(e)) => {
                        assert_eq!(e.output_mapping, vec![1])
                    }
                    other => panic!("expected emit mapping, got {:?}", other),
                }
            }
            other => panic!("expected ProjectRel, got {:?}", other),
        }
        assert_eq!(produced.extensions.len(), 1);
        match &produced.extensions[0].mapping_type {
            Some(proto::extensions::simple_extension_declaration::MappingType::ExtensionFunction(f)) => {
                assert_eq!(f.name, "add:i32_i32");
                assert_eq!(f.function_anchor, 1);
            }
            other => panic!("expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_fail_closed() {
        let sample = PlanNode::logical(LogicalOp::Sample { percentage: 10.0 }, vec![integers()]);
        assert!(matches!(
            translate(&sample),
            Err(TranslationError::UnsupportedOperator(_))
        ));

        let unknown = PlanNode::logical(
            LogicalOp::Project {
                exprs: vec![Expr::Function {
                    name: "no_such_function".into(),
                    args: vec![Expr::column("i", 0)],
                    return_type: DataType::Int32,
                }],
                aliases: vec!["x".into()],
            },
            vec![integers()],
        );
        assert!(matches!(
            translate(&unknown),
            Err(TranslationError::UnknownFunction(name)) if name == "no_such_function"
        ));

        let bad_arity = PlanNode::logical(
            LogicalOp::Project {
                exprs: vec![Expr::Function {
                    name: "upper".into(),
                    args: vec![],
                    return_type: DataType::Varchar,
                }],
                aliases: vec!["x".into()],
            },
            vec![integers()],
        );
        assert!(matches!(
            translate(&bad_arity),
            Err(TranslationError::InvalidArity { .. })
        ));

        let physical = PlanNode::physical(PhysicalOp::CrossProduct, vec![]);
        assert!(matches!(
            translate(&physical),
            Err(TranslationError::PhysicalOperator(_))
        ));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let plan = PlanNode::logical(
            LogicalOp::Filter {
                predicate: Expr::And(vec![
                    Expr::binary(
                        BinaryOp::Gt,
                        Expr::column("i", 0),
                        Expr::literal(ScalarValue::Int32(1)),
                    ),
                    Expr::binary(
                        BinaryOp::Lt,
                        Expr::column("i", 0),
                        Expr::literal(ScalarValue::Int32(9)),
                    ),
                ]),
            },
            vec![integers()],
        );
        assert_eq!(translate(&plan).unwrap(), translate(&plan).unwrap());
        let json = translate_to_json(&plan).unwrap();
        assert!(json.contains("functions_comparison.yaml"));
    }
}
