//! # Expression and Operator Types
//!
//! This module defines the type system of the plan representation shared by the
//! translator and the explainer. It is organized into three layers:
//!
//! ## Scalar Expressions (`Expr`)
//! Scalar expressions compute a value per row: column references, literals,
//! arithmetic, comparisons, boolean logic, casts and function calls. Column
//! references are positional. A reference's `index` points into the output
//! schema of the operator's input (for joins, the concatenation of the left
//! and right inputs), which is exactly how Substrait field references work.
//! The `name` carried next to the index is only used for display.
//!
//! ## Logical Operators (`LogicalOp`)
//! Logical operators describe *what* to compute. They are what the translator
//! serializes and what the consumer rebuilds from a Substrait plan.
//!
//! ## Physical Operators (`PhysicalOp`)
//! Physical operators describe *how* the host engine would execute a logical
//! operator. They are produced by the physical planner and are what the
//! `physical_plan` explain row renders.
//!
//! ## Unified `Operator` Enum
//! `Operator` wraps both layers so a single `PlanNode` tree type can hold
//! either. The `OpKind` discriminant identifies an operator without its payload
//! and keys the explainer's renderer registry.

use crate::error::PlanError;
use crate::stats::Statistics;
use crate::types::{DataType, Schema};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default schema for tables referenced by a bare name.
pub const DEFAULT_SCHEMA: &str = "main";

/// Reference to a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// A table in the default schema.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_SCHEMA, name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Reference to a column of the input relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub index: u32,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref t) = self.table {
            write!(f, "{}.{}", t, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Scalar value for expressions.
///
/// Uses `OrderedFloat` for floating point so literals compare and hash like
/// every other value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    /// SQL NULL of the given type.
    Null(DataType),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    /// Unscaled decimal value: `value * 10^-scale`.
    Decimal { value: i128, precision: u8, scale: u8 },
    Utf8(String),
    /// Date as days since Unix epoch (1970-01-01).
    Date(i32),
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Null(t) => *t,
            ScalarValue::Bool(_) => DataType::Boolean,
            ScalarValue::Int8(_) => DataType::Int8,
            ScalarValue::Int16(_) => DataType::Int16,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float32(_) => DataType::Float32,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Decimal {
                precision, scale, ..
            } => DataType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            ScalarValue::Utf8(_) => DataType::Varchar,
            ScalarValue::Date(_) => DataType::Date,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null(_))
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null(_) => write!(f, "NULL"),
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::Int8(v) => write!(f, "{}", v),
            ScalarValue::Int16(v) => write!(f, "{}", v),
            ScalarValue::Int32(v) => write!(f, "{}", v),
            ScalarValue::Int64(v) => write!(f, "{}", v),
            ScalarValue::Float32(v) => write!(f, "{}", v),
            ScalarValue::Float64(v) => write!(f, "{}", v),
            ScalarValue::Decimal { value, scale, .. } => {
                write!(f, "{}", format_decimal(*value, *scale))
            }
            ScalarValue::Utf8(v) => write!(f, "'{}'", v),
            ScalarValue::Date(days) => write!(f, "{}", format_date(*days)),
        }
    }
}

fn format_decimal(value: i128, scale: u8) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let pow = 10u128.pow(u32::from(scale));
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / pow,
        abs % pow,
        width = usize::from(scale)
    )
}

/// Civil date from days since the epoch (proleptic Gregorian).
fn format_date(days: i32) -> String {
    let z = i64::from(days) + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// Scalar expressions used in predicates, projections, join conditions, etc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to an input column by ordinal index.
    Column(ColumnRef),
    /// Constant literal value.
    Literal(ScalarValue),
    /// Binary operation (e.g., `a + b`, `x = y`, `price > 100`).
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation (e.g., `NOT flag`, `-value`, `IS NULL`).
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Named scalar function call (e.g., `upper(name)`, `abs(value)`).
    Function {
        name: String,
        args: Vec<Expr>,
        return_type: DataType,
    },
    /// Conjunction (AND) of multiple predicates, stored flat.
    And(Vec<Expr>),
    /// Disjunction (OR) of multiple predicates.
    Or(Vec<Expr>),
    Cast { expr: Box<Expr>, to: DataType },
    /// `expr IN (list...)`.
    InList { expr: Box<Expr>, list: Vec<Expr> },
    /// `expr BETWEEN low AND high`, bounds inclusive.
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    /// Searched CASE: the first branch whose condition holds yields its value.
    Case {
        branches: Vec<(Expr, Expr)>,
        else_expr: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn column(name: impl Into<String>, index: u32) -> Expr {
        Expr::Column(ColumnRef {
            table: None,
            name: name.into(),
            index,
        })
    }

    pub fn literal(value: ScalarValue) -> Expr {
        Expr::Literal(value)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Return all column references in this expression.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut cols = Vec::new();
        self.collect_columns(&mut cols);
        cols
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expr::Column(c) => out.push(c),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_columns(out),
            Expr::Cast { expr, .. } => expr.collect_columns(out),
            Expr::Function { args, .. } | Expr::And(args) | Expr::Or(args) => {
                for a in args {
                    a.collect_columns(out);
                }
            }
            Expr::InList { expr, list } => {
                expr.collect_columns(out);
                for e in list {
                    e.collect_columns(out);
                }
            }
            Expr::Between { expr, low, high } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
            Expr::Case {
                branches,
                else_expr,
            } => {
                for (when, then) in branches {
                    when.collect_columns(out);
                    then.collect_columns(out);
                }
                if let Some(e) = else_expr {
                    e.collect_columns(out);
                }
            }
        }
    }

    /// Flatten AND-chains: (A AND (B AND C)) → [A, B, C].
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }

    /// True if some conjunct is `column = column`, which a hash join can use as a key.
    pub fn has_equi_conjunct(&self) -> bool {
        self.conjuncts().iter().any(|c| {
            matches!(
                c,
                Expr::BinaryOp { op: BinaryOp::Eq, left, right }
                    if matches!(**left, Expr::Column(_)) && matches!(**right, Expr::Column(_))
            )
        })
    }

    /// Type of this expression evaluated against rows of `input`.
    pub fn data_type(&self, input: &Schema) -> Result<DataType, PlanError> {
        match self {
            Expr::Column(c) => Ok(input.field(c.index as usize)?.data_type),
            Expr::Literal(v) => Ok(v.data_type()),
            Expr::BinaryOp { op, left, right } => {
                let l = left.data_type(input)?;
                let r = right.data_type(input)?;
                if op.is_comparison() {
                    Ok(DataType::Boolean)
                } else {
                    l.arithmetic_result(r)
                }
            }
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Neg => operand.data_type(input),
                UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull => {
                    operand.data_type(input)?;
                    Ok(DataType::Boolean)
                }
            },
            Expr::Function { return_type, .. } => Ok(*return_type),
            Expr::Cast { to, .. } => Ok(*to),
            Expr::And(_) | Expr::Or(_) | Expr::InList { .. } | Expr::Between { .. } => {
                Ok(DataType::Boolean)
            }
            Expr::Case {
                branches,
                else_expr,
            } => match (branches.first(), else_expr) {
                (Some((_, then)), _) => then.data_type(input),
                (None, Some(e)) => e.data_type(input),
                (None, None) => Ok(DataType::Null),
            },
        }
    }

    /// Name a projected expression gets when no alias is supplied.
    pub fn output_name(&self) -> String {
        match self {
            Expr::Column(c) => c.name.clone(),
            other => other.to_string(),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, e) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", e)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::BinaryOp { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "(NOT {})", operand),
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::IsNull => write!(f, "({} IS NULL)", operand),
                UnaryOp::IsNotNull => write!(f, "({} IS NOT NULL)", operand),
            },
            Expr::Function { name, args, .. } => {
                write!(f, "{}(", name)?;
                write_list(f, args, ", ")?;
                write!(f, ")")
            }
            Expr::And(exprs) => {
                write!(f, "(")?;
                write_list(f, exprs, " AND ")?;
                write!(f, ")")
            }
            Expr::Or(exprs) => {
                write!(f, "(")?;
                write_list(f, exprs, " OR ")?;
                write!(f, ")")
            }
            Expr::Cast { expr, to } => write!(f, "CAST({} AS {})", expr, to),
            Expr::InList { expr, list } => {
                write!(f, "({} IN (", expr)?;
                write_list(f, list, ", ")?;
                write!(f, "))")
            }
            Expr::Between { expr, low, high } => {
                write!(f, "({} BETWEEN {} AND {})", expr, low, high)
            }
            Expr::Case {
                branches,
                else_expr,
            } => {
                write!(f, "CASE")?;
                for (when, then) in branches {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(e) = else_expr {
                    write!(f, " ELSE {}", e)?;
                }
                write!(f, " END")
            }
        }
    }
}

/// Binary operators for comparison and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// Unary operators for boolean logic and null checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// SQL join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Inner join: only matching rows from both sides.
    Inner,
    /// Left outer join: all rows from left, matching from right (or NULLs).
    Left,
    /// Right outer join: all rows from right, matching from left (or NULLs).
    Right,
    /// Full outer join: all rows from both sides, NULLs where no match.
    Full,
    /// Semi join: left rows that have at least one match on the right (no right columns).
    Semi,
    /// Anti join: left rows that have no match on the right.
    Anti,
    /// Single join: like a left join, but at most one right row may match
    /// (scalar subqueries).
    Single,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Semi => "SEMI",
            JoinType::Anti => "ANTI",
            JoinType::Single => "SINGLE",
        };
        write!(f, "{}", s)
    }
}

/// Aggregate expression. `arg` is `None` only for `CountStar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggExpr {
    pub func: AggFunc,
    pub arg: Option<Expr>,
    pub distinct: bool,
}

impl AggExpr {
    pub fn new(func: AggFunc, arg: Expr) -> Self {
        Self {
            func,
            arg: Some(arg),
            distinct: false,
        }
    }

    pub fn count_star() -> Self {
        Self {
            func: AggFunc::CountStar,
            arg: None,
            distinct: false,
        }
    }

    pub fn data_type(&self, input: &Schema) -> Result<DataType, PlanError> {
        let arg_type = match &self.arg {
            Some(e) => Some(e.data_type(input)?),
            None => None,
        };
        match (self.func, arg_type) {
            (AggFunc::Count, _) | (AggFunc::CountStar, _) => Ok(DataType::Int64),
            (AggFunc::Sum, Some(DataType::Decimal { scale, .. })) => Ok(DataType::Decimal {
                precision: 38,
                scale,
            }),
            (AggFunc::Sum, Some(t)) if t.is_integer() => Ok(DataType::Int64),
            (AggFunc::Sum, Some(t)) | (AggFunc::Avg, Some(t)) if t.is_numeric() => {
                Ok(DataType::Float64)
            }
            (AggFunc::Min, Some(t)) | (AggFunc::Max, Some(t)) => Ok(t),
            (func, t) => Err(PlanError::TypeMismatch(format!(
                "{} cannot aggregate {}",
                func.name(),
                t.map(|t| t.to_string()).unwrap_or_else(|| "no argument".into())
            ))),
        }
    }
}

impl fmt::Display for AggExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func.name())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if let Some(arg) = &self.arg {
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::CountStar => "count_star",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {}", self.expr.output_name(), dir)
    }
}

/// Set operations over inputs with identical schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpKind {
    UnionAll,
    UnionDistinct,
    /// Rows of the first input not present in any other input.
    Except,
    /// Rows of the first input present in every other input.
    Intersect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteKind {
    Insert,
    CreateTableAs,
    Delete,
}

/// Logical operators -- represent *what* to compute, not *how*.
///
/// Children live on the enclosing `PlanNode`; each variant documents how many
/// it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Leaf. Reads a base table. `schema` is the full table schema; the
    /// optional `projection` selects (and orders) the columns produced, and the
    /// optional `predicate` is a filter pushed into the scan, expressed over the
    /// full schema.
    Scan {
        table: TableRef,
        schema: Schema,
        projection: Option<Vec<usize>>,
        predicate: Option<Expr>,
        statistics: Option<Statistics>,
    },
    /// Leaf. Literal rows.
    Values {
        schema: Schema,
        rows: Vec<Vec<ScalarValue>>,
    },
    /// One child. Keeps rows matching the predicate.
    Filter { predicate: Expr },
    /// One child. Computes the output expressions, named by `aliases`.
    Project {
        exprs: Vec<Expr>,
        aliases: Vec<String>,
    },
    /// Two children. The condition is expressed over the concatenated schemas.
    Join { join_type: JoinType, condition: Expr },
    /// Two children. Cartesian product.
    CrossProduct,
    /// One child. Groups by `group_by` and computes `aggregates` per group;
    /// output is the group keys followed by the aggregates.
    Aggregate {
        group_by: Vec<Expr>,
        aggregates: Vec<AggExpr>,
    },
    /// One child.
    Sort { order: Vec<SortKey> },
    /// One child. `count: None` means no upper bound (offset only).
    Limit { offset: u64, count: Option<u64> },
    /// Two or more children with identical schemas.
    SetOperation { op: SetOpKind },
    /// One child providing the rows to write (or to delete).
    Write { table: TableRef, kind: WriteKind },
    /// One child. Bernoulli sample of the given percentage. Has no Substrait
    /// counterpart.
    Sample { percentage: f64 },
}

/// Physical operators -- represent *how* the host engine executes a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicalOp {
    /// Full scan of a base table producing `columns`.
    SeqScan {
        table: TableRef,
        columns: Vec<String>,
        predicate: Option<Expr>,
    },
    /// Scan over materialized literal rows.
    ColumnDataScan { columns: Vec<String>, rows: usize },
    Filter { predicate: Expr },
    Projection { exprs: Vec<Expr> },
    /// Limit without offset; stops pulling input after `count` rows.
    StreamingLimit { count: Option<u64> },
    Limit { offset: u64, count: Option<u64> },
    /// Sort fused with a limit: keeps only the top `count` rows after `offset`.
    TopN {
        order: Vec<SortKey>,
        offset: u64,
        count: u64,
    },
    OrderBy { order: Vec<SortKey> },
    HashGroupBy {
        group_by: Vec<Expr>,
        aggregates: Vec<AggExpr>,
    },
    UngroupedAggregate { aggregates: Vec<AggExpr> },
    /// Hash join on the equality conjuncts of `condition`.
    HashJoin { join_type: JoinType, condition: Expr },
    /// Fallback join for conditions without an equality key.
    NestedLoopJoin { join_type: JoinType, condition: Expr },
    CrossProduct,
    /// `all = false` removes duplicates.
    Union { all: bool },
    Insert { table: TableRef },
    CreateTableAs { table: TableRef },
    Delete { table: TableRef },
    Sample { percentage: f64 },
}

/// Unified operator enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    Logical(LogicalOp),
    Physical(PhysicalOp),
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Operator::Physical(_))
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Logical(l) => OpKind::Logical(l.kind()),
            Operator::Physical(p) => OpKind::Physical(p.kind()),
        }
    }
}

/// Kind discriminant (operator without its data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOpKind {
    Scan,
    Values,
    Filter,
    Project,
    Join,
    CrossProduct,
    Aggregate,
    Sort,
    Limit,
    SetOperation,
    Write,
    Sample,
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::Scan { .. } => LogicalOpKind::Scan,
            LogicalOp::Values { .. } => LogicalOpKind::Values,
            LogicalOp::Filter { .. } => LogicalOpKind::Filter,
            LogicalOp::Project { .. } => LogicalOpKind::Project,
            LogicalOp::Join { .. } => LogicalOpKind::Join,
            LogicalOp::CrossProduct => LogicalOpKind::CrossProduct,
            LogicalOp::Aggregate { .. } => LogicalOpKind::Aggregate,
            LogicalOp::Sort { .. } => LogicalOpKind::Sort,
            LogicalOp::Limit { .. } => LogicalOpKind::Limit,
            LogicalOp::SetOperation { .. } => LogicalOpKind::SetOperation,
            LogicalOp::Write { .. } => LogicalOpKind::Write,
            LogicalOp::Sample { .. } => LogicalOpKind::Sample,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOpKind {
    SeqScan,
    ColumnDataScan,
    Filter,
    Projection,
    StreamingLimit,
    Limit,
    TopN,
    OrderBy,
    HashGroupBy,
    UngroupedAggregate,
    HashJoin,
    NestedLoopJoin,
    CrossProduct,
    Union,
    Insert,
    CreateTableAs,
    Delete,
    Sample,
}

impl PhysicalOp {
    pub fn kind(&self) -> PhysicalOpKind {
        match self {
            PhysicalOp::SeqScan { .. } => PhysicalOpKind::SeqScan,
            PhysicalOp::ColumnDataScan { .. } => PhysicalOpKind::ColumnDataScan,
            PhysicalOp::Filter { .. } => PhysicalOpKind::Filter,
            PhysicalOp::Projection { .. } => PhysicalOpKind::Projection,
            PhysicalOp::StreamingLimit { .. } => PhysicalOpKind::StreamingLimit,
            PhysicalOp::Limit { .. } => PhysicalOpKind::Limit,
            PhysicalOp::TopN { .. } => PhysicalOpKind::TopN,
            PhysicalOp::OrderBy { .. } => PhysicalOpKind::OrderBy,
            PhysicalOp::HashGroupBy { .. } => PhysicalOpKind::HashGroupBy,
            PhysicalOp::UngroupedAggregate { .. } => PhysicalOpKind::UngroupedAggregate,
            PhysicalOp::HashJoin { .. } => PhysicalOpKind::HashJoin,
            PhysicalOp::NestedLoopJoin { .. } => PhysicalOpKind::NestedLoopJoin,
            PhysicalOp::CrossProduct => PhysicalOpKind::CrossProduct,
            PhysicalOp::Union { .. } => PhysicalOpKind::Union,
            PhysicalOp::Insert { .. } => PhysicalOpKind::Insert,
            PhysicalOp::CreateTableAs { .. } => PhysicalOpKind::CreateTableAs,
            PhysicalOp::Delete { .. } => PhysicalOpKind::Delete,
            PhysicalOp::Sample { .. } => PhysicalOpKind::Sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    #[test]
    fn test_date_and_decimal_display() {
        assert_eq!(ScalarValue::Date(0).to_string(), "1970-01-01");
        assert_eq!(ScalarValue::Date(31).to_string(), "1970-02-01");
        assert_eq!(ScalarValue::Date(-1).to_string(), "1969-12-31");
        let dec = ScalarValue::Decimal {
            value: -1205,
            precision: 10,
            scale: 2,
        };
        assert_eq!(dec.to_string(), "-12.05");
    }

    #[test]
    fn test_conjuncts_and_equi_detection() {
        let eq = Expr::binary(BinaryOp::Eq, Expr::column("a", 0), Expr::column("b", 1));
        let gt = Expr::binary(
            BinaryOp::Gt,
            Expr::column("a", 0),
            Expr::literal(ScalarValue::Int32(5)),
        );
        let cond = Expr::And(vec![gt.clone(), Expr::And(vec![eq])]);
        assert_eq!(cond.conjuncts().len(), 2);
        assert!(cond.has_equi_conjunct());
        assert!(!gt.has_equi_conjunct());
    }

    #[test]
    fn test_expression_types() {
        let schema = Schema::new(vec![
            Field::new("i", DataType::Int32, true),
            Field::new("d", DataType::Float64, true),
        ]);
        let sum = Expr::binary(BinaryOp::Add, Expr::column("i", 0), Expr::column("d", 1));
        assert_eq!(sum.data_type(&schema).unwrap(), DataType::Float64);
        let cmp = Expr::binary(
            BinaryOp::Lt,
            Expr::column("i", 0),
            Expr::literal(ScalarValue::Int32(3)),
        );
        assert_eq!(cmp.data_type(&schema).unwrap(), DataType::Boolean);
        assert_eq!(cmp.to_string(), "(i < 3)");
        assert!(Expr::column("x", 7).data_type(&schema).is_err());

        let avg = AggExpr::new(AggFunc::Avg, Expr::column("i", 0));
        assert_eq!(avg.data_type(&schema).unwrap(), DataType::Float64);
        assert_eq!(
            AggExpr::count_star().data_type(&schema).unwrap(),
            DataType::Int64
        );
    }
}
