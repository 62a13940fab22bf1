//! Translate logical plans to Substrait and decode them again.
//!
//! Every supported logical operator must survive the trip with its tree shape
//! intact: the same operator kinds, in the same pre-order, with the same
//! number of children.

use planx_core::builder::PlanBuilder;
use planx_core::catalog::InMemoryCatalog;
use planx_core::expr::*;
use planx_core::stats::{ColumnStatistics, Statistics};
use planx_core::types::{DataType, Field, Schema};
use planx_core::PlanNode;
use planx_substrait::{decode_json, decode_plan, translate, translate_to_json, TranslationError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_table(
        &TableRef::bare("integers"),
        Schema::new(vec![Field::new("i", DataType::Int32, true)]),
        None,
    );
    catalog.add_table(
        &TableRef::new("tpch", "orders"),
        Schema::new(vec![
            Field::new("o_orderkey", DataType::Int64, false),
            Field::new("o_custkey", DataType::Int64, false),
            Field::new(
                "o_totalprice",
                DataType::Decimal {
                    precision: 12,
                    scale: 2,
                },
                false,
            ),
            Field::new("o_orderdate", DataType::Date, false),
            Field::new("o_comment", DataType::Varchar, true),
        ]),
        Some(
            Statistics::new(1_500_000.0, 165_000_000.0)
                .with_column("o_orderkey", ColumnStatistics::new(1_500_000.0, 0.0))
                .with_column("o_custkey", ColumnStatistics::new(100_000.0, 0.0)),
        ),
    );
    catalog.add_table(
        &TableRef::new("tpch", "customer"),
        Schema::new(vec![
            Field::new("c_custkey", DataType::Int64, false),
            Field::new("c_name", DataType::Varchar, false),
            Field::new("c_nationkey", DataType::Int32, false),
        ]),
        None,
    );
    catalog
}

fn integers() -> PlanBuilder {
    PlanBuilder::scan(&catalog(), &TableRef::bare("integers")).unwrap()
}

fn orders() -> PlanBuilder {
    PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "orders")).unwrap()
}

fn customer() -> PlanBuilder {
    PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "customer")).unwrap()
}

fn int(v: i32) -> Expr {
    Expr::literal(ScalarValue::Int32(v))
}

fn assert_roundtrip(plan: &PlanNode) -> PlanNode {
    let bytes = translate(plan).unwrap();
    let decoded = decode_plan(&bytes).unwrap();
    assert_eq!(decoded.shape(), plan.shape(), "shape changed for {:?}", plan);
    decoded
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[test]
fn test_scan_filter_limit_is_exact() {
    let base = integers();
    let i = base.col("i").unwrap();
    let plan = base
        .filter(Expr::binary(BinaryOp::Gt, i, int(1)))
        .limit(0, Some(5))
        .build()
        .unwrap();
    let decoded = assert_roundtrip(&plan);
    assert_eq!(decoded, plan);
}

#[test]
fn test_scan_with_projection_predicate_and_statistics() {
    let mut scan = orders().build().unwrap();
    if let Operator::Logical(LogicalOp::Scan {
        projection,
        predicate,
        ..
    }) = &mut scan.op
    {
        *projection = Some(vec![3, 0]);
        *predicate = Some(Expr::Between {
            expr: Box::new(Expr::column("o_orderdate", 3)),
            low: Box::new(Expr::literal(ScalarValue::Date(8766))),
            high: Box::new(Expr::literal(ScalarValue::Date(9131))),
        });
    }
    let decoded = assert_roundtrip(&scan);
    assert_eq!(decoded, scan);
    assert_eq!(
        decoded.output_schema().unwrap().names(),
        vec!["o_orderdate", "o_orderkey"]
    );
}

#[test]
fn test_values() {
    let schema = Schema::new(vec![
        Field::new("a", DataType::Int32, true),
        Field::new("b", DataType::Varchar, true),
    ]);
    let plan = PlanBuilder::values(
        schema,
        vec![
            vec![ScalarValue::Int32(1), ScalarValue::Utf8("x".into())],
            vec![ScalarValue::Int32(2), ScalarValue::Null(DataType::Varchar)],
        ],
    )
    .build()
    .unwrap();
    let decoded = assert_roundtrip(&plan);
    assert_eq!(decoded, plan);
}

#[test]
fn test_project_keeps_aliases_below_limit() {
    let base = integers();
    let i = base.col("i").unwrap();
    let plan = base
        .project(
            vec![
                Expr::binary(BinaryOp::Mul, i.clone(), int(2)),
                Expr::Function {
                    name: "abs".into(),
                    args: vec![i],
                    return_type: DataType::Int32,
                },
            ],
            vec!["doubled".into(), "magnitude".into()],
        )
        .limit(2, None)
        .build()
        .unwrap();
    let decoded = assert_roundtrip(&plan);
    assert_eq!(
        decoded.output_schema().unwrap().names(),
        vec!["doubled", "magnitude"]
    );
}

#[test]
fn test_join_types() {
    for join_type in [
        JoinType::Inner,
        JoinType::Left,
        JoinType::Right,
        JoinType::Full,
        JoinType::Semi,
        JoinType::Anti,
        JoinType::Single,
    ] {
        let condition = Expr::binary(
            BinaryOp::Eq,
            Expr::column("o_custkey", 1),
            Expr::column("c_custkey", 5),
        );
        let plan = orders()
            .join(customer(), join_type, condition)
            .build()
            .unwrap();
        let decoded = assert_roundtrip(&plan);
        match &decoded.op {
            Operator::Logical(LogicalOp::Join { join_type: jt, .. }) => assert_eq!(*jt, join_type),
            other => panic!("expected join, got {:?}", other),
        }
    }
}

#[test]
fn test_cross_product() {
    let plan = integers().cross_product(customer()).build().unwrap();
    assert_roundtrip(&plan);
}

#[test]
fn test_aggregate_grouped_and_ungrouped() {
    let grouped = orders()
        .aggregate(
            vec![Expr::column("o_custkey", 1)],
            vec![
                AggExpr::count_star(),
                AggExpr::new(AggFunc::Sum, Expr::column("o_totalprice", 2)),
                AggExpr {
                    func: AggFunc::Count,
                    arg: Some(Expr::column("o_comment", 4)),
                    distinct: true,
                },
            ],
        )
        .build()
        .unwrap();
    let decoded = assert_roundtrip(&grouped);
    assert_eq!(decoded, grouped);

    let ungrouped = integers()
        .aggregate(vec![], vec![AggExpr::new(AggFunc::Max, Expr::column("i", 0))])
        .build()
        .unwrap();
    assert_eq!(assert_roundtrip(&ungrouped), ungrouped);
}

#[test]
fn test_sort() {
    let plan = orders()
        .sort(vec![
            SortKey {
                expr: Expr::column("o_orderdate", 3),
                ascending: false,
                nulls_first: false,
            },
            SortKey {
                expr: Expr::column("o_orderkey", 0),
                ascending: true,
                nulls_first: true,
            },
        ])
        .build()
        .unwrap();
    assert_eq!(assert_roundtrip(&plan), plan);
}

#[test]
fn test_set_operations() {
    for op in [
        SetOpKind::UnionAll,
        SetOpKind::UnionDistinct,
        SetOpKind::Except,
        SetOpKind::Intersect,
    ] {
        let plan = integers()
            .set_operation(op, vec![integers(), integers()])
            .build()
            .unwrap();
        let decoded = assert_roundtrip(&plan);
        assert_eq!(decoded.children.len(), 3);
    }
}

#[test]
fn test_writes() {
    for kind in [WriteKind::Insert, WriteKind::CreateTableAs, WriteKind::Delete] {
        let plan = integers()
            .write(TableRef::bare("target"), kind)
            .build()
            .unwrap();
        let decoded = assert_roundtrip(&plan);
        assert_eq!(decoded.output_schema().unwrap().names(), vec!["Count"]);
    }
}

#[test]
fn test_expressions_survive() {
    let base = customer();
    let name = base.col("c_name").unwrap();
    let nation = base.col("c_nationkey").unwrap();
    let predicate = Expr::Or(vec![
        Expr::InList {
            expr: Box::new(nation.clone()),
            list: vec![int(1), int(2), int(3)],
        },
        Expr::And(vec![
            Expr::unary(UnaryOp::IsNotNull, name.clone()),
            Expr::Function {
                name: "prefix".into(),
                args: vec![name.clone(), Expr::literal(ScalarValue::Utf8("A".into()))],
                return_type: DataType::Boolean,
            },
        ]),
    ]);
    let plan = base
        .filter(predicate)
        .project(
            vec![
                Expr::Case {
                    branches: vec![(
                        Expr::binary(BinaryOp::LtEq, nation.clone(), int(10)),
                        Expr::literal(ScalarValue::Utf8("low".into())),
                    )],
                    else_expr: Some(Box::new(Expr::literal(ScalarValue::Utf8("high".into())))),
                },
                Expr::Cast {
                    expr: Box::new(nation),
                    to: DataType::Int64,
                },
                Expr::Function {
                    name: "upper".into(),
                    args: vec![name],
                    return_type: DataType::Varchar,
                },
            ],
            vec!["band".into(), "nation".into(), "name".into()],
        )
        .build()
        .unwrap();
    let decoded = assert_roundtrip(&plan);
    assert_eq!(decoded, plan);
}

// ---------------------------------------------------------------------------
// Determinism, JSON and rejection
// ---------------------------------------------------------------------------

#[test]
fn test_bytes_are_deterministic() {
    let plan = orders()
        .filter(Expr::binary(
            BinaryOp::Gt,
            Expr::column("o_totalprice", 2),
            Expr::literal(ScalarValue::Decimal {
                value: 100_000,
                precision: 12,
                scale: 2,
            }),
        ))
        .aggregate(vec![], vec![AggExpr::count_star()])
        .build()
        .unwrap();
    let first = translate(&plan).unwrap();
    for _ in 0..5 {
        assert_eq!(translate(&plan).unwrap(), first);
    }
}

#[test]
fn test_json_roundtrip() {
    let plan = integers().limit(0, Some(5)).build().unwrap();
    let json = translate_to_json(&plan).unwrap();
    let decoded = decode_json(&json).unwrap();
    assert_eq!(decoded, plan);
}

#[test]
fn test_sample_rejected() {
    let plan = integers().sample(10.0).build().unwrap();
    assert!(matches!(
        translate(&plan),
        Err(TranslationError::UnsupportedOperator(op)) if op == "SAMPLE"
    ));
}

#[test]
fn test_untyped_null_rejected() {
    let plan = integers()
        .filter(Expr::unary(
            UnaryOp::IsNull,
            Expr::literal(ScalarValue::Null(DataType::Null)),
        ))
        .build()
        .unwrap();
    assert!(matches!(
        translate(&plan),
        Err(TranslationError::UnsupportedType(_))
    ));
}

#[test]
fn test_invalid_plan_rejected() {
    let plan = PlanNode::logical(
        LogicalOp::Filter {
            predicate: Expr::column("missing", 3),
        },
        vec![integers().build().unwrap()],
    );
    assert!(matches!(
        translate(&plan),
        Err(TranslationError::InvalidPlan(_))
    ));
}
