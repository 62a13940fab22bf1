//! Explain Substrait plans end to end: translate a logical plan, hand the
//! bytes to the explainer and check the rendered text.

use planx_core::builder::PlanBuilder;
use planx_core::catalog::InMemoryCatalog;
use planx_core::expr::*;
use planx_core::stats::{ColumnStatistics, Statistics};
use planx_core::types::{DataType, Field, Schema};
use planx_core::PlanNode;
use planx_explain::document::{LOGICAL_PLAN_KEY, PHYSICAL_PLAN_KEY};
use planx_explain::{
    explain_substrait, explain_substrait_json, ExplainConfig, ExplainError, Explainer, PlanKind,
    RenderConfig, RendererRegistry,
};
use planx_substrait::translate;

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
        ]),
        Some(
            Statistics::new(1_500_000.0, 24_000_000.0)
                .with_column("o_orderkey", ColumnStatistics::new(1_500_000.0, 0.0))
                .with_column("o_custkey", ColumnStatistics::new(100_000.0, 0.0)),
        ),
    );
    catalog.add_table(
        &TableRef::new("tpch", "customer"),
        Schema::new(vec![
            Field::new("c_custkey", DataType::Int64, false),
            Field::new("c_name", DataType::Varchar, false),
        ]),
        None,
    );
    catalog
}

fn limit_over_integers() -> Vec<u8> {
    let plan = PlanBuilder::scan(&catalog(), &TableRef::bare("integers"))
        .unwrap()
        .limit(0, Some(5))
        .build()
        .unwrap();
    translate(&plan).unwrap()
}

const LIMIT_OVER_SCAN: &str = "\
┌───────────────────────────┐
│      STREAMING_LIMIT      │
└─────────────┬─────────────┘
┌─────────────┴─────────────┐
│          SEQ_SCAN         │
│    ────────────────────   │
│      Table: integers      │
│   Type: Sequential Scan   │
│       Projections: i      │
└───────────────────────────┘
";

#[test]
fn test_limit_over_scan_physical_plan() {
    let doc = explain_substrait(&limit_over_integers(), PlanKind::Physical).unwrap();
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.rows()[0].explain_key, PHYSICAL_PLAN_KEY);
    assert_eq!(doc.physical_plan(), Some(LIMIT_OVER_SCAN));
}

#[test]
fn test_explain_is_repeatable() {
    let bytes = limit_over_integers();
    let explainer = Explainer::default();
    let first = explainer.explain_substrait(&bytes, PlanKind::All).unwrap();
    for _ in 0..3 {
        assert_eq!(explainer.explain_substrait(&bytes, PlanKind::All).unwrap(), first);
    }
}

#[test]
fn test_all_lists_logical_then_physical() {
    let doc = explain_substrait(&limit_over_integers(), PlanKind::All).unwrap();
    let keys: Vec<&str> = doc.rows().iter().map(|r| r.explain_key.as_str()).collect();
    assert_eq!(keys, vec![LOGICAL_PLAN_KEY, PHYSICAL_PLAN_KEY]);

    let logical = doc.logical_plan().unwrap();
    assert!(logical.contains("LIMIT"));
    assert!(logical.contains("Limit: 5"));
    assert!(logical.contains("READ"));
    assert!(!logical.contains("STREAMING_LIMIT"));
}

#[test]
fn test_json_input() {
    let plan = PlanBuilder::scan(&catalog(), &TableRef::bare("integers"))
        .unwrap()
        .limit(0, Some(5))
        .build()
        .unwrap();
    let json = planx_substrait::translate_to_json(&plan).unwrap();
    let doc = explain_substrait_json(&json, PlanKind::Physical).unwrap();
    assert_eq!(doc.physical_plan(), Some(LIMIT_OVER_SCAN));
}

#[test]
fn test_missing_renderer_is_unsupported() {
    let mut registry = RendererRegistry::default();
    assert!(registry.remove(OpKind::Physical(PhysicalOpKind::SeqScan)));
    let explainer = Explainer::default().with_registry(registry);

    let err = explainer
        .explain_substrait(&limit_over_integers(), PlanKind::Physical)
        .unwrap_err();
    assert!(matches!(err, ExplainError::UnsupportedOperator(ref op) if op.contains("SeqScan")));

    // The logical tree never reaches the physical renderer.
    assert!(explainer
        .explain_substrait(&limit_over_integers(), PlanKind::Logical)
        .is_ok());
}

#[test]
fn test_undecodable_input_is_malformed() {
    assert!(matches!(
        explain_substrait(&[0xff, 0xff, 0xff, 0x01], PlanKind::Physical),
        Err(ExplainError::MalformedPlan(_))
    ));
    assert!(matches!(
        explain_substrait(&[], PlanKind::Physical),
        Err(ExplainError::MalformedPlan(_))
    ));
    assert!(matches!(
        explain_substrait_json("{not json", PlanKind::Physical),
        Err(ExplainError::MalformedPlan(_))
    ));
}

#[test]
fn test_unknown_relation_is_unsupported() {
    let json = r#"{"relations": [{"rel": {"extensionLeaf": {}}}]}"#;
    assert!(matches!(
        explain_substrait_json(json, PlanKind::Physical),
        Err(ExplainError::UnsupportedOperator(_))
    ));
}

#[test]
fn test_join_branches_right() {
    let condition = Expr::binary(
        BinaryOp::Eq,
        Expr::column("o_custkey", 1),
        Expr::column("c_custkey", 2),
    );
    let plan = PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "orders"))
        .unwrap()
        .join(
            PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "customer")).unwrap(),
            JoinType::Inner,
            condition,
        )
        .build()
        .unwrap();
    let doc = explain_substrait(&translate(&plan).unwrap(), PlanKind::Physical).unwrap();
    let text = doc.physical_plan().unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[1].contains("HASH_JOIN"));
    assert!(text.contains("├"));
    assert!(text.contains("┐"));
    let child_tops = lines
        .iter()
        .find(|l| l.matches('┴').count() == 2)
        .expect("both children sit on one row");
    assert!(child_tops.starts_with('┌'));
    assert!(text.contains("Table: orders"));
    assert!(text.contains("Table: customer"));
}

#[test]
fn test_cardinality_from_statistics() {
    let plan = PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "orders"))
        .unwrap()
        .limit(0, Some(10))
        .build()
        .unwrap();
    let bytes = translate(&plan).unwrap();

    let text = explain_substrait(&bytes, PlanKind::Physical)
        .unwrap()
        .physical_plan()
        .unwrap()
        .to_string();
    assert!(text.contains("~1500000 rows"));
    assert_eq!(text.matches("rows").count(), 1);

    let quiet = Explainer::new(ExplainConfig {
        show_cardinality: false,
        ..ExplainConfig::default()
    });
    let text = quiet.explain_substrait(&bytes, PlanKind::Physical).unwrap();
    assert!(!text.to_string().contains("rows"));
}

// ---------------------------------------------------------------------------
// Rendering limits
// ---------------------------------------------------------------------------

fn physical_text(explainer: &Explainer, plan: &PlanNode) -> String {
    let bytes = translate(plan).unwrap();
    explainer
        .explain_substrait(&bytes, PlanKind::Physical)
        .unwrap()
        .physical_plan()
        .unwrap()
        .to_string()
}

/// `text` centered in a box interior of `inner` characters, odd space on the left.
fn boxed(text: &str, inner: usize) -> String {
    let total = inner - text.chars().count();
    format!(
        "│{}{}{}│",
        " ".repeat(total / 2 + total % 2),
        text,
        " ".repeat(total / 2)
    )
}

#[test]
fn test_long_filter_truncated_at_max_node_width() {
    let predicate = Expr::InList {
        expr: Box::new(Expr::column("o_orderkey", 0)),
        list: (10_000..10_030)
            .map(|k| Expr::literal(ScalarValue::Int64(k)))
            .collect(),
    };
    let mut plan = PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "orders"))
        .unwrap()
        .build()
        .unwrap();
    if let Operator::Logical(LogicalOp::Scan { predicate: p, .. }) = &mut plan.op {
        *p = Some(predicate.clone());
    }

    let text = physical_text(&Explainer::default(), &plan);
    let filters: String = format!("Filters: {}", predicate).chars().take(56).collect();
    assert!(text.lines().any(|l| l == format!("│{}…│", filters)));
    assert!(text.lines().all(|l| l.chars().count() == 59));
}

#[test]
fn test_extra_lines_elided_but_cardinality_kept() {
    let plan = PlanBuilder::scan(&catalog(), &TableRef::new("tpch", "orders"))
        .unwrap()
        .project(
            (0..40).map(|_| Expr::column("o_orderkey", 0)).collect(),
            (0..40).map(|i| format!("k{}", i)).collect(),
        )
        .build()
        .unwrap();
    let text = physical_text(&Explainer::default(), &plan);
    let lines: Vec<&str> = text.lines().collect();
    // "Projections: o_orderkey, o_custkey" on the scan widens every box.
    let inner = lines[0].chars().count() - 2;
    assert_eq!(inner, 37);

    assert_eq!(lines[1], boxed("PROJECTION", inner));
    assert_eq!(lines[2], boxed("────────────────────", inner));
    for line in &lines[3..30] {
        assert_eq!(*line, boxed("o_orderkey", inner));
    }
    assert_eq!(lines[30], boxed("…", inner));
    assert_eq!(lines[31], boxed("~1500000 rows", inner));
    assert!(lines[32].starts_with('└'));

    let tight = Explainer::new(ExplainConfig {
        render: RenderConfig {
            max_extra_lines: 4,
            ..RenderConfig::default()
        },
        ..ExplainConfig::default()
    });
    let text = physical_text(&tight, &plan);
    let lines: Vec<&str> = text.lines().collect();
    // The scan's projection list is elided too, so the boxes shrink back.
    let inner = lines[0].chars().count() - 2;
    assert_eq!(inner, 27);
    assert_eq!(lines[3], boxed("o_orderkey", inner));
    assert_eq!(lines[4], boxed("…", inner));
    assert_eq!(lines[5], boxed("~1500000 rows", inner));
    assert!(lines[6].starts_with('└'));
}

#[test]
fn test_wide_union_clipped_at_max_render_width() {
    let base = || PlanBuilder::scan(&catalog(), &TableRef::bare("integers")).unwrap();
    let plan = base()
        .set_operation(SetOpKind::UnionAll, (0..9).map(|_| base()).collect())
        .build()
        .unwrap();
    let text = physical_text(&Explainer::default(), &plan);
    let lines: Vec<&str> = text.lines().collect();

    let through = format!("{}┬{}", "─".repeat(14), "─".repeat(14));
    assert_eq!(
        lines[1],
        format!("│{}UNION{}├{}", " ".repeat(11), " ".repeat(11), through.repeat(8))
    );
    let child_top = format!("┌{}┴{}┐", "─".repeat(13), "─".repeat(13));
    assert_eq!(lines[3], child_top.repeat(9));
    assert_eq!(lines[4], boxed("SEQ_SCAN", 27).repeat(9));
    assert!(lines.iter().all(|l| l.chars().count() <= 9 * 29));
}

#[test]
fn test_out_of_range_widths_do_not_break_layout() {
    for (node_render_width, max_node_width) in [(29, 0), (1, 1), (30, 29)] {
        let explainer = Explainer::new(ExplainConfig {
            render: RenderConfig {
                node_render_width,
                max_node_width,
                ..RenderConfig::default()
            },
            ..ExplainConfig::default()
        });
        let doc = explainer
            .explain_substrait(&limit_over_integers(), PlanKind::Physical)
            .unwrap();
        let text = doc.physical_plan().unwrap();
        let width = text.lines().next().unwrap().chars().count();
        assert_eq!(width % 2, 1);
        assert!(text.lines().all(|l| l.chars().count() == width), "{}", text);
    }
}
