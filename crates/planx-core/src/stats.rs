//! # Table Statistics and Cardinality Derivation
//!
//! Scans may carry table statistics (they travel inside the Substrait plan as an
//! advanced extension). The physical planner uses them to annotate every
//! physical node with an estimated output cardinality, which the explainer
//! prints as `~N rows`.
//!
//! ## Derivation Formulas
//!
//! Statistics for intermediate nodes are derived bottom-up:
//!
//! - **Filter**: output_rows = input_rows * selectivity, NDVs scaled by the same ratio.
//! - **Join**: output_rows = |left| * |right| / max(NDV_left_key, NDV_right_key)
//!   per equi-join key (independence across keys).
//! - **Aggregate**: output_rows = product of group-by NDVs, capped by input rows.
//!
//! ## Selectivity Estimation
//!
//! - **Equality**: 1 / NDV.
//! - **Range**: fixed 1/3.
//! - **AND**: product; **OR**: inclusion-exclusion.
//! - **Anything else**: 0.1.
//!
//! Column statistics are keyed by column name in a `BTreeMap` so that encoding
//! them into a plan is deterministic.

use crate::expr::{BinaryOp, Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics for a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub row_count: f64,
    pub total_size_bytes: f64,
    pub column_stats: BTreeMap<String, ColumnStatistics>,
}

impl Statistics {
    pub fn new(row_count: f64, total_size_bytes: f64) -> Self {
        Self {
            row_count,
            total_size_bytes,
            column_stats: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, stats: ColumnStatistics) -> Self {
        self.column_stats.insert(name.into(), stats);
        self
    }

    /// Estimated row count rounded for display.
    pub fn estimated_rows(&self) -> u64 {
        self.row_count.max(0.0).round() as u64
    }

    fn avg_row_size(&self) -> f64 {
        if self.row_count > 0.0 {
            self.total_size_bytes / self.row_count
        } else {
            100.0
        }
    }
}

/// Per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of distinct values (NDV).
    pub distinct_count: f64,
    /// Fraction of rows that are NULL, in [0.0, 1.0].
    pub null_fraction: f64,
    /// Average size of one value in bytes.
    pub avg_row_size: f64,
}

impl ColumnStatistics {
    pub fn new(distinct_count: f64, null_fraction: f64) -> Self {
        Self {
            distinct_count,
            null_fraction,
            avg_row_size: 8.0,
        }
    }
}

/// Derive statistics for an equi-join over the given `(left, right)` key names.
///
/// A missing NDV falls back to the side's row count (all values distinct).
pub fn derive_join_stats(
    left: &Statistics,
    right: &Statistics,
    join_columns: &[(String, String)],
) -> Statistics {
    let mut selectivity = 1.0_f64;
    for (left_col, right_col) in join_columns {
        let left_ndv = left
            .column_stats
            .get(left_col)
            .map(|s| s.distinct_count)
            .unwrap_or(left.row_count);
        let right_ndv = right
            .column_stats
            .get(right_col)
            .map(|s| s.distinct_count)
            .unwrap_or(right.row_count);
        selectivity /= left_ndv.max(right_ndv).max(1.0);
    }

    let row_count = (left.row_count * right.row_count * selectivity).max(1.0);
    let total_size_bytes = row_count * (left.avg_row_size() + right.avg_row_size());

    let mut column_stats = BTreeMap::new();
    for (name, stats) in left.column_stats.iter().chain(right.column_stats.iter()) {
        let mut cs = stats.clone();
        cs.distinct_count = cs.distinct_count.min(row_count);
        column_stats.insert(name.clone(), cs);
    }

    Statistics {
        row_count,
        total_size_bytes,
        column_stats,
    }
}

/// Derive statistics for a cartesian product.
pub fn derive_cross_stats(left: &Statistics, right: &Statistics) -> Statistics {
    derive_join_stats(left, right, &[])
}

/// Derive statistics for filter output with the given selectivity.
pub fn derive_filter_stats(input: &Statistics, selectivity: f64) -> Statistics {
    let row_count = (input.row_count * selectivity).max(1.0);
    let ratio = if input.row_count > 0.0 {
        row_count / input.row_count
    } else {
        1.0
    };

    let column_stats = input
        .column_stats
        .iter()
        .map(|(name, stats)| {
            let mut cs = stats.clone();
            cs.distinct_count = (cs.distinct_count * ratio).max(1.0).min(row_count);
            (name.clone(), cs)
        })
        .collect();

    Statistics {
        row_count,
        total_size_bytes: input.total_size_bytes * ratio,
        column_stats,
    }
}

/// Derive statistics for aggregate output. A global aggregate yields one row.
pub fn derive_aggregate_stats(input: &Statistics, group_by_cols: &[String]) -> Statistics {
    let mut row_count = 1.0_f64;
    for col in group_by_cols {
        let ndv = input
            .column_stats
            .get(col)
            .map(|s| s.distinct_count)
            .unwrap_or(input.row_count);
        row_count *= ndv;
    }
    row_count = row_count.min(input.row_count).max(1.0);

    Statistics {
        row_count,
        total_size_bytes: row_count * 100.0,
        column_stats: BTreeMap::new(),
    }
}

/// Sum of the inputs' cardinalities (UNION ALL upper bound).
pub fn derive_union_stats(inputs: &[Statistics]) -> Statistics {
    let row_count = inputs.iter().map(|s| s.row_count).sum();
    let total_size_bytes = inputs.iter().map(|s| s.total_size_bytes).sum();
    Statistics {
        row_count,
        total_size_bytes,
        column_stats: BTreeMap::new(),
    }
}

/// Default filter selectivity when nothing better is known.
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.1;

/// Selectivity of range comparisons.
pub const RANGE_SELECTIVITY: f64 = 0.33;

/// Estimate selectivity for an equality predicate: `sel = 1 / NDV`.
pub fn equality_selectivity(stats: &Statistics, col_name: &str) -> f64 {
    stats
        .column_stats
        .get(col_name)
        .map(|cs| 1.0 / cs.distinct_count.max(1.0))
        .unwrap_or(DEFAULT_FILTER_SELECTIVITY)
}

/// Estimate the fraction of rows that satisfy `expr`.
pub fn estimate_selectivity(expr: &Expr, stats: &Statistics) -> f64 {
    match expr {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expr::Column(c), _) | (_, Expr::Column(c)) => equality_selectivity(stats, &c.name),
            _ => DEFAULT_FILTER_SELECTIVITY,
        },
        Expr::BinaryOp {
            op: BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq,
            ..
        }
        | Expr::Between { .. } => RANGE_SELECTIVITY,
        Expr::And(conjuncts) => conjuncts
            .iter()
            .map(|c| estimate_selectivity(c, stats))
            .product(),
        Expr::Or(disjuncts) => {
            let miss: f64 = disjuncts
                .iter()
                .map(|d| 1.0 - estimate_selectivity(d, stats))
                .product();
            1.0 - miss
        }
        _ => DEFAULT_FILTER_SELECTIVITY,
    }
}

/// Column-name pairs of the `col = col` conjuncts of a join condition.
pub fn equi_join_columns(condition: &Expr) -> Vec<(String, String)> {
    condition
        .conjuncts()
        .into_iter()
        .filter_map(|c| match c {
            Expr::BinaryOp {
                op: BinaryOp::Eq,
                left,
                right,
            } => match (left.as_ref(), right.as_ref()) {
                (Expr::Column(l), Expr::Column(r)) => Some((l.name.clone(), r.name.clone())),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ScalarValue;

    fn orders() -> Statistics {
        Statistics::new(1000.0, 100_000.0).with_column("o_custkey", ColumnStatistics::new(100.0, 0.0))
    }

    fn customers() -> Statistics {
        Statistics::new(100.0, 10_000.0).with_column("c_custkey", ColumnStatistics::new(100.0, 0.0))
    }

    #[test]
    fn test_join_cardinality_uses_max_ndv() {
        let joined = derive_join_stats(
            &orders(),
            &customers(),
            &[("o_custkey".into(), "c_custkey".into())],
        );
        assert_eq!(joined.estimated_rows(), 1000);
        assert_eq!(derive_cross_stats(&orders(), &customers()).estimated_rows(), 100_000);
    }

    #[test]
    fn test_filter_and_aggregate_cardinality() {
        let pred = Expr::binary(
            BinaryOp::Eq,
            Expr::column("o_custkey", 0),
            Expr::literal(ScalarValue::Int64(7)),
        );
        let sel = estimate_selectivity(&pred, &orders());
        assert!((sel - 0.01).abs() < 1e-9);
        assert_eq!(derive_filter_stats(&orders(), sel).estimated_rows(), 10);

        let grouped = derive_aggregate_stats(&orders(), &["o_custkey".to_string()]);
        assert_eq!(grouped.estimated_rows(), 100);
        assert_eq!(derive_aggregate_stats(&orders(), &[]).estimated_rows(), 1);
    }

    #[test]
    fn test_or_selectivity_inclusion_exclusion() {
        let range = Expr::binary(
            BinaryOp::Gt,
            Expr::column("x", 0),
            Expr::literal(ScalarValue::Int32(1)),
        );
        let or = Expr::Or(vec![range.clone(), range]);
        let expected = 1.0 - (1.0 - RANGE_SELECTIVITY) * (1.0 - RANGE_SELECTIVITY);
        assert!((estimate_selectivity(&or, &orders()) - expected).abs() < 1e-9);
    }
}
