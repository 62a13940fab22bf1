//! # planx-core: Plan Model
//!
//! This crate holds the query-plan model shared by the Substrait translator and
//! the plan explainer, together with the pieces needed to produce physical
//! plans from logical ones.
//!
//! ## Module Overview
//!
//! - **`types`**: column data types, fields and schemas.
//! - **`expr`**: scalar expressions plus logical and physical operator definitions.
//! - **`plan`**: the `PlanNode` tree and schema derivation / validation.
//! - **`planner`**: logical-to-physical planning with cardinality estimates.
//! - **`stats`**: statistics structures and derivation formulas.
//! - **`catalog`**: catalog trait for resolving table names to schemas and statistics.
//! - **`builder`**: fluent construction of validated logical plans.
//! - **`error`**: the `PlanError` type.

pub mod builder;
pub mod catalog;
pub mod error;
pub mod expr;
pub mod plan;
pub mod planner;
pub mod stats;
pub mod types;

pub use error::PlanError;
pub use plan::PlanNode;
