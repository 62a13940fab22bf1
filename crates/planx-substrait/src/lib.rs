//! # Substrait Integration Layer
//!
//! This crate provides bidirectional conversion between the [Substrait](https://substrait.io/)
//! cross-language query plan representation and the logical `PlanNode` trees of
//! `planx-core`.
//!
//! ## Why Substrait?
//!
//! Substrait is an engine-agnostic serialization format for query plans. A plan
//! translated here can be executed or inspected by any engine that consumes
//! Substrait (DataFusion, DuckDB, Velox), and plans produced elsewhere can be
//! explained by `planx-explain`.
//!
//! ## Module Overview
//!
//! - **`producer`**: logical `PlanNode` -> Substrait `Plan` (the translator).
//! - **`consumer`**: Substrait `Plan` -> logical `PlanNode`.
//! - **`functions`**: function extension URIs, anchors and name mapping.
//! - **`types`**: conversion between column types and Substrait types.
//! - **`extensions`**: encodes/decodes table statistics as Substrait advanced
//!   extensions (protobuf `Any` messages) so statistics can travel with the plan.

pub mod consumer;
pub mod extensions;
pub mod functions;
pub mod producer;
pub mod types;

pub use consumer::{consume_plan, decode_json, decode_plan, ConsumeError};
pub use producer::{
    translate, translate_plan, translate_to_json, ProducerConfig, TranslationError, Translator,
};
