//! # planx-explain: Substrait Plan Explainer
//!
//! Decodes a Substrait plan and renders it as the host engine's box-drawn
//! explain tree:
//!
//! ```text
//! Substrait bytes / JSON
//!   -> planx_substrait::decode_plan()     (logical PlanNode)
//!   -> planx_core::planner                (physical PlanNode)
//!   -> RendererRegistry + TreeRenderer    (text)
//!   -> ExplainDocument                    (explain_key / explain_value rows)
//! ```
//!
//! ## Module Overview
//!
//! - **`registry`**: per-operator renderers producing box names and extra info.
//! - **`render`**: grid layout and box drawing.
//! - **`document`**: the explain result and plan-kind selection.
//! - **`config`**: layout limits and display options.
//! - **`error`**: the `ExplainError` type.
//!
//! ## Example
//!
//! ```
//! use planx_core::builder::PlanBuilder;
//! use planx_core::catalog::InMemoryCatalog;
//! use planx_core::expr::TableRef;
//! use planx_core::types::{DataType, Field, Schema};
//! use planx_explain::{explain_substrait, PlanKind};
//!
//! let mut catalog = InMemoryCatalog::new();
//! let table = TableRef::bare("integers");
//! catalog.add_table(&table, Schema::new(vec![Field::new("i", DataType::Int32, true)]), None);
//! let plan = PlanBuilder::scan(&catalog, &table).unwrap().limit(0, Some(5)).build().unwrap();
//!
//! let bytes = planx_substrait::translate(&plan).unwrap();
//! let doc = explain_substrait(&bytes, PlanKind::Physical).unwrap();
//! assert!(doc.physical_plan().unwrap().contains("STREAMING_LIMIT"));
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod registry;
pub mod render;

pub use config::{ExplainConfig, RenderConfig};
pub use document::{ExplainDocument, ExplainRow, PlanKind};
pub use error::ExplainError;
pub use registry::{NodeRenderer, RenderedNode, RendererRegistry};

use document::{LOGICAL_PLAN_KEY, PHYSICAL_PLAN_KEY};
use planx_core::expr::OpKind;
use planx_core::planner::create_physical_plan;
use planx_core::PlanNode;
use render::{RenderBox, RenderTree, TreeRenderer, ELISION, SEPARATOR};
use tracing::{debug, trace};

/// Explains Substrait plans with a fixed configuration and renderer set.
#[derive(Clone, Default)]
pub struct Explainer {
    config: ExplainConfig,
    registry: RendererRegistry,
}

impl Explainer {
    pub fn new(config: ExplainConfig) -> Self {
        Self {
            config,
            registry: RendererRegistry::default(),
        }
    }

    pub fn with_registry(mut self, registry: RendererRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    /// Explain a protobuf-encoded Substrait plan.
    pub fn explain_substrait(
        &self,
        bytes: &[u8],
        kind: PlanKind,
    ) -> Result<ExplainDocument, ExplainError> {
        debug!("Explaining Substrait plan: {} bytes, kind={:?}", bytes.len(), kind);
        let logical = planx_substrait::decode_plan(bytes)?;
        self.explain_plan(&logical, kind)
    }

    /// Explain a Substrait plan in its JSON encoding.
    pub fn explain_substrait_json(
        &self,
        json: &str,
        kind: PlanKind,
    ) -> Result<ExplainDocument, ExplainError> {
        debug!("Explaining Substrait JSON plan: kind={:?}", kind);
        let logical = planx_substrait::decode_json(json)?;
        self.explain_plan(&logical, kind)
    }

    /// Explain an already decoded logical plan.
    pub fn explain_plan(
        &self,
        logical: &PlanNode,
        kind: PlanKind,
    ) -> Result<ExplainDocument, ExplainError> {
        let mut rows = Vec::with_capacity(2);
        if kind.includes_logical() {
            rows.push(ExplainRow {
                explain_key: LOGICAL_PLAN_KEY.to_string(),
                explain_value: self.render_plan(logical)?,
            });
        }
        if kind.includes_physical() {
            let physical = create_physical_plan(logical)?;
            rows.push(ExplainRow {
                explain_key: PHYSICAL_PLAN_KEY.to_string(),
                explain_value: self.render_plan(&physical)?,
            });
        }
        Ok(ExplainDocument::new(rows))
    }

    /// Render any plan, logical or physical, as a box-drawn tree.
    pub fn render_plan(&self, plan: &PlanNode) -> Result<String, ExplainError> {
        let tree = RenderTree::build(plan, |node: &PlanNode| self.render_box(node))?;
        let text = TreeRenderer::new(self.config.render.clone()).render(&tree);
        debug!(
            "Rendered {} nodes on a {}x{} grid: {} lines",
            plan.node_count(),
            tree.width(),
            tree.height(),
            text.lines().count()
        );
        Ok(text)
    }

    fn render_box(&self, node: &PlanNode) -> Result<RenderBox, ExplainError> {
        let kind = node.kind();
        let renderer = self
            .registry
            .get(kind)
            .ok_or_else(|| ExplainError::UnsupportedOperator(kind_name(kind)))?;
        let rendered = renderer.render(&node.op);

        let cardinality = node
            .estimated_rows
            .filter(|_| self.config.show_cardinality)
            .map(|rows| format!("~{} rows", rows));

        // The separator and the cardinality line always stay in the box.
        let mut lines = rendered.extra;
        let room = self
            .config
            .render
            .max_extra_lines
            .saturating_sub(1 + usize::from(cardinality.is_some()));
        if lines.len() > room {
            trace!("Eliding {} of {} lines", lines.len() + 1 - room, lines.len());
            lines.truncate(room.saturating_sub(1));
            lines.push(ELISION.to_string());
        }
        lines.extend(cardinality);
        if !lines.is_empty() {
            lines.insert(0, SEPARATOR.to_string());
        }
        Ok(RenderBox::new(rendered.name, lines))
    }
}

fn kind_name(kind: OpKind) -> String {
    match kind {
        OpKind::Logical(k) => format!("logical {:?}", k),
        OpKind::Physical(k) => format!("physical {:?}", k),
    }
}

/// Explain protobuf bytes with the default configuration.
pub fn explain_substrait(bytes: &[u8], kind: PlanKind) -> Result<ExplainDocument, ExplainError> {
    Explainer::default().explain_substrait(bytes, kind)
}

/// Explain Substrait JSON with the default configuration.
pub fn explain_substrait_json(json: &str, kind: PlanKind) -> Result<ExplainDocument, ExplainError> {
    Explainer::default().explain_substrait_json(json, kind)
}
