//! Rendering and explain settings.

use serde::Deserialize;

/// Layout limits of the box-drawn tree.
///
/// The defaults reproduce the host engine's text renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Minimum box width, border characters included.
    pub node_render_width: usize,
    /// Boxes never grow beyond this width; longer lines are truncated.
    pub max_node_width: usize,
    /// Content lines shown per box below its name. When more are present the
    /// last shown line is `…`.
    pub max_extra_lines: usize,
    /// Grid columns starting past this many characters are not drawn.
    pub max_render_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            node_render_width: 29,
            max_node_width: 59,
            max_extra_lines: 30,
            max_render_width: 240,
        }
    }
}

/// Settings for an [`crate::Explainer`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub render: RenderConfig,
    /// Print `~N rows` estimates on nodes that have one.
    pub show_cardinality: bool,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            show_cardinality: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ExplainConfig =
            serde_json::from_str(r#"{"render": {"max_node_width": 41}}"#).unwrap();
        assert_eq!(config.render.max_node_width, 41);
        assert_eq!(config.render.node_render_width, 29);
        assert!(config.show_cardinality);
    }
}
