//! # Text Tree Rendering
//!
//! Draws a plan as boxes connected by lines, in the host engine's explain
//! format:
//!
//! ```text
//! ┌───────────────────────────┐
//! │      STREAMING_LIMIT      │
//! └─────────────┬─────────────┘
//! ┌─────────────┴─────────────┐
//! │          SEQ_SCAN         │
//! │    ────────────────────   │
//! │      Table: integers      │
//! │   Type: Sequential Scan   │
//! │       Projections: i      │
//! └───────────────────────────┘
//! ```
//!
//! ## Layout
//!
//! Nodes are placed on a grid. A node at `(x, y)` has its first child at
//! `(x, y + 1)` and each later child at `x` plus the widths of the subtrees
//! before it; a leaf is one column wide. Every cell is `W` characters wide,
//! where `W` is the widest line in the tree plus padding, kept odd so that
//! connectors sit exactly in the middle, and bounded by [`RenderConfig`].
//!
//! Each grid row prints as a top border, one line per content line of the
//! tallest box in the row, and a bottom border. A parent with several
//! children marks its middle content line with `├` and runs a horizontal
//! connector right to its last child; the connector turns down (`┬`, `┐`)
//! above each child.

use crate::config::RenderConfig;
use std::collections::HashMap;

const HORIZONTAL: &str = "─";
const VERTICAL: &str = "│";
const LTCORNER: &str = "┌";
const RTCORNER: &str = "┐";
const LDCORNER: &str = "└";
const RDCORNER: &str = "┘";
const TMIDDLE: &str = "┬";
const DMIDDLE: &str = "┴";
const LMIDDLE: &str = "├";

/// Line drawn between a node's name and its extra info.
pub const SEPARATOR: &str = "────────────────────";

/// Stands in for content lines cut by `max_extra_lines`.
pub const ELISION: &str = "…";

/// Narrowest box: two borders around a three-character interior.
const MIN_NODE_WIDTH: usize = 5;

/// One box on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBox {
    pub name: String,
    /// Content lines below the name.
    pub lines: Vec<String>,
    /// Grid columns of the children, one row below.
    child_columns: Vec<usize>,
}

impl RenderBox {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
            child_columns: Vec::new(),
        }
    }
}

/// A plan laid out on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTree {
    width: usize,
    height: usize,
    nodes: HashMap<(usize, usize), RenderBox>,
}

/// Minimal view of a tree the layout needs.
pub trait TreeSource: Sized {
    fn children(&self) -> &[Self];
}

impl TreeSource for planx_core::PlanNode {
    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl RenderTree {
    /// Lay out `root`, asking `label` for the box of every node.
    pub fn build<T, E, F>(root: &T, mut label: F) -> Result<Self, E>
    where
        T: TreeSource,
        F: FnMut(&T) -> Result<RenderBox, E>,
    {
        let mut tree = Self {
            width: 0,
            height: 0,
            nodes: HashMap::new(),
        };
        tree.width = tree.place(root, 0, 0, &mut label)?;
        Ok(tree)
    }

    /// Place `node` at `(x, y)`; returns the width of its subtree.
    fn place<T, E, F>(&mut self, node: &T, x: usize, y: usize, label: &mut F) -> Result<usize, E>
    where
        T: TreeSource,
        F: FnMut(&T) -> Result<RenderBox, E>,
    {
        let mut render_box = label(node)?;
        self.height = self.height.max(y + 1);

        let mut width = 0;
        for child in node.children() {
            render_box.child_columns.push(x + width);
            width += self.place(child, x + width, y + 1, label)?;
        }
        self.nodes.insert((x, y), render_box);
        Ok(width.max(1))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn get(&self, x: usize, y: usize) -> Option<&RenderBox> {
        self.nodes.get(&(x, y))
    }

    fn has(&self, x: usize, y: usize) -> bool {
        self.nodes.contains_key(&(x, y))
    }

    /// Nearest node at or left of `x` in row `y`.
    fn owner(&self, x: usize, y: usize) -> Option<&RenderBox> {
        (0..=x).rev().find_map(|px| self.get(px, y))
    }
}

fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Center `text` in `width` characters, truncating with `…` when it does not
/// fit. Odd leftover space goes to the left.
fn center(text: &str, width: usize) -> String {
    let len = text_width(text);
    if len > width {
        let mut truncated: String = text.chars().take(width.saturating_sub(1)).collect();
        truncated.push('…');
        return truncated;
    }
    let total = width - len;
    let half = total / 2;
    let left = half + total % 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(half))
}

/// Renders a [`RenderTree`] to text.
#[derive(Debug, Clone, Default)]
pub struct TreeRenderer {
    config: RenderConfig,
}

impl TreeRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Box width for `tree`: wide enough for its longest line, odd, and
    /// within the configured bounds. Bounds below five characters are raised
    /// to five.
    pub fn node_width(&self, tree: &RenderTree) -> usize {
        let longest = tree
            .nodes
            .values()
            .flat_map(|b| std::iter::once(&b.name).chain(b.lines.iter()))
            .filter(|l| l.as_str() != SEPARATOR)
            .map(|l| text_width(l))
            .max()
            .unwrap_or(0);
        let cap = self.config.max_node_width.max(MIN_NODE_WIDTH);
        let width = self
            .config
            .node_render_width
            .max(longest + 4)
            .min(cap)
            .max(MIN_NODE_WIDTH);
        match width % 2 {
            0 if width < cap => width + 1,
            0 => width - 1,
            _ => width,
        }
    }

    pub fn render(&self, tree: &RenderTree) -> String {
        let width = self.node_width(tree);
        let mut out = String::new();
        for y in 0..tree.height {
            self.render_top_layer(tree, y, width, &mut out);
            self.render_box_content(tree, y, width, &mut out);
            self.render_bottom_layer(tree, y, width, &mut out);
        }
        out
    }

    /// Grid columns of the tree that fit within the render width.
    fn columns(&self, tree: &RenderTree, width: usize) -> std::ops::Range<usize> {
        let visible = (0..tree.width)
            .take_while(|x| x * width < self.config.max_render_width)
            .count();
        0..visible
    }

    fn push_line(out: &mut String, line: String) {
        out.push_str(line.trim_end());
        out.push('\n');
    }

    fn render_top_layer(&self, tree: &RenderTree, y: usize, width: usize, out: &mut String) {
        let half = width / 2;
        let mut line = String::new();
        for x in self.columns(tree, width) {
            if tree.has(x, y) {
                line.push_str(LTCORNER);
                line.push_str(&HORIZONTAL.repeat(half.saturating_sub(1)));
                line.push_str(if y == 0 { HORIZONTAL } else { DMIDDLE });
                line.push_str(&HORIZONTAL.repeat(half.saturating_sub(1)));
                line.push_str(RTCORNER);
            } else {
                line.push_str(&" ".repeat(width));
            }
        }
        Self::push_line(out, line);
    }

    fn render_bottom_layer(&self, tree: &RenderTree, y: usize, width: usize, out: &mut String) {
        let half = width / 2;
        let mut line = String::new();
        for x in self.columns(tree, width) {
            if tree.has(x, y) {
                line.push_str(LDCORNER);
                line.push_str(&HORIZONTAL.repeat(half.saturating_sub(1)));
                line.push_str(if tree.has(x, y + 1) { TMIDDLE } else { HORIZONTAL });
                line.push_str(&HORIZONTAL.repeat(half.saturating_sub(1)));
                line.push_str(RDCORNER);
            } else if tree.has(x, y + 1) {
                line.push_str(&" ".repeat(half));
                line.push_str(VERTICAL);
                line.push_str(&" ".repeat(half));
            } else {
                line.push_str(&" ".repeat(width));
            }
        }
        Self::push_line(out, line);
    }

    /// Content lines of a box, capped at `max_extra_lines` below the name.
    /// When lines are cut, the last one kept is replaced by [`ELISION`].
    fn box_lines<'a>(&self, render_box: &'a RenderBox) -> Vec<&'a str> {
        let max = self.config.max_extra_lines;
        let lines = render_box.lines.iter().map(String::as_str);
        if render_box.lines.len() <= max {
            return lines.collect();
        }
        let mut kept: Vec<&str> = lines.take(max.saturating_sub(1)).collect();
        if max > 0 {
            kept.push(ELISION);
        }
        kept
    }

    fn render_box_content(&self, tree: &RenderTree, y: usize, width: usize, out: &mut String) {
        let half = width / 2;
        let columns = self.columns(tree, width);
        let extra_height = columns
            .clone()
            .filter_map(|x| tree.get(x, y))
            .map(|b| self.box_lines(b).len())
            .max()
            .unwrap_or(0);
        let halfway = (extra_height + 1) / 2;

        for render_y in 0..=extra_height {
            let mut line = String::new();
            for x in columns.clone() {
                match tree.get(x, y) {
                    Some(render_box) => {
                        let text = if render_y == 0 {
                            render_box.name.as_str()
                        } else {
                            self.box_lines(render_box)
                                .get(render_y - 1)
                                .copied()
                                .unwrap_or("")
                        };
                        line.push_str(VERTICAL);
                        line.push_str(&center(text, width - 2));
                        let branches =
                            render_y == halfway && render_box.child_columns.len() > 1;
                        line.push_str(if branches { LMIDDLE } else { VERTICAL });
                    }
                    None => line.push_str(&self.connector_cell(tree, x, y, render_y, halfway, half)),
                }
            }
            Self::push_line(out, line);
        }
    }

    /// An empty cell in a content line: part of a parent's horizontal
    /// connector, a vertical line down to a child, or blank.
    fn connector_cell(
        &self,
        tree: &RenderTree,
        x: usize,
        y: usize,
        render_y: usize,
        halfway: usize,
        half: usize,
    ) -> String {
        let width = half * 2 + 1;
        let child_below = tree.has(x, y + 1);
        if render_y < halfway {
            return " ".repeat(width);
        }
        if render_y > halfway {
            return if child_below {
                format!("{}{}{}", " ".repeat(half), VERTICAL, " ".repeat(half))
            } else {
                " ".repeat(width)
            };
        }
        let more_right = tree
            .owner(x, y)
            .map_or(false, |p| p.child_columns.iter().any(|&c| c > x));
        if child_below {
            let (turn, fill) = if more_right {
                (TMIDDLE, HORIZONTAL.repeat(half))
            } else {
                (RTCORNER, " ".repeat(half))
            };
            format!("{}{}{}", HORIZONTAL.repeat(half), turn, fill)
        } else if more_right {
            HORIZONTAL.repeat(width)
        } else {
            " ".repeat(width)
        }
    }
}
