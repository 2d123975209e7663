//! Grammar and automaton to DOT (Graphviz) conversion.
//!
//! This module renders tree grammars and tree automata in DOT format for
//! visualization with Graphviz tools like `dot` or online viewers.
//!
//! # DOT Format
//!
//! The generated output follows these conventions:
//! - **Variable nodes** are rendered as ellipses; the start variable is
//!   doubled (peripheries=2)
//! - **Term structure** is rendered as anonymous circles labeled with the
//!   node symbol; leaves are squares
//! - **Edges** from a variable fan out to its rule right-hand sides; a
//!   variable occurrence inside a right-hand side links back to the
//!   variable's ellipse, which is where cycles become visible
//!
//! # Examples
//!
//! ```
//! use rtl_rs::grammar::TreeGrammar;
//! use rtl_rs::term::Term;
//!
//! let g = TreeGrammar::build("S", [
//!     ("S", Term::Leaf),
//!     ("S", Term::node("a", Term::var("S"), Term::var("S"))),
//! ]);
//!
//! let dot = g.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::fmt::Write as _;

use crate::automaton::{BottomUpTreeAutomaton, TopDownTreeAutomaton};
use crate::grammar::TreeGrammar;
use crate::term::Term;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for variable nodes (default: "ellipse")
    pub variable_shape: &'static str,
    /// Shape for structured term nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for leaves (default: "square")
    pub leaf_shape: &'static str,
    /// Style for the edge from a variable to each of its right-hand sides
    /// (default: "solid")
    pub rule_edge_style: &'static str,
    /// Style for back edges from a variable occurrence to its definition
    /// (default: "dashed")
    pub back_edge_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            variable_shape: "ellipse",
            node_shape: "circle",
            leaf_shape: "square",
            rule_edge_style: "solid",
            back_edge_style: "dashed",
        }
    }
}

/// Allocates sequential ids for anonymous term nodes.
#[derive(Debug, Default)]
struct Ids {
    next: usize,
}

impl Ids {
    fn fresh(&mut self) -> usize {
        let id = self.next;
        self.next += 1;
        id
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders `term` as DOT nodes and returns the id of its topmost node.
/// Variable occurrences produce a back edge to the variable's ellipse
/// instead of a fresh node.
fn write_term(
    dot: &mut String,
    term: &Term,
    ids: &mut Ids,
    config: &DotConfig,
) -> Result<String, std::fmt::Error> {
    match term {
        Term::Leaf => {
            let id = ids.fresh();
            writeln!(dot, "  t{} [shape={}, label=\"leaf\"];", id, config.leaf_shape)?;
            Ok(format!("t{}", id))
        }
        // Quoted id: generated names like "%0" are not bare DOT identifiers.
        Term::Var(variable) => Ok(format!("\"v_{}\"", escape(variable.as_str()))),
        Term::Node(label, left, right) => {
            let id = ids.fresh();
            writeln!(
                dot,
                "  t{} [shape={}, label=\"{}\"];",
                id,
                config.node_shape,
                escape(label.as_str())
            )?;
            let left_id = write_term(dot, left, ids, config)?;
            let right_id = write_term(dot, right, ids, config)?;
            let back = config.back_edge_style;
            let left_style = if left_id.starts_with("\"v_") { back } else { "solid" };
            let right_style = if right_id.starts_with("\"v_") { back } else { "solid" };
            writeln!(dot, "  t{} -> {} [style={}, label=\"1\"];", id, left_id, left_style)?;
            writeln!(dot, "  t{} -> {} [style={}, label=\"2\"];", id, right_id, right_style)?;
            Ok(format!("t{}", id))
        }
        Term::State(state, body) => {
            let id = ids.fresh();
            writeln!(
                dot,
                "  t{} [shape={}, label=\"{}\"];",
                id,
                config.node_shape,
                escape(&state.to_string())
            )?;
            let body_id = write_term(dot, body, ids, config)?;
            writeln!(dot, "  t{} -> {};", id, body_id)?;
            Ok(format!("t{}", id))
        }
    }
}

impl TreeGrammar {
    /// Converts the grammar to DOT (Graphviz) format.
    ///
    /// Every variable gets an ellipse, every rule right-hand side hangs off
    /// its variable, and variable occurrences loop back to their ellipse.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the grammar to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;

        for variable in self.variables() {
            let peripheries = if &variable == self.start() { 2 } else { 1 };
            writeln!(
                dot,
                "  \"v_{}\" [shape={}, peripheries={}, label=\"{}\"];",
                escape(variable.as_str()),
                config.variable_shape,
                peripheries,
                escape(variable.as_str())
            )?;
        }

        let mut ids = Ids::default();
        for rule in self.rules() {
            let rhs_id = write_term(&mut dot, &rule.rhs, &mut ids, config)?;
            writeln!(
                dot,
                "  \"v_{}\" -> {} [style={}];",
                escape(rule.lhs.as_str()),
                rhs_id,
                config.rule_edge_style
            )?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

/// Writes one transition as a pattern subtree, an output subtree, and an
/// arrow between their roots.
fn write_transition(
    dot: &mut String,
    index: usize,
    pattern: &Term,
    output: &Term,
    ids: &mut Ids,
    config: &DotConfig,
) -> Result<(), std::fmt::Error> {
    writeln!(dot, "  subgraph cluster_{} {{", index)?;
    writeln!(dot, "    label=\"transition {}\";", index)?;
    let pattern_id = write_term(dot, pattern, ids, config)?;
    let output_id = write_term(dot, output, ids, config)?;
    writeln!(dot, "  }}")?;
    writeln!(dot, "  {} -> {} [style=bold, label=\"=>\"];", pattern_id, output_id)?;
    Ok(())
}

impl BottomUpTreeAutomaton {
    /// Converts the automaton to DOT format: one cluster per transition,
    /// pattern on the left, output on the right.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        let config = DotConfig::default();
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "  rankdir=LR;")?;
        let mut ids = Ids::default();
        for (index, transition) in self.transitions().iter().enumerate() {
            write_transition(&mut dot, index, &transition.pattern, &transition.output, &mut ids, &config)?;
        }
        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl TopDownTreeAutomaton {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        let config = DotConfig::default();
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "  rankdir=LR;")?;
        let mut ids = Ids::default();
        for (index, transition) in self.transitions().iter().enumerate() {
            write_transition(&mut dot, index, &transition.pattern, &transition.output, &mut ids, &config)?;
        }
        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
