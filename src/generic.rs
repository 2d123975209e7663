//! The generic (non-tree) production system, and the encoding of tree
//! grammars into it.
//!
//! The generic layer knows nothing about binary trees: a production is a
//! variable rewriting to a sequence of symbols. The tree layer reuses its
//! storage, reachability pruning, and renaming, and encodes each tree node
//! as two generic productions:
//!
//! ```text
//! var   -> label
//! label -> left right
//! ```
//!
//! `Leaf` is encoded by the distinguished symbol `<leaf>`. The encoding is
//! defined on normalized grammars only (every rhs `Leaf` or
//! `Node(label, var, var)`).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::grammar::{Production, TreeGrammar};
use crate::symbol::Symbol;
use crate::term::Term;

/// The symbol standing for `Leaf` in the generic encoding.
pub fn leaf_symbol() -> Symbol {
    Symbol::new("<leaf>")
}

/// A generic production `lhs -> rhs[0] rhs[1] ...`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GenericProduction {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

/// A generic grammar: a start symbol plus ordered productions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GenericGrammar {
    pub start: Symbol,
    pub productions: Vec<GenericProduction>,
}

impl GenericGrammar {
    pub fn new(start: impl Into<Symbol>) -> Self {
        GenericGrammar {
            start: start.into(),
            productions: Vec::new(),
        }
    }

    pub fn add(&mut self, lhs: impl Into<Symbol>, rhs: Vec<Symbol>) {
        let production = GenericProduction { lhs: lhs.into(), rhs };
        if !self.productions.contains(&production) {
            self.productions.push(production);
        }
    }

    /// Drops productions whose lhs is unreachable from the start.
    pub fn prune_unreachable(&mut self) {
        let mut seen: HashSet<Symbol> = HashSet::new();
        let mut queue = VecDeque::from([self.start.clone()]);
        while let Some(symbol) = queue.pop_front() {
            if !seen.insert(symbol.clone()) {
                continue;
            }
            for production in self.productions.iter().filter(|p| p.lhs == symbol) {
                for next in &production.rhs {
                    if !seen.contains(next) {
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        self.productions.retain(|p| seen.contains(&p.lhs));
    }

    /// Renames symbols through the map, on both sides of every production.
    pub fn rename(&mut self, map: &HashMap<Symbol, Symbol>) {
        let rename = |symbol: &Symbol| map.get(symbol).cloned().unwrap_or_else(|| symbol.clone());
        if let Some(new) = map.get(&self.start) {
            self.start = new.clone();
        }
        for production in &mut self.productions {
            production.lhs = rename(&production.lhs);
            for symbol in &mut production.rhs {
                *symbol = rename(symbol);
            }
        }
    }
}

/// Encodes a normalized tree grammar into the generic form.
///
/// # Panics
///
/// Panics on a rule shape other than `Leaf` or `Node(label, var, var)`;
/// normalize first.
pub fn to_generic(grammar: &TreeGrammar) -> GenericGrammar {
    let mut out = GenericGrammar::new(grammar.start().clone());
    for rule in grammar.rules() {
        match &rule.rhs {
            Term::Leaf => out.add(rule.lhs.clone(), vec![leaf_symbol()]),
            Term::Node(label, left, right) => match (left.as_ref(), right.as_ref()) {
                (Term::Var(v1), Term::Var(v2)) => {
                    out.add(rule.lhs.clone(), vec![label.clone()]);
                    out.add(label.clone(), vec![v1.clone(), v2.clone()]);
                }
                _ => panic!("Unsupported rule shape for generic encoding: {}", rule),
            },
            _ => panic!("Unsupported rule shape for generic encoding: {}", rule),
        }
    }
    out
}

/// Decodes the generic encoding back into a tree grammar.
///
/// The encoding is lossy when two tree rules share a node label: the label's
/// children productions mix, and the decoded grammar pairs every
/// `var -> label` with every `label -> left right`.
pub fn from_generic(generic: &GenericGrammar) -> TreeGrammar {
    let leaf = leaf_symbol();
    let mut grammar = TreeGrammar::new(generic.start.clone());
    for production in &generic.productions {
        match production.rhs.as_slice() {
            [symbol] if *symbol == leaf => {
                grammar.add_rule(Production::new(production.lhs.clone(), Term::Leaf));
            }
            [label] => {
                for children in generic.productions.iter().filter(|p| &p.lhs == label) {
                    if let [left, right] = children.rhs.as_slice() {
                        grammar.add_rule(Production::new(
                            production.lhs.clone(),
                            Term::node(label.clone(), Term::Var(left.clone()), Term::Var(right.clone())),
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    grammar
}
