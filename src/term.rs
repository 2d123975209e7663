//! Finite terms and automaton states.
//!
//! [`Term`] is the closed tagged union every algorithm in this crate
//! branches on: a distinguished nullary leaf, a labeled two-child node, a
//! pattern variable, and a state-tagged term. There is no visitor layer;
//! all case analysis is an exhaustive `match`.

use std::collections::BTreeSet;
use std::fmt;

use crate::symbol::Symbol;

/// An automaton state.
///
/// A primitive state is just a name. A composite state's identity is a
/// *set* of other states: it encodes several simultaneous runs, not a
/// sub/superstate relation.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum State {
    Prim(Symbol),
    Composite(BTreeSet<State>),
}

impl State {
    pub fn prim(name: impl Into<Symbol>) -> Self {
        State::Prim(name.into())
    }

    pub fn composite(states: impl IntoIterator<Item = State>) -> Self {
        State::Composite(states.into_iter().collect())
    }

    /// Flattens this state into its constituent primitive states.
    pub fn primitives(&self) -> BTreeSet<State> {
        let mut out = BTreeSet::new();
        self.collect_primitives(&mut out);
        out
    }

    fn collect_primitives(&self, out: &mut BTreeSet<State>) {
        match self {
            State::Prim(_) => {
                out.insert(self.clone());
            }
            State::Composite(inner) => {
                for state in inner {
                    state.collect_primitives(out);
                }
            }
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Prim(name) => write!(f, "{}", name),
            State::Composite(inner) => {
                write!(f, "{{")?;
                for (i, state) in inner.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", state)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A finite term.
///
/// - `Leaf` is the unique nullary constant.
/// - `Node(label, left, right)` is a labeled interior node.
/// - `Var(name)` is a pattern/grammar variable.
/// - `State(state, term)` pairs a term with an automaton state; it only
///   occurs as the value flowing along automaton transitions.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Term {
    Leaf,
    Node(Symbol, Box<Term>, Box<Term>),
    Var(Symbol),
    State(State, Box<Term>),
}

impl Term {
    pub fn node(label: impl Into<Symbol>, left: Term, right: Term) -> Self {
        Term::Node(label.into(), Box::new(left), Box::new(right))
    }

    pub fn var(name: impl Into<Symbol>) -> Self {
        Term::Var(name.into())
    }

    pub fn state(state: State, term: Term) -> Self {
        Term::State(state, Box::new(term))
    }

    /// True iff the term contains no variables.
    ///
    /// Terms executed by an automaton must be ground.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Leaf => true,
            Term::Node(_, left, right) => left.is_ground() && right.is_ground(),
            Term::Var(_) => false,
            Term::State(_, inner) => inner.is_ground(),
        }
    }

    /// Collects the variable names occurring in the term.
    pub fn variables(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Term::Leaf => {}
            Term::Node(_, left, right) => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Term::Var(name) => {
                out.insert(name.clone());
            }
            Term::State(_, inner) => inner.collect_variables(out),
        }
    }

    /// Replaces every occurrence of `Var(from)` with `to`.
    pub fn substitute(&self, from: &Symbol, to: &Term) -> Term {
        match self {
            Term::Leaf => Term::Leaf,
            Term::Node(label, left, right) => Term::node(
                label.clone(),
                left.substitute(from, to),
                right.substitute(from, to),
            ),
            Term::Var(name) => {
                if name == from {
                    to.clone()
                } else {
                    self.clone()
                }
            }
            Term::State(state, inner) => Term::state(state.clone(), inner.substitute(from, to)),
        }
    }

    /// Renames variables through the given map, leaving unmapped names.
    pub fn rename(&self, map: &std::collections::HashMap<Symbol, Symbol>) -> Term {
        match self {
            Term::Leaf => Term::Leaf,
            Term::Node(label, left, right) => {
                Term::node(label.clone(), left.rename(map), right.rename(map))
            }
            Term::Var(name) => match map.get(name) {
                Some(new) => Term::Var(new.clone()),
                None => self.clone(),
            },
            Term::State(state, inner) => Term::state(state.clone(), inner.rename(map)),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Leaf => write!(f, "leaf"),
            Term::Node(label, left, right) => write!(f, "{}({}, {})", label, left, right),
            Term::Var(name) => write!(f, "{}", name),
            Term::State(state, inner) => write!(f, "<{}>{}", state, inner),
        }
    }
}
