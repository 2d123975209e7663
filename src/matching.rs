//! Structural pattern matching over terms.
//!
//! This is the match-context facility the automata consume: a pattern is
//! itself a [`Term`] whose variables bind subject subterms, and whose
//! state-tagged subterms require the subject to carry a covering state.
//! A successful match yields a [`MatchContext`] of bindings under which a
//! transition's output template can be instantiated.

use std::collections::HashMap;

use log::trace;

use crate::symbol::Symbol;
use crate::term::{State, Term};

/// Variable bindings accumulated by a match.
///
/// A variable occurring twice in a pattern must bind equal subterms.
#[derive(Debug, Default, Clone)]
pub struct MatchContext {
    bindings: HashMap<Symbol, Term>,
}

impl MatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &Symbol) -> Option<&Term> {
        self.bindings.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn bind(&mut self, name: &Symbol, term: &Term) -> bool {
        match self.bindings.get(name) {
            Some(bound) => bound == term,
            None => {
                self.bindings.insert(name.clone(), term.clone());
                true
            }
        }
    }

    /// Instantiates a template under the accumulated bindings.
    ///
    /// # Panics
    ///
    /// Panics if the template mentions an unbound variable. Transition
    /// outputs must only use variables bound by their pattern.
    pub fn instantiate(&self, template: &Term) -> Term {
        match template {
            Term::Leaf => Term::Leaf,
            Term::Node(label, left, right) => Term::node(
                label.clone(),
                self.instantiate(left),
                self.instantiate(right),
            ),
            Term::Var(name) => match self.bindings.get(name) {
                Some(bound) => bound.clone(),
                None => panic!("Unbound template variable '{}'", name),
            },
            Term::State(state, inner) => Term::state(state.clone(), self.instantiate(inner)),
        }
    }
}

/// True iff every primitive state required by `pattern` is present in
/// `subject`.
///
/// A subject tagged with a composite state is in all of its constituent
/// states at once, so a pattern naming one of them matches.
pub fn states_match(pattern: &State, subject: &State) -> bool {
    pattern.primitives().is_subset(&subject.primitives())
}

/// Matches `pattern` against `subject`, returning the bindings on success.
///
/// Labels match by equality. Pattern variables bind whole subject subterms;
/// a pattern `State(q, p)` matches a subject `State(q', s)` iff `q` is
/// covered by `q'` and `p` matches `s`.
pub fn matches(pattern: &Term, subject: &Term) -> Option<MatchContext> {
    let mut ctx = MatchContext::new();
    if match_into(pattern, subject, &mut ctx) {
        trace!("matched '{}' against '{}'", pattern, subject);
        Some(ctx)
    } else {
        None
    }
}

fn match_into(pattern: &Term, subject: &Term, ctx: &mut MatchContext) -> bool {
    match (pattern, subject) {
        (Term::Var(name), _) => ctx.bind(name, subject),
        (Term::Leaf, Term::Leaf) => true,
        (Term::Node(pl, pleft, pright), Term::Node(sl, sleft, sright)) => {
            pl == sl && match_into(pleft, sleft, ctx) && match_into(pright, sright, ctx)
        }
        (Term::State(pq, pinner), Term::State(sq, sinner)) => {
            states_match(pq, sq) && match_into(pinner, sinner, ctx)
        }
        _ => false,
    }
}
