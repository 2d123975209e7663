//! Automaton/grammar transduction: the product construction.
//!
//! A translator takes an automaton and an input grammar and constructs an
//! output grammar generating the transduced image of the input language.
//! The construction always runs over *primitive* states (composites are
//! flattened first) to keep the product state space finite; a
//! [`NameCache`] memoizes the product variable for each
//! `(state, variable)` pair.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::automaton::{BottomUpTreeAutomaton, TopDownTreeAutomaton, Transition};
use crate::grammar::{NameSource, Production, TreeGrammar};
use crate::matching;
use crate::symbol::Symbol;
use crate::term::{State, Term};

/// A memoizing generator of fresh unique names keyed by `(state, variable)`.
///
/// Entries are populated lazily on first [`resolve`]; a miss on a key that
/// must already exist ([`expect`]) is a non-recoverable invariant
/// violation.
///
/// [`resolve`]: NameCache::resolve
/// [`expect`]: NameCache::expect
#[derive(Debug, Default)]
pub struct NameCache {
    entries: HashMap<(State, Symbol), Symbol>,
    names: NameSource,
}

impl NameCache {
    pub fn new(names: NameSource) -> Self {
        NameCache {
            entries: HashMap::new(),
            names,
        }
    }

    /// The product name for `(state, variable)`, generating one on first
    /// lookup.
    pub fn resolve(&mut self, state: &State, variable: &Symbol) -> Symbol {
        if let Some(name) = self.entries.get(&(state.clone(), variable.clone())) {
            return name.clone();
        }
        let fresh = self.names.fresh();
        debug!("name cache: ({}, {}) -> {}", state, variable, fresh);
        self.entries
            .insert((state.clone(), variable.clone()), fresh.clone());
        fresh
    }

    /// The product name for `(state, variable)`, which must already exist.
    pub fn get(&self, state: &State, variable: &Symbol) -> Option<Symbol> {
        self.entries.get(&(state.clone(), variable.clone())).cloned()
    }

    /// # Panics
    ///
    /// Panics if the entry is missing.
    pub fn expect(&self, state: &State, variable: &Symbol) -> Symbol {
        match self.get(state, variable) {
            Some(name) => name,
            None => panic!("Name cache has no entry for ({}, {})", state, variable),
        }
    }
}

/// One production per transition matching `tagged`, each keyed through the
/// name cache under the transition's result state. Never mutates the
/// automaton.
fn transduce(
    transitions: &[Transition],
    lhs: &Symbol,
    tagged: &Term,
    cache: &mut NameCache,
) -> Vec<Production> {
    let mut productions = Vec::new();
    for transition in transitions {
        if let Some((state, body)) = transition.transit(tagged) {
            productions.push(Production::new(cache.resolve(&state, lhs), body));
        }
    }
    productions
}

/// The bottom-up product construction.
///
/// For every pair of primitive states and every normalized `Node` rule,
/// the rule's children are tagged with the states and every matching
/// transition contributes one product rule; `Leaf` rules transduce
/// untagged. Finally every original variable is bridged to its product
/// name under each final state, and unreachable rules are pruned.
pub struct BottomUpTranslator<'a> {
    automaton: &'a BottomUpTreeAutomaton,
}

impl<'a> BottomUpTranslator<'a> {
    pub fn new(automaton: &'a BottomUpTreeAutomaton) -> Self {
        BottomUpTranslator { automaton }
    }

    pub fn translate(&self, grammar: &TreeGrammar) -> TreeGrammar {
        let mut names = NameSource::above(grammar);
        let input = grammar.clone().normalize(&mut names);
        let primitives: Vec<State> = self.automaton.primitive_states().into_iter().collect();
        let mut cache = NameCache::new(names);
        debug!(
            "bottom-up translate: {} rules x {} primitive states",
            input.rules().len(),
            primitives.len()
        );

        let mut output = TreeGrammar::new(input.start().clone());
        for rule in input.rules() {
            match &rule.rhs {
                Term::Leaf => {
                    for production in
                        transduce(self.automaton.transitions(), &rule.lhs, &Term::Leaf, &mut cache)
                    {
                        output.add_rule(production);
                    }
                }
                Term::Node(label, left, right) => {
                    let (v1, v2) = match (left.as_ref(), right.as_ref()) {
                        (Term::Var(v1), Term::Var(v2)) => (v1, v2),
                        _ => unreachable!("grammar is normalized"),
                    };
                    for ql in &primitives {
                        for qr in &primitives {
                            // Tag the children with their product names up
                            // front, so a shared variable stays positionally
                            // distinct under different states.
                            let tagged = Term::node(
                                label.clone(),
                                Term::state(ql.clone(), Term::Var(cache.resolve(ql, v1))),
                                Term::state(qr.clone(), Term::Var(cache.resolve(qr, v2))),
                            );
                            for production in transduce(
                                self.automaton.transitions(),
                                &rule.lhs,
                                &tagged,
                                &mut cache,
                            ) {
                                output.add_rule(production);
                            }
                        }
                    }
                }
                _ => unreachable!("grammar is normalized"),
            }
        }

        // Bridge every original variable to its product name under each
        // final state. Pairs the product never produced are skipped.
        let lhs_variables: BTreeSet<Symbol> =
            input.rules().iter().map(|rule| rule.lhs.clone()).collect();
        let finals: BTreeSet<State> = self
            .automaton
            .finals()
            .iter()
            .flat_map(|state| state.primitives())
            .collect();
        for variable in &lhs_variables {
            for state in &finals {
                if let Some(name) = cache.get(state, variable) {
                    output.add_rule(Production::new(variable.clone(), Term::Var(name)));
                }
            }
        }

        output.prune_unreachable();
        output
    }
}

/// The top-down product construction: symmetric to the bottom-up one but
/// single-state (no pairing). Whole right-hand sides are tagged with each
/// primitive state; residual state-tagged subterms in transition outputs
/// are rewritten to their product names.
pub struct TopDownTranslator<'a> {
    automaton: &'a TopDownTreeAutomaton,
}

impl<'a> TopDownTranslator<'a> {
    pub fn new(automaton: &'a TopDownTreeAutomaton) -> Self {
        TopDownTranslator { automaton }
    }

    pub fn translate(&self, grammar: &TreeGrammar) -> TreeGrammar {
        let mut names = NameSource::above(grammar);
        let input = grammar.clone().normalize(&mut names);
        let primitives: Vec<State> = self.automaton.primitive_states().into_iter().collect();
        let mut cache = NameCache::new(names);
        debug!(
            "top-down translate: {} rules x {} primitive states",
            input.rules().len(),
            primitives.len()
        );

        let mut output = TreeGrammar::new(input.start().clone());
        for rule in input.rules() {
            for state in &primitives {
                let tagged = Term::state(state.clone(), rule.rhs.clone());
                for production in
                    transduce(self.automaton.transitions(), &rule.lhs, &tagged, &mut cache)
                {
                    let rhs = rewrite_residual_states(&production.rhs, &mut cache);
                    output.add_rule(Production::new(production.lhs, rhs));
                }
            }
        }

        // Connect the original start through the automaton's initial state.
        // The automaton is required to cover the start: a missing entry is
        // an invariant violation.
        let start = input.start().clone();
        let initial = self.automaton.initial().primitives();
        let bridged: Vec<Symbol> = initial
            .iter()
            .filter_map(|state| cache.get(state, &start))
            .collect();
        if bridged.is_empty() {
            let state = initial.iter().next().expect("automaton has an initial state");
            cache.expect(state, &start);
        }
        for name in bridged {
            output.add_rule(Production::new(start.clone(), Term::Var(name)));
        }

        output.prune_unreachable();
        output
    }
}

/// Rewrites residual `State(q, Var(w))` subterms to the product variable
/// for `(q, w)`.
///
/// # Panics
///
/// Panics on a residual state term wrapping anything but a variable: the
/// normalized input only puts variables under child positions.
fn rewrite_residual_states(term: &Term, cache: &mut NameCache) -> Term {
    match term {
        Term::Leaf | Term::Var(_) => term.clone(),
        Term::Node(label, left, right) => Term::node(
            label.clone(),
            rewrite_residual_states(left, cache),
            rewrite_residual_states(right, cache),
        ),
        Term::State(state, inner) => match inner.as_ref() {
            Term::Var(variable) => Term::Var(cache.resolve(state, variable)),
            other => panic!("Residual state term wraps a non-variable: '{}'", other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::compare::Comparator;

    use test_log::test;

    fn q(name: &str) -> State {
        State::prim(name)
    }

    /// `{S -> Leaf | a(S, S)}`.
    fn all_a_grammar() -> TreeGrammar {
        TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("a", Term::var("S"), Term::var("S"))),
            ],
        )
    }

    /// The identity automaton over labels "a": maps every all-"a" tree to
    /// itself.
    fn identity_automaton() -> BottomUpTreeAutomaton {
        let leaf = Transition::new(Term::Leaf, Term::state(q("q"), Term::Leaf));
        let node = Transition::new(
            Term::node(
                "a",
                Term::state(q("q"), Term::var("x")),
                Term::state(q("q"), Term::var("y")),
            ),
            Term::state(q("q"), Term::node("a", Term::var("x"), Term::var("y"))),
        );
        BottomUpTreeAutomaton::new([], vec![leaf, node], [q("q")])
    }

    #[test]
    fn test_identity_translation_preserves_language() {
        let grammar = all_a_grammar();
        let automaton = identity_automaton();
        let translated = BottomUpTranslator::new(&automaton).translate(&grammar);

        let comparator = Comparator::new();
        assert!(comparator.contains(&grammar, &translated));
        assert!(comparator.contains(&translated, &grammar));
    }

    #[test]
    fn test_bottom_up_relabeling() {
        // Relabel "a" nodes to "b".
        let leaf = Transition::new(Term::Leaf, Term::state(q("q"), Term::Leaf));
        let node = Transition::new(
            Term::node(
                "a",
                Term::state(q("q"), Term::var("x")),
                Term::state(q("q"), Term::var("y")),
            ),
            Term::state(q("q"), Term::node("b", Term::var("x"), Term::var("y"))),
        );
        let automaton = BottomUpTreeAutomaton::new([], vec![leaf, node], [q("q")]);

        let translated = BottomUpTranslator::new(&automaton).translate(&all_a_grammar());
        let expected = TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("b", Term::var("S"), Term::var("S"))),
            ],
        );
        let comparator = Comparator::new();
        assert!(comparator.contains(&expected, &translated));
        assert!(comparator.contains(&translated, &expected));
    }

    #[test]
    fn test_top_down_relabeling() {
        // From q, relabel "a" to "b" and keep walking both children in q.
        let node = Transition::new(
            Term::state(q("q"), Term::node("a", Term::var("x"), Term::var("y"))),
            Term::state(
                q("q"),
                Term::node(
                    "b",
                    Term::state(q("q"), Term::var("x")),
                    Term::state(q("q"), Term::var("y")),
                ),
            ),
        );
        let leaf = Transition::new(
            Term::state(q("q"), Term::Leaf),
            Term::state(q("q"), Term::Leaf),
        );
        let automaton = TopDownTreeAutomaton::new([], vec![node, leaf], q("q"));

        let translated = TopDownTranslator::new(&automaton).translate(&all_a_grammar());
        let expected = TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("b", Term::var("S"), Term::var("S"))),
            ],
        );
        let comparator = Comparator::new();
        assert!(comparator.contains(&expected, &translated));
        assert!(comparator.contains(&translated, &expected));
    }

    #[test]
    fn test_name_cache_memoizes() {
        let mut cache = NameCache::new(NameSource::new());
        let first = cache.resolve(&q("q"), &Symbol::new("S"));
        let again = cache.resolve(&q("q"), &Symbol::new("S"));
        let other = cache.resolve(&q("r"), &Symbol::new("S"));
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(cache.expect(&q("q"), &Symbol::new("S")), first);
    }

    #[test]
    #[should_panic(expected = "Name cache has no entry")]
    fn test_name_cache_expect_panics_on_miss() {
        let cache = NameCache::new(NameSource::new());
        cache.expect(&q("q"), &Symbol::new("S"));
    }

    #[test]
    #[should_panic(expected = "Name cache has no entry")]
    fn test_top_down_uncovered_start_panics() {
        // The automaton's transitions never fire for the grammar's labels,
        // so the (initial state, start) entry is never created.
        let node = Transition::new(
            Term::state(q("q"), Term::node("z", Term::var("x"), Term::var("y"))),
            Term::state(
                q("q"),
                Term::node(
                    "z",
                    Term::state(q("q"), Term::var("x")),
                    Term::state(q("q"), Term::var("y")),
                ),
            ),
        );
        let automaton = TopDownTreeAutomaton::new([], vec![node], q("q"));
        let grammar = TreeGrammar::build(
            "S",
            [("S", Term::node("a", Term::var("S"), Term::var("S"))), ("S", Term::Leaf)],
        );
        TopDownTranslator::new(&automaton).translate(&grammar);
    }
}
