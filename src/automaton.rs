//! Finite tree automata: bottom-up and top-down execution.
//!
//! A transition is a pattern-guarded rewrite: its pattern is matched
//! against a (state-tagged) term and its output template is instantiated
//! under the match. Outputs are uniformly state-tagged — `State(q, body)`
//! — so both automaton variants and the translators can read the result
//! state off the output. The execution engine unwraps the tag before
//! returning results to the caller.
//!
//! Nondeterminism is explicit: every execution step returns a *set* of
//! state-tagged terms, and the bottom-up engine cross-products the child
//! result sets. Execution always terminates on finite ground terms; cost
//! is exponential in term depth times automaton size, acceptable because
//! the input here is always one concrete term, never a grammar.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use log::debug;

use crate::matching;
use crate::term::{State, Term};

/// A pattern-guarded rewrite `pattern => output`.
///
/// The pattern may contain variables (binding subject subterms) and
/// state-tagged subterms; the output template must be state-tagged and may
/// only use variables the pattern binds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transition {
    pub pattern: Term,
    pub output: Term,
}

impl Transition {
    pub fn new(pattern: Term, output: Term) -> Self {
        Transition { pattern, output }
    }

    /// Applies this transition to `subject`, if the pattern matches.
    ///
    /// # Panics
    ///
    /// Panics if the instantiated output is not state-tagged.
    pub fn transit(&self, subject: &Term) -> Option<(State, Term)> {
        let ctx = matching::matches(&self.pattern, subject)?;
        match ctx.instantiate(&self.output) {
            Term::State(state, body) => Some((state, *body)),
            other => panic!("Transition output must be state-tagged, got '{}'", other),
        }
    }

    fn states(&self, out: &mut BTreeSet<State>) {
        collect_states(&self.pattern, out);
        collect_states(&self.output, out);
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.pattern, self.output)
    }
}

fn collect_states(term: &Term, out: &mut BTreeSet<State>) {
    match term {
        Term::Leaf | Term::Var(_) => {}
        Term::Node(_, left, right) => {
            collect_states(left, out);
            collect_states(right, out);
        }
        Term::State(state, inner) => {
            out.extend(state.primitives());
            collect_states(inner, out);
        }
    }
}

/// A bottom-up tree automaton: transitions plus a final-state set.
///
/// Leaves are rewritten first, interior nodes after their children, and a
/// run accepts when the root's state is final.
#[derive(Debug, Clone)]
pub struct BottomUpTreeAutomaton {
    states: BTreeSet<State>,
    transitions: Vec<Transition>,
    finals: BTreeSet<State>,
}

impl BottomUpTreeAutomaton {
    pub fn new(
        states: impl IntoIterator<Item = State>,
        transitions: Vec<Transition>,
        finals: impl IntoIterator<Item = State>,
    ) -> Self {
        let mut states: BTreeSet<State> = states.into_iter().collect();
        for transition in &transitions {
            transition.states(&mut states);
        }
        BottomUpTreeAutomaton {
            states,
            transitions,
            finals: finals.into_iter().collect(),
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn states(&self) -> &BTreeSet<State> {
        &self.states
    }

    pub fn finals(&self) -> &BTreeSet<State> {
        &self.finals
    }

    /// All primitive states, with composites flattened.
    pub fn primitive_states(&self) -> BTreeSet<State> {
        let mut out = BTreeSet::new();
        for state in &self.states {
            out.extend(state.primitives());
        }
        out
    }

    /// The seed composite state: one simultaneous run over every primitive
    /// state occurring in the transitions.
    pub fn seed_state(&self) -> State {
        let mut states = BTreeSet::new();
        for transition in &self.transitions {
            transition.states(&mut states);
        }
        State::Composite(states)
    }

    fn is_final(&self, state: &State) -> bool {
        let finals: BTreeSet<State> = self.finals.iter().flat_map(|f| f.primitives()).collect();
        !state.primitives().is_disjoint(&finals)
    }

    /// All translations of `term` that end in a final state.
    ///
    /// # Panics
    ///
    /// Panics if `term` is not ground.
    pub fn translate(&self, term: &Term) -> HashSet<Term> {
        assert!(term.is_ground(), "Automaton input must be variable-free");
        debug!("bottom-up translate({})", term);
        self.runs(term)
            .into_iter()
            .filter_map(|result| match result {
                Term::State(state, body) if self.is_final(&state) => Some(*body),
                _ => None,
            })
            .collect()
    }

    pub fn accept(&self, term: &Term) -> bool {
        !self.translate(term).is_empty()
    }

    /// All state-tagged results of running the automaton on `term`.
    fn runs(&self, term: &Term) -> HashSet<Term> {
        let subjects: Vec<Term> = match term {
            Term::Node(label, left, right) => {
                let left_runs = self.runs(left);
                let right_runs = self.runs(right);
                let mut rebuilt = Vec::new();
                for l in &left_runs {
                    for r in &right_runs {
                        rebuilt.push(Term::node(label.clone(), l.clone(), r.clone()));
                    }
                }
                rebuilt
            }
            other => vec![other.clone()],
        };

        let mut results = HashSet::new();
        for subject in &subjects {
            for transition in &self.transitions {
                if let Some((state, body)) = transition.transit(subject) {
                    results.insert(Term::state(state, body));
                }
            }
        }
        results
    }
}

/// A top-down tree automaton: transitions plus a single initial state.
///
/// The root is rewritten first; residual state-tagged subterms in a
/// transition output distribute the run into the children.
#[derive(Debug, Clone)]
pub struct TopDownTreeAutomaton {
    states: BTreeSet<State>,
    transitions: Vec<Transition>,
    initial: State,
}

impl TopDownTreeAutomaton {
    pub fn new(
        states: impl IntoIterator<Item = State>,
        transitions: Vec<Transition>,
        initial: State,
    ) -> Self {
        let mut states: BTreeSet<State> = states.into_iter().collect();
        for transition in &transitions {
            transition.states(&mut states);
        }
        states.extend(initial.primitives());
        TopDownTreeAutomaton {
            states,
            transitions,
            initial,
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn states(&self) -> &BTreeSet<State> {
        &self.states
    }

    pub fn initial(&self) -> &State {
        &self.initial
    }

    pub fn primitive_states(&self) -> BTreeSet<State> {
        let mut out = BTreeSet::new();
        for state in &self.states {
            out.extend(state.primitives());
        }
        out
    }

    /// All translations of `term` from the initial state.
    ///
    /// # Panics
    ///
    /// Panics if `term` is not ground.
    pub fn translate(&self, term: &Term) -> HashSet<Term> {
        assert!(term.is_ground(), "Automaton input must be variable-free");
        debug!("top-down translate({})", term);
        self.translate_from(term, &self.initial)
    }

    pub fn accept(&self, term: &Term) -> bool {
        !self.translate(term).is_empty()
    }

    fn translate_from(&self, term: &Term, state: &State) -> HashSet<Term> {
        let tagged = Term::state(state.clone(), term.clone());
        let mut results = HashSet::new();
        for transition in &self.transitions {
            if let Some((_, body)) = transition.transit(&tagged) {
                results.extend(self.resolve(&body));
            }
        }
        results
    }

    /// Expands residual state-tagged subterms by recursive translation.
    fn resolve(&self, term: &Term) -> HashSet<Term> {
        match term {
            Term::State(state, inner) => self.translate_from(inner, state),
            Term::Node(label, left, right) => {
                let lefts = self.resolve(left);
                let rights = self.resolve(right);
                let mut out = HashSet::new();
                for l in &lefts {
                    for r in &rights {
                        out.insert(Term::node(label.clone(), l.clone(), r.clone()));
                    }
                }
                out
            }
            other => HashSet::from([other.clone()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn q(name: &str) -> State {
        State::prim(name)
    }

    /// An automaton recognizing trees whose every label is "a", relabeling
    /// them to "b".
    fn relabeling_automaton() -> BottomUpTreeAutomaton {
        let leaf = Transition::new(Term::Leaf, Term::state(q("q"), Term::Leaf));
        let node = Transition::new(
            Term::node(
                "a",
                Term::state(q("q"), Term::var("x")),
                Term::state(q("q"), Term::var("y")),
            ),
            Term::state(q("q"), Term::node("b", Term::var("x"), Term::var("y"))),
        );
        BottomUpTreeAutomaton::new([], vec![leaf, node], [q("q")])
    }

    #[test]
    fn test_bottom_up_translate() {
        let automaton = relabeling_automaton();
        let input = Term::node("a", Term::Leaf, Term::node("a", Term::Leaf, Term::Leaf));
        let output = automaton.translate(&input);
        assert_eq!(
            output,
            HashSet::from([Term::node("b", Term::Leaf, Term::node("b", Term::Leaf, Term::Leaf))])
        );
    }

    #[test]
    fn test_bottom_up_reject() {
        let automaton = relabeling_automaton();
        let input = Term::node("c", Term::Leaf, Term::Leaf);
        assert!(!automaton.accept(&input));
        assert!(automaton.accept(&Term::node("a", Term::Leaf, Term::Leaf)));
    }

    #[test]
    fn test_two_matching_transitions_two_outputs() {
        // One-level term matched by two distinct transitions yields exactly
        // two output terms.
        let pattern = || {
            Term::node(
                "a",
                Term::state(q("q"), Term::var("x")),
                Term::state(q("q"), Term::var("y")),
            )
        };
        let leaf = Transition::new(Term::Leaf, Term::state(q("q"), Term::Leaf));
        let to_b = Transition::new(
            pattern(),
            Term::state(q("f"), Term::node("b", Term::var("x"), Term::var("y"))),
        );
        let to_c = Transition::new(
            pattern(),
            Term::state(q("f"), Term::node("c", Term::var("x"), Term::var("y"))),
        );
        let automaton = BottomUpTreeAutomaton::new([], vec![leaf, to_b, to_c], [q("f")]);

        let output = automaton.translate(&Term::node("a", Term::Leaf, Term::Leaf));
        assert_eq!(output.len(), 2);
        assert!(output.contains(&Term::node("b", Term::Leaf, Term::Leaf)));
        assert!(output.contains(&Term::node("c", Term::Leaf, Term::Leaf)));
    }

    #[test]
    fn test_accept_matches_exhaustive_enumeration() {
        // For a small fixed term, accept() agrees with exhaustively trying
        // all transition applications: the a-only automaton accepts exactly
        // the subterm-closed all-"a" trees.
        let automaton = relabeling_automaton();
        let terms = [
            Term::Leaf,
            Term::node("a", Term::Leaf, Term::Leaf),
            Term::node("a", Term::node("a", Term::Leaf, Term::Leaf), Term::Leaf),
            Term::node("a", Term::node("b", Term::Leaf, Term::Leaf), Term::Leaf),
            Term::node("b", Term::Leaf, Term::Leaf),
        ];
        let expected = [true, true, true, false, false];
        for (term, expected) in terms.iter().zip(expected) {
            assert_eq!(automaton.accept(term), expected, "term {}", term);
        }
    }

    #[test]
    fn test_seed_state_collects_transition_states() {
        let automaton = relabeling_automaton();
        let seed = automaton.seed_state();
        assert_eq!(seed.primitives(), BTreeSet::from([q("q")]));
        assert!(automaton.primitive_states().contains(&q("q")));
    }

    fn top_down_automaton() -> TopDownTreeAutomaton {
        // From q0, an "a" node relabels to "b" and sends q0 to the left
        // child, q1 to the right; q1 accepts only leaves.
        let node = Transition::new(
            Term::state(q("q0"), Term::node("a", Term::var("x"), Term::var("y"))),
            Term::state(
                q("q0"),
                Term::node(
                    "b",
                    Term::state(q("q0"), Term::var("x")),
                    Term::state(q("q1"), Term::var("y")),
                ),
            ),
        );
        let leaf0 = Transition::new(
            Term::state(q("q0"), Term::Leaf),
            Term::state(q("q0"), Term::Leaf),
        );
        let leaf1 = Transition::new(
            Term::state(q("q1"), Term::Leaf),
            Term::state(q("q1"), Term::Leaf),
        );
        TopDownTreeAutomaton::new([], vec![node, leaf0, leaf1], q("q0"))
    }

    #[test]
    fn test_top_down_translate() {
        let automaton = top_down_automaton();

        // a(a(leaf, leaf), leaf): right children must be leaves under q1.
        let input = Term::node("a", Term::node("a", Term::Leaf, Term::Leaf), Term::Leaf);
        let output = automaton.translate(&input);
        assert_eq!(
            output,
            HashSet::from([Term::node("b", Term::node("b", Term::Leaf, Term::Leaf), Term::Leaf)])
        );

        // a(leaf, a(leaf, leaf)) puts a node under q1: rejected.
        let bad = Term::node("a", Term::Leaf, Term::node("a", Term::Leaf, Term::Leaf));
        assert!(!automaton.accept(&bad));
    }

    #[test]
    fn test_composite_subject_matches_primitive_pattern() {
        // A transition expecting q1 fires on a subject tagged {q1, q2}.
        let automaton = {
            let node = Transition::new(
                Term::node("a", Term::state(q("q1"), Term::var("x")), Term::state(q("q1"), Term::var("y"))),
                Term::state(q("f"), Term::node("a", Term::var("x"), Term::var("y"))),
            );
            BottomUpTreeAutomaton::new([], vec![node], [q("f")])
        };
        let both = State::composite([q("q1"), q("q2")]);
        let subject = Term::node(
            "a",
            Term::state(both.clone(), Term::Leaf),
            Term::state(both, Term::Leaf),
        );
        let mut results = Vec::new();
        for transition in automaton.transitions() {
            if let Some(result) = transition.transit(&subject) {
                results.push(result);
            }
        }
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, q("f"));
    }

    #[test]
    #[should_panic(expected = "variable-free")]
    fn test_translate_rejects_open_terms() {
        let automaton = relabeling_automaton();
        automaton.translate(&Term::var("x"));
    }
}
