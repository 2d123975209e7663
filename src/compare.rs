//! Coinductive containment checking between tree grammars.
//!
//! Deciding `L(g1) ⊆ L(g2)` for cyclic grammars is the tree-language
//! analogue of deciding subtyping of recursive types: the proof search
//! *assumes* each obligation before discharging it, so a cyclic
//! re-expansion meets its own assumption and short-circuits. The context
//! is a commit-on-success / discard-on-failure backtracking log: facts
//! accumulated under an assumption survive only if the assumption is
//! discharged.
//!
//! Containment of regular tree languages is decidable, so a `false`
//! answer is a genuine negative, never an approximation.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, trace};

use crate::grammar::{NameSource, TreeGrammar};
use crate::symbol::Symbol;
use crate::term::Term;

/// An assumed containment obligation `left-set ⊑ right-set`.
type Obligation = (BTreeSet<Term>, BTreeSet<Term>);

/// The proof state of one top-level query: assumed obligations, an undo
/// log for rollback, and the trace stack of obligations being discharged.
#[derive(Debug, Default)]
struct Context {
    assumed: HashSet<Obligation>,
    log: Vec<Obligation>,
    trace: Vec<Obligation>,
}

impl Context {
    fn has(&self, obligation: &Obligation) -> bool {
        self.assumed.contains(obligation)
    }

    fn checkpoint(&self) -> usize {
        self.log.len()
    }

    fn assume(&mut self, obligation: Obligation) {
        if self.assumed.insert(obligation.clone()) {
            self.log.push(obligation);
        }
    }

    /// Discards every assumption made since the checkpoint.
    fn rollback(&mut self, mark: usize) {
        for obligation in self.log.drain(mark..) {
            self.assumed.remove(&obligation);
        }
    }
}

/// The containment decision procedure.
///
/// Stateless; construct one and pass it where it is needed. Each query
/// gets a fresh context, so identical inputs always yield identical
/// decisions.
#[derive(Debug, Default)]
pub struct Comparator;

impl Comparator {
    pub fn new() -> Self {
        Comparator
    }

    /// Decides `L(g1) ⊆ L(g2)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtl_rs::compare::Comparator;
    /// use rtl_rs::grammar::TreeGrammar;
    /// use rtl_rs::term::Term;
    ///
    /// // S -> Leaf | a(S, S), compared against itself.
    /// let g = TreeGrammar::build("S", [
    ///     ("S", Term::Leaf),
    ///     ("S", Term::node("a", Term::var("S"), Term::var("S"))),
    /// ]);
    /// assert!(Comparator::new().check(&g, &g));
    /// ```
    pub fn check(&self, g1: &TreeGrammar, g2: &TreeGrammar) -> bool {
        let mut names = NameSource::above(g1);
        names.absorb(g2);
        let right = g2.rename_apart(g1, &mut names);

        let mut rules: HashMap<Symbol, Vec<Term>> = HashMap::new();
        for rule in g1.rules().iter().chain(right.rules()) {
            rules
                .entry(rule.lhs.clone())
                .or_default()
                .push(rule.rhs.clone());
        }

        let mut ctx = Context::default();
        let goal = BTreeSet::from([Term::Var(right.start().clone())]);
        let result = self.check_term_set(&Term::Var(g1.start().clone()), &goal, &rules, &mut ctx);
        debug!("check({} ⊆ {}) = {}", g1.start(), g2.start(), result);
        result
    }

    /// `L(g2) ⊆ L(g1)`: does `g1` contain `g2`?
    pub fn contains(&self, g1: &TreeGrammar, g2: &TreeGrammar) -> bool {
        self.check(g2, g1)
    }

    /// Three-way comparison by mutual containment. `None` means the
    /// languages are incomparable.
    pub fn compare(&self, g1: &TreeGrammar, g2: &TreeGrammar) -> Option<Ordering> {
        match (self.check(g1, g2), self.check(g2, g1)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }

    /// Containment of `g`'s language in the singleton `{Leaf}`.
    ///
    /// Note this is *not* a literal emptiness test: a grammar whose
    /// language is exactly `{Leaf}` reports true, and a grammar whose
    /// `Node` rules happen to generate nothing reports false. The upstream
    /// operation has always behaved this way under this name.
    pub fn is_empty(&self, g: &TreeGrammar) -> bool {
        let leaf = TreeGrammar::build("S", [("S", Term::Leaf)]);
        self.check(g, &leaf)
    }

    /// `{t} ⊑ rs`, with the assume-then-discharge step.
    fn check_term_set(
        &self,
        t: &Term,
        rs: &BTreeSet<Term>,
        rules: &HashMap<Symbol, Vec<Term>>,
        ctx: &mut Context,
    ) -> bool {
        let obligation = (BTreeSet::from([t.clone()]), rs.clone());
        if ctx.has(&obligation) {
            trace!("{:indent$}hypothesis hit: {}", "", t, indent = ctx.trace.len());
            return true;
        }

        let mark = ctx.checkpoint();
        ctx.assume(obligation.clone());
        ctx.trace.push(obligation);
        trace!(
            "{:indent$}checking {} against {} candidates",
            "",
            t,
            rs.len(),
            indent = ctx.trace.len()
        );

        let ok = self.check_structure(t, rs, rules, ctx);

        ctx.trace.pop();
        if !ok {
            ctx.rollback(mark);
        }
        ok
    }

    /// Conjunction over the nondeterministic left alternatives.
    fn check_set_set(
        &self,
        ls: &BTreeSet<Term>,
        rs: &BTreeSet<Term>,
        rules: &HashMap<Symbol, Vec<Term>>,
        ctx: &mut Context,
    ) -> bool {
        ls.iter().all(|t| self.check_term_set(t, rs, rules, ctx))
    }

    fn check_structure(
        &self,
        t: &Term,
        rs: &BTreeSet<Term>,
        rules: &HashMap<Symbol, Vec<Term>>,
        ctx: &mut Context,
    ) -> bool {
        match t {
            Term::Var(variable) => {
                // One expansion step; the assumed obligation bounds
                // re-expansion of the same variable against the same set.
                let expansion: BTreeSet<Term> =
                    rules.get(variable).into_iter().flatten().cloned().collect();
                self.check_set_set(&expansion, rs, rules, ctx)
            }
            Term::Node(label, left, right) => self.check_rec(label, left, right, rs, rules, ctx),
            _ => self.check_leaf(rs, rules),
        }
    }

    /// A non-structured left term is covered iff the right set can produce
    /// a non-structured candidate.
    fn check_leaf(&self, rs: &BTreeSet<Term>, rules: &HashMap<Symbol, Vec<Term>>) -> bool {
        expand_set(rs, rules)
            .iter()
            .any(|candidate| !matches!(candidate, Term::Node(..)))
    }

    fn check_rec(
        &self,
        label: &Symbol,
        left: &Term,
        right: &Term,
        rs: &BTreeSet<Term>,
        rules: &HashMap<Symbol, Vec<Term>>,
        ctx: &mut Context,
    ) -> bool {
        let candidates: Vec<(Term, Term)> = expand_set(rs, rules)
            .into_iter()
            .filter_map(|candidate| match candidate {
                Term::Node(l, cl, cr) if &l == label => Some((*cl, *cr)),
                _ => None,
            })
            .collect();
        if candidates.is_empty() {
            return false;
        }
        self.split(left, right, &BTreeSet::new(), &BTreeSet::new(), &candidates, rules, ctx)
    }

    /// The incremental bipartite search over the matching candidates: the
    /// left child must be covered by the accumulated left components, or
    /// the right child by the accumulated right components; otherwise one
    /// candidate moves to each side and both branches must close. This
    /// finds a covering partition without enumerating all of them.
    #[allow(clippy::too_many_arguments)]
    fn split(
        &self,
        left: &Term,
        right: &Term,
        a: &BTreeSet<Term>,
        b: &BTreeSet<Term>,
        rest: &[(Term, Term)],
        rules: &HashMap<Symbol, Vec<Term>>,
        ctx: &mut Context,
    ) -> bool {
        if self.check_term_set(left, a, rules, ctx) {
            return true;
        }
        if self.check_term_set(right, b, rules, ctx) {
            return true;
        }
        let Some(((cl, cr), rest)) = rest.split_first() else {
            return false;
        };

        let mut a_grown = a.clone();
        a_grown.insert(cl.clone());
        if !self.split(left, right, &a_grown, b, rest, rules, ctx) {
            return false;
        }
        let mut b_grown = b.clone();
        b_grown.insert(cr.clone());
        self.split(left, right, a, &b_grown, rest, rules, ctx)
    }
}

/// Expands every variable in the set to its right-hand sides, to fixpoint;
/// a visited set guards unit cycles.
fn expand_set(rs: &BTreeSet<Term>, rules: &HashMap<Symbol, Vec<Term>>) -> BTreeSet<Term> {
    let mut out = BTreeSet::new();
    let mut visited: HashSet<Symbol> = HashSet::new();
    let mut queue: Vec<Term> = rs.iter().cloned().collect();
    while let Some(term) = queue.pop() {
        match term {
            Term::Var(variable) => {
                if visited.insert(variable.clone()) {
                    queue.extend(rules.get(&variable).into_iter().flatten().cloned());
                }
            }
            other => {
                out.insert(other);
            }
        }
    }
    out
}

/// A whole grammar acting as a pattern: `matches` holds iff the wrapped
/// grammar's language contains the subject's.
pub struct GrammarPattern<'a> {
    grammar: &'a TreeGrammar,
    comparator: &'a Comparator,
}

impl<'a> GrammarPattern<'a> {
    pub fn new(grammar: &'a TreeGrammar, comparator: &'a Comparator) -> Self {
        GrammarPattern { grammar, comparator }
    }

    pub fn matches(&self, subject: &TreeGrammar) -> bool {
        self.comparator.contains(self.grammar, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    /// `{S -> Leaf | a(S, S)}`.
    fn all_a() -> TreeGrammar {
        TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("a", Term::var("S"), Term::var("S"))),
            ],
        )
    }

    /// `all_a` plus an alternative root label "b".
    fn all_a_or_b_root() -> TreeGrammar {
        TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("a", Term::var("S"), Term::var("S"))),
                ("S", Term::node("b", Term::var("S"), Term::var("S"))),
            ],
        )
    }

    #[test]
    fn test_reflexivity() {
        let comparator = Comparator::new();
        for g in [all_a(), all_a_or_b_root()] {
            assert!(comparator.contains(&g, &g));
        }
    }

    #[test]
    fn test_strict_containment() {
        // The grammar with the extra root label contains the plain one,
        // not the other way around.
        let comparator = Comparator::new();
        let g1 = all_a();
        let g2 = all_a_or_b_root();
        assert!(comparator.contains(&g2, &g1));
        assert!(!comparator.contains(&g1, &g2));
    }

    #[test]
    fn test_transitivity() {
        let g1 = all_a();
        let g2 = all_a_or_b_root();
        let mut g3 = all_a_or_b_root();
        g3.add_rule(crate::grammar::Production::new(
            "S",
            Term::node("c", Term::var("S"), Term::var("S")),
        ));

        let comparator = Comparator::new();
        assert!(comparator.contains(&g2, &g1));
        assert!(comparator.contains(&g3, &g2));
        assert!(comparator.contains(&g3, &g1));
    }

    #[test]
    fn test_cyclic_grammar_terminates() {
        // Self-recursive grammar against itself exercises the coinductive
        // short-circuit.
        let g = TreeGrammar::build(
            "S",
            [("S", Term::node("a", Term::var("S"), Term::Leaf)), ("S", Term::Leaf)],
        );
        let comparator = Comparator::new();
        assert!(comparator.check(&g, &g));
    }

    #[test]
    fn test_purely_cyclic_self_comparison() {
        let g = TreeGrammar::build("S", [("S", Term::node("a", Term::var("S"), Term::Leaf))]);
        let comparator = Comparator::new();
        assert!(comparator.check(&g, &g));
    }

    #[test]
    fn test_compare_three_way() {
        let comparator = Comparator::new();
        let g1 = all_a();
        let g2 = all_a_or_b_root();
        let all_c = TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("c", Term::var("S"), Term::var("S"))),
            ],
        );

        assert_eq!(comparator.compare(&g1, &g1), Some(Ordering::Equal));
        assert_eq!(comparator.compare(&g1, &g2), Some(Ordering::Less));
        assert_eq!(comparator.compare(&g2, &g1), Some(Ordering::Greater));
        // Neither language contains the other's node trees.
        assert_eq!(comparator.compare(&g1, &all_c), None);
    }

    #[test]
    fn test_is_empty_literal_behavior() {
        let comparator = Comparator::new();

        let leaf_only = TreeGrammar::build("S", [("S", Term::Leaf)]);
        assert!(comparator.is_empty(&leaf_only));

        assert!(!comparator.is_empty(&all_a()));

        // A grammar whose Node rules generate nothing still reports
        // non-empty: the operation tests containment in {Leaf}, not
        // emptiness.
        let barren = TreeGrammar::build("S", [("S", Term::node("a", Term::var("S"), Term::var("S")))]);
        assert!(!comparator.is_empty(&barren));
    }

    #[test]
    fn test_reduce_preserves_language() {
        let g = TreeGrammar::build(
            "S",
            [
                ("S", Term::node("a", Term::var("T"), Term::var("S"))),
                ("S", Term::Leaf),
                ("T", Term::node("b", Term::var("U"), Term::var("U"))),
                ("U", Term::Leaf),
            ],
        );
        let reduced = g.clone().reduce();
        let twice = reduced.clone().reduce();

        let comparator = Comparator::new();
        assert_eq!(comparator.compare(&g, &reduced), Some(Ordering::Equal));
        assert_eq!(comparator.compare(&reduced, &twice), Some(Ordering::Equal));
    }

    #[test]
    fn test_grammar_pattern() {
        let comparator = Comparator::new();
        let pattern_grammar = all_a_or_b_root();
        let pattern = GrammarPattern::new(&pattern_grammar, &comparator);

        assert!(pattern.matches(&all_a()));
        assert!(!GrammarPattern::new(&all_a(), &comparator).matches(&all_a_or_b_root()));
    }

    #[test]
    fn test_unit_rules_and_shared_names() {
        // Identical variable names on both sides are renamed apart.
        let g1 = TreeGrammar::build(
            "S",
            [("S", Term::var("T")), ("T", Term::Leaf)],
        );
        let g2 = TreeGrammar::build("S", [("S", Term::Leaf)]);
        let comparator = Comparator::new();
        assert!(comparator.check(&g1, &g2));
        assert!(comparator.check(&g2, &g1));
    }
}
