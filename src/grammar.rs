//! Regular tree grammars.
//!
//! A [`TreeGrammar`] is a start variable plus a finite set of production
//! rules `variable -> term-pattern`. The generated language is the set of
//! ground terms derivable from the start by repeatedly substituting a
//! variable with one of its right-hand sides; grammars may be cyclic and
//! denote infinite regular sets.
//!
//! The rewriting passes (`normalize`, `reduce`, `append`, `append_child`)
//! live in [`crate::rewrite`] and consume their grammar rather than
//! mutating a shared one.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use log::debug;

use crate::symbol::{Symbol, TermCopier};
use crate::term::Term;

/// A production rule `lhs -> rhs`, owned as a value by its grammar.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Production {
    pub lhs: Symbol,
    pub rhs: Term,
}

impl Production {
    pub fn new(lhs: impl Into<Symbol>, rhs: Term) -> Self {
        Production { lhs: lhs.into(), rhs }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs)
    }
}

/// A generator of fresh variable names.
///
/// Generated names carry the reserved `%` prefix; caller-chosen variable
/// names must not use it. One source per naming domain: seed it from the
/// grammar(s) it will extend so generated names stay fresh.
#[derive(Debug, Default, Clone)]
pub struct NameSource {
    next: u32,
}

impl NameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose names are fresh with respect to `grammar`.
    pub fn above(grammar: &TreeGrammar) -> Self {
        let mut names = NameSource::new();
        names.absorb(grammar);
        names
    }

    /// Raises the counter past every generated-style name in `grammar`.
    pub fn absorb(&mut self, grammar: &TreeGrammar) {
        for name in grammar.variables() {
            if let Some(rest) = name.as_str().strip_prefix('%') {
                if let Ok(n) = rest.parse::<u32>() {
                    self.next = self.next.max(n + 1);
                }
            }
        }
    }

    pub fn fresh(&mut self) -> Symbol {
        let name = Symbol::new(format!("%{}", self.next));
        self.next += 1;
        name
    }
}

/// A regular tree grammar: a start variable and an ordered rule set.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TreeGrammar {
    start: Symbol,
    rules: Vec<Production>,
}

impl TreeGrammar {
    pub fn new(start: impl Into<Symbol>) -> Self {
        TreeGrammar {
            start: start.into(),
            rules: Vec::new(),
        }
    }

    /// Builds a grammar from a start variable and `(lhs, rhs)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtl_rs::grammar::TreeGrammar;
    /// use rtl_rs::term::Term;
    ///
    /// // S -> Leaf | a(S, S)
    /// let g = TreeGrammar::build("S", [
    ///     ("S", Term::Leaf),
    ///     ("S", Term::node("a", Term::var("S"), Term::var("S"))),
    /// ]);
    /// assert_eq!(g.rules().len(), 2);
    /// ```
    pub fn build<N>(start: impl Into<Symbol>, rules: impl IntoIterator<Item = (N, Term)>) -> Self
    where
        N: Into<Symbol>,
    {
        let mut grammar = TreeGrammar::new(start);
        for (lhs, rhs) in rules {
            grammar.add_rule(Production::new(lhs, rhs));
        }
        grammar
    }

    pub fn start(&self) -> &Symbol {
        &self.start
    }

    pub fn set_start(&mut self, start: impl Into<Symbol>) {
        self.start = start.into();
    }

    pub fn rules(&self) -> &[Production] {
        &self.rules
    }

    pub(crate) fn rules_mut(&mut self) -> &mut Vec<Production> {
        &mut self.rules
    }

    /// The right-hand sides of `variable`, in insertion order.
    pub fn rules_for<'a>(&'a self, variable: &'a Symbol) -> impl Iterator<Item = &'a Term> {
        self.rules
            .iter()
            .filter(move |rule| &rule.lhs == variable)
            .map(|rule| &rule.rhs)
    }

    /// Adds a rule unless an identical one is already present.
    pub fn add_rule(&mut self, rule: Production) -> bool {
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Removes all rules for `variable`, returning them.
    pub fn take_rules(&mut self, variable: &Symbol) -> Vec<Production> {
        let mut taken = Vec::new();
        self.rules.retain(|rule| {
            if &rule.lhs == variable {
                taken.push(rule.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    /// All variable names: every lhs plus every variable occurring in a rhs,
    /// plus the start.
    pub fn variables(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        out.insert(self.start.clone());
        for rule in &self.rules {
            out.insert(rule.lhs.clone());
            out.extend(rule.rhs.variables());
        }
        out
    }

    /// Variables reachable from the start through rule right-hand sides.
    pub fn reachable_variables(&self) -> HashSet<Symbol> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.start.clone()]);
        while let Some(variable) = queue.pop_front() {
            if !seen.insert(variable.clone()) {
                continue;
            }
            for rhs in self.rules_for(&variable) {
                for name in rhs.variables() {
                    if !seen.contains(&name) {
                        queue.push_back(name);
                    }
                }
            }
        }
        seen
    }

    /// Drops every rule whose left-hand side is unreachable from the start.
    pub fn prune_unreachable(&mut self) {
        let reachable = self.reachable_variables();
        let before = self.rules.len();
        self.rules.retain(|rule| reachable.contains(&rule.lhs));
        debug!("prune: {} -> {} rules", before, self.rules.len());
    }

    /// Deep copy under a pluggable copier.
    pub fn copy_with(&self, copier: &impl TermCopier) -> TreeGrammar {
        TreeGrammar {
            start: self.start.clone(),
            rules: self
                .rules
                .iter()
                .map(|rule| Production {
                    lhs: rule.lhs.clone(),
                    rhs: copier.copy_term(&rule.rhs),
                })
                .collect(),
        }
    }

    /// Renames this grammar's variables away from `other`'s, so the two can
    /// share one namespace without capture.
    pub fn rename_apart(&self, other: &TreeGrammar, names: &mut NameSource) -> TreeGrammar {
        let taken = other.variables();
        let mut map: HashMap<Symbol, Symbol> = HashMap::new();
        for variable in self.variables() {
            if taken.contains(&variable) {
                map.insert(variable.clone(), names.fresh());
            }
        }
        if map.is_empty() {
            return self.clone();
        }
        debug!("rename_apart: {} collisions", map.len());
        let start = map.get(&self.start).cloned().unwrap_or_else(|| self.start.clone());
        let rules = self
            .rules
            .iter()
            .map(|rule| Production {
                lhs: map.get(&rule.lhs).cloned().unwrap_or_else(|| rule.lhs.clone()),
                rhs: rule.rhs.rename(&map),
            })
            .collect();
        TreeGrammar { start, rules }
    }
}

impl fmt::Display for TreeGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start: {}", self.start)?;
        for rule in &self.rules {
            writeln!(f, "  {}", rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::symbol::CloneCopier;

    use test_log::test;

    fn sample() -> TreeGrammar {
        TreeGrammar::build(
            "S",
            [
                ("S", Term::Leaf),
                ("S", Term::node("a", Term::var("S"), Term::var("T"))),
                ("T", Term::Leaf),
                ("U", Term::node("b", Term::var("U"), Term::var("U"))),
            ],
        )
    }

    #[test]
    fn test_rules_for() {
        let g = sample();
        let s = Symbol::new("S");
        assert_eq!(g.rules_for(&s).count(), 2);
        assert_eq!(g.rules_for(&Symbol::new("T")).count(), 1);
        assert_eq!(g.rules_for(&Symbol::new("X")).count(), 0);
    }

    #[test]
    fn test_duplicate_rules_ignored() {
        let mut g = sample();
        assert!(!g.add_rule(Production::new("T", Term::Leaf)));
        assert_eq!(g.rules().len(), 4);
    }

    #[test]
    fn test_prune_unreachable() {
        let mut g = sample();
        g.prune_unreachable();
        assert_eq!(g.rules().len(), 3);
        assert_eq!(g.rules_for(&Symbol::new("U")).count(), 0);
    }

    #[test]
    fn test_name_source_above() {
        let g = TreeGrammar::build(
            "S",
            [("S", Term::var("%3")), ("%3", Term::Leaf)],
        );
        let mut names = NameSource::above(&g);
        assert_eq!(names.fresh(), Symbol::new("%4"));
        assert_eq!(names.fresh(), Symbol::new("%5"));
    }

    #[test]
    fn test_copy_with() {
        let g = sample();
        let copy = g.copy_with(&CloneCopier);
        assert_eq!(g, copy);
    }

    #[test]
    fn test_rename_apart() {
        let g1 = sample();
        let g2 = TreeGrammar::build("S", [("S", Term::node("c", Term::var("S"), Term::var("S")))]);
        let mut names = NameSource::new();
        let renamed = g2.rename_apart(&g1, &mut names);

        assert!(g1.variables().is_disjoint(&renamed.variables()));
        assert_eq!(renamed.rules().len(), 1);
        // The recursive structure survives the renaming.
        let rhs = renamed.rules_for(renamed.start()).next().unwrap().clone();
        assert_eq!(
            rhs,
            Term::node(
                "c",
                Term::Var(renamed.start().clone()),
                Term::Var(renamed.start().clone())
            )
        );
    }
}
