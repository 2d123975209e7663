//! Grammar rewriting passes: normalization, reduction, and appending.
//!
//! Every pass consumes its grammar and returns the rewritten one, so a
//! grammar shared between callers can never be rewritten behind their
//! backs; callers that want the old value keep a clone.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::grammar::{NameSource, Production, TreeGrammar};
use crate::symbol::Symbol;
use crate::term::Term;

impl TreeGrammar {
    /// Rewrites the grammar into canonical shape.
    ///
    /// Afterwards every right-hand side is `Leaf` or `Node(label, v1, v2)`
    /// with `v1`, `v2` variables: unit rules (`v -> w`) are eliminated, a
    /// variable deriving exactly `Leaf` is reused or synthesized, and every
    /// non-variable child of a `Node` right-hand side is pulled out into a
    /// fresh variable. Unreachable rules are pruned at the end.
    ///
    /// Terminates because each original node spawns only finitely many
    /// productions, bounded by its size.
    ///
    /// # Panics
    ///
    /// Panics on a state-tagged right-hand side; state terms belong to
    /// automaton transitions, not grammar rules.
    pub fn normalize(mut self, names: &mut NameSource) -> TreeGrammar {
        names.absorb(&self);
        self.eliminate_units();

        // The leaf variable must derive exactly {Leaf}; a variable with
        // further productions would enlarge the language of every rule
        // whose Leaf child gets pointed at it.
        let leaf_only = self
            .rules()
            .iter()
            .find(|rule| {
                rule.rhs == Term::Leaf && self.rules_for(&rule.lhs).all(|rhs| *rhs == Term::Leaf)
            })
            .map(|rule| rule.lhs.clone());
        let leaf_var = match leaf_only {
            Some(variable) => variable,
            None => {
                let fresh = names.fresh();
                debug!("normalize: synthesizing leaf rule {} -> leaf", fresh);
                self.add_rule(Production::new(fresh.clone(), Term::Leaf));
                fresh
            }
        };

        loop {
            let mut fresh_rules: Vec<Production> = Vec::new();
            for rule in self.rules_mut().iter_mut() {
                match &mut rule.rhs {
                    Term::Leaf => {}
                    Term::Node(_, left, right) => {
                        for child in [left, right] {
                            match child.as_ref() {
                                Term::Var(_) => {}
                                Term::Leaf => {
                                    **child = Term::Var(leaf_var.clone());
                                }
                                Term::Node(..) => {
                                    let fresh = names.fresh();
                                    let pulled =
                                        std::mem::replace(child.as_mut(), Term::Var(fresh.clone()));
                                    fresh_rules.push(Production::new(fresh, pulled));
                                }
                                Term::State(..) => {
                                    panic!("Unsupported rule shape: state term under '{}'", rule.lhs)
                                }
                            }
                        }
                    }
                    Term::Var(_) => unreachable!("unit rules were eliminated"),
                    Term::State(..) => {
                        panic!("Unsupported rule shape: state term under '{}'", rule.lhs)
                    }
                }
            }
            if fresh_rules.is_empty() {
                break;
            }
            debug!("normalize: {} new rules", fresh_rules.len());
            for rule in fresh_rules {
                self.add_rule(rule);
            }
        }

        // In-place child rewrites can make distinct rules collide.
        let mut seen: HashSet<Production> = HashSet::new();
        self.rules_mut().retain(|rule| seen.insert(rule.clone()));

        self.prune_unreachable();
        self
    }

    /// Replaces every unit rule `v -> w` by `v -> rhs` for each of `w`'s
    /// right-hand sides. Self-units are dropped, and each `(v, w)` pair is
    /// expanded at most once, so cyclic unit chains terminate.
    fn eliminate_units(&mut self) {
        let mut expanded: HashSet<(Symbol, Symbol)> = HashSet::new();
        loop {
            let unit = self.rules().iter().find_map(|rule| match &rule.rhs {
                Term::Var(target) => Some((rule.lhs.clone(), target.clone())),
                _ => None,
            });
            let Some((lhs, target)) = unit else { break };

            self.rules_mut()
                .retain(|rule| !(rule.lhs == lhs && rule.rhs == Term::Var(target.clone())));
            if lhs == target || !expanded.insert((lhs.clone(), target.clone())) {
                continue;
            }
            debug!("eliminate_units: {} -> {}", lhs, target);
            let replacements: Vec<Term> = self.rules_for(&target).cloned().collect();
            for rhs in replacements {
                self.add_rule(Production::new(lhs.clone(), rhs));
            }
        }
    }

    /// Inlines variables that have a single production and a single use,
    /// then prunes unreachable rules. Self-recursive rules are never
    /// inlined; a visited set keeps each candidate from being reconsidered.
    pub fn reduce(mut self) -> TreeGrammar {
        let mut visited: HashSet<Symbol> = HashSet::new();
        loop {
            let candidate = self.single_use_candidate(&visited);
            let Some(variable) = candidate else { break };
            visited.insert(variable.clone());

            let mut productions = self.take_rules(&variable);
            let rhs = productions.pop().expect("candidate has one production").rhs;
            debug!("reduce: inlining {} -> {}", variable, rhs);
            for rule in self.rules_mut().iter_mut() {
                rule.rhs = rule.rhs.substitute(&variable, &rhs);
            }
        }
        self.prune_unreachable();
        self
    }

    fn single_use_candidate(&self, visited: &HashSet<Symbol>) -> Option<Symbol> {
        let mut production_count: HashMap<Symbol, usize> = HashMap::new();
        let mut use_count: HashMap<Symbol, usize> = HashMap::new();
        for rule in self.rules() {
            *production_count.entry(rule.lhs.clone()).or_insert(0) += 1;
            count_occurrences(&rule.rhs, &mut use_count);
        }
        self.rules().iter().find_map(|rule| {
            let variable = &rule.lhs;
            if variable == self.start()
                || visited.contains(variable)
                || production_count.get(variable) != Some(&1)
                || use_count.get(variable) != Some(&1)
                || rule.rhs.variables().contains(variable)
            {
                None
            } else {
                Some(variable.clone())
            }
        })
    }

    /// Extends every `Leaf` position reachable from the start with `term`.
    ///
    /// The grammar is normalized, every start-reachable rule is cloned
    /// under a fresh variable, `Leaf` right-hand sides in the clones are
    /// rewritten to `term`, and the start is redirected to its clone. The
    /// prior rules stay in place, unreferenced by the new start, so
    /// unrelated trees are unaffected.
    pub fn append(self, term: &Term, names: &mut NameSource) -> TreeGrammar {
        let mut grammar = self.normalize(names);
        let reachable = grammar.reachable_variables();
        let clones: HashMap<Symbol, Symbol> =
            reachable.iter().map(|v| (v.clone(), names.fresh())).collect();

        let mut cloned_rules: Vec<Production> = Vec::new();
        for rule in grammar.rules() {
            let Some(lhs) = clones.get(&rule.lhs) else { continue };
            let rhs = match &rule.rhs {
                Term::Leaf => term.clone(),
                Term::Node(label, left, right) => Term::node(
                    label.clone(),
                    clone_child(left, &clones),
                    clone_child(right, &clones),
                ),
                _ => unreachable!("grammar is normalized"),
            };
            cloned_rules.push(Production::new(lhs.clone(), rhs));
        }

        debug!("append: {} cloned rules", cloned_rules.len());
        for rule in cloned_rules {
            grammar.add_rule(rule);
        }
        let new_start = clones[grammar.start()].clone();
        grammar.set_start(new_start);
        grammar
    }

    /// Extends only the deepest right-spine `Leaf` position with `term`.
    ///
    /// Clones the right-spine variables (rules reachable from the start by
    /// following right children), rewrites the spine-terminating `Leaf`
    /// right-hand sides in the clones, and redirects the start. Left
    /// subtrees keep pointing at the original, unrewritten variables.
    ///
    /// # Panics
    ///
    /// Panics if the start itself derives `Leaf`: a rootless leaf has no
    /// parent node to append beneath.
    pub fn append_child(self, term: &Term, names: &mut NameSource) -> TreeGrammar {
        let mut grammar = self.normalize(names);

        for rhs in grammar.rules_for(grammar.start()) {
            if *rhs == Term::Leaf {
                panic!("Cannot append below a rootless leaf; a parent node is required");
            }
        }

        let mut spine: HashSet<Symbol> = HashSet::new();
        let mut queue = VecDeque::from([grammar.start().clone()]);
        while let Some(variable) = queue.pop_front() {
            if !spine.insert(variable.clone()) {
                continue;
            }
            for rhs in grammar.rules_for(&variable) {
                if let Term::Node(_, _, right) = rhs {
                    if let Term::Var(next) = right.as_ref() {
                        if !spine.contains(next) {
                            queue.push_back(next.clone());
                        }
                    }
                }
            }
        }

        let clones: HashMap<Symbol, Symbol> =
            spine.iter().map(|v| (v.clone(), names.fresh())).collect();

        let mut cloned_rules: Vec<Production> = Vec::new();
        for rule in grammar.rules() {
            let Some(lhs) = clones.get(&rule.lhs) else { continue };
            let rhs = match &rule.rhs {
                Term::Leaf => term.clone(),
                Term::Node(label, left, right) => Term::node(
                    label.clone(),
                    left.as_ref().clone(),
                    clone_child(right, &clones),
                ),
                _ => unreachable!("grammar is normalized"),
            };
            cloned_rules.push(Production::new(lhs.clone(), rhs));
        }

        debug!("append_child: {} spine rules cloned", cloned_rules.len());
        for rule in cloned_rules {
            grammar.add_rule(rule);
        }
        let new_start = clones[grammar.start()].clone();
        grammar.set_start(new_start);
        grammar
    }
}

/// Counts variable *occurrences*, unlike [`Term::variables`], which
/// collapses repeated uses into a set.
fn count_occurrences(term: &Term, counts: &mut HashMap<Symbol, usize>) {
    match term {
        Term::Leaf => {}
        Term::Node(_, left, right) => {
            count_occurrences(left, counts);
            count_occurrences(right, counts);
        }
        Term::Var(name) => *counts.entry(name.clone()).or_insert(0) += 1,
        Term::State(_, inner) => count_occurrences(inner, counts),
    }
}

fn clone_child(child: &Term, clones: &HashMap<Symbol, Symbol>) -> Term {
    match child {
        Term::Var(name) => match clones.get(name) {
            Some(clone) => Term::Var(clone.clone()),
            None => child.clone(),
        },
        _ => unreachable!("grammar is normalized"),
    }
}
