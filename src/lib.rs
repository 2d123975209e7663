//! # rtl-rs: Regular Tree Languages in Rust
//!
//! **`rtl-rs`** is a library for working with **regular tree languages**: finite
//! descriptions of (possibly infinite) sets of binary trees, given either as
//! tree grammars or as tree automata.
//!
//! ## What is a regular tree language?
//!
//! A regular tree language is the tree-shaped analogue of a regular string
//! language. A [`TreeGrammar`][crate::grammar::TreeGrammar] generates trees from
//! a start variable by rewriting variables with rule right-hand sides; a tree
//! automaton recognizes trees by running states over them. Grammars may be
//! cyclic, so the described languages are infinite in general, yet containment
//! between them stays decidable.
//!
//! ## Key Features
//!
//! - **Grammar rewriting**: normalization to a canonical rule shape, dead-rule
//!   reduction, and leaf-targeted `append` / `append_child` composition.
//! - **Tree automata**: nondeterministic bottom-up and top-down automata whose
//!   transitions rewrite as well as recognize, so every automaton is also a
//!   transducer.
//! - **Grammar transduction**: product constructions translating a grammar
//!   through an automaton into the grammar of the output language.
//! - **Containment**: a coinductive decision procedure for `L(g1) ⊆ L(g2)` on
//!   cyclic grammars, with three-way [`compare`][crate::compare::Comparator::compare].
//! - **Visualization**: DOT (Graphviz) export for grammars and automata.
//!
//! ## Basic Usage
//!
//! ```rust
//! use rtl_rs::compare::Comparator;
//! use rtl_rs::grammar::TreeGrammar;
//! use rtl_rs::term::Term;
//!
//! // 1. All trees over "a": S -> Leaf | a(S, S)
//! let small = TreeGrammar::build("S", [
//!     ("S", Term::Leaf),
//!     ("S", Term::node("a", Term::var("S"), Term::var("S"))),
//! ]);
//!
//! // 2. The same plus "b" nodes
//! let large = TreeGrammar::build("S", [
//!     ("S", Term::Leaf),
//!     ("S", Term::node("a", Term::var("S"), Term::var("S"))),
//!     ("S", Term::node("b", Term::var("S"), Term::var("S"))),
//! ]);
//!
//! // 3. Decide containment between the infinite languages
//! let comparator = Comparator::new();
//! assert!(comparator.contains(&large, &small));
//! assert!(!comparator.contains(&small, &large));
//! ```
//!
//! ## Core Components
//!
//! - **[`term`]**: Trees, term patterns, and automaton states.
//! - **[`grammar`]**: Tree grammars and fresh-name generation.
//! - **[`rewrite`]**: The grammar rewriting passes (`normalize`, `reduce`,
//!   `append`, `append_child`).
//! - **[`automaton`]**: Bottom-up and top-down tree automata.
//! - **[`translate`]**: Grammar-through-automaton transduction.
//! - **[`compare`]**: The containment decision procedure.
//! - **[`dot`]**: Graphviz export.

pub mod automaton;
pub mod compare;
pub mod dot;
pub mod generic;
pub mod grammar;
pub mod matching;
pub mod rewrite;
pub mod symbol;
pub mod term;
pub mod translate;
