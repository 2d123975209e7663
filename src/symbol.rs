//! Immutable labels and the seams for external label matching and copying.
//!
//! A [`Symbol`] is the one identity type of the crate: it names node labels,
//! grammar variables, and primitive automaton states. Symbols are cheap to
//! clone (a shared string) and totally ordered so they can key
//! `BTreeSet`/`BTreeMap`.

use std::fmt;
use std::rc::Rc;

use crate::term::Term;

/// An immutable label.
///
/// Usable as a tree-node tag, a grammar variable name, or a primitive state
/// name. Equality and ordering are by the underlying text.
///
/// # Examples
///
/// ```
/// use rtl_rs::symbol::Symbol;
///
/// let a = Symbol::new("a");
/// let b = Symbol::new("a");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "a");
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Creates a symbol from the given text.
    ///
    /// # Panics
    ///
    /// Panics if the text is empty. Empty labels are never meaningful and
    /// an empty name would collide with generated-name bookkeeping.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        assert!(!name.is_empty(), "Symbol text must be non-empty");
        Symbol(Rc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

/// A pattern over labels.
///
/// The matching layer treats node labels through this seam so that callers
/// can plug in richer label classes (a set of labels, a wildcard) without
/// the term model knowing about them.
pub trait LabelPattern {
    fn matches(&self, label: &Symbol) -> bool;
}

/// A symbol matches exactly itself.
impl LabelPattern for Symbol {
    fn matches(&self, label: &Symbol) -> bool {
        self == label
    }
}

/// Matches any label.
pub struct AnyLabel;

impl LabelPattern for AnyLabel {
    fn matches(&self, _label: &Symbol) -> bool {
        true
    }
}

/// A term copier, pluggable into [`TreeGrammar::copy_with`].
///
/// The default [`CloneCopier`] is a structural clone. A caller that interns
/// terms or rewrites labels on the way in provides its own impl.
///
/// [`TreeGrammar::copy_with`]: crate::grammar::TreeGrammar::copy_with
pub trait TermCopier {
    fn copy_term(&self, term: &Term) -> Term;
}

/// Structural clone.
pub struct CloneCopier;

impl TermCopier for CloneCopier {
    fn copy_term(&self, term: &Term) -> Term {
        term.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_identity() {
        let a = Symbol::new("a");
        let b = Symbol::new("a");
        let c = Symbol::new("c");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
        assert_eq!(format!("{}", a), "a");
    }

    #[test]
    #[should_panic(expected = "Symbol text must be non-empty")]
    fn test_empty_symbol_panics() {
        Symbol::new("");
    }

    #[test]
    fn test_label_patterns() {
        let a = Symbol::new("a");
        let b = Symbol::new("b");
        assert!(a.matches(&a));
        assert!(!a.matches(&b));
        assert!(AnyLabel.matches(&a));
        assert!(AnyLabel.matches(&b));
    }
}
