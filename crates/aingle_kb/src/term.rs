//! Terms and statements
//!
//! A `Statement` is an ordered list of `Term`s. The first term is, by
//! convention, the predicate symbol, but matching treats it like any other
//! constant and no arity schema is enforced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix that marks a token as a variable in textual form (`?x`).
pub const VARIABLE_SIGIL: char = '?';

/// A single argument of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// An opaque atomic token.
    Constant(String),
    /// A named placeholder, scoped to the statement or rule it appears in.
    ///
    /// The name is stored without the `?` sigil.
    Variable(String),
}

impl Term {
    /// Creates a constant term.
    pub fn constant(name: impl Into<String>) -> Self {
        Term::Constant(name.into())
    }

    /// Creates a variable term. A leading `?` is stripped if present.
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix(VARIABLE_SIGIL) {
            Some(stripped) => Term::Variable(stripped.to_string()),
            None => Term::Variable(name),
        }
    }

    /// Reads a token, treating a leading `?` as the variable sigil.
    ///
    /// ```
    /// use aingle_kb::Term;
    ///
    /// assert_eq!(Term::from_token("?x"), Term::variable("x"));
    /// assert_eq!(Term::from_token("alice"), Term::constant("alice"));
    /// ```
    pub fn from_token(token: &str) -> Self {
        match token.strip_prefix(VARIABLE_SIGIL) {
            Some(name) => Term::Variable(name.to_string()),
            None => Term::Constant(token.to_string()),
        }
    }

    /// Returns `true` if this is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Returns `true` if this is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// The bare name of the term, without any sigil.
    pub fn name(&self) -> &str {
        match self {
            Term::Constant(name) | Term::Variable(name) => name,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(name) => f.write_str(name),
            Term::Variable(name) => write!(f, "{}{}", VARIABLE_SIGIL, name),
        }
    }
}

impl From<&str> for Term {
    fn from(token: &str) -> Self {
        Term::from_token(token)
    }
}

/// A predicate applied to an ordered argument list.
///
/// Statements are immutable once built; instantiation produces new ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement {
    terms: Vec<Term>,
}

impl Statement {
    /// Creates a statement from its terms, predicate first.
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    /// Builds a statement from textual tokens, e.g. `["parent", "?x", "bob"]`.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: tokens
                .into_iter()
                .map(|t| Term::from_token(t.as_ref()))
                .collect(),
        }
    }

    /// The leading term, if any.
    pub fn predicate(&self) -> Option<&Term> {
        self.terms.first()
    }

    /// All terms, predicate included.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Number of terms, predicate included.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the statement has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns `true` if no term is a variable.
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_constant)
    }

    /// Iterates the variables in order of appearance (repeats included).
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|t| match t {
            Term::Variable(name) => Some(name.as_str()),
            Term::Constant(_) => None,
        })
    }

    /// Feeds the canonical byte form of this statement into a hasher.
    ///
    /// Every term is tagged with its kind and length-prefixed, so the
    /// encoding is unambiguous: `(a bc)` and `(ab c)` never collide, nor do
    /// the constant `x` and the variable `?x`.
    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&(self.terms.len() as u64).to_le_bytes());
        for term in &self.terms {
            let (tag, name) = match term {
                Term::Constant(name) => (b'c', name),
                Term::Variable(name) => (b'v', name),
            };
            hasher.update(&[tag]);
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", term)?;
        }
        f.write_str(")")
    }
}

impl From<Vec<Term>> for Statement {
    fn from(terms: Vec<Term>) -> Self {
        Self::new(terms)
    }
}

impl FromIterator<Term> for Statement {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
