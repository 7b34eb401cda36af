//! Statement matching and instantiation
//!
//! Matching is the one-sided structural unification the knowledge base
//! needs: a rule antecedent against a stored fact while chaining, and a
//! query against a stored fact while asking. Instantiation substitutes the
//! resulting bindings back into a template.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::term::{Statement, Term};

/// Variable bindings produced by one match.
///
/// Bindings keep the order in which variables were first bound, so the
/// rendering of an answer follows the query's left-to-right reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    values: IndexMap<String, Term>,
}

impl Bindings {
    /// Create empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable to a value, replacing any previous value.
    pub fn bind(&mut self, var: impl Into<String>, value: Term) {
        self.values.insert(var.into(), value);
    }

    /// Binds `var` to `value` unless it is already bound to something else.
    ///
    /// Returns `false` on a conflicting binding, leaving the bindings as
    /// they were.
    pub fn test_and_bind(&mut self, var: &str, value: &Term) -> bool {
        match self.values.get(var) {
            Some(bound) => bound == value,
            None => {
                self.values.insert(var.to_string(), value.clone());
                true
            }
        }
    }

    /// Get a bound value
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.values.get(var)
    }

    /// Check if a variable is bound
    pub fn is_bound(&self, var: &str) -> bool {
        self.values.contains_key(var)
    }

    /// Iterates `(variable, value)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Bindings {
    /// Renders as `?X : bing, ?Y : chen`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (var, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}{} : {}", crate::term::VARIABLE_SIGIL, var, value)?;
        }
        Ok(())
    }
}

/// Matches `pattern` against `target`.
///
/// Fails when the statements differ in length or when two constants in the
/// same position differ. A variable on either side (pattern side checked
/// first) is bound to the opposing term; a variable that occurs more than
/// once must bind to the same value every time. A match of two ground
/// statements succeeds with empty bindings.
///
/// ```
/// use aingle_kb::{match_statements, Statement, Term};
///
/// let pattern = Statement::from_tokens(["parent", "?x", "?x"]);
/// assert!(match_statements(&pattern, &Statement::from_tokens(["parent", "a", "b"])).is_none());
///
/// let b = match_statements(&pattern, &Statement::from_tokens(["parent", "a", "a"])).unwrap();
/// assert_eq!(b.get("x"), Some(&Term::constant("a")));
/// ```
pub fn match_statements(pattern: &Statement, target: &Statement) -> Option<Bindings> {
    if pattern.len() != target.len() {
        return None;
    }

    let mut bindings = Bindings::new();
    for (p, t) in pattern.terms().iter().zip(target.terms()) {
        let consistent = match (p, t) {
            (Term::Variable(var), value) => bindings.test_and_bind(var, value),
            (value, Term::Variable(var)) => bindings.test_and_bind(var, value),
            (Term::Constant(a), Term::Constant(b)) => a == b,
        };
        if !consistent {
            return None;
        }
    }

    Some(bindings)
}

/// Substitutes every bound variable of `statement`.
///
/// Variables absent from `bindings` are copied through unchanged, and the
/// input is left untouched.
pub fn instantiate(statement: &Statement, bindings: &Bindings) -> Statement {
    statement
        .terms()
        .iter()
        .map(|term| match term {
            Term::Variable(var) => bindings.get(var).cloned().unwrap_or_else(|| term.clone()),
            Term::Constant(_) => term.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(tokens: &[&str]) -> Statement {
        Statement::from_tokens(tokens.iter().copied())
    }

    #[test]
    fn test_match_binds_pattern_variables() {
        let b = match_statements(&s(&["motherof", "ada", "?X"]), &s(&["motherof", "ada", "bing"]))
            .unwrap();
        assert_eq!(b.get("X"), Some(&Term::constant("bing")));
        assert_eq!(b.to_string(), "?X : bing");
    }

    #[test]
    fn test_match_binds_target_variables() {
        let b = match_statements(&s(&["p", "a", "b"]), &s(&["p", "?y", "b"])).unwrap();
        assert_eq!(b.get("y"), Some(&Term::constant("a")));
    }

    #[test]
    fn test_match_rejects_length_mismatch() {
        assert!(match_statements(&s(&["p", "a"]), &s(&["p", "a", "b"])).is_none());
    }

    #[test]
    fn test_match_rejects_constant_mismatch() {
        assert!(match_statements(&s(&["p", "a"]), &s(&["q", "a"])).is_none());
        assert!(match_statements(&s(&["p", "a"]), &s(&["p", "b"])).is_none());
    }

    #[test]
    fn test_match_repeated_variable_must_agree() {
        let pattern = s(&["sibling", "?x", "?x"]);
        assert!(match_statements(&pattern, &s(&["sibling", "a", "b"])).is_none());
        let b = match_statements(&pattern, &s(&["sibling", "a", "a"])).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_match_ground_statements_gives_empty_bindings() {
        let b = match_statements(&s(&["hero", "A"]), &s(&["hero", "A"])).unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn test_match_is_deterministic() {
        let pattern = s(&["rel", "?a", "?b", "?a"]);
        let target = s(&["rel", "x", "y", "x"]);
        let first = match_statements(&pattern, &target);
        let second = match_statements(&pattern, &target);
        assert_eq!(first, second);
        let order: Vec<_> = first.unwrap().iter().map(|(v, _)| v.to_string()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_instantiate_leaves_unbound_variables() {
        let mut b = Bindings::new();
        b.bind("x", Term::constant("A"));
        let template = s(&["relc", "?x", "?z"]);
        let out = instantiate(&template, &b);
        assert_eq!(out, s(&["relc", "A", "?z"]));
        // input untouched
        assert_eq!(template, s(&["relc", "?x", "?z"]));
    }

    #[test]
    fn test_test_and_bind_conflict_keeps_old_value() {
        let mut b = Bindings::new();
        assert!(b.test_and_bind("x", &Term::constant("a")));
        assert!(!b.test_and_bind("x", &Term::constant("b")));
        assert_eq!(b.get("x"), Some(&Term::constant("a")));
        assert!(b.is_bound("x"));
    }
}
