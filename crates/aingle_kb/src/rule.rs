//! Facts, rules and the items a knowledge base stores
//!
//! These are plain values: they carry no truth-maintenance bookkeeping.
//! The knowledge base keeps that state in its own nodes, keyed by the
//! content-addressed ids these values hash to.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::term::Statement;
use crate::tms::{FactId, ItemId, RuleId};

/// A statement believed true.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    /// The statement this fact asserts.
    pub statement: Statement,
}

impl Fact {
    /// Creates a fact from a statement.
    pub fn new(statement: Statement) -> Self {
        Self { statement }
    }

    /// Shorthand for `Fact::new(Statement::from_tokens(tokens))`.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(Statement::from_tokens(tokens))
    }

    /// The content-addressed id this fact is stored under.
    pub fn id(&self) -> FactId {
        FactId::of(&self.statement)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statement)
    }
}

/// An implication: the conjunction of `lhs` implies `rhs`.
///
/// Antecedent order is significant: forward chaining consumes antecedents
/// strictly left to right, one fact at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    lhs: Vec<Statement>,
    rhs: Statement,
}

impl Rule {
    /// Creates a rule.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRule` if `lhs` is empty.
    pub fn new(lhs: Vec<Statement>, rhs: Statement) -> Result<Self> {
        if lhs.is_empty() {
            return Err(Error::InvalidRule(format!(
                "rule concluding {} has no antecedents",
                rhs
            )));
        }
        Ok(Self { lhs, rhs })
    }

    /// A rule with one antecedent consumed. `lhs` is non-empty by
    /// construction at the only call site.
    pub(crate) fn reduced(lhs: Vec<Statement>, rhs: Statement) -> Self {
        debug_assert!(!lhs.is_empty());
        Self { lhs, rhs }
    }

    /// Starts a `RuleBuilder`.
    ///
    /// ```
    /// use aingle_kb::{Rule, Statement};
    ///
    /// let rule = Rule::builder()
    ///     .when(Statement::from_tokens(["hero", "?x"]))
    ///     .when(Statement::from_tokens(["person", "?x"]))
    ///     .then(Statement::from_tokens(["goodman", "?x"]))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(rule.to_string(), "((hero ?x) (person ?x)) -> (goodman ?x)");
    /// ```
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// The antecedents, in the order they are consumed.
    pub fn lhs(&self) -> &[Statement] {
        &self.lhs
    }

    /// The consequent.
    pub fn rhs(&self) -> &Statement {
        &self.rhs
    }

    /// The content-addressed id this rule is stored under.
    pub fn id(&self) -> RuleId {
        RuleId::of(&self.lhs, &self.rhs)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, antecedent) in self.lhs.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", antecedent)?;
        }
        write!(f, ") -> {}", self.rhs)
    }
}

/// A builder for creating `Rule`s using a fluent API.
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    lhs: Vec<Statement>,
    rhs: Option<Statement>,
}

impl RuleBuilder {
    /// Appends an antecedent.
    pub fn when(mut self, antecedent: Statement) -> Self {
        self.lhs.push(antecedent);
        self
    }

    /// Sets the consequent.
    pub fn then(mut self, consequent: Statement) -> Self {
        self.rhs = Some(consequent);
        self
    }

    /// Builds and returns the final `Rule`.
    pub fn build(self) -> Result<Rule> {
        let rhs = self
            .rhs
            .ok_or_else(|| Error::InvalidRule("rule has no consequent".to_string()))?;
        Rule::new(self.lhs, rhs)
    }
}

/// Anything the knowledge base can be told, asked or asked to forget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    /// A fact.
    Fact(Fact),
    /// A rule.
    Rule(Rule),
}

impl Item {
    /// The content-addressed id of the wrapped fact or rule.
    pub fn id(&self) -> ItemId {
        match self {
            Item::Fact(fact) => ItemId::Fact(fact.id()),
            Item::Rule(rule) => ItemId::Rule(rule.id()),
        }
    }

    /// Returns the wrapped fact, if this is one.
    pub fn as_fact(&self) -> Option<&Fact> {
        match self {
            Item::Fact(fact) => Some(fact),
            Item::Rule(_) => None,
        }
    }

    /// Returns the wrapped rule, if this is one.
    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Item::Rule(rule) => Some(rule),
            Item::Fact(_) => None,
        }
    }
}

impl fmt::Display for Item {
    /// Renders in the same `fact: …` / `rule: …` form the text front end reads.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Fact(fact) => write!(f, "fact: {}", fact),
            Item::Rule(rule) => write!(f, "rule: {}", rule),
        }
    }
}

impl From<Fact> for Item {
    fn from(fact: Fact) -> Self {
        Item::Fact(fact)
    }
}

impl From<Rule> for Item {
    fn from(rule: Rule) -> Self {
        Item::Rule(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builder() {
        let rule = Rule::builder()
            .when(Statement::from_tokens(["rela", "?x", "?y"]))
            .when(Statement::from_tokens(["relb", "?y", "?z"]))
            .then(Statement::from_tokens(["relc", "?x", "?z"]))
            .build()
            .unwrap();

        assert_eq!(rule.lhs().len(), 2);
        assert_eq!(rule.rhs(), &Statement::from_tokens(["relc", "?x", "?z"]));
    }

    #[test]
    fn test_rule_requires_antecedent() {
        let err = Rule::new(vec![], Statement::from_tokens(["good", "?x"])).unwrap_err();
        assert!(matches!(err, Error::InvalidRule(_)));
    }

    #[test]
    fn test_rule_requires_consequent() {
        let err = Rule::builder()
            .when(Statement::from_tokens(["a"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRule(_)));
    }

    #[test]
    fn test_structurally_equal_items_share_ids() {
        let a = Fact::from_tokens(["hero", "A"]);
        let b = Fact::from_tokens(["hero", "A"]);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), Fact::from_tokens(["hero", "B"]).id());
    }

    #[test]
    fn test_antecedent_order_changes_rule_id() {
        let p = Statement::from_tokens(["p", "?x"]);
        let q = Statement::from_tokens(["q", "?x"]);
        let r = Statement::from_tokens(["r", "?x"]);
        let pq = Rule::new(vec![p.clone(), q.clone()], r.clone()).unwrap();
        let qp = Rule::new(vec![q, p], r).unwrap();
        assert_ne!(pq.id(), qp.id());
    }

    #[test]
    fn test_item_display() {
        let item = Item::from(Fact::from_tokens(["hero", "A"]));
        assert_eq!(item.to_string(), "fact: (hero A)");
        assert!(item.as_fact().is_some());
        assert!(item.as_rule().is_none());
    }
}
