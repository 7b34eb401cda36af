//! Forward chaining by incremental rule specialization
//!
//! One inference step takes one fact and one rule and tests the fact
//! against the rule's *first* antecedent only. A rule with a single
//! antecedent yields a derived fact; a longer rule yields a reduced rule
//! with that antecedent consumed and the bindings pushed into what is
//! left. Antecedents are therefore consumed strictly left to right, one
//! fact at a time, and each intermediate reduced rule is a first-class
//! item of the knowledge base that retraction can later remove.

use log::trace;

use crate::rule::{Fact, Item, Rule};
use crate::unify::{instantiate, match_statements, Bindings};

/// The product of one successful inference step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// The derived fact or reduced rule.
    pub item: Item,
    /// The bindings from matching the consumed antecedent.
    pub bindings: Bindings,
}

/// Performs single inference steps.
///
/// The engine is stateless; the knowledge base decides which pairs to try
/// and records the justification of whatever comes out.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine;

impl InferenceEngine {
    /// Creates a new `InferenceEngine`.
    pub fn new() -> Self {
        Self
    }

    /// Tries to specialize `rule` by `fact`.
    ///
    /// Returns `None` if the fact does not match the rule's first
    /// antecedent. Otherwise, with bindings `B`:
    ///
    /// - one antecedent: the fact `rhs[B]`;
    /// - more: the rule `lhs[1..][B] -> rhs[B]`, antecedent order kept.
    ///
    /// ```
    /// use aingle_kb::{Fact, InferenceEngine, Item, Rule, Statement};
    ///
    /// let rule = Rule::builder()
    ///     .when(Statement::from_tokens(["hero", "?x"]))
    ///     .when(Statement::from_tokens(["person", "?x"]))
    ///     .then(Statement::from_tokens(["goodman", "?x"]))
    ///     .build()
    ///     .unwrap();
    /// let fact = Fact::from_tokens(["hero", "A"]);
    ///
    /// let derived = InferenceEngine::new().fc_infer(&fact, &rule).unwrap();
    /// assert_eq!(derived.item.to_string(), "rule: ((person A)) -> (goodman A)");
    /// ```
    pub fn fc_infer(&self, fact: &Fact, rule: &Rule) -> Option<Derivation> {
        let (first, rest) = rule.lhs().split_first()?;
        let Some(bindings) = match_statements(first, &fact.statement) else {
            trace!("{} does not match first antecedent of {}", fact, rule);
            return None;
        };

        let rhs = instantiate(rule.rhs(), &bindings);
        let item = if rest.is_empty() {
            Item::Fact(Fact::new(rhs))
        } else {
            let lhs = rest.iter().map(|s| instantiate(s, &bindings)).collect();
            Item::Rule(Rule::reduced(lhs, rhs))
        };

        trace!("{} + {} => {} [{}]", rule, fact, item, bindings);
        Some(Derivation { item, bindings })
    }
}

/// Collects and stores statistics about the operations performed by a
/// `KnowledgeBase`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KbStats {
    /// Items told to the knowledge base from outside.
    pub asserts: usize,
    /// Assertions (external or derived) merged into an existing item.
    pub merges: usize,
    /// Fact/rule pairs tried by forward chaining.
    pub inference_attempts: usize,
    /// Inference steps whose first antecedent matched.
    pub inferences: usize,
    /// New facts stored as a result of inference.
    pub derived_facts: usize,
    /// New reduced rules stored as a result of inference.
    pub derived_rules: usize,
    /// Calls to `retract` that found their item.
    pub retractions: usize,
    /// Retractions that only cleared the asserted flag.
    pub demotions: usize,
    /// Items removed by retraction, cascades included.
    pub removals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Statement, Term};

    fn st(tokens: &[&str]) -> Statement {
        Statement::from_tokens(tokens.iter().copied())
    }

    fn rule(lhs: &[&[&str]], rhs: &[&str]) -> Rule {
        Rule::new(lhs.iter().map(|s| st(s)).collect(), st(rhs)).unwrap()
    }

    #[test]
    fn test_single_antecedent_yields_fact() {
        let r = rule(&[&["relaa", "?x"]], &["good", "?x"]);
        let d = InferenceEngine::new()
            .fc_infer(&Fact::from_tokens(["relaa", "A"]), &r)
            .unwrap();
        assert_eq!(d.item, Item::Fact(Fact::from_tokens(["good", "A"])));
        assert_eq!(d.bindings.get("x"), Some(&Term::constant("A")));
    }

    #[test]
    fn test_multiple_antecedents_yield_reduced_rule() {
        let r = rule(
            &[&["rela", "?x", "?y"], &["relb", "?y", "?z"], &["relq", "?z"]],
            &["relc", "?x", "?z"],
        );
        let d = InferenceEngine::new()
            .fc_infer(&Fact::from_tokens(["rela", "A", "B"]), &r)
            .unwrap();
        let expected = rule(&[&["relb", "B", "?z"], &["relq", "?z"]], &["relc", "A", "?z"]);
        assert_eq!(d.item, Item::Rule(expected));
    }

    #[test]
    fn test_only_first_antecedent_is_tested() {
        let r = rule(&[&["hero", "?x"], &["person", "?x"]], &["goodman", "?x"]);
        let engine = InferenceEngine::new();
        assert!(engine
            .fc_infer(&Fact::from_tokens(["person", "A"]), &r)
            .is_none());
    }

    #[test]
    fn test_no_match_on_conflicting_binding() {
        let r = rule(&[&["same", "?x", "?x"]], &["refl", "?x"]);
        assert!(InferenceEngine::new()
            .fc_infer(&Fact::from_tokens(["same", "a", "b"]), &r)
            .is_none());
    }

    #[test]
    fn test_unbound_consequent_variables_survive() {
        let r = rule(&[&["p", "?x"]], &["q", "?x", "?free"]);
        let d = InferenceEngine::new()
            .fc_infer(&Fact::from_tokens(["p", "a"]), &r)
            .unwrap();
        assert_eq!(d.item, Item::Fact(Fact::from_tokens(["q", "a", "?free"])));
    }
}
