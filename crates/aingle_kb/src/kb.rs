//! The knowledge base
//!
//! `KnowledgeBase` ties the pieces together: it deduplicates what it is
//! told, runs forward chaining from every newly stored item against the
//! opposite collection, answers fact queries, and retracts through the
//! justification graph.
//!
//! Both mutating calls take `&mut self` and cannot fail halfway, so every
//! `assert` and `retract` is observed as a whole.

use log::{debug, warn};
use std::fmt;

use crate::config::KbConfig;
use crate::engine::{InferenceEngine, KbStats};
use crate::error::{Error, Result};
use crate::justification::Justification;
use crate::query::{self, BindingSet};
use crate::rule::{Fact, Item, Rule};
use crate::syntax;
use crate::tms::{
    FactEntry, FactId, ItemId, JustificationGraph, Retraction, RuleEntry, RuleId, Support,
};

/// Pending inference work for one newly stored item: the pairs it forms
/// with every item of the opposite kind that was stored before it.
struct Frame {
    pairs: std::vec::IntoIter<(FactId, RuleId)>,
}

/// An in-memory deductive store with truth maintenance.
///
/// # Examples
///
/// ```
/// use aingle_kb::{syntax::parse_item, KnowledgeBase};
///
/// let mut kb = KnowledgeBase::new();
/// kb.load(
///     "fact: (hero A)
///      fact: (person A)
///      rule: ((hero ?x) (person ?x)) -> (goodman ?x)",
/// )
/// .unwrap();
///
/// let answers = kb.ask(&parse_item("fact: (goodman ?who)").unwrap());
/// assert_eq!(answers[0].to_string(), "?who : A");
///
/// kb.retract(&parse_item("fact: (hero A)").unwrap()).unwrap();
/// assert!(kb.ask(&parse_item("fact: (goodman A)").unwrap()).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    graph: JustificationGraph,
    engine: InferenceEngine,
    config: KbConfig,
    stats: KbStats,
}

impl KnowledgeBase {
    /// Creates an empty knowledge base with the default configuration.
    pub fn new() -> Self {
        Self::with_config(KbConfig::default())
    }

    /// Creates an empty knowledge base with the given configuration.
    pub fn with_config(config: KbConfig) -> Self {
        Self {
            graph: JustificationGraph::with_capacity(config.fact_capacity, config.rule_capacity),
            engine: InferenceEngine::new(),
            config,
            stats: KbStats::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &KbConfig {
        &self.config
    }

    /// Tells the knowledge base a fact or rule and forward-chains to fixpoint.
    ///
    /// If a structurally equal item is already stored it is marked asserted
    /// and nothing else happens. Otherwise the item is stored and matched
    /// against every stored item of the opposite kind: a fact against each
    /// rule's first antecedent, a rule's first antecedent against each
    /// fact. Every derived fact or reduced rule goes through the same path,
    /// justified by the pair that produced it.
    ///
    /// Returns the id the item is stored under.
    pub fn assert(&mut self, item: impl Into<Item>) -> ItemId {
        let item = item.into();
        let id = item.id();
        debug!("Asserting {}", item);
        self.stats.asserts += 1;

        let mut stack = Vec::new();
        if let Some(frame) = self.add(item, None) {
            stack.push(frame);
        }

        // Depth-first, in the order a recursive implementation would visit
        // derivations, without growing the call stack.
        while let Some(frame) = stack.last_mut() {
            let Some((fact, rule)) = frame.pairs.next() else {
                stack.pop();
                continue;
            };
            if let Some(next) = self.infer(fact, rule) {
                stack.push(next);
            }
        }

        id
    }

    /// Parses a document in the `fact:` / `rule:` line syntax and asserts
    /// every item in order.
    ///
    /// The whole document is parsed before anything is asserted, so a parse
    /// error leaves the knowledge base untouched. Returns the number of
    /// items asserted.
    pub fn load(&mut self, text: &str) -> Result<usize> {
        let items = syntax::parse_document(text)?;
        let count = items.len();
        for item in items {
            self.assert(item);
        }
        Ok(count)
    }

    /// Stores `item` or merges it into its stored twin.
    ///
    /// Returns the inference frame for a newly stored item.
    fn add(&mut self, item: Item, support: Option<Support>) -> Option<Frame> {
        let id = item.id();

        if self.graph.contains(id) {
            self.stats.merges += 1;
            match support {
                Some(support) if support.involves(id) => {
                    debug!(
                        "Not linking {} to itself: a pair containing the item cannot justify it",
                        item
                    );
                }
                Some(support) => {
                    self.graph.link(support, id);
                    debug!("Merged support [{}, {}] into {}", support.rule, support.fact, item);
                }
                None => {
                    self.graph.mark_asserted(id);
                    debug!("Marked {} as asserted", item);
                }
            }
            return None;
        }

        debug!("Adding {}", item);
        let id = self.graph.insert(item, support.is_none());
        if let Some(support) = support {
            self.graph.link(support, id);
        }

        let pairs: Vec<(FactId, RuleId)> = match id {
            ItemId::Fact(fact) => self.graph.rules().map(|(rule, _)| (fact, *rule)).collect(),
            ItemId::Rule(rule) => self.graph.facts().map(|(fact, _)| (*fact, rule)).collect(),
        };
        Some(Frame {
            pairs: pairs.into_iter(),
        })
    }

    /// Runs one inference step and stores its product.
    fn infer(&mut self, fact_id: FactId, rule_id: RuleId) -> Option<Frame> {
        let (Some(fact), Some(rule)) = (self.graph.fact(&fact_id), self.graph.rule(&rule_id))
        else {
            return None;
        };
        self.stats.inference_attempts += 1;

        let derivation = self.engine.fc_infer(fact.value(), rule.value())?;
        self.stats.inferences += 1;

        let derived_fact = matches!(derivation.item, Item::Fact(_));
        let support = Support {
            rule: rule_id,
            fact: fact_id,
        };
        let frame = self.add(derivation.item, Some(support))?;
        if derived_fact {
            self.stats.derived_facts += 1;
        } else {
            self.stats.derived_rules += 1;
        }
        Some(frame)
    }

    /// Retracts a fact or rule.
    ///
    /// Resolves `item` to its stored twin. An item that is both asserted
    /// and derived only loses its asserted flag. Otherwise the flag is
    /// cleared, every justification the item takes part in is withdrawn,
    /// anything left neither asserted nor derived is removed in turn, and
    /// the item itself is removed once nothing justifies it.
    ///
    /// # Errors
    ///
    /// With `KbConfig::strict_retract`, an item that is not stored yields
    /// `Error::NotFound`. Otherwise that case returns
    /// `Ok(Retraction::NotFound)` and changes nothing.
    pub fn retract(&mut self, item: &Item) -> Result<Retraction> {
        debug!("Retracting {}", item);
        let outcome = self.graph.retract(item.id());

        match &outcome {
            Retraction::NotFound => {
                warn!("Cannot retract {}: not in the knowledge base", item);
                if self.config.strict_retract {
                    return Err(Error::NotFound(item.to_string()));
                }
            }
            Retraction::Demoted => {
                self.stats.retractions += 1;
                self.stats.demotions += 1;
            }
            Retraction::Cascaded { .. } => {
                self.stats.retractions += 1;
                self.stats.removals += outcome.removed_count();
                debug!("Retraction of {} removed {} item(s)", item, outcome.removed_count());
            }
        }

        Ok(outcome)
    }

    /// Shorthand for retracting a fact.
    pub fn retract_fact(&mut self, fact: &Fact) -> Result<Retraction> {
        self.retract(&Item::Fact(fact.clone()))
    }

    /// Shorthand for retracting a rule.
    pub fn retract_rule(&mut self, rule: &Rule) -> Result<Retraction> {
        self.retract(&Item::Rule(rule.clone()))
    }

    /// Answers a query against the stored facts.
    ///
    /// Only facts can be asked. A rule query is reported with a warning and
    /// answered with an empty set; see `try_ask` for an error instead.
    pub fn ask(&self, query: &Item) -> BindingSet {
        match query {
            Item::Fact(fact) => self.ask_fact(fact),
            Item::Rule(rule) => {
                warn!("Invalid ask: {} is a rule, only facts can be asked", rule);
                BindingSet::new()
            }
        }
    }

    /// Like `ask`, but a rule query is an `Error::InvalidQuery`.
    pub fn try_ask(&self, query: &Item) -> Result<BindingSet> {
        match query {
            Item::Fact(fact) => Ok(self.ask_fact(fact)),
            Item::Rule(rule) => Err(Error::InvalidQuery(rule.to_string())),
        }
    }

    /// Matches `query` against every stored fact, in insertion order.
    pub fn ask_fact(&self, query: &Fact) -> BindingSet {
        debug!("Asking {}", query);
        query::scan(query, self.graph.facts())
    }

    /// Returns `true` if a structurally equal fact is stored.
    pub fn contains_fact(&self, fact: &Fact) -> bool {
        self.graph.contains(ItemId::Fact(fact.id()))
    }

    /// Returns `true` if a structurally equal rule is stored.
    ///
    /// Rules are never answered through `ask`; this is their membership test.
    pub fn contains_rule(&self, rule: &Rule) -> bool {
        self.graph.contains(ItemId::Rule(rule.id()))
    }

    /// The stored twin of `fact`, with its bookkeeping.
    pub fn get_fact(&self, fact: &Fact) -> Option<&FactEntry> {
        self.graph.fact(&fact.id())
    }

    /// The stored twin of `rule`, with its bookkeeping.
    pub fn get_rule(&self, rule: &Rule) -> Option<&RuleEntry> {
        self.graph.rule(&rule.id())
    }

    /// Looks up a stored fact by id.
    pub fn fact_entry(&self, id: &FactId) -> Option<&FactEntry> {
        self.graph.fact(id)
    }

    /// Looks up a stored rule by id.
    pub fn rule_entry(&self, id: &RuleId) -> Option<&RuleEntry> {
        self.graph.rule(id)
    }

    /// Stored facts in insertion order.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.graph.facts().map(|(_, entry)| entry.value())
    }

    /// Stored rules in insertion order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.graph.rules().map(|(_, entry)| entry.value())
    }

    /// Number of stored facts.
    pub fn fact_count(&self) -> usize {
        self.graph.fact_count()
    }

    /// Number of stored rules.
    pub fn rule_count(&self) -> usize {
        self.graph.rule_count()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.fact_count() == 0 && self.rule_count() == 0
    }

    /// Read-only access to the justification graph.
    pub fn graph(&self) -> &JustificationGraph {
        &self.graph
    }

    /// Builds the justification tree of a stored item.
    pub fn explain(&self, id: ItemId) -> Option<Justification> {
        Justification::build(&self.graph, id)
    }

    /// Builds the justification tree of the stored twin of `fact`.
    pub fn explain_fact(&self, fact: &Fact) -> Option<Justification> {
        self.explain(ItemId::Fact(fact.id()))
    }

    /// Builds the justification tree of the stored twin of `item`.
    pub fn explain_item(&self, item: &Item) -> Option<Justification> {
        self.explain(item.id())
    }

    /// Retrieves a snapshot of the operation counters.
    pub fn stats(&self) -> KbStats {
        self.stats.clone()
    }

    /// Resets all counters to zero.
    pub fn clear_stats(&mut self) {
        self.stats = KbStats::default();
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Knowledge Base:")?;
        for fact in self.facts() {
            writeln!(f, "fact: {}", fact)?;
        }
        for rule in self.rules() {
            writeln!(f, "rule: {}", rule)?;
        }
        Ok(())
    }
}
