//! Truth maintenance: the justification graph
//!
//! Every stored fact and rule owns a `TmsNode` recording whether it was
//! asserted directly, which `[rule, fact]` pairs derived it
//! (`supported_by`), and which items it helped derive (`supports_facts`,
//! `supports_rules`). Items live in two insertion-ordered arenas keyed by
//! content-addressed ids; every cross reference is an id, never a pointer.
//!
//! Invariants kept by every operation in this module:
//!
//! - an item is stored iff it is asserted or has at least one support pair;
//! - `X` occurs in a pair of `Y.supported_by` iff `Y` is in
//!   `X.supports_facts` or `X.supports_rules`.

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::rule::{Fact, Item, Rule};
use crate::term::Statement;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Returns the raw 32-byte digest.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Returns the full digest as lowercase hex.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parses an id from its hex form.
            pub fn from_hex(s: &str) -> Option<Self> {
                let bytes = hex::decode(s).ok()?;
                let arr: [u8; 32] = bytes.try_into().ok()?;
                Some(Self(arr))
            }
        }

        impl fmt::Display for $name {
            /// Short form, enough to tell items apart in logs.
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, hex::encode(&self.0[..6]))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..6]))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid {} {:?}", stringify!($name), s)))
            }
        }
    };
}

content_id!(
    /// Content-addressed id of a fact: structurally equal facts share it.
    FactId,
    "fact"
);

content_id!(
    /// Content-addressed id of a rule: structurally equal rules share it.
    RuleId,
    "rule"
);

impl FactId {
    /// Computes the id of the fact asserting `statement`.
    pub fn of(statement: &Statement) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"aingle_kb/fact");
        statement.hash_into(&mut hasher);
        Self(*hasher.finalize().as_bytes())
    }
}

impl RuleId {
    /// Computes the id of the rule `lhs -> rhs`.
    pub fn of(lhs: &[Statement], rhs: &Statement) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"aingle_kb/rule");
        hasher.update(&(lhs.len() as u64).to_le_bytes());
        for antecedent in lhs {
            antecedent.hash_into(&mut hasher);
        }
        rhs.hash_into(&mut hasher);
        Self(*hasher.finalize().as_bytes())
    }
}

/// Handle to either kind of stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemId {
    /// A fact handle.
    Fact(FactId),
    /// A rule handle.
    Rule(RuleId),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Fact(id) => write!(f, "{}", id),
            ItemId::Rule(id) => write!(f, "{}", id),
        }
    }
}

/// One justification: the rule and the fact whose conjunction derived an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Support {
    /// The rule whose first antecedent was consumed.
    pub rule: RuleId,
    /// The fact that matched it.
    pub fact: FactId,
}

impl Support {
    /// Returns `true` if `id` is either member of the pair.
    pub fn involves(&self, id: ItemId) -> bool {
        match id {
            ItemId::Fact(fact) => self.fact == fact,
            ItemId::Rule(rule) => self.rule == rule,
        }
    }
}

/// Truth-maintenance bookkeeping for one stored item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmsNode {
    asserted: bool,
    supported_by: IndexSet<Support>,
    supports_facts: IndexSet<FactId>,
    supports_rules: IndexSet<RuleId>,
}

impl TmsNode {
    fn new(asserted: bool) -> Self {
        Self {
            asserted,
            ..Self::default()
        }
    }

    /// Whether the item was told to the knowledge base directly.
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// The pairs that currently justify the item.
    pub fn supported_by(&self) -> impl ExactSizeIterator<Item = &Support> {
        self.supported_by.iter()
    }

    /// Facts this item helped derive.
    pub fn supports_facts(&self) -> impl ExactSizeIterator<Item = &FactId> {
        self.supports_facts.iter()
    }

    /// Rules this item helped derive.
    pub fn supports_rules(&self) -> impl ExactSizeIterator<Item = &RuleId> {
        self.supports_rules.iter()
    }

    /// Returns `true` if some pair still justifies the item.
    pub fn is_derived(&self) -> bool {
        !self.supported_by.is_empty()
    }

    /// The keep-invariant: asserted, or derived.
    pub fn is_believed(&self) -> bool {
        self.asserted || self.is_derived()
    }

    fn add_dependent(&mut self, id: ItemId) {
        match id {
            ItemId::Fact(fact) => self.supports_facts.insert(fact),
            ItemId::Rule(rule) => self.supports_rules.insert(rule),
        };
    }

    fn remove_dependent(&mut self, id: ItemId) {
        match id {
            ItemId::Fact(fact) => self.supports_facts.shift_remove(&fact),
            ItemId::Rule(rule) => self.supports_rules.shift_remove(&rule),
        };
    }

    fn take_dependents(&mut self) -> Vec<ItemId> {
        let facts = std::mem::take(&mut self.supports_facts);
        let rules = std::mem::take(&mut self.supports_rules);
        facts
            .into_iter()
            .map(ItemId::Fact)
            .chain(rules.into_iter().map(ItemId::Rule))
            .collect()
    }
}

/// A stored value together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<T> {
    value: T,
    node: TmsNode,
}

impl<T> Entry<T> {
    /// The stored fact or rule.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Its truth-maintenance node.
    pub fn node(&self) -> &TmsNode {
        &self.node
    }

    /// Shorthand for `self.node().is_asserted()`.
    pub fn is_asserted(&self) -> bool {
        self.node.asserted
    }
}

/// Read-only view of a stored fact.
pub type FactEntry = Entry<Fact>;

/// Read-only view of a stored rule.
pub type RuleEntry = Entry<Rule>;

/// What a retraction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Retraction {
    /// Nothing structurally equal was stored; nothing changed.
    NotFound,
    /// The item was asserted and also derived: only the asserted flag was
    /// cleared, and the item stays as a purely derived one.
    Demoted,
    /// Support edges were withdrawn and everything left unjustified was
    /// removed, in removal order. The retracted item itself is listed only
    /// if it was removed.
    Cascaded {
        /// Facts removed from the knowledge base.
        removed_facts: Vec<Fact>,
        /// Rules removed from the knowledge base.
        removed_rules: Vec<Rule>,
    },
}

impl Retraction {
    /// Number of items removed.
    pub fn removed_count(&self) -> usize {
        match self {
            Retraction::Cascaded {
                removed_facts,
                removed_rules,
            } => removed_facts.len() + removed_rules.len(),
            _ => 0,
        }
    }
}

/// The two arenas and the edges between their items.
#[derive(Debug, Clone, Default)]
pub struct JustificationGraph {
    facts: IndexMap<FactId, FactEntry>,
    rules: IndexMap<RuleId, RuleEntry>,
}

impl JustificationGraph {
    /// Creates an empty graph with room for the given number of items.
    pub fn with_capacity(facts: usize, rules: usize) -> Self {
        Self {
            facts: IndexMap::with_capacity(facts),
            rules: IndexMap::with_capacity(rules),
        }
    }

    /// Looks up a stored fact.
    pub fn fact(&self, id: &FactId) -> Option<&FactEntry> {
        self.facts.get(id)
    }

    /// Looks up a stored rule.
    pub fn rule(&self, id: &RuleId) -> Option<&RuleEntry> {
        self.rules.get(id)
    }

    /// Looks up the node of either kind of item.
    pub fn node(&self, id: ItemId) -> Option<&TmsNode> {
        match id {
            ItemId::Fact(fact) => self.facts.get(&fact).map(|e| &e.node),
            ItemId::Rule(rule) => self.rules.get(&rule).map(|e| &e.node),
        }
    }

    fn node_mut(&mut self, id: ItemId) -> Option<&mut TmsNode> {
        match id {
            ItemId::Fact(fact) => self.facts.get_mut(&fact).map(|e| &mut e.node),
            ItemId::Rule(rule) => self.rules.get_mut(&rule).map(|e| &mut e.node),
        }
    }

    /// Returns `true` if an item with this id is stored.
    pub fn contains(&self, id: ItemId) -> bool {
        match id {
            ItemId::Fact(fact) => self.facts.contains_key(&fact),
            ItemId::Rule(rule) => self.rules.contains_key(&rule),
        }
    }

    /// Stored facts in insertion order.
    pub fn facts(&self) -> impl ExactSizeIterator<Item = (&FactId, &FactEntry)> {
        self.facts.iter()
    }

    /// Stored rules in insertion order.
    pub fn rules(&self) -> impl ExactSizeIterator<Item = (&RuleId, &RuleEntry)> {
        self.rules.iter()
    }

    /// Number of stored facts.
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of stored rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Stores a new item under its content id and returns that id.
    ///
    /// The caller checks `contains` first; inserting a stored id again
    /// would reset its bookkeeping.
    pub(crate) fn insert(&mut self, item: Item, asserted: bool) -> ItemId {
        let node = TmsNode::new(asserted);
        match item {
            Item::Fact(value) => {
                let id = value.id();
                self.facts.insert(id, Entry { value, node });
                ItemId::Fact(id)
            }
            Item::Rule(value) => {
                let id = value.id();
                self.rules.insert(id, Entry { value, node });
                ItemId::Rule(id)
            }
        }
    }

    /// Marks a stored item as asserted. Returns `false` if it is not stored.
    pub(crate) fn mark_asserted(&mut self, id: ItemId) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.asserted = true;
                true
            }
            None => false,
        }
    }

    /// Records that `support` justifies `derived` and adds the matching
    /// back-edges on both members of the pair.
    ///
    /// Re-linking an existing pair is a no-op. Returns `false` if any of
    /// the three items is not stored.
    pub(crate) fn link(&mut self, support: Support, derived: ItemId) -> bool {
        if !self.facts.contains_key(&support.fact) || !self.rules.contains_key(&support.rule) {
            return false;
        }
        match self.node_mut(derived) {
            Some(node) => {
                node.supported_by.insert(support);
            }
            None => return false,
        }
        if let Some(fact) = self.facts.get_mut(&support.fact) {
            fact.node.add_dependent(derived);
        }
        if let Some(rule) = self.rules.get_mut(&support.rule) {
            rule.node.add_dependent(derived);
        }
        trace!("linked {} <- [{}, {}]", derived, support.rule, support.fact);
        true
    }

    /// Retracts a stored item and cascades through its dependents.
    ///
    /// An asserted item that is also derived only loses its asserted flag.
    /// Otherwise the flag is cleared, every pair referencing the item is
    /// withdrawn from its dependents, and any dependent left neither
    /// asserted nor derived is retracted in turn. Finally each processed
    /// item with no remaining support is removed.
    pub(crate) fn retract(&mut self, target: ItemId) -> Retraction {
        let Some(node) = self.node_mut(target) else {
            return Retraction::NotFound;
        };

        if node.asserted && node.is_derived() {
            node.asserted = false;
            debug!("{} demoted to derived-only", target);
            return Retraction::Demoted;
        }
        node.asserted = false;

        let mut removed_facts = Vec::new();
        let mut removed_rules = Vec::new();
        let mut queue = VecDeque::from([target]);
        let mut visited = HashSet::new();
        let mut processed = Vec::new();

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let dependents = match self.node_mut(id) {
                Some(node) => node.take_dependents(),
                None => continue,
            };
            processed.push(id);

            for dependent in dependents {
                if self.detach(dependent, id) && !visited.contains(&dependent) {
                    queue.push_back(dependent);
                }
            }
        }

        // A support cycle can orphan an item after it was processed, so
        // belief is checked only once every edge has been withdrawn.
        for id in processed {
            if self.node(id).is_some_and(|node| !node.is_believed()) {
                match id {
                    ItemId::Fact(fact) => {
                        if let Some(entry) = self.facts.shift_remove(&fact) {
                            debug!("removed fact {}", entry.value);
                            removed_facts.push(entry.value);
                        }
                    }
                    ItemId::Rule(rule) => {
                        if let Some(entry) = self.rules.shift_remove(&rule) {
                            debug!("removed rule {}", entry.value);
                            removed_rules.push(entry.value);
                        }
                    }
                }
            }
        }

        Retraction::Cascaded {
            removed_facts,
            removed_rules,
        }
    }

    /// Withdraws every pair of `dependent` that references `supporter`.
    ///
    /// The other member of each withdrawn pair drops its back-edge to
    /// `dependent` unless another pair still connects them. Returns `true`
    /// if `dependent` is left neither asserted nor derived.
    fn detach(&mut self, dependent: ItemId, supporter: ItemId) -> bool {
        let Some(node) = self.node_mut(dependent) else {
            return false;
        };

        let withdrawn: Vec<Support> = node
            .supported_by
            .iter()
            .filter(|s| s.involves(supporter))
            .copied()
            .collect();
        node.supported_by.retain(|s| !s.involves(supporter));

        let partners: Vec<ItemId> = withdrawn
            .iter()
            .map(|s| match supporter {
                ItemId::Fact(_) => ItemId::Rule(s.rule),
                ItemId::Rule(_) => ItemId::Fact(s.fact),
            })
            .filter(|partner| !node.supported_by.iter().any(|s| s.involves(*partner)))
            .collect();
        let orphaned = !node.is_believed();

        for partner in partners {
            if let Some(partner_node) = self.node_mut(partner) {
                partner_node.remove_dependent(dependent);
            }
        }

        trace!(
            "detached {} from {} ({} pair(s) withdrawn)",
            dependent,
            supporter,
            withdrawn.len()
        );
        orphaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(tokens: &[&str]) -> (ItemId, Item) {
        let fact = Fact::from_tokens(tokens.iter().copied());
        (ItemId::Fact(fact.id()), Item::Fact(fact))
    }

    fn rule(lhs: &[&[&str]], rhs: &[&str]) -> (ItemId, Item) {
        let rule = Rule::new(
            lhs.iter()
                .map(|s| Statement::from_tokens(s.iter().copied()))
                .collect(),
            Statement::from_tokens(rhs.iter().copied()),
        )
        .unwrap();
        (ItemId::Rule(rule.id()), Item::Rule(rule))
    }

    fn support(rule: ItemId, fact: ItemId) -> Support {
        match (rule, fact) {
            (ItemId::Rule(rule), ItemId::Fact(fact)) => Support { rule, fact },
            _ => panic!("support needs a rule and a fact"),
        }
    }

    /// Checks the inverse-edge invariant over the whole graph.
    fn assert_edges_consistent(graph: &JustificationGraph) {
        let items: Vec<(ItemId, &TmsNode)> = graph
            .facts()
            .map(|(id, e)| (ItemId::Fact(*id), e.node()))
            .chain(graph.rules().map(|(id, e)| (ItemId::Rule(*id), e.node())))
            .collect();

        for (id, node) in &items {
            assert!(node.is_believed(), "{} kept without belief", id);
            for s in node.supported_by() {
                for member in [ItemId::Fact(s.fact), ItemId::Rule(s.rule)] {
                    let back = graph.node(member).expect("supporter stored");
                    let listed = match id {
                        ItemId::Fact(f) => back.supports_facts().any(|x| x == f),
                        ItemId::Rule(r) => back.supports_rules().any(|x| x == r),
                    };
                    assert!(listed, "{} missing back-edge to {}", member, id);
                }
            }
            let dependents = node
                .supports_facts()
                .map(|f| ItemId::Fact(*f))
                .chain(node.supports_rules().map(|r| ItemId::Rule(*r)));
            for dependent in dependents {
                let dep = graph.node(dependent).expect("dependent stored");
                assert!(
                    dep.supported_by().any(|s| s.involves(*id)),
                    "{} lists {} without a pair",
                    id,
                    dependent
                );
            }
        }
    }

    #[test]
    fn test_content_ids_round_trip_through_hex() {
        let (id, _) = fact(&["hero", "A"]);
        let ItemId::Fact(id) = id else { unreachable!() };
        assert_eq!(FactId::from_hex(&id.to_hex()), Some(id));
        assert!(FactId::from_hex("zz").is_none());
    }

    #[test]
    fn test_retract_unsupported_fact_removes_it() {
        let mut graph = JustificationGraph::default();
        let (f, item) = fact(&["hero", "A"]);
        graph.insert(item, true);

        let outcome = graph.retract(f);
        assert_eq!(outcome.removed_count(), 1);
        assert!(!graph.contains(f));
        assert_eq!(graph.retract(f), Retraction::NotFound);
    }

    #[test]
    fn test_retract_asserted_and_derived_only_demotes() {
        let mut graph = JustificationGraph::default();
        let (f, fi) = fact(&["hero", "A"]);
        let (r, ri) = rule(&[&["hero", "?x"]], &["good", "?x"]);
        let (g, gi) = fact(&["good", "A"]);
        graph.insert(fi, true);
        graph.insert(ri, true);
        graph.insert(gi, true);
        assert!(graph.link(support(r, f), g));

        assert_eq!(graph.retract(g), Retraction::Demoted);
        let node = graph.node(g).unwrap();
        assert!(!node.is_asserted());
        assert!(node.is_derived());
        assert_edges_consistent(&graph);
    }

    #[test]
    fn test_cascade_drops_partner_back_edges() {
        let mut graph = JustificationGraph::default();
        let (f, fi) = fact(&["hero", "A"]);
        let (r, ri) = rule(&[&["hero", "?x"]], &["good", "?x"]);
        let (g, gi) = fact(&["good", "A"]);
        graph.insert(fi, true);
        graph.insert(ri, true);
        graph.insert(gi, false);
        graph.link(support(r, f), g);

        graph.retract(f);
        assert!(!graph.contains(g));
        let rule_node = graph.node(r).unwrap();
        assert_eq!(rule_node.supports_facts().len(), 0);
        assert_edges_consistent(&graph);
    }

    #[test]
    fn test_cascade_keeps_asserted_dependent() {
        let mut graph = JustificationGraph::default();
        let (f, fi) = fact(&["hero", "A"]);
        let (r, ri) = rule(&[&["hero", "?x"]], &["good", "?x"]);
        let (g, gi) = fact(&["good", "A"]);
        graph.insert(fi, true);
        graph.insert(ri, true);
        graph.insert(gi, true);
        graph.link(support(r, f), g);

        // the rule has no support, so it is removed; `good A` survives on
        // its own assertion
        let outcome = graph.retract(r);
        assert_eq!(outcome.removed_count(), 1);
        assert!(graph.contains(g));
        assert!(!graph.node(g).unwrap().is_derived());
        assert_edges_consistent(&graph);
    }

    #[test]
    fn test_pair_shared_with_other_support_keeps_back_edge() {
        let mut graph = JustificationGraph::default();
        let (f1, f1i) = fact(&["relaa", "A"]);
        let (f2, f2i) = fact(&["relab", "A"]);
        let (r, ri) = rule(&[&["rel", "?x"]], &["good", "?x"]);
        let (g, gi) = fact(&["good", "A"]);
        graph.insert(f1i, true);
        graph.insert(f2i, true);
        graph.insert(ri, true);
        graph.insert(gi, false);
        graph.link(support(r, f1), g);
        graph.link(support(r, f2), g);

        graph.retract(f1);
        assert!(graph.contains(g));
        // the rule still supports `good A` through the second pair
        assert_eq!(graph.node(r).unwrap().supports_facts().len(), 1);
        assert_edges_consistent(&graph);
    }

    #[test]
    fn test_cycle_member_orphaned_after_processing_is_removed() {
        let mut graph = JustificationGraph::default();
        let (s, si) = fact(&["s", "A"]);
        let (p, pi) = fact(&["p", "A"]);
        let (q, qi) = fact(&["q", "A"]);
        let (r1, r1i) = rule(&[&["s", "?x"]], &["p", "?x"]);
        let (r2, r2i) = rule(&[&["p", "?x"]], &["q", "?x"]);
        let (r3, r3i) = rule(&[&["q", "?x"]], &["p", "?x"]);
        graph.insert(si, true);
        graph.insert(r1i, true);
        graph.insert(r2i, true);
        graph.insert(r3i, true);
        graph.insert(pi, false);
        graph.insert(qi, false);
        graph.link(support(r1, s), p);
        graph.link(support(r2, p), q);
        graph.link(support(r3, q), p);

        // `p` and `q` now only justify each other
        graph.retract(s);
        assert!(graph.contains(p));
        assert_edges_consistent(&graph);

        let outcome = graph.retract(p);
        assert_eq!(outcome.removed_count(), 2);
        assert!(!graph.contains(p));
        assert!(!graph.contains(q));
        assert_edges_consistent(&graph);
    }

    #[test]
    fn test_link_requires_stored_members() {
        let mut graph = JustificationGraph::default();
        let (f, fi) = fact(&["hero", "A"]);
        let (r, _) = rule(&[&["hero", "?x"]], &["good", "?x"]);
        let (g, gi) = fact(&["good", "A"]);
        graph.insert(fi, true);
        graph.insert(gi, true);
        assert!(!graph.link(support(r, f), g));
        assert!(!graph.node(g).unwrap().is_derived());
    }
}
