//! Justification trees
//!
//! A `Justification` is a read-only snapshot of why an item is believed:
//! whether it was asserted, and for each `[rule, fact]` pair that derived
//! it, the justifications of the rule and the fact in turn. Leaves are
//! items that were asserted and never derived.
//!
//! Trees are built on demand from the justification graph and do not
//! track later changes to the knowledge base.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::rule::Item;
use crate::tms::{ItemId, JustificationGraph};

/// Why an item is believed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    /// The justified item.
    pub item: Item,
    /// Whether the item was told to the knowledge base directly.
    pub asserted: bool,
    /// One entry per pair that derived the item, in the order the pairs
    /// were recorded.
    pub options: Vec<SupportOption>,
}

/// One alternative derivation: a rule and the fact that matched its first
/// antecedent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportOption {
    /// Justification of the rule.
    pub rule: Box<Justification>,
    /// Justification of the fact.
    pub fact: Box<Justification>,
}

impl Justification {
    /// Builds the justification tree of a stored item.
    ///
    /// Returns `None` if `id` is not stored. A support chain that leads
    /// back to an item already on the current path is cut there: the
    /// repeated item appears without options.
    pub fn build(graph: &JustificationGraph, id: ItemId) -> Option<Self> {
        let mut path = Vec::new();
        Self::build_on_path(graph, id, &mut path)
    }

    fn build_on_path(
        graph: &JustificationGraph,
        id: ItemId,
        path: &mut Vec<ItemId>,
    ) -> Option<Self> {
        let (item, node) = match id {
            ItemId::Fact(fact) => {
                let entry = graph.fact(&fact)?;
                (Item::Fact(entry.value().clone()), entry.node())
            }
            ItemId::Rule(rule) => {
                let entry = graph.rule(&rule)?;
                (Item::Rule(entry.value().clone()), entry.node())
            }
        };

        let mut justification = Self {
            item,
            asserted: node.is_asserted(),
            options: Vec::new(),
        };
        if path.contains(&id) {
            return Some(justification);
        }

        path.push(id);
        for support in node.supported_by() {
            let rule = Self::build_on_path(graph, ItemId::Rule(support.rule), path);
            let fact = Self::build_on_path(graph, ItemId::Fact(support.fact), path);
            if let (Some(rule), Some(fact)) = (rule, fact) {
                justification.options.push(SupportOption {
                    rule: Box::new(rule),
                    fact: Box::new(fact),
                });
            }
        }
        path.pop();

        Some(justification)
    }

    /// Returns `true` if the item has no derivation to show.
    pub fn is_leaf(&self) -> bool {
        self.options.is_empty()
    }

    /// Length of the longest derivation chain below this item; 0 for a leaf.
    pub fn depth(&self) -> usize {
        self.options
            .iter()
            .map(|o| 1 + o.rule.depth().max(o.fact.depth()))
            .max()
            .unwrap_or(0)
    }

    /// The asserted items the tree bottoms out in, deduplicated, in the
    /// order they are first reached.
    pub fn premises(&self) -> Vec<&Item> {
        let mut out = Vec::new();
        self.collect_premises(&mut out);
        out
    }

    fn collect_premises<'a>(&'a self, out: &mut Vec<&'a Item>) {
        if self.asserted && !out.contains(&&self.item) {
            out.push(&self.item);
        }
        for option in &self.options {
            option.rule.collect_premises(out);
            option.fact.collect_premises(out);
        }
    }

    /// Serializes the tree to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a tree from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:indent$}Support for {}", "", self.item, indent = indent)?;
        if self.asserted {
            f.write_str(" [asserted]")?;
        }
        f.write_str("\n")?;
        for option in &self.options {
            writeln!(f, "{:indent$}support option", "", indent = indent + 2)?;
            option.rule.write_indented(f, indent + 4)?;
            option.fact.write_indented(f, indent + 4)?;
        }
        Ok(())
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
