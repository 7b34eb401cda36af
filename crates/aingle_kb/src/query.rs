//! Pattern queries against stored facts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

use crate::error::Result;
use crate::rule::Fact;
use crate::tms::{FactEntry, FactId};
use crate::unify::{match_statements, Bindings};

/// One way of answering a query: the bindings and the facts that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Values of the query's variables.
    pub bindings: Bindings,
    /// The stored facts the bindings came from.
    pub facts: Vec<FactId>,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bindings)
    }
}

/// Ordered answers to one query, in fact-scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingSet {
    answers: Vec<Answer>,
}

impl BindingSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an answer.
    pub fn add(&mut self, bindings: Bindings, facts: Vec<FactId>) {
        self.answers.push(Answer { bindings, facts });
    }

    /// Number of answers.
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Returns `true` if the query had no answer.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Answer at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index)
    }

    /// Iterates the answers in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Answer> {
        self.answers.iter()
    }

    /// Serializes the answers to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Index<usize> for BindingSet {
    type Output = Answer;

    fn index(&self, index: usize) -> &Answer {
        &self.answers[index]
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Answer;
    type IntoIter = std::slice::Iter<'a, Answer>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.iter()
    }
}

impl fmt::Display for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, answer) in self.answers.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", answer)?;
        }
        Ok(())
    }
}

/// Matches `query` against every fact yielded by `facts`, keeping scan order.
pub(crate) fn scan<'a, I>(query: &Fact, facts: I) -> BindingSet
where
    I: IntoIterator<Item = (&'a FactId, &'a FactEntry)>,
{
    let mut result = BindingSet::new();
    for (id, entry) in facts {
        if let Some(bindings) = match_statements(&query.statement, &entry.value().statement) {
            result.add(bindings, vec![*id]);
        }
    }
    result
}
