//! AIngle KB - Truth-Maintained Deductive Knowledge Base
//!
//! This crate stores facts and if-then rules, derives new facts by forward
//! chaining as soon as anything is asserted, and records for every derived
//! item which `[rule, fact]` pairs justify it. Retracting an item withdraws
//! those justifications and removes whatever is left unsupported.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Knowledge Base                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                 Syntax Front End                      │   │
//! │  │  fact: (p a b) │ rule: ((p ?x) (q ?x)) -> (r ?x)      │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                 Inference Engine                      │   │
//! │  │  Matching │ Instantiation │ Rule Specialization       │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                           │                                  │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                 Justification Graph                   │   │
//! │  │  Support Pairs │ Cascading Retraction │ Explanation   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use aingle_kb::{Fact, KnowledgeBase, Rule, Statement};
//!
//! let mut kb = KnowledgeBase::new();
//! kb.assert(Fact::from_tokens(["hero", "A"]));
//! kb.assert(Fact::from_tokens(["person", "A"]));
//! kb.assert(
//!     Rule::builder()
//!         .when(Statement::from_tokens(["hero", "?x"]))
//!         .when(Statement::from_tokens(["person", "?x"]))
//!         .then(Statement::from_tokens(["goodman", "?x"]))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let answers = kb.ask_fact(&Fact::from_tokens(["goodman", "?who"]));
//! assert_eq!(answers.to_string(), "?who : A");
//!
//! kb.retract_fact(&Fact::from_tokens(["person", "A"])).unwrap();
//! assert!(!kb.contains_fact(&Fact::from_tokens(["goodman", "A"])));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod justification;
pub mod kb;
pub mod query;
pub mod rule;
pub mod syntax;
pub mod term;
pub mod tms;
pub mod unify;

// Re-exports
pub use config::KbConfig;
pub use engine::{Derivation, InferenceEngine, KbStats};
pub use error::{Error, Result};
pub use justification::{Justification, SupportOption};
pub use kb::KnowledgeBase;
pub use query::{Answer, BindingSet};
pub use rule::{Fact, Item, Rule, RuleBuilder};
pub use syntax::{parse_document, parse_item};
pub use term::{Statement, Term};
pub use tms::{
    FactEntry, FactId, ItemId, JustificationGraph, Retraction, RuleEntry, RuleId, Support,
    TmsNode,
};
pub use unify::{instantiate, match_statements, Bindings};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
