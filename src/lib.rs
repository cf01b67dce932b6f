//! # Inferlog
//!
//! A forward-chaining inference engine with truth maintenance in Rust.
//!
//! ## Features
//!
//! - Assertion-triggered forward chaining over facts and implication rules
//! - Support-graph bookkeeping with cascading retraction
//! - Pattern queries with variable bindings
//!
//! ## Example
//!
//! ```rust
//! use inferlog::{KnowledgeBase, Statement, Term};
//!
//! let mut kb = KnowledgeBase::new();
//! kb.assert_rule(
//!     vec![Statement::new("parent", vec![Term::var("x"), Term::var("y")])],
//!     Statement::new("ancestor", vec![Term::var("x"), Term::var("y")]),
//! );
//! kb.assert_fact(Statement::new(
//!     "parent",
//!     vec![Term::sym("john"), Term::sym("mary")],
//! ));
//!
//! let answers = kb.ask(&Statement::new(
//!     "ancestor",
//!     vec![Term::sym("john"), Term::var("who")],
//! ));
//! assert_eq!(answers.len(), 1);
//! assert_eq!(answers[0].binding.get("who"), Some(&Term::sym("mary")));
//! ```

/// Knowledge base and inference engine.
pub mod engine;
/// Statement/rule text syntax.
#[cfg(feature = "parsing")]
pub mod parse;
/// Term, statement and binding model.
pub mod term;
/// Unification and instantiation.
pub mod unify;

pub use engine::{Answer, Fact, FactId, KnowledgeBase, Rule, RuleId, Support};
#[cfg(feature = "parsing")]
pub use parse::{parse_rule, parse_statement, ParseError};
pub use term::{Binding, Statement, Term};
pub use unify::{instantiate, instantiate_statement, unify};
