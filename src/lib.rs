pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod observability;
pub mod policy;
pub mod rules;

pub use config::Config;
pub use domain::{Decision, Evaluation, TraceEntry, Transaction};
pub use engine::{evaluate, PolicyEngine};
pub use rules::{compile_ruleset, CompileError, EvalError, Rule, RuleSet};
