//! navgate Rule List Compiler
//!
//! This crate compiles plain-text rule lists into the [`ng_core::GateRules`]
//! tables the gate consults.

pub mod parser;
pub mod optimizer;
pub mod builder;

pub use builder::{build_rules, compile_rule_lists, Base, CompileError, CompileStats, ListStats};
pub use optimizer::{optimize_entries, OptimizeStats};
pub use parser::{parse_rule_list, CompiledEntry, EntryAction, ParseError, RuleKind};
