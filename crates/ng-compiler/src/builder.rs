use ng_core::rules::GateRules;

use crate::optimizer::{optimize_entries, OptimizeStats};
use crate::parser::{parse_rule_list, CompiledEntry, EntryAction, ParseError, RuleKind};

/// Table the compiled entries are applied on top of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Base {
    /// Start from the built-in tables
    #[default]
    Builtin,
    /// Start from empty tables
    Empty,
}

/// Apply entries to a base table. Additions already present are skipped,
/// removals of absent entries are no-ops.
pub fn build_rules(entries: &[CompiledEntry], base: Base) -> GateRules {
    let mut rules = match base {
        Base::Builtin => GateRules::builtin().clone(),
        Base::Empty => GateRules::default(),
    };

    for entry in entries.iter().filter(|e| e.action == EntryAction::Add) {
        add_entry(&mut rules, &entry.rule);
    }
    for entry in entries.iter().filter(|e| e.action == EntryAction::Remove) {
        remove_entry(&mut rules, &entry.rule);
    }

    rules
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn add_entry(rules: &mut GateRules, rule: &RuleKind) {
    match rule {
        RuleKind::Scheme(prefix) => push_unique(&mut rules.scheme_prefixes, prefix),
        RuleKind::Domain(domain) => {
            rules.external_domains.insert(domain.clone());
        }
        RuleKind::CarveOut(carve) => {
            if !rules.carve_outs.contains(carve) {
                rules.carve_outs.push(carve.clone());
            }
        }
        RuleKind::InternalLabel(label) => push_unique(&mut rules.internal_service.labels, label),
        RuleKind::InternalSubstring(s) => push_unique(&mut rules.internal_service.substrings, s),
        RuleKind::FailUrl(signal) => push_unique(&mut rules.failure_url_signals, signal),
        RuleKind::FailTitle(signal) => push_unique(&mut rules.failure_title_signals, signal),
    }
}

fn remove_entry(rules: &mut GateRules, rule: &RuleKind) {
    match rule {
        RuleKind::Scheme(prefix) => rules.scheme_prefixes.retain(|p| p != prefix),
        RuleKind::Domain(domain) => {
            rules.external_domains.remove(domain);
        }
        RuleKind::CarveOut(carve) => rules.carve_outs.retain(|c| c != carve),
        RuleKind::InternalLabel(label) => rules.internal_service.labels.retain(|l| l != label),
        RuleKind::InternalSubstring(s) => rules.internal_service.substrings.retain(|v| v != s),
        RuleKind::FailUrl(signal) => rules.failure_url_signals.retain(|v| v != signal),
        RuleKind::FailTitle(signal) => rules.failure_title_signals.retain(|v| v != signal),
    }
}

/// Entry counts for one input list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStats {
    pub lines: usize,
    pub entries_before: usize,
    pub entries_after: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub totals: OptimizeStats,
    /// Indexed by list position
    pub lists: Vec<ListStats>,
}

/// A parse failure in one of several lists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("list {list}: {source}")]
pub struct CompileError {
    /// Position of the failing list in the input slice
    pub list: usize,
    #[source]
    pub source: ParseError,
}

/// Parse, optimize and build several rule lists in one go.
///
/// Each list's entries are tagged with its index as `list_id`, which the
/// per-list stats are counted by.
pub fn compile_rule_lists(lists: &[&str], base: Base) -> Result<(GateRules, CompileStats), CompileError> {
    let mut all_entries = Vec::new();
    let mut list_stats = Vec::with_capacity(lists.len());

    for (list_id, text) in lists.iter().enumerate() {
        let mut entries = parse_rule_list(text).map_err(|source| CompileError {
            list: list_id,
            source,
        })?;
        for entry in &mut entries {
            entry.list_id = list_id as u16;
        }

        list_stats.push(ListStats {
            lines: text.lines().count(),
            entries_before: entries.len(),
            entries_after: 0,
        });
        all_entries.extend(entries);
    }

    let totals = optimize_entries(&mut all_entries);
    for entry in &all_entries {
        if let Some(stats) = list_stats.get_mut(entry.list_id as usize) {
            stats.entries_after += 1;
        }
    }

    let stats = CompileStats {
        totals,
        lists: list_stats,
    };
    Ok((build_rules(&all_entries, base), stats))
}
