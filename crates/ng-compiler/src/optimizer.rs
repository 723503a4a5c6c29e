use std::collections::HashSet;

use crate::parser::{CompiledEntry, EntryAction, RuleKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
    pub removal_entries: usize,
    pub removed_entries: usize,
}

/// Drop duplicate entries and additions cancelled by an `@@` removal.
///
/// Removal entries are kept so the builder can also apply them to the
/// base table. First-occurrence order is preserved.
pub fn optimize_entries(entries: &mut Vec<CompiledEntry>) -> OptimizeStats {
    let before = entries.len();

    let removals: HashSet<RuleKind> = entries
        .iter()
        .filter(|e| e.action == EntryAction::Remove)
        .map(|e| e.rule.clone())
        .collect();
    let removal_entries = entries
        .iter()
        .filter(|e| e.action == EntryAction::Remove)
        .count();

    let mut removed_entries = 0usize;
    if !removals.is_empty() {
        entries.retain(|e| {
            if e.action == EntryAction::Add && removals.contains(&e.rule) {
                removed_entries += 1;
                return false;
            }
            true
        });
    }

    let mut seen: HashSet<(EntryAction, RuleKind)> = HashSet::new();
    let mut deduped = 0usize;
    entries.retain(|e| {
        if seen.insert((e.action, e.rule.clone())) {
            true
        } else {
            deduped += 1;
            false
        }
    });

    let after = entries.len();
    log::debug!(
        "optimized rule entries: {before} -> {after} (deduped {deduped}, removed {removed_entries})"
    );

    OptimizeStats {
        before,
        after,
        deduped,
        removal_entries,
        removed_entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rule_list;

    #[test]
    fn dedupes_keeping_first() {
        let mut entries = parse_rule_list("domain t.me\ndomain vk.com\ndomain T.ME\n").unwrap();
        let stats = optimize_entries(&mut entries);
        assert_eq!(stats.before, 3);
        assert_eq!(stats.after, 2);
        assert_eq!(stats.deduped, 1);
        assert_eq!(entries[0].rule, RuleKind::Domain("t.me".into()));
        assert_eq!(entries[1].rule, RuleKind::Domain("vk.com".into()));
    }

    #[test]
    fn removal_cancels_additions() {
        let mut entries =
            parse_rule_list("fail-title redirect\n@@fail-title redirect\nfail-url gmetrck\n@@fail-title redirect\n")
                .unwrap();
        let stats = optimize_entries(&mut entries);
        assert_eq!(stats.removal_entries, 2);
        assert_eq!(stats.removed_entries, 1);
        assert_eq!(stats.deduped, 1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, EntryAction::Remove);
        assert_eq!(entries[1].rule, RuleKind::FailUrl("gmetrck".into()));
    }
}
