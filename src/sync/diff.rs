//! Record differ.
//!
//! Decides, per record, whether the target needs a create, an update, a
//! delete, or nothing. Equivalence ignores the store's bookkeeping fields.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use super::types::{Action, ClassifyOptions, SyncOptions};
use crate::model::{Record, BOOKKEEPING_FIELDS};

/// Fields excluded from equivalence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreSet(BTreeSet<String>);

impl IgnoreSet {
    /// Ignore nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Also ignore `field`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into());
        self
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self(BOOKKEEPING_FIELDS.iter().map(|f| (*f).to_string()).collect())
    }
}

/// Whether `a` and `b` hold the same fields and values outside `ignore`.
#[must_use]
pub fn equivalent(a: &Record, b: &Record, ignore: &IgnoreSet) -> bool {
    let relevant = |r: &Record| r.keys().filter(|k| !ignore.contains(k)).count();
    relevant(a) == relevant(b)
        && a.iter()
            .filter(|(k, _)| !ignore.contains(k))
            .all(|(k, v)| b.get(k) == Some(v))
}

/// Classify one source record against its target counterpart.
#[must_use]
pub fn classify(source: &Record, target: Option<&Record>, options: ClassifyOptions) -> Action {
    let target = if source.id().is_some() { target } else { None };

    match target {
        None if options.write_missing => Action::Create(source.clone()),
        None => Action::Skip { id: source.id() },
        Some(target) if equivalent(source, target, &IgnoreSet::default()) => {
            Action::Skip { id: source.id() }
        }
        Some(target) if options.write_differing => Action::Update {
            record: source.clone(),
            version: target.version(),
        },
        Some(_) => Action::Skip { id: source.id() },
    }
}

/// The actions a sync run will take.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub actions: Vec<Action>,
    /// Live target-only records left in place.
    pub extra: usize,
}

impl SyncPlan {
    /// Number of actions that write.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.actions.iter().filter(|a| a.is_write()).count()
    }
}

/// Plan a sync of `source` onto `target`.
///
/// Soft-deleted source records are treated as absent. A live source record
/// whose target counterpart is soft-deleted is skipped: the store refuses to
/// write tombstones. Target-only records are examined only when
/// `scan_for_extra` or `delete_extra` is set, and tombstones never count.
#[must_use]
pub fn plan_sync(source: &[Record], target: &[Record], options: &SyncOptions) -> SyncPlan {
    let by_id: HashMap<String, &Record> = target
        .iter()
        .filter_map(|r| r.id().map(|id| (id, r)))
        .collect();

    let live_source: Vec<&Record> = source.iter().filter(|r| !r.is_deleted()).collect();
    let mut plan = SyncPlan::default();

    for record in &live_source {
        let counterpart = record.id().and_then(|id| by_id.get(&id).copied());
        if let Some(tombstone) = counterpart.filter(|t| t.is_deleted()) {
            warn!(id = ?tombstone.id(), "target record is deleted, skipping");
            plan.actions.push(Action::Skip { id: record.id() });
            continue;
        }
        plan.actions
            .push(classify(record, counterpart, options.classify_options()));
    }

    if options.delete_extra || options.scan_for_extra {
        let source_ids: HashSet<String> = live_source.iter().filter_map(|r| r.id()).collect();
        for record in target.iter().filter(|r| !r.is_deleted()) {
            let Some(id) = record.id() else { continue };
            if source_ids.contains(&id) {
                continue;
            }
            if options.delete_extra {
                plan.actions.push(Action::Delete {
                    id,
                    version: record.version(),
                });
            } else {
                plan.extra += 1;
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::types::ActionKind;
    use serde_json::json;

    fn rec(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    fn kinds(plan: &SyncPlan) -> Vec<ActionKind> {
        plan.actions.iter().map(Action::kind).collect()
    }

    #[test]
    fn test_equivalent_is_symmetric_and_reflexive() {
        let samples = [
            rec(json!({"id": "1", "name": "A"})),
            rec(json!({"id": "1", "name": "A", "_version": 3})),
            rec(json!({"id": "1", "name": "B", "updatedAt": "x"})),
            rec(json!({"id": "1"})),
            rec(json!({})),
        ];
        let ignores = [IgnoreSet::default(), IgnoreSet::empty(), IgnoreSet::empty().with("name")];

        for ignore in &ignores {
            for a in &samples {
                assert!(equivalent(a, a, ignore));
                for b in &samples {
                    assert_eq!(equivalent(a, b, ignore), equivalent(b, a, ignore));
                }
            }
        }
    }

    #[test]
    fn test_bookkeeping_is_ignored_by_default() {
        let a = rec(json!({"id": "1", "name": "A"}));
        let b = rec(json!({"id": "1", "name": "A", "_version": 3, "_lastChangedAt": 5}));
        assert!(equivalent(&a, &b, &IgnoreSet::default()));
        assert!(!equivalent(&a, &b, &IgnoreSet::empty()));
    }

    #[test]
    fn test_null_is_not_absent() {
        let a = rec(json!({"id": "1", "note": null}));
        let b = rec(json!({"id": "1"}));
        assert!(!equivalent(&a, &b, &IgnoreSet::default()));
    }

    #[test]
    fn test_classify_skip_when_equivalent() {
        let source = rec(json!({"id": "1", "name": "A"}));
        let target = rec(json!({"id": "1", "name": "A", "_version": 3}));
        let action = classify(&source, Some(&target), ClassifyOptions::default());
        assert_eq!(action, Action::Skip { id: Some("1".into()) });
    }

    #[test]
    fn test_classify_update_carries_target_version() {
        let source = rec(json!({"id": "1", "name": "A2"}));
        let target = rec(json!({"id": "1", "name": "A", "_version": 3}));
        match classify(&source, Some(&target), ClassifyOptions::default()) {
            Action::Update { record, version } => {
                assert_eq!(record, source);
                assert_eq!(version, Some(3));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_classify_gates() {
        let source = rec(json!({"id": "1", "name": "A2"}));
        let target = rec(json!({"id": "1", "name": "A", "_version": 3}));
        let no_updates = ClassifyOptions {
            write_missing: true,
            write_differing: false,
        };
        assert_eq!(classify(&source, Some(&target), no_updates).kind(), ActionKind::Skip);

        let no_creates = ClassifyOptions {
            write_missing: false,
            write_differing: true,
        };
        assert_eq!(classify(&source, None, no_creates).kind(), ActionKind::Skip);
    }

    #[test]
    fn test_record_without_id_is_always_create() {
        let source = rec(json!({"name": "A"}));
        let target = rec(json!({"name": "A"}));
        let action = classify(&source, Some(&target), ClassifyOptions::default());
        assert_eq!(action.kind(), ActionKind::Create);
    }

    #[test]
    fn test_plan_creates_into_empty_target() {
        let source = vec![rec(json!({"id": "1", "name": "A"})), rec(json!({"id": "2", "name": "B"}))];
        let plan = plan_sync(&source, &[], &SyncOptions::default());
        assert_eq!(kinds(&plan), vec![ActionKind::Create, ActionKind::Create]);
    }

    #[test]
    fn test_plan_extra_records() {
        let source = vec![rec(json!({"id": "1", "name": "A"}))];
        let target = vec![
            rec(json!({"id": "1", "name": "A", "_version": 1})),
            rec(json!({"id": "9", "name": "Z", "_version": 4})),
            rec(json!({"id": "8", "name": "Y", "_version": 2, "_deleted": true})),
        ];

        let deleting = SyncOptions {
            delete_extra: true,
            ..SyncOptions::default()
        };
        let plan = plan_sync(&source, &target, &deleting);
        assert_eq!(kinds(&plan), vec![ActionKind::Skip, ActionKind::Delete]);
        assert_eq!(
            plan.actions[1],
            Action::Delete {
                id: "9".into(),
                version: Some(4)
            }
        );

        let plan = plan_sync(&source, &target, &SyncOptions::default());
        assert_eq!(kinds(&plan), vec![ActionKind::Skip]);
        assert_eq!(plan.extra, 1);

        let not_scanning = SyncOptions {
            scan_for_extra: false,
            ..SyncOptions::default()
        };
        let plan = plan_sync(&source, &target, &not_scanning);
        assert_eq!(plan.extra, 0);
    }

    #[test]
    fn test_plan_ignores_deleted_source_records() {
        let source = vec![rec(json!({"id": "1", "name": "A", "_deleted": true}))];
        let target = vec![rec(json!({"id": "1", "name": "old", "_version": 2}))];
        let options = SyncOptions {
            delete_extra: true,
            ..SyncOptions::default()
        };

        let plan = plan_sync(&source, &target, &options);
        assert_eq!(kinds(&plan), vec![ActionKind::Delete]);
    }

    #[test]
    fn test_plan_skips_deleted_target_counterpart() {
        let source = vec![rec(json!({"id": "1", "name": "A"}))];
        let target = vec![rec(json!({"id": "1", "name": "A0", "_version": 2, "_deleted": true}))];
        let plan = plan_sync(&source, &target, &SyncOptions::default());
        assert_eq!(kinds(&plan), vec![ActionKind::Skip]);
        assert_eq!(plan.writes(), 0);
    }
}
