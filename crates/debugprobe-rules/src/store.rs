//! `RuleStore<R>` — the ordered rule list shared by the mock, chaos, and
//! breakpoint engines.

use crate::url_match;
use debugprobe_types::{Rule, TargetType};
use parking_lot::RwLock;

/// A priority-ordered, replaceable list of rules of one kind.
///
/// Rules are sorted by descending `priority()`, ties broken by the
/// order they were last installed in (a stable sort over the caller's
/// input order) — highest priority first, ties by declaration order.
pub struct RuleStore<R> {
    rules: RwLock<Vec<R>>,
}

impl<R: Rule + Clone> RuleStore<R> {
    /// An empty rule store.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Replace the entire rule set, re-sorting by priority.
    pub fn replace_all(&self, mut rules: Vec<R>) {
        rules.sort_by(|a, b| b.priority().cmp(&a.priority()));
        *self.rules.write() = rules;
    }

    /// Current rule count.
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// A clone of every rule currently installed, in priority order.
    pub fn snapshot(&self) -> Vec<R> {
        self.rules.read().clone()
    }

    /// Insert or replace a single rule by id, then re-sort by priority.
    pub fn upsert(&self, rule: R) {
        let mut rules = self.rules.write();
        if let Some(existing) = rules.iter_mut().find(|r| r.id() == rule.id()) {
            *existing = rule;
        } else {
            rules.push(rule);
        }
        rules.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Remove a single rule by id. Returns whether a rule was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id() != id);
        rules.len() != before
    }

    /// Whether the store holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// The first enabled rule, in priority order, whose pattern matches
    /// `target_type`/`method`/`url`.
    pub fn find_match(&self, target_type: TargetType, method: &str, url: &str) -> Option<R> {
        self.rules
            .read()
            .iter()
            .find(|r| {
                r.enabled()
                    && r.target_type() == target_type
                    && url_match::matches_method(r.method(), method)
                    && url_match::matches(r.url_pattern().unwrap_or(""), url)
            })
            .cloned()
    }

    /// The first enabled rule, in priority order, whose pattern matches
    /// `method`/`url` and whose target type is any of `target_types`.
    /// Used where one stage is responsible for deciding a match
    /// regardless of which of several nominal target types a rule
    /// declares.
    pub fn find_match_in(&self, target_types: &[TargetType], method: &str, url: &str) -> Option<R> {
        self.rules
            .read()
            .iter()
            .find(|r| {
                r.enabled()
                    && target_types.contains(&r.target_type())
                    && url_match::matches_method(r.method(), method)
                    && url_match::matches(r.url_pattern().unwrap_or(""), url)
            })
            .cloned()
    }

    /// Every enabled rule, in priority order, whose pattern matches
    /// `target_type`/`method`/`url`. Used where a caller needs to know
    /// whether *any* rule could match without committing to the first.
    pub fn any_match(&self, target_type: TargetType, method: &str, url: &str) -> bool {
        self.rules.read().iter().any(|r| {
            r.enabled()
                && r.target_type() == target_type
                && url_match::matches_method(r.method(), method)
                && url_match::matches(r.url_pattern().unwrap_or(""), url)
        })
    }
}

impl<R: Rule + Clone> Default for RuleStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugprobe_types::MockRule;

    fn rule(id: &str, priority: i32, pattern: &str) -> MockRule {
        MockRule {
            id: id.to_string(),
            enabled: true,
            priority,
            url_pattern: Some(pattern.to_string()),
            method: None,
            target_type: TargetType::HttpRequest,
            action: debugprobe_types::rules::MockAction::Response(
                debugprobe_types::rules::MockResponseAction {
                    status: 200,
                    headers: Default::default(),
                    body: String::new(),
                    delay_ms: 0,
                },
            ),
        }
    }

    #[test]
    fn higher_priority_wins() {
        let store = RuleStore::new();
        store.replace_all(vec![rule("low", 1, "*"), rule("high", 10, "*")]);
        let matched = store
            .find_match(TargetType::HttpRequest, "GET", "https://x/y")
            .unwrap();
        assert_eq!(matched.id, "high");
    }

    #[test]
    fn disabled_rules_never_match() {
        let mut r = rule("r1", 1, "*");
        r.enabled = false;
        let store = RuleStore::new();
        store.replace_all(vec![r]);
        assert!(store
            .find_match(TargetType::HttpRequest, "GET", "https://x/y")
            .is_none());
    }

    #[test]
    fn wrong_target_type_never_matches() {
        let store = RuleStore::new();
        store.replace_all(vec![rule("r1", 1, "*")]);
        assert!(store
            .find_match(TargetType::HttpResponse, "GET", "https://x/y")
            .is_none());
    }

    #[test]
    fn upsert_replaces_existing_rule_by_id() {
        let store = RuleStore::new();
        store.replace_all(vec![rule("r1", 1, "*")]);
        store.upsert(rule("r1", 5, "https://only/*"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot()[0].priority, 5);
    }

    #[test]
    fn remove_drops_a_rule_by_id() {
        let store = RuleStore::new();
        store.replace_all(vec![rule("r1", 1, "*"), rule("r2", 2, "*")]);
        assert!(store.remove("r1"));
        assert!(!store.remove("r1"));
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.snapshot()[0].id, "r2");
    }
}
