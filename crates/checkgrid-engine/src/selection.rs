//! Which groups are expanded and which checks show history.
//!
//! `selected_groups` is ordered most-recently-selected first and never holds
//! duplicates. Cascades into the cache live in the engine; this type only
//! owns the sets.

use std::collections::BTreeSet;

use crate::state::CheckRuntimeState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionModel {
    selected_groups: Vec<String>,
    history_visible: BTreeSet<String>,
}

/// Outcome of a toggle-all, so the caller can run the cascades.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleAllPlan {
    /// Groups that became selected, in the order they were added.
    pub opened: Vec<String>,
    /// Groups that became deselected.
    pub closed: Vec<String>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `group`. Returns `true` if it is now selected.
    pub fn toggle_group(&mut self, group: &str) -> bool {
        if self.deselect_group(group) {
            false
        } else {
            self.selected_groups.insert(0, group.to_string());
            true
        }
    }

    /// Prepend `group` if absent. Returns `true` if it was added.
    pub fn select_group(&mut self, group: &str) -> bool {
        if self.is_group_selected(group) {
            return false;
        }
        self.selected_groups.insert(0, group.to_string());
        true
    }

    /// Remove `group` if present. Returns `true` if it was removed.
    pub fn deselect_group(&mut self, group: &str) -> bool {
        let before = self.selected_groups.len();
        self.selected_groups.retain(|g| g != group);
        self.selected_groups.len() != before
    }

    pub fn is_group_selected(&self, group: &str) -> bool {
        self.selected_groups.iter().any(|g| g == group)
    }

    pub fn selected_groups(&self) -> &[String] {
        &self.selected_groups
    }

    /// Expand every group, or collapse to the first one if all are open.
    ///
    /// Never collapses to zero groups. `all_groups` is in catalog order.
    pub fn toggle_all_groups(&mut self, all_groups: &[String]) -> ToggleAllPlan {
        let mut plan = ToggleAllPlan::default();
        let Some(first) = all_groups.first() else {
            return plan;
        };

        if all_groups.iter().all(|g| self.is_group_selected(g)) {
            for group in &all_groups[1..] {
                if self.deselect_group(group) {
                    plan.closed.push(group.clone());
                }
            }
            // Selections outside the current catalog go too.
            let stale: Vec<String> = self
                .selected_groups
                .iter()
                .filter(|g| *g != first)
                .cloned()
                .collect();
            for group in stale {
                self.deselect_group(&group);
                plan.closed.push(group);
            }
        } else {
            for group in all_groups {
                if self.select_group(group) {
                    plan.opened.push(group.clone());
                }
            }
        }

        plan
    }

    pub fn show_history(&mut self, check: &str) {
        self.history_visible.insert(check.to_string());
    }

    pub fn hide_history(&mut self, check: &str) -> bool {
        self.history_visible.remove(check)
    }

    pub fn is_history_visible(&self, check: &str) -> bool {
        self.history_visible.contains(check)
    }
}

/// Whether any of `checks` shows its result detail. False when empty.
pub fn is_any_result_shown<'a, I>(checks: I) -> bool
where
    I: IntoIterator<Item = Option<&'a CheckRuntimeState>>,
{
    checks
        .into_iter()
        .any(|s| s.is_some_and(|s| s.show_result_detail))
}

/// Whether every one of `checks` shows its result detail. True when empty.
pub fn are_all_details_shown<'a, I>(checks: I) -> bool
where
    I: IntoIterator<Item = Option<&'a CheckRuntimeState>>,
{
    checks
        .into_iter()
        .all(|s| s.is_some_and(|s| s.show_result_detail))
}
