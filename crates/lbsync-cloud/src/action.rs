//! Diff plans for set-valued remote resources

use std::collections::HashSet;
use std::hash::Hash;

/// What should happen to one item of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Desired but absent
    Create,
    /// Present but no longer desired
    Delete,
    /// Present and desired
    Keep,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Keep => write!(f, "keep"),
        }
    }
}

/// Planned action for a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action<T> {
    pub action_type: ActionType,
    pub item: T,
}

/// Set difference between a desired and an existing collection
///
/// Creates follow the order of the desired collection, deletes and keeps the
/// order of the existing one. Duplicates on either side collapse to their
/// first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan<T> {
    pub actions: Vec<Action<T>>,
    pub has_changes: bool,
}

impl<T> Plan<T>
where
    T: Clone + Eq + Hash,
{
    pub fn diff(
        desired: impl IntoIterator<Item = T>,
        existing: impl IntoIterator<Item = T>,
    ) -> Self {
        let mut seen_desired = HashSet::new();
        let desired: Vec<T> = desired
            .into_iter()
            .filter(|item| seen_desired.insert(item.clone()))
            .collect();

        let mut seen_existing = HashSet::new();
        let existing: Vec<T> = existing
            .into_iter()
            .filter(|item| seen_existing.insert(item.clone()))
            .collect();

        let mut actions = Vec::new();
        for item in &desired {
            if !seen_existing.contains(item) {
                actions.push(Action {
                    action_type: ActionType::Create,
                    item: item.clone(),
                });
            }
        }
        for item in existing {
            let action_type = if seen_desired.contains(&item) {
                ActionType::Keep
            } else {
                ActionType::Delete
            };
            actions.push(Action { action_type, item });
        }

        Self::new(actions)
    }
}

impl<T> Plan<T> {
    pub fn new(actions: Vec<Action<T>>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::Keep);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Items of the given action type, in plan order
    pub fn items(&self, action_type: ActionType) -> impl Iterator<Item = &T> {
        self.actions
            .iter()
            .filter(move |a| a.action_type == action_type)
            .map(|a| &a.item)
    }

    pub fn to_create(&self) -> Vec<&T> {
        self.items(ActionType::Create).collect()
    }

    pub fn to_delete(&self) -> Vec<&T> {
        self.items(ActionType::Delete).collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.items(ActionType::Create).count(),
            delete: self.items(ActionType::Delete).count(),
            keep: self.items(ActionType::Keep).count(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub delete: usize,
    pub keep: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to delete, {} unchanged",
            self.create, self.delete, self.keep
        )
    }
}
