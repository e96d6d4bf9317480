use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::model::EntityId;

/// Highlighted patients. Membership is set explicitly (brushing, chat tool
/// calls), never derived from a predicate. Keeps first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EntityId>", into = "Vec<EntityId>")]
pub struct Cohort {
    ids: Vec<EntityId>,
    members: HashSet<EntityId>,
}

impl Cohort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add ids not yet present; returns how many were new.
    pub fn add<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = EntityId>,
    {
        let before = self.ids.len();
        for id in ids {
            if self.members.insert(id.clone()) {
                self.ids.push(id);
            }
        }
        self.ids.len() - before
    }

    /// Remove the given ids; returns how many were present.
    pub fn remove<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a EntityId>,
    {
        let gone: HashSet<&EntityId> = ids
            .into_iter()
            .filter(|id| self.members.contains(*id))
            .collect();
        if gone.is_empty() {
            return 0;
        }
        self.ids.retain(|id| !gone.contains(id));
        for id in &gone {
            self.members.remove(*id);
        }
        gone.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.members.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<EntityId>> for Cohort {
    fn from(ids: Vec<EntityId>) -> Self {
        let mut cohort = Cohort::new();
        cohort.add(ids);
        cohort
    }
}

impl From<Cohort> for Vec<EntityId> {
    fn from(cohort: Cohort) -> Self {
        cohort.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().map(|s| EntityId::from(*s)).collect()
    }

    #[test]
    fn add_dedupes_and_keeps_order() {
        let mut cohort = Cohort::new();
        assert_eq!(cohort.add(ids(&["b", "a", "b"])), 2);
        assert_eq!(cohort.add(ids(&["a", "c"])), 1);
        assert_eq!(cohort.ids(), ids(&["b", "a", "c"]).as_slice());
    }

    #[test]
    fn remove_ignores_non_members() {
        let mut cohort = Cohort::from(ids(&["a", "b", "c"]));
        assert_eq!(cohort.remove(&ids(&["b", "x"])), 1);
        assert!(!cohort.contains("b"));
        assert_eq!(cohort.len(), 2);
    }

    #[test]
    fn serializes_as_plain_list() {
        let cohort = Cohort::from(ids(&["p1", "p2"]));
        assert_eq!(serde_json::to_string(&cohort).unwrap(), r#"["p1","p2"]"#);
    }
}
