//! Pod membership index.
//!
//! Each pod keeps its members in a vector (for selection by index and
//! paginated reads) plus a reverse index from address to position, so
//! membership checks and swap-removal are O(1). Both live in persistent
//! collections; cloning a directory is cheap.

use podrelay_core::RelayError;
use podrelay_types::{Address, PodId};

/// Hard cap on members per pod.
pub const MAX_POD_SIZE: usize = 65_535;

#[derive(Debug, Clone, Default)]
struct Pod {
    /// Members in insertion order, modulo swap-removals.
    members: im::Vector<Address>,
    /// Reverse index: member -> position in `members`.
    positions: im::HashMap<Address, usize>,
}

impl Pod {
    fn push(&mut self, operator: Address) {
        self.positions.insert(operator, self.members.len());
        self.members.push_back(operator);
    }

    fn swap_remove(&mut self, operator: &Address) -> bool {
        let Some(position) = self.positions.remove(operator) else {
            return false;
        };
        let Some(last) = self.members.pop_back() else {
            return false;
        };
        if last != *operator {
            self.members.set(position, last);
            self.positions.insert(last, position);
        }
        true
    }
}

/// Ordered membership of every pod.
///
/// Pods are numbered from 1 and created in order: creating pod `n` creates
/// every pod below it that did not exist yet.
#[derive(Debug, Clone, Default)]
pub struct PodDirectory {
    pods: im::Vector<Pod>,
}

impl PodDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pods created so far.
    pub fn pod_count(&self) -> usize {
        self.pods.len()
    }

    /// Whether `pod` has been created.
    pub fn exists(&self, pod: PodId) -> bool {
        pod.index().is_some_and(|i| i < self.pods.len())
    }

    fn get(&self, pod: PodId) -> Result<&Pod, RelayError> {
        pod.index()
            .and_then(|i| self.pods.get(i))
            .ok_or(RelayError::PodDoesNotExist(pod))
    }

    /// Create `pod` and every missing pod below it.
    pub fn ensure(&mut self, pod: PodId) -> Result<(), RelayError> {
        let index = pod.index().ok_or(RelayError::PodDoesNotExist(pod))?;
        while self.pods.len() <= index {
            self.pods.push_back(Pod::default());
        }
        Ok(())
    }

    /// Number of members in `pod`.
    pub fn len(&self, pod: PodId) -> Result<usize, RelayError> {
        Ok(self.get(pod)?.members.len())
    }

    /// Population of `pod`, zero if it does not exist yet.
    pub fn population(&self, pod: PodId) -> usize {
        self.get(pod).map(|p| p.members.len()).unwrap_or(0)
    }

    /// All members of `pod`.
    pub fn members(&self, pod: PodId) -> Result<Vec<Address>, RelayError> {
        Ok(self.get(pod)?.members.iter().copied().collect())
    }

    /// Up to `limit` members of `pod` starting at `offset`.
    pub fn members_range(
        &self,
        pod: PodId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Address>, RelayError> {
        let members = &self.get(pod)?.members;
        let len = members.len();
        if offset > len {
            return Err(RelayError::InvalidRange { offset, len });
        }
        Ok(members.iter().skip(offset).take(limit).copied().collect())
    }

    /// Member at `index`, if any.
    pub fn member_at(&self, pod: PodId, index: usize) -> Result<Option<Address>, RelayError> {
        Ok(self.get(pod)?.members.get(index).copied())
    }

    /// Whether `operator` belongs to `pod`. False for pods that do not exist.
    pub fn contains(&self, pod: PodId, operator: &Address) -> bool {
        self.get(pod)
            .map(|p| p.positions.contains_key(operator))
            .unwrap_or(false)
    }

    /// Append `operator` to `pod`, creating the pod (and lower pods) if
    /// needed. Fails when the pod already holds `max_size` members.
    pub fn add(&mut self, pod: PodId, operator: Address, max_size: usize) -> Result<(), RelayError> {
        if self.population(pod) >= max_size.min(MAX_POD_SIZE) {
            return Err(RelayError::TooManyOperators(pod));
        }
        self.ensure(pod)?;
        let index = pod.index().ok_or(RelayError::PodDoesNotExist(pod))?;
        if let Some(entry) = self.pods.get_mut(index) {
            if !entry.positions.contains_key(&operator) {
                entry.push(operator);
            }
        }
        Ok(())
    }

    /// Remove `operator` from `pod` by swapping in the last member.
    ///
    /// Returns whether the operator was a member. Member order is not stable
    /// across removals.
    pub fn remove(&mut self, pod: PodId, operator: &Address) -> bool {
        pod.index()
            .and_then(|i| self.pods.get_mut(i))
            .map(|entry| entry.swap_remove(operator))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(i: u32) -> Address {
        Address::derive(format!("member-{i}").as_bytes())
    }

    #[test]
    fn test_add_creates_lower_pods() {
        let mut pods = PodDirectory::new();
        pods.add(PodId(3), addr(1), MAX_POD_SIZE).unwrap();

        assert_eq!(pods.pod_count(), 3);
        assert_eq!(pods.len(PodId(1)).unwrap(), 0);
        assert_eq!(pods.len(PodId(3)).unwrap(), 1);
        assert!(pods.contains(PodId(3), &addr(1)));
    }

    #[test]
    fn test_unknown_pods_fail() {
        let pods = PodDirectory::new();
        assert_eq!(pods.len(PodId(0)), Err(RelayError::PodDoesNotExist(PodId(0))));
        assert_eq!(pods.members(PodId(1)), Err(RelayError::PodDoesNotExist(PodId(1))));
        assert!(!pods.contains(PodId(1), &addr(1)));
        assert_eq!(pods.population(PodId(9)), 0);
    }

    #[test]
    fn test_swap_remove_keeps_index_consistent() {
        let mut pods = PodDirectory::new();
        for i in 0..4 {
            pods.add(PodId(1), addr(i), MAX_POD_SIZE).unwrap();
        }

        assert!(pods.remove(PodId(1), &addr(1)));
        assert!(!pods.remove(PodId(1), &addr(1)));

        let members = pods.members(PodId(1)).unwrap();
        assert_eq!(members, vec![addr(0), addr(3), addr(2)]);
        for member in &members {
            assert!(pods.contains(PodId(1), member));
        }

        // The moved member can itself be removed cleanly.
        assert!(pods.remove(PodId(1), &addr(3)));
        assert_eq!(pods.members(PodId(1)).unwrap(), vec![addr(0), addr(2)]);
    }

    #[test]
    fn test_remove_last_member() {
        let mut pods = PodDirectory::new();
        pods.add(PodId(1), addr(0), MAX_POD_SIZE).unwrap();
        assert!(pods.remove(PodId(1), &addr(0)));
        assert_eq!(pods.len(PodId(1)).unwrap(), 0);
        assert_eq!(pods.pod_count(), 1);
    }

    #[test]
    fn test_members_range() {
        let mut pods = PodDirectory::new();
        for i in 0..5 {
            pods.add(PodId(1), addr(i), MAX_POD_SIZE).unwrap();
        }

        assert_eq!(
            pods.members_range(PodId(1), 1, 2).unwrap(),
            vec![addr(1), addr(2)]
        );
        assert_eq!(pods.members_range(PodId(1), 3, 100).unwrap().len(), 2);
        assert!(pods.members_range(PodId(1), 5, 1).unwrap().is_empty());
        assert_eq!(
            pods.members_range(PodId(1), 6, 1),
            Err(RelayError::InvalidRange { offset: 6, len: 5 })
        );
        assert_eq!(pods.member_at(PodId(1), 4).unwrap(), Some(addr(4)));
        assert_eq!(pods.member_at(PodId(1), 5).unwrap(), None);
    }

    #[test]
    fn test_capacity() {
        let mut pods = PodDirectory::new();
        pods.add(PodId(1), addr(0), 2).unwrap();
        pods.add(PodId(1), addr(1), 2).unwrap();
        assert_eq!(
            pods.add(PodId(1), addr(2), 2),
            Err(RelayError::TooManyOperators(PodId(1)))
        );
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut pods = PodDirectory::new();
        pods.add(PodId(1), addr(0), MAX_POD_SIZE).unwrap();
        let snapshot = pods.clone();

        pods.add(PodId(1), addr(1), MAX_POD_SIZE).unwrap();
        assert_eq!(snapshot.len(PodId(1)).unwrap(), 1);
        assert_eq!(pods.len(PodId(1)).unwrap(), 2);
    }
}
