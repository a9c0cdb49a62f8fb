use std::cmp::Ordering;

use serde::Serialize;

/// Keys that changed between two consecutive passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff<K> {
    pub added: Vec<K>,
    pub removed: Vec<K>,
    pub updated: Vec<K>,
}

impl<K> Default for Diff<K> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            updated: Vec::new(),
        }
    }
}

impl<K> Diff<K> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }
}

/// Merges two key-sorted sets. A key present in both with a different value is `updated`.
pub fn diff<K, V>(previous: &[(K, V)], current: &[(K, V)]) -> Diff<K>
where
    K: Ord + Copy,
    V: PartialEq,
{
    let mut result = Diff::default();
    let mut prev = previous.iter().peekable();
    let mut curr = current.iter().peekable();
    loop {
        match (prev.peek(), curr.peek()) {
            (Some((pk, pv)), Some((ck, cv))) => match pk.cmp(ck) {
                Ordering::Less => {
                    result.removed.push(*pk);
                    prev.next();
                }
                Ordering::Greater => {
                    result.added.push(*ck);
                    curr.next();
                }
                Ordering::Equal => {
                    if pv != cv {
                        result.updated.push(*ck);
                    }
                    prev.next();
                    curr.next();
                }
            },
            (Some((pk, _)), None) => {
                result.removed.push(*pk);
                prev.next();
            }
            (None, Some((ck, _))) => {
                result.added.push(*ck);
                curr.next();
            }
            (None, None) => break,
        }
    }
    result
}

#[test]
fn diff_test() {
    let previous = [(1, 2), (3, 1), (5, 4)];
    let current = [(3, 2), (4, 1), (5, 4)];
    let result = diff(&previous, &current);
    assert_eq!(result.added, vec![4]);
    assert_eq!(result.removed, vec![1]);
    assert_eq!(result.updated, vec![3]);
    assert_eq!(result.len(), 3);
}

#[test]
fn diff_identical_is_empty() {
    let set = [(1, 'a'), (2, 'b')];
    assert!(diff(&set, &set).is_empty());
}
