use std::collections::vec_deque::{self, VecDeque};

/// Records that can be located inside a history by farmer identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self.as_str()
    }
}

/// Fixed-capacity, most-recent-first record list. Pushing past capacity
/// drops the oldest entries from the tail.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedHistory<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.saturating_add(1)),
        }
    }

    pub fn push(&mut self, record: T) {
        self.entries.push_front(record);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest record.
    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Iterates newest to oldest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.entries.iter()
    }
}

impl<T: Keyed> BoundedHistory<T> {
    /// First (newest) record for `key`.
    pub fn find_by_key(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|record| record.key() == key)
    }

    pub fn find_by_key_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.iter_mut().find(|record| record.key() == key)
    }

    pub fn remove_by_key(&mut self, key: &str) -> Option<T> {
        let index = self.entries.iter().position(|record| record.key() == key)?;
        self.entries.remove(index)
    }
}

impl<'a, T> IntoIterator for &'a BoundedHistory<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
