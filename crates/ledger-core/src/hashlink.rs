//! A singly linked list whose nodes commit to their value and to the hash of
//! the node before them. Changing any value without relinking is detectable.

use crate::constants::HASH_LIST_HEAD;
use crate::error::{LedgerError, Result};
use crate::sha256_hex;
use std::fmt::Display;

/// SHA-256 hex digest of `value.to_string()` followed by `previous_hash`.
pub fn make_hash<T: Display + ?Sized>(value: &T, previous_hash: &str) -> String {
    let mut history = value.to_string();
    history.push_str(previous_hash);
    sha256_hex(history.as_bytes())
}

#[derive(Debug)]
pub struct HashListNode<T> {
    value: T,
    previous_hash: String,
    hash: String,
    next: Option<Box<HashListNode<T>>>,
}

impl<T: Display> HashListNode<T> {
    /// First node of a list, linked to the `"head"` sentinel.
    pub fn head(value: T) -> Self {
        Self::new(value, HASH_LIST_HEAD)
    }

    pub fn new(value: T, previous_hash: impl Into<String>) -> Self {
        let previous_hash = previous_hash.into();
        let hash = make_hash(&value, &previous_hash);
        Self {
            value,
            previous_hash,
            hash,
            next: None,
        }
    }

    /// Builds a fully linked list in input order.
    pub fn from_values<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut nodes: Vec<HashListNode<T>> = Vec::new();
        for value in values {
            let node = match nodes.last() {
                Some(prev) => HashListNode::new(value, prev.hash.clone()),
                None => HashListNode::head(value),
            };
            nodes.push(node);
        }

        // Link back to front so every node is moved exactly once.
        let mut next: Option<Box<HashListNode<T>>> = None;
        while let Some(mut node) = nodes.pop() {
            node.next = next;
            next = Some(Box::new(node));
        }
        next.map(|head| *head)
            .ok_or(LedgerError::EmptyInput("hash list needs at least one value"))
    }

    /// Appends `value` after the current tail and returns the new tail.
    pub fn push(&mut self, value: T) -> &mut HashListNode<T> {
        let mut tail_hash = &self.hash;
        let mut link = &mut self.next;
        while let Some(node) = link {
            tail_hash = &node.hash;
            link = &mut node.next;
        }
        let node = HashListNode::new(value, tail_hash.clone());
        &mut **link.insert(Box::new(node))
    }

    /// True iff `right` commits to `left`'s hash and to its own current value.
    pub fn validate(left: &HashListNode<T>, right: &HashListNode<T>) -> bool {
        right.hash == make_hash(&right.value, &left.hash)
    }

    #[cfg(test)]
    pub(crate) fn tamper_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T> HashListNode<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn next(&self) -> Option<&HashListNode<T>> {
        self.next.as_deref()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter { current: Some(self) }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A node always holds at least itself.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl<T> Drop for HashListNode<T> {
    // Unlink iteratively; the default drop would recurse once per node.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

pub struct Iter<'a, T> {
    current: Option<&'a HashListNode<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a HashListNode<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.next.as_deref();
        Some(node)
    }
}

/// Walks the list from `head`; true iff every adjacent pair validates.
/// A single node is vacuously valid.
pub fn valid_list<T: Display>(head: &HashListNode<T>) -> bool {
    let mut current = head;
    while let Some(next) = current.next() {
        if !HashListNode::validate(current, next) {
            return false;
        }
        current = next;
    }
    true
}
