//! Binary Merkle tree over an ordered batch of displayable values.
//!
//! The tree is an immutable snapshot: there is no update operation, and any
//! change to the input requires building a new tree. Leaves hold the double
//! SHA-256 of each value's string form; internal nodes hold the double hash of
//! their children's hex digests concatenated as strings.
//!
//! An odd number of leaves is padded by repeating the last one. Spans of
//! leaves are then halved (left half `len / 2`) until one or two remain, so
//! paths to the leaves can differ in length by one.

use crate::error::{LedgerError, Result};
use crate::sha256_hex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

pub fn hash<T: Display + ?Sized>(value: &T) -> String {
    sha256_hex(value.to_string().as_bytes())
}

pub fn double_hash<T: Display + ?Sized>(value: &T) -> String {
    hash(&hash(value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    value: String,
    left: Option<Arc<MerkleNode>>,
    right: Option<Arc<MerkleNode>>,
}

impl MerkleNode {
    fn leaf(value: String) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }

    fn parent(left: Arc<MerkleNode>, right: Arc<MerkleNode>) -> Self {
        let mut combined = String::with_capacity(left.value.len() + right.value.len());
        combined.push_str(&left.value);
        combined.push_str(&right.value);
        Self {
            value: double_hash(&combined),
            left: Some(left),
            right: Some(right),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn left(&self) -> Option<&MerkleNode> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&MerkleNode> {
        self.right.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

enum Task {
    Span(usize, usize),
    Join,
}

/// Builds the tree over `leaves` by halving, driven by an explicit work stack.
/// A span of two nodes pairs them, a span of one pairs its node with itself,
/// and a longer span splits at `len / 2`. Returns the root together with the
/// longest root-to-leaf path.
fn build(leaves: &[Arc<MerkleNode>]) -> Option<(Arc<MerkleNode>, usize)> {
    let mut tasks = vec![Task::Span(0, leaves.len())];
    let mut built: Vec<(Arc<MerkleNode>, usize)> = Vec::new();
    while let Some(task) = tasks.pop() {
        match task {
            Task::Span(lo, hi) => match hi - lo {
                0 => return None,
                1 | 2 => {
                    let left = leaves[lo].clone();
                    let right = leaves[hi - 1].clone();
                    built.push((Arc::new(MerkleNode::parent(left, right)), 1));
                }
                len => {
                    let mid = lo + len / 2;
                    tasks.push(Task::Join);
                    tasks.push(Task::Span(mid, hi));
                    tasks.push(Task::Span(lo, mid));
                }
            },
            Task::Join => {
                let (right, right_depth) = built.pop()?;
                let (left, left_depth) = built.pop()?;
                let depth = left_depth.max(right_depth) + 1;
                built.push((Arc::new(MerkleNode::parent(left, right)), depth));
            }
        }
    }
    built.pop()
}

#[derive(Debug, Clone)]
pub struct MerkleTree {
    root: Arc<MerkleNode>,
    leaf_count: usize,
    depth: usize,
}

impl MerkleTree {
    pub fn new<T: Display + Sync>(values: &[T]) -> Result<Self> {
        if values.is_empty() {
            return Err(LedgerError::EmptyInput("merkle tree needs at least one value"));
        }

        let mut leaves: Vec<Arc<MerkleNode>> = values
            .par_iter()
            .map(|v| Arc::new(MerkleNode::leaf(double_hash(v))))
            .collect();
        if leaves.len() % 2 == 1 {
            let last = leaves[leaves.len() - 1].clone();
            leaves.push(last);
        }

        let (root, depth) =
            build(&leaves).ok_or(LedgerError::EmptyInput("merkle tree needs at least one value"))?;
        Ok(Self {
            root,
            leaf_count: values.len(),
            depth,
        })
    }

    /// Hex digest committing to the whole batch.
    pub fn root_hash(&self) -> &str {
        &self.root.value
    }

    pub fn root(&self) -> &MerkleNode {
        &self.root
    }

    /// Number of input values, not counting padding.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Edges on the longest path from the root to a leaf.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True iff `values` rebuild to this tree's root.
    pub fn verify<T: Display + Sync>(&self, values: &[T]) -> bool {
        match MerkleTree::new(values) {
            Ok(other) => other.root_hash() == self.root_hash(),
            Err(_) => false,
        }
    }

    /// Inclusion proof for the value at `index` in the original input.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count {
            return None;
        }
        let mut steps = Vec::with_capacity(self.depth);
        let (mut lo, mut hi) = (0, self.leaf_count + self.leaf_count % 2);
        let mut node: &MerkleNode = &self.root;
        while !node.is_leaf() {
            let (left, right) = (node.left.as_deref()?, node.right.as_deref()?);
            // A one-wide span holds the same leaf on both sides.
            let mid = lo + ((hi - lo) / 2).max(1);
            if index < mid {
                steps.push(ProofStep {
                    hash: right.value.clone(),
                    side: Side::Right,
                });
                node = left;
                hi = mid;
            } else {
                steps.push(ProofStep {
                    hash: left.value.clone(),
                    side: Side::Left,
                });
                node = right;
                lo = mid;
            }
        }
        steps.reverse();
        Some(MerkleProof {
            index,
            leaf: node.value.clone(),
            steps,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: String,
    /// Which side the sibling sits on.
    pub side: Side,
}

/// Sibling digests from a leaf up to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub index: usize,
    pub leaf: String,
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    pub fn verify<T: Display + ?Sized>(&self, value: &T, root: &str) -> bool {
        let mut current = double_hash(value);
        if current != self.leaf {
            return false;
        }
        for step in &self.steps {
            let combined = match step.side {
                Side::Left => format!("{}{}", step.hash, current),
                Side::Right => format!("{}{}", current, step.hash),
            };
            current = double_hash(&combined);
        }
        current == root
    }
}
