//! Merkle Tree for Deposit Commitments
//!
//! A fixed-depth, append-only accumulator producing roots and inclusion
//! paths for the proving layer.
//!
//! ```text
//!                    Root          (depth, 0)
//!                   /    \
//!                 H01    H23       level 1
//!                /  \   /   \
//!               C0  C1  C2  zero   level 0 (leaves)
//! ```
//!
//! Unfilled slots accumulate to precomputed per-level zero values, so a
//! path request beyond `size` proves vacancy against zero subtrees.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PrivacyError;
use crate::hasher::TreeHasher;

/// Protocol constant: the level-0 value of an unfilled slot
pub const ZERO_LEAF: [u8; 32] = [0u8; 32];

/// A Merkle inclusion path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerklePath {
    /// Root the path was taken against
    pub root: [u8; 32],
    /// Sibling hashes from leaf to root
    pub siblings: Vec<[u8; 32]>,
    /// Position bits, least-significant first (false = left, true = right)
    pub path_bits: Vec<bool>,
    /// The leaf the path starts from
    pub element: [u8; 32],
}

impl MerklePath {
    /// Re-derive the root from the leaf and sibling hashes
    pub fn compute_root<H: TreeHasher>(&self, hasher: &H) -> [u8; 32] {
        let mut current = self.element;

        for (level, (sibling, is_right)) in
            self.siblings.iter().zip(self.path_bits.iter()).enumerate()
        {
            current = if *is_right {
                hasher.hash(Some(level), sibling, &current)
            } else {
                hasher.hash(Some(level), &current, sibling)
            };
        }

        current
    }

    /// Check the path against its recorded root
    pub fn verify<H: TreeHasher>(&self, hasher: &H) -> bool {
        self.compute_root(hasher) == self.root
    }

    /// The leaf index this path belongs to
    pub fn leaf_index(&self) -> u64 {
        index_from_path_bits(&self.path_bits)
    }
}

/// Reconstruct a leaf index from its path bits
///
/// Bit `i` of the index is the direction at level `i`, read from the leaf
/// level upward.
pub fn index_from_path_bits(path_bits: &[bool]) -> u64 {
    path_bits
        .iter()
        .enumerate()
        .fold(0u64, |acc, (level, bit)| acc | ((*bit as u64) << level))
}

/// Fixed-depth append-only commitment tree
///
/// Backed by an arena keyed by `(level, index)`. Not safe for concurrent
/// mutation; share behind external synchronization if needed.
pub struct MerkleTree<H: TreeHasher> {
    depth: usize,
    prefix: String,
    hasher: H,
    /// Precomputed zero value per level, `zeros[depth]` is the empty root
    zeros: Vec<[u8; 32]>,
    /// Materialized nodes: (level, index) -> value
    nodes: HashMap<(usize, u64), [u8; 32]>,
    size: u64,
}

impl<H: TreeHasher> MerkleTree<H> {
    /// Create an empty tree of the given depth
    pub fn new(depth: usize, hasher: H, prefix: impl Into<String>) -> Self {
        let zeros = compute_zeros(&hasher, depth);
        Self {
            depth,
            prefix: prefix.into(),
            hasher,
            zeros,
            nodes: HashMap::new(),
            size: 0,
        }
    }

    /// Create a tree pre-filled with `leaves`, materialized level by level
    pub fn with_leaves(
        depth: usize,
        hasher: H,
        prefix: impl Into<String>,
        leaves: &[[u8; 32]],
    ) -> Result<Self, PrivacyError> {
        let mut tree = Self::new(depth, hasher, prefix);

        if leaves.len() as u64 > tree.capacity() {
            return Err(PrivacyError::InvalidInput(format!(
                "{} leaves exceed capacity {}",
                leaves.len(),
                tree.capacity()
            )));
        }

        let mut current: Vec<[u8; 32]> = leaves.to_vec();
        for (i, leaf) in current.iter().enumerate() {
            tree.nodes.insert((0, i as u64), *leaf);
        }

        for level in 1..=depth {
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in 0..current.len().div_ceil(2) {
                let left = current[2 * pair];
                let right = current
                    .get(2 * pair + 1)
                    .copied()
                    .unwrap_or(tree.zeros[level - 1]);
                let parent = tree.hasher.hash(Some(level - 1), &left, &right);
                tree.nodes.insert((level, pair as u64), parent);
                next.push(parent);
            }
            current = next;
        }

        tree.size = leaves.len() as u64;
        Ok(tree)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of inserted leaves
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Maximum number of leaves
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Current root, `(depth, 0)` in the arena
    pub fn root(&self) -> [u8; 32] {
        self.node(self.depth, 0)
    }

    /// The zero value at a given level
    pub fn zero(&self, level: usize) -> [u8; 32] {
        self.zeros[level]
    }

    /// Append an element at the next free slot, returning its index
    pub fn insert(&mut self, element: [u8; 32]) -> Result<u64, PrivacyError> {
        let index = self.size;
        self.update(index, element, true)?;
        Ok(index)
    }

    /// Append elements sequentially, in the order given
    pub fn batch_insert(&mut self, elements: &[[u8; 32]]) -> Result<(), PrivacyError> {
        for element in elements {
            self.insert(*element)?;
        }
        Ok(())
    }

    /// Write `element` at `index`
    ///
    /// `insert = false` rewrites an existing slot and is rejected for
    /// `index >= size`; `insert = true` appends and is rejected for
    /// `index < size`. The two modes are mutually exclusive on purpose.
    ///
    /// The full path to the root is computed first and applied as a single
    /// batch, so a failure mid-walk leaves no partial state behind.
    pub fn update(
        &mut self,
        index: u64,
        element: [u8; 32],
        insert: bool,
    ) -> Result<(), PrivacyError> {
        if index >= self.capacity() {
            return Err(PrivacyError::InvalidInput(format!(
                "index {index} out of range for depth {}",
                self.depth
            )));
        }
        if !insert && index >= self.size {
            return Err(PrivacyError::InvalidInput(
                "update targets an unfilled slot; use insert".into(),
            ));
        }
        if insert && index < self.size {
            return Err(PrivacyError::InvalidInput(
                "insert targets an occupied slot; use update".into(),
            ));
        }

        let mut staged: Vec<((usize, u64), [u8; 32])> = Vec::with_capacity(self.depth + 1);
        let mut current = element;
        let mut current_index = index;
        staged.push(((0, current_index), current));

        for level in 0..self.depth {
            let is_right = current_index & 1 == 1;
            let sibling_index = current_index ^ 1;
            let sibling = self.node(level, sibling_index);

            current = if is_right {
                self.hasher.hash(Some(level), &sibling, &current)
            } else {
                self.hasher.hash(Some(level), &current, &sibling)
            };
            current_index >>= 1;
            staged.push(((level + 1, current_index), current));
        }

        self.nodes.extend(staged);
        if insert {
            self.size = index + 1;
        }
        Ok(())
    }

    /// Inclusion path for `index`, without mutating storage
    ///
    /// Indices beyond `size` are allowed and yield paths over zero-filled
    /// subtrees.
    pub fn path(&self, index: u64) -> Result<MerklePath, PrivacyError> {
        if index >= self.capacity() {
            return Err(PrivacyError::InvalidInput(format!(
                "index {index} out of range for depth {}",
                self.depth
            )));
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_bits = Vec::with_capacity(self.depth);
        let mut current_index = index;

        for level in 0..self.depth {
            path_bits.push(current_index & 1 == 1);
            siblings.push(self.node(level, current_index ^ 1));
            current_index >>= 1;
        }

        Ok(MerklePath {
            root: self.root(),
            siblings,
            path_bits,
            element: self.node(0, index),
        })
    }

    /// Position of the first leaf equal to `element`, if any
    pub fn get_index_of_element(&self, element: &[u8; 32]) -> Option<u64> {
        (0..self.size).find(|i| self.node(0, *i) == *element)
    }

    fn node(&self, level: usize, index: u64) -> [u8; 32] {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zeros[level])
    }
}

fn compute_zeros<H: TreeHasher>(hasher: &H, depth: usize) -> Vec<[u8; 32]> {
    let mut zeros = vec![ZERO_LEAF];
    for level in 0..depth {
        let prev = zeros[level];
        zeros.push(hasher.hash(Some(level), &prev, &prev));
    }
    zeros
}
