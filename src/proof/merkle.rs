//! Merkle inclusion trees
//!
//! Binary merkle trees over escrow leaves. A level with an odd number of
//! nodes pairs its last node with itself. Paths are the ordered sibling
//! hashes from leaf to root; the leaf index decides left/right at each level.
//! Interior nodes hash under their own prefix (see [`HashScheme::hash_pair`]).

use serde::{Deserialize, Serialize};

use crate::crypto::HashScheme;
use crate::types::{digest_vec_serde, Digest};

/// Inclusion path for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Position of the leaf in its block
    pub leaf_index: u64,
    /// Sibling hashes ordered from the leaf level upwards
    #[serde(with = "digest_vec_serde")]
    pub siblings: Vec<Digest>,
}

impl MerklePath {
    /// Recomputes the root implied by this path for `leaf`.
    pub fn compute_root(&self, scheme: HashScheme, leaf: &Digest) -> Digest {
        let mut node = *leaf;
        let mut index = self.leaf_index;
        for sibling in &self.siblings {
            node = if index % 2 == 0 {
                scheme.hash_pair(&node, sibling)
            } else {
                scheme.hash_pair(sibling, &node)
            };
            index /= 2;
        }
        node
    }
}

/// A fully materialized merkle tree.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    scheme: HashScheme,
    /// levels[0] are the leaves, the last level holds the root
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Builds a tree over `leaves`. An empty tree has the hash of nothing as root.
    pub fn new(scheme: HashScheme, leaves: Vec<Digest>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map(|level| level.len() > 1).unwrap_or(false) {
            let current = &levels[levels.len() - 1];
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).unwrap_or(&pair[0]);
                    scheme.hash_pair(&pair[0], right)
                })
                .collect();
            levels.push(next);
        }
        Self { scheme, levels }
    }

    pub fn root(&self) -> Digest {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => *root,
            None => self.scheme.digest(&[]),
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Inclusion path for the leaf at `index`, or `None` when out of range.
    pub fn path(&self, index: usize) -> Option<MerklePath> {
        if index >= self.leaf_count() {
            return None;
        }
        let mut siblings = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_position = if position % 2 == 0 { position + 1 } else { position - 1 };
            let sibling = level.get(sibling_position).unwrap_or(&level[position]);
            siblings.push(*sibling);
            position /= 2;
        }
        Some(MerklePath {
            leaf_index: index as u64,
            siblings,
        })
    }
}
