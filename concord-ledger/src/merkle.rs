//! Merkle tree over event hash strings.
//!
//! Leaves are the prefixed `"alg:hex"` hash strings of a sealed sequence
//! range, in sequence order. The leaf layer is padded to a power of two by
//! repeating the final leaf; parents hash the concatenated UTF-8 bytes of
//! their children's hash strings. Combination is strictly positional: a
//! proof records left/right for every step and verification recombines
//! exactly as recorded, so a proof for one leaf can never validate another.

use concord_core::{
    hash::algorithm_of, ConcordResult, HashAlgorithm, ProofError, ProofStep, SiblingPosition,
};

fn combine(algorithm: HashAlgorithm, left: &str, right: &str) -> String {
    let mut input = Vec::with_capacity(left.len() + right.len());
    input.extend_from_slice(left.as_bytes());
    input.extend_from_slice(right.as_bytes());
    algorithm.compute(&input)
}

/// A fully materialized Merkle tree.
///
/// `levels[0]` is the padded leaf layer; each subsequent level halves until
/// the root. Trees are built on demand when sealing a checkpoint or
/// producing a proof and are never persisted.
#[derive(Debug)]
pub struct MerkleTree {
    algorithm: HashAlgorithm,
    leaf_count: usize,
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Build a tree over the given leaves, padding to a power of two by
    /// repeating the final leaf.
    pub fn build(leaves: &[String], algorithm: HashAlgorithm) -> ConcordResult<Self> {
        if leaves.is_empty() {
            return Err(ProofError::EmptyTree.into());
        }

        let mut padded = leaves.to_vec();
        let target = padded.len().next_power_of_two();
        while padded.len() < target {
            let last = padded[padded.len() - 1].clone();
            padded.push(last);
        }

        let mut levels = vec![padded];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let parents = current
                .chunks(2)
                .map(|pair| combine(algorithm, &pair[0], &pair[1]))
                .collect();
            levels.push(parents);
        }

        Ok(Self {
            algorithm,
            leaf_count: leaves.len(),
            levels,
        })
    }

    /// The root hash string.
    pub fn root(&self) -> &str {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Number of un-padded leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Size of the padded leaf layer.
    pub fn padded_size(&self) -> usize {
        self.levels[0].len()
    }

    /// The inclusion path for a leaf, from the leaf's level up to the level
    /// below the root. Each step records which side the sibling sits on.
    pub fn proof(&self, leaf_index: usize) -> ConcordResult<Vec<ProofStep>> {
        if leaf_index >= self.leaf_count {
            return Err(ProofError::LeafOutOfRange {
                index: leaf_index,
                leaf_count: self.leaf_count,
            }
            .into());
        }

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut index = leaf_index;
        for (level, nodes) in self.levels.iter().enumerate() {
            if nodes.len() == 1 {
                break;
            }
            let (sibling_index, position) = if index % 2 == 0 {
                (index + 1, SiblingPosition::Right)
            } else {
                (index - 1, SiblingPosition::Left)
            };
            path.push(ProofStep {
                level: level as u32,
                position,
                sibling_hash: nodes[sibling_index].clone(),
            });
            index /= 2;
        }
        Ok(path)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Recombine a leaf hash up a proof path and check the result against the
/// expected root. The combining algorithm comes from the expected root's
/// prefix, so proofs stay verifiable across algorithm changes.
pub fn verify_proof_path(
    leaf_hash: &str,
    path: &[ProofStep],
    expected_root: &str,
) -> ConcordResult<()> {
    let algorithm = algorithm_of(expected_root)?;
    let mut current = leaf_hash.to_string();
    for step in path {
        current = match step.position {
            SiblingPosition::Right => combine(algorithm, &current, &step.sibling_hash),
            SiblingPosition::Left => combine(algorithm, &step.sibling_hash, &current),
        };
    }
    if current != expected_root {
        return Err(ProofError::MerkleProofInvalid {
            computed: current,
            expected: expected_root.to_string(),
        }
        .into());
    }
    Ok(())
}
