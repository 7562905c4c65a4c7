//! Merkle root over an ordered list of file digests.

use crate::digest::{digest_bytes, digest_pair, Hash256};

/// Fold `leaves` pairwise, left to right, until one digest remains.
///
/// An odd node at the end of a level is paired with itself. An empty list
/// yields the digest of the empty byte string. A single leaf is its own root.
pub fn merkle_root(leaves: &[Hash256]) -> Hash256 {
    if leaves.is_empty() {
        return digest_bytes(&[]);
    }

    let mut level: Vec<Hash256> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                digest_pair(left, right)
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tag: &[u8]) -> Hash256 {
        digest_bytes(tag)
    }

    #[test]
    fn test_empty_is_hash_of_nothing() {
        assert_eq!(merkle_root(&[]), digest_bytes(b""));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let a = leaf(b"a");
        assert_eq!(merkle_root(&[a]), a);
    }

    #[test]
    fn test_two_leaves() {
        let (a, b) = (leaf(b"a"), leaf(b"b"));
        assert_eq!(merkle_root(&[a, b]), digest_pair(&a, &b));
    }

    #[test]
    fn test_odd_count_duplicates_last() {
        let (d1, d2, d3) = (leaf(b"1"), leaf(b"2"), leaf(b"3"));
        let expected = digest_pair(&digest_pair(&d1, &d2), &digest_pair(&d3, &d3));
        assert_eq!(merkle_root(&[d1, d2, d3]), expected);
    }

    #[test]
    fn test_five_leaves_duplicate_at_each_level() {
        let l: Vec<Hash256> = (0u8..5).map(|i| leaf(&[i])).collect();
        let n01 = digest_pair(&l[0], &l[1]);
        let n23 = digest_pair(&l[2], &l[3]);
        let n44 = digest_pair(&l[4], &l[4]);
        let upper_left = digest_pair(&n01, &n23);
        let upper_right = digest_pair(&n44, &n44);
        assert_eq!(merkle_root(&l), digest_pair(&upper_left, &upper_right));
    }

    #[test]
    fn test_order_matters() {
        let (a, b) = (leaf(b"a"), leaf(b"b"));
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }
}
