//! Fixed-capacity bitmask over the non-depot locations.
//!
//! Location `i` (for `1 <= i <= 127`) is stored in bit `i - 1` of a `u128`.
//! The depot is never a member.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VertexSet(u128);

impl VertexSet {
    /// Largest number of customers a set can hold.
    pub const CAPACITY: usize = 127;

    pub const fn empty() -> Self {
        VertexSet(0)
    }

    /// All customers `{1, ..., dimension - 1}` of an instance with `dimension` locations.
    pub fn full(dimension: usize) -> Self {
        debug_assert!(dimension >= 1 && dimension - 1 <= Self::CAPACITY);
        if dimension <= 1 {
            return VertexSet(0);
        }
        VertexSet((1u128 << (dimension - 1)) - 1)
    }

    #[inline]
    fn bit(e: usize) -> u128 {
        debug_assert!(e >= 1 && e <= Self::CAPACITY, "location {} outside set capacity", e);
        1u128 << (e - 1)
    }

    #[inline]
    pub fn contains(self, e: usize) -> bool {
        self.0 & Self::bit(e) != 0
    }

    #[inline]
    pub fn insert(self, e: usize) -> Self {
        VertexSet(self.0 | Self::bit(e))
    }

    #[inline]
    pub fn remove(self, e: usize) -> Self {
        VertexSet(self.0 & !Self::bit(e))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw bitmask, used by the memo table hash.
    #[inline]
    pub fn bits(self) -> u128 {
        self.0
    }

    /// Members in ascending order.
    pub fn iter(self) -> Iter {
        Iter(self.0)
    }
}

pub struct Iter(u128);

impl Iterator for Iter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let low = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(low + 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for VertexSet {
    type Item = usize;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

impl FromIterator<usize> for VertexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter().fold(VertexSet::empty(), |s, e| s.insert(e))
    }
}

impl std::fmt::Display for VertexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (k, e) in self.iter().enumerate() {
            if k > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_set() {
        let s = VertexSet::full(5);
        assert_eq!(s.len(), 4);
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(!s.contains(5));
        assert!(VertexSet::full(1).is_empty());
    }

    #[test]
    fn test_full_set_at_capacity() {
        let s = VertexSet::full(VertexSet::CAPACITY + 1);
        assert_eq!(s.len(), VertexSet::CAPACITY);
        assert!(s.contains(1));
        assert!(s.contains(127));
    }

    #[test]
    fn test_insert_contains() {
        let s = VertexSet::empty().insert(3).insert(127);
        assert!(s.contains(3));
        assert!(s.contains(127));
        assert!(!s.contains(1));
        assert_eq!(s.insert(3), s);
    }

    #[test]
    fn test_remove() {
        let single = VertexSet::empty().insert(7);
        assert!(single.remove(7).is_empty());

        let pair = single.insert(2);
        assert!(!pair.remove(7).is_empty());

        // removing an absent element leaves the set unchanged
        assert_eq!(pair.remove(5), pair);
        assert_eq!(pair.remove(7).remove(7), pair.remove(7));
    }

    #[test]
    fn test_iter_ascending() {
        let s: VertexSet = [9, 1, 64, 65, 4].into_iter().collect();
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![1, 4, 9, 64, 65]);
        assert_eq!(s.to_string(), "{1 4 9 64 65}");
    }
}
