//! Circular pass order for a session's members.
//!
//! Positions are indices into a fixed, ordered member list; "next" is the
//! following index modulo the ring length, so following `next` `len()` times
//! from any position returns to it.

use common::types::{Member, UserId};
use rand::seq::SliceRandom;
use rand::Rng;

/// Circular ordering of session participants.
///
/// A ring always holds at least one member; building from an empty list
/// yields `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRing {
    members: Vec<Member>,
}

impl MemberRing {
    /// Snapshot `members` into a ring, shuffling with the thread RNG if asked.
    #[must_use]
    pub fn build(members: Vec<Member>, shuffle: bool) -> Option<Self> {
        if shuffle {
            Self::build_with_rng(members, &mut rand::thread_rng())
        } else {
            Self::from_ordered(members)
        }
    }

    /// Snapshot `members` into a ring after a uniform shuffle with `rng`.
    #[must_use]
    pub fn build_with_rng<R: Rng + ?Sized>(mut members: Vec<Member>, rng: &mut R) -> Option<Self> {
        // Fisher-Yates
        members.shuffle(rng);
        Self::from_ordered(members)
    }

    fn from_ordered(members: Vec<Member>) -> Option<Self> {
        if members.is_empty() {
            None
        } else {
            Some(Self { members })
        }
    }

    /// Number of members in the ring (always >= 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Position of the first member.
    #[must_use]
    pub const fn head(&self) -> usize {
        0
    }

    /// Position following `position`, wrapping at the end.
    ///
    /// Returns `None` for a position outside the ring.
    #[must_use]
    pub fn next(&self, position: usize) -> Option<usize> {
        if position < self.members.len() {
            Some((position + 1) % self.members.len())
        } else {
            None
        }
    }

    /// Member at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Member> {
        self.members.get(position)
    }

    /// Position of the member with `user_id`, scanning from the head.
    #[must_use]
    pub fn find(&self, user_id: &UserId) -> Option<usize> {
        self.members.iter().position(|m| &m.id == user_id)
    }

    /// Members in ring order starting from the head.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn members(n: usize) -> Vec<Member> {
        (0..n)
            .map(|i| Member::new(format!("{}", 1000 + i), format!("member-{i}")))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_ring() {
        assert!(MemberRing::build(Vec::new(), true).is_none());
        assert!(MemberRing::build(Vec::new(), false).is_none());
    }

    #[test]
    fn test_next_n_times_returns_to_start() {
        for n in 1..=12 {
            let ring = MemberRing::build(members(n), true).unwrap();
            assert_eq!(ring.len(), n);

            for start in 0..n {
                let mut position = start;
                for _ in 0..n {
                    position = ring.next(position).unwrap();
                }
                assert_eq!(position, start, "ring of {n} did not cycle from {start}");
            }
        }
    }

    #[test]
    fn test_next_visits_every_member_once_per_cycle() {
        let ring = MemberRing::build(members(5), false).unwrap();
        let mut seen = Vec::new();
        let mut position = ring.head();
        for _ in 0..ring.len() {
            seen.push(ring.get(position).unwrap().id.clone());
            position = ring.next(position).unwrap();
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_single_member_ring_points_at_itself() {
        let ring = MemberRing::build(members(1), false).unwrap();
        assert_eq!(ring.next(ring.head()), Some(ring.head()));
    }

    #[test]
    fn test_unshuffled_ring_keeps_input_order() {
        let input = members(4);
        let ring = MemberRing::build(input.clone(), false).unwrap();
        assert_eq!(ring.members(), input.as_slice());
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let input = members(8);
        let mut rng = StdRng::seed_from_u64(7);
        let ring = MemberRing::build_with_rng(input.clone(), &mut rng).unwrap();

        let mut shuffled: Vec<_> = ring.members().iter().map(|m| m.id.clone()).collect();
        let mut original: Vec<_> = input.iter().map(|m| m.id.clone()).collect();
        shuffled.sort();
        original.sort();
        assert_eq!(shuffled, original);
    }

    #[test]
    fn test_find_member() {
        let ring = MemberRing::build(members(3), false).unwrap();
        assert_eq!(ring.find(&UserId::from("1002")), Some(2));
        assert_eq!(ring.find(&UserId::from("9999")), None);
    }

    #[test]
    fn test_out_of_range_position() {
        let ring = MemberRing::build(members(3), false).unwrap();
        assert_eq!(ring.next(3), None);
        assert!(ring.get(3).is_none());
    }
}
