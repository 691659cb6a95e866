//! Score-ordered set of string members.
//!
//! This implementation uses `BTreeMap` for the rank order, providing:
//!
//! - O(log n) insertion and removal by member
//! - Ordered iteration for reading an index front to back

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::types::Score;

use super::ScoredMember;

/// Rank of a member: score first, then insertion sequence
type Rank = (Score, u64);

/// Ordered set with sorted-set semantics.
///
/// Each member appears at most once. Re-adding a member with a new score
/// moves it; re-adding with the same score leaves it where it is. Members
/// with equal scores keep insertion order.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The
/// in-memory store wraps every set behind one `parking_lot::RwLock`.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    /// Rank -> member, ascending
    by_rank: BTreeMap<Rank, String>,

    /// Member -> rank, for removal by value
    ranks: FxHashMap<String, Rank>,

    /// Next insertion sequence number
    next_seq: u64,
}

impl SortedSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member
    ///
    /// Returns `true` if the member was not present before.
    pub fn add(&mut self, member: &str, score: Score) -> bool {
        if let Some(&rank) = self.ranks.get(member) {
            if rank.0 == score {
                return false;
            }
            self.by_rank.remove(&rank);
            let rank = self.next_rank(score);
            self.by_rank.insert(rank, member.to_string());
            self.ranks.insert(member.to_string(), rank);
            return false;
        }

        let rank = self.next_rank(score);
        self.by_rank.insert(rank, member.to_string());
        self.ranks.insert(member.to_string(), rank);
        true
    }

    /// Remove a member by exact value
    ///
    /// Returns `true` if the member was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.ranks.remove(member) {
            Some(rank) => {
                self.by_rank.remove(&rank);
                true
            }
            None => false,
        }
    }

    /// Check if a member is present
    #[must_use]
    pub fn contains(&self, member: &str) -> bool {
        self.ranks.contains_key(member)
    }

    /// Members in ascending score order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Score)> + '_ {
        self.by_rank
            .iter()
            .map(|(&(score, _), member)| (member.as_str(), score))
    }

    /// Owned copy of every member in order
    #[must_use]
    pub fn to_members(&self) -> Vec<ScoredMember> {
        self.iter()
            .map(|(member, score)| ScoredMember {
                member: member.to_string(),
                score,
            })
            .collect()
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// Check if the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    fn next_rank(&mut self, score: Score) -> Rank {
        let rank = (score, self.next_seq);
        self.next_seq += 1;
        rank
    }
}
