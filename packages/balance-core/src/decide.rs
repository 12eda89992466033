//! The assignment decider (C4): a pure function from "who's in the
//! group, who am I, what partitions exist" to "what I should own".
//!
//! No I/O, no clock, no randomness -- every group member, handed the
//! same sorted `peers` and `partitions`, must compute the same answer
//! for its own index without talking to anyone else.

use thiserror::Error;

use crate::types::PartitionDescriptor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecideError {
    #[error("self id {self_id:?} not present in peers list")]
    SelfNotInPeers { self_id: String },
}

/// Range-assignment with remainder distribution.
///
/// `peers` must already be sorted (by `member_id`, ascending) and
/// `partitions` must already be sorted by canonical form, ascending --
/// both are the caller's responsibility (the peer/partition view
/// produces them in this order). Given `n` partitions and `m` peers,
/// peer at index `i` gets a contiguous slice of size `base` or
/// `base + 1`, where `base = n / m` and the first `n % m` peers
/// (by index) receive one extra partition:
///
/// ```text
/// rem   = n % m
/// start = base * i + min(i, rem)
/// count = base + (1 if i < rem else 0)
/// ```
///
/// This is deterministic, covers every partition exactly once across
/// the group, and differs between any two peers' shares by at most one
/// partition.
pub fn decide(
    peers: &[String],
    self_id: &str,
    partitions: &[PartitionDescriptor],
) -> Result<Vec<PartitionDescriptor>, DecideError> {
    let i = peers
        .iter()
        .position(|p| p == self_id)
        .ok_or_else(|| DecideError::SelfNotInPeers { self_id: self_id.to_string() })?;

    let m = peers.len();
    let n = partitions.len();

    let base = n / m;
    let rem = n % m;
    let start = base * i + i.min(rem);
    let count = base + usize::from(i < rem);

    Ok(partitions[start..start + count].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partitions(n: usize) -> Vec<PartitionDescriptor> {
        (0..n).map(|k| PartitionDescriptor::new("t", 0, k as i32)).collect()
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn three_peers_seven_partitions() {
        let ps = partitions(7);
        let group = peers(&["a", "b", "c"]);

        let a = decide(&group, "a", &ps).unwrap();
        let b = decide(&group, "b", &ps).unwrap();
        let c = decide(&group, "c", &ps).unwrap();

        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 2);
        assert_eq!(c.len(), 2);

        let mut all = a;
        all.extend(b);
        all.extend(c);
        all.sort();
        assert_eq!(all, ps);
    }

    #[test]
    fn one_peer_gets_everything() {
        let ps = partitions(3);
        let group = peers(&["solo"]);
        let mine = decide(&group, "solo", &ps).unwrap();
        assert_eq!(mine, ps);
    }

    #[test]
    fn over_subscribed_peers_get_empty_shares() {
        // 4 peers, 2 partitions: base=0, rem=2 -- only the first two
        // peers (by sorted index) get one partition each.
        let ps = partitions(2);
        let group = peers(&["a", "b", "c", "d"]);

        assert_eq!(decide(&group, "a", &ps).unwrap().len(), 1);
        assert_eq!(decide(&group, "b", &ps).unwrap().len(), 1);
        assert_eq!(decide(&group, "c", &ps).unwrap().len(), 0);
        assert_eq!(decide(&group, "d", &ps).unwrap().len(), 0);
    }

    #[test]
    fn zero_partitions_yields_empty_share() {
        let ps = partitions(0);
        let group = peers(&["a", "b"]);
        assert_eq!(decide(&group, "a", &ps).unwrap(), Vec::new());
        assert_eq!(decide(&group, "b", &ps).unwrap(), Vec::new());
    }

    #[test]
    fn self_not_in_peers_is_an_error() {
        let ps = partitions(3);
        let group = peers(&["a", "b"]);
        let err = decide(&group, "ghost", &ps).unwrap_err();
        assert_eq!(err, DecideError::SelfNotInPeers { self_id: "ghost".to_string() });
    }

    #[test]
    fn assignment_is_deterministic_across_repeated_calls() {
        let ps = partitions(11);
        let group = peers(&["a", "b", "c", "d"]);
        let first = decide(&group, "c", &ps).unwrap();
        let second = decide(&group, "c", &ps).unwrap();
        assert_eq!(first, second);
    }
}

#[cfg(test)]
mod proptests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;

    fn arb_peers() -> impl Strategy<Value = Vec<String>> {
        (1usize..12).prop_map(|m| {
            let mut names: Vec<String> = (0..m).map(|i| format!("peer-{i:03}")).collect();
            names.sort();
            names
        })
    }

    proptest! {
        /// Coverage: every peer's share, concatenated across the whole
        /// group, reconstitutes the input partition set exactly once each.
        #[test]
        fn coverage_partitions_every_partition_exactly_once(
            peer_count in 1usize..12,
            partition_count in 0usize..200,
        ) {
            let group: Vec<String> = (0..peer_count).map(|i| format!("peer-{i:03}")).collect();
            let ps: Vec<PartitionDescriptor> =
                (0..partition_count).map(|k| PartitionDescriptor::new("t", 0, k as i32)).collect();

            let mut seen = BTreeSet::new();
            for id in &group {
                let share = decide(&group, id, &ps).unwrap();
                for p in share {
                    prop_assert!(seen.insert(p), "partition assigned to more than one peer");
                }
            }
            prop_assert_eq!(seen.len(), ps.len());
        }

        /// Balance: no two peers' share sizes differ by more than one.
        #[test]
        fn balance_shares_differ_by_at_most_one(
            peer_count in 1usize..12,
            partition_count in 0usize..200,
        ) {
            let group: Vec<String> = (0..peer_count).map(|i| format!("peer-{i:03}")).collect();
            let ps: Vec<PartitionDescriptor> =
                (0..partition_count).map(|k| PartitionDescriptor::new("t", 0, k as i32)).collect();

            let sizes: Vec<usize> = group.iter().map(|id| decide(&group, id, &ps).unwrap().len()).collect();
            let min = *sizes.iter().min().unwrap();
            let max = *sizes.iter().max().unwrap();
            prop_assert!(max - min <= 1);
        }

        /// Determinism: recomputing from the same inputs gives the same answer.
        #[test]
        fn determinism_same_inputs_same_output(
            group in arb_peers(),
            partition_count in 0usize..100,
        ) {
            let ps: Vec<PartitionDescriptor> =
                (0..partition_count).map(|k| PartitionDescriptor::new("t", 0, k as i32)).collect();
            let id = group[group.len() / 2].clone();
            let first = decide(&group, &id, &ps).unwrap();
            let second = decide(&group, &id, &ps).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Monotonicity under growth: appending one more peer to the end
        /// of the sorted list never grows an existing peer's share by
        /// more than one partition.
        #[test]
        fn monotonic_growth_never_grows_share_by_more_than_one(
            peer_count in 1usize..11,
            partition_count in 0usize..200,
        ) {
            let mut group: Vec<String> = (0..peer_count).map(|i| format!("peer-{i:03}")).collect();
            let ps: Vec<PartitionDescriptor> =
                (0..partition_count).map(|k| PartitionDescriptor::new("t", 0, k as i32)).collect();

            let before: Vec<usize> = group.iter().map(|id| decide(&group, id, &ps).unwrap().len()).collect();

            group.push(format!("peer-{peer_count:03}"));

            for (idx, id) in group.iter().take(peer_count).enumerate() {
                let after = decide(&group, id, &ps).unwrap().len();
                prop_assert!(after <= before[idx] + 1);
            }
        }
    }
}
