use crate::{
    contract::PollContract,
    error::Result,
    store::Store,
};
use log::warn;

fn key(poll_id: u64) -> String {
    format!("poll_votes_{}", poll_id)
}

/// Durable per-poll vote tallies, reconciled against the contract's
/// event log.
///
/// The contract wins on any full rebuild, but a sequence that has
/// absorbed a confirmed local vote is served as-is for the rest of the
/// session: rebuilds only run when no usable cached sequence exists.
pub struct TallyStore<S: Store> {
    store: S,
}

impl<S: Store> TallyStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Vote counts for a poll, one slot per option.
    ///
    /// A cached sequence whose length disagrees with the current option
    /// count is discarded, not served. On a miss the counts are rebuilt
    /// from the event log and persisted; a rebuild failure yields zeros
    /// without persisting so a later call can retry.
    pub async fn counts<C: PollContract>(
        &self,
        contract: &C,
        poll_id: u64,
        option_count: usize,
    ) -> Result<Vec<u64>> {
        if let Some(cached) = self.cached(poll_id)? {
            if cached.len() == option_count {
                return Ok(cached);
            }
            self.store.remove(&key(poll_id))?;
        }
        match rebuild(contract, poll_id, option_count).await {
            Ok(counts) => {
                self.persist(poll_id, &counts)?;
                Ok(counts)
            }
            Err(e) => {
                warn!("tally rebuild failed for poll {}: {}", poll_id, e);
                Ok(vec![0; option_count])
            }
        }
    }

    /// Advance exactly one option of a confirmed local vote by one.
    ///
    /// The caller is responsible for invoking this at most once per
    /// confirmed vote.
    pub fn record_local_vote(
        &self,
        poll_id: u64,
        option_index: usize,
        option_count: usize,
    ) -> Result<()> {
        let mut counts = match self.cached(poll_id)? {
            Some(cached) if cached.len() == option_count => cached,
            _ => vec![0; option_count],
        };
        counts[option_index] += 1;
        self.persist(poll_id, &counts)
    }

    fn cached(&self, poll_id: u64) -> Result<Option<Vec<u64>>> {
        let raw = match self.store.get(&key(poll_id))? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_slice(&raw) {
            Ok(counts) => Ok(Some(counts)),
            Err(e) => {
                warn!("dropping undecodable tally for poll {}: {}", poll_id, e);
                self.store.remove(&key(poll_id))?;
                Ok(None)
            }
        }
    }

    fn persist(&self, poll_id: u64, counts: &[u64]) -> Result<()> {
        self.store.set(&key(poll_id), &serde_json::to_vec(counts)?)
    }
}

/// Accumulate counts from every `Voted` log entry for one poll. Entries
/// with an option index outside the poll's range are corrupt and
/// skipped rather than failing the rebuild.
async fn rebuild<C: PollContract>(
    contract: &C,
    poll_id: u64,
    option_count: usize,
) -> Result<Vec<u64>> {
    let mut counts = vec![0u64; option_count];
    for entry in contract.voted_events().await? {
        if entry.poll_id != poll_id {
            continue;
        }
        if (entry.option_index as usize) < option_count {
            counts[entry.option_index as usize] += 1;
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contract::VoteLog,
        mock::MockContract,
        store::MemStore,
        surface::Method,
    };

    fn log(poll_id: u64, option_index: u64) -> VoteLog {
        VoteLog {
            poll_id,
            option_index,
        }
    }

    #[async_std::test]
    async fn rebuild_from_an_empty_log_is_all_zeros() {
        let contract = MockContract::new(&[Method::VotedEvents]);
        let tallies = TallyStore::new(MemStore::default());
        let counts = tallies.counts(&contract, 0, 3).await.unwrap();
        assert_eq!(counts, vec![0, 0, 0]);
    }

    #[async_std::test]
    async fn rebuild_filters_by_poll_and_drops_corrupt_entries() {
        let contract = MockContract::new(&[Method::VotedEvents])
            .with_events(vec![
                log(0, 0),
                log(0, 1),
                log(0, 1),
                log(1, 0),
                // option index out of range for a two-option poll
                log(0, 9),
            ]);
        let tallies = TallyStore::new(MemStore::default());
        let counts = tallies.counts(&contract, 0, 2).await.unwrap();
        assert_eq!(counts, vec![1, 2]);
    }

    #[async_std::test]
    async fn rebuild_failure_yields_zeros_without_persisting() {
        let contract = MockContract::new(&[]);
        let store = MemStore::default();
        let tallies = TallyStore::new(store);
        let counts = tallies.counts(&contract, 7, 2).await.unwrap();
        assert_eq!(counts, vec![0, 0]);
        // nothing was cached, so a healthier surface rebuilds later
        let contract = MockContract::new(&[Method::VotedEvents])
            .with_events(vec![log(7, 1)]);
        let counts = tallies.counts(&contract, 7, 2).await.unwrap();
        assert_eq!(counts, vec![0, 1]);
    }

    #[async_std::test]
    async fn local_vote_advances_exactly_one_slot() {
        let contract = MockContract::new(&[Method::VotedEvents]);
        let tallies = TallyStore::new(MemStore::default());
        tallies.record_local_vote(0, 1, 3).unwrap();
        let counts = tallies.counts(&contract, 0, 3).await.unwrap();
        assert_eq!(counts, vec![0, 1, 0]);

        // a second confirmed vote on another option is independent
        tallies.record_local_vote(0, 2, 3).unwrap();
        let counts = tallies.counts(&contract, 0, 3).await.unwrap();
        assert_eq!(counts, vec![0, 1, 1]);
    }

    #[async_std::test]
    async fn local_vote_survives_a_later_read() {
        // once recorded, the cached sequence is authoritative: the
        // event log no longer overwrites it
        let contract = MockContract::new(&[Method::VotedEvents])
            .with_events(vec![log(0, 0)]);
        let tallies = TallyStore::new(MemStore::default());
        let counts = tallies.counts(&contract, 0, 2).await.unwrap();
        assert_eq!(counts, vec![1, 0]);
        tallies.record_local_vote(0, 1, 2).unwrap();
        let counts = tallies.counts(&contract, 0, 2).await.unwrap();
        assert_eq!(counts, vec![1, 1]);
    }

    #[async_std::test]
    async fn a_mismatched_cached_sequence_is_discarded() {
        let store = MemStore::default();
        store.set("poll_votes_0", b"[5,5,5]").unwrap();
        let contract = MockContract::new(&[Method::VotedEvents])
            .with_events(vec![log(0, 0), log(0, 1)]);
        let tallies = TallyStore::new(store);
        // the poll now has two options; the stale three-slot sequence
        // must not be consumed
        let counts = tallies.counts(&contract, 0, 2).await.unwrap();
        assert_eq!(counts, vec![1, 1]);
    }

    #[async_std::test]
    async fn an_undecodable_cached_sequence_is_discarded() {
        let store = MemStore::default();
        store.set("poll_votes_3", b"not json").unwrap();
        let contract = MockContract::new(&[Method::VotedEvents])
            .with_events(vec![log(3, 1)]);
        let tallies = TallyStore::new(store);
        let counts = tallies.counts(&contract, 3, 2).await.unwrap();
        assert_eq!(counts, vec![0, 1]);
    }
}
