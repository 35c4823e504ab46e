use crate::{
    client::Client,
    contract::{
        PollContract,
        PollMeta,
        TxHash,
        TxStatus,
    },
    error::{
        Error,
        Result,
    },
    mirror::{
        AuditMirror,
        NewPollRecord,
    },
    store::Store,
    surface::{
        self,
        Method,
        ReadSurface,
        INDEXED_READ,
    },
};
use async_trait::async_trait;
use log::warn;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Poll {
    pub id: u64,
    pub title: String,
    pub options: Vec<String>,
    pub start: u64,
    pub end: u64,
}

/// Where a poll sits in its voting window. Derived from the clock on
/// every read, never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollPhase {
    Upcoming,
    Active,
    Ended,
}

impl Poll {
    pub fn phase(&self, now: u64) -> PollPhase {
        if now < self.start {
            PollPhase::Upcoming
        } else if now <= self.end {
            PollPhase::Active
        } else {
            PollPhase::Ended
        }
    }

    pub fn is_active(&self, now: u64) -> bool {
        self.phase(now) == PollPhase::Active
    }
}

/// Read-only composite served to the host application: static metadata
/// plus tallies aligned to the options, the derived activity flag, and
/// the signer's voter record. Rebuilt on every load.
#[derive(Clone, Debug)]
pub struct EnrichedPoll {
    pub poll: Poll,
    pub votes: Vec<u64>,
    pub active: bool,
    pub has_voted: bool,
}

impl EnrichedPoll {
    pub fn total_votes(&self) -> u64 {
        self.votes.iter().sum()
    }
}

/// Inputs for a new poll, validated before any transaction is sent.
#[derive(Clone, Debug)]
pub struct NewPoll {
    pub title: String,
    pub options: Vec<String>,
    pub start: u64,
    pub end: u64,
}

impl NewPoll {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        if self.options.len() < 2 {
            return Err(Error::TooFewOptions);
        }
        if self.options.iter().any(|opt| opt.trim().is_empty()) {
            return Err(Error::EmptyOption);
        }
        if self.start >= self.end {
            return Err(Error::InvalidWindow);
        }
        Ok(())
    }
}

#[async_trait]
pub trait PollClient {
    /// Every poll the contract knows, enriched; partial results when
    /// single polls fail, empty when no read surface is available.
    async fn load_all(&self, now: u64) -> Result<Vec<EnrichedPoll>>;

    /// One poll by index, or `None` if the contract marks it absent.
    async fn load_poll(
        &self,
        id: u64,
        now: u64,
    ) -> Result<Option<EnrichedPoll>>;

    /// The most-voted polls first, truncated to `limit`.
    async fn trending(
        &self,
        now: u64,
        limit: usize,
    ) -> Result<Vec<EnrichedPoll>>;

    /// Validate, submit the creation transaction, await finality, and
    /// mirror the record off-chain on a detached task.
    async fn create_poll(&self, poll: NewPoll) -> Result<TxHash>;
}

#[async_trait]
impl<C, S, M> PollClient for Client<C, S, M>
where
    C: PollContract,
    S: Store,
    M: AuditMirror + 'static,
{
    async fn load_all(&self, now: u64) -> Result<Vec<EnrichedPoll>> {
        let rows = match surface::negotiate_read(
            self.primary(),
            self.fallback(),
        ) {
            ReadSurface::Bulk(contract) => match contract.get_polls().await {
                Ok(metas) => metas
                    .into_iter()
                    .enumerate()
                    .map(|(id, meta)| (id as u64, meta))
                    .collect(),
                Err(e) => {
                    warn!("bulk poll read failed, trying per-index: {}", e);
                    match surface::resolve(
                        self.primary(),
                        self.fallback(),
                        INDEXED_READ,
                    ) {
                        Ok(contract) => self.read_indexed(contract).await?,
                        Err(_) => {
                            warn!("no per-index read surface either");
                            return Ok(Vec::new());
                        }
                    }
                }
            },
            ReadSurface::Indexed(contract) => {
                self.read_indexed(contract).await?
            }
            ReadSurface::Unavailable => {
                warn!("no contract surface exposes a poll read path");
                return Ok(Vec::new());
            }
        };

        let mut polls = Vec::with_capacity(rows.len());
        for (id, meta) in rows {
            match self.enrich(id, meta, now).await {
                Ok(poll) => polls.push(poll),
                // one bad poll never takes down the rest of the list
                Err(e) => warn!("skipping poll {}: {}", id, e),
            }
        }
        Ok(polls)
    }

    async fn load_poll(
        &self,
        id: u64,
        now: u64,
    ) -> Result<Option<EnrichedPoll>> {
        let contract = match surface::resolve(
            self.primary(),
            self.fallback(),
            INDEXED_READ,
        ) {
            Ok(contract) => contract,
            Err(_) => {
                // bulk-only surface: serve from the full load
                return Ok(self
                    .load_all(now)
                    .await?
                    .into_iter()
                    .find(|p| p.poll.id == id));
            }
        };
        let record = contract.get_poll(id).await?;
        if !record.exists {
            return Ok(None);
        }
        let options = match contract.get_poll_options(id).await {
            Ok(options) => options,
            Err(e) => {
                warn!("options unavailable for poll {}: {}", id, e);
                Vec::new()
            }
        };
        let meta = PollMeta {
            title: record.title,
            options,
            start: record.start,
            end: record.end,
        };
        Ok(Some(self.enrich(id, meta, now).await?))
    }

    async fn trending(
        &self,
        now: u64,
        limit: usize,
    ) -> Result<Vec<EnrichedPoll>> {
        let mut polls = self.load_all(now).await?;
        // total votes descending; equal totals fall back to the
        // stronger leading tally so the ordering stays deterministic
        polls.sort_by(|a, b| {
            b.total_votes()
                .cmp(&a.total_votes())
                .then_with(|| b.votes.cmp(&a.votes))
        });
        polls.truncate(limit);
        Ok(polls)
    }

    async fn create_poll(&self, poll: NewPoll) -> Result<TxHash> {
        poll.validate()?;
        let contract = surface::resolve(
            self.primary(),
            self.fallback(),
            &[Method::CreatePoll],
        )?;
        let tx = contract
            .create_poll(&poll.title, &poll.options, poll.start, poll.end)
            .await?;
        let receipt = contract.wait(&tx).await?;
        if receipt.status == TxStatus::Reverted {
            return Err(Error::OnChainRevert);
        }
        self.mirror_poll(NewPollRecord {
            title: poll.title,
            options: poll.options,
            start_time: poll.start,
            end_time: poll.end,
        });
        Ok(tx)
    }
}

impl<C, S, M> Client<C, S, M>
where
    C: PollContract,
    S: Store,
    M: AuditMirror,
{
    /// Count-then-per-index read. Indices the contract marks absent are
    /// omitted; a poll whose options cannot be read renders with zero
    /// options and no vote surface.
    async fn read_indexed(
        &self,
        contract: &C,
    ) -> Result<Vec<(u64, PollMeta)>> {
        let total = contract.get_total_polls().await?;
        let mut rows = Vec::new();
        for index in 0..total {
            let record = match contract.get_poll(index).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("skipping poll {}: {}", index, e);
                    continue;
                }
            };
            if !record.exists {
                continue;
            }
            let options = match contract.get_poll_options(index).await {
                Ok(options) => options,
                Err(e) => {
                    warn!("options unavailable for poll {}: {}", index, e);
                    Vec::new()
                }
            };
            rows.push((
                index,
                PollMeta {
                    title: record.title,
                    options,
                    start: record.start,
                    end: record.end,
                },
            ));
        }
        Ok(rows)
    }

    async fn enrich(
        &self,
        id: u64,
        meta: PollMeta,
        now: u64,
    ) -> Result<EnrichedPoll> {
        let poll = Poll {
            id,
            title: meta.title,
            options: meta.options,
            start: meta.start,
            end: meta.end,
        };
        let active = poll.is_active(now);
        let log_surface = surface::resolve(
            self.primary(),
            self.fallback(),
            &[Method::VotedEvents],
        )
        .unwrap_or_else(|_| self.primary());
        let votes = self
            .tallies()
            .counts(log_surface, id, poll.options.len())
            .await?;
        let has_voted = self.signer_has_voted(id).await;
        Ok(EnrichedPoll {
            poll,
            votes,
            active,
            has_voted,
        })
    }
}
