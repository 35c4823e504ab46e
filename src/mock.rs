//! Test doubles for the contract surface and the audit mirror.

use crate::{
    contract::{
        Address,
        PollContract,
        PollMeta,
        PollRecord,
        TxHash,
        TxReceipt,
        TxStatus,
        VoteLog,
    },
    error::{
        Error,
        Result,
    },
    mirror::{
        AuditMirror,
        MirrorPoll,
        NewPollRecord,
        VoteRecord,
    },
    surface::Method,
};
use async_trait::async_trait;
use std::{
    collections::HashSet,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable contract double: a fixed method surface, poll fixtures,
/// an event log, and per-call failure injection.
#[derive(Clone)]
pub struct MockContract {
    methods: Vec<Method>,
    polls: Vec<PollMeta>,
    missing: HashSet<u64>,
    events: Vec<VoteLog>,
    voters: HashSet<(u64, String)>,
    bulk_failure: Option<String>,
    options_failure: Option<String>,
    submit_failure: Option<String>,
    wait_failure: Option<String>,
    voter_check_failure: Option<String>,
    receipt_status: TxStatus,
    submitted: Arc<Mutex<Vec<(u64, u64, u64)>>>,
}

impl MockContract {
    pub fn new(methods: &[Method]) -> Self {
        Self {
            methods: methods.to_vec(),
            polls: Vec::new(),
            missing: HashSet::new(),
            events: Vec::new(),
            voters: HashSet::new(),
            bulk_failure: None,
            options_failure: None,
            submit_failure: None,
            wait_failure: None,
            voter_check_failure: None,
            receipt_status: TxStatus::Success,
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_polls(mut self, polls: Vec<PollMeta>) -> Self {
        self.polls = polls;
        self
    }

    pub fn with_events(mut self, events: Vec<VoteLog>) -> Self {
        self.events = events;
        self
    }

    /// Mark an index as `exists == false` on the per-index read.
    pub fn with_missing(mut self, index: u64) -> Self {
        self.missing.insert(index);
        self
    }

    pub fn with_voter(mut self, poll_id: u64, voter: &str) -> Self {
        self.voters.insert((poll_id, voter.to_string()));
        self
    }

    pub fn failing_bulk(mut self, message: &str) -> Self {
        self.bulk_failure = Some(message.to_string());
        self
    }

    pub fn failing_options(mut self, message: &str) -> Self {
        self.options_failure = Some(message.to_string());
        self
    }

    pub fn failing_submit(mut self, message: &str) -> Self {
        self.submit_failure = Some(message.to_string());
        self
    }

    pub fn failing_wait(mut self, message: &str) -> Self {
        self.wait_failure = Some(message.to_string());
        self
    }

    pub fn failing_voter_check(mut self, message: &str) -> Self {
        self.voter_check_failure = Some(message.to_string());
        self
    }

    pub fn reverting(mut self) -> Self {
        self.receipt_status = TxStatus::Reverted;
        self
    }

    /// Every `(poll_id, option_index, gas_limit)` submission seen.
    pub fn submitted(&self) -> Vec<(u64, u64, u64)> {
        lock(&self.submitted).clone()
    }

    fn require(&self, method: Method) -> Result<()> {
        if self.supports(method) {
            Ok(())
        } else {
            Err(Error::MethodMissing(method))
        }
    }

    fn poll_at(&self, index: u64) -> Result<&PollMeta> {
        self.polls
            .get(index as usize)
            .ok_or_else(|| Error::Transport(format!("no poll {}", index)))
    }
}

#[async_trait]
impl PollContract for MockContract {
    fn supports(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    async fn get_polls(&self) -> Result<Vec<PollMeta>> {
        self.require(Method::GetPolls)?;
        if let Some(message) = &self.bulk_failure {
            return Err(Error::Transport(message.clone()));
        }
        Ok(self.polls.clone())
    }

    async fn get_total_polls(&self) -> Result<u64> {
        self.require(Method::GetTotalPolls)?;
        Ok(self.polls.len() as u64)
    }

    async fn get_poll(&self, index: u64) -> Result<PollRecord> {
        self.require(Method::GetPoll)?;
        let meta = self.poll_at(index)?;
        Ok(PollRecord {
            title: meta.title.clone(),
            start: meta.start,
            end: meta.end,
            exists: !self.missing.contains(&index),
        })
    }

    async fn get_poll_options(&self, index: u64) -> Result<Vec<String>> {
        self.require(Method::GetPollOptions)?;
        if let Some(message) = &self.options_failure {
            return Err(Error::Transport(message.clone()));
        }
        Ok(self.poll_at(index)?.options.clone())
    }

    async fn has_voted(&self, index: u64, voter: &Address) -> Result<bool> {
        self.require(Method::HasVoted)?;
        if let Some(message) = &self.voter_check_failure {
            return Err(Error::Transport(message.clone()));
        }
        Ok(self.voters.contains(&(index, voter.to_string())))
    }

    async fn create_poll(
        &self,
        _title: &str,
        _options: &[String],
        _start: u64,
        _end: u64,
    ) -> Result<TxHash> {
        self.require(Method::CreatePoll)?;
        Ok(TxHash("0xcreate".to_string()))
    }

    async fn vote_on_poll(
        &self,
        index: u64,
        option_index: u64,
        gas_limit: u64,
    ) -> Result<TxHash> {
        self.require(Method::VoteOnPoll)?;
        if let Some(message) = &self.submit_failure {
            return Err(Error::Transport(message.clone()));
        }
        lock(&self.submitted).push((index, option_index, gas_limit));
        Ok(TxHash(format!("0xvote{}", index)))
    }

    async fn wait(&self, tx: &TxHash) -> Result<TxReceipt> {
        if let Some(message) = &self.wait_failure {
            return Err(Error::Transport(message.clone()));
        }
        Ok(TxReceipt {
            tx: tx.clone(),
            status: self.receipt_status,
        })
    }

    async fn voted_events(&self) -> Result<Vec<VoteLog>> {
        self.require(Method::VotedEvents)?;
        Ok(self.events.clone())
    }
}

/// Recording mirror double with a failure toggle.
#[derive(Clone, Default)]
pub struct MockMirror {
    pub fail: bool,
    created: Arc<Mutex<Vec<NewPollRecord>>>,
    votes: Arc<Mutex<Vec<VoteRecord>>>,
    attempts: Arc<AtomicUsize>,
}

impl MockMirror {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<NewPollRecord> {
        lock(&self.created).clone()
    }

    pub fn votes(&self) -> Vec<VoteRecord> {
        lock(&self.votes).clone()
    }

    /// How often any write was attempted, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditMirror for MockMirror {
    async fn create_poll(&self, poll: &NewPollRecord) -> Result<u64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Transport("audit mirror down".to_string()));
        }
        let mut created = lock(&self.created);
        created.push(poll.clone());
        Ok(created.len() as u64 - 1)
    }

    async fn polls(&self) -> Result<Vec<MirrorPoll>> {
        if self.fail {
            return Err(Error::Transport("audit mirror down".to_string()));
        }
        Ok(Vec::new())
    }

    async fn record_vote(&self, vote: &VoteRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Transport("audit mirror down".to_string()));
        }
        lock(&self.votes).push(vote.clone());
        Ok(())
    }
}
