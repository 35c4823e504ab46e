use crate::{
    error::{
        Error,
        Result,
    },
    surface::Method,
};
use async_trait::async_trait;
use core::fmt;
use std::str::FromStr;

/// Hex-encoded account address, opaque to the client.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            Err(Error::AddressParseFail)
        } else {
            Ok(Address(s.to_string()))
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxStatus {
    Success,
    Reverted,
}

#[derive(Clone, Debug)]
pub struct TxReceipt {
    pub tx: TxHash,
    pub status: TxStatus,
}

/// Static poll row served by the bulk read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollMeta {
    pub title: String,
    pub options: Vec<String>,
    pub start: u64,
    pub end: u64,
}

/// Per-index poll row served by the fallback read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollRecord {
    pub title: String,
    pub start: u64,
    pub end: u64,
    pub exists: bool,
}

/// One decoded `Voted(pollId, optionIndex)` log entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VoteLog {
    pub poll_id: u64,
    pub option_index: u64,
}

/// The subset of the poll contract a client must reach.
///
/// Implementations answer `supports` from the deployed method surface
/// and report absent entry points as `Error::MethodMissing` so callers
/// can degrade instead of crashing.
#[async_trait]
pub trait PollContract: Send + Sync {
    /// Capability probe, answered fresh on every call.
    fn supports(&self, method: Method) -> bool;

    async fn get_polls(&self) -> Result<Vec<PollMeta>>;

    async fn get_total_polls(&self) -> Result<u64>;

    async fn get_poll(&self, index: u64) -> Result<PollRecord>;

    async fn get_poll_options(&self, index: u64) -> Result<Vec<String>>;

    async fn has_voted(&self, index: u64, voter: &Address) -> Result<bool>;

    async fn create_poll(
        &self,
        title: &str,
        options: &[String],
        start: u64,
        end: u64,
    ) -> Result<TxHash>;

    async fn vote_on_poll(
        &self,
        index: u64,
        option_index: u64,
        gas_limit: u64,
    ) -> Result<TxHash>;

    /// Await finality for a submitted transaction.
    async fn wait(&self, tx: &TxHash) -> Result<TxReceipt>;

    /// Every `Voted` log emitted over the full block range.
    async fn voted_events(&self) -> Result<Vec<VoteLog>>;
}
