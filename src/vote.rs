use crate::{
    client::Client,
    contract::{
        PollContract,
        TxHash,
        TxStatus,
    },
    error::Result,
    mirror::{
        AuditMirror,
        VoteRecord,
    },
    poll::EnrichedPoll,
    store::Store,
    surface::{
        self,
        Method,
    },
};
use async_trait::async_trait;
use core::fmt;
use log::{
    debug,
    warn,
};

/// Gas ceiling covering the contract's worst-case voting branch.
const VOTE_GAS_LIMIT: u64 = 300_000;

/// Stages of one vote attempt. Strictly sequential within an attempt;
/// the commit never runs before finality is observed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoteStage {
    Idle,
    Validating,
    Submitting,
    Confirming,
    Committed,
    Rejected,
}

/// Why a vote attempt terminated without being committed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RejectReason {
    NotActive,
    AlreadyVoted,
    InvalidOption,
    UserRejected,
    InsufficientFunds,
    OnChainRevert,
    Unknown(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RejectReason::NotActive => {
                write!(f, "poll is not currently active")
            }
            RejectReason::AlreadyVoted => {
                write!(f, "you have already voted on this poll")
            }
            RejectReason::InvalidOption => write!(f, "invalid option selected"),
            RejectReason::UserRejected => {
                write!(f, "transaction was rejected in your wallet")
            }
            RejectReason::InsufficientFunds => {
                write!(f, "not enough funds to pay for this transaction")
            }
            RejectReason::OnChainRevert => {
                write!(f, "transaction reverted on chain")
            }
            RejectReason::Unknown(msg) => write!(f, "{}", msg),
        }
    }
}

/// Map a transport failure onto the closed reason set, once, at the
/// boundary. Unrecognized messages are preserved verbatim.
pub fn classify(message: &str) -> RejectReason {
    if message.contains("user rejected") {
        RejectReason::UserRejected
    } else if message.contains("insufficient funds") {
        RejectReason::InsufficientFunds
    } else if message.contains("already voted") {
        RejectReason::AlreadyVoted
    } else if message.contains("not active") {
        RejectReason::NotActive
    } else if message.contains("invalid option") {
        RejectReason::InvalidOption
    } else {
        RejectReason::Unknown(message.to_string())
    }
}

/// Terminal outcome of a vote attempt. The audit mirror's failure
/// domain is disjoint by construction: nothing here can express it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VoteOutcome {
    Committed { tx: TxHash },
    Rejected(RejectReason),
}

#[async_trait]
pub trait VoteClient {
    /// Run one vote attempt through the full pipeline. Terminal
    /// outcomes are not retried here; invoking again re-enters
    /// validation with a fresh on-chain voter check.
    async fn cast_vote(
        &self,
        poll: &EnrichedPoll,
        option_index: usize,
        now: u64,
    ) -> Result<VoteOutcome>;
}

#[async_trait]
impl<C, S, M> VoteClient for Client<C, S, M>
where
    C: PollContract,
    S: Store,
    M: AuditMirror + 'static,
{
    async fn cast_vote(
        &self,
        poll: &EnrichedPoll,
        option_index: usize,
        now: u64,
    ) -> Result<VoteOutcome> {
        let poll_id = poll.poll.id;
        debug!("poll {}: {:?}", poll_id, VoteStage::Validating);
        // the voter check comes first and is not gated on activity: a
        // stale window must never unlock a second vote
        if poll.has_voted || self.signer_has_voted(poll_id).await {
            return Ok(VoteOutcome::Rejected(RejectReason::AlreadyVoted));
        }
        if !poll.poll.is_active(now) {
            return Ok(VoteOutcome::Rejected(RejectReason::NotActive));
        }
        if option_index >= poll.poll.options.len() {
            return Ok(VoteOutcome::Rejected(RejectReason::InvalidOption));
        }

        debug!("poll {}: {:?}", poll_id, VoteStage::Submitting);
        let contract = surface::resolve(
            self.primary(),
            self.fallback(),
            &[Method::VoteOnPoll],
        )?;
        let tx = match contract
            .vote_on_poll(poll_id, option_index as u64, VOTE_GAS_LIMIT)
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                return Ok(VoteOutcome::Rejected(classify(&e.to_string())))
            }
        };

        debug!("poll {}: {:?}", poll_id, VoteStage::Confirming);
        let receipt = match contract.wait(&tx).await {
            Ok(receipt) => receipt,
            Err(e) => {
                return Ok(VoteOutcome::Rejected(classify(&e.to_string())))
            }
        };
        if receipt.status == TxStatus::Reverted {
            return Ok(VoteOutcome::Rejected(RejectReason::OnChainRevert));
        }

        debug!("poll {}: {:?}", poll_id, VoteStage::Committed);
        // a cache failure must not mask a vote that is already on chain
        if let Err(e) = self.tallies().record_local_vote(
            poll_id,
            option_index,
            poll.poll.options.len(),
        ) {
            warn!("local tally update failed for poll {}: {}", poll_id, e);
        }
        self.mark_voted(poll_id).await;
        self.mirror_vote(VoteRecord {
            poll_id,
            option_index: option_index as u64,
            voter: self.signer().to_string(),
            voted_at: now,
        });
        Ok(VoteOutcome::Committed { tx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_transport_messages_map_to_specific_reasons() {
        assert_eq!(
            classify("transport failure: user rejected the request"),
            RejectReason::UserRejected
        );
        assert_eq!(
            classify("insufficient funds for gas * price + value"),
            RejectReason::InsufficientFunds
        );
        assert_eq!(
            classify("execution reverted: already voted"),
            RejectReason::AlreadyVoted
        );
        assert_eq!(
            classify("execution reverted: poll not active"),
            RejectReason::NotActive
        );
        assert_eq!(
            classify("execution reverted: invalid option"),
            RejectReason::InvalidOption
        );
    }

    #[test]
    fn unknown_transport_messages_keep_the_raw_text() {
        let reason = classify("nonce too low");
        assert_eq!(reason, RejectReason::Unknown("nonce too low".to_string()));
        assert_eq!(reason.to_string(), "nonce too low");
    }
}
