use crate::{
    contract::{
        Address,
        PollContract,
    },
    mirror::{
        AuditMirror,
        HttpAuditMirror,
        NewPollRecord,
        VoteRecord,
    },
    store::Store,
    surface::{
        self,
        Method,
    },
    tally::TallyStore,
};
use async_std::{
    sync::RwLock,
    task,
};
use log::warn;
use std::{
    collections::HashSet,
    sync::Arc,
};

/// One application session.
///
/// Holds the two candidate contract handles, the signing account, the
/// durable tally cache, the optional audit mirror, and the session's
/// record of locally confirmed votes. Constructed once at startup and
/// dropped with the session; nothing here lives in ambient state.
pub struct Client<C, S: Store, M = HttpAuditMirror> {
    primary: C,
    fallback: C,
    signer: Address,
    tallies: TallyStore<S>,
    mirror: Option<Arc<M>>,
    voted: RwLock<HashSet<u64>>,
}

impl<C, S, M> Client<C, S, M>
where
    C: PollContract,
    S: Store,
    M: AuditMirror,
{
    pub fn new(
        primary: C,
        fallback: C,
        signer: Address,
        store: S,
        mirror: Option<M>,
    ) -> Self {
        Self {
            primary,
            fallback,
            signer,
            tallies: TallyStore::new(store),
            mirror: mirror.map(Arc::new),
            voted: RwLock::new(HashSet::new()),
        }
    }

    pub fn signer(&self) -> &Address {
        &self.signer
    }

    pub(crate) fn primary(&self) -> &C {
        &self.primary
    }

    pub(crate) fn fallback(&self) -> &C {
        &self.fallback
    }

    pub(crate) fn tallies(&self) -> &TallyStore<S> {
        &self.tallies
    }

    /// Conservative voter check: a locally confirmed vote stays sticky
    /// even when the contract cannot answer. A missing `hasVoted` entry
    /// point defaults to false quietly; an errored check defaults to
    /// false as a degraded read.
    pub(crate) async fn signer_has_voted(&self, poll_id: u64) -> bool {
        if self.voted.read().await.contains(&poll_id) {
            return true;
        }
        let surface = match surface::resolve(
            &self.primary,
            &self.fallback,
            &[Method::HasVoted],
        ) {
            Ok(surface) => surface,
            Err(_) => return false,
        };
        match surface.has_voted(poll_id, &self.signer).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!("degraded voter check for poll {}: {}", poll_id, e);
                false
            }
        }
    }

    pub(crate) async fn mark_voted(&self, poll_id: u64) {
        self.voted.write().await.insert(poll_id);
    }
}

impl<C, S, M> Client<C, S, M>
where
    C: PollContract,
    S: Store,
    M: AuditMirror + 'static,
{
    /// Detached best-effort write; the result is observed only here.
    pub(crate) fn mirror_poll(&self, record: NewPollRecord) {
        if let Some(mirror) = &self.mirror {
            let mirror = Arc::clone(mirror);
            task::spawn(async move {
                if let Err(e) = mirror.create_poll(&record).await {
                    warn!("audit mirror create failed: {}", e);
                }
            });
        }
    }

    /// Detached best-effort write; the result is observed only here.
    pub(crate) fn mirror_vote(&self, record: VoteRecord) {
        if let Some(mirror) = &self.mirror {
            let mirror = Arc::clone(mirror);
            task::spawn(async move {
                if let Err(e) = mirror.record_vote(&record).await {
                    warn!("audit mirror vote failed: {}", e);
                }
            });
        }
    }
}
