use crate::{
    contract::PollContract,
    error::{
        Error,
        Result,
    },
};

/// Entry points the client may require from a deployed contract.
///
/// A deployment is not trusted to expose all of these; every operation
/// names the subset it needs and resolves a handle first.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    GetPolls,
    GetTotalPolls,
    GetPoll,
    GetPollOptions,
    HasVoted,
    CreatePoll,
    VoteOnPoll,
    VotedEvents,
}

pub const BULK_READ: &[Method] = &[Method::GetPolls];

pub const INDEXED_READ: &[Method] = &[
    Method::GetTotalPolls,
    Method::GetPoll,
    Method::GetPollOptions,
];

/// Which read path the resolved surfaces can serve, decided fresh on
/// every load since a network switch can change which address is live.
pub enum ReadSurface<'a, C> {
    Bulk(&'a C),
    Indexed(&'a C),
    Unavailable,
}

/// Select the first handle exposing the full required method set,
/// preferring the primary address.
pub fn resolve<'a, C: PollContract>(
    primary: &'a C,
    fallback: &'a C,
    required: &[Method],
) -> Result<&'a C> {
    if supports_all(primary, required) {
        Ok(primary)
    } else if supports_all(fallback, required) {
        Ok(fallback)
    } else {
        Err(Error::SurfaceUnavailable)
    }
}

pub fn negotiate_read<'a, C: PollContract>(
    primary: &'a C,
    fallback: &'a C,
) -> ReadSurface<'a, C> {
    if let Ok(surface) = resolve(primary, fallback, BULK_READ) {
        ReadSurface::Bulk(surface)
    } else if let Ok(surface) = resolve(primary, fallback, INDEXED_READ) {
        ReadSurface::Indexed(surface)
    } else {
        ReadSurface::Unavailable
    }
}

fn supports_all<C: PollContract>(surface: &C, required: &[Method]) -> bool {
    required.iter().all(|method| surface.supports(*method))
}
