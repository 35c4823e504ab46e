use crate::surface::Method;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no contract surface exposes the required methods")]
    SurfaceUnavailable,
    #[error("method {0:?} is not exposed by this contract surface")]
    MethodMissing(Method),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("transaction reverted on chain")]
    OnChainRevert,
    #[error("Account address cannot be parsed from string")]
    AddressParseFail,
    #[error(transparent)]
    Store(#[from] sled::Error),
    #[error(transparent)]
    Codec(#[from] serde_json::Error),
    #[error("poll title must not be empty")]
    EmptyTitle,
    #[error("every poll option needs a label")]
    EmptyOption,
    #[error("a poll needs at least two options")]
    TooFewOptions,
    #[error("poll start must precede poll end")]
    InvalidWindow,
}

pub type Result<T> = core::result::Result<T, Error>;
