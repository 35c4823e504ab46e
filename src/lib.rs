//! Client-side reconciliation engine for the VoteX poll contract:
//! derives canonical poll state from the contract's disagreeing read
//! surfaces and a locally persisted tally cache, and drives the
//! one-vote-per-signer submission pipeline.

mod error;
// export the error taxonomy for the host application
pub use error::{
    Error,
    Result,
};
pub mod client;
pub mod contract;
pub mod mirror;
pub mod poll;
pub mod store;
pub mod surface;
pub mod tally;
pub mod vote;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::Client;
pub use poll::PollClient;
pub use vote::VoteClient;
