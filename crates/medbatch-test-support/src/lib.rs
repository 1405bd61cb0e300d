//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (input trees on disk), mocks.rs (httpmock-backed inference service),
//! fakes.rs (in-memory workflow and transfer implementations).
#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

pub mod fakes;
pub mod fixtures;
pub mod mocks;
