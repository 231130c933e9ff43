//! Fake review host
//!
//! An in-process stand-in for the code-review host with configurable
//! failures, used to exercise the skip resolver's partial-failure paths.

mod failure;
mod host;

pub use failure::{FailureConfig, FailureInjector, HostOperation};
pub use host::{FakeHost, PostedComment, StatusWrite};
