//! Test infrastructure for the request path.
//!
//! | Module | Covers |
//! |--------|--------|
//! | `forwarding` | translate-then-forward, error relay, property decoding |
//! | `completion` | exactly-once completion and abandoned requests |

pub mod mocks;

pub use mocks::{MockPidMapper, MockRealtimeKit, RtkitCall};
