//! # XC Relay Test Suite
//!
//! Cross-module scenarios for the relay engine.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Relay harness with in-memory adapters and sink
//! └── integration/      # Scenarios per engine concern
//!     ├── quorum.rs     # Safety, liveness, sessions, recovery
//!     ├── outbound.rs   # Batching, reentrancy, fan-out
//!     ├── fees.rs       # Subsidy, underpayment, repay
//!     ├── deliveries.rs # Failure isolation, retry
//!     └── round_trip.rs # Two relays wired through their adapters
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p xc-tests
//!
//! # By category
//! cargo test -p xc-tests integration::quorum::
//!
//! # Benchmarks
//! cargo bench -p xc-tests
//! ```

#![allow(dead_code)]
