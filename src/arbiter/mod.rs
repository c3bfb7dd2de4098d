//! Weighted round-robin bus arbitration.
//!
//! This module implements the arbitration core: one client at a time owns
//! a shared resource (bus, memory port, NoC link), chosen each cycle by a
//! rotating search and held across cycles by a weight credit or an
//! owner-only atomic lock.
//!
//! # Architecture
//!
//! ```text
//!  req ────┬──────────────────────────────┐
//!  lock ───┼───────────────┐              │
//!          │               ▼              ▼
//!          │        ┌─────────────┐  ┌──────────────┐
//!          │        │  Retention  │  │  Candidate   │
//!          └───────►│    test     │  │   search     │
//!                   └──────┬──────┘  └──────┬───────┘
//!                          │ keep           │ rotate
//!                          ▼                ▼
//!                   ┌──────────────────────────────┐
//!                   │  {active, owner, credit}     │──► grant (one-hot)
//!                   └──────────────────────────────┘
//! ```
//!
//! Per cycle: the owner keeps the bus while it still requests and either
//! holds its lock or has credit left; otherwise the search scans the ring
//! from the rotation pointer and the nearest requester takes over with a
//! fresh credit equal to its configured weight. No requester means the bus
//! goes idle with the pointer parked where it was.

pub mod engine;
pub mod search;
pub mod state;

pub use engine::{ArbiterStats, BusArbiter};
pub use search::next_requester;
pub use state::{ArbiterState, CycleInputs, Grant};

/// Maximum number of clients (request/lock/grant vectors are `u64` masks).
pub const MAX_CLIENTS: usize = 64;

/// Maximum weight bit width (credits live in a `u32`).
pub const MAX_WEIGHT_WIDTH: u32 = 32;

/// Client identifier: an index into the request/lock/grant vectors.
pub type ClientId = u8;
