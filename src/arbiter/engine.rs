//! The arbitration engine.
//!
//! [`BusArbiter`] owns the configuration, the registered state, and the
//! run statistics, advancing strictly one cycle per [`BusArbiter::step`]
//! call. Each step is a pure, total computation over the current state and
//! the sampled inputs, followed by an atomic commit; the accessors report
//! the committed decision until the next step, which gives the same
//! one-cycle registered-output discipline as a clocked grant register.
//!
//! # Usage
//!
//! ```ignore
//! let config = ArbiterConfig::new(4, 4, vec![1, 3, 0, 0])?;
//! let mut arb = BusArbiter::new(config);
//!
//! let grant = arb.step(&CycleInputs::new(0b1111, 0));
//! assert_eq!(grant.owner, Some(0));
//! ```

use crate::config::ArbiterConfig;

use super::search::next_requester;
use super::state::{ArbiterState, CycleInputs, Grant};
use super::ClientId;

/// Counters accumulated across a run.
///
/// Cleared by [`BusArbiter::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArbiterStats {
    /// Total cycles stepped.
    pub cycles: u64,
    /// Granted cycles per client.
    pub grants: Vec<u64>,
    /// Ownership acquisitions: grants issued after idle or to a client
    /// other than the previous owner.
    pub rotations: u64,
    /// Cycles with no owner.
    pub idle_cycles: u64,
    /// Granted cycles during which the owner held its lock.
    pub locked_cycles: u64,
}

impl ArbiterStats {
    fn new(num_clients: usize) -> Self {
        Self {
            grants: vec![0; num_clients],
            ..Default::default()
        }
    }
}

/// Weighted round-robin bus arbiter.
///
/// The engine is the sole writer of its state; share it between stepping
/// threads only with external linearization around each step.
#[derive(Debug, Clone)]
pub struct BusArbiter {
    /// Static configuration (client count, weight width, weight table).
    config: ArbiterConfig,
    /// Registered state, committed at each step boundary.
    state: ArbiterState,
    /// Run statistics.
    stats: ArbiterStats,
}

impl BusArbiter {
    /// Create an arbiter in the reset state for the given configuration.
    pub fn new(config: ArbiterConfig) -> Self {
        let state = ArbiterState::parked(config.num_clients());
        let stats = ArbiterStats::new(config.num_clients());
        Self { config, state, stats }
    }

    /// Force the initial state: inactive, pointer parked on the last
    /// client, credit cleared. Statistics are cleared too. Invocable at
    /// any step boundary.
    pub fn reset(&mut self) {
        self.state = ArbiterState::parked(self.config.num_clients());
        self.stats = ArbiterStats::new(self.config.num_clients());
        log::debug!("arbiter reset, pointer parked at {}", self.state.owner);
    }

    /// Advance one cycle: decide retention or rotation from the sampled
    /// inputs, commit the new state, and return the committed grant.
    ///
    /// Panics if a request or lock bit is set for an index outside
    /// `[0, num_clients)`; that is a caller contract violation, rejected
    /// at the boundary rather than tolerated internally.
    pub fn step(&mut self, inputs: &CycleInputs) -> Grant {
        let valid = self.config.client_mask();
        assert!(
            inputs.req & !valid == 0 && inputs.lock & !valid == 0,
            "request/lock bit set for client outside [0, {})",
            self.config.num_clients()
        );

        let prev = self.state;
        let next = if prev.retains(inputs) {
            // Credit burns down every retained cycle, locked or not, so a
            // lock release after exhaustion forces rotation immediately.
            ArbiterState {
                active: true,
                owner: prev.owner,
                credit: prev.credit.saturating_sub(1),
            }
        } else {
            match next_requester(prev.owner, inputs.req, self.config.num_clients()) {
                Some(c) => ArbiterState {
                    active: true,
                    owner: c,
                    credit: self.config.weight_of(c),
                },
                None => ArbiterState {
                    active: false,
                    owner: prev.owner,
                    credit: 0,
                },
            }
        };

        log::trace!(
            "cycle {}: req={:#06b} lock={:#06b} -> active={} owner={} credit={}",
            self.stats.cycles,
            inputs.req,
            inputs.lock,
            next.active,
            next.owner,
            next.credit
        );

        self.stats.cycles += 1;
        if next.active {
            if !prev.active || prev.owner != next.owner {
                log::debug!(
                    "grant rotates to client {} (credit {})",
                    next.owner,
                    next.credit
                );
                self.stats.rotations += 1;
            }
            self.stats.grants[next.owner as usize] += 1;
            if inputs.lock & (1u64 << next.owner) != 0 {
                self.stats.locked_cycles += 1;
            }
        } else {
            self.stats.idle_cycles += 1;
        }

        self.state = next;
        Grant::from_state(&next)
    }

    /// Replace the weight table between steps.
    pub fn set_weights(&mut self, weights: Vec<u32>) -> Result<(), crate::config::ConfigError> {
        self.config.set_weights(weights)
    }

    /// Committed owner, if any.
    #[inline]
    pub fn owner(&self) -> Option<ClientId> {
        self.state.active.then_some(self.state.owner)
    }

    /// Committed one-hot grant vector (zero when idle).
    #[inline]
    pub fn grant_mask(&self) -> u64 {
        if self.state.active {
            1u64 << self.state.owner
        } else {
            0
        }
    }

    /// Committed state snapshot.
    #[inline]
    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Static configuration.
    #[inline]
    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Run statistics.
    #[inline]
    pub fn stats(&self) -> &ArbiterStats {
        &self.stats
    }
}
