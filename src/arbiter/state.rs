//! Registered arbitration state and per-cycle inputs.
//!
//! The state is a flat value type committed atomically at each cycle
//! boundary; nothing else in the crate mutates it. While inactive, the
//! owner field keeps serving as the rotation pointer so fairness survives
//! idle gaps.

use super::ClientId;

/// Inputs sampled together for one arbitration cycle.
///
/// Bit *i* of each mask belongs to client *i*. Inputs are transient: they
/// feed exactly one step and are never retained past it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleInputs {
    /// Request bit per client.
    pub req: u64,
    /// Lock bit per client; honored only for the current owner.
    pub lock: u64,
}

impl CycleInputs {
    /// Create inputs from raw masks.
    #[inline]
    pub fn new(req: u64, lock: u64) -> Self {
        Self { req, lock }
    }

    /// Create inputs from lists of client indices.
    pub fn from_sets(req: &[ClientId], lock: &[ClientId]) -> Self {
        Self {
            req: mask_of(req),
            lock: mask_of(lock),
        }
    }
}

/// Build a bitmask from a list of client indices.
pub fn mask_of(clients: &[ClientId]) -> u64 {
    clients.iter().fold(0u64, |mask, &c| mask | (1u64 << c))
}

/// Registered arbitration state carried across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterState {
    /// Whether any client currently owns the bus.
    pub active: bool,
    /// Owner while active; rotation pointer for the next search otherwise.
    pub owner: ClientId,
    /// Extra cycles the owner may still hold without re-justification.
    /// Meaningful only while active.
    pub credit: u32,
}

impl ArbiterState {
    /// Initial state: inactive, pointer parked on the last client so the
    /// first search starts at client 0.
    pub fn parked(num_clients: usize) -> Self {
        Self {
            active: false,
            owner: (num_clients - 1) as ClientId,
            credit: 0,
        }
    }

    /// Retention test: the owner keeps the bus while it still requests
    /// and either holds its lock or has credit left.
    ///
    /// Lock bits of non-owner clients never participate.
    #[inline]
    pub fn retains(&self, inputs: &CycleInputs) -> bool {
        if !self.active {
            return false;
        }
        let own = 1u64 << self.owner;
        inputs.req & own != 0 && (inputs.lock & own != 0 || self.credit > 0)
    }
}

/// Committed decision for one cycle.
///
/// Produced by the state commit at step *t* and externally visible from
/// then until the next commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// Granted client, if any.
    pub owner: Option<ClientId>,
    /// One-hot grant vector; zero when idle.
    pub mask: u64,
}

impl Grant {
    /// Grant to a single client.
    #[inline]
    pub fn to(client: ClientId) -> Self {
        Self {
            owner: Some(client),
            mask: 1u64 << client,
        }
    }

    /// No owner this cycle.
    #[inline]
    pub fn idle() -> Self {
        Self { owner: None, mask: 0 }
    }

    /// Build the grant from a committed state.
    #[inline]
    pub fn from_state(state: &ArbiterState) -> Self {
        if state.active {
            Self::to(state.owner)
        } else {
            Self::idle()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parked_state() {
        let state = ArbiterState::parked(4);
        assert!(!state.active);
        assert_eq!(state.owner, 3);
        assert_eq!(state.credit, 0);
    }

    #[test]
    fn test_idle_never_retains() {
        let state = ArbiterState::parked(4);
        let inputs = CycleInputs::new(0xF, 0xF);
        assert!(!state.retains(&inputs));
    }

    #[test]
    fn test_retains_on_credit() {
        let state = ArbiterState { active: true, owner: 1, credit: 2 };
        assert!(state.retains(&CycleInputs::new(0b0010, 0)));
    }

    #[test]
    fn test_retains_on_lock_without_credit() {
        let state = ArbiterState { active: true, owner: 1, credit: 0 };
        assert!(state.retains(&CycleInputs::new(0b0010, 0b0010)));
    }

    #[test]
    fn test_drop_fails_retention_despite_lock_and_credit() {
        let state = ArbiterState { active: true, owner: 1, credit: 7 };
        assert!(!state.retains(&CycleInputs::new(0b0001, 0b0010)));
    }

    #[test]
    fn test_exhausted_unlocked_fails_retention() {
        let state = ArbiterState { active: true, owner: 1, credit: 0 };
        assert!(!state.retains(&CycleInputs::new(0b0010, 0)));
    }

    #[test]
    fn test_non_owner_lock_ignored_by_retention() {
        let state = ArbiterState { active: true, owner: 1, credit: 0 };
        // Client 3 locking does not save client 1.
        assert!(!state.retains(&CycleInputs::new(0b0010, 0b1000)));
    }

    #[test]
    fn test_inputs_from_sets() {
        let inputs = CycleInputs::from_sets(&[0, 2], &[2]);
        assert_eq!(inputs.req, 0b0101);
        assert_eq!(inputs.lock, 0b0100);
    }

    #[test]
    fn test_grant_from_state() {
        let granted = ArbiterState { active: true, owner: 5, credit: 0 };
        assert_eq!(Grant::from_state(&granted), Grant::to(5));
        assert_eq!(Grant::from_state(&granted).mask, 1 << 5);

        let idle = ArbiterState { active: false, owner: 5, credit: 0 };
        assert_eq!(Grant::from_state(&idle), Grant::idle());
        assert_eq!(Grant::from_state(&idle).mask, 0);
    }
}
