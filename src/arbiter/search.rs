//! Candidate search: the rotation scan.
//!
//! Finds the next requesting client strictly downstream of the rotation
//! pointer in circular order. Priority is by circular distance from the
//! pointer, so the immediate next client in rotation order always beats
//! farther ones; the pointer itself sits at distance `n` and is reached
//! only when nobody else requests.

use super::ClientId;

/// Find the nearest requesting client after `pointer` in circular order.
///
/// Scans `pointer+1, pointer+2, ..., pointer+n` modulo `n` and returns
/// the first index whose bit is set in `req`, or `None` when no request
/// bit below `n` is set.
pub fn next_requester(pointer: ClientId, req: u64, n: usize) -> Option<ClientId> {
    debug_assert!((pointer as usize) < n);

    for dist in 1..=n {
        let idx = (pointer as usize + dist) % n;
        if req & (1u64 << idx) != 0 {
            return Some(idx as ClientId);
        }
    }
    None
}
