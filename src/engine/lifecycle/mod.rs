//! Election phase state machine.
//!
//! The persisted status is the only authority for votes and approvals. The clock-derived phase
//! in [`derive_phase_from_clock`] is a display estimate and is never consulted by a rule.

mod phase;
mod state_machine;

pub use phase::*;
pub use state_machine::*;

#[cfg(test)]
mod state_machine_test;

use crate::Actor;
use crate::Election;
use crate::ElectionError;
use crate::Result;

/// Fails with `Unauthorized` unless `actor` may manage `election`.
pub(crate) fn authorize(
    actor: &Actor,
    election: &Election,
    action: &'static str,
) -> Result<()> {
    if actor.can_manage(election) {
        return Ok(());
    }
    Err(ElectionError::Unauthorized {
        actor: actor.to_string(),
        action,
        election_id: election.id.clone(),
    }
    .into())
}
