use crate::time::Timestamp;
use crate::Election;
use crate::ElectionStatus;

/// Soft phase view from the election's timestamps.
///
/// Past `end_time` the estimate is `Ended`, past `start_time` it is `Voting`; before that the
/// timestamps say nothing beyond the persisted status. The estimate never runs behind the
/// persisted status, so a declared election keeps reporting `ResultDeclared`.
pub fn derive_phase_from_clock(
    election: &Election,
    now: Timestamp,
) -> ElectionStatus {
    let estimate = if now >= election.end_time {
        ElectionStatus::Ended
    } else if now >= election.start_time {
        ElectionStatus::Voting
    } else {
        election.status
    };
    estimate.max(election.status)
}
