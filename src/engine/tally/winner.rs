use crate::Result;
use crate::TallyError;
use crate::TallyReport;
use crate::WinnerResolution;

/// Picks the candidate with the most votes.
///
/// Ties go to the numerically smallest candidate id among the tied set; `is_tie` tells callers
/// the mandate came from the tie-break rule.
pub fn resolve_winner_from(report: &TallyReport) -> Result<WinnerResolution> {
    let max = report
        .counts
        .values()
        .copied()
        .max()
        .ok_or(TallyError::NoCandidates)?;

    // BTreeMap iteration is ascending by candidate id
    let tied_candidates: Vec<_> = report
        .counts
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(id, _)| *id)
        .collect();

    Ok(WinnerResolution {
        election_id: report.election_id.clone(),
        winner_candidate_id: tied_candidates[0],
        vote_count: max,
        total_votes: report.total_votes,
        is_tie: tied_candidates.len() > 1,
        tied_candidates,
    })
}
