// -
// Database namespaces

/// Sled tree namespaces
pub(crate) const ELECTIONS_TREE: &str = "_elections";
pub(crate) const CANDIDATES_TREE: &str = "_candidates";
/// (election, applicant identity) -> candidate id, backs the duplicate-candidacy check
pub(crate) const APPLICANTS_TREE: &str = "_candidate_applicants";
/// election -> next candidate id
pub(crate) const CANDIDATE_SEQUENCE_TREE: &str = "_candidate_sequence";
/// (election, voter) -> ballot; the key is the one-vote-per-voter uniqueness constraint
pub(crate) const BALLOTS_TREE: &str = "_ballots";
/// (election, candidate) -> cached vote count
pub(crate) const VOTE_COUNTERS_TREE: &str = "_vote_counters";

/// Sled directory under the configured root
pub(crate) const ELECTION_DB_DIR: &str = "election_store";

/// First id handed out by the per-election candidate sequence
pub(crate) const FIRST_CANDIDATE_ID: u64 = 1;
