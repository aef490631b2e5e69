use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::ResultSnapshot;
use crate::time::Timestamp;
use crate::ElectionError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(nanoid::nanoid!())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids are used as sled key prefixes and must not embed the key separator.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(ElectionError::InvalidRequest("election id cannot be empty".into()).into());
        }
        if self.0.contains('\0') {
            return Err(ElectionError::InvalidRequest(
                "election id cannot contain NUL characters".into(),
            )
            .into());
        }
        Ok(())
    }
}

impl fmt::Display for ElectionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle phases, in their only legal order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectionStatus {
    Created = 0,
    Registration = 1,
    Voting = 2,
    Ended = 3,
    ResultDeclared = 4,
}

impl ElectionStatus {
    pub const ALL: [ElectionStatus; 5] = [
        ElectionStatus::Created,
        ElectionStatus::Registration,
        ElectionStatus::Voting,
        ElectionStatus::Ended,
        ElectionStatus::ResultDeclared,
    ];

    /// The only status `advance` may move to from `self`.
    pub fn successor(self) -> Option<ElectionStatus> {
        match self {
            ElectionStatus::Created => Some(ElectionStatus::Registration),
            ElectionStatus::Registration => Some(ElectionStatus::Voting),
            ElectionStatus::Voting => Some(ElectionStatus::Ended),
            ElectionStatus::Ended => Some(ElectionStatus::ResultDeclared),
            ElectionStatus::ResultDeclared => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ElectionStatus::ResultDeclared
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElectionStatus::Created => "Created",
            ElectionStatus::Registration => "Registration",
            ElectionStatus::Voting => "Voting",
            ElectionStatus::Ended => "Ended",
            ElectionStatus::ResultDeclared => "ResultDeclared",
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub name: String,
    pub description: String,
    pub registration_deadline: Timestamp,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Authoritative phase. Only the lifecycle state machine writes it.
    pub status: ElectionStatus,
    pub creator: String,
    pub created_at: Timestamp,
    /// Tally frozen on entry into `ResultDeclared`.
    pub results: Option<ResultSnapshot>,
}

/// Typed payload for creating an election.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateElectionRequest {
    /// Externally assigned id; generated when absent.
    pub id: Option<ElectionId>,
    pub name: String,
    pub description: String,
    pub registration_deadline: Timestamp,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl CreateElectionRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.id {
            id.validate()?;
        }
        if self.name.trim().is_empty() {
            return Err(ElectionError::InvalidRequest("election name cannot be empty".into()).into());
        }
        if self.registration_deadline >= self.start_time {
            return Err(ElectionError::InvalidRequest(format!(
                "registration_deadline {} must be before start_time {}",
                self.registration_deadline, self.start_time
            ))
            .into());
        }
        if self.start_time >= self.end_time {
            return Err(ElectionError::InvalidRequest(format!(
                "start_time {} must be before end_time {}",
                self.start_time, self.end_time
            ))
            .into());
        }
        Ok(())
    }

    pub(crate) fn into_election(
        self,
        creator: String,
        created_at: Timestamp,
    ) -> Election {
        Election {
            id: self.id.unwrap_or_else(ElectionId::generate),
            name: self.name,
            description: self.description,
            registration_deadline: self.registration_deadline,
            start_time: self.start_time,
            end_time: self.end_time,
            status: ElectionStatus::Created,
            creator,
            created_at,
            results: None,
        }
    }
}
