use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::Election;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Authority over every election
    Administrator,
    /// Authority over the elections it created
    Organizer,
    Voter,
}

/// Already-authenticated caller of a privileged operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub identity: String,
    pub role: Role,
}

impl Actor {
    pub fn administrator(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            role: Role::Administrator,
        }
    }

    pub fn organizer(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            role: Role::Organizer,
        }
    }

    pub fn voter(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            role: Role::Voter,
        }
    }

    pub fn can_create_elections(&self) -> bool {
        matches!(self.role, Role::Administrator | Role::Organizer)
    }

    /// Management rights gate `advance`, candidate decisions and result declaration.
    pub fn can_manage(
        &self,
        election: &Election,
    ) -> bool {
        match self.role {
            Role::Administrator => true,
            Role::Organizer => election.creator == self.identity,
            Role::Voter => false,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let role = match self.role {
            Role::Administrator => "admin",
            Role::Organizer => "organizer",
            Role::Voter => "voter",
        };
        write!(f, "{}:{}", role, self.identity)
    }
}
