use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Student,
    Instructor,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Instructor => "instructor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(ActorRole::Student),
            "instructor" => Some(ActorRole::Instructor),
            _ => None,
        }
    }
}

/// The authenticated caller, as asserted by the auth gateway in front of this
/// service. The engine only ever authorizes an actor against the party ids on
/// the booking itself.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}
