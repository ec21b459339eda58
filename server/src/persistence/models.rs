use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. The password hash lives only in [`UserCredentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user together with the stored argon2 hash, used only for sign-in.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// A profile card owned by a user.
///
/// `icon_ref` is the storage reference of the icon (a local file name or a
/// hosted URL), never a client-facing URL.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub icon_ref: Option<String>,
    pub aka: Option<String>,
    pub hometown: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub hobby: Option<String>,
    pub comment: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub user_id: i64,
    pub display_name: String,
    pub icon_ref: Option<String>,
    pub aka: Option<String>,
    pub hometown: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub hobby: Option<String>,
    pub comment: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A free-form titled entry attached to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OptionProfile {
    pub id: i64,
    pub profile_id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewOptionProfile {
    pub profile_id: i64,
    pub title: String,
    pub content: String,
}

/// A social link shown on a profile.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Link {
    pub id: i64,
    pub profile_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLink {
    pub profile_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub image_ref: Option<String>,
}

/// Approval state of a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
        }
    }

    /// Whether a request may be moved into this state by its recipient.
    pub fn is_decision(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ConnectionStatus::Pending),
            "accepted" => Ok(ConnectionStatus::Accepted),
            "rejected" => Ok(ConnectionStatus::Rejected),
            other => Err(format!("invalid connection status: {other}")),
        }
    }
}

/// A directed connection request from one profile to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: i64,
    pub requester_profile_id: i64,
    pub target_profile_id: i64,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a committed cascade delete removed. Storage references are handed
/// to the cleanup task after commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedProfile {
    pub icon_ref: Option<String>,
    pub link_image_refs: Vec<String>,
    pub option_profiles: u64,
    pub connections: u64,
    pub links: u64,
}
