//! Connection request workflow between profiles.
//!
//! A request creates a `pending` row from the requester's profile to the
//! target profile. The target's owner moves it to `accepted` or `rejected`.
//! Two profiles are *mutual* when both directed rows are `accepted`.
//!
//! ```text
//!            request            decide
//!   (none) ──────────▶ pending ─────────▶ accepted | rejected
//!                                  ▲            │
//!                                  └── decide ──┘
//! ```
//!
//! Re-deciding an already decided request is allowed. The ordered pair is
//! unique; a second request in the same direction is a conflict.

use std::sync::Arc;
use std::time::Duration;

use crate::persistence::traits::{ConnectionRepository, ProfileRepository};
use crate::persistence::{with_timeout, Connection, ConnectionStatus, Persistence, PersistenceError};

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("profile {0} not found")]
    ProfileNotFound(i64),
    #[error("connection not found")]
    NotFound,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("connection already exists")]
    AlreadyExists,
    #[error(transparent)]
    Persistence(PersistenceError),
}

impl From<PersistenceError> for ConnectionError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Duplicate(_) => ConnectionError::AlreadyExists,
            other => ConnectionError::Persistence(other),
        }
    }
}

pub struct ConnectionManager<D: Persistence> {
    store: Arc<D>,
    timeout: Duration,
}

impl<D: Persistence> ConnectionManager<D> {
    pub fn new(store: Arc<D>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Send a request from `from` (owned by `caller`) to `to`.
    pub async fn request(
        &self,
        caller: i64,
        from: i64,
        to: i64,
    ) -> Result<Connection, ConnectionError> {
        if from <= 0 || to <= 0 {
            return Err(ConnectionError::InvalidInput("profile ids must be positive"));
        }
        if from == to {
            return Err(ConnectionError::InvalidInput("a profile cannot connect to itself"));
        }

        let owner = self.owner_of(from).await?;
        self.owner_of(to).await?;
        if owner != caller {
            return Err(ConnectionError::Forbidden(
                "only the owner of the requesting profile can send a request",
            ));
        }

        let connection = with_timeout(
            self.timeout,
            self.store.connections().create_connection(from, to),
        )
        .await?;
        tracing::info!(
            connection_id = connection.id,
            from,
            to,
            "connection requested"
        );
        Ok(connection)
    }

    /// Accept or reject a request. Only the target profile's owner decides.
    pub async fn decide(
        &self,
        caller: i64,
        id: i64,
        status: ConnectionStatus,
    ) -> Result<Connection, ConnectionError> {
        if !status.is_decision() {
            return Err(ConnectionError::InvalidInput("status must be accepted or rejected"));
        }

        let existing = self.get(id).await?;
        if self.owner_of(existing.target_profile_id).await? != caller {
            return Err(ConnectionError::Forbidden(
                "only the owner of the requested profile can decide",
            ));
        }

        let updated = with_timeout(
            self.timeout,
            self.store.connections().update_status(id, status),
        )
        .await?
        .ok_or(ConnectionError::NotFound)?;
        tracing::info!(connection_id = id, status = %status, "connection decided");
        Ok(updated)
    }

    pub async fn get(&self, id: i64) -> Result<Connection, ConnectionError> {
        with_timeout(self.timeout, self.store.connections().get_connection(id))
            .await?
            .ok_or(ConnectionError::NotFound)
    }

    /// Every request the profile sent or received, newest first.
    pub async fn list(&self, profile_id: i64) -> Result<Vec<Connection>, ConnectionError> {
        if profile_id <= 0 {
            return Err(ConnectionError::InvalidInput("profile_id must be positive"));
        }
        let connections = with_timeout(
            self.timeout,
            self.store.connections().list_connections(profile_id),
        )
        .await?;
        Ok(connections)
    }

    /// True when both directed requests between `a` and `b` are accepted.
    pub async fn is_mutual(&self, a: Option<i64>, b: Option<i64>) -> Result<bool, ConnectionError> {
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) if a > 0 && b > 0 => (a, b),
            _ => return Err(ConnectionError::InvalidInput("user1 and user2 are required")),
        };

        let accepted = with_timeout(
            self.timeout,
            self.store.connections().accepted_between(a, b),
        )
        .await?;
        let forward = accepted
            .iter()
            .any(|c| c.requester_profile_id == a && c.target_profile_id == b);
        let backward = accepted
            .iter()
            .any(|c| c.requester_profile_id == b && c.target_profile_id == a);
        Ok(forward && backward)
    }

    /// Remove a connection. Either side's owner may delete it.
    pub async fn delete(&self, caller: i64, id: i64) -> Result<(), ConnectionError> {
        let existing = self.get(id).await?;
        let requester_owner = self.owner_of(existing.requester_profile_id).await?;
        if requester_owner != caller && self.owner_of(existing.target_profile_id).await? != caller {
            return Err(ConnectionError::Forbidden(
                "only the owners of either profile can delete a connection",
            ));
        }

        if !with_timeout(self.timeout, self.store.connections().delete_connection(id)).await? {
            return Err(ConnectionError::NotFound);
        }
        tracing::info!(connection_id = id, "connection deleted");
        Ok(())
    }

    async fn owner_of(&self, profile_id: i64) -> Result<i64, ConnectionError> {
        with_timeout(self.timeout, self.store.profiles().get_profile(profile_id))
            .await?
            .map(|p| p.user_id)
            .ok_or(ConnectionError::ProfileNotFound(profile_id))
    }
}
