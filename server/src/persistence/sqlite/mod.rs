//! SQLite-backed repository implementations.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer and multiple concurrent readers.
//! - **Foreign keys enabled**: enforced at the connection level, so child
//!   rows must be removed before their profile.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   automatically when [`Database::open`] is called.
//!
//! ## Repository types
//!
//! Each `Sqlite*Repository` holds a clone of the pool and implements the
//! corresponding trait from [`crate::persistence::traits`]:
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteUserRepository`] | `UserRepository` |
//! | [`SqliteProfileRepository`] | `ProfileRepository` |
//! | [`SqliteOptionProfileRepository`] | `OptionProfileRepository` |
//! | [`SqliteLinkRepository`] | `LinkRepository` |
//! | [`SqliteConnectionRepository`] | `ConnectionRepository` |
//!
//! [`SqlitePersistence`] bundles all five as the production [`Persistence`].
//!
//! Connection status is stored as `TEXT` under a CHECK constraint and
//! round-tripped through the helpers in [`helpers`]. Uniqueness of the
//! ordered connection pair and of user emails is enforced by the schema.

mod connection_repo;
mod database;
pub(crate) mod helpers;
#[cfg(test)]
mod integration_tests;
mod link_repo;
mod option_profile_repo;
mod profile_repo;
mod user_repo;

pub use connection_repo::SqliteConnectionRepository;
pub use database::Database;
pub use link_repo::SqliteLinkRepository;
pub use option_profile_repo::SqliteOptionProfileRepository;
pub use profile_repo::SqliteProfileRepository;
pub use user_repo::SqliteUserRepository;

use crate::persistence::Persistence;

/// All repositories over one shared pool.
pub struct SqlitePersistence {
    users: SqliteUserRepository,
    profiles: SqliteProfileRepository,
    option_profiles: SqliteOptionProfileRepository,
    links: SqliteLinkRepository,
    connections: SqliteConnectionRepository,
}

impl SqlitePersistence {
    pub fn new(db: &Database) -> Self {
        let pool = db.pool();
        Self {
            users: SqliteUserRepository::new(pool.clone()),
            profiles: SqliteProfileRepository::new(pool.clone()),
            option_profiles: SqliteOptionProfileRepository::new(pool.clone()),
            links: SqliteLinkRepository::new(pool.clone()),
            connections: SqliteConnectionRepository::new(pool.clone()),
        }
    }
}

impl Persistence for SqlitePersistence {
    type Users = SqliteUserRepository;
    type Profiles = SqliteProfileRepository;
    type OptionProfiles = SqliteOptionProfileRepository;
    type Links = SqliteLinkRepository;
    type Connections = SqliteConnectionRepository;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn profiles(&self) -> &Self::Profiles {
        &self.profiles
    }

    fn option_profiles(&self) -> &Self::OptionProfiles {
        &self.option_profiles
    }

    fn links(&self) -> &Self::Links {
        &self.links
    }

    fn connections(&self) -> &Self::Connections {
        &self.connections
    }
}
