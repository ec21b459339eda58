//! Async repository trait definitions for the persistence layer.
//!
//! Each trait abstracts over one aggregate. [`Persistence`] bundles the five
//! repositories behind associated types so the HTTP layer and the managers
//! are generic over the store (static dispatch).
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which axum handlers and `tokio::spawn`
//! require.

use std::future::Future;

use super::{
    Connection, ConnectionStatus, DeletedProfile, Link, NewLink, NewOptionProfile, NewProfile,
    NewUser, OptionProfile, PersistenceError, Profile, User, UserCredentials,
};

/// Repository for user accounts.
///
/// `create_user` must report an already-registered email as
/// [`PersistenceError::Duplicate`].
pub trait UserRepository: Send + Sync {
    fn create_user(
        &self,
        user: &NewUser,
    ) -> impl Future<Output = Result<User, PersistenceError>> + Send;
    fn get_user(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<User>, PersistenceError>> + Send;
    fn find_credentials(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserCredentials>, PersistenceError>> + Send;
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, PersistenceError>> + Send;
}

/// Repository for profiles.
///
/// `delete_profile_cascade` removes the profile together with its option
/// profiles, connections (either side) and links in a single transaction.
/// It returns `None` when the profile did not exist.
pub trait ProfileRepository: Send + Sync {
    fn create_profile(
        &self,
        profile: &NewProfile,
    ) -> impl Future<Output = Result<Profile, PersistenceError>> + Send;
    fn get_profile(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Profile>, PersistenceError>> + Send;
    fn list_profiles_by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Profile>, PersistenceError>> + Send;
    fn update_profile(
        &self,
        profile: &Profile,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
    fn delete_profile_cascade(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<DeletedProfile>, PersistenceError>> + Send;
}

/// Repository for option profiles.
pub trait OptionProfileRepository: Send + Sync {
    fn create_option_profile(
        &self,
        option: &NewOptionProfile,
    ) -> impl Future<Output = Result<OptionProfile, PersistenceError>> + Send;
    fn get_option_profile(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<OptionProfile>, PersistenceError>> + Send;
    fn list_option_profiles(
        &self,
        profile_id: i64,
    ) -> impl Future<Output = Result<Vec<OptionProfile>, PersistenceError>> + Send;
    fn update_option_profile(
        &self,
        option: &OptionProfile,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
    fn delete_option_profile(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
}

/// Repository for profile links.
pub trait LinkRepository: Send + Sync {
    fn create_link(
        &self,
        link: &NewLink,
    ) -> impl Future<Output = Result<Link, PersistenceError>> + Send;
    fn get_link(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Link>, PersistenceError>> + Send;
    fn list_links(
        &self,
        profile_id: i64,
    ) -> impl Future<Output = Result<Vec<Link>, PersistenceError>> + Send;
    fn update_link(
        &self,
        link: &Link,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
    fn delete_link(&self, id: i64) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
}

/// Repository for connection requests.
///
/// Implementations must enforce at most one row per ordered
/// `(requester, target)` pair and report a second insert as
/// [`PersistenceError::Duplicate`] from the constraint itself, not from a
/// prior lookup.
pub trait ConnectionRepository: Send + Sync {
    fn create_connection(
        &self,
        requester_profile_id: i64,
        target_profile_id: i64,
    ) -> impl Future<Output = Result<Connection, PersistenceError>> + Send;
    fn get_connection(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Connection>, PersistenceError>> + Send;
    fn update_status(
        &self,
        id: i64,
        status: ConnectionStatus,
    ) -> impl Future<Output = Result<Option<Connection>, PersistenceError>> + Send;
    fn list_connections(
        &self,
        profile_id: i64,
    ) -> impl Future<Output = Result<Vec<Connection>, PersistenceError>> + Send;
    /// Accepted rows between `a` and `b` in either direction.
    fn accepted_between(
        &self,
        a: i64,
        b: i64,
    ) -> impl Future<Output = Result<Vec<Connection>, PersistenceError>> + Send;
    fn delete_connection(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
}

/// A complete store: one repository per aggregate.
pub trait Persistence: Send + Sync + 'static {
    type Users: UserRepository;
    type Profiles: ProfileRepository;
    type OptionProfiles: OptionProfileRepository;
    type Links: LinkRepository;
    type Connections: ConnectionRepository;

    fn users(&self) -> &Self::Users;
    fn profiles(&self) -> &Self::Profiles;
    fn option_profiles(&self) -> &Self::OptionProfiles;
    fn links(&self) -> &Self::Links;
    fn connections(&self) -> &Self::Connections;
}
