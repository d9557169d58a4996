pub mod auth;
mod sqlite_user_store;
mod user_manager;
mod user_store;

use serde::Serialize;

pub use auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::UserManager;
pub use user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};

/// A registered user, as exposed to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: usize,
    pub handle: String,
}
