use super::auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials};
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the password credentials of the user with the given handle.
    /// Returns Ok(None) if the user does not exist or has no password.
    fn get_password_credentials(
        &self,
        user_handle: &str,
    ) -> Result<Option<UsernamePasswordCredentials>>;

    /// Replaces the user's password credentials.
    fn set_password_credentials(&self, credentials: &UsernamePasswordCredentials) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns the auth token with the given value.
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token given its value.
    /// Returns Ok(None) if the token did not exist.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates the token's last used timestamp.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    fn add_user_auth_token(&self, token: &AuthToken) -> Result<()>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns its id.
    fn create_user(&self, user_handle: &str) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;
}
