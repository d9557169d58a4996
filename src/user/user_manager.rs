use super::{
    auth::{AuthToken, AuthTokenValue, UsernamePasswordCredentials},
    User, UserStore,
};
use anyhow::{bail, Context, Result};
use std::{sync::Arc, time::SystemTime};
use tracing::{debug, info};

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    pub fn create_user<T: AsRef<str>>(&self, user_handle: T) -> Result<usize> {
        let user_handle = user_handle.as_ref();
        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.")
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle {} already exists.", user_handle);
        }

        let user_id = self.user_store.create_user(user_handle)?;
        info!("Created user {} with id {}", user_handle, user_id);
        Ok(user_id)
    }

    /// Sets or replaces the password of an existing user.
    pub fn set_password(&self, user_handle: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            bail!("The password cannot be empty.")
        }
        let user_id = self
            .user_store
            .get_user_id(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;

        let credentials = UsernamePasswordCredentials::from_plain(user_id, password)?;
        self.user_store.set_password_credentials(&credentials)
    }

    /// Compares `password` with the stored hash without issuing a token.
    /// Returns the user id on a match.
    pub fn check_password(&self, user_handle: &str, password: &str) -> Result<Option<usize>> {
        let credentials = match self.user_store.get_password_credentials(user_handle)? {
            Some(credentials) => credentials,
            None => {
                debug!("No password credentials for {}", user_handle);
                return Ok(None);
            }
        };
        if !credentials.matches(password)? {
            debug!("Wrong password for {}", user_handle);
            return Ok(None);
        }
        Ok(Some(credentials.user_id))
    }

    /// Checks the password and issues a new session token.
    /// Returns Ok(None) when the handle is unknown or the password is wrong.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        let user_id = match self.check_password(user_handle, password)? {
            Some(user_id) => user_id,
            None => return Ok(None),
        };

        let token = AuthToken {
            user_id,
            created: SystemTime::now(),
            last_used: None,
            value: AuthTokenValue::generate(),
        };
        self.user_store.add_user_auth_token(&token)?;
        info!("User {} logged in", user_handle);
        Ok(Some(token))
    }

    /// Revokes a session token. Returns whether it existed.
    pub fn logout(&self, token: &AuthTokenValue) -> Result<bool> {
        Ok(self.user_store.delete_user_auth_token(token)?.is_some())
    }

    /// Resolves a token into its user, refreshing the token's last use.
    pub fn resolve_session(&self, token: &AuthTokenValue) -> Result<Option<User>> {
        let auth_token = match self.user_store.get_user_auth_token(token)? {
            Some(auth_token) => auth_token,
            None => return Ok(None),
        };

        if let Err(err) = self
            .user_store
            .update_user_auth_token_last_used_timestamp(token)
        {
            debug!("Failed to update auth token last_used timestamp: {}", err);
        }

        let handle = self
            .user_store
            .get_user_handle(auth_token.user_id)?
            .with_context(|| format!("Token refers to missing user {}", auth_token.user_id))?;
        Ok(Some(User {
            id: auth_token.user_id,
            handle,
        }))
    }
}
