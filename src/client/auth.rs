//! Authentication operations
//!
//! Login and register talk to the transport directly: a 401 there means bad
//! credentials, not an expired session, and must never start a refresh.
//! Failures are always returned to the caller.

use super::GatewayClient;
use crate::error::Result;
use crate::transport::{ApiRequest, Transport};
use crate::types::auth::{LoginRequest, RegisterRequest, UserProfile};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const ME_PATH: &str = "/auth/me";

impl<T: Transport + 'static> GatewayClient<T> {
    /// Sign in and load the profile
    ///
    /// # Errors
    /// Returns the login error (e.g. `Http { status: 401 }` for bad
    /// credentials), or the `/auth/me` error if the profile cannot be loaded
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<UserProfile> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let request = ApiRequest::post(LOGIN_PATH).json(&body)?;

        if let Err(e) = self.transport().execute(request).await {
            log::warn!("Login failed: {e}");
            *self.user.write() = None;
            return Err(e);
        }

        let profile = self.fetch_me().await?;
        log::info!("Signed in as user {}", profile.id);
        Ok(profile)
    }

    /// Create an account, then sign in with it
    ///
    /// # Errors
    /// Returns the registration error or any [`login`](Self::login) error
    pub async fn register(&self, body: RegisterRequest) -> Result<UserProfile> {
        let request = ApiRequest::post(REGISTER_PATH).json(&body)?;
        if let Err(e) = self.transport().execute(request).await {
            log::warn!("Registration failed: {e}");
            return Err(e);
        }
        self.login(body.email, body.password).await
    }

    /// Sign out
    ///
    /// The cached profile and the active context are cleared even if the
    /// backend call fails.
    ///
    /// # Errors
    /// Returns the `/auth/logout` error, after local state is cleared
    pub async fn logout(&self) -> Result<()> {
        let result = self.coordinator.execute(ApiRequest::post(LOGOUT_PATH)).await;
        *self.user.write() = None;
        self.context.clear();

        match result {
            Ok(_) => {
                log::info!("Signed out");
                Ok(())
            }
            Err(e) => {
                log::warn!("Logout call failed (local session cleared anyway): {e}");
                Err(e)
            }
        }
    }

    /// Load the signed-in user's profile and cache it
    ///
    /// # Errors
    /// Returns the request error; the cached profile is cleared in that case
    pub async fn fetch_me(&self) -> Result<UserProfile> {
        match self
            .coordinator
            .execute_json::<UserProfile>(ApiRequest::get(ME_PATH))
            .await
        {
            Ok(profile) => {
                *self.user.write() = Some(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                *self.user.write() = None;
                Err(e)
            }
        }
    }

    /// Cached profile from the last successful [`fetch_me`](Self::fetch_me)
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.user.read().clone()
    }

    /// Whether a profile is cached
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }
}
