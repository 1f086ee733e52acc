use chrono::Utc;

use crate::{
    error::AuthError,
    spotify,
    types::{Credentials, Token},
};

/// Seconds before nominal expiry at which a token is already treated as
/// stale, so a request never departs with a token about to lapse mid-flight.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// Tagged authorization state.
///
/// Playback operations need `Authenticated`; making the tag explicit keeps
/// "issue an API call without a token" unrepresentable instead of a loose
/// boolean next to an empty string.
#[derive(Debug, Clone)]
enum AuthState {
    Unauthenticated,
    Authenticated(Token),
}

/// Owns the OAuth2 credentials and the current token.
///
/// The manager is the only mutator of token state. It starts
/// unauthenticated, becomes authenticated after a successful
/// authorization-code or refresh exchange, and falls back to
/// unauthenticated on any failed refresh. Tokens are not persisted; every
/// process run authorizes afresh.
pub struct TokenManager {
    credentials: Credentials,
    token_url: String,
    state: AuthState,
}

impl TokenManager {
    pub fn new(credentials: Credentials, token_url: String) -> Self {
        TokenManager {
            credentials,
            token_url,
            state: AuthState::Unauthenticated,
        }
    }

    /// Exchanges a one-time authorization code for a token pair.
    ///
    /// On failure the state is (and stays) unauthenticated.
    pub async fn acquire(&mut self, code: &str) -> Result<(), AuthError> {
        self.state = AuthState::Unauthenticated;
        let token =
            spotify::auth::exchange_authorization_code(&self.credentials, &self.token_url, code)
                .await?;
        self.state = AuthState::Authenticated(token);
        Ok(())
    }

    /// Refreshes the access token using the stored refresh token.
    ///
    /// The state is invalidated before the exchange and re-validated only
    /// on success, so `is_valid()` right after a failed refresh reports
    /// false regardless of how the failure surfaced. The prior refresh
    /// token is retained when the response omits one.
    pub async fn refresh(&mut self) -> Result<(), AuthError> {
        let AuthState::Authenticated(prev) =
            std::mem::replace(&mut self.state, AuthState::Unauthenticated)
        else {
            return Err(AuthError::NotAuthenticated);
        };

        let mut token = spotify::auth::refresh_access_token(
            &self.credentials,
            &self.token_url,
            &prev.refresh_token,
        )
        .await?;

        if token.refresh_token.is_empty() {
            token.refresh_token = prev.refresh_token;
        }
        self.state = AuthState::Authenticated(token);
        Ok(())
    }

    /// Returns a bearer token valid for an immediate API call.
    ///
    /// Staleness is checked before every call; a stale token triggers a
    /// lazy refresh right here rather than a retry-after-401 dance.
    pub async fn bearer(&mut self) -> Result<String, AuthError> {
        match &self.state {
            AuthState::Unauthenticated => return Err(AuthError::NotAuthenticated),
            AuthState::Authenticated(token) => {
                if !Self::is_expired(token) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        self.refresh().await?;
        match &self.state {
            AuthState::Authenticated(token) => Ok(token.access_token.clone()),
            AuthState::Unauthenticated => Err(AuthError::NotAuthenticated),
        }
    }

    /// True when a token is held and not yet stale.
    pub fn is_valid(&self) -> bool {
        match &self.state {
            AuthState::Authenticated(token) => !Self::is_expired(token),
            AuthState::Unauthenticated => false,
        }
    }

    /// The currently held token, if any.
    pub fn token(&self) -> Option<&Token> {
        match &self.state {
            AuthState::Authenticated(token) => Some(token),
            AuthState::Unauthenticated => None,
        }
    }

    fn is_expired(token: &Token) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_MARGIN_SECS >= token.obtained_at + token.expires_in
    }
}
