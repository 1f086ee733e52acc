//! OAuth2 token grants against the Spotify accounts service.
//!
//! Both grants POST an `application/x-www-form-urlencoded` body to the
//! token endpoint with an HTTP Basic header built from
//! `base64(client_id:client_secret)`. Token state bookkeeping lives in
//! [`crate::management::TokenManager`]; this module only performs the
//! exchanges.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};

use crate::{
    error::AuthError,
    types::{Credentials, Token, TokenResponse},
    warning,
};

/// Exchanges a one-time authorization code for an access/refresh token pair.
///
/// The code comes from the redirect callback. On HTTP 200 the response
/// fields are captured together with the current time as `obtained_at`.
/// Any other status, a transport failure, or a parse failure yields
/// `AuthError`; the raw body is kept in the error for diagnostics.
pub async fn exchange_authorization_code(
    credentials: &Credentials,
    token_url: &str,
    code: &str,
) -> Result<Token, AuthError> {
    token_request(
        credentials,
        token_url,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &credentials.redirect_uri),
        ],
    )
    .await
}

/// Obtains a fresh access token via the refresh-token grant.
///
/// Spotify does not always reissue a refresh token on this grant; the
/// returned `Token` then carries an empty `refresh_token` and the caller
/// retains the prior one.
pub async fn refresh_access_token(
    credentials: &Credentials,
    token_url: &str,
    refresh_token: &str,
) -> Result<Token, AuthError> {
    token_request(
        credentials,
        token_url,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await
}

async fn token_request(
    credentials: &Credentials,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<Token, AuthError> {
    let basic = STANDARD.encode(format!(
        "{}:{}",
        credentials.client_id, credentials.client_secret
    ));

    let client = Client::new();
    let response = client
        .post(token_url)
        .header(AUTHORIZATION, format!("Basic {basic}"))
        .form(params)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if status != StatusCode::OK {
        warning!("Token endpoint returned {}: {}", status, body);
        return Err(AuthError::Status { status, body });
    }

    let parsed: TokenResponse = serde_json::from_str(&body)?;
    Ok(Token {
        access_token: parsed.access_token,
        refresh_token: parsed.refresh_token.unwrap_or_default(),
        expires_in: parsed.expires_in,
        obtained_at: Utc::now().timestamp() as u64,
    })
}
