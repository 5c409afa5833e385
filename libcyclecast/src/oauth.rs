//! OAuth2 authorization-code flow with PKCE (RFC 7636)
//!
//! Used once by `cycle-setup` to obtain the first token pair. The operator
//! opens the authorization URL, approves the app, and pastes back the URL
//! the browser was redirected to.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::config::ApiConfig;
use crate::error::{CyclecastError, Result};

/// Scopes needed to post and to receive a refresh token
pub const SCOPES: &[&str] = &["tweet.read", "tweet.write", "users.read", "offline.access"];

/// PKCE verifier and its S256 challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// 64 random bytes, base64url encoded (86 characters)
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// base64url(SHA-256(verifier)) without padding
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Random opaque value echoed back by the authorization server
pub fn random_state<R: RngCore>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Everything the operator-facing half of the flow needs
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub pkce: PkcePair,
    pub redirect_uri: String,
}

impl AuthorizationRequest {
    /// Generate a fresh verifier and state and build the authorization URL
    pub fn new<R: RngCore>(api: &ApiConfig, client_id: &str, rng: &mut R) -> Result<Self> {
        let pkce = PkcePair::generate(rng);
        let state = random_state(rng);
        let url = authorization_url(api, client_id, &pkce, &state)?;

        Ok(Self {
            url,
            state,
            pkce,
            redirect_uri: api.redirect_uri.clone(),
        })
    }

    /// Turn the pasted callback URL into a grant for the token endpoint
    pub fn grant_from_callback(&self, callback_url: &str) -> Result<AuthorizationGrant> {
        let code = parse_callback(callback_url, &self.state)?;
        Ok(AuthorizationGrant {
            code,
            redirect_uri: self.redirect_uri.clone(),
            code_verifier: self.pkce.verifier.clone(),
        })
    }
}

/// Parameters of the authorization-code token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub redirect_uri: String,
    pub code_verifier: String,
}

pub fn authorization_url(
    api: &ApiConfig,
    client_id: &str,
    pkce: &PkcePair,
    state: &str,
) -> Result<String> {
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        &api.authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", api.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
        ],
    )
    .map_err(|e| {
        CyclecastError::InvalidInput(format!(
            "Invalid authorize URL '{}': {}",
            api.authorize_url, e
        ))
    })?;

    Ok(url.to_string())
}

/// Extract the authorization code from the redirect URL
///
/// # Errors
///
/// `InvalidInput` when the URL cannot be parsed, carries an `error`
/// parameter, has a `state` different from `expected_state`, or has no
/// `code`.
pub fn parse_callback(callback_url: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse(callback_url.trim()).map_err(|e| {
        CyclecastError::InvalidInput(format!("Could not parse callback URL: {}", e))
    })?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        let description = param("error_description").unwrap_or_default();
        return Err(CyclecastError::InvalidInput(format!(
            "Authorization was denied: {} {}",
            error, description
        )));
    }

    match param("state") {
        Some(state) if state == expected_state => {}
        _ => {
            return Err(CyclecastError::InvalidInput(
                "Callback state does not match this authorization request".to_string(),
            ))
        }
    }

    param("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            CyclecastError::InvalidInput(
                "No 'code' parameter found in the callback URL".to_string(),
            )
        })
}
