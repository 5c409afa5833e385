//! Remote API abstraction
//!
//! The publisher only needs three calls from the platform: the two OAuth2
//! token grants and "create post". [`ApiClient`] captures them so runs can
//! be driven against the real X API ([`x::XClient`]) or a scripted
//! [`mock::MockClient`].
//!
//! # Examples
//!
//! ```no_run
//! use libcyclecast::platforms::{x::XClient, ApiClient};
//! use libcyclecast::types::CreatePostRequest;
//!
//! # async fn example(access_token: &str) -> libcyclecast::Result<()> {
//! let client = XClient::new("https://api.x.com/2");
//! let id = client
//!     .create_post(access_token, &CreatePostRequest::new("Hello"))
//!     .await?;
//! println!("Posted: {}", id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::config::ClientCredentials;
use crate::error::{PlatformError, Result};
use crate::oauth::AuthorizationGrant;
use crate::types::{CreatePostRequest, TokenResponse};

// Mock client is available for all builds (not just tests) to support integration tests
pub mod mock;
pub mod x;

#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Exchange a refresh token for a new token pair
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the token endpoint
    /// answers with anything but 200, `PlatformError::Network` when the
    /// request cannot be sent.
    async fn refresh_token(
        &self,
        client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse>;

    /// Exchange an authorization code (PKCE) for the first token pair
    async fn exchange_code(
        &self,
        client: &ClientCredentials,
        grant: &AuthorizationGrant,
    ) -> Result<TokenResponse>;

    /// Create one post and return its ID
    ///
    /// # Errors
    ///
    /// Any status other than 200/201 is an error carrying the status code
    /// and response body.
    async fn create_post(&self, access_token: &str, request: &CreatePostRequest)
        -> Result<String>;

    /// Lowercase identifier, e.g. "x" or "mock"
    fn name(&self) -> &str;
}

/// Which endpoint produced an HTTP error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    TokenRefresh,
    CodeExchange,
    CreatePost,
}

impl Endpoint {
    pub fn describe(&self) -> &'static str {
        match self {
            Endpoint::TokenRefresh => "token refresh",
            Endpoint::CodeExchange => "authorization code exchange",
            Endpoint::CreatePost => "create post",
        }
    }

    /// Whether `status` counts as success for this endpoint
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Endpoint::TokenRefresh | Endpoint::CodeExchange => status == 200,
            Endpoint::CreatePost => status == 200 || status == 201,
        }
    }
}

/// Map a rejected HTTP response to a `PlatformError`
///
/// Token endpoints always fail as authentication errors. For create-post,
/// 401/403 mean the access token was refused; anything else is a posting
/// failure. The status and body are kept in the message for the operator.
pub fn map_http_error(endpoint: Endpoint, status: u16, body: &str) -> PlatformError {
    let message = format!(
        "{} rejected (HTTP {}): {}",
        endpoint.describe(),
        status,
        body.trim()
    );

    match endpoint {
        Endpoint::TokenRefresh | Endpoint::CodeExchange => PlatformError::Authentication(message),
        Endpoint::CreatePost if status == 401 || status == 403 => {
            PlatformError::Authentication(message)
        }
        Endpoint::CreatePost => PlatformError::Posting(message),
    }
}
