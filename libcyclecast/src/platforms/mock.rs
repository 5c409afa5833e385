//! Mock API client for testing
//!
//! Scripts token and create-post responses and records every call so tests
//! can check the exact request sequence of a run without network access.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::config::ClientCredentials;
use crate::error::{PlatformError, Result};
use crate::oauth::AuthorizationGrant;
use crate::platforms::{map_http_error, ApiClient, Endpoint};
use crate::types::{CreatePostRequest, TokenResponse};

/// A scripted HTTP failure
#[derive(Debug, Clone)]
pub struct MockFailure {
    pub status: u16,
    pub body: String,
}

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Access token handed out by both token grants
    pub access_token: String,

    /// Refresh token handed out; `None` omits the field from the response
    pub refresh_token: Option<String>,

    /// Token endpoint failure
    pub token_failure: Option<MockFailure>,

    /// Zero-based index of the create-post call that fails
    pub fail_post_at: Option<(usize, MockFailure)>,

    /// Prefix of generated post IDs ("{prefix}{n}", n starting at 1)
    pub id_prefix: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            access_token: "mock-access-token".to_string(),
            refresh_token: Some("mock-refresh-token".to_string()),
            token_failure: None,
            fail_post_at: None,
            id_prefix: "post-".to_string(),
        }
    }
}

/// A create-post call as received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub access_token: String,
    pub request: CreatePostRequest,
}

#[derive(Debug, Default)]
struct Calls {
    refresh_tokens: Vec<String>,
    exchanged_codes: Vec<String>,
    posts: Vec<RecordedPost>,
}

/// Mock client for testing
#[derive(Debug)]
pub struct MockClient {
    config: MockConfig,
    calls: Mutex<Calls>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockClient {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Token responses leave out `refresh_token`
    pub fn without_refresh_rotation() -> Self {
        Self::new(MockConfig {
            refresh_token: None,
            ..Default::default()
        })
    }

    /// Token endpoint answers with `status`
    pub fn token_failure(status: u16, body: &str) -> Self {
        Self::new(MockConfig {
            token_failure: Some(MockFailure {
                status,
                body: body.to_string(),
            }),
            ..Default::default()
        })
    }

    /// The `call`-th create-post call (zero-based) answers with `status`
    pub fn post_failure_at(call: usize, status: u16, body: &str) -> Self {
        Self::new(MockConfig {
            fail_post_at: Some((
                call,
                MockFailure {
                    status,
                    body: body.to_string(),
                },
            )),
            ..Default::default()
        })
    }

    /// Refresh tokens presented to the token endpoint, in order
    pub fn refresh_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().refresh_tokens.clone()
    }

    /// Authorization codes presented to the token endpoint, in order
    pub fn exchanged_codes(&self) -> Vec<String> {
        self.calls.lock().unwrap().exchanged_codes.clone()
    }

    /// All create-post calls, including the failed one
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.calls.lock().unwrap().posts.clone()
    }

    pub fn post_call_count(&self) -> usize {
        self.calls.lock().unwrap().posts.len()
    }

    fn token_response(&self, endpoint: Endpoint) -> Result<TokenResponse> {
        if let Some(failure) = &self.config.token_failure {
            return Err(map_http_error(endpoint, failure.status, &failure.body).into());
        }

        Ok(TokenResponse {
            access_token: self.config.access_token.clone(),
            refresh_token: self.config.refresh_token.clone(),
            token_type: Some("bearer".to_string()),
            expires_in: Some(7200),
            scope: None,
        })
    }
}

#[async_trait]
impl ApiClient for MockClient {
    async fn refresh_token(
        &self,
        _client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.calls
            .lock()
            .unwrap()
            .refresh_tokens
            .push(refresh_token.to_string());

        self.token_response(Endpoint::TokenRefresh)
    }

    async fn exchange_code(
        &self,
        _client: &ClientCredentials,
        grant: &AuthorizationGrant,
    ) -> Result<TokenResponse> {
        self.calls
            .lock()
            .unwrap()
            .exchanged_codes
            .push(grant.code.clone());

        self.token_response(Endpoint::CodeExchange)
    }

    async fn create_post(
        &self,
        access_token: &str,
        request: &CreatePostRequest,
    ) -> Result<String> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.posts.push(RecordedPost {
                access_token: access_token.to_string(),
                request: request.clone(),
            });
            calls.posts.len() - 1
        };

        if let Some((fail_at, failure)) = &self.config.fail_post_at {
            if *fail_at == call {
                return Err(
                    map_http_error(Endpoint::CreatePost, failure.status, &failure.body).into(),
                );
            }
        }

        if request.text.is_empty() {
            return Err(PlatformError::Posting("mock refuses empty text".to_string()).into());
        }

        Ok(format!("{}{}", self.config.id_prefix, call + 1))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
