//! X (Twitter) API v2 client

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::config::{ApiConfig, ClientCredentials};
use crate::error::{PlatformError, Result};
use crate::oauth::AuthorizationGrant;
use crate::platforms::{map_http_error, ApiClient, Endpoint};
use crate::types::{CreatePostRequest, CreatePostResponse, TokenResponse};

pub struct XClient {
    http: reqwest::Client,
    base_url: String,
}

impl XClient {
    /// Create a client for the API rooted at `base_url` (e.g. "https://api.x.com/2")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.base_url.clone())
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.base_url)
    }

    pub fn posts_url(&self) -> String {
        format!("{}/tweets", self.base_url)
    }

    /// POST a form to the token endpoint with HTTP Basic client auth
    async fn token_request(
        &self,
        client: &ClientCredentials,
        form: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.token_url())
            .basic_auth(
                &client.client_id,
                Some(client.client_secret.expose_secret()),
            )
            .form(form)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if !endpoint.accepts(status) {
            return Err(map_http_error(endpoint, status, &body).into());
        }

        serde_json::from_str(&body).map_err(|e| {
            PlatformError::InvalidResponse(format!(
                "{} returned an unreadable token response: {}",
                endpoint.describe(),
                e
            ))
            .into()
        })
    }
}

fn transport_error(endpoint: Endpoint, error: reqwest::Error) -> PlatformError {
    PlatformError::Network(format!(
        "{} request failed: {}",
        endpoint.describe(),
        error
    ))
}

/// Extract `data.id` from a create-post response body
pub fn parse_created_post_id(body: &str) -> Result<String> {
    let response: CreatePostResponse = serde_json::from_str(body).map_err(|e| {
        PlatformError::InvalidResponse(format!("create post returned invalid JSON: {}", e))
    })?;

    response.data.map(|post| post.id).ok_or_else(|| {
        PlatformError::InvalidResponse(format!(
            "create post response has no data.id: {}",
            body.trim()
        ))
        .into()
    })
}

#[async_trait]
impl ApiClient for XClient {
    async fn refresh_token(
        &self,
        client: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        tracing::debug!("Requesting token refresh from {}", self.token_url());

        self.token_request(
            client,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client.client_id.as_str()),
            ],
            Endpoint::TokenRefresh,
        )
        .await
    }

    async fn exchange_code(
        &self,
        client: &ClientCredentials,
        grant: &AuthorizationGrant,
    ) -> Result<TokenResponse> {
        self.token_request(
            client,
            &[
                ("grant_type", "authorization_code"),
                ("code", grant.code.as_str()),
                ("redirect_uri", grant.redirect_uri.as_str()),
                ("client_id", client.client_id.as_str()),
                ("code_verifier", grant.code_verifier.as_str()),
            ],
            Endpoint::CodeExchange,
        )
        .await
    }

    async fn create_post(
        &self,
        access_token: &str,
        request: &CreatePostRequest,
    ) -> Result<String> {
        let endpoint = Endpoint::CreatePost;

        let response = self
            .http
            .post(self.posts_url())
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if !endpoint.accepts(status) {
            tracing::warn!(status, "Create post rejected");
            return Err(map_http_error(endpoint, status, &body).into());
        }

        parse_created_post_id(&body)
    }

    fn name(&self) -> &str {
        "x"
    }
}
