/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Keycloak Client
//!
//! Identity provider backed by a Keycloak realm.
//!
//! The service account logs in with the password grant; the resulting token
//! is used for admin lookups and for listing pipelines during a cleanup pass.
//! Impersonation uses the token-exchange grant with `requested_subject`, which
//! requires the client to hold the impersonation permission in the realm.
//! On shutdown the session is ended with the refresh token.

use super::{error_body, IdentityProvider};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_utils::config::Keycloak;
use cleanup_utils::logging::prelude::*;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;

const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";

/// Claims returned by the userinfo endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub sub: String,
    pub preferred_username: Option<String>,
    pub email: Option<String>,
}

/// User representation of the admin API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenIdToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub struct KeycloakClient {
    client: Client,
    config: Keycloak,
    token: RwLock<Option<OpenIdToken>>,
}

impl KeycloakClient {
    pub fn new(config: Keycloak) -> Self {
        Self {
            client: Client::new(),
            config: Keycloak {
                url: config.url.trim_end_matches('/').to_string(),
                ..config
            },
            token: RwLock::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/auth/realms/{}/protocol/openid-connect/token",
            self.config.url, self.config.realm
        )
    }

    /// Logs the service account in and stores its token.
    pub async fn login(&self) -> Result<()> {
        let response = self
            .client
            .post(self.token_url())
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("username", self.config.user.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let token: OpenIdToken = response.json().await?;
                *self.token.write().await = Some(token);
                info!("Logged in to keycloak realm {}", self.config.realm);
                Ok(())
            }
            status => {
                let body = error_body(response).await;
                error!("Keycloak login failed with status {}: {}", status, body);
                Err(CleanupError::from_status("keycloak login", status, &body))
            }
        }
    }

    /// Ends the service account session with its refresh token. Does nothing
    /// when not logged in.
    pub async fn logout(&self) -> Result<()> {
        let Some(token) = self.token.write().await.take() else {
            return Ok(());
        };
        let Some(refresh_token) = token.refresh_token else {
            debug!("No refresh token, skipping keycloak logout");
            return Ok(());
        };

        let url = format!(
            "{}/auth/realms/{}/protocol/openid-connect/logout",
            self.config.url, self.config.realm
        );
        let response = self
            .client
            .post(url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!("Logged out of keycloak realm {}", self.config.realm);
                Ok(())
            }
            status => Err(CleanupError::from_status(
                "keycloak logout",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn bearer(&self) -> Result<String> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|token| token.access_token.clone())
            .ok_or_else(|| CleanupError::Upstream("keycloak: not logged in".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    async fn get_user_info(&self) -> Result<UserInfo> {
        let url = format!(
            "{}/auth/realms/{}/protocol/openid-connect/userinfo",
            self.config.url, self.config.realm
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(CleanupError::from_status(
                "keycloak userinfo",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn get_user_by_id(&self, id: &str) -> Result<User> {
        let url = format!(
            "{}/auth/admin/realms/{}/users/{}",
            self.config.url, self.config.realm, id
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(CleanupError::NotFound(format!("user {}", id))),
            status => Err(CleanupError::from_status(
                "keycloak users",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn get_impersonate_token(&self, user_id: &str) -> Result<String> {
        let response = self
            .client
            .post(self.token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", TOKEN_EXCHANGE_GRANT),
                ("requested_subject", user_id),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let token: OpenIdToken = response.json().await?;
                Ok(token.access_token)
            }
            status => {
                let body = error_body(response).await;
                error!("Token exchange for user {} failed: {} {}", user_id, status, body);
                Err(CleanupError::Upstream(format!(
                    "access denied for user {}",
                    user_id
                )))
            }
        }
    }

    async fn get_access_token(&self) -> String {
        self.bearer().await.unwrap_or_default()
    }
}
