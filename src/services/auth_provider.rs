// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin client for the managed auth provider.
//!
//! Handles:
//! - Account creation (email + initial password)
//! - Password changes on behalf of a user
//! - Account removal when the matching profile could not be stored
//!
//! Tokens are issued by the provider; this service never mints them.

use crate::error::AppError;
use serde::Deserialize;

/// Auth provider admin API client.
#[derive(Clone)]
pub struct AuthProviderClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    /// Offline mode: no HTTP calls, ids derived from the email.
    mock: bool,
}

/// Account as returned by the provider's admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthProviderClient {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            mock: false,
        }
    }

    /// Offline client for tests and local development.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://auth.invalid".to_string(),
            service_key: String::new(),
            mock: true,
        }
    }

    /// Mock-mode id for an email address.
    pub fn mock_user_id(email: &str) -> String {
        format!("mock-{}", email.trim().to_lowercase())
    }

    /// Create a confirmed account. Returns the provider's user id.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<ProviderUser, AppError> {
        if self.mock {
            return Ok(ProviderUser {
                id: Self::mock_user_id(email),
                email: Some(email.to_string()),
            });
        }

        let url = format!("{}/admin/users", self.base_url);
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "email_confirm": true,
        });

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Create user request failed: {}", e)))?;

        let user: ProviderUser = self.check_response_json(response).await?;
        tracing::info!(provider_user_id = %user.id, "Auth provider account created");
        Ok(user)
    }

    /// Replace a user's password.
    pub async fn update_password(&self, user_id: &str, password: &str) -> Result<(), AppError> {
        if self.mock {
            return Ok(());
        }

        let url = format!(
            "{}/admin/users/{}",
            self.base_url,
            urlencoding::encode(user_id)
        );
        let response = self
            .http
            .put(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Password update failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::info!(user_id, "Password updated at auth provider");
        Ok(())
    }

    /// Delete an account.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        if self.mock {
            return Ok(());
        }

        let url = format!(
            "{}/admin/users/{}",
            self.base_url,
            urlencoding::encode(user_id)
        );
        let response = self
            .http
            .delete(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(format!("Delete user request failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::info!(user_id, "Auth provider account deleted");
        Ok(())
    }

    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from(response).await)
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| AppError::AuthProvider(format!("JSON parse error: {}", e)))
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 422 || status.as_u16() == 409 {
            // Duplicate email or rejected password
            return AppError::Conflict(format!("Auth provider rejected the request: {}", body));
        }
        tracing::warn!(status = %status, "Auth provider call failed");
        AppError::AuthProvider(format!("HTTP {}: {}", status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_create_user_is_deterministic() {
        let client = AuthProviderClient::new_mock();
        let user = client.create_user("Ana@Example.org", "secreto1").await.unwrap();
        assert_eq!(user.id, "mock-ana@example.org");
        assert_eq!(user.id, AuthProviderClient::mock_user_id("ana@example.org"));
        assert!(client.update_password(&user.id, "otro-secreto").await.is_ok());
        assert!(client.delete_user(&user.id).await.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = AuthProviderClient::new("https://auth.example.org/auth/v1/", "key");
        assert_eq!(client.base_url, "https://auth.example.org/auth/v1");
    }
}
