// service/auth_provider.rs
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{config::Config, models::usermodel::UserRole, service::error::ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Error text from an auth admin response, whichever field it uses.
pub fn provider_message(body: &Value) -> Option<String> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body[*key].as_str())
        .map(|s| s.to_string())
}

/// Client for the hosted auth provider's admin API, authenticated with the
/// service-role key.
#[derive(Debug, Clone)]
pub struct AuthProviderClient {
    client: reqwest::Client,
    admin_url: String,
    service_role_key: String,
}

impl AuthProviderClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            admin_url: format!("{}/auth/v1/admin/users", config.auth_url),
            service_role_key: config.auth_service_role_key.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn send(&self, builder: reqwest::RequestBuilder, action: &str) -> Result<Value, ServiceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::AuthProvider(format!("{} failed: {}", action, e)))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = provider_message(&body).unwrap_or_else(|| status.to_string());
            return Err(ServiceError::AuthProvider(format!("{} failed: {}", action, message)));
        }

        Ok(body)
    }

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        role: UserRole,
    ) -> Result<AuthUser, ServiceError> {
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": {
                "full_name": full_name,
                "user_type": role.to_str(),
            },
        });

        let body = self
            .send(
                self.request(reqwest::Method::POST, self.admin_url.clone()).json(&payload),
                "create user",
            )
            .await?;

        serde_json::from_value(body)
            .map_err(|e| ServiceError::AuthProvider(format!("create user returned no user: {}", e)))
    }

    pub async fn update_user_type(&self, user_id: Uuid, role: UserRole) -> Result<(), ServiceError> {
        let payload = serde_json::json!({
            "user_metadata": { "user_type": role.to_str() },
        });

        self.send(
            self.request(reqwest::Method::PUT, format!("{}/{}", self.admin_url, user_id))
                .json(&payload),
            "update user",
        )
        .await?;

        Ok(())
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.send(
            self.request(reqwest::Method::DELETE, format!("{}/{}", self.admin_url, user_id)),
            "delete user",
        )
        .await?;

        Ok(())
    }
}
