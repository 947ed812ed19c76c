//! PAM-backed authenticator (feature `pam`).

use async_trait::async_trait;
use portal_types::{AuthError, Authenticator};

/// Validates credentials against a PAM service (default `login`).
pub struct PamAuthenticator {
    service: String,
}

impl PamAuthenticator {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl Default for PamAuthenticator {
    fn default() -> Self {
        Self::new("login")
    }
}

#[async_trait]
impl Authenticator for PamAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let service = self.service.clone();
        let username = username.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let mut client = pam::Client::with_password(&service)
                .map_err(|e| AuthError::Backend(format!("PAM init for {}: {}", service, e)))?;
            client
                .conversation_mut()
                .set_credentials(username.as_str(), password.as_str());
            match client.authenticate() {
                Ok(()) => Ok(true),
                Err(e) => {
                    tracing::info!(username = %username, error = %e, "PAM rejected credentials");
                    Ok(false)
                }
            }
        })
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?
    }
}
