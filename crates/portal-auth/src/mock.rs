//! Mock authenticator for tests: fixed username/password table.

use portal_types::{AuthError, Authenticator};
use std::collections::HashMap;

/// Accepts exactly the pairs it was built with, or fails every call once [`failing`] is set.
///
/// [`failing`]: MockAuthenticator::failing
#[derive(Default)]
pub struct MockAuthenticator {
    users: HashMap<String, String>,
    failure: Option<String>,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users.insert(username.to_string(), password.to_string());
        self
    }

    /// Make every call return `AuthError::Backend(message)`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

#[async_trait::async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        if let Some(message) = &self.failure {
            return Err(AuthError::Backend(message.clone()));
        }
        Ok(self.users.get(username).is_some_and(|p| p == password))
    }
}
