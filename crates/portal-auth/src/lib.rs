//! Credential validation backends.

mod command;
#[cfg(feature = "test-util")]
pub mod mock;
#[cfg(feature = "pam")]
mod pam_auth;

pub use command::CommandAuthenticator;
pub use portal_types::{AuthError, Authenticator};

#[cfg(feature = "test-util")]
pub use mock::MockAuthenticator;
#[cfg(feature = "pam")]
pub use pam_auth::PamAuthenticator;

/// Trim the username and reject unusable credentials before any backend is consulted.
///
/// Usernames may not contain control characters. Passwords may not contain line breaks or NUL,
/// since helpers read one credential per line.
pub fn normalize_credentials<'a>(username: &'a str, password: &'a str) -> Option<(&'a str, &'a str)> {
    let username = username.trim();
    if username.is_empty() || username.chars().any(char::is_control) {
        return None;
    }
    if password.is_empty() || password.contains(['\n', '\r', '\0']) {
        return None;
    }
    Some((username, password))
}
