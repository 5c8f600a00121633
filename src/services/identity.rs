// src/services/identity.rs
//! Sign-in providers
//!
//! Neither provider here verifies anything. They stand where a real identity
//! service would go: take a sign-in request, return who the caller is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::safe_email_log;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email is required")]
    MissingEmail,

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Who signed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-scoped subject identifier
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider tag stored next to the user record
    fn name(&self) -> &str;

    async fn sign_in(&self, request: &SignInRequest) -> Result<Identity, IdentityError>;
}

/// Trusts whatever email the caller submits
#[derive(Debug, Default, Clone)]
pub struct EmailIdentityProvider;

#[async_trait]
impl IdentityProvider for EmailIdentityProvider {
    fn name(&self) -> &str {
        "email"
    }

    async fn sign_in(&self, request: &SignInRequest) -> Result<Identity, IdentityError> {
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(IdentityError::MissingEmail)?
            .to_lowercase();

        if !looks_like_email(&email) {
            return Err(IdentityError::InvalidEmail(safe_email_log(&email)));
        }

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("User")
            .to_string();

        debug!(email = %safe_email_log(&email), "Email identity accepted");

        Ok(Identity {
            id: format!("email:{}", email),
            email,
            name,
        })
    }
}

/// Always signs in the same demo user, ignoring the request
#[derive(Debug, Clone)]
pub struct DemoIdentityProvider {
    identity: Identity,
}

impl Default for DemoIdentityProvider {
    fn default() -> Self {
        Self {
            identity: Identity {
                id: "demo-user".to_string(),
                email: "demo@example.com".to_string(),
                name: "Demo User".to_string(),
            },
        }
    }
}

impl DemoIdentityProvider {
    pub fn with_identity(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for DemoIdentityProvider {
    fn name(&self) -> &str {
        "demo"
    }

    async fn sign_in(&self, _request: &SignInRequest) -> Result<Identity, IdentityError> {
        Ok(self.identity.clone())
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
