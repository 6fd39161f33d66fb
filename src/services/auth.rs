//! Login flow — provider sign-in plus the admin gate.
//!
//! DESIGN
//! ======
//! Only one account may use this panel. A sign-in that succeeds at the
//! provider but returns any other email is signed straight back out and
//! rejected, so a valid non-admin credential never holds a session here.

use std::sync::Arc;

use crate::backend::{AuthProvider, BackendError, Identity};

/// Fallback admin address, matching the account provisioned at the vendor.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

/// The fixed allowed admin address, from `ADMIN_EMAIL`.
#[must_use]
pub fn admin_email_from_env() -> String {
    std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_owned())
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the credentials. The message is the provider's
    /// own failure string, shown to the user verbatim.
    #[error("{0}")]
    Provider(String),
    /// Valid credentials, wrong account.
    #[error("Not an authorized admin account.")]
    NotAdmin,
}

/// Sign in against the provider and enforce the exact admin-email match.
///
/// On an email mismatch the provider session is signed back out before the
/// error is returned; a sign-out failure at that point is logged and
/// otherwise ignored, the rejection stands either way.
///
/// # Errors
///
/// `AuthError::Provider` for credential failures, `AuthError::NotAdmin` for
/// a valid non-admin account.
pub async fn sign_in_admin(
    provider: &Arc<dyn AuthProvider>,
    admin_email: &str,
    email: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    let identity = provider.sign_in(email, password).await.map_err(|e| match e {
        BackendError::Auth(msg) => AuthError::Provider(msg),
        other => AuthError::Provider(other.to_string()),
    })?;

    if identity.email != admin_email {
        tracing::warn!(email = %identity.email, "non-admin sign-in rejected");
        if let Err(e) = provider.sign_out(&identity).await {
            tracing::warn!(error = %e, "provider sign-out after rejection failed");
        }
        return Err(AuthError::NotAdmin);
    }

    tracing::info!(email = %identity.email, "admin signed in");
    Ok(identity)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
