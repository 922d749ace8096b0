use serde::Serialize;

/// Crate-wide error type for the checkout core.
///
/// Variants follow the recovery strategy required of the caller: validation
/// and conflict errors are resolved locally by the user, auth errors route
/// through the login flow, remote-service and payment errors abort the
/// current attempt and may be retried manually.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Payment failed: {0}")]
    Payment(String),

    #[error("Payment verification failed: {0}")]
    Verification(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        CheckoutError::RemoteService(err.to_string())
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Internal(format!("serialization error: {}", err))
    }
}

impl CheckoutError {
    /// Whether the user may simply retry the failed attempt.
    ///
    /// Verification failures are excluded: the gateway reported success but
    /// the backend could not confirm it, so retrying risks a double charge.
    /// Conflicts and auth failures need explicit resolution first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::RemoteService(_) | Self::Payment(_)
        )
    }

    /// Message suitable for surfacing to the user verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) | Self::Other(_) => "Something went wrong".to_string(),
            _ => self.to_string(),
        }
    }
}
