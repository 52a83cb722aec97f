//! Render-provider availability.
//!
//! The provider starts in `Checking`, a credential format check moves it to
//! `Valid` or `Invalid`, and errors reported by the render backend can move
//! a usable provider to `BillingError` or `Invalid`. Those two states hold
//! until [`ProviderAvailability::reset`].

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProviderState {
    Checking,
    Valid,
    Invalid,
    BillingError,
}

impl ProviderState {
    pub fn is_usable(self) -> bool {
        self == ProviderState::Valid
    }

    /// Invalid and BillingError are only left through an explicit reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProviderState::Invalid | ProviderState::BillingError)
    }

    pub fn user_message(self) -> &'static str {
        match self {
            ProviderState::Checking => "Checking map provider credentials.",
            ProviderState::Valid => "Map provider ready.",
            ProviderState::Invalid => {
                "The map provider credential is missing or invalid. Showing a static map instead."
            }
            ProviderState::BillingError => {
                "The map provider requires billing to be enabled. Showing a static map instead."
            }
        }
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderState::Checking => "checking",
            ProviderState::Valid => "valid",
            ProviderState::Invalid => "invalid",
            ProviderState::BillingError => "billing-error",
        };
        f.write_str(s)
    }
}

/// Structured error published by the render backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("billing is not enabled for this credential")]
    BillingNotEnabled,
    #[error("credential rejected: {0}")]
    CredentialRejected(String),
    #[error("provider error: {0}")]
    Other(String),
}

const BILLING_MARKERS: &[&str] = &["billingnotenabled", "billing-not-enabled", "billing"];
const CREDENTIAL_MARKERS: &[&str] = &[
    "referernotallowed",
    "invalidkey",
    "apinotactivated",
    "permission",
];

impl ProviderError {
    /// Classifies a free-text provider message, case-insensitively.
    ///
    /// For backends that can only surface strings.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if BILLING_MARKERS.iter().any(|m| lower.contains(m)) {
            ProviderError::BillingNotEnabled
        } else if CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
            ProviderError::CredentialRejected(message.to_string())
        } else {
            ProviderError::Other(message.to_string())
        }
    }
}

/// Shape a credential must have before the live provider is tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFormat {
    pub required_prefix: Option<String>,
    pub min_len: usize,
}

impl Default for CredentialFormat {
    fn default() -> Self {
        Self {
            required_prefix: Some("AIza".to_string()),
            min_len: 30,
        }
    }
}

impl CredentialFormat {
    pub fn any_non_empty() -> Self {
        Self {
            required_prefix: None,
            min_len: 1,
        }
    }

    pub fn accepts(&self, credential: &str) -> bool {
        let credential = credential.trim();
        if credential.is_empty() || credential.len() < self.min_len {
            return false;
        }
        match &self.required_prefix {
            Some(prefix) => credential.starts_with(prefix.as_str()),
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderAvailability {
    state: ProviderState,
    format: CredentialFormat,
}

impl ProviderAvailability {
    pub fn new(format: CredentialFormat) -> Self {
        Self {
            state: ProviderState::Checking,
            format,
        }
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    /// Resolves `Checking` from the credential's format. No-op otherwise.
    pub fn check_credential(&mut self, credential: Option<&str>) -> ProviderState {
        if self.state != ProviderState::Checking {
            return self.state;
        }
        let ok = credential.is_some_and(|c| self.format.accepts(c));
        self.state = if ok {
            ProviderState::Valid
        } else {
            ProviderState::Invalid
        };
        info!(state = %self.state, "provider credential checked");
        self.state
    }

    /// Applies a backend error. Returns true if the state changed.
    pub fn report(&mut self, error: &ProviderError) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let next = match error {
            ProviderError::BillingNotEnabled => ProviderState::BillingError,
            ProviderError::CredentialRejected(_) => ProviderState::Invalid,
            ProviderError::Other(message) => {
                warn!(%message, "provider error without availability impact");
                return false;
            }
        };
        warn!(from = %self.state, to = %next, error = %error, "provider became unavailable");
        self.state = next;
        true
    }

    /// Manual retry: back to `Checking`.
    pub fn reset(&mut self) {
        info!(from = %self.state, "provider availability reset");
        self.state = ProviderState::Checking;
    }
}

#[cfg(test)]
mod tests {
    use super::{CredentialFormat, ProviderAvailability, ProviderError, ProviderState};

    const GOOD_KEY: &str = "AIzaSyA0123456789abcdefghijklmnopqrs";

    #[test]
    fn format_check_resolves_checking() {
        let mut p = ProviderAvailability::new(CredentialFormat::default());
        assert_eq!(p.state(), ProviderState::Checking);
        assert_eq!(p.check_credential(Some(GOOD_KEY)), ProviderState::Valid);

        let mut p = ProviderAvailability::new(CredentialFormat::default());
        assert_eq!(p.check_credential(Some("")), ProviderState::Invalid);

        let mut p = ProviderAvailability::new(CredentialFormat::default());
        assert_eq!(p.check_credential(None), ProviderState::Invalid);

        let mut p = ProviderAvailability::new(CredentialFormat::default());
        assert_eq!(p.check_credential(Some("AIzaShort")), ProviderState::Invalid);

        let mut p = ProviderAvailability::new(CredentialFormat::default());
        let wrong_prefix = "XXzaSyA0123456789abcdefghijklmnopqrs";
        assert_eq!(p.check_credential(Some(wrong_prefix)), ProviderState::Invalid);
    }

    #[test]
    fn terminal_states_hold_until_reset() {
        let mut p = ProviderAvailability::new(CredentialFormat::default());
        p.check_credential(Some(GOOD_KEY));
        assert!(p.report(&ProviderError::BillingNotEnabled));
        assert_eq!(p.state(), ProviderState::BillingError);

        assert!(!p.report(&ProviderError::CredentialRejected("x".into())));
        assert_eq!(p.check_credential(Some(GOOD_KEY)), ProviderState::BillingError);
        assert_eq!(p.state(), ProviderState::BillingError);

        p.reset();
        assert_eq!(p.state(), ProviderState::Checking);
        assert_eq!(p.check_credential(Some(GOOD_KEY)), ProviderState::Valid);
    }

    #[test]
    fn invalid_never_returns_to_valid_without_reset() {
        let mut p = ProviderAvailability::new(CredentialFormat::default());
        p.check_credential(Some(""));
        for err in [
            ProviderError::BillingNotEnabled,
            ProviderError::Other("tile load failed".into()),
        ] {
            assert!(!p.report(&err));
        }
        assert_eq!(p.check_credential(Some(GOOD_KEY)), ProviderState::Invalid);
    }

    #[test]
    fn checking_can_fail_on_billing() {
        let mut p = ProviderAvailability::new(CredentialFormat::default());
        assert!(p.report(&ProviderError::BillingNotEnabled));
        assert_eq!(p.state(), ProviderState::BillingError);
    }

    #[test]
    fn other_errors_do_not_change_state() {
        let mut p = ProviderAvailability::new(CredentialFormat::any_non_empty());
        p.check_credential(Some("k"));
        assert!(!p.report(&ProviderError::Other("network glitch".into())));
        assert_eq!(p.state(), ProviderState::Valid);
    }

    #[test]
    fn classifies_free_text_case_insensitively() {
        assert_eq!(
            ProviderError::from_message("Google Maps JavaScript API error: BillingNotEnabledMapError"),
            ProviderError::BillingNotEnabled
        );
        assert_eq!(
            ProviderError::from_message("billing-not-enabled-map-error"),
            ProviderError::BillingNotEnabled
        );
        assert!(matches!(
            ProviderError::from_message("RefererNotAllowedMapError"),
            ProviderError::CredentialRejected(_)
        ));
        assert!(matches!(
            ProviderError::from_message("InvalidKeyMapError"),
            ProviderError::CredentialRejected(_)
        ));
        assert!(matches!(
            ProviderError::from_message("tiles slow"),
            ProviderError::Other(_)
        ));
    }
}
