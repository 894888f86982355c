// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-in identity and the identity provider's error taxonomy.

use serde::{Deserialize, Serialize};

/// Authenticated end-user as issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider user ID (also the profile document ID)
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

/// Error codes reported by the identity provider during interactive sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    InvalidCredential,
    InvalidEmail,
    WeakPassword,
    TooManyRequests,
    LinkedToOtherMethod,
    PopupCancelled,
    Unknown,
}

impl AuthErrorCode {
    /// Parse a provider error code such as `auth/weak-password`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "auth/invalid-credential" | "auth/wrong-password" | "auth/user-not-found" => {
                Self::InvalidCredential
            }
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/weak-password" => Self::WeakPassword,
            "auth/too-many-requests" => Self::TooManyRequests,
            "auth/account-exists-with-different-credential" => Self::LinkedToOtherMethod,
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => Self::PopupCancelled,
            _ => Self::Unknown,
        }
    }

    /// Fixed user-facing message, or `None` when the error is a no-op.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::EmailAlreadyInUse => {
                Some("This email is already registered. Try signing in instead.")
            }
            Self::InvalidCredential => Some("Invalid email or password. Please try again."),
            Self::InvalidEmail => Some("Please enter a valid email address."),
            Self::WeakPassword => Some("Password should be at least 6 characters."),
            Self::TooManyRequests => Some("Too many failed attempts. Please try again later."),
            Self::LinkedToOtherMethod => Some("This account uses a different sign-in method."),
            Self::PopupCancelled => None,
            Self::Unknown => Some("An error occurred. Please try again."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_password_and_unknown_user_share_message() {
        let a = AuthErrorCode::from_code("auth/wrong-password");
        let b = AuthErrorCode::from_code("auth/user-not-found");
        assert_eq!(a, AuthErrorCode::InvalidCredential);
        assert_eq!(a.user_message(), b.user_message());
    }

    #[test]
    fn cancelled_popup_is_silent() {
        for code in ["auth/popup-closed-by-user", "auth/cancelled-popup-request"] {
            assert_eq!(AuthErrorCode::from_code(code).user_message(), None);
        }
    }

    #[test]
    fn unrecognized_code_gets_generic_message() {
        let code = AuthErrorCode::from_code("auth/network-request-failed");
        assert_eq!(code, AuthErrorCode::Unknown);
        assert!(code.user_message().is_some());
    }
}
