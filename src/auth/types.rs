//! Account and session records.
//!
//! An [`Account`] is what the ledger stores. A [`PublicAccount`] is the
//! projection handed to the UI layer and persisted as the current session:
//! every field except the secret hash.

use super::AuthError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque account identifier (UUID v4 string).
pub type AccountId = String;

// ── Role ────────────────────────────────────────────────────────

/// Dashboard role an account is registered under. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Organisation running projects and submitting impact reports.
    Ngo,
    /// Funds projects through the donation flow.
    Donor,
    /// Verifies submitted reports.
    Auditor,
}

impl Role {
    /// Wire value, as persisted.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ngo => "ngo",
            Self::Donor => "donor",
            Self::Auditor => "auditor",
        }
    }

    /// Human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ngo => "NGO",
            Self::Donor => "Donor",
            Self::Auditor => "Auditor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ngo" => Ok(Self::Ngo),
            "donor" => Ok(Self::Donor),
            "auditor" => Ok(Self::Auditor),
            _ => Err(AuthError::UnknownRole(s.to_string())),
        }
    }
}

// ── Records ─────────────────────────────────────────────────────

/// Public projection of an account. This is the session value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccount {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Argon2id PHC string; carries its own salt and parameters.
    pub secret_hash: String,
}

impl Account {
    /// Create a ledger entry with a fresh id.
    pub fn new(name: &str, email: &str, role: Role, secret_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            avatar: None,
            secret_hash,
        }
    }

    /// Everything except the secret hash.
    pub fn public(&self) -> PublicAccount {
        PublicAccount {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
        }
    }
}
