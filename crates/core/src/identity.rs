//! Caller identities and the owner gate.
//!
//! The ledger never discovers who is calling. The transport layer hands an
//! [`Identity`] to every operation, and admin operations check it against
//! the current owner through [`OwnerGate`].

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Hash};

/// An opaque, non-empty caller identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Build an identity, rejecting empty or whitespace-only values.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidIdentity);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Identity minted from an ed25519 public key: the hex BLAKE3 hash of
    /// its bytes.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(Hash::of(key.as_bytes()).to_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Identity {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Holds the single owning identity.
#[derive(Clone, Debug)]
pub struct OwnerGate {
    owner: Identity,
}

impl OwnerGate {
    pub fn new(owner: Identity) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Fails with `Unauthorized` unless `caller` is the owner.
    pub fn ensure(&self, caller: &Identity) -> Result<(), Error> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Check a transfer without applying it.
    pub(crate) fn check_transfer(&self, caller: &Identity, new_owner: &Identity) -> Result<(), Error> {
        self.ensure(caller)?;
        if *new_owner == self.owner {
            return Err(Error::InvalidIdentity);
        }
        Ok(())
    }

    /// Replace the owner, returning the previous one. Callers must have
    /// passed [`OwnerGate::check_transfer`].
    pub(crate) fn replace(&mut self, new_owner: Identity) -> Identity {
        std::mem::replace(&mut self.owner, new_owner)
    }
}
