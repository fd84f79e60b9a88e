//! Crypto policy snapshot consumed by the message builder.

use serde::{Deserialize, Serialize};

/// The resolved crypto policy for one message.
///
/// Produced by the caller's policy layer (account settings, recipient
/// autocrypt state, compose-screen choices) and treated as immutable for
/// the whole build, including across a suspend/resume cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoStatus {
    signing_enabled: bool,
    encryption_enabled: bool,
    pgp_inline_mode: bool,
    encrypt_all_drafts: bool,
    encrypt_subject: bool,
    prefer_encrypt_mutual: bool,
    openpgp_key_id: Option<i64>,
    recipient_addresses: Vec<String>,
    provider_state_ok: bool,
}

impl Default for CryptoStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoStatus {
    /// Creates a snapshot with no crypto requested and the provider
    /// assumed ready.
    pub fn new() -> Self {
        Self {
            signing_enabled: false,
            encryption_enabled: false,
            pgp_inline_mode: false,
            encrypt_all_drafts: false,
            encrypt_subject: false,
            prefer_encrypt_mutual: false,
            openpgp_key_id: None,
            recipient_addresses: Vec::new(),
            provider_state_ok: true,
        }
    }

    /// Requests signing.
    pub fn with_signing(mut self, enabled: bool) -> Self {
        self.signing_enabled = enabled;
        self
    }

    /// Requests encryption.
    pub fn with_encryption(mut self, enabled: bool) -> Self {
        self.encryption_enabled = enabled;
        self
    }

    /// Selects the inline message format instead of MIME containers.
    pub fn with_inline_mode(mut self, enabled: bool) -> Self {
        self.pgp_inline_mode = enabled;
        self
    }

    /// Encrypts drafts even when encryption is otherwise off.
    pub fn with_encrypt_all_drafts(mut self, enabled: bool) -> Self {
        self.encrypt_all_drafts = enabled;
        self
    }

    /// Moves the subject into the encrypted payload.
    pub fn with_encrypt_subject(mut self, enabled: bool) -> Self {
        self.encrypt_subject = enabled;
        self
    }

    /// Advertises the sender's mutual encryption preference.
    pub fn with_prefer_encrypt_mutual(mut self, enabled: bool) -> Self {
        self.prefer_encrypt_mutual = enabled;
        self
    }

    /// Sets the sender's provider-side key id.
    pub fn with_key_id(mut self, key_id: i64) -> Self {
        self.openpgp_key_id = Some(key_id);
        self
    }

    /// Sets the resolved recipient addresses (ordered, deduplicated).
    pub fn with_recipients(mut self, addresses: Vec<String>) -> Self {
        self.recipient_addresses = addresses;
        self
    }

    /// Records whether the provider connection is usable.
    pub fn with_provider_ready(mut self, ready: bool) -> Self {
        self.provider_state_ok = ready;
        self
    }

    /// Returns true if signing is requested.
    pub fn is_signing_enabled(&self) -> bool {
        self.signing_enabled
    }

    /// Returns true if encryption is requested.
    pub fn is_encryption_enabled(&self) -> bool {
        self.encryption_enabled
    }

    /// Returns true if the inline message format is requested.
    pub fn is_pgp_inline_mode(&self) -> bool {
        self.pgp_inline_mode
    }

    /// Returns true if drafts are always encrypted.
    pub fn is_encrypt_all_drafts(&self) -> bool {
        self.encrypt_all_drafts
    }

    /// Returns true if the subject should move into the payload.
    pub fn is_encrypt_subject(&self) -> bool {
        self.encrypt_subject
    }

    /// Returns the sender's mutual encryption preference.
    ///
    /// Advisory only: consumed by header-producing collaborators, not by
    /// the build itself.
    pub fn is_prefer_encrypt_mutual(&self) -> bool {
        self.prefer_encrypt_mutual
    }

    /// Returns the sender's provider-side key id, if crypto is configured.
    pub fn openpgp_key_id(&self) -> Option<i64> {
        self.openpgp_key_id
    }

    /// Returns the resolved recipient addresses.
    pub fn recipient_addresses(&self) -> &[String] {
        &self.recipient_addresses
    }

    /// Returns true if the provider connection is usable.
    pub fn is_provider_state_ok(&self) -> bool {
        self.provider_state_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let status = CryptoStatus::new();

        assert!(!status.is_signing_enabled());
        assert!(!status.is_encryption_enabled());
        assert!(!status.is_pgp_inline_mode());
        assert!(status.openpgp_key_id().is_none());
        assert!(status.recipient_addresses().is_empty());
        assert!(status.is_provider_state_ok());
    }

    #[test]
    fn test_fluent_construction() {
        let status = CryptoStatus::new()
            .with_signing(true)
            .with_encryption(true)
            .with_encrypt_subject(true)
            .with_key_id(0x1122)
            .with_recipients(vec!["bob@example.org".to_string()])
            .with_provider_ready(false);

        assert!(status.is_signing_enabled());
        assert!(status.is_encryption_enabled());
        assert!(status.is_encrypt_subject());
        assert_eq!(status.openpgp_key_id(), Some(0x1122));
        assert_eq!(status.recipient_addresses(), ["bob@example.org"]);
        assert!(!status.is_provider_state_ok());
    }
}
