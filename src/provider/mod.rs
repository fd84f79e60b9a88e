//! Protocol types for the external OpenPGP provider.
//!
//! Classic signing and encryption are delegated to a separate provider
//! process. This module defines the request/response surface of that
//! protocol and the traits the message builder consumes:
//!
//! - [`CryptoProvider`]: the provider seam itself
//! - [`PayloadSource`]: lazy payload bytes handed to the provider
//! - [`KeyMaterialSource`]: per-recipient key material for gossip headers
//!
//! Submission, output capture and outcome mapping live in [`client`].

pub mod client;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Write};

pub use client::{CapturedOutput, ProviderClient, ProviderOutcome};

// =============================================================================
// Requests
// =============================================================================

/// The operation requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderAction {
    /// Inline (cleartext) signing
    Sign,
    /// Encryption without signing
    Encrypt,
    /// Combined signing and encryption
    SignAndEncrypt,
    /// Detached signature over the payload
    DetachedSign,
}

/// An opaque token identifying a suspended provider interaction.
///
/// The builder never inspects the payload; it only hands the token back to
/// the caller and accepts it again inside the resumed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionToken(Value);

impl InteractionToken {
    /// Wraps a provider-defined payload.
    ///
    /// Payloads that fail JSON serialization collapse to the null token,
    /// the same value `new(())` produces. Callers that must distinguish
    /// the two cases should call [`serde_json::to_value`] themselves.
    pub fn new(payload: impl Serialize) -> Self {
        Self(serde_json::to_value(payload).unwrap_or(Value::Null))
    }

    /// Returns the provider-defined payload.
    pub fn payload(&self) -> &Value {
        &self.0
    }
}

/// A request to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Requested operation
    pub action: ProviderAction,
    /// Key id to sign with, when signing
    pub sign_key_id: Option<i64>,
    /// Key ids to encrypt to (the sender's own keys)
    pub encrypt_key_ids: Vec<i64>,
    /// Recipient addresses to resolve and encrypt to
    pub recipients: Vec<String>,
    /// Request ASCII-armored output
    pub request_ascii_armor: bool,
    /// Token of a suspended interaction being resumed
    pub resumption: Option<InteractionToken>,
}

impl ProviderRequest {
    /// Creates a request for the given action. Armor is always requested;
    /// protected messages embed provider output as text parts.
    pub fn new(action: ProviderAction) -> Self {
        Self {
            action,
            sign_key_id: None,
            encrypt_key_ids: Vec::new(),
            recipients: Vec::new(),
            request_ascii_armor: true,
            resumption: None,
        }
    }

    /// Creates a resumed request carrying the interaction token back to
    /// the provider.
    pub fn resume(action: ProviderAction, token: InteractionToken) -> Self {
        let mut request = Self::new(action);
        request.resumption = Some(token);
        request
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Provider response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    /// The operation completed
    Success,
    /// The provider needs the user before it can continue
    UserInteractionRequired,
    /// The operation failed
    Error,
}

/// The raw provider response.
///
/// [`client::ProviderClient::submit`] maps this into a typed outcome; the
/// builder never sees raw responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Response code
    pub code: ResponseCode,
    /// Detached signature bytes, for detached-sign requests
    pub detached_signature: Option<Vec<u8>>,
    /// Message integrity algorithm reported for the signature
    pub micalg: Option<String>,
    /// Resumption token, when interaction is required
    pub interaction: Option<InteractionToken>,
    /// Error detail, when the operation failed
    pub error: Option<String>,
}

impl ProviderResponse {
    /// Creates a success response (useful for testing providers).
    pub fn success() -> Self {
        Self {
            code: ResponseCode::Success,
            detached_signature: None,
            micalg: None,
            interaction: None,
            error: None,
        }
    }

    /// Attaches a detached signature to a success response.
    pub fn with_detached_signature(mut self, signature: Vec<u8>) -> Self {
        self.detached_signature = Some(signature);
        self
    }

    /// Attaches a micalg value to a success response.
    pub fn with_micalg(mut self, micalg: &str) -> Self {
        self.micalg = Some(micalg.to_string());
        self
    }

    /// Creates an interaction-required response. Passing `None` models a
    /// provider that forgot the token, which submission rejects.
    pub fn interaction_required(token: Option<InteractionToken>) -> Self {
        Self {
            code: ResponseCode::UserInteractionRequired,
            detached_signature: None,
            micalg: None,
            interaction: token,
            error: None,
        }
    }

    /// Creates an error response.
    pub fn failure(detail: &str) -> Self {
        Self {
            code: ResponseCode::Error,
            detached_signature: None,
            micalg: None,
            interaction: None,
            error: Some(detail.to_string()),
        }
    }
}

// =============================================================================
// Seams
// =============================================================================

/// A lazy payload byte producer.
///
/// The provider pulls the payload through this exactly once per call; the
/// producer must not assume it is read more than that.
pub trait PayloadSource {
    /// Writes the payload bytes into `out`.
    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()>;
}

/// The external crypto provider.
///
/// Implementations transport [`ProviderRequest`]s to the provider process,
/// stream the payload from `source`, write any produced message content
/// into `output` when one is supplied, and return the raw response.
pub trait CryptoProvider {
    fn execute(
        &self,
        request: &ProviderRequest,
        source: &mut dyn PayloadSource,
        output: Option<&mut dyn Write>,
    ) -> Result<ProviderResponse>;
}

/// Per-address key material lookup for gossip headers.
///
/// `None` means no material is available for the address; gossip is
/// best-effort and the builder skips such recipients.
pub trait KeyMaterialSource {
    fn key_material_for_address(&self, address: &str) -> Option<Vec<u8>>;
}
