//! Message build state machine.
//!
//! Turns a plaintext outgoing message plus a [`CryptoStatus`] policy into
//! its final protected form. A build runs sequentially but may suspend
//! when the provider needs the user first; the caller resumes it with the
//! result of that interaction. The payload part is extracted at most once
//! per build and cached, so the provider sees identical bytes on every
//! attempt.

pub mod assemble;
pub mod status;

use crate::error::{PqMailError, Result};
use crate::mime::{
    is_same_mime_type, BoundaryGenerator, MimeMessage, MimePart, TransferEncoding,
    HEADER_CONTENT_TYPE, HEADER_SUBJECT,
};
use crate::pq::PqSigner;
use crate::provider::{
    CapturedOutput, CryptoProvider, InteractionToken, KeyMaterialSource, PayloadSource,
    ProviderAction, ProviderClient, ProviderOutcome, ProviderRequest,
};
use base64::engine::general_purpose;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::{debug, warn};

pub use status::CryptoStatus;

/// Header relocated from the outer message into the payload for drafts.
pub const HEADER_DRAFT_IDENTITY: &str = "X-Identity";
/// Per-recipient key gossip header added to encrypted payloads.
pub const HEADER_AUTOCRYPT_GOSSIP: &str = "Autocrypt-Gossip";
/// Subject left on the outer message when the real subject moves into
/// the encrypted payload.
pub const DEFAULT_ENCRYPTED_SUBJECT: &str = "...";

/// Folded line width for gossip key data.
const GOSSIP_WRAP_WIDTH: usize = 76;

// =============================================================================
// Build request and outcome
// =============================================================================

/// One message build in flight.
///
/// Owns the message being finalized together with the state that must
/// survive a suspend: the cached payload part and the pending interaction
/// token. The whole request is serializable, so a suspended build can
/// outlive the process that started it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    message: MimeMessage,
    payload: Option<MimePart>,
    pending: Option<InteractionToken>,
    is_draft: bool,
}

impl BuildRequest {
    /// Creates a build request for an outgoing message.
    pub fn new(message: MimeMessage) -> Self {
        Self {
            message,
            payload: None,
            pending: None,
            is_draft: false,
        }
    }

    /// Creates a build request for a draft being saved.
    pub fn draft(message: MimeMessage) -> Self {
        Self {
            is_draft: true,
            ..Self::new(message)
        }
    }

    /// Returns the message being finalized.
    pub fn message(&self) -> &MimeMessage {
        &self.message
    }

    /// Returns true if this build is for a draft.
    pub fn is_draft(&self) -> bool {
        self.is_draft
    }

    /// Returns the token of the suspended interaction, if the build is
    /// waiting on one.
    pub fn pending_interaction(&self) -> Option<&InteractionToken> {
        self.pending.as_ref()
    }

    /// Consumes the request, returning the message unmodified.
    pub fn into_message(self) -> MimeMessage {
        self.message
    }

    fn into_parts(self) -> (MimeMessage, Option<MimePart>) {
        (self.message, self.payload)
    }
}

/// The caller-visible result of a build or resume call.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// The build reached its terminal form.
    Finished(MimeMessage),
    /// The build suspended; resume it once the interaction identified by
    /// the token has taken place.
    Pending(InteractionToken),
}

// =============================================================================
// Internal build state
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildPhase {
    Start,
    AwaitingInteraction,
    Terminal,
}

/// Crypto modes actually applied to this build, after draft adjustment.
#[derive(Debug, Clone, Copy)]
struct BuildModes {
    sign: bool,
    encrypt: bool,
    inline: bool,
}

/// Drafts are never signed and never use the inline format; they are
/// encrypted to self when the policy asks for encrypted drafts.
fn resolve_modes(status: &CryptoStatus, is_draft: bool) -> BuildModes {
    BuildModes {
        sign: status.is_signing_enabled() && !is_draft,
        encrypt: status.is_encryption_enabled() || (is_draft && status.is_encrypt_all_drafts()),
        inline: status.is_pgp_inline_mode() && !is_draft,
    }
}

#[derive(Debug, Clone)]
struct BuildState {
    request: BuildRequest,
    status: CryptoStatus,
}

/// Streams the cached payload part into the provider.
struct PartSource<'a> {
    part: &'a MimePart,
    content_only: bool,
}

impl PayloadSource for PartSource<'_> {
    fn write_to(&mut self, mut out: &mut dyn Write) -> io::Result<()> {
        if self.content_only {
            self.part.body().write_raw(&mut out)
        } else {
            self.part.write_to(&mut out)
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds one protected message.
///
/// Created per message. [`CryptoMessageBuilder::build`] starts the build;
/// when it returns [`BuildOutcome::Pending`], the caller obtains the user
/// interaction out of band and calls [`CryptoMessageBuilder::resume`]
/// with the result. Either entry point may conclude with a terminal
/// outcome, after which the builder accepts no further calls.
pub struct CryptoMessageBuilder<P> {
    client: ProviderClient<P>,
    pq_signer: Option<PqSigner>,
    key_material: Option<Box<dyn KeyMaterialSource>>,
    boundaries: BoundaryGenerator,
    encrypted_subject: String,
    phase: BuildPhase,
    state: Option<BuildState>,
}

impl<P: CryptoProvider> CryptoMessageBuilder<P> {
    /// Creates a builder around a provider, with no post-quantum layer.
    pub fn new(provider: P) -> Self {
        Self {
            client: ProviderClient::new(provider),
            pq_signer: None,
            key_material: None,
            boundaries: BoundaryGenerator::new(),
            encrypted_subject: DEFAULT_ENCRYPTED_SUBJECT.to_string(),
            phase: BuildPhase::Start,
            state: None,
        }
    }

    /// Adds a post-quantum signer; signed messages then carry a detached
    /// post-quantum signature and the signer's exported public key.
    pub fn with_pq_signer(mut self, signer: PqSigner) -> Self {
        self.pq_signer = Some(signer);
        self
    }

    /// Adds a key material lookup for gossip headers.
    pub fn with_key_material_source(mut self, source: Box<dyn KeyMaterialSource>) -> Self {
        self.key_material = Some(source);
        self
    }

    /// Replaces the boundary generator (useful for testing).
    pub fn with_boundary_generator(mut self, boundaries: BoundaryGenerator) -> Self {
        self.boundaries = boundaries;
        self
    }

    /// Overrides the subject placeholder used when the real subject moves
    /// into the encrypted payload.
    pub fn with_encrypted_subject(mut self, placeholder: &str) -> Self {
        self.encrypted_subject = placeholder.to_string();
        self
    }

    /// Returns the wrapped provider.
    pub fn provider(&self) -> &P {
        self.client.provider()
    }

    /// Starts a build.
    ///
    /// Returns [`BuildOutcome::Finished`] with the protected message, or
    /// [`BuildOutcome::Pending`] when the provider first needs the user.
    /// A builder accepts exactly one `build` call.
    pub fn build(&mut self, request: BuildRequest, status: CryptoStatus) -> Result<BuildOutcome> {
        if self.phase != BuildPhase::Start {
            return Err(PqMailError::invalid_state("Message can only be built once"));
        }
        debug!(is_draft = request.is_draft, "Starting protected message build");

        if status.openpgp_key_id().is_none() {
            debug!("No crypto key configured, passing message through unmodified");
            self.phase = BuildPhase::Terminal;
            return Ok(BuildOutcome::Finished(request.into_message()));
        }
        if !status.is_provider_state_ok() {
            self.phase = BuildPhase::Terminal;
            return Err(PqMailError::provider("Crypto provider is not ready"));
        }

        self.state = Some(BuildState { request, status });
        let result = self.advance(None);
        self.settle(result)
    }

    /// Resumes a suspended build with the result of the user interaction.
    ///
    /// `reply` is submitted to the provider in place of the originally
    /// computed request; [`ProviderRequest::resume`] constructs it from
    /// the token obtained through the interaction. Valid only while the
    /// build is awaiting an interaction.
    pub fn resume(&mut self, reply: ProviderRequest) -> Result<BuildOutcome> {
        if self.phase != BuildPhase::AwaitingInteraction {
            return Err(PqMailError::invalid_state(
                "No pending user interaction to resume",
            ));
        }
        debug!("Resuming suspended message build");
        if let Some(state) = self.state.as_mut() {
            state.request.pending = None;
        }

        let result = self.advance(Some(reply));
        self.settle(result)
    }

    /// Records the terminal or suspended phase implied by `result`.
    fn settle(&mut self, result: Result<BuildOutcome>) -> Result<BuildOutcome> {
        match &result {
            Ok(BuildOutcome::Pending(_)) => self.phase = BuildPhase::AwaitingInteraction,
            Ok(BuildOutcome::Finished(_)) | Err(_) => {
                self.phase = BuildPhase::Terminal;
                self.state = None;
            }
        }
        result
    }

    /// Runs one build attempt: validate, extract the payload if this is
    /// the first attempt, submit to the provider, and either suspend or
    /// assemble the terminal message.
    fn advance(&mut self, reply: Option<ProviderRequest>) -> Result<BuildOutcome> {
        let (modes, is_draft) = match self.state.as_ref() {
            Some(state) => (
                resolve_modes(&state.status, state.request.is_draft),
                state.request.is_draft,
            ),
            None => return Err(PqMailError::assertion("No message build in progress")),
        };

        if !modes.sign && !modes.encrypt {
            debug!("Neither signing nor encryption applies, passing message through");
            let state = self.take_state()?;
            return Ok(BuildOutcome::Finished(state.request.into_message()));
        }

        self.prepare_payload(modes)?;

        let state = match self.state.as_ref() {
            Some(state) => state,
            None => return Err(PqMailError::assertion("Build state lost before provider call")),
        };
        let part = match state.request.payload.as_ref() {
            Some(part) => part,
            None => {
                return Err(PqMailError::assertion(
                    "Payload part missing before provider call",
                ))
            }
        };

        let provider_request = match reply {
            Some(request) => request,
            None => build_provider_request(&state.status, modes, is_draft),
        };

        // Armored ciphertext is plain ASCII; only inline cleartext output
        // can contain 8-bit content.
        let capture = if modes.encrypt || modes.inline {
            Some(if modes.encrypt || !modes.inline {
                TransferEncoding::SevenBit
            } else {
                TransferEncoding::EightBit
            })
        } else {
            None
        };

        let mut source = PartSource {
            part,
            content_only: modes.inline,
        };
        let outcome = self.client.submit(&provider_request, &mut source, capture)?;

        match outcome {
            ProviderOutcome::InteractionRequired(token) => {
                let state = match self.state.as_mut() {
                    Some(state) => state,
                    None => {
                        return Err(PqMailError::assertion(
                            "Build state lost during provider call",
                        ))
                    }
                };
                state.request.pending = Some(token.clone());
                Ok(BuildOutcome::Pending(token))
            }
            ProviderOutcome::Completed {
                output,
                detached_signature,
                micalg,
            } => {
                let state = self.take_state()?;
                let message =
                    self.assemble_terminal(state, modes, output, detached_signature, micalg)?;
                Ok(BuildOutcome::Finished(message))
            }
        }
    }

    /// Validates the build and extracts the payload part on the first
    /// attempt. Later attempts reuse the cached part untouched.
    fn prepare_payload(&mut self, modes: BuildModes) -> Result<()> {
        let state = match self.state.as_mut() {
            Some(state) => state,
            None => return Err(PqMailError::assertion("No message build in progress")),
        };

        if modes.inline && !is_same_mime_type(&state.request.message.mime_type(), "text/plain") {
            return Err(PqMailError::policy(
                "Inline format can only protect plain text messages",
            ));
        }
        if modes.encrypt && !state.request.is_draft && state.status.recipient_addresses().is_empty()
        {
            return Err(PqMailError::policy(
                "Cannot encrypt a message without any recipients",
            ));
        }

        if state.request.payload.is_some() {
            return Ok(());
        }

        let mut part = state.request.message.detach_body_part();
        if state.request.is_draft {
            relocate_draft_identity(&mut state.request.message, &mut part);
        }
        if !modes.inline {
            if modes.encrypt && state.status.is_encrypt_subject() {
                move_subject_into_payload(
                    &mut state.request.message,
                    &mut part,
                    &self.encrypted_subject,
                );
            }
            if state.status.is_encryption_enabled() {
                add_gossip_headers(
                    &mut part,
                    &state.status,
                    &state.request.message,
                    self.key_material.as_deref(),
                );
            }
        }
        state.request.payload = Some(part);
        Ok(())
    }

    /// Folds the provider result back into the outer message.
    fn assemble_terminal(
        &mut self,
        state: BuildState,
        modes: BuildModes,
        output: Option<CapturedOutput>,
        detached_signature: Option<Vec<u8>>,
        micalg: Option<String>,
    ) -> Result<MimeMessage> {
        let BuildState { request, status } = state;
        let (mut message, payload) = request.into_parts();
        let payload = match payload {
            Some(payload) => payload,
            None => return Err(PqMailError::assertion("Payload part missing at assembly")),
        };

        match output {
            None => {
                if modes.inline || status.is_encryption_enabled() {
                    return Err(PqMailError::assertion(
                        "Encryption or inline mode is enabled, but the provider returned no output",
                    ));
                }
                if !status.is_signing_enabled() {
                    return Err(PqMailError::assertion(
                        "Signed message assembly requires signing to be enabled",
                    ));
                }
                assemble::build_signed_message(
                    &mut message,
                    payload,
                    detached_signature,
                    micalg,
                    self.pq_signer.as_ref(),
                    &mut self.boundaries,
                )?;
            }
            Some(output) => {
                if modes.inline {
                    assemble::build_inline_message(&mut message, output, &status)?;
                } else {
                    assemble::build_encrypted_message(&mut message, output, &mut self.boundaries)?;
                }
            }
        }
        Ok(message)
    }

    fn take_state(&mut self) -> Result<BuildState> {
        self.state
            .take()
            .ok_or_else(|| PqMailError::assertion("No message build in progress"))
    }
}

// =============================================================================
// Request construction and payload enrichment
// =============================================================================

/// Derives the provider request from the resolved modes. Drafts encrypt
/// to the sender's own key only.
fn build_provider_request(
    status: &CryptoStatus,
    modes: BuildModes,
    is_draft: bool,
) -> ProviderRequest {
    let action = if modes.encrypt {
        if modes.sign {
            ProviderAction::SignAndEncrypt
        } else {
            ProviderAction::Encrypt
        }
    } else if modes.inline {
        ProviderAction::Sign
    } else {
        ProviderAction::DetachedSign
    };

    let mut request = ProviderRequest::new(action);
    if modes.sign {
        request.sign_key_id = status.openpgp_key_id();
    }
    if modes.encrypt {
        if let Some(key_id) = status.openpgp_key_id() {
            request.encrypt_key_ids.push(key_id);
        }
        if !is_draft {
            request.recipients = status.recipient_addresses().to_vec();
        }
    }
    request
}

/// Moves the identity header of a draft into the payload, where it
/// survives encryption. Absent headers are fine.
fn relocate_draft_identity(message: &mut MimeMessage, part: &mut MimePart) {
    if let Some(identity) = message.headers.remove(HEADER_DRAFT_IDENTITY) {
        part.headers.set(HEADER_DRAFT_IDENTITY, &identity);
    }
}

/// Moves the subject into the payload part, marks the part as carrying
/// protected headers, and leaves a placeholder on the outer message.
fn move_subject_into_payload(message: &mut MimeMessage, part: &mut MimePart, placeholder: &str) {
    let subject = match message.headers.remove(HEADER_SUBJECT) {
        Some(subject) => subject,
        None => return,
    };

    part.headers.set(HEADER_SUBJECT, &subject);
    let content_type = part
        .headers
        .get(HEADER_CONTENT_TYPE)
        .unwrap_or("text/plain")
        .to_string();
    part.headers.set(
        HEADER_CONTENT_TYPE,
        &format!("{}; protected-headers=\"v1\"", content_type),
    );
    message.headers.set(HEADER_SUBJECT, placeholder);
}

/// Adds one gossip header per overt recipient so that recipients can
/// encrypt replies to each other. Best-effort: recipients without key
/// material are skipped, never escalated.
fn add_gossip_headers(
    part: &mut MimePart,
    status: &CryptoStatus,
    message: &MimeMessage,
    source: Option<&dyn KeyMaterialSource>,
) {
    if !status.is_encryption_enabled() {
        return;
    }

    // Bcc recipients must not be revealed through gossip.
    let bcc = message.bcc_addresses();
    let overt: Vec<&str> = status
        .recipient_addresses()
        .iter()
        .map(String::as_str)
        .filter(|address| !bcc.iter().any(|hidden| hidden.eq_ignore_ascii_case(address)))
        .collect();
    if overt.len() < 2 {
        return;
    }

    let source = match source {
        Some(source) => source,
        None => {
            debug!("No key material source configured, skipping gossip headers");
            return;
        }
    };

    for address in overt {
        match source.key_material_for_address(address) {
            Some(material) => {
                part.headers
                    .add(HEADER_AUTOCRYPT_GOSSIP, &gossip_header_value(address, &material));
            }
            None => {
                warn!(address, "No key material for gossip recipient, skipping");
            }
        }
    }
}

/// Formats one gossip header value, folding the key data at the
/// conventional width.
fn gossip_header_value(address: &str, material: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(material);
    let mut value = format!("addr={}; keydata=", address);
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let take = rest.len().min(GOSSIP_WRAP_WIDTH);
        value.push_str("\r\n ");
        value.push_str(&rest[..take]);
        rest = &rest[take..];
    }
    value
}
