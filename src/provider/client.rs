//! Provider submission: output capture and outcome mapping.

use crate::error::{PqMailError, Result};
use crate::mime::{EolConvertingWriter, TransferEncoding};
use crate::provider::{
    CryptoProvider, InteractionToken, PayloadSource, ProviderRequest, ProviderResponse,
    ResponseCode,
};
use std::io::{Read, Seek, SeekFrom};
use tempfile::SpooledTempFile;
use tracing::debug;

/// Captured output stays in memory up to this size, then spools to disk.
const CAPTURE_SPOOL_LIMIT: usize = 256 * 1024;

/// Provider output captured during a submit, CRLF-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedOutput {
    /// Normalized content bytes
    pub data: Vec<u8>,
    /// The transfer encoding the content should be declared with
    pub encoding: TransferEncoding,
}

/// The mapped result of one provider submit.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    /// The provider finished its end of the work.
    Completed {
        /// Captured message content, when capture was requested
        output: Option<CapturedOutput>,
        /// Detached signature bytes, for detached-sign requests
        detached_signature: Option<Vec<u8>>,
        /// Integrity algorithm reported for the signature
        micalg: Option<String>,
    },
    /// The provider suspended; the token identifies the pending interaction.
    InteractionRequired(InteractionToken),
}

/// Wraps a [`CryptoProvider`] with capture handling and protocol checks.
#[derive(Debug)]
pub struct ProviderClient<P> {
    provider: P,
}

impl<P: CryptoProvider> ProviderClient<P> {
    /// Creates a client around a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Submits one request.
    ///
    /// When `capture` is set, provider output is streamed into a spooled
    /// temporary sink through EOL normalization and returned as owned
    /// bytes tagged with the given encoding. The sink lives only for this
    /// call.
    pub fn submit(
        &self,
        request: &ProviderRequest,
        source: &mut dyn PayloadSource,
        capture: Option<TransferEncoding>,
    ) -> Result<ProviderOutcome> {
        debug!(
            action = ?request.action,
            capture = capture.is_some(),
            resumed = request.resumption.is_some(),
            "Submitting request to crypto provider"
        );

        let (response, output) = match capture {
            Some(encoding) => {
                let mut sink = SpooledTempFile::new(CAPTURE_SPOOL_LIMIT);
                let mut writer = EolConvertingWriter::new(&mut sink);
                let response = self.provider.execute(request, source, Some(&mut writer))?;
                writer.finish()?;

                let mut data = Vec::new();
                sink.seek(SeekFrom::Start(0))?;
                sink.read_to_end(&mut data)?;
                (response, Some(CapturedOutput { data, encoding }))
            }
            None => (self.provider.execute(request, source, None)?, None),
        };

        map_outcome(response, output)
    }
}

fn map_outcome(
    response: ProviderResponse,
    output: Option<CapturedOutput>,
) -> Result<ProviderOutcome> {
    match response.code {
        ResponseCode::Success => Ok(ProviderOutcome::Completed {
            output,
            detached_signature: response.detached_signature,
            micalg: response.micalg,
        }),
        ResponseCode::UserInteractionRequired => match response.interaction {
            Some(token) => Ok(ProviderOutcome::InteractionRequired(token)),
            None => Err(PqMailError::provider(
                "Provider requested user interaction but returned no resumption token",
            )),
        },
        ResponseCode::Error => Err(PqMailError::provider(
            response
                .error
                .unwrap_or_else(|| "Internal provider error".to_string()),
        )),
    }
}
