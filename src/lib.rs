//! # PQMail - Post-Quantum Protected Message Building
//!
//! Builds outgoing email messages with cryptographic protection: classic
//! OpenPGP signing and encryption delegated to an external provider
//! process, plus a detached post-quantum signature layer on top.
//!
//! ## Features
//!
//! - **Build State Machine**: One builder per message, with an explicit
//!   suspend/resume protocol for provider-side user interaction
//! - **Post-Quantum Signatures**: Dilithium, Falcon, and SPHINCS+ detached
//!   signatures attached alongside the classic protection
//! - **Wire-Format MIME**: multipart/signed and multipart/encrypted
//!   containers, inline protection, and CRLF-normalized provider output
//! - **Header Protection**: subject relocation into the encrypted payload
//!   and best-effort key gossip for overt recipients
//!
//! ## Examples
//!
//! ### Post-quantum signing
//!
//! ```rust,no_run
//! use pqmail::pq::{PqAlgorithm, PqSigner};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = PqSigner::generate(PqAlgorithm::Dilithium5);
//! let signature = signer.sign(b"message bytes")?;
//! assert!(signer.verify(b"message bytes", &signature));
//! # Ok(())
//! # }
//! ```
//!
//! ### Building a protected message
//!
//! ```rust,no_run
//! use pqmail::builder::{BuildOutcome, BuildRequest, CryptoMessageBuilder, CryptoStatus};
//! use pqmail::mime::{Body, MimeMessage, TransferEncoding};
//! # use pqmail::provider::{CryptoProvider, PayloadSource, ProviderRequest, ProviderResponse};
//! # struct MyProvider;
//! # impl CryptoProvider for MyProvider {
//! #     fn execute(&self, _: &ProviderRequest, _: &mut dyn PayloadSource,
//! #                _: Option<&mut dyn std::io::Write>) -> pqmail::Result<ProviderResponse> {
//! #         Ok(ProviderResponse::success())
//! #     }
//! # }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut message = MimeMessage::new();
//! message.headers.set("To", "bob@example.org");
//! message.set_body(Body::Text("hello\r\n".to_string()), TransferEncoding::SevenBit);
//!
//! let mut builder = CryptoMessageBuilder::new(MyProvider);
//! let status = CryptoStatus::new()
//!     .with_encryption(true)
//!     .with_key_id(0x1122334455667788)
//!     .with_recipients(vec!["bob@example.org".to_string()]);
//!
//! match builder.build(BuildRequest::new(message), status)? {
//!     BuildOutcome::Finished(protected) => {
//!         println!("protected message: {} bytes", protected.to_bytes()?.len());
//!     }
//!     BuildOutcome::Pending(token) => {
//!         println!("waiting on user interaction: {:?}", token);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod armor;
pub mod builder;
pub mod cli;
pub mod error;
pub mod mime;
pub mod pq;
pub mod provider;

pub use error::{PqMailError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
