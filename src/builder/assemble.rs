//! Terminal MIME assembly for protected messages.
//!
//! Every build that reaches the provider ends in exactly one of these
//! three shapes: a multipart/signed container, a multipart/encrypted
//! container, or an inline body replacement.

use crate::builder::status::CryptoStatus;
use crate::error::{PqMailError, Result};
use crate::mime::{
    Body, BoundaryGenerator, MimeMessage, MimePart, Multipart, TransferEncoding,
    HEADER_CONTENT_DISPOSITION, HEADER_CONTENT_TYPE,
};
use crate::pq::PqSigner;
use crate::provider::CapturedOutput;
use tracing::warn;

/// Protocol parameter of post-quantum signed messages.
pub const PROTOCOL_PQ_SIGNATURE: &str = "application/pq-signature";
/// Protocol parameter of classic signed messages.
pub const PROTOCOL_PGP_SIGNATURE: &str = "application/pgp-signature";
/// Protocol parameter and version part type of encrypted messages.
pub const PROTOCOL_PGP_ENCRYPTED: &str = "application/pgp-encrypted";
/// Body of the version part that announces the encrypted message format.
pub const ENCRYPTED_VERSION_MARKER: &str = "Version: 1";

/// Wraps the payload in a multipart/signed container.
///
/// With a post-quantum signer, the container carries three parts: the
/// payload, a detached signature over the serialized payload part, and
/// the signer's exported public key. Without one, it carries the classic
/// two-part layout around the provider's detached signature. The provider
/// must have produced a detached signature either way.
pub fn build_signed_message(
    message: &mut MimeMessage,
    payload: MimePart,
    detached_signature: Option<Vec<u8>>,
    micalg: Option<String>,
    pq_signer: Option<&PqSigner>,
    boundaries: &mut BoundaryGenerator,
) -> Result<()> {
    let classic_signature = match detached_signature {
        Some(signature) => signature,
        None => {
            return Err(PqMailError::provider(
                "Provider returned no detached signature",
            ))
        }
    };

    let boundary = boundaries.generate();
    let mut multipart = Multipart::new("signed", boundary.clone());

    let (protocol, micalg_value) = match pq_signer {
        Some(signer) => {
            let payload_bytes = payload.to_bytes()?;
            let bundle = signer.sign_bundle(&payload_bytes)?;
            multipart.add_part(payload);

            let mut signature_part = MimePart::new();
            signature_part.headers.set(
                HEADER_CONTENT_TYPE,
                &format!("{}; name=\"signature.asc\"", PROTOCOL_PQ_SIGNATURE),
            );
            signature_part.set_body(
                Body::Text(bundle.signature_armored()),
                TransferEncoding::SevenBit,
            );
            multipart.add_part(signature_part);

            let mut key_part = MimePart::new();
            key_part.headers.set(
                HEADER_CONTENT_TYPE,
                &format!("{}; name=\"public_key.asc\"", PROTOCOL_PQ_SIGNATURE),
            );
            key_part.set_body(
                Body::Text(bundle.public_key_armored),
                TransferEncoding::SevenBit,
            );
            multipart.add_part(key_part);

            // The micalg parameter names the pq algorithm, not whatever
            // hash the provider used for its own signature.
            let micalg_value = micalg.map(|_| bundle.algorithm.name().to_string());
            (PROTOCOL_PQ_SIGNATURE, micalg_value)
        }
        None => {
            multipart.add_part(payload);

            let mut signature_part = MimePart::new();
            signature_part.headers.set(
                HEADER_CONTENT_TYPE,
                &format!("{}; name=\"signature.asc\"", PROTOCOL_PGP_SIGNATURE),
            );
            signature_part.set_body(
                Body::Binary(classic_signature),
                TransferEncoding::SevenBit,
            );
            multipart.add_part(signature_part);

            (PROTOCOL_PGP_SIGNATURE, micalg)
        }
    };

    let mut content_type = format!(
        "multipart/signed; boundary=\"{}\"; protocol=\"{}\"",
        boundary, protocol
    );
    match micalg_value {
        Some(micalg) => {
            content_type.push_str(&format!("; micalg=\"{}\"", micalg));
        }
        None => warn!("Missing micalg value for multipart/signed, omitting parameter"),
    }

    message.set_body(Body::Multipart(multipart), TransferEncoding::SevenBit);
    message.headers.set(HEADER_CONTENT_TYPE, &content_type);
    Ok(())
}

/// Replaces the message body with the provider's inline output.
///
/// The content type stays untouched; inline protection lives inside the
/// text body itself. Cleartext-signed output is re-declared
/// quoted-printable, encrypted output keeps its captured encoding.
pub fn build_inline_message(
    message: &mut MimeMessage,
    output: CapturedOutput,
    status: &CryptoStatus,
) -> Result<()> {
    if !status.is_pgp_inline_mode() {
        return Err(PqMailError::assertion(
            "Inline assembly requires inline mode to be enabled",
        ));
    }

    let encoding = if status.is_encryption_enabled() {
        output.encoding
    } else {
        TransferEncoding::QuotedPrintable
    };
    message.set_body(Body::Binary(output.data), encoding);
    Ok(())
}

/// Wraps the provider's encrypted output in a multipart/encrypted
/// container: a version part announcing the format, then the ciphertext.
pub fn build_encrypted_message(
    message: &mut MimeMessage,
    output: CapturedOutput,
    boundaries: &mut BoundaryGenerator,
) -> Result<()> {
    let boundary = boundaries.generate();
    let mut multipart = Multipart::new("encrypted", boundary.clone());

    multipart.add_part(MimePart::text(PROTOCOL_PGP_ENCRYPTED, ENCRYPTED_VERSION_MARKER));

    let mut content_part = MimePart::new();
    content_part.headers.set(
        HEADER_CONTENT_TYPE,
        "application/octet-stream; name=\"encrypted.asc\"",
    );
    content_part.headers.set(
        HEADER_CONTENT_DISPOSITION,
        "inline; filename=\"encrypted.asc\"",
    );
    content_part.set_body(Body::Binary(output.data), output.encoding);
    multipart.add_part(content_part);

    message.set_body(Body::Multipart(multipart), TransferEncoding::SevenBit);
    message.headers.set(
        HEADER_CONTENT_TYPE,
        &format!(
            "multipart/encrypted; boundary=\"{}\"; protocol=\"{}\"",
            boundary, PROTOCOL_PGP_ENCRYPTED
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armor;
    use crate::pq::{PqAlgorithm, PqSigner};

    fn payload_part() -> MimePart {
        MimePart::text("text/plain", "Protected content.\r\n")
    }

    fn multipart_of(message: &MimeMessage) -> &Multipart {
        match message.body() {
            Body::Multipart(multipart) => multipart,
            other => panic!("Expected multipart body, got {:?}", other),
        }
    }

    fn text_of(part: &MimePart) -> &str {
        match part.body() {
            Body::Text(text) => text,
            other => panic!("Expected text body, got {:?}", other),
        }
    }

    #[test]
    fn test_pq_signed_message_carries_signature_and_key() {
        let signer = PqSigner::generate(PqAlgorithm::Dilithium5);
        let mut message = MimeMessage::new();
        let mut boundaries = BoundaryGenerator::fixed("sig");

        build_signed_message(
            &mut message,
            payload_part(),
            Some(vec![0xAA]),
            Some("pgp-sha256".to_string()),
            Some(&signer),
            &mut boundaries,
        )
        .expect("Failed to build signed message");

        let content_type = message
            .headers
            .get("Content-Type")
            .expect("Missing content type");
        assert!(content_type.starts_with("multipart/signed; boundary=\"----sig-1\""));
        assert!(content_type.contains("protocol=\"application/pq-signature\""));
        assert!(content_type.contains("micalg=\"Dilithium5\""));

        let multipart = multipart_of(&message);
        assert_eq!(multipart.parts().len(), 3);
        assert_eq!(multipart.parts()[1].mime_type(), "application/pq-signature");
        assert_eq!(multipart.parts()[2].mime_type(), "application/pq-signature");
        assert!(multipart.parts()[1]
            .headers
            .get("Content-Type")
            .expect("Missing content type")
            .contains("name=\"signature.asc\""));
        assert!(multipart.parts()[2]
            .headers
            .get("Content-Type")
            .expect("Missing content type")
            .contains("name=\"public_key.asc\""));
    }

    #[test]
    fn test_pq_signature_verifies_against_serialized_payload() {
        let signer = PqSigner::generate(PqAlgorithm::Dilithium5);
        let mut message = MimeMessage::new();
        let mut boundaries = BoundaryGenerator::fixed("sig");

        build_signed_message(
            &mut message,
            payload_part(),
            Some(vec![0xAA]),
            Some("pgp-sha256".to_string()),
            Some(&signer),
            &mut boundaries,
        )
        .expect("Failed to build signed message");

        let multipart = multipart_of(&message);
        let signed_bytes = multipart.parts()[0]
            .to_bytes()
            .expect("Failed to serialize payload part");
        let signature = armor::decode(text_of(&multipart.parts()[1]))
            .expect("Failed to decode signature armor");
        let public_key = armor::decode(text_of(&multipart.parts()[2]))
            .expect("Failed to decode key armor");

        assert_eq!(signature.kind(), armor::BlockKind::Signature);
        assert_eq!(public_key.kind(), armor::BlockKind::PublicKey);
        assert!(PqSigner::verify_with_key(
            PqAlgorithm::Dilithium5,
            &signed_bytes,
            signature.data(),
            public_key.data(),
        ));
    }

    #[test]
    fn test_classic_signed_message_uses_provider_signature() {
        let mut message = MimeMessage::new();
        let mut boundaries = BoundaryGenerator::fixed("sig");

        build_signed_message(
            &mut message,
            payload_part(),
            Some(vec![1, 2, 3]),
            Some("pgp-sha512".to_string()),
            None,
            &mut boundaries,
        )
        .expect("Failed to build signed message");

        let content_type = message
            .headers
            .get("Content-Type")
            .expect("Missing content type");
        assert!(content_type.contains("protocol=\"application/pgp-signature\""));
        assert!(content_type.contains("micalg=\"pgp-sha512\""));

        let multipart = multipart_of(&message);
        assert_eq!(multipart.parts().len(), 2);
        assert_eq!(
            multipart.parts()[1].body(),
            &Body::Binary(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_signed_message_omits_micalg_when_not_reported() {
        let mut message = MimeMessage::new();
        let mut boundaries = BoundaryGenerator::fixed("sig");

        build_signed_message(
            &mut message,
            payload_part(),
            Some(vec![1]),
            None,
            None,
            &mut boundaries,
        )
        .expect("Failed to build signed message");

        let content_type = message
            .headers
            .get("Content-Type")
            .expect("Missing content type");
        assert!(!content_type.contains("micalg"));
    }

    #[test]
    fn test_signed_message_without_detached_signature_fails() {
        let mut message = MimeMessage::new();
        let mut boundaries = BoundaryGenerator::fixed("sig");

        let err = build_signed_message(
            &mut message,
            payload_part(),
            None,
            None,
            None,
            &mut boundaries,
        )
        .expect_err("Missing detached signature must fail");
        assert!(matches!(err, PqMailError::Provider(_)));
    }

    #[test]
    fn test_encrypted_message_structure() {
        let mut message = MimeMessage::new();
        let mut boundaries = BoundaryGenerator::fixed("enc");
        let output = CapturedOutput {
            data: b"-----BEGIN PGP MESSAGE-----\r\nwcFMA...\r\n-----END PGP MESSAGE-----\r\n"
                .to_vec(),
            encoding: TransferEncoding::SevenBit,
        };

        build_encrypted_message(&mut message, output, &mut boundaries)
            .expect("Failed to build encrypted message");

        let content_type = message
            .headers
            .get("Content-Type")
            .expect("Missing content type");
        assert!(content_type.starts_with("multipart/encrypted; boundary=\"----enc-1\""));
        assert!(content_type.contains("protocol=\"application/pgp-encrypted\""));

        let multipart = multipart_of(&message);
        assert_eq!(multipart.parts().len(), 2);
        assert_eq!(multipart.parts()[0].mime_type(), "application/pgp-encrypted");
        assert_eq!(text_of(&multipart.parts()[0]), "Version: 1");
        assert_eq!(multipart.parts()[1].mime_type(), "application/octet-stream");
        assert_eq!(
            multipart.parts()[1].headers.get("Content-Disposition"),
            Some("inline; filename=\"encrypted.asc\"")
        );
    }

    #[test]
    fn test_inline_cleartext_signature_is_quoted_printable() {
        let mut message = MimeMessage::new();
        message.headers.set(HEADER_CONTENT_TYPE, "text/plain");
        let status = CryptoStatus::new().with_signing(true).with_inline_mode(true);
        let output = CapturedOutput {
            data: b"-----BEGIN PGP SIGNED MESSAGE-----\r\n".to_vec(),
            encoding: TransferEncoding::EightBit,
        };

        build_inline_message(&mut message, output, &status)
            .expect("Failed to build inline message");

        assert_eq!(message.mime_type(), "text/plain");
        assert_eq!(message.encoding(), TransferEncoding::QuotedPrintable);
    }

    #[test]
    fn test_inline_encrypted_keeps_captured_encoding() {
        let mut message = MimeMessage::new();
        let status = CryptoStatus::new()
            .with_encryption(true)
            .with_inline_mode(true);
        let output = CapturedOutput {
            data: b"-----BEGIN PGP MESSAGE-----\r\n".to_vec(),
            encoding: TransferEncoding::SevenBit,
        };

        build_inline_message(&mut message, output, &status)
            .expect("Failed to build inline message");

        assert_eq!(message.encoding(), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_inline_assembly_requires_inline_mode() {
        let mut message = MimeMessage::new();
        let status = CryptoStatus::new().with_signing(true);
        let output = CapturedOutput {
            data: Vec::new(),
            encoding: TransferEncoding::SevenBit,
        };

        let err = build_inline_message(&mut message, output, &status)
            .expect_err("Inline assembly without inline mode must fail");
        assert!(matches!(err, PqMailError::Assertion(_)));
    }
}
