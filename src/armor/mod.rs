//! Banner-delimited armor for post-quantum signatures and keys.
//!
//! Binary signatures and key material travel inside message parts and key
//! files as printable text: a BEGIN banner naming the block kind and the
//! algorithm, a MIME-wrapped base64 body, and a matching END banner. The
//! decoder is strict about the frame but deliberately accepts algorithm
//! names it does not know, so a verifier can report an unusable block
//! instead of refusing to parse it.

use crate::error::{PqMailError, Result};
use crate::pq::PqAlgorithm;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const BEGIN_PREFIX: &str = "------ BEGIN POST QUANTUM ";
const END_PREFIX: &str = "------ END POST QUANTUM ";
const BANNER_SUFFIX: &str = " ------";
const WRAP_WIDTH: usize = 76;

/// The kind of material inside an armored block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A detached signature
    Signature,
    /// A public key
    PublicKey,
    /// A private key
    PrivateKey,
}

impl BlockKind {
    /// Returns the banner noun for this kind.
    pub fn noun(&self) -> &'static str {
        match self {
            BlockKind::Signature => "SIGNATURE",
            BlockKind::PublicKey => "PUBLIC KEY",
            BlockKind::PrivateKey => "PRIVATE KEY",
        }
    }

    fn from_noun(noun: &str) -> Option<Self> {
        match noun {
            "SIGNATURE" => Some(BlockKind::Signature),
            "PUBLIC KEY" => Some(BlockKind::PublicKey),
            "PRIVATE KEY" => Some(BlockKind::PrivateKey),
            _ => None,
        }
    }
}

/// A decoded armor block.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmoredBlock {
    kind: BlockKind,
    algorithm_name: String,
    data: Vec<u8>,
}

impl ArmoredBlock {
    /// Returns the block kind.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Returns the algorithm name from the banner (uppercase, possibly
    /// unknown to this build).
    pub fn algorithm_name(&self) -> &str {
        &self.algorithm_name
    }

    /// Returns the parsed algorithm, when this build supports it.
    pub fn algorithm(&self) -> Option<PqAlgorithm> {
        PqAlgorithm::from_name(&self.algorithm_name)
    }

    /// Returns the decoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Encodes binary data as a banner-delimited armor block.
///
/// The algorithm name is uppercased in the banner, matching what the
/// verifier side parses back out.
pub fn encode(kind: BlockKind, algorithm: &str, data: &[u8]) -> String {
    let algorithm = algorithm.to_ascii_uppercase();
    let banner = format!("POST QUANTUM {} USING {}", kind.noun(), algorithm);

    let mut out = String::new();
    out.push_str(&format!("------ BEGIN {}{}\r\n", banner, BANNER_SUFFIX));
    let encoded = STANDARD.encode(data);
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let take = rest.len().min(WRAP_WIDTH);
        out.push_str(&rest[..take]);
        out.push_str("\r\n");
        rest = &rest[take..];
    }
    out.push_str(&format!("------ END {}{}\r\n", banner, BANNER_SUFFIX));
    out
}

/// Decodes a banner-delimited armor block.
pub fn decode(text: &str) -> Result<ArmoredBlock> {
    let mut lines = text.lines().map(str::trim);

    let header = lines
        .by_ref()
        .find(|line| !line.is_empty())
        .ok_or_else(|| PqMailError::armor("Missing armor header"))?;
    let (kind, algorithm_name) = parse_banner(header, BEGIN_PREFIX)
        .ok_or_else(|| PqMailError::armor(format!("Invalid armor header: {}", header)))?;

    let mut base64_body = String::new();
    let mut footer = None;
    for line in lines {
        if line.starts_with(END_PREFIX) {
            footer = Some(line);
            break;
        }
        base64_body.push_str(line);
    }

    let footer = footer.ok_or_else(|| PqMailError::armor("Missing armor footer"))?;
    match parse_banner(footer, END_PREFIX) {
        Some((end_kind, end_algorithm))
            if end_kind == kind && end_algorithm == algorithm_name => {}
        _ => {
            return Err(PqMailError::armor(format!(
                "Armor footer does not match header: {}",
                footer
            )))
        }
    }

    let data = STANDARD
        .decode(base64_body.as_bytes())
        .map_err(|e| PqMailError::armor(format!("Invalid base64 in armor block: {}", e)))?;

    Ok(ArmoredBlock {
        kind,
        algorithm_name,
        data,
    })
}

fn parse_banner(line: &str, prefix: &str) -> Option<(BlockKind, String)> {
    let middle = line.strip_prefix(prefix)?.strip_suffix(BANNER_SUFFIX)?;
    let (noun, algorithm) = middle.split_once(" USING ")?;
    let kind = BlockKind::from_noun(noun)?;
    if algorithm.is_empty() {
        return None;
    }
    Some((kind, algorithm.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_banner_shape() {
        let armored = encode(BlockKind::Signature, "Dilithium5", b"sig-bytes");
        let lines: Vec<&str> = armored.lines().collect();

        assert_eq!(
            lines[0],
            "------ BEGIN POST QUANTUM SIGNATURE USING DILITHIUM5 ------"
        );
        assert_eq!(
            lines[lines.len() - 1],
            "------ END POST QUANTUM SIGNATURE USING DILITHIUM5 ------"
        );
        assert!(armored.ends_with("------\r\n"));
    }

    #[test]
    fn test_encode_wraps_base64_body() {
        let armored = encode(BlockKind::PublicKey, "Falcon-1024", &[0xAB; 300]);
        for line in armored.lines() {
            assert!(line.len() <= 76 || line.starts_with("------"));
        }
    }

    #[test]
    fn test_roundtrip() {
        let data = (0u8..=255).collect::<Vec<u8>>();
        let armored = encode(BlockKind::PrivateKey, "SPHINCS+-SHA256-256s-simple", &data);

        let block = decode(&armored).expect("Failed to decode armor");
        assert_eq!(block.kind(), BlockKind::PrivateKey);
        assert_eq!(block.algorithm_name(), "SPHINCS+-SHA256-256S-SIMPLE");
        assert_eq!(block.algorithm(), Some(PqAlgorithm::SphincsSha256s));
        assert_eq!(block.data(), &data[..]);
    }

    #[test]
    fn test_decode_accepts_unknown_algorithm() {
        let armored = encode(BlockKind::Signature, "Hypothetical-9000", b"data");
        let block = decode(&armored).expect("Failed to decode armor");
        assert_eq!(block.algorithm_name(), "HYPOTHETICAL-9000");
        assert_eq!(block.algorithm(), None);
    }

    #[test]
    fn test_decode_tolerates_leading_blank_lines() {
        let armored = format!("\r\n\r\n{}", encode(BlockKind::Signature, "Dilithium5", b"x"));
        let block = decode(&armored).expect("Failed to decode armor");
        assert_eq!(block.data(), b"x");
    }

    #[test]
    fn test_decode_rejects_missing_footer() {
        let armored = encode(BlockKind::Signature, "Dilithium5", b"data");
        let truncated = armored.lines().next().unwrap().to_string();
        assert!(decode(&truncated).is_err());
    }

    #[test]
    fn test_decode_rejects_mismatched_footer() {
        let armored = encode(BlockKind::Signature, "Dilithium5", b"data")
            .replace("END POST QUANTUM SIGNATURE", "END POST QUANTUM PUBLIC KEY");
        assert!(decode(&armored).is_err());
    }

    #[test]
    fn test_decode_rejects_corrupt_base64() {
        let armored = encode(BlockKind::Signature, "Dilithium5", b"data-data-data");
        let corrupted = armored.replacen("\r\n", "\r\n???!", 1);
        assert!(decode(&corrupted).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_banner() {
        let err = decode("-----BEGIN PGP MESSAGE-----\r\ndata\r\n");
        assert!(err.is_err());
    }
}
