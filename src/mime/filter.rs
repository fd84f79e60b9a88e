//! Byte-stream filters for wire-format message content.
//!
//! Provider processes write output with whatever line endings their
//! platform uses; message content on the wire must be CRLF. The writer
//! here normalizes in a streaming fashion. The quoted-printable encoder
//! protects cleartext-signed content from relay EOL and whitespace
//! rewriting, which would otherwise break the signature.

use std::io::{self, Write};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const QP_LINE_LIMIT: usize = 76;

/// A writer converting LF and bare CR line endings to CRLF.
pub struct EolConvertingWriter<W: Write> {
    inner: W,
    last: u8,
}

impl<W: Write> EolConvertingWriter<W> {
    /// Wraps `inner`, normalizing everything written through it.
    pub fn new(inner: W) -> Self {
        Self { inner, last: 0 }
    }

    /// Completes a dangling CR and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.last == b'\r' {
            self.inner.write_all(b"\n")?;
            self.last = b'\n';
        }
        Ok(self.inner)
    }
}

impl<W: Write> Write for EolConvertingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                if self.last == b'\r' {
                    self.inner.write_all(b"\n")?;
                } else {
                    self.inner.write_all(b"\r\n")?;
                }
            } else {
                if self.last == b'\r' {
                    self.inner.write_all(b"\n")?;
                }
                self.inner.write_all(&[byte])?;
            }
            self.last = byte;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Encodes content as quoted-printable (RFC 2045).
///
/// CRLF pairs pass through as hard line breaks; trailing whitespace and
/// non-printable octets are hex-escaped; lines are soft-wrapped at 76
/// characters.
pub fn quoted_printable_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8);
    let mut line_len = 0usize;
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];

        if byte == b'\r' && data.get(i + 1) == Some(&b'\n') {
            out.extend_from_slice(b"\r\n");
            line_len = 0;
            i += 2;
            continue;
        }

        let at_line_end = match data.get(i + 1) {
            None => true,
            Some(&next) => next == b'\r' && data.get(i + 2) == Some(&b'\n'),
        };

        let mut token = [0u8; 3];
        let token_len = if (byte == b' ' || byte == b'\t') && !at_line_end {
            token[0] = byte;
            1
        } else if (33..=126).contains(&byte) && byte != b'=' {
            token[0] = byte;
            1
        } else {
            token[0] = b'=';
            token[1] = HEX_DIGITS[(byte >> 4) as usize];
            token[2] = HEX_DIGITS[(byte & 0x0f) as usize];
            3
        };

        // The soft-break '=' itself must fit within the line limit.
        if line_len + token_len > QP_LINE_LIMIT - 1 {
            out.extend_from_slice(b"=\r\n");
            line_len = 0;
        }
        out.extend_from_slice(&token[..token_len]);
        line_len += token_len;
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(input: &[u8]) -> Vec<u8> {
        let mut writer = EolConvertingWriter::new(Vec::new());
        writer.write_all(input).expect("Failed to write input");
        writer.finish().expect("Failed to finish conversion")
    }

    #[test]
    fn test_lf_becomes_crlf() {
        assert_eq!(convert(b"a\nb\n"), b"a\r\nb\r\n");
    }

    #[test]
    fn test_crlf_passes_through() {
        assert_eq!(convert(b"a\r\nb\r\n"), b"a\r\nb\r\n");
    }

    #[test]
    fn test_bare_cr_becomes_crlf() {
        assert_eq!(convert(b"a\rb"), b"a\r\nb");
    }

    #[test]
    fn test_dangling_cr_completed_on_finish() {
        assert_eq!(convert(b"a\r"), b"a\r\n");
    }

    #[test]
    fn test_mixed_endings() {
        assert_eq!(convert(b"a\nb\r\nc\rd"), b"a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn test_qp_plain_text_unchanged() {
        let encoded = quoted_printable_encode(b"Hello, world!\r\n");
        assert_eq!(encoded, b"Hello, world!\r\n");
    }

    #[test]
    fn test_qp_escapes_equals_sign() {
        let encoded = quoted_printable_encode(b"a=b");
        assert_eq!(encoded, b"a=3Db");
    }

    #[test]
    fn test_qp_escapes_trailing_whitespace() {
        assert_eq!(quoted_printable_encode(b"end \r\nnext"), b"end=20\r\nnext");
        assert_eq!(quoted_printable_encode(b"tail "), b"tail=20");
        // Interior whitespace stays literal.
        assert_eq!(quoted_printable_encode(b"a b"), b"a b");
    }

    #[test]
    fn test_qp_escapes_non_ascii() {
        assert_eq!(quoted_printable_encode(b"caf\xc3\xa9"), b"caf=C3=A9");
    }

    #[test]
    fn test_qp_soft_wraps_long_lines() {
        let long = vec![b'x'; 200];
        let encoded = quoted_printable_encode(&long);
        let text = String::from_utf8(encoded).expect("Failed to decode output");

        for line in text.split("\r\n") {
            assert!(line.len() <= QP_LINE_LIMIT, "line too long: {}", line.len());
        }
        // Stripping soft breaks recovers the original content.
        assert_eq!(text.replace("=\r\n", "").len(), 200);
    }
}
