//! MIME message model and wire serialization.
//!
//! This module provides the small slice of MIME needed to build outgoing
//! protected messages: ordered headers, single parts, multipart containers
//! with generated boundaries, and CRLF wire serialization. It deliberately
//! does not parse inbound messages.

pub mod boundary;
pub mod filter;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

pub use boundary::BoundaryGenerator;
pub use filter::{quoted_printable_encode, EolConvertingWriter};

/// Content-Type header name.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
/// Content-Transfer-Encoding header name.
pub const HEADER_CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";
/// Content-Disposition header name.
pub const HEADER_CONTENT_DISPOSITION: &str = "Content-Disposition";
/// Subject header name.
pub const HEADER_SUBJECT: &str = "Subject";
/// Bcc header name.
pub const HEADER_BCC: &str = "Bcc";

/// Content transfer encodings used by protected messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEncoding {
    /// Plain 7-bit ASCII content
    SevenBit,
    /// 8-bit content (armored provider output)
    EightBit,
    /// Quoted-printable, applied at serialization time
    QuotedPrintable,
}

impl TransferEncoding {
    /// Returns the header token for this encoding.
    pub fn token(&self) -> &'static str {
        match self {
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::EightBit => "8bit",
            TransferEncoding::QuotedPrintable => "quoted-printable",
        }
    }
}

/// An ordered, case-insensitive header collection.
///
/// Insertion order is preserved on the wire; lookups ignore name case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the first header with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Appends a header, keeping any existing headers of the same name.
    pub fn add(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// Sets a header, replacing all existing headers of the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// Removes all headers with the given name, returning the first value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self
            .entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name));
        let value = first.map(|i| self.entries[i].1.clone());
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        value
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, value) in &self.entries {
            write!(out, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

/// A MIME body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    /// No body (fresh messages, or a message whose body was detached)
    Empty,
    /// Textual content, already CRLF-terminated where multi-line
    Text(String),
    /// Opaque bytes, written raw or quoted-printable per the part encoding
    Binary(Vec<u8>),
    /// A multipart container
    Multipart(Multipart),
}

impl Body {
    /// Writes the body content without any headers, applying `encoding`.
    fn write_to<W: Write>(&self, out: &mut W, encoding: TransferEncoding) -> io::Result<()> {
        match self {
            Body::Empty => Ok(()),
            Body::Text(text) => write_encoded(out, text.as_bytes(), encoding),
            Body::Binary(data) => write_encoded(out, data, encoding),
            Body::Multipart(multipart) => multipart.write_to(out),
        }
    }

    /// Writes the raw, undeclared content bytes (no encoding applied).
    ///
    /// Used when a provider consumes body content only, bypassing headers.
    pub fn write_raw<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Body::Empty => Ok(()),
            Body::Text(text) => out.write_all(text.as_bytes()),
            Body::Binary(data) => out.write_all(data),
            Body::Multipart(multipart) => multipart.write_to(out),
        }
    }
}

fn write_encoded<W: Write>(out: &mut W, data: &[u8], encoding: TransferEncoding) -> io::Result<()> {
    match encoding {
        TransferEncoding::SevenBit | TransferEncoding::EightBit => out.write_all(data),
        TransferEncoding::QuotedPrintable => out.write_all(&quoted_printable_encode(data)),
    }
}

/// A multipart container with a fixed boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multipart {
    subtype: String,
    boundary: String,
    parts: Vec<MimePart>,
}

impl Multipart {
    /// Creates an empty container, e.g. `Multipart::new("signed", boundary)`.
    pub fn new(subtype: &str, boundary: String) -> Self {
        Self {
            subtype: subtype.to_string(),
            boundary,
            parts: Vec::new(),
        }
    }

    /// Appends a part.
    pub fn add_part(&mut self, part: MimePart) {
        self.parts.push(part);
    }

    /// Returns the multipart subtype ("signed", "encrypted", ...).
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Returns the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Returns the contained parts.
    pub fn parts(&self) -> &[MimePart] {
        &self.parts
    }

    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for part in &self.parts {
            write!(out, "--{}\r\n", self.boundary)?;
            part.write_to(out)?;
            write!(out, "\r\n")?;
        }
        write!(out, "--{}--\r\n", self.boundary)
    }
}

/// A single MIME part: headers, body, and declared transfer encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MimePart {
    pub headers: Headers,
    body: Body,
    encoding: TransferEncoding,
}

impl Default for MimePart {
    fn default() -> Self {
        Self::new()
    }
}

impl MimePart {
    /// Creates an empty part.
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            body: Body::Empty,
            encoding: TransferEncoding::SevenBit,
        }
    }

    /// Creates a 7bit text part with the given Content-Type.
    pub fn text(content_type: &str, text: &str) -> Self {
        let mut part = Self::new();
        part.headers.set(HEADER_CONTENT_TYPE, content_type);
        part.set_body(Body::Text(text.to_string()), TransferEncoding::SevenBit);
        part
    }

    /// Returns the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the declared transfer encoding.
    pub fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Sets the body and fixes the Content-Transfer-Encoding header to match.
    pub fn set_body(&mut self, body: Body, encoding: TransferEncoding) {
        match body {
            Body::Multipart(_) => {
                self.headers.remove(HEADER_CONTENT_TRANSFER_ENCODING);
            }
            _ => {
                self.headers
                    .set(HEADER_CONTENT_TRANSFER_ENCODING, encoding.token());
            }
        }
        self.body = body;
        self.encoding = encoding;
    }

    /// Returns the `type/subtype` of the Content-Type header, lowercase.
    ///
    /// Defaults to `text/plain` when the header is absent.
    pub fn mime_type(&self) -> String {
        mime_type_of(self.headers.get(HEADER_CONTENT_TYPE))
    }

    /// Serializes the part (headers, blank line, encoded body).
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.headers.write_to(out)?;
        write!(out, "\r\n")?;
        self.body.write_to(out, self.encoding)
    }

    /// Serializes the part into owned bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// A complete outgoing message: top-level headers plus a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MimeMessage {
    pub headers: Headers,
    body: Body,
    encoding: TransferEncoding,
}

impl Default for MimeMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeMessage {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            body: Body::Empty,
            encoding: TransferEncoding::SevenBit,
        }
    }

    /// Returns the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Returns the declared transfer encoding.
    pub fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Sets the body and fixes the Content-Transfer-Encoding header.
    pub fn set_body(&mut self, body: Body, encoding: TransferEncoding) {
        match body {
            Body::Multipart(_) => {
                self.headers.remove(HEADER_CONTENT_TRANSFER_ENCODING);
            }
            _ => {
                self.headers
                    .set(HEADER_CONTENT_TRANSFER_ENCODING, encoding.token());
            }
        }
        self.body = body;
        self.encoding = encoding;
    }

    /// Returns the `type/subtype` of the Content-Type header, lowercase.
    ///
    /// Defaults to `text/plain` when the header is absent.
    pub fn mime_type(&self) -> String {
        mime_type_of(self.headers.get(HEADER_CONTENT_TYPE))
    }

    /// Returns the message Subject, if any.
    pub fn subject(&self) -> Option<&str> {
        self.headers.get(HEADER_SUBJECT)
    }

    /// Detaches the message body into a standalone part.
    ///
    /// The part takes the body together with the content headers; the
    /// message is left with an empty body and its other headers intact.
    pub fn detach_body_part(&mut self) -> MimePart {
        let body = std::mem::replace(&mut self.body, Body::Empty);
        let mut part = MimePart::new();
        if let Some(content_type) = self.headers.get(HEADER_CONTENT_TYPE) {
            part.headers.set(HEADER_CONTENT_TYPE, content_type);
        }
        if let Some(cte) = self.headers.get(HEADER_CONTENT_TRANSFER_ENCODING) {
            part.headers.set(HEADER_CONTENT_TRANSFER_ENCODING, cte);
        }
        part.body = body;
        part.encoding = self.encoding;
        self.encoding = TransferEncoding::SevenBit;
        part
    }

    /// Returns the addresses listed in Bcc, angle brackets stripped.
    pub fn bcc_addresses(&self) -> Vec<String> {
        self.headers
            .get(HEADER_BCC)
            .map(split_addresses)
            .unwrap_or_default()
    }

    /// Serializes the message (headers, blank line, encoded body).
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.headers.write_to(out)?;
        write!(out, "\r\n")?;
        self.body.write_to(out, self.encoding)
    }

    /// Serializes the message into owned bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Compares two `type/subtype` strings, ignoring case.
pub fn is_same_mime_type(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn mime_type_of(content_type: Option<&str>) -> String {
    content_type
        .map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or(ct)
                .trim()
                .to_ascii_lowercase()
        })
        .unwrap_or_else(|| "text/plain".to_string())
}

/// Splits a comma-separated address header, extracting bare addresses
/// from `Name <addr>` forms.
fn split_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            match (entry.rfind('<'), entry.rfind('>')) {
                (Some(open), Some(close)) if open < close => entry[open + 1..close].trim(),
                _ => entry,
            }
            .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.get("Subject"), None);
    }

    #[test]
    fn test_header_set_replaces_all_occurrences() {
        let mut headers = Headers::new();
        headers.add("X-Test", "one");
        headers.add("x-test", "two");
        headers.set("X-Test", "three");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Test"), Some("three"));
    }

    #[test]
    fn test_header_remove_returns_first_value() {
        let mut headers = Headers::new();
        headers.add("X-Test", "one");
        headers.add("X-Test", "two");

        assert_eq!(headers.remove("x-test"), Some("one".to_string()));
        assert!(headers.is_empty());
        assert_eq!(headers.remove("x-test"), None);
    }

    #[test]
    fn test_message_serialization_uses_crlf() {
        let mut message = MimeMessage::new();
        message.headers.set("From", "alice@example.org");
        message.headers.set(HEADER_CONTENT_TYPE, "text/plain");
        message.set_body(
            Body::Text("hello\r\nworld\r\n".to_string()),
            TransferEncoding::SevenBit,
        );

        let bytes = message.to_bytes().expect("Failed to serialize message");
        let text = String::from_utf8(bytes).expect("Failed to decode message");
        assert_eq!(
            text,
            "From: alice@example.org\r\nContent-Type: text/plain\r\n\
             Content-Transfer-Encoding: 7bit\r\n\r\nhello\r\nworld\r\n"
        );
    }

    #[test]
    fn test_detach_body_part_moves_body_and_content_headers() {
        let mut message = MimeMessage::new();
        message.headers.set("From", "alice@example.org");
        message
            .headers
            .set(HEADER_CONTENT_TYPE, "text/plain; charset=utf-8");
        message.set_body(
            Body::Text("payload".to_string()),
            TransferEncoding::SevenBit,
        );

        let part = message.detach_body_part();

        assert_eq!(
            part.headers.get(HEADER_CONTENT_TYPE),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(part.body(), &Body::Text("payload".to_string()));
        assert_eq!(message.body(), &Body::Empty);
        // Non-content headers stay on the message.
        assert_eq!(message.headers.get("From"), Some("alice@example.org"));
        assert_eq!(
            message.headers.get(HEADER_CONTENT_TYPE),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_multipart_framing() {
        let mut multipart = Multipart::new("mixed", "XXXX".to_string());
        multipart.add_part(MimePart::text("text/plain", "one"));
        multipart.add_part(MimePart::text("text/plain", "two"));

        let mut message = MimeMessage::new();
        message.set_body(Body::Multipart(multipart), TransferEncoding::SevenBit);
        let bytes = message.to_bytes().expect("Failed to serialize message");
        let text = String::from_utf8(bytes).expect("Failed to decode message");

        assert!(text.contains("--XXXX\r\n"));
        assert!(text.ends_with("--XXXX--\r\n"));
        assert_eq!(text.matches("--XXXX").count(), 3);
    }

    #[test]
    fn test_multipart_body_drops_transfer_encoding_header() {
        let mut message = MimeMessage::new();
        message.set_body(
            Body::Text("x".to_string()),
            TransferEncoding::QuotedPrintable,
        );
        assert_eq!(
            message.headers.get(HEADER_CONTENT_TRANSFER_ENCODING),
            Some("quoted-printable")
        );

        message.set_body(
            Body::Multipart(Multipart::new("signed", "b".to_string())),
            TransferEncoding::SevenBit,
        );
        assert_eq!(message.headers.get(HEADER_CONTENT_TRANSFER_ENCODING), None);
    }

    #[test]
    fn test_mime_type_parsing() {
        let mut message = MimeMessage::new();
        assert_eq!(message.mime_type(), "text/plain");

        message
            .headers
            .set(HEADER_CONTENT_TYPE, "Multipart/Mixed; boundary=\"x\"");
        assert_eq!(message.mime_type(), "multipart/mixed");
        assert!(is_same_mime_type("TEXT/PLAIN", "text/plain"));
    }

    #[test]
    fn test_bcc_address_extraction() {
        let mut message = MimeMessage::new();
        message
            .headers
            .set(HEADER_BCC, "hidden@example.org, Carol <carol@example.org>");

        assert_eq!(
            message.bcc_addresses(),
            vec!["hidden@example.org".to_string(), "carol@example.org".to_string()]
        );
    }

    #[test]
    fn test_quoted_printable_body_encoding_applied_on_write() {
        let mut part = MimePart::new();
        part.headers.set(HEADER_CONTENT_TYPE, "text/plain");
        part.set_body(
            Body::Binary(b"caf\xc3\xa9\r\n".to_vec()),
            TransferEncoding::QuotedPrintable,
        );

        let bytes = part.to_bytes().expect("Failed to serialize part");
        let text = String::from_utf8(bytes).expect("Failed to decode part");
        assert!(text.contains("caf=C3=A9"));
        assert!(text.contains("Content-Transfer-Encoding: quoted-printable"));
    }
}
