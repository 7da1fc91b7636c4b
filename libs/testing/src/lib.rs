//! Test fixtures for first-packet parsing.
//!
//! Builders here produce wire-accurate TLS ClientHello records and plaintext
//! HTTP request heads so that parser and engine tests do not have to carry
//! hand-counted byte arrays.

/// Extension type of `server_name`.
pub const EXT_SERVER_NAME: u16 = 0x0000;

/// Extension type of `padding`.
pub const EXT_PADDING: u16 = 0x0015;

/// Extension type of `supported_versions`.
pub const EXT_SUPPORTED_VERSIONS: u16 = 0x002b;

/// Builder for a single-record TLS ClientHello.
#[derive(Debug, Clone)]
pub struct ClientHelloBuilder {
    record_version: [u8; 2],
    session_id: Vec<u8>,
    cipher_suites: Vec<u16>,
    extensions: Vec<(u16, Vec<u8>)>,
}

impl Default for ClientHelloBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientHelloBuilder {
    /// A TLS 1.2-style hello with one cipher suite and no extensions.
    pub fn new() -> Self {
        Self {
            record_version: [0x03, 0x01],
            session_id: Vec::new(),
            // TLS_AES_128_GCM_SHA256, TLS_RSA_WITH_AES_128_CBC_SHA
            cipher_suites: vec![0x1301, 0x002f],
            extensions: Vec::new(),
        }
    }

    /// Add a `server_name` extension with a single host_name entry.
    pub fn server_name(self, host: &str) -> Self {
        self.extension(EXT_SERVER_NAME, server_name_payload(&[(0, host.as_bytes())]))
    }

    /// Set the legacy session id (at most 32 bytes on the wire).
    pub fn session_id(mut self, id: &[u8]) -> Self {
        self.session_id = id.to_vec();
        self
    }

    /// Set the record-layer version bytes.
    pub fn record_version(mut self, version: [u8; 2]) -> Self {
        self.record_version = version;
        self
    }

    /// Append `count` extra cipher suites.
    pub fn extra_cipher_suites(mut self, count: usize) -> Self {
        self.cipher_suites
            .extend((0..count).map(|i| 0xc000 | (i as u16 & 0x0fff)));
        self
    }

    /// Append a raw extension.
    pub fn extension(mut self, ext_type: u16, data: Vec<u8>) -> Self {
        self.extensions.push((ext_type, data));
        self
    }

    /// Append a `padding` extension of `len` zero bytes.
    pub fn padding(self, len: usize) -> Self {
        self.extension(EXT_PADDING, vec![0; len])
    }

    /// Encode the full TLS record.
    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x03, 0x03]);
        body.extend_from_slice(&[0x5a; 32]);
        body.push(self.session_id.len() as u8);
        body.extend_from_slice(&self.session_id);

        body.extend_from_slice(&((self.cipher_suites.len() * 2) as u16).to_be_bytes());
        for suite in &self.cipher_suites {
            body.extend_from_slice(&suite.to_be_bytes());
        }

        // null compression only
        body.extend_from_slice(&[0x01, 0x00]);

        if !self.extensions.is_empty() {
            let mut exts = Vec::new();
            for (ext_type, data) in &self.extensions {
                exts.extend_from_slice(&ext_type.to_be_bytes());
                exts.extend_from_slice(&(data.len() as u16).to_be_bytes());
                exts.extend_from_slice(data);
            }
            body.extend_from_slice(&(exts.len() as u16).to_be_bytes());
            body.extend_from_slice(&exts);
        }

        let mut handshake = Vec::with_capacity(body.len() + 4);
        handshake.push(0x01);
        handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        handshake.extend_from_slice(&body);

        let mut record = Vec::with_capacity(handshake.len() + 5);
        record.push(0x16);
        record.extend_from_slice(&self.record_version);
        record.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
        record.extend_from_slice(&handshake);
        record
    }
}

/// Encode a `server_name` extension body from `(name_type, name)` entries.
pub fn server_name_payload(entries: &[(u8, &[u8])]) -> Vec<u8> {
    let mut list = Vec::new();
    for (name_type, name) in entries {
        list.push(*name_type);
        list.extend_from_slice(&(name.len() as u16).to_be_bytes());
        list.extend_from_slice(name);
    }
    let mut payload = Vec::with_capacity(list.len() + 2);
    payload.extend_from_slice(&(list.len() as u16).to_be_bytes());
    payload.extend_from_slice(&list);
    payload
}

/// Shorthand for a ClientHello carrying `host` as SNI.
pub fn client_hello(host: &str) -> Vec<u8> {
    ClientHelloBuilder::new()
        .server_name(host)
        .extension(EXT_SUPPORTED_VERSIONS, vec![0x04, 0x03, 0x04, 0x03, 0x03])
        .build()
}

/// An HTTP/1.1 request head with the given headers, terminated by a blank line.
pub fn http_request(method: &str, target: &str, headers: &[(&str, &str)]) -> Vec<u8> {
    let mut out = format!("{method} {target} HTTP/1.1\r\n");
    for (name, value) in headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.into_bytes()
}

/// Right-pad `data` with zeros to `len` bytes, the way a host hands over a
/// fixed-size first-packet buffer.
pub fn zero_padded(data: &[u8], len: usize) -> Vec<u8> {
    let mut buf = data.to_vec();
    if buf.len() < len {
        buf.resize(len, 0);
    }
    buf
}
