//! SNI (Server Name Indication) extraction from a TLS ClientHello prefix.
//!
//! TLS record:
//! - byte 0: content type (0x16 = handshake)
//! - bytes 1-2: legacy record version (major 0x03)
//! - bytes 3-4: record length
//! - bytes 5+: handshake fragment
//!
//! ClientHello:
//! - byte 0: handshake type (0x01)
//! - bytes 1-3: length
//! - 2 bytes: legacy version, 32 bytes: random
//! - session id (u8 length), cipher suites (u16 length),
//!   compression methods (u8 length), extensions (u16 length)
//!
//! The prefix is usually shorter than the whole hello. Fields that sit
//! before the server_name extension are walked within the bytes present;
//! whenever a length needs bytes that are missing the result is
//! `Incomplete`, and when it contradicts an enclosing length inside a
//! complete record it is `Malformed`.
//!
//! Hosts zero-pad short prefixes to the required length, so a run of zero
//! bytes at the end of the prefix counts as missing, never as content.
//! Otherwise padding right after an extension would read as an empty
//! `server_name` (type 0, length 0).

use crate::hostname::normalize_host_bytes;
use crate::ParseOutcome;

const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
const RECORD_HEADER_LEN: usize = 5;
const HANDSHAKE_HEADER_LEN: usize = 4;

/// Largest plaintext record payload (2^14) plus the allowed expansion.
pub(crate) const MAX_RECORD_PAYLOAD: usize = (1 << 14) + 2048;

const EXT_SERVER_NAME: u16 = 0x0000;
const NAME_TYPE_HOST_NAME: u8 = 0x00;
const MAX_SESSION_ID_LEN: usize = 32;

/// Bounds-checked big-endian reader over a borrowed slice.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let out = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(out)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u24(&mut self) -> Option<usize> {
        self.take(3)
            .map(|b| ((b[0] as usize) << 16) | ((b[1] as usize) << 8) | b[2] as usize)
    }
}

/// Parse the server name from a (possibly truncated) ClientHello record.
pub(crate) fn parse_client_hello(data: &[u8]) -> ParseOutcome {
    let data = without_zero_tail(data);
    let Some(&content_type) = data.first() else {
        return ParseOutcome::NotApplicable;
    };
    if content_type != CONTENT_TYPE_HANDSHAKE {
        return ParseOutcome::NotApplicable;
    }
    let Some(&major) = data.get(1) else {
        return ParseOutcome::Incomplete;
    };
    if major != 0x03 {
        return ParseOutcome::NotApplicable;
    }
    if data.len() < RECORD_HEADER_LEN {
        return ParseOutcome::Incomplete;
    }

    let record_len = u16::from_be_bytes([data[3], data[4]]) as usize;
    if record_len < HANDSHAKE_HEADER_LEN || record_len > MAX_RECORD_PAYLOAD {
        return ParseOutcome::Malformed;
    }

    let record_end = RECORD_HEADER_LEN + record_len;
    let record_truncated = data.len() < record_end;
    let fragment = &data[RECORD_HEADER_LEN..data.len().min(record_end)];

    let mut record = Reader::new(fragment);
    let Some(msg_type) = record.u8() else {
        return ParseOutcome::Incomplete;
    };
    if msg_type != HANDSHAKE_CLIENT_HELLO {
        return ParseOutcome::NotApplicable;
    }
    let Some(hello_len) = record.u24() else {
        return ParseOutcome::Incomplete;
    };

    // A hello longer than its record continues in the next record, which
    // this prefix never contains.
    let fragmented = hello_len > record_len - HANDSHAKE_HEADER_LEN;
    let partial = record_truncated || fragmented;
    let available = hello_len.min(record.remaining());
    let Some(body) = record.take(available) else {
        return ParseOutcome::Malformed;
    };

    parse_hello_body(body, partial)
}

/// Drop the trailing run of zero bytes.
fn without_zero_tail(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    &data[..end]
}

/// Walk the ClientHello body. `partial` is true when `body` may stop short of
/// the declared hello length.
fn parse_hello_body(body: &[u8], partial: bool) -> ParseOutcome {
    let short = if partial {
        ParseOutcome::Incomplete
    } else {
        ParseOutcome::Malformed
    };

    let mut r = Reader::new(body);

    // legacy_version + random
    if r.take(2 + 32).is_none() {
        return short;
    }

    let Some(session_id_len) = r.u8() else {
        return short;
    };
    if session_id_len as usize > MAX_SESSION_ID_LEN {
        return ParseOutcome::Malformed;
    }
    if r.take(session_id_len as usize).is_none() {
        return short;
    }

    let Some(cipher_suites_len) = r.u16() else {
        return short;
    };
    if cipher_suites_len == 0 || cipher_suites_len % 2 != 0 {
        return ParseOutcome::Malformed;
    }
    if r.take(cipher_suites_len as usize).is_none() {
        return short;
    }

    let Some(compression_len) = r.u8() else {
        return short;
    };
    if compression_len == 0 {
        return ParseOutcome::Malformed;
    }
    if r.take(compression_len as usize).is_none() {
        return short;
    }

    if r.remaining() == 0 {
        // A complete hello without an extensions block carries no SNI.
        return if partial {
            ParseOutcome::Incomplete
        } else {
            ParseOutcome::NoHost
        };
    }

    let Some(extensions_len) = r.u16() else {
        return short;
    };
    let extensions_len = extensions_len as usize;
    let block_truncated = extensions_len > r.remaining();
    if block_truncated && !partial {
        return ParseOutcome::Malformed;
    }
    let Some(block) = r.take(extensions_len.min(r.remaining())) else {
        return ParseOutcome::Malformed;
    };

    parse_extensions(block, block_truncated)
}

fn parse_extensions(block: &[u8], truncated: bool) -> ParseOutcome {
    let mut r = Reader::new(block);
    let mut found: Option<ParseOutcome> = None;

    while r.remaining() > 0 {
        let header = r.u16().zip(r.u16());
        let Some((ext_type, ext_len)) = header else {
            return found.unwrap_or(if truncated {
                ParseOutcome::Incomplete
            } else {
                ParseOutcome::Malformed
            });
        };
        let Some(ext_data) = r.take(ext_len as usize) else {
            return found.unwrap_or(if truncated {
                ParseOutcome::Incomplete
            } else {
                ParseOutcome::Malformed
            });
        };

        if ext_type == EXT_SERVER_NAME {
            if found.is_some() {
                // Each extension type may appear at most once.
                return ParseOutcome::Malformed;
            }
            found = Some(parse_server_name(ext_data));
        }
    }

    match found {
        Some(outcome) => outcome,
        None if truncated => ParseOutcome::Incomplete,
        None => ParseOutcome::NoHost,
    }
}

/// Parse the server_name extension value.
///
/// - 2 bytes: server_name_list length
/// - per entry: 1 byte name type, 2 bytes length, name
fn parse_server_name(data: &[u8]) -> ParseOutcome {
    let mut r = Reader::new(data);
    let Some(list_len) = r.u16() else {
        return ParseOutcome::Malformed;
    };
    if list_len == 0 || list_len as usize != r.remaining() {
        return ParseOutcome::Malformed;
    }

    while r.remaining() > 0 {
        let (Some(name_type), Some(name_len)) = (r.u8(), r.u16()) else {
            return ParseOutcome::Malformed;
        };
        let Some(name) = r.take(name_len as usize) else {
            return ParseOutcome::Malformed;
        };

        if name_type == NAME_TYPE_HOST_NAME {
            return match normalize_host_bytes(name) {
                Some(host) => ParseOutcome::Found(host),
                None => ParseOutcome::Malformed,
            };
        }
    }

    ParseOutcome::NoHost
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_testing::{
        server_name_payload, ClientHelloBuilder, EXT_SERVER_NAME as SNI, EXT_SUPPORTED_VERSIONS,
    };

    // A minimal TLS 1.2 ClientHello with SNI "example.com"
    const EXAMPLE_CLIENT_HELLO: &[u8] = &[
        // TLS record header
        0x16, // Handshake
        0x03, 0x01, // TLS 1.0 (for compatibility)
        0x00, 0x57, // Record length: 87 bytes
        // Handshake header
        0x01, // ClientHello
        0x00, 0x00, 0x53, // Length: 83 bytes
        // Client version
        0x03, 0x03, // TLS 1.2
        // Random (32 bytes)
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
        0x00, // Session ID length
        0x00, 0x02, // Cipher suites length
        0x00, 0x2f, // TLS_RSA_WITH_AES_128_CBC_SHA
        0x01, 0x00, // Compression methods: null
        0x00, 0x28, // Extensions length: 40 bytes
        // SNI extension
        0x00, 0x00, // type: SNI
        0x00, 0x10, // length: 16 bytes
        0x00, 0x0e, // list length: 14 bytes
        0x00, // name type: hostname
        0x00, 0x0b, // name length: 11 bytes
        b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c', b'o', b'm',
        // Padding extension
        0x00, 0x15, // type: padding
        0x00, 0x10, // length
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    fn found(outcome: ParseOutcome) -> String {
        match outcome {
            ParseOutcome::Found(host) => host,
            other => panic!("Expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sni_found() {
        assert_eq!(found(parse_client_hello(EXAMPLE_CLIENT_HELLO)), "example.com");
    }

    #[test]
    fn test_parse_not_tls() {
        let http_request = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(parse_client_hello(http_request), ParseOutcome::NotApplicable);
        assert_eq!(parse_client_hello(&[]), ParseOutcome::NotApplicable);
        assert_eq!(
            parse_client_hello(&[0x16, 0x02, 0x00]),
            ParseOutcome::NotApplicable
        );
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(parse_client_hello(&[0x16]), ParseOutcome::Incomplete);
        assert_eq!(parse_client_hello(&[0x16, 0x03, 0x01]), ParseOutcome::Incomplete);
    }

    #[test]
    fn test_sni_is_normalized() {
        let hello = ClientHelloBuilder::new().server_name("API.Example.COM.").build();
        assert_eq!(found(parse_client_hello(&hello)), "api.example.com");
    }

    #[test]
    fn test_every_truncation_is_safe() {
        let hello = ClientHelloBuilder::new()
            .session_id(&[7; 32])
            .server_name("svc.internal")
            .padding(64)
            .build();

        for len in 0..hello.len() {
            let outcome = parse_client_hello(&hello[..len]);
            assert!(
                matches!(
                    outcome,
                    ParseOutcome::Incomplete
                        | ParseOutcome::NotApplicable
                        | ParseOutcome::Found(_)
                ),
                "len {len}: {outcome:?}"
            );
        }
    }

    #[test]
    fn test_sni_found_before_end_of_record() {
        let hello = ClientHelloBuilder::new()
            .server_name("early.example.com")
            .padding(512)
            .build();

        // Cut inside the padding extension, well after the server name.
        let prefix = &hello[..hello.len() - 256];
        assert_eq!(found(parse_client_hello(prefix)), "early.example.com");
    }

    #[test]
    fn test_no_sni_extension() {
        let hello = ClientHelloBuilder::new()
            .extension(EXT_SUPPORTED_VERSIONS, vec![0x02, 0x03, 0x04])
            .build();
        assert_eq!(parse_client_hello(&hello), ParseOutcome::NoHost);

        // Ends in the null compression method, so the last byte is zero and
        // reads as cut short.
        let bare = ClientHelloBuilder::new().build();
        assert_eq!(parse_client_hello(&bare), ParseOutcome::Incomplete);
    }

    #[test]
    fn test_zero_padding_after_server_name() {
        let hello = ClientHelloBuilder::new()
            .server_name("blocked.example.com")
            .padding(600)
            .build();
        // Record header, handshake header, fixed fields, extensions length,
        // then the server_name extension.
        let sni_end = 5 + 4 + 2 + 32 + 1 + 2 + 4 + 2 + 2 + (4 + 2 + 3 + 19);

        for cut in sni_end..hello.len() {
            let mut padded = hello[..cut].to_vec();
            padded.resize(1024, 0);
            assert_eq!(
                parse_client_hello(&padded),
                ParseOutcome::Found("blocked.example.com".into()),
                "cut {cut}"
            );
        }
    }

    #[test]
    fn test_zero_padding_inside_record_header() {
        let mut padded = vec![0x16];
        padded.resize(64, 0);
        assert_eq!(parse_client_hello(&padded), ParseOutcome::Incomplete);
        assert_eq!(parse_client_hello(&[0u8; 64]), ParseOutcome::NotApplicable);
    }

    #[test]
    fn test_record_version_variants() {
        let hello = ClientHelloBuilder::new()
            .record_version([0x03, 0x03])
            .server_name("example.com")
            .build();
        assert_eq!(found(parse_client_hello(&hello)), "example.com");

        let hello = ClientHelloBuilder::new()
            .record_version([0x02, 0x00])
            .server_name("example.com")
            .build();
        assert_eq!(parse_client_hello(&hello), ParseOutcome::NotApplicable);
    }

    #[test]
    fn test_handshake_type_must_be_client_hello() {
        let mut hello = ClientHelloBuilder::new().server_name("example.com").build();
        hello[5] = 0x02; // ServerHello
        assert_eq!(parse_client_hello(&hello), ParseOutcome::NotApplicable);
    }

    #[test]
    fn test_extension_overrunning_block_is_malformed() {
        let mut hello = ClientHelloBuilder::new().server_name("example.com").build();
        // Extension length of the first (server_name) extension.
        let ext_len_at = hello.len() - (2 + 3 + "example.com".len()) - 2;
        hello[ext_len_at] = 0xff;
        assert_eq!(parse_client_hello(&hello), ParseOutcome::Malformed);
    }

    #[test]
    fn test_server_name_list_length_mismatch() {
        let mut payload = server_name_payload(&[(0, b"example.com")]);
        payload[1] += 1;
        let hello = ClientHelloBuilder::new().extension(SNI, payload).build();
        assert_eq!(parse_client_hello(&hello), ParseOutcome::Malformed);
    }

    #[test]
    fn test_skips_non_host_name_entries() {
        let payload = server_name_payload(&[(7, b"opaque"), (0, b"second.example")]);
        let hello = ClientHelloBuilder::new().extension(SNI, payload).build();
        assert_eq!(found(parse_client_hello(&hello)), "second.example");
    }

    #[test]
    fn test_invalid_host_name_is_malformed() {
        let payload = server_name_payload(&[(0, b"bad\x00host")]);
        let hello = ClientHelloBuilder::new().extension(SNI, payload).build();
        assert_eq!(parse_client_hello(&hello), ParseOutcome::Malformed);
    }

    #[test]
    fn test_duplicate_server_name_is_malformed() {
        let hello = ClientHelloBuilder::new()
            .server_name("one.example")
            .server_name("two.example")
            .build();
        assert_eq!(parse_client_hello(&hello), ParseOutcome::Malformed);
    }

    #[test]
    fn test_oversized_session_id_is_malformed() {
        let hello = ClientHelloBuilder::new()
            .session_id(&[1; 33])
            .server_name("example.com")
            .build();
        assert_eq!(parse_client_hello(&hello), ParseOutcome::Malformed);
    }

    #[test]
    fn test_record_length_field_bounds() {
        assert_eq!(
            parse_client_hello(&[0x16, 0x03, 0x01, 0x00, 0x02, 0x01, 0x00]),
            ParseOutcome::Malformed
        );
        assert_eq!(
            parse_client_hello(&[0x16, 0x03, 0x01, 0xff, 0xff, 0x01]),
            ParseOutcome::Malformed
        );
    }

    #[test]
    fn test_fragmented_hello_without_sni_in_first_record() {
        let hello = ClientHelloBuilder::new()
            .padding(128)
            .server_name("late.example.com")
            .build();

        // Shrink the record to end inside the padding extension and keep the
        // declared handshake length, as a fragmenting client would.
        let cut = 5 + 4 + 80;
        let mut first_record = hello[..cut].to_vec();
        let record_len = (cut - 5) as u16;
        first_record[3..5].copy_from_slice(&record_len.to_be_bytes());
        first_record.extend_from_slice(&[0x17, 0x03, 0x03, 0x00, 0x00]);

        assert_eq!(parse_client_hello(&first_record), ParseOutcome::Incomplete);
    }
}
