//! Plaintext HTTP-like request head scanning.
//!
//! Recognizes a request line for a known method and pulls the routing key
//! from, in order:
//! - the authority of a `CONNECT` or absolute-form request target
//! - the first `Host:` header
//!
//! The scan never looks past `scan_limit` bytes, the end of the header
//! block, or the first NUL byte (hosts hand over zero-padded buffers).

use crate::hostname::normalize_authority;
use crate::ParseOutcome;

/// Methods that mark the start of an HTTP/1.x request (or the h2 preface).
const METHODS: &[&[u8]] = &[
    b"GET", b"HEAD", b"POST", b"PUT", b"DELETE", b"OPTIONS", b"PATCH", b"TRACE", b"CONNECT",
    b"PRI",
];

/// Parse a plaintext request head from the leading bytes of `data`.
pub(crate) fn parse_request_head(data: &[u8], scan_limit: usize) -> ParseOutcome {
    let window = &data[..data.len().min(scan_limit)];
    let window = match window.iter().position(|&b| b == 0) {
        Some(nul) => &window[..nul],
        None => window,
    };

    let Some(method) = match_method(window) else {
        return if could_be_method(window) {
            ParseOutcome::Incomplete
        } else {
            ParseOutcome::NotApplicable
        };
    };

    let mut lines = Lines::new(window);
    let Some(request_line) = lines.next_line() else {
        return ParseOutcome::Incomplete;
    };

    let Some(target) = request_target(request_line) else {
        return ParseOutcome::Malformed;
    };

    if let Some(authority) = target_authority(method, target) {
        return match normalize_authority(authority) {
            Some(host) => ParseOutcome::Found(host),
            None => ParseOutcome::Malformed,
        };
    }

    while let Some(line) = lines.next_line() {
        if line.is_empty() {
            return ParseOutcome::NoHost;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return ParseOutcome::Malformed;
        };
        let (name, value) = (&line[..colon], &line[colon + 1..]);
        if !name.eq_ignore_ascii_case(b"host") {
            continue;
        }

        return match std::str::from_utf8(value).ok().and_then(normalize_authority) {
            Some(host) => ParseOutcome::Found(host),
            None => ParseOutcome::Malformed,
        };
    }

    // Ran out of bytes inside the header block.
    ParseOutcome::Incomplete
}

/// Return the method if `window` starts with `<METHOD> `.
fn match_method(window: &[u8]) -> Option<&'static [u8]> {
    METHODS.iter().copied().find(|method| {
        window.len() > method.len()
            && window.starts_with(method)
            && window[method.len()] == b' '
    })
}

/// True if `window` is a strict prefix of some `<METHOD> ` token.
fn could_be_method(window: &[u8]) -> bool {
    !window.is_empty()
        && METHODS
            .iter()
            .any(|method| window.len() <= method.len() && method.starts_with(window))
}

/// Split `<METHOD> <target> HTTP/x.y` and return the target.
fn request_target(line: &[u8]) -> Option<&[u8]> {
    let mut parts = line.split(|&b| b == b' ');
    let _method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;
    if parts.next().is_some() || target.is_empty() || !version.starts_with(b"HTTP/") {
        return None;
    }
    Some(target)
}

/// Authority carried by the request target itself, if any.
fn target_authority<'a>(method: &[u8], target: &'a [u8]) -> Option<&'a str> {
    let target = std::str::from_utf8(target).ok()?;

    if method == b"CONNECT" {
        return Some(target);
    }

    let scheme_end = target.find("://")?;
    let scheme = &target[..scheme_end];
    if !(scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")) {
        return None;
    }
    let rest = &target[scheme_end + 3..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// CRLF/LF line splitter that only yields complete lines.
struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Lines<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        let newline = self.rest.iter().position(|&b| b == b'\n')?;
        let line = &self.rest[..newline];
        self.rest = &self.rest[newline + 1..];
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_testing::http_request;

    const LIMIT: usize = 1024;

    fn parse(data: &[u8]) -> ParseOutcome {
        parse_request_head(data, LIMIT)
    }

    #[test]
    fn test_extract_host_basic() {
        let request = http_request("GET", "/", &[("Host", "example.com")]);
        assert_eq!(parse(&request), ParseOutcome::Found("example.com".into()));
    }

    #[test]
    fn test_extract_host_with_port_and_case() {
        let request = b"GET /api HTTP/1.1\r\nhOsT:API.Example.com:8080\r\n\r\n";
        assert_eq!(parse(request), ParseOutcome::Found("api.example.com".into()));
    }

    #[test]
    fn test_host_after_other_headers() {
        let request = http_request(
            "POST",
            "/api/v1/users",
            &[("Content-Type", "application/json"), ("Host", "sub.domain.example.com")],
        );
        assert_eq!(
            parse(&request),
            ParseOutcome::Found("sub.domain.example.com".into())
        );
    }

    #[test]
    fn test_connect_target_wins() {
        let request = http_request("CONNECT", "svc.internal:443", &[("Host", "other.example")]);
        assert_eq!(parse(&request), ParseOutcome::Found("svc.internal".into()));
    }

    #[test]
    fn test_absolute_form_target() {
        let request = http_request("GET", "http://Proxy.Example:80/path?q=1", &[]);
        assert_eq!(parse(&request), ParseOutcome::Found("proxy.example".into()));
    }

    #[test]
    fn test_no_host_header() {
        let request = http_request("GET", "/", &[("Accept", "*/*")]);
        assert_eq!(parse(&request), ParseOutcome::NoHost);

        let preface = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
        assert_eq!(parse(preface), ParseOutcome::NoHost);
    }

    #[test]
    fn test_not_http() {
        assert_eq!(parse(b""), ParseOutcome::NotApplicable);
        assert_eq!(parse(b"SSH-2.0-OpenSSH_9.6\r\n"), ParseOutcome::NotApplicable);
        assert_eq!(parse(b"GETX / HTTP/1.1\r\n"), ParseOutcome::NotApplicable);
        assert_eq!(parse(&[0x16, 0x03, 0x01]), ParseOutcome::NotApplicable);
    }

    #[test]
    fn test_partial_request() {
        assert_eq!(parse(b"GE"), ParseOutcome::Incomplete);
        assert_eq!(parse(b"GET /index.html HTT"), ParseOutcome::Incomplete);
        assert_eq!(
            parse(b"GET / HTTP/1.1\r\nAccept: */*\r\nHo"),
            ParseOutcome::Incomplete
        );
    }

    #[test]
    fn test_scan_limit_bounds_search() {
        let filler = "x".repeat(2048);
        let request = http_request("GET", "/", &[("X-Filler", filler.as_str()), ("Host", "late.example")]);
        assert_eq!(parse_request_head(&request, 256), ParseOutcome::Incomplete);
        assert_eq!(
            parse_request_head(&request, request.len()),
            ParseOutcome::Found("late.example".into())
        );
    }

    #[test]
    fn test_stops_at_zero_padding() {
        let mut request = b"GET / HTTP/1.1\r\nAccept: */*\r\n".to_vec();
        request.resize(512, 0);
        assert_eq!(parse(&request), ParseOutcome::Incomplete);
    }

    #[test]
    fn test_malformed_request_line_and_host() {
        assert_eq!(parse(b"GET /\r\n\r\n"), ParseOutcome::Malformed);
        assert_eq!(
            parse(b"GET / HTTP/1.1\r\nHost: bad host\r\n\r\n"),
            ParseOutcome::Malformed
        );
        assert_eq!(
            parse(b"GET / HTTP/1.1\r\nnot a header\r\n\r\n"),
            ParseOutcome::Malformed
        );
    }
}
