use crate::network::Read;
use core::fmt::Write;
use heapless::{String, Vec};

/// Upper bound for an encoded request (request line, headers and body).
pub const MAX_REQUEST_LEN: usize = 1024;
/// Longest response line kept; longer lines are truncated to this length.
pub const MAX_LINE_LEN: usize = 256;
/// Longest reason phrase kept from the status line.
pub const MAX_REASON_LEN: usize = 64;
/// Reason phrase reported when the server sends none.
pub const NO_REASON: &str = "no reason";

const TRANSFER_ENCODING: &[u8] = b"Transfer-Encoding:";
const LOCATION: &[u8] = b"Location:";

/// The request did not fit into [`MAX_REQUEST_LEN`] bytes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RequestTooLarge;

/// A JSON `POST` request.
///
/// The wire form is fixed: request line, then `Host`, `Content-Type` and
/// `Content-Length` in that order, a blank line and the body. No other
/// headers are sent.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Value of the `Host` header.
    pub host: &'a str,
    /// Path without the leading slash.
    pub path: &'a str,
    /// Serialized JSON body.
    pub body: &'a [u8],
}

impl Request<'_> {
    /// Encode the request into a single buffer ready to be written.
    pub fn encode(&self) -> Result<Vec<u8, MAX_REQUEST_LEN>, RequestTooLarge> {
        let mut request_buf: Vec<u8, MAX_REQUEST_LEN> = Vec::new();

        // Request line
        request_buf
            .extend_from_slice(b"POST /")
            .map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(self.path.as_bytes())
            .map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(b" HTTP/1.1\r\n")
            .map_err(|_| RequestTooLarge)?;

        // Headers
        request_buf
            .extend_from_slice(b"Host: ")
            .map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(self.host.as_bytes())
            .map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(b"\r\nContent-Type: application/json\r\n")
            .map_err(|_| RequestTooLarge)?;

        let mut len_str: String<10> = String::new();
        write!(len_str, "{}", self.body.len()).map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(b"Content-Length: ")
            .map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(len_str.as_bytes())
            .map_err(|_| RequestTooLarge)?;
        request_buf
            .extend_from_slice(b"\r\n\r\n")
            .map_err(|_| RequestTooLarge)?;

        // Body
        request_buf
            .extend_from_slice(self.body)
            .map_err(|_| RequestTooLarge)?;

        Ok(request_buf)
    }
}

/// Status code and reason phrase from the first response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Numeric status code.
    pub code: u16,
    /// Reason phrase, or [`NO_REASON`] when absent.
    pub reason: String<MAX_REASON_LEN>,
}

impl StatusLine {
    /// `true` for 200..=299.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.code)
    }
}

/// Why a response head was rejected.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HeadError<E> {
    /// Status line missing, or its code token missing or not numeric.
    Protocol,
    /// The server announced `Transfer-Encoding: chunked`.
    UnsupportedEncoding,
    /// The server answered outside 2xx with a `Location` header.
    UnsupportedRedirect,
    /// Reading from the connection failed.
    Read(E),
}

/// Parse a status line such as `HTTP/1.1 200 OK`.
///
/// The line is split on whitespace into at most three tokens. The version is
/// discarded and everything after the code is the reason phrase with trailing
/// whitespace removed.
pub fn parse_status_line<E>(line: &[u8]) -> Result<StatusLine, HeadError<E>> {
    let (_version, rest) = next_token(line).ok_or(HeadError::Protocol)?;
    let (code, rest) = next_token(rest).ok_or(HeadError::Protocol)?;
    let code = core::str::from_utf8(code)
        .ok()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(HeadError::Protocol)?;

    let phrase = trim_end(trim_start(rest));
    let reason = match core::str::from_utf8(phrase) {
        Ok(phrase) if !phrase.is_empty() => truncated(phrase),
        _ => truncated(NO_REASON),
    };

    Ok(StatusLine { code, reason })
}

/// Inspect one header line against the response status.
///
/// Only two headers matter: chunked transfer coding is always rejected, and a
/// `Location` header is rejected unless the status is 2xx. All others pass.
pub fn check_header<E>(line: &[u8], status: u16) -> Result<(), HeadError<E>> {
    if line.starts_with(TRANSFER_ENCODING) {
        if contains(line, b"chunked") {
            return Err(HeadError::UnsupportedEncoding);
        }
    } else if line.starts_with(LOCATION) && !(200..=299).contains(&status) {
        return Err(HeadError::UnsupportedRedirect);
    }
    Ok(())
}

/// Read the status line and header block from `conn`.
///
/// Stops at the first empty line or at end of stream and leaves the body unread.
pub fn read_head<R: Read>(conn: &mut R) -> Result<StatusLine, HeadError<R::Error>> {
    let mut lines: LineReader<MAX_LINE_LEN> = LineReader::new();

    let status = match lines.read_line(conn).map_err(HeadError::Read)? {
        Some(line) => parse_status_line(line)?,
        None => return Err(HeadError::Protocol),
    };

    while let Some(line) = lines.read_line(conn).map_err(HeadError::Read)? {
        if line.is_empty() {
            break;
        }
        check_header(line, status.code)?;
    }

    Ok(status)
}

/// Buffered line splitter over a [`Read`] connection.
///
/// Lines end at `\n`; a trailing `\r` is removed. A line longer than the
/// buffer is returned truncated and the rest of it is skipped.
#[derive(Debug)]
pub struct LineReader<const N: usize> {
    buf: [u8; N],
    start: usize,
    end: usize,
    eof: bool,
    skip_rest: bool,
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineReader<N> {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self {
            buf: [0; N],
            start: 0,
            end: 0,
            eof: false,
            skip_rest: false,
        }
    }

    /// Return the next line, or `None` once the stream is exhausted.
    pub fn read_line<R: Read>(&mut self, conn: &mut R) -> Result<Option<&[u8]>, R::Error> {
        loop {
            let newline = self.buf[self.start..self.end]
                .iter()
                .position(|&b| b == b'\n');

            if let Some(pos) = newline {
                let (from, to) = (self.start, self.start + pos);
                self.start = to + 1;
                if self.skip_rest {
                    self.skip_rest = false;
                    continue;
                }
                return Ok(Some(trim_cr(&self.buf[from..to])));
            }

            if self.skip_rest {
                self.start = 0;
                self.end = 0;
            } else if self.end - self.start == N {
                let (from, to) = (self.start, self.end);
                self.start = self.end;
                self.skip_rest = true;
                return Ok(Some(&self.buf[from..to]));
            }

            if self.eof {
                if self.start == self.end {
                    return Ok(None);
                }
                let (from, to) = (self.start, self.end);
                self.start = self.end;
                return Ok(Some(trim_cr(&self.buf[from..to])));
            }

            if self.start > 0 {
                self.buf.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                self.start = 0;
            }

            match conn.read(&mut self.buf[self.end..])? {
                0 => self.eof = true,
                n => self.end += n,
            }
        }
    }
}

fn next_token(s: &[u8]) -> Option<(&[u8], &[u8])> {
    let s = trim_start(s);
    if s.is_empty() {
        return None;
    }
    let end = s
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn trim_start(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(s.len());
    &s[start..]
}

fn trim_end(s: &[u8]) -> &[u8] {
    let end = s
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &s[..end]
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

fn truncated(text: &str) -> String<MAX_REASON_LEN> {
    let mut end = text.len().min(MAX_REASON_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // Cannot fail: `end` is within capacity.
    let _ = out.push_str(&text[..end]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves a fixed byte string in chunks of at most `step` bytes.
    struct Chunked {
        data: &'static [u8],
        pos: usize,
        step: usize,
    }

    impl Read for Chunked {
        type Error = ();

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.step).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn conn(data: &'static [u8], step: usize) -> Chunked {
        Chunked { data, pos: 0, step }
    }

    #[test]
    fn encodes_fixed_header_order() {
        let request = Request {
            host: "example.com",
            path: "api/v1/t/telemetry",
            body: b"{\"a\":1}",
        };
        let bytes = request.encode().unwrap();
        assert_eq!(
            &bytes[..],
            &b"POST /api/v1/t/telemetry HTTP/1.1\r\n\
               Host: example.com\r\n\
               Content-Type: application/json\r\n\
               Content-Length: 7\r\n\
               \r\n\
               {\"a\":1}"[..]
        );
    }

    #[test]
    fn oversized_request_is_rejected() {
        let body = [b'x'; MAX_REQUEST_LEN];
        let request = Request {
            host: "h",
            path: "",
            body: &body,
        };
        assert_eq!(request.encode(), Err(RequestTooLarge));
    }

    #[test]
    fn status_line_tokens() {
        let status = parse_status_line::<()>(b"HTTP/1.1 200 OK").unwrap();
        assert_eq!(status.code, 200);
        assert_eq!(status.reason.as_str(), "OK");

        let status = parse_status_line::<()>(b"HTTP/1.1  404   Not  Found \t").unwrap();
        assert_eq!(status.code, 404);
        assert_eq!(status.reason.as_str(), "Not  Found");

        let status = parse_status_line::<()>(b"HTTP/1.1 204").unwrap();
        assert_eq!(status.reason.as_str(), NO_REASON);
    }

    #[test]
    fn status_line_errors() {
        assert_eq!(parse_status_line::<()>(b""), Err(HeadError::Protocol));
        assert_eq!(parse_status_line::<()>(b"HTTP/1.1"), Err(HeadError::Protocol));
        assert_eq!(parse_status_line::<()>(b"HTTP/1.1 abc OK"), Err(HeadError::Protocol));
    }

    #[test]
    fn long_reason_is_truncated() {
        let status = parse_status_line::<()>(
            b"HTTP/1.1 500 aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        )
        .unwrap();
        assert_eq!(status.reason.len(), MAX_REASON_LEN);
    }

    #[test]
    fn header_rules() {
        assert_eq!(
            check_header::<()>(b"Transfer-Encoding: chunked", 200),
            Err(HeadError::UnsupportedEncoding)
        );
        assert_eq!(check_header::<()>(b"Transfer-Encoding: identity", 200), Ok(()));
        assert_eq!(
            check_header::<()>(b"Location: https://elsewhere/", 302),
            Err(HeadError::UnsupportedRedirect)
        );
        assert_eq!(check_header::<()>(b"Location: https://elsewhere/", 201), Ok(()));
        assert_eq!(check_header::<()>(b"X-Chunked: chunked", 200), Ok(()));
    }

    #[test]
    fn lines_across_small_reads() {
        let mut c = conn(b"one\r\ntwo\nthree", 2);
        let mut lines: LineReader<16> = LineReader::new();
        assert_eq!(lines.read_line(&mut c).unwrap(), Some(&b"one"[..]));
        assert_eq!(lines.read_line(&mut c).unwrap(), Some(&b"two"[..]));
        assert_eq!(lines.read_line(&mut c).unwrap(), Some(&b"three"[..]));
        assert_eq!(lines.read_line(&mut c).unwrap(), None);
    }

    #[test]
    fn overlong_line_is_truncated_and_skipped() {
        let mut c = conn(b"0123456789abcdef\r\nnext\r\n", 5);
        let mut lines: LineReader<8> = LineReader::new();
        assert_eq!(lines.read_line(&mut c).unwrap(), Some(&b"01234567"[..]));
        assert_eq!(lines.read_line(&mut c).unwrap(), Some(&b"next"[..]));
        assert_eq!(lines.read_line(&mut c).unwrap(), None);
    }

    #[test]
    fn head_stops_at_blank_line() {
        let mut c = conn(
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nTransfer-Encoding: chunked\r\n",
            64,
        );
        let status = read_head(&mut c).unwrap();
        assert_eq!(status.code, 200);
        assert!(status.is_success());
    }

    #[test]
    fn head_on_empty_stream_is_protocol_error() {
        let mut c = conn(b"", 64);
        assert_eq!(read_head(&mut c), Err(HeadError::Protocol));
    }
}
