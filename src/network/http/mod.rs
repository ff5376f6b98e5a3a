//! HTTP/1.1 framing for the telemetry uplink.
//!
//! This is not a general HTTP client. It knows how to frame one
//! request shape (a JSON `POST` with exactly three headers) and how to read
//! just enough of the response to learn the status:
//!
//! - the status line, split into version, code and reason phrase
//! - the header block, scanned for chunked transfer coding and for redirects
//!
//! The response body is never read. Framing uses fixed-size `heapless` buffers
//! so memory use is known up front.
//!
//! ```rust
//! use telenode::network::http::Request;
//!
//! let request = Request {
//!     host: "collector.example",
//!     path: "api/v1/TOKEN/telemetry",
//!     body: br#"{"Temperatur":21.5}"#,
//! };
//! let bytes = request.encode().unwrap();
//! assert!(bytes.starts_with(b"POST /api/v1/TOKEN/telemetry HTTP/1.1\r\n"));
//! ```

/// Request encoding and response head parsing.
pub mod client;

pub use client::{
    HeadError, LineReader, MAX_LINE_LEN, MAX_REASON_LEN, MAX_REQUEST_LEN, NO_REASON, Request,
    RequestTooLarge, StatusLine, check_header, parse_status_line, read_head,
};
