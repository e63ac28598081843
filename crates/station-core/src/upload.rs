//! Telemetry upload to a ThingSpeak channel.
//!
//! The core builds the HTTP request and interprets the response. The socket
//! belongs to the firmware's [`UploadClient`] implementation.

use core::fmt::{self, Write};
use core::future::Future;

use heapless::String;
use thiserror_no_std::Error;

use crate::status::StatusRecord;

pub const THINGSPEAK_HOST: &str = "api.thingspeak.com";
pub const THINGSPEAK_PORT: u16 = 80;

/// ThingSpeak accepts at most eight fields per channel.
pub const MAX_FIELDS: usize = 8;

/// Capacity of a request built by [`ThingSpeakUpdate`].
pub const REQUEST_CAPACITY: usize = 512;

/// HTTP status or negative transport error, as the ThingSpeak libraries
/// report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CONNECT_FAILED: StatusCode = StatusCode(-301);
    pub const UNEXPECTED_RESPONSE: StatusCode = StatusCode(-302);
    pub const BAD_RESPONSE: StatusCode = StatusCode(-303);
    pub const TIMEOUT: StatusCode = StatusCode(-304);
    /// The server answered 200 but reported entry id 0.
    pub const NOT_INSERTED: StatusCode = StatusCode(-401);

    pub const fn is_success(self) -> bool {
        self.0 == 200
    }

    pub const fn is_transport_error(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publishes one set of readings with its status record. No retries; a
/// failed upload is simply reported.
pub trait UploadClient {
    fn publish(
        &mut self,
        status: &StatusRecord,
        fields: &[f32],
    ) -> impl Future<Output = StatusCode>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    #[error("{count} fields given, a channel holds at most 8")]
    TooManyFields { count: usize },
    #[error("request does not fit in the request buffer")]
    RequestTooLong,
}

impl From<fmt::Error> for UploadError {
    fn from(_: fmt::Error) -> Self {
        Self::RequestTooLong
    }
}

/// One channel update: `GET /update?api_key=…&field1=…&status=…`.
#[derive(Debug, Clone, Copy)]
pub struct ThingSpeakUpdate<'a> {
    pub api_key: &'a str,
    pub fields: &'a [f32],
    pub status: &'a str,
}

impl ThingSpeakUpdate<'_> {
    pub fn to_request(&self) -> Result<String<REQUEST_CAPACITY>, UploadError> {
        if self.fields.len() > MAX_FIELDS {
            return Err(UploadError::TooManyFields {
                count: self.fields.len(),
            });
        }

        let mut request = String::new();
        request.push_str("GET /update?api_key=").map_err(|_| UploadError::RequestTooLong)?;
        write_percent_encoded(&mut request, self.api_key)?;
        for (i, value) in self.fields.iter().enumerate() {
            write!(request, "&field{}={:.2}", i + 1, value)?;
        }
        if !self.status.is_empty() {
            request.push_str("&status=").map_err(|_| UploadError::RequestTooLong)?;
            write_percent_encoded(&mut request, self.status)?;
        }
        write!(
            request,
            " HTTP/1.1\r\nHost: {THINGSPEAK_HOST}\r\nConnection: close\r\n\r\n"
        )?;
        Ok(request)
    }
}

fn write_percent_encoded<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.write_char(char::from(byte))?;
        } else {
            write!(out, "%{byte:02X}")?;
        }
    }
    Ok(())
}

/// Status code from an `HTTP/1.x NNN reason` line at the start of `response`.
pub fn parse_status_line(response: &[u8]) -> Option<StatusCode> {
    let line_end = response
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(response.len());
    let line = core::str::from_utf8(&response[..line_end]).ok()?;

    let mut parts = line.split_ascii_whitespace();
    if !parts.next()?.starts_with("HTTP/1.") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok().map(StatusCode)
}

/// Interpret a complete update response.
///
/// A 200 whose body is the entry id `0` means the update was not stored, which
/// happens when updates come faster than the channel allows.
pub fn parse_response(response: &[u8]) -> StatusCode {
    let Some(status) = parse_status_line(response) else {
        return StatusCode::BAD_RESPONSE;
    };
    if !status.is_success() {
        return status;
    }

    let body = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|at| &response[at + 4..])
        .unwrap_or_default();
    match core::str::from_utf8(body).map(str::trim) {
        Ok("0") => StatusCode::NOT_INSERTED,
        _ => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_line() {
        let update = ThingSpeakUpdate {
            api_key: "ABC123",
            fields: &[21.5, 751.234, 43.0, 0.0, 4.12],
            status: "090503-r1s4z12b412cFF",
        };
        let request = update.to_request().unwrap();
        assert_eq!(
            request.as_str(),
            "GET /update?api_key=ABC123&field1=21.50&field2=751.23&field3=43.00\
             &field4=0.00&field5=4.12&status=090503-r1s4z12b412cFF HTTP/1.1\r\n\
             Host: api.thingspeak.com\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_status_is_percent_encoded() {
        let update = ThingSpeakUpdate {
            api_key: "k",
            fields: &[],
            status: "a b&c",
        };
        let request = update.to_request().unwrap();
        assert!(request.starts_with("GET /update?api_key=k&status=a%20b%26c HTTP/1.1"));
    }

    #[test]
    fn test_empty_status_is_omitted() {
        let update = ThingSpeakUpdate {
            api_key: "k",
            fields: &[1.0],
            status: "",
        };
        let request = update.to_request().unwrap();
        assert!(request.starts_with("GET /update?api_key=k&field1=1.00 HTTP/1.1"));
    }

    #[test]
    fn test_too_many_fields_rejected() {
        let update = ThingSpeakUpdate {
            api_key: "k",
            fields: &[0.0; 9],
            status: "",
        };
        assert_eq!(
            update.to_request(),
            Err(UploadError::TooManyFields { count: 9 })
        );
    }

    #[test]
    fn test_oversized_request_rejected() {
        let key = [b'x'; 600];
        let update = ThingSpeakUpdate {
            api_key: core::str::from_utf8(&key).unwrap(),
            fields: &[],
            status: "",
        };
        assert_eq!(update.to_request(), Err(UploadError::RequestTooLong));
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\n"), Some(StatusCode::OK));
        assert_eq!(parse_status_line(b"HTTP/1.0 404 Not Found"), Some(StatusCode(404)));
        assert_eq!(parse_status_line(b"HTTP/1.1 200"), Some(StatusCode::OK));
        assert_eq!(parse_status_line(b"SMTP 200 OK\r\n"), None);
        assert_eq!(parse_status_line(b"HTTP/1.1 20 OK\r\n"), None);
        assert_eq!(parse_status_line(b""), None);
    }

    #[test]
    fn test_parse_response_checks_entry_id() {
        let stored = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\n118";
        assert_eq!(parse_response(stored), StatusCode::OK);

        let dropped = b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\n0";
        assert_eq!(parse_response(dropped), StatusCode::NOT_INSERTED);

        assert_eq!(parse_response(b"HTTP/1.1 400 Bad Request\r\n\r\n-1"), StatusCode(400));
        assert_eq!(parse_response(b"garbage"), StatusCode::BAD_RESPONSE);
    }

    #[test]
    fn test_status_code_classes() {
        assert!(StatusCode::OK.is_success());
        assert!(!StatusCode(404).is_success());
        assert!(StatusCode::TIMEOUT.is_transport_error());
        assert!(!StatusCode(404).is_transport_error());
    }
}
