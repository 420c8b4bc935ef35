// MotionLink — HTTP/1.1 framing
//
// Request framing for the JSON POST and the two response classifiers:
// status-line parsing (default) and the `200 OK` substring scan kept for
// servers that only ever answered the old firmware.

use crate::config::Endpoint;
use crate::encoder::EncodedPayload;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const SUCCESS_MARKER: &[u8] = b"200 OK";

/// Build the complete request: head, blank line, then the body verbatim.
pub fn build_request(endpoint: &Endpoint, body: &EncodedPayload) -> Vec<u8> {
    let head = format!(
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        endpoint.path,
        endpoint.host_header(),
        body.len()
    );

    let mut frame = Vec::with_capacity(head.len() + body.len());
    frame.extend_from_slice(head.as_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame
}

/// Literal check used by the old firmware.
pub fn contains_success_marker(response: &[u8]) -> bool {
    response
        .windows(SUCCESS_MARKER.len())
        .any(|w| w == SUCCESS_MARKER)
}

/// Parse the numeric code out of `HTTP/1.x <code> [reason]`. The status line
/// may end in CRLF or a bare LF.
pub fn parse_status_code(response: &[u8]) -> Option<u16> {
    let line_end = response
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(response.len());
    let line = response[..line_end].strip_suffix(b"\r").unwrap_or(&response[..line_end]);
    let line = std::str::from_utf8(line).ok()?;

    let mut parts = line.splitn(3, ' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/1.") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse::<u16>().ok().filter(|c| (100..600).contains(c))
}

/// Offset just past `\r\n\r\n`, if the head is complete.
pub fn header_end(response: &[u8]) -> Option<usize> {
    response
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|ix| ix + HEADER_TERMINATOR.len())
}

/// `Content-Length` from a complete response head.
pub fn content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    head.split("\r\n").skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Whether the bytes read so far hold a whole response. Without a
/// `Content-Length` the server's close (EOF) ends the response instead.
pub fn is_complete(response: &[u8]) -> bool {
    match header_end(response) {
        Some(end) => match content_length(&response[..end]) {
            Some(len) => response.len() >= end + len,
            None => false,
        },
        None => false,
    }
}
