//! DATA payload encoding.

/// End-of-data marker.
pub const TERMINATOR: &[u8] = b".\r\n";

/// Encodes a rendered message for the DATA phase.
///
/// Line endings are normalized to CRLF, lines starting with `.` are
/// dot-stuffed, and the `.` terminator line is appended. A trailing line
/// break in the input does not produce an extra empty line.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 16);
    let mut lines = message.split(|&b| b == b'\n').peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() && lines.peek().is_none() {
            break;
        }

        let line = line.strip_suffix(b"\r").unwrap_or(line);

        // Byte-stuff lines starting with '.'
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }

        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(TERMINATOR);
    out
}
