//! Header value encoding (RFC 2047).

use base64::Engine;

/// Longest UTF-8 run per encoded word; keeps each word under 75 characters.
const MAX_WORD_BYTES: usize = 45;

/// Encodes a header value as one or more RFC 2047 `B` encoded words.
///
/// Words are split on character boundaries and folded with CRLF + space.
#[must_use]
pub fn encode_word(text: &str) -> String {
    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for (idx, ch) in text.char_indices() {
        let next = idx + ch.len_utf8();
        if next - start > MAX_WORD_BYTES {
            words.push(b_word(&text[start..end]));
            start = end;
        }
        end = next;
    }
    if start < end || words.is_empty() {
        words.push(b_word(&text[start..end]));
    }

    words.join("\r\n ")
}

/// Encodes the value only if it is not plain printable ASCII.
#[must_use]
pub fn encode_if_needed(text: &str) -> String {
    let plain = text
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control())
        && !text.contains("=?");
    if plain {
        text.to_string()
    } else {
        encode_word(text)
    }
}

fn b_word(chunk: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(chunk.as_bytes());
    format!("=?UTF-8?B?{encoded}?=")
}
