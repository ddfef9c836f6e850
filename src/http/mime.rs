//! MIME type detection.
//!
//! The extension decides when it is known; otherwise the first bytes of the
//! file are sniffed for a handful of common signatures.

use std::path::Path;

/// How many leading bytes [`sniff`] looks at.
pub const SNIFF_LEN: usize = 512;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
];

/// Content-Type implied by the file extension, if the extension is known.
///
/// Text types are labelled UTF-8.
pub fn from_extension(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|mime| {
        if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() {
            format!("{}; charset=UTF-8", mime.essence_str())
        } else {
            mime.to_string()
        }
    })
}

/// Content-Type guessed from the leading bytes of a file.
pub fn sniff(prefix: &[u8]) -> &'static str {
    let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| prefix.starts_with(magic)) {
        return *mime;
    }

    let text = prefix.trim_ascii_start();
    let lower = text.get(..14).unwrap_or(text).to_ascii_lowercase();
    if lower.starts_with(b"<!doctype html") || lower.starts_with(b"<html") {
        return "text/html; charset=UTF-8";
    }

    // A multi-byte sequence cut off at the end of the window still counts as text.
    let valid_text = match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };
    if prefix.is_empty() || (valid_text && !prefix.contains(&0)) {
        "text/plain; charset=UTF-8"
    } else {
        "application/octet-stream"
    }
}
