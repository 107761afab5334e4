//! Content-type resolution for stored objects.
//!
//! Extension lookups go through a static table; payloads without a usable
//! `Content-Type` header are sniffed by their leading magic bytes.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Used for generated images when neither the header nor the bytes say otherwise.
pub const DEFAULT_IMAGE_TYPE: &str = "image/png";

static EXTENSION_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("png", "image/png"),
        ("gif", "image/gif"),
        ("webp", "image/webp"),
        ("bmp", "image/bmp"),
        ("svg", "image/svg+xml"),
        ("ico", "image/x-icon"),
        ("tif", "image/tiff"),
        ("tiff", "image/tiff"),
        ("avif", "image/avif"),
        ("json", "application/json"),
        ("txt", "text/plain"),
        ("html", "text/html"),
        ("pdf", "application/pdf"),
    ])
});

/// Canonical type for a bare extension (`"PNG"`, `".jpg"`), if known.
pub fn for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    EXTENSION_TYPES.get(ext.as_str()).copied()
}

/// Type for a file path or object key, falling back to `application/octet-stream`.
pub fn for_path(path: impl AsRef<Path>) -> &'static str {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(for_extension)
        .unwrap_or(OCTET_STREAM)
}

/// Preferred file extension for a content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match essence(content_type).as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        "image/x-icon" => "ico",
        "image/tiff" => "tiff",
        "image/avif" => "avif",
        "application/json" => "json",
        "text/plain" => "txt",
        "text/html" => "html",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Detects common image formats from their signature bytes.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        Some("image/bmp")
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && &bytes[8..12] == b"avif" {
        Some("image/avif")
    } else if looks_like_svg(bytes) {
        Some("image/svg+xml")
    } else {
        None
    }
}

/// Picks the content type for a downloaded payload: a concrete header value
/// wins, then the sniffed signature, then `fallback`.
pub fn resolve(header: Option<&str>, bytes: &[u8], fallback: &'static str) -> String {
    if let Some(header) = header {
        let essence = essence(header);
        let generic = essence.is_empty()
            || essence == OCTET_STREAM
            || essence == "binary/octet-stream"
            || !essence.contains('/');
        if !generic {
            return essence;
        }
    }
    sniff(bytes).unwrap_or(fallback).to_string()
}

/// Media type without parameters, lowercased (`"image/PNG; q=1"` -> `"image/png"`).
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    match std::str::from_utf8(head) {
        Ok(text) => {
            let text = text.trim_start();
            text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
        }
        Err(_) => false,
    }
}
