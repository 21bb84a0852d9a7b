//! Content type detection from file contents

use std::path::Path;

use tokio::io::AsyncReadExt;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const SNIFF_LEN: usize = 512;

/// Detect the content type of a local file by sampling its first bytes.
///
/// Falls back to `application/octet-stream` when the file cannot be read or the content is
/// not recognized.
pub async fn detect_content_type(path: &Path) -> String {
    let mut buf = vec![0u8; SNIFF_LEN];
    let read = async {
        let mut file = tokio::fs::File::open(path).await?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok::<usize, std::io::Error>(filled)
    }
    .await;

    match read {
        Ok(n) => sniff(&buf[..n]).unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        Err(e) => {
            tracing::debug!(
                error = %e,
                path = %path.display(),
                "Could not sample file for content type detection"
            );
            DEFAULT_CONTENT_TYPE.to_string()
        }
    }
}

/// Match well-known magic numbers.
pub fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.is_empty() {
        return None;
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some("image/png");
    }
    if data.starts_with(b"GIF8") {
        return Some("image/gif");
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") {
        return match &data[8..12] {
            b"WEBP" => Some("image/webp"),
            b"WAVE" => Some("audio/x-wav"),
            b"AVI " => Some("video/x-msvideo"),
            _ => None,
        };
    }
    // BMP: "BM", size, then 4 reserved zero bytes
    if data.len() >= 14 && data.starts_with(b"BM") && data[6..10] == [0, 0, 0, 0] {
        return Some("image/bmp");
    }
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return Some("image/tiff");
    }
    if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return Some("image/vnd.microsoft.icon");
    }
    if data.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
        return Some("application/zip");
    }
    // Legacy Office (OLE compound document)
    if data.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return Some("application/x-ole-storage");
    }
    if data.starts_with(&[0x1F, 0x8B]) {
        return Some("application/gzip");
    }
    if data.starts_with(b"7z\xBC\xAF\x27\x1C") {
        return Some("application/x-7z-compressed");
    }
    if data.starts_with(b"Rar!\x1A\x07") {
        return Some("application/x-rar");
    }
    if data.starts_with(b"ID3") || data.starts_with(&[0xFF, 0xFB]) {
        return Some("audio/mpeg");
    }
    if data.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if data.starts_with(b"fLaC") {
        return Some("audio/flac");
    }
    if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("video/webm");
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return match &data[8..12] {
            b"qt  " => Some("video/quicktime"),
            b"heic" | b"heix" => Some("image/heic"),
            b"M4A " => Some("audio/mp4"),
            _ => Some("video/mp4"),
        };
    }

    sniff_text(data)
}

fn sniff_text(data: &[u8]) -> Option<&'static str> {
    if data.contains(&0) {
        return None;
    }
    // The sample may cut a multi-byte character in half.
    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&data[..e.valid_up_to()]).ok()?,
        Err(_) => return None,
    };

    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    let lower = trimmed
        .chars()
        .take(256)
        .collect::<String>()
        .to_ascii_lowercase();

    if lower.starts_with("<svg") || (lower.starts_with("<?xml") && lower.contains("<svg")) {
        Some("image/svg+xml")
    } else if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        Some("text/html")
    } else if lower.starts_with("<?xml") {
        Some("text/xml")
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Some("application/json")
    } else {
        Some("text/plain")
    }
}
