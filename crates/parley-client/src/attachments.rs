//! Turning a file on disk into a self-contained file message body.
//!
//! The whole file is read before anything is built; there is no chunking.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parley_store::{Attachment, MessageBody, MessageKind};
use tracing::debug;

use crate::error::Result;

/// Read `path` fully and encode it as a `data:` URI message body.
pub async fn read_file_body(path: &Path) -> Result<MessageBody> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let bytes = tokio::fs::read(path).await?;
    debug!(file = %file_name, size = bytes.len(), "file read for message");

    Ok(encode_file(&file_name, &mime_for(&file_name), &bytes))
}

/// Build a file message body from already-loaded bytes.
pub fn encode_file(file_name: &str, mime: &str, bytes: &[u8]) -> MessageBody {
    let attachment = Attachment {
        file_url: data_uri(mime, bytes),
        file_name: file_name.to_string(),
        file_size: format_size(bytes.len() as u64),
    };
    MessageBody::file(MessageKind::from_mime(mime), attachment)
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Size in kilobytes with two decimals, e.g. `"1.50 KB"`.
pub fn format_size(len: u64) -> String {
    format!("{:.2} KB", len as f64 / 1024.0)
}

/// MIME type guessed from the file extension.
pub fn mime_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn size_strings() {
        assert_eq!(format_size(0), "0.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1024 * 1024), "1024.00 KB");
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(mime_for("cat.JPG"), "image/jpeg");
        assert_eq!(mime_for("clip.mp4"), "video/mp4");
        assert_eq!(mime_for("song.mp3"), "audio/mpeg");
        assert_eq!(mime_for("report.pdf"), "application/pdf");
        assert_eq!(mime_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn less_common_media_is_not_a_document() {
        for (name, kind) in [
            ("clip.3gp", MessageKind::Video),
            ("clip.mov", MessageKind::Video),
            ("photo.tiff", MessageKind::Image),
            ("favicon.ico", MessageKind::Image),
            ("voice.aac", MessageKind::Audio),
            ("voice.flac", MessageKind::Audio),
        ] {
            assert_eq!(MessageKind::from_mime(&mime_for(name)), kind, "{name}");
        }
    }

    #[test]
    fn encode_picks_kind_from_mime() {
        let body = encode_file("a.png", "image/png", b"\x89PNG");
        assert_eq!(body.kind(), MessageKind::Image);
        let att = body.attachment().unwrap();
        assert_eq!(att.file_url, "data:image/png;base64,iVBORw==");
        assert_eq!(att.file_name, "a.png");

        let body = encode_file("notes.txt", "text/plain", b"hi");
        assert_eq!(body.kind(), MessageKind::Document);
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.ogg");
        tokio::fs::write(&path, vec![7u8; 2048]).await.unwrap();

        let body = read_file_body(&path).await.unwrap();
        assert_eq!(body.kind(), MessageKind::Audio);
        let att = body.attachment().unwrap();
        assert_eq!(att.file_name, "voice.ogg");
        assert_eq!(att.file_size, "2.00 KB");
        assert!(att.file_url.starts_with("data:audio/ogg;base64,"));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file_body(&dir.path().join("gone.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Io(_)));
    }
}
