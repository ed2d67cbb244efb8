// File -> data URL encoding for document fields

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("File is too large (max 5 MB)")]
    TooLarge { size: u64 },
    #[error("The selected file is empty")]
    Empty,
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a base64 data URL")]
    Malformed,
}

impl EncodingError {
    /// Message suitable for the step banner; I/O details stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            EncodingError::Io { path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "the selected file".to_string());
                format!("Could not read {}", name)
            }
            other => other.to_string(),
        }
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:") && value.contains(";base64,")
}

/// Split a data URL into its MIME type and decoded bytes.
pub fn decode_data_url(value: &str) -> Result<(String, Vec<u8>), EncodingError> {
    let rest = value.strip_prefix("data:").ok_or(EncodingError::Malformed)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or(EncodingError::Malformed)?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| EncodingError::Malformed)?;
    Ok((mime.to_string(), bytes))
}

/// Read a file and encode it as `data:<mime>;base64,<...>`.
pub async fn file_to_data_url(path: &Path) -> Result<String, EncodingError> {
    let io_err = |source| EncodingError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = tokio::fs::metadata(path).await.map_err(io_err)?;
    if meta.len() > MAX_DOCUMENT_BYTES {
        log::warn!(
            "[PHASE: encoding] [STEP: read] rejected {} ({} bytes)",
            path.display(),
            meta.len()
        );
        return Err(EncodingError::TooLarge { size: meta.len() });
    }
    if meta.len() == 0 {
        return Err(EncodingError::Empty);
    }

    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    log::debug!(
        "[PHASE: encoding] [STEP: read] encoded {} ({} bytes)",
        path.display(),
        bytes.len()
    );
    Ok(to_data_url(mime_for_path(path), &bytes))
}

/// Encode several files concurrently. Each result stays paired with its key, so callers
/// apply them per field and completion order does not matter.
pub async fn files_to_data_urls<K>(
    files: Vec<(K, PathBuf)>,
) -> Vec<(K, Result<String, EncodingError>)> {
    let (keys, paths): (Vec<K>, Vec<PathBuf>) = files.into_iter().unzip();
    let results = join_all(paths.iter().map(|p| file_to_data_url(p))).await;
    keys.into_iter().zip(results).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).expect("create");
        f.write_all(contents).expect("write");
        (dir, path)
    }

    #[test]
    fn mime_is_derived_from_extension() {
        assert_eq!(mime_for_path(Path::new("licence.PDF")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("id.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("README")), "application/octet-stream");
    }

    #[test]
    fn decode_reverses_encoding_and_rejects_garbage() {
        let url = to_data_url("text/plain", b"hello");
        assert!(is_data_url(&url));
        let (mime, bytes) = decode_data_url(&url).expect("decode");
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"hello");

        assert!(matches!(decode_data_url("hello"), Err(EncodingError::Malformed)));
        assert!(!is_data_url("C:\\docs\\licence.pdf"));
    }

    #[tokio::test]
    async fn file_becomes_data_url() {
        let (_dir, path) = temp_file("licence.pdf", b"%PDF-1.4 test");
        let url = file_to_data_url(&path).await.expect("encode");
        assert!(url.starts_with("data:application/pdf;base64,"));
    }

    #[tokio::test]
    async fn empty_and_missing_files_are_rejected() {
        let (_dir, path) = temp_file("empty.png", b"");
        assert!(matches!(file_to_data_url(&path).await, Err(EncodingError::Empty)));

        let err = file_to_data_url(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Could not read here.pdf");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.pdf");
        let f = std::fs::File::create(&path).expect("create");
        f.set_len(MAX_DOCUMENT_BYTES + 1).expect("grow");
        let err = file_to_data_url(&path).await.unwrap_err();
        assert_eq!(err.user_message(), "File is too large (max 5 MB)");
    }

    #[tokio::test]
    async fn concurrent_encoding_keeps_results_paired() {
        let (_a, first) = temp_file("a.txt", b"first");
        let (_b, second) = temp_file("b.txt", b"second");
        let results = files_to_data_urls(vec![
            ("licenseDocument", first),
            ("idDocument", PathBuf::from("/nope.txt")),
            ("medicalCertificate", second),
        ])
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "licenseDocument");
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        let (_, bytes) = decode_data_url(results[2].1.as_ref().expect("ok")).expect("decode");
        assert_eq!(bytes, b"second");
    }
}
