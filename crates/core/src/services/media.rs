//! Media uploads for complaint photos and voice notes.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::Bytes;
use fixmycity_common::{AppError, AppResult, StorageService, StoredObject};

/// Default upload size limit (20MB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

const PHOTO_PREFIX: &str = "complaintPhotos";
const AUDIO_PREFIX: &str = "complaintAudios";
const DEFAULT_AUDIO_EXTENSION: &str = "webm";

/// Kind of attachment, which decides the storage key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Audio,
}

impl MediaKind {
    /// Human-readable name used in errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Audio => "audio",
        }
    }
}

/// A binary attachment captured with a complaint.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub kind: MediaKind,
    /// Name supplied by the client (the logical key).
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl MediaPayload {
    /// A photo attachment.
    pub fn photo(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MediaKind::Photo,
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// A voice note attachment.
    pub fn audio(content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            kind: MediaKind::Audio,
            file_name: String::new(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// Hands out epoch-millisecond stamps that never repeat within a process.
#[derive(Debug, Default)]
struct UploadClock {
    last: AtomicI64,
}

impl UploadClock {
    fn next(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

/// Writes complaint media to object storage and returns public URLs.
///
/// No retries: a failed upload is returned to the caller as is.
#[derive(Clone)]
pub struct MediaUploader {
    storage: StorageService,
    max_size: usize,
    clock: Arc<UploadClock>,
}

impl MediaUploader {
    /// Create a new uploader.
    #[must_use]
    pub fn new(storage: StorageService, max_size: usize) -> Self {
        Self {
            storage,
            max_size,
            clock: Arc::new(UploadClock::default()),
        }
    }

    /// Largest accepted payload in bytes.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Store one attachment under a collision-free key.
    pub async fn upload(&self, payload: &MediaPayload) -> AppResult<StoredObject> {
        if payload.data.is_empty() {
            return Err(AppError::Validation(format!(
                "{} attachment is empty",
                payload.kind.as_str()
            )));
        }

        if payload.data.len() > self.max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "{} is {} bytes, maximum is {} bytes",
                payload.kind.as_str(),
                payload.data.len(),
                self.max_size
            )));
        }

        let stamp = self.clock.next();
        let key = match payload.kind {
            MediaKind::Photo => photo_key(&payload.file_name, stamp),
            MediaKind::Audio => audio_key(&payload.content_type, stamp),
        };

        let stored = self
            .storage
            .put(&key, &payload.data, &payload.content_type)
            .await?;

        tracing::debug!(
            key = %stored.key,
            size = stored.size,
            kind = payload.kind.as_str(),
            "Stored complaint media"
        );

        Ok(stored)
    }

    /// Remove a previously stored attachment.
    pub async fn discard(&self, key: &str) -> AppResult<()> {
        self.storage.delete(key).await
    }
}

/// `complaintPhotos/<originalName>-<epochMillis>`
#[must_use]
pub fn photo_key(original_name: &str, epoch_millis: i64) -> String {
    format!("{PHOTO_PREFIX}/{}-{epoch_millis}", sanitize_file_name(original_name))
}

/// `complaintAudios/voice-<epochMillis>.<ext>`
#[must_use]
pub fn audio_key(content_type: &str, epoch_millis: i64) -> String {
    format!(
        "{AUDIO_PREFIX}/voice-{epoch_millis}.{}",
        audio_extension(content_type)
    )
}

/// File extension for a recorded audio MIME type.
#[must_use]
pub fn audio_extension(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/wav" | "audio/x-wav" => "wav",
        _ => DEFAULT_AUDIO_EXTENSION,
    }
}

/// MIME type of a stored object, inferred from its key.
///
/// Photo keys end in `-<epochMillis>`, so the extension is read from the
/// original name in front of the stamp. Unknown or missing extensions yield
/// `None`.
#[must_use]
pub fn content_type_for_key(key: &str) -> Option<&'static str> {
    let name = key.rsplit('/').next()?;
    let name = match name.rsplit_once('-') {
        Some((original, stamp)) if !stamp.is_empty() && stamp.bytes().all(|b| b.is_ascii_digit()) => {
            original
        }
        _ => name,
    };
    let (_, extension) = name.rsplit_once('.')?;

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        "webm" => Some("audio/webm"),
        "ogg" => Some("audio/ogg"),
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "wav" => Some("audio/wav"),
        _ => None,
    }
}

/// Keep only the last path component of a client-supplied name.
fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fixmycity_common::LocalStorage;

    fn uploader(dir: &tempfile::TempDir, max_size: usize) -> MediaUploader {
        let storage = LocalStorage::new(dir.path().to_path_buf(), "http://cdn.test/files".to_string());
        MediaUploader::new(Arc::new(storage), max_size)
    }

    #[test]
    fn test_photo_key_layout() {
        assert_eq!(
            photo_key("pole.jpg", 1_700_000_000_000),
            "complaintPhotos/pole.jpg-1700000000000"
        );
    }

    #[test]
    fn test_photo_key_strips_directories() {
        assert_eq!(photo_key("../../etc/passwd", 1), "complaintPhotos/passwd-1");
        assert_eq!(photo_key("C:\\Users\\me\\pic.png", 1), "complaintPhotos/pic.png-1");
        assert_eq!(photo_key("..", 1), "complaintPhotos/photo-1");
        assert_eq!(photo_key("", 1), "complaintPhotos/photo-1");
    }

    #[test]
    fn test_audio_key_layout() {
        assert_eq!(
            audio_key("audio/webm;codecs=opus", 42),
            "complaintAudios/voice-42.webm"
        );
        assert_eq!(audio_key("audio/ogg", 42), "complaintAudios/voice-42.ogg");
        assert_eq!(audio_key("", 42), "complaintAudios/voice-42.webm");
    }

    #[test]
    fn test_content_type_from_photo_key() {
        assert_eq!(
            content_type_for_key("complaintPhotos/pole.JPG-1700000000000"),
            Some("image/jpeg")
        );
        assert_eq!(content_type_for_key("/complaintPhotos/map.png-1"), Some("image/png"));
        assert_eq!(content_type_for_key("complaintPhotos/photo-1"), None);
        assert_eq!(content_type_for_key("complaintPhotos/notes.exe-1"), None);
    }

    #[test]
    fn test_content_type_from_audio_key() {
        assert_eq!(content_type_for_key("complaintAudios/voice-42.webm"), Some("audio/webm"));
        assert_eq!(content_type_for_key("complaintAudios/voice-42.ogg"), Some("audio/ogg"));
    }

    #[tokio::test]
    async fn test_photo_url_survives_reserved_characters() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(&dir, DEFAULT_MAX_UPLOAD_SIZE);

        let payload = MediaPayload::photo(
            "pothole #12?%.jpg",
            "image/jpeg",
            Bytes::from_static(b"jpeg"),
        );
        let stored = uploader.upload(&payload).await.unwrap();

        let url = url::Url::parse(&stored.url).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);
        let stamp = stored.key.rsplit('-').next().unwrap();
        assert_eq!(
            url.path(),
            format!("/files/complaintPhotos/pothole%20%2312%3F%25.jpg-{stamp}")
        );
        assert!(dir.path().join(&stored.key).exists());
    }

    #[test]
    fn test_clock_never_repeats() {
        let clock = UploadClock::default();
        let stamps: Vec<i64> = (0..500).map(|_| clock.next()).collect();
        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(&dir, DEFAULT_MAX_UPLOAD_SIZE);

        let payload = MediaPayload::photo("pole.jpg", "image/jpeg", Bytes::from_static(b"jpeg"));
        let (a, b) = tokio::join!(uploader.upload(&payload), uploader.upload(&payload));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.key, b.key);
        assert!(a.url.starts_with("http://cdn.test/files/complaintPhotos/pole.jpg-"));
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(&dir, 4);

        let payload = MediaPayload::audio("audio/webm", Bytes::from_static(b"too long"));
        let result = uploader.upload(&payload).await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
    }

    #[tokio::test]
    async fn test_empty_payload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(&dir, 4);

        let payload = MediaPayload::audio("audio/webm", Bytes::new());
        let result = uploader.upload(&payload).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(&dir, DEFAULT_MAX_UPLOAD_SIZE);

        let payload = MediaPayload::audio("audio/ogg", Bytes::from_static(b"ogg"));
        let stored = uploader.upload(&payload).await.unwrap();
        assert!(dir.path().join(&stored.key).exists());

        uploader.discard(&stored.key).await.unwrap();
        assert!(!dir.path().join(&stored.key).exists());
    }
}
