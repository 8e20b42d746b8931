//! Complaint service: submission pipeline, tracking and admin status changes.

use fixmycity_common::{AppError, AppResult, StoredObject};
use fixmycity_db::{
    entities::complaint::{self, ComplaintStatus},
    repositories::NewComplaint,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError};

use crate::services::{
    complaint_store::ComplaintStoreService,
    geocoding::{Coordinates, GeocoderService},
    media::{MediaPayload, MediaUploader},
};

/// Default admin map centre (Bhopal).
pub const DEFAULT_MAP_CENTER: (f64, f64) = (23.2599, 77.4126);

/// Default admin map zoom level.
pub const DEFAULT_MAP_ZOOM: u8 = 12;

/// Everything a citizen gathered before pressing submit.
#[derive(Debug, Clone, Default, Validate)]
pub struct ComplaintDraft {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    /// Manually entered location; takes precedence over coordinates.
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub photo: Option<MediaPayload>,
    pub audio: Option<MediaPayload>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Stages of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Collecting,
    UploadingMedia,
    Resolving,
    Persisting,
    Done,
    Failed,
}

impl SubmissionStage {
    /// Whether `next` may follow this stage.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Collecting, Self::UploadingMedia)
                | (Self::UploadingMedia, Self::Resolving | Self::Persisting)
                | (Self::Resolving, Self::Persisting)
                | (Self::Persisting, Self::Done)
                | (
                    Self::Collecting | Self::UploadingMedia | Self::Resolving | Self::Persisting,
                    Self::Failed
                )
        )
    }

    /// Whether the submission has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// State owned by one run of the submission pipeline.
#[derive(Debug)]
pub struct Submission {
    stage: SubmissionStage,
    title: String,
    description: String,
    location: String,
    coordinates: Option<Coordinates>,
    photo: Option<MediaPayload>,
    audio: Option<MediaPayload>,
    photo_url: String,
    audio_url: String,
    /// Media written so far, removed again if the submission fails.
    stored: Vec<StoredObject>,
}

impl Submission {
    /// Validate a draft and start collecting.
    pub fn new(draft: ComplaintDraft) -> AppResult<Self> {
        draft.validate()?;

        Ok(Self {
            stage: SubmissionStage::Collecting,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            location: draft.location.trim().to_string(),
            coordinates: draft.coordinates,
            photo: draft.photo,
            audio: draft.audio,
            photo_url: String::new(),
            audio_url: String::new(),
            stored: Vec::new(),
        })
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> SubmissionStage {
        self.stage
    }

    /// Move to the next stage.
    pub fn advance(&mut self, next: SubmissionStage) -> AppResult<()> {
        if !self.stage.can_advance_to(next) {
            return Err(AppError::Internal(format!(
                "Invalid submission transition {:?} -> {next:?}",
                self.stage
            )));
        }
        debug!(from = ?self.stage, to = ?next, "Submission stage");
        self.stage = next;
        Ok(())
    }

    /// Coordinates are resolved only when no location was typed in.
    #[must_use]
    pub fn needs_geocoding(&self) -> bool {
        self.coordinates.is_some() && self.location.is_empty()
    }

    fn record(&self) -> NewComplaint {
        NewComplaint {
            title: self.title.clone(),
            description: self.description.clone(),
            photo_url: self.photo_url.clone(),
            audio_url: self.audio_url.clone(),
            location: self.location.clone(),
            latitude: self.coordinates.map(|c| c.latitude()),
            longitude: self.coordinates.map(|c| c.longitude()),
        }
    }
}

/// A complaint pin on the admin map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub latitude: f64,
    pub longitude: f64,
}

/// Data for the admin map view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub markers: Vec<MapMarker>,
}

/// Complaint service orchestrating store, uploader and geocoder.
#[derive(Clone)]
pub struct ComplaintService {
    store: ComplaintStoreService,
    uploader: MediaUploader,
    geocoder: GeocoderService,
}

impl ComplaintService {
    /// Create a new complaint service.
    #[must_use]
    pub fn new(
        store: ComplaintStoreService,
        uploader: MediaUploader,
        geocoder: GeocoderService,
    ) -> Self {
        Self {
            store,
            uploader,
            geocoder,
        }
    }

    /// Largest attachment the uploader accepts.
    #[must_use]
    pub const fn max_upload_size(&self) -> usize {
        self.uploader.max_size()
    }

    /// Run a submission to completion.
    ///
    /// Either the complaint is persisted with every attachment, or nothing is:
    /// media already written is removed again before the error is returned.
    pub async fn submit(&self, draft: ComplaintDraft) -> AppResult<complaint::Model> {
        let mut submission = Submission::new(draft)?;

        match self.run(&mut submission).await {
            Ok(created) => {
                submission.advance(SubmissionStage::Done)?;
                info!(complaint_id = %created.id, "Complaint submitted");
                Ok(created)
            }
            Err(e) => {
                submission.advance(SubmissionStage::Failed)?;
                warn!(error = %e, "Complaint submission failed");
                self.discard_media(&submission.stored).await;
                Err(e)
            }
        }
    }

    async fn run(&self, submission: &mut Submission) -> AppResult<complaint::Model> {
        submission.advance(SubmissionStage::UploadingMedia)?;
        self.upload_media(submission).await?;

        if submission.needs_geocoding() {
            submission.advance(SubmissionStage::Resolving)?;
            if let Some(coordinates) = submission.coordinates {
                submission.location = self.geocoder.reverse_geocode(coordinates).await;
            }
        }

        submission.advance(SubmissionStage::Persisting)?;
        self.store.create(submission.record()).await
    }

    /// Upload photo and audio concurrently; both finish before any decision.
    async fn upload_media(&self, submission: &mut Submission) -> AppResult<()> {
        let photo = submission.photo.take();
        let audio = submission.audio.take();

        let (photo, audio) = tokio::join!(
            self.upload_optional(photo.as_ref()),
            self.upload_optional(audio.as_ref()),
        );

        if let Ok(Some(stored)) = &photo {
            submission.photo_url = stored.url.clone();
            submission.stored.push(stored.clone());
        }
        if let Ok(Some(stored)) = &audio {
            submission.audio_url = stored.url.clone();
            submission.stored.push(stored.clone());
        }

        photo?;
        audio?;
        Ok(())
    }

    async fn upload_optional(
        &self,
        payload: Option<&MediaPayload>,
    ) -> AppResult<Option<StoredObject>> {
        match payload {
            Some(payload) => self.uploader.upload(payload).await.map(Some),
            None => Ok(None),
        }
    }

    async fn discard_media(&self, stored: &[StoredObject]) {
        for object in stored {
            if let Err(e) = self.uploader.discard(&object.key).await {
                warn!(
                    key = %object.key,
                    error = %e,
                    "Failed to remove media of abandoned submission"
                );
            }
        }
    }

    /// All complaints, newest first.
    pub async fn list(&self) -> AppResult<Vec<complaint::Model>> {
        self.store.list().await
    }

    /// One complaint by ID.
    pub async fn get(&self, id: &str) -> AppResult<complaint::Model> {
        self.store.get(id).await
    }

    /// Set a complaint's status. Any status may follow any other.
    pub async fn update_status(&self, id: &str, status: ComplaintStatus) -> AppResult<()> {
        self.store.update_status(id, status).await?;
        info!(complaint_id = %id, status = %status, "Complaint status updated");
        Ok(())
    }

    /// Complaints with coordinates, as map markers.
    pub async fn map_view(&self) -> AppResult<MapView> {
        let markers = self
            .store
            .list()
            .await?
            .into_iter()
            .filter_map(|c| {
                let (latitude, longitude) = c.coordinates()?;
                Some(MapMarker {
                    id: c.id,
                    title: c.title,
                    description: c.description,
                    status: c.status,
                    latitude,
                    longitude,
                })
            })
            .collect();

        Ok(MapView {
            center: DEFAULT_MAP_CENTER,
            zoom: DEFAULT_MAP_ZOOM,
            markers,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::{
        complaint_store::{ComplaintStore, MemoryComplaintStore},
        geocoding::{Geocoder, NoOpGeocoder},
        media::DEFAULT_MAX_UPLOAD_SIZE,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use fixmycity_common::{LocalStorage, StorageBackend};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Geocoder returning a fixed address and counting calls.
    #[derive(Default)]
    struct FixedGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _coordinates: Coordinates) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            "MP Nagar, Bhopal".to_string()
        }
    }

    /// Storage that rejects every key under one prefix.
    struct FailingStorage {
        inner: LocalStorage,
        failing_prefix: &'static str,
    }

    #[async_trait]
    impl StorageBackend for FailingStorage {
        async fn put(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<StoredObject> {
            if key.starts_with(self.failing_prefix) {
                return Err(AppError::Upload("permission denied".to_string()));
            }
            self.inner.put(key, data, content_type).await
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.inner.delete(key).await
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }
    }

    /// Store whose writes always fail.
    struct UnreachableStore;

    #[async_trait]
    impl ComplaintStore for UnreachableStore {
        async fn create(&self, _input: NewComplaint) -> AppResult<complaint::Model> {
            Err(AppError::Storage("connection refused".to_string()))
        }

        async fn list(&self) -> AppResult<Vec<complaint::Model>> {
            Err(AppError::Storage("connection refused".to_string()))
        }

        async fn get(&self, id: &str) -> AppResult<complaint::Model> {
            Err(AppError::NotFound(id.to_string()))
        }

        async fn update_status(&self, _id: &str, _status: ComplaintStatus) -> AppResult<()> {
            Err(AppError::Storage("connection refused".to_string()))
        }
    }

    struct Harness {
        service: ComplaintService,
        store: MemoryComplaintStore,
        geocoder: Arc<FixedGeocoder>,
        dir: tempfile::TempDir,
    }

    fn local(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path().to_path_buf(), "http://localhost:3000/files".to_string())
    }

    fn harness_with(storage: impl FnOnce(&tempfile::TempDir) -> Arc<dyn StorageBackend>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryComplaintStore::new();
        let geocoder = Arc::new(FixedGeocoder::default());
        let uploader = MediaUploader::new(storage(&dir), DEFAULT_MAX_UPLOAD_SIZE);
        let service = ComplaintService::new(Arc::new(store.clone()), uploader, geocoder.clone());
        Harness {
            service,
            store,
            geocoder,
            dir,
        }
    }

    fn harness() -> Harness {
        harness_with(|dir| Arc::new(local(dir)))
    }

    fn streetlight() -> ComplaintDraft {
        ComplaintDraft {
            title: "Broken streetlight".to_string(),
            description: "Pole 12 near market".to_string(),
            coordinates: Some(Coordinates::new(23.2599, 77.4126).unwrap()),
            ..Default::default()
        }
    }

    fn photo() -> MediaPayload {
        MediaPayload::photo("pole.jpg", "image/jpeg", Bytes::from_static(b"jpeg-bytes"))
    }

    fn voice() -> MediaPayload {
        MediaPayload::audio("audio/webm;codecs=opus", Bytes::from_static(b"webm-bytes"))
    }

    fn files_under(dir: &tempfile::TempDir, prefix: &str) -> usize {
        std::fs::read_dir(dir.path().join(prefix)).map_or(0, Iterator::count)
    }

    #[tokio::test]
    async fn test_streetlight_scenario_resolves_location() {
        let h = harness();

        let created = h.service.submit(streetlight()).await.unwrap();

        assert_eq!(created.location, "MP Nagar, Bhopal");
        assert_eq!(created.status, ComplaintStatus::Pending);
        assert_eq!(created.coordinates(), Some((23.2599, 77.4126)));
        assert!(created.photo_url.is_empty());
        assert!(created.audio_url.is_empty());
        assert_eq!(h.store.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_manual_location_skips_geocoding() {
        let h = harness();
        let draft = ComplaintDraft {
            location: "  Near New Market gate ".to_string(),
            ..streetlight()
        };

        let created = h.service.submit(draft).await.unwrap();

        assert_eq!(created.location, "Near New Market gate");
        assert_eq!(h.geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_without_coordinates_location_stays_empty() {
        let h = harness();
        let draft = ComplaintDraft {
            coordinates: None,
            ..streetlight()
        };

        let created = h.service.submit(draft).await.unwrap();

        assert!(created.location.is_empty());
        assert_eq!(created.coordinates(), None);
        assert_eq!(h.geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_geocoding_fallback_becomes_location() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryComplaintStore::new();
        let service = ComplaintService::new(
            Arc::new(store.clone()),
            MediaUploader::new(Arc::new(local(&dir)), DEFAULT_MAX_UPLOAD_SIZE),
            Arc::new(NoOpGeocoder),
        );

        let created = service.submit(streetlight()).await.unwrap();
        assert_eq!(created.location, "23.2599, 77.4126");
    }

    #[tokio::test]
    async fn test_attachments_produce_urls() {
        let h = harness();
        let draft = ComplaintDraft {
            photo: Some(photo()),
            audio: Some(voice()),
            ..streetlight()
        };

        let created = h.service.submit(draft).await.unwrap();

        assert!(
            created
                .photo_url
                .starts_with("http://localhost:3000/files/complaintPhotos/pole.jpg-")
        );
        assert!(
            created
                .audio_url
                .starts_with("http://localhost:3000/files/complaintAudios/voice-")
        );
        assert!(created.audio_url.ends_with(".webm"));
        assert_eq!(files_under(&h.dir, "complaintPhotos"), 1);
        assert_eq!(files_under(&h.dir, "complaintAudios"), 1);
    }

    #[tokio::test]
    async fn test_failed_audio_upload_persists_nothing() {
        let h = harness_with(|dir| {
            Arc::new(FailingStorage {
                inner: local(dir),
                failing_prefix: "complaintAudios/",
            })
        });
        let draft = ComplaintDraft {
            photo: Some(photo()),
            audio: Some(voice()),
            ..streetlight()
        };

        let result = h.service.submit(draft).await;

        assert!(matches!(result, Err(AppError::Upload(_))));
        assert!(h.store.is_empty().await);
        assert_eq!(files_under(&h.dir, "complaintPhotos"), 0);
        assert_eq!(h.geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_photo_upload_persists_nothing() {
        let h = harness_with(|dir| {
            Arc::new(FailingStorage {
                inner: local(dir),
                failing_prefix: "complaintPhotos/",
            })
        });
        let draft = ComplaintDraft {
            photo: Some(photo()),
            ..streetlight()
        };

        let result = h.service.submit(draft).await;

        assert!(matches!(result, Err(AppError::Upload(_))));
        assert!(h.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_removes_uploaded_media() {
        let dir = tempfile::tempdir().unwrap();
        let service = ComplaintService::new(
            Arc::new(UnreachableStore),
            MediaUploader::new(Arc::new(local(&dir)), DEFAULT_MAX_UPLOAD_SIZE),
            Arc::new(NoOpGeocoder),
        );
        let draft = ComplaintDraft {
            photo: Some(photo()),
            ..streetlight()
        };

        let result = service.submit(draft).await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(files_under(&dir, "complaintPhotos"), 0);
    }

    #[tokio::test]
    async fn test_blank_title_rejected_before_upload() {
        let h = harness();
        let draft = ComplaintDraft {
            title: "   ".to_string(),
            photo: Some(photo()),
            ..streetlight()
        };

        let result = h.service.submit(draft).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(files_under(&h.dir, "complaintPhotos"), 0);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_status_changes_only_status() {
        let h = harness();
        let created = h.service.submit(streetlight()).await.unwrap();

        h.service
            .update_status(&created.id, ComplaintStatus::Completed)
            .await
            .unwrap();

        let updated = h.service.get(&created.id).await.unwrap();
        assert_eq!(
            updated,
            complaint::Model {
                status: ComplaintStatus::Completed,
                ..created
            }
        );
    }

    #[tokio::test]
    async fn test_update_status_unknown_id_leaves_store_unchanged() {
        let h = harness();
        let created = h.service.submit(streetlight()).await.unwrap();

        let result = h
            .service
            .update_status("missing", ComplaintStatus::Completed)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(h.service.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_any_status_may_follow_any_other() {
        let h = harness();
        let created = h.service.submit(streetlight()).await.unwrap();

        for status in [
            ComplaintStatus::Completed,
            ComplaintStatus::Pending,
            ComplaintStatus::WorkGoingOn,
            ComplaintStatus::Approved,
        ] {
            h.service.update_status(&created.id, status).await.unwrap();
            assert_eq!(h.service.get(&created.id).await.unwrap().status, status);
        }
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let h = harness();
        let mut ids = Vec::new();
        for title in ["t1", "t2", "t3"] {
            let draft = ComplaintDraft {
                title: title.to_string(),
                ..streetlight()
            };
            ids.push(h.service.submit(draft).await.unwrap().id);
        }
        ids.reverse();

        let listed: Vec<String> = h.service.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_map_view_only_located_complaints() {
        let h = harness();
        let located = h.service.submit(streetlight()).await.unwrap();
        h.service
            .submit(ComplaintDraft {
                coordinates: None,
                ..streetlight()
            })
            .await
            .unwrap();

        let view = h.service.map_view().await.unwrap();

        assert_eq!(view.center, DEFAULT_MAP_CENTER);
        assert_eq!(view.zoom, 12);
        assert_eq!(view.markers.len(), 1);
        assert_eq!(view.markers[0].id, located.id);
        assert_eq!(view.markers[0].latitude, 23.2599);
    }

    #[test]
    fn test_stage_transitions() {
        use SubmissionStage::*;

        assert!(Collecting.can_advance_to(UploadingMedia));
        assert!(UploadingMedia.can_advance_to(Persisting));
        assert!(UploadingMedia.can_advance_to(Resolving));
        assert!(Resolving.can_advance_to(Persisting));
        assert!(Persisting.can_advance_to(Done));
        assert!(Persisting.can_advance_to(Failed));

        assert!(!Collecting.can_advance_to(Persisting));
        assert!(!Done.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(UploadingMedia));
        assert!(Done.is_terminal() && Failed.is_terminal());
    }

    #[test]
    fn test_submission_rejects_invalid_transition() {
        let mut submission = Submission::new(streetlight()).unwrap();
        assert_eq!(submission.stage(), SubmissionStage::Collecting);
        assert!(submission.advance(SubmissionStage::Done).is_err());
        assert!(submission.needs_geocoding());
    }
}
